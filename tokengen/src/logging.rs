//! Logging setup with a reloadable filter.
//!
//! Library code only emits `tracing` events; binaries call [`init_logging`]
//! once at startup to install a subscriber.

use chrono::Local;
use tracing::info;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::Writer, time::FormatTime},
    layer::SubscriberExt,
    reload::{self, Handle},
    util::SubscriberInitExt,
};

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "tokengen=info,sqlx=warn";

/// Timer that prints the server's local time instead of UTC.
#[derive(Debug, Clone, Copy)]
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

/// Type alias for the reload handle.
pub type FilterHandle = Handle<EnvFilter, tracing_subscriber::Registry>;

/// Handle to the installed subscriber's filter.
pub struct LoggingHandle {
    handle: FilterHandle,
}

impl LoggingHandle {
    /// Get the current filter directive string.
    pub fn get_filter(&self) -> String {
        self.handle
            .with_current(|filter| filter.to_string())
            .unwrap_or_default()
    }

    /// Replace the filter directive (e.g., "tokengen=debug,sqlx=warn").
    pub fn set_filter(&self, directive: &str) -> crate::Result<()> {
        let new_filter = parse_filter(directive)?;

        self.handle
            .reload(new_filter)
            .map_err(|e| crate::Error::Other(format!("Failed to reload filter: {}", e)))?;

        info!(directive = %directive, "Log filter updated");
        Ok(())
    }
}

fn parse_filter(directive: &str) -> crate::Result<EnvFilter> {
    EnvFilter::try_new(directive)
        .map_err(|e| crate::Error::Other(format!("Invalid filter directive: {}", e)))
}

/// Install the global subscriber.
///
/// Uses `RUST_LOG` when set, otherwise [`DEFAULT_LOG_FILTER`]. Fails (rather
/// than panicking) if a global subscriber is already installed.
pub fn init_logging() -> crate::Result<LoggingHandle> {
    let initial_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let (filter_layer, filter_handle) = reload::Layer::new(initial_filter);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_ansi(true).with_timer(LocalTimer))
        .try_init()
        .map_err(|e| {
            crate::Error::Other(format!("Failed to set global default subscriber: {}", e))
        })?;

    Ok(LoggingHandle {
        handle: filter_handle,
    })
}
