use anyhow::Context;
use tokengen::config::StoreConfig;
use tokengen::database::repositories::{GenerationRepository, SqlxGenerationRepository};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || args.iter().any(|a| a == "-h" || a == "--help") {
        print_help();
        return Ok(());
    }

    let (command, identity) = match args.as_slice() {
        [command, identity] if !identity.is_empty() => (command.as_str(), identity.as_str()),
        _ => {
            print_help();
            anyhow::bail!("expected a command and an identity");
        }
    };

    dotenvy::dotenv().ok();
    let _logging = tokengen::logging::init_logging()?;

    let config = StoreConfig::from_env();
    let store = SqlxGenerationRepository::open(&config)
        .await
        .with_context(|| format!("failed to open generation store at {}", config.database_url))?;

    let result = run(&store, command, identity).await;
    store.close().await;
    result
}

async fn run(store: &SqlxGenerationRepository, command: &str, identity: &str) -> anyhow::Result<()> {
    match command {
        "revoke-all" => {
            let generation = store
                .advance(identity)
                .await
                .context("failed to advance generation")?;
            info!(identity = %identity, generation, "Revoked all refresh tokens");
            println!("{}: generation is now {}", identity, generation);
        }
        "show" => {
            let generation = store
                .current(identity)
                .await
                .context("failed to read generation")?;
            println!("{}: generation {}", identity, generation);
        }
        other => {
            print_help();
            anyhow::bail!("unknown command: {}", other);
        }
    }
    Ok(())
}

fn print_help() {
    println!("tokengen-admin - Inspect and revoke refresh token generations");
    println!();
    println!("Usage:");
    println!("  tokengen-admin revoke-all <identity>   # invalidate every refresh token for <identity>");
    println!("  tokengen-admin show <identity>         # print the current generation");
    println!();
    println!("Environment variables (a .env file is also read):");
    println!("  DATABASE_URL=sqlite:tokengen.db?mode=rwc");
    println!("  STORE_OP_TIMEOUT_MS=5000");
    println!("  RUST_LOG=tokengen=info");
}
