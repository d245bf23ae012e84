//! Credential issuance and generation-based revocation.

pub mod credential;
pub mod error;
pub mod factory;
pub mod issuer;
pub mod jwt;
pub mod outcome;
pub mod validator;

pub use credential::{AccessCredential, Credential, RefreshCredential, TokenKind};
pub use error::{AuthError, ClientOutcome};
pub use factory::CredentialFactory;
pub use issuer::SessionIssuer;
pub use jwt::{CodecError, JwtCodec};
pub use outcome::{AccessOutcome, RenewOutcome};
pub use validator::GenerationValidator;
