pub mod claims;
pub mod config;
pub mod error;
pub mod extractors;
pub mod guards;
pub mod jwks;
pub mod verifier;

#[cfg(test)]
pub(crate) mod testutil;

pub use claims::Claims;
pub use config::{well_known_jwks_url, AuthConfig};
pub use error::{AuthError, AuthResult};
pub use extractors::{extract_bearer_token, AuthContext};
pub use guards::{authorize, ensure_scope, RequireScope};
pub use jwks::JwksFetcher;
pub use verifier::{KeyStore, TokenVerifier, TokenVerifierBuilder};
