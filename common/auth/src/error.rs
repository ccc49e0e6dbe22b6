use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

/// Terminal authorization failures. Every variant carries a stable
/// machine-readable code plus the HTTP status it maps to; the human
/// description comes from the `Display` impl.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("authorization header is expected")]
    AuthorizationHeaderMissing,
    #[error("authorization header must be of the form 'Bearer <token>'")]
    InvalidHeaderFormat,
    #[error("token is malformed: {0}")]
    MalformedToken(String),
    #[error("no signing key found for kid '{0}'")]
    UnknownSigningKey(String),
    #[error("token signature verification failed")]
    InvalidSignature,
    #[error("token has expired")]
    TokenExpired,
    #[error("token issuer '{0}' does not match the configured provider")]
    InvalidIssuer(String),
    #[error("token audience does not include this API")]
    InvalidAudience,
    #[error("signing key set unavailable: {0}")]
    KeySetUnavailable(String),
    #[error("permissions claim not present in token")]
    PermissionsClaimMissing,
    #[error("permission '{0}' not granted")]
    PermissionNotFound(String),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::AuthorizationHeaderMissing
            | AuthError::InvalidHeaderFormat
            | AuthError::MalformedToken(_)
            | AuthError::UnknownSigningKey(_)
            | AuthError::InvalidSignature
            | AuthError::TokenExpired
            | AuthError::InvalidIssuer(_)
            | AuthError::InvalidAudience => StatusCode::UNAUTHORIZED,
            AuthError::KeySetUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::PermissionsClaimMissing => StatusCode::BAD_REQUEST,
            AuthError::PermissionNotFound(_) => StatusCode::FORBIDDEN,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthError::AuthorizationHeaderMissing => "authorization_header_missing",
            AuthError::InvalidHeaderFormat => "invalid_header_format",
            AuthError::MalformedToken(_) => "malformed_token",
            AuthError::UnknownSigningKey(_) => "unknown_signing_key",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidIssuer(_) => "invalid_issuer",
            AuthError::InvalidAudience => "invalid_audience",
            AuthError::KeySetUnavailable(_) => "key_set_unavailable",
            AuthError::PermissionsClaimMissing => "permissions_claim_missing",
            AuthError::PermissionNotFound(_) => "permission_not_found",
        }
    }

    /// Description safe to send to the client. Variants wrapping library
    /// or transport detail fall back to a fixed phrase; the detail only
    /// reaches logs.
    fn public_description(&self) -> String {
        match self {
            AuthError::MalformedToken(_) => "token is malformed".to_string(),
            AuthError::KeySetUnavailable(_) => "signing key set unavailable".to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: u16,
    code: &'static str,
    description: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match &self {
            AuthError::KeySetUnavailable(detail) => {
                tracing::warn!(%detail, "key set unavailable")
            }
            AuthError::MalformedToken(detail) => {
                tracing::debug!(%detail, "malformed token rejected")
            }
            _ => {}
        }

        let status = self.status();
        let body = ErrorBody {
            success: false,
            error: status.as_u16(),
            code: self.code(),
            description: self.public_description(),
        };
        (status, Json(body)).into_response()
    }
}
