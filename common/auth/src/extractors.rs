use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::claims::Claims;
use crate::error::{AuthError, AuthResult};

/// Pulls the bearer token out of an authorization header value. `None`
/// represents an absent header, which is distinct from an empty one.
///
/// The header must split into exactly two whitespace-separated parts with a
/// case-insensitive `Bearer` scheme; the second part is returned unchanged.
pub fn extract_bearer_token(header: Option<&str>) -> AuthResult<&str> {
    let raw = header.ok_or(AuthError::AuthorizationHeaderMissing)?;

    let mut parts = raw.split_whitespace();
    let scheme = parts.next().ok_or(AuthError::InvalidHeaderFormat)?;
    let token = parts.next().ok_or(AuthError::InvalidHeaderFormat)?;
    if parts.next().is_some() || !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidHeaderFormat);
    }

    Ok(token)
}

/// Verified caller identity, inserted into request extensions by the
/// [`RequireScope`](crate::guards::RequireScope) layer after the full
/// pipeline has run.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub claims: Claims,
}

impl AuthContext {
    pub fn has_permission(&self, scope: &str) -> bool {
        self.claims.has_permission(scope)
    }

    pub fn into_claims(self) -> Claims {
        self.claims
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Only present when the route is wrapped in RequireScope; a route
        // reaching this without the layer fails closed.
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AuthError::AuthorizationHeaderMissing)
    }
}
