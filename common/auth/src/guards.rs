use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::header::AUTHORIZATION;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use tower::{Layer, Service};
use tracing::debug;

use crate::claims::Claims;
use crate::error::{AuthError, AuthResult};
use crate::extractors::{extract_bearer_token, AuthContext};
use crate::verifier::TokenVerifier;

/// Check that verified claims carry the scope an endpoint demands.
///
/// A token without any permissions claim is reported separately from a
/// token whose grants simply lack the required scope.
pub fn ensure_scope(claims: &Claims, required: &str) -> AuthResult<()> {
    match &claims.permissions {
        None => Err(AuthError::PermissionsClaimMissing),
        Some(perms) if perms.iter().any(|p| p == required) => Ok(()),
        Some(_) => Err(AuthError::PermissionNotFound(required.to_string())),
    }
}

/// The full pipeline for one request: credential extraction, token
/// verification, scope enforcement. Short-circuits on the first violation.
pub async fn authorize(
    verifier: &TokenVerifier,
    authorization: Option<&str>,
    required_scope: &str,
) -> AuthResult<Claims> {
    let token = extract_bearer_token(authorization)?;
    let claims = verifier.verify(token).await?;
    ensure_scope(&claims, required_scope)?;
    Ok(claims)
}

/// Tower layer binding one required scope to a route. Wrapped handlers can
/// only run after the pipeline succeeds, so enforcement does not depend on
/// registration order; on success the verified [`AuthContext`] is available
/// from request extensions.
#[derive(Clone)]
pub struct RequireScope {
    verifier: Arc<TokenVerifier>,
    scope: &'static str,
}

impl RequireScope {
    pub fn new(verifier: Arc<TokenVerifier>, scope: &'static str) -> Self {
        Self { verifier, scope }
    }
}

impl<S> Layer<S> for RequireScope {
    type Service = RequireScopeService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequireScopeService {
            inner,
            verifier: self.verifier.clone(),
            scope: self.scope,
        }
    }
}

#[derive(Clone)]
pub struct RequireScopeService<S> {
    inner: S,
    verifier: Arc<TokenVerifier>,
    scope: &'static str,
}

impl<S> Service<Request<Body>> for RequireScopeService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let verifier = self.verifier.clone();
        let scope = self.scope;
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let header = match req.headers().get(AUTHORIZATION) {
                None => None,
                Some(value) => match value.to_str() {
                    Ok(raw) => Some(raw),
                    Err(_) => {
                        return Ok(AuthError::InvalidHeaderFormat.into_response());
                    }
                },
            };

            match authorize(&verifier, header, scope).await {
                Ok(claims) => {
                    req.extensions_mut().insert(AuthContext { claims });
                    inner.call(req).await
                }
                Err(err) => {
                    debug!(code = err.code(), scope, "request denied");
                    Ok(err.into_response())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::testutil::{base_claims, generate_key_material, sign_token};
    use crate::verifier::KeyStore;
    use serde_json::json;

    const ISSUER: &str = "https://tenant.example.auth0.com/";
    const AUDIENCE: &str = "drinks-api";

    fn claims_with_permissions(permissions: Option<Vec<&str>>) -> Claims {
        let mut payload = json!({
            "iss": ISSUER,
            "aud": AUDIENCE,
            "exp": 2_000_000_000i64,
        });
        if let Some(perms) = &permissions {
            payload["permissions"] = json!(perms);
        }
        Claims::try_from(payload).expect("claims parse")
    }

    #[test]
    fn scope_present_is_authorized() {
        let claims = claims_with_permissions(Some(vec!["get:drinks-detail", "post:drinks"]));
        ensure_scope(&claims, "post:drinks").expect("authorized");
    }

    #[test]
    fn missing_scope_is_forbidden_not_bad_request() {
        let claims = claims_with_permissions(Some(vec!["get:drinks-detail"]));
        let err = ensure_scope(&claims, "post:drinks").expect_err("must fail");
        match err {
            AuthError::PermissionNotFound(scope) => assert_eq!(scope, "post:drinks"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_permissions_claim_is_distinct() {
        let claims = claims_with_permissions(None);
        let err = ensure_scope(&claims, "post:drinks").expect_err("must fail");
        assert!(matches!(err, AuthError::PermissionsClaimMissing));
    }

    #[test]
    fn scope_matching_is_exact() {
        let claims = claims_with_permissions(Some(vec!["get:drinks-detail"]));
        let err = ensure_scope(&claims, "get:drinks").expect_err("no prefix match");
        assert!(matches!(err, AuthError::PermissionNotFound(_)));
    }

    #[tokio::test]
    async fn pipeline_short_circuits_in_stage_order() {
        let material = generate_key_material();
        let store = KeyStore::new();
        store.insert_key("kid-1", material.decoding.clone());
        let verifier = TokenVerifier::with_store(AuthConfig::new(ISSUER, AUDIENCE), store);

        let err = authorize(&verifier, None, "post:drinks")
            .await
            .expect_err("no header");
        assert!(matches!(err, AuthError::AuthorizationHeaderMissing));

        let err = authorize(&verifier, Some("Basic abc"), "post:drinks")
            .await
            .expect_err("wrong scheme");
        assert!(matches!(err, AuthError::InvalidHeaderFormat));

        let token = sign_token(
            &material.encoding,
            "kid-1",
            &base_claims(ISSUER, AUDIENCE, Some(&["get:drinks-detail"])),
        );
        let header = format!("Bearer {token}");
        let err = authorize(&verifier, Some(&header), "post:drinks")
            .await
            .expect_err("wrong scope");
        assert!(matches!(err, AuthError::PermissionNotFound(_)));

        let claims = authorize(&verifier, Some(&header), "get:drinks-detail")
            .await
            .expect("authorized");
        assert!(claims.has_permission("get:drinks-detail"));
    }
}
