use std::sync::Arc;

use axum::extract::FromRef;
use common_auth::TokenVerifier;
use sqlx::PgPool;

/// Shared application state; lives here rather than main.rs so tests and
/// library code can construct it.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub verifier: Arc<TokenVerifier>,
}

impl AppState {
    pub fn new(db: PgPool, verifier: Arc<TokenVerifier>) -> Self {
        Self { db, verifier }
    }
}

impl FromRef<AppState> for Arc<TokenVerifier> {
    fn from_ref(state: &AppState) -> Self {
        state.verifier.clone()
    }
}
