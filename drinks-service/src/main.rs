use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::Method;
use common_auth::{well_known_jwks_url, AuthConfig, TokenVerifier};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use drinks_service::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env::var("RUST_LOG").unwrap_or_else(|_| "info".into()))
        .init();

    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let db = PgPool::connect(&database_url).await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let verifier = build_verifier_from_env().await?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([ACCEPT, AUTHORIZATION, CONTENT_TYPE]);

    let state = AppState::new(db, verifier);
    let app = router(state).layer(cors);

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from((host.parse::<std::net::IpAddr>()?, port));
    info!(%addr, "starting drinks-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn build_verifier_from_env() -> anyhow::Result<Arc<TokenVerifier>> {
    let domain = env::var("AUTH_DOMAIN").context("AUTH_DOMAIN must be set")?;
    let audience = env::var("AUTH_AUDIENCE").context("AUTH_AUDIENCE must be set")?;

    let jwks_url = well_known_jwks_url(&domain);
    info!(%jwks_url, "configuring JWKS fetcher");

    let verifier = TokenVerifier::builder(AuthConfig::for_domain(&domain, audience))
        .with_jwks_url(jwks_url)
        .build()
        .await
        .map_err(anyhow::Error::from)?;
    info!("token verifier initialised");
    Ok(Arc::new(verifier))
}
