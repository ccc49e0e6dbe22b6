use axum::handler::Handler;
use axum::routing::get;
use axum::Router;
use common_auth::RequireScope;

use crate::app_state::AppState;
use crate::drink_handlers::{
    create_drink, delete_drink, list_drinks, list_drinks_detail, update_drink, SCOPE_CREATE,
    SCOPE_DELETE, SCOPE_READ_DETAIL, SCOPE_UPDATE,
};

async fn health() -> &'static str {
    "ok"
}

/// Scope gates are bound here, per handler, via [`RequireScope`]; a
/// protected handler cannot be reached without its pipeline having run.
pub fn router(state: AppState) -> Router {
    let verifier = state.verifier.clone();

    Router::new()
        .route("/healthz", get(health))
        .route(
            "/drinks",
            get(list_drinks)
                .post(create_drink.layer(RequireScope::new(verifier.clone(), SCOPE_CREATE))),
        )
        .route(
            "/drinks-detail",
            get(list_drinks_detail.layer(RequireScope::new(verifier.clone(), SCOPE_READ_DETAIL))),
        )
        .route(
            "/drinks/:id",
            axum::routing::patch(
                update_drink.layer(RequireScope::new(verifier.clone(), SCOPE_UPDATE)),
            )
            .delete(delete_drink.layer(RequireScope::new(verifier, SCOPE_DELETE))),
        )
        .with_state(state)
}
