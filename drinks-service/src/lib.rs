pub mod api_error;
pub mod app_state;
pub mod drink_handlers;
pub mod routes;

pub use api_error::ApiError;
pub use app_state::AppState;
pub use routes::router;
