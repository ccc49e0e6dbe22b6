use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: u16,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Failures from the CRUD surface. Input errors, missing rows, and server
/// faults stay distinct rather than collapsing into one client error.
#[derive(Debug)]
pub enum ApiError {
    BadRequest {
        code: &'static str,
        message: Option<String>,
    },
    NotFound {
        code: &'static str,
    },
    Conflict {
        code: &'static str,
        message: Option<String>,
    },
    Unprocessable {
        code: &'static str,
        message: Option<String>,
    },
    Internal {
        message: String,
    },
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        Self::Internal {
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest { code, message } => (StatusCode::BAD_REQUEST, code, message),
            ApiError::NotFound { code } => (StatusCode::NOT_FOUND, code, None),
            ApiError::Conflict { code, message } => (StatusCode::CONFLICT, code, message),
            ApiError::Unprocessable { code, message } => {
                (StatusCode::UNPROCESSABLE_ENTITY, code, message)
            }
            ApiError::Internal { message } => {
                // Logged server-side; the detail never reaches the client.
                tracing::error!(%message, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorBody {
            success: false,
            error: status.as_u16(),
            code,
            message,
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
