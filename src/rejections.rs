use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug)]
pub enum AppError {
    Validation(String),
    Unauthorized,
    AuthMismatch,
    NotFound,
    Internal,
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED".to_string()),
            AppError::AuthMismatch => (
                StatusCode::FORBIDDEN,
                "user id does not match authenticated user".to_string(),
            ),
            AppError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND".to_string()),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR".to_string(),
            ),
        };

        (
            code,
            Json(ErrorBody {
                success: false,
                error: message,
            }),
        )
            .into_response()
    }
}

/// Log the underlying error with context and hide it behind an opaque 500.
pub trait ResultExt<T> {
    fn reject(self, context: &str) -> Result<T, AppError>;
}

impl<T> ResultExt<T> for color_eyre::Result<T> {
    fn reject(self, context: &str) -> Result<T, AppError> {
        self.map_err(|e| {
            tracing::error!("{context}: {e}");
            AppError::Internal
        })
    }
}
