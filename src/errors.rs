use axum::http::StatusCode;
use axum::response::IntoResponse;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Provider error: {0}")]
    Provider(String),
    #[error("Operation timed out")]
    Timeout,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Recoverable errors may be retried as-is; the rest need corrected
    /// input or a state re-check before the caller tries again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Provider(_) | AppError::Timeout)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AppError::InvalidState(msg) => (StatusCode::CONFLICT, msg).into_response(),
            AppError::Provider(msg) => (StatusCode::BAD_GATEWAY, msg).into_response(),
            AppError::Timeout => {
                (StatusCode::GATEWAY_TIMEOUT, "Operation timed out").into_response()
            }
            AppError::Db(_) | AppError::Io(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}
