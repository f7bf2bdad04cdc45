use axum::http::StatusCode;
use axum::response::IntoResponse;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Db(sqlx::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Insufficient quantity: available {available}, requested {requested}")]
    InsufficientQuantity { available: f64, requested: f64 },
    #[error("Upstream provider unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("No price source available: {0}")]
    PriceUnavailable(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AppError::InsufficientQuantity { .. } => {
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            AppError::UpstreamUnavailable(msg) => (StatusCode::BAD_GATEWAY, msg).into_response(),
            AppError::PriceUnavailable(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, msg).into_response()
            }
            AppError::Db(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(value: sqlx::Error) -> Self {
        AppError::Db(value)
    }
}
