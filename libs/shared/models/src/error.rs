use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    #[error("Invalid signature: {0}")]
    Auth(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl AppError {
    /// Machine-readable reason the widget keys its messages off.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) | AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::RateLimited { .. } => "RATE_LIMIT_EXCEEDED",
            AppError::VerificationFailed(_) => "VERIFICATION_FAILED",
            AppError::Auth(_) => "INVALID_SIGNATURE",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "SLOT_ALREADY_BOOKED",
            AppError::Database(_) | AppError::Internal(_) => "SERVER_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::VerificationFailed(_) => StatusCode::FORBIDDEN,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self {
            AppError::BadRequest(msg)
            | AppError::ValidationError(msg)
            | AppError::VerificationFailed(msg)
            | AppError::Auth(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => {
                tracing::info!("Rejected request: {}: {}", status, msg);
                msg.clone()
            }
            AppError::RateLimited { .. } => {
                tracing::info!("Rejected request: {}", self);
                "Too many reservation attempts, please wait before trying again".to_string()
            }
            AppError::Database(msg) | AppError::Internal(msg) => {
                tracing::error!("Error: {}: {}", status, msg);
                "Internal server error".to_string()
            }
        };

        let body = Json(json!({
            "success": false,
            "error": self.code(),
            "message": message
        }));

        let mut response = (status, body).into_response();

        if let AppError::RateLimited { retry_after_secs } = self {
            let headers = response.headers_mut();
            headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
            headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        }

        response
    }
}
