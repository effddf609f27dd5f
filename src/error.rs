use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug)]
pub enum AppError {
    Unauthorized,
    TooManyRequests { retry_after: u64 },
    NotFound,
    Validation(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    #[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, retry_after) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string(), None),
            AppError::TooManyRequests { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests".to_string(),
                Some(retry_after),
            ),
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string(), None),
            AppError::Validation(message) => (StatusCode::BAD_REQUEST, message, None),
        };

        let body = Json(ErrorResponse {
            success: false,
            error,
            retry_after,
        });

        (status, body).into_response()
    }
}

/// 中间件构造时的配置错误，在装配阶段返回，不会出现在请求路径上
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("max must be greater than zero")]
    ZeroMax,
    #[error("window must be at least one millisecond")]
    ZeroWindow,
    #[error("cache ttl must be at least one second")]
    ZeroTtl,
}
