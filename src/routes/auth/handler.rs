use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    error::AppError,
    utils::{generate_token, success_to_api_response},
};

use super::model::{TokenRequest, TokenResponse};

/// 签发访问令牌
///
/// 挂在登录限流之后，只有失败的请求计入配额。
#[axum::debug_handler]
pub async fn issue_token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> Result<Response, AppError> {
    // 检查用户ID格式
    if req.user_id.is_empty() || !req.user_id.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(AppError::Validation(
            "user_id may only contain letters, digits and underscores".into(),
        ));
    }

    match generate_token(&req.user_id, &state.config) {
        Ok((token, expires_at)) => Ok(success_to_api_response(TokenResponse {
            user_id: req.user_id,
            token,
            expires_at,
        })
        .into_response()),
        Err(e) => {
            tracing::error!("Failed to sign token: {}", e);
            Ok(StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
    }
}
