use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

use crate::{AppState, error::AppError, utils::verify_token};

/// 经过认证的调用方身份，由 [`identify_caller`] 写入请求扩展
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerId(pub String);

impl CallerId {
    pub fn of<B>(req: &axum::http::Request<B>) -> Option<&str> {
        req.extensions().get::<CallerId>().map(|c| c.0.as_str())
    }
}

// 处理器中要求已认证时直接提取 `CallerId`，允许匿名时提取 `Option<CallerId>`
impl<S: Send + Sync> FromRequestParts<S> for CallerId {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerId>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

impl<S: Send + Sync> OptionalFromRequestParts<S> for CallerId {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<CallerId>().cloned())
    }
}

/// 识别调用方
///
/// 携带有效 Bearer token 时写入 [`CallerId`]；没有 token 时以匿名身份继续；
/// token 无效时返回 401。
pub async fn identify_caller(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = req.headers().typed_get::<Authorization<Bearer>>();

    if let Some(Authorization(bearer)) = bearer {
        let claims = verify_token(bearer.token(), &state.config).map_err(|e| {
            tracing::debug!("token rejected: {}", e);
            AppError::Unauthorized
        })?;
        req.extensions_mut().insert(CallerId(claims.sub));
    }

    Ok(next.run(req).await)
}
