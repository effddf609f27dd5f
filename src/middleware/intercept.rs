use axum::{
    body::{Body, Bytes, HttpBody, to_bytes},
    http::header,
    response::Response,
};
use tracing::error;

/// 处理器发出的响应体是否是 JSON
pub fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/json"))
        .unwrap_or(false)
}

/// 在响应发出前截取 2xx JSON 响应体
///
/// 返回的响应与处理器发出的内容一致；只有状态码在 `[200,300)`、类型为 JSON 且
/// 大小不超过 `limit` 的响应体会被截取，其他情况原样放行。
pub async fn capture_json(response: Response, limit: usize) -> (Response, Option<Bytes>) {
    if !response.status().is_success() || !is_json(&response) {
        return (response, None);
    }

    match response.body().size_hint().upper() {
        Some(upper) if upper <= limit as u64 => {}
        _ => return (response, None),
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, limit).await {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to read response body for capture: {}", e);
            parts.headers.remove(header::CONTENT_LENGTH);
            return (Response::from_parts(parts, Body::empty()), None);
        }
    };

    (Response::from_parts(parts, Body::from(bytes.clone())), Some(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, http::StatusCode, response::IntoResponse};
    use serde_json::json;

    #[tokio::test]
    async fn captures_successful_json_and_keeps_body() {
        let response = Json(json!({"ok": true})).into_response();

        let (response, captured) = capture_json(response, 1024).await;

        let captured = captured.expect("body captured");
        assert_eq!(&captured[..], br#"{"ok":true}"#);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(body, captured);
    }

    #[tokio::test]
    async fn skips_errors_plain_text_and_oversized_bodies() {
        let not_found = (StatusCode::NOT_FOUND, Json(json!({"error": "nope"}))).into_response();
        let (response, captured) = capture_json(not_found, 1024).await;
        assert!(captured.is_none());
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let text = "hello".into_response();
        assert!(capture_json(text, 1024).await.1.is_none());

        let large = Json(json!({"data": "x".repeat(64)})).into_response();
        let (response, captured) = capture_json(large, 16).await;
        assert!(captured.is_none());
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert!(body.len() > 64);
    }
}
