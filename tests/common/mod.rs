#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{Body, to_bytes},
    extract::Request,
    http::{Method, Response},
    middleware::Next,
    response::Response as AxumResponse,
};
use request_shaper::{
    cache::{CacheStore, StoreError},
    middleware::CallerId,
};
use serde_json::Value;

/// 所有操作都失败的存储
pub struct UnreachableStore;

#[async_trait]
impl CacheStore for UnreachableStore {
    async fn incr_with_ttl(&self, _key: &str, _ttl_secs: u64) -> Result<i64, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn decr(&self, _key: &str) -> Result<i64, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn set_ex(&self, _key: &str, _value: &str, _ttl_secs: u64) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn delete_pattern(&self, _pattern: &str) -> Result<usize, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

/// 每个操作都挂起很久的存储
pub struct HangingStore;

#[async_trait]
impl CacheStore for HangingStore {
    async fn incr_with_ttl(&self, _key: &str, _ttl_secs: u64) -> Result<i64, StoreError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(1)
    }

    async fn decr(&self, _key: &str) -> Result<i64, StoreError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(0)
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(None)
    }

    async fn set_ex(&self, _key: &str, _value: &str, _ttl_secs: u64) -> Result<(), StoreError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }

    async fn delete_pattern(&self, _pattern: &str) -> Result<usize, StoreError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(0)
    }
}

/// 统计处理器调用次数
#[derive(Clone, Default)]
pub struct Calls(Arc<AtomicUsize>);

impl Calls {
    pub fn bump(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// 测试用身份中间件：把 `x-user-id` 请求头当作已认证身份
pub async fn fake_auth(mut req: Request, next: Next) -> AxumResponse {
    let user = req
        .headers()
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    if let Some(user) = user {
        req.extensions_mut().insert(CallerId(user));
    }
    next.run(req).await
}

pub fn request(method: Method, uri: &str) -> Request {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-real-ip", "1.2.3.4")
        .body(Body::empty())
        .unwrap()
}

pub fn request_as(method: Method, uri: &str, user: &str) -> Request {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-real-ip", "1.2.3.4")
        .header("x-user-id", user)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// 等待后台的缓存写入和失效任务完成
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}
