use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{OriginalUri, Request, State},
    http::{Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use super::{CallerId, intercept::capture_json};
use crate::{
    cache::{CacheStore, keys, with_timeout},
    error::ConfigError,
};

/// 计算缓存基础键，用户后缀由中间件追加
pub type CacheKeyGenerator = Arc<dyn Fn(&Request) -> String + Send + Sync>;

/// 判断请求是否走缓存
pub type CacheCondition = Arc<dyn Fn(&Request) -> bool + Send + Sync>;

const DEFAULT_TTL: Duration = Duration::from_secs(300);
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(2);

/// 默认缓存键：`cache:<METHOD>:<原始URL>`，嵌套路由下仍使用完整路径，URL 中的 `:` 会被编码
pub fn default_cache_key(req: &Request) -> String {
    let uri = req
        .extensions()
        .get::<OriginalUri>()
        .map(|o| &o.0)
        .unwrap_or_else(|| req.uri());
    let url = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    keys::response_cache_key(req.method().as_str(), url)
}

#[derive(Clone)]
pub struct CacheOptions {
    pub ttl: Duration,
    pub key_generator: CacheKeyGenerator,
    pub condition: CacheCondition,
    pub max_body_bytes: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            key_generator: Arc::new(default_cache_key),
            condition: Arc::new(|req: &Request| req.method() == Method::GET),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl CacheOptions {
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn key_generator<F>(mut self, f: F) -> Self
    where
        F: Fn(&Request) -> String + Send + Sync + 'static,
    {
        self.key_generator = Arc::new(f);
        self
    }

    pub fn condition<F>(mut self, f: F) -> Self
    where
        F: Fn(&Request) -> bool + Send + Sync + 'static,
    {
        self.condition = Arc::new(f);
        self
    }

    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }
}

/// 读穿透响应缓存
///
/// 命中时直接返回缓存的 JSON，未命中时调用处理器，并在后台把 2xx JSON 响应写入存储。
/// 调用方在未命中时收到的永远是处理器自己的响应。
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    options: CacheOptions,
    store_timeout: Duration,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CacheStore>, options: CacheOptions) -> Result<Self, ConfigError> {
        if options.ttl.as_secs() == 0 {
            return Err(ConfigError::ZeroTtl);
        }

        Ok(Self {
            store,
            options,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        })
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// 本次请求对应的最终缓存键
    pub fn key_for(&self, req: &Request) -> String {
        let base = (self.options.key_generator)(req);
        keys::scope_to_caller(base, CallerId::of(req))
    }

    pub async fn serve(self: Arc<Self>, req: Request, next: Next) -> Response {
        if !(self.options.condition)(&req) {
            return next.run(req).await;
        }

        let key = self.key_for(&req);

        match with_timeout(self.store_timeout, self.store.get(&key)).await {
            Ok(Some(body)) => {
                info!("cache HIT: {}", key);
                return (
                    StatusCode::OK,
                    [(header::CONTENT_TYPE, "application/json")],
                    body,
                )
                    .into_response();
            }
            Ok(None) => info!("cache MISS: {}", key),
            Err(e) => warn!("Cache lookup failed for {}, treating as miss: {}", key, e),
        }

        let response = next.run(req).await;
        let (response, captured) = capture_json(response, self.options.max_body_bytes).await;

        if let Some(body) = captured {
            match String::from_utf8(body.to_vec()) {
                Ok(body) => self.spawn_store(key, body),
                Err(_) => warn!("Response for {} is not valid UTF-8, not cached", key),
            }
        }

        response
    }

    fn spawn_store(&self, key: String, body: String) {
        let store = self.store.clone();
        let ttl = self.options.ttl.as_secs();
        let timeout = self.store_timeout;

        tokio::spawn(async move {
            if let Err(e) = with_timeout(timeout, store.set_ex(&key, &body, ttl)).await {
                warn!("Failed to cache response for {}: {}", key, e);
            }
        });
    }
}

pub async fn cache_response(
    State(cache): State<Arc<ResponseCache>>,
    req: Request,
    next: Next,
) -> Response {
    cache.serve(req, next).await
}
