use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{info, warn};

use super::CallerId;
use crate::cache::{CacheStore, keys, with_timeout};

const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(2);

/// 写操作成功后按模式删除相关缓存
///
/// 模式是 glob，`:userId` 会替换成当前用户的缓存键后缀。删除在后台进行，
/// 不影响响应，失败只记录日志。
pub struct CacheInvalidator {
    store: Arc<dyn CacheStore>,
    pattern: String,
    store_timeout: Duration,
}

impl CacheInvalidator {
    pub fn new(store: Arc<dyn CacheStore>, pattern: impl Into<String>) -> Self {
        Self {
            store,
            pattern: pattern.into(),
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub async fn serve(self: Arc<Self>, req: Request, next: Next) -> Response {
        let pattern = keys::resolve_pattern(&self.pattern, CallerId::of(&req));

        let response = next.run(req).await;

        if response.status().is_success() {
            let store = self.store.clone();
            let timeout = self.store_timeout;
            tokio::spawn(async move {
                match with_timeout(timeout, store.delete_pattern(&pattern)).await {
                    Ok(removed) => info!("cache invalidated: {} ({} keys)", pattern, removed),
                    Err(e) => warn!("Failed to invalidate cache for {}: {}", pattern, e),
                }
            });
        }

        response
    }
}

pub async fn invalidate_cache(
    State(invalidator): State<Arc<CacheInvalidator>>,
    req: Request,
    next: Next,
) -> Response {
    invalidator.serve(req, next).await
}
