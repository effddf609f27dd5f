/// 键值存储抽象
/// 限流计数和响应缓存共用同一个存储，通过键前缀区分
mod memory;
mod redis_store;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// 中间件依赖的存储操作，每个操作只涉及一个键（按模式删除除外）
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// 原子自增，键不存在时以 `ttl_secs` 为过期时间创建，返回自增后的值
    async fn incr_with_ttl(&self, key: &str, ttl_secs: u64) -> Result<i64, StoreError>;

    /// 键存在时自减并保留原有过期时间，键不存在时不做任何事并返回 0
    async fn decr(&self, key: &str) -> Result<i64, StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError>;

    /// 删除所有匹配 glob 模式的键，返回删除数量
    ///
    /// 语法与 Redis `SCAN MATCH` 相同：`*`、`?`、`[...]`（含 `^` 取反和 `a-z` 范围）以及 `\` 转义。
    async fn delete_pattern(&self, pattern: &str) -> Result<usize, StoreError>;
}

/// 为存储调用加上超时，超时视为存储不可用
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}
