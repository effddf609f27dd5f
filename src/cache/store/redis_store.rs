use std::sync::Arc;

use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient, Script};

use super::{CacheStore, StoreError};

// INCR 和 EXPIRE 放在同一个脚本里，避免首个请求设置过期时间前进程退出导致计数永不过期
const INCR_WITH_TTL: &str = r#"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return count
"#;

// DECR 不会改变 TTL；键已过期时不能再创建一个没有过期时间的负数计数
const DECR_IF_EXISTS: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
    return redis.call('DECR', KEYS[1])
end
return 0
"#;

const SCAN_BATCH: usize = 200;

/// 基于 Redis 的存储实现
#[derive(Clone)]
pub struct RedisStore {
    redis: Arc<RedisClient>,
    incr_script: Arc<Script>,
    decr_script: Arc<Script>,
}

impl RedisStore {
    pub fn new(redis: Arc<RedisClient>) -> Self {
        Self {
            redis,
            incr_script: Arc::new(Script::new(INCR_WITH_TTL)),
            decr_script: Arc::new(Script::new(DECR_IF_EXISTS)),
        }
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn incr_with_ttl(&self, key: &str, ttl_secs: u64) -> Result<i64, StoreError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let count: i64 = self
            .incr_script
            .key(key)
            .arg(ttl_secs)
            .invoke_async(&mut conn)
            .await?;
        Ok(count)
    }

    async fn decr(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let count: i64 = self.decr_script.key(key).invoke_async(&mut conn).await?;
        Ok(count)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let result: Option<String> = conn.get(key).await?;
        Ok(result)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<usize, StoreError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        // 用 SCAN 代替 KEYS，避免大键空间时阻塞 Redis
        let mut cursor: u64 = 0;
        let mut removed = 0usize;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .cursor_arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let n: usize = conn.del(&keys).await?;
                removed += n;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(removed)
    }
}
