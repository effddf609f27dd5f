// 缓存模块
// 存储抽象与键生成规则，限流器和响应缓存都通过这里访问存储

pub mod keys;
pub mod store;

pub use store::{CacheStore, MemoryStore, RedisStore, StoreError, with_timeout};
