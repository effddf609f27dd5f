mod auth;
mod cache;
mod error_handler;
mod intercept;
mod invalidate;
pub mod policies;
mod rate_limit;

pub use auth::{CallerId, identify_caller};
pub use cache::{
    CacheCondition, CacheKeyGenerator, CacheOptions, ResponseCache, cache_response,
    default_cache_key,
};
pub use error_handler::log_errors;
pub use intercept::{capture_json, is_json};
pub use invalidate::{CacheInvalidator, invalidate_cache};
pub use rate_limit::{
    HEADER_LIMIT, HEADER_REMAINING, HEADER_RESET, KeyGenerator, LimitHook, RateLimitDecision,
    RateLimitOptions, RateLimiter, rate_limit,
};
