//! 预置限流策略
//!
//! | 策略 | 窗口 | 上限 | 计数维度 |
//! |---|---|---|---|
//! | auth | 15 分钟 | 5 | IP，成功请求不计数 |
//! | api | 15 分钟 | 100 | 用户，匿名时用 IP |
//! | upload | 60 分钟 | 10 | 用户，匿名时用 IP |
//! | ai | 60 秒 | 20 | 用户，匿名时用 IP |

use std::sync::Arc;
use std::time::Duration;

use axum::extract::Request;

use super::{CallerId, RateLimitOptions, RateLimiter};
use crate::{cache::CacheStore, error::ConfigError, utils::client_ip};

/// 按用户计数的键，匿名请求回退到 IP
pub fn caller_or_ip(namespace: &str, req: &Request) -> String {
    match CallerId::of(req) {
        Some(user_id) => format!("{}:{}", namespace, user_id),
        None => format!("{}:{}", namespace, client_ip(req)),
    }
}

pub fn auth_rate_limit(store: Arc<dyn CacheStore>) -> Result<RateLimiter, ConfigError> {
    let options = RateLimitOptions::new(Duration::from_secs(15 * 60), 5)
        .key_generator(|req: &Request| format!("auth:{}", client_ip(req)))
        .skip_successful_requests(true);
    RateLimiter::new(store, options)
}

pub fn api_rate_limit(store: Arc<dyn CacheStore>) -> Result<RateLimiter, ConfigError> {
    let options = RateLimitOptions::new(Duration::from_secs(15 * 60), 100)
        .key_generator(|req: &Request| caller_or_ip("api", req));
    RateLimiter::new(store, options)
}

pub fn upload_rate_limit(store: Arc<dyn CacheStore>) -> Result<RateLimiter, ConfigError> {
    let options = RateLimitOptions::new(Duration::from_secs(60 * 60), 10)
        .key_generator(|req: &Request| caller_or_ip("upload", req));
    RateLimiter::new(store, options)
}

pub fn ai_rate_limit(store: Arc<dyn CacheStore>) -> Result<RateLimiter, ConfigError> {
    let options = RateLimitOptions::new(Duration::from_secs(60), 20)
        .key_generator(|req: &Request| caller_or_ip("ai", req));
    RateLimiter::new(store, options)
}
