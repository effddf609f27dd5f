use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{info, warn};

use crate::{
    cache::{CacheStore, StoreError, keys, with_timeout},
    error::{AppError, ConfigError},
    utils::client_ip,
};

/// 从请求计算限流桶名，结果会拼在 `rate_limit:` 之后
pub type KeyGenerator = Arc<dyn Fn(&Request) -> String + Send + Sync>;

/// 请求被拒绝前调用的回调
pub type LimitHook = Arc<dyn Fn(&Request) + Send + Sync>;

const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(2);

pub const HEADER_LIMIT: &str = "x-ratelimit-limit";
pub const HEADER_REMAINING: &str = "x-ratelimit-remaining";
pub const HEADER_RESET: &str = "x-ratelimit-reset";

#[derive(Clone)]
pub struct RateLimitOptions {
    pub window: Duration,
    pub max: u32,
    pub key_generator: KeyGenerator,
    /// 2xx 响应不计入配额
    pub skip_successful_requests: bool,
    /// 4xx/5xx 响应不计入配额
    pub skip_failed_requests: bool,
    pub on_limit_reached: Option<LimitHook>,
}

impl RateLimitOptions {
    /// 默认按客户端IP计数
    pub fn new(window: Duration, max: u32) -> Self {
        Self {
            window,
            max,
            key_generator: Arc::new(|req: &Request| client_ip(req)),
            skip_successful_requests: false,
            skip_failed_requests: false,
            on_limit_reached: None,
        }
    }

    pub fn key_generator<F>(mut self, f: F) -> Self
    where
        F: Fn(&Request) -> String + Send + Sync + 'static,
    {
        self.key_generator = Arc::new(f);
        self
    }

    pub fn skip_successful_requests(mut self, skip: bool) -> Self {
        self.skip_successful_requests = skip;
        self
    }

    pub fn skip_failed_requests(mut self, skip: bool) -> Self {
        self.skip_failed_requests = skip;
        self
    }

    pub fn on_limit_reached<F>(mut self, f: F) -> Self
    where
        F: Fn(&Request) + Send + Sync + 'static,
    {
        self.on_limit_reached = Some(Arc::new(f));
        self
    }
}

/// 单次计数的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub count: i64,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    fn apply_headers(&self, headers: &mut HeaderMap) {
        headers.insert(HEADER_LIMIT, HeaderValue::from(self.limit));
        headers.insert(HEADER_REMAINING, HeaderValue::from(self.remaining));
        let reset = self.reset_at.to_rfc3339_opts(SecondsFormat::Millis, true);
        if let Ok(value) = HeaderValue::from_str(&reset) {
            headers.insert(HEADER_RESET, value);
        }
    }
}

/// 固定窗口限流器
///
/// 计数保存在外部存储中，窗口长度就是计数键的过期时间。多个请求并发时只依赖
/// 存储的原子自增，进程内不持有任何锁。
pub struct RateLimiter {
    store: Arc<dyn CacheStore>,
    options: RateLimitOptions,
    store_timeout: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CacheStore>, options: RateLimitOptions) -> Result<Self, ConfigError> {
        if options.max == 0 {
            return Err(ConfigError::ZeroMax);
        }
        if options.window.as_millis() == 0 {
            return Err(ConfigError::ZeroWindow);
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

    pub fn options(&self) -> &RateLimitOptions {
        &self.options
    }

    /// 窗口秒数，向上取整
    pub fn window_seconds(&self) -> u64 {
        self.options.window.as_millis().div_ceil(1000) as u64
    }

    /// 对 `key` 计数一次并判断是否放行
    pub async fn hit(&self, key: &str) -> Result<RateLimitDecision, StoreError> {
        let count = with_timeout(
            self.store_timeout,
            self.store.incr_with_ttl(key, self.window_seconds()),
        )
        .await?;

        let limit = self.options.max;
        let remaining = (i64::from(limit) - count).clamp(0, i64::from(limit)) as u32;
        let reset_at = Utc::now()
            + chrono::Duration::milliseconds(self.options.window.as_millis() as i64);

        Ok(RateLimitDecision {
            allowed: count <= i64::from(limit),
            count,
            limit,
            remaining,
            reset_at,
        })
    }

    /// 响应不计入配额时撤销本次计数
    ///
    /// 作用在同一个计数键上，不会延长或重置窗口。
    async fn refund(&self, key: &str) {
        match with_timeout(self.store_timeout, self.store.decr(key)).await {
            Ok(count) => tracing::debug!("rate limit refunded: {} -> {}", key, count),
            Err(e) => warn!("Failed to refund rate limit for {}: {}", key, e),
        }
    }

    fn should_refund(&self, status: StatusCode) -> bool {
        (self.options.skip_successful_requests && status.is_success())
            || (self.options.skip_failed_requests && status.as_u16() >= 400)
    }

    pub async fn check_rate_limit(self: Arc<Self>, req: Request, next: Next) -> Response {
        let key = keys::rate_limit_key(&(self.options.key_generator)(&req));

        let decision = match self.hit(&key).await {
            Ok(decision) => decision,
            Err(e) => {
                // 存储不可用时放行，不能因为限流器故障阻断流量
                warn!("Rate limiter store error, allowing request: {}", e);
                return next.run(req).await;
            }
        };

        if !decision.allowed {
            info!(
                "rate limit exceeded: {} ({}/{})",
                key, decision.count, decision.limit
            );
            if let Some(hook) = &self.options.on_limit_reached {
                hook(&req);
            }

            let mut response = AppError::TooManyRequests {
                retry_after: self.window_seconds(),
            }
            .into_response();
            decision.apply_headers(response.headers_mut());
            return response;
        }

        let mut response = next.run(req).await;

        if self.should_refund(response.status()) {
            self.refund(&key).await;
        }

        decision.apply_headers(response.headers_mut());
        response
    }
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    limiter.check_rate_limit(req, next).await
}
