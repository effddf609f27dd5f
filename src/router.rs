use std::sync::Arc;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
};

use crate::{
    AppState,
    error::ConfigError,
    middleware::{
        CacheInvalidator, CacheOptions, ResponseCache, cache_response, identify_caller,
        invalidate_cache, log_errors, policies, rate_limit,
    },
    routes,
};

// 条目相关的路由：读请求走缓存，写请求成功后清除当前用户的条目缓存
fn item_routes(state: &AppState) -> Result<Router<AppState>, ConfigError> {
    let config = &state.config;
    let timeout = config.store_timeout();

    let limiter =
        Arc::new(policies::api_rate_limit(state.store.clone())?.with_store_timeout(timeout));

    let cache = Arc::new(
        ResponseCache::new(
            state.store.clone(),
            CacheOptions::default()
                .ttl(config.cache_ttl())
                .max_body_bytes(config.cache_max_body_bytes),
        )?
        .with_store_timeout(timeout),
    );

    let invalidator = Arc::new(
        CacheInvalidator::new(
            state.store.clone(),
            format!("cache:GET:{}/items*:userId", config.api_base_uri),
        )
        .with_store_timeout(timeout),
    );

    let cached = from_fn_with_state(cache, cache_response);
    let invalidating = from_fn_with_state(invalidator, invalidate_cache);

    Ok(Router::new()
        .route(
            "/items",
            get(routes::item::list_items)
                .layer(cached.clone())
                .merge(post(routes::item::create_item).layer(invalidating.clone())),
        )
        .route(
            "/items/{item_id}",
            get(routes::item::get_item)
                .layer(cached)
                .merge(delete(routes::item::delete_item).layer(invalidating)),
        )
        .route_layer(from_fn_with_state(limiter, rate_limit)))
}

// 登录相关的路由
fn auth_routes(state: &AppState) -> Result<Router<AppState>, ConfigError> {
    let limiter = Arc::new(
        policies::auth_rate_limit(state.store.clone())?
            .with_store_timeout(state.config.store_timeout()),
    );

    Ok(Router::new()
        .route("/auth/token", post(routes::auth::issue_token))
        .route_layer(from_fn_with_state(limiter, rate_limit)))
}

/// 创建主路由
///
/// 每个请求依次经过：身份识别 → 限流 → 缓存查询 → 处理器 → 缓存写入/失效。
pub fn build_app(state: AppState) -> Result<Router, ConfigError> {
    let api = Router::new()
        .merge(item_routes(&state)?)
        .merge(auth_routes(&state)?)
        .layer(from_fn_with_state(state.clone(), identify_caller));

    let router = Router::new()
        .route("/health", get(routes::health))
        .nest(&state.config.api_base_uri, api)
        .layer(from_fn(log_errors));

    Ok(router.with_state(state))
}
