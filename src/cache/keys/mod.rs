/// 缓存键模块
/// 限流计数键和响应缓存键的生成规则

/// 限流计数键前缀
pub const RATE_LIMIT_PREFIX: &str = "rate_limit:";

/// 响应缓存键前缀
pub const CACHE_PREFIX: &str = "cache:";

/// 失效模式中代表当前用户的占位符
pub const USER_PLACEHOLDER: &str = ":userId";

/// 生成限流计数键
pub fn rate_limit_key(bucket: &str) -> String {
    format!("{}{}", RATE_LIMIT_PREFIX, bucket)
}

/// 生成响应缓存基础键，`original_url` 包含查询字符串
///
/// URL 部分经过 [`escape_url`] 处理，不含 `:`，所以键里 URL 之后的第一个 `:`
/// 一定是 [`scope_to_caller`] 追加的用户后缀。
pub fn response_cache_key(method: &str, original_url: &str) -> String {
    format!("{}{}:{}", CACHE_PREFIX, method, escape_url(original_url))
}

/// 对 `%` 和 `:` 做百分号编码
///
/// 失效模式里的 URL 部分如果包含这两个字符，也要写成编码后的形式。
pub fn escape_url(url: &str) -> String {
    let mut escaped = String::with_capacity(url.len());
    for c in url.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            ':' => escaped.push_str("%3A"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// 按用户隔离缓存键，匿名请求保持原样
pub fn scope_to_caller(base_key: String, caller: Option<&str>) -> String {
    match caller {
        Some(user_id) => format!("{}:user:{}", base_key, user_id),
        None => base_key,
    }
}

/// 把失效模式中的 `:userId` 换成当前用户的缓存键后缀
///
/// 有用户时替换为 `:user:<id>`，与 [`scope_to_caller`] 生成的后缀一致；
/// 匿名请求直接去掉占位符，只匹配未按用户隔离的键。
pub fn resolve_pattern(pattern: &str, caller: Option<&str>) -> String {
    let replacement = caller
        .map(|user_id| format!(":user:{}", user_id))
        .unwrap_or_default();
    pattern.replace(USER_PLACEHOLDER, &replacement)
}
