use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{CacheStore, StoreError};

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

impl MemoryEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// 每写入这么多次清理一遍过期键
const SWEEP_EVERY: u64 = 256;

/// 进程内存储，用于测试和单实例部署
///
/// 过期时间基于 `tokio::time::Instant`，测试里可以用暂停的时钟推进窗口。
/// 所有操作在同一把锁内完成，因此自增是原子的。
/// 写入新键时每 [`SWEEP_EVERY`] 次顺带清掉过期的键，不再访问的限流键不会一直占内存。
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, MemoryEntry>>,
    writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前仍然有效的键数量
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries.values().filter(|e| e.is_live(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn sweep_due(&self) -> bool {
        self.writes.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1
    }

    /// 剩余存活时间，键不存在或已过期时返回 None
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.expires_at - now)
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn incr_with_ttl(&self, key: &str, ttl_secs: u64) -> Result<i64, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        if let Some(entry) = entries.get_mut(key).filter(|e| e.is_live(now)) {
            let count = parse_counter(key, &entry.value)? + 1;
            entry.value = count.to_string();
            return Ok(count);
        }

        if self.sweep_due() {
            entries.retain(|_, e| e.is_live(now));
        }
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: "1".to_string(),
                expires_at: now + Duration::from_secs(ttl_secs),
            },
        );
        Ok(1)
    }

    async fn decr(&self, key: &str) -> Result<i64, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        match entries.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                let count = parse_counter(key, &entry.value)? - 1;
                entry.value = count.to_string();
                Ok(count)
            }
            _ => Ok(0),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        let live = entries
            .get(key)
            .map(|e| e.is_live(now).then(|| e.value.clone()));

        match live {
            Some(Some(value)) => Ok(Some(value)),
            Some(None) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let now = Instant::now();
        let expires_at = now + Duration::from_secs(ttl_secs);
        let mut entries = self.entries.lock().await;
        if self.sweep_due() {
            entries.retain(|_, e| e.is_live(now));
        }
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<usize, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        let mut removed = 0usize;
        entries.retain(|key, entry| {
            if !entry.is_live(now) {
                return false;
            }
            if glob_match(pattern, key) {
                removed += 1;
                return false;
            }
            true
        });

        Ok(removed)
    }
}

fn parse_counter(key: &str, value: &str) -> Result<i64, StoreError> {
    value
        .parse::<i64>()
        .map_err(|_| StoreError::Unavailable(format!("value at {} is not an integer", key)))
}

/// Redis 风格的 glob 匹配，支持 `*`、`?`、`[...]` 字符类和 `\` 转义
pub(crate) fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();

    let (mut pi, mut ti) = (0usize, 0usize);
    // 最近一个 `*` 的位置，以及它当时对应的文本位置
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() {
            match p[pi] {
                '*' => {
                    backtrack = Some((pi, ti));
                    pi += 1;
                    continue;
                }
                '?' => {
                    pi += 1;
                    ti += 1;
                    continue;
                }
                '[' => {
                    let (matched, next) = match_class(&p, pi + 1, t[ti]);
                    if matched {
                        pi = next;
                        ti += 1;
                        continue;
                    }
                }
                '\\' if pi + 1 < p.len() && p[pi + 1] == t[ti] => {
                    pi += 2;
                    ti += 1;
                    continue;
                }
                c if c != '\\' && c == t[ti] => {
                    pi += 1;
                    ti += 1;
                    continue;
                }
                _ => {}
            }
        }

        match backtrack {
            Some((star, matched)) => {
                pi = star + 1;
                ti = matched + 1;
                backtrack = Some((star, matched + 1));
            }
            None => return false,
        }
    }

    p[pi..].iter().all(|&c| c == '*')
}

/// 匹配 `[` 之后的字符类，返回是否命中以及 `]` 之后的位置
///
/// 支持 `^` 取反、`a-z` 范围和 `\` 转义；缺少 `]` 时字符类延伸到模式末尾，与 Redis 一致。
fn match_class(p: &[char], mut i: usize, c: char) -> (bool, usize) {
    let negate = p.get(i) == Some(&'^');
    if negate {
        i += 1;
    }

    let mut matched = false;
    while i < p.len() && p[i] != ']' {
        if p[i] == '\\' && i + 1 < p.len() {
            matched |= p[i + 1] == c;
            i += 2;
        } else if i + 2 < p.len() && p[i + 1] == '-' && p[i + 2] != ']' {
            let (lo, hi) = if p[i] <= p[i + 2] {
                (p[i], p[i + 2])
            } else {
                (p[i + 2], p[i])
            };
            matched |= lo <= c && c <= hi;
            i += 3;
        } else {
            matched |= p[i] == c;
            i += 1;
        }
    }
    if i < p.len() {
        i += 1;
    }

    (matched != negate, i)
}
