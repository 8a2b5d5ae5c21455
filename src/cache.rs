// ==========================================
// 跨境电商业务分析引擎 - 结果缓存
// ==========================================
// 职责: 分析结果的 TTL 内存缓存 (引擎本身无状态,
//       缓存由编排层按参数派生键显式使用)
// 红线: 缓存值为 JSON 值, 引擎不关心键的构造规则
// ==========================================

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

// 各类分析结果的建议 TTL
pub const TTL_HEALTH: Duration = Duration::from_secs(5 * 60);
pub const TTL_INSIGHTS: Duration = Duration::from_secs(10 * 60);
pub const TTL_CUBE: Duration = Duration::from_secs(30 * 60);
pub const TTL_DECOMPOSITION: Duration = Duration::from_secs(15 * 60);

// ==========================================
// 缓存接口 (Analytics Cache)
// ==========================================
pub trait AnalyticsCache: Send + Sync {
    /// 读取未过期的缓存值
    fn get(&self, key: &str) -> Option<Value>;
    /// 写入缓存值, ttl 缺省用实现方的默认 TTL
    fn set(&self, key: &str, value: Value, ttl: Option<Duration>);
    /// 按键前缀失效, 返回删除条数
    fn invalidate(&self, prefix: &str) -> usize;
    fn clear(&self);
}

// ==========================================
// 缓存配置 (Cache Config)
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    pub default_ttl: Duration,
    pub max_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(10 * 60),
            max_size: 100,
        }
    }
}

// ==========================================
// 内存缓存 (Memory Cache)
// ==========================================
struct CacheEntry {
    value: Value,
    created_at: Instant,
    expires_at: Instant,
}

/// 进程内 TTL 缓存, 容量满时淘汰最早写入的条目
pub struct MemoryCache {
    config: CacheConfig,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl AnalyticsCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                tracing::debug!(key, "缓存命中");
                Some(entry.value.clone())
            }
            Some(_) => {
                // 过期条目读取时顺带清除
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, value: Value, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.config.default_ttl);
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();

        if entries.len() >= self.config.max_size && !entries.contains_key(key) {
            // 淘汰最早写入的条目
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.created_at)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                created_at: now,
                expires_at: now + ttl,
            },
        );
        tracing::debug!(key, ttl_secs = ttl.as_secs(), "缓存写入");
    }

    fn invalidate(&self, prefix: &str) -> usize {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - entries.len();
        tracing::debug!(prefix, removed, "缓存失效");
        removed
    }

    fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

/// 参数派生缓存键: 前缀 + 排序后的参数对
pub fn cache_key(prefix: &str, params: &[(&str, &str)]) -> String {
    let mut sorted: Vec<(&str, &str)> = params.to_vec();
    sorted.sort_unstable();
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    if joined.is_empty() {
        prefix.to_string()
    } else {
        format!("{}:{}", prefix, joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_get_roundtrip() {
        let cache = MemoryCache::default();
        cache.set("health:2026-03", json!({"overall": 82.0}), None);
        assert_eq!(
            cache.get("health:2026-03"),
            Some(json!({"overall": 82.0}))
        );
        assert_eq!(cache.get("health:2026-04"), None);
    }

    #[test]
    fn test_expired_entry_not_returned() {
        let cache = MemoryCache::default();
        cache.set("k", json!(1), Some(Duration::from_secs(0)));
        assert_eq!(cache.get("k"), None);
        // 过期条目被顺带清除
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_by_prefix() {
        let cache = MemoryCache::default();
        cache.set("cube:a", json!(1), None);
        cache.set("cube:b", json!(2), None);
        cache.set("health:a", json!(3), None);

        assert_eq!(cache.invalidate("cube:"), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("health:a").is_some());
    }

    #[test]
    fn test_eviction_at_capacity() {
        let cache = MemoryCache::new(CacheConfig {
            default_ttl: Duration::from_secs(60),
            max_size: 2,
        });
        cache.set("first", json!(1), None);
        cache.set("second", json!(2), None);
        cache.set("third", json!(3), None);

        assert_eq!(cache.len(), 2);
        // 最早写入的条目被淘汰
        assert_eq!(cache.get("first"), None);
        assert!(cache.get("third").is_some());
    }

    #[test]
    fn test_cache_key_is_order_insensitive() {
        let a = cache_key("cube", &[("dims", "country"), ("metric", "gmv")]);
        let b = cache_key("cube", &[("metric", "gmv"), ("dims", "country")]);
        assert_eq!(a, b);
        assert_eq!(cache_key("health", &[]), "health");
    }
}
