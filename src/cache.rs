use moka::sync::Cache;
use serde_json::Value;
use std::time::Duration;

/// Most rendered pages kept at once; the least used go first.
pub const MAX_CACHED_PAGES: u64 = 1_000;

/// Rendered pages kept for a fixed time after they were first built.
/// A zero TTL turns caching off.
pub struct PageCache {
    pages: Option<Cache<String, Value>>,
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        PageCache::with_capacity(ttl, MAX_CACHED_PAGES)
    }

    pub fn with_capacity(ttl: Duration, max_pages: u64) -> Self {
        let pages = if ttl.is_zero() {
            None
        } else {
            Some(
                Cache::builder()
                    .max_capacity(max_pages)
                    .time_to_live(ttl)
                    .build(),
            )
        };
        PageCache { pages }
    }

    /// Key of page `number` of the listing `route`.
    pub fn key(route: &str, number: i64) -> String {
        format!("{}:{}", route, number)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.pages.as_ref()?.get(key)
    }

    pub fn insert(&self, key: String, page: Value) {
        if let Some(pages) = &self.pages {
            pages.insert(key, page);
        }
    }

    pub fn clear(&self) {
        if let Some(pages) = &self.pages {
            pages.invalidate_all();
        }
    }

    pub fn entry_count(&self) -> u64 {
        match &self.pages {
            Some(pages) => {
                pages.run_pending_tasks();
                pages.entry_count()
            }
            None => 0,
        }
    }
}
