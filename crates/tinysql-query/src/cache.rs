//! Named cache of compiled queries.
//!
//! Frozen [`Query`] values are kept by name so a statement that is shaped the
//! same way on every call is built and compiled only once.

use std::collections::HashMap;
use std::time::Instant;

use crate::query::Query;
use tinysql_core::Result;

/// A cached query.
#[derive(Debug, Clone)]
pub struct CachedQuery {
    pub query: Query,
    /// When this entry was last accessed.
    pub last_used: Instant,
    /// Number of times this entry has been handed out.
    pub hit_count: u64,
}

/// LRU-style cache of frozen queries.
///
/// When the cache is full the least-recently-used entry is evicted. Callers
/// that share a cache across threads wrap it in their own lock.
///
/// # Example
///
/// ```
/// use tinysql_query::{Builder, QueryCache};
///
/// let mut cache = QueryCache::new(16);
/// let query = cache
///     .get_or_insert("accounts", || {
///         let mut b = Builder::select();
///         let t = b.add_table("Account", None, None);
///         b.add_column(t, "Name", None);
///         b.freeze()
///     })
///     .unwrap();
/// assert!(query.sql().starts_with("SELECT"));
/// assert!(cache.contains("accounts"));
/// ```
#[derive(Debug)]
pub struct QueryCache {
    cache: HashMap<String, CachedQuery>,
    max_size: usize,
}

impl QueryCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            cache: HashMap::with_capacity(max_size.min(256)),
            max_size: max_size.max(1),
        }
    }

    /// Get a cached query and mark it used.
    pub fn get(&mut self, name: &str) -> Option<Query> {
        let entry = self.cache.get_mut(name)?;
        entry.last_used = Instant::now();
        entry.hit_count += 1;
        Some(entry.query.clone())
    }

    /// Get a cached query or build and insert it.
    ///
    /// `build` is only called on a miss; its error is returned and nothing is
    /// cached.
    pub fn get_or_insert(&mut self, name: &str, build: impl FnOnce() -> Result<Query>) -> Result<Query> {
        if let Some(query) = self.get(name) {
            return Ok(query);
        }
        let query = build()?;
        Ok(self.add(name, query))
    }

    /// Insert a query unless the name is taken; returns the cached entry.
    pub fn add(&mut self, name: &str, query: Query) -> Query {
        if let Some(existing) = self.get(name) {
            tracing::trace!(name, "query already cached");
            return existing;
        }
        if self.cache.len() >= self.max_size {
            self.evict_lru();
        }
        self.cache.insert(
            name.to_string(),
            CachedQuery {
                query: query.clone(),
                last_used: Instant::now(),
                hit_count: 0,
            },
        );
        query
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cache.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Query> {
        self.cache.remove(name).map(|entry| entry.query)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    fn evict_lru(&mut self) {
        if let Some(lru) = self
            .cache
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(name, _)| name.clone())
        {
            tracing::debug!(name = %lru, "evicting cached query");
            self.cache.remove(&lru);
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;

    fn query(table: &str) -> Result<Query> {
        let mut b = Builder::select();
        let t = b.add_table(table, None, None);
        b.add_column(t, "Name", None);
        b.freeze()
    }

    #[test]
    fn test_cache_hit() {
        let mut cache = QueryCache::new(10);
        let first = cache.get_or_insert("a", || query("Account")).unwrap();
        let called = std::cell::Cell::new(false);
        let second = cache
            .get_or_insert("a", || {
                called.set(true);
                query("Account")
            })
            .unwrap();
        assert_eq!(first.sql(), second.sql());
        assert!(!called.get());
    }

    #[test]
    fn test_add_keeps_existing_entry() {
        let mut cache = QueryCache::new(10);
        cache.add("q", query("Account").unwrap());
        let kept = cache.add("q", query("Contact").unwrap());
        assert!(kept.sql().contains("Account"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_build_error_is_not_cached() {
        let mut cache = QueryCache::new(10);
        assert!(cache.get_or_insert("bad", || Builder::select().freeze()).is_err());
        assert!(!cache.contains("bad"));
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = QueryCache::new(2);
        cache.add("a", query("A").unwrap());
        std::thread::sleep(std::time::Duration::from_millis(2));
        cache.add("b", query("B").unwrap());
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert!(cache.get("a").is_some());
        std::thread::sleep(std::time::Duration::from_millis(2));
        cache.add("c", query("C").unwrap());

        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cache = QueryCache::new(10);
        cache.add("a", query("A").unwrap());
        cache.add("b", query("B").unwrap());
        assert!(cache.remove("a").is_some());
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
