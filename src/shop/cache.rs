//! Short-lived cache of fetched pages, keyed by query identity

use crate::core::{Cursor, Product, ProductPage, QueryKey};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Pages fetched under one query identity
#[derive(Debug, Clone)]
pub struct CachedQuery {
    pub pages: Vec<ProductPage>,
    pub next: Option<Cursor>,

    /// When the first page was fetched; staleness is measured from here
    pub fetched_at: Instant,
}

impl CachedQuery {
    /// All products of all cached pages, in page order
    pub fn products(&self) -> Vec<Product> {
        self.pages
            .iter()
            .flat_map(|page| page.results.iter().cloned())
            .collect()
    }

    /// Total reported by the most recent page
    pub fn total(&self) -> Option<usize> {
        self.pages.last().map(|page| page.count)
    }
}

/// Query cache shared by every shop page of one application root
///
/// Survives page unmounts so that coming back to the shop within the
/// staleness window shows the previous results without a request.
#[derive(Debug)]
pub struct QueryCache {
    stale_after: Duration,
    entries: Mutex<HashMap<QueryKey, CachedQuery>>,
}

impl QueryCache {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            stale_after,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn stale_after(&self) -> Duration {
        self.stale_after
    }

    /// Cached pages for `key`, if fetched less than `stale_after` ago
    pub fn fresh(&self, key: &QueryKey, now: Instant) -> Option<CachedQuery> {
        self.with_entries(|entries| {
            let entry = entries.get(key)?;
            if now.saturating_duration_since(entry.fetched_at) < self.stale_after {
                Some(entry.clone())
            } else {
                entries.remove(key);
                None
            }
        })
    }

    /// Record a fetched page
    ///
    /// A first page replaces whatever was cached for the key. Later pages are
    /// appended only when they continue the cached sequence; anything else is
    /// dropped so the cache never holds a gap. Expired entries of any key are
    /// pruned on the way.
    pub fn store(&self, key: &QueryKey, cursor: Cursor, page: ProductPage, now: Instant) {
        self.with_entries(|entries| {
            let before = entries.len();
            entries.retain(|_, entry| {
                now.saturating_duration_since(entry.fetched_at) < self.stale_after
            });
            if entries.len() < before {
                tracing::trace!(pruned = before - entries.len(), "Expired queries pruned");
            }

            if cursor.is_first() {
                entries.insert(
                    key.clone(),
                    CachedQuery {
                        next: page.next,
                        pages: vec![page],
                        fetched_at: now,
                    },
                );
                return;
            }

            match entries.get_mut(key) {
                Some(entry) if entry.next == Some(cursor) => {
                    entry.next = page.next;
                    entry.pages.push(page);
                }
                _ => {}
            }
        });
    }

    pub fn invalidate(&self, key: &QueryKey) {
        self.with_entries(|entries| {
            entries.remove(key);
        });
    }

    pub fn clear(&self) {
        self.with_entries(|entries| entries.clear());
    }

    pub fn len(&self) -> usize {
        self.with_entries(|entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut HashMap<QueryKey, CachedQuery>) -> T) -> T {
        match self.entries.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}
