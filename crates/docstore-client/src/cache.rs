use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use hyper::body::Bytes;
use hyper::Method;
use tokio::time::Instant;
use tracing::debug;

/// A cached response body and the change token it was served with.
///
/// Entries are immutable; every store or touch replaces the whole entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub change_token: String,
    pub payload: Bytes,
    pub stored_at: Instant,
    /// Executor write generation when the request that produced this entry
    /// was sent
    pub generation: u64,
}

impl CacheEntry {
    pub fn age(&self) -> std::time::Duration {
        self.stored_at.elapsed()
    }
}

type CacheKey = (Method, String);

/// Bounded map from `(method, url)` to the last response seen for it.
pub struct ResponseCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    capacity: usize,
}

impl ResponseCache {
    /// Creates a cache holding at most `capacity` entries. A capacity of 0
    /// disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    pub fn lookup(&self, method: &Method, url: &str) -> Option<CacheEntry> {
        let key = (method.clone(), normalize_url(url));
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    /// Stores a response, replacing any entry for the same key. Evicts the
    /// oldest entry when a new key would exceed capacity.
    pub fn store(
        &self,
        method: &Method,
        url: &str,
        change_token: impl Into<String>,
        payload: Bytes,
        generation: u64,
    ) {
        if self.capacity == 0 {
            return;
        }

        let key = (method.clone(), normalize_url(url));
        let entry = CacheEntry {
            change_token: change_token.into(),
            payload,
            stored_at: Instant::now(),
            generation,
        };

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                debug!(url = %oldest.1, "Evicting oldest cached response");
                entries.remove(&oldest);
            }
        }
        entries.insert(key, entry);
    }

    /// Re-stamps an entry after the server confirmed it is still current.
    ///
    /// Returns the refreshed entry, or `None` if it was evicted meanwhile.
    pub fn touch(&self, method: &Method, url: &str, generation: u64) -> Option<CacheEntry> {
        let key = (method.clone(), normalize_url(url));
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let previous = entries.get(&key)?;
        let refreshed = CacheEntry {
            change_token: previous.change_token.clone(),
            payload: previous.payload.clone(),
            stored_at: Instant::now(),
            generation,
        };
        entries.insert(key, refreshed.clone());
        Some(refreshed)
    }

    /// Drops the entry for `(method, url)`, returning it if there was one.
    pub fn remove(&self, method: &Method, url: &str) -> Option<CacheEntry> {
        let key = (method.clone(), normalize_url(url));
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Lowercases scheme and authority, drops any fragment and a trailing
/// slash on the path. Path and query are kept as-is.
fn normalize_url(url: &str) -> String {
    let url = url.split('#').next().unwrap_or(url);
    let (scheme, rest) = match url.split_once("://") {
        Some(parts) => parts,
        None => return url.trim_end_matches('/').to_string(),
    };
    let (authority, path) = match rest.find(['/', '?']) {
        Some(i) => rest.split_at(i),
        None => (rest, ""),
    };

    let path = match path.split_once('?') {
        Some((p, q)) => format!("{}?{}", p.trim_end_matches('/'), q),
        None => path.trim_end_matches('/').to_string(),
    };
    format!(
        "{}://{}{}",
        scheme.to_ascii_lowercase(),
        authority.to_ascii_lowercase(),
        path
    )
}
