//! Topology cache
//!
//! Holds the executor's best-known view of the cluster. Readers get a cheap
//! `Arc` snapshot and never wait on the network; writers go through
//! [`TopologyCache::try_update`], which only ever moves the etag forward.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use docstore_common::Topology;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub struct TopologyCache {
    /// Current snapshot
    current: RwLock<Arc<Topology>>,
    /// Topology built from the caller's urls, kept for bootstrap and fallback
    seed: Arc<Topology>,
    /// Serializes awaited refreshes so only one fetch is in flight
    refresh_lock: Mutex<()>,
    /// Set while a fire-and-forget refresh is running
    is_refreshing: AtomicBool,
    /// Number of completed refresh attempts, successful or not
    refresh_epoch: AtomicU64,
}

impl TopologyCache {
    /// Creates a cache whose current snapshot is the seed topology.
    pub fn new(seed: Topology) -> Self {
        let seed = Arc::new(seed);
        Self {
            current: RwLock::new(Arc::clone(&seed)),
            seed,
            refresh_lock: Mutex::new(()),
            is_refreshing: AtomicBool::new(false),
            refresh_epoch: AtomicU64::new(0),
        }
    }

    /// Current best-known snapshot.
    pub fn get(&self) -> Arc<Topology> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn seed(&self) -> Arc<Topology> {
        Arc::clone(&self.seed)
    }

    pub fn etag(&self) -> i64 {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .etag
    }

    /// Installs `candidate` if its etag is newer than the current one.
    ///
    /// The comparison and the swap happen under one write lock, so the
    /// highest etag wins whatever order concurrent callers arrive in. Empty
    /// candidates are never installed.
    pub fn try_update(&self, candidate: Topology) -> bool {
        if candidate.is_empty() {
            warn!(etag = candidate.etag, "Ignoring topology without nodes");
            return false;
        }

        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if candidate.etag <= current.etag {
            debug!(
                current_etag = current.etag,
                candidate_etag = candidate.etag,
                "Discarding stale topology"
            );
            return false;
        }

        info!(
            previous_etag = current.etag,
            etag = candidate.etag,
            nodes = candidate.len(),
            "Topology updated"
        );
        *current = Arc::new(candidate);
        true
    }

    pub(crate) fn refresh_lock(&self) -> &Mutex<()> {
        &self.refresh_lock
    }

    /// Lets a caller that waited on the refresh lock tell whether a refresh
    /// finished while it was waiting.
    pub(crate) fn refresh_epoch(&self) -> u64 {
        self.refresh_epoch.load(Ordering::SeqCst)
    }

    pub(crate) fn finish_refresh(&self) {
        self.refresh_epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Claims the background refresh slot. Returns false if a background
    /// refresh is already running.
    pub(crate) fn begin_background_refresh(&self) -> bool {
        self.is_refreshing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub(crate) fn end_background_refresh(&self) {
        self.is_refreshing.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstore_common::{ServerNode, UNAUTHORITATIVE_ETAG};

    fn topology(etag: i64, urls: &[&str]) -> Topology {
        Topology::new(
            etag,
            urls.iter().map(|u| ServerNode::new(*u, "db")).collect(),
        )
    }

    fn seeded() -> TopologyCache {
        TopologyCache::new(Topology::unauthoritative(
            &["http://seed:8080".to_string()],
            "db",
        ))
    }

    #[test]
    fn test_starts_with_seed() {
        let cache = seeded();
        assert_eq!(cache.etag(), UNAUTHORITATIVE_ETAG);
        assert_eq!(*cache.get(), *cache.seed());
    }

    #[test]
    fn test_newer_etag_accepted() {
        let cache = seeded();
        assert!(cache.try_update(topology(3, &["http://a:8080", "http://b:8080"])));
        assert_eq!(cache.etag(), 3);
        assert_eq!(cache.get().len(), 2);
        // Seed is untouched
        assert_eq!(cache.seed().etag, UNAUTHORITATIVE_ETAG);
    }

    #[test]
    fn test_equal_or_older_etag_rejected() {
        let cache = seeded();
        assert!(cache.try_update(topology(5, &["http://a:8080"])));
        assert!(!cache.try_update(topology(5, &["http://b:8080"])));
        assert!(!cache.try_update(topology(4, &["http://c:8080"])));
        assert_eq!(cache.get().nodes[0].url, "http://a:8080");
    }

    #[test]
    fn test_empty_candidate_rejected() {
        let cache = seeded();
        assert!(!cache.try_update(Topology::new(10, vec![])));
        assert_eq!(cache.etag(), UNAUTHORITATIVE_ETAG);
    }

    #[test]
    fn test_refresh_epoch_counts_attempts() {
        let cache = seeded();
        assert_eq!(cache.refresh_epoch(), 0);
        cache.finish_refresh();
        cache.finish_refresh();
        assert_eq!(cache.refresh_epoch(), 2);
    }

    #[test]
    fn test_background_refresh_slot_is_exclusive() {
        let cache = seeded();
        assert!(cache.begin_background_refresh());
        assert!(!cache.begin_background_refresh());
        cache.end_background_refresh();
        assert!(cache.begin_background_refresh());
    }

    #[test]
    fn test_concurrent_updates_highest_etag_wins() {
        for _ in 0..50 {
            let cache = Arc::new(seeded());
            let t1 = topology(1, &["http://one:8080"]);
            let t2 = topology(2, &["http://two:8080"]);

            let c1 = Arc::clone(&cache);
            let c2 = Arc::clone(&cache);
            let h1 = std::thread::spawn(move || c1.try_update(t1));
            let h2 = std::thread::spawn(move || c2.try_update(t2));
            h1.join().unwrap();
            h2.join().unwrap();

            assert_eq!(cache.etag(), 2);
            assert_eq!(cache.get().nodes[0].url, "http://two:8080");
        }
    }

    #[tokio::test]
    async fn test_many_concurrent_updates_keep_maximum() {
        use tokio::task::JoinSet;

        let cache = Arc::new(seeded());
        let mut join_set = JoinSet::new();
        for etag in (0..64).rev() {
            let cache = Arc::clone(&cache);
            join_set.spawn(async move {
                cache.try_update(topology(etag, &["http://a:8080"]));
            });
        }
        while let Some(result) = join_set.join_next().await {
            result.unwrap();
        }
        assert_eq!(cache.etag(), 63);
    }
}
