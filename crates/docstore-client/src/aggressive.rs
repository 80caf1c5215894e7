//! Scoped aggressive caching
//!
//! Inside [`aggressively_cache_for`] cacheable reads are answered from the
//! response cache without a round trip while the entry is young enough. The
//! setting is a task-local: it covers exactly the future passed in, is gone
//! when that future completes, fails, panics or is dropped, and is never
//! seen by tasks spawned elsewhere.
//!
//! ```no_run
//! use std::time::Duration;
//! use docstore_client::{aggressively_cache_for, RequestExecutor, ExecutorConfig};
//! use docstore_client::commands::GetDatabaseNamesCommand;
//!
//! # async fn run() -> docstore_common::Result<()> {
//! let executor = RequestExecutor::new(
//!     vec!["http://127.0.0.1:8080".to_string()],
//!     "northwind",
//!     ExecutorConfig::default(),
//! )?;
//! let names = aggressively_cache_for(Duration::from_secs(5), async {
//!     executor.execute(&GetDatabaseNamesCommand::new(0, 20)).await
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use crate::cache::CacheEntry;

/// How cached entries are validated while aggressive caching is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggressiveCacheMode {
    /// Entries stored before the executor's last successful write are
    /// refused
    #[default]
    TrackChanges,
    /// Any entry younger than the duration is served
    DoNotTrackChanges,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggressiveCacheOptions {
    pub duration: Duration,
    pub mode: AggressiveCacheMode,
}

impl AggressiveCacheOptions {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            mode: AggressiveCacheMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: AggressiveCacheMode) -> Self {
        self.mode = mode;
        self
    }

    /// Whether `entry` may be served without asking the server.
    pub fn allows(&self, entry: &CacheEntry, write_generation: u64) -> bool {
        if entry.age() > self.duration {
            return false;
        }
        match self.mode {
            AggressiveCacheMode::TrackChanges => entry.generation == write_generation,
            AggressiveCacheMode::DoNotTrackChanges => true,
        }
    }
}

tokio::task_local! {
    static AGGRESSIVE_CACHE: Option<AggressiveCacheOptions>;
}

/// Runs `future` with aggressive caching for `duration` in the default
/// mode.
pub async fn aggressively_cache_for<F: Future>(duration: Duration, future: F) -> F::Output {
    aggressively_cache(AggressiveCacheOptions::new(duration), future).await
}

/// Runs `future` with the given aggressive caching options.
pub async fn aggressively_cache<F: Future>(options: AggressiveCacheOptions, future: F) -> F::Output {
    AGGRESSIVE_CACHE.scope(Some(options), future).await
}

/// Runs `future` with aggressive caching turned off, even if an enclosing
/// scope turned it on.
pub async fn disable_aggressive_caching<F: Future>(future: F) -> F::Output {
    AGGRESSIVE_CACHE.scope(None, future).await
}

/// Options in effect for the current task, if any.
pub fn current_options() -> Option<AggressiveCacheOptions> {
    AGGRESSIVE_CACHE.try_with(|options| *options).ok().flatten()
}
