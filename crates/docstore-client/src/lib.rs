pub mod aggressive;
pub mod cache;
pub mod command;
pub mod commands;
pub mod config;
pub mod executor;
pub mod node_selector;
pub mod operation;
mod speed_test;
pub mod topology;

#[cfg(test)]
mod test_support;

pub use aggressive::{
    aggressively_cache, aggressively_cache_for, disable_aggressive_caching, AggressiveCacheMode,
    AggressiveCacheOptions,
};
pub use cache::{CacheEntry, ResponseCache};
pub use command::Command;
pub use config::{ExecutorConfig, ExecutorScope, ReadBalanceBehavior, SpeedTestConfig};
pub use executor::RequestExecutor;
pub use node_selector::{CurrentIndexAndNode, NodeSelector, NodeStatus};
pub use operation::{Operation, DEFAULT_POLL_INTERVAL};
pub use topology::TopologyCache;
