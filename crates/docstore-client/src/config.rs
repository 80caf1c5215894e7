use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Strategy for choosing which node services a read-only request.
///
/// Writes always go to node 0, the presumed leader, regardless of policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadBalanceBehavior {
    /// Every request goes to node 0
    #[default]
    None,
    /// Reads rotate through all nodes
    RoundRobin,
    /// Reads go to the node with the lowest latency seen by the speed test
    FastestNode,
}

impl FromStr for ReadBalanceBehavior {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "none" => Ok(Self::None),
            "roundrobin" => Ok(Self::RoundRobin),
            "fastestnode" | "fastest" => Ok(Self::FastestNode),
            other => Err(format!(
                "unknown read balance behavior '{}', expected none, round-robin or fastest-node",
                other
            )),
        }
    }
}

impl fmt::Display for ReadBalanceBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::RoundRobin => "round-robin",
            Self::FastestNode => "fastest-node",
        };
        f.write_str(name)
    }
}

/// What an executor's topology describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutorScope {
    /// Nodes serving one database, from `GET /topology?name=`
    Database(String),
    /// Every node of the cluster, from `GET /cluster/topology`
    Cluster,
}

impl ExecutorScope {
    pub fn database(&self) -> Option<&str> {
        match self {
            Self::Database(name) => Some(name),
            Self::Cluster => None,
        }
    }
}

impl fmt::Display for ExecutorScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database(name) => f.write_str(name),
            Self::Cluster => f.write_str("<cluster>"),
        }
    }
}

/// Speed test configuration, used with [`ReadBalanceBehavior::FastestNode`].
#[derive(Debug, Clone)]
pub struct SpeedTestConfig {
    /// Time between two probes of every node (default: 60s)
    pub interval: Duration,
    /// Time after which a probe counts as a failure (default: 2s)
    pub timeout: Duration,
}

impl Default for SpeedTestConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            timeout: Duration::from_millis(2000),
        }
    }
}

/// Request executor configuration.
///
/// # Default Configuration
///
/// - `read_balance`: `None`
/// - `request_timeout`: 30s per command, retries included
/// - `cache_capacity`: 1024 responses
/// - `disable_topology_updates`: false
///
/// # Example
///
/// ```rust
/// use docstore_client::{ExecutorConfig, ReadBalanceBehavior};
/// use std::time::Duration;
///
/// let config = ExecutorConfig {
///     read_balance: ReadBalanceBehavior::RoundRobin,
///     request_timeout: Duration::from_secs(5),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Policy for read requests
    pub read_balance: ReadBalanceBehavior,
    /// Wall-clock budget of one `execute` call, failover included
    pub request_timeout: Duration,
    /// Maximum number of cached responses before the oldest is evicted
    pub cache_capacity: usize,
    /// Keep the seed urls as the topology forever
    pub disable_topology_updates: bool,
    /// Speed test settings (only used with `FastestNode`)
    pub speed_test: SpeedTestConfig,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            read_balance: ReadBalanceBehavior::None,
            request_timeout: Duration::from_secs(30),
            cache_capacity: 1024,
            disable_topology_updates: false,
            speed_test: SpeedTestConfig::default(),
        }
    }
}
