use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use docstore_common::{ServerNode, Topology};
use tokio::time::Instant;

use crate::config::ReadBalanceBehavior;

/// The node chosen for a command and its slot in the topology it was
/// chosen from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentIndexAndNode {
    pub index: usize,
    pub node: ServerNode,
}

/// Health of a node that has failed at least once since its last success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeStatus {
    pub consecutive_failures: u32,
    pub last_failure: Instant,
}

/// Picks the node for each command and tracks per-node health and latency.
///
/// Health is advisory: a node with failures is still selectable, so a node
/// that fails one command can serve the very next one. Skipping a failed
/// node only happens inside a single command's retry sequence.
pub struct NodeSelector {
    statuses: RwLock<HashMap<ServerNode, NodeStatus>>,
    latencies: RwLock<HashMap<ServerNode, Duration>>,
    cursor: AtomicUsize,
}

impl NodeSelector {
    pub fn new() -> Self {
        Self {
            statuses: RwLock::new(HashMap::new()),
            latencies: RwLock::new(HashMap::new()),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Selects the node for the next command.
    ///
    /// Returns `None` only for an empty topology.
    pub fn select_node(
        &self,
        topology: &Topology,
        is_read_request: bool,
        policy: ReadBalanceBehavior,
    ) -> Option<CurrentIndexAndNode> {
        if topology.is_empty() {
            return None;
        }

        let index = match (is_read_request, policy) {
            (false, _) | (true, ReadBalanceBehavior::None) => 0,
            (true, ReadBalanceBehavior::RoundRobin) => {
                self.cursor.fetch_add(1, Ordering::Relaxed) % topology.len()
            }
            (true, ReadBalanceBehavior::FastestNode) => self.fastest_index(topology),
        };

        Some(CurrentIndexAndNode {
            index,
            node: topology.nodes[index].clone(),
        })
    }

    /// Index of the node with the lowest measured latency.
    ///
    /// Unmeasured nodes are skipped; ties go to the lowest index; with no
    /// measurements at all this is node 0.
    fn fastest_index(&self, topology: &Topology) -> usize {
        let latencies = self.latencies.read().unwrap_or_else(PoisonError::into_inner);
        topology
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(i, node)| latencies.get(node).map(|latency| (*latency, i)))
            .min()
            .map(|(_, i)| i)
            .unwrap_or(0)
    }

    /// Records a failed attempt and returns the node's consecutive failures.
    ///
    /// The node's latency measurement is dropped, so `FastestNode` stops
    /// preferring it until the next successful probe.
    pub fn record_failure(&self, node: &ServerNode) -> u32 {
        self.latencies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(node);

        let mut statuses = self.statuses.write().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let status = statuses.entry(node.clone()).or_insert(NodeStatus {
            consecutive_failures: 0,
            last_failure: now,
        });
        status.consecutive_failures += 1;
        status.last_failure = now;
        status.consecutive_failures
    }

    /// Marks the node healthy again.
    pub fn record_success(&self, node: &ServerNode) {
        let mut statuses = self.statuses.write().unwrap_or_else(PoisonError::into_inner);
        statuses.remove(node);
    }

    /// Stores the latest latency measured for the node.
    pub fn record_latency(&self, node: &ServerNode, latency: Duration) {
        self.latencies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(node.clone(), latency);
    }

    /// Health of the node, `None` when it is healthy.
    pub fn status(&self, node: &ServerNode) -> Option<NodeStatus> {
        self.statuses
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(node)
            .copied()
    }

    pub fn latency(&self, node: &ServerNode) -> Option<Duration> {
        self.latencies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(node)
            .copied()
    }

    /// All nodes currently carrying failures.
    pub fn failing_nodes(&self) -> Vec<(ServerNode, NodeStatus)> {
        self.statuses
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(node, status)| (node.clone(), *status))
            .collect()
    }

    /// Forgets health and latency of nodes no longer in `topology`.
    pub fn retain_topology(&self, topology: &Topology) {
        self.statuses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|node, _| topology.nodes.contains(node));
        self.latencies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|node, _| topology.nodes.contains(node));
    }
}

impl Default for NodeSelector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn topology(count: usize) -> Topology {
        let nodes = (0..count)
            .map(|i| ServerNode::new(format!("http://node{}:8080", i), "db"))
            .collect();
        Topology::new(1, nodes)
    }

    #[test]
    fn test_empty_topology_returns_none() {
        let selector = NodeSelector::new();
        let empty = Topology::new(1, vec![]);
        assert!(selector
            .select_node(&empty, true, ReadBalanceBehavior::RoundRobin)
            .is_none());
    }

    #[test]
    fn test_none_policy_always_node_zero() {
        let selector = NodeSelector::new();
        let topology = topology(3);
        for _ in 0..5 {
            let chosen = selector
                .select_node(&topology, true, ReadBalanceBehavior::None)
                .unwrap();
            assert_eq!(chosen.index, 0);
            assert_eq!(chosen.node, topology.nodes[0]);
        }
    }

    #[test]
    fn test_round_robin_rotates_reads() {
        let selector = NodeSelector::new();
        let topology = topology(3);
        let indexes: Vec<usize> = (0..6)
            .map(|_| {
                selector
                    .select_node(&topology, true, ReadBalanceBehavior::RoundRobin)
                    .unwrap()
                    .index
            })
            .collect();
        assert_eq!(indexes, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn test_writes_always_target_node_zero() {
        let selector = NodeSelector::new();
        let topology = topology(3);
        selector.record_latency(&topology.nodes[2], Duration::from_millis(1));

        for policy in [
            ReadBalanceBehavior::None,
            ReadBalanceBehavior::RoundRobin,
            ReadBalanceBehavior::FastestNode,
        ] {
            for _ in 0..3 {
                let chosen = selector.select_node(&topology, false, policy).unwrap();
                assert_eq!(chosen.index, 0, "write routed away from leader with {:?}", policy);
            }
        }
    }

    #[test]
    fn test_fastest_node_picks_lowest_latency() {
        let selector = NodeSelector::new();
        let topology = topology(3);
        selector.record_latency(&topology.nodes[0], Duration::from_millis(30));
        selector.record_latency(&topology.nodes[1], Duration::from_millis(5));
        selector.record_latency(&topology.nodes[2], Duration::from_millis(12));

        let chosen = selector
            .select_node(&topology, true, ReadBalanceBehavior::FastestNode)
            .unwrap();
        assert_eq!(chosen.index, 1);
    }

    #[test]
    fn test_fastest_node_ties_go_to_lowest_index() {
        let selector = NodeSelector::new();
        let topology = topology(3);
        selector.record_latency(&topology.nodes[2], Duration::from_millis(5));
        selector.record_latency(&topology.nodes[1], Duration::from_millis(5));

        let chosen = selector
            .select_node(&topology, true, ReadBalanceBehavior::FastestNode)
            .unwrap();
        assert_eq!(chosen.index, 1);
    }

    #[test]
    fn test_fastest_node_without_measurements_uses_leader() {
        let selector = NodeSelector::new();
        let topology = topology(3);
        let chosen = selector
            .select_node(&topology, true, ReadBalanceBehavior::FastestNode)
            .unwrap();
        assert_eq!(chosen.index, 0);
    }

    #[test]
    fn test_failure_drops_latency_measurement() {
        let selector = NodeSelector::new();
        let topology = topology(2);
        selector.record_latency(&topology.nodes[0], Duration::from_millis(20));
        selector.record_latency(&topology.nodes[1], Duration::from_millis(1));

        selector.record_failure(&topology.nodes[1]);
        assert!(selector.latency(&topology.nodes[1]).is_none());

        let chosen = selector
            .select_node(&topology, true, ReadBalanceBehavior::FastestNode)
            .unwrap();
        assert_eq!(chosen.index, 0);
    }

    #[test]
    fn test_failure_counter_and_reset() {
        let selector = NodeSelector::new();
        let node = ServerNode::new("http://a:8080", "db");

        assert!(selector.status(&node).is_none());
        assert_eq!(selector.record_failure(&node), 1);
        assert_eq!(selector.record_failure(&node), 2);
        assert_eq!(selector.status(&node).unwrap().consecutive_failures, 2);
        assert_eq!(selector.failing_nodes().len(), 1);

        selector.record_success(&node);
        assert!(selector.status(&node).is_none());
        assert!(selector.failing_nodes().is_empty());
    }

    #[test]
    fn test_failed_node_is_still_selectable() {
        let selector = NodeSelector::new();
        let topology = topology(2);
        selector.record_failure(&topology.nodes[0]);
        selector.record_failure(&topology.nodes[0]);

        let chosen = selector
            .select_node(&topology, false, ReadBalanceBehavior::None)
            .unwrap();
        assert_eq!(chosen.index, 0);
    }

    #[test]
    fn test_retain_topology_drops_removed_nodes() {
        let selector = NodeSelector::new();
        let old = topology(3);
        selector.record_failure(&old.nodes[2]);
        selector.record_latency(&old.nodes[2], Duration::from_millis(3));

        let new = topology(2);
        selector.retain_topology(&new);
        assert!(selector.status(&old.nodes[2]).is_none());
        assert!(selector.latency(&old.nodes[2]).is_none());
    }

    #[tokio::test]
    async fn test_concurrent_selection_and_health_updates() {
        use tokio::task::JoinSet;

        let selector = Arc::new(NodeSelector::new());
        let topology = Arc::new(topology(3));
        let mut join_set = JoinSet::new();

        for i in 0..10 {
            let selector_clone = Arc::clone(&selector);
            let topology_clone = Arc::clone(&topology);
            join_set.spawn(async move {
                for _ in 0..100 {
                    let chosen = selector_clone
                        .select_node(&topology_clone, true, ReadBalanceBehavior::RoundRobin)
                        .unwrap();
                    assert!(chosen.index < 3);
                }
            });

            let selector_clone = Arc::clone(&selector);
            let node = topology.nodes[i % 3].clone();
            join_set.spawn(async move {
                selector_clone.record_failure(&node);
                selector_clone.record_success(&node);
            });
        }

        while let Some(result) = join_set.join_next().await {
            result.unwrap();
        }
        assert!(selector.failing_nodes().is_empty());
    }
}
