use std::sync::Arc;
use std::time::Duration;

use docstore_common::transport::Transport;
use docstore_common::{DocstoreError, Result, ServerNode};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::SpeedTestConfig;
use crate::executor::Inner;

/// Background latency probe feeding the `FastestNode` read balance.
///
/// Every interval the topology probe is sent to all current nodes at once.
/// A node that answers gets its round-trip time recorded; a node that fails
/// or exceeds the probe timeout gets a failure recorded and loses its
/// latency measurement.
pub(crate) struct SpeedTest<T> {
    inner: Arc<Inner<T>>,
    config: SpeedTestConfig,
}

impl<T: Transport> SpeedTest<T> {
    pub(crate) fn new(inner: Arc<Inner<T>>) -> Self {
        let config = inner.config.speed_test.clone();
        Self { inner, config }
    }

    /// Starts the speed test task.
    pub(crate) fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Main probe loop
    async fn run(self) {
        let mut interval = tokio::time::interval(self.config.interval);

        loop {
            interval.tick().await;
            self.probe_all_nodes().await;
        }
    }

    /// Probe all nodes of the current topology in parallel
    async fn probe_all_nodes(&self) {
        let topology = self.inner.topology.get();

        let probes: Vec<_> = topology
            .nodes
            .iter()
            .map(|node| async move {
                let started = Instant::now();
                let result = self.probe_node(node).await;
                (node, result.map(|()| started.elapsed()))
            })
            .collect();

        let results = futures::future::join_all(probes).await;

        for (node, result) in results {
            self.apply_probe_result(node, result);
        }
    }

    async fn probe_node(&self, node: &ServerNode) -> Result<()> {
        let timeout = self.config.timeout;
        tokio::time::timeout(timeout, self.inner.probe_node(node))
            .await
            .map_err(|_| DocstoreError::Timeout {
                elapsed_ms: timeout.as_millis() as u64,
                url: Some(node.url.clone()),
            })??;
        Ok(())
    }

    fn apply_probe_result(&self, node: &ServerNode, result: Result<Duration>) {
        match result {
            Ok(latency) => {
                debug!(
                    url = %node.url,
                    latency_ms = latency.as_millis() as u64,
                    "Speed test probe succeeded"
                );
                self.inner.selector.record_latency(node, latency);
            }
            Err(e) => {
                let failures = self.inner.selector.record_failure(node);
                warn!(
                    "Speed test probe of {} failed ({} consecutive failures): {}",
                    node.url, failures, e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExecutorConfig, ReadBalanceBehavior};
    use crate::test_support::{MockTransport, Reply};
    use crate::RequestExecutor;
    use serde_json::json;

    const A: &str = "http://a:8080";

    fn start(transport: &MockTransport, speed_test: SpeedTestConfig) -> RequestExecutor<MockTransport> {
        let config = ExecutorConfig {
            read_balance: ReadBalanceBehavior::FastestNode,
            disable_topology_updates: true,
            speed_test,
            ..Default::default()
        };
        RequestExecutor::with_transport(vec![A.to_string()], "db", config, transport.clone()).unwrap()
    }

    fn topology_reply() -> Reply {
        Reply::ok(json!({"Etag": 1, "Nodes": [{"Url": A, "Database": "db"}]}))
    }

    #[tokio::test(start_paused = true)]
    async fn test_probes_repeat_every_interval() {
        let transport = MockTransport::new();
        transport.route("/topology", topology_reply());
        let _executor = start(
            &transport,
            SpeedTestConfig {
                interval: Duration::from_secs(1),
                timeout: Duration::from_millis(100),
            },
        );

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(transport.calls_to("/topology"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_probe_counts_as_failure() {
        let transport = MockTransport::new();
        transport.route("/topology", topology_reply().delayed(Duration::from_secs(5)));
        let executor = start(
            &transport,
            SpeedTestConfig {
                interval: Duration::from_secs(60),
                timeout: Duration::from_millis(100),
            },
        );

        tokio::time::sleep(Duration::from_millis(200)).await;
        let node = ServerNode::new(A, "db");
        assert!(executor.node_selector().latency(&node).is_none());
        assert_eq!(
            executor.node_selector().status(&node).unwrap().consecutive_failures,
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_executor_stops_probes() {
        let transport = MockTransport::new();
        transport.route("/topology", topology_reply());
        let executor = start(
            &transport,
            SpeedTestConfig {
                interval: Duration::from_secs(1),
                timeout: Duration::from_millis(100),
            },
        );

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(transport.calls_to("/topology"), 1);

        drop(executor);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(transport.calls_to("/topology"), 1);
    }
}
