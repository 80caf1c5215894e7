//! Request executor
//!
//! [`RequestExecutor`] is the single entry point for sending commands to a
//! cluster. One instance is shared by every concurrent caller; there is no
//! lock around [`execute`](RequestExecutor::execute), only short critical
//! sections inside the topology cache, node selector and response cache.
//!
//! # Dispatch
//!
//! 1. Topology probes go straight to the seed urls.
//! 2. Any other command first makes sure the topology is authoritative. The
//!    first command after construction fetches it; concurrent commands wait
//!    for that fetch instead of starting their own.
//! 3. The node selector picks a node from the read-balance policy.
//! 4. Cacheable reads may be answered from the response cache, either
//!    without a round trip (aggressive caching) or through a conditional
//!    request.
//! 5. Node-local failures fail over to the next node in topology order when
//!    the command is retry-safe. Authoritative server errors are returned
//!    immediately.
//!
//! The whole pipeline runs under the configured request timeout.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use docstore_common::transport::{HyperTransport, Transport};
use docstore_common::{
    DocstoreError, OperationId, Result, ServerNode, Topology,
};
use hyper::header::IF_NONE_MATCH;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::aggressive;
use crate::cache::ResponseCache;
use crate::command::Command;
use crate::commands::{GetClusterTopologyCommand, GetDatabaseTopologyCommand, KillOperationCommand};
use crate::config::{ExecutorConfig, ExecutorScope, ReadBalanceBehavior};
use crate::node_selector::{NodeSelector, NodeStatus};
use crate::operation::Operation;
use crate::speed_test::SpeedTest;

/// Dispatches commands to a clustered database, or to the cluster itself.
///
/// A database executor ([`new`](Self::new)) dispatches on the topology of
/// one database. A cluster executor ([`for_cluster`](Self::for_cluster))
/// dispatches on the cluster membership and serves server-wide commands
/// such as [`GetDatabaseNamesCommand`](crate::commands::GetDatabaseNamesCommand).
/// Both share the same selection, caching and failover.
///
/// # Example
///
/// ```no_run
/// use docstore_client::{ExecutorConfig, RequestExecutor};
/// use docstore_client::commands::GetNextOperationIdCommand;
///
/// # #[tokio::main]
/// # async fn main() -> docstore_common::Result<()> {
/// let executor = RequestExecutor::new(
///     vec!["http://127.0.0.1:8080".to_string(), "http://127.0.0.1:8081".to_string()],
///     "northwind",
///     ExecutorConfig::default(),
/// )?;
///
/// let id = executor.execute(&GetNextOperationIdCommand::new()).await?;
/// println!("next operation id: {}", id);
/// # Ok(())
/// # }
/// ```
pub struct RequestExecutor<T: Transport = HyperTransport> {
    inner: Arc<Inner<T>>,
    /// Background speed test task, only with `FastestNode`
    speed_test_handle: Option<JoinHandle<()>>,
}

impl<T: Transport> std::fmt::Debug for RequestExecutor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("scope", &self.inner.scope)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// State shared between the executor and its background tasks.
pub(crate) struct Inner<T> {
    pub(crate) scope: ExecutorScope,
    pub(crate) config: ExecutorConfig,
    pub(crate) transport: T,
    pub(crate) topology: crate::topology::TopologyCache,
    pub(crate) selector: NodeSelector,
    pub(crate) cache: ResponseCache,
    /// Bumped after every successful non-read command
    write_generation: AtomicU64,
}

impl RequestExecutor<HyperTransport> {
    /// Creates an executor over HTTP for `database`, seeded with `urls`.
    pub fn new(
        urls: Vec<String>,
        database: impl Into<String>,
        config: ExecutorConfig,
    ) -> Result<Self> {
        Self::with_transport(urls, database, config, HyperTransport::new())
    }

    /// Creates a cluster executor over HTTP, seeded with `urls`.
    pub fn for_cluster(urls: Vec<String>, config: ExecutorConfig) -> Result<Self> {
        Self::cluster_with_transport(urls, config, HyperTransport::new())
    }
}

impl<T: Transport> RequestExecutor<T> {
    /// Creates an executor for `database` sending through `transport`.
    ///
    /// Fails on an empty url list or database name. With
    /// [`ReadBalanceBehavior::FastestNode`] the speed test is spawned here,
    /// which requires a running tokio runtime.
    pub fn with_transport(
        urls: Vec<String>,
        database: impl Into<String>,
        config: ExecutorConfig,
        transport: T,
    ) -> Result<Self> {
        let database = database.into();
        if database.trim().is_empty() {
            return Err(DocstoreError::InvalidConfiguration(
                "database name must not be empty".to_string(),
            ));
        }
        Self::with_scope(urls, ExecutorScope::Database(database), config, transport)
    }

    /// Creates a cluster executor sending through `transport`.
    pub fn cluster_with_transport(urls: Vec<String>, config: ExecutorConfig, transport: T) -> Result<Self> {
        Self::with_scope(urls, ExecutorScope::Cluster, config, transport)
    }

    fn with_scope(
        urls: Vec<String>,
        scope: ExecutorScope,
        config: ExecutorConfig,
        transport: T,
    ) -> Result<Self> {
        if urls.is_empty() {
            return Err(DocstoreError::InvalidConfiguration(
                "at least one server url is required".to_string(),
            ));
        }
        if let Some(blank) = urls.iter().find(|u| u.trim().is_empty()) {
            return Err(DocstoreError::InvalidConfiguration(format!(
                "invalid server url '{}'",
                blank
            )));
        }
        if config.speed_test.interval.is_zero() {
            return Err(DocstoreError::InvalidConfiguration(
                "speed test interval must be greater than zero".to_string(),
            ));
        }

        let seed = Topology::unauthoritative(&urls, scope.database().unwrap_or_default());
        let inner = Arc::new(Inner {
            cache: ResponseCache::new(config.cache_capacity),
            topology: crate::topology::TopologyCache::new(seed),
            selector: NodeSelector::new(),
            write_generation: AtomicU64::new(0),
            scope,
            config,
            transport,
        });

        let speed_test_handle = if inner.config.read_balance == ReadBalanceBehavior::FastestNode {
            tokio::runtime::Handle::try_current().map_err(|_| {
                DocstoreError::InvalidConfiguration(
                    "the fastest-node read balance needs a running tokio runtime".to_string(),
                )
            })?;
            Some(SpeedTest::new(Arc::clone(&inner)).spawn())
        } else {
            None
        };

        info!(
            scope = %inner.scope,
            seeds = urls.len(),
            read_balance = %inner.config.read_balance,
            "Request executor initialized"
        );

        Ok(Self {
            inner,
            speed_test_handle,
        })
    }

    /// Executes `command` and returns its parsed result.
    pub async fn execute<C: Command>(&self, command: &C) -> Result<C::Output> {
        let started = Instant::now();
        let last_node = Mutex::new(None);

        let outcome = {
            let dispatch = self.inner.dispatch(command, started, &last_node);
            tokio::time::timeout(self.inner.config.request_timeout, dispatch).await
        };
        match outcome {
            Ok(result) => result,
            Err(_) => {
                let url = last_node
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                warn!(
                    timeout_ms = self.inner.config.request_timeout.as_millis() as u64,
                    last_node = url.as_deref().unwrap_or("none"),
                    "Request timed out"
                );
                Err(DocstoreError::Timeout {
                    elapsed_ms: started.elapsed().as_millis() as u64,
                    url,
                })
            }
        }
    }

    /// Fetches the topology now and installs it if it is newer.
    pub async fn force_refresh(&self) -> Result<Arc<Topology>> {
        self.inner.force_refresh().await
    }

    /// Handle for waiting on the long-running operation `id`.
    pub fn operation(&self, id: OperationId) -> Operation<'_, T> {
        Operation::new(self, id)
    }

    /// Asks the cluster to cancel operation `id`.
    pub async fn kill_operation(&self, id: OperationId) -> Result<()> {
        self.execute(&KillOperationCommand::new(id)).await
    }

    /// Database this executor serves; `None` for a cluster executor.
    pub fn database(&self) -> Option<&str> {
        self.inner.scope.database()
    }

    pub fn scope(&self) -> &ExecutorScope {
        &self.inner.scope
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.inner.config
    }

    /// Current topology snapshot.
    pub fn topology(&self) -> Arc<Topology> {
        self.inner.topology.get()
    }

    pub fn topology_etag(&self) -> i64 {
        self.inner.topology.etag()
    }

    /// Nodes that failed since their last success.
    pub fn node_statuses(&self) -> Vec<(ServerNode, NodeStatus)> {
        self.inner.selector.failing_nodes()
    }

    pub fn node_selector(&self) -> &NodeSelector {
        &self.inner.selector
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.inner.cache
    }

    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    /// Stops background work. Commands can still be executed afterwards.
    pub fn dispose(&mut self) {
        if let Some(handle) = self.speed_test_handle.take() {
            debug!("Stopping speed test");
            handle.abort();
        }
    }
}

impl<T: Transport> Drop for RequestExecutor<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T: Transport> Inner<T> {
    async fn dispatch<C: Command>(
        self: &Arc<Self>,
        command: &C,
        started: Instant,
        last_node: &Mutex<Option<String>>,
    ) -> Result<C::Output> {
        if command.is_topology_probe() {
            let seed = self.topology.seed();
            return self.execute_with_failover(command, &seed, 0, started, last_node).await;
        }

        let topology = self.ensure_topology().await;
        let chosen = self
            .selector
            .select_node(&topology, command.is_read_request(), self.config.read_balance)
            .ok_or_else(|| {
                DocstoreError::InvalidConfiguration("topology has no nodes".to_string())
            })?;

        self.execute_with_failover(command, &topology, chosen.index, started, last_node)
            .await
    }

    /// Returns the topology to dispatch on, fetching it first while it is
    /// still the unauthoritative seed.
    async fn ensure_topology(self: &Arc<Self>) -> Arc<Topology> {
        let topology = self.topology.get();
        if topology.is_authoritative() || self.config.disable_topology_updates {
            return topology;
        }

        match self.force_refresh().await {
            Ok(topology) => topology,
            Err(e) => {
                warn!(
                    scope = %self.scope,
                    error = %e,
                    "Initial topology fetch failed, using seed urls"
                );
                self.topology.get()
            }
        }
    }

    /// Single-flight topology refresh.
    ///
    /// A caller that waited for another refresh to finish returns that
    /// refresh's outcome instead of fetching again.
    pub(crate) async fn force_refresh(&self) -> Result<Arc<Topology>> {
        let epoch = self.topology.refresh_epoch();
        let _guard = self.topology.refresh_lock().lock().await;
        if self.topology.refresh_epoch() != epoch {
            debug!("Topology refreshed while waiting, reusing result");
            return Ok(self.topology.get());
        }

        let fetched = self.fetch_topology().await;
        self.topology.finish_refresh();

        let topology = fetched?;
        if self.topology.try_update(topology) {
            self.selector.retain_topology(&self.topology.get());
        }
        Ok(self.topology.get())
    }

    /// Asks every known node for the topology, current nodes first, then the
    /// seeds, until one answers.
    async fn fetch_topology(&self) -> Result<Topology> {
        let started = Instant::now();
        let mut candidates = self.topology.get().nodes.clone();
        for node in &self.topology.seed().nodes {
            if !candidates.contains(node) {
                candidates.push(node.clone());
            }
        }

        let mut last_error = None;
        for node in &candidates {
            match self.probe_node(node).await {
                Ok(topology) => return Ok(topology),
                Err(e) if e.is_node_local() => {
                    warn!(url = %node.url, error = %e, "Topology fetch failed, trying next node");
                    self.selector.record_failure(node);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(DocstoreError::AllNodesDown {
            database: self.scope.to_string(),
            attempts: candidates.len(),
            elapsed_ms: started.elapsed().as_millis() as u64,
            last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    /// Sends the topology probe matching the executor's scope to one node.
    pub(crate) async fn probe_node(&self, node: &ServerNode) -> Result<Topology> {
        match self.scope {
            ExecutorScope::Database(_) => self.send_probe(&GetDatabaseTopologyCommand::new(), node).await,
            ExecutorScope::Cluster => Ok(self
                .send_probe(&GetClusterTopologyCommand::new(), node)
                .await?
                .to_topology()),
        }
    }

    async fn send_probe<C: Command>(&self, command: &C, node: &ServerNode) -> Result<C::Output> {
        let response = self.transport.send(command.build_request(node)?).await?;
        if !response.is_success() {
            return Err(response.classify_failure(&node.url));
        }
        self.selector.record_success(node);
        command.parse_response(&response.body, false)
    }

    /// Starts a deduplicated background refresh.
    fn spawn_background_refresh(self: &Arc<Self>) {
        if self.config.disable_topology_updates {
            return;
        }
        if !self.topology.begin_background_refresh() {
            debug!("Topology refresh already in progress");
            return;
        }

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let timeout = inner.config.request_timeout;
            match tokio::time::timeout(timeout, inner.force_refresh()).await {
                Ok(Ok(topology)) => debug!(etag = topology.etag, "Background topology refresh done"),
                Ok(Err(e)) => warn!(error = %e, "Background topology refresh failed"),
                Err(_) => warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "Background topology refresh timed out"
                ),
            }
            inner.topology.end_background_refresh();
        });
    }

    /// Tries `command` on the nodes of `topology`, starting at `start` and
    /// moving forward in topology order while failures are node-local and
    /// the command is retry-safe.
    async fn execute_with_failover<C: Command>(
        self: &Arc<Self>,
        command: &C,
        topology: &Topology,
        start: usize,
        started: Instant,
        last_node: &Mutex<Option<String>>,
    ) -> Result<C::Output> {
        let node_count = topology.len();
        let retry_safe = command.is_retry_safe();
        let mut last_error = None;
        let mut attempts = 0;

        for offset in 0..node_count {
            let node = &topology.nodes[(start + offset) % node_count];
            *last_node.lock().unwrap_or_else(PoisonError::into_inner) = Some(node.url.clone());
            attempts += 1;

            match self.attempt(command, node).await {
                Ok(output) => return Ok(output),
                Err(e) if e.is_node_local() => {
                    let failures = self.selector.record_failure(node);

                    if !retry_safe {
                        warn!(
                            url = %node.url,
                            consecutive_failures = failures,
                            error = %e,
                            "Node failed on a command that is not safe to retry"
                        );
                        if node_count == 1 {
                            return Err(DocstoreError::AllNodesDown {
                                database: self.scope.to_string(),
                                attempts,
                                elapsed_ms: started.elapsed().as_millis() as u64,
                                last_error: e.to_string(),
                            });
                        }
                        return Err(e);
                    }

                    warn!(
                        "Request to {} failed (attempt {}/{}): {}",
                        node.url, attempts, node_count, e
                    );
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(DocstoreError::AllNodesDown {
            database: self.scope.to_string(),
            attempts,
            elapsed_ms: started.elapsed().as_millis() as u64,
            last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    /// One attempt on one node, response cache included.
    async fn attempt<C: Command>(self: &Arc<Self>, command: &C, node: &ServerNode) -> Result<C::Output> {
        let mut request = command.build_request(node)?;
        let method = request.method.clone();
        let url = request.url.clone();
        let generation = self.write_generation.load(Ordering::SeqCst);

        let cached = if command.is_cacheable() {
            self.cache.lookup(&method, &url)
        } else {
            None
        };

        if let Some(entry) = &cached {
            if let Some(options) = aggressive::current_options() {
                if options.allows(entry, generation) {
                    debug!(url = %url, age_ms = entry.age().as_millis() as u64, "Serving aggressively cached response");
                    return command.parse_response(&entry.payload, true);
                }
            }
            request = request.with_header(IF_NONE_MATCH.as_str(), format!("\"{}\"", entry.change_token));
        }

        let response = self.transport.send(request).await?;

        if response.is_not_modified() {
            let entry = self.cache.touch(&method, &url, generation).or(cached).ok_or_else(|| {
                DocstoreError::InvalidResponse(format!(
                    "{} answered 304 Not Modified to an unconditional request",
                    node.url
                ))
            })?;
            self.selector.record_success(node);
            if response.refresh_topology_requested() {
                self.spawn_background_refresh();
            }
            debug!(url = %url, "Response not modified, using cached payload");
            return command.parse_response(&entry.payload, true);
        }

        if !response.is_success() {
            return Err(response.classify_failure(&node.url));
        }

        self.selector.record_success(node);
        if !command.is_read_request() {
            self.write_generation.fetch_add(1, Ordering::SeqCst);
        }
        if response.refresh_topology_requested() {
            self.spawn_background_refresh();
        }

        let output = command.parse_response(&response.body, false)?;
        if command.is_cacheable() {
            match response.change_token() {
                Some(token) => self.cache.store(&method, &url, token, response.body.clone(), generation),
                None => {
                    if self.cache.remove(&method, &url).is_some() {
                        debug!(url = %url, "Response without change token, dropped cached entry");
                    }
                }
            }
        }
        Ok(output)
    }
}
