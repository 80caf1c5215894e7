use docstore_common::{HttpRequest, Result, ServerNode};
use serde::de::DeserializeOwned;

/// One server operation: how to build its request and how to read its
/// response.
///
/// A command is built by its caller, handed to
/// [`RequestExecutor::execute`](crate::RequestExecutor::execute) by reference
/// and never shared between concurrent dispatches. The executor may call
/// [`build_request`](Command::build_request) several times while failing
/// over, once per node it tries.
///
/// # Retry safety
///
/// A command is retried on another node only if it is a read or declares
/// itself an idempotent write. Everything else fails on the first node-local
/// error.
pub trait Command: Send + Sync {
    type Output: Send;

    /// Builds the request for `node`.
    fn build_request(&self, node: &ServerNode) -> Result<HttpRequest>;

    /// Parses a successful response body. `from_cache` is true when the body
    /// came from the response cache instead of the network.
    fn parse_response(&self, body: &[u8], from_cache: bool) -> Result<Self::Output>;

    fn is_read_request(&self) -> bool;

    fn is_idempotent_write(&self) -> bool {
        false
    }

    /// Topology probes are sent to the seed urls directly, bypassing node
    /// selection.
    fn is_topology_probe(&self) -> bool {
        false
    }

    fn is_cacheable(&self) -> bool {
        self.is_read_request()
    }

    fn is_retry_safe(&self) -> bool {
        self.is_read_request() || self.is_idempotent_write()
    }
}

/// Deserializes a JSON response body.
pub(crate) fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(body)?)
}
