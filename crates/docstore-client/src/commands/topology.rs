use docstore_common::{ClusterTopologyResponse, HttpRequest, Result, ServerNode, Topology};

use crate::command::{parse_json, Command};

/// Fetches the topology of the node's database.
#[derive(Debug, Clone, Default)]
pub struct GetDatabaseTopologyCommand;

impl GetDatabaseTopologyCommand {
    pub fn new() -> Self {
        Self
    }
}

impl Command for GetDatabaseTopologyCommand {
    type Output = Topology;

    fn build_request(&self, node: &ServerNode) -> Result<HttpRequest> {
        Ok(HttpRequest::get(format!(
            "{}/topology?name={}",
            node.url,
            urlencoding::encode(&node.database)
        )))
    }

    fn parse_response(&self, body: &[u8], _from_cache: bool) -> Result<Topology> {
        parse_json(body)
    }

    fn is_read_request(&self) -> bool {
        true
    }

    fn is_topology_probe(&self) -> bool {
        true
    }

    fn is_cacheable(&self) -> bool {
        false
    }
}

/// Fetches the membership of the whole cluster, independent of any
/// database.
#[derive(Debug, Clone, Default)]
pub struct GetClusterTopologyCommand;

impl GetClusterTopologyCommand {
    pub fn new() -> Self {
        Self
    }
}

impl Command for GetClusterTopologyCommand {
    type Output = ClusterTopologyResponse;

    fn build_request(&self, node: &ServerNode) -> Result<HttpRequest> {
        Ok(HttpRequest::get(format!("{}/cluster/topology", node.url)))
    }

    fn parse_response(&self, body: &[u8], _from_cache: bool) -> Result<ClusterTopologyResponse> {
        parse_json(body)
    }

    fn is_read_request(&self) -> bool {
        true
    }

    fn is_topology_probe(&self) -> bool {
        true
    }

    fn is_cacheable(&self) -> bool {
        false
    }
}
