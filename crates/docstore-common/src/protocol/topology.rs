use serde::{Deserialize, Serialize};

use super::node::ServerNode;

/// Etag of a topology built from the caller's seed urls rather than fetched
/// from the cluster.
pub const UNAUTHORITATIVE_ETAG: i64 = -1;

/// A versioned, ordered list of the nodes serving a database.
///
/// Node 0 is the presumed leader. Wire shape:
/// `{"Etag": 12, "Nodes": [{"Url": "...", "Database": "...", "ClusterTag": "A"}]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Topology {
    pub etag: i64,
    pub nodes: Vec<ServerNode>,
}

impl Topology {
    pub fn new(etag: i64, nodes: Vec<ServerNode>) -> Self {
        Self { etag, nodes }
    }

    /// Builds the seed topology from the caller-supplied urls.
    pub fn unauthoritative(urls: &[String], database: &str) -> Self {
        let nodes = urls
            .iter()
            .map(|url| ServerNode::new(url.as_str(), database))
            .collect();
        Self {
            etag: UNAUTHORITATIVE_ETAG,
            nodes,
        }
    }

    pub fn is_authoritative(&self) -> bool {
        self.etag != UNAUTHORITATIVE_ETAG
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
