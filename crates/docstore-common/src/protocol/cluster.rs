use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::node::ServerNode;
use super::topology::Topology;

/// Membership of the whole cluster, by node tag.
///
/// Every map goes from a node tag (`"A"`, `"B"`, ...) to that node's url.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClusterTopology {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology_id: Option<String>,
    #[serde(default)]
    pub all_nodes: BTreeMap<String, String>,
    #[serde(default)]
    pub members: BTreeMap<String, String>,
    #[serde(default)]
    pub promotables: BTreeMap<String, String>,
    #[serde(default)]
    pub watchers: BTreeMap<String, String>,
}

/// Answer to `GET /cluster/topology`.
///
/// Wire shape:
/// `{"Etag": 3, "Leader": "A", "NodeTag": "B", "Topology": {"AllNodes": {"A": "http://..."}}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClusterTopologyResponse {
    pub etag: i64,
    /// Tag of the current leader, if one is elected
    #[serde(default)]
    pub leader: Option<String>,
    /// Tag of the node that answered
    #[serde(default)]
    pub node_tag: Option<String>,
    pub topology: ClusterTopology,
}

impl ClusterTopologyResponse {
    /// Flattens the cluster into a dispatch [`Topology`].
    ///
    /// The leader comes first so writes reach it; the other nodes follow in
    /// tag order. Nodes carry their tag and no database.
    pub fn to_topology(&self) -> Topology {
        let leader = self
            .leader
            .as_ref()
            .and_then(|tag| self.topology.all_nodes.get_key_value(tag));

        let nodes = leader
            .into_iter()
            .chain(
                self.topology
                    .all_nodes
                    .iter()
                    .filter(|(tag, _)| Some(*tag) != self.leader.as_ref()),
            )
            .map(|(tag, url)| ServerNode::new(url.as_str(), "").with_cluster_tag(tag.as_str()))
            .collect();

        Topology::new(self.etag, nodes)
    }
}
