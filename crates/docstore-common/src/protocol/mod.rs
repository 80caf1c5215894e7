pub mod cluster;
pub mod error;
pub mod node;
pub mod operation;
pub mod requests;
pub mod responses;
pub mod topology;

pub use cluster::{ClusterTopology, ClusterTopologyResponse};
pub use error::{DocstoreError, Result, ServerErrorKind};
pub use node::ServerNode;
pub use operation::{OperationId, OperationState, OperationStatus};
pub use requests::HttpRequest;
pub use responses::{HttpResponse, DATABASE_DOES_NOT_EXIST, REFRESH_TOPOLOGY_HEADER};
pub use topology::{Topology, UNAUTHORITATIVE_ETAG};
