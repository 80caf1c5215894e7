//! Docstore Common Types and Transport
//!
//! This crate provides the protocol definitions and the HTTP transport used
//! by the docstore request-dispatch core.
//!
//! # Overview
//!
//! A docstore cluster is a set of HTTP nodes serving the same databases. The
//! client keeps a versioned [`Topology`] of those nodes and sends each
//! logical command to one of them. This crate holds what every layer of the
//! client shares:
//!
//! - **Protocol Layer**: nodes, topologies, operation status documents, raw
//!   requests/responses and the classified [`DocstoreError`]
//! - **Transport Layer**: the [`transport::Transport`] send primitive and its
//!   hyper implementation
//!
//! # Wire Shapes
//!
//! - Topology: `{"Etag": 12, "Nodes": [{"Url", "Database", "ClusterTag"?}]}`
//! - Cluster topology: `{"Etag", "Leader", "NodeTag", "Topology": {"AllNodes": {tag: url}, ...}}`
//! - Operation status: `{"Status": "Running" | "Completed" | "Faulted", "Result": {...}}`
//! - Server errors: `{"Type": "...", "Message": "...", "Error": "..."}`
//!
//! # Example
//!
//! ```
//! use docstore_common::{ServerNode, Topology};
//!
//! let seed = Topology::unauthoritative(&["http://127.0.0.1:8080".to_string()], "northwind");
//! assert!(!seed.is_authoritative());
//! assert_eq!(seed.nodes[0], ServerNode::new("http://127.0.0.1:8080", "northwind"));
//! ```

pub mod protocol;
pub mod transport;

pub use protocol::*;
