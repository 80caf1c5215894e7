//! Built-in commands
//!
//! | Command | Request | Kind |
//! |---|---|---|
//! | [`GetDatabaseTopologyCommand`] | `GET /topology?name=` | read, topology probe |
//! | [`GetClusterTopologyCommand`] | `GET /cluster/topology` | read, topology probe (cluster executor) |
//! | [`GetDatabaseNamesCommand`] | `GET /databases?start=&pageSize=&namesOnly=true` | read, server-wide |
//! | [`GetNextOperationIdCommand`] | `GET /databases/{db}/operations/next-operation-id` | idempotent write |
//! | [`GetOperationStateCommand`] | `GET /databases/{db}/operations/state?id=` | read, never cached |
//! | [`KillOperationCommand`] | `POST /databases/{db}/operations/kill?id=` | idempotent write |
//! | [`BatchCommand`] | `POST /databases/{db}/bulk_docs` | write |
//! | [`CreateSubscriptionCommand`] | `PUT /databases/{db}/subscriptions` | write |
//!
//! Server-wide commands only use the node url and are normally sent through
//! a cluster executor ([`RequestExecutor::for_cluster`](crate::RequestExecutor::for_cluster)).
//! The others address `/databases/{db}` and need a database executor.

mod batch;
mod databases;
mod operations;
mod subscriptions;
mod topology;

pub use batch::BatchCommand;
pub use databases::GetDatabaseNamesCommand;
pub use operations::{GetNextOperationIdCommand, GetOperationStateCommand, KillOperationCommand};
pub use subscriptions::{CreateSubscriptionCommand, SubscriptionCreationOptions};
pub use topology::{GetClusterTopologyCommand, GetDatabaseTopologyCommand};
