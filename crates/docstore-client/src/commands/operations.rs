use docstore_common::{HttpRequest, OperationId, OperationState, Result, ServerNode};
use serde::Deserialize;

use crate::command::{parse_json, Command};

/// Allocates an id for a long-running operation.
///
/// Not a read, but retrying it only wastes an id, so it is declared an
/// idempotent write.
#[derive(Debug, Clone, Default)]
pub struct GetNextOperationIdCommand;

impl GetNextOperationIdCommand {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NextOperationId {
    id: OperationId,
}

impl Command for GetNextOperationIdCommand {
    type Output = OperationId;

    fn build_request(&self, node: &ServerNode) -> Result<HttpRequest> {
        Ok(HttpRequest::get(format!(
            "{}/operations/next-operation-id",
            node.database_url()
        )))
    }

    fn parse_response(&self, body: &[u8], _from_cache: bool) -> Result<OperationId> {
        Ok(parse_json::<NextOperationId>(body)?.id)
    }

    fn is_read_request(&self) -> bool {
        false
    }

    fn is_idempotent_write(&self) -> bool {
        true
    }
}

/// Reads the status document of an operation.
#[derive(Debug, Clone)]
pub struct GetOperationStateCommand {
    id: OperationId,
}

impl GetOperationStateCommand {
    pub fn new(id: OperationId) -> Self {
        Self { id }
    }
}

impl Command for GetOperationStateCommand {
    type Output = OperationState;

    fn build_request(&self, node: &ServerNode) -> Result<HttpRequest> {
        Ok(HttpRequest::get(format!(
            "{}/operations/state?id={}",
            node.database_url(),
            self.id
        )))
    }

    fn parse_response(&self, body: &[u8], _from_cache: bool) -> Result<OperationState> {
        parse_json(body)
    }

    fn is_read_request(&self) -> bool {
        true
    }

    // A cached status would stall the poller
    fn is_cacheable(&self) -> bool {
        false
    }
}

/// Asks the server to cancel a running operation.
#[derive(Debug, Clone)]
pub struct KillOperationCommand {
    id: OperationId,
}

impl KillOperationCommand {
    pub fn new(id: OperationId) -> Self {
        Self { id }
    }
}

impl Command for KillOperationCommand {
    type Output = ();

    fn build_request(&self, node: &ServerNode) -> Result<HttpRequest> {
        Ok(HttpRequest::post(format!(
            "{}/operations/kill?id={}",
            node.database_url(),
            self.id
        )))
    }

    fn parse_response(&self, _body: &[u8], _from_cache: bool) -> Result<()> {
        Ok(())
    }

    fn is_read_request(&self) -> bool {
        false
    }

    fn is_idempotent_write(&self) -> bool {
        true
    }
}
