use docstore_common::{HttpRequest, Result, ServerNode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::command::{parse_json, Command};

/// Sends a list of document commands in one request.
///
/// The batch is applied by the server as a single transaction. Whether it
/// is safe to resend after a node failure depends on its content, so the
/// caller declares it with [`with_idempotent`](Self::with_idempotent).
#[derive(Debug, Clone)]
pub struct BatchCommand {
    commands: Vec<Value>,
    idempotent: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct BatchBody<'a> {
    commands: &'a [Value],
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BatchResult {
    #[serde(default)]
    results: Vec<Value>,
}

impl BatchCommand {
    pub fn new(commands: Vec<Value>) -> Self {
        Self {
            commands,
            idempotent: false,
        }
    }

    pub fn with_idempotent(mut self, idempotent: bool) -> Self {
        self.idempotent = idempotent;
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Command for BatchCommand {
    type Output = Vec<Value>;

    fn build_request(&self, node: &ServerNode) -> Result<HttpRequest> {
        HttpRequest::post(format!("{}/bulk_docs", node.database_url())).with_json_body(&BatchBody {
            commands: &self.commands,
        })
    }

    fn parse_response(&self, body: &[u8], _from_cache: bool) -> Result<Vec<Value>> {
        Ok(parse_json::<BatchResult>(body)?.results)
    }

    fn is_read_request(&self) -> bool {
        false
    }

    fn is_idempotent_write(&self) -> bool {
        self.idempotent
    }
}
