use docstore_common::{HttpRequest, Result, ServerNode};
use serde::Deserialize;

use crate::command::{parse_json, Command};

/// Lists database names on the cluster, one page at a time.
#[derive(Debug, Clone)]
pub struct GetDatabaseNamesCommand {
    start: usize,
    page_size: usize,
}

impl GetDatabaseNamesCommand {
    pub fn new(start: usize, page_size: usize) -> Self {
        Self { start, page_size }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DatabaseNames {
    databases: Vec<String>,
}

impl Command for GetDatabaseNamesCommand {
    type Output = Vec<String>;

    fn build_request(&self, node: &ServerNode) -> Result<HttpRequest> {
        Ok(HttpRequest::get(format!(
            "{}/databases?start={}&pageSize={}&namesOnly=true",
            node.url, self.start, self.page_size
        )))
    }

    fn parse_response(&self, body: &[u8], _from_cache: bool) -> Result<Vec<String>> {
        Ok(parse_json::<DatabaseNames>(body)?.databases)
    }

    fn is_read_request(&self) -> bool {
        true
    }
}
