use docstore_common::{HttpRequest, Result, ServerNode};
use serde::{Deserialize, Serialize};

use crate::command::{parse_json, Command};

/// Options sent when creating a subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubscriptionCreationOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_vector: Option<String>,
}

impl SubscriptionCreationOptions {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }
}

/// Creates (or, with an id, updates) a subscription and returns its name.
#[derive(Debug, Clone)]
pub struct CreateSubscriptionCommand {
    options: SubscriptionCreationOptions,
    id: Option<String>,
}

impl CreateSubscriptionCommand {
    pub fn new(options: SubscriptionCreationOptions) -> Self {
        Self { options, id: None }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateSubscriptionResult {
    name: String,
}

impl Command for CreateSubscriptionCommand {
    type Output = String;

    fn build_request(&self, node: &ServerNode) -> Result<HttpRequest> {
        let mut url = format!("{}/subscriptions", node.database_url());
        if let Some(id) = &self.id {
            url.push_str("?id=");
            url.push_str(&urlencoding::encode(id));
        }
        HttpRequest::put(url).with_json_body(&self.options)
    }

    fn parse_response(&self, body: &[u8], _from_cache: bool) -> Result<String> {
        Ok(parse_json::<CreateSubscriptionResult>(body)?.name)
    }

    fn is_read_request(&self) -> bool {
        false
    }
}
