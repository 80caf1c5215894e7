use serde::{Deserialize, Deserializer, Serialize};
use std::hash::{Hash, Hasher};

/// A cluster node serving one database.
///
/// Equality and hashing only consider `url` and `database`; the cluster tag
/// is informational.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerNode {
    #[serde(deserialize_with = "deserialize_url")]
    pub url: String,
    pub database: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_tag: Option<String>,
}

impl ServerNode {
    pub fn new(url: impl Into<String>, database: impl Into<String>) -> Self {
        let url: String = url.into();
        Self {
            url: normalize_url(&url),
            database: database.into(),
            cluster_tag: None,
        }
    }

    pub fn with_cluster_tag(mut self, tag: impl Into<String>) -> Self {
        self.cluster_tag = Some(tag.into());
        self
    }

    /// Base url of this node's database endpoints.
    pub fn database_url(&self) -> String {
        format!("{}/databases/{}", self.url, self.database)
    }
}

/// Node urls never end with `/`, so `{url}/databases/...` stays well-formed.
fn normalize_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn deserialize_url<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let url = String::deserialize(deserializer)?;
    Ok(normalize_url(&url))
}

impl PartialEq for ServerNode {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url && self.database == other.database
    }
}

impl Eq for ServerNode {}

impl Hash for ServerNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.hash(state);
        self.database.hash(state);
    }
}
