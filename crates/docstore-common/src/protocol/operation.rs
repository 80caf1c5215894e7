//! Long-running operation status documents.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier the server assigns to a long-running operation.
pub type OperationId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationStatus {
    Running,
    Completed,
    Faulted,
}

/// Status document returned by the operation-state endpoint.
///
/// On `Faulted`, `Result.Error` holds the server's error text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OperationState {
    pub status: OperationStatus,
    #[serde(default)]
    pub result: Option<Value>,
}

impl OperationState {
    /// Error text of a faulted operation.
    pub fn error_message(&self) -> Option<String> {
        let error = self.result.as_ref()?.get("Error")?;
        Some(match error {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.status != OperationStatus::Running
    }
}
