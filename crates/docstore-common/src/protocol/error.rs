use hyper::StatusCode;
use thiserror::Error;

/// Kind of an error a server reported authoritatively.
///
/// These come from exactly one node and are trusted as ground truth, so the
/// executor never fails over on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerErrorKind {
    /// The database named by the executor does not exist on the cluster
    DatabaseDoesNotExist,
    /// The request was malformed (400)
    BadRequest,
    /// The request conflicted with the current state (409)
    Conflict,
    /// Any other status the server chose to report
    Other,
}

#[derive(Error, Debug)]
pub enum DocstoreError {
    #[error("Node {url} unreachable: {reason}")]
    NodeUnreachable { url: String, reason: String },

    #[error("All nodes of database '{database}' are down ({attempts} attempts in {elapsed_ms}ms), last error: {last_error}")]
    AllNodesDown {
        database: String,
        attempts: usize,
        elapsed_ms: u64,
        last_error: String,
    },

    #[error("Request timeout after {elapsed_ms}ms{}", last_node_suffix(.url))]
    Timeout { elapsed_ms: u64, url: Option<String> },

    #[error("Server {url} responded {status}: {message}")]
    AuthoritativeServerError {
        url: String,
        status: StatusCode,
        kind: ServerErrorKind,
        message: String,
    },

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl DocstoreError {
    /// Whether the failure is local to one node, so another node may serve
    /// the same request.
    pub fn is_node_local(&self) -> bool {
        matches!(self, DocstoreError::NodeUnreachable { .. })
    }

    /// The server error kind, if the error was reported by a server.
    pub fn server_error_kind(&self) -> Option<&ServerErrorKind> {
        match self {
            DocstoreError::AuthoritativeServerError { kind, .. } => Some(kind),
            _ => None,
        }
    }
}

impl From<hyper::http::Error> for DocstoreError {
    fn from(err: hyper::http::Error) -> Self {
        DocstoreError::Transport(format!("Failed to build request: {}", err))
    }
}

impl From<hyper::http::uri::InvalidUri> for DocstoreError {
    fn from(err: hyper::http::uri::InvalidUri) -> Self {
        DocstoreError::InvalidConfiguration(err.to_string())
    }
}

fn last_node_suffix(url: &Option<String>) -> String {
    url.as_ref()
        .map(|u| format!(" (last node: {})", u))
        .unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, DocstoreError>;
