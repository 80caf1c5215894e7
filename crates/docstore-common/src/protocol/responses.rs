//! Raw responses and failure classification.
//!
//! The executor never interprets a body beyond this module: a successful
//! body goes to the command's parser, a failing one is turned into exactly
//! one classified [`DocstoreError`].

use hyper::body::Bytes;
use hyper::{HeaderMap, StatusCode};
use serde::Deserialize;

use super::error::{DocstoreError, ServerErrorKind};

/// Header a node sets when the client should re-fetch the topology.
pub const REFRESH_TOPOLOGY_HEADER: &str = "refresh-topology";

/// Server error type meaning the requested database does not exist.
pub const DATABASE_DOES_NOT_EXIST: &str = "DatabaseDoesNotExistException";

/// A complete response as returned by a transport.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_not_modified(&self) -> bool {
        self.status == StatusCode::NOT_MODIFIED
    }

    /// The change token from the `ETag` header, without surrounding quotes.
    pub fn change_token(&self) -> Option<String> {
        let value = self.headers.get(hyper::header::ETAG)?.to_str().ok()?;
        Some(value.trim_matches('"').to_string())
    }

    /// Whether the node asked the client to refresh its topology.
    pub fn refresh_topology_requested(&self) -> bool {
        self.headers
            .get(REFRESH_TOPOLOGY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// Classifies a non-success response from the node at `url`.
    ///
    /// 408, 502, 503 and 504 are node-local and may be retried elsewhere.
    /// Everything else is the node's authoritative answer.
    pub fn classify_failure(&self, url: &str) -> DocstoreError {
        let body = ServerErrorBody::parse(&self.body);
        let message = body.message().unwrap_or_else(|| {
            self.status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });

        if body.error_type.as_deref() == Some(DATABASE_DOES_NOT_EXIST) {
            return self.authoritative(url, ServerErrorKind::DatabaseDoesNotExist, message);
        }

        match self.status {
            StatusCode::REQUEST_TIMEOUT
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT => DocstoreError::NodeUnreachable {
                url: url.to_string(),
                reason: format!("{}: {}", self.status, message),
            },
            StatusCode::NOT_FOUND => {
                self.authoritative(url, ServerErrorKind::DatabaseDoesNotExist, message)
            }
            StatusCode::BAD_REQUEST => self.authoritative(url, ServerErrorKind::BadRequest, message),
            StatusCode::CONFLICT => self.authoritative(url, ServerErrorKind::Conflict, message),
            _ => self.authoritative(url, ServerErrorKind::Other, message),
        }
    }

    fn authoritative(&self, url: &str, kind: ServerErrorKind, message: String) -> DocstoreError {
        DocstoreError::AuthoritativeServerError {
            url: url.to_string(),
            status: self.status,
            kind,
            message,
        }
    }
}

/// Error document servers attach to failing responses.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ServerErrorBody {
    #[serde(rename = "Type")]
    error_type: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

impl ServerErrorBody {
    fn parse(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    fn message(&self) -> Option<String> {
        self.message.clone().or_else(|| self.error.clone())
    }
}
