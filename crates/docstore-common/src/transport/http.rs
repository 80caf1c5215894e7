//! HTTP Transport
//!
//! [`HyperTransport`] sends requests with a pooled hyper client. One client
//! is created per transport and shared by every concurrent request, so
//! keep-alive connections to the same node are reused.
//!
//! # Example
//!
//! ```no_run
//! use docstore_common::transport::{HyperTransport, Transport};
//! use docstore_common::HttpRequest;
//!
//! # #[tokio::main]
//! # async fn main() -> docstore_common::Result<()> {
//! let transport = HyperTransport::new();
//! let response = transport
//!     .send(HttpRequest::get("http://127.0.0.1:8080/topology?name=db"))
//!     .await?;
//! println!("{}", response.status);
//! # Ok(())
//! # }
//! ```

use std::error::Error as StdError;
use std::time::Duration;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use super::Transport;
use crate::protocol::error::{DocstoreError, Result};
use crate::protocol::{HttpRequest, HttpResponse};

/// Default time allowed to establish a TCP connection
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Hyper-backed [`Transport`].
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Full<Bytes>>,
}

impl HyperTransport {
    /// Creates a transport with the default connect timeout.
    pub fn new() -> Self {
        Self::with_connect_timeout(DEFAULT_CONNECT_TIMEOUT)
    }

    /// Creates a transport that gives up connecting after `timeout`.
    pub fn with_connect_timeout(timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(timeout));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client }
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HyperTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = request.url.clone();

        let mut builder = hyper::Request::builder()
            .method(request.method)
            .uri(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let http_request = builder.body(Full::new(request.body.unwrap_or_default()))?;

        let response = self
            .client
            .request(http_request)
            .await
            .map_err(|e| unreachable_node(&url, &e))?;

        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| unreachable_node(&url, &e))?
            .to_bytes();

        Ok(HttpResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }
}

/// Flattens an error and its sources into a `NodeUnreachable`.
///
/// hyper's top-level messages ("client error (Connect)") hide the cause.
fn unreachable_node(url: &str, err: &(dyn StdError + 'static)) -> DocstoreError {
    let mut reason = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        reason.push_str(": ");
        reason.push_str(&cause.to_string());
        source = cause.source();
    }
    DocstoreError::NodeUnreachable {
        url: url.to_string(),
        reason,
    }
}
