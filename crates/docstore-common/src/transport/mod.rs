//! Docstore Transport Layer
//!
//! The dispatch core never talks to sockets directly. It hands a fully built
//! [`HttpRequest`] to a [`Transport`] and gets back a complete
//! [`HttpResponse`] or a node-local error.
//!
//! # Components
//!
//! - **[`Transport`]**: the send primitive the executor is generic over
//! - **[`HyperTransport`]**: HTTP/1.1 implementation on the hyper client
//!
//! Connection-level failures (refused, reset, DNS, body read errors) are
//! reported as [`DocstoreError::NodeUnreachable`](crate::DocstoreError) so the
//! executor can fail over. Any response the server managed to send, whatever
//! its status, is returned as `Ok` and classified by the caller.

pub mod http;

use std::future::Future;

use crate::protocol::{HttpRequest, HttpResponse, Result};

pub use http::HyperTransport;

/// Sends one request to one node.
pub trait Transport: Send + Sync + 'static {
    fn send(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse>> + Send;
}
