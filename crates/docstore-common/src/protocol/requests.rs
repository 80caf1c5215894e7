use hyper::body::Bytes;
use hyper::Method;
use serde::Serialize;

use super::error::Result;

/// A request a command wants sent to one node.
///
/// Commands build these against a concrete [`ServerNode`](super::ServerNode);
/// the executor may add conditional headers before handing it to the
/// transport.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Serializes `value` as the JSON body and sets the content type.
    pub fn with_json_body<T: Serialize>(mut self, value: &T) -> Result<Self> {
        let body = serde_json::to_vec(value)?;
        self.body = Some(Bytes::from(body));
        Ok(self.with_header("Content-Type", "application/json"))
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
