//! Scripted in-memory transport for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use docstore_common::transport::Transport;
use docstore_common::{DocstoreError, HttpRequest, HttpResponse, Result};
use hyper::header::{HeaderName, HeaderValue, ETAG};
use hyper::StatusCode;
use serde_json::Value;

/// What the mock does with a matching request.
#[derive(Clone, Debug)]
pub enum Reply {
    Respond(HttpResponse),
    Unreachable,
    Delayed(Duration, Box<Reply>),
}

impl Reply {
    pub fn json(status: StatusCode, body: Value) -> Self {
        Reply::Respond(HttpResponse::new(status, body.to_string()))
    }

    pub fn ok(body: Value) -> Self {
        Self::json(StatusCode::OK, body)
    }

    pub fn status(status: StatusCode) -> Self {
        Reply::Respond(HttpResponse::new(status, ""))
    }

    pub fn delayed(self, delay: Duration) -> Self {
        Reply::Delayed(delay, Box::new(self))
    }

    pub fn with_etag(self, token: &str) -> Self {
        self.with_header(ETAG.as_str(), &format!("\"{}\"", token))
    }

    pub fn with_header(self, name: &str, value: &str) -> Self {
        match self {
            Reply::Respond(mut response) => {
                if let (Ok(name), Ok(value)) = (
                    HeaderName::from_bytes(name.as_bytes()),
                    HeaderValue::from_str(value),
                ) {
                    response.headers.insert(name, value);
                }
                Reply::Respond(response)
            }
            Reply::Delayed(delay, inner) => Reply::Delayed(delay, Box::new(inner.with_header(name, value))),
            Reply::Unreachable => Reply::Unreachable,
        }
    }
}

struct Route {
    pattern: String,
    replies: VecDeque<Reply>,
}

#[derive(Default)]
struct State {
    routes: Vec<Route>,
    calls: Vec<HttpRequest>,
}

/// Transport answering from per-url scripts.
///
/// A request is matched against routes in registration order; the first
/// route whose pattern is a substring of the url answers. Each route pops
/// its replies in order and repeats the last one forever. Requests with no
/// matching route are treated as unreachable.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<State>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `reply` to the script of `pattern`.
    pub fn route(&self, pattern: &str, reply: Reply) -> &Self {
        let mut state = self.state.lock().unwrap();
        match state.routes.iter_mut().find(|r| r.pattern == pattern) {
            Some(route) => route.replies.push_back(reply),
            None => state.routes.push(Route {
                pattern: pattern.to_string(),
                replies: VecDeque::from([reply]),
            }),
        }
        self
    }

    pub fn calls(&self) -> Vec<HttpRequest> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    /// Number of requests whose url contains `pattern`.
    pub fn calls_to(&self, pattern: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.url.contains(pattern))
            .count()
    }

    fn next_reply(&self, request: &HttpRequest) -> Option<Reply> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(request.clone());
        let route = state
            .routes
            .iter_mut()
            .find(|r| request.url.contains(&r.pattern))?;
        if route.replies.len() > 1 {
            route.replies.pop_front()
        } else {
            route.replies.front().cloned()
        }
    }
}

impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut reply = self.next_reply(&request);
        loop {
            match reply {
                Some(Reply::Respond(response)) => return Ok(response),
                Some(Reply::Delayed(delay, inner)) => {
                    tokio::time::sleep(delay).await;
                    reply = Some(*inner);
                }
                Some(Reply::Unreachable) | None => {
                    return Err(DocstoreError::NodeUnreachable {
                        url: request.url.clone(),
                        reason: "connection refused".to_string(),
                    })
                }
            }
        }
    }
}
