//! Scriptable in-process [`Transport`] for tests and offline demos.
//!
//! Replies are looked up per path: queued one-shot replies first, then a
//! persistent reply for that path, then the global fallback. A request with
//! no matching reply fails as a connection error, the same as an unreachable
//! backend.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use super::{HttpRequest, HttpResponse, Transport, TransportError};

pub type MockReply = Result<HttpResponse, TransportError>;

#[derive(Default)]
struct MockState {
    queued: HashMap<&'static str, VecDeque<MockReply>>,
    persistent: HashMap<&'static str, MockReply>,
    fallback: Option<MockReply>,
    requests: Vec<HttpRequest>,
}

#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply served once for `path`.
    pub fn on(&self, path: &'static str, reply: MockReply) -> &Self {
        self.state
            .lock()
            .queued
            .entry(path)
            .or_default()
            .push_back(reply);
        self
    }

    /// Reply for `path` whenever its queue is empty.
    pub fn always_on(&self, path: &'static str, reply: MockReply) -> &Self {
        self.state.lock().persistent.insert(path, reply);
        self
    }

    /// Reply for any path without its own script.
    pub fn otherwise(&self, reply: MockReply) -> &Self {
        self.state.lock().fallback = Some(reply);
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().requests.clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<HttpRequest> {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|request| request.path == path)
            .cloned()
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().requests.len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut state = self.state.lock();
        let path = request.path;
        state.requests.push(request);

        if let Some(reply) = state.queued.get_mut(path).and_then(VecDeque::pop_front) {
            return reply;
        }
        if let Some(reply) = state.persistent.get(path) {
            return reply.clone();
        }
        state
            .fallback
            .clone()
            .unwrap_or_else(|| Err(TransportError::Connect(format!("no mock reply for {path}"))))
    }
}

/// `200 {success: true, data}`
pub fn ok(data: Value) -> MockReply {
    Ok(HttpResponse {
        status: 200,
        body: json!({ "success": true, "data": data }),
    })
}

/// `200` with a raw body, for flat (envelope-less) payloads.
pub fn ok_raw(body: Value) -> MockReply {
    Ok(HttpResponse { status: 200, body })
}

/// `200 {success: false, message}`
pub fn rejected(message: &str) -> MockReply {
    Ok(HttpResponse {
        status: 200,
        body: json!({ "success": false, "message": message }),
    })
}

pub fn status(code: u16) -> MockReply {
    Ok(HttpResponse {
        status: code,
        body: json!({ "success": false, "message": format!("status {code}") }),
    })
}

pub fn network_down() -> MockReply {
    Err(TransportError::Connect("connection refused".to_string()))
}
