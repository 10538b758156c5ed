//! Shared helpers for the HTTP-level tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;
use wiremock::{Match, Request, Respond, ResponseTemplate};

/// Serves each body once in order, then repeats the last one.
pub struct ReplySequence {
    bodies: Vec<serde_json::Value>,
    served: AtomicUsize,
}

impl ReplySequence {
    pub fn new(bodies: Vec<serde_json::Value>) -> Self {
        Self {
            bodies,
            served: AtomicUsize::new(0),
        }
    }
}

impl Respond for ReplySequence {
    fn respond(&self, _: &Request) -> ResponseTemplate {
        let served = self.served.fetch_add(1, Ordering::SeqCst);
        let body = &self.bodies[served.min(self.bodies.len() - 1)];
        ResponseTemplate::new(200).set_body_json(body.clone())
    }
}

/// Matches only requests that carry no Authorization header.
pub struct NoAuthHeader;

impl Match for NoAuthHeader {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key("authorization")
    }
}

/// A poll body with the given nested task status.
pub fn status_body(status: &str) -> serde_json::Value {
    json!({"output": {"task_status": status}, "request_id": "req-1"})
}
