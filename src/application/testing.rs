// Scripted in-memory transport for exercising the polling core without a network
use crate::application::error::FetchError;
use crate::application::transport::{ApiRequest, ApiResponse, Method, Transport};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
enum ReplyOutcome {
    Json(u16, serde_json::Value),
    Raw(u16, String, Vec<u8>),
    Fail(FetchError),
    Hang,
}

#[derive(Debug, Clone)]
pub struct Reply {
    delay: Duration,
    outcome: ReplyOutcome,
}

impl Reply {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: ReplyOutcome::Json(status, body),
        }
    }

    pub fn ok(body: serde_json::Value) -> Self {
        Self::json(200, body)
    }

    pub fn raw(status: u16, content_type: &str, body: &[u8]) -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: ReplyOutcome::Raw(status, content_type.to_string(), body.to_vec()),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: ReplyOutcome::Fail(FetchError::Transport("connection refused".to_string())),
        }
    }

    /// Never answers; only a time bound or cancellation ends the request.
    pub fn hang() -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: ReplyOutcome::Hang,
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Default)]
struct ScriptState {
    queued: HashMap<(Method, String), VecDeque<Reply>>,
    fixed: HashMap<(Method, String), Reply>,
    calls: Vec<ApiRequest>,
    active: HashMap<String, usize>,
    peak: HashMap<String, usize>,
}

#[derive(Default)]
pub struct ScriptedTransport {
    state: Mutex<ScriptState>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Standing reply for every request to the route.
    pub fn respond(&self, method: Method, path: &str, reply: Reply) {
        let mut state = self.state.lock().unwrap();
        state.fixed.insert((method, path.to_string()), reply);
    }

    /// One-off reply served before the standing one.
    pub fn enqueue(&self, method: Method, path: &str, reply: Reply) {
        let mut state = self.state.lock().unwrap();
        state
            .queued
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
    }

    pub fn calls(&self, method: Method, path: &str) -> usize {
        let state = self.state.lock().unwrap();
        state
            .calls
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn in_flight(&self, path: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.active.get(path).copied().unwrap_or(0)
    }

    pub fn peak_in_flight(&self, path: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.peak.get(path).copied().unwrap_or(0)
    }

    fn begin(&self, request: &ApiRequest) -> Reply {
        let mut state = self.state.lock().unwrap();
        state.calls.push(request.clone());

        let route = (request.method, request.path.clone());
        let queued = state.queued.get_mut(&route).and_then(|q| q.pop_front());
        let reply = match queued {
            Some(reply) => reply,
            None => state
                .fixed
                .get(&route)
                .cloned()
                .unwrap_or_else(|| Reply::json(404, serde_json::json!({"error": "no such route"}))),
        };

        let active = state.active.entry(request.path.clone()).or_default();
        *active += 1;
        let now = *active;
        let peak = state.peak.entry(request.path.clone()).or_default();
        *peak = (*peak).max(now);

        reply
    }
}

struct ActiveGuard<'a> {
    transport: &'a ScriptedTransport,
    path: String,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.transport.state.lock() {
            if let Some(active) = state.active.get_mut(&self.path) {
                *active = active.saturating_sub(1);
            }
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, FetchError> {
        let reply = self.begin(&request);
        let _guard = ActiveGuard {
            transport: self,
            path: request.path.clone(),
        };

        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }

        match reply.outcome {
            ReplyOutcome::Json(status, body) => Ok(ApiResponse {
                status,
                content_type: Some("application/json".to_string()),
                body: Bytes::from(body.to_string()),
            }),
            ReplyOutcome::Raw(status, content_type, body) => Ok(ApiResponse {
                status,
                content_type: Some(content_type),
                body: Bytes::from(body),
            }),
            ReplyOutcome::Fail(err) => Err(err),
            ReplyOutcome::Hang => std::future::pending().await,
        }
    }
}
