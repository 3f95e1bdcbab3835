//! In-memory transport for tests.
//!
//! Records every request it receives and answers through a responder
//! closure. `hold` parks subsequent fetches until `release` hands out
//! permits, which lets tests observe state while a request is in flight.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use apiary_core::error::{ApiaryError, ApiaryResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::Semaphore;

use super::{Transport, TransportRequest, TransportResponse};

type Responder = Box<dyn Fn(&TransportRequest) -> ApiaryResult<TransportResponse> + Send + Sync>;

pub struct MockTransport {
    responder: Responder,
    requests: Mutex<Vec<TransportRequest>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    completed: AtomicUsize,
}

impl MockTransport {
    /// Answer every request with `responder`
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&TransportRequest) -> ApiaryResult<TransportResponse> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
            completed: AtomicUsize::new(0),
        }
    }

    /// Answer every request with the same status and JSON body
    pub fn json(status: u16, body: Value) -> Self {
        let text = body.to_string();
        Self::new(move |_| Ok(TransportResponse::new(status, text.clone())))
    }

    /// Answer with `{"method", "url", "body"}` describing the request
    pub fn echo() -> Self {
        Self::new(|request| {
            let body = request
                .text_body()
                .and_then(|text| serde_json::from_str::<Value>(text).ok())
                .unwrap_or(Value::Null);
            let reply = json!({
                "method": request.method.as_str(),
                "url": request.url,
                "body": body,
            });
            Ok(TransportResponse::new(200, reply.to_string()))
        })
    }

    /// Park every later fetch until a permit is released
    pub fn hold(&self) {
        *self.gate.lock() = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let `count` parked fetches proceed
    pub fn release(&self, count: usize) {
        if let Some(gate) = self.gate.lock().as_ref() {
            gate.add_permits(count);
        }
    }

    /// Stop parking fetches and release everything currently parked
    pub fn open(&self) {
        if let Some(gate) = self.gate.lock().take() {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    /// Number of fetches received so far
    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    /// Number of fetches that produced a response or error
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// All requests received, in arrival order
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().clone()
    }

    pub fn last_request(&self) -> Option<TransportRequest> {
        self.requests.lock().last().cloned()
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("calls", &self.calls())
            .field("completed", &self.completed())
            .finish()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch(&self, request: TransportRequest) -> ApiaryResult<TransportResponse> {
        self.requests.lock().push(request.clone());

        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            let permit = gate.acquire().await.map_err(|e| {
                ApiaryError::network("Mock transport gate closed".to_string(), e)
            })?;
            permit.forget();
        }

        let result = (self.responder)(&request);
        self.completed.fetch_add(1, Ordering::SeqCst);
        result
    }
}
