//! Test doubles shared by the client unit tests

use crate::transport::{ApiRequest, Transport};
use async_trait::async_trait;
use ragline_core::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

type Handler =
    Box<dyn Fn(&ApiRequest) -> Result<Option<serde_json::Value>> + Send + Sync>;

/// Scripted transport: answers every request through a single handler,
/// recording calls and optionally delaying to widen concurrency windows.
pub(crate) struct MockTransport {
    handler: Handler,
    delay: Option<Duration>,
    /// Per-call delays consumed in order, taking precedence over `delay`
    delay_queue: Mutex<Vec<Duration>>,
    calls: Mutex<Vec<ApiRequest>>,
    call_count: AtomicUsize,
}

impl MockTransport {
    pub fn new(
        handler: impl Fn(&ApiRequest) -> Result<Option<serde_json::Value>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            delay: None,
            delay_queue: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_delays(self, delays: Vec<Duration>) -> Self {
        *self.delay_queue.lock().unwrap() = delays;
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: ApiRequest) -> Result<Option<serde_json::Value>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(request.clone());
        let queued = {
            let mut queue = self.delay_queue.lock().unwrap();
            if queue.is_empty() {
                None
            } else {
                Some(queue.remove(0))
            }
        };
        if let Some(delay) = queued.or(self.delay) {
            tokio::time::sleep(delay).await;
        }
        (self.handler)(&request)
    }
}
