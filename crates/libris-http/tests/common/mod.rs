#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use libris_http::http::StatusCode;
use libris_http::{
    ApiClient, ClientConfig, ConfigResolver, HttpPipeline, HttpRequest, HttpResponse, Result,
    Transport,
};
use serde_json::{Value, json};

pub const BASE_URL: &str = "http://api.test/api";

type Responder = Box<dyn Fn(usize, &HttpRequest) -> Result<HttpResponse> + Send + Sync>;

/// In-process backend recording every request it receives.
pub struct FakeBackend {
    calls: AtomicUsize,
    requests: Mutex<Vec<HttpRequest>>,
    delays: Mutex<VecDeque<Duration>>,
    responder: Responder,
}

impl FakeBackend {
    pub fn new(
        responder: impl Fn(usize, &HttpRequest) -> Result<HttpResponse> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            delays: Mutex::new(VecDeque::new()),
            responder: Box::new(responder),
        })
    }

    /// Answers every call with `{"status": true, "data": <call number>}`.
    pub fn counting() -> Arc<Self> {
        Self::new(|n, _| {
            Ok(HttpResponse::json(
                StatusCode::OK,
                &json!({ "status": true, "data": n }),
            ))
        })
    }

    pub fn replying(status: StatusCode, body: Value) -> Arc<Self> {
        Self::new(move |_, _| Ok(HttpResponse::json(status, &body)))
    }

    /// Delay applied to the next calls, in order.
    pub fn push_delay(&self, delay: Duration) {
        self.delays.lock().unwrap().push_back(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> HttpRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

impl Transport for FakeBackend {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().unwrap().push(request.clone());
        let delay = self.delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(n, &request)
    }
}

pub fn resolver() -> Arc<ConfigResolver> {
    Arc::new(ConfigResolver::new(ClientConfig::default().base_url(BASE_URL)))
}

pub fn pipeline(backend: &Arc<FakeBackend>) -> HttpPipeline<Arc<FakeBackend>> {
    HttpPipeline::new(backend.clone(), resolver())
}

pub fn client(backend: &Arc<FakeBackend>) -> ApiClient<Arc<FakeBackend>> {
    ApiClient::new(Arc::new(pipeline(backend)))
}
