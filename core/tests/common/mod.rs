//! In-process transport for integration tests.
//!
//! Requests are dispatched straight into the mock server's axum router, so
//! tests exercise the real wire format without opening a socket. Every call
//! is recorded as `"METHOD /path"` (query string stripped), which lets tests
//! assert how many network round-trips a cache operation caused.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::Router;
use backoffice_core::{
    ApiError, Backoffice, ClientConfig, HttpRequest, HttpResponse, SessionStore, Transport,
};
use futures::future::BoxFuture;
use futures::FutureExt;
use http_body_util::BodyExt;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tower::ServiceExt;

pub const BASE_URL: &str = "http://mock.local/api";

pub struct RouterTransport {
    router: Router,
    calls: Mutex<Vec<String>>,
    requests: Mutex<Vec<HttpRequest>>,
    failures: Mutex<HashMap<String, HttpResponse>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl RouterTransport {
    pub fn new(router: Router) -> Self {
        Self {
            router,
            calls: Mutex::default(),
            requests: Mutex::default(),
            failures: Mutex::default(),
            gates: Mutex::default(),
        }
    }

    /// Calls so far, e.g. `["GET /users", "POST /users"]`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().iter().filter(|c| *c == call).count()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().last().cloned()
    }

    /// Answer `call` with `response` instead of routing it.
    pub fn fail(&self, call: &str, response: HttpResponse) {
        self.failures.lock().insert(call.to_string(), response);
    }

    /// Hold the next `call` until the returned `Notify` is signalled. Later
    /// calls pass straight through.
    pub fn hold(&self, call: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().insert(call.to_string(), gate.clone());
        gate
    }

    async fn dispatch(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let target = request
            .path
            .strip_prefix(BASE_URL)
            .unwrap_or(&request.path)
            .to_string();
        let route = target.split('?').next().unwrap_or_default();
        let call = format!("{} {route}", request.method);
        self.calls.lock().push(call.clone());
        self.requests.lock().push(request.clone());

        let gate = self.gates.lock().remove(&call);
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let canned = self.failures.lock().get(&call).cloned();
        if let Some(response) = canned {
            return Ok(response);
        }

        let mut builder = axum::http::Request::builder()
            .method(request.method.as_str())
            .uri(&target);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let http_request = builder
            .body(Body::from(request.body.unwrap_or_default()))
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let response = self
            .router
            .clone()
            .oneshot(http_request)
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|v| (name.to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?
            .to_bytes()
            .to_vec();
        Ok(HttpResponse { status, headers, body })
    }
}

impl Transport for RouterTransport {
    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, ApiError>> {
        self.dispatch(request).boxed()
    }
}

/// A client wired to a freshly seeded mock server.
pub fn backoffice() -> (Backoffice, Arc<RouterTransport>) {
    let transport = Arc::new(RouterTransport::new(mock_server::app()));
    let backoffice = Backoffice::with_session(
        ClientConfig::default().with_base_url(BASE_URL),
        transport.clone(),
        SessionStore::in_memory(),
    );
    (backoffice, transport)
}

pub fn server_error(status: u16, message: &str) -> HttpResponse {
    HttpResponse::json(
        status,
        serde_json::json!({ "success": false, "message": message }).to_string(),
    )
}
