//! Executes `HttpRequest` values.
//!
//! The core never performs I/O itself; everything above this trait works on
//! plain request/response data. Production code uses [`ReqwestTransport`];
//! tests plug in transports that route requests to an in-process server or
//! return canned responses.

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

pub trait Transport: Send + Sync {
    /// Perform the round-trip. Non-2xx statuses are returned as data, not
    /// as errors; only failures to obtain a response are `Err`.
    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, ApiError>>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, ApiError>> {
        async move {
            let mut builder = self.client.request(method(request.method), &request.path);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(body) = request.body {
                builder = builder.body(body);
            }
            let response = builder
                .send()
                .await
                .map_err(|e| ApiError::Transport(e.to_string()))?;
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|value| (name.as_str().to_string(), value.to_string()))
                })
                .collect();
            let body = response
                .bytes()
                .await
                .map_err(|e| ApiError::Transport(e.to_string()))?
                .to_vec();
            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn methods_map_to_reqwest() {
        assert_eq!(method(HttpMethod::Patch), reqwest::Method::PATCH);
        assert_eq!(method(HttpMethod::Delete), reqwest::Method::DELETE);
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let transport = ReqwestTransport::new();
        let request = HttpRequest {
            method: HttpMethod::Get,
            path: "http://127.0.0.1:1/users".to_string(),
            headers: Vec::new(),
            body: None,
        };
        let err = transport.execute(request).await.unwrap_err();
        assert!(err.is_transport());
    }
}
