//! Stateless HTTP request builder and response parser for the admin API.
//!
//! # Design
//! `ApiClient` holds only a `base_url` and carries no mutable state between
//! calls. Requests are produced as plain `HttpRequest` values and responses
//! are consumed as plain `HttpResponse` values; executing the round-trip is
//! the transport's job. The bearer token is attached by the caller that owns
//! the session, not here.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::envelope::{ErrorEnvelope, Unwrap};
use crate::error::ApiError;
use crate::form::MultipartForm;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::keys::normalized_params;

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET with the non-null members of `query` encoded as the query string.
    pub fn build_get<Q: Serialize>(&self, path: &str, query: &Q) -> Result<HttpRequest, ApiError> {
        let params = normalized_params(query)?;
        let mut url = self.url(path);
        if !params.is_empty() {
            let mut parsed = reqwest::Url::parse(&url)
                .map_err(|e| ApiError::Serialization(format!("invalid url {url}: {e}")))?;
            {
                let mut pairs = parsed.query_pairs_mut();
                for (name, value) in &params {
                    pairs.append_pair(name, &query_value(value));
                }
            }
            url = parsed.to_string();
        }
        Ok(HttpRequest {
            method: HttpMethod::Get,
            path: url,
            headers: Vec::new(),
            body: None,
        })
    }

    pub fn build_json<B: Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        body: &B,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_vec(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method,
            path: self.url(path),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        })
    }

    pub fn build_empty(&self, method: HttpMethod, path: &str) -> HttpRequest {
        HttpRequest {
            method,
            path: self.url(path),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn build_form(&self, method: HttpMethod, path: &str, form: &MultipartForm) -> HttpRequest {
        HttpRequest {
            method,
            path: self.url(path),
            headers: vec![("content-type".to_string(), form.content_type())],
            body: Some(form.encode()),
        }
    }

    /// Check the status, unwrap the envelope and deserialize the payload.
    pub fn parse<T: DeserializeOwned>(&self, response: HttpResponse, unwrap: Unwrap) -> Result<T, ApiError> {
        let value = self.parse_value(response, unwrap)?;
        serde_json::from_value(value).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    /// Like [`parse`](Self::parse) but keeps the payload untyped, for
    /// callers that need to look inside before committing to a shape.
    pub fn parse_value(&self, response: HttpResponse, unwrap: Unwrap) -> Result<Value, ApiError> {
        check_status(&response)?;
        unwrap.apply(&response.body)
    }
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(query_value).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    let message = ErrorEnvelope::message_from(&response.body);
    if response.status == 404 {
        return Err(ApiError::NotFound { message });
    }
    Err(ApiError::Server {
        status: response.status,
        message,
    })
}
