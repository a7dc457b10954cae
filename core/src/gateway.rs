//! The one place requests leave the process.
//!
//! A [`Gateway`] bundles the request builder, the transport, the session and
//! the query cache. It attaches the bearer token to every request and turns
//! request builders into read and write hooks bound to the shared cache.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::client::ApiClient;
use crate::envelope::{pluck, Unwrap};
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::keys::QueryKey;
use crate::mutation::Mutation;
use crate::query::{Query, QueryClient};
use crate::session::SessionStore;
use crate::transport::Transport;

struct Inner {
    api: ApiClient,
    transport: Arc<dyn Transport>,
    session: SessionStore,
    cache: QueryClient,
}

/// Cheap to clone; clones share the transport, session and cache.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<Inner>,
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("base_url", &self.inner.api.base_url())
            .field("cache", &self.inner.cache)
            .finish()
    }
}

impl Gateway {
    pub fn new(api: ApiClient, transport: Arc<dyn Transport>, session: SessionStore, cache: QueryClient) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                transport,
                session,
                cache,
            }),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    pub fn cache(&self) -> &QueryClient {
        &self.inner.cache
    }

    /// Attach the session token and run the round-trip.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let request = request.with_bearer(self.inner.session.token().as_deref());
        debug!(method = %request.method, path = %request.path, "sending request");
        let response = self.inner.transport.execute(request).await?;
        debug!(status = response.status, "response received");
        Ok(response)
    }

    pub async fn execute<T: DeserializeOwned>(&self, request: HttpRequest, unwrap: Unwrap) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        self.inner.api.parse(response, unwrap)
    }

    pub async fn execute_value(&self, request: HttpRequest, unwrap: Unwrap) -> Result<Value, ApiError> {
        let response = self.send(request).await?;
        self.inner.api.parse_value(response, unwrap)
    }

    /// Run a write and pull the record out of `data.<field>` (or `data`).
    /// `Ok(None)` means the write succeeded but the response carried no
    /// usable record.
    pub async fn execute_plucked<T: DeserializeOwned + Serialize>(
        &self,
        request: HttpRequest,
        field: &'static str,
    ) -> Result<Option<T>, ApiError> {
        let data = self.execute_value(request, Unwrap::Data).await?;
        Ok(pluck(&data, field))
    }

    /// A read hook whose fetcher sends the request `build` produces.
    pub fn query<T, B>(&self, key: QueryKey, unwrap: Unwrap, build: B) -> Query<T>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
        B: Fn(&ApiClient) -> Result<HttpRequest, ApiError> + Send + Sync + 'static,
    {
        let gateway = self.clone();
        Query::new(
            key,
            move || {
                let gateway = gateway.clone();
                let request = build(gateway.api());
                Box::pin(async move { gateway.execute(request?, unwrap).await })
            },
            self.cache().clone(),
        )
    }

    /// A write hook whose response record is plucked from `data.<field>`.
    pub fn mutation<I, T, B>(&self, field: &'static str, build: B) -> Mutation<I, Option<T>>
    where
        I: Clone + Send + Sync + 'static,
        T: DeserializeOwned + Serialize + Clone + Send + 'static,
        B: Fn(&ApiClient, &I) -> Result<HttpRequest, ApiError> + Send + Sync + 'static,
    {
        let gateway = self.clone();
        Mutation::new(self.cache().clone(), move |input: I| {
            let gateway = gateway.clone();
            let request = build(gateway.api(), &input);
            Box::pin(async move { gateway.execute_plucked(request?, field).await })
        })
    }

    /// A write hook that ignores the response body.
    pub fn command<I, B>(&self, build: B) -> Mutation<I, ()>
    where
        I: Clone + Send + Sync + 'static,
        B: Fn(&ApiClient, &I) -> Result<HttpRequest, ApiError> + Send + Sync + 'static,
    {
        let gateway = self.clone();
        Mutation::new(self.cache().clone(), move |input: I| {
            let gateway = gateway.clone();
            let request = build(gateway.api(), &input);
            Box::pin(async move { gateway.execute(request?, Unwrap::Empty).await })
        })
    }
}
