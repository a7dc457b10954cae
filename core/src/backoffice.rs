//! Application entry point: one [`Backoffice`] per running admin panel.
//!
//! Created at startup from a [`ClientConfig`] and a transport, it owns the
//! query cache and the session store and hands out the per-area hooks.
//! [`Backoffice::logout`] tears both down.

use std::sync::Arc;

use crate::api::{ContentApi, GamesApi, PaymentsApi, ReferralApi, SettingsApi, UsersApi};
use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::gateway::Gateway;
use crate::query::QueryClient;
use crate::session::SessionStore;
use crate::transport::{ReqwestTransport, Transport};

#[derive(Debug, Clone)]
pub struct Backoffice {
    gateway: Gateway,
}

impl Backoffice {
    /// The session is persisted when `config.session_file` is set.
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let session = match &config.session_file {
            Some(path) => SessionStore::persistent(path),
            None => SessionStore::in_memory(),
        };
        Self::with_session(config, transport, session)
    }

    pub fn with_session(config: ClientConfig, transport: Arc<dyn Transport>, session: SessionStore) -> Self {
        let api = ApiClient::new(&config.base_url);
        let cache = QueryClient::with_config(config.query);
        Self {
            gateway: Gateway::new(api, transport, session, cache),
        }
    }

    /// Configuration from the environment, HTTP through reqwest.
    pub fn from_env() -> Self {
        Self::new(ClientConfig::from_env(), Arc::new(ReqwestTransport::new()))
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn cache(&self) -> &QueryClient {
        self.gateway.cache()
    }

    pub fn session(&self) -> &SessionStore {
        self.gateway.session()
    }

    pub fn users(&self) -> UsersApi {
        UsersApi::new(self.gateway.clone())
    }

    pub fn settings(&self) -> SettingsApi {
        SettingsApi::new(self.gateway.clone())
    }

    pub fn content(&self) -> ContentApi {
        ContentApi::new(self.gateway.clone())
    }

    pub fn referral(&self) -> ReferralApi {
        ReferralApi::new(self.gateway.clone())
    }

    pub fn payments(&self) -> PaymentsApi {
        PaymentsApi::new(self.gateway.clone())
    }

    pub fn games(&self) -> GamesApi {
        GamesApi::new(self.gateway.clone())
    }

    /// Sign out: tell the server, then clear the session and the cache
    /// whatever it answered.
    pub async fn logout(&self) -> Result<(), ApiError> {
        self.users().logout().await
    }
}
