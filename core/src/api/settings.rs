use crate::envelope::Unwrap;
use crate::gateway::Gateway;
use crate::http::HttpMethod;
use crate::keys::{SECURITY_LOGS, SETTINGS};
use crate::mutation::Mutation;
use crate::query::Query;
use crate::resource::Singleton;
use crate::types::{OrganizationSettings, SecurityLog, Settings, SettingsPatch, ThemeSettings, UiSettings};

#[derive(Debug, Clone)]
pub struct SettingsApi {
    gateway: Gateway,
}

impl SettingsApi {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub fn singleton(&self) -> Singleton<Settings> {
        Singleton::new(self.gateway.clone(), SETTINGS)
    }

    pub fn get(&self) -> Query<Settings> {
        self.singleton().get()
    }

    pub fn update(&self) -> Mutation<Settings, Option<Settings>> {
        self.singleton().update()
    }

    pub fn patch(&self) -> Mutation<SettingsPatch, Option<Settings>> {
        self.singleton().patch()
    }

    pub fn update_theme(&self) -> Mutation<ThemeSettings, Option<Settings>> {
        self.singleton().write(HttpMethod::Put, "/theme")
    }

    pub fn update_organization(&self) -> Mutation<OrganizationSettings, Option<Settings>> {
        self.singleton().write(HttpMethod::Put, "/organization")
    }

    pub fn update_ui(&self) -> Mutation<UiSettings, Option<Settings>> {
        self.singleton().write(HttpMethod::Put, "/ui")
    }

    /// `POST /settings/reset`: back to server defaults.
    pub fn reset(&self) -> Mutation<(), Option<Settings>> {
        self.singleton().action(HttpMethod::Post, "/reset")
    }

    pub fn security_logs(&self) -> Query<Vec<SecurityLog>> {
        self.gateway
            .query(SECURITY_LOGS.lists(), Unwrap::Field(SECURITY_LOGS.list_field), |api| {
                api.build_get(SECURITY_LOGS.path, &())
            })
    }

    /// `DELETE /security/logs`.
    pub fn clear_security_logs(&self) -> Mutation<(), ()> {
        self.gateway
            .command(|api, _: &()| Ok(api.build_empty(HttpMethod::Delete, SECURITY_LOGS.path)))
            .invalidates(vec![SECURITY_LOGS.all()])
    }
}
