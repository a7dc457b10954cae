use crate::envelope::Unwrap;
use crate::gateway::Gateway;
use crate::keys::{REFERRAL, REFERRAL_SETTINGS, REFERRAL_TRANSACTIONS, REFERRAL_USER_SETTINGS};
use crate::mutation::Mutation;
use crate::query::Query;
use crate::resource::{Collection, ItemUpdate, Singleton};
use crate::types::{
    ReferralAnalytics, ReferralCode, ReferralSettings, ReferralStatusUpdate, ReferralTransaction, ReferralUserSettings,
};

#[derive(Debug, Clone)]
pub struct ReferralApi {
    gateway: Gateway,
}

impl ReferralApi {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub fn settings(&self) -> Singleton<ReferralSettings> {
        Singleton::new(self.gateway.clone(), REFERRAL_SETTINGS)
    }

    /// `GET /referral/analytics`.
    pub fn analytics(&self) -> Query<ReferralAnalytics> {
        self.gateway
            .query(REFERRAL.all().push("analytics"), Unwrap::Field("analytics"), |api| {
                api.build_get("/referral/analytics", &())
            })
    }

    pub fn transactions(&self) -> Collection<ReferralTransaction> {
        Collection::new(self.gateway.clone(), REFERRAL_TRANSACTIONS)
    }

    /// `PUT /referral/transactions/:id` with the new status. Analytics are
    /// refreshed too, since rewards change with the status.
    pub fn update_transaction_status(&self) -> Mutation<ItemUpdate<ReferralStatusUpdate>, Option<ReferralTransaction>> {
        self.transactions()
            .update()
            .invalidates(vec![REFERRAL.all().push("analytics")])
    }

    /// Overrides keyed by user id, `/referral/user-settings/:userId`.
    pub fn user_settings(&self) -> Collection<ReferralUserSettings> {
        Collection::new(self.gateway.clone(), REFERRAL_USER_SETTINGS)
    }

    /// `GET /referral/all-codes-with-users`.
    pub fn all_codes_with_users(&self) -> Query<Vec<ReferralCode>> {
        self.gateway
            .query(REFERRAL.all().push("codes"), Unwrap::Field("codes"), |api| {
                api.build_get("/referral/all-codes-with-users", &())
            })
    }
}
