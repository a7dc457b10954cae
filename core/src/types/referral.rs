use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::filter::Searchable;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralSettings {
    #[serde(default)]
    pub is_enabled: bool,
    #[serde(default)]
    pub referrer_reward: f64,
    #[serde(default)]
    pub referee_reward: f64,
    #[serde(default)]
    pub min_deposit: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_referrals: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralTransaction {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub referrer: Option<String>,
    #[serde(default)]
    pub referee: Option<String>,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralStatusUpdate {
    pub status: String,
}

/// Filters for the referral transaction list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralTransactionFilters {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Per-user override of the global referral settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralUserSettings {
    #[serde(default)]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer_reward: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referee_reward: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralAnalytics {
    #[serde(default)]
    pub total_referrals: u64,
    #[serde(default)]
    pub active_referrers: u64,
    #[serde(default)]
    pub total_rewards: f64,
    #[serde(default)]
    pub pending_rewards: f64,
}

/// A user's referral code, as listed by `all-codes-with-users`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralCode {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub referral_count: u64,
}

impl Searchable for ReferralCode {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.code.as_str(), self.name.as_str(), self.email.as_str()]
    }
}
