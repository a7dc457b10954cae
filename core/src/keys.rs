//! Query keys: the identity under which every read is cached.
//!
//! A key is an ordered list of segments. The first segment names the
//! resource, so `[users]` is an ancestor of `[users, list, {...}]` and
//! `[users, detail, 42]`; invalidating an ancestor reaches every
//! descendant. Filter segments are canonical JSON: object members are
//! sorted and `null` members are dropped, which makes `{page:1}` and
//! `{page:1, limit:None}` the same key.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn root(resource: &str) -> Self {
        Self(vec![resource.to_string()])
    }

    /// Append a literal segment.
    pub fn push(mut self, segment: impl Into<String>) -> Self {
        self.0.push(segment.into());
        self
    }

    /// Append a filter segment. Filters that serialize to nothing (unit,
    /// `None`, or an object whose members are all `None`) add no segment.
    pub fn with_params<P: Serialize>(self, params: &P) -> Result<Self, ApiError> {
        let params = normalized_params(params)?;
        if params.is_empty() {
            return Ok(self);
        }
        let canonical = serde_json::to_string(&params).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(self.push(canonical))
    }

    /// Whether `prefix` is this key or one of its ancestors.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.len() >= prefix.0.len() && self.0.iter().zip(&prefix.0).all(|(a, b)| a == b)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn resource(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or_default()
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

/// Serialize `params` and keep only the non-null members, sorted by name.
///
/// Non-object values (unit, `None`) normalize to an empty map.
pub fn normalized_params<P: Serialize>(params: &P) -> Result<BTreeMap<String, Value>, ApiError> {
    let value = serde_json::to_value(params).map_err(|e| ApiError::Serialization(e.to_string()))?;
    Ok(match value {
        Value::Object(map) => map
            .into_iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k, canonical(v)))
            .collect(),
        _ => BTreeMap::new(),
    })
}

fn canonical(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, canonical(v)))
                .collect::<BTreeMap<_, _>>()
                .into_iter()
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(canonical).collect()),
        other => other,
    }
}

/// Describes one REST resource: where it lives and how its envelope nests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resource {
    /// Cache namespace, also the root key segment.
    pub name: &'static str,
    /// Path relative to the API base URL.
    pub path: &'static str,
    /// Member of `data` holding a single record, e.g. `slider`.
    pub item_field: &'static str,
    /// Member of `data` holding a collection, e.g. `sliders`.
    pub list_field: &'static str,
}

impl Resource {
    pub fn all(&self) -> QueryKey {
        QueryKey::root(self.name)
    }

    pub fn lists(&self) -> QueryKey {
        self.all().push("list")
    }

    pub fn list<F: Serialize>(&self, filters: &F) -> Result<QueryKey, ApiError> {
        self.lists().with_params(filters)
    }

    pub fn detail(&self, id: &str) -> QueryKey {
        self.all().push("detail").push(id)
    }

    /// A derived read such as `stats` or `analytics`.
    pub fn view<P: Serialize>(&self, view: &str, params: &P) -> Result<QueryKey, ApiError> {
        self.all().push(view).with_params(params)
    }

    pub fn item_path(&self, id: &str) -> String {
        format!("{}/{id}", self.path)
    }
}

macro_rules! resources {
    ($($konst:ident => $name:literal, $path:literal, $item:literal, $list:literal;)*) => {
        $(
            pub const $konst: Resource = Resource {
                name: $name,
                path: $path,
                item_field: $item,
                list_field: $list,
            };
        )*
    };
}

resources! {
    USERS => "users", "/users", "user", "users";
    SLIDERS => "sliders", "/sliders", "slider", "sliders";
    TOP_WINNERS => "top-winners", "/top-winners", "topWinner", "topWinners";
    UPCOMING_MATCHES => "upcoming-matches", "/upcoming-matches", "match", "matches";
    SETTINGS => "settings", "/settings", "settings", "settings";
    BANNER_TEXT => "banner-text", "/banner-text", "bannerText", "bannerText";
    PROMO_SECTION => "promo-section", "/promo-section", "promoSection", "promoSection";
    SECURITY_LOGS => "security-logs", "/security/logs", "log", "logs";
    REFERRAL_SETTINGS => "referral-settings", "/referral/settings", "settings", "settings";
    REFERRAL => "referral", "/referral", "referral", "referrals";
    REFERRAL_TRANSACTIONS => "referral-transactions", "/referral/transactions", "transaction", "transactions";
    REFERRAL_USER_SETTINGS => "referral-user-settings", "/referral/user-settings", "settings", "settings";
    PAYMENT_METHODS => "payment-methods", "/payment-methods", "paymentMethod", "paymentMethods";
    WITHDRAW_METHODS => "withdraw-methods", "/withdraw-methods", "withdrawMethod", "withdrawMethods";
    PROMOTIONS => "promotions", "/promotions", "promotion", "promotions";
    TRANSACTIONS => "transactions", "/transactions", "transaction", "transactions";
    GAME_CATEGORIES => "game-categories", "/game-categories", "category", "categories";
    PROVIDERS => "providers", "/providers", "provider", "providers";
    POPULAR_GAMES => "popular-games", "/popular-games", "game", "games";
    APK_FILES => "apk-files", "/apk-files", "apkFile", "apkFiles";
}
