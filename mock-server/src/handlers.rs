use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::Response,
};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::reply::{created, failure, not_found, ok, Payload};
use crate::{default_settings, new_id, Collection, Db, Listing, Store, REFERRAL_TRANSACTIONS, TRANSACTIONS, USERS};

const DEFAULT_LIMIT: usize = 10;

fn param<'a>(params: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    params.get(name).map(String::as_str).filter(|v| !v.is_empty())
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn matches_search(record: &Map<String, Value>, term: &str) -> bool {
    let term = term.to_lowercase();
    ["name", "email", "title", "code"].iter().any(|field| {
        record
            .get(*field)
            .and_then(Value::as_str)
            .is_some_and(|v| v.to_lowercase().contains(&term))
    })
}

/// Strips fields a client must never see.
fn public(record: &Map<String, Value>) -> Value {
    let mut record = record.clone();
    record.remove("password");
    Value::Object(record)
}

pub async fn list_records(db: Db, collection: &'static Collection, params: HashMap<String, String>) -> Response {
    let store = db.read().await;
    let filtered: Vec<Value> = store
        .records(collection)
        .iter()
        .filter(|record| {
            params.iter().all(|(name, value)| match name.as_str() {
                "page" | "limit" => true,
                "search" => value.is_empty() || matches_search(record, value),
                _ => record.get(name).is_some_and(|v| as_text(v) == *value),
            })
        })
        .map(public)
        .collect();

    let data = match collection.listing {
        Listing::Plain => Value::Array(filtered),
        Listing::Nested => json!({ collection.list: filtered }),
        Listing::Paginated => {
            let limit = param(&params, "limit")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(DEFAULT_LIMIT)
                .max(1);
            let page = param(&params, "page")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(1)
                .max(1);
            let total = filtered.len();
            let items: Vec<Value> = filtered
                .into_iter()
                .skip((page - 1).saturating_mul(limit))
                .take(limit)
                .collect();
            json!({
                collection.list: items,
                "total": total,
                "page": page,
                "totalPages": total.div_ceil(limit),
            })
        }
    };
    ok("fetched", data)
}

pub async fn get_record(db: Db, collection: &'static Collection, id: String) -> Response {
    let store = db.read().await;
    match store.find(collection, &id) {
        Some(record) => ok("fetched", json!({ collection.item: public(record) })),
        None => not_found(collection.item),
    }
}

pub async fn create_record(db: Db, collection: &'static Collection, mut body: Map<String, Value>) -> Response {
    let mut store = db.write().await;
    if collection.path == USERS.path {
        let email = body.get("email").and_then(Value::as_str).map(str::to_string);
        let password = body.remove("password").map(|p| as_text(&p));
        let (Some(email), Some(password), true) = (email, password, body.contains_key("name")) else {
            return failure(StatusCode::BAD_REQUEST, "name, email and password are required");
        };
        if store.passwords.contains_key(&email)
            || store.records(&USERS).iter().any(|u| u.get("email") == Some(&json!(email)))
        {
            return failure(StatusCode::CONFLICT, "email already in use");
        }
        store.passwords.insert(email, password);
        body.entry("role").or_insert_with(|| json!("user"));
        body.entry("balance").or_insert_with(|| json!(0.0));
    }
    body.entry("isActive").or_insert(Value::Bool(true));
    body.insert("id".to_string(), Value::String(new_id()));
    let data = json!({ collection.item: public(&body) });
    store.insert(collection, body);
    debug!(collection = collection.path, "record created");
    created("created", data)
}

pub async fn update_record(db: Db, collection: &'static Collection, id: String, body: Map<String, Value>) -> Response {
    let mut store = db.write().await;
    let Some(record) = store.find_mut(collection, &id) else {
        return not_found(collection.item);
    };
    for (name, value) in body {
        if name != "id" && name != "password" {
            record.insert(name, value);
        }
    }
    ok("updated", json!({ collection.item: public(record) }))
}

pub async fn set_status(db: Db, collection: &'static Collection, id: String, body: Map<String, Value>) -> Response {
    let Some(is_active) = body.get("isActive").and_then(Value::as_bool) else {
        return failure(StatusCode::BAD_REQUEST, "isActive must be a boolean");
    };
    let mut store = db.write().await;
    let Some(record) = store.find_mut(collection, &id) else {
        return not_found(collection.item);
    };
    record.insert("isActive".to_string(), Value::Bool(is_active));
    ok("status updated", json!({ collection.item: public(record) }))
}

pub async fn delete_record(db: Db, collection: &'static Collection, id: String) -> Response {
    let mut store = db.write().await;
    let records = store.records_mut(collection);
    let before = records.len();
    records.retain(|r| r.get("id").and_then(Value::as_str) != Some(id.as_str()));
    if records.len() == before {
        return not_found(collection.item);
    }
    ok("deleted", Value::Null)
}

pub async fn login(State(db): State<Db>, Payload(body): Payload) -> Response {
    let email = body.get("email").and_then(Value::as_str).unwrap_or_default();
    let password = body.get("password").and_then(Value::as_str).unwrap_or_default();
    let mut store = db.write().await;
    if store.passwords.get(email).map(String::as_str) != Some(password) {
        return failure(StatusCode::UNAUTHORIZED, "Invalid email or password");
    }
    let Some(user) = store
        .records(&USERS)
        .iter()
        .find(|u| u.get("email").and_then(Value::as_str) == Some(email))
        .cloned()
    else {
        return failure(StatusCode::UNAUTHORIZED, "Invalid email or password");
    };
    let token = new_id();
    let user_id = user.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
    store.tokens.insert(token.clone(), user_id);
    store.log(&format!("login {email}"));
    info!(email, "user logged in");
    ok("logged in", json!({ "token": token, "user": public(&user) }))
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

pub async fn logout(State(db): State<Db>, headers: HeaderMap) -> Response {
    let mut store = db.write().await;
    if let Some(token) = bearer(&headers) {
        store.tokens.remove(token);
    }
    ok("logged out", Value::Null)
}

pub async fn profile(State(db): State<Db>, headers: HeaderMap) -> Response {
    let store = db.read().await;
    let user = bearer(&headers)
        .and_then(|token| store.tokens.get(token))
        .and_then(|id| store.find(&USERS, id));
    match user {
        Some(user) => ok("profile", json!({ "user": public(user) })),
        None => failure(StatusCode::UNAUTHORIZED, "Not authenticated"),
    }
}

pub async fn transaction_stats(State(db): State<Db>) -> Response {
    let store = db.read().await;
    let records = store.records(&TRANSACTIONS);
    let count = |status: &str| {
        records
            .iter()
            .filter(|t| t.get("status").and_then(Value::as_str) == Some(status))
            .count()
    };
    let total_amount: f64 = records.iter().filter_map(|t| t.get("amount").and_then(Value::as_f64)).sum();
    ok(
        "fetched",
        json!({
            "stats": {
                "totalCount": records.len(),
                "totalAmount": total_amount,
                "pendingCount": count("pending"),
                "completedCount": count("completed"),
                "failedCount": count("failed"),
            }
        }),
    )
}

pub async fn transactions_by_provider(State(db): State<Db>, Path(provider): Path<String>) -> Response {
    let store = db.read().await;
    let matching: Vec<Value> = store
        .records(&TRANSACTIONS)
        .iter()
        .filter(|t| t.get("provider").and_then(Value::as_str) == Some(provider.as_str()))
        .map(public)
        .collect();
    ok("fetched", json!({ "transactions": matching }))
}

/// Shallow merge of `patch` into the object `target`.
fn merge(target: &mut Value, patch: Map<String, Value>) {
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target) = target {
        for (name, value) in patch {
            target.insert(name, value);
        }
    }
}

pub async fn get_settings(State(db): State<Db>) -> Response {
    let store = db.read().await;
    ok("fetched", json!({ "settings": store.settings }))
}

pub async fn replace_settings(State(db): State<Db>, Payload(body): Payload) -> Response {
    let mut store = db.write().await;
    store.settings = Value::Object(body);
    ok("settings updated", json!({ "settings": store.settings }))
}

pub async fn patch_settings(State(db): State<Db>, Payload(body): Payload) -> Response {
    let mut store = db.write().await;
    merge(&mut store.settings, body);
    ok("settings updated", json!({ "settings": store.settings }))
}

pub async fn update_settings_section(
    State(db): State<Db>,
    Path(section): Path<String>,
    Payload(body): Payload,
) -> Response {
    if !["theme", "organization", "ui"].contains(&section.as_str()) {
        return not_found("settings section");
    }
    let mut store = db.write().await;
    let mut patch = Map::new();
    patch.insert(section, Value::Object(body));
    merge(&mut store.settings, patch);
    ok("settings updated", json!({ "settings": store.settings }))
}

pub async fn reset_settings(State(db): State<Db>) -> Response {
    let mut store = db.write().await;
    store.settings = default_settings();
    store.log("settings reset");
    ok("settings reset", json!({ "settings": store.settings }))
}

/// Banner text answers with the bare record in `data`.
pub async fn get_banner_text(State(db): State<Db>) -> Response {
    let store = db.read().await;
    ok("fetched", store.banner_text.clone())
}

pub async fn update_banner_text(State(db): State<Db>, Payload(body): Payload) -> Response {
    if body.get("text").and_then(Value::as_str).map_or(true, |t| t.trim().is_empty()) {
        return failure(StatusCode::BAD_REQUEST, "Banner text cannot be empty");
    }
    let mut store = db.write().await;
    merge(&mut store.banner_text, body);
    ok("banner text updated", json!({ "bannerText": store.banner_text }))
}

pub async fn get_promo_section(State(db): State<Db>) -> Response {
    let store = db.read().await;
    ok("fetched", json!({ "promoSection": store.promo_section }))
}

pub async fn update_promo_section(State(db): State<Db>, Payload(body): Payload) -> Response {
    let mut store = db.write().await;
    merge(&mut store.promo_section, body);
    ok("promo section updated", json!({ "promoSection": store.promo_section }))
}

/// Sets `isActive` from the body, or flips it when the body has none.
pub async fn toggle_promo_section(State(db): State<Db>, Payload(body): Payload) -> Response {
    let mut store = db.write().await;
    let current = store.promo_section.get("isActive").and_then(Value::as_bool).unwrap_or(false);
    let next = body.get("isActive").and_then(Value::as_bool).unwrap_or(!current);
    let mut patch = Map::new();
    patch.insert("isActive".to_string(), Value::Bool(next));
    merge(&mut store.promo_section, patch);
    ok("promo section toggled", json!({ "promoSection": store.promo_section }))
}

pub async fn security_logs(State(db): State<Db>) -> Response {
    let store = db.read().await;
    ok("fetched", json!({ "logs": store.security_logs }))
}

pub async fn clear_security_logs(State(db): State<Db>) -> Response {
    let mut store = db.write().await;
    store.security_logs.clear();
    ok("security logs cleared", Value::Null)
}

pub async fn get_referral_settings(State(db): State<Db>) -> Response {
    let store = db.read().await;
    ok("fetched", json!({ "settings": store.referral_settings }))
}

pub async fn update_referral_settings(State(db): State<Db>, Payload(body): Payload) -> Response {
    let mut store = db.write().await;
    merge(&mut store.referral_settings, body);
    ok("referral settings updated", json!({ "settings": store.referral_settings }))
}

pub async fn referral_analytics(State(db): State<Db>) -> Response {
    let store = db.read().await;
    let transactions = store.records(&REFERRAL_TRANSACTIONS);
    let sum = |pending: bool| -> f64 {
        transactions
            .iter()
            .filter(|t| (t.get("status").and_then(Value::as_str) == Some("pending")) == pending)
            .filter_map(|t| t.get("amount").and_then(Value::as_f64))
            .sum()
    };
    let referrers: std::collections::HashSet<&str> = transactions
        .iter()
        .filter_map(|t| t.get("referrer").and_then(Value::as_str))
        .collect();
    ok(
        "fetched",
        json!({
            "analytics": {
                "totalReferrals": transactions.len(),
                "activeReferrers": referrers.len(),
                "totalRewards": sum(false),
                "pendingRewards": sum(true),
            }
        }),
    )
}

pub async fn referral_codes(State(db): State<Db>) -> Response {
    let store = db.read().await;
    let transactions = store.records(&REFERRAL_TRANSACTIONS);
    let codes: Vec<Value> = store
        .records(&USERS)
        .iter()
        .filter_map(|user| {
            let code = user.get("referralCode").and_then(Value::as_str)?;
            let referrals = transactions
                .iter()
                .filter(|t| t.get("referrer").and_then(Value::as_str) == Some(code))
                .count();
            Some(json!({
                "code": code,
                "userId": user.get("id"),
                "name": user.get("name"),
                "email": user.get("email"),
                "referralCount": referrals,
            }))
        })
        .collect();
    ok("fetched", json!({ "codes": codes }))
}

pub async fn get_user_referral_settings(State(db): State<Db>, Path(user_id): Path<String>) -> Response {
    let store = db.read().await;
    if store.find(&USERS, &user_id).is_none() {
        return not_found("user");
    }
    let settings = store
        .referral_user_settings
        .get(&user_id)
        .cloned()
        .unwrap_or_else(|| json!({ "userId": user_id }));
    ok("fetched", json!({ "settings": settings }))
}

pub async fn update_user_referral_settings(
    State(db): State<Db>,
    Path(user_id): Path<String>,
    Payload(body): Payload,
) -> Response {
    let mut store = db.write().await;
    if store.find(&USERS, &user_id).is_none() {
        return not_found("user");
    }
    let Store {
        referral_user_settings, ..
    } = &mut *store;
    let settings = referral_user_settings
        .entry(user_id.clone())
        .or_insert_with(|| json!({ "userId": user_id }));
    merge(settings, body);
    ok("referral settings updated", json!({ "settings": settings }))
}
