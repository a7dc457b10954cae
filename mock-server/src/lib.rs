//! In-memory implementation of the backoffice admin API.
//!
//! Every response uses the `{ success, message, data }` envelope. Records
//! are kept as JSON objects; collections differ only in their path and in
//! how their list response nests (plain array, `{ <list>: [...] }`, or a
//! pagination envelope).

mod handlers;
mod reply;

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, post, put},
    Router,
};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub use reply::Payload;

/// How a collection's records are exposed.
#[derive(Debug)]
pub struct Collection {
    /// Path below the API root, e.g. `payment-methods`.
    pub path: &'static str,
    /// Member of `data` holding one record.
    pub item: &'static str,
    /// Member of `data` holding a list of records.
    pub list: &'static str,
    pub listing: Listing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    /// `data: [...]`.
    Plain,
    /// `data: { <list>: [...] }`.
    Nested,
    /// `data: { <list>: [...], total, page, totalPages }`.
    Paginated,
}

pub const USERS: Collection = collection("users", "user", "users", Listing::Paginated);
pub const TRANSACTIONS: Collection = collection("transactions", "transaction", "transactions", Listing::Paginated);
pub const REFERRAL_TRANSACTIONS: Collection =
    collection("referral/transactions", "transaction", "transactions", Listing::Nested);

pub static COLLECTIONS: &[Collection] = &[
    USERS,
    collection("sliders", "slider", "sliders", Listing::Plain),
    collection("top-winners", "topWinner", "topWinners", Listing::Plain),
    collection("upcoming-matches", "match", "matches", Listing::Nested),
    collection("payment-methods", "paymentMethod", "paymentMethods", Listing::Nested),
    collection("withdraw-methods", "withdrawMethod", "withdrawMethods", Listing::Nested),
    collection("promotions", "promotion", "promotions", Listing::Nested),
    TRANSACTIONS,
    REFERRAL_TRANSACTIONS,
    collection("game-categories", "category", "categories", Listing::Nested),
    collection("providers", "provider", "providers", Listing::Nested),
    collection("popular-games", "game", "games", Listing::Nested),
    collection("apk-files", "apkFile", "apkFiles", Listing::Nested),
];

const fn collection(path: &'static str, item: &'static str, list: &'static str, listing: Listing) -> Collection {
    Collection {
        path,
        item,
        list,
        listing,
    }
}

#[derive(Debug, Default)]
pub struct Store {
    pub collections: HashMap<&'static str, Vec<Map<String, Value>>>,
    pub settings: Value,
    pub banner_text: Value,
    pub promo_section: Value,
    pub referral_settings: Value,
    pub referral_user_settings: HashMap<String, Value>,
    pub security_logs: Vec<Value>,
    /// email → password.
    pub passwords: HashMap<String, String>,
    /// bearer token → user id.
    pub tokens: HashMap<String, String>,
}

pub type Db = Arc<RwLock<Store>>;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin123";

pub fn default_settings() -> Value {
    json!({
        "theme": { "mode": "light", "primaryColor": "#1f6feb", "secondaryColor": "#f0883e" },
        "organization": { "name": "Backoffice", "supportEmail": "support@example.com", "timezone": "UTC" },
        "ui": { "language": "en", "sidebarCollapsed": false, "itemsPerPage": 10 },
        "maintenanceMode": false
    })
}

pub fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn record(fields: Value) -> Map<String, Value> {
    let mut map = match fields {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    map.insert("id".to_string(), Value::String(new_id()));
    map
}

impl Store {
    /// An admin, two regular users, and one record in a few collections.
    pub fn seeded() -> Self {
        let mut store = Store {
            settings: default_settings(),
            banner_text: json!({ "text": "Welcome to the platform", "isActive": true }),
            promo_section: json!({
                "banner": { "image": "/uploads/promo.png", "link": "/promotions" },
                "video": { "url": "https://videos.example.com/intro.mp4" },
                "extraBanners": [],
                "isActive": false
            }),
            referral_settings: json!({
                "isEnabled": true, "referrerReward": 10.0, "refereeReward": 5.0, "minDeposit": 20.0
            }),
            ..Store::default()
        };
        for collection in COLLECTIONS {
            store.collections.insert(collection.path, Vec::new());
        }

        let users = [
            ("Admin", ADMIN_EMAIL, "admin", Some("ADMIN1")),
            ("Ann Lee", "ann@example.com", "user", Some("ANN42")),
            ("Bob Stone", "bob@example.com", "user", None),
        ];
        for (name, email, role, code) in users {
            let mut user = record(json!({
                "name": name, "email": email, "role": role, "balance": 0.0, "isActive": true
            }));
            if let Some(code) = code {
                user.insert("referralCode".to_string(), json!(code));
            }
            store.insert(&USERS, user);
        }
        store.passwords.insert(ADMIN_EMAIL.to_string(), ADMIN_PASSWORD.to_string());

        store.insert(
            &TRANSACTIONS,
            record(json!({
                "kind": "deposit", "amount": 50.0, "status": "completed", "provider": "stripe"
            })),
        );
        store.insert(
            &REFERRAL_TRANSACTIONS,
            record(json!({
                "referrer": "ANN42", "referee": "bob@example.com", "amount": 10.0, "status": "pending"
            })),
        );
        store.security_logs.push(json!({ "id": new_id(), "action": "server started" }));
        store
    }

    pub fn records(&self, collection: &Collection) -> &[Map<String, Value>] {
        self.collections.get(collection.path).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn records_mut(&mut self, collection: &Collection) -> &mut Vec<Map<String, Value>> {
        self.collections.entry(collection.path).or_default()
    }

    pub fn insert(&mut self, collection: &Collection, record: Map<String, Value>) {
        self.records_mut(collection).push(record);
    }

    pub fn find(&self, collection: &Collection, id: &str) -> Option<&Map<String, Value>> {
        self.records(collection).iter().find(|r| r.get("id").and_then(Value::as_str) == Some(id))
    }

    pub fn find_mut(&mut self, collection: &Collection, id: &str) -> Option<&mut Map<String, Value>> {
        self.records_mut(collection)
            .iter_mut()
            .find(|r| r.get("id").and_then(Value::as_str) == Some(id))
    }

    pub fn log(&mut self, action: &str) {
        self.security_logs.push(json!({ "id": new_id(), "action": action }));
    }
}

pub fn app() -> Router {
    app_with_store(Store::seeded())
}

pub fn app_with_store(store: Store) -> Router {
    let db: Db = Arc::new(RwLock::new(store));
    let mut router = Router::new()
        .route("/users/login", post(handlers::login))
        .route("/users/logout", post(handlers::logout))
        .route("/users/profile", get(handlers::profile))
        .route("/transactions/stats", get(handlers::transaction_stats))
        .route("/transactions/provider/{provider}", get(handlers::transactions_by_provider))
        .route(
            "/settings",
            get(handlers::get_settings)
                .put(handlers::replace_settings)
                .patch(handlers::patch_settings),
        )
        .route("/settings/reset", post(handlers::reset_settings))
        .route("/settings/{section}", put(handlers::update_settings_section))
        .route("/banner-text", get(handlers::get_banner_text).put(handlers::update_banner_text))
        .route(
            "/promo-section",
            get(handlers::get_promo_section)
                .put(handlers::update_promo_section)
                .patch(handlers::update_promo_section),
        )
        .route("/promo-section/toggle", patch(handlers::toggle_promo_section))
        .route(
            "/security/logs",
            get(handlers::security_logs).delete(handlers::clear_security_logs),
        )
        .route(
            "/referral/settings",
            get(handlers::get_referral_settings).put(handlers::update_referral_settings),
        )
        .route("/referral/analytics", get(handlers::referral_analytics))
        .route("/referral/all-codes-with-users", get(handlers::referral_codes))
        .route(
            "/referral/user-settings/{user_id}",
            get(handlers::get_user_referral_settings).put(handlers::update_user_referral_settings),
        );
    for collection in COLLECTIONS {
        router = collection_routes(router, collection);
    }
    router.with_state(db)
}

fn collection_routes(router: Router<Db>, collection: &'static Collection) -> Router<Db> {
    router
        .route(
            &format!("/{}", collection.path),
            get(move |State(db): State<Db>, Query(params): Query<HashMap<String, String>>| {
                handlers::list_records(db, collection, params)
            })
            .post(move |State(db): State<Db>, Payload(body): Payload| handlers::create_record(db, collection, body)),
        )
        .route(
            &format!("/{}/{{id}}", collection.path),
            get(move |State(db): State<Db>, Path(id): Path<String>| handlers::get_record(db, collection, id))
                .put(move |State(db): State<Db>, Path(id): Path<String>, Payload(body): Payload| {
                    handlers::update_record(db, collection, id, body)
                })
                .patch(move |State(db): State<Db>, Path(id): Path<String>, Payload(body): Payload| {
                    handlers::update_record(db, collection, id, body)
                })
                .delete(move |State(db): State<Db>, Path(id): Path<String>| {
                    handlers::delete_record(db, collection, id)
                }),
        )
        .route(
            &format!("/{}/{{id}}/status", collection.path),
            patch(move |State(db): State<Db>, Path(id): Path<String>, Payload(body): Payload| {
                handlers::set_status(db, collection, id, body)
            }),
        )
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}
