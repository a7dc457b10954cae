//! End-to-end behaviour of the cache hooks against the mock admin API.
//!
//! # Design
//! Most tests route requests in-process through `common::RouterTransport`,
//! which records every call so cache effects can be asserted as network
//! round-trips. `real_http_round_trip` starts the mock server on a random
//! port and goes through `ReqwestTransport` instead.

mod common;

use std::sync::Arc;

use backoffice_core::api::{PaymentsApi, UsersApi, PROMO_TOGGLE_FALLBACK};
use backoffice_core::keys::{PAYMENT_METHODS, SECURITY_LOGS, SETTINGS, USERS};
use backoffice_core::types::{
    Credentials, PaymentMethodInput, PromoSection, Settings, SliderForm, StatusUpdate, ThemeSettings,
    TransactionInput, User, UserFilters, UserUpdate,
};
use backoffice_core::{
    ApiError, Backoffice, ClientConfig, ClientPager, FilePart, HttpResponse, ItemUpdate, MutationState,
    QueryState, ReqwestTransport, SessionStore,
};
use common::{backoffice, server_error};
use futures::StreamExt;
use mock_server::{ADMIN_EMAIL, ADMIN_PASSWORD};

async fn wait_for_call(transport: &common::RouterTransport, call: &str) {
    wait_for_calls(transport, call, 1).await;
}

async fn wait_for_calls(transport: &common::RouterTransport, call: &str, n: usize) {
    while transport.count(call) < n {
        tokio::task::yield_now().await;
    }
}

fn card() -> PaymentMethodInput {
    PaymentMethodInput {
        name: Some("Card".to_string()),
        min_amount: Some(5.0),
        ..Default::default()
    }
}

fn admin() -> Credentials {
    Credentials {
        email: ADMIN_EMAIL.to_string(),
        password: ADMIN_PASSWORD.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_invalidates_list_and_primes_detail() {
    let (bo, transport) = backoffice();
    let methods = bo.payments().payment_methods();
    let list = methods.all();

    assert!(list.fetch().await.unwrap().is_empty());
    list.fetch().await.unwrap();
    assert_eq!(transport.count("GET /payment-methods"), 1, "fresh list is served from cache");

    let created = methods.create().mutate(card()).await.unwrap().unwrap();
    assert_eq!(created.name, "Card");
    assert!(bo.cache().is_stale(list.key()));

    let detail = methods.detail(&created.id);
    assert_eq!(detail.fetch().await.unwrap(), created);
    assert_eq!(transport.count(&format!("GET /payment-methods/{}", created.id)), 0);

    let listed = list.fetch().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(transport.count("GET /payment-methods"), 2);
}

#[tokio::test]
async fn update_writes_detail_directly_and_invalidates_lists() {
    let (bo, transport) = backoffice();
    let methods = bo.payments().payment_methods();
    let created = methods.create().mutate(card()).await.unwrap().unwrap();
    let list = methods.all();
    list.fetch().await.unwrap();

    let changes = PaymentMethodInput {
        min_amount: Some(10.0),
        ..Default::default()
    };
    let updated = methods
        .update()
        .mutate(ItemUpdate::new(created.id.clone(), changes))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.min_amount, 10.0);
    assert_eq!(updated.name, "Card");

    let detail = methods.detail(&created.id);
    assert!(!bo.cache().is_stale(detail.key()));
    assert_eq!(detail.fetch().await.unwrap().min_amount, 10.0);
    assert_eq!(transport.count(&format!("GET /payment-methods/{}", created.id)), 0);
    assert!(bo.cache().is_stale(list.key()));
}

#[tokio::test]
async fn status_toggle_then_delete() {
    let (bo, _transport) = backoffice();
    let methods = bo.payments().payment_methods();
    let created = methods.create().mutate(card()).await.unwrap().unwrap();
    assert!(created.is_active);

    let toggled = methods
        .set_status()
        .mutate(ItemUpdate::new(created.id.clone(), StatusUpdate { is_active: false }))
        .await
        .unwrap()
        .unwrap();
    assert!(!toggled.is_active);
    assert_eq!(methods.detail(&created.id).data().map(|m| m.is_active), Some(false));

    methods.delete().mutate(created.id.clone()).await.unwrap();
    assert!(!bo.cache().contains(&PAYMENT_METHODS.detail(&created.id)));
    let missing = methods.detail(&created.id).fetch().await.unwrap_err();
    assert!(missing.is_not_found());
    assert_eq!(missing.user_message("Payment method unavailable"), "paymentMethod not found");
}

#[tokio::test]
async fn empty_id_disables_detail() {
    let (bo, transport) = backoffice();
    let detail = bo.payments().payment_methods().detail("");
    assert_eq!(detail.state(), QueryState::Idle);
    assert_eq!(detail.fetch().await, Err(ApiError::QueryDisabled));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn transaction_writes_refresh_stats() {
    let (bo, transport) = backoffice();
    let payments = bo.payments();
    let stats = payments.transaction_stats();
    assert_eq!(stats.fetch().await.unwrap().total_count, 1);

    payments
        .create_transaction()
        .mutate(TransactionInput {
            kind: Some("withdrawal".to_string()),
            amount: Some(20.0),
            status: Some("pending".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(bo.cache().is_stale(&PaymentsApi::stats_key()));

    let refreshed = stats.fetch().await.unwrap();
    assert_eq!(refreshed.total_count, 2);
    assert_eq!(refreshed.pending_count, 1);
    assert_eq!(transport.count("GET /transactions/stats"), 2);
}

#[tokio::test]
async fn provider_query_waits_for_a_provider() {
    let (bo, _transport) = backoffice();
    let payments = bo.payments();
    assert_eq!(
        payments.transactions_by_provider("").fetch().await,
        Err(ApiError::QueryDisabled)
    );
    let stripe = payments.transactions_by_provider("stripe").fetch().await.unwrap();
    assert_eq!(stripe.len(), 1);
    assert_eq!(stripe[0].provider.as_deref(), Some("stripe"));
}

// ---------------------------------------------------------------------------
// Uploads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn slider_upload_sends_only_filled_fields() {
    let (bo, transport) = backoffice();
    let form = SliderForm {
        title: Some("Welcome".to_string()),
        is_active: Some(true),
        image: Some(FilePart::new("hero.png", "image/png", vec![0x89, 0x50, 0x4e, 0x47])),
        ..Default::default()
    };
    let slider = bo.content().sliders().create_form().mutate(form).await.unwrap().unwrap();

    assert_eq!(slider.title, "Welcome");
    assert_eq!(slider.image.as_deref(), Some("/uploads/hero.png"));
    assert_eq!(slider.link, None);

    let request = transport.last_request().unwrap();
    assert!(request.header("content-type").unwrap().starts_with("multipart/form-data; boundary="));
    let body = String::from_utf8_lossy(request.body.as_deref().unwrap()).to_string();
    assert!(body.contains("name=\"title\""));
    assert!(!body.contains("name=\"link\""));
    assert!(!body.contains("name=\"order\""));
}

// ---------------------------------------------------------------------------
// Singletons and optimistic writes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn promo_toggle_shows_flip_before_server_answers() {
    let (bo, transport) = backoffice();
    let content = bo.content();
    let promo = content.promo_section().get();
    assert!(!promo.fetch().await.unwrap().is_active);

    let gate = transport.hold("PATCH /promo-section/toggle");
    let observe = async {
        wait_for_call(&transport, "PATCH /promo-section/toggle").await;
        let shown = promo.data().map(|p| p.is_active);
        gate.notify_one();
        shown
    };
    let (confirmed, shown) = tokio::join!(content.toggle_promo_section(), observe);

    assert_eq!(shown, Some(true));
    assert!(confirmed.unwrap().unwrap().is_active);
    assert_eq!(promo.data().map(|p| p.is_active), Some(true));

    let body: serde_json::Value =
        serde_json::from_slice(transport.last_request().unwrap().body.as_deref().unwrap()).unwrap();
    assert_eq!(body, serde_json::json!({ "isActive": true }));
}

#[tokio::test]
async fn failed_promo_toggle_rolls_back() {
    let (bo, transport) = backoffice();
    let content = bo.content();
    let promo = content.promo_section().get();
    let before: PromoSection = promo.fetch().await.unwrap();

    transport.fail("PATCH /promo-section/toggle", server_error(500, "Promo section is locked"));
    let error = content.toggle_promo_section().await.unwrap_err();
    assert_eq!(error.user_message(PROMO_TOGGLE_FALLBACK), "Promo section is locked");
    assert_eq!(promo.data(), Some(before.clone()));

    transport.fail("PATCH /promo-section/toggle", HttpResponse::json(502, "<html>bad gateway</html>"));
    let error = content.toggle_promo_section().await.unwrap_err();
    assert_eq!(error.status(), Some(502));
    assert_eq!(error.user_message(PROMO_TOGGLE_FALLBACK), PROMO_TOGGLE_FALLBACK);
    assert_eq!(promo.data(), Some(before));
}

#[tokio::test]
async fn missing_promo_section_reports_server_message() {
    let (bo, transport) = backoffice();
    let content = bo.content();
    let promo = content.promo_section().get();
    let before = promo.fetch().await.unwrap();

    transport.fail("PATCH /promo-section/toggle", server_error(404, "Promo section not found"));
    let error = content.toggle_promo_section().await.unwrap_err();
    assert_eq!(error.status(), Some(404));
    assert_eq!(error.user_message(PROMO_TOGGLE_FALLBACK), "Promo section not found");
    assert_eq!(promo.data(), Some(before));
}

#[tokio::test]
async fn toggle_reply_without_a_section_invalidates_instead_of_writing() {
    let (bo, transport) = backoffice();
    let content = bo.content();
    let promo = content.promo_section().get();
    let before = promo.fetch().await.unwrap();
    assert_eq!(before.banner.image.as_deref(), Some("/uploads/promo.png"));

    transport.fail(
        "PATCH /promo-section/toggle",
        HttpResponse::json(200, r#"{"success":true,"message":"toggled","data":{}}"#),
    );
    assert_eq!(content.toggle_promo_section().await, Ok(None));
    assert!(bo.cache().is_stale(promo.key()));

    assert_eq!(promo.fetch().await.unwrap(), before);
    assert_eq!(transport.count("GET /promo-section"), 2);
}

#[tokio::test]
async fn second_promo_toggle_is_rejected_while_the_first_is_pending() {
    let (bo, transport) = backoffice();
    let content = bo.content();
    let promo = content.promo_section().get();
    promo.fetch().await.unwrap();

    let gate = transport.hold("PATCH /promo-section/toggle");
    let second = async {
        wait_for_call(&transport, "PATCH /promo-section/toggle").await;
        let result = content.toggle_promo_section().await;
        gate.notify_one();
        result
    };
    let (first, second) = tokio::join!(content.toggle_promo_section(), second);

    assert!(first.unwrap().unwrap().is_active);
    assert_eq!(second, Err(ApiError::MutationPending));
    assert_eq!(transport.count("PATCH /promo-section/toggle"), 1);
    assert_eq!(promo.data().map(|p| p.is_active), Some(true));

    let back = content.toggle_promo_section().await.unwrap().unwrap();
    assert!(!back.is_active);
}

#[tokio::test]
async fn banner_text_rejection_restores_previous_text() {
    let (bo, _transport) = backoffice();
    let content = bo.content();
    let banner = content.banner_text().get();
    let before = banner.fetch().await.unwrap();
    assert_eq!(before.text, "Welcome to the platform");

    let mut blank = before.clone();
    blank.text = "   ".to_string();
    let error = content.edit_banner_text(blank).await.unwrap_err();
    assert_eq!(error.user_message("Failed to update banner text"), "Banner text cannot be empty");
    assert_eq!(banner.data(), Some(before.clone()));

    let mut edited = before;
    edited.text = "Weekend bonus".to_string();
    let saved = content.edit_banner_text(edited).await.unwrap().unwrap();
    assert_eq!(saved.text, "Weekend bonus");
    assert_eq!(banner.data().map(|b| b.text), Some("Weekend bonus".to_string()));
}

#[tokio::test]
async fn settings_section_write_updates_cache_without_refetch() {
    let (bo, transport) = backoffice();
    let settings = bo.settings();
    let query = settings.get();
    query.fetch().await.unwrap();

    let theme = ThemeSettings {
        mode: Some("dark".to_string()),
        ..Default::default()
    };
    settings.update_theme().mutate(theme).await.unwrap();

    let cached: Settings = bo.cache().get_query_data(&SETTINGS.all()).unwrap();
    assert_eq!(cached.theme.mode.as_deref(), Some("dark"));
    assert_eq!(cached.ui.language.as_deref(), Some("en"));
    assert!(!bo.cache().is_stale(query.key()));
    assert_eq!(transport.count("GET /settings"), 1);

    let reset = settings.reset().mutate(()).await.unwrap().unwrap();
    assert_eq!(reset.theme.mode.as_deref(), Some("light"));
    assert_eq!(query.data().unwrap().theme.mode.as_deref(), Some("light"));
}

#[tokio::test]
async fn clearing_security_logs_invalidates_them() {
    let (bo, transport) = backoffice();
    let settings = bo.settings();
    let logs = settings.security_logs();
    assert_eq!(logs.fetch().await.unwrap().len(), 1);

    settings.clear_security_logs().mutate(()).await.unwrap();
    assert!(bo.cache().is_stale(&SECURITY_LOGS.lists()));
    assert!(logs.fetch().await.unwrap().is_empty());
    assert_eq!(transport.count("GET /security/logs"), 2);
}

#[tokio::test]
async fn failed_user_edit_restores_detail() {
    let (bo, transport) = backoffice();
    let users = bo.users();
    let first = users.list(UserFilters::default()).unwrap().fetch_first().await.unwrap();
    let ann = first.items().into_iter().find(|u| u.email == "ann@example.com").unwrap();
    let detail = users.detail(&ann.id);
    let before: User = detail.fetch().await.unwrap();

    transport.fail(&format!("PUT /users/{}", ann.id), server_error(409, "email already in use"));
    let changes = UserUpdate {
        name: Some("Ann Stone".to_string()),
        ..Default::default()
    };
    let error = users.edit(&ann.id, changes.clone()).await.unwrap_err();
    assert_eq!(error.status(), Some(409));
    assert_eq!(detail.data(), Some(before));
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn infinite_user_list_pages_until_the_end() {
    let (bo, transport) = backoffice();
    let filters = UserFilters {
        limit: Some(1),
        ..Default::default()
    };
    let users = bo.users().list(filters).unwrap();

    let first = users.fetch_first().await.unwrap();
    assert_eq!(first.page_count(), 1);
    assert_eq!(first.total(), 3);
    assert!(users.has_next_page());

    assert!(users.fetch_next_page().await.unwrap());
    assert!(users.fetch_next_page().await.unwrap());
    assert!(!users.has_next_page());
    assert!(!users.fetch_next_page().await.unwrap());

    assert_eq!(users.items().len(), 3);
    assert_eq!(transport.count("GET /users"), 3);
    let last = transport.last_request().unwrap();
    assert!(last.path.ends_with("?limit=1&page=3"), "{}", last.path);

    users.invalidate();
    let refetched = users.refetch().await.unwrap();
    assert_eq!(refetched.page_count(), 1);
}

#[tokio::test]
async fn invalidation_during_next_page_is_kept() {
    let (bo, transport) = backoffice();
    let filters = UserFilters {
        limit: Some(1),
        ..Default::default()
    };
    let users = bo.users().list(filters).unwrap();
    users.fetch_first().await.unwrap();
    assert!(format!("{users:?}").starts_with("InfiniteQuery"));

    let gate = transport.hold("GET /users");
    let invalidate = async {
        wait_for_calls(&transport, "GET /users", 2).await;
        let touched = bo.cache().invalidate(&USERS.all());
        gate.notify_one();
        touched
    };
    let (merged, touched) = tokio::join!(users.fetch_next_page(), invalidate);

    assert_eq!(touched, 1);
    assert!(!merged.unwrap(), "page 2 lands on an outdated list");
    assert!(users.state().is_stale());
    assert_eq!(users.pages().unwrap().page_count(), 1);

    let refetched = users.fetch_first().await.unwrap();
    assert_eq!(refetched.page_count(), 1);
    assert_eq!(transport.count("GET /users"), 3);
    assert!(!users.state().is_stale());
}

#[tokio::test]
async fn referral_codes_are_filtered_client_side() {
    let (bo, transport) = backoffice();
    let codes = bo.users().referral_codes().fetch().await.unwrap();
    assert_eq!(codes.len(), 2);

    let mut pager = ClientPager::new(1);
    let view = pager.apply(&codes);
    assert_eq!(view.total_pages, 2);

    pager.next_page();
    pager.set_search("ANN");
    let view = pager.apply(&codes);
    assert_eq!(view.page, 1);
    assert_eq!(view.total, 1);
    assert_eq!(view.items[0].code, "ANN42");
    assert_eq!(view.items[0].referral_count, 1);

    assert_eq!(transport.count("GET /referral/all-codes-with-users"), 1);
}

#[tokio::test]
async fn concurrent_reads_share_one_request() {
    let (bo, transport) = backoffice();
    let query = bo.settings().get();
    let gate = transport.hold("GET /settings");

    let release = async {
        wait_for_call(&transport, "GET /settings").await;
        gate.notify_one();
    };
    let (a, b, ()) = tokio::join!(query.fetch(), query.fetch(), release);

    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(transport.count("GET /settings"), 1);
}

#[tokio::test]
async fn watch_follows_invalidation() {
    let (bo, transport) = backoffice();
    let query = bo.settings().get();
    let mut states = query.watch();

    assert_eq!(states.next().await, Some(QueryState::Loading));
    let loaded = states.next().await.unwrap();
    assert!(matches!(loaded, QueryState::Success { is_stale: false, .. }));

    bo.cache().invalidate(&SETTINGS.all());
    let stale = states.next().await.unwrap();
    assert!(matches!(stale, QueryState::Success { is_stale: true, .. }));
    let refreshed = states.next().await.unwrap();
    assert!(matches!(refreshed, QueryState::Success { is_stale: false, .. }));
    assert_eq!(transport.count("GET /settings"), 2);
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_stores_session_and_primes_profile() {
    let (bo, transport) = backoffice();
    let users = bo.users();
    assert!(!users.profile().is_enabled());

    let login = users.login();
    let response = login.mutate(admin()).await.unwrap();
    assert!(matches!(login.state(), MutationState::Success(_)));
    assert_eq!(bo.session().token(), Some(response.token.clone()));
    assert_eq!(bo.session().user().map(|u| u.email), Some(ADMIN_EMAIL.to_string()));

    let profile = users.profile();
    assert!(profile.is_enabled());
    assert_eq!(profile.fetch().await.unwrap().email, ADMIN_EMAIL);
    assert_eq!(transport.count("GET /users/profile"), 0, "primed by login");

    let refreshed = profile.refetch().await.unwrap();
    assert_eq!(refreshed.role.as_deref(), Some("admin"));
    let request = transport.last_request().unwrap();
    assert_eq!(
        request.header("authorization"),
        Some(format!("Bearer {}", response.token).as_str())
    );
    assert_eq!(bo.cache().get_query_data::<User>(&UsersApi::profile_key()), Some(refreshed));
}

#[tokio::test]
async fn rejected_login_leaves_session_empty() {
    let (bo, _transport) = backoffice();
    let login = bo.users().login();
    let error = login
        .mutate(Credentials {
            password: "wrong".to_string(),
            ..admin()
        })
        .await
        .unwrap_err();

    assert_eq!(error.status(), Some(401));
    assert_eq!(error.user_message("Login failed"), "Invalid email or password");
    assert!(!bo.session().is_authenticated());
    assert!(matches!(login.state(), MutationState::Error(_)));
}

#[tokio::test]
async fn logout_clears_session_and_cache() {
    let (bo, transport) = backoffice();
    bo.users().login().mutate(admin()).await.unwrap();
    bo.settings().get().fetch().await.unwrap();
    assert!(!bo.cache().is_empty());

    bo.logout().await.unwrap();
    assert!(!bo.session().is_authenticated());
    assert!(bo.cache().is_empty());
    assert_eq!(transport.count("POST /users/logout"), 1);
}

#[tokio::test]
async fn logout_tears_down_even_when_server_fails() {
    let (bo, transport) = backoffice();
    bo.users().login().mutate(admin()).await.unwrap();
    bo.settings().get().fetch().await.unwrap();

    transport.fail("POST /users/logout", server_error(503, "maintenance"));
    let error = bo.logout().await.unwrap_err();
    assert_eq!(error.status(), Some(503));
    assert!(!bo.session().is_authenticated());
    assert!(bo.cache().is_empty());
}

#[tokio::test]
async fn persisted_session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let config = ClientConfig::default()
        .with_base_url(common::BASE_URL)
        .with_session_file(&path);

    let transport = Arc::new(common::RouterTransport::new(mock_server::app()));
    let first = Backoffice::new(config.clone(), transport.clone());
    first.users().login().mutate(admin()).await.unwrap();
    assert!(path.exists());

    let second = Backoffice::new(config, transport);
    assert!(second.session().is_authenticated());
    assert_eq!(second.session().token(), first.session().token());

    second.logout().await.unwrap();
    assert!(!path.exists());
}

// ---------------------------------------------------------------------------
// Real HTTP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn real_http_round_trip() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(mock_server::run(listener));

    let bo = Backoffice::with_session(
        ClientConfig::default().with_base_url(format!("http://{addr}")),
        Arc::new(ReqwestTransport::new()),
        SessionStore::in_memory(),
    );

    bo.users().login().mutate(admin()).await.unwrap();
    let profile = bo.users().profile().refetch().await.unwrap();
    assert_eq!(profile.email, ADMIN_EMAIL);

    let form = SliderForm {
        title: Some("Over the wire".to_string()),
        order: Some(3),
        image: Some(FilePart::new("wire.png", "image/png", vec![1, 2, 3])),
        ..Default::default()
    };
    let sliders = bo.content().sliders();
    let created = sliders.create_form().mutate(form).await.unwrap().unwrap();
    assert_eq!(created.order, Some(3));
    assert_eq!(created.image.as_deref(), Some("/uploads/wire.png"));
    assert_eq!(sliders.all().fetch().await.unwrap().len(), 1);

    let missing = bo.payments().promotions().detail("0000").fetch().await;
    assert_eq!(
        missing,
        Err(ApiError::NotFound {
            message: Some("promotion not found".to_string())
        })
    );
}
