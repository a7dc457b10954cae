use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, ADMIN_EMAIL, ADMIN_PASSWORD};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn multipart_request(uri: &str, parts: &[(&str, Option<&str>, &str)]) -> Request<String> {
    let boundary = "test-boundary";
    let mut body = String::new();
    for (name, file_name, value) in parts {
        body.push_str(&format!("--{boundary}\r\n"));
        match file_name {
            Some(file_name) => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )),
            None => body.push_str(&format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")),
        }
        body.push_str(value);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{boundary}--\r\n"));
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            http::header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(body)
        .unwrap()
}

// --- envelopes ---

#[tokio::test]
async fn users_list_is_paginated() {
    let resp = app().oneshot(get("/users?page=2&limit=2")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["page"], 2);
    assert_eq!(body["data"]["totalPages"], 2);
    assert_eq!(body["data"]["users"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn page_past_the_end_is_empty() {
    let resp = app()
        .oneshot(get(&format!("/users?page={}&limit=2", usize::MAX)))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["users"], json!([]));
}

#[tokio::test]
async fn users_search_filters_by_name_and_email() {
    let resp = app().oneshot(get("/users?search=ann")).await.unwrap();
    let body = body_json(resp).await;
    let users = body["data"]["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["email"], "ann@example.com");
}

#[tokio::test]
async fn sliders_list_is_a_plain_array() {
    let resp = app().oneshot(get("/sliders")).await.unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn settings_are_nested_under_settings() {
    let resp = app().oneshot(get("/settings")).await.unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["data"]["settings"]["ui"]["language"], "en");
}

// --- errors ---

#[tokio::test]
async fn missing_record_returns_404_with_message() {
    let resp = app().oneshot(get("/promotions/0000")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "promotion not found");
}

#[tokio::test]
async fn user_create_requires_password() {
    let resp = app()
        .oneshot(json_request("POST", "/users", r#"{"name":"Cy","email":"cy@example.com"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["message"], "name, email and password are required");
}

#[tokio::test]
async fn empty_banner_text_is_rejected() {
    let resp = app()
        .oneshot(json_request("PUT", "/banner-text", r#"{"text":"  "}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- auth ---

#[tokio::test]
async fn login_then_profile() {
    use tower::Service;

    let mut app = app().into_service();
    let credentials = json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }).to_string();
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/users/login", &credentials))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let token = body["data"]["token"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["user"]["email"], ADMIN_EMAIL);
    assert!(body["data"]["user"].get("password").is_none());

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(
            Request::builder()
                .uri("/users/profile")
                .header(http::header::AUTHORIZATION, format!("Bearer {token}"))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["user"]["role"], "admin");
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/users/login",
            &json!({ "email": ADMIN_EMAIL, "password": "nope" }).to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_without_token_is_unauthorized() {
    let resp = app().oneshot(get("/users/profile")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- uploads ---

#[tokio::test]
async fn multipart_create_stores_text_and_file_fields() {
    let resp = app()
        .oneshot(multipart_request(
            "/sliders",
            &[
                ("title", None, "Welcome"),
                ("order", None, "2"),
                ("isActive", None, "false"),
                ("image", Some("hero.png"), "PNG"),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    let slider = &body["data"]["slider"];
    assert_eq!(slider["title"], "Welcome");
    assert_eq!(slider["order"], 2);
    assert_eq!(slider["isActive"], false);
    assert_eq!(slider["image"], "/uploads/hero.png");
    assert!(slider.get("link").is_none());
}

// --- singletons ---

#[tokio::test]
async fn promo_toggle_flips_without_body() {
    let resp = app()
        .oneshot(Request::builder().method("PATCH").uri("/promo-section/toggle").body(String::new()).unwrap())
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["data"]["promoSection"]["isActive"], true);
}

#[tokio::test]
async fn settings_section_update_returns_whole_settings() {
    let resp = app()
        .oneshot(json_request("PUT", "/settings/theme", r#"{"mode":"dark"}"#))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["data"]["settings"]["theme"], json!({ "mode": "dark" }));
    assert_eq!(body["data"]["settings"]["ui"]["language"], "en");
}

#[tokio::test]
async fn referral_codes_list_users_with_codes() {
    let resp = app().oneshot(get("/referral/all-codes-with-users")).await.unwrap();
    let body = body_json(resp).await;
    let codes = body["data"]["codes"].as_array().unwrap();
    assert_eq!(codes.len(), 2);
    let ann = codes.iter().find(|c| c["code"] == "ANN42").unwrap();
    assert_eq!(ann["referralCount"], 1);
}

#[tokio::test]
async fn transaction_stats_and_provider_filter() {
    use tower::Service;

    let mut app = app().into_service();
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get("/transactions/stats"))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["data"]["stats"]["totalCount"], 1);
    assert_eq!(body["data"]["stats"]["completedCount"], 1);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get("/transactions/provider/stripe"))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["data"]["transactions"].as_array().unwrap().len(), 1);
}

// --- full CRUD lifecycle ---

#[tokio::test]
async fn crud_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // create
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/payment-methods", r#"{"name":"Card","minAmount":5}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    let id = body["data"]["paymentMethod"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["paymentMethod"]["isActive"], true);

    // list
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get("/payment-methods"))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["data"]["paymentMethods"][0]["id"], id.as_str());

    // update, partial
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("PUT", &format!("/payment-methods/{id}"), r#"{"minAmount":10}"#))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["data"]["paymentMethod"]["minAmount"], 10);
    assert_eq!(body["data"]["paymentMethod"]["name"], "Card"); // unchanged

    // status
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("PATCH", &format!("/payment-methods/{id}/status"), r#"{"isActive":false}"#))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["data"]["paymentMethod"]["isActive"], false);

    // delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(Request::builder().method("DELETE").uri(&format!("/payment-methods/{id}")).body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // get after delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get(&format!("/payment-methods/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
