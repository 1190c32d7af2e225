mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

use common::{id_of, TestApp};

#[tokio::test]
async fn nine_digit_phone_is_rejected_and_nothing_is_stored() {
    let app = TestApp::new();

    let response = app.register("short@tenderhub.test", "123456789").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "BAD_REQUEST");
    assert_eq!(
        response.body["message"],
        "Phone number must be exactly 10 digits"
    );

    let token = app.admin_token().await;
    let listed = app.request(Method::GET, "/table", Some(&token), None).await;
    let emails: Vec<&str> = listed.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["email"].as_str().unwrap())
        .collect();
    assert!(!emails.contains(&"short@tenderhub.test"));
}

#[tokio::test]
async fn phone_may_be_sent_as_a_number() {
    let app = TestApp::new();
    let response = app
        .request(
            Method::POST,
            "/registration",
            None,
            Some(json!({
                "email": "numeric@tenderhub.test",
                "phone": 9876543210u64,
                "name": "Numeric",
                "password": "s3cret-pass",
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["data"]["phone"], "9876543210");
    assert!(response.body["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn duplicate_email_is_rejected_and_first_record_is_kept() {
    let app = TestApp::new();

    let first = app.register("dup@tenderhub.test", "9111111111").await;
    assert_eq!(first.status, StatusCode::CREATED);

    let second = app.register("DUP@tenderhub.test", "9222222222").await;
    assert_eq!(second.status, StatusCode::CONFLICT);
    assert_eq!(second.body["message"], "Email already exists");

    let token = app.token_for("dup@tenderhub.test", "9111111111").await;
    let me = app.request(Method::GET, "/me", Some(&token), None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["data"]["phone"], "9111111111");
    assert_eq!(id_of(&me.body["data"]), id_of(&first.body["data"]));
}

#[tokio::test]
async fn duplicate_phone_is_reported_first() {
    let app = TestApp::new();
    app.register("one@tenderhub.test", "9333333333").await;

    let response = app.register("one@tenderhub.test", "9333333333").await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["message"], "Phone number already exists");
}

#[tokio::test]
async fn wrong_password_is_forbidden() {
    let app = TestApp::new();
    app.register("login@tenderhub.test", "9444444444").await;

    let response = app
        .request(
            Method::POST,
            "/login",
            None,
            Some(json!({"email": "login@tenderhub.test", "password": "not-it"})),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app
        .request(
            Method::POST,
            "/login",
            None,
            Some(json!({"password": "s3cret-pass"})),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_by_phone_returns_a_bearer_token() {
    let app = TestApp::new();
    app.register("phone@tenderhub.test", "9555555555").await;

    let response = app
        .request(
            Method::POST,
            "/login",
            None,
            Some(json!({"phone": "9555555555", "password": "s3cret-pass"})),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["token_type"], "bearer");
    assert_eq!(response.body["account"]["email"], "phone@tenderhub.test");
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = TestApp::new();

    for uri in ["/me", "/table", "/tenants", "/admin/tables"] {
        let response = app.request(Method::GET, uri, None, None).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "{}", uri);
    }

    let response = app
        .request(Method::GET, "/tenants", Some("not-a-jwt"), None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn deleting_a_missing_account_is_not_found() {
    let app = TestApp::new();
    let token = app.user_token().await;

    let before = app.request(Method::GET, "/table", Some(&token), None).await;
    let missing = Uuid::new_v4();

    let response = app
        .request(Method::GET, &format!("/deleteuser/{}", missing), Some(&token), None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app
        .request(Method::DELETE, &format!("/accounts/{}", missing), Some(&token), None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let after = app.request(Method::GET, "/table", Some(&token), None).await;
    assert_eq!(before.body, after.body);
}

#[tokio::test]
async fn update_applies_the_registration_rules() {
    let app = TestApp::new();
    let token = app.user_token().await;
    let other = app.register("other@tenderhub.test", "9666666666").await;
    let other_id = id_of(&other.body["data"]);

    let response = app
        .request(
            Method::POST,
            &format!("/updateuser/{}", other_id),
            Some(&token),
            Some(json!({"phone": "12345"})),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .request(
            Method::POST,
            &format!("/updateuser/{}", other_id),
            Some(&token),
            Some(json!({"email": "user@tenderhub.test"})),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let response = app
        .request(
            Method::POST,
            &format!("/updateuser/{}", other_id),
            Some(&token),
            Some(json!({"name": "Renamed"})),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["name"], "Renamed");
}

#[tokio::test]
async fn deleting_every_account_needs_an_admin() {
    let app = TestApp::new();
    let user = app.user_token().await;
    let admin = app.admin_token().await;

    let response = app.request(Method::DELETE, "/table", Some(&user), None).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app.request(Method::DELETE, "/table", Some(&admin), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Deleted 2 accounts");

    // The admin's own account is gone, so the token no longer opens admin routes
    let response = app
        .request(Method::GET, "/admin/tables", Some(&admin), None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}
