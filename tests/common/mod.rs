//! Shared harness: the full router over an in-memory store

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use tenderhub_backend::{create_app, AppState, Settings, Store};

pub const ADMIN_EMAIL: &str = "admin@tenderhub.test";

pub struct TestApp {
    router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        let mut settings = Settings::in_memory();
        settings.admin_emails = vec![ADMIN_EMAIL.to_string()];
        let state = AppState::new(Store::memory(), settings);
        Self {
            router: create_app(state),
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn register(&self, email: &str, phone: &str) -> TestResponse {
        self.request(
            Method::POST,
            "/registration",
            None,
            Some(json!({
                "email": email,
                "phone": phone,
                "name": "Test Account",
                "password": "s3cret-pass",
            })),
        )
        .await
    }

    /// Register (if needed) and log in, returning the bearer token
    pub async fn token_for(&self, email: &str, phone: &str) -> String {
        self.register(email, phone).await;
        let response = self
            .request(
                Method::POST,
                "/login",
                None,
                Some(json!({"email": email, "password": "s3cret-pass"})),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn user_token(&self) -> String {
        self.token_for("user@tenderhub.test", "9000000001").await
    }

    pub async fn admin_token(&self) -> String {
        self.token_for(ADMIN_EMAIL, "9000000000").await
    }

    /// POST a row and return its id, asserting 201
    pub async fn create(&self, token: &str, path: &str, body: Value) -> Uuid {
        let response = self.request(Method::POST, path, Some(token), Some(body)).await;
        assert_eq!(response.status, StatusCode::CREATED, "{}: {}", path, response.body);
        id_of(&response.body["data"])
    }
}

pub fn id_of(row: &Value) -> Uuid {
    Uuid::parse_str(row["id"].as_str().unwrap()).unwrap()
}

/// Ids of a full procurement chain
pub struct Chain {
    pub tenant: Uuid,
    pub organization: Uuid,
    pub org_unit: Uuid,
    pub user: Uuid,
    pub tender: Uuid,
    pub bidder: Uuid,
    pub bid: Uuid,
}

pub async fn seed_chain(app: &TestApp, token: &str) -> Chain {
    let value_id = Uuid::new_v4();

    let tenant = app
        .create(token, "/tenants", json!({"name": "Acme Holdings"}))
        .await;
    let organization = app
        .create(
            token,
            "/organizations",
            json!({"tenant_id": tenant, "name": "Acme Public Works", "industry": "Construction"}),
        )
        .await;
    let org_unit = app
        .create(
            token,
            "/org-units",
            json!({"organization_id": organization, "name": "Procurement"}),
        )
        .await;
    let user = app
        .create(
            token,
            "/users",
            json!({"tenant_id": tenant, "display_name": "Dana Buyer", "email": "dana@acme.test"}),
        )
        .await;
    let tender = app
        .create(
            token,
            "/tenders",
            json!({
                "tenant_id": tenant,
                "organization_id": organization,
                "org_unit_id": org_unit,
                "title": "Bridge maintenance 2026",
                "tender_status_value_id": value_id,
                "tender_type_value_id": value_id,
                "created_by_user_id": user,
            }),
        )
        .await;
    let bidder = app
        .create(
            token,
            "/bidders",
            json!({"tenant_id": tenant, "name": "Steelworks Ltd", "contact_info": "bids@steelworks.test"}),
        )
        .await;
    let bid = app
        .create(
            token,
            "/bids",
            json!({"tender_id": tender, "bidder_id": bidder, "bid_status_value_id": value_id}),
        )
        .await;

    Chain {
        tenant,
        organization,
        org_unit,
        user,
        tender,
        bidder,
        bid,
    }
}
