mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

use common::{id_of, seed_chain, Chain, TestApp};

/// Another tender under the chain's org unit
async fn tender_in(app: &TestApp, token: &str, chain: &Chain, title: &str) -> Uuid {
    let value_id = Uuid::new_v4();
    app.create(
        token,
        "/tenders",
        json!({
            "tenant_id": chain.tenant,
            "organization_id": chain.organization,
            "org_unit_id": chain.org_unit,
            "title": title,
            "tender_status_value_id": value_id,
            "tender_type_value_id": value_id,
            "created_by_user_id": chain.user,
        }),
    )
    .await
}

/// Ids of one tender's evaluation rubric, one row per level
struct Rubric {
    criteria: Uuid,
    stage: Uuid,
    category: Uuid,
    criterion: Uuid,
}

async fn seed_rubric(app: &TestApp, token: &str, tenant: Uuid, tender: Uuid) -> Rubric {
    let value_id = Uuid::new_v4();
    let method = app
        .create(
            token,
            "/evaluation-methods",
            json!({
                "tenant_id": tenant,
                "name": "QCBS",
                "technical_weightage": "70",
                "commercial_weightage": "30",
            }),
        )
        .await;
    let criteria = app
        .create(
            token,
            "/evaluation-criteria",
            json!({"tender_id": tender, "evaluation_method_id": method, "criteria_details": "Two-envelope"}),
        )
        .await;
    let stage = app
        .create(
            token,
            "/evaluation-stages",
            json!({"tender_id": tender, "criteria_id": criteria, "stage_type_value_id": value_id, "sequence": 1}),
        )
        .await;
    let category = app
        .create(
            token,
            "/evaluation-categories",
            json!({"stage_id": stage, "name": "Experience", "sequence": 1}),
        )
        .await;
    let criterion = app
        .create(
            token,
            "/evaluation-criterion",
            json!({
                "category_id": category,
                "description": "Similar projects delivered",
                "weightage": "40",
                "is_mandatory": true,
                "criteria_type_value_id": value_id,
                "sequence": 1,
            }),
        )
        .await;

    Rubric {
        criteria,
        stage,
        category,
        criterion,
    }
}

#[tokio::test]
async fn crud_round_trip_on_a_tenant() {
    let app = TestApp::new();
    let token = app.user_token().await;

    let id = app
        .create(&token, "/tenants", json!({"name": "Northwind", "description": "Test"}))
        .await;

    let response = app
        .request(
            Method::PATCH,
            &format!("/tenants/{}", id),
            Some(&token),
            Some(json!({"description": null})),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["name"], "Northwind");
    assert!(response.body["data"]["description"].is_null());

    let response = app
        .request(Method::GET, "/tenants?per_page=5", Some(&token), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["pagination"]["total_items"], 1);
    assert_eq!(response.body["pagination"]["per_page"], 5);

    let response = app
        .request(Method::DELETE, &format!("/tenants/{}", id), Some(&token), None)
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = app
        .request(Method::GET, &format!("/tenants/{}", id), Some(&token), None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_a_missing_row_is_not_found() {
    let app = TestApp::new();
    let token = app.user_token().await;
    app.create(&token, "/tenants", json!({"name": "Keep me"})).await;

    let response = app
        .request(
            Method::DELETE,
            &format!("/tenants/{}", Uuid::new_v4()),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.request(Method::GET, "/tenants", Some(&token), None).await;
    assert_eq!(response.body["pagination"]["total_items"], 1);
}

#[tokio::test]
async fn missing_parent_is_not_found() {
    let app = TestApp::new();
    let token = app.user_token().await;

    let response = app
        .request(
            Method::POST,
            "/organizations",
            Some(&token),
            Some(json!({"tenant_id": Uuid::new_v4(), "name": "Orphan", "industry": "None"})),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn full_chain_resolves_and_parents_with_children_cannot_be_deleted() {
    let app = TestApp::new();
    let token = app.user_token().await;
    let chain = seed_chain(&app, &token).await;
    let value_id = Uuid::new_v4();

    let Rubric {
        criteria,
        stage,
        category,
        criterion,
    } = seed_rubric(&app, &token, chain.tenant, chain.tender).await;
    app.create(
        &token,
        "/evaluation-results",
        json!({
            "bid_id": chain.bid,
            "criteria_id": criteria,
            "stage_id": stage,
            "category_id": category,
            "criterion_id": criterion,
            "evaluation_outcome_value_id": value_id,
            "score": 35.5,
        }),
    )
    .await;

    let rubric = app
        .request(
            Method::GET,
            &format!("/tenders/{}/evaluation", chain.tender),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(rubric.status, StatusCode::OK);
    let stages = rubric.body["data"]["stages"].as_array().unwrap();
    assert_eq!(stages.len(), 1);
    assert_eq!(stages[0]["categories"][0]["name"], "Experience");
    assert_eq!(
        stages[0]["categories"][0]["criterion"][0]["description"],
        "Similar projects delivered"
    );

    for (path, id) in [
        ("tenants", chain.tenant),
        ("organizations", chain.organization),
        ("org-units", chain.org_unit),
        ("tenders", chain.tender),
        ("bidders", chain.bidder),
        ("bids", chain.bid),
        ("evaluation-criterion", criterion),
    ] {
        let response = app
            .request(Method::DELETE, &format!("/{}/{}", path, id), Some(&token), None)
            .await;
        assert_eq!(response.status, StatusCode::CONFLICT, "{}", path);
    }
}

#[tokio::test]
async fn second_bid_for_the_same_pair_conflicts() {
    let app = TestApp::new();
    let token = app.user_token().await;
    let chain = seed_chain(&app, &token).await;

    let response = app
        .request(
            Method::POST,
            "/bids",
            Some(&token),
            Some(json!({
                "tender_id": chain.tender,
                "bidder_id": chain.bidder,
                "bid_status_value_id": Uuid::new_v4(),
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(
        response.body["message"],
        "Bidder has already submitted a bid for this tender"
    );

    let bid = app
        .request(
            Method::GET,
            &format!("/bidders/{}/bid", chain.bidder),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(bid.status, StatusCode::OK);
    assert_eq!(id_of(&bid.body["data"]), chain.bid);
}

#[tokio::test]
async fn bidder_holds_at_most_one_bid() {
    let app = TestApp::new();
    let token = app.user_token().await;
    let chain = seed_chain(&app, &token).await;
    let other_tender = tender_in(&app, &token, &chain, "Culvert repairs").await;

    let response = app
        .request(
            Method::POST,
            "/bids",
            Some(&token),
            Some(json!({
                "tender_id": other_tender,
                "bidder_id": chain.bidder,
                "bid_status_value_id": Uuid::new_v4(),
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["message"], "Bidder already has a bid");

    let response = app
        .request(
            Method::GET,
            &format!("/bids?tender_id={}", other_tender),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.body["pagination"]["total_items"], 0);

    let lonely = app
        .create(
            &token,
            "/bidders",
            json!({"tenant_id": chain.tenant, "name": "Newcomer", "contact_info": "n@new.test"}),
        )
        .await;
    let response = app
        .request(
            Method::GET,
            &format!("/bidders/{}/bid", lonely),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn org_unit_cycles_are_rejected() {
    let app = TestApp::new();
    let token = app.user_token().await;
    let chain = seed_chain(&app, &token).await;

    let child = app
        .create(
            &token,
            "/org-units",
            json!({"organization_id": chain.organization, "parent_org_unit_id": chain.org_unit, "name": "Works"}),
        )
        .await;
    let grandchild = app
        .create(
            &token,
            "/org-units",
            json!({"organization_id": chain.organization, "parent_org_unit_id": child, "name": "Roads"}),
        )
        .await;

    // Self-parent
    let response = app
        .request(
            Method::PATCH,
            &format!("/org-units/{}", child),
            Some(&token),
            Some(json!({"parent_org_unit_id": child})),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    // Indirect: root under its own grandchild
    let response = app
        .request(
            Method::PATCH,
            &format!("/org-units/{}", chain.org_unit),
            Some(&token),
            Some(json!({"parent_org_unit_id": grandchild})),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let ancestors = app
        .request(
            Method::GET,
            &format!("/org-units/{}/ancestors", grandchild),
            Some(&token),
            None,
        )
        .await;
    let ids: Vec<Uuid> = ancestors.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(id_of)
        .collect();
    assert_eq!(ids, vec![child, chain.org_unit]);

    let children = app
        .request(
            Method::GET,
            &format!("/org-units/{}/children", chain.org_unit),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(children.body["data"].as_array().unwrap().len(), 1);

    let descendants = app
        .request(
            Method::GET,
            &format!("/org-units/{}/descendants", chain.org_unit),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(descendants.status, StatusCode::OK);
    let ids: Vec<Uuid> = descendants.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(id_of)
        .collect();
    assert_eq!(ids, vec![child, grandchild]);
}

#[tokio::test]
async fn deleting_a_tender_cascades_to_its_specification_only() {
    let app = TestApp::new();
    let token = app.user_token().await;
    let chain = seed_chain(&app, &token).await;

    // A tender with no bids, so nothing restricts its deletion
    let value_id = Uuid::new_v4();
    let tender = app
        .create(
            &token,
            "/tenders",
            json!({
                "tenant_id": chain.tenant,
                "organization_id": chain.organization,
                "org_unit_id": chain.org_unit,
                "title": "Street lighting",
                "tender_status_value_id": value_id,
                "tender_type_value_id": value_id,
                "created_by_user_id": chain.user,
            }),
        )
        .await;
    let spec = app
        .create(
            &token,
            "/tender-specifications",
            json!({"tender_id": tender, "details": "LED fittings"}),
        )
        .await;

    let response = app
        .request(
            Method::POST,
            "/tender-specifications",
            Some(&token),
            Some(json!({"tender_id": tender, "details": "Second"})),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let response = app
        .request(
            Method::GET,
            &format!("/tenders/{}/specification", tender),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(id_of(&response.body["data"]), spec);

    let response = app
        .request(Method::DELETE, &format!("/tenders/{}", tender), Some(&token), None)
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = app
        .request(
            Method::GET,
            &format!("/tender-specifications/{}", spec),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    for (path, id) in [
        ("org-units", chain.org_unit),
        ("organizations", chain.organization),
        ("users", chain.user),
    ] {
        let response = app
            .request(Method::GET, &format!("/{}/{}", path, id), Some(&token), None)
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", path);
    }
}

#[tokio::test]
async fn tender_parents_must_agree() {
    let app = TestApp::new();
    let token = app.user_token().await;
    let chain = seed_chain(&app, &token).await;

    let other_org = app
        .create(
            &token,
            "/organizations",
            json!({"tenant_id": chain.tenant, "name": "Acme Water", "industry": "Utilities"}),
        )
        .await;
    let value_id = Uuid::new_v4();

    let response = app
        .request(
            Method::POST,
            "/tenders",
            Some(&token),
            Some(json!({
                "tenant_id": chain.tenant,
                "organization_id": other_org,
                "org_unit_id": chain.org_unit,
                "title": "Mismatched",
                "tender_status_value_id": value_id,
                "tender_type_value_id": value_id,
                "created_by_user_id": chain.user,
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bids_stay_within_the_tenders_tenant() {
    let app = TestApp::new();
    let token = app.user_token().await;
    let chain = seed_chain(&app, &token).await;

    let rival_tenant = app.create(&token, "/tenants", json!({"name": "Rival Group"})).await;
    let outsider = app
        .create(
            &token,
            "/bidders",
            json!({"tenant_id": rival_tenant, "name": "Outsider Ltd", "contact_info": "o@out.test"}),
        )
        .await;

    let response = app
        .request(
            Method::POST,
            "/bids",
            Some(&token),
            Some(json!({
                "tender_id": chain.tender,
                "bidder_id": outsider,
                "bid_status_value_id": Uuid::new_v4(),
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "Bidder belongs to a different tenant");
}

#[tokio::test]
async fn evaluation_stage_criteria_must_share_its_tender() {
    let app = TestApp::new();
    let token = app.user_token().await;
    let chain = seed_chain(&app, &token).await;
    let other_tender = tender_in(&app, &token, &chain, "Culvert repairs").await;
    let other = seed_rubric(&app, &token, chain.tenant, other_tender).await;

    let response = app
        .request(
            Method::POST,
            "/evaluation-stages",
            Some(&token),
            Some(json!({
                "tender_id": chain.tender,
                "criteria_id": other.criteria,
                "stage_type_value_id": Uuid::new_v4(),
                "sequence": 2,
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body["message"],
        "Evaluation criteria belongs to a different tender"
    );
}

#[tokio::test]
async fn evaluation_results_must_follow_one_rubric_chain() {
    let app = TestApp::new();
    let token = app.user_token().await;
    let chain = seed_chain(&app, &token).await;
    let own = seed_rubric(&app, &token, chain.tenant, chain.tender).await;
    let other_tender = tender_in(&app, &token, &chain, "Culvert repairs").await;
    let other = seed_rubric(&app, &token, chain.tenant, other_tender).await;

    let cases = [
        (
            "criterion from another category",
            [own.criteria, own.stage, own.category, other.criterion],
            "Criterion does not belong to the given category",
        ),
        (
            "category from another stage",
            [own.criteria, own.stage, other.category, other.criterion],
            "Category does not belong to the given stage",
        ),
        (
            "stage from other criteria",
            [own.criteria, other.stage, other.category, other.criterion],
            "Stage does not belong to the given evaluation criteria",
        ),
        (
            "criteria for another tender",
            [other.criteria, other.stage, other.category, other.criterion],
            "Evaluation criteria is not for the bid's tender",
        ),
    ];

    for (case, [criteria, stage, category, criterion], message) in cases {
        let response = app
            .request(
                Method::POST,
                "/evaluation-results",
                Some(&token),
                Some(json!({
                    "bid_id": chain.bid,
                    "criteria_id": criteria,
                    "stage_id": stage,
                    "category_id": category,
                    "criterion_id": criterion,
                    "evaluation_outcome_value_id": Uuid::new_v4(),
                    "score": 10.0,
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", case);
        assert_eq!(response.body["message"], message, "{}", case);
    }

    let response = app
        .request(
            Method::GET,
            &format!("/evaluation-results?bid_id={}", chain.bid),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.body["pagination"]["total_items"], 0);
}

#[tokio::test]
async fn weightages_must_sum_to_one_hundred() {
    let app = TestApp::new();
    let token = app.user_token().await;
    let tenant = app.create(&token, "/tenants", json!({"name": "T"})).await;

    let response = app
        .request(
            Method::POST,
            "/evaluation-methods",
            Some(&token),
            Some(json!({
                "tenant_id": tenant,
                "name": "Lopsided",
                "technical_weightage": "80",
                "commercial_weightage": "30",
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_filters_by_foreign_key() {
    let app = TestApp::new();
    let token = app.user_token().await;
    let chain = seed_chain(&app, &token).await;
    app.create(
        &token,
        "/organizations",
        json!({"tenant_id": chain.tenant, "name": "Second org", "industry": "Retail"}),
    )
    .await;
    let other_tenant = app.create(&token, "/tenants", json!({"name": "Other"})).await;
    app.create(
        &token,
        "/organizations",
        json!({"tenant_id": other_tenant, "name": "Elsewhere", "industry": "Retail"}),
    )
    .await;

    let response = app
        .request(
            Method::GET,
            &format!("/organizations?tenant_id={}", chain.tenant),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["pagination"]["total_items"], 2);

    let response = app
        .request(Method::GET, "/organizations?name=Elsewhere", Some(&token), None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn role_permissions_link_both_ways() {
    let app = TestApp::new();
    let token = app.user_token().await;
    let tenant = app.create(&token, "/tenants", json!({"name": "T"})).await;
    let role = app
        .create(&token, "/roles", json!({"tenant_id": tenant, "name": "Evaluator"}))
        .await;
    let permission = app
        .create(&token, "/permissions", json!({"tenant_id": tenant, "name": "score_bids"}))
        .await;

    let uri = format!("/roles/{}/permissions/{}", role, permission);
    let response = app.request(Method::PUT, &uri, Some(&token), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["linked"], true);

    let response = app.request(Method::PUT, &uri, Some(&token), None).await;
    assert_eq!(response.body["data"]["linked"], false);

    let response = app
        .request(
            Method::GET,
            &format!("/permissions/{}/roles", permission),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(id_of(&response.body["data"][0]), role);

    // Deleting the permission removes the association
    let response = app
        .request(Method::DELETE, &format!("/permissions/{}", permission), Some(&token), None)
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = app
        .request(Method::GET, &format!("/roles/{}/permissions", role), Some(&token), None)
        .await;
    assert_eq!(response.body["data"].as_array().unwrap().len(), 0);

    let response = app.request(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_grid_projects_columns_and_hides_hashes() {
    let app = TestApp::new();
    let user = app.user_token().await;
    let admin = app.admin_token().await;

    let response = app
        .request(Method::GET, "/admin/tables", Some(&user), None)
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app
        .request(Method::GET, "/admin/tables", Some(&admin), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|t| t["name"] == "accounts"));

    let response = app
        .request(Method::GET, "/admin/tables/accounts", Some(&admin), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["pagination"]["total_items"], 2);
    let row = &response.body["data"][0];
    assert!(row.get("email").is_some());
    assert!(row.get("password_hash").is_none());
    assert!(row.get("created_at").is_none());

    let id = id_of(row);
    let response = app
        .request(
            Method::GET,
            &format!("/admin/tables/accounts/{}", id),
            Some(&admin),
            None,
        )
        .await;
    assert!(response.body["data"].get("created_at").is_some());
    assert!(response.body["data"].get("password_hash").is_none());

    let response = app
        .request(Method::GET, "/admin/tables/nope", Some(&admin), None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_ok_with_a_request_id() {
    let app = TestApp::new();
    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");
    assert_eq!(response.body["storage"], "memory");
    assert!(response.headers.contains_key("x-request-id"));

    let response = app
        .request(Method::GET, "/tenants", None, None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.body["request_id"],
        response.headers["x-request-id"].to_str().unwrap()
    );
}
