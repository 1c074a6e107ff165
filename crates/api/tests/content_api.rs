//! Integration tests for the content ledger endpoints.

mod common;

use axum::http::StatusCode;
use common::{body_json, delete, get, post_json};
use persona_core::content::ContentKind;
use persona_tracker::testing::ScriptedGateway;
use serde_json::json;

// ---------------------------------------------------------------------------
// Test: creating a content record returns 201
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_content_returns_created() {
    let app = common::build_test_app(ScriptedGateway::accepting());

    let response = post_json(
        app.router,
        "/api/v1/content",
        json!({
            "owner_id": 3,
            "kind": "profile_image",
            "url": "https://cdn.test/avatar.png",
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["kind"], "profile_image");
    assert_eq!(json["data"]["url"], "https://cdn.test/avatar.png");
    assert_eq!(app.ledger.len(), 1);
}

#[tokio::test]
async fn create_content_without_url_is_rejected() {
    let app = common::build_test_app(ScriptedGateway::accepting());

    let response = post_json(
        app.router,
        "/api/v1/content",
        json!({"owner_id": 3, "kind": "daily_post", "url": "  "}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.ledger.is_empty());
}

// ---------------------------------------------------------------------------
// Test: listing filters by kind and style, newest first
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_filters_by_kind_and_style() {
    let app = common::build_test_app(ScriptedGateway::accepting());
    app.ledger.push(3, ContentKind::StyledImage, Some("noir"));
    let newest = app.ledger.push(3, ContentKind::StyledImage, Some("Noir"));
    app.ledger.push(3, ContentKind::StyledImage, Some("pastel"));
    app.ledger.push(3, ContentKind::TrainingImage, None);
    app.ledger.push(4, ContentKind::StyledImage, Some("noir"));

    let response = get(
        app.router,
        "/api/v1/owners/3/content?kind=styled_image&style=NOIR",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let items = json["data"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], newest.id);
}

#[tokio::test]
async fn list_without_filters_returns_all_owner_items() {
    let app = common::build_test_app(ScriptedGateway::accepting());
    app.ledger.push(3, ContentKind::ProfileImage, None);
    app.ledger.push(3, ContentKind::DailyPost, None);
    app.ledger.push(5, ContentKind::DailyPost, None);

    let json = body_json(get(app.router, "/api/v1/owners/3/content").await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
}

// ---------------------------------------------------------------------------
// Test: deleting a record
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_content_then_not_found() {
    let app = common::build_test_app(ScriptedGateway::accepting());
    let item = app.ledger.push(3, ContentKind::ProfileImage, None);
    let uri = format!("/api/v1/content/{}", item.id);

    let first = delete(app.router.clone(), &uri).await;
    assert_eq!(first.status(), StatusCode::NO_CONTENT);

    let second = delete(app.router, &uri).await;
    assert_eq!(second.status(), StatusCode::NOT_FOUND);
    assert!(app.ledger.is_empty());
}
