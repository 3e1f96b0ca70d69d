use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use lookbook_api::{
    models::{CatalogItem, FeedSnapshot, SignalPayload, UserPreferenceProfile},
    routes::{create_router, AppState},
    services::stores::{MemoryStore, StoreQuery, Stores},
};

fn product(name: &str, category: &str, color: &str, age_minutes: i64) -> CatalogItem {
    CatalogItem {
        id: Uuid::new_v4(),
        name: name.to_string(),
        category: Some(category.to_string()),
        color: Some(color.to_string()),
        price_cents: Some(5900),
        image_url: None,
        created_at: Utc::now() - Duration::minutes(age_minutes),
    }
}

/// Six dresses (three red) and six sneakers, dresses newest
async fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for i in 0..6 {
        let color = if i % 2 == 0 { "red" } else { "blue" };
        store
            .add_product(product(&format!("dress-{}", i), "dresses", color, i))
            .await;
    }
    for i in 0..6 {
        store
            .add_product(product(&format!("sneaker-{}", i), "sneakers", "white", 100 + i))
            .await;
    }
    store
}

fn create_test_server(store: Arc<MemoryStore>) -> TestServer {
    let state = AppState::new(Stores::from_backend(store), 4, 30);
    let app = create_router(Arc::new(state));
    TestServer::new(app).unwrap()
}

fn names(snapshot: &FeedSnapshot) -> Vec<&str> {
    snapshot.items.iter().map(|p| p.name.as_str()).collect()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server(Arc::new(MemoryStore::new()));
    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server(Arc::new(MemoryStore::new()));
    let request_id = Uuid::new_v4().to_string();

    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_str(&request_id).unwrap(),
        )
        .await;

    let echoed = response.header("x-request-id");
    assert_eq!(echoed.to_str().unwrap(), request_id);
}

#[tokio::test]
async fn test_profile_for_active_shopper() {
    let store = seeded_store().await;
    let user_id = Uuid::new_v4();
    let favorite = Uuid::new_v4();

    store
        .record_search(user_id, SignalPayload::new(Some("dresses"), Some("red")), Utc::now())
        .await;
    store
        .record_interaction(
            user_id,
            Uuid::new_v4(),
            SignalPayload::new(Some("sneakers"), None),
            Utc::now(),
        )
        .await;
    store.add_to_wishlist(user_id, favorite).await;

    let server = create_test_server(store);
    let response = server.get(&format!("/api/v1/users/{}/profile", user_id)).await;
    response.assert_status_ok();

    let profile: UserPreferenceProfile = response.json();
    assert_eq!(
        profile.preferred_categories,
        vec!["sneakers".to_string(), "dresses".to_string()]
    );
    assert_eq!(profile.preferred_colors, vec!["red".to_string()]);
    assert!(profile.is_favorite(&favorite));
}

#[tokio::test]
async fn test_profile_fails_closed() {
    let store = seeded_store().await;
    let user_id = Uuid::new_v4();
    store
        .record_search(user_id, SignalPayload::new(Some("dresses"), None), Utc::now())
        .await;
    store.fail(StoreQuery::Wishlist).await;

    let server = create_test_server(store);
    let response = server.get(&format!("/api/v1/users/{}/profile", user_id)).await;
    response.assert_status_ok();

    let profile: UserPreferenceProfile = response.json();
    assert!(profile.is_empty());
}

#[tokio::test]
async fn test_profile_rejects_malformed_user_id() {
    let server = create_test_server(Arc::new(MemoryStore::new()));
    let response = server.get("/api/v1/users/not-a-uuid/profile").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_anonymous_feed_pages_through_catalog() {
    let server = create_test_server(seeded_store().await);

    let response = server.post("/api/v1/feeds").json(&json!({})).await;
    response.assert_status(StatusCode::CREATED);
    let first: FeedSnapshot = response.json();

    assert_eq!(first.user_id, None);
    assert_eq!(names(&first), vec!["dress-0", "dress-1", "dress-2", "dress-3"]);
    assert_eq!(first.page_index, 1);
    assert!(first.has_more);

    let second: FeedSnapshot = server
        .post(&format!("/api/v1/feeds/{}/more", first.feed_id))
        .await
        .json();
    assert_eq!(second.items.len(), 8);
    assert_eq!(second.page_index, 2);
    assert_eq!(second.total_count, 4);

    let third: FeedSnapshot = server
        .post(&format!("/api/v1/feeds/{}/more", first.feed_id))
        .await
        .json();
    assert_eq!(third.items.len(), 12);
    assert!(third.has_more);

    let fourth: FeedSnapshot = server
        .post(&format!("/api/v1/feeds/{}/more", first.feed_id))
        .await
        .json();
    assert_eq!(fourth.items.len(), 12);
    assert_eq!(fourth.page_index, 4);
    assert_eq!(fourth.total_count, 0);
    assert!(!fourth.has_more);

    let unchanged: FeedSnapshot = server
        .post(&format!("/api/v1/feeds/{}/more", first.feed_id))
        .await
        .json();
    assert_eq!(unchanged.items, fourth.items);
    assert_eq!(unchanged.page_index, 4);
}

#[tokio::test]
async fn test_personalized_feed_promotes_favorite() {
    let store = seeded_store().await;
    let user_id = Uuid::new_v4();

    store
        .record_search(user_id, SignalPayload::new(Some("dresses"), Some("red")), Utc::now())
        .await;

    let server = create_test_server(store.clone());

    // dress-4 is the third red dress, so it lands last on page one
    let baseline: FeedSnapshot = server
        .post("/api/v1/feeds")
        .json(&json!({ "user_id": user_id }))
        .await
        .json();
    assert_eq!(names(&baseline), vec!["dress-0", "dress-2", "dress-4"]);
    assert!(!baseline.has_more);

    let favorite = baseline.items[2].id;
    store.add_to_wishlist(user_id, favorite).await;

    let snapshot: FeedSnapshot = server
        .post("/api/v1/feeds")
        .json(&json!({ "user_id": user_id }))
        .await
        .json();
    assert_eq!(names(&snapshot), vec!["dress-4", "dress-0", "dress-2"]);
    assert_eq!(snapshot.total_count, 3);
}

#[tokio::test]
async fn test_changing_user_restarts_feed() {
    let store = seeded_store().await;
    let shopper = Uuid::new_v4();
    store
        .record_interaction(
            shopper,
            Uuid::new_v4(),
            SignalPayload::new(Some("sneakers"), None),
            Utc::now(),
        )
        .await;

    let server = create_test_server(store);

    let anonymous: FeedSnapshot = server.post("/api/v1/feeds").json(&json!({})).await.json();
    server
        .post(&format!("/api/v1/feeds/{}/more", anonymous.feed_id))
        .await
        .assert_status_ok();

    let response = server
        .put(&format!("/api/v1/feeds/{}/user", anonymous.feed_id))
        .json(&json!({ "user_id": shopper }))
        .await;
    response.assert_status_ok();

    let switched: FeedSnapshot = response.json();
    assert_eq!(switched.feed_id, anonymous.feed_id);
    assert_eq!(switched.user_id, Some(shopper));
    assert_eq!(switched.page_index, 1);
    assert_eq!(switched.items.len(), 4);
    assert!(switched
        .items
        .iter()
        .all(|p| p.category.as_deref() == Some("sneakers")));
}

#[tokio::test]
async fn test_same_user_does_not_restart_feed() {
    let server = create_test_server(seeded_store().await);

    let feed: FeedSnapshot = server.post("/api/v1/feeds").json(&json!({})).await.json();
    server
        .post(&format!("/api/v1/feeds/{}/more", feed.feed_id))
        .await
        .assert_status_ok();

    let same: FeedSnapshot = server
        .put(&format!("/api/v1/feeds/{}/user", feed.feed_id))
        .json(&json!({ "user_id": null }))
        .await
        .json();
    assert_eq!(same.page_index, 2);
    assert_eq!(same.items.len(), 8);
}

#[tokio::test]
async fn test_catalog_outage_yields_empty_terminal_feed() {
    let store = seeded_store().await;
    store.fail(StoreQuery::Catalog).await;
    let server = create_test_server(store);

    let response = server.post("/api/v1/feeds").json(&json!({})).await;
    response.assert_status(StatusCode::CREATED);

    let snapshot: FeedSnapshot = response.json();
    assert!(snapshot.items.is_empty());
    assert!(!snapshot.has_more);
    assert!(!snapshot.is_loading);
}

#[tokio::test]
async fn test_get_and_close_feed() {
    let server = create_test_server(seeded_store().await);

    let feed: FeedSnapshot = server.post("/api/v1/feeds").json(&json!({})).await.json();
    let path = format!("/api/v1/feeds/{}", feed.feed_id);

    let fetched: FeedSnapshot = server.get(&path).await.json();
    assert_eq!(fetched, feed);

    server.delete(&path).await.assert_status(StatusCode::NO_CONTENT);
    server.get(&path).await.assert_status(StatusCode::NOT_FOUND);
    server.delete(&path).await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_feed_is_not_found() {
    let server = create_test_server(Arc::new(MemoryStore::new()));
    let response = server
        .post(&format!("/api/v1/feeds/{}/more", Uuid::new_v4()))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("not found"));
}
