use axum::{
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    middleware::{make_span_with_request_id, request_id_middleware},
    services::{stores::Stores, FeedRegistry, PreferenceAggregator},
};

pub mod feeds;
pub mod profile;

/// Shared handles for request handlers
pub struct AppState {
    pub aggregator: Arc<PreferenceAggregator>,
    pub feeds: FeedRegistry,
}

impl AppState {
    pub fn new(stores: Stores, page_size: u32, history_limit: usize) -> Self {
        let aggregator = Arc::new(PreferenceAggregator::new(stores.events, history_limit));
        let feeds = FeedRegistry::new(aggregator.clone(), stores.catalog, page_size);

        Self { aggregator, feeds }
    }
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/:user_id/profile", get(profile::get_profile))
        .route("/feeds", post(feeds::open_feed))
        .route("/feeds/:feed_id", get(feeds::get_feed).delete(feeds::close_feed))
        .route("/feeds/:feed_id/more", post(feeds::load_more))
        .route("/feeds/:feed_id/user", put(feeds::change_user))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
