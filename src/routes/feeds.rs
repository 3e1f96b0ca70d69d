use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{FeedSnapshot, UserId},
    routes::AppState,
    services::RecommendationFeed,
};

/// Body naming the shopper driving a feed; absent or null means anonymous
#[derive(Debug, Default, Deserialize)]
pub struct FeedUserRequest {
    #[serde(default)]
    pub user_id: Option<UserId>,
}

async fn find_feed(state: &AppState, feed_id: Uuid) -> AppResult<Arc<RecommendationFeed>> {
    state
        .feeds
        .get(feed_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Feed {} not found", feed_id)))
}

/// Opens a feed session and returns its first page
pub async fn open_feed(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<FeedUserRequest>,
) -> (StatusCode, Json<FeedSnapshot>) {
    tracing::info!(
        request_id = %request_id,
        user_id = ?request.user_id,
        "Opening recommendation feed"
    );

    let feed = state.feeds.open(request.user_id).await;

    (StatusCode::CREATED, Json(feed.snapshot().await))
}

pub async fn get_feed(
    State(state): State<Arc<AppState>>,
    Path(feed_id): Path<Uuid>,
) -> AppResult<Json<FeedSnapshot>> {
    let feed = find_feed(&state, feed_id).await?;
    Ok(Json(feed.snapshot().await))
}

/// Appends the next page; a finished or busy feed is returned unchanged
pub async fn load_more(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(feed_id): Path<Uuid>,
) -> AppResult<Json<FeedSnapshot>> {
    let feed = find_feed(&state, feed_id).await?;
    let fetched = feed.load_more().await;

    tracing::info!(
        request_id = %request_id,
        feed_id = %feed_id,
        fetched,
        "Load more requested"
    );

    Ok(Json(feed.snapshot().await))
}

/// Switches the shopper driving a feed, restarting it from page 1
pub async fn change_user(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(feed_id): Path<Uuid>,
    Json(request): Json<FeedUserRequest>,
) -> AppResult<Json<FeedSnapshot>> {
    let feed = find_feed(&state, feed_id).await?;

    if feed.user_id().await != request.user_id {
        tracing::info!(
            request_id = %request_id,
            feed_id = %feed_id,
            user_id = ?request.user_id,
            "Feed identifier changed, resetting"
        );
        feed.reset(request.user_id).await;
    }

    Ok(Json(feed.snapshot().await))
}

pub async fn close_feed(
    State(state): State<Arc<AppState>>,
    Path(feed_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if state.feeds.close(feed_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Feed {} not found", feed_id)))
    }
}
