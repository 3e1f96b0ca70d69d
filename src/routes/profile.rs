use axum::{
    extract::{Path, State},
    Extension, Json,
};
use std::sync::Arc;

use crate::{
    middleware::RequestId,
    models::{UserId, UserPreferenceProfile},
    routes::AppState,
};

/// Handler for the preference profile endpoint
///
/// Never fails: store errors come back as the empty profile.
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(user_id): Path<UserId>,
) -> Json<UserPreferenceProfile> {
    tracing::info!(request_id = %request_id, user_id = %user_id, "Computing preference profile");

    Json(state.aggregator.compute_profile(Some(user_id)).await)
}
