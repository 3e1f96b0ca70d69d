use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CatalogItem, UserId};

/// Where a recommendation feed is in its fetch cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedPhase {
    /// Created, nothing requested yet
    Idle,
    /// First page in flight after a reset
    LoadingInitial,
    /// A follow-up page in flight
    LoadingMore,
    /// Settled, either with items or degraded to an empty terminal state
    Ready,
}

impl FeedPhase {
    pub fn is_loading(self) -> bool {
        matches!(self, FeedPhase::LoadingInitial | FeedPhase::LoadingMore)
    }
}

/// Point-in-time view of a feed handed to the display layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSnapshot {
    pub feed_id: Uuid,
    pub user_id: Option<UserId>,
    pub phase: FeedPhase,
    pub is_loading: bool,
    pub items: Vec<CatalogItem>,
    /// 1-based index of the last page fetched successfully
    pub page_index: u32,
    pub has_more: bool,
    /// Length of the most recently fetched page, not of `items`
    pub total_count: usize,
}
