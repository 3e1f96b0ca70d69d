use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use crate::{
    models::{CatalogItem, CatalogQuery, FeedPhase, FeedSnapshot, ProductId, UserId},
    pagination::get_range,
    services::{preferences::PreferenceAggregator, stores::CatalogStore},
};

/// Mutable feed state, guarded by the feed's mutex
///
/// The mutex is only held to read or apply state, never across a store call.
/// `generation` increases on every reset; a fetch that comes back under an
/// older generation was issued for a previous identifier and is dropped.
struct FeedState {
    user_id: Option<UserId>,
    generation: u64,
    phase: FeedPhase,
    items: Vec<CatalogItem>,
    page_index: u32,
    has_more: bool,
    total_count: usize,
    /// Filters fixed by the last successful initial fetch
    base_query: Option<CatalogQuery>,
    last_active: Instant,
}

impl FeedState {
    fn new(user_id: Option<UserId>, generation: u64) -> Self {
        Self {
            user_id,
            generation,
            phase: FeedPhase::Idle,
            items: Vec::new(),
            page_index: 0,
            has_more: false,
            total_count: 0,
            base_query: None,
            last_active: Instant::now(),
        }
    }
}

/// Paginated, preference-biased product feed for one viewing session
pub struct RecommendationFeed {
    id: Uuid,
    aggregator: Arc<PreferenceAggregator>,
    catalog: Arc<dyn CatalogStore>,
    page_size: u32,
    state: Mutex<FeedState>,
}

impl RecommendationFeed {
    pub fn new(
        aggregator: Arc<PreferenceAggregator>,
        catalog: Arc<dyn CatalogStore>,
        page_size: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            aggregator,
            catalog,
            page_size: page_size.max(1),
            state: Mutex::new(FeedState::new(None, 0)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Discards everything and loads page 1 for `user_id`
    ///
    /// Anonymous visitors get the most recent products, unfiltered and
    /// unreordered. Failures leave an empty feed with `has_more == false`.
    ///
    /// The fetch runs on its own task, so dropping the returned future
    /// (a disconnected client) still lets the feed settle into `Ready`.
    pub async fn reset(self: &Arc<Self>, user_id: Option<UserId>) {
        let feed = Arc::clone(self);
        if let Err(e) = tokio::spawn(async move { feed.run_reset(user_id).await }).await {
            tracing::error!(feed_id = %self.id, error = %e, "Feed reset task failed");
        }
    }

    async fn run_reset(&self, user_id: Option<UserId>) {
        let generation = {
            let mut state = self.state.lock().await;
            let generation = state.generation + 1;
            *state = FeedState::new(user_id, generation);
            state.phase = FeedPhase::LoadingInitial;
            generation
        };

        let range = get_range(1, self.page_size);
        let (query, favorites) = match user_id {
            Some(_) => {
                let profile = self.aggregator.compute_profile(user_id).await;
                (
                    CatalogQuery::for_profile(&profile, range),
                    profile.favorite_product_ids,
                )
            }
            None => (CatalogQuery::unfiltered(range), BTreeSet::new()),
        };

        let result = self.catalog.query_catalog(&query).await;

        let mut state = self.state.lock().await;
        if state.generation != generation {
            tracing::debug!(
                feed_id = %self.id,
                generation,
                current = state.generation,
                "Discarding stale initial page"
            );
            return;
        }

        match result {
            Ok(page) => {
                let len = page.len();
                state.items = favorites_first(page, &favorites);
                state.page_index = 1;
                state.has_more = len == self.page_size as usize;
                state.total_count = len;
                state.base_query = Some(query);

                tracing::info!(
                    feed_id = %self.id,
                    user_id = ?user_id,
                    items = len,
                    has_more = state.has_more,
                    personalized = state.base_query.as_ref().is_some_and(CatalogQuery::is_filtered),
                    "Recommendation feed loaded"
                );
            }
            Err(e) => {
                tracing::error!(
                    feed_id = %self.id,
                    user_id = ?user_id,
                    error = %e,
                    "Failed to load recommendations"
                );
                state.items.clear();
                state.has_more = false;
                state.total_count = 0;
                state.base_query = None;
            }
        }

        state.phase = FeedPhase::Ready;
        state.last_active = Instant::now();
    }

    /// Appends the next page using the filters fixed at the last reset
    ///
    /// Returns `false` without touching the store when a fetch is already in
    /// flight, the feed is exhausted, or no initial page has succeeded.
    /// Appended pages are not favorite-reordered. Like `reset`, the fetch
    /// survives cancellation of the caller.
    pub async fn load_more(self: &Arc<Self>) -> bool {
        let feed = Arc::clone(self);
        match tokio::spawn(async move { feed.run_load_more().await }).await {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::error!(feed_id = %self.id, error = %e, "Feed load-more task failed");
                false
            }
        }
    }

    async fn run_load_more(&self) -> bool {
        let (generation, query, next_page) = {
            let mut state = self.state.lock().await;
            state.last_active = Instant::now();

            if state.phase.is_loading() || !state.has_more {
                return false;
            }
            let Some(base_query) = state.base_query.as_ref() else {
                return false;
            };

            let next_page = state.page_index + 1;
            let query = base_query.with_range(get_range(next_page, self.page_size));
            state.phase = FeedPhase::LoadingMore;
            (state.generation, query, next_page)
        };

        let result = self.catalog.query_catalog(&query).await;

        let mut state = self.state.lock().await;
        if state.generation != generation {
            tracing::debug!(
                feed_id = %self.id,
                generation,
                current = state.generation,
                "Discarding stale page"
            );
            return false;
        }

        match result {
            Ok(page) => {
                let len = page.len();
                state.items.extend(page);
                state.page_index = next_page;
                state.has_more = len == self.page_size as usize;
                state.total_count = len;

                tracing::debug!(
                    feed_id = %self.id,
                    page = next_page,
                    items = len,
                    has_more = state.has_more,
                    "Recommendation page appended"
                );
            }
            Err(e) => {
                tracing::error!(
                    feed_id = %self.id,
                    page = next_page,
                    error = %e,
                    "Failed to load more recommendations"
                );
                state.has_more = false;
            }
        }

        state.phase = FeedPhase::Ready;
        state.last_active = Instant::now();
        true
    }

    pub async fn snapshot(&self) -> FeedSnapshot {
        let state = self.state.lock().await;
        FeedSnapshot {
            feed_id: self.id,
            user_id: state.user_id,
            phase: state.phase,
            is_loading: state.phase.is_loading(),
            items: state.items.clone(),
            page_index: state.page_index,
            has_more: state.has_more,
            total_count: state.total_count,
        }
    }

    pub async fn user_id(&self) -> Option<UserId> {
        self.state.lock().await.user_id
    }

    pub async fn is_loading(&self) -> bool {
        self.state.lock().await.phase.is_loading()
    }

    /// Time since the feed was last reset or paged
    pub async fn idle_for(&self) -> std::time::Duration {
        self.state.lock().await.last_active.elapsed()
    }
}

/// Moves favorites ahead of everything else, keeping relative order in both groups
pub fn favorites_first(page: Vec<CatalogItem>, favorites: &BTreeSet<ProductId>) -> Vec<CatalogItem> {
    if favorites.is_empty() {
        return page;
    }

    let (mut ordered, rest): (Vec<_>, Vec<_>) =
        page.into_iter().partition(|item| favorites.contains(&item.id));
    ordered.extend(rest);
    ordered
}
