use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::{
    models::UserId,
    services::{feed::RecommendationFeed, preferences::PreferenceAggregator, stores::CatalogStore},
};

/// Open recommendation feeds, one per viewing session
#[derive(Clone)]
pub struct FeedRegistry {
    feeds: Arc<RwLock<HashMap<Uuid, Arc<RecommendationFeed>>>>,
    aggregator: Arc<PreferenceAggregator>,
    catalog: Arc<dyn CatalogStore>,
    page_size: u32,
}

/// Handle for stopping the idle-session reaper
pub struct ReaperHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl ReaperHandle {
    /// Stops the reaper task after its current sweep
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Feed reaper shutdown signal sent");
    }
}

impl FeedRegistry {
    pub fn new(
        aggregator: Arc<PreferenceAggregator>,
        catalog: Arc<dyn CatalogStore>,
        page_size: u32,
    ) -> Self {
        Self {
            feeds: Arc::new(RwLock::new(HashMap::new())),
            aggregator,
            catalog,
            page_size,
        }
    }

    /// Opens a feed for `user_id` and loads its first page
    pub async fn open(&self, user_id: Option<UserId>) -> Arc<RecommendationFeed> {
        let feed = Arc::new(RecommendationFeed::new(
            self.aggregator.clone(),
            self.catalog.clone(),
            self.page_size,
        ));

        self.feeds.write().await.insert(feed.id(), feed.clone());
        tracing::debug!(feed_id = %feed.id(), user_id = ?user_id, "Feed session opened");

        feed.reset(user_id).await;
        feed
    }

    pub async fn get(&self, feed_id: Uuid) -> Option<Arc<RecommendationFeed>> {
        self.feeds.read().await.get(&feed_id).cloned()
    }

    /// Drops a feed; returns whether it existed
    pub async fn close(&self, feed_id: Uuid) -> bool {
        let removed = self.feeds.write().await.remove(&feed_id).is_some();
        if removed {
            tracing::debug!(feed_id = %feed_id, "Feed session closed");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.feeds.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.feeds.read().await.is_empty()
    }

    /// Drops every feed idle for longer than `max_idle`, returning how many went
    ///
    /// Idleness counts from the start of the last fetch, so a fetch stuck past
    /// `max_idle` does not pin its feed.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let expired = self.idle_candidates(max_idle).await;
        if expired.is_empty() {
            return 0;
        }
        self.remove_idle(&expired, max_idle).await
    }

    async fn idle_candidates(&self, max_idle: Duration) -> Vec<Uuid> {
        let feeds: Vec<Arc<RecommendationFeed>> =
            self.feeds.read().await.values().cloned().collect();

        let mut expired = Vec::new();
        for feed in feeds {
            if feed.idle_for().await > max_idle {
                expired.push(feed.id());
            }
        }
        expired
    }

    /// Removes the given feeds that are still idle under the write lock
    async fn remove_idle(&self, candidates: &[Uuid], max_idle: Duration) -> usize {
        let mut map = self.feeds.write().await;

        let mut evicted = 0;
        for feed_id in candidates {
            let still_idle = match map.get(feed_id) {
                Some(feed) => feed.idle_for().await > max_idle,
                None => false,
            };
            if still_idle {
                map.remove(feed_id);
                evicted += 1;
            }
        }

        if evicted > 0 {
            tracing::info!(evicted, remaining = map.len(), "Evicted idle feeds");
        }
        evicted
    }

    /// Spawns a background task evicting idle feeds every `sweep_every`
    pub fn spawn_reaper(&self, max_idle: Duration, sweep_every: Duration) -> ReaperHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let registry = self.clone();

        tokio::spawn(async move {
            registry.reaper_task(max_idle, sweep_every, shutdown_rx).await;
        });

        ReaperHandle { shutdown_tx }
    }

    async fn reaper_task(
        &self,
        max_idle: Duration,
        sweep_every: Duration,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!(
            max_idle_secs = max_idle.as_secs(),
            sweep_every_secs = sweep_every.as_secs(),
            "Feed reaper started"
        );
        let mut ticker = tokio::time::interval(sweep_every.max(Duration::from_millis(10)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.evict_idle(max_idle).await;
                }
                _ = shutdown_rx.recv() => {
                    let open_feeds = self.len().await;
                    tracing::info!(open_feeds, "Feed reaper stopped");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::AppResult,
        models::{CatalogItem, CatalogQuery},
        services::stores::MemoryStore,
    };

    /// Catalog that never answers
    struct HangingCatalog;

    #[async_trait::async_trait]
    impl CatalogStore for HangingCatalog {
        async fn query_catalog(&self, _query: &CatalogQuery) -> AppResult<Vec<CatalogItem>> {
            std::future::pending().await
        }

        fn name(&self) -> &'static str {
            "hanging"
        }
    }

    fn registry() -> FeedRegistry {
        let store = Arc::new(MemoryStore::new());
        let aggregator = Arc::new(PreferenceAggregator::new(store.clone(), 30));
        FeedRegistry::new(aggregator, store, 4)
    }

    #[tokio::test]
    async fn test_open_get_close() {
        let registry = registry();
        assert!(registry.is_empty().await);

        let feed = registry.open(None).await;
        assert_eq!(registry.len().await, 1);
        assert!(registry.get(feed.id()).await.is_some());

        assert!(registry.close(feed.id()).await);
        assert!(!registry.close(feed.id()).await);
        assert!(registry.get(feed.id()).await.is_none());
    }

    #[tokio::test]
    async fn test_open_runs_initial_fetch() {
        let registry = registry();
        let user_id = Uuid::new_v4();
        let feed = registry.open(Some(user_id)).await;

        let snapshot = feed.snapshot().await;
        assert_eq!(snapshot.user_id, Some(user_id));
        assert!(!snapshot.is_loading);
    }

    #[tokio::test]
    async fn test_evict_idle() {
        let registry = registry();
        registry.open(None).await;
        registry.open(None).await;

        assert_eq!(registry.evict_idle(Duration::from_secs(3600)).await, 0);
        assert_eq!(registry.len().await, 2);

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(registry.evict_idle(Duration::ZERO).await, 2);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_feed_paged_after_scan_is_kept() {
        let registry = registry();
        let feed = registry.open(None).await;
        let max_idle = Duration::from_millis(30);

        tokio::time::sleep(Duration::from_millis(50)).await;
        let candidates = registry.idle_candidates(max_idle).await;
        assert_eq!(candidates, vec![feed.id()]);

        feed.load_more().await;
        assert_eq!(registry.remove_idle(&candidates, max_idle).await, 0);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_abandoned_open_does_not_pin_feed() {
        let store = Arc::new(MemoryStore::new());
        let aggregator = Arc::new(PreferenceAggregator::new(store, 30));
        let registry = FeedRegistry::new(aggregator, Arc::new(HangingCatalog), 4);

        let abandoned =
            tokio::time::timeout(Duration::from_millis(20), registry.open(None)).await;
        assert!(abandoned.is_err());
        assert_eq!(registry.len().await, 1);

        assert_eq!(registry.evict_idle(Duration::ZERO).await, 1);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_reaper_evicts_and_shuts_down() {
        let registry = registry();
        registry.open(None).await;

        let handle = registry.spawn_reaper(Duration::ZERO, Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(registry.is_empty().await);

        handle.shutdown().await;
    }
}
