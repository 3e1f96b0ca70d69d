use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{
        CatalogItem, CatalogQuery, InteractionRecord, ProductId, SearchRecord, SignalPayload,
        UserId, WishlistRecord,
    },
    services::stores::{CatalogStore, EventLogStore},
};

/// The reads a store serves, used to inject failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreQuery {
    Catalog,
    SearchHistory,
    InteractionHistory,
    Wishlist,
}

#[derive(Default)]
struct MemoryData {
    products: Vec<CatalogItem>,
    searches: HashMap<UserId, Vec<SearchRecord>>,
    interactions: HashMap<UserId, Vec<InteractionRecord>>,
    wishlists: HashMap<UserId, Vec<WishlistRecord>>,
    failing: HashSet<StoreQuery>,
}

/// In-process store for local development and tests
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_product(&self, product: CatalogItem) {
        self.inner.write().await.products.push(product);
    }

    pub async fn record_search(&self, user_id: UserId, filters: SignalPayload, at: DateTime<Utc>) {
        self.inner
            .write()
            .await
            .searches
            .entry(user_id)
            .or_default()
            .push(SearchRecord {
                filters,
                created_at: at,
            });
    }

    pub async fn record_interaction(
        &self,
        user_id: UserId,
        product_id: ProductId,
        interaction_data: SignalPayload,
        at: DateTime<Utc>,
    ) {
        self.inner
            .write()
            .await
            .interactions
            .entry(user_id)
            .or_default()
            .push(InteractionRecord {
                interaction_data,
                product_id,
                created_at: at,
            });
    }

    pub async fn add_to_wishlist(&self, user_id: UserId, product_id: ProductId) {
        let mut inner = self.inner.write().await;
        let wishlist = inner.wishlists.entry(user_id).or_default();
        if !wishlist.iter().any(|w| w.product_id == product_id) {
            wishlist.push(WishlistRecord { product_id });
        }
    }

    /// Makes every subsequent `query` fail until [`Self::recover`] is called
    pub async fn fail(&self, query: StoreQuery) {
        self.inner.write().await.failing.insert(query);
    }

    pub async fn recover(&self, query: StoreQuery) {
        self.inner.write().await.failing.remove(&query);
    }

    fn check(data: &MemoryData, query: StoreQuery) -> AppResult<()> {
        if data.failing.contains(&query) {
            return Err(AppError::Store(format!("{:?} unavailable", query)));
        }
        Ok(())
    }
}

/// Clones the newest `limit` records, newest first
fn newest<T: Clone>(
    records: Option<&Vec<T>>,
    limit: usize,
    created_at: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T> {
    let mut records: Vec<T> = records.cloned().unwrap_or_default();
    records.sort_by_key(|r| std::cmp::Reverse(created_at(r)));
    records.truncate(limit);
    records
}

#[async_trait::async_trait]
impl CatalogStore for MemoryStore {
    async fn query_catalog(&self, query: &CatalogQuery) -> AppResult<Vec<CatalogItem>> {
        let inner = self.inner.read().await;
        Self::check(&inner, StoreQuery::Catalog)?;

        let mut matching: Vec<&CatalogItem> =
            inner.products.iter().filter(|p| query.matches(p)).collect();
        matching.sort_by_key(|p| std::cmp::Reverse(p.created_at));

        let offset = usize::try_from(query.range.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.range.limit()).unwrap_or(usize::MAX);

        Ok(matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[async_trait::async_trait]
impl EventLogStore for MemoryStore {
    async fn search_history(&self, user_id: UserId, limit: usize) -> AppResult<Vec<SearchRecord>> {
        let inner = self.inner.read().await;
        Self::check(&inner, StoreQuery::SearchHistory)?;
        Ok(newest(inner.searches.get(&user_id), limit, |r| r.created_at))
    }

    async fn interaction_history(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> AppResult<Vec<InteractionRecord>> {
        let inner = self.inner.read().await;
        Self::check(&inner, StoreQuery::InteractionHistory)?;
        Ok(newest(inner.interactions.get(&user_id), limit, |r| r.created_at))
    }

    async fn wishlist(&self, user_id: UserId) -> AppResult<Vec<WishlistRecord>> {
        let inner = self.inner.read().await;
        Self::check(&inner, StoreQuery::Wishlist)?;
        Ok(inner.wishlists.get(&user_id).cloned().unwrap_or_default())
    }
}
