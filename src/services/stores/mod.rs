//! Read-only store abstraction over the catalog and the shopper event log
//!
//! The recommendation core never writes. Each backend answers the same four
//! reads; all of them order by recency descending.
use std::sync::Arc;

use crate::{
    config::{Config, StoreBackend},
    db,
    error::AppResult,
    models::{CatalogItem, CatalogQuery, InteractionRecord, SearchRecord, UserId, WishlistRecord},
};

pub mod memory;
pub mod postgres;
pub mod postgrest;

pub use memory::{MemoryStore, StoreQuery};
pub use postgres::PgStore;
pub use postgrest::PostgrestStore;

/// Product catalog reads
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    /// Products matching the query filters, newest first, limited to its range
    async fn query_catalog(&self, query: &CatalogQuery) -> AppResult<Vec<CatalogItem>>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Shopper history reads
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait EventLogStore: Send + Sync {
    /// Most recent searches, newest first
    async fn search_history(&self, user_id: UserId, limit: usize) -> AppResult<Vec<SearchRecord>>;

    /// Most recent product interactions, newest first
    async fn interaction_history(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> AppResult<Vec<InteractionRecord>>;

    /// Every wishlist entry for the shopper
    async fn wishlist(&self, user_id: UserId) -> AppResult<Vec<WishlistRecord>>;
}

/// Catalog and event-log handles backed by the same store
#[derive(Clone)]
pub struct Stores {
    pub catalog: Arc<dyn CatalogStore>,
    pub events: Arc<dyn EventLogStore>,
}

impl Stores {
    pub fn from_backend<S>(store: Arc<S>) -> Self
    where
        S: CatalogStore + EventLogStore + 'static,
    {
        Self {
            catalog: store.clone(),
            events: store,
        }
    }
}

/// Builds the store selected by configuration
pub async fn connect(config: &Config) -> anyhow::Result<Stores> {
    let stores = match config.store_backend {
        StoreBackend::Postgres => {
            let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
            if config.run_migrations {
                db::run_migrations(&pool).await?;
            }
            Stores::from_backend(Arc::new(PgStore::new(pool)))
        }
        StoreBackend::Postgrest => Stores::from_backend(Arc::new(PostgrestStore::new(
            config.postgrest_url.clone(),
            config.postgrest_api_key.clone(),
        ))),
        StoreBackend::Memory => {
            tracing::warn!("In-memory store selected; catalog and event log start empty");
            Stores::from_backend(Arc::new(MemoryStore::new()))
        }
    };

    tracing::info!(backend = stores.catalog.name(), "Store backend ready");

    Ok(stores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::get_range;

    #[tokio::test]
    async fn test_memory_backend_starts_empty() {
        let config =
            Config::from_vars(vec![("STORE_BACKEND".to_string(), "memory".to_string())]).unwrap();
        let stores = connect(&config).await.unwrap();

        assert_eq!(stores.catalog.name(), "memory");
        let page = stores
            .catalog
            .query_catalog(&CatalogQuery::unfiltered(get_range(1, 4)))
            .await
            .unwrap();
        assert!(page.is_empty());
        assert!(stores.events.wishlist(uuid::Uuid::new_v4()).await.unwrap().is_empty());
    }
}
