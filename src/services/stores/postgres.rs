use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{types::Json, PgPool, Postgres, QueryBuilder};

use crate::{
    error::AppResult,
    models::{
        CatalogItem, CatalogQuery, InteractionRecord, ProductId, SearchRecord, SignalPayload,
        UserId, WishlistRecord,
    },
    services::stores::{CatalogStore, EventLogStore},
};

const CATALOG_COLUMNS: &str = "id, name, category, color, price_cents, image_url, created_at";

/// Store backed by direct PostgreSQL access
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct SearchRow {
    filters: Option<Json<Value>>,
    created_at: DateTime<Utc>,
}

impl From<SearchRow> for SearchRecord {
    fn from(row: SearchRow) -> Self {
        SearchRecord {
            filters: payload(row.filters),
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct InteractionRow {
    interaction_data: Option<Json<Value>>,
    product_id: ProductId,
    created_at: DateTime<Utc>,
}

impl From<InteractionRow> for InteractionRecord {
    fn from(row: InteractionRow) -> Self {
        InteractionRecord {
            interaction_data: payload(row.interaction_data),
            product_id: row.product_id,
            created_at: row.created_at,
        }
    }
}

fn payload(raw: Option<Json<Value>>) -> SignalPayload {
    raw.map(|Json(value)| SignalPayload::from_value(value))
        .unwrap_or_default()
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Builds the filtered catalog statement
    ///
    /// Array membership uses `= ANY($n)` so the statement shape only depends
    /// on which filters are present, not on how many labels they carry.
    fn catalog_statement(query: &CatalogQuery) -> QueryBuilder<'static, Postgres> {
        let mut builder = QueryBuilder::new(format!("SELECT {} FROM products", CATALOG_COLUMNS));
        let mut separator = " WHERE ";

        if !query.category_in.is_empty() {
            builder
                .push(separator)
                .push("category = ANY(")
                .push_bind(query.category_in.clone())
                .push(")");
            separator = " AND ";
        }

        if !query.color_in.is_empty() {
            builder
                .push(separator)
                .push("color = ANY(")
                .push_bind(query.color_in.clone())
                .push(")");
        }

        builder
            .push(" ORDER BY created_at DESC OFFSET ")
            .push_bind(to_i64(query.range.offset()))
            .push(" LIMIT ")
            .push_bind(to_i64(query.range.limit()));

        builder
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_limit(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait::async_trait]
impl CatalogStore for PgStore {
    async fn query_catalog(&self, query: &CatalogQuery) -> AppResult<Vec<CatalogItem>> {
        let items = Self::catalog_statement(query)
            .build_query_as::<CatalogItem>()
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(
            offset = query.range.offset(),
            limit = query.range.limit(),
            filtered = query.is_filtered(),
            results = items.len(),
            backend = "postgres",
            "Catalog page fetched"
        );

        Ok(items)
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}

#[async_trait::async_trait]
impl EventLogStore for PgStore {
    async fn search_history(&self, user_id: UserId, limit: usize) -> AppResult<Vec<SearchRecord>> {
        let rows = sqlx::query_as::<_, SearchRow>(
            r#"
            SELECT filters, created_at
            FROM search_history
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(to_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SearchRecord::from).collect())
    }

    async fn interaction_history(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> AppResult<Vec<InteractionRecord>> {
        let rows = sqlx::query_as::<_, InteractionRow>(
            r#"
            SELECT interaction_data, product_id, created_at
            FROM user_interactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(to_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(InteractionRecord::from).collect())
    }

    async fn wishlist(&self, user_id: UserId) -> AppResult<Vec<WishlistRecord>> {
        let product_ids: Vec<ProductId> =
            sqlx::query_scalar("SELECT product_id FROM wishlist WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(product_ids
            .into_iter()
            .map(|product_id| WishlistRecord { product_id })
            .collect())
    }
}
