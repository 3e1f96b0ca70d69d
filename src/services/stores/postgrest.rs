//! Hosted REST gateway store
//!
//! Talks the PostgREST dialect exposed by hosted Postgres platforms:
//! `GET /{table}?select=..&order=created_at.desc&limit=..`, with column
//! filters written as `column=in.(a,b)` and `column=eq.value`.
use reqwest::{Client as HttpClient, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::{
    error::{AppError, AppResult},
    models::{
        CatalogItem, CatalogQuery, InteractionRecord, SearchRecord, UserId, WishlistRecord,
    },
    services::stores::{CatalogStore, EventLogStore},
};

type Params = Vec<(&'static str, String)>;

#[derive(Clone)]
pub struct PostgrestStore {
    http_client: HttpClient,
    base_url: String,
    api_key: Option<String>,
}

impl PostgrestStore {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            http_client: HttpClient::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn request(&self, table: &str) -> RequestBuilder {
        let request = self
            .http_client
            .get(format!("{}/{}", self.base_url, table))
            .header("Accept", "application/json");

        match &self.api_key {
            Some(key) => request.header("apikey", key).bearer_auth(key),
            None => request,
        }
    }

    /// Runs a read against one table and decodes the row array
    async fn fetch_rows<T: DeserializeOwned>(&self, table: &str, params: Params) -> AppResult<Vec<T>> {
        let response = self.request(table).query(&params).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                table = %table,
                status = %status,
                body = %body,
                "REST store request failed"
            );
            return Err(AppError::Store(format!(
                "REST store returned status {} for {}: {}",
                status, table, body
            )));
        }

        let response_text = response.text().await?;
        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(table = %table, error = %e, "Failed to decode REST store rows");
            AppError::Store(format!("Failed to parse {} rows: {}", table, e))
        })
    }

    fn catalog_params(query: &CatalogQuery) -> Params {
        let mut params = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
            ("offset", query.range.offset().to_string()),
            ("limit", query.range.limit().to_string()),
        ];

        if !query.category_in.is_empty() {
            params.push(("category", in_filter(&query.category_in)));
        }
        if !query.color_in.is_empty() {
            params.push(("color", in_filter(&query.color_in)));
        }

        params
    }

    fn history_params(user_id: UserId, select: &str, limit: usize) -> Params {
        vec![
            ("select", select.to_string()),
            ("user_id", format!("eq.{}", user_id)),
            ("order", "created_at.desc".to_string()),
            ("limit", limit.to_string()),
        ]
    }
}

/// Renders an `in.(...)` filter, quoting every value so labels containing
/// commas, parentheses or quotes survive
fn in_filter(values: &[String]) -> String {
    let quoted: Vec<String> = values
        .iter()
        .map(|v| format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

#[async_trait::async_trait]
impl CatalogStore for PostgrestStore {
    async fn query_catalog(&self, query: &CatalogQuery) -> AppResult<Vec<CatalogItem>> {
        let items: Vec<CatalogItem> = self
            .fetch_rows("products", Self::catalog_params(query))
            .await?;

        tracing::debug!(
            offset = query.range.offset(),
            limit = query.range.limit(),
            filtered = query.is_filtered(),
            results = items.len(),
            backend = "postgrest",
            "Catalog page fetched"
        );

        Ok(items)
    }

    fn name(&self) -> &'static str {
        "postgrest"
    }
}

#[async_trait::async_trait]
impl EventLogStore for PostgrestStore {
    async fn search_history(&self, user_id: UserId, limit: usize) -> AppResult<Vec<SearchRecord>> {
        self.fetch_rows(
            "search_history",
            Self::history_params(user_id, "filters,created_at", limit),
        )
        .await
    }

    async fn interaction_history(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> AppResult<Vec<InteractionRecord>> {
        self.fetch_rows(
            "user_interactions",
            Self::history_params(user_id, "interaction_data,product_id,created_at", limit),
        )
        .await
    }

    async fn wishlist(&self, user_id: UserId) -> AppResult<Vec<WishlistRecord>> {
        self.fetch_rows(
            "wishlist",
            vec![
                ("select", "product_id".to_string()),
                ("user_id", format!("eq.{}", user_id)),
            ],
        )
        .await
    }
}
