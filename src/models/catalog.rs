use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ProductId, UserPreferenceProfile};
use crate::pagination::PageRange;

/// A product as stored in the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct CatalogItem {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub price_cents: Option<i64>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Filtered, recency-ordered catalog read
///
/// Empty `category_in` / `color_in` mean "no constraint on that column".
/// Results are always ordered by `created_at` descending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub category_in: Vec<String>,
    pub color_in: Vec<String>,
    pub range: PageRange,
}

impl CatalogQuery {
    /// Most recent products, no filters
    pub fn unfiltered(range: PageRange) -> Self {
        Self {
            category_in: Vec::new(),
            color_in: Vec::new(),
            range,
        }
    }

    /// Products matching the profile's preferred categories and colors
    pub fn for_profile(profile: &UserPreferenceProfile, range: PageRange) -> Self {
        Self {
            category_in: profile.preferred_categories.clone(),
            color_in: profile.preferred_colors.clone(),
            range,
        }
    }

    /// Same filters over a different page
    pub fn with_range(&self, range: PageRange) -> Self {
        Self {
            range,
            ..self.clone()
        }
    }

    pub fn is_filtered(&self) -> bool {
        !self.category_in.is_empty() || !self.color_in.is_empty()
    }

    /// Whether an item passes the category and color filters
    ///
    /// Items with no value for a constrained column never match it.
    pub fn matches(&self, item: &CatalogItem) -> bool {
        in_set(&self.category_in, item.category.as_deref())
            && in_set(&self.color_in, item.color.as_deref())
    }
}

fn in_set(set: &[String], value: Option<&str>) -> bool {
    set.is_empty() || value.is_some_and(|v| set.iter().any(|s| s == v))
}
