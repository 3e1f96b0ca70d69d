use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::ProductId;

/// Inferred taste of a shopper, recomputed on every request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferenceProfile {
    /// At most two category labels, strongest signal first
    pub preferred_categories: Vec<String>,
    /// At most two color labels, strongest signal first
    pub preferred_colors: Vec<String>,
    /// Products currently on the wishlist
    pub favorite_product_ids: BTreeSet<ProductId>,
}

impl UserPreferenceProfile {
    /// The profile used for anonymous visitors and failed lookups
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.preferred_categories.is_empty()
            && self.preferred_colors.is_empty()
            && self.favorite_product_ids.is_empty()
    }

    pub fn is_favorite(&self, product_id: &ProductId) -> bool {
        self.favorite_product_ids.contains(product_id)
    }
}
