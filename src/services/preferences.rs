use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{InteractionRecord, SearchRecord, UserId, UserPreferenceProfile, WishlistRecord},
    services::{
        signals::{ScoredSignal, INTERACTION_WEIGHT, SEARCH_WEIGHT},
        stores::EventLogStore,
    },
};

/// Number of labels kept per preference dimension
pub const TOP_LABELS: usize = 2;

/// Derives a shopper's taste profile from their event log
///
/// Nothing is cached: every call re-reads the event log.
pub struct PreferenceAggregator {
    events: Arc<dyn EventLogStore>,
    history_limit: usize,
}

impl PreferenceAggregator {
    pub fn new(events: Arc<dyn EventLogStore>, history_limit: usize) -> Self {
        Self {
            events,
            history_limit,
        }
    }

    /// Computes the profile for a shopper, or the empty profile for anonymous visitors
    ///
    /// If any of the three reads fails the whole profile is empty: a partial
    /// profile would bias the feed toward whichever signal happened to load.
    pub async fn compute_profile(&self, user_id: Option<UserId>) -> UserPreferenceProfile {
        let Some(user_id) = user_id else {
            return UserPreferenceProfile::empty();
        };

        match self.read_signals(user_id).await {
            Ok((searches, interactions, wishlist)) => {
                let profile = build_profile(&searches, &interactions, &wishlist);

                tracing::debug!(
                    user_id = %user_id,
                    searches = searches.len(),
                    interactions = interactions.len(),
                    favorites = profile.favorite_product_ids.len(),
                    categories = ?profile.preferred_categories,
                    colors = ?profile.preferred_colors,
                    "Preference profile computed"
                );

                profile
            }
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    error = %e,
                    "Preference lookup failed, using empty profile"
                );
                UserPreferenceProfile::empty()
            }
        }
    }

    async fn read_signals(
        &self,
        user_id: UserId,
    ) -> AppResult<(Vec<SearchRecord>, Vec<InteractionRecord>, Vec<WishlistRecord>)> {
        let (mut searches, mut interactions, wishlist) = tokio::try_join!(
            self.events.search_history(user_id, self.history_limit),
            self.events.interaction_history(user_id, self.history_limit),
            self.events.wishlist(user_id),
        )?;

        searches.truncate(self.history_limit);
        interactions.truncate(self.history_limit);

        Ok((searches, interactions, wishlist))
    }
}

/// Reduces raw event records into a preference profile
pub fn build_profile(
    searches: &[SearchRecord],
    interactions: &[InteractionRecord],
    wishlist: &[WishlistRecord],
) -> UserPreferenceProfile {
    let mut categories = ScoredSignal::new();
    let mut colors = ScoredSignal::new();

    for search in searches {
        categories.add_opt(search.filters.category.as_deref(), SEARCH_WEIGHT);
        colors.add_opt(search.filters.color.as_deref(), SEARCH_WEIGHT);
    }

    for interaction in interactions {
        let data = &interaction.interaction_data;
        categories.add_opt(data.category.as_deref(), INTERACTION_WEIGHT);
        colors.add_opt(data.color.as_deref(), INTERACTION_WEIGHT);
    }

    UserPreferenceProfile {
        preferred_categories: categories.top(TOP_LABELS),
        preferred_colors: colors.top(TOP_LABELS),
        favorite_product_ids: wishlist.iter().map(|w| w.product_id).collect(),
    }
}
