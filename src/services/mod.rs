pub mod feed;
pub mod preferences;
pub mod sessions;
pub mod signals;
pub mod stores;

pub use feed::RecommendationFeed;
pub use preferences::PreferenceAggregator;
pub use sessions::{FeedRegistry, ReaperHandle};
