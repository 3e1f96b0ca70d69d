use uuid::Uuid;

pub mod catalog;
pub mod events;
pub mod feed;
pub mod profile;

pub use catalog::{CatalogItem, CatalogQuery};
pub use events::{InteractionRecord, SearchRecord, SignalPayload, WishlistRecord};
pub use feed::{FeedPhase, FeedSnapshot};
pub use profile::UserPreferenceProfile;

/// Identifier of an authenticated shopper
pub type UserId = Uuid;

/// Identifier of a catalog product
pub type ProductId = Uuid;
