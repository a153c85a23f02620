//! Infrastructure layer: stores, source feeds, the moderation queue and the
//! write boundaries built on top of them.

pub mod account_store;
pub mod busy;
pub mod catalog_store;
pub mod config;
pub mod feed;
pub mod listings;
pub mod moderation;
pub mod role_registry;

pub use account_store::{AccountFeedMessage, AccountStore, InMemoryAccountStore};
pub use catalog_store::{CatalogStore, FeedMessage, InMemoryCatalogStore, StoreError};
pub use config::{BazaarConfig, ConfigError};
pub use feed::SourceFeed;
pub use listings::{ListingError, ListingService};
pub use moderation::{
    ActionCoordinator, ActionError, ConsolidatedView, ItemKey, MergeEngine, MergeOutcome, ModerationQueue,
};
pub use role_registry::{AccountRow, RoleChangeError, RoleRegistry};
