//! Catalog store: the partitioned listing backend.
//!
//! `trait.rs` is the collaborator boundary the moderation core consumes;
//! `in_memory.rs` is a realtime simulation for tests and the demo binary.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryCatalogStore;
pub use r#trait::{CatalogStore, FeedMessage, StoreError};
