//! Account backend used by the role registry.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryAccountStore;
pub use r#trait::{AccountFeedMessage, AccountStore};
