//! `bazaar-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the catalog source tag, and the domain error model.

pub mod error;
pub mod id;
pub mod source;

pub use error::{DomainError, DomainResult};
pub use id::{AccountId, ActorId, ListingId};
pub use source::Source;
