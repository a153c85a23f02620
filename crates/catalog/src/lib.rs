//! Catalog domain module.
//!
//! Business rules for listings across the three sources, implemented purely as
//! deterministic domain logic (no IO, no storage): the pricing engine, draft
//! validation and the review lifecycle.

pub mod draft;
pub mod listing;
pub mod pricing;

pub use draft::{FieldError, ListingDraft, ValidDraft, ValidationErrors};
pub use listing::{Listing, ListingPatch, PendingReviewEntry, ReviewStatus};
pub use pricing::{DiscountPercent, Money, compute_final_price, display_price};
