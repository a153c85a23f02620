use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use bazaar_core::{DomainError, DomainResult, ListingId, Source};

use crate::draft::ValidDraft;
use crate::pricing::{DiscountPercent, Money, compute_final_price};

/// Review lifecycle of a listing.
///
/// Encodes the `approved` / `rejected` flags so both can never be set at once.
/// `Rejected` is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved { at: DateTime<Utc>, by: String },
    Rejected { at: DateTime<Utc>, by: String },
}

impl ReviewStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, ReviewStatus::Pending)
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, ReviewStatus::Approved { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, ReviewStatus::Rejected { .. })
    }

    fn label(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved { .. } => "approved",
            ReviewStatus::Rejected { .. } => "rejected",
        }
    }
}

/// A product listing in one of the catalog sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub source: Source,
    pub title: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub quantity: u32,
    #[serde(default)]
    pub images: Vec<String>,
    pub original_price: Money,
    #[serde(default = "no_discount")]
    pub discount_percent: DiscountPercent,
    /// Derived on every write. Rows written by older schema versions may lack it.
    #[serde(default)]
    pub final_price: Option<Money>,
    pub status: ReviewStatus,
    pub created_by: String,
    pub modified_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub extras: Map<String, JsonValue>,
}

fn no_discount() -> DiscountPercent {
    DiscountPercent::NONE
}

impl Listing {
    /// Build a new pending listing from a validated draft.
    pub fn create(id: ListingId, draft: ValidDraft, actor: &str, now: DateTime<Utc>) -> Self {
        let final_price = compute_final_price(draft.original_price, draft.discount_percent);
        Self {
            id,
            source: draft.source,
            title: draft.title,
            name: draft.name,
            description: draft.description,
            quantity: draft.quantity,
            images: draft.images,
            original_price: draft.original_price,
            discount_percent: draft.discount_percent,
            final_price: Some(final_price),
            status: ReviewStatus::Pending,
            created_by: actor.to_string(),
            modified_by: actor.to_string(),
            created_at: now,
            updated_at: now,
            extras: draft.extras,
        }
    }

    /// Stored final price, or the derivation for rows that lack one.
    pub fn effective_final_price(&self) -> Money {
        self.final_price
            .unwrap_or_else(|| compute_final_price(self.original_price, self.discount_percent))
    }

    pub fn approved(&self) -> bool {
        self.status.is_approved()
    }

    pub fn rejected(&self) -> bool {
        self.status.is_rejected()
    }

    pub fn is_pending(&self) -> bool {
        self.status.is_pending()
    }

    /// Replace the contributor-editable content and send the listing back to review.
    pub fn revise(&mut self, draft: ValidDraft, actor: &str, now: DateTime<Utc>) -> DomainResult<()> {
        if draft.source != self.source {
            return Err(DomainError::invariant("a listing cannot move between sources"));
        }
        if self.rejected() {
            return Err(DomainError::conflict("rejected listings cannot be edited"));
        }

        self.final_price = Some(compute_final_price(draft.original_price, draft.discount_percent));
        self.title = draft.title;
        self.name = draft.name;
        self.description = draft.description;
        self.quantity = draft.quantity;
        self.images = draft.images;
        self.original_price = draft.original_price;
        self.discount_percent = draft.discount_percent;
        self.extras = draft.extras;
        self.status = ReviewStatus::Pending;
        self.touch(actor, now);
        Ok(())
    }

    pub fn approve(&mut self, actor: &str, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_pending("approve")?;
        self.status = ReviewStatus::Approved {
            at: now,
            by: actor.to_string(),
        };
        self.touch(actor, now);
        Ok(())
    }

    pub fn reject(&mut self, actor: &str, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_pending("reject")?;
        self.status = ReviewStatus::Rejected {
            at: now,
            by: actor.to_string(),
        };
        self.touch(actor, now);
        Ok(())
    }

    fn ensure_pending(&self, verb: &str) -> DomainResult<()> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "cannot {verb} listing {} of {}: already {}",
                self.id,
                self.source,
                self.status.label()
            )))
        }
    }

    fn touch(&mut self, actor: &str, now: DateTime<Utc>) {
        self.modified_by = actor.to_string();
        // Never move backwards, even with a skewed clock.
        self.updated_at = now.max(self.updated_at);
    }
}

/// Partial update applied atomically by a catalog store.
#[derive(Debug, Clone, PartialEq)]
pub enum ListingPatch {
    /// Contributor edit; re-enters moderation.
    Revise {
        draft: ValidDraft,
        actor: String,
        at: DateTime<Utc>,
    },
    /// Requires the listing to still be pending.
    Approve { actor: String, at: DateTime<Utc> },
    /// Requires the listing to still be pending.
    Reject { actor: String, at: DateTime<Utc> },
}

impl ListingPatch {
    pub fn apply(self, listing: &mut Listing) -> DomainResult<()> {
        match self {
            ListingPatch::Revise { draft, actor, at } => listing.revise(draft, &actor, at),
            ListingPatch::Approve { actor, at } => listing.approve(&actor, at),
            ListingPatch::Reject { actor, at } => listing.reject(&actor, at),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ListingPatch::Revise { .. } => "revise",
            ListingPatch::Approve { .. } => "approve",
            ListingPatch::Reject { .. } => "reject",
        }
    }
}

/// A pending listing as shown in the moderation queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingReviewEntry {
    pub source: Source,
    pub collection_name: &'static str,
    pub final_price: Money,
    pub listing: Listing,
}

impl PendingReviewEntry {
    /// Project a listing; `None` unless it is pending.
    pub fn from_listing(listing: Listing) -> Option<Self> {
        if !listing.is_pending() {
            return None;
        }
        Some(Self {
            source: listing.source,
            collection_name: listing.source.collection_name(),
            final_price: listing.effective_final_price(),
            listing,
        })
    }

    pub fn id(&self) -> &ListingId {
        &self.listing.id
    }
}
