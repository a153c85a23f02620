use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use bazaar_catalog::{Listing, ListingPatch};
use bazaar_core::{DomainError, ListingId, Source};
use bazaar_events::Subscription;

/// Failure reported by a store (catalog or account).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Transient network/backend failure. Safe to retry after re-reading state.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// No snapshot arrived in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("not found")]
    NotFound,

    /// A conditional update found the record in an unexpected state.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// The update itself is malformed for the stored record.
    #[error("invalid update: {0}")]
    Invalid(String),

    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// Whether retrying later might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Timeout(_))
    }
}

impl From<DomainError> for StoreError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Conflict(msg) => StoreError::PreconditionFailed(msg),
            other => StoreError::Invalid(other.to_string()),
        }
    }
}

/// One delivery of a source feed: a full replacement snapshot, or an error.
pub type FeedMessage = Result<Vec<Listing>, StoreError>;

/// Realtime listing backend, partitioned by [`Source`].
///
/// Only equality filters on the review state are assumed, so this can sit in
/// front of a document store with change notifications, a polling REST
/// backend, or an in-memory simulation.
///
/// ## Feed semantics
///
/// `subscribe_pending` delivers the full set of pending listings of one
/// source first, then a full replacement set after every change to that
/// partition. Within one subscription, messages arrive in emission order.
/// Snapshots are ordered by `created_at`, then id.
///
/// ## Updates
///
/// `update_item` applies a [`ListingPatch`] atomically. Review patches carry a
/// "still pending" precondition; a violated precondition is reported as
/// [`StoreError::PreconditionFailed`] and nothing is written.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn subscribe_pending(&self, source: Source) -> Result<Subscription<FeedMessage>, StoreError>;

    async fn create_item(&self, listing: Listing) -> Result<ListingId, StoreError>;

    /// Returns the listing as stored after the patch.
    async fn update_item(
        &self,
        source: Source,
        id: &ListingId,
        patch: ListingPatch,
    ) -> Result<Listing, StoreError>;

    async fn delete_item(&self, source: Source, id: &ListingId) -> Result<(), StoreError>;

    async fn get_item(&self, source: Source, id: &ListingId) -> Result<Option<Listing>, StoreError>;

    async fn list_approved(&self, source: Source) -> Result<Vec<Listing>, StoreError>;
}

#[async_trait]
impl<S> CatalogStore for Arc<S>
where
    S: CatalogStore + ?Sized,
{
    async fn subscribe_pending(&self, source: Source) -> Result<Subscription<FeedMessage>, StoreError> {
        (**self).subscribe_pending(source).await
    }

    async fn create_item(&self, listing: Listing) -> Result<ListingId, StoreError> {
        (**self).create_item(listing).await
    }

    async fn update_item(
        &self,
        source: Source,
        id: &ListingId,
        patch: ListingPatch,
    ) -> Result<Listing, StoreError> {
        (**self).update_item(source, id, patch).await
    }

    async fn delete_item(&self, source: Source, id: &ListingId) -> Result<(), StoreError> {
        (**self).delete_item(source, id).await
    }

    async fn get_item(&self, source: Source, id: &ListingId) -> Result<Option<Listing>, StoreError> {
        (**self).get_item(source, id).await
    }

    async fn list_approved(&self, source: Source) -> Result<Vec<Listing>, StoreError> {
        (**self).list_approved(source).await
    }
}
