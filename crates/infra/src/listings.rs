//! Contributor write boundary for listings.
//!
//! Every write is authorized against the target source, validated, and
//! priced here before it reaches the store.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use bazaar_auth::{Action, Actor, AuthzError, authorize};
use bazaar_catalog::{Listing, ListingDraft, ListingPatch, ValidationErrors};
use bazaar_core::{ListingId, Source};

use crate::catalog_store::{CatalogStore, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ListingError {
    #[error(transparent)]
    Unauthorized(#[from] AuthzError),

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("listing {0} not found")]
    NotFound(ListingId),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store error: {0}")]
    Store(String),
}

impl ListingError {
    fn from_store(err: StoreError, id: &ListingId) -> Self {
        match err {
            StoreError::NotFound => ListingError::NotFound(id.clone()),
            StoreError::PreconditionFailed(msg) => ListingError::Conflict(msg),
            other => ListingError::Store(other.to_string()),
        }
    }
}

pub struct ListingService<S> {
    store: Arc<S>,
}

impl<S> ListingService<S>
where
    S: CatalogStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Submit a new listing for review.
    pub async fn create(
        &self,
        actor: &Actor,
        source: Source,
        draft: &ListingDraft,
    ) -> Result<ListingId, ListingError> {
        authorize(actor, Action::EditListing, Some(source))?;
        let valid = draft.validate(source)?;

        let listing = Listing::create(ListingId::generate(), valid, &actor.email, Utc::now());
        let id = listing.id.clone();
        self.store
            .create_item(listing)
            .await
            .map_err(|err| ListingError::from_store(err, &id))?;

        tracing::info!(actor = %actor.email, %source, listing_id = %id, "listing submitted");
        Ok(id)
    }

    /// Replace a listing's content. The listing goes back to review.
    pub async fn edit(
        &self,
        actor: &Actor,
        source: Source,
        id: &ListingId,
        draft: &ListingDraft,
    ) -> Result<Listing, ListingError> {
        authorize(actor, Action::EditListing, Some(source))?;
        let valid = draft.validate(source)?;

        let patch = ListingPatch::Revise {
            draft: valid,
            actor: actor.email.clone(),
            at: Utc::now(),
        };
        let listing = self
            .store
            .update_item(source, id, patch)
            .await
            .map_err(|err| ListingError::from_store(err, id))?;

        tracing::info!(actor = %actor.email, %source, listing_id = %id, "listing revised");
        Ok(listing)
    }

    /// Remove a listing. Nothing changes locally unless the store confirms.
    pub async fn delete(&self, actor: &Actor, source: Source, id: &ListingId) -> Result<(), ListingError> {
        authorize(actor, Action::EditListing, Some(source))?;
        self.store.delete_item(source, id).await.map_err(|err| {
            tracing::warn!(actor = %actor.email, %source, listing_id = %id, error = %err, "delete failed");
            ListingError::from_store(err, id)
        })?;

        tracing::info!(actor = %actor.email, %source, listing_id = %id, "listing deleted");
        Ok(())
    }

    /// Approved listings of `source`, visible to everyone.
    pub async fn public_catalog(&self, actor: Option<&Actor>, source: Source) -> Result<Vec<Listing>, ListingError> {
        tracing::debug!(viewer = actor.map(|a| a.email.as_str()).unwrap_or("anonymous"), %source, "reading public catalog");
        self.store
            .list_approved(source)
            .await
            .map_err(|err| ListingError::Store(err.to_string()))
    }
}
