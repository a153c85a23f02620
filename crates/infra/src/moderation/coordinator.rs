//! Action Coordinator: approve/reject against a (source, listing) pair.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;

use bazaar_auth::{Action, Actor, AuthzError, authorize};
use bazaar_catalog::ListingPatch;
use bazaar_core::{ListingId, Source};

use crate::busy::InFlight;
use crate::catalog_store::{CatalogStore, StoreError};
use crate::moderation::ConsolidatedView;

/// Identifies one listing across all sources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ItemKey {
    pub source: Source,
    pub id: ListingId,
}

impl ItemKey {
    pub fn new(source: Source, id: impl Into<ListingId>) -> Self {
        Self {
            source,
            id: id.into(),
        }
    }
}

impl core::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.source, self.id)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error(transparent)]
    Unauthorized(#[from] AuthzError),

    #[error("an action on {0} is already in progress")]
    InProgress(ItemKey),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("listing {0} not found")]
    NotFound(ItemKey),

    #[error("store error: {0}")]
    Store(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Review {
    Approve,
    Reject,
}

impl Review {
    fn as_str(self) -> &'static str {
        match self {
            Review::Approve => "approve",
            Review::Reject => "reject",
        }
    }

    fn patch(self, actor: &Actor) -> ListingPatch {
        let actor = actor.email.clone();
        let at = Utc::now();
        match self {
            Review::Approve => ListingPatch::Approve { actor, at },
            Review::Reject => ListingPatch::Reject { actor, at },
        }
    }
}

/// Serializes review actions per item and issues them against the store.
///
/// Actions on different items run concurrently. A second action on an item
/// with one already in flight fails fast with [`ActionError::InProgress`].
/// When [`tracking`](Self::tracking) a queue view, failure messages of items
/// that have left the queue are dropped.
pub struct ActionCoordinator<S> {
    store: Arc<S>,
    in_flight: InFlight<ItemKey>,
    failures: Mutex<HashMap<ItemKey, String>>,
    view: Option<watch::Receiver<ConsolidatedView>>,
}

impl<S> ActionCoordinator<S>
where
    S: CatalogStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            in_flight: InFlight::new(),
            failures: Mutex::new(HashMap::new()),
            view: None,
        }
    }

    /// Forget failures of items no longer pending in `view`.
    pub fn tracking(mut self, view: watch::Receiver<ConsolidatedView>) -> Self {
        self.view = Some(view);
        self
    }

    /// Approve a pending listing. Main-admin only.
    pub async fn approve(&self, actor: &Actor, source: Source, id: &ListingId) -> Result<(), ActionError> {
        self.run(actor, ItemKey::new(source, id.clone()), Review::Approve).await
    }

    /// Reject (tombstone) a pending listing. Main-admin only.
    ///
    /// Rejecting a listing that is gone or already rejected succeeds without
    /// writing anything.
    pub async fn reject(&self, actor: &Actor, source: Source, id: &ListingId) -> Result<(), ActionError> {
        self.run(actor, ItemKey::new(source, id.clone()), Review::Reject).await
    }

    pub fn is_in_progress(&self, source: Source, id: &ListingId) -> bool {
        self.in_flight.is_busy(&ItemKey::new(source, id.clone()))
    }

    /// Message of the last failed action on this item, cleared by a success.
    pub fn last_failure(&self, source: Source, id: &ListingId) -> Option<String> {
        self.prune_failures();
        self.failures().get(&ItemKey::new(source, id.clone())).cloned()
    }

    /// Drop failure records for items absent from the tracked view.
    pub fn prune_failures(&self) {
        let Some(view) = &self.view else {
            return;
        };
        let view = view.borrow();
        self.failures().retain(|key, _| {
            let keep = view.contains(key.source, &key.id);
            if !keep {
                tracing::debug!(item = %key, "dropping failure of an item that left the queue");
            }
            keep
        });
    }

    async fn run(&self, actor: &Actor, key: ItemKey, review: Review) -> Result<(), ActionError> {
        self.prune_failures();
        authorize(actor, Action::ReviewListing, Some(key.source)).inspect_err(|err| {
            tracing::warn!(actor = %actor.email, item = %key, action = review.as_str(), error = %err, "review denied");
        })?;

        let Some(_guard) = self.in_flight.try_acquire(key.clone()) else {
            tracing::debug!(item = %key, action = review.as_str(), "action already in progress");
            return Err(ActionError::InProgress(key));
        };

        let result = self.execute(actor, &key, review).await;
        match &result {
            Ok(()) => {
                self.failures().remove(&key);
                tracing::info!(actor = %actor.email, item = %key, action = review.as_str(), "review applied");
            }
            Err(err) => {
                self.failures().insert(key.clone(), err.to_string());
                tracing::warn!(actor = %actor.email, item = %key, action = review.as_str(), error = %err, "review failed");
            }
        }
        result
    }

    async fn execute(&self, actor: &Actor, key: &ItemKey, review: Review) -> Result<(), ActionError> {
        let current = self
            .store
            .get_item(key.source, &key.id)
            .await
            .map_err(|err| ActionError::Store(err.to_string()))?;

        match (review, current) {
            (Review::Reject, None) => {
                tracing::debug!(item = %key, "reject on a missing listing; nothing to do");
                return Ok(());
            }
            (Review::Approve, None) => return Err(ActionError::NotFound(key.clone())),
            (Review::Reject, Some(listing)) if listing.rejected() => return Ok(()),
            (_, Some(listing)) if !listing.is_pending() => {
                return Err(ActionError::Conflict(format!(
                    "cannot {} {key}: it is no longer pending",
                    review.as_str()
                )));
            }
            _ => {}
        }

        // The patch re-checks the pending state atomically in the store, so a
        // concurrent change between the read and the write is still caught.
        match self.store.update_item(key.source, &key.id, review.patch(actor)).await {
            Ok(_) => Ok(()),
            Err(StoreError::NotFound) if review == Review::Reject => Ok(()),
            Err(StoreError::NotFound) => Err(ActionError::NotFound(key.clone())),
            Err(StoreError::PreconditionFailed(msg)) => Err(ActionError::Conflict(msg)),
            Err(err) => Err(ActionError::Store(err.to_string())),
        }
    }

    fn failures(&self) -> MutexGuard<'_, HashMap<ItemKey, String>> {
        self.failures.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_store::InMemoryCatalogStore;
    use crate::moderation::MergeEngine;
    use bazaar_auth::Role;
    use bazaar_catalog::{Listing, ListingDraft};
    use rust_decimal_macros::dec;

    fn admin() -> Actor {
        Actor::new("admin", "admin@example.com", Role::MainAdmin)
    }

    fn seeded(source: Source, id: &str) -> Arc<InMemoryCatalogStore> {
        let store = Arc::new(InMemoryCatalogStore::new());
        let draft = ListingDraft {
            title: "Lamp".to_string(),
            name: "lamp".to_string(),
            quantity: 2,
            original_price: dec!(20),
            ..ListingDraft::default()
        }
        .validate(source)
        .unwrap();
        store
            .seed(Listing::create(ListingId::new(id), draft, "seller@example.com", Utc::now()))
            .unwrap();
        store
    }

    #[tokio::test]
    async fn approve_marks_listing_approved() {
        let store = seeded(Source::Local, "p1");
        let coordinator = ActionCoordinator::new(Arc::clone(&store));
        let id = ListingId::new("p1");

        coordinator.approve(&admin(), Source::Local, &id).await.unwrap();

        let stored = store.stored(Source::Local, &id).unwrap();
        assert!(stored.approved());
        assert_eq!(stored.modified_by, "admin@example.com");
        assert!(!coordinator.is_in_progress(Source::Local, &id));
    }

    #[tokio::test]
    async fn approve_after_reject_is_a_conflict() {
        let store = seeded(Source::Amazon, "p1");
        let coordinator = ActionCoordinator::new(Arc::clone(&store));
        let id = ListingId::new("p1");

        coordinator.reject(&admin(), Source::Amazon, &id).await.unwrap();
        let err = coordinator.approve(&admin(), Source::Amazon, &id).await.unwrap_err();

        assert!(matches!(err, ActionError::Conflict(_)));
        let stored = store.stored(Source::Amazon, &id).unwrap();
        assert!(stored.rejected() && !stored.approved());
    }

    #[tokio::test]
    async fn repeated_reject_is_a_no_op() {
        let store = seeded(Source::Software, "p9");
        let coordinator = ActionCoordinator::new(Arc::clone(&store));
        let id = ListingId::new("p9");

        coordinator.reject(&admin(), Source::Software, &id).await.unwrap();
        let first = store.stored(Source::Software, &id).unwrap();
        coordinator.reject(&admin(), Source::Software, &id).await.unwrap();

        assert_eq!(store.stored(Source::Software, &id), Some(first));
    }

    #[tokio::test]
    async fn approve_missing_is_not_found() {
        let coordinator = ActionCoordinator::new(Arc::new(InMemoryCatalogStore::new()));
        let err = coordinator
            .approve(&admin(), Source::Local, &ListingId::new("ghost"))
            .await
            .unwrap_err();
        assert_eq!(err, ActionError::NotFound(ItemKey::new(Source::Local, "ghost")));
    }

    #[tokio::test]
    async fn store_failure_is_recorded_per_item_and_cleared_by_success() {
        let store = seeded(Source::Local, "p1");
        let coordinator = ActionCoordinator::new(Arc::clone(&store));
        let id = ListingId::new("p1");

        store.set_offline(true);
        let err = coordinator.approve(&admin(), Source::Local, &id).await.unwrap_err();
        assert!(matches!(err, ActionError::Store(_)));
        assert!(coordinator.last_failure(Source::Local, &id).is_some());
        assert!(coordinator.last_failure(Source::Amazon, &id).is_none());

        store.set_offline(false);
        coordinator.approve(&admin(), Source::Local, &id).await.unwrap();
        assert!(coordinator.last_failure(Source::Local, &id).is_none());
    }

    #[tokio::test]
    async fn semi_admin_cannot_review() {
        let store = seeded(Source::Local, "p1");
        let coordinator = ActionCoordinator::new(Arc::clone(&store));
        let actor = Actor::new("s1", "local@example.com", Role::LocalSemiAdmin);

        let err = coordinator
            .approve(&actor, Source::Local, &ListingId::new("p1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::Unauthorized(_)));
        assert!(store.stored(Source::Local, &ListingId::new("p1")).unwrap().is_pending());
    }

    #[tokio::test]
    async fn failures_of_items_that_left_the_queue_are_forgotten() {
        let store = seeded(Source::Local, "p1");
        let id = ListingId::new("p1");
        let engine = MergeEngine::new();
        let generation = engine.begin_generation(Source::Local);
        let listing = store.stored(Source::Local, &id).unwrap();
        engine.apply_snapshot(Source::Local, generation, vec![listing]);
        let coordinator = ActionCoordinator::new(Arc::clone(&store)).tracking(engine.watch());

        store.set_offline(true);
        coordinator.approve(&admin(), Source::Local, &id).await.unwrap_err();
        assert!(coordinator.last_failure(Source::Local, &id).is_some());

        // Still queued: the record survives a prune.
        coordinator.prune_failures();
        assert!(coordinator.last_failure(Source::Local, &id).is_some());

        engine.apply_snapshot(Source::Local, generation, vec![]);
        assert!(coordinator.last_failure(Source::Local, &id).is_none());
    }

    #[tokio::test]
    async fn untracked_coordinator_keeps_failures() {
        let store = seeded(Source::Amazon, "p2");
        let id = ListingId::new("p2");
        let coordinator = ActionCoordinator::new(Arc::clone(&store));

        store.set_offline(true);
        coordinator.reject(&admin(), Source::Amazon, &id).await.unwrap_err();
        coordinator.prune_failures();
        assert!(coordinator.last_failure(Source::Amazon, &id).is_some());
    }
}
