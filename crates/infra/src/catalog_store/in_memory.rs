use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use bazaar_catalog::{Listing, ListingPatch};
use bazaar_core::{ListingId, Source};
use bazaar_events::{EventBus, InMemoryEventBus, Subscription};

use super::r#trait::{CatalogStore, FeedMessage, StoreError};

type Partition = HashMap<ListingId, Listing>;

/// In-memory realtime catalog store.
///
/// Intended for tests/dev. Every mutation republishes the affected source's
/// pending snapshot to its feed subscribers. Fault injection:
/// [`set_offline`](Self::set_offline) makes every call fail as transient, and
/// [`emit_feed_error`](Self::emit_feed_error) pushes an error into a feed.
#[derive(Debug)]
pub struct InMemoryCatalogStore {
    partitions: RwLock<HashMap<Source, Partition>>,
    feeds: HashMap<Source, InMemoryEventBus<FeedMessage>>,
    offline: AtomicBool,
}

impl Default for InMemoryCatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self {
            partitions: RwLock::new(Source::ALL.into_iter().map(|s| (s, Partition::new())).collect()),
            feeds: Source::ALL
                .into_iter()
                .map(|s| (s, InMemoryEventBus::new()))
                .collect(),
            offline: AtomicBool::new(false),
        }
    }

    /// Insert or overwrite a listing as-is (seeding, legacy rows).
    pub fn seed(&self, listing: Listing) -> Result<(), StoreError> {
        let mut partitions = self.partitions.write().map_err(|_| StoreError::Poisoned)?;
        let source = listing.source;
        let partition = partitions.entry(source).or_default();
        partition.insert(listing.id.clone(), listing);
        self.publish(source, partition);
        Ok(())
    }

    /// Read a stored listing regardless of its review state.
    pub fn stored(&self, source: Source, id: &ListingId) -> Option<Listing> {
        let partitions = self.partitions.read().ok()?;
        partitions.get(&source)?.get(id).cloned()
    }

    /// Simulate a backend outage (or its recovery).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Push an error to every subscriber of `source`'s feed.
    pub fn emit_feed_error(&self, source: Source, message: impl Into<String>) {
        if let Some(bus) = self.feeds.get(&source) {
            let _ = bus.publish(Err(StoreError::Unavailable(message.into())));
        }
    }

    /// Live subscriber count of a source feed.
    pub fn feed_subscribers(&self, source: Source) -> usize {
        self.feeds
            .get(&source)
            .and_then(|bus| bus.subscriber_count())
            .unwrap_or(0)
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("catalog store offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn pending_snapshot(partition: &Partition) -> Vec<Listing> {
        let mut pending: Vec<Listing> = partition
            .values()
            .filter(|l| l.is_pending())
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        pending
    }

    /// Called with the partition write lock held so snapshots go out in
    /// mutation order.
    fn publish(&self, source: Source, partition: &Partition) {
        if let Some(bus) = self.feeds.get(&source) {
            if let Err(err) = bus.publish(Ok(Self::pending_snapshot(partition))) {
                tracing::warn!(%source, error = ?err, "failed to publish catalog snapshot");
            }
        }
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn subscribe_pending(&self, source: Source) -> Result<Subscription<FeedMessage>, StoreError> {
        self.ensure_online()?;
        // Hold the read lock so no mutation slips between the initial snapshot
        // and the registration.
        let partitions = self.partitions.read().map_err(|_| StoreError::Poisoned)?;
        let snapshot = partitions
            .get(&source)
            .map(Self::pending_snapshot)
            .unwrap_or_default();
        let bus = self
            .feeds
            .get(&source)
            .ok_or_else(|| StoreError::Unavailable(format!("no feed for {source}")))?;
        Ok(bus.subscribe_with_initial(Ok(snapshot)))
    }

    async fn create_item(&self, listing: Listing) -> Result<ListingId, StoreError> {
        self.ensure_online()?;
        let mut partitions = self.partitions.write().map_err(|_| StoreError::Poisoned)?;
        let source = listing.source;
        let partition = partitions.entry(source).or_default();
        if partition.contains_key(&listing.id) {
            return Err(StoreError::PreconditionFailed(format!(
                "listing {} already exists in {source}",
                listing.id
            )));
        }
        let id = listing.id.clone();
        partition.insert(id.clone(), listing);
        self.publish(source, partition);
        Ok(id)
    }

    async fn update_item(
        &self,
        source: Source,
        id: &ListingId,
        patch: ListingPatch,
    ) -> Result<Listing, StoreError> {
        self.ensure_online()?;
        let mut partitions = self.partitions.write().map_err(|_| StoreError::Poisoned)?;
        let partition = partitions.entry(source).or_default();
        let stored = partition.get_mut(id).ok_or(StoreError::NotFound)?;

        tracing::debug!(%source, listing_id = %id, patch = patch.kind(), "applying listing patch");
        // Apply to a copy so a failed precondition leaves the row untouched.
        let mut updated = stored.clone();
        patch.apply(&mut updated)?;
        *stored = updated.clone();

        self.publish(source, partition);
        Ok(updated)
    }

    async fn delete_item(&self, source: Source, id: &ListingId) -> Result<(), StoreError> {
        self.ensure_online()?;
        let mut partitions = self.partitions.write().map_err(|_| StoreError::Poisoned)?;
        let partition = partitions.entry(source).or_default();
        partition.remove(id).ok_or(StoreError::NotFound)?;
        self.publish(source, partition);
        Ok(())
    }

    async fn get_item(&self, source: Source, id: &ListingId) -> Result<Option<Listing>, StoreError> {
        self.ensure_online()?;
        let partitions = self.partitions.read().map_err(|_| StoreError::Poisoned)?;
        Ok(partitions.get(&source).and_then(|p| p.get(id)).cloned())
    }

    async fn list_approved(&self, source: Source) -> Result<Vec<Listing>, StoreError> {
        self.ensure_online()?;
        let partitions = self.partitions.read().map_err(|_| StoreError::Poisoned)?;
        let mut approved: Vec<Listing> = partitions
            .get(&source)
            .map(|p| p.values().filter(|l| l.approved()).cloned().collect())
            .unwrap_or_default();
        approved.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(approved)
    }
}
