//! Moderation Merge Engine.
//!
//! Keeps one slot per source holding that source's latest pending snapshot.
//! A snapshot replaces its source's slot wholesale and never touches the
//! others. Every accepted change republishes the consolidated view through a
//! `watch` channel.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::watch;

use bazaar_catalog::{Listing, PendingReviewEntry};
use bazaar_core::{ListingId, Source};
use bazaar_events::{Generation, Tagged};

use crate::catalog_store::{FeedMessage, StoreError};

/// The consolidated pending-review list, ordered amazon, local, software.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConsolidatedView {
    pub entries: Vec<PendingReviewEntry>,
    /// Source-scoped feed errors. Entries of an errored source are its last
    /// good snapshot.
    pub errors: BTreeMap<Source, String>,
}

impl ConsolidatedView {
    pub fn for_source(&self, source: Source) -> impl Iterator<Item = &PendingReviewEntry> {
        self.entries.iter().filter(move |e| e.source == source)
    }

    pub fn error_for(&self, source: Source) -> Option<&str> {
        self.errors.get(&source).map(String::as_str)
    }

    pub fn contains(&self, source: Source, id: &ListingId) -> bool {
        self.for_source(source).any(|e| e.id() == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What happened to a delivery handed to [`MergeEngine::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Applied,
    /// Tagged with a superseded generation; dropped.
    Stale,
}

#[derive(Debug, Default)]
struct SourceSlot {
    generation: Generation,
    entries: Vec<PendingReviewEntry>,
    error: Option<String>,
}

#[derive(Debug, Default)]
struct MergeState {
    amazon: SourceSlot,
    local: SourceSlot,
    software: SourceSlot,
}

impl MergeState {
    fn slot(&self, source: Source) -> &SourceSlot {
        match source {
            Source::Amazon => &self.amazon,
            Source::Local => &self.local,
            Source::Software => &self.software,
        }
    }

    fn slot_mut(&mut self, source: Source) -> &mut SourceSlot {
        match source {
            Source::Amazon => &mut self.amazon,
            Source::Local => &mut self.local,
            Source::Software => &mut self.software,
        }
    }

    fn view(&self) -> ConsolidatedView {
        let mut view = ConsolidatedView::default();
        for source in Source::ALL {
            let slot = self.slot(source);
            view.entries.extend(slot.entries.iter().cloned());
            if let Some(err) = &slot.error {
                view.errors.insert(source, err.clone());
            }
        }
        view
    }
}

#[derive(Debug)]
pub struct MergeEngine {
    state: Mutex<MergeState>,
    tx: watch::Sender<ConsolidatedView>,
}

impl Default for MergeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MergeEngine {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ConsolidatedView::default());
        Self {
            state: Mutex::new(MergeState::default()),
            tx,
        }
    }

    /// Start a new subscription generation for `source`.
    ///
    /// Deliveries tagged with any earlier generation are discarded from now
    /// on. The source's current data stays until the new subscription
    /// delivers.
    pub fn begin_generation(&self, source: Source) -> Generation {
        let mut state = self.lock();
        let slot = state.slot_mut(source);
        slot.generation = slot.generation.next();
        slot.generation
    }

    pub fn current_generation(&self, source: Source) -> Generation {
        self.lock().slot(source).generation
    }

    /// Retire every current subscription (shutdown).
    pub fn retire(&self) {
        let mut state = self.lock();
        for source in Source::ALL {
            let slot = state.slot_mut(source);
            slot.generation = slot.generation.next();
        }
    }

    /// Apply one tagged feed delivery.
    ///
    /// A snapshot replaces `source`'s slot: items of another source or no
    /// longer pending are ignored and a repeated id keeps its first
    /// occurrence. A good snapshot clears the source error; an error keeps the
    /// source's last good data.
    pub fn apply(&self, source: Source, message: Tagged<FeedMessage>) -> MergeOutcome {
        let mut state = self.lock();
        let slot = state.slot_mut(source);
        let generation = message.generation();
        if !message.is_current(slot.generation) {
            tracing::debug!(%source, %generation, current = %slot.generation, "dropping stale delivery");
            return MergeOutcome::Stale;
        }

        match message.into_payload() {
            Ok(snapshot) => {
                slot.entries = pending_entries(source, snapshot);
                slot.error = None;
                tracing::debug!(%source, %generation, pending = slot.entries.len(), "snapshot merged");
            }
            Err(err) => {
                tracing::warn!(%source, %generation, error = %err, "source feed error");
                slot.error = Some(err.to_string());
            }
        }
        self.publish(&state);
        MergeOutcome::Applied
    }

    pub fn apply_snapshot(
        &self,
        source: Source,
        generation: Generation,
        snapshot: Vec<Listing>,
    ) -> MergeOutcome {
        self.apply(source, Tagged::new(generation, Ok(snapshot)))
    }

    pub fn apply_error(&self, source: Source, generation: Generation, error: &StoreError) -> MergeOutcome {
        self.apply(source, Tagged::new(generation, Err(error.clone())))
    }

    pub fn view(&self) -> ConsolidatedView {
        self.tx.borrow().clone()
    }

    /// Watch the consolidated view. The receiver starts at the current view.
    pub fn watch(&self) -> watch::Receiver<ConsolidatedView> {
        self.tx.subscribe()
    }

    // Called under the state lock so watchers observe views in apply order.
    fn publish(&self, state: &MergeState) {
        self.tx.send_replace(state.view());
    }

    fn lock(&self) -> MutexGuard<'_, MergeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn pending_entries(source: Source, snapshot: Vec<Listing>) -> Vec<PendingReviewEntry> {
    let mut seen: HashSet<ListingId> = HashSet::with_capacity(snapshot.len());
    let mut entries = Vec::with_capacity(snapshot.len());
    for listing in snapshot {
        if listing.source != source {
            tracing::warn!(%source, listing_id = %listing.id, actual = %listing.source, "listing delivered on the wrong feed");
            continue;
        }
        if !seen.insert(listing.id.clone()) {
            continue;
        }
        entries.extend(PendingReviewEntry::from_listing(listing));
    }
    entries
}
