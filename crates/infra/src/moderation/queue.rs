//! Moderation queue runner: pumps the three source feeds into a
//! [`MergeEngine`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use bazaar_core::Source;
use bazaar_events::{Generation, Tagged};

use super::merge::{ConsolidatedView, MergeEngine, MergeOutcome};
use crate::catalog_store::{CatalogStore, StoreError};
use crate::feed::SourceFeed;

struct Pump {
    generation: Generation,
    handle: JoinHandle<()>,
}

/// Owns one pump task per source.
///
/// Each (re)subscription gets a fresh generation from the engine; the previous
/// pump is aborted and anything it still delivers is discarded as stale.
pub struct ModerationQueue<S> {
    store: Arc<S>,
    engine: Arc<MergeEngine>,
    pumps: Mutex<HashMap<Source, Pump>>,
    first_snapshot_timeout: Option<Duration>,
}

impl<S> ModerationQueue<S>
where
    S: CatalogStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            engine: Arc::new(MergeEngine::new()),
            pumps: Mutex::new(HashMap::new()),
            first_snapshot_timeout: None,
        }
    }

    /// Give up on a feed whose first snapshot takes longer than `timeout`.
    pub fn with_first_snapshot_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.first_snapshot_timeout = timeout;
        self
    }

    pub fn engine(&self) -> Arc<MergeEngine> {
        Arc::clone(&self.engine)
    }

    pub fn view(&self) -> ConsolidatedView {
        self.engine.view()
    }

    pub fn watch(&self) -> watch::Receiver<ConsolidatedView> {
        self.engine.watch()
    }

    /// Subscribe all three sources concurrently.
    ///
    /// A source that fails to open is reported in the view as a source-scoped
    /// error and does not prevent the others from starting. Returns the first
    /// failure, in source order.
    pub async fn start(&self) -> Result<(), StoreError> {
        let (amazon, local, software) = tokio::join!(
            self.resubscribe(Source::Amazon),
            self.resubscribe(Source::Local),
            self.resubscribe(Source::Software),
        );
        amazon.and(local).and(software)
    }

    /// Tear down `source`'s subscription (if any) and open a new one.
    pub async fn resubscribe(&self, source: Source) -> Result<(), StoreError> {
        let generation = self.engine.begin_generation(source);
        if let Some(old) = self.pumps().remove(&source) {
            old.handle.abort();
        }
        tracing::info!(%source, %generation, "subscribing source feed");

        let opened =
            SourceFeed::open_with_timeout(&*self.store, source, self.first_snapshot_timeout).await;
        let (feed, snapshot) = match opened {
            Ok(opened) => opened,
            Err(err) => {
                self.engine.apply_error(source, generation, &err);
                return Err(err);
            }
        };

        self.engine.apply_snapshot(source, generation, snapshot);
        let handle = tokio::spawn(pump(feed, generation, Arc::clone(&self.engine)));

        let mut pumps = self.pumps();
        match pumps.get(&source) {
            // A later resubscribe already won the race.
            Some(existing) if existing.generation > generation => handle.abort(),
            _ => {
                if let Some(old) = pumps.insert(source, Pump { generation, handle }) {
                    old.handle.abort();
                }
            }
        }
        Ok(())
    }

    /// Whether `source` currently has a live pump.
    pub fn is_subscribed(&self, source: Source) -> bool {
        self.pumps()
            .get(&source)
            .is_some_and(|p| !p.handle.is_finished())
    }

    /// Stop every pump. Late deliveries are discarded. Idempotent.
    pub fn shutdown(&self) {
        self.engine.retire();
        for (source, pump) in self.pumps().drain() {
            tracing::debug!(%source, generation = %pump.generation, "stopping source feed");
            pump.handle.abort();
        }
    }

    fn pumps(&self) -> MutexGuard<'_, HashMap<Source, Pump>> {
        self.pumps.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<S> Drop for ModerationQueue<S> {
    fn drop(&mut self) {
        let pumps = self.pumps.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner());
        for (_, pump) in pumps.drain() {
            pump.handle.abort();
        }
    }
}

async fn pump(mut feed: SourceFeed, generation: Generation, engine: Arc<MergeEngine>) {
    let source = feed.source();
    loop {
        match feed.next().await {
            Some(message) => {
                if engine.apply(source, Tagged::new(generation, message)) == MergeOutcome::Stale {
                    break;
                }
            }
            None => {
                let ended = StoreError::Unavailable(format!("{source} feed ended"));
                engine.apply_error(source, generation, &ended);
                break;
            }
        }
    }
    feed.close();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_store::InMemoryCatalogStore;

    #[tokio::test]
    async fn start_reports_offline_store_per_source() {
        let store = Arc::new(InMemoryCatalogStore::new());
        store.set_offline(true);
        let queue = ModerationQueue::new(Arc::clone(&store));

        let err = queue.start().await.unwrap_err();
        assert!(err.is_transient());

        let view = queue.view();
        for source in Source::ALL {
            assert!(view.error_for(source).is_some());
            assert!(!queue.is_subscribed(source));
        }
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let store = Arc::new(InMemoryCatalogStore::new());
        let queue = ModerationQueue::new(store);
        queue.start().await.unwrap();
        assert!(queue.is_subscribed(Source::Local));

        queue.shutdown();
        queue.shutdown();
        assert!(!queue.is_subscribed(Source::Local));
    }
}
