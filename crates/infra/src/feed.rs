//! A live subscription to one source's pending listings.

use std::time::Duration;

use bazaar_catalog::Listing;
use bazaar_core::Source;
use bazaar_events::Subscription;

use crate::catalog_store::{CatalogStore, FeedMessage, StoreError};

/// Source feed: a store subscription whose first snapshot has arrived.
#[derive(Debug)]
pub struct SourceFeed {
    source: Source,
    subscription: Subscription<FeedMessage>,
}

impl SourceFeed {
    /// Subscribe and wait for the initial snapshot.
    ///
    /// Fails with the store's error when the subscription is refused or its
    /// first delivery is an error.
    pub async fn open<S>(store: &S, source: Source) -> Result<(Self, Vec<Listing>), StoreError>
    where
        S: CatalogStore + ?Sized,
    {
        Self::open_with_timeout(store, source, None).await
    }

    /// Like [`open`](Self::open) but gives up after `timeout` without a first
    /// snapshot.
    pub async fn open_with_timeout<S>(
        store: &S,
        source: Source,
        timeout: Option<Duration>,
    ) -> Result<(Self, Vec<Listing>), StoreError>
    where
        S: CatalogStore + ?Sized,
    {
        let mut subscription = store.subscribe_pending(source).await?;

        let first = match timeout {
            Some(limit) => subscription
                .recv_timeout(limit)
                .await
                .map_err(|_| StoreError::Timeout(limit))?,
            None => subscription.recv().await,
        };

        match first {
            Some(Ok(snapshot)) => {
                tracing::debug!(%source, pending = snapshot.len(), "source feed opened");
                Ok((
                    Self {
                        source,
                        subscription,
                    },
                    snapshot,
                ))
            }
            Some(Err(err)) => Err(err),
            None => Err(StoreError::Unavailable(format!(
                "{source} feed closed before its first snapshot"
            ))),
        }
    }

    pub fn source(&self) -> Source {
        self.source
    }

    /// Next snapshot or error. `None` once the feed has ended.
    pub async fn next(&mut self) -> Option<FeedMessage> {
        self.subscription.recv().await
    }

    /// Stop delivery immediately, dropping anything already queued. Idempotent.
    pub fn close(&mut self) {
        self.subscription.close();
    }
}
