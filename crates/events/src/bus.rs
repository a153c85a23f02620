//! Publishing/subscription abstraction (mechanics only).
//!
//! The bus is intentionally **lightweight**:
//!
//! - **Transport-agnostic**: in-memory channels, a realtime datastore listener,
//!   a polling REST client, etc.
//! - **At-least-once delivery**: a message may be delivered more than once.
//!   Consumers must be idempotent. Snapshot consumers get this for free since
//!   each message fully replaces the previous one.
//! - **Per-publisher ordering**: messages from one publisher arrive in publish
//!   order. There is no ordering across publishers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{UnboundedReceiver, error::TryRecvError};

/// A subscription to a message stream.
///
/// Each subscription gets a copy of every message published after it was
/// created (broadcast semantics).
///
/// ```ignore
/// let mut subscription = bus.subscribe();
/// while let Some(message) = subscription.recv().await {
///     process(message);
/// }
/// ```
///
/// Closing is idempotent: after [`Subscription::close`] nothing more is
/// delivered, including messages already buffered, and the publisher side
/// drops this subscriber on its next publish. Dropping the subscription has
/// the same effect.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: UnboundedReceiver<M>,
    closed: bool,
}

impl<M> Subscription<M> {
    pub fn new(receiver: UnboundedReceiver<M>) -> Self {
        Self {
            receiver,
            closed: false,
        }
    }

    /// Wait for the next message. `None` once the bus is gone or the
    /// subscription was closed.
    pub async fn recv(&mut self) -> Option<M> {
        if self.closed {
            return None;
        }
        self.receiver.recv().await
    }

    /// Try to receive a message without waiting.
    pub fn try_recv(&mut self) -> Result<M, TryRecvError> {
        if self.closed {
            return Err(TryRecvError::Disconnected);
        }
        self.receiver.try_recv()
    }

    /// Wait for up to `timeout` for the next message.
    ///
    /// `Ok(None)` means the stream ended; `Err(_)` means the timeout elapsed.
    pub async fn recv_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<M>, tokio::time::error::Elapsed> {
        if self.closed {
            return Ok(None);
        }
        tokio::time::timeout(timeout, self.receiver.recv()).await
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Stop delivery immediately and discard anything buffered. Safe to call
    /// more than once.
    pub fn close(&mut self) {
        self.closed = true;
        self.receiver.close();
        while self.receiver.try_recv().is_ok() {}
    }
}

/// Domain-agnostic pub/sub bus.
///
/// `publish()` can fail (poisoned lock, network error); failures are surfaced
/// to the caller. Implementations must be safe to share across tasks.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;

    /// Number of live subscribers, when the transport knows it.
    fn subscriber_count(&self) -> Option<usize> {
        None
    }
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }

    fn subscriber_count(&self) -> Option<usize> {
        (**self).subscriber_count()
    }
}
