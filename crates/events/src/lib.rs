//! Snapshot distribution mechanics.
//!
//! Transport-agnostic pub/sub used by the realtime stores and the moderation
//! queue: async subscriptions, an in-memory fan-out bus, and generation
//! tagging for discarding stale deliveries.

pub mod bus;
pub mod envelope;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::{Generation, Tagged};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
