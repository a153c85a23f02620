//! The moderation queue: fan-in of the three source feeds and review actions.

pub mod coordinator;
pub mod merge;
pub mod queue;

pub use coordinator::{ActionCoordinator, ActionError, ItemKey};
pub use merge::{ConsolidatedView, MergeEngine, MergeOutcome};
pub use queue::ModerationQueue;
