use serde::{Deserialize, Serialize};

use bazaar_core::ActorId;

use crate::Role;

/// An already-resolved identity performing an operation.
///
/// Passed explicitly into every guarded operation; nothing in the workspace
/// looks the current actor up from ambient state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub email: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<ActorId>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            role,
        }
    }
}
