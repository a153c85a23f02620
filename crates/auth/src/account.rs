use serde::{Deserialize, Serialize};

use bazaar_core::AccountId;

use crate::Role;

/// A registered account and its single role assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub role: Role,
}

impl Account {
    pub fn new(id: impl Into<AccountId>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            role,
        }
    }
}
