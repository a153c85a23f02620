use serde::{Deserialize, Serialize};

/// Operations guarded by the access policy.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Create, edit or delete a listing in a given source.
    EditListing,
    /// Approve or reject a pending listing.
    ReviewListing,
    /// Re-assign any account's role.
    ChangeRole,
    /// Browse the public catalog.
    ViewCatalog,
}

impl Action {
    pub const ALL: [Action; 4] = [
        Action::EditListing,
        Action::ReviewListing,
        Action::ChangeRole,
        Action::ViewCatalog,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::EditListing => "listing.edit",
            Action::ReviewListing => "listing.review",
            Action::ChangeRole => "account.change_role",
            Action::ViewCatalog => "catalog.view",
        }
    }

    /// Whether the action is scoped to a catalog source.
    pub fn is_source_scoped(self) -> bool {
        matches!(self, Action::EditListing)
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
