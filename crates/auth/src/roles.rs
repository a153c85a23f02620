use core::str::FromStr;

use serde::{Deserialize, Serialize};

use bazaar_core::{DomainError, Source};

/// Role assigned to an account. Exactly one per account.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    User,
    MainAdmin,
    AmazonSemiAdmin,
    LocalSemiAdmin,
    SoftwareSemiAdmin,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::User,
        Role::MainAdmin,
        Role::AmazonSemiAdmin,
        Role::LocalSemiAdmin,
        Role::SoftwareSemiAdmin,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::MainAdmin => "main-admin",
            Role::AmazonSemiAdmin => "amazon-semi-admin",
            Role::LocalSemiAdmin => "local-semi-admin",
            Role::SoftwareSemiAdmin => "software-semi-admin",
        }
    }

    /// The contributor role that owns `source`.
    pub fn semi_admin_for(source: Source) -> Self {
        match source {
            Source::Amazon => Role::AmazonSemiAdmin,
            Source::Local => Role::LocalSemiAdmin,
            Source::Software => Role::SoftwareSemiAdmin,
        }
    }

    /// The source a semi-admin contributes to, if any.
    pub fn managed_source(self) -> Option<Source> {
        match self {
            Role::AmazonSemiAdmin => Some(Source::Amazon),
            Role::LocalSemiAdmin => Some(Source::Local),
            Role::SoftwareSemiAdmin => Some(Source::Software),
            Role::User | Role::MainAdmin => None,
        }
    }

    pub fn is_main_admin(self) -> bool {
        self == Role::MainAdmin
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s.trim())
            .ok_or_else(|| DomainError::validation(format!("unknown role '{s}'")))
    }
}
