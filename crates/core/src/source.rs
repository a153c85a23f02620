//! Catalog partitions ("sources").

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// One of the three independently-updated catalog partitions.
///
/// The declaration order is the consolidated display order: amazon, then
/// local, then software.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Amazon,
    Local,
    Software,
}

impl Source {
    /// All sources in consolidated order.
    pub const ALL: [Source; 3] = [Source::Amazon, Source::Local, Source::Software];

    pub fn as_str(self) -> &'static str {
        match self {
            Source::Amazon => "amazon",
            Source::Local => "local",
            Source::Software => "software",
        }
    }

    /// Name of the backing collection for this partition.
    pub fn collection_name(self) -> &'static str {
        match self {
            Source::Amazon => "amazon_listings",
            Source::Local => "local_listings",
            Source::Software => "software_listings",
        }
    }

    /// Maximum number of image references a listing may carry.
    pub fn max_images(self) -> usize {
        match self {
            Source::Amazon | Source::Local => 5,
            Source::Software => 3,
        }
    }
}

impl core::fmt::Display for Source {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "amazon" => Ok(Source::Amazon),
            "local" => Ok(Source::Local),
            "software" => Ok(Source::Software),
            other => Err(DomainError::validation(format!("unknown source '{other}'"))),
        }
    }
}
