//! Contributor input and its validation.
//!
//! Validation happens locally, before anything reaches a store. Errors are
//! reported per field so a form can render them inline.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;
use url::Url;

use bazaar_core::Source;

use crate::pricing::{DiscountPercent, Money};

/// Listing data as submitted by a contributor.
///
/// Carries no final price: the derived price is always computed at the write
/// boundary.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ListingDraft {
    pub title: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub quantity: i64,
    #[serde(default)]
    pub images: Vec<String>,
    pub original_price: Decimal,
    #[serde(default)]
    pub discount_percent: Decimal,
    /// Source-specific fields, passed through untouched.
    #[serde(default)]
    pub extras: Map<String, JsonValue>,
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl core::fmt::Display for FieldError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// All validation failures of a draft.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid listing: {}", format_fields(.0))]
pub struct ValidationErrors(Vec<FieldError>);

fn format_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    /// First message reported for `field`, if any.
    pub fn for_field(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }
}

/// A draft that passed validation for a specific source.
///
/// Only obtainable through [`ListingDraft::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidDraft {
    pub(crate) source: Source,
    pub(crate) title: String,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) quantity: u32,
    pub(crate) images: Vec<String>,
    pub(crate) original_price: Money,
    pub(crate) discount_percent: DiscountPercent,
    pub(crate) extras: Map<String, JsonValue>,
}

impl ValidDraft {
    pub fn source(&self) -> Source {
        self.source
    }
}

impl ListingDraft {
    /// Validate for `source`, collecting every field error.
    pub fn validate(&self, source: Source) -> Result<ValidDraft, ValidationErrors> {
        let mut errors = Vec::new();

        let title = self.title.trim();
        if title.is_empty() {
            errors.push(FieldError::new("title", "title is required"));
        }
        let name = self.name.trim();
        if name.is_empty() {
            errors.push(FieldError::new("name", "name is required"));
        }

        let quantity = match u32::try_from(self.quantity) {
            Ok(q) => q,
            Err(_) if self.quantity < 0 => {
                errors.push(FieldError::new("quantity", "quantity cannot be negative"));
                0
            }
            Err(_) => {
                errors.push(FieldError::new("quantity", "quantity is too large"));
                0
            }
        };

        let original_price = Money::new(self.original_price).unwrap_or_else(|_| {
            errors.push(FieldError::new("original_price", "price cannot be negative"));
            Money::ZERO
        });
        let discount_percent = DiscountPercent::new(self.discount_percent).unwrap_or_else(|_| {
            errors.push(FieldError::new(
                "discount_percent",
                "discount must be between 0 and 100",
            ));
            DiscountPercent::NONE
        });

        let max_images = source.max_images();
        if self.images.len() > max_images {
            errors.push(FieldError::new(
                "images",
                format!("at most {max_images} images are allowed for {source}"),
            ));
        }
        for image in &self.images {
            if !is_image_url(image) {
                errors.push(FieldError::new(
                    "images",
                    format!("'{image}' is not a valid http(s) URL"),
                ));
            }
        }

        if !errors.is_empty() {
            return Err(ValidationErrors(errors));
        }

        Ok(ValidDraft {
            source,
            title: title.to_string(),
            name: name.to_string(),
            description: self.description.trim().to_string(),
            quantity,
            images: self.images.clone(),
            original_price,
            discount_percent,
            extras: self.extras.clone(),
        })
    }
}

fn is_image_url(candidate: &str) -> bool {
    match Url::parse(candidate) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}
