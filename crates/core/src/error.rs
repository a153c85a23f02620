//! Errors raised by domain rules.
//!
//! Only deterministic failures live here: a bad value, a broken invariant, or
//! a lifecycle transition that is no longer possible. Authorization and store
//! failures have their own types in the crates that own those concerns.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Input outside its allowed range or format.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The record is in a state that forbids the transition (for example
    /// approving a listing that was already rejected).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        assert_eq!(
            DomainError::conflict("already approved").to_string(),
            "conflict: already approved"
        );
        assert_eq!(
            DomainError::validation("price cannot be negative").to_string(),
            "validation failed: price cannot be negative"
        );
    }

    #[test]
    fn helpers_pick_the_matching_variant() {
        assert!(matches!(DomainError::conflict("x"), DomainError::Conflict(_)));
        assert!(matches!(DomainError::invalid_id("x"), DomainError::InvalidId(_)));
    }
}
