//! `bazaar-auth`: pure authorization boundary.
//!
//! Authentication is someone else's job: this crate consumes an already
//! resolved [`Actor`] and answers "may this actor do that?". It is decoupled
//! from transport and storage so the same table guards the UI and the write
//! boundary.

pub mod account;
pub mod authorize;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use account::Account;
pub use authorize::{
    AuthorizationExplanation, AuthzError, authorize, can_perform, explain_authorization,
};
pub use permissions::Action;
pub use principal::Actor;
pub use roles::Role;
