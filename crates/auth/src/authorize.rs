use serde::Serialize;
use thiserror::Error;

use bazaar_core::Source;

use crate::{Action, Actor, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: role '{role}' may not perform '{action}'{}", scope_suffix(*.target))]
    Forbidden {
        role: Role,
        action: Action,
        target: Option<Source>,
    },

    #[error("forbidden: '{0}' requires a target source")]
    MissingTarget(Action),
}

fn scope_suffix(source: Option<Source>) -> String {
    source.map(|s| format!(" on '{s}'")).unwrap_or_default()
}

/// The access policy: the single source of truth for authorization.
///
/// | Action          | Permitted roles                                   |
/// |-----------------|---------------------------------------------------|
/// | `EditListing`   | semi-admin of the target source, or main-admin    |
/// | `ReviewListing` | main-admin                                        |
/// | `ChangeRole`    | main-admin                                        |
/// | `ViewCatalog`   | anyone, including unauthenticated (`None`)        |
///
/// Anything not in the table is denied. Pure: no IO, no panics.
pub fn can_perform(role: Option<Role>, action: Action, target: Option<Source>) -> bool {
    match action {
        Action::ViewCatalog => true,
        Action::EditListing => match (role, target) {
            (Some(role), Some(_)) if role.is_main_admin() => true,
            (Some(role), Some(source)) => role.managed_source() == Some(source),
            _ => false,
        },
        Action::ReviewListing | Action::ChangeRole => role.is_some_and(Role::is_main_admin),
    }
}

/// Authorize an actor at the write boundary.
///
/// Must be called before any store call of a guarded operation.
pub fn authorize(actor: &Actor, action: Action, target: Option<Source>) -> Result<(), AuthzError> {
    if action.is_source_scoped() && target.is_none() {
        return Err(AuthzError::MissingTarget(action));
    }

    if can_perform(Some(actor.role), action, target) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden {
            role: actor.role,
            action,
            target,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed, auditable explanation of an authorization decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub action: Action,
    pub target: Option<Source>,
    pub role: Option<Role>,
    pub granted: bool,
    /// Human-readable reason for the decision.
    pub reason: String,
    /// Roles that would be granted the action on the same target.
    pub granting_roles: Vec<Role>,
}

/// Explain why an authorization decision was made (or would be made).
///
/// `role` is `None` for an unauthenticated visitor.
pub fn explain_authorization(
    role: Option<Role>,
    action: Action,
    target: Option<Source>,
) -> AuthorizationExplanation {
    let granted = can_perform(role, action, target);
    let granting_roles: Vec<Role> = Role::ALL
        .into_iter()
        .filter(|r| can_perform(Some(*r), action, target))
        .collect();

    let who = role.map(|r| r.as_str()).unwrap_or("anonymous");
    let reason = if granted {
        match action {
            Action::ViewCatalog => "the public catalog is visible to everyone".to_string(),
            _ if role.is_some_and(Role::is_main_admin) => {
                format!("'{who}' is the central authority and may perform '{action}'")
            }
            _ => format!(
                "'{who}' contributes to '{}' and may perform '{action}'",
                target.map(Source::as_str).unwrap_or("-")
            ),
        }
    } else if action.is_source_scoped() && target.is_none() {
        format!("'{action}' must name the source it applies to")
    } else {
        let allowed: Vec<&str> = granting_roles.iter().map(|r| r.as_str()).collect();
        format!(
            "'{who}' may not perform '{action}'{}; allowed roles: {allowed:?}",
            scope_suffix(target)
        )
    };

    AuthorizationExplanation {
        action,
        target,
        role,
        granted,
        reason,
        granting_roles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role) -> Actor {
        Actor::new("actor-1", "someone@example.com", role)
    }

    #[test]
    fn semi_admin_may_only_edit_own_source() {
        let local = actor(Role::LocalSemiAdmin);
        assert!(authorize(&local, Action::EditListing, Some(Source::Local)).is_ok());

        let err = authorize(&local, Action::EditListing, Some(Source::Amazon)).unwrap_err();
        assert_eq!(
            err,
            AuthzError::Forbidden {
                role: Role::LocalSemiAdmin,
                action: Action::EditListing,
                target: Some(Source::Amazon),
            }
        );
    }

    #[test]
    fn main_admin_may_edit_every_source() {
        let admin = actor(Role::MainAdmin);
        for source in Source::ALL {
            assert!(authorize(&admin, Action::EditListing, Some(source)).is_ok());
        }
    }

    #[test]
    fn only_main_admin_reviews_and_changes_roles() {
        for role in Role::ALL {
            let expected = role == Role::MainAdmin;
            assert_eq!(can_perform(Some(role), Action::ReviewListing, None), expected);
            assert_eq!(can_perform(Some(role), Action::ChangeRole, None), expected);
        }
        assert!(!can_perform(None, Action::ReviewListing, None));
    }

    #[test]
    fn local_semi_admin_cannot_approve() {
        let err = authorize(&actor(Role::LocalSemiAdmin), Action::ReviewListing, Some(Source::Local))
            .unwrap_err();
        assert!(matches!(err, AuthzError::Forbidden { .. }));
    }

    #[test]
    fn everyone_views_the_catalog() {
        assert!(can_perform(None, Action::ViewCatalog, None));
        for role in Role::ALL {
            assert!(can_perform(Some(role), Action::ViewCatalog, Some(Source::Software)));
        }
    }

    #[test]
    fn edit_without_target_is_denied() {
        let err = authorize(&actor(Role::MainAdmin), Action::EditListing, None).unwrap_err();
        assert_eq!(err, AuthzError::MissingTarget(Action::EditListing));
    }

    #[test]
    fn forbidden_message_names_role_action_and_source() {
        let err = authorize(&actor(Role::User), Action::EditListing, Some(Source::Local)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "forbidden: role 'user' may not perform 'listing.edit' on 'local'"
        );
    }

    #[test]
    fn explanation_lists_granting_roles_on_denial() {
        let exp = explain_authorization(Some(Role::User), Action::EditListing, Some(Source::Software));
        assert!(!exp.granted);
        assert_eq!(exp.granting_roles, vec![Role::MainAdmin, Role::SoftwareSemiAdmin]);
        assert!(exp.reason.contains("software-semi-admin"));
    }

    #[test]
    fn explanation_for_granted_contributor() {
        let exp = explain_authorization(
            Some(Role::AmazonSemiAdmin),
            Action::EditListing,
            Some(Source::Amazon),
        );
        assert!(exp.granted);
        assert!(exp.reason.contains("contributes to 'amazon'"));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        /// Explicit allow-list mirroring the policy table.
        fn allowed(role: Option<Role>, action: Action, target: Option<Source>) -> bool {
            match (role, action, target) {
                (_, Action::ViewCatalog, _) => true,
                (Some(Role::MainAdmin), Action::ReviewListing, _) => true,
                (Some(Role::MainAdmin), Action::ChangeRole, _) => true,
                (Some(Role::MainAdmin), Action::EditListing, Some(_)) => true,
                (Some(Role::AmazonSemiAdmin), Action::EditListing, Some(Source::Amazon)) => true,
                (Some(Role::LocalSemiAdmin), Action::EditListing, Some(Source::Local)) => true,
                (Some(Role::SoftwareSemiAdmin), Action::EditListing, Some(Source::Software)) => true,
                _ => false,
            }
        }

        fn any_role() -> impl Strategy<Value = Option<Role>> {
            prop::option::of(prop::sample::select(Role::ALL.to_vec()))
        }

        fn any_action() -> impl Strategy<Value = Action> {
            prop::sample::select(Action::ALL.to_vec())
        }

        fn any_target() -> impl Strategy<Value = Option<Source>> {
            prop::option::of(prop::sample::select(Source::ALL.to_vec()))
        }

        proptest! {
            /// Property: every pair outside the table is denied, every pair inside is granted.
            #[test]
            fn policy_matches_table(role in any_role(), action in any_action(), target in any_target()) {
                prop_assert_eq!(can_perform(role, action, target), allowed(role, action, target));
            }

            /// Property: explanation and decision never disagree.
            #[test]
            fn explanation_agrees_with_decision(role in any_role(), action in any_action(), target in any_target()) {
                let exp = explain_authorization(role, action, target);
                prop_assert_eq!(exp.granted, can_perform(role, action, target));
            }
        }
    }
}
