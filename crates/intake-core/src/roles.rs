//! Role names and predicates.
//!
//! Role membership comes from an external identity service; this module only
//! interprets the returned names. The service itself is behind the
//! [`RoleProvider`] trait.

use crate::error::Result;

pub const ROLE_ADMINISTRATOR: &str = "Administrator";
pub const ROLE_MODERATOR: &str = "Moderator";
pub const ROLE_CURATOR: &str = "Curator";
pub const ROLE_TESTER: &str = "Tester";
pub const ROLE_ARCHIVIST: &str = "Archivist";
pub const ROLE_TRIAL_CURATOR: &str = "Trial Curator";

/// Lookup seam to the external identity/role service.
pub trait RoleProvider: Send + Sync {
    /// Role names currently held by the user.
    fn roles_for_user(&self, user_id: i64) -> Result<Vec<String>>;
}

fn has_any_role(has: &[String], needs: &[&str]) -> bool {
    has.iter().any(|r| needs.contains(&r.as_str()))
}

/// Staff may view and act on all submissions.
pub fn is_staff(roles: &[String]) -> bool {
    has_any_role(
        roles,
        &[
            ROLE_ADMINISTRATOR,
            ROLE_MODERATOR,
            ROLE_CURATOR,
            ROLE_TESTER,
            ROLE_ARCHIVIST,
        ],
    )
}

/// Trial curators may submit and see only their own submissions.
pub fn is_trial_curator(roles: &[String]) -> bool {
    has_any_role(roles, &[ROLE_TRIAL_CURATOR])
}

/// Users in audit may submit one package and interact only with it.
pub fn is_in_audit(roles: &[String]) -> bool {
    !(is_staff(roles) || is_trial_curator(roles))
}

/// Deciders may approve, request changes, verify, and reject.
pub fn is_decider(roles: &[String]) -> bool {
    has_any_role(roles, &[ROLE_CURATOR, ROLE_TESTER])
}

/// Adders may mark a submission as added.
pub fn is_adder(roles: &[String]) -> bool {
    has_any_role(roles, &[ROLE_MODERATOR, ROLE_ADMINISTRATOR])
}

/// Deleters may soft-delete events, artifacts, and submissions.
pub fn is_deleter(roles: &[String]) -> bool {
    has_any_role(roles, &[ROLE_MODERATOR, ROLE_ADMINISTRATOR])
}
