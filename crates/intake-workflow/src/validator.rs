//! Action legality rules.
//!
//! Pure decision function over the actor, the candidate action kind, and
//! the submission's current projection. No I/O, no side effects; every
//! rejection is a `Validation` error carrying the user-facing message.
//! Checks run in a fixed order and the first failing check wins.

use intake_core::error::IntakeError;
use intake_core::types::{ActionKind, Projection};

fn deny(msg: String) -> Result<(), IntakeError> {
    Err(IntakeError::Validation(msg))
}

/// Decide whether `actor` may append an event of `action` kind.
pub fn validate_action(
    actor: i64,
    action: ActionKind,
    projection: &Projection,
) -> Result<(), IntakeError> {
    use ActionKind::*;

    let sid = projection.submission_id;
    let is_last_uploader = projection.last_uploader_id == Some(actor);
    let marked_added = projection.is_marked_added();
    let rejected = projection.is_rejected();

    // The uploader of the newest version may not judge their own work.
    if is_last_uploader {
        match action {
            AssignTesting | UnassignVerification => {
                return deny(format!(
                    "you are the uploader of the newest version of submission {}, so you cannot assign it",
                    sid
                ));
            }
            Approve => {
                return deny(format!(
                    "you are the uploader of the newest version of submission {}, so you cannot approve it",
                    sid
                ));
            }
            RequestChanges => {
                return deny(format!(
                    "you are the uploader of the newest version of submission {}, so you cannot request changes on it",
                    sid
                ));
            }
            Verify => {
                return deny(format!(
                    "you are the uploader of the newest version of submission {}, so you cannot verify it",
                    sid
                ));
            }
            _ => {}
        }
    }

    // Duplicate actions. Request-changes is idempotent and may repeat.
    match action {
        AssignTesting if projection.assigned_testing.contains(&actor) => {
            return deny(format!(
                "you are already assigned to test submission {}",
                sid
            ));
        }
        UnassignTesting if !projection.assigned_testing.contains(&actor) => {
            return deny(format!("you are not assigned to test submission {}", sid));
        }
        AssignVerification if projection.assigned_verification.contains(&actor) => {
            return deny(format!(
                "you are already assigned to verify submission {}",
                sid
            ));
        }
        UnassignVerification if !projection.assigned_verification.contains(&actor) => {
            return deny(format!("you are not assigned to verify submission {}", sid));
        }
        Approve if projection.approved.contains(&actor) => {
            return deny(format!("you have already approved submission {}", sid));
        }
        Verify if projection.verified.contains(&actor) => {
            return deny(format!("you have already verified submission {}", sid));
        }
        MarkAdded if marked_added => {
            return deny(format!(
                "submission {} is already marked as added so it cannot be marked again",
                sid
            ));
        }
        _ => {}
    }

    // Terminal states. Mark-added freezes the review; reject freezes the
    // submission itself.
    if marked_added {
        match action {
            AssignTesting | UnassignTesting | AssignVerification | UnassignVerification
            | Approve | Verify => {
                return deny(format!(
                    "submission {} is already marked as added so its review cannot change",
                    sid
                ));
            }
            RequestChanges => {
                return deny(format!(
                    "submission {} is already marked as added so you cannot request changes on it, \
                     please file a bug report or a pending fix if there is a problem with it",
                    sid
                ));
            }
            Reject => {
                return deny(format!(
                    "submission {} is already marked as added so you cannot reject it",
                    sid
                ));
            }
            _ => {}
        }
    }
    if rejected {
        match action {
            AssignTesting => {
                return deny(format!(
                    "submission {} is already rejected so you cannot assign it for testing",
                    sid
                ));
            }
            Reject => {
                return deny(format!(
                    "submission {} is already rejected so you cannot reject it",
                    sid
                ));
            }
            Upload => {
                return deny(format!(
                    "submission {} is already rejected so you cannot upload a new version",
                    sid
                ));
            }
            _ => {}
        }
    }

    // An actor holds at most one assignment type, and judging in one role
    // excludes the other role.
    match action {
        AssignTesting if projection.assigned_verification.contains(&actor) => {
            return deny(format!(
                "you are already assigned to verify submission {} so you cannot assign it for testing",
                sid
            ));
        }
        AssignVerification if projection.assigned_testing.contains(&actor) => {
            return deny(format!(
                "you are already assigned to test submission {} so you cannot assign it for verification",
                sid
            ));
        }
        AssignTesting if projection.verified.contains(&actor) => {
            return deny(format!(
                "you have already verified submission {} so you cannot assign it for testing",
                sid
            ));
        }
        AssignTesting if projection.approved.contains(&actor) => {
            return deny(format!(
                "you have already approved submission {} so you cannot assign it for testing",
                sid
            ));
        }
        Approve if projection.verified.contains(&actor) => {
            return deny(format!(
                "you have already verified submission {} so you cannot approve it",
                sid
            ));
        }
        AssignVerification if projection.approved.contains(&actor) => {
            return deny(format!(
                "you have already approved submission {} so you cannot assign it for verification",
                sid
            ));
        }
        AssignVerification if projection.verified.contains(&actor) => {
            return deny(format!(
                "you have already verified submission {} so you cannot assign it for verification",
                sid
            ));
        }
        Verify if projection.approved.contains(&actor) => {
            return deny(format!(
                "you have already approved submission {} so you cannot verify it",
                sid
            ));
        }
        _ => {}
    }

    // Judging requires holding the matching assignment first.
    match action {
        Approve if !projection.assigned_testing.contains(&actor) => {
            return deny(format!(
                "you are not assigned to test submission {} so you cannot approve it",
                sid
            ));
        }
        Verify if !projection.assigned_verification.contains(&actor) => {
            return deny(format!(
                "you are not assigned to verify submission {} so you cannot verify it",
                sid
            ));
        }
        _ => {}
    }

    // Stage ordering: verification needs an approval, mark-added needs a
    // verification.
    match action {
        AssignVerification if projection.approved.is_empty() => {
            return deny(format!(
                "submission {} is not approved so you cannot assign it for verification",
                sid
            ));
        }
        Verify if projection.approved.is_empty() => {
            return deny(format!(
                "submission {} is not approved so you cannot verify it",
                sid
            ));
        }
        MarkAdded if projection.verified.is_empty() => {
            return deny(format!(
                "submission {} is not verified so you cannot mark it as added",
                sid
            ));
        }
        _ => {}
    }

    Ok(())
}
