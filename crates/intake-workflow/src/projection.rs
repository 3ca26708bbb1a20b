//! Projection rebuild.
//!
//! Derives "who currently holds which workflow status" from the action
//! event log and the artifact log. The rebuild is from scratch on every
//! mutation; event volume per submission is small, so correctness wins
//! over incremental updates.
//!
//! A status is granted by its enabling kind and revoked by any of its
//! disabling kinds. Per author, only the latest enabling and latest
//! disabling event matter: the author is active iff the enabler exists,
//! postdates the newest artifact upload, and is newer than the disabler.
//! Events compare by `(created_at, id)` so two events in the same second
//! resolve to insertion order.

use std::collections::{BTreeMap, BTreeSet};

use intake_core::types::{
    ActionEvent, ActionKind, ArtifactVersion, Projection, SYSTEM_AUTHOR_ID,
};

/// One derived status: which kind grants it and which kinds revoke it.
///
/// `scoped_to_newest_artifact` keeps the upload-recency cutoff explicit per
/// status; a new upload invalidates enabling events that precede it.
#[derive(Debug, Clone, Copy)]
pub struct TrackedStatus {
    pub enabler: ActionKind,
    pub disablers: &'static [ActionKind],
    pub scoped_to_newest_artifact: bool,
}

/// The five tracked status pairs, in projection field order.
pub const TRACKED_STATUSES: [TrackedStatus; 5] = [
    TrackedStatus {
        enabler: ActionKind::AssignTesting,
        disablers: &[ActionKind::UnassignTesting],
        scoped_to_newest_artifact: true,
    },
    TrackedStatus {
        enabler: ActionKind::AssignVerification,
        disablers: &[ActionKind::UnassignVerification],
        scoped_to_newest_artifact: true,
    },
    TrackedStatus {
        enabler: ActionKind::RequestChanges,
        disablers: &[ActionKind::Approve, ActionKind::Verify],
        scoped_to_newest_artifact: true,
    },
    TrackedStatus {
        enabler: ActionKind::Approve,
        disablers: &[ActionKind::RequestChanges],
        scoped_to_newest_artifact: true,
    },
    TrackedStatus {
        enabler: ActionKind::Verify,
        disablers: &[ActionKind::RequestChanges],
        scoped_to_newest_artifact: true,
    },
];

/// Rebuild the projection for a submission from its full history.
///
/// Deleted events and artifacts are ignored; inputs need not be sorted.
/// Output id lists are sorted, so rebuilding the same history twice yields
/// identical results.
pub fn rebuild(
    submission_id: i64,
    events: &[ActionEvent],
    artifacts: &[ArtifactVersion],
) -> Projection {
    let mut live_events: Vec<&ActionEvent> =
        events.iter().filter(|e| e.deleted_at.is_none()).collect();
    live_events.sort_by_key(|e| e.order_key());

    let mut live_artifacts: Vec<&ArtifactVersion> = artifacts
        .iter()
        .filter(|a| a.deleted_at.is_none())
        .collect();
    live_artifacts.sort_by_key(|a| (a.uploaded_at.timestamp(), a.id));

    let newest_artifact = live_artifacts.last();
    // Upload recency cutoff in whole seconds; an enabling event in the same
    // second as the upload does not survive it.
    let upload_cutoff = newest_artifact.map(|a| a.uploaded_at.timestamp());

    let mut projection = Projection::empty(submission_id);
    projection.newest_artifact_id = newest_artifact.map(|a| a.id);
    projection.oldest_artifact_id = live_artifacts.first().map(|a| a.id);
    projection.last_uploader_id = newest_artifact.map(|a| a.uploader_id);
    projection.newest_event_id = live_events.last().map(|e| e.id);

    let mut active_sets: [Vec<i64>; 5] = Default::default();
    for (status, out) in TRACKED_STATUSES.iter().zip(active_sets.iter_mut()) {
        *out = active_authors(&live_events, status, upload_cutoff);
    }
    let [assigned_testing, assigned_verification, requested_changes, approved, verified] =
        active_sets;
    projection.assigned_testing = assigned_testing;
    projection.assigned_verification = assigned_verification;
    projection.requested_changes = requested_changes;
    projection.approved = approved;
    projection.verified = verified;

    let distinct: BTreeSet<ActionKind> = live_events.iter().map(|e| e.action).collect();
    projection.distinct_actions = distinct.into_iter().collect();

    projection.system_action = live_events
        .iter()
        .rev()
        .find(|e| e.author_id == SYSTEM_AUTHOR_ID)
        .map(|e| e.action);

    // A rejected submission holds no live statuses.
    if projection.is_rejected() {
        projection.assigned_testing.clear();
        projection.assigned_verification.clear();
        projection.requested_changes.clear();
        projection.approved.clear();
        projection.verified.clear();
    }

    projection
}

/// Authors currently active for one tracked status, sorted.
fn active_authors(
    live_events: &[&ActionEvent],
    status: &TrackedStatus,
    upload_cutoff: Option<i64>,
) -> Vec<i64> {
    // Per author, the ordering key of their latest enabler and disabler.
    let mut latest_enabler: BTreeMap<i64, (i64, i64)> = BTreeMap::new();
    let mut latest_disabler: BTreeMap<i64, (i64, i64)> = BTreeMap::new();

    for event in live_events {
        if event.author_id == SYSTEM_AUTHOR_ID {
            continue;
        }
        if status.scoped_to_newest_artifact {
            if let Some(cutoff) = upload_cutoff {
                if event.created_at.timestamp() <= cutoff {
                    continue;
                }
            }
        }
        // Events arrive in ascending order, so the last write wins.
        if event.action == status.enabler {
            latest_enabler.insert(event.author_id, event.order_key());
        } else if status.disablers.contains(&event.action) {
            latest_disabler.insert(event.author_id, event.order_key());
        }
    }

    latest_enabler
        .into_iter()
        .filter(|(author, enabled)| match latest_disabler.get(author) {
            Some(disabled) => enabled > disabled,
            None => true,
        })
        .map(|(author, _)| author)
        .collect()
}
