use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::IntakeError;

/// Author id reserved for automated (system) events.
///
/// Events by this author never count toward derived workflow statuses.
pub const SYSTEM_AUTHOR_ID: i64 = 0;

// =============================================================================
// Enums
// =============================================================================

/// The kind of a workflow action event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    /// Plain comment, no workflow effect.
    Comment,
    /// A new artifact version was stored. Appended by the upload pipeline.
    Upload,
    AssignTesting,
    UnassignTesting,
    AssignVerification,
    UnassignVerification,
    Approve,
    RequestChanges,
    Verify,
    Reject,
    MarkAdded,
    /// Automated event authored by the system account.
    System,
}

impl ActionKind {
    /// All kinds, in a stable order.
    pub fn all() -> &'static [ActionKind] {
        &[
            ActionKind::Comment,
            ActionKind::Upload,
            ActionKind::AssignTesting,
            ActionKind::UnassignTesting,
            ActionKind::AssignVerification,
            ActionKind::UnassignVerification,
            ActionKind::Approve,
            ActionKind::RequestChanges,
            ActionKind::Verify,
            ActionKind::Reject,
            ActionKind::MarkAdded,
            ActionKind::System,
        ]
    }

    /// Kebab-case wire/storage form.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Comment => "comment",
            ActionKind::Upload => "upload",
            ActionKind::AssignTesting => "assign-testing",
            ActionKind::UnassignTesting => "unassign-testing",
            ActionKind::AssignVerification => "assign-verification",
            ActionKind::UnassignVerification => "unassign-verification",
            ActionKind::Approve => "approve",
            ActionKind::RequestChanges => "request-changes",
            ActionKind::Verify => "verify",
            ActionKind::Reject => "reject",
            ActionKind::MarkAdded => "mark-added",
            ActionKind::System => "system",
        }
    }

    /// Kinds a user may submit directly through the comment endpoint.
    ///
    /// Upload arrives via the artifact pipeline once a file is durably
    /// stored; system is reserved for the automated author.
    pub fn is_user_submittable(&self) -> bool {
        !matches!(self, ActionKind::Upload | ActionKind::System)
    }

    /// Kinds that cannot be posted without a message.
    pub fn requires_message(&self) -> bool {
        matches!(
            self,
            ActionKind::Comment | ActionKind::RequestChanges | ActionKind::Reject
        )
    }

    /// Kinds whose message is discarded even if one was supplied.
    pub fn strips_message(&self) -> bool {
        matches!(
            self,
            ActionKind::AssignTesting
                | ActionKind::UnassignTesting
                | ActionKind::AssignVerification
                | ActionKind::UnassignVerification
        )
    }

    /// Kinds that produce a notification to subscribers.
    pub fn notifies(&self) -> bool {
        matches!(
            self,
            ActionKind::Comment
                | ActionKind::Approve
                | ActionKind::RequestChanges
                | ActionKind::MarkAdded
                | ActionKind::Upload
                | ActionKind::Reject
        )
    }

    /// Kinds that auto-subscribe the acting author to the submission.
    pub fn subscribes_author(&self) -> bool {
        matches!(
            self,
            ActionKind::AssignTesting
                | ActionKind::UnassignTesting
                | ActionKind::AssignVerification
                | ActionKind::UnassignVerification
                | ActionKind::Approve
                | ActionKind::RequestChanges
                | ActionKind::Verify
                | ActionKind::Reject
        )
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = IntakeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::all()
            .iter()
            .find(|k| k.as_str() == s)
            .copied()
            .ok_or_else(|| IntakeError::Validation(format!("invalid action '{}'", s)))
    }
}

/// Lifecycle level of a submission, set by the submitter's standing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubmissionLevel {
    /// First submission of a user under audit.
    Audition,
    /// Submission by a trial curator.
    Trial,
    /// Submission by a staff member.
    Staff,
}

impl SubmissionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionLevel::Audition => "audition",
            SubmissionLevel::Trial => "trial",
            SubmissionLevel::Staff => "staff",
        }
    }
}

impl fmt::Display for SubmissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionLevel {
    type Err = IntakeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audition" => Ok(SubmissionLevel::Audition),
            "trial" => Ok(SubmissionLevel::Trial),
            "staff" => Ok(SubmissionLevel::Staff),
            other => Err(IntakeError::Validation(format!(
                "invalid submission level '{}'",
                other
            ))),
        }
    }
}

/// Routing class for a queued notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    /// Personal mentions channel.
    Default,
    /// Public feed announcing new uploads.
    CurationFeed,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Default => "default",
            NotificationKind::CurationFeed => "curation-feed",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = IntakeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(NotificationKind::Default),
            "curation-feed" => Ok(NotificationKind::CurationFeed),
            other => Err(IntakeError::Storage(format!(
                "invalid notification kind '{}'",
                other
            ))),
        }
    }
}

// =============================================================================
// Records
// =============================================================================

/// One submitted content package under review.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    pub level: SubmissionLevel,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// One immutable workflow action taken on a submission.
///
/// Mutable only through soft delete. Events order by `(created_at, id)`;
/// ids are assigned monotonically so insertion order breaks timestamp ties.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionEvent {
    pub id: i64,
    pub submission_id: i64,
    pub author_id: i64,
    pub action: ActionKind,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub delete_reason: Option<String>,
}

impl ActionEvent {
    /// Ordering key: creation time, then insertion order.
    pub fn order_key(&self) -> (i64, i64) {
        (self.created_at.timestamp(), self.id)
    }
}

/// One uploaded file version of a submission. Append-only, soft-deletable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArtifactVersion {
    pub id: i64,
    pub submission_id: i64,
    pub uploader_id: i64,
    pub original_filename: String,
    pub size: i64,
    pub md5: String,
    pub sha256: String,
    pub uploaded_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub delete_reason: Option<String>,
}

/// Metadata for an artifact the upload pipeline has durably stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub original_filename: String,
    pub size: i64,
    pub md5: String,
    pub sha256: String,
}

/// Derived, rebuildable per-submission view of the event log.
///
/// Never authoritative: every field is recomputed from the non-deleted
/// events and artifacts inside the transaction that mutated them. Id lists
/// are kept sorted so two rebuilds of the same history are byte-identical.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub submission_id: i64,
    pub newest_artifact_id: Option<i64>,
    pub oldest_artifact_id: Option<i64>,
    pub newest_event_id: Option<i64>,
    /// Uploader of the newest non-deleted artifact, for the self-review guard.
    pub last_uploader_id: Option<i64>,
    pub assigned_testing: Vec<i64>,
    pub assigned_verification: Vec<i64>,
    pub requested_changes: Vec<i64>,
    pub approved: Vec<i64>,
    pub verified: Vec<i64>,
    /// Every action kind that appears on a non-deleted event.
    pub distinct_actions: Vec<ActionKind>,
    /// Kind of the newest non-deleted system-authored event, if any.
    pub system_action: Option<ActionKind>,
}

impl Projection {
    pub fn empty(submission_id: i64) -> Self {
        Self {
            submission_id,
            ..Default::default()
        }
    }

    pub fn has_action(&self, kind: ActionKind) -> bool {
        self.distinct_actions.contains(&kind)
    }

    pub fn is_marked_added(&self) -> bool {
        self.has_action(ActionKind::MarkAdded)
    }

    pub fn is_rejected(&self) -> bool {
        self.has_action(ActionKind::Reject)
    }
}

/// One queued outbox message. Created by the coordinator, mutated only by
/// the dispatcher (which sets `sent_at`), never deleted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: i64,
    pub message: String,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}
