//! The workflow coordinator.
//!
//! Every mutation runs as one transaction: validate against the current
//! projection, append the event(s), rebuild and store the projection, and
//! enqueue any outbox messages. Only after the commit does the coordinator
//! signal the dispatcher, so a delivered notification always refers to
//! durable state.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use tracing::{debug, info};

use intake_core::error::{IntakeError, Result};
use intake_core::types::{ActionKind, ArtifactMeta, NotificationKind, Projection, SubmissionLevel};
use intake_notify::DispatcherHandle;
use intake_storage::{
    artifacts, events, notifications, projection as projection_store, submissions, Database,
};

use crate::projection::rebuild;
use crate::render::{self, DeletedItem};
use crate::validator::validate_action;

/// Time source, injectable so tests can control event timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The wall clock.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Entry point for all submission mutations.
pub struct WorkflowCoordinator {
    db: Arc<Database>,
    dispatcher: DispatcherHandle,
    clock: Arc<dyn Clock>,
    base_url: String,
}

impl WorkflowCoordinator {
    pub fn new(db: Arc<Database>, dispatcher: DispatcherHandle, base_url: &str) -> Self {
        Self::with_clock(db, dispatcher, base_url, Arc::new(SystemClock))
    }

    pub fn with_clock(
        db: Arc<Database>,
        dispatcher: DispatcherHandle,
        base_url: &str,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            db,
            dispatcher,
            clock,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Append one user action to one submission, returning the event id.
    pub fn append_action(
        &self,
        author_id: i64,
        submission_id: i64,
        action: ActionKind,
        message: Option<&str>,
    ) -> Result<i64> {
        let appended = self.append_actions(author_id, &[submission_id], action, message, false)?;
        // One submission, no skipping: exactly one id comes back.
        appended
            .into_iter()
            .next()
            .ok_or_else(|| IntakeError::Storage("append produced no event".to_string()))
    }

    /// Append the same action to a batch of submissions atomically.
    ///
    /// All events commit together or not at all. With `ignore_invalid` set,
    /// submissions that fail validation are skipped instead of failing the
    /// batch; any other error still rolls everything back. Returns the ids
    /// of the events actually appended.
    pub fn append_actions(
        &self,
        author_id: i64,
        submission_ids: &[i64],
        action: ActionKind,
        message: Option<&str>,
        ignore_invalid: bool,
    ) -> Result<Vec<i64>> {
        if submission_ids.is_empty() {
            return Err(IntakeError::Validation(
                "no submissions specified".to_string(),
            ));
        }
        if !action.is_user_submittable() {
            return Err(IntakeError::Validation(format!(
                "action '{}' cannot be submitted directly",
                action
            )));
        }
        if action.requires_message() && message.map_or(true, |m| m.trim().is_empty()) {
            return Err(IntakeError::Validation(
                "a message is required for this action".to_string(),
            ));
        }
        if submission_ids.len() > 1
            && matches!(action, ActionKind::RequestChanges | ActionKind::Reject)
        {
            return Err(IntakeError::Validation(format!(
                "action '{}' cannot be applied to multiple submissions at once",
                action
            )));
        }

        let message = if action.strips_message() { None } else { message };

        let appended = self.db.with_tx(|tx| {
            // Existence first, so a bad id fails the batch before any write.
            for sid in submission_ids {
                submissions::get_live_submission(tx, *sid)?;
            }

            let mut appended = Vec::new();
            for sid in submission_ids {
                if let Some(event_id) =
                    self.append_one(tx, author_id, *sid, action, message, ignore_invalid)?
                {
                    appended.push(event_id);
                }
            }
            Ok(appended)
        })?;

        self.dispatcher.signal();
        info!(
            "user {} applied '{}' to {} submission(s)",
            author_id,
            action,
            appended.len()
        );
        Ok(appended)
    }

    fn append_one(
        &self,
        conn: &Connection,
        author_id: i64,
        submission_id: i64,
        action: ActionKind,
        message: Option<&str>,
        ignore_invalid: bool,
    ) -> Result<Option<i64>> {
        let view = rebuild_from_store(conn, submission_id)?;
        if let Err(e) = validate_action(author_id, action, &view) {
            match e {
                IntakeError::Validation(_) if ignore_invalid => {
                    debug!(
                        "skipping submission {}: '{}' not allowed: {}",
                        submission_id, action, e
                    );
                    return Ok(None);
                }
                other => return Err(other),
            }
        }

        let now = self.clock.now();
        if action.subscribes_author() {
            notifications::subscribe(conn, author_id, submission_id)?;
        }

        let event_id = events::insert_event(conn, submission_id, author_id, action, message, now)?;

        // Approving or verifying releases the matching assignment one second
        // later, so the release always orders after the judgement.
        match action {
            ActionKind::Approve => {
                events::insert_event(
                    conn,
                    submission_id,
                    author_id,
                    ActionKind::UnassignTesting,
                    None,
                    now + Duration::seconds(1),
                )?;
            }
            ActionKind::Verify => {
                events::insert_event(
                    conn,
                    submission_id,
                    author_id,
                    ActionKind::UnassignVerification,
                    None,
                    now + Duration::seconds(1),
                )?;
            }
            _ => {}
        }

        if action.notifies() {
            let recipients =
                notifications::recipients_for_action(conn, author_id, submission_id, action)?;
            if !recipients.is_empty() {
                let msg = render::action_notice(
                    &self.base_url,
                    author_id,
                    submission_id,
                    action,
                    &recipients,
                );
                notifications::enqueue_notification(conn, &msg, NotificationKind::Default, now)?;
            }
        }

        recompute_and_store(conn, submission_id, now)?;
        Ok(Some(event_id))
    }

    /// Record a durably stored upload: new submission when `existing` is
    /// None, new version otherwise. Returns `(submission_id, artifact_id)`.
    pub fn record_upload(
        &self,
        uploader_id: i64,
        existing: Option<i64>,
        level: SubmissionLevel,
        meta: &ArtifactMeta,
    ) -> Result<(i64, i64)> {
        let now = self.clock.now();
        let result = self.db.with_tx(|tx| {
            let (submission_id, is_new) = match existing {
                Some(sid) => {
                    submissions::get_live_submission(tx, sid)?;
                    let view = rebuild_from_store(tx, sid)?;
                    validate_action(uploader_id, ActionKind::Upload, &view)?;
                    (sid, false)
                }
                None => (submissions::create_submission(tx, level, now)?, true),
            };

            let artifact_id = artifacts::insert_artifact(tx, submission_id, uploader_id, meta, now)?;
            events::insert_event(tx, submission_id, uploader_id, ActionKind::Upload, None, now)?;
            notifications::subscribe(tx, uploader_id, submission_id)?;

            let recipients =
                notifications::recipients_for_action(tx, uploader_id, submission_id, ActionKind::Upload)?;
            if !recipients.is_empty() {
                let msg = render::action_notice(
                    &self.base_url,
                    uploader_id,
                    submission_id,
                    ActionKind::Upload,
                    &recipients,
                );
                notifications::enqueue_notification(tx, &msg, NotificationKind::Default, now)?;
            }

            // Public feed announcement, sent regardless of subscribers.
            let feed = render::upload_feed(&self.base_url, uploader_id, submission_id, is_new);
            notifications::enqueue_notification(tx, &feed, NotificationKind::CurationFeed, now)?;

            recompute_and_store(tx, submission_id, now)?;
            Ok((submission_id, artifact_id))
        })?;

        self.dispatcher.signal();
        info!(
            "user {} uploaded artifact {} to submission {}",
            uploader_id, result.1, result.0
        );
        Ok(result)
    }

    /// The current projection of a live submission.
    pub fn get_projection(&self, submission_id: i64) -> Result<Projection> {
        self.db.with_conn(|conn| {
            submissions::get_live_submission(conn, submission_id)?;
            projection_store::read_projection(conn, submission_id)?.ok_or_else(|| {
                IntakeError::Storage(format!(
                    "projection row missing for submission {}",
                    submission_id
                ))
            })
        })
    }

    /// Soft-delete one event and recompute. Notifies the event's author
    /// unless they deleted it themselves.
    pub fn soft_delete_event(&self, deleter_id: i64, event_id: i64, reason: &str) -> Result<()> {
        let now = self.clock.now();
        self.db.with_tx(|tx| {
            let event = events::get_event(tx, event_id)?
                .ok_or_else(|| IntakeError::NotFound(format!("event {}", event_id)))?;
            events::soft_delete_event(tx, event_id, reason, now)?;

            if event.author_id != deleter_id {
                let msg = render::deletion_notice(
                    &self.base_url,
                    event.author_id,
                    deleter_id,
                    event.submission_id,
                    DeletedItem::Event(event_id),
                    reason,
                );
                notifications::enqueue_notification(tx, &msg, NotificationKind::Default, now)?;
            }

            recompute_and_store(tx, event.submission_id, now)
        })?;

        self.dispatcher.signal();
        info!("user {} deleted event {}: {}", deleter_id, event_id, reason);
        Ok(())
    }

    /// Soft-delete one artifact version and recompute.
    ///
    /// Refused with [`IntakeError::LastArtifact`] when it is the
    /// submission's only live version; nothing changes in that case.
    pub fn soft_delete_artifact(
        &self,
        deleter_id: i64,
        artifact_id: i64,
        reason: &str,
    ) -> Result<()> {
        let now = self.clock.now();
        self.db.with_tx(|tx| {
            let artifact = artifacts::get_artifact(tx, artifact_id)?
                .ok_or_else(|| IntakeError::NotFound(format!("artifact {}", artifact_id)))?;
            artifacts::soft_delete_artifact(tx, artifact_id, reason, now)?;

            if artifact.uploader_id != deleter_id {
                let msg = render::deletion_notice(
                    &self.base_url,
                    artifact.uploader_id,
                    deleter_id,
                    artifact.submission_id,
                    DeletedItem::Artifact(artifact_id),
                    reason,
                );
                notifications::enqueue_notification(tx, &msg, NotificationKind::Default, now)?;
            }

            recompute_and_store(tx, artifact.submission_id, now)
        })?;

        self.dispatcher.signal();
        info!(
            "user {} deleted artifact {}: {}",
            deleter_id, artifact_id, reason
        );
        Ok(())
    }

    /// Soft-delete a submission with everything on it. Notifies the
    /// original uploader unless they deleted it themselves.
    pub fn soft_delete_submission(
        &self,
        deleter_id: i64,
        submission_id: i64,
        reason: &str,
    ) -> Result<()> {
        let now = self.clock.now();
        self.db.with_tx(|tx| {
            submissions::get_live_submission(tx, submission_id)?;
            let owner_id = artifacts::list_artifacts(tx, submission_id)?
                .first()
                .map(|a| a.uploader_id);

            submissions::soft_delete_submission(tx, submission_id, reason, now)?;

            if let Some(owner_id) = owner_id {
                if owner_id != deleter_id {
                    let msg = render::deletion_notice(
                        &self.base_url,
                        owner_id,
                        deleter_id,
                        submission_id,
                        DeletedItem::Submission,
                        reason,
                    );
                    notifications::enqueue_notification(tx, &msg, NotificationKind::Default, now)?;
                }
            }

            recompute_and_store(tx, submission_id, now)
        })?;

        self.dispatcher.signal();
        info!(
            "user {} deleted submission {}: {}",
            deleter_id, submission_id, reason
        );
        Ok(())
    }
}

/// Rebuild a submission's projection from its stored history.
fn rebuild_from_store(conn: &Connection, submission_id: i64) -> Result<Projection> {
    let events = events::list_events(conn, submission_id)?;
    let artifacts = artifacts::list_artifacts(conn, submission_id)?;
    Ok(rebuild(submission_id, &events, &artifacts))
}

/// Rebuild and persist, inside the caller's transaction.
fn recompute_and_store(
    conn: &Connection,
    submission_id: i64,
    now: DateTime<Utc>,
) -> Result<()> {
    let projection = rebuild_from_store(conn, submission_id)?;
    projection_store::write_projection(conn, &projection, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    use chrono::TimeZone;

    use intake_core::config::NotificationConfig;
    use intake_notify::{Dispatcher, LogChannel};

    const ALICE: i64 = 1;
    const BOB: i64 = 2;
    const CARA: i64 = 3;

    /// Deterministic clock stepping 10 seconds per reading, so every event
    /// lands in its own second well clear of the upload cutoff.
    struct StepClock {
        base: i64,
        reads: AtomicI64,
    }

    impl StepClock {
        fn new() -> Self {
            Self {
                base: 1_700_000_000,
                reads: AtomicI64::new(0),
            }
        }
    }

    impl Clock for StepClock {
        fn now(&self) -> DateTime<Utc> {
            let n = self.reads.fetch_add(1, Ordering::SeqCst);
            Utc.timestamp_opt(self.base + n * 10, 0).unwrap()
        }
    }

    fn coordinator() -> (Arc<Database>, WorkflowCoordinator) {
        let db = Arc::new(Database::in_memory().unwrap());
        let config = NotificationConfig {
            min_send_interval_ms: 1,
            error_backoff_secs: 1,
            dev_mode: true,
        };
        let dispatcher = Dispatcher::new(Arc::clone(&db), Arc::new(LogChannel), &config);
        let coordinator = WorkflowCoordinator::with_clock(
            Arc::clone(&db),
            dispatcher.handle(),
            "http://localhost:8080",
            Arc::new(StepClock::new()),
        );
        (db, coordinator)
    }

    fn meta() -> ArtifactMeta {
        ArtifactMeta {
            original_filename: "game.7z".to_string(),
            size: 4096,
            md5: "d41d8cd98f00b204e9800998ecf8427e".to_string(),
            sha256: "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
                .to_string(),
        }
    }

    fn pending_messages(db: &Database, kind: &str) -> Vec<String> {
        db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT message FROM notification
                     WHERE sent_at IS NULL AND kind = ?1
                     ORDER BY id",
                )
                .map_err(|e| IntakeError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map([kind], |row| row.get::<_, String>(0))
                .map_err(|e| IntakeError::Storage(e.to_string()))?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row.map_err(|e| IntakeError::Storage(e.to_string()))?);
            }
            Ok(messages)
        })
        .unwrap()
    }

    #[test]
    fn test_upload_then_review_chain() {
        let (_db, c) = coordinator();
        let (sid, _aid) = c
            .record_upload(ALICE, None, SubmissionLevel::Trial, &meta())
            .unwrap();

        let p = c.get_projection(sid).unwrap();
        assert_eq!(p.last_uploader_id, Some(ALICE));
        assert!(p.has_action(ActionKind::Upload));

        c.append_action(BOB, sid, ActionKind::AssignTesting, None)
            .unwrap();
        assert_eq!(c.get_projection(sid).unwrap().assigned_testing, vec![BOB]);

        c.append_action(BOB, sid, ActionKind::Approve, None).unwrap();
        let p = c.get_projection(sid).unwrap();
        assert_eq!(p.approved, vec![BOB]);
        // Approving released the testing assignment.
        assert!(p.assigned_testing.is_empty());

        c.append_action(CARA, sid, ActionKind::AssignVerification, None)
            .unwrap();
        c.append_action(CARA, sid, ActionKind::Verify, None).unwrap();
        let p = c.get_projection(sid).unwrap();
        assert_eq!(p.verified, vec![CARA]);
        assert!(p.assigned_verification.is_empty());

        c.append_action(BOB, sid, ActionKind::MarkAdded, None)
            .unwrap();
        assert!(c.get_projection(sid).unwrap().is_marked_added());
    }

    #[test]
    fn test_uploader_cannot_review_own_submission() {
        let (_db, c) = coordinator();
        let (sid, _) = c
            .record_upload(ALICE, None, SubmissionLevel::Trial, &meta())
            .unwrap();

        let before = c.get_projection(sid).unwrap();
        let err = c
            .append_action(ALICE, sid, ActionKind::AssignTesting, None)
            .unwrap_err();
        assert!(matches!(err, IntakeError::Validation(_)));

        // A rejected append leaves no trace.
        assert_eq!(c.get_projection(sid).unwrap(), before);
    }

    #[test]
    fn test_approve_schedules_release_one_second_later() {
        let (db, c) = coordinator();
        let (sid, _) = c
            .record_upload(ALICE, None, SubmissionLevel::Trial, &meta())
            .unwrap();
        c.append_action(BOB, sid, ActionKind::AssignTesting, None)
            .unwrap();
        c.append_action(BOB, sid, ActionKind::Approve, None).unwrap();

        let all = db.with_conn(|conn| events::list_events(conn, sid)).unwrap();
        let approve = all
            .iter()
            .find(|e| e.action == ActionKind::Approve)
            .unwrap();
        let release = all
            .iter()
            .find(|e| e.action == ActionKind::UnassignTesting)
            .unwrap();
        assert_eq!(release.author_id, BOB);
        assert_eq!(
            release.created_at.timestamp(),
            approve.created_at.timestamp() + 1
        );
    }

    #[test]
    fn test_marked_added_submission_is_frozen() {
        let (_db, c) = coordinator();
        let (sid, _) = c
            .record_upload(ALICE, None, SubmissionLevel::Trial, &meta())
            .unwrap();
        c.append_action(BOB, sid, ActionKind::AssignTesting, None)
            .unwrap();
        c.append_action(BOB, sid, ActionKind::Approve, None).unwrap();
        c.append_action(CARA, sid, ActionKind::AssignVerification, None)
            .unwrap();
        c.append_action(CARA, sid, ActionKind::Verify, None).unwrap();
        c.append_action(BOB, sid, ActionKind::MarkAdded, None)
            .unwrap();

        let err = c
            .append_action(BOB, sid, ActionKind::AssignTesting, None)
            .unwrap_err();
        assert!(matches!(err, IntakeError::Validation(_)));

        // Comments stay open.
        c.append_action(BOB, sid, ActionKind::Comment, Some("congrats"))
            .unwrap();
    }

    #[test]
    fn test_batch_skips_invalid_submissions_when_asked() {
        let (_db, c) = coordinator();
        let (s1, _) = c
            .record_upload(ALICE, None, SubmissionLevel::Trial, &meta())
            .unwrap();
        let (s2, _) = c
            .record_upload(ALICE, None, SubmissionLevel::Trial, &meta())
            .unwrap();
        c.append_action(BOB, s1, ActionKind::AssignTesting, None)
            .unwrap();

        // Already assigned to s1; with skipping, only s2 gets the event.
        let appended = c
            .append_actions(BOB, &[s1, s2], ActionKind::AssignTesting, None, true)
            .unwrap();
        assert_eq!(appended.len(), 1);
        assert_eq!(c.get_projection(s2).unwrap().assigned_testing, vec![BOB]);
    }

    #[test]
    fn test_batch_failure_rolls_back_everything() {
        let (_db, c) = coordinator();
        let (s1, _) = c
            .record_upload(ALICE, None, SubmissionLevel::Trial, &meta())
            .unwrap();
        let (s2, _) = c
            .record_upload(ALICE, None, SubmissionLevel::Trial, &meta())
            .unwrap();
        c.append_action(BOB, s2, ActionKind::AssignTesting, None)
            .unwrap();

        // s1 succeeds first, then s2 fails; the whole batch rolls back.
        let err = c
            .append_actions(BOB, &[s1, s2], ActionKind::AssignTesting, None, false)
            .unwrap_err();
        assert!(matches!(err, IntakeError::Validation(_)));
        assert!(c.get_projection(s1).unwrap().assigned_testing.is_empty());
    }

    #[test]
    fn test_reject_requires_a_message() {
        let (_db, c) = coordinator();
        let (sid, _) = c
            .record_upload(ALICE, None, SubmissionLevel::Trial, &meta())
            .unwrap();
        let err = c
            .append_action(BOB, sid, ActionKind::Reject, None)
            .unwrap_err();
        assert!(matches!(err, IntakeError::Validation(_)));

        let err = c
            .append_action(BOB, sid, ActionKind::Reject, Some("   "))
            .unwrap_err();
        assert!(matches!(err, IntakeError::Validation(_)));
    }

    #[test]
    fn test_upload_to_rejected_submission_is_refused() {
        let (_db, c) = coordinator();
        let (sid, _) = c
            .record_upload(ALICE, None, SubmissionLevel::Trial, &meta())
            .unwrap();
        c.append_action(BOB, sid, ActionKind::Reject, Some("not acceptable"))
            .unwrap();

        let err = c
            .record_upload(ALICE, Some(sid), SubmissionLevel::Trial, &meta())
            .unwrap_err();
        assert!(matches!(err, IntakeError::Validation(_)));
    }

    #[test]
    fn test_assignment_messages_are_stripped() {
        let (db, c) = coordinator();
        let (sid, _) = c
            .record_upload(ALICE, None, SubmissionLevel::Trial, &meta())
            .unwrap();
        let eid = c
            .append_action(BOB, sid, ActionKind::AssignTesting, Some("mine!"))
            .unwrap();

        let event = db
            .with_conn(|conn| events::get_event(conn, eid))
            .unwrap()
            .unwrap();
        assert_eq!(event.message, None);
    }

    #[test]
    fn test_subscribers_get_notified_with_preference() {
        let (db, c) = coordinator();
        let (sid, _) = c
            .record_upload(ALICE, None, SubmissionLevel::Trial, &meta())
            .unwrap();

        db.with_conn(|conn| {
            notifications::subscribe(conn, CARA, sid)?;
            notifications::set_notification_preferences(conn, CARA, &[ActionKind::Approve])
        })
        .unwrap();

        c.append_action(BOB, sid, ActionKind::AssignTesting, None)
            .unwrap();
        c.append_action(BOB, sid, ActionKind::Approve, None).unwrap();

        let personal = pending_messages(&db, "default");
        assert_eq!(personal.len(), 1);
        assert!(personal[0].contains("<@3>"));
        assert!(personal[0].contains("approved"));
    }

    #[test]
    fn test_upload_announces_to_curation_feed() {
        let (db, c) = coordinator();
        let (sid, _) = c
            .record_upload(ALICE, None, SubmissionLevel::Trial, &meta())
            .unwrap();
        c.record_upload(BOB, Some(sid), SubmissionLevel::Trial, &meta())
            .unwrap();

        let feed = pending_messages(&db, "curation-feed");
        assert_eq!(feed.len(), 2);
        assert!(feed[0].starts_with("A new submission"));
        assert!(feed[1].starts_with("A submission update"));
    }

    #[test]
    fn test_new_upload_invalidates_earlier_assignment() {
        let (_db, c) = coordinator();
        let (sid, _) = c
            .record_upload(ALICE, None, SubmissionLevel::Trial, &meta())
            .unwrap();
        c.append_action(BOB, sid, ActionKind::AssignTesting, None)
            .unwrap();
        assert_eq!(c.get_projection(sid).unwrap().assigned_testing, vec![BOB]);

        c.record_upload(ALICE, Some(sid), SubmissionLevel::Trial, &meta())
            .unwrap();
        assert!(c.get_projection(sid).unwrap().assigned_testing.is_empty());
    }

    #[test]
    fn test_delete_last_artifact_is_refused_and_changes_nothing() {
        let (_db, c) = coordinator();
        let (sid, aid) = c
            .record_upload(ALICE, None, SubmissionLevel::Trial, &meta())
            .unwrap();

        let before = c.get_projection(sid).unwrap();
        let err = c.soft_delete_artifact(BOB, aid, "broken").unwrap_err();
        assert!(matches!(err, IntakeError::LastArtifact));
        assert_eq!(c.get_projection(sid).unwrap(), before);
    }

    #[test]
    fn test_delete_newest_artifact_restores_previous_uploader() {
        let (db, c) = coordinator();
        let (sid, _v1) = c
            .record_upload(ALICE, None, SubmissionLevel::Trial, &meta())
            .unwrap();
        let (_, v2) = c
            .record_upload(BOB, Some(sid), SubmissionLevel::Trial, &meta())
            .unwrap();
        assert_eq!(c.get_projection(sid).unwrap().last_uploader_id, Some(BOB));

        c.soft_delete_artifact(CARA, v2, "corrupt archive").unwrap();
        assert_eq!(c.get_projection(sid).unwrap().last_uploader_id, Some(ALICE));

        // The uploader is told about the deletion.
        let personal = pending_messages(&db, "default");
        assert!(personal.iter().any(|m| m.contains("deleted by <@3>")));
    }

    #[test]
    fn test_delete_event_reverts_derived_status() {
        let (_db, c) = coordinator();
        let (sid, _) = c
            .record_upload(ALICE, None, SubmissionLevel::Trial, &meta())
            .unwrap();
        let eid = c
            .append_action(BOB, sid, ActionKind::AssignTesting, None)
            .unwrap();
        assert_eq!(c.get_projection(sid).unwrap().assigned_testing, vec![BOB]);

        c.soft_delete_event(BOB, eid, "misclick").unwrap();
        assert!(c.get_projection(sid).unwrap().assigned_testing.is_empty());
    }

    #[test]
    fn test_delete_submission_hides_it_entirely() {
        let (_db, c) = coordinator();
        let (sid, _) = c
            .record_upload(ALICE, None, SubmissionLevel::Trial, &meta())
            .unwrap();

        c.soft_delete_submission(CARA, sid, "duplicate").unwrap();
        assert!(matches!(
            c.get_projection(sid).unwrap_err(),
            IntakeError::NotFound(_)
        ));
        assert!(matches!(
            c.append_action(BOB, sid, ActionKind::Comment, Some("hi"))
                .unwrap_err(),
            IntakeError::NotFound(_)
        ));
    }

    #[test]
    fn test_upload_and_system_kinds_are_not_submittable() {
        let (_db, c) = coordinator();
        let (sid, _) = c
            .record_upload(ALICE, None, SubmissionLevel::Trial, &meta())
            .unwrap();
        for kind in [ActionKind::Upload, ActionKind::System] {
            let err = c.append_action(BOB, sid, kind, None).unwrap_err();
            assert!(matches!(err, IntakeError::Validation(_)));
        }
    }

    #[test]
    fn test_reviewers_are_auto_subscribed() {
        let (db, c) = coordinator();
        let (sid, _) = c
            .record_upload(ALICE, None, SubmissionLevel::Trial, &meta())
            .unwrap();
        c.append_action(BOB, sid, ActionKind::AssignTesting, None)
            .unwrap();

        db.with_conn(|conn| {
            assert!(notifications::is_subscribed(conn, ALICE, sid)?);
            assert!(notifications::is_subscribed(conn, BOB, sid)?);
            Ok(())
        })
        .unwrap();
    }
}
