//! Notification outbox, subscriptions, and per-action preferences.
//!
//! The outbox is a durable ordered queue: rows are created pending
//! (`sent_at IS NULL`) inside the workflow transaction and marked sent by
//! the dispatcher after delivery. Rows are never deleted.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};

use intake_core::error::IntakeError;
use intake_core::types::{ActionKind, NotificationKind, NotificationRecord};

use crate::from_unix;

/// Queue a rendered message for delivery, returning its id.
pub fn enqueue_notification(
    conn: &Connection,
    message: &str,
    kind: NotificationKind,
    now: DateTime<Utc>,
) -> Result<i64, IntakeError> {
    conn.execute(
        "INSERT INTO notification (message, kind, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![message, kind.as_str(), now.timestamp()],
    )
    .map_err(|e| IntakeError::Storage(format!("Failed to enqueue notification: {}", e)))?;
    Ok(conn.last_insert_rowid())
}

/// The oldest record still waiting for delivery, if any.
pub fn oldest_pending_notification(
    conn: &Connection,
) -> Result<Option<NotificationRecord>, IntakeError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, message, kind, created_at, sent_at
             FROM notification
             WHERE sent_at IS NULL
             ORDER BY created_at, id
             LIMIT 1",
        )
        .map_err(|e| IntakeError::Storage(e.to_string()))?;

    let result = stmt
        .query_row([], |row| {
            let kind_str: String = row.get(2)?;
            let created_at: i64 = row.get(3)?;
            let sent_at: Option<i64> = row.get(4)?;
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                kind_str,
                created_at,
                sent_at,
            ))
        })
        .optional()
        .map_err(|e| IntakeError::Storage(e.to_string()))?;

    match result {
        Some((id, message, kind_str, created_at, sent_at)) => Ok(Some(NotificationRecord {
            id,
            message,
            kind: kind_str.parse()?,
            created_at: from_unix(created_at)?,
            sent_at: sent_at.map(from_unix).transpose()?,
        })),
        None => Ok(None),
    }
}

/// Record a successful delivery. Idempotent: only the first call sets
/// the timestamp.
pub fn mark_notification_sent(
    conn: &Connection,
    notification_id: i64,
    now: DateTime<Utc>,
) -> Result<(), IntakeError> {
    conn.execute(
        "UPDATE notification SET sent_at = ?2 WHERE id = ?1 AND sent_at IS NULL",
        rusqlite::params![notification_id, now.timestamp()],
    )
    .map_err(|e| IntakeError::Storage(format!("Failed to mark notification sent: {}", e)))?;
    Ok(())
}

/// Subscribe a user to a submission's notifications. Idempotent.
pub fn subscribe(conn: &Connection, user_id: i64, submission_id: i64) -> Result<(), IntakeError> {
    conn.execute(
        "INSERT OR IGNORE INTO subscription (user_id, submission_id) VALUES (?1, ?2)",
        rusqlite::params![user_id, submission_id],
    )
    .map_err(|e| IntakeError::Storage(format!("Failed to subscribe: {}", e)))?;
    Ok(())
}

pub fn unsubscribe(conn: &Connection, user_id: i64, submission_id: i64) -> Result<(), IntakeError> {
    conn.execute(
        "DELETE FROM subscription WHERE user_id = ?1 AND submission_id = ?2",
        rusqlite::params![user_id, submission_id],
    )
    .map_err(|e| IntakeError::Storage(format!("Failed to unsubscribe: {}", e)))?;
    Ok(())
}

pub fn is_subscribed(
    conn: &Connection,
    user_id: i64,
    submission_id: i64,
) -> Result<bool, IntakeError> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM subscription WHERE user_id = ?1 AND submission_id = ?2",
            rusqlite::params![user_id, submission_id],
            |row| row.get(0),
        )
        .map_err(|e| IntakeError::Storage(e.to_string()))?;
    Ok(count > 0)
}

/// Replace a user's per-action notification preferences.
pub fn set_notification_preferences(
    conn: &Connection,
    user_id: i64,
    actions: &[ActionKind],
) -> Result<(), IntakeError> {
    conn.execute(
        "DELETE FROM notification_preference WHERE user_id = ?1",
        rusqlite::params![user_id],
    )
    .map_err(|e| IntakeError::Storage(e.to_string()))?;
    for action in actions {
        conn.execute(
            "INSERT INTO notification_preference (user_id, action) VALUES (?1, ?2)",
            rusqlite::params![user_id, action.as_str()],
        )
        .map_err(|e| IntakeError::Storage(e.to_string()))?;
    }
    Ok(())
}

pub fn get_notification_preferences(
    conn: &Connection,
    user_id: i64,
) -> Result<Vec<ActionKind>, IntakeError> {
    let mut stmt = conn
        .prepare("SELECT action FROM notification_preference WHERE user_id = ?1 ORDER BY action")
        .map_err(|e| IntakeError::Storage(e.to_string()))?;
    let rows = stmt
        .query_map(rusqlite::params![user_id], |row| row.get::<_, String>(0))
        .map_err(|e| IntakeError::Storage(e.to_string()))?;

    let mut actions = Vec::new();
    for row in rows {
        let s = row.map_err(|e| IntakeError::Storage(e.to_string()))?;
        actions.push(s.parse()?);
    }
    Ok(actions)
}

/// Users to mention for an action on a submission: its subscribers, minus
/// the acting author, restricted to users who opted into that action.
pub fn recipients_for_action(
    conn: &Connection,
    author_id: i64,
    submission_id: i64,
    action: ActionKind,
) -> Result<Vec<i64>, IntakeError> {
    let mut stmt = conn
        .prepare(
            "SELECT s.user_id
             FROM subscription s
             JOIN notification_preference p
               ON p.user_id = s.user_id AND p.action = ?3
             WHERE s.submission_id = ?1 AND s.user_id != ?2
             ORDER BY s.user_id",
        )
        .map_err(|e| IntakeError::Storage(e.to_string()))?;
    let rows = stmt
        .query_map(
            rusqlite::params![submission_id, author_id, action.as_str()],
            |row| row.get::<_, i64>(0),
        )
        .map_err(|e| IntakeError::Storage(e.to_string()))?;

    let mut users = Vec::new();
    for row in rows {
        users.push(row.map_err(|e| IntakeError::Storage(e.to_string()))?);
    }
    Ok(users)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submissions;
    use crate::Database;
    use intake_core::types::SubmissionLevel;

    #[test]
    fn test_outbox_fifo_order() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            let now = Utc::now();
            let first = enqueue_notification(conn, "first", NotificationKind::Default, now)?;
            let _second = enqueue_notification(conn, "second", NotificationKind::Default, now)?;

            let oldest = oldest_pending_notification(conn)?.unwrap();
            assert_eq!(oldest.id, first);
            assert_eq!(oldest.message, "first");
            assert!(oldest.sent_at.is_none());

            mark_notification_sent(conn, first, now)?;
            let next = oldest_pending_notification(conn)?.unwrap();
            assert_eq!(next.message, "second");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_empty_outbox_yields_none() {
        let db = Database::in_memory().unwrap();
        let pending = db
            .with_conn(|conn| oldest_pending_notification(conn))
            .unwrap();
        assert!(pending.is_none());
    }

    #[test]
    fn test_mark_sent_is_idempotent() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            let t0 = Utc::now();
            let id = enqueue_notification(conn, "msg", NotificationKind::CurationFeed, t0)?;
            mark_notification_sent(conn, id, t0)?;

            // A later second call must not move the timestamp.
            let t1 = t0 + chrono::Duration::seconds(100);
            mark_notification_sent(conn, id, t1)?;

            let sent_at: i64 = conn
                .query_row(
                    "SELECT sent_at FROM notification WHERE id = ?1",
                    rusqlite::params![id],
                    |row| row.get(0),
                )
                .map_err(|e| IntakeError::Storage(e.to_string()))?;
            assert_eq!(sent_at, t0.timestamp());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_recipients_filtered_by_preference_and_author() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            let now = Utc::now();
            let sid = submissions::create_submission(conn, SubmissionLevel::Trial, now)?;

            // Users 1, 2, 3 subscribed; only 1 and 2 opted into approvals;
            // 2 is the author and must be excluded.
            for uid in [1, 2, 3] {
                subscribe(conn, uid, sid)?;
            }
            set_notification_preferences(conn, 1, &[ActionKind::Approve, ActionKind::Comment])?;
            set_notification_preferences(conn, 2, &[ActionKind::Approve])?;

            let recipients = recipients_for_action(conn, 2, sid, ActionKind::Approve)?;
            assert_eq!(recipients, vec![1]);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_subscription_is_idempotent() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            let sid = submissions::create_submission(conn, SubmissionLevel::Trial, Utc::now())?;
            subscribe(conn, 9, sid)?;
            subscribe(conn, 9, sid)?;
            assert!(is_subscribed(conn, 9, sid)?);
            unsubscribe(conn, 9, sid)?;
            assert!(!is_subscribed(conn, 9, sid)?);
            Ok(())
        })
        .unwrap();
    }
}
