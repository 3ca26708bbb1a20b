//! Submission rows and their lifecycle.
//!
//! Creating a submission also creates its projection row; the two live and
//! die together. Soft-deleting a submission cascades to its artifacts and
//! events.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};

use intake_core::error::IntakeError;
use intake_core::types::{Submission, SubmissionLevel};

use crate::{artifacts, events, from_unix};

/// Create a submission and its (empty) projection row, returning the id.
pub fn create_submission(
    conn: &Connection,
    level: SubmissionLevel,
    now: DateTime<Utc>,
) -> Result<i64, IntakeError> {
    conn.execute(
        "INSERT INTO submission (level, created_at) VALUES (?1, ?2)",
        rusqlite::params![level.as_str(), now.timestamp()],
    )
    .map_err(|e| IntakeError::Storage(format!("Failed to store submission: {}", e)))?;
    let sid = conn.last_insert_rowid();

    conn.execute(
        "INSERT INTO projection_cache (submission_id, updated_at) VALUES (?1, ?2)",
        rusqlite::params![sid, now.timestamp()],
    )
    .map_err(|e| IntakeError::Storage(format!("Failed to create projection row: {}", e)))?;

    Ok(sid)
}

/// Fetch a submission by id, deleted or not.
pub fn get_submission(
    conn: &Connection,
    submission_id: i64,
) -> Result<Option<Submission>, IntakeError> {
    let mut stmt = conn
        .prepare("SELECT id, level, created_at, deleted_at FROM submission WHERE id = ?1")
        .map_err(|e| IntakeError::Storage(e.to_string()))?;

    let result = stmt
        .query_row(rusqlite::params![submission_id], |row| {
            Ok(row_to_submission(row))
        })
        .optional()
        .map_err(|e| IntakeError::Storage(e.to_string()))?;

    match result {
        Some(submission) => Ok(Some(submission?)),
        None => Ok(None),
    }
}

/// Fetch a live (non-deleted) submission or report NotFound.
pub fn get_live_submission(
    conn: &Connection,
    submission_id: i64,
) -> Result<Submission, IntakeError> {
    match get_submission(conn, submission_id)? {
        Some(s) if s.deleted_at.is_none() => Ok(s),
        _ => Err(IntakeError::NotFound(format!(
            "submission {}",
            submission_id
        ))),
    }
}

/// Soft-delete a submission together with all its artifacts and events.
pub fn soft_delete_submission(
    conn: &Connection,
    submission_id: i64,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<(), IntakeError> {
    artifacts::soft_delete_artifacts_for_submission(conn, submission_id, reason, now)?;
    events::soft_delete_events_for_submission(conn, submission_id, reason, now)?;

    let changed = conn
        .execute(
            "UPDATE submission SET deleted_at = ?2 WHERE id = ?1 AND deleted_at IS NULL",
            rusqlite::params![submission_id, now.timestamp()],
        )
        .map_err(|e| IntakeError::Storage(format!("Failed to delete submission: {}", e)))?;
    if changed == 0 {
        return Err(IntakeError::NotFound(format!(
            "submission {}",
            submission_id
        )));
    }
    Ok(())
}

fn row_to_submission(row: &Row<'_>) -> Result<Submission, IntakeError> {
    let level_str: String = row
        .get(1)
        .map_err(|e| IntakeError::Storage(e.to_string()))?;
    let deleted_at: Option<i64> = row
        .get(3)
        .map_err(|e| IntakeError::Storage(e.to_string()))?;

    Ok(Submission {
        id: row.get(0).map_err(|e| IntakeError::Storage(e.to_string()))?,
        level: level_str.parse()?,
        created_at: from_unix(row.get(2).map_err(|e| IntakeError::Storage(e.to_string()))?)?,
        deleted_at: deleted_at.map(from_unix).transpose()?,
    })
}
