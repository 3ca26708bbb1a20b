//! The action event store.
//!
//! Append-only log of workflow events per submission. Rows are immutable
//! once written except for the soft-delete marker. Listing always orders by
//! `(created_at, id)` so timestamp ties resolve to insertion order.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};

use intake_core::error::IntakeError;
use intake_core::types::{ActionEvent, ActionKind};

use crate::from_unix;

/// Append a new action event, returning its id.
pub fn insert_event(
    conn: &Connection,
    submission_id: i64,
    author_id: i64,
    action: ActionKind,
    message: Option<&str>,
    created_at: DateTime<Utc>,
) -> Result<i64, IntakeError> {
    conn.execute(
        "INSERT INTO action_event (submission_id, author_id, action, message, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            submission_id,
            author_id,
            action.as_str(),
            message,
            created_at.timestamp(),
        ],
    )
    .map_err(|e| IntakeError::Storage(format!("Failed to store event: {}", e)))?;
    Ok(conn.last_insert_rowid())
}

/// Fetch a single event by id, deleted or not.
pub fn get_event(conn: &Connection, event_id: i64) -> Result<Option<ActionEvent>, IntakeError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, submission_id, author_id, action, message, created_at,
                    deleted_at, delete_reason
             FROM action_event WHERE id = ?1",
        )
        .map_err(|e| IntakeError::Storage(e.to_string()))?;

    let result = stmt
        .query_row(rusqlite::params![event_id], |row| Ok(row_to_event(row)))
        .optional()
        .map_err(|e| IntakeError::Storage(e.to_string()))?;

    match result {
        Some(event) => Ok(Some(event?)),
        None => Ok(None),
    }
}

/// All non-deleted events for a submission in `(created_at, id)` order.
pub fn list_events(conn: &Connection, submission_id: i64) -> Result<Vec<ActionEvent>, IntakeError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, submission_id, author_id, action, message, created_at,
                    deleted_at, delete_reason
             FROM action_event
             WHERE submission_id = ?1 AND deleted_at IS NULL
             ORDER BY created_at, id",
        )
        .map_err(|e| IntakeError::Storage(e.to_string()))?;

    let rows = stmt
        .query_map(rusqlite::params![submission_id], |row| Ok(row_to_event(row)))
        .map_err(|e| IntakeError::Storage(e.to_string()))?;

    let mut events = Vec::new();
    for row in rows {
        events.push(row.map_err(|e| IntakeError::Storage(e.to_string()))??);
    }
    Ok(events)
}

/// Mark an event as deleted, recording when and why.
pub fn soft_delete_event(
    conn: &Connection,
    event_id: i64,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<(), IntakeError> {
    let changed = conn
        .execute(
            "UPDATE action_event SET deleted_at = ?2, delete_reason = ?3
             WHERE id = ?1 AND deleted_at IS NULL",
            rusqlite::params![event_id, now.timestamp(), reason],
        )
        .map_err(|e| IntakeError::Storage(format!("Failed to delete event: {}", e)))?;
    if changed == 0 {
        return Err(IntakeError::NotFound(format!("event {}", event_id)));
    }
    Ok(())
}

/// Soft-delete every live event of a submission (submission cascade).
pub fn soft_delete_events_for_submission(
    conn: &Connection,
    submission_id: i64,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<(), IntakeError> {
    conn.execute(
        "UPDATE action_event SET deleted_at = ?2, delete_reason = ?3
         WHERE submission_id = ?1 AND deleted_at IS NULL",
        rusqlite::params![submission_id, now.timestamp(), reason],
    )
    .map_err(|e| IntakeError::Storage(format!("Failed to delete events: {}", e)))?;
    Ok(())
}

fn row_to_event(row: &Row<'_>) -> Result<ActionEvent, IntakeError> {
    let action_str: String = row
        .get(3)
        .map_err(|e| IntakeError::Storage(e.to_string()))?;
    let deleted_at: Option<i64> = row
        .get(6)
        .map_err(|e| IntakeError::Storage(e.to_string()))?;

    Ok(ActionEvent {
        id: row.get(0).map_err(|e| IntakeError::Storage(e.to_string()))?,
        submission_id: row.get(1).map_err(|e| IntakeError::Storage(e.to_string()))?,
        author_id: row.get(2).map_err(|e| IntakeError::Storage(e.to_string()))?,
        action: action_str.parse()?,
        message: row.get(4).map_err(|e| IntakeError::Storage(e.to_string()))?,
        created_at: from_unix(row.get(5).map_err(|e| IntakeError::Storage(e.to_string()))?)?,
        deleted_at: deleted_at.map(from_unix).transpose()?,
        delete_reason: row.get(7).map_err(|e| IntakeError::Storage(e.to_string()))?,
    })
}
