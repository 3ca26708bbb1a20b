//! Persistence of the per-submission projection row.
//!
//! The row is created with the submission and only ever rewritten whole,
//! inside the same transaction as the event or artifact mutation that
//! triggered the rebuild. Id lists and the distinct-kind set are stored as
//! JSON arrays.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};

use intake_core::error::IntakeError;
use intake_core::types::{ActionKind, Projection};

/// Read the projection row for a submission.
pub fn read_projection(
    conn: &Connection,
    submission_id: i64,
) -> Result<Option<Projection>, IntakeError> {
    let mut stmt = conn
        .prepare(
            "SELECT submission_id, newest_artifact_id, oldest_artifact_id, newest_event_id,
                    last_uploader_id, assigned_testing, assigned_verification,
                    requested_changes, approved, verified, distinct_actions, system_action
             FROM projection_cache WHERE submission_id = ?1",
        )
        .map_err(|e| IntakeError::Storage(e.to_string()))?;

    let result = stmt
        .query_row(rusqlite::params![submission_id], |row| {
            Ok(row_to_projection(row))
        })
        .optional()
        .map_err(|e| IntakeError::Storage(e.to_string()))?;

    match result {
        Some(projection) => Ok(Some(projection?)),
        None => Ok(None),
    }
}

/// Rewrite the projection row from a freshly rebuilt value.
pub fn write_projection(
    conn: &Connection,
    projection: &Projection,
    now: DateTime<Utc>,
) -> Result<(), IntakeError> {
    let changed = conn
        .execute(
            "UPDATE projection_cache
             SET newest_artifact_id = ?2,
                 oldest_artifact_id = ?3,
                 newest_event_id = ?4,
                 last_uploader_id = ?5,
                 assigned_testing = ?6,
                 assigned_verification = ?7,
                 requested_changes = ?8,
                 approved = ?9,
                 verified = ?10,
                 distinct_actions = ?11,
                 system_action = ?12,
                 updated_at = ?13
             WHERE submission_id = ?1",
            rusqlite::params![
                projection.submission_id,
                projection.newest_artifact_id,
                projection.oldest_artifact_id,
                projection.newest_event_id,
                projection.last_uploader_id,
                serde_json::to_string(&projection.assigned_testing)?,
                serde_json::to_string(&projection.assigned_verification)?,
                serde_json::to_string(&projection.requested_changes)?,
                serde_json::to_string(&projection.approved)?,
                serde_json::to_string(&projection.verified)?,
                serde_json::to_string(&projection.distinct_actions)?,
                projection.system_action.map(|k| k.as_str()),
                now.timestamp(),
            ],
        )
        .map_err(|e| IntakeError::Storage(format!("Failed to write projection: {}", e)))?;
    if changed == 0 {
        return Err(IntakeError::Storage(format!(
            "projection row missing for submission {}",
            projection.submission_id
        )));
    }
    Ok(())
}

fn row_to_projection(row: &Row<'_>) -> Result<Projection, IntakeError> {
    fn ids(row: &Row<'_>, idx: usize) -> Result<Vec<i64>, IntakeError> {
        let json: String = row
            .get(idx)
            .map_err(|e| IntakeError::Storage(e.to_string()))?;
        Ok(serde_json::from_str(&json)?)
    }

    let distinct_json: String = row
        .get(10)
        .map_err(|e| IntakeError::Storage(e.to_string()))?;
    let distinct_actions: Vec<ActionKind> = serde_json::from_str(&distinct_json)?;
    let system_action: Option<String> = row
        .get(11)
        .map_err(|e| IntakeError::Storage(e.to_string()))?;

    Ok(Projection {
        submission_id: row.get(0).map_err(|e| IntakeError::Storage(e.to_string()))?,
        newest_artifact_id: row.get(1).map_err(|e| IntakeError::Storage(e.to_string()))?,
        oldest_artifact_id: row.get(2).map_err(|e| IntakeError::Storage(e.to_string()))?,
        newest_event_id: row.get(3).map_err(|e| IntakeError::Storage(e.to_string()))?,
        last_uploader_id: row.get(4).map_err(|e| IntakeError::Storage(e.to_string()))?,
        assigned_testing: ids(row, 5)?,
        assigned_verification: ids(row, 6)?,
        requested_changes: ids(row, 7)?,
        approved: ids(row, 8)?,
        verified: ids(row, 9)?,
        distinct_actions,
        system_action: system_action.map(|s| s.parse()).transpose()?,
    })
}
