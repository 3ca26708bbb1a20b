//! The artifact version log.
//!
//! Uploaded file versions per submission. Append-only and soft-deletable,
//! with the invariant that a live submission keeps at least one live
//! artifact.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};

use intake_core::error::IntakeError;
use intake_core::types::{ArtifactMeta, ArtifactVersion};

use crate::from_unix;

/// Store a new artifact version, returning its id.
pub fn insert_artifact(
    conn: &Connection,
    submission_id: i64,
    uploader_id: i64,
    meta: &ArtifactMeta,
    uploaded_at: DateTime<Utc>,
) -> Result<i64, IntakeError> {
    conn.execute(
        "INSERT INTO artifact_version
             (submission_id, uploader_id, original_filename, size, md5, sha256, uploaded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            submission_id,
            uploader_id,
            meta.original_filename,
            meta.size,
            meta.md5,
            meta.sha256,
            uploaded_at.timestamp(),
        ],
    )
    .map_err(|e| IntakeError::Storage(format!("Failed to store artifact: {}", e)))?;
    Ok(conn.last_insert_rowid())
}

/// Fetch a single artifact by id, deleted or not.
pub fn get_artifact(
    conn: &Connection,
    artifact_id: i64,
) -> Result<Option<ArtifactVersion>, IntakeError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, submission_id, uploader_id, original_filename, size, md5, sha256,
                    uploaded_at, deleted_at, delete_reason
             FROM artifact_version WHERE id = ?1",
        )
        .map_err(|e| IntakeError::Storage(e.to_string()))?;

    let result = stmt
        .query_row(rusqlite::params![artifact_id], |row| {
            Ok(row_to_artifact(row))
        })
        .optional()
        .map_err(|e| IntakeError::Storage(e.to_string()))?;

    match result {
        Some(artifact) => Ok(Some(artifact?)),
        None => Ok(None),
    }
}

/// All non-deleted artifacts for a submission in `(uploaded_at, id)` order.
pub fn list_artifacts(
    conn: &Connection,
    submission_id: i64,
) -> Result<Vec<ArtifactVersion>, IntakeError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, submission_id, uploader_id, original_filename, size, md5, sha256,
                    uploaded_at, deleted_at, delete_reason
             FROM artifact_version
             WHERE submission_id = ?1 AND deleted_at IS NULL
             ORDER BY uploaded_at, id",
        )
        .map_err(|e| IntakeError::Storage(e.to_string()))?;

    let rows = stmt
        .query_map(rusqlite::params![submission_id], |row| {
            Ok(row_to_artifact(row))
        })
        .map_err(|e| IntakeError::Storage(e.to_string()))?;

    let mut artifacts = Vec::new();
    for row in rows {
        artifacts.push(row.map_err(|e| IntakeError::Storage(e.to_string()))??);
    }
    Ok(artifacts)
}

/// Mark an artifact as deleted.
///
/// Refuses to remove the last live artifact of its submission; every
/// non-deleted submission must keep at least one version.
pub fn soft_delete_artifact(
    conn: &Connection,
    artifact_id: i64,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<(), IntakeError> {
    let live_count: Option<i64> = conn
        .query_row(
            "SELECT COUNT(*) FROM artifact_version
             WHERE submission_id =
                   (SELECT submission_id FROM artifact_version WHERE id = ?1)
               AND deleted_at IS NULL",
            rusqlite::params![artifact_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| IntakeError::Storage(e.to_string()))?;

    match live_count {
        None | Some(0) => {
            return Err(IntakeError::NotFound(format!("artifact {}", artifact_id)))
        }
        Some(1) => return Err(IntakeError::LastArtifact),
        Some(_) => {}
    }

    let changed = conn
        .execute(
            "UPDATE artifact_version SET deleted_at = ?2, delete_reason = ?3
             WHERE id = ?1 AND deleted_at IS NULL",
            rusqlite::params![artifact_id, now.timestamp(), reason],
        )
        .map_err(|e| IntakeError::Storage(format!("Failed to delete artifact: {}", e)))?;
    if changed == 0 {
        return Err(IntakeError::NotFound(format!("artifact {}", artifact_id)));
    }
    Ok(())
}

/// Soft-delete every live artifact of a submission (submission cascade).
pub fn soft_delete_artifacts_for_submission(
    conn: &Connection,
    submission_id: i64,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<(), IntakeError> {
    conn.execute(
        "UPDATE artifact_version SET deleted_at = ?2, delete_reason = ?3
         WHERE submission_id = ?1 AND deleted_at IS NULL",
        rusqlite::params![submission_id, now.timestamp(), reason],
    )
    .map_err(|e| IntakeError::Storage(format!("Failed to delete artifacts: {}", e)))?;
    Ok(())
}

fn row_to_artifact(row: &Row<'_>) -> Result<ArtifactVersion, IntakeError> {
    let deleted_at: Option<i64> = row
        .get(8)
        .map_err(|e| IntakeError::Storage(e.to_string()))?;

    Ok(ArtifactVersion {
        id: row.get(0).map_err(|e| IntakeError::Storage(e.to_string()))?,
        submission_id: row.get(1).map_err(|e| IntakeError::Storage(e.to_string()))?,
        uploader_id: row.get(2).map_err(|e| IntakeError::Storage(e.to_string()))?,
        original_filename: row.get(3).map_err(|e| IntakeError::Storage(e.to_string()))?,
        size: row.get(4).map_err(|e| IntakeError::Storage(e.to_string()))?,
        md5: row.get(5).map_err(|e| IntakeError::Storage(e.to_string()))?,
        sha256: row.get(6).map_err(|e| IntakeError::Storage(e.to_string()))?,
        uploaded_at: from_unix(row.get(7).map_err(|e| IntakeError::Storage(e.to_string()))?)?,
        deleted_at: deleted_at.map(from_unix).transpose()?,
        delete_reason: row.get(9).map_err(|e| IntakeError::Storage(e.to_string()))?,
    })
}
