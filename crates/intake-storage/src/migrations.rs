//! Database schema migrations.
//!
//! Applies the initial schema: submissions, artifact versions, the action
//! event log, the projection cache, the notification outbox, subscriptions,
//! and per-action notification preferences.

use rusqlite::Connection;
use tracing::info;

use intake_core::error::IntakeError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), IntakeError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| IntakeError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| IntakeError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<(), IntakeError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS submission (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            level       TEXT NOT NULL
                        CHECK (level IN ('audition', 'trial', 'staff')),
            created_at  INTEGER NOT NULL,
            deleted_at  INTEGER
        );

        CREATE TABLE IF NOT EXISTS artifact_version (
            id                 INTEGER PRIMARY KEY AUTOINCREMENT,
            submission_id      INTEGER NOT NULL REFERENCES submission (id),
            uploader_id        INTEGER NOT NULL,
            original_filename  TEXT NOT NULL,
            size               INTEGER NOT NULL,
            md5                TEXT NOT NULL,
            sha256             TEXT NOT NULL,
            uploaded_at        INTEGER NOT NULL,
            deleted_at         INTEGER,
            delete_reason      TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_artifact_submission
            ON artifact_version (submission_id, uploaded_at, id);

        CREATE TABLE IF NOT EXISTS action_event (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            submission_id  INTEGER NOT NULL REFERENCES submission (id),
            author_id      INTEGER NOT NULL,
            action         TEXT NOT NULL
                           CHECK (action IN (
                               'comment', 'upload',
                               'assign-testing', 'unassign-testing',
                               'assign-verification', 'unassign-verification',
                               'approve', 'request-changes', 'verify',
                               'reject', 'mark-added', 'system'
                           )),
            message        TEXT,
            created_at     INTEGER NOT NULL,
            deleted_at     INTEGER,
            delete_reason  TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_event_submission
            ON action_event (submission_id, created_at, id);

        -- Derived state, one row per submission, rebuilt inside every
        -- mutating transaction. Id lists and kind sets are JSON arrays.
        CREATE TABLE IF NOT EXISTS projection_cache (
            submission_id          INTEGER PRIMARY KEY
                                   REFERENCES submission (id),
            newest_artifact_id     INTEGER,
            oldest_artifact_id     INTEGER,
            newest_event_id        INTEGER,
            last_uploader_id       INTEGER,
            assigned_testing       TEXT NOT NULL DEFAULT '[]',
            assigned_verification  TEXT NOT NULL DEFAULT '[]',
            requested_changes      TEXT NOT NULL DEFAULT '[]',
            approved               TEXT NOT NULL DEFAULT '[]',
            verified               TEXT NOT NULL DEFAULT '[]',
            distinct_actions       TEXT NOT NULL DEFAULT '[]',
            system_action          TEXT,
            updated_at             INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS notification (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            message     TEXT NOT NULL,
            kind        TEXT NOT NULL
                        CHECK (kind IN ('default', 'curation-feed')),
            created_at  INTEGER NOT NULL,
            sent_at     INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_notification_pending
            ON notification (created_at, id) WHERE sent_at IS NULL;

        CREATE TABLE IF NOT EXISTS subscription (
            user_id        INTEGER NOT NULL,
            submission_id  INTEGER NOT NULL REFERENCES submission (id),
            PRIMARY KEY (user_id, submission_id)
        );

        CREATE TABLE IF NOT EXISTS notification_preference (
            user_id  INTEGER NOT NULL,
            action   TEXT NOT NULL,
            PRIMARY KEY (user_id, action)
        );

        INSERT INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| IntakeError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}
