//! SQLite persistence for the intake workflow core.
//!
//! Provides a WAL-mode database with migrations and query modules for the
//! action event log, the artifact version log, the per-submission projection
//! row, and the notification outbox with subscriptions and per-action
//! preferences. All queries take a `&Connection` so they compose inside the
//! transactions opened by [`Database::with_tx`].

pub mod artifacts;
pub mod db;
pub mod events;
pub mod migrations;
pub mod notifications;
pub mod projection;
pub mod submissions;

pub use db::Database;

use chrono::{DateTime, TimeZone, Utc};
use intake_core::error::IntakeError;

/// Convert persisted unix seconds into a UTC timestamp.
pub(crate) fn from_unix(secs: i64) -> Result<DateTime<Utc>, IntakeError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| IntakeError::Storage(format!("invalid timestamp {}", secs)))
}
