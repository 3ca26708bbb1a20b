//! Workflow engine for the intake review system.
//!
//! Rebuilds the derived per-submission projection from the event log,
//! decides action legality against it, and coordinates the atomic
//! validate/append/recompute/enqueue unit around the storage layer.

pub mod coordinator;
pub mod projection;
pub mod render;
pub mod validator;

pub use coordinator::{Clock, SystemClock, WorkflowCoordinator};
pub use projection::{rebuild, TrackedStatus, TRACKED_STATUSES};
pub use validator::validate_action;
