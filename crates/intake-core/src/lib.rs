//! Core types for the intake submission review system.
//!
//! Defines the closed action-kind enum, the event/artifact/projection
//! records shared by every crate, the error taxonomy, role helpers, and
//! configuration loading.

pub mod config;
pub mod error;
pub mod roles;
pub mod types;

pub use config::IntakeConfig;
pub use error::{IntakeError, Result};
pub use roles::RoleProvider;
pub use types::*;
