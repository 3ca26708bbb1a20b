//! CLI argument definitions for the intake daemon.
//!
//! Uses `clap` with derive macros. Priority resolution: CLI args > env
//! vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Intake — submission review workflow daemon.
#[derive(Parser, Debug)]
#[command(name = "intake", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Path to the SQLite database file.
    #[arg(long = "db-path")]
    pub db_path: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Log notification deliveries instead of sending them.
    #[arg(long = "dev")]
    pub dev: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > INTAKE_CONFIG env var > ~/.intake/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("INTAKE_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }
}

fn default_config_path() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".intake").join("config.toml");
    }
    PathBuf::from("config.toml")
}
