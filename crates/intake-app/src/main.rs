//! Intake daemon binary - composition root.
//!
//! Loads configuration, opens the SQLite store (running migrations), and
//! drains the notification outbox until interrupted. The workflow
//! coordinator itself is a library surface; host services embed it and
//! share this database.

mod cli;

use std::sync::Arc;

use clap::Parser;

use intake_core::config::IntakeConfig;
use intake_notify::{DeliveryChannel, Dispatcher, LogChannel};
use intake_storage::Database;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::CliArgs::parse();

    // Tracing. --log-level beats RUST_LOG beats "info".
    let filter = match args.log_level.as_deref() {
        Some(level) => tracing_subscriber::EnvFilter::new(level),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting intake v{}", env!("CARGO_PKG_VERSION"));

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = IntakeConfig::load_or_default(&config_file);
    if let Some(db_path) = args.db_path {
        config.storage.db_path = db_path;
    }
    if args.dev {
        config.notifications.dev_mode = true;
    }

    // Storage.
    let db = Arc::new(Database::new(&config.storage.db_path)?);

    // Delivery channel. Without an external channel configured, dev mode is
    // the only sensible behavior.
    if !config.notifications.dev_mode {
        tracing::warn!("No external delivery channel configured; deliveries will be logged");
    }
    let channel: Arc<dyn DeliveryChannel> = Arc::new(LogChannel);

    // Outbox dispatcher.
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&db),
        channel,
        &config.notifications,
    ));
    let runner = Arc::clone(&dispatcher);
    let dispatch_task = tokio::spawn(async move { runner.run().await });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    dispatcher.shutdown();
    dispatch_task.await?;

    Ok(())
}
