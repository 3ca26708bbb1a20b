//! Background notification dispatcher.
//!
//! A single long-lived task drains the outbox into the delivery channel.
//! It blocks on a capacity-one wake signal: `Notify::notify_one` stores at
//! most one permit, so enqueuers can signal without blocking and redundant
//! signals collapse into the pending one. After fetching a record the
//! dispatcher re-signals itself before delivering, which guarantees a
//! future wake whether the delivery succeeds (next record) or fails
//! (retry). Records are only marked sent after a successful delivery, so
//! delivery is at-least-once and a record's `sent_at` is written exactly
//! once.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tracing::{debug, error, info};

use intake_core::config::NotificationConfig;
use intake_core::error::{IntakeError, Result};
use intake_storage::{notifications, Database};

use crate::channel::DeliveryChannel;

/// Cloneable handle used by producers to wake the dispatcher.
#[derive(Clone)]
pub struct DispatcherHandle {
    wake: Arc<Notify>,
}

impl DispatcherHandle {
    /// Non-blocking wake. Dropped silently when a wake is already pending;
    /// the stored permit guarantees the queue will be looked at.
    pub fn signal(&self) {
        self.wake.notify_one();
    }
}

/// Drains pending notifications into the delivery channel.
pub struct Dispatcher {
    db: Arc<Database>,
    channel: Arc<dyn DeliveryChannel>,
    wake: Arc<Notify>,
    shutdown: Arc<Notify>,
    min_send_interval: Duration,
    error_backoff: Duration,
}

impl Dispatcher {
    pub fn new(
        db: Arc<Database>,
        channel: Arc<dyn DeliveryChannel>,
        config: &NotificationConfig,
    ) -> Self {
        Self {
            db,
            channel,
            wake: Arc::new(Notify::new()),
            shutdown: Arc::new(Notify::new()),
            min_send_interval: Duration::from_millis(config.min_send_interval_ms),
            error_backoff: Duration::from_secs(config.error_backoff_secs),
        }
    }

    /// Handle for enqueuers to signal "queue not empty".
    pub fn handle(&self) -> DispatcherHandle {
        DispatcherHandle {
            wake: Arc::clone(&self.wake),
        }
    }

    /// Signal the dispatcher to shut down gracefully.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Run the drain loop until shutdown.
    ///
    /// Wakes on the signal, rate-limits itself, then processes the oldest
    /// pending record. Errors are logged and never propagate; the record
    /// stays pending and is retried on the next wake.
    pub async fn run(&self) {
        info!("notification dispatcher started");

        // Catch anything left pending by a previous process.
        self.wake.notify_one();

        loop {
            tokio::select! {
                _ = self.wake.notified() => {}
                _ = self.shutdown.notified() => {
                    info!("notification dispatcher stopped");
                    return;
                }
            }

            // Minimum spacing between sends.
            tokio::select! {
                _ = tokio::time::sleep(self.min_send_interval) => {}
                _ = self.shutdown.notified() => {
                    info!("notification dispatcher stopped");
                    return;
                }
            }

            if let Err(e) = self.deliver_oldest() {
                error!("notification delivery failed: {}", e);
                // The item stays pending. Back off, then make sure we wake
                // again to retry it.
                tokio::select! {
                    _ = tokio::time::sleep(self.error_backoff) => {}
                    _ = self.shutdown.notified() => {
                        info!("notification dispatcher stopped");
                        return;
                    }
                }
                self.wake.notify_one();
            }
        }
    }

    /// Deliver the oldest pending record, if any.
    fn deliver_oldest(&self) -> Result<()> {
        let pending = self.db.with_conn(notifications::oldest_pending_notification)?;
        let Some(record) = pending else {
            debug!("notification queue empty, waiting for next signal");
            return Ok(());
        };

        // More work may remain after this record; wake again regardless of
        // the delivery outcome.
        self.wake.notify_one();

        self.channel
            .deliver(&record.message, record.kind)
            .map_err(|e| IntakeError::Delivery(e.to_string()))?;

        self.db.with_conn(|conn| {
            notifications::mark_notification_sent(conn, record.id, Utc::now())
        })?;

        debug!("notification {} delivered", record.id);
        Ok(())
    }
}
