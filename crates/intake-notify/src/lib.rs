//! Notification delivery for the intake system.
//!
//! The dispatcher drains the durable outbox into an external delivery
//! channel at-least-once, decoupled from the workflow transactions that
//! enqueue messages.

pub mod channel;
pub mod dispatcher;

pub use channel::{DeliveryChannel, LogChannel};
pub use dispatcher::{Dispatcher, DispatcherHandle};
