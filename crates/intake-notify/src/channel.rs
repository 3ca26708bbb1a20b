//! The external delivery seam.

use intake_core::error::Result;
use intake_core::types::NotificationKind;
use tracing::debug;

/// Outbound message channel the dispatcher delivers into.
///
/// Implementations route by [`NotificationKind`] (personal mentions vs. the
/// public curation feed). A failed delivery leaves the record pending; the
/// dispatcher retries it on the next wake.
pub trait DeliveryChannel: Send + Sync {
    fn deliver(&self, message: &str, kind: NotificationKind) -> Result<()>;
}

/// Channel that only logs. Used in dev mode so local runs never send
/// anything outward.
pub struct LogChannel;

impl DeliveryChannel for LogChannel {
    fn deliver(&self, message: &str, kind: NotificationKind) -> Result<()> {
        debug!("dev mode active, not delivering {} message: {}", kind, message);
        Ok(())
    }
}
