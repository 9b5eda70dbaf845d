use crate::{NotificationSink, ToastId};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{error, info, warn};

/// Notification sink that writes every toast to the log
#[derive(Debug, Default)]
pub struct TracingNotifier {
    next_id: AtomicU64,
}

impl TracingNotifier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NotificationSink for TracingNotifier {
    fn loading(&self, message: &str) -> ToastId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        info!(toast_id = id, "⏳ {}", message);
        id
    }

    fn update_loading(&self, id: ToastId, message: &str) {
        info!(toast_id = id, "⏳ {}", message);
    }

    fn dismiss(&self, id: ToastId) {
        tracing::debug!(toast_id = id, "Toast dismissed");
    }

    fn success(&self, message: &str) {
        info!("✅ {}", message);
    }

    fn error(&self, message: &str) {
        error!("❌ {}", message);
    }

    fn info(&self, message: &str) {
        warn!("ℹ️ {}", message);
    }
}
