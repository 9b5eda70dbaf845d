use crate::{NotificationSink, Toast, ToastId, ToastKind};
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Recorded {
    next_id: ToastId,
    active: BTreeMap<ToastId, String>,
    history: Vec<Toast>,
    /// Terminal toasts shown while a loading toast was still on screen
    stacked: usize,
}

/// In-memory notification sink for tests and headless callers
///
/// Keeps the full toast history and the set of loading toasts that have not
/// been dismissed yet.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    inner: Mutex<Recorded>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<Toast> {
        self.lock().history.clone()
    }

    /// Success, error and info toasts in the order shown
    pub fn terminal(&self) -> Vec<Toast> {
        self.lock()
            .history
            .iter()
            .filter(|t| t.kind.is_terminal())
            .cloned()
            .collect()
    }

    pub fn count(&self, kind: ToastKind) -> usize {
        self.lock().history.iter().filter(|t| t.kind == kind).count()
    }

    /// Loading toasts that are still visible
    pub fn active_loading(&self) -> Vec<String> {
        self.lock().active.values().cloned().collect()
    }

    /// Number of terminal toasts raised on top of an undismissed loading toast
    pub fn stacked(&self) -> usize {
        self.lock().stacked
    }

    pub fn last(&self) -> Option<Toast> {
        self.lock().history.last().cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
        // A panic while holding the lock leaves plain data behind; keep reading it
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push_terminal(&self, kind: ToastKind, message: &str) {
        let mut inner = self.lock();
        if !inner.active.is_empty() {
            inner.stacked += 1;
        }
        inner.history.push(Toast {
            kind,
            message: message.to_string(),
        });
    }
}

impl NotificationSink for RecordingNotifier {
    fn loading(&self, message: &str) -> ToastId {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.active.insert(id, message.to_string());
        inner.history.push(Toast {
            kind: ToastKind::Loading,
            message: message.to_string(),
        });
        id
    }

    fn update_loading(&self, id: ToastId, message: &str) {
        let mut inner = self.lock();
        if let Some(current) = inner.active.get_mut(&id) {
            *current = message.to_string();
        }
        inner.history.push(Toast {
            kind: ToastKind::Loading,
            message: message.to_string(),
        });
    }

    fn dismiss(&self, id: ToastId) {
        self.lock().active.remove(&id);
    }

    fn success(&self, message: &str) {
        self.push_terminal(ToastKind::Success, message);
    }

    fn error(&self, message: &str) {
        self.push_terminal(ToastKind::Error, message);
    }

    fn info(&self, message: &str) {
        self.push_terminal(ToastKind::Info, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loading_then_dismiss_then_success() {
        let notifier = RecordingNotifier::new();

        let id = notifier.loading("Sending transaction...");
        notifier.update_loading(id, "Confirming transaction...");
        assert_eq!(notifier.active_loading(), vec!["Confirming transaction...".to_string()]);

        notifier.dismiss(id);
        notifier.success("done");

        assert!(notifier.active_loading().is_empty());
        assert_eq!(notifier.stacked(), 0);
        assert_eq!(notifier.terminal().len(), 1);
        assert_eq!(notifier.last().unwrap().kind, ToastKind::Success);
    }

    #[test]
    fn test_terminal_over_active_loading_is_counted() {
        let notifier = RecordingNotifier::new();

        let _id = notifier.loading("Preparing transaction...");
        notifier.error("boom");

        assert_eq!(notifier.stacked(), 1);
        assert_eq!(notifier.count(ToastKind::Error), 1);
    }
}
