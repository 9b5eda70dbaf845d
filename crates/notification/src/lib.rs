//! User-facing notification sink.
//!
//! Workflows report progress as toasts: a loading toast that is updated while a
//! transaction moves through its stages, then dismissed and superseded by exactly
//! one terminal toast (success, error or info).

use serde::{Deserialize, Serialize};

pub mod recording;
pub mod tracing_sink;

pub use recording::RecordingNotifier;
pub use tracing_sink::TracingNotifier;

/// Identifier of a loading toast, used to update or dismiss it
pub type ToastId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToastKind {
    Loading,
    Success,
    Error,
    Info,
}

impl ToastKind {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ToastKind::Loading)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

/// Trait for toast providers
pub trait NotificationSink: Send + Sync {
    /// Show a loading toast and return its id
    fn loading(&self, message: &str) -> ToastId;

    /// Replace the text of an existing loading toast
    fn update_loading(&self, id: ToastId, message: &str);

    fn dismiss(&self, id: ToastId);

    fn success(&self, message: &str);

    fn error(&self, message: &str);

    fn info(&self, message: &str);
}
