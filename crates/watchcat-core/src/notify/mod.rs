//! Notification sinks and the fan-out that broadcasts to them.
//!
//! Delivery is best-effort: the fan-out calls every sink in registration
//! order, logs sink failures and carries on. A misbehaving sink can never
//! block the others or fail a check.

pub mod console;
pub mod slack;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::error::CheckError;
use crate::types::TargetKind;

pub use console::ConsoleNotifier;
pub use slack::SlackNotifier;

// ---------------------------------------------------------------------------
// NotificationEvent
// ---------------------------------------------------------------------------

/// New activity on one target. Built once per detected change and shared
/// read-only with every sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationEvent {
    pub owner: String,
    pub repo_name: String,
    pub kind: TargetKind,
    pub current: String,
    /// `""` when the target had never been observed.
    pub previous: String,
    pub link: String,
    pub title: String,
    pub body: String,
    pub avatar_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook returned HTTP {0}")]
    Status(u16),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn notify(&self, event: &NotificationEvent) -> Result<(), NotifyError>;

    async fn report_error(&self, err: &CheckError) -> Result<(), NotifyError>;
}

// ---------------------------------------------------------------------------
// FanOut
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FanOut {
    sinks: Vec<Box<dyn Notifier>>,
}

impl std::fmt::Debug for FanOut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanOut")
            .field("sinks", &self.sinks.iter().map(|s| s.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl FanOut {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: impl Notifier + 'static) {
        self.sinks.push(Box::new(sink));
    }

    pub fn with(mut self, sink: impl Notifier + 'static) -> Self {
        self.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub async fn notify(&self, event: &NotificationEvent) {
        for sink in &self.sinks {
            if let Err(e) = sink.notify(event).await {
                tracing::warn!(sink = sink.name(), error = %e, "notification delivery failed");
            }
        }
    }

    pub async fn report_error(&self, err: &CheckError) {
        for sink in &self.sinks {
            if let Err(e) = sink.report_error(err).await {
                tracing::warn!(sink = sink.name(), error = %e, "error delivery failed");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------

/// In-memory sink recording everything it receives.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    pub(crate) struct RecordingNotifier {
        pub events: Arc<Mutex<Vec<NotificationEvent>>>,
        pub errors: Arc<Mutex<Vec<String>>>,
        pub fail: bool,
    }

    pub fn sample_event() -> NotificationEvent {
        NotificationEvent {
            owner: "o".into(),
            repo_name: "r".into(),
            kind: TargetKind::Release,
            current: "1.1.0".into(),
            previous: "1.0.0".into(),
            link: "https://github.com/o/r/releases/1.1.0".into(),
            title: "1.1.0".into(),
            body: "notes".into(),
            avatar_url: None,
        }
    }

    impl RecordingNotifier {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn events(&self) -> Vec<NotificationEvent> {
            self.events.lock().unwrap().clone()
        }

        pub fn errors(&self) -> Vec<String> {
            self.errors.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        fn name(&self) -> &str {
            "recording"
        }

        async fn notify(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
            self.events.lock().unwrap().push(event.clone());
            if self.fail {
                return Err(NotifyError::Status(500));
            }
            Ok(())
        }

        async fn report_error(&self, err: &CheckError) -> Result<(), NotifyError> {
            self.errors.lock().unwrap().push(err.to_string());
            if self.fail {
                return Err(NotifyError::Status(500));
            }
            Ok(())
        }
    }
}
