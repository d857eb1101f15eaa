use std::io::Write;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{NotificationEvent, Notifier, NotifyError};
use crate::error::CheckError;

/// Writes one line per event, `(owner/name) new <kind>: <link>`.
pub struct ConsoleNotifier {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleNotifier {
    /// Print to stdout.
    pub fn stdout() -> Self {
        Self::to_writer(std::io::stdout())
    }

    pub fn to_writer(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
        }
    }

    fn write_line(&self, line: &str) -> Result<(), NotifyError> {
        // A poisoned lock only means another writer panicked mid-line.
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(out, "{line}")?;
        out.flush()?;
        Ok(())
    }
}

impl Default for ConsoleNotifier {
    fn default() -> Self {
        Self::stdout()
    }
}

pub fn format_event(event: &NotificationEvent) -> String {
    format!(
        "({}/{}) new {}: {}",
        event.owner, event.repo_name, event.kind, event.link
    )
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    fn name(&self) -> &str {
        "std"
    }

    async fn notify(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
        self.write_line(&format_event(event))
    }

    async fn report_error(&self, err: &CheckError) -> Result<(), NotifyError> {
        self.write_line(&format!("error: {err}"))
    }
}
