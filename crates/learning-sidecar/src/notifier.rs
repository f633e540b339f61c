//! Best-effort desktop notification when a correction reaches Gate 3.
//!
//! `notify-send` is an out-of-scope external collaborator; the orchestration
//! around it — deciding *when* to notify, building the title/body, and
//! swallowing unavailability so it never blocks or fails the pipeline — is
//! in scope and lives here behind an injectable [`NotifySink`] so tests can
//! assert a notification was requested without shelling out.

use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::NotificationConfig;

/// Where a notification actually goes. The production sink shells out to
/// the configured command; tests substitute a recording sink.
pub trait NotifySink: Send + Sync {
    fn send(&self, title: &str, message: &str) -> bool;
}

/// Shells out to `notify-send`-shaped `<command> <title> <message>`,
/// checking availability with `which` first. Any failure is swallowed.
pub struct CommandSink {
    command: String,
}

impl NotifySink for CommandSink {
    fn send(&self, title: &str, message: &str) -> bool {
        let available = Command::new("which")
            .arg(&self.command)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);
        if !available {
            tracing::warn!(command = %self.command, "notification command not available, skipping");
            return false;
        }
        match Command::new(&self.command).arg(title).arg(message).output() {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "failed to send notification");
                false
            }
        }
    }
}

/// Records every call without touching the outside world. Used by tests
/// that need to assert a notification *was requested* for a given count.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

impl NotifySink for RecordingSink {
    fn send(&self, title: &str, message: &str) -> bool {
        self.sent.lock().unwrap().push((title.to_string(), message.to_string()));
        true
    }
}

pub struct Notifier {
    enabled: bool,
    sink: Arc<dyn NotifySink>,
    sent_count: AtomicUsize,
}

impl Notifier {
    pub fn new(config: &NotificationConfig) -> Self {
        Self {
            enabled: config.enabled,
            sink: Arc::new(CommandSink {
                command: config.command.clone(),
            }),
            sent_count: AtomicUsize::new(0),
        }
    }

    pub fn with_sink(enabled: bool, sink: Arc<dyn NotifySink>) -> Self {
        Self {
            enabled,
            sink,
            sent_count: AtomicUsize::new(0),
        }
    }

    /// Notifies that `count` correction(s) are pending admin review.
    pub fn notify_learning_review(&self, count: usize) {
        if !self.enabled {
            tracing::debug!("notifications disabled in config");
            return;
        }
        let title = "Jarvis - Learning Review";
        let plural = if count > 1 { "s" } else { "" };
        let message = format!(
            "{count} correction{plural} en attente d'approbation. Run: learning-sidecar review list"
        );
        if self.sink.send(title, &message) {
            self.sent_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn sent_count(&self) -> usize {
        self.sent_count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_notifier_never_calls_sink() {
        let sink = Arc::new(RecordingSink::default());
        let notifier = Notifier::with_sink(false, sink.clone());
        notifier.notify_learning_review(1);
        assert_eq!(notifier.sent_count(), 0);
        assert!(sink.sent().is_empty());
    }

    #[test]
    fn enabled_notifier_records_message() {
        let sink = Arc::new(RecordingSink::default());
        let notifier = Notifier::with_sink(true, sink.clone());
        notifier.notify_learning_review(3);
        assert_eq!(notifier.sent_count(), 1);
        let sent = sink.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains('3'));
    }
}
