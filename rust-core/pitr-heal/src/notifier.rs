// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Operator notifications.
//
// Producers call `Notifier::notify`, which never blocks: the queued notifier
// drops a message when its bounded queue is full. A single worker drains the
// queue into a `NotificationSink`, pacing deliveries; delivery failures are
// logged and the message is discarded.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::PitrResult;

/// How urgently an operator should look at a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    /// Message text prefixed with the severity for anything above info.
    pub fn render(&self) -> String {
        match self.severity {
            Severity::Info => self.message.clone(),
            severity => format!("[{severity}] {}", self.message),
        }
    }
}

/// Fire-and-forget notification entry point.
pub trait Notifier: Send + Sync {
    fn notify(&self, severity: Severity, message: String);
}

/// A notifier that enqueues onto a bounded channel.
pub struct QueuedNotifier {
    sender: mpsc::Sender<Notification>,
    dropped: AtomicU64,
}

impl QueuedNotifier {
    /// Create a notifier and the receiving end for its worker.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                sender,
                dropped: AtomicU64::new(0),
            },
            receiver,
        )
    }

    /// Number of messages discarded because the queue was full or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Notifier for QueuedNotifier {
    fn notify(&self, severity: Severity, message: String) {
        info!(severity = %severity, message = %message, "Outgoing notification");
        if let Err(err) = self.sender.try_send(Notification::new(severity, message)) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(error = %err, "Notification queue unavailable, dropping message");
        }
    }
}

/// Keeps every notification in memory. Useful for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Notifications at or above `severity`.
    pub fn at_least(&self, severity: Severity) -> Vec<Notification> {
        self.sent()
            .into_iter()
            .filter(|n| n.severity >= severity)
            .collect()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, severity: Severity, message: String) {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Notification::new(severity, message));
    }
}

/// Final delivery channel (chat bot, pager, log).
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> PitrResult<()>;

    fn name(&self) -> &str;
}

/// Delivers notifications to the tracing log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, notification: &Notification) -> PitrResult<()> {
        info!(severity = %notification.severity, "{}", notification.message);
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Drain `receiver` into `sink`, one message at a time with `pacing` between
/// deliveries. Ends when every sender is dropped.
pub fn spawn_notification_worker(
    mut receiver: mpsc::Receiver<Notification>,
    sink: Arc<dyn NotificationSink>,
    pacing: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(sink = sink.name(), "Notification worker started");
        while let Some(notification) = receiver.recv().await {
            match sink.deliver(&notification).await {
                Ok(()) => debug!(sink = sink.name(), "Notification delivered"),
                Err(err) => error!(sink = sink.name(), error = %err, "Notification delivery failed"),
            }
            if !pacing.is_zero() {
                tokio::time::sleep(pacing).await;
            }
        }
        info!(sink = sink.name(), "Notification worker stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PitrError;

    struct CollectingSink {
        delivered: Mutex<Vec<String>>,
        fail_first: bool,
    }

    #[async_trait]
    impl NotificationSink for CollectingSink {
        async fn deliver(&self, notification: &Notification) -> PitrResult<()> {
            let mut delivered = self.delivered.lock().unwrap();
            if self.fail_first && delivered.is_empty() {
                delivered.push(String::new());
                return Err(PitrError::DeliveryFailed("bad gateway".into()));
            }
            delivered.push(notification.render());
            Ok(())
        }

        fn name(&self) -> &str {
            "collecting"
        }
    }

    #[test]
    fn test_full_queue_drops() {
        let (notifier, _receiver) = QueuedNotifier::channel(2);
        notifier.notify(Severity::Info, "one".into());
        notifier.notify(Severity::Info, "two".into());
        notifier.notify(Severity::Critical, "three".into());
        assert_eq!(notifier.dropped(), 1);
    }

    #[test]
    fn test_render_prefixes_severity() {
        assert_eq!(Notification::new(Severity::Info, "ok").render(), "ok");
        assert_eq!(
            Notification::new(Severity::Critical, "lost").render(),
            "[CRITICAL] lost"
        );
    }

    #[test]
    fn test_memory_notifier_filters() {
        let notifier = MemoryNotifier::new();
        notifier.notify(Severity::Info, "a".into());
        notifier.notify(Severity::High, "b".into());
        assert_eq!(notifier.sent().len(), 2);
        assert_eq!(notifier.at_least(Severity::High).len(), 1);
    }

    #[tokio::test]
    async fn test_worker_delivers_in_order_and_survives_failures() {
        let (notifier, receiver) = QueuedNotifier::channel(8);
        let sink = Arc::new(CollectingSink {
            delivered: Mutex::new(Vec::new()),
            fail_first: true,
        });
        let handle = spawn_notification_worker(receiver, sink.clone(), Duration::ZERO);

        notifier.notify(Severity::Info, "first".into());
        notifier.notify(Severity::Warning, "second".into());
        notifier.notify(Severity::Info, "third".into());
        drop(notifier);
        handle.await.unwrap();

        let delivered = sink.delivered.lock().unwrap().clone();
        assert_eq!(delivered, vec!["".to_string(), "[WARNING] second".into(), "third".into()]);
    }
}
