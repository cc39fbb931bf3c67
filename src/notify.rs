//! User-facing notices published on an application-scoped channel.
//!
//! Front ends subscribe and render whatever arrives; nothing polls shared
//! state. Publishing with no subscribers is fine, the notice is still logged.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Success,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Info => write!(f, "info"),
            Level::Success => write!(f, "success"),
            Level::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub level: Level,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Cloneable handle to the notice channel.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notice>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    pub fn info(&self, message: impl Into<String>) {
        self.publish(Level::Info, message.into());
    }

    pub fn success(&self, message: impl Into<String>) {
        self.publish(Level::Success, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.publish(Level::Error, message.into());
    }

    fn publish(&self, level: Level, message: String) {
        match level {
            Level::Error => tracing::warn!(%message, "notice"),
            _ => tracing::info!(%message, "notice"),
        }
        let notice = Notice {
            level,
            message,
            at: Utc::now(),
        };
        // No subscribers is not an error.
        let _ = self.tx.send(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_notices() {
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();

        notifier.success("Saved");
        notifier.error("Could not save drinks");

        let first = rx.recv().await.unwrap();
        assert_eq!(first.level, Level::Success);
        assert_eq!(first.message, "Saved");

        let second = rx.recv().await.unwrap();
        assert_eq!(second.level, Level::Error);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let notifier = Notifier::default();
        notifier.info("nobody listening");
    }

    #[tokio::test]
    async fn test_clones_share_channel() {
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();
        notifier.clone().info("from clone");
        assert_eq!(rx.recv().await.unwrap().message, "from clone");
    }
}
