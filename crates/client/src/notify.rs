//! User-visible notifications (failure toasts).

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::warn;

const RECENT_LIMIT: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Fan-out point for user-facing notices. Keeps a bounded recent list for
/// late subscribers and UI display.
pub struct NotificationCenter {
    tx: broadcast::Sender<Notification>,
    recent: Mutex<Vec<Notification>>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationCenter {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            tx,
            recent: Mutex::new(Vec::new()),
        }
    }

    pub fn notify(&self, title: &str, message: &str) {
        warn!(title, message, "user notification");

        let notification = Notification {
            title: title.to_string(),
            message: message.to_string(),
            at: Utc::now(),
        };

        if let Ok(mut recent) = self.recent.lock() {
            recent.push(notification.clone());
            let len = recent.len();
            if len > RECENT_LIMIT {
                recent.drain(..len - RECENT_LIMIT);
            }
        }

        // Nobody listening is fine.
        let _ = self.tx.send(notification);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn recent(&self) -> Vec<Notification> {
        self.recent
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_list_is_bounded() {
        let center = NotificationCenter::new();
        for i in 0..60 {
            center.notify("title", &format!("message {i}"));
        }
        let recent = center.recent();
        assert_eq!(recent.len(), RECENT_LIMIT);
        assert_eq!(recent.last().unwrap().message, "message 59");
    }

    #[tokio::test]
    async fn test_subscribers_receive_notifications() {
        let center = NotificationCenter::new();
        let mut rx = center.subscribe();
        center.notify("Save failed", "could not reach the server");

        let received = rx.recv().await.unwrap();
        assert_eq!(received.title, "Save failed");
    }
}
