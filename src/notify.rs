use log::error;
use serde::Serialize;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NotificationLevel {
    Info,
    Error,
}

/// Dismissable message shown to the user.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

#[derive(Clone)]
pub struct Notifier {
    sender: broadcast::Sender<Notification>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    pub fn info(&self, message: impl Into<String>) {
        self.publish(NotificationLevel::Info, message.into());
    }

    /// Log the failure with full context and show the user a generic message.
    pub fn report_failure(&self, action: &str, err: &anyhow::Error) {
        error!("{action} failed: {err:#}");
        self.publish(
            NotificationLevel::Error,
            format!("Could not {action}. Please try again."),
        );
    }

    fn publish(&self, level: NotificationLevel, message: String) {
        // No subscribers just means nothing is on screen to show it.
        let _ = self.sender.send(Notification { level, message });
    }
}
