use super::LocalNotification;
use crate::errors::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

/// Something that can show a notification to the user
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Shows `notification`
    async fn notify(&self, notification: &LocalNotification) -> Result<()>;
}

/// Writes notifications to the log; used by the headless binary
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, notification: &LocalNotification) -> Result<()> {
        info!(
            channel = notification.channel.id(),
            deep_link = %notification.deep_link,
            title = %notification.title,
            "{}",
            notification.body
        );
        Ok(())
    }
}

/// Records notifications in memory
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<LocalNotification>>,
}

impl MemoryNotifier {
    /// Empty notifier
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far, oldest first
    pub async fn sent(&self) -> Vec<LocalNotification> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn notify(&self, notification: &LocalNotification) -> Result<()> {
        self.sent.lock().await.push(notification.clone());
        Ok(())
    }
}
