// Notification delivery boundary
use crate::domain::notification::Notification;
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<()>;
}
