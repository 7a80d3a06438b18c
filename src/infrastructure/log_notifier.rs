// Notifier that delivers through the tracing log
use crate::application::notifier::Notifier;
use crate::domain::notification::Notification;
use crate::error::Result;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        tracing::info!(
            kind = ?notification.kind,
            "{}: {}",
            notification.title,
            notification.body
        );
        Ok(())
    }
}
