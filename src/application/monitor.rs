// Monitor - wires telemetry into the energy store and drives the refresh loop
use crate::application::energy_service::{EnergyService, EnergyUpdate};
use crate::application::notifier::Notifier;
use crate::application::telemetry_service::{Subscription, TelemetryService};
use crate::domain::device::{DeviceCommand, DeviceReading};
use crate::domain::insight::InsightTrigger;
use crate::domain::notification::{Notification, NotificationRequest};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;

/// Buffered device updates per live-feed listener
const FEED_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct Monitor {
    telemetry: TelemetryService,
    energy: EnergyService,
    notifier: Arc<dyn Notifier>,
    feed: broadcast::Sender<DeviceReading>,
    refresher: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Monitor {
    pub fn new(telemetry: TelemetryService, energy: EnergyService, notifier: Arc<dyn Notifier>) -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            telemetry,
            energy,
            notifier,
            feed,
            refresher: Arc::new(Mutex::new(None)),
        }
    }

    pub fn telemetry(&self) -> &TelemetryService {
        &self.telemetry
    }

    pub fn energy(&self) -> &EnergyService {
        &self.energy
    }

    /// Live device updates for the presentation layer.
    pub fn feed(&self) -> broadcast::Receiver<DeviceReading> {
        self.feed.subscribe()
    }

    /// Start telemetry and the periodic refresh. Takes one reading and one
    /// snapshot right away so the first screen is never empty.
    pub async fn start(&self, tick: Duration, refresh: Duration) {
        if self.telemetry.is_running().await {
            tracing::warn!("Monitor already running, restarting timers");
        }
        let feed = self.feed.clone();
        self.telemetry
            .subscribe(
                Subscription::All,
                Arc::new(move |reading: &DeviceReading| {
                    // No listeners is fine
                    let _ = feed.send(reading.clone());
                }),
            )
            .await;

        self.telemetry.tick().await;
        self.telemetry.start(tick).await;
        self.refresh().await;

        let monitor = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + refresh, refresh);
            loop {
                ticker.tick().await;
                monitor.refresh().await;
            }
        });
        if let Some(previous) = self.refresher.lock().await.replace(handle) {
            previous.abort();
        }
        tracing::info!("Refreshing energy data every {:?}", refresh);
    }

    pub async fn stop(&self) {
        if let Some(handle) = self.refresher.lock().await.take() {
            handle.abort();
        }
        self.telemetry.stop().await;
    }

    /// Fold the current readings into a snapshot and raise notifications for new alerts.
    pub async fn refresh(&self) -> EnergyUpdate {
        let readings = self.telemetry.readings().await;
        let update = self.energy.update_energy_data(&readings).await;

        let preferences = self.energy.preferences().await;
        for insight in &update.insights {
            let notification = match insight.trigger {
                Some(InsightTrigger::HighPower) => {
                    Notification::energy_alert(update.snapshot.total_power, preferences.thresholds.max_power)
                }
                Some(InsightTrigger::HighCost) => Notification::cost_alert(
                    update.snapshot.total_cost,
                    preferences.thresholds.max_daily_cost,
                    preferences.units.currency,
                ),
                _ => continue,
            };
            self.notify(notification).await;
        }
        update
    }

    /// Flip a device to the opposite state.
    pub async fn toggle_device(&self, device_id: &str) -> bool {
        let Some(device) = self.telemetry.reading(device_id).await else {
            tracing::warn!("Cannot toggle unknown device {}", device_id);
            return false;
        };

        let command = DeviceCommand::toggle_of(device.is_on);
        let ok = self.telemetry.send_command(device_id, command).await;
        if ok {
            self.notify(Notification::device_control(&device.name, command)).await;
        }
        ok
    }

    pub async fn toggle_all(&self, turn_on: bool) -> bool {
        let command = if turn_on { DeviceCommand::On } else { DeviceCommand::Off };
        let ok = self.telemetry.send_bulk_command(command).await;
        if ok {
            self.notify(Notification::bulk_control(command)).await;
        }
        ok
    }

    pub async fn send_notification(&self, request: NotificationRequest) -> bool {
        let currency = self.energy.preferences().await.units.currency;
        self.notify(request.into_notification(currency)).await
    }

    /// Deliver a notification if the user has them enabled. Returns whether it went out.
    async fn notify(&self, notification: Notification) -> bool {
        if !self.energy.preferences().await.notifications {
            tracing::debug!("Notifications disabled, dropping {:?}", notification.kind);
            return false;
        }
        match self.notifier.notify(&notification).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Error sending notification: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::device::default_catalog;
    use crate::domain::energy::Tariff;
    use crate::domain::notification::NotificationKind;
    use crate::domain::preferences::{PreferencesPatch, ThresholdsPatch};
    use crate::error::{MonitorError, Result};
    use crate::infrastructure::simulated_gateway::SimulatedGateway;
    use crate::infrastructure::store::MemoryStore;
    use async_trait::async_trait;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: std::sync::Mutex<Vec<Notification>>,
        fail: bool,
    }

    impl RecordingNotifier {
        fn kinds(&self) -> Vec<NotificationKind> {
            self.sent.lock().unwrap().iter().map(|n| n.kind).collect()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, notification: &Notification) -> Result<()> {
            if self.fail {
                return Err(MonitorError::Gateway("push service down".into()));
            }
            self.sent.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    fn monitor(notifier: Arc<RecordingNotifier>) -> Monitor {
        let gateway = Arc::new(SimulatedGateway::with_seed(default_catalog(), Duration::from_secs(5), 5));
        Monitor::new(
            TelemetryService::new(gateway),
            EnergyService::new(Arc::new(MemoryStore::new()), Tariff::default()),
            notifier,
        )
    }

    #[tokio::test]
    async fn test_refresh_records_snapshot_from_readings() {
        let monitor = monitor(Arc::default());
        monitor.telemetry().tick().await;

        let readings = monitor.telemetry().readings().await;
        let expected: f64 = readings
            .iter()
            .filter(|r| r.is_online && r.is_on)
            .map(|r| r.current_power)
            .sum();

        let update = monitor.refresh().await;
        assert_eq!(update.snapshot.total_power, expected);
        assert_eq!(update.snapshot.total_devices, 5);
        assert_eq!(monitor.energy().history().await.hourly.len(), 1);
    }

    #[tokio::test]
    async fn test_high_power_alert_is_notified() {
        let notifier = Arc::new(RecordingNotifier::default());
        let monitor = monitor(notifier.clone());
        monitor
            .energy()
            .update_thresholds(ThresholdsPatch {
                max_power: Some(-1.0),
                ..Default::default()
            })
            .await;
        monitor.telemetry().tick().await;

        monitor.refresh().await;
        assert!(notifier.kinds().contains(&NotificationKind::EnergyAlert));
    }

    #[tokio::test]
    async fn test_notifications_respect_preference() {
        let notifier = Arc::new(RecordingNotifier::default());
        let monitor = monitor(notifier.clone());
        monitor
            .energy()
            .update_preferences(PreferencesPatch {
                notifications: Some(false),
                ..Default::default()
            })
            .await;

        let sent = monitor
            .send_notification(NotificationRequest::DeviceOffline {
                device_name: "Refrigerator".into(),
            })
            .await;
        assert!(!sent);
        assert!(notifier.kinds().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_device_flips_and_notifies() {
        let notifier = Arc::new(RecordingNotifier::default());
        let monitor = monitor(notifier.clone());
        monitor.telemetry().tick().await;
        let before = monitor.telemetry().reading("2").await.unwrap().is_on;

        assert!(monitor.toggle_device("2").await);
        assert_eq!(monitor.telemetry().reading("2").await.unwrap().is_on, !before);
        assert_eq!(notifier.kinds(), vec![NotificationKind::DeviceControl]);
    }

    #[tokio::test]
    async fn test_toggle_unknown_device_leaves_state_alone() {
        let notifier = Arc::new(RecordingNotifier::default());
        let monitor = monitor(notifier.clone());
        monitor.telemetry().tick().await;
        let readings = monitor.telemetry().readings().await;

        assert!(!monitor.toggle_device("404").await);
        assert_eq!(monitor.telemetry().readings().await, readings);
        assert!(monitor.energy().history().await.hourly.is_empty());
        assert!(monitor.energy().current().await.is_none());
        assert!(notifier.kinds().is_empty());
    }

    #[tokio::test]
    async fn test_notifier_failure_is_swallowed() {
        let notifier = Arc::new(RecordingNotifier {
            fail: true,
            ..Default::default()
        });
        let monitor = monitor(notifier);
        monitor.telemetry().tick().await;

        // The command itself still succeeds
        assert!(monitor.toggle_device("1").await);
    }

    #[tokio::test]
    async fn test_start_primes_state_and_feeds_updates() {
        let monitor = monitor(Arc::default());
        let mut feed = monitor.feed();

        monitor.start(Duration::from_secs(3600), Duration::from_secs(3600)).await;
        assert_eq!(monitor.telemetry().readings().await.len(), 5);
        assert!(monitor.energy().current().await.is_some());

        let first = feed.recv().await.unwrap();
        assert_eq!(first.id, "1");

        assert!(monitor.toggle_all(false).await);
        monitor.stop().await;
        assert!(!monitor.telemetry().is_running().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_timer_records_snapshots() {
        let monitor = monitor(Arc::default());
        monitor.start(Duration::from_secs(5), Duration::from_secs(30)).await;
        assert_eq!(monitor.energy().history().await.hourly.len(), 1);

        tokio::time::sleep(Duration::from_millis(5010)).await;
        assert_eq!(monitor.energy().history().await.hourly.len(), 1);

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(monitor.energy().history().await.hourly.len(), 2);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(monitor.energy().history().await.hourly.len(), 3);
        monitor.stop().await;
    }
}
