// Telemetry service - latest reading per device, subscriptions and commands
use crate::application::device_gateway::DeviceGateway;
use crate::domain::device::{DeviceCommand, DeviceReading, NewDevice};
use chrono::Utc;
use futures::future::join_all;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

pub type DeviceCallback = Arc<dyn Fn(&DeviceReading) + Send + Sync>;

/// What a callback listens to: one device, or every device.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subscription {
    Device(String),
    All,
}

struct TelemetryState {
    gateway: Arc<dyn DeviceGateway>,
    readings: RwLock<BTreeMap<String, DeviceReading>>,
    subscribers: Mutex<HashMap<Subscription, DeviceCallback>>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Clone)]
pub struct TelemetryService {
    state: Arc<TelemetryState>,
}

impl TelemetryService {
    pub fn new(gateway: Arc<dyn DeviceGateway>) -> Self {
        Self {
            state: Arc::new(TelemetryState {
                gateway,
                readings: RwLock::new(BTreeMap::new()),
                subscribers: Mutex::new(HashMap::new()),
                ticker: Mutex::new(None),
            }),
        }
    }

    /// Poll the gateway every `interval`, first poll one interval from now.
    /// Restarts the timer if already running.
    pub async fn start(&self, interval: Duration) {
        let service = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                service.tick().await;
            }
        });

        if let Some(previous) = self.state.ticker.lock().await.replace(handle) {
            previous.abort();
        }
        tracing::info!(
            "Telemetry started ({} gateway, every {:?})",
            self.state.gateway.kind(),
            interval
        );
    }

    /// Stop the timer, drop every subscription and forget all readings.
    pub async fn stop(&self) {
        if let Some(handle) = self.state.ticker.lock().await.take() {
            handle.abort();
        }
        self.state.subscribers.lock().await.clear();
        self.state.readings.write().await.clear();
        tracing::info!("Telemetry stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.state.ticker.lock().await.is_some()
    }

    /// Poll the gateway once and publish every reading. Returns how many readings arrived.
    pub async fn tick(&self) -> usize {
        let readings = match self.state.gateway.poll().await {
            Ok(readings) => readings,
            Err(e) => {
                tracing::warn!("Telemetry poll failed: {}", e);
                return 0;
            }
        };

        let count = readings.len();
        for reading in readings {
            self.publish(reading).await;
        }
        tracing::debug!("Telemetry tick: {} readings", count);
        count
    }

    pub async fn reading(&self, device_id: &str) -> Option<DeviceReading> {
        self.state.readings.read().await.get(device_id).cloned()
    }

    pub async fn readings(&self) -> Vec<DeviceReading> {
        self.state.readings.read().await.values().cloned().collect()
    }

    /// Register the callback for `key`, replacing any previous one.
    pub async fn subscribe(&self, key: Subscription, callback: DeviceCallback) {
        self.state.subscribers.lock().await.insert(key, callback);
    }

    pub async fn unsubscribe(&self, key: &Subscription) -> bool {
        self.state.subscribers.lock().await.remove(key).is_some()
    }

    /// Switch one device. Unknown devices and gateway failures yield `false`.
    pub async fn send_command(&self, device_id: &str, command: DeviceCommand) -> bool {
        if !self.state.readings.read().await.contains_key(device_id) {
            tracing::warn!("Ignoring {} command for unknown device {}", command, device_id);
            return false;
        }

        tracing::info!("Sending command {} to device {}", command, device_id);
        if let Err(e) = self.state.gateway.send_command(device_id, command).await {
            tracing::error!("Failed to send {} to device {}: {}", command, device_id, e);
            return false;
        }

        let updated = {
            let mut readings = self.state.readings.write().await;
            match readings.get_mut(device_id) {
                Some(reading) => {
                    reading.apply(command, Utc::now());
                    reading.clone()
                }
                // Removed while the command was in flight
                None => return false,
            }
        };
        self.notify(&updated).await;
        true
    }

    /// Send `command` to every online device and wait for all of them.
    ///
    /// Best-effort: a failing device does not undo the others. Returns `true`
    /// only if every command went through.
    pub async fn send_bulk_command(&self, command: DeviceCommand) -> bool {
        let targets: Vec<String> = self
            .state
            .readings
            .read()
            .await
            .values()
            .filter(|r| r.is_online)
            .map(|r| r.id.clone())
            .collect();

        tracing::info!("Sending bulk command {} to {} devices", command, targets.len());
        let results = join_all(targets.iter().map(|id| self.send_command(id, command))).await;
        let failed = results.iter().filter(|ok| !**ok).count();
        if failed > 0 {
            tracing::warn!("Bulk command {}: {} of {} devices failed", command, failed, results.len());
        }
        failed == 0
    }

    /// Register a new, switched-off device and return its id.
    ///
    /// The id is reserved in the table before the gateway hears about it and
    /// released again if registration fails.
    pub async fn add_device(&self, device: NewDevice) -> crate::error::Result<String> {
        let reading = {
            let mut readings = self.state.readings.write().await;
            let id = next_device_id(&readings);
            let reading = DeviceReading::registered(id.clone(), device.name, device.device_type);
            readings.insert(id, reading.clone());
            reading
        };

        if let Err(e) = self.state.gateway.register(&reading).await {
            self.state.readings.write().await.remove(&reading.id);
            return Err(e);
        }
        tracing::info!(
            "Added device {} ({}, model {})",
            reading.id,
            reading.name,
            device.model.as_deref().unwrap_or("unknown")
        );
        self.notify(&reading).await;
        Ok(reading.id)
    }

    /// Forget a device and its subscription. Returns whether it was known.
    pub async fn remove_device(&self, device_id: &str) -> bool {
        if let Err(e) = self.state.gateway.unregister(device_id).await {
            tracing::error!("Failed to remove device {}: {}", device_id, e);
            return false;
        }
        let existed = self.state.readings.write().await.remove(device_id).is_some();
        self.unsubscribe(&Subscription::Device(device_id.to_string())).await;
        existed
    }

    async fn publish(&self, reading: DeviceReading) {
        self.state
            .readings
            .write()
            .await
            .insert(reading.id.clone(), reading.clone());
        self.notify(&reading).await;
    }

    async fn notify(&self, reading: &DeviceReading) {
        // Callbacks run outside the lock so they may call back into the service
        let callbacks: Vec<DeviceCallback> = {
            let subscribers = self.state.subscribers.lock().await;
            [Subscription::Device(reading.id.clone()), Subscription::All]
                .iter()
                .filter_map(|key| subscribers.get(key).cloned())
                .collect()
        };
        for callback in callbacks {
            callback(reading);
        }
    }
}

/// Current time in milliseconds, bumped past any id already taken.
fn next_device_id(readings: &BTreeMap<String, DeviceReading>) -> String {
    let mut candidate = Utc::now().timestamp_millis();
    while readings.contains_key(&candidate.to_string()) {
        candidate += 1;
    }
    candidate.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::device::default_catalog;
    use crate::error::{MonitorError, Result};
    use crate::infrastructure::simulated_gateway::SimulatedGateway;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn simulated() -> TelemetryService {
        TelemetryService::new(Arc::new(SimulatedGateway::with_seed(
            default_catalog(),
            Duration::from_secs(5),
            11,
        )))
    }

    fn counter() -> (Arc<AtomicUsize>, DeviceCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (count, Arc::new(move |_: &DeviceReading| {
            c.fetch_add(1, Ordering::SeqCst);
        }))
    }

    /// Gateway that fails commands for one device id and registration for one name.
    struct FlakyGateway {
        broken: &'static str,
    }

    #[async_trait]
    impl DeviceGateway for FlakyGateway {
        fn kind(&self) -> &'static str {
            "flaky"
        }

        async fn poll(&self) -> Result<Vec<DeviceReading>> {
            Ok(["a", "b", "c"]
                .iter()
                .map(|id| {
                    let mut r = DeviceReading::registered(id.to_string(), id.to_uppercase(), "Test".into());
                    r.is_on = true;
                    r.current_power = 100.0;
                    r
                })
                .collect())
        }

        async fn send_command(&self, device_id: &str, _command: DeviceCommand) -> Result<()> {
            if device_id == self.broken {
                Err(MonitorError::Gateway("relay stuck".into()))
            } else {
                Ok(())
            }
        }

        async fn register(&self, device: &DeviceReading) -> Result<()> {
            if device.name == self.broken {
                Err(MonitorError::Gateway("hub full".into()))
            } else {
                Ok(())
            }
        }

        async fn unregister(&self, _device_id: &str) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_tick_fills_table() {
        let service = simulated();
        assert!(service.readings().await.is_empty());

        assert_eq!(service.tick().await, 5);
        assert_eq!(service.readings().await.len(), 5);
        assert_eq!(service.reading("2").await.unwrap().name, "Refrigerator");
        assert!(service.reading("42").await.is_none());
    }

    #[tokio::test]
    async fn test_device_and_wildcard_subscribers() {
        let service = simulated();
        let (one, one_cb) = counter();
        let (all, all_cb) = counter();
        service.subscribe(Subscription::Device("1".into()), one_cb).await;
        service.subscribe(Subscription::All, all_cb).await;

        service.tick().await;
        assert_eq!(one.load(Ordering::SeqCst), 1);
        assert_eq!(all.load(Ordering::SeqCst), 5);

        assert!(service.unsubscribe(&Subscription::Device("1".into())).await);
        service.tick().await;
        assert_eq!(one.load(Ordering::SeqCst), 1);
        assert_eq!(all.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_resubscribe_overwrites() {
        let service = simulated();
        let (first, first_cb) = counter();
        let (second, second_cb) = counter();
        service.subscribe(Subscription::All, first_cb).await;
        service.subscribe(Subscription::All, second_cb).await;

        service.tick().await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_command_updates_reading_and_notifies() {
        let service = simulated();
        service.tick().await;
        let (seen, cb) = counter();
        service.subscribe(Subscription::Device("1".into()), cb).await;

        assert!(service.send_command("1", DeviceCommand::Off).await);
        let reading = service.reading("1").await.unwrap();
        assert!(!reading.is_on);
        assert_eq!(reading.current_power, 0.0);
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        assert!(service.send_command("1", DeviceCommand::On).await);
        assert!(service.reading("1").await.unwrap().is_on);
    }

    #[tokio::test]
    async fn test_unknown_device_command_changes_nothing() {
        let service = simulated();
        service.tick().await;
        let before = service.readings().await;
        let (seen, cb) = counter();
        service.subscribe(Subscription::All, cb).await;

        assert!(!service.send_command("does-not-exist", DeviceCommand::On).await);
        assert_eq!(service.readings().await, before);
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_bulk_command_is_best_effort() {
        let service = TelemetryService::new(Arc::new(FlakyGateway { broken: "b" }));
        service.tick().await;

        assert!(!service.send_bulk_command(DeviceCommand::Off).await);
        assert!(!service.reading("a").await.unwrap().is_on);
        assert!(service.reading("b").await.unwrap().is_on);
        assert!(!service.reading("c").await.unwrap().is_on);
    }

    #[tokio::test]
    async fn test_bulk_command_skips_offline_devices() {
        let service = TelemetryService::new(Arc::new(FlakyGateway { broken: "none" }));
        service.tick().await;
        service
            .state
            .readings
            .write()
            .await
            .get_mut("c")
            .unwrap()
            .is_online = false;

        assert!(service.send_bulk_command(DeviceCommand::Off).await);
        assert!(!service.reading("a").await.unwrap().is_on);
        assert!(service.reading("c").await.unwrap().is_on);
    }

    #[tokio::test]
    async fn test_add_and_remove_device() {
        let service = simulated();
        service.tick().await;

        let id = service
            .add_device(NewDevice {
                name: "Garage Freezer".into(),
                device_type: "Freezer".into(),
                model: None,
            })
            .await
            .unwrap();
        let added = service.reading(&id).await.unwrap();
        assert!(added.is_online);
        assert!(!added.is_on);
        assert_eq!(added.voltage, 120.0);
        assert_eq!(service.tick().await, 6);

        assert!(service.remove_device(&id).await);
        assert!(service.reading(&id).await.is_none());
        assert_eq!(service.tick().await, 5);
    }

    #[tokio::test]
    async fn test_stop_drops_subscriptions_and_readings() {
        let service = simulated();
        service.start(Duration::from_secs(3600)).await;
        assert!(service.is_running().await);
        let (seen, cb) = counter();
        service.subscribe(Subscription::All, cb).await;

        service.stop().await;
        assert!(!service.is_running().await);
        assert!(service.readings().await.is_empty());

        let before = seen.load(Ordering::SeqCst);
        service.tick().await;
        assert_eq!(seen.load(Ordering::SeqCst), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_polls_every_tick() {
        let service = simulated();
        let (seen, cb) = counter();
        service.subscribe(Subscription::All, cb).await;

        service.start(Duration::from_secs(5)).await;
        assert!(service.readings().await.is_empty());

        // The clock only moves once every other task is idle, so the tick runs first
        tokio::time::sleep(Duration::from_millis(5010)).await;
        assert_eq!(service.readings().await.len(), 5);
        assert_eq!(seen.load(Ordering::SeqCst), 5);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 10);

        service.stop().await;
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(service.readings().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_get_distinct_ids() {
        let service = TelemetryService::new(Arc::new(FlakyGateway { broken: "none" }));
        let adds = (0..20).map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .add_device(NewDevice {
                        name: format!("Plug {}", i),
                        device_type: "Outlet".into(),
                        model: None,
                    })
                    .await
            })
        });
        let mut ids: Vec<String> = join_all(adds)
            .await
            .into_iter()
            .map(|r| r.unwrap().unwrap())
            .collect();

        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 20);
        assert_eq!(service.readings().await.len(), 20);
    }

    #[tokio::test]
    async fn test_failed_registration_releases_id() {
        let service = TelemetryService::new(Arc::new(FlakyGateway { broken: "Sauna" }));
        let (seen, cb) = counter();
        service.subscribe(Subscription::All, cb).await;

        let result = service
            .add_device(NewDevice {
                name: "Sauna".into(),
                device_type: "Heater".into(),
                model: None,
            })
            .await;
        assert!(result.is_err());
        assert!(service.readings().await.is_empty());
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }
}
