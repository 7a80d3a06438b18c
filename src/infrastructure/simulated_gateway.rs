// Simulated device gateway - synthetic telemetry for a fixed household
use crate::application::device_gateway::DeviceGateway;
use crate::domain::device::{DeviceCommand, DeviceProfile, DeviceReading, NOMINAL_VOLTAGE};
use crate::error::{MonitorError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::sync::Mutex;

/// Chance a device answers on a given tick
const ONLINE_PROBABILITY: f64 = 0.9;
/// Chance a device starts out switched on
const INITIAL_ON_PROBABILITY: f64 = 0.7;
/// Half-width of the random offset added to a running device's base load, watts
const POWER_JITTER_W: f64 = 25.0;
/// Half-width of the mains voltage wobble, volts
const VOLTAGE_JITTER_V: f64 = 5.0;
/// Upper bound of the energy a device has already used when the simulation starts, kWh
const INITIAL_ENERGY_MAX_KWH: f64 = 5.0;

#[derive(Debug)]
struct SimulatedDevice {
    profile: DeviceProfile,
    is_on: bool,
    energy_today: f64,
}

#[derive(Debug)]
struct SimulationState {
    rng: StdRng,
    devices: Vec<SimulatedDevice>,
    day: NaiveDate,
}

pub struct SimulatedGateway {
    state: Mutex<SimulationState>,
    tick_hours: f64,
}

impl SimulatedGateway {
    pub fn new(catalog: Vec<DeviceProfile>, tick: Duration) -> Self {
        Self::with_rng(catalog, tick, StdRng::from_os_rng())
    }

    /// Deterministic simulation, used by tests and demos.
    pub fn with_seed(catalog: Vec<DeviceProfile>, tick: Duration, seed: u64) -> Self {
        Self::with_rng(catalog, tick, StdRng::seed_from_u64(seed))
    }

    fn with_rng(catalog: Vec<DeviceProfile>, tick: Duration, mut rng: StdRng) -> Self {
        let devices = catalog
            .into_iter()
            .map(|profile| SimulatedDevice {
                profile,
                is_on: rng.random_bool(INITIAL_ON_PROBABILITY),
                energy_today: rng.random_range(0.0..INITIAL_ENERGY_MAX_KWH),
            })
            .collect();

        Self {
            state: Mutex::new(SimulationState {
                rng,
                devices,
                day: Local::now().date_naive(),
            }),
            tick_hours: tick.as_secs_f64() / 3600.0,
        }
    }

    fn sample(
        rng: &mut StdRng,
        device: &mut SimulatedDevice,
        tick_hours: f64,
        at: DateTime<Utc>,
    ) -> DeviceReading {
        let is_online = rng.random_bool(ONLINE_PROBABILITY);
        let current_power = if device.is_on {
            let jitter = rng.random_range(-POWER_JITTER_W..POWER_JITTER_W);
            (device.profile.base_power + jitter).max(0.0)
        } else {
            0.0
        };
        let voltage = NOMINAL_VOLTAGE + rng.random_range(-VOLTAGE_JITTER_V..VOLTAGE_JITTER_V);

        if is_online {
            device.energy_today += current_power * tick_hours / 1000.0;
        }

        DeviceReading {
            id: device.profile.id.clone(),
            name: device.profile.name.clone(),
            device_type: device.profile.device_type.clone(),
            is_online,
            is_on: device.is_on,
            current_power,
            voltage,
            current: current_power / voltage,
            energy_today: device.energy_today,
            timestamp: at,
        }
    }
}

#[async_trait]
impl DeviceGateway for SimulatedGateway {
    fn kind(&self) -> &'static str {
        "simulated"
    }

    async fn poll(&self) -> Result<Vec<DeviceReading>> {
        let mut state = self.state.lock().await;
        let SimulationState { rng, devices, day } = &mut *state;

        let now = Local::now();
        if now.date_naive() != *day {
            tracing::debug!("New day {}, resetting simulated energy counters", now.date_naive());
            *day = now.date_naive();
            for device in devices.iter_mut() {
                device.energy_today = 0.0;
            }
        }

        let at = now.with_timezone(&Utc);
        Ok(devices
            .iter_mut()
            .map(|device| Self::sample(rng, device, self.tick_hours, at))
            .collect())
    }

    async fn send_command(&self, device_id: &str, command: DeviceCommand) -> Result<()> {
        let mut state = self.state.lock().await;
        let device = state
            .devices
            .iter_mut()
            .find(|d| d.profile.id == device_id)
            .ok_or_else(|| MonitorError::UnknownDevice(device_id.to_string()))?;
        device.is_on = command.is_on();
        Ok(())
    }

    async fn register(&self, device: &DeviceReading) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.devices.iter().any(|d| d.profile.id == device.id) {
            return Err(MonitorError::Gateway(format!("device {} already registered", device.id)));
        }
        state.devices.push(SimulatedDevice {
            profile: DeviceProfile {
                id: device.id.clone(),
                name: device.name.clone(),
                device_type: device.device_type.clone(),
                base_power: 0.0,
            },
            is_on: device.is_on,
            energy_today: device.energy_today,
        });
        Ok(())
    }

    async fn unregister(&self, device_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.devices.retain(|d| d.profile.id != device_id);
        Ok(())
    }
}
