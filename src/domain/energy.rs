// Aggregated energy snapshot
use super::device::DeviceReading;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Flat tariff applied when no pricing is configured, per kWh.
pub const DEFAULT_RATE_PER_KWH: f64 = 0.15;

/// One household-wide measurement at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergySnapshot {
    pub timestamp: DateTime<Utc>,
    /// Watts drawn by devices that are both online and on
    pub total_power: f64,
    /// kWh used today across every device
    pub total_energy: f64,
    pub total_cost: f64,
    pub online_devices: usize,
    pub total_devices: usize,
}

impl EnergySnapshot {
    /// True when both snapshots carry the same measures, whatever their timestamps.
    #[cfg(test)]
    pub fn same_measures(&self, other: &Self) -> bool {
        self.total_power == other.total_power
            && self.total_energy == other.total_energy
            && self.total_cost == other.total_cost
            && self.online_devices == other.online_devices
            && self.total_devices == other.total_devices
    }
}

/// Linear tariff turning energy into money.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tariff {
    pub rate_per_kwh: f64,
}

impl Default for Tariff {
    fn default() -> Self {
        Self {
            rate_per_kwh: DEFAULT_RATE_PER_KWH,
        }
    }
}

impl Tariff {
    pub fn new(rate_per_kwh: f64) -> Self {
        Self { rate_per_kwh }
    }

    pub fn cost(&self, energy_kwh: f64) -> f64 {
        energy_kwh * self.rate_per_kwh
    }

    /// Combine the current readings into one snapshot stamped `at`.
    pub fn snapshot(&self, readings: &[DeviceReading], at: DateTime<Utc>) -> EnergySnapshot {
        let total_power = readings.iter().map(DeviceReading::effective_power).sum();
        let total_energy = readings.iter().map(|r| r.energy_today).sum();

        EnergySnapshot {
            timestamp: at,
            total_power,
            total_energy,
            total_cost: self.cost(total_energy),
            online_devices: readings.iter().filter(|r| r.is_online).count(),
            total_devices: readings.len(),
        }
    }
}
