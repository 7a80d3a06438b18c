// Device domain model
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Nominal mains voltage used for freshly registered devices.
pub const NOMINAL_VOLTAGE: f64 = 120.0;

/// Latest known state of a single metered device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceReading {
    pub id: String,
    pub name: String,
    pub device_type: String,
    pub is_online: bool,
    pub is_on: bool,
    /// Instantaneous draw in watts
    pub current_power: f64,
    pub voltage: f64,
    pub current: f64,
    /// Energy used since local midnight, kWh
    pub energy_today: f64,
    pub timestamp: DateTime<Utc>,
}

impl DeviceReading {
    /// A device that has just been registered: reachable, switched off, idle.
    pub fn registered(id: String, name: String, device_type: String) -> Self {
        Self {
            id,
            name,
            device_type,
            is_online: true,
            is_on: false,
            current_power: 0.0,
            voltage: NOMINAL_VOLTAGE,
            current: 0.0,
            energy_today: 0.0,
            timestamp: Utc::now(),
        }
    }

    /// Power that counts towards the household total.
    pub fn effective_power(&self) -> f64 {
        if self.is_online && self.is_on {
            self.current_power
        } else {
            0.0
        }
    }

    /// Apply an on/off command to this reading.
    pub fn apply(&mut self, command: DeviceCommand, at: DateTime<Utc>) {
        self.is_on = command.is_on();
        if !self.is_on {
            self.current_power = 0.0;
            self.current = 0.0;
        }
        self.timestamp = at;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceCommand {
    On,
    Off,
}

impl DeviceCommand {
    pub fn is_on(self) -> bool {
        matches!(self, DeviceCommand::On)
    }

    /// The command that flips a device out of its current state.
    pub fn toggle_of(is_on: bool) -> Self {
        if is_on {
            DeviceCommand::Off
        } else {
            DeviceCommand::On
        }
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceCommand::On => f.write_str("ON"),
            DeviceCommand::Off => f.write_str("OFF"),
        }
    }
}

/// Static description of a device the simulator knows how to drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub id: String,
    pub name: String,
    pub device_type: String,
    /// Typical draw when switched on, watts
    pub base_power: f64,
}

impl DeviceProfile {
    pub fn new(id: &str, name: &str, device_type: &str, base_power: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            device_type: device_type.to_string(),
            base_power,
        }
    }
}

/// The household the simulator starts with.
pub fn default_catalog() -> Vec<DeviceProfile> {
    vec![
        DeviceProfile::new("1", "Living Room AC", "Air Conditioner", 850.0),
        DeviceProfile::new("2", "Refrigerator", "Refrigerator", 120.0),
        DeviceProfile::new("3", "Washing Machine", "Washing Machine", 0.0),
        DeviceProfile::new("4", "Kitchen Lights", "Lighting", 45.0),
        DeviceProfile::new("5", "Water Heater", "Water Heater", 0.0),
    ]
}

/// Request to register a new device.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDevice {
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: String,
    #[serde(default)]
    pub model: Option<String>,
}
