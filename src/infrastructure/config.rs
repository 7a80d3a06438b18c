use crate::domain::device::{DeviceProfile, default_catalog};
use crate::error::{MonitorError, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct MonitorConfig {
    pub server: ServerSettings,
    pub telemetry: TelemetrySettings,
    pub pricing: PricingSettings,
    pub storage: StorageSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GatewayMode {
    Simulated,
    Http,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TelemetrySettings {
    pub mode: GatewayMode,
    pub tick_secs: u64,
    pub refresh_secs: u64,
    pub gateway_url: Option<String>,
    pub devices: Vec<DeviceProfile>,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            mode: GatewayMode::Simulated,
            tick_secs: 5,
            refresh_secs: 30,
            gateway_url: None,
            devices: default_catalog(),
        }
    }
}

impl TelemetrySettings {
    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }

    pub fn refresh(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PricingSettings {
    pub rate_per_kwh: f64,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            rate_per_kwh: crate::domain::energy::DEFAULT_RATE_PER_KWH,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    File,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            dir: PathBuf::from("data"),
        }
    }
}

/// Defaults, then `config/monitor.*` if present, then `MONITOR__SECTION__KEY` variables.
pub fn load_monitor_config() -> Result<MonitorConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/monitor").required(false))
        .add_source(config::Environment::with_prefix("MONITOR").prefix_separator("__").separator("__"))
        .build()?;

    let config: MonitorConfig = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.telemetry.tick_secs == 0 || self.telemetry.refresh_secs == 0 {
            return Err(MonitorError::Config(
                "telemetry intervals must be at least one second".to_string(),
            ));
        }
        if !(self.pricing.rate_per_kwh >= 0.0) {
            return Err(MonitorError::Config(format!(
                "pricing.rate_per_kwh must be non-negative, got {}",
                self.pricing.rate_per_kwh
            )));
        }
        if self.telemetry.mode == GatewayMode::Http
            && self.telemetry.gateway_url.as_deref().is_none_or(str::is_empty)
        {
            return Err(MonitorError::Config(
                "telemetry.gateway_url is required in http mode".to_string(),
            ));
        }
        Ok(())
    }
}
