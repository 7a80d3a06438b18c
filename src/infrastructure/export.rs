// Export mapper - full state as JSON, snapshot log as CSV
use crate::domain::energy::EnergySnapshot;
use crate::domain::history::HistoricalData;
use crate::domain::insight::Insight;
use crate::domain::preferences::UserPreferences;
use crate::error::{MonitorError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportDocument {
    pub energy_data: Vec<EnergySnapshot>,
    pub historical_data: HistoricalData,
    pub user_preferences: UserPreferences,
    pub insights: Vec<Insight>,
    pub export_date: DateTime<Utc>,
}

const CSV_HEADER: [&str; 5] = [
    "Timestamp",
    "Total Power",
    "Total Energy",
    "Total Cost",
    "Online Devices",
];

pub fn render(document: &ExportDocument, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(document)?),
        ExportFormat::Csv => snapshots_to_csv(&document.energy_data),
    }
}

pub fn snapshots_to_csv(snapshots: &[EnergySnapshot]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for s in snapshots {
        writer.write_record([
            s.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            s.total_power.to_string(),
            s.total_energy.to_string(),
            s.total_cost.to_string(),
            s.online_devices.to_string(),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| MonitorError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| MonitorError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}
