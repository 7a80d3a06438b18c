// Notification domain model
use super::device::DeviceCommand;
use super::preferences::Currency;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    EnergyAlert,
    DeviceOffline,
    HighUsage,
    AiRecommendation,
    CostAlert,
    DeviceControl,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
}

impl Notification {
    fn new(kind: NotificationKind, title: &str, body: String) -> Self {
        Self {
            kind,
            title: title.to_string(),
            body,
        }
    }

    pub fn energy_alert(current_usage: f64, threshold: f64) -> Self {
        Self::new(
            NotificationKind::EnergyAlert,
            "High Energy Usage Alert",
            format!("Current usage: {:.0}W exceeds threshold: {:.0}W", current_usage, threshold),
        )
    }

    pub fn device_offline(device_name: &str) -> Self {
        Self::new(
            NotificationKind::DeviceOffline,
            "Device Offline",
            format!("{} has gone offline", device_name),
        )
    }

    pub fn high_usage(device_name: &str, power: f64) -> Self {
        Self::new(
            NotificationKind::HighUsage,
            "High Power Usage",
            format!("{} is consuming {:.0}W - higher than normal", device_name, power),
        )
    }

    pub fn ai_recommendation(recommendation: &str) -> Self {
        Self::new(
            NotificationKind::AiRecommendation,
            "AI Recommendation",
            recommendation.to_string(),
        )
    }

    pub fn cost_alert(daily_cost: f64, budget: f64, currency: Currency) -> Self {
        let symbol = currency.symbol();
        Self::new(
            NotificationKind::CostAlert,
            "Cost Alert",
            format!(
                "Daily cost {}{:.2} is approaching budget {}{}",
                symbol, daily_cost, symbol, budget
            ),
        )
    }

    pub fn device_control(device_name: &str, command: DeviceCommand) -> Self {
        Self::new(
            NotificationKind::DeviceControl,
            "Device Control",
            format!("{} turned {}", device_name, command),
        )
    }

    pub fn bulk_control(command: DeviceCommand) -> Self {
        Self::new(
            NotificationKind::DeviceControl,
            "Bulk Control",
            format!("All devices turned {}", command),
        )
    }
}

/// Client-requested notification, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationRequest {
    EnergyAlert { current_usage: f64, threshold: f64 },
    DeviceOffline { device_name: String },
    HighUsage { device_name: String, power_usage: f64 },
    AiRecommendation { recommendation: String },
    CostAlert { daily_cost: f64, budget: f64 },
}

impl NotificationRequest {
    pub fn into_notification(self, currency: Currency) -> Notification {
        match self {
            NotificationRequest::EnergyAlert { current_usage, threshold } => {
                Notification::energy_alert(current_usage, threshold)
            }
            NotificationRequest::DeviceOffline { device_name } => Notification::device_offline(&device_name),
            NotificationRequest::HighUsage { device_name, power_usage } => {
                Notification::high_usage(&device_name, power_usage)
            }
            NotificationRequest::AiRecommendation { recommendation } => {
                Notification::ai_recommendation(&recommendation)
            }
            NotificationRequest::CostAlert { daily_cost, budget } => {
                Notification::cost_alert(daily_cost, budget, currency)
            }
        }
    }
}
