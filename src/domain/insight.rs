// Insight domain model and alert rules
use super::device::DeviceReading;
use super::energy::EnergySnapshot;
use super::preferences::Thresholds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Most recent insights kept around.
pub const INSIGHT_CAP: usize = 50;
/// A single device above this draw counts as high-power, watts.
pub const HIGH_POWER_DEVICE_W: f64 = 500.0;
/// Household draw below this earns a positive note, watts.
pub const EFFICIENT_TOTAL_W: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Recommendation,
    Prediction,
    Alert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// Which rule produced an insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightTrigger {
    HighPower,
    HighCost,
    HighPowerDevices,
    Efficient,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub id: String,
    pub kind: InsightKind,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub timestamp: DateTime<Utc>,
    pub actionable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<InsightTrigger>,
}

impl Insight {
    fn new(
        trigger: InsightTrigger,
        kind: InsightKind,
        priority: Priority,
        title: &str,
        description: String,
        action_text: Option<&str>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            title: title.to_string(),
            description,
            priority,
            timestamp: at,
            actionable: action_text.is_some(),
            action_text: action_text.map(str::to_string),
            trigger: Some(trigger),
        }
    }
}

/// Run the fixed rule list against a snapshot. Every rule is independent.
pub fn evaluate(
    snapshot: &EnergySnapshot,
    readings: &[DeviceReading],
    thresholds: &Thresholds,
    at: DateTime<Utc>,
) -> Vec<Insight> {
    let mut insights = Vec::new();

    if snapshot.total_power > thresholds.max_power {
        insights.push(Insight::new(
            InsightTrigger::HighPower,
            InsightKind::Alert,
            Priority::High,
            "High Power Usage",
            format!(
                "Current power consumption ({:.0}W) exceeds your threshold ({:.0}W)",
                snapshot.total_power, thresholds.max_power
            ),
            Some("View devices"),
            at,
        ));
    }

    if snapshot.total_cost > thresholds.max_daily_cost {
        insights.push(Insight::new(
            InsightTrigger::HighCost,
            InsightKind::Alert,
            Priority::High,
            "High Daily Cost",
            format!(
                "Today's cost (${:.2}) exceeds your budget (${})",
                snapshot.total_cost, thresholds.max_daily_cost
            ),
            Some("View analytics"),
            at,
        ));
    }

    let high_power_devices = readings
        .iter()
        .filter(|r| r.is_on && r.current_power > HIGH_POWER_DEVICE_W)
        .count();
    if high_power_devices > 0 {
        insights.push(Insight::new(
            InsightTrigger::HighPowerDevices,
            InsightKind::Recommendation,
            Priority::Medium,
            "Device Optimization",
            format!(
                "{} high-power devices are running. Consider scheduling them during off-peak hours.",
                high_power_devices
            ),
            Some("Optimize devices"),
            at,
        ));
    }

    if snapshot.total_power < EFFICIENT_TOTAL_W {
        insights.push(Insight::new(
            InsightTrigger::Efficient,
            InsightKind::Recommendation,
            Priority::Low,
            "Great Job!",
            "Your current power usage is very efficient. Keep up the good work!".to_string(),
            None,
            at,
        ));
    }

    insights
}

/// Insertion-ordered list of the most recent insights, newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InsightLog {
    entries: Vec<Insight>,
}

impl InsightLog {
    /// Put a batch in front of the existing entries and drop everything past the cap.
    pub fn prepend(&mut self, batch: Vec<Insight>) {
        if batch.is_empty() {
            return;
        }
        let mut entries = batch;
        entries.append(&mut self.entries);
        entries.truncate(INSIGHT_CAP);
        self.entries = entries;
    }

    /// Remove one insight; returns whether it was present.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|i| i.id != id);
        self.entries.len() != before
    }

    pub fn all(&self) -> &[Insight] {
        &self.entries
    }

    /// Up to `limit` insights sorted by timestamp, newest first.
    pub fn recent(&self, limit: usize) -> Vec<Insight> {
        if self.is_empty() || limit == 0 {
            return Vec::new();
        }
        let mut sorted = self.entries.clone();
        sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        sorted.truncate(limit);
        sorted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
