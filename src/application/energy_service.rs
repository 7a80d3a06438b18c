// Energy service - snapshots, rolling history, insights and preferences
use crate::application::key_value_store::KeyValueStore;
use crate::domain::device::DeviceReading;
use crate::domain::energy::{EnergySnapshot, Tariff};
use crate::domain::history::{HistoricalData, Period};
use crate::domain::insight::{self, Insight, InsightLog};
use crate::domain::preferences::{PreferencesPatch, ThresholdsPatch, UserPreferences};
use crate::infrastructure::export::{self, ExportDocument, ExportFormat};
use chrono::{DateTime, Local, Timelike, Utc};
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

const PREFERENCES_KEY: &str = "user_preferences";
const HISTORY_KEY: &str = "historical_data";
const INSIGHTS_KEY: &str = "insights";

/// In-memory snapshot log length (one day at a 30 s refresh)
pub const SNAPSHOT_LOG_CAP: usize = 2880;

/// Result of folding one set of readings into the store.
#[derive(Debug, Clone)]
pub struct EnergyUpdate {
    pub snapshot: EnergySnapshot,
    pub insights: Vec<Insight>,
}

#[derive(Debug, Default)]
struct EnergyState {
    snapshots: VecDeque<EnergySnapshot>,
    history: HistoricalData,
    preferences: UserPreferences,
    insights: InsightLog,
}

#[derive(Clone)]
pub struct EnergyService {
    store: Arc<dyn KeyValueStore>,
    tariff: Tariff,
    state: Arc<RwLock<EnergyState>>,
    /// Held from reading the state until the last blob is written
    save_lock: Arc<Mutex<()>>,
}

impl EnergyService {
    pub fn new(store: Arc<dyn KeyValueStore>, tariff: Tariff) -> Self {
        Self {
            store,
            tariff,
            state: Arc::new(RwLock::new(EnergyState::default())),
            save_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Restore persisted state. Missing or unreadable blobs keep the defaults.
    pub async fn load(&self) {
        let preferences = self.load_blob::<UserPreferences>(PREFERENCES_KEY).await;
        let history = self.load_blob::<HistoricalData>(HISTORY_KEY).await;
        let insights = self.load_blob::<InsightLog>(INSIGHTS_KEY).await;

        let mut state = self.state.write().await;
        if let Some(preferences) = preferences {
            state.preferences = preferences;
        }
        if let Some(history) = history {
            state.history = history;
        }
        if let Some(insights) = insights {
            state.insights = insights;
        }
        tracing::info!(
            "Loaded state: {} hourly / {} daily / {} weekly snapshots, {} insights",
            state.history.hourly.len(),
            state.history.daily.len(),
            state.history.weekly.len(),
            state.insights.len()
        );
    }

    async fn load_blob<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::error!("Error parsing stored {}: {}", key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::error!("Error loading {}: {}", key, e);
                None
            }
        }
    }

    async fn save(&self) {
        let _guard = self.save_lock.lock().await;
        let blobs = {
            let state = self.state.read().await;
            [
                (PREFERENCES_KEY, serde_json::to_string(&state.preferences)),
                (HISTORY_KEY, serde_json::to_string(&state.history)),
                (INSIGHTS_KEY, serde_json::to_string(&state.insights)),
            ]
        };

        for (key, blob) in blobs {
            let result = match blob {
                Ok(json) => self.store.set(key, &json).await,
                Err(e) => Err(e.into()),
            };
            if let Err(e) = result {
                tracing::error!("Error saving {}: {}", key, e);
            }
        }
    }

    /// Aggregate the readings, file the snapshot into the windows and run the alert rules.
    pub async fn update_energy_data(&self, readings: &[DeviceReading]) -> EnergyUpdate {
        self.update_energy_data_at(readings, Local::now()).await
    }

    pub async fn update_energy_data_at(&self, readings: &[DeviceReading], now: DateTime<Local>) -> EnergyUpdate {
        let at = now.with_timezone(&Utc);
        let snapshot = self.tariff.snapshot(readings, at);

        let insights = {
            let mut state = self.state.write().await;

            state.snapshots.push_back(snapshot.clone());
            while state.snapshots.len() > SNAPSHOT_LOG_CAP {
                state.snapshots.pop_front();
            }
            state.history.record(snapshot.clone(), now);

            let insights = insight::evaluate(&snapshot, readings, &state.preferences.thresholds, at);
            state.insights.prepend(insights.clone());
            insights
        };

        tracing::debug!(
            "Snapshot: {:.1} W, {:.2} kWh, {}/{} online, {} new insights",
            snapshot.total_power,
            snapshot.total_energy,
            snapshot.online_devices,
            snapshot.total_devices,
            insights.len()
        );

        self.save().await;
        EnergyUpdate { snapshot, insights }
    }

    pub async fn current(&self) -> Option<EnergySnapshot> {
        self.state.read().await.snapshots.back().cloned()
    }

    #[cfg(test)]
    pub async fn snapshots(&self) -> Vec<EnergySnapshot> {
        self.state.read().await.snapshots.iter().cloned().collect()
    }

    pub async fn history(&self) -> HistoricalData {
        self.state.read().await.history.clone()
    }

    pub async fn preferences(&self) -> UserPreferences {
        self.state.read().await.preferences.clone()
    }

    #[cfg(test)]
    pub async fn insights(&self) -> Vec<Insight> {
        self.state.read().await.insights.all().to_vec()
    }

    pub async fn recent_insights(&self, limit: usize) -> Vec<Insight> {
        self.state.read().await.insights.recent(limit)
    }

    pub async fn update_preferences(&self, patch: PreferencesPatch) -> UserPreferences {
        let updated = {
            let mut state = self.state.write().await;
            state.preferences.apply(patch);
            state.preferences.clone()
        };
        self.save().await;
        updated
    }

    pub async fn update_thresholds(&self, patch: ThresholdsPatch) -> UserPreferences {
        let updated = {
            let mut state = self.state.write().await;
            state.preferences.thresholds.apply(patch);
            state.preferences.clone()
        };
        self.save().await;
        updated
    }

    /// Dismiss an insight. Returns whether it existed.
    pub async fn mark_insight_read(&self, insight_id: &str) -> bool {
        let removed = self.state.write().await.insights.remove(insight_id);
        if removed {
            self.save().await;
        }
        removed
    }

    pub async fn energy_trend(&self, period: Period) -> f64 {
        self.state.read().await.history.energy_trend(period)
    }

    pub async fn cost_trend(&self, period: Period) -> f64 {
        self.state.read().await.history.cost_trend(period)
    }

    /// Time of the highest hourly power reading.
    pub async fn peak_usage_time(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.history.peak_usage().map(|s| s.timestamp)
    }

    pub async fn average_daily_usage(&self) -> f64 {
        self.state.read().await.history.average_daily_usage()
    }

    pub async fn average_daily_cost(&self) -> f64 {
        self.state.read().await.history.average_daily_cost()
    }

    pub async fn predict_next_hour_usage(&self) -> f64 {
        self.predict_next_hour_usage_at(Local::now()).await
    }

    /// Current energy scaled up during the day (06:00-22:00) and down at night.
    pub async fn predict_next_hour_usage_at(&self, now: DateTime<Local>) -> f64 {
        let Some(current) = self.current().await else {
            return 0.0;
        };
        let multiplier = if (6..=22).contains(&now.hour()) { 1.1 } else { 0.8 };
        current.total_energy * multiplier
    }

    pub async fn predict_next_day_usage(&self) -> f64 {
        let state = self.state.read().await;
        let average = state.history.average_daily_usage();
        average * (1.0 + state.history.energy_trend(Period::Day) / 100.0)
    }

    pub async fn predict_next_week_usage(&self) -> f64 {
        let state = self.state.read().await;
        let average = state.history.average_daily_usage();
        average * 7.0 * (1.0 + state.history.energy_trend(Period::Week) / 100.0)
    }

    pub async fn export(&self, format: ExportFormat) -> anyhow::Result<String> {
        let document = {
            let state = self.state.read().await;
            ExportDocument {
                energy_data: state.snapshots.iter().cloned().collect(),
                historical_data: state.history.clone(),
                user_preferences: state.preferences.clone(),
                insights: state.insights.all().to_vec(),
                export_date: Utc::now(),
            }
        };
        Ok(export::render(&document, format)?)
    }

    /// Drop snapshots, history and insights and wipe the store. Preferences survive in memory.
    pub async fn clear_all(&self) {
        {
            let mut state = self.state.write().await;
            state.snapshots.clear();
            state.history = HistoricalData::default();
            state.insights.clear();
        }
        if let Err(e) = self.store.clear().await {
            tracing::error!("Error clearing stored data: {}", e);
        }
    }
}
