// Rolling windows of energy snapshots
use super::energy::EnergySnapshot;
use chrono::{DateTime, Datelike, IsoWeek, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const HOURLY_CAP: usize = 24;
pub const DAILY_CAP: usize = 30;
pub const WEEKLY_CAP: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Hour,
    Day,
    Week,
}

/// Hourly, daily and weekly snapshot windows used for trend display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalData {
    pub hourly: VecDeque<EnergySnapshot>,
    pub daily: VecDeque<EnergySnapshot>,
    pub weekly: VecDeque<EnergySnapshot>,
}

fn local_date(snapshot: &EnergySnapshot) -> NaiveDate {
    snapshot.timestamp.with_timezone(&Local).date_naive()
}

fn local_week(snapshot: &EnergySnapshot) -> IsoWeek {
    snapshot.timestamp.with_timezone(&Local).iso_week()
}

/// Append to a capped window, dropping the oldest entries past `cap`.
fn push_capped(window: &mut VecDeque<EnergySnapshot>, snapshot: EnergySnapshot, cap: usize) {
    window.push_back(snapshot);
    while window.len() > cap {
        window.pop_front();
    }
}

/// Replace the entry matching the current period, otherwise append.
fn upsert_capped<F>(window: &mut VecDeque<EnergySnapshot>, snapshot: EnergySnapshot, cap: usize, same_period: F)
where
    F: Fn(&EnergySnapshot) -> bool,
{
    match window.iter().position(same_period) {
        Some(idx) => window[idx] = snapshot,
        None => push_capped(window, snapshot, cap),
    }
}

impl HistoricalData {
    /// Classify `snapshot` by the wall-clock time `now` and file it into each window.
    ///
    /// Days are keyed by local calendar date and weeks by ISO week, so buckets
    /// stay distinct across month and year boundaries.
    pub fn record(&mut self, snapshot: EnergySnapshot, now: DateTime<Local>) {
        let today = now.date_naive();
        let this_week = now.iso_week();

        push_capped(&mut self.hourly, snapshot.clone(), HOURLY_CAP);
        upsert_capped(&mut self.daily, snapshot.clone(), DAILY_CAP, |s| local_date(s) == today);
        upsert_capped(&mut self.weekly, snapshot, WEEKLY_CAP, |s| local_week(s) == this_week);
    }

    pub fn window(&self, period: Period) -> &VecDeque<EnergySnapshot> {
        match period {
            Period::Hour => &self.hourly,
            Period::Day => &self.daily,
            Period::Week => &self.weekly,
        }
    }

    /// Percent change of energy between the last two entries of a window.
    pub fn energy_trend(&self, period: Period) -> f64 {
        self.trend(period, |s| s.total_energy)
    }

    /// Percent change of cost between the last two entries of a window.
    pub fn cost_trend(&self, period: Period) -> f64 {
        self.trend(period, |s| s.total_cost)
    }

    fn trend<F>(&self, period: Period, measure: F) -> f64
    where
        F: Fn(&EnergySnapshot) -> f64,
    {
        let window = self.window(period);
        if window.len() < 2 {
            return 0.0;
        }
        let recent = measure(&window[window.len() - 1]);
        let previous = measure(&window[window.len() - 2]);
        if previous == 0.0 {
            return 0.0;
        }
        (recent - previous) / previous * 100.0
    }

    /// Hourly entry with the highest power draw.
    pub fn peak_usage(&self) -> Option<&EnergySnapshot> {
        self.hourly
            .iter()
            .fold(None, |max: Option<&EnergySnapshot>, s| match max {
                Some(m) if m.total_power >= s.total_power => Some(m),
                _ => Some(s),
            })
    }

    pub fn average_daily_usage(&self) -> f64 {
        average(&self.daily, |s| s.total_energy)
    }

    pub fn average_daily_cost(&self) -> f64 {
        average(&self.daily, |s| s.total_cost)
    }
}

fn average<F>(window: &VecDeque<EnergySnapshot>, measure: F) -> f64
where
    F: Fn(&EnergySnapshot) -> f64,
{
    if window.is_empty() {
        return 0.0;
    }
    window.iter().map(measure).sum::<f64>() / window.len() as f64
}
