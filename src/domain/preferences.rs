// User preferences
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnergyUnit {
    #[serde(rename = "kWh")]
    KilowattHour,
    #[serde(rename = "Wh")]
    WattHour,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerUnit {
    #[serde(rename = "W")]
    Watt,
    #[serde(rename = "kW")]
    Kilowatt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
}

impl Currency {
    pub fn symbol(self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Eur => "\u{20AC}",
            Currency::Gbp => "\u{00A3}",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Units {
    pub energy: EnergyUnit,
    pub power: PowerUnit,
    pub currency: Currency,
}

impl Default for Units {
    fn default() -> Self {
        Self {
            energy: EnergyUnit::KilowattHour,
            power: PowerUnit::Watt,
            currency: Currency::Usd,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Watts
    pub max_power: f64,
    pub max_daily_cost: f64,
    /// kWh
    pub max_daily_energy: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_power: 2000.0,
            max_daily_cost: 10.0,
            max_daily_energy: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub theme: Theme,
    pub notifications: bool,
    pub units: Units,
    pub thresholds: Thresholds,
    pub location: String,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            notifications: true,
            units: Units::default(),
            thresholds: Thresholds::default(),
            location: "San Francisco, CA".to_string(),
        }
    }
}

/// Partial update of the threshold block; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThresholdsPatch {
    pub max_power: Option<f64>,
    pub max_daily_cost: Option<f64>,
    pub max_daily_energy: Option<f64>,
}

/// Partial update of the preferences; top-level fields are replaced wholesale.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreferencesPatch {
    pub theme: Option<Theme>,
    pub notifications: Option<bool>,
    pub units: Option<Units>,
    pub thresholds: Option<Thresholds>,
    pub location: Option<String>,
}

impl UserPreferences {
    pub fn apply(&mut self, patch: PreferencesPatch) {
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
        if let Some(notifications) = patch.notifications {
            self.notifications = notifications;
        }
        if let Some(units) = patch.units {
            self.units = units;
        }
        if let Some(thresholds) = patch.thresholds {
            self.thresholds = thresholds;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
    }
}

impl Thresholds {
    pub fn apply(&mut self, patch: ThresholdsPatch) {
        if let Some(v) = patch.max_power {
            self.max_power = v;
        }
        if let Some(v) = patch.max_daily_cost {
            self.max_daily_cost = v;
        }
        if let Some(v) = patch.max_daily_energy {
            self.max_daily_energy = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let prefs = UserPreferences::default();
        assert_eq!(prefs.theme, Theme::Dark);
        assert!(prefs.notifications);
        assert_eq!(prefs.thresholds.max_power, 2000.0);
        assert_eq!(prefs.thresholds.max_daily_cost, 10.0);
        assert_eq!(prefs.thresholds.max_daily_energy, 20.0);
        assert_eq!(prefs.location, "San Francisco, CA");
    }

    #[test]
    fn test_patch_only_touches_given_fields() {
        let mut prefs = UserPreferences::default();
        let patch: PreferencesPatch =
            serde_json::from_str(r#"{"notifications": false, "location": "Oslo"}"#).unwrap();
        prefs.apply(patch);

        assert!(!prefs.notifications);
        assert_eq!(prefs.location, "Oslo");
        assert_eq!(prefs.theme, Theme::Dark);
        assert_eq!(prefs.thresholds, Thresholds::default());
    }

    #[test]
    fn test_thresholds_patch() {
        let mut thresholds = Thresholds::default();
        let patch: ThresholdsPatch = serde_json::from_str(r#"{"max_power": 3500}"#).unwrap();
        thresholds.apply(patch);

        assert_eq!(thresholds.max_power, 3500.0);
        assert_eq!(thresholds.max_daily_cost, 10.0);
    }

    #[test]
    fn test_units_wire_format() {
        let json = serde_json::to_value(Units::default()).unwrap();
        assert_eq!(json["energy"], "kWh");
        assert_eq!(json["power"], "W");
        assert_eq!(json["currency"], "USD");
    }
}
