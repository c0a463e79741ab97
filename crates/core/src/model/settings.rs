use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("unknown weight unit: {0}")]
    UnknownWeightUnit(String),

    #[error("unknown theme: {0}")]
    UnknownTheme(String),

    #[error("unknown sort order: {0}")]
    UnknownSort(String),
}

//
// ─── WEIGHT UNIT ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[default]
    Lbs,
    Kg,
}

impl WeightUnit {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            WeightUnit::Lbs => "lbs",
            WeightUnit::Kg => "kg",
        }
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeightUnit {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lbs" | "lb" => Ok(WeightUnit::Lbs),
            "kg" | "kgs" => Ok(WeightUnit::Kg),
            other => Err(SettingsError::UnknownWeightUnit(other.to_string())),
        }
    }
}

//
// ─── THEME ─────────────────────────────────────────────────────────────────────
//

/// Appearance preference. `Auto` follows the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Auto,
    Light,
    Dark,
}

impl Theme {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Auto => "auto",
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "automatic" => Ok(Theme::Auto),
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(SettingsError::UnknownTheme(other.to_string())),
        }
    }
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// User preferences passed explicitly to the components that need them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSettings {
    pub weight_unit: WeightUnit,
    pub show_timer: bool,
    pub theme: Theme,
    pub enable_haptic: bool,
}

impl Default for WorkoutSettings {
    fn default() -> Self {
        Self {
            weight_unit: WeightUnit::Lbs,
            show_timer: true,
            theme: Theme::Auto,
            enable_haptic: true,
        }
    }
}

impl WorkoutSettings {
    /// Amount a single weight step adds or removes.
    #[must_use]
    pub fn weight_increment(&self) -> f64 {
        match self.weight_unit {
            WeightUnit::Lbs => 5.0,
            WeightUnit::Kg => 2.5,
        }
    }

    /// Weight suggested for a set with no previous performance.
    #[must_use]
    pub fn default_weight_hint(&self) -> f64 {
        match self.weight_unit {
            WeightUnit::Lbs => 135.0,
            WeightUnit::Kg => 60.0,
        }
    }

    #[must_use]
    pub fn default_reps_hint(&self) -> u32 {
        5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_lbs_profile() {
        let settings = WorkoutSettings::default();
        assert_eq!(settings.weight_unit, WeightUnit::Lbs);
        assert!(settings.show_timer);
        assert_eq!(settings.theme, Theme::Auto);
        assert!((settings.weight_increment() - 5.0).abs() < f64::EPSILON);
        assert!((settings.default_weight_hint() - 135.0).abs() < f64::EPSILON);
    }

    #[test]
    fn kg_profile_uses_smaller_increment() {
        let settings = WorkoutSettings {
            weight_unit: WeightUnit::Kg,
            ..WorkoutSettings::default()
        };
        assert!((settings.weight_increment() - 2.5).abs() < f64::EPSILON);
        assert!((settings.default_weight_hint() - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn parses_units_and_themes() {
        assert_eq!("KG".parse::<WeightUnit>().unwrap(), WeightUnit::Kg);
        assert_eq!("Automatic".parse::<Theme>().unwrap(), Theme::Auto);
        assert!(matches!(
            "stone".parse::<WeightUnit>(),
            Err(SettingsError::UnknownWeightUnit(_))
        ));
    }
}
