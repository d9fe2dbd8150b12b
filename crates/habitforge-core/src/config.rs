//! TOML-based engine configuration.
//!
//! Stores the tunables of the strength model:
//! - Day boundary (timezone and the hour at which a habit day starts)
//! - Base growth/decay rates and the residual memory factor
//! - Soft drift rate for long unscheduled gaps
//! - Optional engine capabilities (partial credit, personalization, context consistency)
//!
//! Configuration is stored at `~/.config/habitforge/config.toml`.
//! The analysis end instant is not persisted; it is supplied per invocation via
//! [`EngineConfig::at`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::day_boundary::{DayBoundary, TimeZoneSetting};
use crate::error::{ConfigError, CoreError, ValidationError};

/// Optional engine capabilities. All off reproduces the baseline model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineFeatures {
    /// Fractional completions grow strength proportionally instead of counting as misses.
    #[serde(default)]
    pub partial_credit: bool,
    /// Growth rate follows the habit's own running success ratio.
    #[serde(default)]
    pub personalization: bool,
    /// Unbroken daily rhythm earns a growth bonus; resuming after a long gap is penalised.
    #[serde(default)]
    pub context_consistency: bool,
}

/// Persisted engine configuration.
///
/// Serialized to/from TOML at `~/.config/habitforge/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub timezone: TimeZoneSetting,
    #[serde(default = "default_day_start_hour")]
    pub day_start_hour: u32,
    #[serde(default = "default_base_growth_rate")]
    pub base_growth_rate: f64,
    #[serde(default = "default_base_decay_rate")]
    pub base_decay_rate: f64,
    /// Fraction of peak control a bad habit keeps as its floor.
    #[serde(default = "default_residual_memory_factor")]
    pub residual_memory_factor: f64,
    #[serde(default = "default_max_strength")]
    pub max_strength: f64,
    #[serde(default = "default_intensity_penalty_per_level")]
    pub intensity_penalty_per_level: f64,
    #[serde(default = "default_soft_drift_rate")]
    pub soft_drift_rate: f64,
    #[serde(default)]
    pub features: EngineFeatures,
}

fn default_day_start_hour() -> u32 {
    4
}
fn default_base_growth_rate() -> f64 {
    0.077
}
fn default_base_decay_rate() -> f64 {
    0.10
}
fn default_residual_memory_factor() -> f64 {
    0.30
}
fn default_max_strength() -> f64 {
    1.0
}
fn default_intensity_penalty_per_level() -> f64 {
    0.15
}
fn default_soft_drift_rate() -> f64 {
    0.002
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timezone: TimeZoneSetting::default(),
            day_start_hour: default_day_start_hour(),
            base_growth_rate: default_base_growth_rate(),
            base_decay_rate: default_base_decay_rate(),
            residual_memory_factor: default_residual_memory_factor(),
            max_strength: default_max_strength(),
            intensity_penalty_per_level: default_intensity_penalty_per_level(),
            soft_drift_rate: default_soft_drift_rate(),
            features: EngineFeatures::default(),
        }
    }
}

/// Immutable per-invocation configuration: persisted settings plus the analysis end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub settings: EngineConfig,
    pub analysis_end: DateTime<Utc>,
}

impl AnalysisConfig {
    /// Day boundary resolver for this invocation.
    pub fn day_boundary(&self) -> Result<DayBoundary, ValidationError> {
        DayBoundary::new(self.settings.timezone, self.settings.day_start_hour)
    }
}

impl EngineConfig {
    /// Freeze this configuration for a single analysis ending at `analysis_end`.
    pub fn at(&self, analysis_end: DateTime<Utc>) -> AnalysisConfig {
        AnalysisConfig {
            settings: self.clone(),
            analysis_end,
        }
    }

    /// Reject values the model cannot work with.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.day_start_hour > 23 {
            return Err(ValidationError::invalid(
                "day_start_hour",
                format!("{} is outside 0..=23", self.day_start_hour),
            ));
        }
        if let TimeZoneSetting::Offset { offset_minutes } = self.timezone {
            if offset_minutes.abs() >= 24 * 60 {
                return Err(ValidationError::invalid(
                    "timezone.offset_minutes",
                    format!("{offset_minutes} is not a valid UTC offset"),
                ));
            }
        }

        let positive = [
            ("base_growth_rate", self.base_growth_rate),
            ("base_decay_rate", self.base_decay_rate),
            ("max_strength", self.max_strength),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ValidationError::invalid(
                    field,
                    format!("{value} must be a positive finite number"),
                ));
            }
        }

        let non_negative = [
            ("intensity_penalty_per_level", self.intensity_penalty_per_level),
            ("soft_drift_rate", self.soft_drift_rate),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidationError::invalid(
                    field,
                    format!("{value} must be a non-negative finite number"),
                ));
            }
        }

        if self.max_strength > 1.0 {
            return Err(ValidationError::invalid(
                "max_strength",
                format!("{} exceeds 1.0", self.max_strength),
            ));
        }
        if !(0.0..=1.0).contains(&self.residual_memory_factor) {
            return Err(ValidationError::invalid(
                "residual_memory_factor",
                format!("{} is outside 0.0..=1.0", self.residual_memory_factor),
            ));
        }
        Ok(())
    }

    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::InvalidValue {
            key: key.to_string(),
            message: "unknown config key".to_string(),
        };
        let unparsable = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|e| unparsable(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => {
                    if let Ok(n) = value.parse::<u64>() {
                        serde_json::Value::Number(n.into())
                    } else if let Ok(n) = value.parse::<f64>() {
                        serde_json::Number::from_f64(n)
                            .map(serde_json::Value::Number)
                            .ok_or_else(|| unparsable(format!("cannot parse '{value}' as number")))?
                    } else {
                        return Err(unparsable(format!("cannot parse '{value}' as number")));
                    }
                }
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| unparsable(e.to_string()))?
                }
                _ => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, CoreError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// fails validation, or if the default config cannot be written.
    pub fn load() -> Result<Self, CoreError> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let cfg = Self::default();
            cfg.save()?;
            Ok(cfg)
        }
    }

    /// Load and validate a config file at `path`.
    pub fn load_from(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let cfg: EngineConfig = toml::from_str(&content).map_err(ConfigError::from)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), CoreError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), CoreError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!(error = %err, "falling back to default engine config");
                Self::default()
            }
        }
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without persisting it.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the resulting config fails validation.
    pub fn update(&mut self, key: &str, value: &str) -> Result<(), CoreError> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: EngineConfig = serde_json::from_value(json)?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and persist it.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), CoreError> {
        self.update(key, value)?;
        self.save()
    }
}

/// Returns `~/.config/habitforge[-dev]/` based on HABITFORGE_ENV.
///
/// Set HABITFORGE_ENV=dev to use development data directory.
pub fn data_dir() -> Result<PathBuf, CoreError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("HABITFORGE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("habitforge-dev")
    } else {
        base_dir.join("habitforge")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
