//! TOML-based engine configuration.
//!
//! Every tunable the engine uses lives here instead of as an inline fallback:
//! - Protocol rules (grace period, default cycle length)
//! - XP economy (per-standard award, full-day bonus, level size, prestige)
//! - Discipline score weights and neutral defaults
//! - Momentum window and thresholds
//! - Relapse analysis sample size
//!
//! Configuration is stored at `~/.config/mazoezi/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::{ConfigError, Result};

/// Protocol rules shared by every challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Hours after local midnight during which today is not judged yet.
    #[serde(default = "default_grace_hours")]
    pub grace_hours: u32,
    /// Cycle length used when a challenge does not carry one.
    #[serde(default = "default_duration_days")]
    pub default_duration_days: u32,
}

/// XP economy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XpConfig {
    #[serde(default = "default_xp_per_standard")]
    pub per_standard: u64,
    #[serde(default = "default_xp_full_day")]
    pub full_day_bonus: u64,
    #[serde(default = "default_xp_per_level")]
    pub per_level: u64,
    /// Reaching this level rolls over into prestige.
    #[serde(default = "default_prestige_level")]
    pub prestige_level: u32,
    /// Multiplier applied to every award once prestige has been reached.
    #[serde(default = "default_prestige_boost")]
    pub prestige_boost: f64,
    /// Streak multiplier is `1 + streak / streak_divisor`.
    #[serde(default = "default_streak_divisor")]
    pub streak_divisor: f64,
}

/// Discipline score weights and defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreConfig {
    #[serde(default = "default_completion_weight")]
    pub completion_weight: f64,
    #[serde(default = "default_streak_weight")]
    pub streak_weight: f64,
    #[serde(default = "default_on_time_weight")]
    pub on_time_weight: f64,
    #[serde(default = "default_reset_weight")]
    pub reset_weight: f64,
    /// Completion factor used when no history exists.
    #[serde(default = "default_neutral_completion")]
    pub neutral_completion: f64,
    /// On-time rate used when the profile has none.
    #[serde(default = "default_on_time_rate")]
    pub default_on_time_rate: f64,
    /// Streak factor used before any streak has ever been recorded.
    #[serde(default = "default_baseline_streak")]
    pub baseline_streak_factor: f64,
    /// Current streak length that counts as fully stable.
    #[serde(default = "default_stability_days")]
    pub stability_days: u32,
    /// Longest streak length that counts as fully established.
    #[serde(default = "default_length_days")]
    pub length_days: u32,
    /// Penalty per archived reset.
    #[serde(default = "default_reset_penalty")]
    pub reset_penalty: f64,
}

/// Momentum window and thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentumConfig {
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    #[serde(default = "default_strong")]
    pub strong: f64,
    #[serde(default = "default_stable")]
    pub stable: f64,
    #[serde(default = "default_weak")]
    pub weak: f64,
}

/// Relapse analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelapseConfig {
    /// Fewer archived cycles than this yields no pattern report.
    #[serde(default = "default_min_sample")]
    pub min_sample: usize,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/mazoezi/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub xp: XpConfig,
    #[serde(default)]
    pub score: ScoreConfig,
    #[serde(default)]
    pub momentum: MomentumConfig,
    #[serde(default)]
    pub relapse: RelapseConfig,
}

// Default functions
fn default_grace_hours() -> u32 {
    3
}
fn default_duration_days() -> u32 {
    75
}
fn default_xp_per_standard() -> u64 {
    50
}
fn default_xp_full_day() -> u64 {
    200
}
fn default_xp_per_level() -> u64 {
    1000
}
fn default_prestige_level() -> u32 {
    100
}
fn default_prestige_boost() -> f64 {
    1.05
}
fn default_streak_divisor() -> f64 {
    30.0
}
fn default_completion_weight() -> f64 {
    0.4
}
fn default_streak_weight() -> f64 {
    0.3
}
fn default_on_time_weight() -> f64 {
    0.2
}
fn default_reset_weight() -> f64 {
    0.1
}
fn default_neutral_completion() -> f64 {
    0.5
}
fn default_on_time_rate() -> f64 {
    0.8
}
fn default_baseline_streak() -> f64 {
    0.2
}
fn default_stability_days() -> u32 {
    7
}
fn default_length_days() -> u32 {
    30
}
fn default_reset_penalty() -> f64 {
    0.1
}
fn default_window_days() -> u32 {
    7
}
fn default_strong() -> f64 {
    1.0
}
fn default_stable() -> f64 {
    0.85
}
fn default_weak() -> f64 {
    0.5
}
fn default_min_sample() -> usize {
    3
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            grace_hours: default_grace_hours(),
            default_duration_days: default_duration_days(),
        }
    }
}

impl Default for XpConfig {
    fn default() -> Self {
        Self {
            per_standard: default_xp_per_standard(),
            full_day_bonus: default_xp_full_day(),
            per_level: default_xp_per_level(),
            prestige_level: default_prestige_level(),
            prestige_boost: default_prestige_boost(),
            streak_divisor: default_streak_divisor(),
        }
    }
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            completion_weight: default_completion_weight(),
            streak_weight: default_streak_weight(),
            on_time_weight: default_on_time_weight(),
            reset_weight: default_reset_weight(),
            neutral_completion: default_neutral_completion(),
            default_on_time_rate: default_on_time_rate(),
            baseline_streak_factor: default_baseline_streak(),
            stability_days: default_stability_days(),
            length_days: default_length_days(),
            reset_penalty: default_reset_penalty(),
        }
    }
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            strong: default_strong(),
            stable: default_stable(),
            weak: default_weak(),
        }
    }
}

impl Default for RelapseConfig {
    fn default() -> Self {
        Self {
            min_sample: default_min_sample(),
        }
    }
}

impl Config {
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
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(n) => {
                        if n.is_f64() {
                            let f = value.parse::<f64>().map_err(|e| invalid(e.to_string()))?;
                            serde_json::Number::from_f64(f)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            let u = value.parse::<u64>().map_err(|e| invalid(e.to_string()))?;
                            serde_json::Value::Number(u.into())
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or write and return the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                ConfigError::LoadFailed {
                    path,
                    message: e.to_string(),
                }
                .into()
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.clone(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(&path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
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

    /// Set a config value by key and persist. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.apply(key, value)?;
        self.save()
    }

    /// Set a config value by key without touching the disk.
    fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default configuration");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn partial_toml_fills_remaining_defaults() {
        let parsed: Config = toml::from_str("[protocol]\ngrace_hours = 5\n").unwrap();
        assert_eq!(parsed.protocol.grace_hours, 5);
        assert_eq!(parsed.protocol.default_duration_days, 75);
        assert_eq!(parsed.xp.per_level, 1000);
        assert_eq!(parsed.momentum.window_days, 7);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("protocol.grace_hours").as_deref(), Some("3"));
        assert_eq!(cfg.get("xp.prestige_boost").as_deref(), Some("1.05"));
        assert!(cfg.get("xp.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn apply_updates_integer_and_float_fields() {
        let mut cfg = Config::default();
        cfg.apply("relapse.min_sample", "5").unwrap();
        cfg.apply("momentum.stable", "0.9").unwrap();
        assert_eq!(cfg.relapse.min_sample, 5);
        assert_eq!(cfg.momentum.stable, 0.9);
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let mut cfg = Config::default();
        let err = cfg.apply("xp.nonexistent", "1").unwrap_err();
        assert!(err.to_string().contains("unknown config key"));
    }

    #[test]
    fn apply_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.apply("protocol.grace_hours", "three").is_err());
        assert!(cfg.apply("protocol.grace_hours", "-1").is_err());
        assert_eq!(cfg.protocol.grace_hours, 3);
    }

    #[test]
    fn config_default_values() {
        let cfg = Config::default();
        assert_eq!(cfg.protocol.grace_hours, 3);
        assert_eq!(cfg.xp.per_standard, 50);
        assert_eq!(cfg.xp.full_day_bonus, 200);
        assert_eq!(cfg.xp.prestige_level, 100);
        assert_eq!(cfg.score.default_on_time_rate, 0.8);
        assert_eq!(cfg.score.neutral_completion, 0.5);
        assert_eq!(cfg.relapse.min_sample, 3);
    }
}
