//! Tracker configuration
//!
//! All thresholds are tunable constants injected into the tracker at
//! construction. Configuration can be loaded from TOML and overridden through
//! `FOCUS_*` environment variables.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// How a blink frame feeds the debouncer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlinkPolicy {
    /// Blink frames count as looking away
    #[default]
    ForceAway,
    /// Blink frames leave the hysteresis counters untouched
    Neutral,
}

/// What happens when a question starts while another is still open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionReentry {
    /// Close and record the open question, then start the new one
    #[default]
    AutoClose,
    /// Refuse the new question with an error
    Reject,
}

/// Top-level tracker configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub geometry: GeometryConfig,
    pub classifier: ClassifierConfig,
    pub debounce: DebounceConfig,
    pub aggregator: AggregatorConfig,
    pub difficulty: DifficultyConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Added to the EAR denominator
    pub epsilon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Max |horizontal gaze deviation| for an on-target frame
    pub gaze_horizontal_threshold: f64,
    /// Lower edge of the vertical band (negative = looking up)
    pub gaze_up_limit: f64,
    /// Upper edge of the vertical band (positive = looking down)
    pub gaze_down_limit: f64,
    /// EAR below this is a blink
    pub blink_threshold: f64,
    /// Max |head horizontal offset|
    pub head_turn_threshold: f64,
    /// Max |head vertical offset|
    pub head_tilt_threshold: f64,
    pub blink_policy: BlinkPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceConfig {
    /// Consecutive away frames before a look-away is pending
    pub away_confirmation_frames: u32,
    /// Consecutive on-target frames before focus is restored
    pub focus_confirmation_frames: u32,
    /// A pending look-away must outlast this before it is confirmed
    pub grace_period_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// The session score reads 0 until total frames exceed this
    pub warmup_frames: u64,
    pub question_reentry: QuestionReentry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyConfig {
    /// Fewer samples than this yields the default label
    pub min_samples: usize,
    /// Number of most recent samples the ratio is taken over
    pub recent_window: usize,
    /// Focus percentage at or above which a question is easy
    pub easy_threshold: f64,
    /// Focus percentage at or above which a question is normal
    pub normal_threshold: f64,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self { epsilon: 0.001 }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            gaze_horizontal_threshold: 0.08,
            gaze_up_limit: -0.04,
            gaze_down_limit: 0.10,
            blink_threshold: 0.20,
            head_turn_threshold: 0.15,
            head_tilt_threshold: 0.15,
            blink_policy: BlinkPolicy::ForceAway,
        }
    }
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            away_confirmation_frames: 3,
            focus_confirmation_frames: 3,
            grace_period_ms: 1000,
        }
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            warmup_frames: 10,
            question_reentry: QuestionReentry::AutoClose,
        }
    }
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            min_samples: 5,
            recent_window: 10,
            easy_threshold: 80.0,
            normal_threshold: 60.0,
        }
    }
}

impl TrackerConfig {
    /// Tighter thresholds and a shorter grace period
    pub fn strict() -> Self {
        let mut config = Self::default();
        config.classifier.gaze_horizontal_threshold = 0.06;
        config.classifier.gaze_up_limit = -0.03;
        config.classifier.gaze_down_limit = 0.08;
        config.classifier.head_turn_threshold = 0.12;
        config.classifier.head_tilt_threshold = 0.12;
        config.debounce.grace_period_ms = 500;
        config
    }

    /// Looser thresholds and a longer grace period
    pub fn lenient() -> Self {
        let mut config = Self::default();
        config.classifier.gaze_horizontal_threshold = 0.12;
        config.classifier.gaze_up_limit = -0.06;
        config.classifier.gaze_down_limit = 0.15;
        config.classifier.head_turn_threshold = 0.2;
        config.classifier.head_tilt_threshold = 0.2;
        config.debounce.away_confirmation_frames = 5;
        config.debounce.grace_period_ms = 2000;
        config
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: TrackerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `FOCUS_*` environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    pub(crate) fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("FOCUS_BLINK_THRESHOLD") {
            self.classifier.blink_threshold = parse_override("FOCUS_BLINK_THRESHOLD", &val)?;
        }
        if let Some(val) = lookup("FOCUS_AWAY_CONFIRM_FRAMES") {
            self.debounce.away_confirmation_frames =
                parse_override("FOCUS_AWAY_CONFIRM_FRAMES", &val)?;
        }
        if let Some(val) = lookup("FOCUS_FOCUS_CONFIRM_FRAMES") {
            self.debounce.focus_confirmation_frames =
                parse_override("FOCUS_FOCUS_CONFIRM_FRAMES", &val)?;
        }
        if let Some(val) = lookup("FOCUS_GRACE_PERIOD_MS") {
            self.debounce.grace_period_ms = parse_override("FOCUS_GRACE_PERIOD_MS", &val)?;
        }
        if let Some(val) = lookup("FOCUS_WARMUP_FRAMES") {
            self.aggregator.warmup_frames = parse_override("FOCUS_WARMUP_FRAMES", &val)?;
        }
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.geometry.epsilon <= 0.0 {
            return Err(ConfigError::Validation(
                "geometry.epsilon must be positive".to_string(),
            ));
        }

        let c = &self.classifier;
        if c.gaze_horizontal_threshold <= 0.0
            || c.head_turn_threshold <= 0.0
            || c.head_tilt_threshold <= 0.0
        {
            return Err(ConfigError::Validation(
                "classifier thresholds must be positive".to_string(),
            ));
        }
        if c.gaze_up_limit >= c.gaze_down_limit {
            return Err(ConfigError::Validation(
                "classifier.gaze_up_limit must be below gaze_down_limit".to_string(),
            ));
        }
        if c.blink_threshold < 0.0 {
            return Err(ConfigError::Validation(
                "classifier.blink_threshold must be non-negative".to_string(),
            ));
        }

        let d = &self.debounce;
        if d.away_confirmation_frames == 0 || d.focus_confirmation_frames == 0 {
            return Err(ConfigError::Validation(
                "debounce confirmation frame counts must be at least 1".to_string(),
            ));
        }
        if d.grace_period_ms < 0 {
            return Err(ConfigError::Validation(
                "debounce.grace_period_ms must be non-negative".to_string(),
            ));
        }

        let q = &self.difficulty;
        if q.recent_window == 0 {
            return Err(ConfigError::Validation(
                "difficulty.recent_window must be at least 1".to_string(),
            ));
        }
        if q.easy_threshold < q.normal_threshold {
            return Err(ConfigError::Validation(
                "difficulty.easy_threshold must be >= normal_threshold".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&q.easy_threshold) || !(0.0..=100.0).contains(&q.normal_threshold)
        {
            return Err(ConfigError::Validation(
                "difficulty thresholds must be percentages in [0, 100]".to_string(),
            ));
        }

        Ok(())
    }

    /// Serialize configuration to TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, val: &str) -> Result<T, ConfigError> {
    val.trim()
        .parse()
        .map_err(|_| ConfigError::Validation(format!("Invalid {}", key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        assert!(TrackerConfig::default().validate().is_ok());
        assert!(TrackerConfig::strict().validate().is_ok());
        assert!(TrackerConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = TrackerConfig::from_toml_str(
            r#"
            [debounce]
            away_confirmation_frames = 5
            grace_period_ms = 0

            [classifier]
            blink_policy = "neutral"
            "#,
        )
        .unwrap();

        assert_eq!(config.debounce.away_confirmation_frames, 5);
        assert_eq!(config.debounce.grace_period_ms, 0);
        assert_eq!(config.debounce.focus_confirmation_frames, 3);
        assert_eq!(config.classifier.blink_policy, BlinkPolicy::Neutral);
        assert_eq!(config.difficulty, DifficultyConfig::default());
    }

    #[test]
    fn test_toml_round_trip_through_file() {
        let config = TrackerConfig::strict();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_toml_string().unwrap().as_bytes())
            .unwrap();

        let loaded = TrackerConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_validation_rejects_inverted_band() {
        let mut config = TrackerConfig::default();
        config.classifier.gaze_up_limit = 0.2;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validation_rejects_non_monotonic_difficulty() {
        let mut config = TrackerConfig::default();
        config.difficulty.easy_threshold = 50.0;
        config.difficulty.normal_threshold = 70.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_confirmation_frames() {
        let mut config = TrackerConfig::default();
        config.debounce.away_confirmation_frames = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("FOCUS_GRACE_PERIOD_MS", "250"),
            ("FOCUS_WARMUP_FRAMES", "30"),
            ("FOCUS_BLINK_THRESHOLD", "0.15"),
        ]
        .into_iter()
        .collect();

        let mut config = TrackerConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.debounce.grace_period_ms, 250);
        assert_eq!(config.aggregator.warmup_frames, 30);
        assert!((config.classifier.blink_threshold - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_env_override() {
        let mut config = TrackerConfig::default();
        let result = config.apply_overrides(|key| {
            (key == "FOCUS_AWAY_CONFIRM_FRAMES").then(|| "three".to_string())
        });
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}
