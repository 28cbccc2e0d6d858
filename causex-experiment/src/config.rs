use std::path::Path;

use causex_core::ConfigError;
use serde::Deserialize;

/// Time the objects stay up after the last target disappears, in ms
pub const POST_DISPLAY_GRACE_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub training_trials: usize,
    /// Copies of each lag × collision combination per block
    pub repetitions_per_condition: usize,
    pub lags_ms: Vec<u32>,
    /// Chance that a true-causal combination gets a burst
    pub burst_probability: f64,
    /// Main-phase trials between breaks
    pub break_every: usize,
    pub post_display_grace_ms: u64,
    pub frame_rate_hz: u32,
    pub seed: Option<u64>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            training_trials: 20,
            repetitions_per_condition: 10,
            lags_ms: vec![100, 300, 500, 700],
            burst_probability: 0.5,
            break_every: 50,
            post_display_grace_ms: POST_DISPLAY_GRACE_MS,
            frame_rate_hz: 32,
            seed: None,
        }
    }
}

impl ExperimentConfig {
    /// Reads a JSON file; missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.training_trials == 0 {
            return Err(invalid("training_trials", "must be at least 1"));
        }
        if self.repetitions_per_condition == 0 {
            return Err(invalid("repetitions_per_condition", "must be at least 1"));
        }
        if self.lags_ms.is_empty() {
            return Err(invalid("lags_ms", "needs at least one lag"));
        }
        if !(0.0..=1.0).contains(&self.burst_probability) {
            return Err(invalid(
                "burst_probability",
                format!("{} is outside [0, 1]", self.burst_probability),
            ));
        }
        if self.break_every == 0 {
            return Err(invalid("break_every", "must be at least 1"));
        }
        if self.frame_rate_hz == 0 {
            return Err(invalid("frame_rate_hz", "must be at least 1"));
        }
        Ok(())
    }

    /// Trials in one main block
    pub fn block_trial_count(&self) -> usize {
        self.lags_ms.len() * causex_core::CollisionType::ALL.len() * self.repetitions_per_condition
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_protocol() {
        let c = ExperimentConfig::default();
        assert_eq!(c.training_trials, 20);
        assert_eq!(c.block_trial_count(), 120);
        assert_eq!(c.break_every, 50);
        assert_eq!(c.post_display_grace_ms, 1000);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn json_overrides_keep_other_defaults() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{ "training_trials": 4, "seed": 7 }}"#).unwrap();
        let c = ExperimentConfig::from_json_file(f.path()).unwrap();
        assert_eq!(c.training_trials, 4);
        assert_eq!(c.seed, Some(7));
        assert_eq!(c.lags_ms, vec![100, 300, 500, 700]);
    }

    #[test]
    fn bad_json_is_a_parse_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{{ not json").unwrap();
        let err = ExperimentConfig::from_json_file(f.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ExperimentConfig::from_json_file(Path::new("/nonexistent/causex.json"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn validation_rejects_empty_lags() {
        let c = ExperimentConfig {
            lags_ms: vec![],
            ..Default::default()
        };
        assert!(matches!(
            c.validate(),
            Err(ConfigError::Invalid { field: "lags_ms", .. })
        ));
    }

    #[test]
    fn validation_rejects_probability_out_of_range() {
        let c = ExperimentConfig {
            burst_probability: 1.5,
            ..Default::default()
        };
        assert!(c.validate().is_err());
    }
}
