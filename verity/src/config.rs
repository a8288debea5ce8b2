//! Configuration types for controlling runs and value generation.

use thiserror::Error;

use crate::shrink::ShrinkControl;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid trial count: {0} (must be > 0)")]
    InvalidTrials(usize),
    #[error("Invalid mean size: {0} (must be > 0)")]
    InvalidMeanSize(usize),
    #[error("Invalid max size: {max} (must be >= mean size {mean})")]
    InvalidMaxSize { max: usize, mean: usize },
    #[error("Invalid discard budget: {0} (must be > 0)")]
    InvalidMaxDiscards(usize),
    #[error("Invalid shrink attempt limit: {0} (must be > 0)")]
    InvalidShrinkAttempts(usize),
    #[error("Invalid shrink depth limit: {0} (must be > 0)")]
    InvalidShrinkDepth(usize),
    #[error("Invalid shrink time limit (must be > 0)")]
    InvalidShrinkTime,
    #[error("Invalid trial override '{0}' (expected a positive integer or -1)")]
    InvalidTrialOverride(String),
}

/// Configuration for value generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Mean of the geometric size distribution
    pub mean_size: usize,
    /// Sizes are clamped to this value
    pub max_size: usize,
    /// Rejected draws allowed per value before generation is exhausted
    pub max_discards: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            mean_size: 10,
            max_size: 100,
            max_discards: 100,
        }
    }
}

impl GeneratorConfig {
    /// Create a new generator configuration with validation
    pub fn new(mean_size: usize, max_size: usize, max_discards: usize) -> Result<Self, ConfigError> {
        let config = Self {
            mean_size,
            max_size,
            max_discards,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mean_size == 0 {
            return Err(ConfigError::InvalidMeanSize(self.mean_size));
        }
        if self.max_size < self.mean_size {
            return Err(ConfigError::InvalidMaxSize {
                max: self.max_size,
                mean: self.mean_size,
            });
        }
        if self.max_discards == 0 {
            return Err(ConfigError::InvalidMaxDiscards(self.max_discards));
        }
        Ok(())
    }
}

/// Host-side trial override
///
/// The host reads the override from wherever it lives (an environment
/// variable, a CLI flag) and hands the text here; the engine itself never
/// touches process state.
pub struct TrialOverride;

impl TrialOverride {
    /// Parse override text; empty or `-1` means "no override"
    pub fn parse(text: &str) -> Result<Option<usize>, ConfigError> {
        let text = text.trim();
        if text.is_empty() || text == "-1" {
            return Ok(None);
        }
        match text.parse::<usize>() {
            Ok(trials) if trials > 0 => Ok(Some(trials)),
            _ => Err(ConfigError::InvalidTrialOverride(text.to_string())),
        }
    }
}

/// Per-run configuration
#[derive(Debug, Clone, Default)]
pub struct PropertyConfig {
    /// Seed for the run's randomness; drawn from entropy when absent
    pub seed: Option<u64>,
    /// Replaces the declared trial budget when present
    pub trials_override: Option<usize>,
    pub generator: GeneratorConfig,
    pub shrink: ShrinkControl,
}

impl PropertyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_trials_override(mut self, trials: Option<usize>) -> Self {
        self.trials_override = trials;
        self
    }

    pub fn with_generator_config(mut self, generator: GeneratorConfig) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_shrink_control(mut self, shrink: ShrinkControl) -> Self {
        self.shrink = shrink;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(trials) = self.trials_override
            && trials == 0
        {
            return Err(ConfigError::InvalidTrials(trials));
        }
        self.generator.validate()?;
        self.shrink.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_generator_config_validation() {
        assert!(GeneratorConfig::new(10, 100, 100).is_ok());
        assert_eq!(
            GeneratorConfig::new(0, 100, 100),
            Err(ConfigError::InvalidMeanSize(0))
        );
        assert_eq!(
            GeneratorConfig::new(10, 5, 100),
            Err(ConfigError::InvalidMaxSize { max: 5, mean: 10 })
        );
        assert_eq!(
            GeneratorConfig::new(10, 100, 0),
            Err(ConfigError::InvalidMaxDiscards(0))
        );
    }

    #[test]
    fn test_trial_override_parsing() {
        assert_eq!(TrialOverride::parse(""), Ok(None));
        assert_eq!(TrialOverride::parse("-1"), Ok(None));
        assert_eq!(TrialOverride::parse(" 25 "), Ok(Some(25)));
        assert_eq!(
            TrialOverride::parse("0"),
            Err(ConfigError::InvalidTrialOverride("0".to_string()))
        );
        assert_eq!(
            TrialOverride::parse("many"),
            Err(ConfigError::InvalidTrialOverride("many".to_string()))
        );
    }

    #[test]
    fn test_property_config_builder_and_validation() {
        let config = PropertyConfig::new()
            .with_seed(7)
            .with_trials_override(Some(3))
            .with_shrink_control(ShrinkControl::default().with_max_shrinks(5));
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.trials_override, Some(3));
        assert_eq!(config.shrink.max_shrinks, 5);
        assert!(config.validate().is_ok());

        let config = PropertyConfig::new().with_trials_override(Some(0));
        assert_eq!(config.validate(), Err(ConfigError::InvalidTrials(0)));

        let config = PropertyConfig::new()
            .with_shrink_control(ShrinkControl::default().with_max_shrink_time(Duration::ZERO));
        assert_eq!(config.validate(), Err(ConfigError::InvalidShrinkTime));
    }

    #[test]
    fn test_config_error_display() {
        assert_eq!(
            ConfigError::InvalidTrials(0).to_string(),
            "Invalid trial count: 0 (must be > 0)"
        );
        assert_eq!(
            ConfigError::InvalidTrialOverride("x".to_string()).to_string(),
            "Invalid trial override 'x' (expected a positive integer or -1)"
        );
    }
}
