//! Property bodies and their declarations.

use std::fmt;

use crate::config::ConfigError;
use crate::error::PropertyError;
use crate::parameter::{ParameterDescriptor, Tuple};
use crate::sampling::SamplingMode;

/// A property body, checked once per argument tuple
///
/// Returning [`PropertyError::AssumptionViolated`] skips the trial; any
/// other error, or a panic, falsifies the property for that tuple.
pub trait Property {
    fn check(&self, args: &Tuple) -> Result<(), PropertyError>;
}

impl<F> Property for F
where
    F: Fn(&Tuple) -> Result<(), PropertyError>,
{
    fn check(&self, args: &Tuple) -> Result<(), PropertyError> {
        self(args)
    }
}

/// Skip the current trial unless `condition` holds
///
/// ```
/// use verity::{PropertyError, assume};
///
/// fn halve(n: i32) -> Result<i32, PropertyError> {
///     assume(n % 2 == 0, "n must be even")?;
///     Ok(n / 2)
/// }
///
/// assert!(halve(3).unwrap_err().is_assumption_violation());
/// ```
pub fn assume(condition: bool, reason: impl Into<String>) -> Result<(), PropertyError> {
    if condition {
        Ok(())
    } else {
        Err(PropertyError::assumption_violated(reason))
    }
}

/// A declared property: what to test and how many trials to spend on it
#[derive(Debug, Clone)]
pub struct PropertyDeclaration {
    name: String,
    scope: String,
    parameters: Vec<ParameterDescriptor>,
    trials: usize,
    mode: SamplingMode,
}

impl PropertyDeclaration {
    /// Declare property `name` owned by `scope`, with 100 sampled trials
    pub fn new(name: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: scope.into(),
            parameters: Vec::new(),
            trials: 100,
            mode: SamplingMode::Sampling,
        }
    }

    /// Append a parameter; parameters bind to tuple positions in declaration order
    pub fn parameter(mut self, descriptor: ParameterDescriptor) -> Self {
        self.parameters.push(descriptor);
        self
    }

    pub fn with_trials(mut self, trials: usize) -> Self {
        self.trials = trials;
        self
    }

    pub fn with_mode(mut self, mode: SamplingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn exhaustive(self) -> Self {
        self.with_mode(SamplingMode::Exhaustive)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    pub fn trials(&self) -> usize {
        self.trials
    }

    pub fn mode(&self) -> SamplingMode {
        self.mode
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trials == 0 {
            return Err(ConfigError::InvalidTrials(self.trials));
        }
        Ok(())
    }
}

impl fmt::Display for PropertyDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.scope, self.name)
    }
}
