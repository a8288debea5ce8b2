//! Error types and result handling for property runs.

use std::fmt;

use serde::Serializer;
use thiserror::Error;

use crate::config::ConfigError;
use crate::shrink::Counterexample;

/// Every way a property run, or a single trial inside it, can end badly
#[derive(Debug, Clone, Error)]
pub enum PropertyError {
    /// The property body signalled a failure for the tuple it was given
    #[error("Property failed: {message}{}", context_suffix(.context))]
    PropertyFailed {
        message: String,
        context: Option<String>,
    },

    /// A precondition of the property did not hold; the trial is skipped
    #[error("Assumption violated: {reason}")]
    AssumptionViolated { reason: String },

    /// A generator could not produce an acceptable value within its budget
    #[error(
        "Generation exhausted for parameter '{parameter}' (seed: {seed}, size: {size}) after {attempts} attempts: {reason}"
    )]
    GenerationExhausted {
        parameter: String,
        seed: u64,
        size: usize,
        attempts: usize,
        reason: String,
    },

    /// Exhaustive sampling was requested for a generator without a finite domain
    #[error("Parameter '{parameter}' of type {type_name} cannot be sampled exhaustively")]
    NotExhaustible {
        parameter: String,
        type_name: &'static str,
    },

    /// Every trial of the run violated an assumption
    #[error(
        "No values satisfied property assumptions ({} violation(s), first: {})",
        .violations.len(),
        .violations.first().map(String::as_str).unwrap_or("<none>")
    )]
    NoSatisfyingValues { violations: Vec<String> },

    /// The property was falsified; carries the (possibly shrunk) counterexample
    #[error("{0}")]
    CounterexampleFound(Box<Counterexample>),

    /// The shrink machinery itself failed while producing candidates
    #[error("Shrinking parameter '{parameter}' failed: {cause}")]
    ShrinkDefect { parameter: String, cause: String },

    /// A property asked for an argument with the wrong type or position
    #[error("Argument {index} is not a {expected} (found {found})")]
    ArgumentMismatch {
        index: usize,
        expected: &'static str,
        found: String,
    },

    /// Invalid run configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

fn context_suffix(context: &Option<String>) -> String {
    match context {
        Some(ctx) => format!(" (context: {})", ctx),
        None => String::new(),
    }
}

impl PropertyError {
    /// Create a simple property failed error
    pub fn property_failed(message: impl Into<String>) -> Self {
        Self::PropertyFailed {
            message: message.into(),
            context: None,
        }
    }

    /// Create a property failed error with context
    pub fn property_failed_with_context(
        message: impl Into<String>,
        context: Option<impl Into<String>>,
    ) -> Self {
        Self::PropertyFailed {
            message: message.into(),
            context: context.map(|c| c.into()),
        }
    }

    /// Create an assumption violation
    pub fn assumption_violated(reason: impl Into<String>) -> Self {
        Self::AssumptionViolated {
            reason: reason.into(),
        }
    }

    /// Create a shrink defect error
    pub fn shrink_defect(parameter: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::ShrinkDefect {
            parameter: parameter.into(),
            cause: cause.into(),
        }
    }

    /// Whether this error is an assumption violation rather than a failure
    pub fn is_assumption_violation(&self) -> bool {
        matches!(self, Self::AssumptionViolated { .. })
    }

    /// The counterexample carried by a falsified run, if any
    pub fn counterexample(&self) -> Option<&Counterexample> {
        match self {
            Self::CounterexampleFound(counterexample) => Some(counterexample),
            _ => None,
        }
    }
}

/// A generator gave up on producing a value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason} (after {attempts} attempts)")]
pub struct GenerationError {
    pub reason: String,
    pub attempts: usize,
}

impl GenerationError {
    pub fn new(reason: impl Into<String>, attempts: usize) -> Self {
        Self {
            reason: reason.into(),
            attempts,
        }
    }
}

/// Turn a caught panic payload into a readable message
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}

/// Serialize anything printable through its `Display` output
pub(crate) fn serialize_display<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: fmt::Display,
    S: Serializer,
{
    serializer.collect_str(value)
}
