//! Shrinking: greedy search for a smaller tuple that still falsifies a property.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, trace};

use crate::config::ConfigError;
use crate::error::{PropertyError, serialize_display};
use crate::parameter::{ParameterGenerationContext, Tuple};
use crate::value::Value;
use crate::verifier::{PropertyVerifier, TrialOutcome};

type MinimalCounterexampleCallback = Arc<dyn Fn(&Counterexample) + Send + Sync>;

/// Whether and how far to shrink a falsifying tuple
#[derive(Clone)]
pub struct ShrinkControl {
    pub enabled: bool,
    /// Candidates verified per session
    pub max_shrinks: usize,
    /// Candidates adopted per session
    pub max_shrink_depth: usize,
    pub max_shrink_time: Duration,
    on_minimal_counterexample: Option<MinimalCounterexampleCallback>,
}

impl Default for ShrinkControl {
    fn default() -> Self {
        Self {
            enabled: true,
            max_shrinks: 100,
            max_shrink_depth: 20,
            max_shrink_time: Duration::from_secs(60),
            on_minimal_counterexample: None,
        }
    }
}

impl fmt::Debug for ShrinkControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShrinkControl")
            .field("enabled", &self.enabled)
            .field("max_shrinks", &self.max_shrinks)
            .field("max_shrink_depth", &self.max_shrink_depth)
            .field("max_shrink_time", &self.max_shrink_time)
            .field(
                "on_minimal_counterexample",
                &self.on_minimal_counterexample.is_some(),
            )
            .finish()
    }
}

impl ShrinkControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report the first falsifying tuple as found
    pub fn disabled() -> Self {
        Self::default().with_enabled(false)
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_max_shrinks(mut self, max_shrinks: usize) -> Self {
        self.max_shrinks = max_shrinks;
        self
    }

    pub fn with_max_shrink_depth(mut self, max_shrink_depth: usize) -> Self {
        self.max_shrink_depth = max_shrink_depth;
        self
    }

    pub fn with_max_shrink_time(mut self, max_shrink_time: Duration) -> Self {
        self.max_shrink_time = max_shrink_time;
        self
    }

    /// Called once per falsified run with the counterexample that gets reported,
    /// whether or not it was shrunk
    pub fn on_minimal_counterexample<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Counterexample) + Send + Sync + 'static,
    {
        self.on_minimal_counterexample = Some(Arc::new(callback));
        self
    }

    pub fn should_shrink(&self) -> bool {
        self.enabled
    }

    pub fn notify(&self, counterexample: &Counterexample) {
        if let Some(callback) = &self.on_minimal_counterexample {
            callback(counterexample);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_shrinks == 0 {
            return Err(ConfigError::InvalidShrinkAttempts(self.max_shrinks));
        }
        if self.max_shrink_depth == 0 {
            return Err(ConfigError::InvalidShrinkDepth(self.max_shrink_depth));
        }
        if self.max_shrink_time.is_zero() {
            return Err(ConfigError::InvalidShrinkTime);
        }
        Ok(())
    }
}

/// Why a shrink session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShrinkStop {
    /// Shrinking was turned off; the tuple is reported as drawn
    Disabled,
    /// A full pass over every parameter adopted nothing
    LocalMinimum,
    AttemptLimit,
    DepthLimit,
    TimeLimit,
}

impl fmt::Display for ShrinkStop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ShrinkStop::Disabled => "shrinking disabled",
            ShrinkStop::LocalMinimum => "local minimum",
            ShrinkStop::AttemptLimit => "attempt limit reached",
            ShrinkStop::DepthLimit => "depth limit reached",
            ShrinkStop::TimeLimit => "time limit reached",
        };
        f.write_str(text)
    }
}

/// The state of one shrink session
#[derive(Debug, Clone)]
pub struct ShrinkState {
    /// Smallest falsifying tuple found so far
    pub current: Tuple,
    /// Error `current` failed with
    pub error: PropertyError,
    pub attempts: usize,
    pub depth: usize,
    pub stop: ShrinkStop,
}

impl ShrinkState {
    fn new(current: Tuple, error: PropertyError) -> Self {
        Self {
            current,
            error,
            attempts: 0,
            depth: 0,
            stop: ShrinkStop::LocalMinimum,
        }
    }
}

/// A falsified property: what failed first, and what it shrank to
#[derive(Debug, Clone, Serialize)]
pub struct Counterexample {
    pub property: String,
    /// 1-based number of the trial that failed
    pub trial: usize,
    pub original: Tuple,
    #[serde(serialize_with = "serialize_display")]
    pub original_error: PropertyError,
    pub minimal: Tuple,
    #[serde(serialize_with = "serialize_display")]
    pub error: PropertyError,
    pub shrink_attempts: usize,
    pub shrink_depth: usize,
    pub stop: ShrinkStop,
}

impl Counterexample {
    pub(crate) fn unshrunk(property: &str, trial: usize, tuple: Tuple, error: PropertyError) -> Self {
        Self::from_state(
            property,
            trial,
            tuple.clone(),
            error.clone(),
            ShrinkState {
                stop: ShrinkStop::Disabled,
                ..ShrinkState::new(tuple, error)
            },
        )
    }

    pub(crate) fn from_state(
        property: &str,
        trial: usize,
        original: Tuple,
        original_error: PropertyError,
        state: ShrinkState,
    ) -> Self {
        Self {
            property: property.to_string(),
            trial,
            original,
            original_error,
            minimal: state.current,
            error: state.error,
            shrink_attempts: state.attempts,
            shrink_depth: state.depth,
            stop: state.stop,
        }
    }

    /// Seeds that regenerate the originally drawn tuple
    ///
    /// Shrinking is deterministic, so replaying these and shrinking again
    /// arrives at the same minimal tuple.
    pub fn seeds(&self) -> Vec<u64> {
        self.minimal.seeds()
    }

    /// The minimal arguments, in parameter order
    pub fn values(&self) -> Vec<Value> {
        self.minimal.values()
    }
}

impl fmt::Display for Counterexample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Property {} falsified on trial {}",
            self.property, self.trial
        )?;
        writeln!(f, "  minimal:  {}", self.minimal)?;
        writeln!(f, "  original: {}", self.original)?;
        writeln!(f, "  error:    {}", self.error)?;
        write!(
            f,
            "  shrinking: {} attempt(s), {} step(s) adopted ({})",
            self.shrink_attempts, self.shrink_depth, self.stop
        )
    }
}

/// Greedy shrink search over a falsifying tuple
///
/// Parameters are visited in declaration order; each candidate of the
/// current parameter is verified with every other argument held fixed. The
/// first candidate that still falsifies is adopted and the walk restarts at
/// the first parameter. The session ends at a local minimum or when one of
/// the [`ShrinkControl`] bounds is hit.
pub struct Shrinker<'a> {
    contexts: &'a [ParameterGenerationContext],
    verifier: &'a PropertyVerifier<'a>,
    control: &'a ShrinkControl,
}

impl<'a> Shrinker<'a> {
    pub fn new(
        contexts: &'a [ParameterGenerationContext],
        verifier: &'a PropertyVerifier<'a>,
        control: &'a ShrinkControl,
    ) -> Self {
        Self {
            contexts,
            verifier,
            control,
        }
    }

    /// Shrink `tuple`, which failed with `error`
    ///
    /// Errors only come from the shrink machinery itself; the property
    /// failing or passing on a candidate is part of the search.
    pub fn shrink(&self, tuple: Tuple, error: PropertyError) -> Result<ShrinkState, PropertyError> {
        let start_time = Instant::now();
        let mut state = ShrinkState::new(tuple, error);

        'search: loop {
            let mut found_smaller = false;

            'parameters: for context in self.contexts {
                let index = context.index();
                let Some(seeded) = state.current.get(index) else {
                    continue;
                };
                let mut candidates = context.shrink(&seeded.value)?;

                loop {
                    if start_time.elapsed() >= self.control.max_shrink_time {
                        state.stop = ShrinkStop::TimeLimit;
                        break 'search;
                    }

                    let next = catch_unwind(AssertUnwindSafe(|| candidates.next()))
                        .map_err(|payload| context.defect(payload))?;
                    let Some(candidate) = next else {
                        break;
                    };

                    if state.attempts >= self.control.max_shrinks {
                        state.stop = ShrinkStop::AttemptLimit;
                        break 'search;
                    }
                    state.attempts += 1;

                    let trial = state.current.with_value(index, candidate);
                    match self.verifier.classify(&trial) {
                        TrialOutcome::Falsified { error, tuple } => {
                            state.depth += 1;
                            debug!(
                                parameter = context.name(),
                                attempt = state.attempts,
                                depth = state.depth,
                                "Shrink step adopted: {}",
                                tuple
                            );
                            state.current = tuple;
                            state.error = error;
                            found_smaller = true;

                            if state.depth >= self.control.max_shrink_depth {
                                state.stop = ShrinkStop::DepthLimit;
                                break 'search;
                            }
                            break 'parameters;
                        }
                        rejected => {
                            trace!(
                                parameter = context.name(),
                                attempt = state.attempts,
                                outcome = ?rejected,
                                "Shrink candidate rejected"
                            );
                        }
                    }
                }
            }

            if !found_smaller {
                state.stop = ShrinkStop::LocalMinimum;
                break;
            }
        }

        debug!(
            attempts = state.attempts,
            depth = state.depth,
            stop = %state.stop,
            elapsed = ?start_time.elapsed(),
            "Shrinking finished"
        );
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::error::GenerationError;
    use crate::generator::Generator;
    use crate::parameter::{ParameterDescriptor, SeededValue};
    use crate::primitives::{IntGenerator, VecGenerator};
    use crate::rng::Randomness;
    use std::sync::Mutex;

    fn contexts(descriptors: Vec<ParameterDescriptor>) -> Vec<ParameterGenerationContext> {
        let config = GeneratorConfig::default();
        descriptors
            .into_iter()
            .enumerate()
            .map(|(index, descriptor)| ParameterGenerationContext::new(index, descriptor, &config))
            .collect()
    }

    fn tuple(values: Vec<Value>) -> Tuple {
        Tuple::new(
            values
                .into_iter()
                .enumerate()
                .map(|(index, value)| SeededValue {
                    parameter: index,
                    name: format!("p{}", index),
                    value,
                    seed: 1_000 + index as u64,
                    size: 5,
                })
                .collect(),
        )
    }

    fn at_least_ten(args: &Tuple) -> Result<(), PropertyError> {
        let n = *args.arg::<i32>(0)?;
        if n >= 10 {
            return Err(PropertyError::property_failed(format!("{} >= 10", n)));
        }
        Ok(())
    }

    #[test]
    fn test_shrink_control_defaults() {
        let control = ShrinkControl::default();
        assert!(control.should_shrink());
        assert_eq!(control.max_shrinks, 100);
        assert_eq!(control.max_shrink_depth, 20);
        assert_eq!(control.max_shrink_time, Duration::from_secs(60));
        assert!(!ShrinkControl::disabled().should_shrink());
        assert!(control.validate().is_ok());
        assert_eq!(
            control.clone().with_max_shrinks(0).validate(),
            Err(ConfigError::InvalidShrinkAttempts(0))
        );
        assert_eq!(
            control.with_max_shrink_depth(0).validate(),
            Err(ConfigError::InvalidShrinkDepth(0))
        );
    }

    #[test]
    fn test_shrinks_integer_to_boundary() {
        let contexts = contexts(vec![ParameterDescriptor::new(
            "n",
            IntGenerator::new(0_i32, 1_000),
        )]);
        let verifier = PropertyVerifier::new("at_least_ten", &at_least_ten);
        let control = ShrinkControl::default();
        let shrinker = Shrinker::new(&contexts, &verifier, &control);

        let state = shrinker
            .shrink(
                tuple(vec![Value::new(700_i32)]),
                PropertyError::property_failed("700 >= 10"),
            )
            .unwrap();

        assert_eq!(state.current.arg::<i32>(0).unwrap(), &10);
        assert_eq!(state.error.to_string(), "Property failed: 10 >= 10");
        assert_eq!(state.stop, ShrinkStop::LocalMinimum);
        assert_eq!(state.current.seeds(), vec![1_000]);
    }

    #[test]
    fn test_every_adopted_tuple_still_falsifies() {
        let contexts = contexts(vec![
            ParameterDescriptor::new("a", IntGenerator::new(0_i64, 1_000)),
            ParameterDescriptor::new("b", IntGenerator::new(0_i64, 1_000)),
        ]);
        let sum_small = |args: &Tuple| -> Result<(), PropertyError> {
            let (a, b) = (*args.arg::<i64>(0)?, *args.arg::<i64>(1)?);
            if a + b > 100 {
                return Err(PropertyError::property_failed("sum too large"));
            }
            Ok(())
        };
        let verifier = PropertyVerifier::new("sum_small", &sum_small);
        let control = ShrinkControl::default().with_max_shrinks(10_000).with_max_shrink_depth(10_000);
        let shrinker = Shrinker::new(&contexts, &verifier, &control);

        let state = shrinker
            .shrink(
                tuple(vec![Value::new(900_i64), Value::new(800_i64)]),
                PropertyError::property_failed("sum too large"),
            )
            .unwrap();

        let a = *state.current.arg::<i64>(0).unwrap();
        let b = *state.current.arg::<i64>(1).unwrap();
        assert_eq!(a + b, 101);
        assert_eq!(a, 0);
        assert!(verifier.classify(&state.current).is_falsified());
    }

    #[test]
    fn test_attempt_limit_bounds_the_session() {
        let contexts = contexts(vec![ParameterDescriptor::new(
            "n",
            IntGenerator::new(0_i32, 1_000_000),
        )]);
        let verifier = PropertyVerifier::new("at_least_ten", &at_least_ten);
        let control = ShrinkControl::default().with_max_shrinks(3);
        let shrinker = Shrinker::new(&contexts, &verifier, &control);

        let state = shrinker
            .shrink(
                tuple(vec![Value::new(999_999_i32)]),
                PropertyError::property_failed("big"),
            )
            .unwrap();
        assert_eq!(state.attempts, 3);
        assert_eq!(state.stop, ShrinkStop::AttemptLimit);
    }

    #[test]
    fn test_depth_limit_bounds_adoptions() {
        let contexts = contexts(vec![ParameterDescriptor::new(
            "xs",
            VecGenerator::new(IntGenerator::new(0_i32, 100), 0, 100),
        )]);
        let any_element_positive = |args: &Tuple| -> Result<(), PropertyError> {
            if args.arg::<Vec<i32>>(0)?.iter().any(|x| *x > 0) {
                return Err(PropertyError::property_failed("positive element"));
            }
            Ok(())
        };
        let verifier = PropertyVerifier::new("positive", &any_element_positive);
        let control = ShrinkControl::default().with_max_shrink_depth(2);
        let shrinker = Shrinker::new(&contexts, &verifier, &control);

        let state = shrinker
            .shrink(
                tuple(vec![Value::new(vec![0_i32, 0, 0, 50])]),
                PropertyError::property_failed("positive element"),
            )
            .unwrap();
        assert_eq!(state.depth, 2);
        assert_eq!(state.stop, ShrinkStop::DepthLimit);
    }

    #[test]
    fn test_panicking_candidate_sequence_is_a_defect() {
        struct Fragile;
        impl Generator<u32> for Fragile {
            fn generate(
                &self,
                _random: &mut dyn Randomness,
                _size: usize,
            ) -> Result<u32, GenerationError> {
                Ok(5)
            }

            fn shrink(&self, value: &u32) -> Box<dyn Iterator<Item = u32>> {
                let value = *value;
                Box::new(std::iter::once(()).map(move |_| {
                    if value > 5 {
                        panic!("candidate {} is unrepresentable", value);
                    }
                    value + 1
                }))
            }
        }

        let contexts = contexts(vec![ParameterDescriptor::new("f", Fragile)]);
        let always_fails =
            |_: &Tuple| -> Result<(), PropertyError> { Err(PropertyError::property_failed("no")) };
        let verifier = PropertyVerifier::new("always_fails", &always_fails);
        let control = ShrinkControl::default().with_max_shrink_depth(1_000);
        let shrinker = Shrinker::new(&contexts, &verifier, &control);

        // the first candidate is adopted, the restart then hits the panic
        match shrinker.shrink(tuple(vec![Value::new(5_u32)]), PropertyError::property_failed("no")) {
            Err(PropertyError::ShrinkDefect { parameter, cause }) => {
                assert_eq!(parameter, "f");
                assert_eq!(cause, "candidate 6 is unrepresentable");
            }
            other => panic!("expected ShrinkDefect, got {:?}", other),
        }
    }

    #[test]
    fn test_callback_receives_counterexample() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let control = ShrinkControl::default()
            .on_minimal_counterexample(move |counterexample| {
                if let Ok(mut seen) = sink.lock() {
                    seen.push(counterexample.seeds());
                }
            });

        let counterexample = Counterexample::unshrunk(
            "p",
            3,
            tuple(vec![Value::new(1_u8)]),
            PropertyError::property_failed("x"),
        );
        control.notify(&counterexample);

        assert_eq!(*seen.lock().unwrap(), vec![vec![1_000]]);
        assert_eq!(counterexample.stop, ShrinkStop::Disabled);
        assert!(counterexample.to_string().contains("falsified on trial 3"));
    }
}
