//! Per-trial verification and outcome classification.

use std::panic::{AssertUnwindSafe, catch_unwind};

use serde::Serialize;
use tracing::debug;

use crate::error::{PropertyError, panic_message};
use crate::parameter::Tuple;
use crate::property::Property;

/// What a single trial came to; exactly one per verified tuple
#[derive(Debug, Clone)]
pub enum TrialOutcome {
    Success,
    /// The body rejected its inputs; neither a pass nor a failure
    AssumptionViolated(String),
    /// The body failed for `tuple`
    Falsified { error: PropertyError, tuple: Tuple },
}

impl TrialOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TrialOutcome::Success)
    }

    pub fn is_falsified(&self) -> bool {
        matches!(self, TrialOutcome::Falsified { .. })
    }
}

/// Run-owned counters updated as trials are verified
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunTally {
    pub successes: usize,
    pub assumption_violations: Vec<String>,
}

impl RunTally {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Invokes a property body and classifies what happened
pub struct PropertyVerifier<'a> {
    name: &'a str,
    property: &'a dyn Property,
}

impl<'a> PropertyVerifier<'a> {
    pub fn new(name: &'a str, property: &'a dyn Property) -> Self {
        Self { name, property }
    }

    /// Check `tuple` without touching any run state
    ///
    /// A panic in the body counts as a falsification carrying the panic
    /// message, unless the payload is itself a [`PropertyError`].
    pub fn classify(&self, tuple: &Tuple) -> TrialOutcome {
        let result = catch_unwind(AssertUnwindSafe(|| self.property.check(tuple)))
            .unwrap_or_else(|payload| match payload.downcast::<PropertyError>() {
                Ok(error) => Err(*error),
                Err(payload) => Err(PropertyError::property_failed_with_context(
                    panic_message(payload.as_ref()),
                    Some("property body panicked"),
                )),
            });

        match result {
            Ok(()) => TrialOutcome::Success,
            Err(PropertyError::AssumptionViolated { reason }) => {
                TrialOutcome::AssumptionViolated(reason)
            }
            Err(error) => TrialOutcome::Falsified {
                error,
                tuple: tuple.clone(),
            },
        }
    }

    /// Verify one trial and record it in `tally`
    pub fn verify(&self, tuple: &Tuple, tally: &mut RunTally) -> TrialOutcome {
        debug!(
            property = self.name,
            seeds = ?tuple.seeds(),
            "Verifying property with values {}",
            tuple
        );

        let outcome = self.classify(tuple);
        match &outcome {
            TrialOutcome::Success => tally.successes += 1,
            TrialOutcome::AssumptionViolated(reason) => {
                debug!(property = self.name, %reason, "Assumption violated");
                tally.assumption_violations.push(reason.clone());
            }
            TrialOutcome::Falsified { error, .. } => {
                debug!(property = self.name, %error, "Property falsified");
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::SeededValue;
    use crate::property::assume;
    use crate::value::Value;

    fn tuple_of(n: i32) -> Tuple {
        Tuple::new(vec![SeededValue {
            parameter: 0,
            name: "n".to_string(),
            value: Value::new(n),
            seed: n as u64,
            size: 0,
        }])
    }

    fn non_negative(args: &Tuple) -> Result<(), PropertyError> {
        let n = *args.arg::<i32>(0)?;
        assume(n != 7, "seven is skipped")?;
        if n < 0 {
            return Err(PropertyError::property_failed(format!("{} is negative", n)));
        }
        Ok(())
    }

    #[test]
    fn test_outcomes_are_exclusive_and_tallied() {
        let verifier = PropertyVerifier::new("non_negative", &non_negative);
        let mut tally = RunTally::new();

        assert!(verifier.verify(&tuple_of(3), &mut tally).is_success());
        assert!(matches!(
            verifier.verify(&tuple_of(7), &mut tally),
            TrialOutcome::AssumptionViolated(_)
        ));
        let falsified = verifier.verify(&tuple_of(-1), &mut tally);
        match falsified {
            TrialOutcome::Falsified { error, tuple } => {
                assert_eq!(error.to_string(), "Property failed: -1 is negative");
                assert_eq!(tuple.arg::<i32>(0).unwrap(), &-1);
            }
            other => panic!("expected Falsified, got {:?}", other),
        }

        assert_eq!(tally.successes, 1);
        assert_eq!(tally.assumption_violations, vec!["seven is skipped"]);
    }

    #[test]
    fn test_classify_leaves_no_trace() {
        let verifier = PropertyVerifier::new("non_negative", &non_negative);
        assert!(verifier.classify(&tuple_of(-5)).is_falsified());
        assert!(verifier.classify(&tuple_of(5)).is_success());
    }

    #[test]
    fn test_panicking_body_is_falsified() {
        let panicking = |args: &Tuple| -> Result<(), PropertyError> {
            let n = *args.arg::<i32>(0)?;
            assert!(n < 10, "n too large: {}", n);
            Ok(())
        };
        let verifier = PropertyVerifier::new("panicking", &panicking);

        match verifier.classify(&tuple_of(12)) {
            TrialOutcome::Falsified { error, .. } => {
                assert!(error.to_string().contains("n too large: 12"));
            }
            other => panic!("expected Falsified, got {:?}", other),
        }
    }

    #[test]
    fn test_property_error_panic_payload_passes_through() {
        let skipping = |args: &Tuple| -> Result<(), PropertyError> {
            if *args.arg::<i32>(0)? == 0 {
                std::panic::panic_any(PropertyError::assumption_violated("zero is skipped"));
            }
            std::panic::panic_any(PropertyError::property_failed("raised by panic"))
        };
        let verifier = PropertyVerifier::new("skipping", &skipping);

        assert!(matches!(
            verifier.classify(&tuple_of(0)),
            TrialOutcome::AssumptionViolated(reason) if reason == "zero is skipped"
        ));
        match verifier.classify(&tuple_of(4)) {
            TrialOutcome::Falsified { error, .. } => {
                assert_eq!(error.to_string(), "Property failed: raised by panic");
            }
            other => panic!("expected Falsified, got {:?}", other),
        }
    }

    #[test]
    fn test_type_mismatch_in_body_is_falsified() {
        let wrong_type = |args: &Tuple| -> Result<(), PropertyError> {
            args.arg::<String>(0)?;
            Ok(())
        };
        let verifier = PropertyVerifier::new("wrong_type", &wrong_type);
        match verifier.classify(&tuple_of(1)) {
            TrialOutcome::Falsified { error, .. } => {
                assert!(matches!(error, PropertyError::ArgumentMismatch { index: 0, .. }))
            }
            other => panic!("expected Falsified, got {:?}", other),
        }
    }
}
