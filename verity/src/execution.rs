//! Property run execution: trials, shrinking hand-off and the run summary.

use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::PropertyConfig;
use crate::error::PropertyError;
use crate::parameter::{ParameterGenerationContext, Tuple};
use crate::property::{Property, PropertyDeclaration};
use crate::rng::{Randomness, SourceOfRandomness};
use crate::sampling::{SamplingMode, sampler_for};
use crate::shrink::{Counterexample, Shrinker};
use crate::verifier::{PropertyVerifier, RunTally, TrialOutcome};

/// Runs one declared property against its body
pub struct PropertyRunner<P> {
    declaration: PropertyDeclaration,
    property: P,
    config: PropertyConfig,
}

impl<P: Property> PropertyRunner<P> {
    pub fn new(declaration: PropertyDeclaration, property: P, config: PropertyConfig) -> Self {
        Self {
            declaration,
            property,
            config,
        }
    }

    pub fn declaration(&self) -> &PropertyDeclaration {
        &self.declaration
    }

    /// Trial budget after the host override, if any, is applied
    pub fn effective_trials(&self) -> usize {
        self.config
            .trials_override
            .unwrap_or_else(|| self.declaration.trials())
    }

    /// Run with randomness seeded from the configured seed, or from entropy
    pub fn run(&self) -> Result<RunSummary, PropertyError> {
        let mut random = match self.config.seed {
            Some(seed) => SourceOfRandomness::new(seed),
            None => SourceOfRandomness::from_entropy(),
        };
        self.run_with(&mut random)
    }

    /// Run drawing from `random`
    ///
    /// Fatal conditions (invalid configuration, exhausted generation, a
    /// parameter that cannot be enumerated, a defect in shrinking) end the
    /// run with an error; everything else ends up in the [`RunSummary`].
    pub fn run_with(&self, random: &mut dyn Randomness) -> Result<RunSummary, PropertyError> {
        self.declaration.validate()?;
        self.config.validate()?;

        let master_seed = random.seed();
        let trials = self.effective_trials();
        if let Some(trials) = self.config.trials_override {
            info!(
                property = %self.declaration,
                declared = self.declaration.trials(),
                "Trials overridden to {}",
                trials
            );
        }

        let contexts = self.contexts();
        let sampler = sampler_for(self.declaration.mode(), trials);
        let verifier = PropertyVerifier::new(self.declaration.name(), &self.property);
        let mut tally = RunTally::new();
        let mut trials_ran = 0;
        let mut counterexample = None;

        for tuple in sampler.sample(&contexts, random)? {
            let tuple = tuple?;
            trials_ran += 1;

            if let TrialOutcome::Falsified { error, tuple } = verifier.verify(&tuple, &mut tally) {
                counterexample =
                    Some(self.counterexample(&contexts, &verifier, trials_ran, tuple, error)?);
                break;
            }
        }

        let summary = RunSummary {
            property: self.declaration.name().to_string(),
            scope: self.declaration.scope().to_string(),
            mode: self.declaration.mode(),
            master_seed,
            trials_override: self.config.trials_override,
            trials_expected: trials,
            trials_ran,
            successes: tally.successes,
            assumption_violations: tally.assumption_violations,
            counterexample,
        };

        if let Some(audit) = summary.audit() {
            info!(
                property = %self.declaration,
                "Actual number of trials ran {} of expected {}",
                audit.trials_ran,
                audit.trials_expected
            );
            println!("{}", audit);
        }
        if summary.no_values_satisfied() {
            warn!(
                property = %self.declaration,
                violations = summary.assumption_violations.len(),
                "No values satisfied property assumptions"
            );
        }
        debug!(
            property = %self.declaration,
            successes = summary.successes,
            trials_ran = summary.trials_ran,
            "Run finished"
        );
        Ok(summary)
    }

    /// Regenerate the tuple identified by `seeds` and verify it once
    ///
    /// Seeds come from a [`Counterexample`] or a [`SeededValue`](crate::SeededValue);
    /// for exhaustive declarations they are domain indices.
    pub fn replay(&self, seeds: &[u64]) -> Result<TrialOutcome, PropertyError> {
        self.config.validate()?;

        let contexts = self.contexts();
        let sampler = sampler_for(self.declaration.mode(), self.effective_trials());
        let mut random = SourceOfRandomness::new(self.config.seed.unwrap_or_default());
        let tuple = sampler.reproduce(&contexts, &mut random, seeds)?;

        debug!(property = %self.declaration, ?seeds, "Replaying {}", tuple);
        let verifier = PropertyVerifier::new(self.declaration.name(), &self.property);
        Ok(verifier.classify(&tuple))
    }

    fn contexts(&self) -> Vec<ParameterGenerationContext> {
        self.declaration
            .parameters()
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, descriptor)| {
                ParameterGenerationContext::new(index, descriptor, &self.config.generator)
            })
            .collect()
    }

    fn counterexample(
        &self,
        contexts: &[ParameterGenerationContext],
        verifier: &PropertyVerifier<'_>,
        trial: usize,
        tuple: Tuple,
        error: PropertyError,
    ) -> Result<Counterexample, PropertyError> {
        let control = &self.config.shrink;
        let name = self.declaration.name();

        let counterexample = if control.should_shrink() {
            let state = Shrinker::new(contexts, verifier, control).shrink(tuple.clone(), error.clone())?;
            Counterexample::from_state(name, trial, tuple, error, state)
        } else {
            Counterexample::unshrunk(name, trial, tuple, error)
        };

        warn!(
            property = %self.declaration,
            seeds = ?counterexample.seeds(),
            shrink_depth = counterexample.shrink_depth,
            "Property falsified: {}",
            counterexample.error
        );
        control.notify(&counterexample);
        Ok(counterexample)
    }
}

/// Outcome of a complete run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub property: String,
    pub scope: String,
    pub mode: SamplingMode,
    /// Seed of the run's randomness; rerunning with it replays the run
    pub master_seed: u64,
    pub trials_override: Option<usize>,
    pub trials_expected: usize,
    pub trials_ran: usize,
    pub successes: usize,
    pub assumption_violations: Vec<String>,
    pub counterexample: Option<Counterexample>,
}

impl RunSummary {
    /// Trials ran, none falsified, yet every one of them violated an assumption
    pub fn no_values_satisfied(&self) -> bool {
        self.counterexample.is_none()
            && self.successes == 0
            && !self.assumption_violations.is_empty()
    }

    pub fn is_passing(&self) -> bool {
        self.counterexample.is_none() && !self.no_values_satisfied()
    }

    /// Trial accounting for runs whose budget was overridden
    pub fn audit(&self) -> Option<TrialAudit> {
        self.trials_override.map(|override_trials| TrialAudit {
            override_trials,
            trials_expected: self.trials_expected,
            trials_ran: self.trials_ran,
            method: self.property.clone(),
            class: self.scope.clone(),
        })
    }

    /// The summary as a pass, or the failure it represents
    pub fn into_result(self) -> Result<RunSummary, PropertyError> {
        if let Some(counterexample) = self.counterexample {
            return Err(PropertyError::CounterexampleFound(Box::new(counterexample)));
        }
        if self.no_values_satisfied() {
            return Err(PropertyError::NoSatisfyingValues {
                violations: self.assumption_violations,
            });
        }
        Ok(self)
    }
}

/// Machine-readable trial accounting, printed as a `JSONDATA::` line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialAudit {
    pub override_trials: usize,
    pub trials_expected: usize,
    pub trials_ran: usize,
    pub method: String,
    pub class: String,
}

impl fmt::Display for TrialAudit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        write!(f, "JSONDATA::{}", json)
    }
}

/// Run `property` with the default configuration
///
/// Passing runs yield their summary; falsified runs and runs in which no
/// tuple satisfied the property's assumptions yield an error.
pub fn check<P: Property>(
    declaration: PropertyDeclaration,
    property: P,
) -> Result<RunSummary, PropertyError> {
    check_with_config(declaration, property, PropertyConfig::default())
}

pub fn check_with_config<P: Property>(
    declaration: PropertyDeclaration,
    property: P,
    config: PropertyConfig,
) -> Result<RunSummary, PropertyError> {
    PropertyRunner::new(declaration, property, config)
        .run()?
        .into_result()
}
