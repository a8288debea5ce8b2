//! Trial sampling: how argument tuples are drawn for a run.

use std::fmt;

use serde::Serialize;

use crate::error::PropertyError;
use crate::parameter::{ParameterGenerationContext, SeededValue, Tuple};
use crate::rng::{Randomness, SourceOfRandomness};
use crate::value::Value;

/// Lazy, finite sequence of tuples; an `Err` item ends the sequence
pub type TupleStream<'a> = Box<dyn Iterator<Item = Result<Tuple, PropertyError>> + 'a>;

/// How argument tuples are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMode {
    /// Independent random draws, one fresh seed per parameter per trial
    #[default]
    Sampling,
    /// Cartesian product of each parameter's finite domain
    Exhaustive,
}

impl fmt::Display for SamplingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplingMode::Sampling => write!(f, "sampling"),
            SamplingMode::Exhaustive => write!(f, "exhaustive"),
        }
    }
}

/// Produces the tuples a run verifies
pub trait ParameterSampler {
    /// Number of tuples the sampler emits at most
    fn trials(&self) -> usize;

    /// Build the tuple sequence for `contexts`
    ///
    /// Failures detectable up front (such as a parameter that cannot be
    /// enumerated) are returned here, before any tuple is produced.
    fn sample<'a>(
        &'a self,
        contexts: &'a [ParameterGenerationContext],
        random: &'a mut dyn Randomness,
    ) -> Result<TupleStream<'a>, PropertyError>;

    /// Rebuild the tuple identified by `seeds`, one per parameter
    fn reproduce(
        &self,
        contexts: &[ParameterGenerationContext],
        random: &mut dyn Randomness,
        seeds: &[u64],
    ) -> Result<Tuple, PropertyError>;
}

/// Pick the sampler for `mode` with a budget of `trials` tuples
pub fn sampler_for(mode: SamplingMode, trials: usize) -> Box<dyn ParameterSampler> {
    match mode {
        SamplingMode::Sampling => Box::new(TupleParameterSampler::new(trials)),
        SamplingMode::Exhaustive => Box::new(ExhaustiveParameterSampler::new(trials)),
    }
}

fn check_arity(contexts: &[ParameterGenerationContext], seeds: &[u64]) -> Result<(), PropertyError> {
    if contexts.len() != seeds.len() {
        return Err(PropertyError::ArgumentMismatch {
            index: seeds.len().min(contexts.len()),
            expected: "one seed per declared parameter",
            found: format!("{} seed(s) for {} parameter(s)", seeds.len(), contexts.len()),
        });
    }
    Ok(())
}

/// Random sampling: exactly `trials` tuples unless generation fails
#[derive(Debug, Clone)]
pub struct TupleParameterSampler {
    trials: usize,
}

impl TupleParameterSampler {
    pub fn new(trials: usize) -> Self {
        Self { trials }
    }
}

impl ParameterSampler for TupleParameterSampler {
    fn trials(&self) -> usize {
        self.trials
    }

    fn sample<'a>(
        &'a self,
        contexts: &'a [ParameterGenerationContext],
        random: &'a mut dyn Randomness,
    ) -> Result<TupleStream<'a>, PropertyError> {
        let seeds = SourceOfRandomness::new(random.next_seed());
        Ok(Box::new(RandomTuples {
            contexts,
            seeds,
            random,
            remaining: self.trials,
            failed: false,
        }))
    }

    fn reproduce(
        &self,
        contexts: &[ParameterGenerationContext],
        random: &mut dyn Randomness,
        seeds: &[u64],
    ) -> Result<Tuple, PropertyError> {
        check_arity(contexts, seeds)?;
        contexts
            .iter()
            .zip(seeds)
            .map(|(context, seed)| context.regenerate(random, *seed))
            .collect::<Result<Vec<_>, _>>()
            .map(Tuple::new)
    }
}

struct RandomTuples<'a> {
    contexts: &'a [ParameterGenerationContext],
    /// Parameter seeds; never reseeded, unlike `random`
    seeds: SourceOfRandomness,
    random: &'a mut dyn Randomness,
    remaining: usize,
    failed: bool,
}

impl Iterator for RandomTuples<'_> {
    type Item = Result<Tuple, PropertyError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let (seeds, random) = (&mut self.seeds, &mut *self.random);
        let drawn = self
            .contexts
            .iter()
            .map(|context| context.generate(seeds, random))
            .collect::<Result<Vec<_>, _>>();

        match drawn {
            Ok(values) => Some(Ok(Tuple::new(values))),
            Err(error) => {
                self.failed = true;
                Some(Err(error))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            (0, Some(0))
        } else {
            (0, Some(self.remaining))
        }
    }
}

/// Exhaustive sampling over finite domains
///
/// Tuples come in lexicographic order over parameter order with the last
/// parameter varying fastest, truncated at `trials`. Each value's seed is
/// its index in its parameter's domain.
#[derive(Debug, Clone)]
pub struct ExhaustiveParameterSampler {
    trials: usize,
}

impl ExhaustiveParameterSampler {
    pub fn new(trials: usize) -> Self {
        Self { trials }
    }
}

impl ParameterSampler for ExhaustiveParameterSampler {
    fn trials(&self) -> usize {
        self.trials
    }

    fn sample<'a>(
        &'a self,
        contexts: &'a [ParameterGenerationContext],
        _random: &'a mut dyn Randomness,
    ) -> Result<TupleStream<'a>, PropertyError> {
        // a domain longer than the budget can never be reached past `trials`
        let domains = contexts
            .iter()
            .map(|context| context.enumerate(self.trials))
            .collect::<Result<Vec<_>, _>>()?;

        let exhausted = self.trials == 0 || domains.iter().any(Vec::is_empty);
        Ok(Box::new(ExhaustiveTuples {
            contexts,
            indices: vec![0; domains.len()],
            domains,
            remaining: self.trials,
            exhausted,
        }))
    }

    fn reproduce(
        &self,
        contexts: &[ParameterGenerationContext],
        _random: &mut dyn Randomness,
        seeds: &[u64],
    ) -> Result<Tuple, PropertyError> {
        check_arity(contexts, seeds)?;
        let mut values = Vec::with_capacity(contexts.len());
        for (context, seed) in contexts.iter().zip(seeds) {
            let index = usize::try_from(*seed).unwrap_or(usize::MAX);
            let value = context
                .enumerate(index.saturating_add(1))?
                .into_iter()
                .nth(index)
                .ok_or_else(|| PropertyError::GenerationExhausted {
                    parameter: context.name().to_string(),
                    seed: *seed,
                    size: 0,
                    attempts: 0,
                    reason: "seed lies outside the parameter's domain".to_string(),
                })?;
            values.push(seeded(context, value, *seed));
        }
        Ok(Tuple::new(values))
    }
}

fn seeded(context: &ParameterGenerationContext, value: Value, seed: u64) -> SeededValue {
    SeededValue {
        parameter: context.index(),
        name: context.name().to_string(),
        value,
        seed,
        size: 0,
    }
}

struct ExhaustiveTuples<'a> {
    contexts: &'a [ParameterGenerationContext],
    domains: Vec<Vec<Value>>,
    indices: Vec<usize>,
    remaining: usize,
    exhausted: bool,
}

impl ExhaustiveTuples<'_> {
    /// Step the odometer; returns false once every combination was visited
    fn advance(&mut self) -> bool {
        for position in (0..self.indices.len()).rev() {
            self.indices[position] += 1;
            if self.indices[position] < self.domains[position].len() {
                return true;
            }
            self.indices[position] = 0;
        }
        false
    }
}

impl Iterator for ExhaustiveTuples<'_> {
    type Item = Result<Tuple, PropertyError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted || self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let values = self
            .contexts
            .iter()
            .zip(&self.domains)
            .zip(&self.indices)
            .map(|((context, domain), &index)| seeded(context, domain[index].clone(), index as u64))
            .collect();

        if !self.advance() {
            self.exhausted = true;
        }
        Some(Ok(Tuple::new(values)))
    }
}
