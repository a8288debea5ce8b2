//! Declared parameters, the values drawn for them, and argument tuples.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use serde::Serialize;

use crate::config::GeneratorConfig;
use crate::error::{PropertyError, panic_message};
use crate::generator::{ErasedGenerator, Generator, erase};
use crate::rng::Randomness;
use crate::size::SizeDistribution;
use crate::value::Value;

type Constraint = Arc<dyn Fn(&Value) -> Result<bool, PropertyError>>;

/// A parameter as resolved by the host: name, type and how to generate it
#[derive(Clone)]
pub struct ParameterDescriptor {
    name: String,
    generator: Arc<dyn ErasedGenerator>,
    constraint: Option<Constraint>,
    fixed_seed: Option<u64>,
}

impl ParameterDescriptor {
    pub fn new<T, G>(name: impl Into<String>, generator: G) -> Self
    where
        T: Clone + fmt::Debug + Send + Sync + 'static,
        G: Generator<T> + 'static,
    {
        Self {
            name: name.into(),
            generator: erase(generator),
            constraint: None,
            fixed_seed: None,
        }
    }

    /// Only accept generated values for which `predicate` holds
    ///
    /// Rejected draws are retried up to the configured discard budget.
    pub fn satisfying<T, F>(mut self, predicate: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> bool + 'static,
    {
        let constraint: Constraint = Arc::new(move |value: &Value| {
            value
                .downcast_ref::<T>()
                .map(&predicate)
                .ok_or_else(|| PropertyError::ArgumentMismatch {
                    index: 0,
                    expected: std::any::type_name::<T>(),
                    found: value.type_name().to_string(),
                })
        });
        self.constraint = Some(constraint);
        self
    }

    /// Always draw this parameter from `seed`
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.fixed_seed = Some(seed);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.generator.type_name()
    }

    pub fn fixed_seed(&self) -> Option<u64> {
        self.fixed_seed
    }

    fn accepts(&self, value: &Value) -> Result<bool, PropertyError> {
        match &self.constraint {
            Some(constraint) => constraint(value),
            None => Ok(true),
        }
    }
}

impl fmt::Debug for ParameterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterDescriptor")
            .field("name", &self.name)
            .field("type", &self.type_name())
            .field("constrained", &self.constraint.is_some())
            .field("fixed_seed", &self.fixed_seed)
            .finish()
    }
}

/// One generated argument and the seed that reproduces it
#[derive(Debug, Clone, Serialize)]
pub struct SeededValue {
    /// Position of the parameter in the declaration
    pub parameter: usize,
    pub name: String,
    pub value: Value,
    /// Reproduction key; for exhaustively enumerated values, the domain index
    pub seed: u64,
    /// Size hint the value was generated with
    pub size: usize,
}

impl fmt::Display for SeededValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {:?} (seed {})", self.name, self.value, self.seed)
    }
}

/// One trial's arguments, positionally aligned with the declared parameters
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Tuple {
    values: Vec<SeededValue>,
}

impl Tuple {
    pub fn new(values: Vec<SeededValue>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SeededValue> {
        self.values.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SeededValue> {
        self.values.iter()
    }

    /// Borrow argument `index` as a `T`
    pub fn arg<T: Any>(&self, index: usize) -> Result<&T, PropertyError> {
        let seeded = self
            .values
            .get(index)
            .ok_or_else(|| PropertyError::ArgumentMismatch {
                index,
                expected: std::any::type_name::<T>(),
                found: format!("only {} argument(s)", self.values.len()),
            })?;
        seeded
            .value
            .downcast_ref::<T>()
            .ok_or_else(|| PropertyError::ArgumentMismatch {
                index,
                expected: std::any::type_name::<T>(),
                found: seeded.value.type_name().to_string(),
            })
    }

    pub fn seeds(&self) -> Vec<u64> {
        self.values.iter().map(|seeded| seeded.seed).collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.values.iter().map(|seeded| seeded.value.clone()).collect()
    }

    /// A copy with argument `index` replaced, keeping its seed
    pub fn with_value(&self, index: usize, value: Value) -> Tuple {
        let mut values = self.values.clone();
        if let Some(seeded) = values.get_mut(index) {
            seeded.value = value;
        }
        Tuple { values }
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (position, seeded) in self.values.iter().enumerate() {
            if position > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", seeded)?;
        }
        write!(f, "]")
    }
}

/// Binds a declared parameter to its generator and the size distribution
///
/// Randomness is borrowed per call rather than stored. Seeds are drawn from
/// a run-level stream that is never reseeded, and each value is then
/// generated from its own seed, so pinning one parameter leaves the seeds
/// of the others independent.
#[derive(Debug, Clone)]
pub struct ParameterGenerationContext {
    index: usize,
    descriptor: ParameterDescriptor,
    sizes: SizeDistribution,
    max_discards: usize,
}

impl ParameterGenerationContext {
    pub fn new(index: usize, descriptor: ParameterDescriptor, config: &GeneratorConfig) -> Self {
        Self {
            index,
            descriptor,
            sizes: SizeDistribution::from_config(config),
            max_discards: config.max_discards,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn descriptor(&self) -> &ParameterDescriptor {
        &self.descriptor
    }

    /// The pinned seed, or a fresh one drawn from `seeds`
    pub fn next_seed(&self, seeds: &mut dyn Randomness) -> u64 {
        match self.descriptor.fixed_seed {
            Some(seed) => seed,
            None => seeds.next_seed(),
        }
    }

    /// Draw a seed from `seeds` and generate from it into `random`
    ///
    /// `random` is reseeded for the draw; `seeds` only ever advances.
    pub fn generate(
        &self,
        seeds: &mut dyn Randomness,
        random: &mut dyn Randomness,
    ) -> Result<SeededValue, PropertyError> {
        let seed = self.next_seed(seeds);
        self.regenerate(random, seed)
    }

    /// Reproduce the value drawn from `seed`
    ///
    /// Rejected draws are retried from the same stream up to the discard
    /// budget, then generation fails with [`PropertyError::GenerationExhausted`].
    pub fn regenerate(
        &self,
        random: &mut dyn Randomness,
        seed: u64,
    ) -> Result<SeededValue, PropertyError> {
        random.set_seed(seed);

        let mut discards = 0;
        loop {
            let size = self.sizes.next_size(random);
            let value = self
                .descriptor
                .generator
                .generate_value(random, size)
                .map_err(|error| PropertyError::GenerationExhausted {
                    parameter: self.name().to_string(),
                    seed,
                    size,
                    attempts: discards + error.attempts,
                    reason: error.reason,
                })?;

            if self.accepts(&value)? {
                return Ok(SeededValue {
                    parameter: self.index,
                    name: self.name().to_string(),
                    value,
                    seed,
                    size,
                });
            }

            discards += 1;
            if discards >= self.max_discards {
                return Err(PropertyError::GenerationExhausted {
                    parameter: self.name().to_string(),
                    seed,
                    size,
                    attempts: discards,
                    reason: "no generated value satisfied the parameter's constraint".to_string(),
                });
            }
        }
    }

    /// Shrink candidates for `value` that still satisfy the parameter's constraint
    ///
    /// A panic while building the candidate sequence is reported as a
    /// [`PropertyError::ShrinkDefect`]. A constraint written for another
    /// type fails here with [`PropertyError::ArgumentMismatch`], as it does
    /// during generation.
    pub fn shrink(
        &self,
        value: &Value,
    ) -> Result<Box<dyn Iterator<Item = Value>>, PropertyError> {
        let generator = Arc::clone(&self.descriptor.generator);
        let candidates = catch_unwind(AssertUnwindSafe(|| generator.shrink_value(value)))
            .map_err(|payload| self.defect(payload))?
            .ok_or_else(|| PropertyError::ArgumentMismatch {
                index: self.index,
                expected: self.descriptor.type_name(),
                found: value.type_name().to_string(),
            })?;

        match self.descriptor.constraint.clone() {
            Some(constraint) => {
                // candidates share the type of `value`, so only it can mismatch
                self.accepts(value)?;
                let filtered: Box<dyn Iterator<Item = Value>> = Box::new(
                    candidates.filter(move |candidate| matches!(constraint(candidate), Ok(true))),
                );
                Ok(filtered)
            }
            None => Ok(candidates),
        }
    }

    /// First `limit` values of the generator's finite domain, in its order
    ///
    /// Values the constraint rejects are skipped. A run of `max_discards`
    /// rejections in a row fails with [`PropertyError::GenerationExhausted`],
    /// its seed being the domain index of the last rejected value.
    pub fn enumerate(&self, limit: usize) -> Result<Vec<Value>, PropertyError> {
        let domain =
            self.descriptor
                .generator
                .domain_values()
                .ok_or_else(|| PropertyError::NotExhaustible {
                    parameter: self.name().to_string(),
                    type_name: self.descriptor.type_name(),
                })?;

        let mut values = Vec::new();
        let mut discards = 0;
        for (index, value) in domain.enumerate() {
            if values.len() >= limit {
                break;
            }
            if self.accepts(&value)? {
                values.push(value);
                discards = 0;
                continue;
            }

            discards += 1;
            if discards >= self.max_discards {
                return Err(PropertyError::GenerationExhausted {
                    parameter: self.name().to_string(),
                    seed: index as u64,
                    size: 0,
                    attempts: discards,
                    reason: "no enumerated value satisfied the parameter's constraint".to_string(),
                });
            }
        }
        Ok(values)
    }

    /// Convert a panic raised by shrink machinery into an error
    ///
    /// Payloads that already are a [`PropertyError`] pass through unchanged.
    pub(crate) fn defect(&self, payload: Box<dyn Any + Send>) -> PropertyError {
        match payload.downcast::<PropertyError>() {
            Ok(error) => *error,
            Err(payload) => PropertyError::shrink_defect(self.name(), panic_message(payload.as_ref())),
        }
    }

    fn accepts(&self, value: &Value) -> Result<bool, PropertyError> {
        self.descriptor
            .accepts(value)
            .map_err(|error| match error {
                PropertyError::ArgumentMismatch {
                    expected, found, ..
                } => PropertyError::ArgumentMismatch {
                    index: self.index,
                    expected,
                    found,
                },
                other => other,
            })
    }
}
