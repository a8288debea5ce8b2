#![allow(clippy::result_large_err)]

//! # Verity - trial execution and shrink search for property-based tests
//!
//! Verity runs a declared property against many seeded argument tuples,
//! classifies every trial as a success, a skipped assumption violation or a
//! falsification, and shrinks the first falsifying tuple to a smaller one
//! that still fails before reporting it with the seeds that reproduce it.
//!
//! ## Quick Start
//!
//! ```rust
//! use verity::{
//!     IntGenerator, ParameterDescriptor, PropertyConfig, PropertyDeclaration, PropertyError,
//!     PropertyRunner, Tuple,
//! };
//!
//! let declaration = PropertyDeclaration::new("small_numbers", "docs")
//!     .parameter(ParameterDescriptor::new("n", IntGenerator::new(0_u32, 1_000)))
//!     .with_trials(200);
//!
//! let below_fifty = |args: &Tuple| -> Result<(), PropertyError> {
//!     let n = *args.arg::<u32>(0)?;
//!     if n >= 50 {
//!         return Err(PropertyError::property_failed(format!("{} >= 50", n)));
//!     }
//!     Ok(())
//! };
//!
//! let runner = PropertyRunner::new(declaration, below_fifty, PropertyConfig::new().with_seed(7));
//! let summary = runner.run().unwrap();
//!
//! let counterexample = summary.counterexample.expect("a value of at least 50 is drawn");
//! assert_eq!(counterexample.minimal.arg::<u32>(0).unwrap(), &50);
//! ```

pub mod config;
pub mod error;
pub mod execution;
pub mod generator;
pub mod parameter;
pub mod primitives;
pub mod property;
pub mod rng;
pub mod sampling;
pub mod shrink;
pub mod size;
pub mod value;
pub mod verifier;

// Re-export the main public API
pub use config::{ConfigError, GeneratorConfig, PropertyConfig, TrialOverride};
pub use error::{GenerationError, PropertyError};
pub use execution::{PropertyRunner, RunSummary, TrialAudit, check, check_with_config};
pub use generator::{ConstantGenerator, ErasedGenerator, Generator, OneOfGenerator, erase};
pub use parameter::{ParameterDescriptor, ParameterGenerationContext, SeededValue, Tuple};
pub use primitives::*;
pub use property::{Property, PropertyDeclaration, assume};
pub use rng::{Randomness, ScriptedRandomness, SourceOfRandomness};
pub use sampling::{
    ExhaustiveParameterSampler, ParameterSampler, SamplingMode, TupleParameterSampler,
    TupleStream, sampler_for,
};
pub use shrink::{Counterexample, ShrinkControl, ShrinkState, ShrinkStop, Shrinker};
pub use size::{GeometricDistribution, SizeDistribution};
pub use value::Value;
pub use verifier::{PropertyVerifier, RunTally, TrialOutcome};
