//! Seeded randomness shared by the parameters of one property run.
//!
//! Every value a generator produces is drawn from a [`Randomness`] that was
//! reset with an explicit seed just before the draw, so storing that seed is
//! enough to replay the value later.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Source of random draws for generators
///
/// The typed helpers have default implementations on top of [`RngCore`];
/// test doubles override them to script exact draws.
pub trait Randomness: RngCore {
    /// Reset the stream so the following draws replay from `seed`
    fn set_seed(&mut self, seed: u64);

    /// The seed the stream was last reset with
    fn seed(&self) -> u64;

    /// Draw a fresh seed for the next parameter value
    fn next_seed(&mut self) -> u64 {
        self.next_u64()
    }

    /// Draw an integer uniformly from the inclusive range `min..=max`
    fn next_int(&mut self, min: i128, max: i128) -> i128 {
        self.r#gen_range(min..=max)
    }

    /// Draw a double uniformly from `[0, 1)`
    fn next_double(&mut self) -> f64 {
        self.r#gen::<f64>()
    }

    /// Draw a fair coin flip
    fn next_bool(&mut self) -> bool {
        self.r#gen::<bool>()
    }
}

/// Default [`Randomness`] backed by [`StdRng`]
#[derive(Debug, Clone)]
pub struct SourceOfRandomness {
    rng: StdRng,
    seed: u64,
}

impl SourceOfRandomness {
    /// Create a source seeded with `seed`
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Create a source with a seed drawn from the operating system
    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }
}

impl RngCore for SourceOfRandomness {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}

impl Randomness for SourceOfRandomness {
    fn set_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
        self.seed = seed;
    }

    fn seed(&self) -> u64 {
        self.seed
    }
}

/// Randomness whose integer draws follow a fixed script
///
/// Each call to [`Randomness::next_int`] pops the next scripted value
/// (clamped into the requested range); once the script runs out the last
/// value repeats. Reseeding does not rewind the script. All other draws
/// come from a seeded [`StdRng`].
#[derive(Debug, Clone)]
pub struct ScriptedRandomness {
    inner: SourceOfRandomness,
    script: VecDeque<i128>,
    last: Option<i128>,
    int_draws: usize,
    reseeds: usize,
}

impl ScriptedRandomness {
    /// Create a scripted source that answers integer draws with `draws`
    pub fn new(draws: impl IntoIterator<Item = i128>) -> Self {
        Self {
            inner: SourceOfRandomness::new(0),
            script: draws.into_iter().collect(),
            last: None,
            int_draws: 0,
            reseeds: 0,
        }
    }

    /// Number of integer draws made so far
    pub fn int_draws(&self) -> usize {
        self.int_draws
    }

    /// Number of times the stream was reseeded
    pub fn reseeds(&self) -> usize {
        self.reseeds
    }
}

impl RngCore for ScriptedRandomness {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.inner.try_fill_bytes(dest)
    }
}

impl Randomness for ScriptedRandomness {
    fn set_seed(&mut self, seed: u64) {
        self.reseeds += 1;
        self.inner.set_seed(seed);
    }

    fn seed(&self) -> u64 {
        self.inner.seed()
    }

    fn next_int(&mut self, min: i128, max: i128) -> i128 {
        self.int_draws += 1;
        let scripted = self.script.pop_front().or(self.last);
        match scripted {
            Some(value) => {
                self.last = Some(value);
                value.clamp(min, max)
            }
            None => self.inner.next_int(min, max),
        }
    }
}
