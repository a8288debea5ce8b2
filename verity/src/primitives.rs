//! Generators for integers, booleans, vectors and optional values.

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use num_traits::PrimInt;

use crate::error::GenerationError;
use crate::generator::Generator;
use crate::rng::Randomness;

/// Generator for boolean values
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolGenerator;

impl Generator<bool> for BoolGenerator {
    fn generate(&self, random: &mut dyn Randomness, _size: usize) -> Result<bool, GenerationError> {
        Ok(random.next_bool())
    }

    fn shrink(&self, value: &bool) -> Box<dyn Iterator<Item = bool>> {
        if *value {
            Box::new(std::iter::once(false))
        } else {
            Box::new(std::iter::empty())
        }
    }

    fn domain(&self) -> Option<Box<dyn Iterator<Item = bool>>> {
        Some(Box::new([false, true].into_iter()))
    }
}

/// Generator for integers in an inclusive range
///
/// Values shrink toward zero, or toward the range bound closest to zero
/// when zero is out of range.
#[derive(Debug, Clone, Copy)]
pub struct IntGenerator<T> {
    min: T,
    max: T,
}

impl<T> IntGenerator<T>
where
    T: PrimInt + fmt::Debug,
{
    /// Create a generator over `min..=max`
    pub fn new(min: T, max: T) -> Self {
        if min > max {
            panic!("IntGenerator range is empty: {:?} > {:?}", min, max);
        }
        Self { min, max }
    }

    /// Create a generator for the full range of the type
    pub fn full_range() -> Self {
        Self::new(T::min_value(), T::max_value())
    }

    /// The value shrinking converges to
    pub fn target(&self) -> T {
        if self.min <= T::zero() && T::zero() <= self.max {
            T::zero()
        } else if self.min > T::zero() {
            self.min
        } else {
            self.max
        }
    }
}

impl<T> Generator<T> for IntGenerator<T>
where
    T: PrimInt + fmt::Debug + Into<i128> + TryFrom<i128> + 'static,
{
    fn generate(&self, random: &mut dyn Randomness, _size: usize) -> Result<T, GenerationError> {
        let drawn = random.next_int(self.min.into(), self.max.into());
        T::try_from(drawn).map_err(|_| {
            GenerationError::new(
                format!(
                    "drawn {} does not fit {}",
                    drawn,
                    std::any::type_name::<T>()
                ),
                1,
            )
        })
    }

    fn shrink(&self, value: &T) -> Box<dyn Iterator<Item = T>> {
        let value: i128 = (*value).into();
        let target: i128 = self.target().into();
        if value == target {
            return Box::new(std::iter::empty());
        }

        // target first, then halfway points creeping back toward value
        let halves = std::iter::successors(Some((value - target) / 2), |distance| {
            Some(distance / 2).filter(|next| *next != 0)
        })
        .filter(|distance| *distance != 0)
        .map(move |distance| value - distance);

        Box::new(
            std::iter::once(target)
                .chain(halves)
                .filter_map(|candidate| T::try_from(candidate).ok()),
        )
    }

    fn domain(&self) -> Option<Box<dyn Iterator<Item = T>>> {
        let (min, max): (i128, i128) = (self.min.into(), self.max.into());
        Some(Box::new(
            (min..=max).filter_map(|value| T::try_from(value).ok()),
        ))
    }
}

/// Generator for `Vec<T>` whose length is bounded by the draw's size
#[derive(Debug)]
pub struct VecGenerator<T, G> {
    element_generator: Arc<G>,
    min_length: usize,
    max_length: usize,
    _phantom: std::marker::PhantomData<fn() -> T>,
}

impl<T, G> Clone for VecGenerator<T, G> {
    fn clone(&self) -> Self {
        Self {
            element_generator: Arc::clone(&self.element_generator),
            min_length: self.min_length,
            max_length: self.max_length,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T, G> VecGenerator<T, G>
where
    G: Generator<T>,
{
    pub fn new(element_generator: G, min_length: usize, max_length: usize) -> Self {
        if min_length > max_length {
            panic!(
                "VecGenerator length range is empty: {} > {}",
                min_length, max_length
            );
        }
        Self {
            element_generator: Arc::new(element_generator),
            min_length,
            max_length,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T, G> Generator<Vec<T>> for VecGenerator<T, G>
where
    G: Generator<T> + 'static,
    T: Clone + 'static,
{
    fn generate(
        &self,
        random: &mut dyn Randomness,
        size: usize,
    ) -> Result<Vec<T>, GenerationError> {
        let max_len = self.max_length.min(size.max(self.min_length));
        let length = random.next_int(self.min_length as i128, max_len as i128) as usize;

        (0..length)
            .map(|_| self.element_generator.generate(random, size))
            .collect()
    }

    fn shrink(&self, value: &Vec<T>) -> Box<dyn Iterator<Item = Vec<T>>> {
        let value = Rc::new(value.clone());
        let len = value.len();
        let min = self.min_length;

        // Shortest prefixes first
        let prefixes = {
            let value = Rc::clone(&value);
            (min.min(len)..len).map(move |keep| value[..keep].to_vec())
        };

        // Drop one element at a time; dropping the last is already a prefix
        let removals = {
            let value = Rc::clone(&value);
            let upto = if len > min { len.saturating_sub(1) } else { 0 };
            (0..upto).map(move |skip| {
                value
                    .iter()
                    .enumerate()
                    .filter(|(index, _)| *index != skip)
                    .map(|(_, element)| element.clone())
                    .collect::<Vec<T>>()
            })
        };

        let elements = {
            let element_generator = Arc::clone(&self.element_generator);
            (0..len).flat_map(move |index| {
                let value = Rc::clone(&value);
                element_generator
                    .shrink(&value[index])
                    .map(move |smaller| {
                        let mut candidate = Vec::clone(&value);
                        candidate[index] = smaller;
                        candidate
                    })
            })
        };

        Box::new(prefixes.chain(removals).chain(elements))
    }
}

/// Generator for `Option<T>`: a nullable parameter
#[derive(Debug, Clone)]
pub struct OptionGenerator<T, G> {
    inner: Arc<G>,
    none_probability: f64,
    _phantom: std::marker::PhantomData<fn() -> T>,
}

impl<T, G> OptionGenerator<T, G>
where
    G: Generator<T>,
{
    /// `None` one time in five
    pub fn new(inner: G) -> Self {
        Self::with_none_probability(inner, 0.2)
    }

    pub fn with_none_probability(inner: G, none_probability: f64) -> Self {
        Self {
            inner: Arc::new(inner),
            none_probability: none_probability.clamp(0.0, 1.0),
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T, G> Generator<Option<T>> for OptionGenerator<T, G>
where
    G: Generator<T> + 'static,
    T: Clone + 'static,
{
    fn generate(
        &self,
        random: &mut dyn Randomness,
        size: usize,
    ) -> Result<Option<T>, GenerationError> {
        if random.next_double() < self.none_probability {
            Ok(None)
        } else {
            self.inner.generate(random, size).map(Some)
        }
    }

    fn shrink(&self, value: &Option<T>) -> Box<dyn Iterator<Item = Option<T>>> {
        match value {
            Some(inner) => Box::new(
                std::iter::once(None).chain(self.inner.shrink(inner).map(Some)),
            ),
            None => Box::new(std::iter::empty()),
        }
    }

    fn domain(&self) -> Option<Box<dyn Iterator<Item = Option<T>>>> {
        let inner = self.inner.domain()?;
        Some(Box::new(std::iter::once(None).chain(inner.map(Some))))
    }
}
