//! The generator contract and its type-erased form.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::GenerationError;
use crate::rng::Randomness;
use crate::value::Value;

/// Produces values of type `T` and proposes simpler versions of them
pub trait Generator<T> {
    /// Generate a value for a draw of complexity `size`
    ///
    /// Must be deterministic given the state of `random`, and must give up
    /// with a [`GenerationError`] rather than retry without bound.
    fn generate(&self, random: &mut dyn Randomness, size: usize) -> Result<T, GenerationError>;

    /// Simpler candidates for `value`, most aggressively reduced first
    ///
    /// The sequence is finite and never contains `value` itself.
    fn shrink(&self, value: &T) -> Box<dyn Iterator<Item = T>>;

    /// Every value this generator can produce, in a fixed order
    ///
    /// `None` for generators without a finite, enumerable domain.
    fn domain(&self) -> Option<Box<dyn Iterator<Item = T>>> {
        None
    }
}

impl<T, G: Generator<T> + ?Sized> Generator<T> for Arc<G> {
    fn generate(&self, random: &mut dyn Randomness, size: usize) -> Result<T, GenerationError> {
        (**self).generate(random, size)
    }

    fn shrink(&self, value: &T) -> Box<dyn Iterator<Item = T>> {
        (**self).shrink(value)
    }

    fn domain(&self) -> Option<Box<dyn Iterator<Item = T>>> {
        (**self).domain()
    }
}

/// A generator whose value type has been erased to [`Value`]
pub trait ErasedGenerator {
    /// Name of the type this generator produces
    fn type_name(&self) -> &'static str;

    fn generate_value(
        &self,
        random: &mut dyn Randomness,
        size: usize,
    ) -> Result<Value, GenerationError>;

    /// Shrink candidates for `value`, or `None` if it is not of this generator's type
    fn shrink_value(&self, value: &Value) -> Option<Box<dyn Iterator<Item = Value>>>;

    fn domain_values(&self) -> Option<Box<dyn Iterator<Item = Value>>>;
}

/// Erase the value type of `generator`
pub fn erase<T, G>(generator: G) -> Arc<dyn ErasedGenerator>
where
    T: Clone + fmt::Debug + Send + Sync + 'static,
    G: Generator<T> + 'static,
{
    Arc::new(TypedGenerator {
        inner: generator,
        _marker: PhantomData,
    })
}

struct TypedGenerator<T, G> {
    inner: G,
    _marker: PhantomData<fn() -> T>,
}

impl<T, G> ErasedGenerator for TypedGenerator<T, G>
where
    T: Clone + fmt::Debug + Send + Sync + 'static,
    G: Generator<T>,
{
    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn generate_value(
        &self,
        random: &mut dyn Randomness,
        size: usize,
    ) -> Result<Value, GenerationError> {
        self.inner.generate(random, size).map(Value::new)
    }

    fn shrink_value(&self, value: &Value) -> Option<Box<dyn Iterator<Item = Value>>> {
        let typed = value.downcast_ref::<T>()?;
        Some(Box::new(self.inner.shrink(typed).map(Value::new)))
    }

    fn domain_values(&self) -> Option<Box<dyn Iterator<Item = Value>>> {
        self.inner
            .domain()
            .map(|domain| Box::new(domain.map(Value::new)) as Box<dyn Iterator<Item = Value>>)
    }
}

/// A simple generator that always produces the same value
#[derive(Debug, Clone)]
pub struct ConstantGenerator<T> {
    value: T,
}

impl<T: Clone> ConstantGenerator<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T: Clone + 'static> Generator<T> for ConstantGenerator<T> {
    fn generate(&self, _random: &mut dyn Randomness, _size: usize) -> Result<T, GenerationError> {
        Ok(self.value.clone())
    }

    fn shrink(&self, _value: &T) -> Box<dyn Iterator<Item = T>> {
        Box::new(std::iter::empty())
    }

    fn domain(&self) -> Option<Box<dyn Iterator<Item = T>>> {
        Some(Box::new(std::iter::once(self.value.clone())))
    }
}

/// A generator that chooses from a fixed list of values
///
/// Earlier entries count as simpler: a value shrinks to the entries before it.
#[derive(Debug, Clone)]
pub struct OneOfGenerator<T> {
    values: Arc<Vec<T>>,
}

impl<T: Clone> OneOfGenerator<T> {
    pub fn new(values: Vec<T>) -> Self {
        if values.is_empty() {
            panic!("OneOfGenerator cannot be created with empty values");
        }
        Self {
            values: Arc::new(values),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Generator<T> for OneOfGenerator<T> {
    fn generate(&self, random: &mut dyn Randomness, _size: usize) -> Result<T, GenerationError> {
        let index = random.next_int(0, self.values.len() as i128 - 1) as usize;
        Ok(self.values[index].clone())
    }

    fn shrink(&self, value: &T) -> Box<dyn Iterator<Item = T>> {
        let position = self.values.iter().position(|candidate| candidate == value);
        match position {
            Some(position) => {
                let values = Arc::clone(&self.values);
                Box::new((0..position).map(move |index| values[index].clone()))
            }
            None => Box::new(std::iter::empty()),
        }
    }

    fn domain(&self) -> Option<Box<dyn Iterator<Item = T>>> {
        let values = Arc::clone(&self.values);
        Some(Box::new((0..values.len()).map(move |index| values[index].clone())))
    }
}
