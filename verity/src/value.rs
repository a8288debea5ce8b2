//! Type-erased argument values.

use std::any::Any;
use std::fmt;

use serde::{Serialize, Serializer};

trait ArgValue: Any + fmt::Debug + Send + Sync {
    fn clone_box(&self) -> Box<dyn ArgValue>;
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
}

impl<T: Any + fmt::Debug + Clone + Send + Sync> ArgValue for T {
    fn clone_box(&self) -> Box<dyn ArgValue> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// One generated argument, owned and cloneable regardless of its type
///
/// Values are `Send + Sync` so tuples, counterexamples and errors carrying
/// them can cross threads and unwind as panic payloads.
pub struct Value(Box<dyn ArgValue>);

impl Value {
    pub fn new<T: Any + fmt::Debug + Clone + Send + Sync>(value: T) -> Self {
        Self(Box::new(value))
    }

    /// Borrow the value as a `T`, if that is what it holds
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.0.as_any().is::<T>()
    }

    /// Name of the type held
    pub fn type_name(&self) -> &'static str {
        self.0.type_name()
    }
}

impl Clone for Value {
    fn clone(&self) -> Self {
        Self(self.0.clone_box())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&format_args!("{:?}", self))
    }
}
