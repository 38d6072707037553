use alloc::string::ToString;
use alloc::sync::Arc;
use core::any::{Any, TypeId};
use core::fmt;
use std::collections::HashMap;

use formbind_core::{Def, ParseError, Shape};

type ConvertFn = dyn Fn(&str, &mut dyn Any) -> Result<(), ParseError> + Send + Sync;

/// Turns raw strings into leaf values.
///
/// Custom converters registered for a type take precedence over the
/// built-in parsing of [scalar](Def::Scalar) shapes, and are the only way to
/// fill [opaque](Def::Opaque) ones.
#[derive(Clone, Default)]
pub struct Converters {
    custom: HashMap<TypeId, Arc<ConvertFn>>,
}

impl Converters {
    /// A registry with only the built-in scalar conversions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `convert` for values of type `T`, replacing any earlier
    /// converter for the same type.
    pub fn register<T, E, F>(&mut self, convert: F)
    where
        T: 'static,
        E: fmt::Display,
        F: Fn(&str) -> Result<T, E> + Send + Sync + 'static,
    {
        let convert = move |raw: &str, target: &mut dyn Any| -> Result<(), ParseError> {
            let slot = target
                .downcast_mut::<T>()
                .ok_or_else(ParseError::type_mismatch)?;
            *slot = convert(raw).map_err(|err| ParseError::new(err.to_string()))?;
            Ok(())
        };
        self.custom.insert(TypeId::of::<T>(), Arc::new(convert));
    }

    /// Returns `true` if a custom converter is registered for `shape`.
    pub fn has_custom(&self, shape: &Shape) -> bool {
        self.custom.contains_key(&shape.id())
    }

    /// Converts `raw` into the value behind `target`.
    ///
    /// Returns `None` when nothing knows how to produce a `shape` from a
    /// string.
    pub fn convert(
        &self,
        shape: &'static Shape,
        raw: &str,
        target: &mut dyn Any,
    ) -> Option<Result<(), ParseError>> {
        if let Some(custom) = self.custom.get(&shape.id()) {
            return Some(custom(raw, target));
        }
        match shape.def {
            Def::Scalar(sd) => Some((sd.parse)(raw, target)),
            _ => None,
        }
    }

    /// Number of custom converters.
    pub fn len(&self) -> usize {
        self.custom.len()
    }

    /// Returns `true` if no custom converter is registered.
    pub fn is_empty(&self) -> bool {
        self.custom.is_empty()
    }
}

impl fmt::Debug for Converters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converters")
            .field("custom", &self.custom.len())
            .finish()
    }
}
