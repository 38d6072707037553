use alloc::collections::BTreeMap;
use alloc::collections::btree_map;
use alloc::string::String;
use core::error::Error;
use core::fmt;

use formbind_core::{ParseError, Shape};
use formbind_path::PathError;

/// A raw value could not be converted into the field's type.
#[derive(Debug, Clone)]
pub struct ConversionError {
    /// The input key.
    pub key: String,
    /// The raw value that failed.
    pub value: String,
    /// Position of the value among the key's values, for list fields.
    pub index: Option<usize>,
    /// The type the value was converted into.
    pub shape: &'static Shape,
    /// What the converter reported.
    pub source: ParseError,
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            key,
            value,
            index,
            shape,
            source,
        } = self;
        write!(f, "cannot convert {value:?} ")?;
        if let Some(index) = index {
            write!(f, "(value {index}) ")?;
        }
        write!(f, "for {key:?} into {shape}: {source}")
    }
}

impl Error for ConversionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// Why a single input key could not be applied.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum FieldError {
    /// The key names no bindable field.
    UnknownField(PathError),

    /// A value failed to convert.
    Conversion(ConversionError),

    /// The key resolves to a type nothing can build from a string.
    NoConverter {
        /// The input key.
        key: String,
        /// The type at the end of the key.
        shape: &'static Shape,
    },

    /// A list index beyond the decoder's limit.
    IndexOutOfRange {
        /// The input key.
        key: String,
        /// The offending index.
        index: usize,
        /// The configured limit.
        max_len: usize,
    },

    /// The value kind does not fit the field, e.g. a file for a number.
    Unsupported {
        /// The input key.
        key: String,
        /// What was offered.
        expected: &'static str,
        /// The field type.
        shape: &'static Shape,
    },

    /// A required field received no value.
    MissingRequired {
        /// The dotted key of the field.
        key: String,
    },
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::UnknownField(err) => write!(f, "{err}"),
            FieldError::Conversion(err) => write!(f, "{err}"),
            FieldError::NoConverter { key, shape } => {
                write!(f, "no converter for {shape} (field {key:?})")
            }
            FieldError::IndexOutOfRange {
                key,
                index,
                max_len,
            } => write!(
                f,
                "index {index} in {key:?} exceeds the maximum list length of {max_len}"
            ),
            FieldError::Unsupported {
                key,
                expected,
                shape,
            } => write!(f, "cannot assign {expected} to {key:?} of type {shape}"),
            FieldError::MissingRequired { key } => write!(f, "required field {key:?} is missing"),
        }
    }
}

impl Error for FieldError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FieldError::UnknownField(err) => Some(err),
            FieldError::Conversion(err) => Some(err),
            _ => None,
        }
    }
}

/// Every per-key failure from one decode, keyed by input key.
///
/// Keys are kept sorted, so the first error shown is stable.
#[derive(Debug, Clone, Default)]
pub struct MultiError {
    errors: BTreeMap<String, FieldError>,
}

impl MultiError {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `error` for `key`, returning the error it replaces.
    pub fn insert(&mut self, key: impl Into<String>, error: FieldError) -> Option<FieldError> {
        self.errors.insert(key.into(), error)
    }

    /// The error recorded for `key`.
    pub fn get(&self, key: &str) -> Option<&FieldError> {
        self.errors.get(key)
    }

    /// Returns `true` if an error is recorded for `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.errors.contains_key(key)
    }

    /// Removes the error recorded for `key`.
    pub fn remove(&mut self, key: &str) -> Option<FieldError> {
        self.errors.remove(key)
    }

    /// Keeps only the errors for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &FieldError) -> bool) {
        self.errors.retain(|key, error| keep(key, error));
    }

    /// Moves every error of `other` into `self`.
    pub fn merge(&mut self, other: MultiError) {
        self.errors.extend(other.errors);
    }

    /// Number of failed keys.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns `true` if nothing failed.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Iterates over failed keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }

    /// Iterates over failed keys and their errors.
    pub fn iter(&self) -> btree_map::Iter<'_, String, FieldError> {
        self.errors.iter()
    }

    /// `Ok(())` if nothing failed, the collected errors otherwise.
    pub fn into_result(self) -> Result<(), DecodeError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DecodeError::Fields(self))
        }
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(first) = self.errors.values().next() else {
            return f.write_str("no errors");
        };
        write!(f, "{first}")?;
        match self.len() {
            1 => Ok(()),
            2 => f.write_str(" (and 1 other error)"),
            n => write!(f, " (and {} other errors)", n - 1),
        }
    }
}

impl Error for MultiError {}

impl IntoIterator for MultiError {
    type Item = (String, FieldError);
    type IntoIter = btree_map::IntoIter<String, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a MultiError {
    type Item = (&'a String, &'a FieldError);
    type IntoIter = btree_map::Iter<'a, String, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

/// Why a decode did not fully succeed.
#[derive(Debug, Clone)]
pub enum DecodeError {
    /// The target is not a struct. Nothing was modified.
    NotAStruct {
        /// The target's shape.
        shape: &'static Shape,
    },

    /// Some keys failed. Every other key was applied.
    Fields(MultiError),
}

impl DecodeError {
    /// The per-key failures, if this is not a fatal error.
    pub fn fields(&self) -> Option<&MultiError> {
        match self {
            DecodeError::Fields(errors) => Some(errors),
            DecodeError::NotAStruct { .. } => None,
        }
    }

    /// Consumes the error, returning the per-key failures.
    pub fn into_fields(self) -> Option<MultiError> {
        match self {
            DecodeError::Fields(errors) => Some(errors),
            DecodeError::NotAStruct { .. } => None,
        }
    }
}

impl From<MultiError> for DecodeError {
    fn from(errors: MultiError) -> Self {
        DecodeError::Fields(errors)
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::NotAStruct { shape } => {
                write!(f, "cannot decode into {shape}: the target must be a struct")
            }
            DecodeError::Fields(errors) => write!(f, "{errors}"),
        }
    }
}

impl Error for DecodeError {}
