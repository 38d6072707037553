use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use formbind_core::{Def, Field, Shape, StructType};

use crate::{Path, PathStep};

/// Why a key does not resolve against a shape.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PathErrorKind {
    /// The key is empty, or has two dots in a row, or starts or ends with one.
    EmptySegment,

    /// No bindable field has this name.
    UnknownField {
        /// The struct that was searched.
        shape: &'static Shape,
        /// A field with a similar name, if any.
        suggestion: Option<&'static str>,
    },

    /// The segment tries to descend into something that has no fields.
    NotAStruct {
        /// The shape that was reached.
        shape: &'static Shape,
    },

    /// A list was reached but the segment is not an index.
    ExpectedIndex {
        /// The list shape.
        shape: &'static Shape,
    },

    /// The index does not fit in 32 bits.
    IndexOverflow,
}

/// A key that cannot be resolved against a shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathError {
    key: String,
    segment: String,
    kind: PathErrorKind,
}

impl PathError {
    fn new(key: &str, segment: &str, kind: PathErrorKind) -> Self {
        Self {
            key: key.to_string(),
            segment: segment.to_string(),
            kind,
        }
    }

    /// The full key that failed to resolve.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The segment of the key where resolution stopped.
    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// Why resolution stopped.
    pub fn kind(&self) -> &PathErrorKind {
        &self.kind
    }
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { key, segment, kind } = self;
        write!(f, "invalid path {key:?}: ")?;
        match kind {
            PathErrorKind::EmptySegment => write!(f, "empty segment"),
            PathErrorKind::UnknownField { shape, suggestion } => {
                write!(f, "{shape} has no field {segment:?}")?;
                if let Some(suggestion) = suggestion {
                    write!(f, " (did you mean {suggestion:?}?)")?;
                }
                Ok(())
            }
            PathErrorKind::NotAStruct { shape } => {
                write!(f, "cannot select {segment:?} inside {shape}")
            }
            PathErrorKind::ExpectedIndex { shape } => {
                write!(f, "expected an index into {shape}, found {segment:?}")
            }
            PathErrorKind::IndexOverflow => write!(f, "index {segment} is too large"),
        }
    }
}

impl core::error::Error for PathError {}

/// Parses `key` into a [`Path`] starting at `shape`.
///
/// ```
/// use formbind::Bind;
/// use formbind_path::{PathStep, parse_path};
///
/// #[derive(Default, Bind)]
/// pub struct Person {
///     pub name: String,
/// }
///
/// #[derive(Default, Bind)]
/// pub struct Team {
///     pub members: Vec<Person>,
/// }
///
/// let path = parse_path("members.3.name", Team::SHAPE).unwrap();
/// assert_eq!(path.steps, [PathStep::Field(0), PathStep::Index(3), PathStep::Field(0)]);
/// assert_eq!(path.to_string(), "members.3.name");
/// ```
pub fn parse_path(key: &str, shape: &'static Shape) -> Result<Path, PathError> {
    let mut path = Path::new(shape);
    let mut current = shape;

    for segment in key.split('.') {
        let fail = |kind: PathErrorKind| PathError::new(key, segment, kind);
        if segment.is_empty() {
            return Err(fail(PathErrorKind::EmptySegment));
        }

        let inner = current.peel();
        match inner.def {
            Def::List(ld) => {
                if !segment.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(fail(PathErrorKind::ExpectedIndex { shape: inner }));
                }
                let index = segment
                    .parse::<u32>()
                    .map_err(|_| fail(PathErrorKind::IndexOverflow))?;
                path.push(PathStep::Index(index));
                current = ld.t();
            }
            Def::Struct(st) => {
                let Some(field) = find_field(&st, segment, &mut path.steps) else {
                    return Err(fail(PathErrorKind::UnknownField {
                        shape: inner,
                        suggestion: suggest(&st, segment),
                    }));
                };
                current = field.shape();
            }
            _ => return Err(fail(PathErrorKind::NotAStruct { shape: inner })),
        }
    }

    Ok(path)
}

/// Finds a bindable field by key, searching flattened structs after the
/// fields declared directly. Pushes one step per field traversed.
fn find_field(st: &StructType, key: &str, steps: &mut Vec<PathStep>) -> Option<&'static Field> {
    if let Some((index, field)) = st.field_by_key(key) {
        steps.push(PathStep::Field(index as u32));
        return Some(field);
    }

    for (index, field) in st.flattened() {
        let Some(inner) = field.shape().peel().as_struct() else {
            continue;
        };
        steps.push(PathStep::Field(index as u32));
        if let Some(found) = find_field(inner, key, steps) {
            return Some(found);
        }
        steps.pop();
    }
    None
}

fn suggest(st: &StructType, segment: &str) -> Option<&'static str> {
    let mut keys = Vec::new();
    collect_keys(st, &mut keys);
    keys.into_iter()
        .filter_map(|key| {
            let dist = strsim::levenshtein(segment, key);
            if dist <= 2 { Some((key, dist)) } else { None }
        })
        .min_by_key(|(_, dist)| *dist)
        .map(|(key, _)| key)
}

fn collect_keys(st: &StructType, keys: &mut Vec<&'static str>) {
    for field in st.fields {
        if field.is_flattened() {
            if !field.is_skipped()
                && let Some(inner) = field.shape().peel().as_struct()
            {
                collect_keys(inner, keys);
            }
        } else if field.is_bindable() {
            keys.push(field.effective_name());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formbind_core::Bind;

    #[test]
    fn scalar_root_rejects_any_segment() {
        let err = parse_path("x", u32::SHAPE).unwrap_err();
        assert!(matches!(err.kind(), PathErrorKind::NotAStruct { .. }));
        assert_eq!(err.segment(), "x");
    }

    #[test]
    fn list_root_takes_indices() {
        let path = parse_path("4", <Vec<u8>>::SHAPE).unwrap();
        assert_eq!(path.steps, [PathStep::Index(4)]);

        let err = parse_path("99999999999", <Vec<u8>>::SHAPE).unwrap_err();
        assert_eq!(err.kind(), &PathErrorKind::IndexOverflow);

        let err = parse_path("-1", <Vec<u8>>::SHAPE).unwrap_err();
        assert!(matches!(err.kind(), PathErrorKind::ExpectedIndex { .. }));
    }

    #[test]
    fn empty_segments_are_rejected() {
        for key in ["", ".", "0..1", "0."] {
            let err = parse_path(key, <Vec<Vec<u8>>>::SHAPE).unwrap_err();
            assert_eq!(err.key(), key);
            assert_eq!(err.kind(), &PathErrorKind::EmptySegment, "{key:?}");
        }
    }
}
