#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
#![doc = include_str!("../README.md")]

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write;

use formbind_core::{Def, Field, Shape};

mod parse;
pub use parse::{PathError, PathErrorKind, parse_path};

mod cache;
pub use cache::PathCache;

/// A single step in a path through a type structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathStep {
    /// Navigate to a struct field by its position in [`StructType::fields`](formbind_core::StructType)
    Field(u32),
    /// Navigate to a list element by index
    Index(u32),
}

/// A path through a type structure, recorded as a series of steps.
///
/// Options and boxes between steps are implicit: a walker looks through
/// them (allocating as needed) before applying the next step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    /// The [`Shape`] this path starts from.
    pub shape: &'static Shape,

    /// The sequence of [`PathStep`]s.
    pub steps: Vec<PathStep>,
}

impl Path {
    /// Create a new empty path.
    pub const fn new(shape: &'static Shape) -> Self {
        Self {
            shape,
            steps: Vec::new(),
        }
    }

    /// Push a step onto the path.
    pub fn push(&mut self, step: PathStep) {
        self.steps.push(step);
    }

    /// Pop the last step from the path.
    pub fn pop(&mut self) -> Option<PathStep> {
        self.steps.pop()
    }

    /// Get the steps in this path.
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Get the length of this path.
    pub const fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if this path is empty.
    pub const fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Formats the path back into the dotted key form, e.g. `readers.0.name`.
    ///
    /// Steps through flattened fields do not appear in the output.
    pub fn format(&self) -> String {
        let mut result = String::new();
        let mut current = self.shape;

        for step in &self.steps {
            match *step {
                PathStep::Field(index) => {
                    let Some(field) = struct_field(current, index) else {
                        break;
                    };
                    if !field.is_flattened() {
                        push_segment(&mut result, field.effective_name());
                    }
                    current = field.shape();
                }
                PathStep::Index(index) => {
                    if !result.is_empty() {
                        result.push('.');
                    }
                    // writing to a String cannot fail
                    let _ = write!(result, "{index}");
                    match current.peel().def {
                        Def::List(ld) => current = ld.t(),
                        _ => break,
                    }
                }
            }
        }
        result
    }

    /// The shape at the end of the path, if every step applies.
    pub fn leaf_shape(&self) -> Option<&'static Shape> {
        let mut current = self.shape;
        for step in &self.steps {
            current = match *step {
                PathStep::Field(index) => struct_field(current, index)?.shape(),
                PathStep::Index(_) => match current.peel().def {
                    Def::List(ld) => ld.t(),
                    _ => return None,
                },
            };
        }
        Some(current)
    }
}

impl core::fmt::Display for Path {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.format())
    }
}

fn struct_field(shape: &'static Shape, index: u32) -> Option<&'static Field> {
    shape.peel().as_struct()?.fields.get(index as usize)
}

fn push_segment(result: &mut String, segment: &str) {
    if !result.is_empty() {
        result.push('.');
    }
    result.push_str(segment);
}
