#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
#![doc = include_str!("../README.md")]

extern crate alloc;

mod types;
pub use types::*;

// Scalars, `Option`, `Box` and `Vec`
mod impls;

/// A type that can be described by a static [`Shape`] and filled from form input.
///
/// Implement it with `#[derive(Bind)]` for structs with named fields. Leaf
/// types outside this crate can implement it by hand:
///
/// ```
/// use formbind_core::{Bind, Shape};
///
/// #[derive(Default)]
/// struct Celsius(f64);
///
/// impl Bind for Celsius {
///     const SHAPE: &'static Shape = &const { Shape::opaque::<Self>("Celsius") };
/// }
///
/// assert!(Celsius::SHAPE.is_opaque());
/// ```
pub trait Bind: 'static {
    /// The shape descriptor for this type.
    const SHAPE: &'static Shape;
}

/// Returns the shape of a value's type.
pub fn shape_of<T: Bind>(_value: &T) -> &'static Shape {
    T::SHAPE
}
