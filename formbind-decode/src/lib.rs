#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
#![doc = include_str!("../README.md")]

extern crate alloc;

mod values;
pub use values::{Iter, Values};

mod convert;
pub use convert::Converters;

mod error;
pub use error::{ConversionError, DecodeError, FieldError, MultiError};

mod walk;
pub use walk::{Assign, DEFAULT_MAX_LEN, LeafContext, Walker};

mod decoder;
pub use decoder::{Decoder, TextLeaf};

mod required;

use formbind_core::Bind;

/// Decodes `values` into a fresh `T` with the default [`Decoder`] settings.
pub fn from_values<T: Bind + Default>(values: &Values) -> Result<T, DecodeError> {
    let mut target = T::default();
    Decoder::new().decode(&mut target, values)?;
    Ok(target)
}

/// Decodes an `application/x-www-form-urlencoded` string (or a URL query
/// string without the leading `?`) into a fresh `T`.
///
/// ```
/// use formbind::Bind;
///
/// #[derive(Debug, Default, Bind)]
/// pub struct Search {
///     pub q: String,
///     pub page: Option<u32>,
/// }
///
/// let search: Search = formbind_decode::from_urlencoded("q=rust+forms&page=2").unwrap();
/// assert_eq!(search.q, "rust forms");
/// assert_eq!(search.page, Some(2));
/// ```
pub fn from_urlencoded<T: Bind + Default>(input: &str) -> Result<T, DecodeError> {
    from_values(&Values::from_urlencoded(input))
}
