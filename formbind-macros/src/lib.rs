#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

use proc_macro::TokenStream;

mod derive;

/// Derives `formbind::Bind` for a struct with named fields.
///
/// Field attributes, all inside `#[form(...)]`:
///
/// - `rename = "key"`: address the field as `key` instead of its identifier
/// - `rename = "-"` or `skip`: never bind the field
/// - `flatten`: promote the fields of this embedded struct onto the parent
/// - `required`: report a missing value after decoding
///
/// Fields declared without `pub` are never bound.
#[proc_macro_derive(Bind, attributes(form))]
pub fn derive_bind(input: TokenStream) -> TokenStream {
    derive::derive_bind(input.into()).into()
}
