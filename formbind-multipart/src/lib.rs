#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
#![doc = include_str!("../README.md")]

extern crate alloc;

mod file;
pub use file::{FileHeader, FileReader};

mod form;
pub use form::{DEFAULT_MAX_MEMORY, MultipartForm};

mod decoder;
pub use decoder::{FileLeaf, MultipartDecoder};
