#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

pub use formbind_core::*;

pub use formbind_macros::*;
