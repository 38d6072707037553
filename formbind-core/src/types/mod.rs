mod shape;
pub use shape::*;

mod def;
pub use def::*;

mod field;
pub use field::*;

mod error;
pub use error::*;
