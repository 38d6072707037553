mod scalar;
mod option;
mod boxed;
mod vec;
