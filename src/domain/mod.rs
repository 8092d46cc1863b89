//! Client-side rules that run before anything reaches the network.

pub mod dates;
pub mod validation;

pub use validation::FieldErrors;
