//! Shared helpers: deep value equality and unique-name generation.

pub mod deep_equals;
pub mod names;

pub use deep_equals::{deep_equals, deep_equals_msg};
pub use names::make_unique;
