//! Test support: a small fixture package of registered components.
//!
//! Compiled unconditionally so downstream crates can exercise the
//! protocol against known components.

pub mod fixtures;
