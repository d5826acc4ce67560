//! The object protocol: schema, base trait, composite routing and the
//! estimator extension.

pub mod base;
pub mod descriptor;
pub mod estimator;
pub mod meta;

pub use base::{BaseObject, SEP};
pub use descriptor::{ClassDescriptor, Constructor, ObjectCore, ParamSpec, TestParamsFn};
pub use estimator::{Estimator, FITTED_FLAG};
