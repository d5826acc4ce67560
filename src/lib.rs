//! parabase: a base-object protocol for parametric, introspectable
//! components.
//!
//! Components declare their parameter schema, tags and config flags once,
//! in a `static` [`ClassDescriptor`]; instances store values in an
//! [`ObjectCore`] and get the whole protocol as provided methods on
//! [`BaseObject`]: parameter introspection (`get_params`), routed updates
//! with `__` nesting and suffix aliasing (`set_params`), flag resolution
//! over the explicit parent chain, reconstruction (`reset`) and
//! policy-driven blueprint cloning (`clone_object`).
//!
//! Composites hold named-object collections and plug the routing helpers
//! in [`object::meta`] into their trait impl. The [`lookup`] module
//! discovers registered components by type, tag and name over an explicit
//! [`Registry`], and [`serialize`] renders blueprints to and from JSON.
//!
//! ```
//! use parabase::testing::fixtures::{MockComposite, MockObject};
//! use parabase::{BaseObject, ParamMap, ParamValue};
//!
//! let mut composite = MockComposite::new(MockObject::new());
//! composite
//!     .set_params(ParamMap::from([("foo__a".to_string(), ParamValue::Int(7))]))
//!     .unwrap();
//! let clone = composite.clone_object().unwrap();
//! assert_eq!(
//!     clone.get_params(true).unwrap().get("foo__a"),
//!     Some(&ParamValue::Int(7))
//! );
//! ```

pub mod clone;
pub mod error;
pub mod flags;
pub mod lookup;
pub mod object;
pub mod serialize;
pub mod testing;
pub mod utils;
pub mod value;

pub use clone::{check_clone, CloneStrategy, Cloner};
pub use error::{Error, Result};
pub use flags::{FlagMap, FlagScope};
pub use lookup::{all_objects, ObjectEntry, ObjectQuery, Registry, TagCondition, TypeFilter};
pub use object::{
    BaseObject, ClassDescriptor, Constructor, Estimator, ObjectCore, ParamSpec, SEP,
};
pub use utils::{deep_equals, make_unique};
pub use value::{NamedObject, ParamMap, ParamValue};
