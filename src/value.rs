//! Parameter and tag value representation.
//!
//! Parameters, tags and configs all hold [`ParamValue`], a closed sum type
//! covering scalars, collections, nested protocol objects, named-object
//! collections, class references, foreign framework objects and opaque
//! handles. Keeping the union closed means equality, cloning and
//! serialization are defined per variant instead of relying on runtime
//! type probing.
//!
//! Equality on values is deep-structural and NaN-aware: two `Float` values
//! that are both NaN compare equal, because parameter sets containing NaN
//! sentinels must round-trip through `set_params`/`get_params` and clone
//! validation. `Clone` on a value is a literal, state-preserving copy; the
//! blueprint-style copy (post-init state) is the job of the cloning engine
//! in [`crate::clone`].

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::object::{BaseObject, ClassDescriptor};
use crate::utils::deep_equals::deep_equals_msg;

/// Ordered map from parameter name to value.
pub type ParamMap = BTreeMap<String, ParamValue>;

/// A (name, object) pair inside a named-object collection.
///
/// Collections are always held in normalized form: an ordered list of
/// uniquely named pairs. Coercion from bare objects or name->object maps
/// happens in [`crate::object::meta`].
#[derive(Debug, Clone)]
pub struct NamedObject {
    pub name: String,
    pub object: Box<dyn BaseObject>,
}

impl PartialEq for NamedObject {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && *self.object == *other.object
    }
}

impl NamedObject {
    pub fn new(name: impl Into<String>, object: Box<dyn BaseObject>) -> Self {
        Self {
            name: name.into(),
            object,
        }
    }
}

/// Foreign framework object exposing an equivalent constructor-parameter
/// capability, so the cloning engine can reconstruct it without it being a
/// [`BaseObject`].
pub trait ForeignObject: fmt::Debug {
    /// Reported type name, used in clone errors and value rendering.
    fn type_name(&self) -> &str;

    /// Constructor parameters of the foreign object.
    fn params(&self) -> ParamMap;

    /// Reconstruct a fresh instance from (possibly cloned) parameters.
    fn reconstruct(&self, params: ParamMap) -> Result<Arc<dyn ForeignObject>>;

    /// Value-wise equality against another foreign object.
    fn deep_eq(&self, other: &dyn ForeignObject) -> bool;
}

/// Arbitrary shared value with no parameter interface.
///
/// Opaque values compare by handle identity and are the target of the
/// clone chain's catch-all: fatal in safe mode, shared in unsafe mode.
#[derive(Clone)]
pub struct Opaque(pub Arc<dyn Any + Send + Sync>);

impl Opaque {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn ptr_eq(&self, other: &Opaque) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Opaque(..)")
    }
}

/// Runtime representation of a parameter, tag or config value.
#[derive(Debug)]
pub enum ParamValue {
    /// Absent/none value; also the default of unset return tags.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Ordered sequence of values.
    List(Vec<ParamValue>),
    /// String-keyed mapping of values.
    Map(BTreeMap<String, ParamValue>),
    /// Nested protocol object.
    Object(Box<dyn BaseObject>),
    /// Ordered named-object collection (composite parameter).
    Objects(Vec<NamedObject>),
    /// Reference to a component class used as a value; never copied.
    Class(&'static ClassDescriptor),
    /// Foreign framework object with a constructor-parameter capability.
    Foreign(Arc<dyn ForeignObject>),
    /// Arbitrary value without a parameter interface.
    Opaque(Opaque),
}

impl ParamValue {
    /// Build an `Object` value from a concrete component.
    pub fn object<T: BaseObject>(obj: T) -> Self {
        ParamValue::Object(Box::new(obj))
    }

    pub fn str(s: impl Into<String>) -> Self {
        ParamValue::Str(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ParamValue]> {
        match self {
            ParamValue::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, ParamValue>> {
        match self {
            ParamValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&dyn BaseObject> {
        match self {
            ParamValue::Object(o) => Some(o.as_ref()),
            _ => None,
        }
    }

    pub fn as_objects(&self) -> Option<&[NamedObject]> {
        match self {
            ParamValue::Objects(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&'static ClassDescriptor> {
        match self {
            ParamValue::Class(c) => Some(c),
            _ => None,
        }
    }

    /// Short variant name, used in messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ParamValue::Null => "null",
            ParamValue::Bool(_) => "bool",
            ParamValue::Int(_) => "int",
            ParamValue::Float(_) => "float",
            ParamValue::Str(_) => "str",
            ParamValue::List(_) => "list",
            ParamValue::Map(_) => "map",
            ParamValue::Object(_) => "object",
            ParamValue::Objects(_) => "objects",
            ParamValue::Class(_) => "class",
            ParamValue::Foreign(_) => "foreign",
            ParamValue::Opaque(_) => "opaque",
        }
    }
}

impl Clone for ParamValue {
    fn clone(&self) -> Self {
        match self {
            ParamValue::Null => ParamValue::Null,
            ParamValue::Bool(v) => ParamValue::Bool(*v),
            ParamValue::Int(v) => ParamValue::Int(*v),
            ParamValue::Float(v) => ParamValue::Float(*v),
            ParamValue::Str(v) => ParamValue::Str(v.clone()),
            ParamValue::List(v) => ParamValue::List(v.clone()),
            ParamValue::Map(v) => ParamValue::Map(v.clone()),
            ParamValue::Object(o) => ParamValue::Object(o.dyn_clone()),
            ParamValue::Objects(v) => ParamValue::Objects(v.clone()),
            ParamValue::Class(c) => ParamValue::Class(c),
            ParamValue::Foreign(h) => ParamValue::Foreign(Arc::clone(h)),
            ParamValue::Opaque(h) => ParamValue::Opaque(h.clone()),
        }
    }
}

impl PartialEq for ParamValue {
    fn eq(&self, other: &Self) -> bool {
        deep_equals_msg(self, other).is_none()
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

impl From<Vec<ParamValue>> for ParamValue {
    fn from(v: Vec<ParamValue>) -> Self {
        ParamValue::List(v)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Null => f.write_str("null"),
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Str(v) => write!(f, "{v:?}"),
            ParamValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            ParamValue::Map(m) => {
                f.write_str("{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            ParamValue::Object(o) => write!(f, "{}(...)", o.descriptor().name),
            ParamValue::Objects(members) => {
                f.write_str("[")?;
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}(...)", m.name, m.object.descriptor().name)?;
                }
                f.write_str("]")
            }
            ParamValue::Class(c) => write!(f, "<class {}>", c.name),
            ParamValue::Foreign(h) => write!(f, "<foreign {}>", h.type_name()),
            ParamValue::Opaque(_) => f.write_str("<opaque>"),
        }
    }
}
