//! Policy-driven blueprint cloning.
//!
//! A clone is a fresh instance constructed from a copy of the original's
//! parameters: same blueprint, post-construction state discarded. Values
//! are cloned by an ordered chain of [`CloneStrategy`] instances; the
//! first strategy that applies wins. Classes can prepend their own
//! strategies via the descriptor's `clone_plugins`, overriding any default
//! for the values they claim.
//!
//! Default chain order: class references (shared, never copied), maps,
//! sequences, protocol objects (reconstructed through their descriptor),
//! foreign objects (reconstructed through [`ForeignObject`]), then the
//! catch-all. The catch-all copies scalars; for opaque values it fails in
//! safe mode and shares the handle in unsafe mode.

use crate::error::{Error, Result};
use crate::flags::{CHECK_CLONE, CLONE_CONFIG};
use crate::object::BaseObject;
use crate::utils::deep_equals::{deep_equals, deep_equals_msg};
use crate::value::{NamedObject, ParamMap, ParamValue};

/// One step in the clone chain.
pub trait CloneStrategy {
    /// Whether this strategy claims the value.
    fn applies(&self, value: &ParamValue) -> bool;

    /// Clone the value, recursing through `cloner` for inner values.
    fn clone_value(&self, value: &ParamValue, cloner: &Cloner) -> Result<ParamValue>;
}

/// An ordered strategy chain plus the safe/unsafe mode switch.
pub struct Cloner {
    safe: bool,
    strategies: Vec<Box<dyn CloneStrategy>>,
}

impl Cloner {
    /// The default chain.
    pub fn new(safe: bool) -> Self {
        Self::with_plugins(safe, Vec::new())
    }

    /// The default chain with `plugins` prepended ahead of it.
    pub fn with_plugins(safe: bool, plugins: Vec<Box<dyn CloneStrategy>>) -> Self {
        let mut strategies = plugins;
        strategies.push(Box::new(CloneClass));
        strategies.push(Box::new(CloneMap));
        strategies.push(Box::new(CloneSequence));
        strategies.push(Box::new(CloneObject));
        strategies.push(Box::new(CloneForeign));
        strategies.push(Box::new(CloneCatchAll));
        Self { safe, strategies }
    }

    pub fn safe(&self) -> bool {
        self.safe
    }

    /// Clone one value through the chain. The catch-all applies to every
    /// value, so the chain always resolves.
    pub fn clone_value(&self, value: &ParamValue) -> Result<ParamValue> {
        for strategy in &self.strategies {
            if strategy.applies(value) {
                return strategy.clone_value(value, self);
            }
        }
        CloneCatchAll.clone_value(value, self)
    }
}

/// Class references are shared, never copied.
pub struct CloneClass;

impl CloneStrategy for CloneClass {
    fn applies(&self, value: &ParamValue) -> bool {
        matches!(value, ParamValue::Class(_))
    }

    fn clone_value(&self, value: &ParamValue, _cloner: &Cloner) -> Result<ParamValue> {
        match value {
            ParamValue::Class(desc) => Ok(ParamValue::Class(desc)),
            _ => Ok(value.clone()),
        }
    }
}

pub struct CloneMap;

impl CloneStrategy for CloneMap {
    fn applies(&self, value: &ParamValue) -> bool {
        matches!(value, ParamValue::Map(_))
    }

    fn clone_value(&self, value: &ParamValue, cloner: &Cloner) -> Result<ParamValue> {
        match value {
            ParamValue::Map(entries) => Ok(ParamValue::Map(
                entries
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), cloner.clone_value(v)?)))
                    .collect::<Result<_>>()?,
            )),
            _ => Ok(value.clone()),
        }
    }
}

/// Lists element-wise; named-object collections member-wise, names kept.
pub struct CloneSequence;

impl CloneStrategy for CloneSequence {
    fn applies(&self, value: &ParamValue) -> bool {
        matches!(value, ParamValue::List(_) | ParamValue::Objects(_))
    }

    fn clone_value(&self, value: &ParamValue, cloner: &Cloner) -> Result<ParamValue> {
        match value {
            ParamValue::List(items) => Ok(ParamValue::List(
                items
                    .iter()
                    .map(|v| cloner.clone_value(v))
                    .collect::<Result<_>>()?,
            )),
            ParamValue::Objects(members) => Ok(ParamValue::Objects(
                members
                    .iter()
                    .map(|m| {
                        Ok(NamedObject::new(
                            m.name.clone(),
                            clone_protocol_object(m.object.as_ref(), cloner)?,
                        ))
                    })
                    .collect::<Result<_>>()?,
            )),
            _ => Ok(value.clone()),
        }
    }
}

/// Protocol objects are reconstructed through their descriptor from cloned
/// parameters, with a post-construction sanity check.
pub struct CloneObject;

impl CloneStrategy for CloneObject {
    fn applies(&self, value: &ParamValue) -> bool {
        matches!(value, ParamValue::Object(_))
    }

    fn clone_value(&self, value: &ParamValue, cloner: &Cloner) -> Result<ParamValue> {
        match value {
            ParamValue::Object(obj) => Ok(ParamValue::Object(clone_protocol_object(
                obj.as_ref(),
                cloner,
            )?)),
            _ => Ok(value.clone()),
        }
    }
}

/// Foreign objects are reconstructed through [`ForeignObject::reconstruct`]
/// from cloned parameters.
///
/// [`ForeignObject::reconstruct`]: crate::value::ForeignObject::reconstruct
pub struct CloneForeign;

impl CloneStrategy for CloneForeign {
    fn applies(&self, value: &ParamValue) -> bool {
        matches!(value, ParamValue::Foreign(_))
    }

    fn clone_value(&self, value: &ParamValue, cloner: &Cloner) -> Result<ParamValue> {
        match value {
            ParamValue::Foreign(handle) => {
                let params = handle
                    .params()
                    .into_iter()
                    .map(|(k, v)| Ok((k, cloner.clone_value(&v)?)))
                    .collect::<Result<ParamMap>>()?;
                Ok(ParamValue::Foreign(handle.reconstruct(params)?))
            }
            _ => Ok(value.clone()),
        }
    }
}

/// Scalars copy; opaque values fail in safe mode and share in unsafe mode.
pub struct CloneCatchAll;

impl CloneStrategy for CloneCatchAll {
    fn applies(&self, _value: &ParamValue) -> bool {
        true
    }

    fn clone_value(&self, value: &ParamValue, cloner: &Cloner) -> Result<ParamValue> {
        match value {
            ParamValue::Opaque(handle) => {
                if cloner.safe() {
                    Err(Error::Uncloneable {
                        type_name: "opaque value".to_string(),
                    })
                } else {
                    Ok(ParamValue::Opaque(handle.clone()))
                }
            }
            other => Ok(other.clone()),
        }
    }
}

/// Reconstruct a protocol object from cloned parameters.
///
/// The constructor must store every parameter unchanged; a dropped or
/// modified value is a contract violation. When the source's resolved
/// `clone_config` flag is set, its dynamic config overrides carry over to
/// the clone.
pub fn clone_protocol_object<T: BaseObject + ?Sized>(
    obj: &T,
    cloner: &Cloner,
) -> Result<Box<dyn BaseObject>> {
    let desc = obj.descriptor();
    let params = obj
        .core()
        .params
        .iter()
        .map(|(k, v)| Ok((k.clone(), cloner.clone_value(v)?)))
        .collect::<Result<ParamMap>>()?;
    let mut fresh = (desc.construct)(&params)?;

    for (key, value) in &params {
        let stored = fresh
            .core()
            .params
            .get(key)
            .ok_or_else(|| Error::NonConformingConstructor {
                class: desc.name,
                param: key.clone(),
            })?;
        if !deep_equals(stored, value) {
            return Err(Error::NonConformingConstructor {
                class: desc.name,
                param: key.clone(),
            });
        }
    }

    let propagate = obj
        .get_config()
        .get(CLONE_CONFIG)
        .and_then(|v| v.as_bool())
        .unwrap_or(true);
    if propagate {
        fresh.core_mut().config_dynamic = obj.core().config_dynamic.clone();
    }
    Ok(fresh)
}

/// Entry point behind [`BaseObject::clone_object`]: safe mode, plugins
/// from the nearest ancestor declaring any, post-clone validation when the
/// `check_clone` config flag is set.
pub(crate) fn clone_object_impl<T: BaseObject + ?Sized>(obj: &T) -> Result<Box<dyn BaseObject>> {
    let mut cursor = Some(obj.descriptor());
    let mut plugins = Vec::new();
    while let Some(desc) = cursor {
        if let Some(provider) = desc.clone_plugins {
            plugins = provider();
            break;
        }
        cursor = desc.parent;
    }
    let cloner = Cloner::with_plugins(true, plugins);
    let clone = clone_protocol_object(obj, &cloner)?;

    let validate = obj
        .get_config()
        .get(CHECK_CLONE)
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    if validate {
        check_clone(obj, clone.as_ref())?;
    }
    Ok(clone)
}

/// Validate that `clone` is a conforming blueprint copy of `original`:
/// same class, every parameter present and deep-equal. Fails with the path
/// of the first discrepancy.
pub fn check_clone<T: BaseObject + ?Sized>(original: &T, clone: &dyn BaseObject) -> Result<()> {
    let desc = original.descriptor();
    if !std::ptr::eq(desc, clone.descriptor()) {
        return Err(Error::NonConformingClone {
            class: desc.name,
            detail: format!("clone is a `{}`", clone.descriptor().name),
        });
    }
    for spec in desc.params {
        let original_value = original.core().param(spec.name)?;
        let clone_value = clone.core().param(spec.name)?;
        if let Some(msg) = deep_equals_msg(original_value, clone_value) {
            return Err(Error::NonConformingClone {
                class: desc.name,
                detail: format!("parameter `{}` differs: {msg}", spec.name),
            });
        }
    }
    Ok(())
}
