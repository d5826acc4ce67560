//! The base-object protocol: parameter access, routed updates, flags,
//! reset and cloning.
//!
//! [`BaseObject`] is the trait every component implements. Concrete types
//! only wire up storage (`core`/`core_mut`), boxing (`dyn_clone`) and
//! downcasting (`as_any`); the protocol itself ships as provided methods
//! backed by free functions generic over `?Sized`, so the same code runs
//! on concrete types and trait objects. Composites override the parameter
//! methods with the routing helpers in [`crate::object::meta`].
//!
//! Nested parameter addressing uses the `__` separator: `foo__bar` is
//! parameter `bar` of the component stored in parameter `foo`, to any
//! depth. `set_params` additionally accepts any unambiguous `__`-suffix of
//! a full key as shorthand.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use crate::clone;
use crate::error::{Error, Result};
use crate::flags::{self, FlagMap, FlagScope};
use crate::object::{ClassDescriptor, ObjectCore};
use crate::utils::deep_equals::deep_equals;
use crate::value::{ParamMap, ParamValue};

/// Separator for nested parameter keys.
pub const SEP: &str = "__";

/// Protocol trait for parametric, introspectable components.
pub trait BaseObject: Any + fmt::Debug {
    /// Instance storage.
    fn core(&self) -> &ObjectCore;
    fn core_mut(&mut self) -> &mut ObjectCore;

    /// Literal boxed copy, state included. Blueprint copies go through
    /// [`BaseObject::clone_object`].
    fn dyn_clone(&self) -> Box<dyn BaseObject>;

    fn as_any(&self) -> &dyn Any;

    fn descriptor(&self) -> &'static ClassDescriptor {
        self.core().desc
    }

    /// Parameter values. With `deep`, parameters of nested components are
    /// merged in under `name__subname` keys, to unbounded depth.
    fn get_params(&self, deep: bool) -> Result<ParamMap> {
        get_params_impl(self, deep)
    }

    /// Routed parameter update; see the module docs for the key grammar.
    ///
    /// Not transactional: a failing key may leave earlier keys applied.
    fn set_params(&mut self, params: ParamMap) -> Result<()> {
        set_params_impl(self, params)
    }

    /// Mutable access to the component held in parameter `name`, if any.
    /// The routing hook for nested `set_params` delegation.
    fn component_mut(&mut self, name: &str) -> Option<&mut Box<dyn BaseObject>> {
        match self.core_mut().params.get_mut(name) {
            Some(ParamValue::Object(o)) => Some(o),
            _ => None,
        }
    }

    /// Reconstruct in place from the current parameters. Dynamic config
    /// overrides survive; dynamic tag overrides revert to whatever the
    /// constructor re-applies; state entries whose key contains `__` are
    /// protected, everything else is dropped.
    fn reset(&mut self) -> Result<()> {
        reset_impl(self)
    }

    /// Blueprint copy via the cloning engine. Validated against the
    /// original when the `check_clone` config flag is set.
    fn clone_object(&self) -> Result<Box<dyn BaseObject>> {
        clone::clone_object_impl(self)
    }

    /// Whether any direct parameter value is itself an object or a
    /// named-object collection.
    fn is_composite(&self) -> bool {
        self.core()
            .params
            .values()
            .any(|v| matches!(v, ParamValue::Object(_) | ParamValue::Objects(_)))
    }

    /// Resolved tags: dynamic overrides over the class declaration chain.
    fn get_tags(&self) -> FlagMap {
        let mut tags = flags::class_flags(self.descriptor(), FlagScope::Tags);
        tags.extend(self.core().tags_dynamic.clone());
        tags
    }

    /// One resolved tag; absent tags are an error listing available keys.
    fn get_tag(&self, key: &str) -> Result<ParamValue> {
        let mut tags = self.get_tags();
        tags.remove(key).ok_or_else(|| Error::FlagNotFound {
            key: key.to_string(),
            available: tags.keys().cloned().collect(),
        })
    }

    /// One resolved tag, falling back to `default` when absent.
    fn get_tag_or(&self, key: &str, default: ParamValue) -> ParamValue {
        self.get_tags().remove(key).unwrap_or(default)
    }

    /// Set dynamic tag overrides. Idempotent; keys need not be declared.
    fn set_tags(&mut self, tags: FlagMap) {
        self.core_mut().tags_dynamic.extend(tags);
    }

    /// Copy resolved tags from another object into the dynamic layer,
    /// all of them or a named subset.
    fn clone_tags(&mut self, source: &dyn BaseObject, keys: Option<&[&str]>) {
        let mut tags = source.get_tags();
        if let Some(keys) = keys {
            tags.retain(|k, _| keys.contains(&k.as_str()));
        }
        self.set_tags(tags);
    }

    /// Resolved config: dynamic overrides over the class declaration
    /// chain, over the protocol defaults.
    fn get_config(&self) -> FlagMap {
        let mut config = flags::class_flags(self.descriptor(), FlagScope::Config);
        config.extend(self.core().config_dynamic.clone());
        config
    }

    /// Set dynamic config overrides.
    fn set_config(&mut self, config: FlagMap) {
        self.core_mut().config_dynamic.extend(config);
    }
}

impl Clone for Box<dyn BaseObject> {
    fn clone(&self) -> Self {
        self.dyn_clone()
    }
}

/// Same class (descriptor identity) and deep-equal parameter values.
impl PartialEq for dyn BaseObject {
    fn eq(&self, other: &dyn BaseObject) -> bool {
        if !std::ptr::eq(self.descriptor(), other.descriptor()) {
            return false;
        }
        let (a, b) = (&self.core().params, &other.core().params);
        a.len() == b.len()
            && a.iter()
                .all(|(k, v)| b.get(k).is_some_and(|w| deep_equals(v, w)))
    }
}

pub(crate) fn get_params_impl<T: BaseObject + ?Sized>(obj: &T, deep: bool) -> Result<ParamMap> {
    let core = obj.core();
    let mut out = ParamMap::new();
    for spec in core.desc.params {
        out.insert(spec.name.to_string(), core.param(spec.name)?.clone());
    }
    if deep {
        let components: Vec<String> = out
            .iter()
            .filter(|(_, v)| matches!(v, ParamValue::Object(_)))
            .map(|(k, _)| k.clone())
            .collect();
        for key in components {
            let sub_params = match out.get(&key) {
                Some(ParamValue::Object(component)) => component.get_params(true)?,
                _ => continue,
            };
            for (sub_key, sub_value) in sub_params {
                out.insert(format!("{key}{SEP}{sub_key}"), sub_value);
            }
        }
    }
    Ok(out)
}

pub(crate) fn set_params_impl<T: BaseObject + ?Sized>(obj: &mut T, params: ParamMap) -> Result<()> {
    if params.is_empty() {
        return Ok(());
    }
    let valid = obj.get_params(true)?;

    let mut nested: BTreeMap<String, ParamMap> = BTreeMap::new();
    let mut unmatched = ParamMap::new();
    for (full_key, value) in params {
        let (head, sub) = match full_key.split_once(SEP) {
            Some((h, s)) => (h.to_string(), Some(s.to_string())),
            None => (full_key.clone(), None),
        };
        if !valid.contains_key(&head) {
            unmatched.insert(full_key, value);
            continue;
        }
        match sub {
            Some(sub_key) => {
                nested.entry(head).or_default().insert(sub_key, value);
            }
            None => {
                obj.core_mut().params.insert(head, value);
            }
        }
    }

    obj.reset()?;

    for (head, sub_params) in nested {
        match obj.component_mut(&head) {
            Some(component) => component.set_params(sub_params)?,
            None => {
                return Err(Error::NotAComponent {
                    class: obj.descriptor().name,
                    param: head,
                })
            }
        }
    }

    if !unmatched.is_empty() {
        let valid_keys: Vec<String> = valid.keys().cloned().collect();
        let aliased = alias_params(obj.descriptor().name, unmatched.clone(), &valid_keys)?;
        if aliased.keys().eq(unmatched.keys()) {
            return Err(Error::InvalidParamKeys {
                class: obj.descriptor().name,
                keys: aliased.keys().cloned().collect(),
            });
        }
        obj.set_params(aliased)?;
    }
    Ok(())
}

/// Replace every key that is a strict `__`-suffix of exactly one valid key
/// by that key. Zero matches pass through (the caller decides whether that
/// is progress); multiple matches are an error naming all candidates.
pub(crate) fn alias_params(
    class: &'static str,
    params: ParamMap,
    valid_keys: &[String],
) -> Result<ParamMap> {
    let mut out = ParamMap::new();
    for (key, value) in params {
        let suffix = format!("{SEP}{key}");
        let candidates: Vec<String> = valid_keys
            .iter()
            .filter(|vk| vk.ends_with(&suffix))
            .cloned()
            .collect();
        match candidates.len() {
            0 => {
                out.insert(key, value);
            }
            1 => {
                out.insert(candidates.into_iter().next().unwrap_or(key), value);
            }
            _ => {
                return Err(Error::AmbiguousAlias {
                    class,
                    suffix: key,
                    candidates,
                })
            }
        }
    }
    Ok(out)
}

pub(crate) fn reset_impl<T: BaseObject + ?Sized>(obj: &mut T) -> Result<()> {
    let desc = obj.descriptor();
    let params = obj.core().params.clone();
    let fresh = (desc.construct)(&params)?;

    let mut core = fresh.core().clone();
    core.config_dynamic = obj.core().config_dynamic.clone();
    for (key, value) in &obj.core().state {
        if key.contains(SEP) {
            core.state.insert(key.clone(), value.clone());
        }
    }
    *obj.core_mut() = core;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{MockComposite, MockObject, MOCK_CHILD, MOCK_OBJECT};

    fn params(pairs: &[(&str, ParamValue)]) -> ParamMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn shallow_params_cover_exactly_the_declaration() {
        let obj = MockObject::new();
        let shallow = obj.get_params(false).unwrap();
        assert_eq!(
            shallow.keys().collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn deep_params_nest_component_params() {
        let composite = MockComposite::new(MockObject::new());
        let deep = composite.get_params(true).unwrap();
        assert_eq!(deep.get("foo__a"), Some(&ParamValue::Int(42)));
        assert!(matches!(deep.get("foo"), Some(ParamValue::Object(_))));
        // shallow mode stays flat
        let shallow = composite.get_params(false).unwrap();
        assert!(!shallow.contains_key("foo__a"));
    }

    #[test]
    fn missing_stored_param_is_a_contract_violation() {
        let mut obj = MockObject::new();
        obj.core_mut().params.remove("b");
        let err = obj.get_params(false).unwrap_err();
        assert!(matches!(err, Error::ParamNotStored { param, .. } if param == "b"));
    }

    #[test]
    fn set_params_assigns_direct_keys() {
        let mut obj = MockObject::new();
        obj.set_params(params(&[("a", ParamValue::Int(7))])).unwrap();
        assert_eq!(obj.get_params(false).unwrap().get("a"), Some(&ParamValue::Int(7)));
    }

    #[test]
    fn set_params_routes_nested_keys() {
        let mut composite = MockComposite::new(MockObject::new());
        composite
            .set_params(params(&[("foo__a", ParamValue::Int(-1))]))
            .unwrap();
        let deep = composite.get_params(true).unwrap();
        assert_eq!(deep.get("foo__a"), Some(&ParamValue::Int(-1)));
    }

    #[test]
    fn set_params_resolves_unique_suffix_aliases() {
        let mut composite = MockComposite::new(MockObject::new());
        // `a` is not a parameter of the composite, but uniquely suffixes foo__a
        composite.set_params(params(&[("a", ParamValue::Int(5))])).unwrap();
        let deep = composite.get_params(true).unwrap();
        assert_eq!(deep.get("foo__a"), Some(&ParamValue::Int(5)));
    }

    #[test]
    fn set_params_rejects_unknown_keys_naming_them() {
        let mut obj = MockObject::new();
        let err = obj
            .set_params(params(&[("nonexistent", ParamValue::Int(1))]))
            .unwrap_err();
        assert!(
            matches!(err, Error::InvalidParamKeys { ref keys, .. } if keys == &["nonexistent"])
        );
    }

    #[test]
    fn set_params_is_not_transactional() {
        let mut obj = MockObject::new();
        let err = obj.set_params(params(&[
            ("a", ParamValue::Int(99)),
            ("nonexistent", ParamValue::Int(1)),
        ]));
        assert!(err.is_err());
        // the valid key was applied before the failure surfaced
        assert_eq!(obj.get_params(false).unwrap().get("a"), Some(&ParamValue::Int(99)));
    }

    #[test]
    fn routing_into_a_scalar_param_fails() {
        let mut obj = MockObject::new();
        let err = obj
            .set_params(params(&[("a__x", ParamValue::Int(1))]))
            .unwrap_err();
        assert!(matches!(err, Error::NotAComponent { param, .. } if param == "a"));
    }

    #[test]
    fn reset_keeps_params_and_dynamic_config_drops_state() {
        let mut obj = MockObject::new();
        obj.set_config(FlagMap::from([(
            "check_clone".to_string(),
            ParamValue::Bool(true),
        )]));
        obj.core_mut()
            .state
            .insert("scratch".to_string(), ParamValue::Int(1));
        obj.core_mut()
            .state
            .insert("cache__shared".to_string(), ParamValue::Int(2));
        obj.set_params(params(&[("a", ParamValue::Int(3))])).unwrap();

        obj.reset().unwrap();
        assert_eq!(obj.get_params(false).unwrap().get("a"), Some(&ParamValue::Int(3)));
        assert_eq!(obj.get_config().get("check_clone"), Some(&ParamValue::Bool(true)));
        assert!(!obj.core().state.contains_key("scratch"));
        assert_eq!(obj.core().state.get("cache__shared"), Some(&ParamValue::Int(2)));
    }

    #[test]
    fn dynamic_tags_override_class_tags() {
        let mut obj = MockObject::new();
        assert_eq!(obj.get_tag("capability:feature").unwrap(), ParamValue::str("A"));
        obj.set_tags(FlagMap::from([(
            "capability:feature".to_string(),
            ParamValue::str("X"),
        )]));
        assert_eq!(obj.get_tag("capability:feature").unwrap(), ParamValue::str("X"));
    }

    #[test]
    fn missing_tag_errors_list_available_keys() {
        let obj = MockObject::new();
        let err = obj.get_tag("no_such_tag").unwrap_err();
        assert!(matches!(err, Error::FlagNotFound { ref available, .. }
            if available.iter().any(|k| k == "capability:feature")));
        assert_eq!(obj.get_tag_or("no_such_tag", ParamValue::Null), ParamValue::Null);
    }

    #[test]
    fn clone_tags_copies_a_named_subset() {
        let source = {
            let mut o = MockObject::new();
            o.set_tags(FlagMap::from([
                ("alpha".to_string(), ParamValue::Int(1)),
                ("beta".to_string(), ParamValue::Int(2)),
            ]));
            o
        };
        let mut target = MockObject::new();
        target.clone_tags(&source, Some(&["alpha"]));
        assert_eq!(target.get_tag("alpha").unwrap(), ParamValue::Int(1));
        assert!(target.get_tag("beta").is_err());
    }

    #[test]
    fn equality_is_class_identity_plus_param_values() {
        let a = MockObject::new();
        let b = MockObject::new();
        let mut c = MockObject::new();
        c.set_params(params(&[("a", ParamValue::Int(0))])).unwrap();

        let (a, b, c): (&dyn BaseObject, &dyn BaseObject, &dyn BaseObject) = (&a, &b, &c);
        assert!(a == b);
        assert!(a != c);

        let child = MOCK_CHILD.create_test_instance("default").unwrap();
        let parent = MOCK_OBJECT.create_test_instance("default").unwrap();
        assert!(child.as_ref() != parent.as_ref());
    }

    #[test]
    fn is_composite_reflects_direct_values() {
        assert!(!MockObject::new().is_composite());
        assert!(MockComposite::new(MockObject::new()).is_composite());
    }
}
