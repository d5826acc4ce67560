//! Routing and aggregation helpers for composite objects.
//!
//! A composite holds an ordered collection of uniquely named member
//! objects in one parameter, named by the class tag `named_objects_param`.
//! Concrete composites plug these free functions into their
//! [`BaseObject`] impl: `get_params`/`set_params`/`component_mut` delegate
//! here with the collection parameter name.
//!
//! `set_params` on a composite applies keys in three steps, in order:
//! wholesale collection replacement (the collection parameter name as
//! key), in-place member replacement (an exact member name as key, value
//! must be an object; the member keeps its name and position), then
//! standard routing for everything else, including `member__param` keys.

use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::flags::FlagMap;
use crate::object::base::{self, SEP};
use crate::object::{BaseObject, ClassDescriptor, ObjectCore};
use crate::utils::deep_equals::deep_equals;
use crate::utils::names::make_unique;
use crate::value::{NamedObject, ParamMap, ParamValue};

/// Composite `get_params`: the standard map, plus (in deep mode) each
/// member under its name and the member's parameters under
/// `name__param` keys.
pub fn get_params<T: BaseObject + ?Sized>(obj: &T, attr: &str, deep: bool) -> Result<ParamMap> {
    let mut out = base::get_params_impl(obj, deep)?;
    if !deep {
        return Ok(out);
    }
    let members = members_of(obj, attr);
    for member in members {
        for (key, value) in member.object.get_params(true)? {
            out.insert(format!("{}{SEP}{key}", member.name), value);
        }
        out.insert(member.name.clone(), ParamValue::Object(member.object));
    }
    Ok(out)
}

/// Composite `set_params`; see the module docs for the step order.
pub fn set_params<T: BaseObject + ?Sized>(
    obj: &mut T,
    attr: &str,
    mut params: ParamMap,
) -> Result<()> {
    let desc = obj.descriptor();
    let mut mutated = false;

    if let Some(value) = params.remove(attr) {
        let members = coerce_named_objects(desc.name, value)?;
        check_names(desc, &members)?;
        obj.core_mut()
            .params
            .insert(attr.to_string(), ParamValue::Objects(members));
        mutated = true;
    }

    let member_names: Vec<String> = members_of(obj, attr)
        .into_iter()
        .map(|m| m.name)
        .collect();
    let replacements: Vec<String> = params
        .keys()
        .filter(|k| !k.contains(SEP) && member_names.contains(k))
        .cloned()
        .collect();
    for name in replacements {
        let Some(value) = params.remove(&name) else {
            continue;
        };
        let ParamValue::Object(new_member) = value else {
            return Err(Error::InvalidMemberValue {
                class: desc.name,
                name,
            });
        };
        if let Some(ParamValue::Objects(members)) = obj.core_mut().params.get_mut(attr) {
            if let Some(member) = members.iter_mut().find(|m| m.name == name) {
                member.object = new_member;
            }
        }
        mutated = true;
    }

    if params.is_empty() {
        if mutated {
            obj.reset()?;
        }
        return Ok(());
    }
    base::set_params_impl(obj, params)
}

/// Composite `component_mut`: direct object parameters first, then
/// collection members by name.
pub fn component_mut<'a, T: BaseObject + ?Sized>(
    obj: &'a mut T,
    attr: &str,
    name: &str,
) -> Option<&'a mut Box<dyn BaseObject>> {
    if matches!(obj.core().params.get(name), Some(ParamValue::Object(_))) {
        if let Some(ParamValue::Object(o)) = obj.core_mut().params.get_mut(name) {
            return Some(o);
        }
        return None;
    }
    if let Some(ParamValue::Objects(members)) = obj.core_mut().params.get_mut(attr) {
        return members
            .iter_mut()
            .find(|m| m.name == name)
            .map(|m| &mut m.object);
    }
    None
}

/// Normalize a collection value into named pairs.
///
/// Accepted shapes: an already normalized collection, a single bare
/// object, a list of bare objects and/or `[name, object]` pairs, or a
/// name-to-object map. Bare objects are named after their class; when any
/// name was auto-generated the full name list is de-duplicated with
/// numeric suffixes.
pub fn coerce_named_objects(class: &'static str, value: ParamValue) -> Result<Vec<NamedObject>> {
    let invalid = |detail: String| Error::InvalidMemberNames { class, detail };

    let (mut members, any_auto) = match value {
        ParamValue::Objects(members) => (members, false),
        ParamValue::Object(object) => {
            let name = object.descriptor().name.to_string();
            (vec![NamedObject::new(name, object)], true)
        }
        ParamValue::List(items) => {
            let mut members = Vec::new();
            let mut any_auto = false;
            for item in items {
                match item {
                    ParamValue::Object(object) => {
                        any_auto = true;
                        let name = object.descriptor().name.to_string();
                        members.push(NamedObject::new(name, object));
                    }
                    ParamValue::List(pair) => {
                        let mut parts = pair.into_iter();
                        match (parts.next(), parts.next(), parts.next()) {
                            (
                                Some(ParamValue::Str(name)),
                                Some(ParamValue::Object(object)),
                                None,
                            ) => members.push(NamedObject::new(name, object)),
                            _ => {
                                return Err(invalid(
                                    "list entries must be objects or [name, object] pairs"
                                        .to_string(),
                                ))
                            }
                        }
                    }
                    other => {
                        return Err(invalid(format!(
                            "cannot interpret a {} entry as a named object",
                            other.kind()
                        )))
                    }
                }
            }
            (members, any_auto)
        }
        ParamValue::Map(entries) => {
            let mut members = Vec::new();
            for (name, value) in entries {
                match value {
                    ParamValue::Object(object) => members.push(NamedObject::new(name, object)),
                    other => {
                        return Err(invalid(format!(
                            "entry `{name}` is a {}, not an object",
                            other.kind()
                        )))
                    }
                }
            }
            (members, false)
        }
        other => {
            return Err(invalid(format!(
                "cannot interpret a {} value as a named-object collection",
                other.kind()
            )))
        }
    };

    if any_auto {
        let names: Vec<String> = members.iter().map(|m| m.name.clone()).collect();
        for (member, name) in members.iter_mut().zip(make_unique(&names)) {
            member.name = name;
        }
    }
    Ok(members)
}

/// Validate member names: unique, free of the `__` separator, and not
/// colliding with a constructor parameter of the composite.
pub fn check_names(desc: &ClassDescriptor, members: &[NamedObject]) -> Result<()> {
    let mut seen = BTreeSet::new();
    let duplicates: Vec<String> = members
        .iter()
        .filter(|m| !seen.insert(m.name.as_str()))
        .map(|m| m.name.clone())
        .collect();
    if !duplicates.is_empty() {
        return Err(Error::InvalidMemberNames {
            class: desc.name,
            detail: format!("duplicate names {duplicates:?}"),
        });
    }
    if let Some(member) = members.iter().find(|m| m.name.contains(SEP)) {
        return Err(Error::InvalidMemberNames {
            class: desc.name,
            detail: format!("name `{}` contains the reserved `__` separator", member.name),
        });
    }
    if let Some(member) = members.iter().find(|m| desc.has_param(&m.name)) {
        return Err(Error::InvalidMemberNames {
            class: desc.name,
            detail: format!(
                "name `{}` collides with a constructor parameter",
                member.name
            ),
        });
    }
    Ok(())
}

/// Constructor-side normalization of the collection parameter: coerce and
/// validate the stored value in place.
pub fn coerce_collection(core: &mut ObjectCore, attr: &str) -> Result<()> {
    let desc = core.desc;
    let value = core.param(attr)?.clone();
    let members = coerce_named_objects(desc.name, value)?;
    check_names(desc, &members)?;
    core.params
        .insert(attr.to_string(), ParamValue::Objects(members));
    Ok(())
}

/// Concatenate two member collections into a fresh composite of class
/// `desc`, de-duplicating names across the joined list. Any other
/// composite parameter takes its declared default.
pub fn concat(
    desc: &'static ClassDescriptor,
    attr: &str,
    left: &[NamedObject],
    right: &[NamedObject],
) -> Result<Box<dyn BaseObject>> {
    let mut members: Vec<NamedObject> = left.iter().chain(right).cloned().collect();
    let names: Vec<String> = members.iter().map(|m| m.name.clone()).collect();
    for (member, name) in members.iter_mut().zip(make_unique(&names)) {
        member.name = name;
    }
    let params = ParamMap::from([(attr.to_string(), ParamValue::Objects(members))]);
    (desc.construct)(&params)
}

/// Whether any member resolves tag `key` to `value`. A member missing the
/// tag counts as resolving to the searched value.
pub fn any_tag_is(members: &[NamedObject], key: &str, value: &ParamValue) -> bool {
    members
        .iter()
        .any(|m| deep_equals(&m.object.get_tag_or(key, value.clone()), value))
}

/// Set the composite's own tag `key` to `value` when [`any_tag_is`] holds
/// over its members, to `value_if_not` otherwise.
pub fn any_tag_is_then_set<T: BaseObject + ?Sized>(
    obj: &mut T,
    attr: &str,
    key: &str,
    value: ParamValue,
    value_if_not: ParamValue,
) {
    let members = members_of(obj, attr);
    let resolved = if any_tag_is(&members, key, &value) {
        value
    } else {
        value_if_not
    };
    obj.set_tags(FlagMap::from([(key.to_string(), resolved)]));
}

/// First non-null resolution of tag `key` across members, `Null` when all
/// members resolve it to null or miss it.
pub fn first_nonnull_tag(members: &[NamedObject], key: &str) -> ParamValue {
    members
        .iter()
        .map(|m| m.object.get_tag_or(key, ParamValue::Null))
        .find(|v| !v.is_null())
        .unwrap_or(ParamValue::Null)
}

/// Set the composite's own tag `key` to the first non-null member
/// resolution, leaving it untouched when there is none.
pub fn first_nonnull_tag_set<T: BaseObject + ?Sized>(obj: &mut T, attr: &str, key: &str) {
    let members = members_of(obj, attr);
    let value = first_nonnull_tag(&members, key);
    if !value.is_null() {
        obj.set_tags(FlagMap::from([(key.to_string(), value)]));
    }
}

/// Walk members in order; fail when a member does not resolve `left_key`
/// to `left_val`, succeed at the first member resolving `mid_key` to
/// `mid_val`. Returns `(linked, complete)`: `linked` holds when no member
/// broke the left condition before the mid condition was met, `complete`
/// additionally requires the mid condition to be met at all.
pub fn tag_chain_is_linked(
    members: &[NamedObject],
    left_key: &str,
    mid_key: &str,
    left_val: &ParamValue,
    mid_val: &ParamValue,
) -> (bool, bool) {
    for member in members {
        if !deep_equals(&member.object.get_tag_or(left_key, ParamValue::Null), left_val) {
            return (false, false);
        }
        if deep_equals(&member.object.get_tag_or(mid_key, ParamValue::Null), mid_val) {
            return (true, true);
        }
    }
    (true, false)
}

/// Run [`tag_chain_is_linked`] over the composite's members and record
/// the two outcomes as boolean tags `left_key` and `mid_key` on the
/// composite itself.
pub fn tag_chain_is_linked_set<T: BaseObject + ?Sized>(
    obj: &mut T,
    attr: &str,
    left_key: &str,
    mid_key: &str,
    left_val: &ParamValue,
    mid_val: &ParamValue,
) {
    let members = members_of(obj, attr);
    let (linked, complete) = tag_chain_is_linked(&members, left_key, mid_key, left_val, mid_val);
    obj.set_tags(FlagMap::from([
        (left_key.to_string(), ParamValue::Bool(linked)),
        (mid_key.to_string(), ParamValue::Bool(complete)),
    ]));
}

fn members_of<T: BaseObject + ?Sized>(obj: &T, attr: &str) -> Vec<NamedObject> {
    match obj.core().params.get(attr) {
        Some(ParamValue::Objects(members)) => members.clone(),
        _ => Vec::new(),
    }
}
