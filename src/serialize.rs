//! Blueprint serialization to and from JSON.
//!
//! An object serializes as its class name plus shallow parameters,
//! recursively; loading reconstructs through descriptors looked up in a
//! [`Registry`]. Three tagged wrappers keep protocol values apart from
//! plain maps: `{"$object": {"class", "params"}}` for nested objects,
//! `{"$objects": [[name, object], ...]}` for named collections and
//! `{"$class": name}` for class references. Foreign and opaque values have
//! no blueprint rendering and fail.

use serde_json::{json, Map, Number, Value};

use crate::error::{Error, Result};
use crate::lookup::Registry;
use crate::object::BaseObject;
use crate::value::{NamedObject, ParamMap, ParamValue};

/// Render a parameter value as JSON.
pub fn value_to_json(value: &ParamValue) -> Result<Value> {
    match value {
        ParamValue::Null => Ok(Value::Null),
        ParamValue::Bool(b) => Ok(Value::Bool(*b)),
        ParamValue::Int(i) => Ok(Value::Number((*i).into())),
        ParamValue::Float(f) => Number::from_f64(*f).map(Value::Number).ok_or_else(|| {
            Error::NotSerializable(format!("non-finite float {f}"))
        }),
        ParamValue::Str(s) => Ok(Value::String(s.clone())),
        ParamValue::List(items) => Ok(Value::Array(
            items.iter().map(value_to_json).collect::<Result<_>>()?,
        )),
        ParamValue::Map(entries) => {
            let mut map = Map::new();
            for (k, v) in entries {
                map.insert(k.clone(), value_to_json(v)?);
            }
            Ok(Value::Object(map))
        }
        ParamValue::Object(obj) => to_json(obj.as_ref()),
        ParamValue::Objects(members) => Ok(json!({
            "$objects": members
                .iter()
                .map(|m| Ok(json!([m.name, to_json(m.object.as_ref())?])))
                .collect::<Result<Vec<_>>>()?,
        })),
        ParamValue::Class(desc) => Ok(json!({ "$class": desc.name })),
        ParamValue::Foreign(handle) => Err(Error::NotSerializable(format!(
            "foreign object of type `{}`",
            handle.type_name()
        ))),
        ParamValue::Opaque(_) => {
            Err(Error::NotSerializable("opaque value".to_string()))
        }
    }
}

/// Like [`value_to_json`], rendering unserializable values as their
/// display string instead of failing. For metadata output.
pub fn value_to_json_lossy(value: &ParamValue) -> Value {
    value_to_json(value).unwrap_or_else(|_| Value::String(value.to_string()))
}

/// Render an object blueprint as JSON.
pub fn to_json(obj: &dyn BaseObject) -> Result<Value> {
    let mut params = Map::new();
    for (key, value) in &obj.core().params {
        params.insert(key.clone(), value_to_json(value)?);
    }
    Ok(json!({
        "$object": {
            "class": obj.descriptor().name,
            "params": params,
        }
    }))
}

/// Render an object blueprint as a JSON string.
pub fn to_json_string(obj: &dyn BaseObject) -> Result<String> {
    serde_json::to_string_pretty(&to_json(obj)?)
        .map_err(|e| Error::NotSerializable(e.to_string()))
}

/// Parse JSON into a parameter value, reconstructing objects through
/// classes registered in `registry`.
pub fn json_to_value(registry: &Registry, value: &Value) -> Result<ParamValue> {
    match value {
        Value::Null => Ok(ParamValue::Null),
        Value::Bool(b) => Ok(ParamValue::Bool(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(ParamValue::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(ParamValue::Float(f))
            } else {
                Err(Error::NotSerializable(format!("unrepresentable number {n}")))
            }
        }
        Value::String(s) => Ok(ParamValue::Str(s.clone())),
        Value::Array(items) => Ok(ParamValue::List(
            items
                .iter()
                .map(|v| json_to_value(registry, v))
                .collect::<Result<_>>()?,
        )),
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(spec) = map.get("$object") {
                    return Ok(ParamValue::Object(object_from_spec(registry, spec)?));
                }
                if let Some(Value::Array(members)) = map.get("$objects") {
                    let members = members
                        .iter()
                        .map(|entry| match entry.as_array().map(Vec::as_slice) {
                            Some([Value::String(name), object]) => {
                                match json_to_value(registry, object)? {
                                    ParamValue::Object(o) => Ok(NamedObject::new(name, o)),
                                    _ => Err(Error::NotSerializable(
                                        "collection entries must be objects".to_string(),
                                    )),
                                }
                            }
                            _ => Err(Error::NotSerializable(
                                "collection entries must be [name, object] pairs".to_string(),
                            )),
                        })
                        .collect::<Result<_>>()?;
                    return Ok(ParamValue::Objects(members));
                }
                if let Some(Value::String(name)) = map.get("$class") {
                    let desc = registry
                        .find_class(name)
                        .ok_or_else(|| Error::UnknownClass(name.clone()))?;
                    return Ok(ParamValue::Class(desc));
                }
            }
            let mut entries = ParamMap::new();
            for (k, v) in map {
                entries.insert(k.clone(), json_to_value(registry, v)?);
            }
            Ok(ParamValue::Map(entries))
        }
    }
}

/// Reconstruct an object from its JSON blueprint.
pub fn from_json(registry: &Registry, value: &Value) -> Result<Box<dyn BaseObject>> {
    match value.get("$object") {
        Some(spec) => object_from_spec(registry, spec),
        None => Err(Error::NotSerializable(
            "expected an `$object` blueprint at the top level".to_string(),
        )),
    }
}

/// Reconstruct an object from a JSON string.
pub fn from_json_string(registry: &Registry, data: &str) -> Result<Box<dyn BaseObject>> {
    let value: Value =
        serde_json::from_str(data).map_err(|e| Error::NotSerializable(e.to_string()))?;
    from_json(registry, &value)
}

fn object_from_spec(registry: &Registry, spec: &Value) -> Result<Box<dyn BaseObject>> {
    let class = spec
        .get("class")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::NotSerializable("blueprint without a class name".to_string()))?;
    let desc = registry
        .find_class(class)
        .ok_or_else(|| Error::UnknownClass(class.to_string()))?;
    let mut params = ParamMap::new();
    if let Some(Value::Object(map)) = spec.get("params") {
        for (k, v) in map {
            params.insert(k.clone(), json_to_value(registry, v)?);
        }
    }
    (desc.construct)(&params)
}
