//! Deep structural equality over parameter values.
//!
//! [`deep_equals`] answers yes/no; [`deep_equals_msg`] additionally builds
//! a human-readable path to the first discrepancy, used by clone validation
//! to report exactly where a reconstructed object diverged. The two share
//! one comparison walk, so equality semantics cannot drift.
//!
//! Numeric comparison is NaN-aware (`NaN == NaN` holds). Variants never
//! compare equal across kinds; `Int(1)` and `Float(1.0)` differ.

use crate::value::ParamValue;

/// True when the two values are deep-structurally equal.
pub fn deep_equals(a: &ParamValue, b: &ParamValue) -> bool {
    deep_equals_msg(a, b).is_none()
}

/// `None` when equal, otherwise a message locating the first discrepancy.
pub fn deep_equals_msg(a: &ParamValue, b: &ParamValue) -> Option<String> {
    diff(a, b, "value")
}

fn diff(a: &ParamValue, b: &ParamValue, path: &str) -> Option<String> {
    use ParamValue::*;
    match (a, b) {
        (Null, Null) => None,
        (Bool(x), Bool(y)) if x == y => None,
        (Int(x), Int(y)) if x == y => None,
        (Float(x), Float(y)) if x == y || (x.is_nan() && y.is_nan()) => None,
        (Str(x), Str(y)) if x == y => None,
        (List(xs), List(ys)) => {
            if xs.len() != ys.len() {
                return Some(format!(
                    "{path}: list lengths differ, {} != {}",
                    xs.len(),
                    ys.len()
                ));
            }
            xs.iter()
                .zip(ys)
                .enumerate()
                .find_map(|(i, (x, y))| diff(x, y, &format!("{path}[{i}]")))
        }
        (Map(xs), Map(ys)) => {
            if let Some(k) = xs.keys().find(|k| !ys.contains_key(*k)) {
                return Some(format!("{path}: key `{k}` missing on the right"));
            }
            if let Some(k) = ys.keys().find(|k| !xs.contains_key(*k)) {
                return Some(format!("{path}: key `{k}` missing on the left"));
            }
            xs.iter()
                .find_map(|(k, x)| diff(x, &ys[k], &format!("{path}.{k}")))
        }
        (Object(x), Object(y)) => diff_object(x.as_ref(), y.as_ref(), path),
        (Objects(xs), Objects(ys)) => {
            if xs.len() != ys.len() {
                return Some(format!(
                    "{path}: member counts differ, {} != {}",
                    xs.len(),
                    ys.len()
                ));
            }
            xs.iter().zip(ys).enumerate().find_map(|(i, (x, y))| {
                if x.name != y.name {
                    return Some(format!(
                        "{path}[{i}]: member names differ, `{}` != `{}`",
                        x.name, y.name
                    ));
                }
                diff_object(
                    x.object.as_ref(),
                    y.object.as_ref(),
                    &format!("{path}.{}", x.name),
                )
            })
        }
        (Class(x), Class(y)) => {
            if std::ptr::eq(*x, *y) {
                None
            } else {
                Some(format!(
                    "{path}: class references differ, `{}` != `{}`",
                    x.name, y.name
                ))
            }
        }
        (Foreign(x), Foreign(y)) => {
            if x.deep_eq(y.as_ref()) {
                None
            } else {
                Some(format!(
                    "{path}: foreign objects differ, type `{}`",
                    x.type_name()
                ))
            }
        }
        (Opaque(x), Opaque(y)) => {
            if x.ptr_eq(y) {
                None
            } else {
                Some(format!("{path}: opaque handles differ"))
            }
        }
        _ if a.kind() == b.kind() => Some(format!("{path}: values differ, {a} != {b}")),
        _ => Some(format!(
            "{path}: value kinds differ, {} != {}; values {a} != {b}",
            a.kind(),
            b.kind()
        )),
    }
}

fn diff_object(
    x: &dyn crate::object::BaseObject,
    y: &dyn crate::object::BaseObject,
    path: &str,
) -> Option<String> {
    let (dx, dy) = (x.descriptor(), y.descriptor());
    if !std::ptr::eq(dx, dy) {
        return Some(format!(
            "{path}: object classes differ, `{}` != `{}`",
            dx.name, dy.name
        ));
    }
    let (px, py) = (&x.core().params, &y.core().params);
    if let Some(k) = px.keys().find(|k| !py.contains_key(*k)) {
        return Some(format!("{path}: parameter `{k}` missing on the right"));
    }
    if let Some(k) = py.keys().find(|k| !px.contains_key(*k)) {
        return Some(format!("{path}: parameter `{k}` missing on the left"));
    }
    px.iter()
        .find_map(|(k, v)| diff(v, &py[k], &format!("{path}.{k}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn equal_scalars_produce_no_message() {
        assert_eq!(deep_equals_msg(&ParamValue::Int(5), &ParamValue::Int(5)), None);
        assert!(deep_equals(&ParamValue::str("a"), &ParamValue::str("a")));
    }

    #[test]
    fn nan_compares_equal_to_nan() {
        assert!(deep_equals(
            &ParamValue::Float(f64::NAN),
            &ParamValue::Float(f64::NAN)
        ));
    }

    #[test]
    fn kind_mismatch_is_unequal() {
        assert!(!deep_equals(&ParamValue::Int(1), &ParamValue::Float(1.0)));
    }

    #[test]
    fn message_locates_nested_discrepancy() {
        let a = ParamValue::Map(BTreeMap::from([(
            "inner".to_string(),
            ParamValue::List(vec![ParamValue::Int(1), ParamValue::Int(2)]),
        )]));
        let b = ParamValue::Map(BTreeMap::from([(
            "inner".to_string(),
            ParamValue::List(vec![ParamValue::Int(1), ParamValue::Int(3)]),
        )]));
        let msg = deep_equals_msg(&a, &b).unwrap();
        assert!(msg.contains("value.inner[1]"), "unexpected message: {msg}");
    }

    #[test]
    fn map_key_sets_must_match() {
        let a = ParamValue::Map(BTreeMap::from([("x".to_string(), ParamValue::Null)]));
        let b = ParamValue::Map(BTreeMap::new());
        let msg = deep_equals_msg(&a, &b).unwrap();
        assert!(msg.contains("`x`"));
    }
}
