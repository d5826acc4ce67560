//! Tag and config flag resolution.
//!
//! Components carry two independent flag namespaces: **tags** (immutable
//! class metadata describing capabilities and properties) and **configs**
//! (behavioral switches such as clone validation). Both resolve with the
//! same priority: instance dynamic override, then the class declaration,
//! then ancestor declarations walking the `parent` chain. Config resolution
//! additionally bottoms out at the protocol defaults in [`base_config`].
//!
//! Class-level resolution lives here as free functions over
//! [`ClassDescriptor`]; instance-level operations (dynamic overrides,
//! `clone_tags`) are provided methods on
//! [`BaseObject`](crate::object::BaseObject).

use std::collections::BTreeMap;

use crate::object::ClassDescriptor;
use crate::value::ParamValue;

/// Which flag namespace an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagScope {
    Tags,
    Config,
}

/// Ordered map from flag key to value.
pub type FlagMap = BTreeMap<String, ParamValue>;

/// Config key gating post-clone validation.
pub const CHECK_CLONE: &str = "check_clone";

/// Config key gating config propagation to clones.
pub const CLONE_CONFIG: &str = "clone_config";

/// Protocol-level config defaults, below every class declaration.
pub fn base_config() -> FlagMap {
    FlagMap::from([
        (CHECK_CLONE.to_string(), ParamValue::Bool(false)),
        (CLONE_CONFIG.to_string(), ParamValue::Bool(true)),
    ])
}

/// Resolve all class-level flags of `desc` in one namespace.
///
/// Ancestor declarations apply first, the class's own declaration last, so
/// a class overrides its parents key by key. Config resolution starts from
/// [`base_config`].
pub fn class_flags(desc: &'static ClassDescriptor, scope: FlagScope) -> FlagMap {
    let mut chain = Vec::new();
    let mut cursor = Some(desc);
    while let Some(d) = cursor {
        chain.push(d);
        cursor = d.parent;
    }

    let mut flags = match scope {
        FlagScope::Tags => FlagMap::new(),
        FlagScope::Config => base_config(),
    };
    for d in chain.iter().rev() {
        let declared = match scope {
            FlagScope::Tags => (d.tags)(),
            FlagScope::Config => (d.config)(),
        };
        flags.extend(declared);
    }
    flags
}

/// Resolve one class-level flag, `None` when absent from the whole chain.
pub fn class_flag(
    desc: &'static ClassDescriptor,
    scope: FlagScope,
    key: &str,
) -> Option<ParamValue> {
    class_flags(desc, scope).remove(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{BASE_HANDLER, MOCK_CHILD, MOCK_OBJECT};

    #[test]
    fn class_tags_inherit_from_parents() {
        let tags = class_flags(&MOCK_CHILD, FlagScope::Tags);
        // declared only on the parent
        assert_eq!(tags.get("fixture_level"), Some(&ParamValue::Int(1)));
    }

    #[test]
    fn child_declaration_overrides_parent() {
        let parent = class_flags(&MOCK_OBJECT, FlagScope::Tags);
        let child = class_flags(&MOCK_CHILD, FlagScope::Tags);
        assert_eq!(
            parent.get("capability:feature"),
            Some(&ParamValue::str("A"))
        );
        assert_eq!(child.get("capability:feature"), Some(&ParamValue::str("B")));
    }

    #[test]
    fn config_resolution_bottoms_out_at_protocol_defaults() {
        let config = class_flags(&BASE_HANDLER, FlagScope::Config);
        assert_eq!(config.get(CHECK_CLONE), Some(&ParamValue::Bool(false)));
        assert_eq!(config.get(CLONE_CONFIG), Some(&ParamValue::Bool(true)));
    }

    #[test]
    fn tag_resolution_has_no_protocol_defaults() {
        assert_eq!(class_flag(&BASE_HANDLER, FlagScope::Tags, CHECK_CLONE), None);
    }

    #[test]
    fn missing_flag_is_none() {
        assert_eq!(class_flag(&MOCK_OBJECT, FlagScope::Tags, "no_such"), None);
    }
}
