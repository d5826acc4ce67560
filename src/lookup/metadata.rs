//! Package-level metadata rendering.
//!
//! Walks the registry like [`all_objects`](crate::lookup::all_objects)
//! but renders every visited module as a serializable metadata record
//! instead of filtering classes.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::lookup::Registry;
use crate::object::ClassDescriptor;
use crate::serialize::value_to_json_lossy;

#[derive(Debug, Clone, Serialize)]
pub struct ClassMetadata {
    pub name: String,
    pub description: String,
    pub authors: Vec<String>,
    /// Resolved class tags, rendered to JSON (lossy for opaque values).
    pub tags: BTreeMap<String, serde_json::Value>,
    /// Protocol member that is not itself a base class.
    pub is_concrete_implementation: bool,
    pub is_base_class: bool,
    /// Descends from one of the supplied base classes; vacuously true
    /// when none are supplied.
    pub is_base_object: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionMetadata {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleMetadata {
    /// Full logical path.
    pub path: String,
    /// Last path segment.
    pub name: String,
    pub classes: Vec<ClassMetadata>,
    pub functions: Vec<FunctionMetadata>,
    pub exports: Vec<String>,
    pub authors: Vec<String>,
    pub contains_concrete_class_implementations: bool,
    pub contains_base_classes: bool,
    pub contains_base_objects: bool,
}

/// Metadata for every module at or under `root`, keyed by path.
///
/// Skips ignored and non-public modules by the same rules as the object
/// crawl, and modules with a missing soft dependency with a warning.
pub fn get_package_metadata(
    registry: &Registry,
    root: &str,
    base_classes: &[&'static ClassDescriptor],
    include_non_public: bool,
    modules_to_ignore: &[String],
) -> BTreeMap<String, ModuleMetadata> {
    let mut out = BTreeMap::new();
    for module in registry.modules_under(root) {
        let segments: Vec<&str> = module.path.split("::").collect();
        if segments
            .iter()
            .any(|s| modules_to_ignore.iter().any(|ig| ig == s))
        {
            continue;
        }
        if !include_non_public && segments.iter().any(|s| s.starts_with('_')) {
            continue;
        }
        if let Some(dependency) = &module.missing_dependency {
            tracing::warn!(
                module = %module.path,
                dependency = %dependency,
                "skipping module with missing soft dependency"
            );
            continue;
        }

        let classes: Vec<ClassMetadata> = module
            .classes
            .iter()
            .map(|&desc| class_metadata(desc, base_classes))
            .collect();
        let meta = ModuleMetadata {
            path: module.path.clone(),
            name: segments.last().unwrap_or(&"").to_string(),
            functions: module
                .functions
                .iter()
                .map(|f| FunctionMetadata {
                    name: f.name.clone(),
                    description: f.description.clone(),
                })
                .collect(),
            exports: module.exports.clone(),
            authors: module.authors.clone(),
            contains_concrete_class_implementations: classes
                .iter()
                .any(|c| c.is_concrete_implementation),
            contains_base_classes: classes.iter().any(|c| c.is_base_class),
            contains_base_objects: classes.iter().any(|c| c.is_base_object),
            classes,
        };
        out.insert(module.path.clone(), meta);
    }
    out
}

fn class_metadata(
    desc: &'static ClassDescriptor,
    base_classes: &[&'static ClassDescriptor],
) -> ClassMetadata {
    let is_base_class =
        desc.is_base || desc.name.starts_with('_') || desc.name.starts_with("Base");
    let is_base_object = base_classes.is_empty()
        || base_classes.iter().any(|b| desc.is_descendant_of(b));
    ClassMetadata {
        name: desc.name.to_string(),
        description: desc.description.to_string(),
        authors: desc.authors.iter().map(|a| a.to_string()).collect(),
        tags: desc
            .class_tags()
            .iter()
            .map(|(k, v)| (k.clone(), value_to_json_lossy(v)))
            .collect(),
        is_concrete_implementation: is_base_object && !is_base_class,
        is_base_class,
        is_base_object,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{fixture_registry, BASE_HANDLER};

    #[test]
    fn modules_render_with_class_and_summary_flags() {
        let registry = fixture_registry();
        let meta = get_package_metadata(
            &registry,
            "parabase_fixtures",
            &[&BASE_HANDLER],
            false,
            &["tests".to_string()],
        );
        let objects = &meta["parabase_fixtures::objects"];
        assert_eq!(objects.name, "objects");
        assert!(objects.contains_base_classes);
        assert!(objects.contains_concrete_class_implementations);

        let handler = objects
            .classes
            .iter()
            .find(|c| c.name == "BaseHandler")
            .unwrap();
        assert!(handler.is_base_class);
        assert!(!handler.is_concrete_implementation);
    }

    #[test]
    fn base_descent_drives_the_base_object_flag() {
        let registry = fixture_registry();
        let meta = get_package_metadata(
            &registry,
            "parabase_fixtures",
            &[&BASE_HANDLER],
            false,
            &[],
        );
        let objects = &meta["parabase_fixtures::objects"];
        let mock = objects.classes.iter().find(|c| c.name == "MockObject").unwrap();
        // MockObject does not extend BaseHandler
        assert!(!mock.is_base_object);
    }

    #[test]
    fn non_public_and_missing_dependency_modules_are_skipped() {
        let registry = fixture_registry();
        let meta =
            get_package_metadata(&registry, "parabase_fixtures", &[], false, &[]);
        assert!(!meta.contains_key("parabase_fixtures::_private"));
        assert!(!meta.contains_key("parabase_fixtures::accel"));

        let with_private =
            get_package_metadata(&registry, "parabase_fixtures", &[], true, &[]);
        assert!(with_private.contains_key("parabase_fixtures::_private"));
    }

    #[test]
    fn metadata_serializes_to_json() {
        let registry = fixture_registry();
        let meta = get_package_metadata(&registry, "parabase_fixtures", &[], false, &[]);
        let json = serde_json::to_value(&meta).unwrap();
        assert!(json["parabase_fixtures::objects"]["classes"].is_array());
    }

    #[test]
    fn class_tags_render_into_metadata() {
        let registry = fixture_registry();
        let meta = get_package_metadata(&registry, "parabase_fixtures", &[], false, &[]);
        let objects = &meta["parabase_fixtures::objects"];
        let mock = objects.classes.iter().find(|c| c.name == "MockObject").unwrap();
        assert_eq!(
            mock.tags.get("capability:feature"),
            Some(&serde_json::Value::String("A".to_string()))
        );
    }
}
