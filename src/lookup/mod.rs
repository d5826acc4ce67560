//! Component discovery over an explicit registration index.
//!
//! A [`Registry`] maps logical `::`-separated module paths to
//! [`ModuleRecord`]s listing the class descriptors, functions and exports
//! registered under them. Registration happens explicitly at process
//! start; [`global`] offers a process-wide registry, and plain local
//! registries work the same for tests and embedding.
//!
//! [`all_objects`] crawls the index under a root path and filters by type,
//! tags and name; [`metadata::get_package_metadata`] renders the whole
//! tree as metadata records.

pub mod metadata;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::object::ClassDescriptor;
use crate::utils::deep_equals::deep_equals;
use crate::value::ParamValue;

/// A registered free function: name and description only, for metadata.
#[derive(Debug, Clone)]
pub struct FunctionRecord {
    pub name: String,
    pub description: String,
}

/// One logical module in the registry.
#[derive(Debug, Clone, Default)]
pub struct ModuleRecord {
    /// Logical `::`-separated path.
    pub path: String,
    pub classes: Vec<&'static ClassDescriptor>,
    pub functions: Vec<FunctionRecord>,
    /// Declared public export list.
    pub exports: Vec<String>,
    pub authors: Vec<String>,
    /// Marks a module whose optional dependency is unavailable. Crawls
    /// skip such modules with a warning instead of failing.
    pub missing_dependency: Option<String>,
}

impl ModuleRecord {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn class(mut self, desc: &'static ClassDescriptor) -> Self {
        self.classes.push(desc);
        self
    }

    pub fn function(mut self, name: &str, description: &str) -> Self {
        self.functions.push(FunctionRecord {
            name: name.to_string(),
            description: description.to_string(),
        });
        self
    }

    pub fn export(mut self, name: &str) -> Self {
        self.exports.push(name.to_string());
        self
    }

    pub fn author(mut self, name: &str) -> Self {
        self.authors.push(name.to_string());
        self
    }

    pub fn missing_dependency(mut self, dependency: &str) -> Self {
        self.missing_dependency = Some(dependency.to_string());
        self
    }
}

/// Index of registered modules, keyed by path.
#[derive(Debug, Default)]
pub struct Registry {
    modules: BTreeMap<String, ModuleRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a complete module record. Paths are unique.
    pub fn register_module(&mut self, record: ModuleRecord) -> Result<()> {
        if self.modules.contains_key(&record.path) {
            return Err(Error::DuplicateModule(record.path));
        }
        self.modules.insert(record.path.clone(), record);
        Ok(())
    }

    /// Register one class, creating its module record on first use.
    pub fn register_class(&mut self, path: &str, desc: &'static ClassDescriptor) {
        self.modules
            .entry(path.to_string())
            .or_insert_with(|| ModuleRecord::new(path))
            .classes
            .push(desc);
    }

    pub fn module(&self, path: &str) -> Option<&ModuleRecord> {
        self.modules.get(path)
    }

    pub fn modules(&self) -> impl Iterator<Item = &ModuleRecord> {
        self.modules.values()
    }

    /// Modules at or under a root path.
    pub fn modules_under(&self, root: &str) -> Vec<&ModuleRecord> {
        let prefix = format!("{root}::");
        self.modules
            .values()
            .filter(|m| m.path == root || m.path.starts_with(&prefix))
            .collect()
    }

    /// Look up a registered class by name, anywhere in the registry.
    pub fn find_class(&self, name: &str) -> Option<&'static ClassDescriptor> {
        self.modules
            .values()
            .flat_map(|m| m.classes.iter())
            .find(|d| d.name == name)
            .copied()
    }
}

/// Process-global registry.
pub fn global() -> &'static RwLock<Registry> {
    static GLOBAL: Lazy<RwLock<Registry>> = Lazy::new(|| RwLock::new(Registry::new()));
    &GLOBAL
}

/// Type restriction of a crawl.
#[derive(Debug, Clone, Default)]
pub enum TypeFilter {
    #[default]
    Any,
    /// Descendants (inclusive) of any of the given classes.
    Classes(Vec<&'static ClassDescriptor>),
    /// Same, with classes named by alias; resolved against the query's
    /// alias table before crawling.
    Named(Vec<String>),
}

/// One condition on a tag value. Conditions on the same key combine with
/// OR, different keys with AND. A list-valued tag matches when any element
/// does.
#[derive(Debug, Clone)]
pub enum TagCondition {
    Is(ParamValue),
    AnyOf(Vec<ParamValue>),
    /// Full-match regex over string tag values.
    Matches(String),
}

enum CompiledCondition {
    Is(ParamValue),
    AnyOf(Vec<ParamValue>),
    Matches(Regex),
}

impl CompiledCondition {
    fn matches(&self, value: &ParamValue) -> bool {
        if let ParamValue::List(items) = value {
            return items.iter().any(|v| self.matches_scalar(v));
        }
        self.matches_scalar(value)
    }

    fn matches_scalar(&self, value: &ParamValue) -> bool {
        match self {
            CompiledCondition::Is(expected) => deep_equals(expected, value),
            CompiledCondition::AnyOf(options) => options.iter().any(|o| deep_equals(o, value)),
            CompiledCondition::Matches(re) => {
                value.as_str().is_some_and(|s| re.is_match(s))
            }
        }
    }
}

/// Crawl parameters for [`all_objects`].
#[derive(Debug, Clone)]
pub struct ObjectQuery {
    root: String,
    types: TypeFilter,
    exclude_names: Vec<String>,
    tag_filter: Vec<(String, Vec<TagCondition>)>,
    return_tags: Vec<String>,
    include_base_classes: bool,
    include_non_public: bool,
    modules_to_ignore: Vec<String>,
    class_lookup: BTreeMap<String, &'static ClassDescriptor>,
}

impl ObjectQuery {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            types: TypeFilter::Any,
            exclude_names: Vec::new(),
            tag_filter: Vec::new(),
            return_tags: Vec::new(),
            include_base_classes: false,
            include_non_public: false,
            modules_to_ignore: vec!["tests".to_string()],
            class_lookup: BTreeMap::new(),
        }
    }

    pub fn object_types(mut self, filter: TypeFilter) -> Self {
        self.types = filter;
        self
    }

    pub fn exclude(mut self, class_name: impl Into<String>) -> Self {
        self.exclude_names.push(class_name.into());
        self
    }

    /// Add a condition on tag `key`; repeated keys OR their conditions.
    pub fn filter_tag(mut self, key: impl Into<String>, condition: TagCondition) -> Self {
        let key = key.into();
        match self.tag_filter.iter_mut().find(|(k, _)| *k == key) {
            Some((_, conditions)) => conditions.push(condition),
            None => self.tag_filter.push((key, vec![condition])),
        }
        self
    }

    /// Resolve tag `key` for every result entry.
    pub fn return_tag(mut self, key: impl Into<String>) -> Self {
        self.return_tags.push(key.into());
        self
    }

    pub fn include_base_classes(mut self, include: bool) -> Self {
        self.include_base_classes = include;
        self
    }

    pub fn include_non_public(mut self, include: bool) -> Self {
        self.include_non_public = include;
        self
    }

    /// Replace the ignored path-segment list (default: `tests`).
    pub fn ignore_modules(mut self, segments: Vec<String>) -> Self {
        self.modules_to_ignore = segments;
        self
    }

    /// Register an alias for [`TypeFilter::Named`] resolution.
    pub fn class_alias(mut self, name: impl Into<String>, desc: &'static ClassDescriptor) -> Self {
        self.class_lookup.insert(name.into(), desc);
        self
    }

    fn resolve_types(&self) -> Result<Option<Vec<&'static ClassDescriptor>>> {
        match &self.types {
            TypeFilter::Any => Ok(None),
            TypeFilter::Classes(classes) => {
                if classes.is_empty() {
                    return Err(Error::InvalidFilter("empty type filter".to_string()));
                }
                Ok(Some(classes.clone()))
            }
            TypeFilter::Named(names) => {
                let mut classes = Vec::new();
                for name in names {
                    match self.class_lookup.get(name) {
                        Some(desc) => classes.push(*desc),
                        None => {
                            return Err(Error::InvalidFilter(format!(
                                "unknown type alias `{name}`"
                            )))
                        }
                    }
                }
                if classes.is_empty() {
                    return Err(Error::InvalidFilter("empty type filter".to_string()));
                }
                Ok(Some(classes))
            }
        }
    }

    fn compile_tag_filter(&self) -> Result<Vec<(String, Vec<CompiledCondition>)>> {
        self.tag_filter
            .iter()
            .map(|(key, conditions)| {
                let compiled = conditions
                    .iter()
                    .map(|c| match c {
                        TagCondition::Is(v) => Ok(CompiledCondition::Is(v.clone())),
                        TagCondition::AnyOf(vs) => Ok(CompiledCondition::AnyOf(vs.clone())),
                        TagCondition::Matches(pattern) => {
                            Regex::new(&format!("^(?:{pattern})$"))
                                .map(CompiledCondition::Matches)
                                .map_err(|e| {
                                    Error::InvalidFilter(format!(
                                        "bad tag pattern `{pattern}`: {e}"
                                    ))
                                })
                        }
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok((key.clone(), compiled))
            })
            .collect()
    }
}

/// One discovery result.
#[derive(Debug, Clone)]
pub struct ObjectEntry {
    pub name: String,
    pub class: &'static ClassDescriptor,
    /// Resolved return tags, in query order; `Null` where unset. `None`
    /// when the query requested no return tags.
    pub tags: Option<Vec<(String, ParamValue)>>,
}

/// Crawl the registry under the query root and return matching classes,
/// de-duplicated by (name, class identity) and sorted by name.
///
/// Malformed filters fail before any module is visited. Modules with a
/// missing soft dependency are skipped with a warning.
pub fn all_objects(registry: &Registry, query: &ObjectQuery) -> Result<Vec<ObjectEntry>> {
    let types = query.resolve_types()?;
    let tag_filter = query.compile_tag_filter()?;

    let mut seen: BTreeSet<(String, usize)> = BTreeSet::new();
    let mut entries = Vec::new();
    for module in registry.modules_under(&query.root) {
        let segments: Vec<&str> = module.path.split("::").collect();
        if segments
            .iter()
            .any(|s| query.modules_to_ignore.iter().any(|ig| ig == s))
        {
            continue;
        }
        if !query.include_non_public && segments.iter().any(|s| s.starts_with('_')) {
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

        for &desc in &module.classes {
            let base_like =
                desc.is_base || desc.name.starts_with('_') || desc.name.starts_with("Base");
            if base_like && !query.include_base_classes {
                continue;
            }
            if query.exclude_names.iter().any(|n| n == desc.name) {
                continue;
            }
            if let Some(allowed) = &types {
                if !allowed.iter().any(|t| desc.is_descendant_of(t)) {
                    continue;
                }
            }
            let tags = desc.class_tags();
            let tags_match = tag_filter.iter().all(|(key, conditions)| {
                tags.get(key)
                    .is_some_and(|v| conditions.iter().any(|c| c.matches(v)))
            });
            if !tags_match {
                continue;
            }
            if !seen.insert((desc.name.to_string(), desc as *const ClassDescriptor as usize)) {
                continue;
            }
            let returned = if query.return_tags.is_empty() {
                None
            } else {
                Some(
                    query
                        .return_tags
                        .iter()
                        .map(|k| (k.clone(), tags.get(k).cloned().unwrap_or(ParamValue::Null)))
                        .collect(),
                )
            };
            entries.push(ObjectEntry {
                name: desc.name.to_string(),
                class: desc,
                tags: returned,
            });
        }
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Tabular materialization of discovery results.
#[derive(Debug, Clone)]
pub struct ObjectTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Render entries as a table: `name`, `class`, then one column per
/// resolved return tag.
pub fn as_table(entries: &[ObjectEntry]) -> ObjectTable {
    let mut columns = vec!["name".to_string(), "class".to_string()];
    if let Some(first) = entries.iter().find_map(|e| e.tags.as_ref()) {
        columns.extend(first.iter().map(|(k, _)| k.clone()));
    }
    let rows = entries
        .iter()
        .map(|e| {
            let mut row = vec![e.name.clone(), e.class.name.to_string()];
            if let Some(tags) = &e.tags {
                row.extend(tags.iter().map(|(_, v)| v.to_string()));
            }
            row
        })
        .collect();
    ObjectTable { columns, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{fixture_registry, BASE_HANDLER, MOCK_OBJECT};

    fn names(entries: &[ObjectEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn crawl_finds_every_public_concrete_class() {
        let registry = fixture_registry();
        let found = all_objects(&registry, &ObjectQuery::new("parabase_fixtures")).unwrap();
        let found = names(&found);
        assert!(found.contains(&"MockObject"));
        assert!(found.contains(&"MockPipeline"));
        assert!(!found.contains(&"BaseHandler"));
        assert!(!found.contains(&"PrivateObject"));
    }

    #[test]
    fn results_are_sorted_and_deduplicated() {
        let registry = fixture_registry();
        let found = all_objects(&registry, &ObjectQuery::new("parabase_fixtures")).unwrap();
        let mut sorted: Vec<&str> = names(&found);
        sorted.sort_unstable();
        assert_eq!(names(&found), sorted);
        let unique: BTreeSet<&str> = names(&found).into_iter().collect();
        assert_eq!(unique.len(), found.len());
    }

    #[test]
    fn base_classes_appear_only_on_request() {
        let registry = fixture_registry();
        let query = ObjectQuery::new("parabase_fixtures").include_base_classes(true);
        let found = all_objects(&registry, &query).unwrap();
        assert!(names(&found).contains(&"BaseHandler"));
    }

    #[test]
    fn non_public_modules_appear_only_on_request() {
        let registry = fixture_registry();
        let query = ObjectQuery::new("parabase_fixtures").include_non_public(true);
        let found = all_objects(&registry, &query).unwrap();
        assert!(names(&found).contains(&"PrivateObject"));
    }

    #[test]
    fn missing_dependency_modules_are_skipped() {
        let registry = fixture_registry();
        let found = all_objects(&registry, &ObjectQuery::new("parabase_fixtures")).unwrap();
        assert!(!names(&found).contains(&"AcceleratedObject"));
    }

    #[test]
    fn type_filter_selects_descendants_inclusively() {
        let registry = fixture_registry();
        let query = ObjectQuery::new("parabase_fixtures")
            .object_types(TypeFilter::Classes(vec![&MOCK_OBJECT]));
        let found = all_objects(&registry, &query).unwrap();
        assert_eq!(names(&found), vec!["MockBadConstructor", "MockChild", "MockObject"]);
    }

    #[test]
    fn named_type_filters_resolve_before_crawling() {
        let registry = fixture_registry();
        let query = ObjectQuery::new("parabase_fixtures")
            .object_types(TypeFilter::Named(vec!["mock".to_string()]))
            .class_alias("mock", &MOCK_OBJECT);
        let found = all_objects(&registry, &query).unwrap();
        assert!(names(&found).contains(&"MockChild"));

        let bad = ObjectQuery::new("parabase_fixtures")
            .object_types(TypeFilter::Named(vec!["unknown".to_string()]));
        let err = all_objects(&registry, &bad).unwrap_err();
        assert!(matches!(err, Error::InvalidFilter(_)));
    }

    #[test]
    fn tag_conditions_or_within_a_key() {
        let registry = fixture_registry();
        let query = ObjectQuery::new("parabase_fixtures")
            .filter_tag("capability:feature", TagCondition::Is(ParamValue::str("A")))
            .filter_tag("capability:feature", TagCondition::Is(ParamValue::str("B")));
        let found = all_objects(&registry, &query).unwrap();
        assert!(names(&found).contains(&"MockObject"));
        assert!(names(&found).contains(&"MockChild"));
    }

    #[test]
    fn tag_keys_and_across_the_filter() {
        let registry = fixture_registry();
        let query = ObjectQuery::new("parabase_fixtures")
            .filter_tag("capability:feature", TagCondition::Is(ParamValue::str("A")))
            .filter_tag("fixture_level", TagCondition::Is(ParamValue::Int(99)));
        let found = all_objects(&registry, &query).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn regex_conditions_full_match() {
        let registry = fixture_registry();
        let query = ObjectQuery::new("parabase_fixtures")
            .filter_tag("capability:feature", TagCondition::Matches("[AB]".to_string()));
        let found = all_objects(&registry, &query).unwrap();
        assert!(names(&found).contains(&"MockObject"));

        // partial matches do not count
        let query = ObjectQuery::new("parabase_fixtures")
            .filter_tag("capability:feature", TagCondition::Matches("".to_string()));
        assert!(all_objects(&registry, &query).unwrap().is_empty());
    }

    #[test]
    fn malformed_patterns_fail_before_crawling() {
        let registry = fixture_registry();
        let query = ObjectQuery::new("parabase_fixtures")
            .filter_tag("capability:feature", TagCondition::Matches("(".to_string()));
        let err = all_objects(&registry, &query).unwrap_err();
        assert!(matches!(err, Error::InvalidFilter(_)));
    }

    #[test]
    fn exclusion_removes_named_classes() {
        let registry = fixture_registry();
        let query = ObjectQuery::new("parabase_fixtures").exclude("MockObject");
        let found = all_objects(&registry, &query).unwrap();
        assert!(!names(&found).contains(&"MockObject"));
        assert!(names(&found).contains(&"MockChild"));
    }

    #[test]
    fn duplicate_module_registration_is_rejected() {
        let mut registry = Registry::new();
        registry.register_module(ModuleRecord::new("pkg")).unwrap();
        let err = registry.register_module(ModuleRecord::new("pkg")).unwrap_err();
        assert!(matches!(err, Error::DuplicateModule(_)));
    }

    #[test]
    fn return_tags_materialize_in_query_order() {
        let registry = fixture_registry();
        let query = ObjectQuery::new("parabase_fixtures")
            .return_tag("capability:feature")
            .return_tag("no_such_tag");
        let found = all_objects(&registry, &query).unwrap();
        let mock = found.iter().find(|e| e.name == "MockObject").unwrap();
        let tags = mock.tags.as_ref().unwrap();
        assert_eq!(tags[0], ("capability:feature".to_string(), ParamValue::str("A")));
        assert_eq!(tags[1].1, ParamValue::Null);

        let table = as_table(&found);
        assert_eq!(table.columns[0], "name");
        assert_eq!(table.columns[2], "capability:feature");
        assert_eq!(table.rows.len(), found.len());
    }

    #[test]
    fn find_class_spans_the_whole_registry() {
        let registry = fixture_registry();
        let desc = registry.find_class("BaseHandler").unwrap();
        assert!(std::ptr::eq(desc, &BASE_HANDLER));
    }
}
