//! Declarative class schema and per-instance parameter storage.
//!
//! Every component type is described by one `static` [`ClassDescriptor`]:
//! its parameter declaration, class-level tag/config flags, parent link,
//! constructor and optional test-parameter provider. Descriptors are the
//! single source of truth for parameter names and defaults; instances only
//! hold values.
//!
//! Class identity is descriptor address identity. Two objects are instances
//! of the same class exactly when their descriptors are the same `static`.

use std::collections::BTreeMap;
use std::fmt;

use crate::clone::CloneStrategy;
use crate::error::{Error, Result};
use crate::flags::{self, FlagMap, FlagScope};
use crate::object::BaseObject;
use crate::value::{ParamMap, ParamValue};

/// One declared constructor parameter.
#[derive(Debug)]
pub struct ParamSpec {
    pub name: &'static str,
    /// `None` marks a required parameter.
    pub default: Option<fn() -> ParamValue>,
}

impl ParamSpec {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            default: None,
        }
    }

    pub const fn optional(name: &'static str, default: fn() -> ParamValue) -> Self {
        Self {
            name,
            default: Some(default),
        }
    }
}

/// Constructs a boxed instance from a full (or default-completable)
/// parameter map.
pub type Constructor = fn(&ParamMap) -> Result<Box<dyn BaseObject>>;

/// Provider of test parameter sets, keyed by a named parameter-set label.
pub type TestParamsFn = fn(&str) -> Vec<ParamMap>;

/// Static description of a component class.
pub struct ClassDescriptor {
    pub name: &'static str,
    /// Logical `::`-separated module path, used by the discovery engine.
    pub module: &'static str,
    pub description: &'static str,
    pub authors: &'static [&'static str],
    /// Explicit extends chain; flag resolution and type filtering walk it.
    pub parent: Option<&'static ClassDescriptor>,
    /// Ordered parameter declaration.
    pub params: &'static [ParamSpec],
    /// Class-level tag declaration (immutable after definition).
    pub tags: fn() -> FlagMap,
    /// Class-level config declaration (immutable after definition).
    pub config: fn() -> FlagMap,
    pub construct: Constructor,
    /// `Some` marks an explicit test-parameter override; `None` falls back
    /// to default construction and fails fast when a parameter has no
    /// default.
    pub test_params: Option<TestParamsFn>,
    /// Clone strategies prepended ahead of the default chain.
    pub clone_plugins: Option<fn() -> Vec<Box<dyn CloneStrategy>>>,
    /// Explicit base-class marker for the discovery engine, in addition to
    /// the `Base`/`_` naming convention.
    pub is_base: bool,
}

impl fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("name", &self.name)
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}

impl ClassDescriptor {
    /// Declared parameter names, in declaration order or sorted.
    pub fn param_names(&self, sort: bool) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.params.iter().map(|p| p.name).collect();
        if sort {
            names.sort_unstable();
        }
        names
    }

    /// Defaults of all parameters that declare one.
    pub fn param_defaults(&self) -> ParamMap {
        self.params
            .iter()
            .filter_map(|p| p.default.map(|d| (p.name.to_string(), d())))
            .collect()
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.params.iter().any(|p| p.name == name)
    }

    /// Whether `self` is `other` or a (transitive) child of it.
    pub fn is_descendant_of(&self, other: &ClassDescriptor) -> bool {
        let mut cursor = Some(self);
        while let Some(d) = cursor {
            if std::ptr::eq(d, other) {
                return true;
            }
            cursor = d.parent;
        }
        false
    }

    /// Resolved class-level tags (own declaration over ancestors).
    pub fn class_tags(&'static self) -> FlagMap {
        flags::class_flags(self, FlagScope::Tags)
    }

    /// One resolved class-level tag.
    pub fn class_tag(&'static self, key: &str) -> Option<ParamValue> {
        flags::class_flag(self, FlagScope::Tags, key)
    }

    /// Resolved class-level config (own declaration over ancestors, over
    /// protocol defaults).
    pub fn class_config(&'static self) -> FlagMap {
        flags::class_flags(self, FlagScope::Config)
    }

    /// Name of the named-object collection parameter, for composites that
    /// declare one via the `named_objects_param` class tag.
    pub fn named_objects_param(&'static self) -> Option<String> {
        self.class_tag("named_objects_param")
            .and_then(|v| v.as_str().map(str::to_string))
    }

    /// Test parameter sets for this class.
    ///
    /// Without an explicit provider the default is a single empty set, so
    /// construction runs on declared defaults; classes with required
    /// parameters must supply a provider or this fails fast.
    pub fn get_test_params(&'static self, parameter_set: &str) -> Result<Vec<ParamMap>> {
        match self.test_params {
            Some(provider) => Ok(provider(parameter_set)),
            None => {
                let missing: Vec<String> = self
                    .params
                    .iter()
                    .filter(|p| p.default.is_none())
                    .map(|p| p.name.to_string())
                    .collect();
                if missing.is_empty() {
                    Ok(vec![ParamMap::new()])
                } else {
                    Err(Error::MissingTestParams {
                        class: self.name,
                        params: missing,
                    })
                }
            }
        }
    }

    /// Construct one instance from the first test parameter set.
    pub fn create_test_instance(&'static self, parameter_set: &str) -> Result<Box<dyn BaseObject>> {
        let params = self
            .get_test_params(parameter_set)?
            .into_iter()
            .next()
            .unwrap_or_default();
        self.construct_test(params)
    }

    /// Construct one instance per test parameter set, paired with a unique
    /// display name: the class name alone for a single set, `Name-i`
    /// (0-based) otherwise.
    pub fn create_test_instances_and_names(
        &'static self,
        parameter_set: &str,
    ) -> Result<Vec<(String, Box<dyn BaseObject>)>> {
        let sets = self.get_test_params(parameter_set)?;
        let single = sets.len() == 1;
        sets.into_iter()
            .enumerate()
            .map(|(i, params)| {
                let name = if single {
                    self.name.to_string()
                } else {
                    format!("{}-{i}", self.name)
                };
                Ok((name, self.construct_test(params)?))
            })
            .collect()
    }

    fn construct_test(&'static self, params: ParamMap) -> Result<Box<dyn BaseObject>> {
        let rendered = ParamValue::Map(params.clone()).to_string();
        (self.construct)(&params).map_err(|e| Error::TestConstruction {
            class: self.name,
            params: rendered,
            source: Box::new(e),
        })
    }
}

/// Per-instance storage: declared parameter values, dynamic flag override
/// layers and transient post-construction state.
#[derive(Debug, Clone)]
pub struct ObjectCore {
    pub desc: &'static ClassDescriptor,
    /// Values for exactly the declared parameters.
    pub params: ParamMap,
    pub tags_dynamic: FlagMap,
    pub config_dynamic: FlagMap,
    /// Post-construction instance state. Cleared by `reset`, except
    /// entries whose key contains the `__` separator.
    pub state: BTreeMap<String, ParamValue>,
}

impl ObjectCore {
    /// Validate a parameter map against the schema and store it, filling
    /// declared defaults for absent keys.
    pub fn build(desc: &'static ClassDescriptor, params: &ParamMap) -> Result<Self> {
        let unknown: Vec<String> = params
            .keys()
            .filter(|k| !desc.has_param(k))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(Error::UnknownParams {
                class: desc.name,
                keys: unknown,
            });
        }

        let mut stored = ParamMap::new();
        let mut missing = Vec::new();
        for spec in desc.params {
            match params.get(spec.name) {
                Some(v) => {
                    stored.insert(spec.name.to_string(), v.clone());
                }
                None => match spec.default {
                    Some(default) => {
                        stored.insert(spec.name.to_string(), default());
                    }
                    None => missing.push(spec.name.to_string()),
                },
            }
        }
        if !missing.is_empty() {
            return Err(Error::MissingParams {
                class: desc.name,
                keys: missing,
            });
        }

        Ok(Self {
            desc,
            params: stored,
            tags_dynamic: FlagMap::new(),
            config_dynamic: FlagMap::new(),
            state: BTreeMap::new(),
        })
    }

    /// Stored value of a declared parameter; a declared-but-absent
    /// parameter is a constructor-contract violation.
    pub fn param(&self, name: &str) -> Result<&ParamValue> {
        self.params.get(name).ok_or(Error::ParamNotStored {
            class: self.desc.name,
            param: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{
        MOCK_CHILD, MOCK_COMPOSITE, MOCK_OBJECT, MOCK_PIPELINE, MOCK_REQUIRED,
    };

    #[test]
    fn param_names_in_declaration_then_sorted_order() {
        assert_eq!(MOCK_OBJECT.param_names(false), vec!["a", "b", "c"]);
        assert_eq!(MOCK_OBJECT.param_names(true), vec!["a", "b", "c"]);
    }

    #[test]
    fn defaults_cover_only_optional_params() {
        let defaults = MOCK_COMPOSITE.param_defaults();
        assert!(!defaults.contains_key("foo"));
        assert_eq!(defaults.get("bar"), Some(&ParamValue::Int(2)));
    }

    #[test]
    fn build_rejects_unknown_keys() {
        let params = ParamMap::from([("nope".to_string(), ParamValue::Int(1))]);
        let err = ObjectCore::build(&MOCK_OBJECT, &params).unwrap_err();
        assert!(matches!(err, Error::UnknownParams { .. }));
    }

    #[test]
    fn build_rejects_missing_required_keys() {
        let err = ObjectCore::build(&MOCK_COMPOSITE, &ParamMap::new()).unwrap_err();
        assert!(matches!(err, Error::MissingParams { ref keys, .. } if keys == &["foo"]));
    }

    #[test]
    fn build_fills_defaults() {
        let core = ObjectCore::build(&MOCK_OBJECT, &ParamMap::new()).unwrap();
        assert_eq!(core.params.get("a"), Some(&ParamValue::Int(42)));
    }

    #[test]
    fn descendant_check_walks_the_parent_chain() {
        assert!(MOCK_CHILD.is_descendant_of(&MOCK_OBJECT));
        assert!(MOCK_CHILD.is_descendant_of(&MOCK_CHILD));
        assert!(!MOCK_OBJECT.is_descendant_of(&MOCK_CHILD));
    }

    #[test]
    fn named_objects_param_comes_from_the_class_tag() {
        assert_eq!(MOCK_PIPELINE.named_objects_param(), Some("steps".to_string()));
        assert_eq!(MOCK_OBJECT.named_objects_param(), None);
    }

    #[test]
    fn default_test_params_fail_fast_without_defaults() {
        let err = MOCK_REQUIRED.get_test_params("default").unwrap_err();
        assert!(matches!(err, Error::MissingTestParams { ref params, .. } if params == &["q"]));
    }

    #[test]
    fn test_instance_names_follow_the_set_count() {
        let singles = MOCK_OBJECT.create_test_instances_and_names("default").unwrap();
        assert_eq!(singles.len(), 1);
        assert_eq!(singles[0].0, "MockObject");

        let multi = MOCK_PIPELINE.create_test_instances_and_names("default").unwrap();
        assert!(multi.len() > 1);
        assert_eq!(multi[0].0, "MockPipeline-0");
        assert_eq!(multi[1].0, "MockPipeline-1");
    }
}
