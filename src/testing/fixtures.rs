//! Fixture components and a pre-populated registry.
//!
//! A miniature component package under the logical root
//! `parabase_fixtures`: plain objects, a parent/child pair with tag
//! overrides, composites, an estimator, a base class, a private module
//! and a module with a missing soft dependency. [`fixture_registry`]
//! returns a registry with all of it registered.
//!
//! Constructor helpers `expect` on their own schemas; fixture
//! construction is infallible by construction.

use crate::error::Result;
use crate::flags::FlagMap;
use crate::lookup::{ModuleRecord, Registry};
use crate::object::{meta, BaseObject, ClassDescriptor, Estimator, ObjectCore, ParamSpec};
use crate::value::{NamedObject, ParamMap, ParamValue};

fn no_flags() -> FlagMap {
    FlagMap::new()
}

macro_rules! impl_plain_base_object {
    ($ty:ident) => {
        impl BaseObject for $ty {
            fn core(&self) -> &ObjectCore {
                &self.core
            }
            fn core_mut(&mut self) -> &mut ObjectCore {
                &mut self.core
            }
            fn dyn_clone(&self) -> Box<dyn BaseObject> {
                Box::new($ty {
                    core: self.core.clone(),
                })
            }
            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
        }
    };
}

// ---------------------------------------------------------------------
// MockObject / MockChild

fn default_a() -> ParamValue {
    ParamValue::Int(42)
}

fn default_b() -> ParamValue {
    ParamValue::str("mock")
}

fn default_c() -> ParamValue {
    ParamValue::Bool(false)
}

static SCALAR_PARAMS: [ParamSpec; 3] = [
    ParamSpec::optional("a", default_a),
    ParamSpec::optional("b", default_b),
    ParamSpec::optional("c", default_c),
];

fn mock_object_tags() -> FlagMap {
    FlagMap::from([
        ("capability:feature".to_string(), ParamValue::str("A")),
        ("fixture_level".to_string(), ParamValue::Int(1)),
    ])
}

pub static MOCK_OBJECT: ClassDescriptor = ClassDescriptor {
    name: "MockObject",
    module: "parabase_fixtures::objects",
    description: "Plain component with scalar parameters",
    authors: &["parabase developers"],
    parent: None,
    params: &SCALAR_PARAMS,
    tags: mock_object_tags,
    config: no_flags,
    construct: construct_mock_object,
    test_params: None,
    clone_plugins: None,
    is_base: false,
};

#[derive(Debug)]
pub struct MockObject {
    core: ObjectCore,
}

impl MockObject {
    pub fn new() -> Self {
        Self {
            core: ObjectCore::build(&MOCK_OBJECT, &ParamMap::new())
                .expect("defaults cover all parameters"),
        }
    }
}

impl Default for MockObject {
    fn default() -> Self {
        Self::new()
    }
}

impl_plain_base_object!(MockObject);

fn construct_mock_object(params: &ParamMap) -> Result<Box<dyn BaseObject>> {
    Ok(Box::new(MockObject {
        core: ObjectCore::build(&MOCK_OBJECT, params)?,
    }))
}

fn mock_child_tags() -> FlagMap {
    FlagMap::from([("capability:feature".to_string(), ParamValue::str("B"))])
}

pub static MOCK_CHILD: ClassDescriptor = ClassDescriptor {
    name: "MockChild",
    module: "parabase_fixtures::objects",
    description: "Child of MockObject overriding one tag",
    authors: &["parabase developers"],
    parent: Some(&MOCK_OBJECT),
    params: &SCALAR_PARAMS,
    tags: mock_child_tags,
    config: no_flags,
    construct: construct_mock_child,
    test_params: None,
    clone_plugins: None,
    is_base: false,
};

#[derive(Debug)]
pub struct MockChild {
    core: ObjectCore,
}

impl MockChild {
    pub fn new() -> Self {
        Self {
            core: ObjectCore::build(&MOCK_CHILD, &ParamMap::new())
                .expect("defaults cover all parameters"),
        }
    }
}

impl Default for MockChild {
    fn default() -> Self {
        Self::new()
    }
}

impl_plain_base_object!(MockChild);

fn construct_mock_child(params: &ParamMap) -> Result<Box<dyn BaseObject>> {
    Ok(Box::new(MockChild {
        core: ObjectCore::build(&MOCK_CHILD, params)?,
    }))
}

// ---------------------------------------------------------------------
// MockBadConstructor: stores `a` incremented, violating the blueprint
// contract. Cloning it must fail.

fn default_zero() -> ParamValue {
    ParamValue::Int(0)
}

static BAD_PARAMS: [ParamSpec; 1] = [ParamSpec::optional("a", default_zero)];

pub static MOCK_BAD_CONSTRUCTOR: ClassDescriptor = ClassDescriptor {
    name: "MockBadConstructor",
    module: "parabase_fixtures::objects",
    description: "Component whose constructor modifies a parameter",
    authors: &["parabase developers"],
    parent: Some(&MOCK_OBJECT),
    params: &BAD_PARAMS,
    tags: no_flags,
    config: no_flags,
    construct: construct_mock_bad,
    test_params: None,
    clone_plugins: None,
    is_base: false,
};

#[derive(Debug)]
pub struct MockBadConstructor {
    core: ObjectCore,
}

impl MockBadConstructor {
    pub fn new() -> Self {
        Self {
            core: bad_core(&ParamMap::new()).expect("defaults cover all parameters"),
        }
    }
}

impl Default for MockBadConstructor {
    fn default() -> Self {
        Self::new()
    }
}

impl_plain_base_object!(MockBadConstructor);

fn bad_core(params: &ParamMap) -> Result<ObjectCore> {
    let mut core = ObjectCore::build(&MOCK_BAD_CONSTRUCTOR, params)?;
    let a = core.param("a")?.as_int().unwrap_or(0);
    core.params.insert("a".to_string(), ParamValue::Int(a + 1));
    Ok(core)
}

fn construct_mock_bad(params: &ParamMap) -> Result<Box<dyn BaseObject>> {
    Ok(Box::new(MockBadConstructor {
        core: bad_core(params)?,
    }))
}

// ---------------------------------------------------------------------
// MockRequired: a required parameter and no test-parameter provider.

static REQUIRED_PARAMS: [ParamSpec; 1] = [ParamSpec::required("q")];

pub static MOCK_REQUIRED: ClassDescriptor = ClassDescriptor {
    name: "MockRequired",
    module: "parabase_fixtures::objects",
    description: "Component with a required parameter",
    authors: &["parabase developers"],
    parent: None,
    params: &REQUIRED_PARAMS,
    tags: no_flags,
    config: no_flags,
    construct: construct_mock_required,
    test_params: None,
    clone_plugins: None,
    is_base: false,
};

#[derive(Debug)]
pub struct MockRequired {
    core: ObjectCore,
}

impl_plain_base_object!(MockRequired);

fn construct_mock_required(params: &ParamMap) -> Result<Box<dyn BaseObject>> {
    Ok(Box::new(MockRequired {
        core: ObjectCore::build(&MOCK_REQUIRED, params)?,
    }))
}

// ---------------------------------------------------------------------
// BaseHandler: explicit base class, excluded from crawls by default.

pub static BASE_HANDLER: ClassDescriptor = ClassDescriptor {
    name: "BaseHandler",
    module: "parabase_fixtures::objects",
    description: "Fixture base class",
    authors: &["parabase developers"],
    parent: None,
    params: &[],
    tags: no_flags,
    config: no_flags,
    construct: construct_base_handler,
    test_params: None,
    clone_plugins: None,
    is_base: true,
};

#[derive(Debug)]
pub struct BaseHandler {
    core: ObjectCore,
}

impl_plain_base_object!(BaseHandler);

fn construct_base_handler(params: &ParamMap) -> Result<Box<dyn BaseObject>> {
    Ok(Box::new(BaseHandler {
        core: ObjectCore::build(&BASE_HANDLER, params)?,
    }))
}

// ---------------------------------------------------------------------
// MockComposite: one nested component parameter.

fn default_two() -> ParamValue {
    ParamValue::Int(2)
}

static COMPOSITE_PARAMS: [ParamSpec; 2] = [
    ParamSpec::required("foo"),
    ParamSpec::optional("bar", default_two),
];

fn mock_composite_test_params(_parameter_set: &str) -> Vec<ParamMap> {
    vec![ParamMap::from([(
        "foo".to_string(),
        ParamValue::object(MockObject::new()),
    )])]
}

pub static MOCK_COMPOSITE: ClassDescriptor = ClassDescriptor {
    name: "MockComposite",
    module: "parabase_fixtures::compose",
    description: "Composite holding one nested component",
    authors: &["parabase developers"],
    parent: None,
    params: &COMPOSITE_PARAMS,
    tags: no_flags,
    config: no_flags,
    construct: construct_mock_composite,
    test_params: Some(mock_composite_test_params),
    clone_plugins: None,
    is_base: false,
};

#[derive(Debug)]
pub struct MockComposite {
    core: ObjectCore,
}

impl MockComposite {
    pub fn new<T: BaseObject>(foo: T) -> Self {
        let params = ParamMap::from([("foo".to_string(), ParamValue::object(foo))]);
        Self {
            core: ObjectCore::build(&MOCK_COMPOSITE, &params)
                .expect("defaults cover the remaining parameters"),
        }
    }
}

impl_plain_base_object!(MockComposite);

fn construct_mock_composite(params: &ParamMap) -> Result<Box<dyn BaseObject>> {
    Ok(Box::new(MockComposite {
        core: ObjectCore::build(&MOCK_COMPOSITE, params)?,
    }))
}

// ---------------------------------------------------------------------
// MockPipeline: named-object collection in `steps`.

static PIPELINE_PARAMS: [ParamSpec; 1] = [ParamSpec::required("steps")];

fn mock_pipeline_tags() -> FlagMap {
    FlagMap::from([(
        "named_objects_param".to_string(),
        ParamValue::str("steps"),
    )])
}

fn mock_pipeline_test_params(_parameter_set: &str) -> Vec<ParamMap> {
    let single = ParamValue::Objects(vec![NamedObject::new(
        "first",
        Box::new(MockObject::new()),
    )]);
    let double = ParamValue::Objects(vec![
        NamedObject::new("first", Box::new(MockObject::new())),
        NamedObject::new("second", Box::new(MockChild::new())),
    ]);
    vec![
        ParamMap::from([("steps".to_string(), single)]),
        ParamMap::from([("steps".to_string(), double)]),
    ]
}

pub static MOCK_PIPELINE: ClassDescriptor = ClassDescriptor {
    name: "MockPipeline",
    module: "parabase_fixtures::compose",
    description: "Composite over an ordered named-object collection",
    authors: &["parabase developers"],
    parent: None,
    params: &PIPELINE_PARAMS,
    tags: mock_pipeline_tags,
    config: no_flags,
    construct: construct_mock_pipeline,
    test_params: Some(mock_pipeline_test_params),
    clone_plugins: None,
    is_base: false,
};

#[derive(Debug)]
pub struct MockPipeline {
    core: ObjectCore,
}

impl MockPipeline {
    pub fn new(steps: Vec<NamedObject>) -> Self {
        let params = ParamMap::from([("steps".to_string(), ParamValue::Objects(steps))]);
        let mut core =
            ObjectCore::build(&MOCK_PIPELINE, &params).expect("steps is the only parameter");
        meta::coerce_collection(&mut core, "steps").expect("member names are valid");
        Self { core }
    }

    pub fn members(&self) -> &[NamedObject] {
        match self.core.params.get("steps") {
            Some(ParamValue::Objects(members)) => members,
            _ => &[],
        }
    }
}

impl BaseObject for MockPipeline {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn dyn_clone(&self) -> Box<dyn BaseObject> {
        Box::new(MockPipeline {
            core: self.core.clone(),
        })
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn get_params(&self, deep: bool) -> Result<ParamMap> {
        meta::get_params(self, "steps", deep)
    }

    fn set_params(&mut self, params: ParamMap) -> Result<()> {
        meta::set_params(self, "steps", params)
    }

    fn component_mut(&mut self, name: &str) -> Option<&mut Box<dyn BaseObject>> {
        meta::component_mut(self, "steps", name)
    }

    fn is_composite(&self) -> bool {
        true
    }
}

fn construct_mock_pipeline(params: &ParamMap) -> Result<Box<dyn BaseObject>> {
    let mut core = ObjectCore::build(&MOCK_PIPELINE, params)?;
    meta::coerce_collection(&mut core, "steps")?;
    Ok(Box::new(MockPipeline { core }))
}

// ---------------------------------------------------------------------
// MockEstimator: fittable component.

static ESTIMATOR_PARAMS: [ParamSpec; 1] = [ParamSpec::optional("power", default_two)];

pub static MOCK_ESTIMATOR: ClassDescriptor = ClassDescriptor {
    name: "MockEstimator",
    module: "parabase_fixtures::estimators",
    description: "Fittable component storing the mean of its input",
    authors: &["parabase developers"],
    parent: None,
    params: &ESTIMATOR_PARAMS,
    tags: no_flags,
    config: no_flags,
    construct: construct_mock_estimator,
    test_params: None,
    clone_plugins: None,
    is_base: false,
};

#[derive(Debug)]
pub struct MockEstimator {
    core: ObjectCore,
}

impl MockEstimator {
    pub fn new() -> Self {
        Self {
            core: ObjectCore::build(&MOCK_ESTIMATOR, &ParamMap::new())
                .expect("defaults cover all parameters"),
        }
    }

    pub fn fit(&mut self, data: &[f64]) {
        let mean = if data.is_empty() {
            0.0
        } else {
            data.iter().sum::<f64>() / data.len() as f64
        };
        self.core
            .state
            .insert("mean_".to_string(), ParamValue::Float(mean));
        self.mark_fitted();
    }
}

impl Default for MockEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl_plain_base_object!(MockEstimator);

impl Estimator for MockEstimator {}

fn construct_mock_estimator(params: &ParamMap) -> Result<Box<dyn BaseObject>> {
    Ok(Box::new(MockEstimator {
        core: ObjectCore::build(&MOCK_ESTIMATOR, params)?,
    }))
}

// ---------------------------------------------------------------------
// Registry-only fixtures.

pub static PRIVATE_OBJECT: ClassDescriptor = ClassDescriptor {
    name: "PrivateObject",
    module: "parabase_fixtures::_private",
    description: "Component in a non-public module",
    authors: &["parabase developers"],
    parent: None,
    params: &[],
    tags: no_flags,
    config: no_flags,
    construct: construct_private_object,
    test_params: None,
    clone_plugins: None,
    is_base: false,
};

#[derive(Debug)]
pub struct PrivateObject {
    core: ObjectCore,
}

impl_plain_base_object!(PrivateObject);

fn construct_private_object(params: &ParamMap) -> Result<Box<dyn BaseObject>> {
    Ok(Box::new(PrivateObject {
        core: ObjectCore::build(&PRIVATE_OBJECT, params)?,
    }))
}

pub static ACCELERATED_OBJECT: ClassDescriptor = ClassDescriptor {
    name: "AcceleratedObject",
    module: "parabase_fixtures::accel",
    description: "Component in a module with a missing soft dependency",
    authors: &["parabase developers"],
    parent: None,
    params: &[],
    tags: no_flags,
    config: no_flags,
    construct: construct_accelerated_object,
    test_params: None,
    clone_plugins: None,
    is_base: false,
};

#[derive(Debug)]
pub struct AcceleratedObject {
    core: ObjectCore,
}

impl_plain_base_object!(AcceleratedObject);

fn construct_accelerated_object(params: &ParamMap) -> Result<Box<dyn BaseObject>> {
    Ok(Box::new(AcceleratedObject {
        core: ObjectCore::build(&ACCELERATED_OBJECT, params)?,
    }))
}

/// A registry with the whole fixture package registered.
pub fn fixture_registry() -> Registry {
    let mut registry = Registry::new();
    let modules = vec![
        ModuleRecord::new("parabase_fixtures")
            .export("objects")
            .export("compose")
            .export("estimators")
            .author("parabase developers"),
        ModuleRecord::new("parabase_fixtures::objects")
            .class(&MOCK_OBJECT)
            .class(&MOCK_CHILD)
            .class(&MOCK_BAD_CONSTRUCTOR)
            .class(&MOCK_REQUIRED)
            .class(&BASE_HANDLER)
            .function("make_mock_grid", "Build a grid of mock objects for smoke tests"),
        ModuleRecord::new("parabase_fixtures::compose")
            .class(&MOCK_COMPOSITE)
            .class(&MOCK_PIPELINE),
        ModuleRecord::new("parabase_fixtures::estimators").class(&MOCK_ESTIMATOR),
        ModuleRecord::new("parabase_fixtures::_private").class(&PRIVATE_OBJECT),
        ModuleRecord::new("parabase_fixtures::accel")
            .class(&ACCELERATED_OBJECT)
            .missing_dependency("fastmath"),
        ModuleRecord::new("parabase_fixtures::tests").class(&MOCK_OBJECT),
    ];
    for module in modules {
        registry
            .register_module(module)
            .expect("fixture module paths are unique");
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_classes_construct_from_their_test_params() {
        for desc in [&MOCK_OBJECT, &MOCK_CHILD, &MOCK_COMPOSITE, &MOCK_PIPELINE] {
            let instances = desc.create_test_instances_and_names("default").unwrap();
            assert!(!instances.is_empty(), "{} built no instances", desc.name);
        }
    }

    #[test]
    fn registry_covers_all_fixture_modules() {
        let registry = fixture_registry();
        assert!(registry.module("parabase_fixtures::objects").is_some());
        assert!(registry.module("parabase_fixtures::accel").is_some());
        assert_eq!(registry.modules_under("parabase_fixtures").len(), 7);
    }
}
