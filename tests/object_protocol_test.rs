//! End-to-end tests of the object protocol: routed parameter updates,
//! aliasing, composite behavior, cloning and blueprint serialization.

use parabase::object::meta;
use parabase::serialize;
use parabase::testing::fixtures::{
    fixture_registry, MockChild, MockComposite, MockEstimator, MockObject, MockPipeline,
    MOCK_PIPELINE,
};
use parabase::{
    BaseObject, Error, Estimator, FlagMap, NamedObject, ParamMap, ParamValue,
};

fn params(pairs: &[(&str, ParamValue)]) -> ParamMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn two_step_pipeline() -> MockPipeline {
    MockPipeline::new(vec![
        NamedObject::new("first", Box::new(MockObject::new())),
        NamedObject::new("second", Box::new(MockChild::new())),
    ])
}

#[test]
fn configure_a_pipeline_with_mixed_key_styles() {
    let mut pipeline = two_step_pipeline();
    pipeline
        .set_params(params(&[
            ("first__a", ParamValue::Int(1)),
            ("second__b", ParamValue::str("tuned")),
        ]))
        .unwrap();

    let deep = pipeline.get_params(true).unwrap();
    assert_eq!(deep.get("first__a"), Some(&ParamValue::Int(1)));
    assert_eq!(deep.get("second__b"), Some(&ParamValue::str("tuned")));
    // untouched members keep their defaults
    assert_eq!(deep.get("second__a"), Some(&ParamValue::Int(42)));
}

#[test]
fn ambiguous_suffixes_fail_naming_all_candidates() {
    // both members declare `a`, so the bare suffix cannot resolve
    let mut pipeline = two_step_pipeline();
    let err = pipeline
        .set_params(params(&[("a", ParamValue::Int(0))]))
        .unwrap_err();
    match err {
        Error::AmbiguousAlias { suffix, candidates, .. } => {
            assert_eq!(suffix, "a");
            assert!(candidates.contains(&"first__a".to_string()));
            assert!(candidates.contains(&"second__a".to_string()));
        }
        other => panic!("expected AmbiguousAlias, got {other:?}"),
    }
}

#[test]
fn unique_suffixes_resolve_across_two_nesting_levels() {
    let mut nested = MockComposite::new(MockComposite::new(MockObject::new()));
    // `a` only occurs at foo__foo__a
    nested.set_params(params(&[("a", ParamValue::Int(5))])).unwrap();
    let deep = nested.get_params(true).unwrap();
    assert_eq!(deep.get("foo__foo__a"), Some(&ParamValue::Int(5)));
}

#[test]
fn invalid_keys_fail_after_applying_valid_ones() {
    let mut pipeline = two_step_pipeline();
    let result = pipeline.set_params(params(&[
        ("first__a", ParamValue::Int(3)),
        ("does_not_exist", ParamValue::Null),
    ]));
    assert!(matches!(result, Err(Error::InvalidParamKeys { ref keys, .. })
        if keys == &["does_not_exist"]));
    // the update is not transactional: the valid key went through
    let deep = pipeline.get_params(true).unwrap();
    assert_eq!(deep.get("first__a"), Some(&ParamValue::Int(3)));
}

#[test]
fn wholesale_replacement_renames_bare_duplicates() {
    let mut pipeline = two_step_pipeline();
    pipeline
        .set_params(params(&[(
            "steps",
            ParamValue::List(vec![
                ParamValue::object(MockObject::new()),
                ParamValue::object(MockObject::new()),
                ParamValue::object(MockChild::new()),
            ]),
        )]))
        .unwrap();
    let names: Vec<&str> = pipeline.members().iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["MockObject_1", "MockObject_2", "MockChild"]);
}

#[test]
fn member_names_shadowing_parameters_are_rejected() {
    let mut pipeline = two_step_pipeline();
    let err = pipeline
        .set_params(params(&[(
            "steps",
            ParamValue::List(vec![ParamValue::List(vec![
                ParamValue::str("steps"),
                ParamValue::object(MockObject::new()),
            ])]),
        )]))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidMemberNames { .. }));
}

#[test]
fn concatenated_pipelines_keep_all_members() {
    let left = two_step_pipeline();
    let right = MockPipeline::new(vec![NamedObject::new(
        "first",
        Box::new(MockObject::new()),
    )]);
    let joined = meta::concat(&MOCK_PIPELINE, "steps", left.members(), right.members()).unwrap();
    let deep = joined.get_params(true).unwrap();
    assert!(deep.contains_key("first_1"));
    assert!(deep.contains_key("first_2"));
    assert!(deep.contains_key("second"));
}

#[test]
fn validated_clones_match_their_original() {
    let mut pipeline = two_step_pipeline();
    pipeline.set_config(FlagMap::from([(
        "check_clone".to_string(),
        ParamValue::Bool(true),
    )]));
    pipeline
        .set_params(params(&[("first__c", ParamValue::Bool(true))]))
        .unwrap();

    let clone = pipeline.clone_object().unwrap();
    assert!(&pipeline as &dyn BaseObject == clone.as_ref());
    // config propagated through the clone
    assert_eq!(
        clone.get_config().get("check_clone"),
        Some(&ParamValue::Bool(true))
    );
}

#[test]
fn reset_rebuilds_members_from_current_params() {
    let mut pipeline = two_step_pipeline();
    pipeline
        .set_params(params(&[("first__a", ParamValue::Int(9))]))
        .unwrap();
    pipeline
        .core_mut()
        .state
        .insert("trace".to_string(), ParamValue::str("transient"));
    pipeline.reset().unwrap();

    assert!(pipeline.core().state.is_empty());
    let deep = pipeline.get_params(true).unwrap();
    assert_eq!(deep.get("first__a"), Some(&ParamValue::Int(9)));
}

#[test]
fn estimators_expose_fitted_params_after_fit() {
    let mut estimator = MockEstimator::new();
    assert!(estimator.check_is_fitted().is_err());
    estimator.fit(&[2.0, 4.0]);
    let fitted = estimator.get_fitted_params().unwrap();
    assert_eq!(fitted.get("mean"), Some(&ParamValue::Float(3.0)));
}

#[test]
fn blueprints_survive_a_json_round_trip() {
    let registry = fixture_registry();
    let mut pipeline = two_step_pipeline();
    pipeline
        .set_params(params(&[("second__a", ParamValue::Int(-3))]))
        .unwrap();

    let data = serialize::to_json_string(&pipeline).unwrap();
    let loaded = serialize::from_json_string(&registry, &data).unwrap();
    assert!(&pipeline as &dyn BaseObject == loaded.as_ref());
    assert_eq!(
        loaded.get_params(true).unwrap().get("second__a"),
        Some(&ParamValue::Int(-3))
    );
}

#[test]
fn composite_tags_aggregate_over_members() {
    let mut pipeline = two_step_pipeline();
    meta::any_tag_is_then_set(
        &mut pipeline,
        "steps",
        "capability:feature",
        ParamValue::str("B"),
        ParamValue::str("none"),
    );
    assert_eq!(
        pipeline.get_tag("capability:feature").unwrap(),
        ParamValue::str("B")
    );

    meta::first_nonnull_tag_set(&mut pipeline, "steps", "fixture_level");
    assert_eq!(pipeline.get_tag("fixture_level").unwrap(), ParamValue::Int(1));
}
