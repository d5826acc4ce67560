//! Error types for the parabase protocol.
//!
//! The taxonomy distinguishes contract violations (a component breaking the
//! protocol, e.g. a constructor that drops a parameter) from caller usage
//! errors (invalid `set_params` keys, malformed discovery filters) and
//! recoverable lookup misses. Contract violations are never retried and
//! always carry the offending class and parameter/tag name.

use thiserror::Error;

/// Errors raised by parameter, tag, clone and discovery operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A constructed object does not hold a value for a declared parameter.
    /// This is how constructor-contract violations surface in `get_params`.
    #[error(
        "`{class}` does not store a value for parameter `{param}`; \
         constructors must keep every declared parameter"
    )]
    ParamNotStored { class: &'static str, param: String },

    /// Construction was attempted with parameter names not in the schema.
    #[error("unknown parameter(s) {keys:?} for `{class}`")]
    UnknownParams {
        class: &'static str,
        keys: Vec<String>,
    },

    /// Construction was attempted without required (no-default) parameters.
    #[error("missing required parameter(s) {keys:?} for `{class}`")]
    MissingParams {
        class: &'static str,
        keys: Vec<String>,
    },

    /// `set_params` keys that could not be matched or aliased to any
    /// valid parameter path.
    #[error(
        "invalid parameter keys provided to set_params of `{class}`: {keys:?}; \
         check the list of available keys with get_params"
    )]
    InvalidParamKeys {
        class: &'static str,
        keys: Vec<String>,
    },

    /// A shorthand key is a suffix of more than one valid parameter path.
    #[error(
        "suffix `{suffix}` does not uniquely determine a parameter key of \
         `{class}`; the following parameter keys share the suffix: {candidates:?}"
    )]
    AmbiguousAlias {
        class: &'static str,
        suffix: String,
        candidates: Vec<String>,
    },

    /// Sub-parameters were routed to a parameter that is not a nested object.
    #[error("parameter `{param}` of `{class}` is not a nested object and cannot receive sub-parameters")]
    NotAComponent { class: &'static str, param: String },

    /// A tag or config flag was requested with `raise_on_missing` and is
    /// absent from the instance and its whole class ancestry.
    #[error("flag `{key}` not found; available flags: {available:?}")]
    FlagNotFound {
        key: String,
        available: Vec<String>,
    },

    /// Named-object collection member names violate the naming rules
    /// (duplicates, collision with a direct parameter, or a `__` in the name).
    #[error("invalid member name(s) in `{class}`: {detail}")]
    InvalidMemberNames { class: &'static str, detail: String },

    /// An existing member was assigned a value that is not an object.
    #[error("member `{name}` of `{class}` can only be replaced by an object value")]
    InvalidMemberValue { class: &'static str, name: String },

    /// Reconstruction during cloning produced a parameter value different
    /// from the one passed to the constructor.
    #[error(
        "cannot clone `{class}`: the constructor either does not set or \
         modifies parameter `{param}`"
    )]
    NonConformingConstructor { class: &'static str, param: String },

    /// Post-clone validation found a mismatch between original and clone.
    #[error("clone of `{class}` is non-conforming: {detail}")]
    NonConformingClone { class: &'static str, detail: String },

    /// The clone chain reached the catch-all in safe mode with a value that
    /// has no parameter interface.
    #[error(
        "cannot clone value of type `{type_name}`: it does not implement \
         the expected parameter interface"
    )]
    Uncloneable { type_name: String },

    /// Malformed discovery filter; raised before any crawling occurs.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// A module path was registered twice in the same registry.
    #[error("module `{0}` is already registered")]
    DuplicateModule(String),

    /// `get_test_params` default requires every parameter to have a default.
    #[error(
        "`{class}` has parameters without default values that are not set \
         in its test parameters: {params:?}; set them in test parameters or \
         provide defaults"
    )]
    MissingTestParams {
        class: &'static str,
        params: Vec<String>,
    },

    /// A declared test parameter set failed to construct an instance.
    #[error(
        "error in test parameters of `{class}`: construction with {params} failed"
    )]
    TestConstruction {
        class: &'static str,
        params: String,
        #[source]
        source: Box<Error>,
    },

    /// A fitted-state operation was called before `fit`.
    #[error(
        "this instance of `{class}` has not been fitted yet; call `fit` first{hint}"
    )]
    NotFitted { class: &'static str, hint: String },

    /// A value that cannot be rendered as a blueprint (e.g. an opaque handle).
    #[error("cannot serialize value: {0}")]
    NotSerializable(String),

    /// A serialized blueprint references a class absent from the registry.
    #[error("unknown class `{0}` in serialized blueprint")]
    UnknownClass(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
