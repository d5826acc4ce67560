//! Fittable-component extension of the base protocol.
//!
//! An estimator is a component whose behavior additionally depends on
//! state learned from data. Fitted state lives in the instance state map:
//! the [`FITTED_FLAG`] entry marks a completed fit, and entries whose key
//! ends in a single trailing underscore are the fitted parameters.

use crate::error::{Error, Result};
use crate::object::base::SEP;
use crate::object::BaseObject;
use crate::value::{ParamMap, ParamValue};

/// State key marking a completed fit.
pub const FITTED_FLAG: &str = "is_fitted";

/// Protocol extension for components with a fit step. Opt-in: implement
/// it with an empty body on any [`BaseObject`].
pub trait Estimator: BaseObject {
    fn is_fitted(&self) -> bool {
        matches!(
            self.core().state.get(FITTED_FLAG),
            Some(ParamValue::Bool(true))
        )
    }

    /// Record a completed fit. Called by concrete `fit` implementations
    /// after storing their fitted parameters.
    fn mark_fitted(&mut self) {
        self.core_mut()
            .state
            .insert(FITTED_FLAG.to_string(), ParamValue::Bool(true));
    }

    fn check_is_fitted(&self) -> Result<()> {
        if self.is_fitted() {
            Ok(())
        } else {
            Err(Error::NotFitted {
                class: self.descriptor().name,
                hint: String::new(),
            })
        }
    }

    /// Fitted parameters: state entries whose key ends in a single
    /// trailing underscore, returned under the key without it.
    fn get_fitted_params(&self) -> Result<ParamMap> {
        self.check_is_fitted()?;
        Ok(self
            .core()
            .state
            .iter()
            .filter(|(key, _)| key.ends_with('_') && !key.ends_with(SEP))
            .map(|(key, value)| (key.trim_end_matches('_').to_string(), value.clone()))
            .collect())
    }
}
