//! Validation capability consumed by the commit protocol.
//!
//! # Responsibility
//! - Define the [`Validator`] contract and the [`Errors`] set it produces.
//! - Ship a small rule set for common field checks.
//!
//! # Invariants
//! - Validators are pure with respect to the model: they read, never write.

pub mod errors;
pub mod rules;

use crate::model::Model;

pub use errors::Errors;
pub use rules::RuleSet;

/// Evaluates rules against a model's current attribute store.
pub trait Validator {
    fn validate(&self, model: &Model) -> Errors;
}

impl<F> Validator for F
where
    F: Fn(&Model) -> Errors,
{
    fn validate(&self, model: &Model) -> Errors {
        self(model)
    }
}
