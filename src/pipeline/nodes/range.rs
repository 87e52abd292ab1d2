//! Range filter: runs its input through a [`RangeValidator`].
//!
//! Accepted or substituted values propagate; a rejected sample cancels the
//! computation.

use crate::analysis::RangeValidator;
use crate::pipeline::node::{FilterOutcome, InputView};

#[derive(Debug, Clone)]
pub struct RangeFilter {
    validator: RangeValidator,
}

impl RangeFilter {
    pub fn new(validator: RangeValidator) -> Self {
        Self { validator }
    }

    pub fn validator(&self) -> &RangeValidator {
        &self.validator
    }

    pub fn validator_mut(&mut self) -> &mut RangeValidator {
        &mut self.validator
    }

    pub fn compute(&mut self, inputs: &InputView) -> FilterOutcome {
        match self.validator.validate(inputs.source().value()) {
            Some(v) => FilterOutcome::Ok(v),
            None => FilterOutcome::Cancelled,
        }
    }
}
