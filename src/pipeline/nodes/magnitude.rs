//! Euclidean magnitude of all non-inhibited inputs.

use crate::pipeline::node::{FilterOutcome, InputView};

#[derive(Debug, Clone, Default)]
pub struct MagnitudeFilter;

impl MagnitudeFilter {
    pub fn new() -> Self {
        Self
    }

    pub fn compute(&mut self, inputs: &InputView) -> FilterOutcome {
        let sum_sq: f64 = inputs.active().map(|t| t.value() * t.value()).sum();
        FilterOutcome::Ok(sum_sq.sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::nodes::test_util::terminals;
    use crate::pipeline::TerminalId;

    #[test]
    fn test_three_four_five() {
        let (terms, ids) = terminals(&[3.0, 4.0]);
        let out = MagnitudeFilter::new().compute(&InputView::new(&terms, &ids, TerminalId(0)));
        assert_eq!(out, FilterOutcome::Ok(5.0));
    }

    #[test]
    fn test_inhibited_input_excluded() {
        let (mut terms, ids) = terminals(&[3.0, 4.0, 12.0]);
        terms[2].set_inhibited(true);
        let out = MagnitudeFilter::new().compute(&InputView::new(&terms, &ids, TerminalId(0)));
        assert_eq!(out, FilterOutcome::Ok(5.0));
    }
}
