//! Weighted average of all non-inhibited inputs.
//!
//! The sum of transformed input values is divided by the configured divisor,
//! or by the number of contributing inputs when the divisor is zero.

use crate::pipeline::node::{FilterOutcome, InputView};

#[derive(Debug, Clone, Default)]
pub struct WeightedAverageFilter {
    divisor: f64,
}

impl WeightedAverageFilter {
    pub fn new(divisor: f64) -> Self {
        Self { divisor }
    }

    pub fn divisor(&self) -> f64 {
        self.divisor
    }

    pub fn set_divisor(&mut self, divisor: f64) {
        self.divisor = divisor;
    }

    pub fn compute(&mut self, inputs: &InputView) -> FilterOutcome {
        let (sum, count) = inputs
            .active()
            .fold((0.0, 0usize), |(sum, n), t| (sum + t.value(), n + 1));
        let divisor = if self.divisor != 0.0 {
            self.divisor
        } else {
            count as f64
        };
        if divisor == 0.0 {
            tracing::error!("Weighted average has no divisor and no active inputs");
            return FilterOutcome::Cancelled;
        }
        FilterOutcome::Ok(sum / divisor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::nodes::test_util::terminals;
    use crate::pipeline::TerminalId;

    fn run(divisor: f64, terms: &[crate::pipeline::Terminal], ids: &[TerminalId]) -> FilterOutcome {
        WeightedAverageFilter::new(divisor).compute(&InputView::new(terms, ids, TerminalId(0)))
    }

    #[test]
    fn test_explicit_divisor() {
        let (terms, ids) = terminals(&[2.0, 4.0]);
        assert_eq!(run(4.0, &terms, &ids), FilterOutcome::Ok(1.5));
    }

    #[test]
    fn test_zero_divisor_uses_active_count() {
        let (mut terms, ids) = terminals(&[2.0, 4.0, 100.0]);
        terms[2].set_inhibited(true);
        assert_eq!(run(0.0, &terms, &ids), FilterOutcome::Ok(3.0));
    }

    #[test]
    fn test_all_inhibited_cancels() {
        let (mut terms, ids) = terminals(&[2.0]);
        terms[0].set_inhibited(true);
        assert!(run(0.0, &terms, &ids).is_cancelled());
    }
}
