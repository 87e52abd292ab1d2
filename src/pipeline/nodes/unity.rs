//! Pass-through filter: outputs the transformed value of its input.

use crate::pipeline::node::{FilterOutcome, InputView};

#[derive(Debug, Clone, Default)]
pub struct UnityFilter;

impl UnityFilter {
    pub fn new() -> Self {
        Self
    }

    pub fn compute(&mut self, inputs: &InputView) -> FilterOutcome {
        FilterOutcome::Ok(inputs.source().value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Terminal, TerminalId};

    #[test]
    fn test_applies_terminal_transform() {
        let mut t = Terminal::new("t", 0).with_weight(2.0).with_offset(1.0);
        t.set(5.0);
        let terms = vec![t];
        let ids = vec![TerminalId(0)];
        let out = UnityFilter::new().compute(&InputView::new(&terms, &ids, TerminalId(0)));
        assert_eq!(out, FilterOutcome::Ok(11.0));
    }
}
