//! Boxcar (moving-average) filter.
//!
//! Every trigger pushes the transformed value of the triggering input into a
//! circular buffer of `depth` slots and outputs the mean of the populated
//! slots.

use crate::analysis::CircularBuffer;
use crate::error::{Result, SigCondError};
use crate::pipeline::node::{FilterOutcome, InputView};

#[derive(Debug, Clone)]
pub struct BoxcarFilter {
    buffer: CircularBuffer,
}

impl BoxcarFilter {
    pub fn new(depth: usize) -> Result<Self> {
        if depth == 0 {
            return Err(SigCondError::config("boxcar depth must be at least 1"));
        }
        Ok(Self {
            buffer: CircularBuffer::new(depth),
        })
    }

    /// Resize the window. Discards all buffered samples.
    pub fn set_depth(&mut self, depth: usize) -> Result<()> {
        if depth == 0 {
            return Err(SigCondError::config("boxcar depth must be at least 1"));
        }
        self.buffer = CircularBuffer::new(depth);
        Ok(())
    }

    pub fn depth(&self) -> usize {
        self.buffer.capacity()
    }

    /// Number of samples currently buffered.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn compute(&mut self, inputs: &InputView) -> FilterOutcome {
        self.buffer.push(inputs.source().value());
        match self.buffer.mean() {
            Some(mean) => FilterOutcome::Ok(mean),
            None => FilterOutcome::Cancelled,
        }
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::nodes::test_util::terminals;
    use crate::pipeline::TerminalId;
    use proptest::prelude::*;

    fn feed(filter: &mut BoxcarFilter, value: f64) -> FilterOutcome {
        let (terms, ids) = terminals(&[value]);
        filter.compute(&InputView::new(&terms, &ids, TerminalId(0)))
    }

    #[test]
    fn test_depth_three_sequence() {
        let mut f = BoxcarFilter::new(3).unwrap();
        let outputs: Vec<f64> = [3.0, 6.0, 9.0, 12.0]
            .iter()
            .filter_map(|&v| feed(&mut f, v).value())
            .collect();
        assert_eq!(outputs, vec![3.0, 4.5, 6.0, 9.0]);
    }

    #[test]
    fn test_zero_depth_rejected() {
        assert!(BoxcarFilter::new(0).is_err());
        let mut f = BoxcarFilter::new(2).unwrap();
        assert!(f.set_depth(0).is_err());
        assert_eq!(f.depth(), 2);
    }

    #[test]
    fn test_set_depth_clears_buffer() {
        let mut f = BoxcarFilter::new(2).unwrap();
        feed(&mut f, 10.0);
        f.set_depth(4).unwrap();
        assert!(f.is_empty());
        assert_eq!(feed(&mut f, 2.0), FilterOutcome::Ok(2.0));
    }

    #[test]
    fn test_reset() {
        let mut f = BoxcarFilter::new(2).unwrap();
        feed(&mut f, 10.0);
        f.reset();
        assert_eq!(feed(&mut f, 4.0), FilterOutcome::Ok(4.0));
    }

    proptest! {
        #[test]
        fn prop_output_is_mean_of_last_depth(
            depth in 1usize..8,
            values in proptest::collection::vec(-1.0e3f64..1.0e3, 1..40),
        ) {
            let mut f = BoxcarFilter::new(depth).unwrap();
            let mut last = 0.0;
            for &v in &values {
                last = feed(&mut f, v).value().unwrap();
            }
            let tail = &values[values.len().saturating_sub(depth)..];
            let expected = tail.iter().sum::<f64>() / tail.len() as f64;
            prop_assert!((last - expected).abs() < 1e-9);
        }
    }
}
