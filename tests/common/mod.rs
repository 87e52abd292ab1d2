//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use std::time::Duration;

/// Create a test timeout duration
pub fn test_timeout() -> Duration {
    Duration::from_millis(500)
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// `n_base` baseline samples, then `n_burst` burst samples, then `n_tail` baseline samples
pub fn step_signal(
    baseline: f64,
    burst: f64,
    n_base: usize,
    n_burst: usize,
    n_tail: usize,
) -> Vec<f64> {
    std::iter::repeat(baseline)
        .take(n_base)
        .chain(std::iter::repeat(burst).take(n_burst))
        .chain(std::iter::repeat(baseline).take(n_tail))
        .collect()
}
