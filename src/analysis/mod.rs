//! Analysis module for scalar signal streams
//!
//! This module provides the numeric building blocks used by the filter graph
//! and by instrument drivers directly:
//! - Circular sample buffer with order-independent mean
//! - Range validation with fallback policies
//! - Incremental sliding-window mean
//! - STA/LTA event detection

pub mod circular;
pub mod range_validator;
pub mod sliding_mean;
pub mod sta_lta;

pub use circular::CircularBuffer;
pub use range_validator::{FallbackPolicy, RangeRegion, RangeValidator, RangeValidatorConfig};
pub use sliding_mean::SlidingMean;
pub use sta_lta::{
    DetectorEvent, DetectorListener, DetectorParams, DetectorState, EventForwarder,
    StaLtaDetector, Transition,
};
