//! Built-in filter implementations.

pub mod boxcar;
pub mod heading;
pub mod magnitude;
pub mod range;
pub mod unity;
pub mod weighted_average;

pub use boxcar::BoxcarFilter;
pub use heading::{HeadingFilter, HeadingUnits};
pub use magnitude::MagnitudeFilter;
pub use range::RangeFilter;
pub use unity::UnityFilter;
pub use weighted_average::WeightedAverageFilter;
