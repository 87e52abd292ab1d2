//! Heading from two orthogonal components.
//!
//! The first input is X and the second Y. The angle is `atan2(x, y)`, that
//! is, measured from the Y axis toward X (compass convention).

use crate::pipeline::node::{FilterOutcome, InputView};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadingUnits {
    #[default]
    Degrees,
    Radians,
}

impl fmt::Display for HeadingUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeadingUnits::Degrees => write!(f, "degrees"),
            HeadingUnits::Radians => write!(f, "radians"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HeadingFilter {
    units: HeadingUnits,
}

impl HeadingFilter {
    pub fn new(units: HeadingUnits) -> Self {
        Self { units }
    }

    pub fn units(&self) -> HeadingUnits {
        self.units
    }

    pub fn set_units(&mut self, units: HeadingUnits) {
        self.units = units;
    }

    pub fn compute(&mut self, inputs: &InputView) -> FilterOutcome {
        let (Some(x), Some(y), 2) = (inputs.get(0), inputs.get(1), inputs.len()) else {
            tracing::warn!("Heading needs exactly 2 inputs, has {}", inputs.len());
            return FilterOutcome::Cancelled;
        };
        let radians = x.value().atan2(y.value());
        match self.units {
            HeadingUnits::Radians => FilterOutcome::Ok(radians),
            HeadingUnits::Degrees => FilterOutcome::Ok(radians.to_degrees()),
        }
    }
}
