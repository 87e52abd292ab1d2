//! Range validation with fallback policies.
//!
//! A [`RangeValidator`] accepts a sample when it lies inside (or outside)
//! `[lower, upper]`, with each bound independently inclusive or exclusive.
//! Rejected samples are replaced according to a [`FallbackPolicy`]:
//!
//! - `Reject`: no output (`None`)
//! - `UseLastValid`: the last accepted (or substituted) value
//! - `UseAverage`: mean of the last `average_window` stored values
//! - `UseConstant`: a configured constant
//!
//! Substituted values are fed back into the fallback state exactly like
//! accepted ones: they become the new "last valid" value and enter the
//! averaging window. Repeated rejections therefore drift the average
//! toward the substitute.
//!
//! Configuration is fixed at construction; only the counters, the last
//! valid value and the averaging window change afterwards.

use crate::analysis::circular::CircularBuffer;
use crate::error::{Result, SigCondError};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_AVERAGE_WINDOW: usize = 1;

/// Which side of the bounds is acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeRegion {
    #[default]
    Inside,
    Outside,
}

/// What to output when a sample is not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    #[default]
    Reject,
    UseLastValid,
    UseAverage,
    UseConstant,
}

fn default_true() -> bool {
    true
}

fn default_average_window() -> usize {
    DEFAULT_AVERAGE_WINDOW
}

/// Serializable validator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeValidatorConfig {
    #[serde(default)]
    pub region: RangeRegion,

    pub lower: f64,

    pub upper: f64,

    #[serde(default = "default_true")]
    pub include_lower: bool,

    #[serde(default = "default_true")]
    pub include_upper: bool,

    #[serde(default)]
    pub policy: FallbackPolicy,

    /// Number of stored values averaged by `UseAverage`
    #[serde(default = "default_average_window")]
    pub average_window: usize,

    /// Substitute used by `UseConstant`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constant: Option<f64>,
}

impl RangeValidatorConfig {
    /// Closed interval, rejecting policy.
    pub fn new(region: RangeRegion, lower: f64, upper: f64) -> Self {
        Self {
            region,
            lower,
            upper,
            include_lower: true,
            include_upper: true,
            policy: FallbackPolicy::Reject,
            average_window: DEFAULT_AVERAGE_WINDOW,
            constant: None,
        }
    }

    pub fn with_inclusive(mut self, include_lower: bool, include_upper: bool) -> Self {
        self.include_lower = include_lower;
        self.include_upper = include_upper;
        self
    }

    pub fn with_policy(mut self, policy: FallbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_average_window(mut self, window: usize) -> Self {
        self.average_window = window;
        self
    }

    pub fn with_constant(mut self, constant: f64) -> Self {
        self.constant = Some(constant);
        self
    }

    /// Check the settings, describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.lower.is_nan() || self.upper.is_nan() {
            return Err(SigCondError::config(format!(
                "range bounds must be numbers (lower={}, upper={})",
                self.lower, self.upper
            )));
        }
        if self.lower > self.upper {
            return Err(SigCondError::config(format!(
                "lower bound {} exceeds upper bound {}",
                self.lower, self.upper
            )));
        }
        if self.average_window == 0 {
            return Err(SigCondError::config("averaging window must be > 0"));
        }
        if self.policy == FallbackPolicy::UseConstant
            && !self.constant.is_some_and(|c| !c.is_nan())
        {
            return Err(SigCondError::config("use_constant policy requires a numeric constant"));
        }
        Ok(())
    }
}

/// Stateful acceptance test with fallback substitution.
#[derive(Debug, Clone)]
pub struct RangeValidator {
    config: RangeValidatorConfig,
    last_valid: Option<f64>,
    history: CircularBuffer,
    valid_count: u64,
    invalid_count: u64,
}

impl RangeValidator {
    /// Build a validator, rejecting invalid settings.
    pub fn from_config(config: RangeValidatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            history: CircularBuffer::new(config.average_window),
            config,
            last_valid: None,
            valid_count: 0,
            invalid_count: 0,
        })
    }

    /// Rejects out-of-range samples outright.
    pub fn rejecting(
        region: RangeRegion,
        lower: f64,
        upper: f64,
        include_lower: bool,
        include_upper: bool,
    ) -> Result<Self> {
        Self::from_config(
            RangeValidatorConfig::new(region, lower, upper)
                .with_inclusive(include_lower, include_upper),
        )
    }

    /// Substitutes the mean of the last `window` stored values.
    pub fn averaging(
        region: RangeRegion,
        lower: f64,
        upper: f64,
        include_lower: bool,
        include_upper: bool,
        window: usize,
    ) -> Result<Self> {
        Self::from_config(
            RangeValidatorConfig::new(region, lower, upper)
                .with_inclusive(include_lower, include_upper)
                .with_policy(FallbackPolicy::UseAverage)
                .with_average_window(window),
        )
    }

    /// Substitutes a fixed constant.
    pub fn constant(
        region: RangeRegion,
        lower: f64,
        upper: f64,
        include_lower: bool,
        include_upper: bool,
        constant: f64,
    ) -> Result<Self> {
        Self::from_config(
            RangeValidatorConfig::new(region, lower, upper)
                .with_inclusive(include_lower, include_upper)
                .with_policy(FallbackPolicy::UseConstant)
                .with_constant(constant),
        )
    }

    /// Substitutes the last valid value.
    pub fn last_valid(
        region: RangeRegion,
        lower: f64,
        upper: f64,
        include_lower: bool,
        include_upper: bool,
    ) -> Result<Self> {
        Self::from_config(
            RangeValidatorConfig::new(region, lower, upper)
                .with_inclusive(include_lower, include_upper)
                .with_policy(FallbackPolicy::UseLastValid),
        )
    }

    /// Seed the counters, e.g. to carry statistics over to a replacement validator.
    pub fn with_counts(mut self, valid_count: u64, invalid_count: u64) -> Self {
        self.valid_count = valid_count;
        self.invalid_count = invalid_count;
        self
    }

    /// Pure acceptance test; no state is touched.
    pub fn accept(&self, value: f64) -> bool {
        let c = &self.config;
        let above_lower = if c.include_lower {
            value >= c.lower
        } else {
            value > c.lower
        };
        let below_upper = if c.include_upper {
            value <= c.upper
        } else {
            value < c.upper
        };
        match c.region {
            RangeRegion::Inside => above_lower && below_upper,
            RangeRegion::Outside => {
                let below_lower = if c.include_lower {
                    value <= c.lower
                } else {
                    value < c.lower
                };
                let above_upper = if c.include_upper {
                    value >= c.upper
                } else {
                    value > c.upper
                };
                below_lower || above_upper
            }
        }
    }

    /// Validate a sample. `None` means rejected with no substitute.
    pub fn validate(&mut self, value: f64) -> Option<f64> {
        if self.accept(value) {
            self.last_valid = Some(value);
            self.history.push(value);
            if self.valid_count == u64::MAX {
                self.reset_counts();
            }
            self.valid_count += 1;
            return Some(value);
        }

        let output = match self.config.policy {
            FallbackPolicy::Reject => {
                tracing::debug!("RangeValidator rejected {}", value);
                None
            }
            FallbackPolicy::UseLastValid => self.last_valid,
            FallbackPolicy::UseAverage => {
                let avg = self.history.mean();
                self.last_valid = avg;
                avg
            }
            FallbackPolicy::UseConstant => {
                let constant = self.config.constant.filter(|c| !c.is_nan());
                self.last_valid = constant;
                constant
            }
        };
        if self.config.policy != FallbackPolicy::Reject {
            if let Some(v) = output {
                self.history.push(v);
            }
        }

        if self.invalid_count == u64::MAX {
            self.reset_counts();
        }
        self.invalid_count += 1;
        output
    }

    fn reset_counts(&mut self) {
        tracing::debug!("RangeValidator counters saturated, resetting");
        self.valid_count = 0;
        self.invalid_count = 0;
    }

    pub fn valid_count(&self) -> u64 {
        self.valid_count
    }

    pub fn invalid_count(&self) -> u64 {
        self.invalid_count
    }

    pub fn sample_count(&self) -> u64 {
        self.valid_count.saturating_add(self.invalid_count)
    }

    /// `valid / (valid + invalid)`, or 0 before any sample.
    pub fn valid_ratio(&self) -> f64 {
        if self.valid_count == 0 && self.invalid_count == 0 {
            return 0.0;
        }
        self.valid_count as f64 / (self.valid_count as f64 + self.invalid_count as f64)
    }

    pub fn last_valid_value(&self) -> Option<f64> {
        self.last_valid
    }

    /// Mean of the averaging window.
    pub fn average(&self) -> Option<f64> {
        self.history.mean()
    }

    pub fn config(&self) -> &RangeValidatorConfig {
        &self.config
    }
}

impl fmt::Display for RangeValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.config;
        write!(
            f,
            "[lb:{:.2} ub:{:.2} re:{:?} il:{} iu:{} rp:{:?} n:{} lvv:{:?} valid:{} invalid:{}]",
            c.lower,
            c.upper,
            c.region,
            c.include_lower,
            c.include_upper,
            c.policy,
            c.average_window,
            self.last_valid,
            self.valid_count,
            self.invalid_count
        )
    }
}
