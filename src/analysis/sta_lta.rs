//! STA/LTA event detection.
//!
//! The detector tracks a short-term average (STA) and a long-term average
//! (LTA) of a sample stream. Once the LTA window has filled, it enters the
//! triggered state when `STA / LTA >= trigger_ratio` and leaves it when
//! `STA / LTA <= de_trigger_ratio`. The two thresholds give hysteresis.
//!
//! The LTA only accumulates while de-triggered, so an event does not raise
//! the background level it is measured against. A detector that stays
//! triggered for more than `max_triggered_samples` consecutive samples is
//! reset and forced to de-trigger.
//!
//! # Example
//!
//! ```
//! use sigcond_rs::analysis::{DetectorParams, StaLtaDetector, Transition};
//!
//! let params = DetectorParams::new(2, 8, 2.0, 1.2, 50).unwrap();
//! let mut detector = StaLtaDetector::new("attenuation", params).unwrap();
//! for t in 0..8 {
//!     detector.add_sample(1.0, t * 1000);
//! }
//! assert_eq!(detector.add_sample(10.0, 8000), Some(Transition::Triggered));
//! ```

use crate::analysis::sliding_mean::SlidingMean;
use crate::error::{Result, SigCondError};
use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Validated detector parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorParams {
    /// STA window, in samples
    pub sta_width: usize,
    /// LTA window, in samples
    pub lta_width: usize,
    pub trigger_ratio: f64,
    pub de_trigger_ratio: f64,
    /// Consecutive triggered samples tolerated before a forced reset
    pub max_triggered_samples: usize,
}

impl DetectorParams {
    pub fn new(
        sta_width: usize,
        lta_width: usize,
        trigger_ratio: f64,
        de_trigger_ratio: f64,
        max_triggered_samples: usize,
    ) -> Result<Self> {
        let params = Self {
            sta_width,
            lta_width,
            trigger_ratio,
            de_trigger_ratio,
            max_triggered_samples,
        };
        params.validate()?;
        Ok(params)
    }

    /// Derive sample widths from window durations and the sampling interval.
    pub fn from_durations(
        sta: Duration,
        lta: Duration,
        max_triggered: Duration,
        sample_interval: Duration,
        trigger_ratio: f64,
        de_trigger_ratio: f64,
    ) -> Result<Self> {
        if sample_interval.is_zero() {
            return Err(SigCondError::config("sample interval must be > 0"));
        }
        if sample_interval >= sta || sample_interval >= lta {
            return Err(SigCondError::config(format!(
                "sample interval ({:?}) must be shorter than the STA ({:?}) and LTA ({:?}) windows",
                sample_interval, sta, lta
            )));
        }
        let interval = sample_interval.as_secs_f64();
        let samples = |d: Duration| (d.as_secs_f64() / interval) as usize;
        Self::new(
            samples(sta),
            samples(lta),
            trigger_ratio,
            de_trigger_ratio,
            samples(max_triggered),
        )
    }

    /// Check every constraint, reporting all violations at once.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();
        if self.sta_width == 0 || self.lta_width == 0 {
            problems.push("STA and LTA widths must be positive.");
        }
        if self.sta_width >= self.lta_width {
            problems.push("LTA width must exceed STA width.");
        }
        if !(self.trigger_ratio > self.de_trigger_ratio) {
            problems.push("Trigger ratio must exceed de-trigger ratio.");
        }
        if self.max_triggered_samples < 1 {
            problems.push("Max triggered samples must be positive.");
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(SigCondError::Configuration(problems.join(" ")))
        }
    }
}

/// A state change reported by [`StaLtaDetector::add_sample`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Triggered,
    Detriggered,
}

/// Observable detector state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    /// LTA window not yet full since construction or the last reset
    Unready,
    Detriggered,
    Triggered,
}

/// Receives detector transitions, synchronously from inside `add_sample`.
#[cfg_attr(test, mockall::automock)]
pub trait DetectorListener: Send {
    fn on_triggered(&mut self, detector: &StaLtaDetector);
    fn on_detriggered(&mut self, detector: &StaLtaDetector);
}

/// Short-term/long-term average ratio detector.
pub struct StaLtaDetector {
    parameter_name: String,
    params: DetectorParams,
    sta: SlidingMean,
    lta: SlidingMean,
    triggered: bool,
    ready: bool,
    consecutive_triggered: usize,
    transition_time_ms: i64,
    sample_count: u64,
    listeners: Vec<Box<dyn DetectorListener>>,
}

impl StaLtaDetector {
    pub fn new(parameter_name: impl Into<String>, params: DetectorParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            parameter_name: parameter_name.into(),
            sta: SlidingMean::new(params.sta_width),
            lta: SlidingMean::new(params.lta_width),
            params,
            triggered: false,
            ready: false,
            consecutive_triggered: 0,
            transition_time_ms: 0,
            sample_count: 0,
            listeners: Vec::new(),
        })
    }

    /// Replace the parameters and reset. On error nothing changes.
    pub fn set_parameters(&mut self, params: DetectorParams) -> Result<()> {
        params.validate()?;
        self.params = params;
        self.sta = SlidingMean::new(params.sta_width);
        self.lta = SlidingMean::new(params.lta_width);
        self.reset();
        Ok(())
    }

    /// Clear running averages and state; configuration is kept.
    pub fn reset(&mut self) {
        self.ready = false;
        self.triggered = false;
        self.consecutive_triggered = 0;
        self.sta.clear();
        self.lta.clear();
    }

    pub fn add_listener(&mut self, listener: Box<dyn DetectorListener>) {
        self.listeners.push(listener);
    }

    /// Feed one observation, returning the transition it caused, if any.
    pub fn add_sample(&mut self, value: f64, timestamp_ms: i64) -> Option<Transition> {
        self.sample_count += 1;
        let sta = self.sta.push(value);
        tracing::trace!(
            "{}: sample #{} value={} sta={}",
            self.parameter_name,
            self.sample_count,
            value,
            sta
        );

        let mut transition = None;

        if self.lta.is_full() {
            if !self.ready {
                tracing::debug!("{}: LTA window is full, evaluating state", self.parameter_name);
                self.ready = true;
            }

            let lta = self.lta.mean();
            if lta == 0.0 {
                tracing::error!("{}: LTA = 0, can't compute ratio", self.parameter_name);
            } else {
                let ratio = sta / lta;
                tracing::trace!("{}: STA/LTA = {}", self.parameter_name, ratio);
                if !self.triggered && ratio >= self.params.trigger_ratio {
                    self.trigger(timestamp_ms);
                    transition = Some(Transition::Triggered);
                } else if self.triggered && ratio <= self.params.de_trigger_ratio {
                    self.detrigger(timestamp_ms);
                    transition = Some(Transition::Detriggered);
                }
            }
        }

        if !self.triggered {
            self.lta.push(value);
            self.consecutive_triggered = 0;
        } else {
            self.consecutive_triggered += 1;
            if self.consecutive_triggered > self.params.max_triggered_samples {
                tracing::warn!(
                    "{}: exceeded {} samples in triggered state; forcing de-trigger",
                    self.parameter_name,
                    self.params.max_triggered_samples
                );
                self.reset();
                self.detrigger(timestamp_ms);
                transition = Some(Transition::Detriggered);
            }
        }

        transition
    }

    fn trigger(&mut self, timestamp_ms: i64) {
        tracing::info!(
            "{}: transition to TRIGGERED at sample #{}",
            self.parameter_name,
            self.sample_count
        );
        self.triggered = true;
        self.transition_time_ms = timestamp_ms;
        self.notify_listeners(Transition::Triggered);
    }

    fn detrigger(&mut self, timestamp_ms: i64) {
        tracing::info!(
            "{}: transition to DE-TRIGGERED at sample #{}",
            self.parameter_name,
            self.sample_count
        );
        self.triggered = false;
        self.transition_time_ms = timestamp_ms;
        self.notify_listeners(Transition::Detriggered);
    }

    fn notify_listeners(&mut self, transition: Transition) {
        let mut listeners = std::mem::take(&mut self.listeners);
        for listener in listeners.iter_mut() {
            match transition {
                Transition::Triggered => listener.on_triggered(self),
                Transition::Detriggered => listener.on_detriggered(self),
            }
        }
        self.listeners = listeners;
    }

    // ── Accessors ──

    pub fn parameter_name(&self) -> &str {
        &self.parameter_name
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    pub fn sta(&self) -> f64 {
        self.sta.mean()
    }

    pub fn lta(&self) -> f64 {
        self.lta.mean()
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn state(&self) -> DetectorState {
        if self.triggered {
            DetectorState::Triggered
        } else if self.ready {
            DetectorState::Detriggered
        } else {
            DetectorState::Unready
        }
    }

    /// Timestamp of the last transition, epoch milliseconds.
    pub fn transition_time(&self) -> i64 {
        self.transition_time_ms
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    pub fn consecutive_triggered(&self) -> usize {
        self.consecutive_triggered
    }
}

impl fmt::Debug for StaLtaDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaLtaDetector")
            .field("parameter_name", &self.parameter_name)
            .field("params", &self.params)
            .field("sta", &self.sta.mean())
            .field("lta", &self.lta.mean())
            .field("state", &self.state())
            .field("sample_count", &self.sample_count)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl fmt::Display for StaLtaDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dataStream: {}, STA sample width: {}, LTA sample width: {}, trigger ratio: {}, \
             de-trigger ratio: {}, nSamples: {}, STA: {}, LTA: {}, ready: {}, triggered: {}",
            self.parameter_name,
            self.params.sta_width,
            self.params.lta_width,
            self.params.trigger_ratio,
            self.params.de_trigger_ratio,
            self.sample_count,
            self.sta.mean(),
            self.lta.mean(),
            self.ready,
            self.triggered
        )?;
        if self.triggered {
            write!(
                f,
                ", # triggered samples: {}, max triggered samples: {}",
                self.consecutive_triggered, self.params.max_triggered_samples
            )?;
        }
        Ok(())
    }
}

/// A transition, detached from the detector that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorEvent {
    pub detector: String,
    pub transition: Transition,
    pub timestamp_ms: i64,
    pub sample: u64,
    pub sta: f64,
    pub lta: f64,
}

impl DetectorEvent {
    fn capture(detector: &StaLtaDetector, transition: Transition) -> Self {
        Self {
            detector: detector.parameter_name().to_string(),
            transition,
            timestamp_ms: detector.transition_time(),
            sample: detector.sample_count(),
            sta: detector.sta(),
            lta: detector.lta(),
        }
    }
}

/// Listener that forwards transitions over a channel.
pub struct EventForwarder {
    tx: Sender<DetectorEvent>,
}

impl EventForwarder {
    pub fn new(tx: Sender<DetectorEvent>) -> Self {
        Self { tx }
    }

    fn forward(&self, event: DetectorEvent) {
        if self.tx.try_send(event).is_err() {
            tracing::warn!("EventForwarder dropped a detector event (channel full or closed)");
        }
    }
}

impl DetectorListener for EventForwarder {
    fn on_triggered(&mut self, detector: &StaLtaDetector) {
        self.forward(DetectorEvent::capture(detector, Transition::Triggered));
    }

    fn on_detriggered(&mut self, detector: &StaLtaDetector) {
        self.forward(DetectorEvent::capture(detector, Transition::Detriggered));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn params() -> DetectorParams {
        DetectorParams::new(2, 6, 3.0, 1.5, 20).unwrap()
    }

    /// Feed `n` copies of `value`, collecting transitions.
    fn feed(det: &mut StaLtaDetector, value: f64, n: usize, t0: i64) -> Vec<Transition> {
        (0..n)
            .filter_map(|i| det.add_sample(value, t0 + i as i64))
            .collect()
    }

    #[test]
    fn test_rejects_bad_params() {
        assert!(DetectorParams::new(6, 6, 3.0, 1.5, 20).is_err());
        assert!(DetectorParams::new(8, 6, 3.0, 1.5, 20).is_err());
        assert!(DetectorParams::new(0, 6, 3.0, 1.5, 20).is_err());
        assert!(DetectorParams::new(2, 6, 1.5, 1.5, 20).is_err());
        assert!(DetectorParams::new(2, 6, 3.0, 1.5, 0).is_err());
        assert!(DetectorParams::new(2, 6, f64::NAN, 1.5, 1).is_err());
    }

    #[test]
    fn test_all_problems_reported() {
        let err = DetectorParams::new(6, 6, 1.0, 2.0, 0).unwrap_err().to_string();
        assert!(err.contains("LTA width must exceed STA width"));
        assert!(err.contains("Trigger ratio must exceed de-trigger ratio"));
        assert!(err.contains("Max triggered samples must be positive"));
    }

    #[test]
    fn test_set_parameters_keeps_state_on_error() {
        let mut det = StaLtaDetector::new("x", params()).unwrap();
        feed(&mut det, 1.0, 3, 0);
        let bad = DetectorParams {
            sta_width: 10,
            ..params()
        };
        assert!(det.set_parameters(bad).is_err());
        assert_eq!(det.params(), &params());
        assert_eq!(det.sta(), 1.0);

        let good = DetectorParams::new(3, 9, 4.0, 2.0, 5).unwrap();
        det.set_parameters(good).unwrap();
        assert_eq!(det.params().lta_width, 9);
        assert_eq!(det.state(), DetectorState::Unready);
        assert_eq!(det.sta(), 0.0);
    }

    #[test]
    fn test_constant_signal_never_triggers() {
        let mut det = StaLtaDetector::new("const", params()).unwrap();
        let transitions = feed(&mut det, 5.0, 500, 0);
        assert!(transitions.is_empty());
        assert!(det.is_ready());
        assert_eq!(det.state(), DetectorState::Detriggered);
    }

    #[test]
    fn test_step_triggers_then_detriggers_once() {
        let mut det = StaLtaDetector::new("step", params()).unwrap();
        assert!(feed(&mut det, 1.0, 10, 0).is_empty());
        assert_eq!(det.state(), DetectorState::Detriggered);

        let burst = feed(&mut det, 10.0, 4, 100);
        assert_eq!(burst, vec![Transition::Triggered]);
        assert_eq!(det.transition_time(), 100, "first burst sample lifts STA to 5.5");
        assert_eq!(det.lta(), 1.0, "LTA frozen while triggered");

        let quiet = feed(&mut det, 1.0, 10, 200);
        assert_eq!(quiet, vec![Transition::Detriggered]);
        assert_eq!(det.state(), DetectorState::Detriggered);
    }

    #[test]
    fn test_safety_valve_forces_detrigger() {
        let params = DetectorParams::new(2, 6, 3.0, 1.5, 5).unwrap();
        let mut det = StaLtaDetector::new("valve", params).unwrap();
        feed(&mut det, 1.0, 10, 0);
        let transitions = feed(&mut det, 50.0, 7, 100);
        assert_eq!(transitions, vec![Transition::Triggered, Transition::Detriggered]);
        assert!(!det.is_triggered());
        assert_eq!(det.state(), DetectorState::Unready, "valve resets the windows");
        assert_eq!(det.consecutive_triggered(), 0);
    }

    #[test]
    fn test_reset_clears_triggered_run() {
        let mut det = StaLtaDetector::new("manual", params()).unwrap();
        feed(&mut det, 1.0, 10, 0);
        assert_eq!(feed(&mut det, 10.0, 3, 100), vec![Transition::Triggered]);
        assert_eq!(det.consecutive_triggered(), 3);

        det.reset();
        assert_eq!(det.consecutive_triggered(), 0);
        assert_eq!(det.state(), DetectorState::Unready);
        assert_eq!(det.sample_count(), 13, "sample count survives a reset");
    }

    #[test]
    fn test_zero_lta_skips_ratio() {
        let mut det = StaLtaDetector::new("zero", params()).unwrap();
        feed(&mut det, 0.0, 6, 0);
        assert_eq!(det.add_sample(100.0, 6), None);
        assert!(det.is_ready());
        assert!(det.lta() > 0.0, "LTA keeps accumulating");
    }

    #[test]
    fn test_listener_callbacks() {
        let mut mock = MockDetectorListener::new();
        mock.expect_on_triggered().times(1).return_const(());
        mock.expect_on_detriggered().times(1).return_const(());

        let mut det = StaLtaDetector::new("mocked", params()).unwrap();
        det.add_listener(Box::new(mock));
        feed(&mut det, 1.0, 10, 0);
        feed(&mut det, 10.0, 4, 100);
        feed(&mut det, 1.0, 10, 200);
    }

    #[test]
    fn test_event_forwarder() {
        let (tx, rx) = unbounded();
        let mut det = StaLtaDetector::new("fwd", params()).unwrap();
        det.add_listener(Box::new(EventForwarder::new(tx)));
        feed(&mut det, 1.0, 10, 0);
        feed(&mut det, 10.0, 4, 100);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.detector, "fwd");
        assert_eq!(event.transition, Transition::Triggered);
        assert_eq!(event.timestamp_ms, 100);
        assert_eq!(event.lta, 1.0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_from_durations() {
        let p = DetectorParams::from_durations(
            Duration::from_secs(60),
            Duration::from_secs(600),
            Duration::from_secs(1200),
            Duration::from_secs(10),
            2.0,
            1.2,
        )
        .unwrap();
        assert_eq!(p.sta_width, 6);
        assert_eq!(p.lta_width, 60);
        assert_eq!(p.max_triggered_samples, 120);

        assert!(DetectorParams::from_durations(
            Duration::from_secs(60),
            Duration::from_secs(600),
            Duration::from_secs(1200),
            Duration::from_secs(60),
            2.0,
            1.2,
        )
        .is_err());
    }

    #[test]
    fn test_display_mentions_triggered_count() {
        let mut det = StaLtaDetector::new("disp", params()).unwrap();
        feed(&mut det, 1.0, 10, 0);
        assert!(!det.to_string().contains("# triggered samples"));
        feed(&mut det, 10.0, 3, 0);
        assert!(det.to_string().contains("# triggered samples"));
    }
}
