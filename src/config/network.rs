//! Declarative network description and its construction into a live graph.

use crate::analysis::{
    DetectorParams, RangeValidator, RangeValidatorConfig, StaLtaDetector, Transition,
};
use crate::error::{Result, ResultExt, SigCondError};
use crate::pipeline::{
    AnyFilter, BoxcarFilter, FilterGraph, FilterNode, HeadingFilter, HeadingUnits, InputGate,
    MagnitudeFilter, NodeId, OutputGate, RangeFilter, Terminal, TerminalId, TriggerMode,
    UnityFilter, WeightedAverageFilter,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Current network file format version
pub const NETWORK_FORMAT_VERSION: u32 = 1;

fn default_network_version() -> u32 {
    NETWORK_FORMAT_VERSION
}

fn default_weight() -> f64 {
    crate::pipeline::terminal::DEFAULT_WEIGHT
}

// ==================== Network Config ====================

/// A complete filter network: terminals, filters and detectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// File format version for future compatibility
    #[serde(default = "default_network_version")]
    pub version: u32,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub terminals: Vec<TerminalConfig>,

    #[serde(default)]
    pub filters: Vec<FilterConfig>,

    #[serde(default)]
    pub detectors: Vec<DetectorConfig>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            version: NETWORK_FORMAT_VERSION,
            name: String::new(),
            terminals: Vec::new(),
            filters: Vec::new(),
            detectors: Vec::new(),
        }
    }
}

/// One input terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// Unique within the file
    pub name: String,

    #[serde(default)]
    pub id: u32,

    #[serde(default = "default_weight")]
    pub weight: f64,

    #[serde(default)]
    pub offset: f64,

    #[serde(default)]
    pub trigger: TriggerMode,

    /// Raw value restored by reset
    #[serde(default)]
    pub initial: f64,
}

impl TerminalConfig {
    pub fn new(name: impl Into<String>, id: u32) -> Self {
        Self {
            name: name.into(),
            id,
            weight: default_weight(),
            offset: 0.0,
            trigger: TriggerMode::default(),
            initial: 0.0,
        }
    }
}

/// Which filter a node runs, with its settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterKind {
    Boxcar {
        depth: usize,
    },
    Magnitude,
    Heading {
        #[serde(default)]
        units: HeadingUnits,
    },
    WeightedAverage {
        /// Zero divides by the number of active inputs
        #[serde(default)]
        divisor: f64,
    },
    Unity,
    Range {
        validator: RangeValidatorConfig,
    },
}

impl FilterKind {
    fn instantiate(&self) -> Result<AnyFilter> {
        Ok(match self {
            FilterKind::Boxcar { depth } => BoxcarFilter::new(*depth)?.into(),
            FilterKind::Magnitude => MagnitudeFilter::new().into(),
            FilterKind::Heading { units } => HeadingFilter::new(*units).into(),
            FilterKind::WeightedAverage { divisor } => WeightedAverageFilter::new(*divisor).into(),
            FilterKind::Unity => UnityFilter::new().into(),
            FilterKind::Range { validator } => {
                RangeFilter::new(RangeValidator::from_config(validator.clone())?).into()
            }
        })
    }
}

/// One filter node. Inputs and outputs are terminal names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Unique within the file
    pub name: String,

    #[serde(default)]
    pub id: u32,

    /// Owned terminals, in positional order
    #[serde(default)]
    pub inputs: Vec<String>,

    /// Downstream terminals fed by this filter
    #[serde(default)]
    pub outputs: Vec<String>,

    #[serde(default)]
    pub input_gate: InputGate,

    #[serde(default)]
    pub output_gate: OutputGate,

    pub kind: FilterKind,
}

impl FilterConfig {
    pub fn new(name: impl Into<String>, kind: FilterKind) -> Self {
        Self {
            name: name.into(),
            id: 0,
            inputs: Vec::new(),
            outputs: Vec::new(),
            input_gate: InputGate::default(),
            output_gate: OutputGate::default(),
            kind,
        }
    }

    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_outputs<I, S>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outputs = outputs.into_iter().map(Into::into).collect();
        self
    }
}

/// One STA/LTA detector.
///
/// Windows are given either in samples (`sta_width`, `lta_width`,
/// `max_triggered_samples`) or, when `sample_interval_secs` is set, in
/// seconds (`sta_secs`, `lta_secs`, `max_triggered_secs`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DetectorConfig {
    pub name: String,

    /// Terminal whose transformed value feeds the detector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    pub trigger_ratio: f64,

    pub de_trigger_ratio: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sta_width: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lta_width: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_triggered_samples: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_interval_secs: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sta_secs: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lta_secs: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_triggered_secs: Option<f64>,
}

impl DetectorConfig {
    /// Resolve the window settings into validated parameters.
    pub fn params(&self) -> Result<DetectorParams> {
        if let Some(interval) = self.sample_interval_secs {
            let seconds = |field: &str, v: Option<f64>| -> Result<Duration> {
                let secs = v.ok_or_else(|| {
                    SigCondError::config(format!("'{field}' is required with sample_interval_secs"))
                })?;
                Duration::try_from_secs_f64(secs)
                    .map_err(|e| SigCondError::config(format!("'{field}' = {secs}: {e}")))
            };
            return DetectorParams::from_durations(
                seconds("sta_secs", self.sta_secs)?,
                seconds("lta_secs", self.lta_secs)?,
                seconds("max_triggered_secs", self.max_triggered_secs)?,
                seconds("sample_interval_secs", Some(interval))?,
                self.trigger_ratio,
                self.de_trigger_ratio,
            );
        }

        let width = |field: &str, v: Option<usize>| {
            v.ok_or_else(|| SigCondError::config(format!("'{field}' is required")))
        };
        DetectorParams::new(
            width("sta_width", self.sta_width)?,
            width("lta_width", self.lta_width)?,
            self.trigger_ratio,
            self.de_trigger_ratio,
            width("max_triggered_samples", self.max_triggered_samples)?,
        )
    }
}

impl NetworkConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Current-meter style network: two velocity components combined into
    /// speed and heading, a smoothed speed, and a detector on the speed.
    pub fn sample() -> Self {
        let mut config = Self::new("current-meter");

        config.terminals = vec![
            TerminalConfig::new("east", 0),
            TerminalConfig::new("north", 1),
            TerminalConfig::new("speed", 0),
            TerminalConfig::new("heading", 0),
            TerminalConfig::new("speed_avg", 0),
        ];

        config.filters = vec![
            FilterConfig::new("speed", FilterKind::Magnitude)
                .with_inputs(["east", "north"])
                .with_outputs(["speed"]),
            FilterConfig::new(
                "heading",
                FilterKind::Heading {
                    units: HeadingUnits::Degrees,
                },
            )
            .with_inputs(["east", "north"])
            .with_outputs(["heading"]),
            FilterConfig::new("speed_avg", FilterKind::Boxcar { depth: 4 })
                .with_inputs(["speed"])
                .with_outputs(["speed_avg"]),
        ];

        config.detectors = vec![DetectorConfig {
            name: "speed_event".into(),
            source: Some("speed".into()),
            trigger_ratio: 3.0,
            de_trigger_ratio: 1.5,
            sta_width: Some(5),
            lta_width: Some(50),
            max_triggered_samples: Some(100),
            ..Default::default()
        }];

        config
    }

    /// Construct the live network.
    ///
    /// Every entry is validated; the first problem is reported with the
    /// name of the offending entry.
    pub fn build(&self) -> Result<Network> {
        if self.version > NETWORK_FORMAT_VERSION {
            return Err(SigCondError::config(format!(
                "network format version {} is newer than supported version {}",
                self.version, NETWORK_FORMAT_VERSION
            )));
        }

        let mut graph = FilterGraph::new();
        let mut terminals = HashMap::new();
        for tc in &self.terminals {
            if terminals.contains_key(&tc.name) {
                return Err(SigCondError::DuplicateKey {
                    kind: "terminal",
                    key: tc.name.clone(),
                });
            }
            let terminal = Terminal::new(&tc.name, tc.id)
                .with_weight(tc.weight)
                .with_offset(tc.offset)
                .with_mode(tc.trigger)
                .with_initial(tc.initial);
            terminals.insert(tc.name.clone(), graph.add_terminal(terminal));
        }

        let resolve = |owner: &str, name: &str| -> Result<TerminalId> {
            terminals.get(name).copied().ok_or_else(|| {
                SigCondError::config(format!("'{owner}' refers to unknown terminal '{name}'"))
            })
        };

        let mut filters = HashMap::new();
        for fc in &self.filters {
            if filters.contains_key(&fc.name) {
                return Err(SigCondError::DuplicateKey {
                    kind: "filter",
                    key: fc.name.clone(),
                });
            }
            let filter = fc
                .kind
                .instantiate()
                .with_context(|| format!("filter '{}'", fc.name))?;
            let node = FilterNode::new(&fc.name, fc.id, filter)
                .with_input_gate(fc.input_gate)
                .with_output_gate(fc.output_gate);

            let inputs = fc
                .inputs
                .iter()
                .map(|name| resolve(&fc.name, name))
                .collect::<Result<Vec<_>>>()?;
            let node_id = graph
                .add_node_with_inputs(node, &inputs)
                .with_context(|| format!("filter '{}'", fc.name))?;

            for name in &fc.outputs {
                let terminal = resolve(&fc.name, name)?;
                graph
                    .attach_output(node_id, terminal)
                    .with_context(|| format!("filter '{}' output '{}'", fc.name, name))?;
            }
            filters.insert(fc.name.clone(), node_id);
        }

        graph
            .plan()
            .with_context(|| format!("network '{}'", self.name))?;

        let mut detectors: Vec<DetectorBinding> = Vec::with_capacity(self.detectors.len());
        for dc in &self.detectors {
            if detectors.iter().any(|d| d.detector.parameter_name() == dc.name) {
                return Err(SigCondError::DuplicateKey {
                    kind: "detector",
                    key: dc.name.clone(),
                });
            }
            let params = dc
                .params()
                .with_context(|| format!("detector '{}'", dc.name))?;
            let source = dc
                .source
                .as_deref()
                .map(|name| resolve(&dc.name, name))
                .transpose()?;
            let fed_at = source
                .and_then(|t| graph.terminal(t))
                .map_or(0, Terminal::write_count);
            detectors.push(DetectorBinding {
                detector: StaLtaDetector::new(&dc.name, params)?,
                source,
                fed_at,
            });
        }

        tracing::info!(
            "Built network '{}': {} terminals, {} filters, {} detectors",
            self.name,
            terminals.len(),
            filters.len(),
            detectors.len()
        );

        Ok(Network {
            name: self.name.clone(),
            graph,
            terminals,
            filters,
            detectors,
        })
    }
}

// ==================== Network ====================

/// A detector together with the terminal that feeds it, if any.
pub struct DetectorBinding {
    pub detector: StaLtaDetector,
    pub source: Option<TerminalId>,
    /// Source write count at the last feed.
    fed_at: u64,
}

/// A live network built from a [`NetworkConfig`].
pub struct Network {
    pub name: String,
    pub graph: FilterGraph,
    terminals: HashMap<String, TerminalId>,
    filters: HashMap<String, NodeId>,
    detectors: Vec<DetectorBinding>,
}

impl Network {
    pub fn terminal(&self, name: &str) -> Option<TerminalId> {
        self.terminals.get(name).copied()
    }

    pub fn filter(&self, name: &str) -> Option<NodeId> {
        self.filters.get(name).copied()
    }

    /// Write `value` into the named terminal and run the cascade.
    pub fn put(&mut self, terminal: &str, value: f64) -> Result<()> {
        let id = self
            .terminal(terminal)
            .ok_or_else(|| SigCondError::config(format!("unknown terminal '{terminal}'")))?;
        self.graph.put(id, value)?;
        Ok(())
    }

    /// Last propagated value of the named filter.
    pub fn output(&self, filter: &str) -> Option<f64> {
        self.filter(filter).and_then(|id| self.graph.output_value(id))
    }

    pub fn detector(&self, name: &str) -> Option<&StaLtaDetector> {
        self.detectors
            .iter()
            .map(|d| &d.detector)
            .find(|d| d.parameter_name() == name)
    }

    pub fn detector_mut(&mut self, name: &str) -> Option<&mut StaLtaDetector> {
        self.detectors
            .iter_mut()
            .map(|d| &mut d.detector)
            .find(|d| d.parameter_name() == name)
    }

    pub fn detectors(&self) -> &[DetectorBinding] {
        &self.detectors
    }

    /// Feed every detector whose source terminal was written since its last
    /// feed, whether by a direct `put` or by the cascade, with that
    /// terminal's transformed value.
    ///
    /// Returns `(detector name, transition)` for each detector that changed state.
    pub fn feed_detectors(&mut self, timestamp_ms: i64) -> Vec<(String, Transition)> {
        let graph = &self.graph;
        self.detectors
            .iter_mut()
            .filter_map(|binding| {
                let terminal = graph.terminal(binding.source?)?;
                if terminal.write_count() == binding.fed_at {
                    return None;
                }
                binding.fed_at = terminal.write_count();
                binding
                    .detector
                    .add_sample(terminal.value(), timestamp_ms)
                    .map(|t| (binding.detector.parameter_name().to_string(), t))
            })
            .collect()
    }

    /// Write one sample into `terminal`, run the cascade, then feed the
    /// detectors it reached.
    pub fn process(
        &mut self,
        terminal: TerminalId,
        value: f64,
        timestamp_ms: i64,
    ) -> Result<Vec<(String, Transition)>> {
        self.graph.put(terminal, value)?;
        Ok(self.feed_detectors(timestamp_ms))
    }

    /// Filter names with their last propagated values, in declaration order.
    pub fn outputs(&self) -> Vec<(&str, f64)> {
        self.graph
            .nodes()
            .map(|(_, node)| (node.name(), node.last_output_value()))
            .collect()
    }

    /// Reset every filter, terminal and detector.
    pub fn reset(&mut self) {
        self.graph.reset_all();
        for binding in &mut self.detectors {
            binding.detector.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_builds() {
        let network = NetworkConfig::sample().build().unwrap();
        assert_eq!(network.graph.node_count(), 3);
        assert!(network.terminal("east").is_some());
        assert!(network.filter("speed_avg").is_some());
        assert!(network.detector("speed_event").is_some());
    }

    #[test]
    fn test_sample_cascade() {
        let mut network = NetworkConfig::sample().build().unwrap();
        network.put("north", 4.0).unwrap();
        network.put("east", 3.0).unwrap();
        assert_eq!(network.output("speed"), Some(5.0));
        let heading = network.output("heading").unwrap();
        assert!((heading - 3.0f64.atan2(4.0).to_degrees()).abs() < 1e-9);
        // speed fired once with north only (4.0), then 5.0
        assert_eq!(network.output("speed_avg"), Some(4.5));
    }

    #[test]
    fn test_duplicate_terminal_name() {
        let mut config = NetworkConfig::new("dup");
        config.terminals = vec![TerminalConfig::new("a", 0), TerminalConfig::new("a", 1)];
        let err = config.build().err().unwrap();
        assert!(matches!(err, SigCondError::DuplicateKey { kind: "terminal", .. }));
    }

    #[test]
    fn test_unknown_terminal_reference() {
        let mut config = NetworkConfig::new("bad");
        config.filters = vec![FilterConfig::new("u", FilterKind::Unity).with_inputs(["nope"])];
        let err = config.build().err().unwrap();
        assert!(err.to_string().contains("unknown terminal 'nope'"));
    }

    #[test]
    fn test_invalid_boxcar_names_filter() {
        let mut config = NetworkConfig::new("bad");
        config.terminals = vec![TerminalConfig::new("a", 0)];
        config.filters = vec![FilterConfig::new("smooth", FilterKind::Boxcar { depth: 0 })
            .with_inputs(["a"])];
        let err = config.build().err().unwrap();
        assert!(err.to_string().starts_with("filter 'smooth'"));
    }

    #[test]
    fn test_arity_reported() {
        let mut config = NetworkConfig::new("bad");
        config.terminals = vec![TerminalConfig::new("a", 0)];
        config.filters = vec![FilterConfig::new(
            "h",
            FilterKind::Heading {
                units: HeadingUnits::Radians,
            },
        )
        .with_inputs(["a"])];
        assert!(config.build().is_err());
    }

    #[test]
    fn test_detector_from_durations() {
        let dc = DetectorConfig {
            name: "d".into(),
            trigger_ratio: 2.0,
            de_trigger_ratio: 1.0,
            sample_interval_secs: Some(0.5),
            sta_secs: Some(5.0),
            lta_secs: Some(60.0),
            max_triggered_secs: Some(30.0),
            ..Default::default()
        };
        let params = dc.params().unwrap();
        assert_eq!(params.sta_width, 10);
        assert_eq!(params.lta_width, 120);
        assert_eq!(params.max_triggered_samples, 60);
    }

    #[test]
    fn test_detector_missing_width() {
        let dc = DetectorConfig {
            name: "d".into(),
            trigger_ratio: 2.0,
            de_trigger_ratio: 1.0,
            sta_width: Some(2),
            ..Default::default()
        };
        assert!(dc.params().is_err());
    }

    #[test]
    fn test_feed_detectors_uses_source() {
        let mut config = NetworkConfig::new("det");
        config.terminals = vec![
            TerminalConfig::new("level", 0),
            TerminalConfig::new("other", 1),
        ];
        config.detectors = vec![DetectorConfig {
            name: "burst".into(),
            source: Some("level".into()),
            trigger_ratio: 2.0,
            de_trigger_ratio: 1.2,
            sta_width: Some(1),
            lta_width: Some(4),
            max_triggered_samples: Some(50),
            ..Default::default()
        }];
        let mut network = config.build().unwrap();
        let level = network.terminal("level").unwrap();
        let other = network.terminal("other").unwrap();

        for t in 0..5 {
            assert!(network.process(level, 1.0, t).unwrap().is_empty());
            // writes elsewhere do not feed the detector
            assert!(network.process(other, 99.0, t).unwrap().is_empty());
        }
        assert_eq!(network.detector("burst").unwrap().sample_count(), 5);

        let fired = network.process(level, 10.0, 5).unwrap();
        assert_eq!(fired, vec![("burst".to_string(), Transition::Triggered)]);
        assert_eq!(network.detector("burst").unwrap().transition_time(), 5);
    }

    #[test]
    fn test_feed_without_write_is_noop() {
        let mut network = NetworkConfig::sample().build().unwrap();
        assert!(network.feed_detectors(0).is_empty());
        assert_eq!(network.detector("speed_event").unwrap().sample_count(), 0);
    }
}
