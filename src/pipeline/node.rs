//! Filter node abstraction.
//!
//! Two-layer design:
//! - **`FilterPlugin` trait**: for filters defined outside this crate.
//! - **`BuiltinFilter` enum**: for the built-in filters. The compiler can
//!   inline match arms, avoiding dynamic dispatch on the cascade path.
//!
//! `AnyFilter` wraps either variant so the graph handles both uniformly.
//! A [`FilterNode`] pairs a filter with its identity, its input terminals,
//! the downstream terminals it feeds, and the gate policies that decide
//! whether it computes and whether it propagates.

use crate::pipeline::id::TerminalId;
use crate::pipeline::nodes::{
    BoxcarFilter, HeadingFilter, MagnitudeFilter, RangeFilter, UnityFilter,
    WeightedAverageFilter,
};
use crate::pipeline::terminal::Terminal;
use serde::{Deserialize, Serialize};

pub const DEFAULT_NODE_NAME: &str = "unknown";
pub const DEFAULT_NODE_ID: u32 = 0;

/// Result of one filter computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterOutcome {
    /// Propagate this value downstream.
    Ok(f64),
    /// Produce nothing this cycle. Not an error.
    Cancelled,
}

impl FilterOutcome {
    pub fn value(self) -> Option<f64> {
        match self {
            FilterOutcome::Ok(v) => Some(v),
            FilterOutcome::Cancelled => None,
        }
    }

    pub fn is_cancelled(self) -> bool {
        matches!(self, FilterOutcome::Cancelled)
    }
}

/// Read-only view of a node's inputs during one computation.
pub struct InputView<'a> {
    terminals: &'a [Terminal],
    inputs: &'a [TerminalId],
    source: TerminalId,
}

impl<'a> InputView<'a> {
    pub(crate) fn new(
        terminals: &'a [Terminal],
        inputs: &'a [TerminalId],
        source: TerminalId,
    ) -> Self {
        Self {
            terminals,
            inputs,
            source,
        }
    }

    /// The terminal whose trigger started this computation.
    pub fn source(&self) -> &'a Terminal {
        &self.terminals[self.source.index()]
    }

    /// Input at `position`, in the order inputs were added.
    pub fn get(&self, position: usize) -> Option<&'a Terminal> {
        self.inputs
            .get(position)
            .map(|id| &self.terminals[id.index()])
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// All inputs, in order.
    pub fn iter(&self) -> impl Iterator<Item = &'a Terminal> + '_ {
        self.inputs.iter().map(|id| &self.terminals[id.index()])
    }

    /// Inputs that are not inhibited.
    pub fn active(&self) -> impl Iterator<Item = &'a Terminal> + '_ {
        self.iter().filter(|t| !t.is_inhibited())
    }
}

/// Trait for user-defined filters.
pub trait FilterPlugin: Send {
    /// Short kind name, e.g. "median".
    fn kind(&self) -> &str;

    /// Compute an output from the current inputs.
    fn compute(&mut self, inputs: &InputView) -> FilterOutcome;

    /// Clear internal state.
    fn reset(&mut self) {}

    /// Exact number of inputs required, if fixed.
    fn required_inputs(&self) -> Option<usize> {
        None
    }
}

/// Enum dispatch for built-in filters.
#[derive(Debug, Clone)]
pub enum BuiltinFilter {
    Boxcar(BoxcarFilter),
    Magnitude(MagnitudeFilter),
    Heading(HeadingFilter),
    WeightedAverage(WeightedAverageFilter),
    Unity(UnityFilter),
    Range(RangeFilter),
}

impl BuiltinFilter {
    pub fn kind(&self) -> &str {
        match self {
            BuiltinFilter::Boxcar(_) => "boxcar",
            BuiltinFilter::Magnitude(_) => "magnitude",
            BuiltinFilter::Heading(_) => "heading",
            BuiltinFilter::WeightedAverage(_) => "weighted_average",
            BuiltinFilter::Unity(_) => "unity",
            BuiltinFilter::Range(_) => "range",
        }
    }

    pub fn compute(&mut self, inputs: &InputView) -> FilterOutcome {
        match self {
            BuiltinFilter::Boxcar(f) => f.compute(inputs),
            BuiltinFilter::Magnitude(f) => f.compute(inputs),
            BuiltinFilter::Heading(f) => f.compute(inputs),
            BuiltinFilter::WeightedAverage(f) => f.compute(inputs),
            BuiltinFilter::Unity(f) => f.compute(inputs),
            BuiltinFilter::Range(f) => f.compute(inputs),
        }
    }

    pub fn reset(&mut self) {
        match self {
            BuiltinFilter::Boxcar(f) => f.reset(),
            BuiltinFilter::Magnitude(_)
            | BuiltinFilter::Heading(_)
            | BuiltinFilter::WeightedAverage(_)
            | BuiltinFilter::Unity(_)
            | BuiltinFilter::Range(_) => {}
        }
    }

    pub fn required_inputs(&self) -> Option<usize> {
        match self {
            BuiltinFilter::Heading(_) => Some(2),
            BuiltinFilter::Unity(_) | BuiltinFilter::Range(_) => Some(1),
            BuiltinFilter::Boxcar(_)
            | BuiltinFilter::Magnitude(_)
            | BuiltinFilter::WeightedAverage(_) => None,
        }
    }
}

/// Wrapper that holds either a built-in filter (enum dispatch) or a plugin (trait object).
pub enum AnyFilter {
    Builtin(BuiltinFilter),
    Plugin(Box<dyn FilterPlugin>),
}

impl AnyFilter {
    pub fn kind(&self) -> &str {
        match self {
            AnyFilter::Builtin(f) => f.kind(),
            AnyFilter::Plugin(f) => f.kind(),
        }
    }

    pub fn compute(&mut self, inputs: &InputView) -> FilterOutcome {
        match self {
            AnyFilter::Builtin(f) => f.compute(inputs),
            AnyFilter::Plugin(f) => f.compute(inputs),
        }
    }

    pub fn reset(&mut self) {
        match self {
            AnyFilter::Builtin(f) => f.reset(),
            AnyFilter::Plugin(f) => f.reset(),
        }
    }

    pub fn required_inputs(&self) -> Option<usize> {
        match self {
            AnyFilter::Builtin(f) => f.required_inputs(),
            AnyFilter::Plugin(f) => f.required_inputs(),
        }
    }

    pub fn as_builtin(&self) -> Option<&BuiltinFilter> {
        match self {
            AnyFilter::Builtin(f) => Some(f),
            AnyFilter::Plugin(_) => None,
        }
    }

    pub fn as_builtin_mut(&mut self) -> Option<&mut BuiltinFilter> {
        match self {
            AnyFilter::Builtin(f) => Some(f),
            AnyFilter::Plugin(_) => None,
        }
    }
}

impl From<BuiltinFilter> for AnyFilter {
    fn from(f: BuiltinFilter) -> Self {
        AnyFilter::Builtin(f)
    }
}

impl From<Box<dyn FilterPlugin>> for AnyFilter {
    fn from(f: Box<dyn FilterPlugin>) -> Self {
        AnyFilter::Plugin(f)
    }
}

macro_rules! impl_from_builtin {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for AnyFilter {
                fn from(f: $ty) -> Self {
                    AnyFilter::Builtin(BuiltinFilter::$variant(f))
                }
            }
        )*
    };
}

impl_from_builtin! {
    Boxcar => BoxcarFilter,
    Magnitude => MagnitudeFilter,
    Heading => HeadingFilter,
    WeightedAverage => WeightedAverageFilter,
    Unity => UnityFilter,
    Range => RangeFilter,
}

/// Decides whether a triggered node computes at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputGate {
    #[default]
    Always,
    /// Wait until every input has been written at least once since reset.
    AllInputsUpdated,
    /// Only compute when the triggering input's raw value changed.
    SourceChanged,
}

impl InputGate {
    pub fn allows(self, inputs: &InputView) -> bool {
        match self {
            InputGate::Always => true,
            InputGate::AllInputsUpdated => inputs.iter().all(|t| t.is_updated()),
            InputGate::SourceChanged => inputs.source().is_changed(),
        }
    }
}

/// Decides whether a computed value is propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputGate {
    #[default]
    Always,
    /// Suppress a value equal to the last propagated one.
    OnChange,
}

/// A graph node: one filter plus its wiring and last values.
pub struct FilterNode {
    name: String,
    id: u32,
    filter: AnyFilter,
    pub(crate) inputs: Vec<TerminalId>,
    pub(crate) outputs: Vec<TerminalId>,
    input_gate: InputGate,
    output_gate: OutputGate,
    last_filter_value: f64,
    last_output_value: f64,
    propagations: u64,
}

impl FilterNode {
    pub fn new(name: impl Into<String>, id: u32, filter: impl Into<AnyFilter>) -> Self {
        Self {
            name: name.into(),
            id,
            filter: filter.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            input_gate: InputGate::default(),
            output_gate: OutputGate::default(),
            last_filter_value: 0.0,
            last_output_value: 0.0,
            propagations: 0,
        }
    }

    pub fn with_input_gate(mut self, gate: InputGate) -> Self {
        self.input_gate = gate;
        self
    }

    pub fn with_output_gate(mut self, gate: OutputGate) -> Self {
        self.output_gate = gate;
        self
    }

    /// Run gate, compute and output gate for one trigger. Returns the value to propagate.
    pub(crate) fn evaluate(&mut self, terminals: &[Terminal], source: TerminalId) -> Option<f64> {
        let view = InputView::new(terminals, &self.inputs, source);
        if !self.input_gate.allows(&view) {
            tracing::trace!("Node '{}' input gate closed", self.name);
            return None;
        }

        let value = match self.filter.compute(&view) {
            FilterOutcome::Ok(v) => v,
            FilterOutcome::Cancelled => {
                tracing::debug!("Node '{}' ({}) cancelled", self.name, self.filter.kind());
                return None;
            }
        };
        self.last_filter_value = value;

        let open = match self.output_gate {
            OutputGate::Always => true,
            OutputGate::OnChange => self.propagations == 0 || value != self.last_output_value,
        };
        if !open {
            return None;
        }
        self.last_output_value = value;
        self.propagations += 1;
        Some(value)
    }

    /// Clear filter state. Wiring is kept.
    pub fn reset(&mut self) {
        self.filter.reset();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    pub fn filter(&self) -> &AnyFilter {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut AnyFilter {
        &mut self.filter
    }

    /// Owned inputs, in positional order.
    pub fn inputs(&self) -> &[TerminalId] {
        &self.inputs
    }

    /// Downstream terminals fed by this node.
    pub fn outputs(&self) -> &[TerminalId] {
        &self.outputs
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn input_gate(&self) -> InputGate {
        self.input_gate
    }

    pub fn set_input_gate(&mut self, gate: InputGate) {
        self.input_gate = gate;
    }

    pub fn output_gate(&self) -> OutputGate {
        self.output_gate
    }

    pub fn set_output_gate(&mut self, gate: OutputGate) {
        self.output_gate = gate;
    }

    /// Last computed value, before the output gate.
    pub fn last_filter_value(&self) -> f64 {
        self.last_filter_value
    }

    /// Last propagated value.
    pub fn last_output_value(&self) -> f64 {
        self.last_output_value
    }

    /// Number of values propagated so far.
    pub fn propagations(&self) -> u64 {
        self.propagations
    }
}
