//! Input terminals: the scalar slots through which samples enter a node.
//!
//! A terminal stores a raw value and the linear transform
//! `value = raw * weight + offset`, which is recomputed on every write and
//! never mutated independently. It also tracks whether the last write was
//! an update (always, after any write) and a change (raw value differed from
//! the previous raw value); the [`TriggerMode`] decides which of the two
//! makes the terminal notify the nodes consuming it.
//!
//! Terminals are plain data. Propagation needs the whole graph, so
//! `put`/`trigger` live on [`FilterGraph`](crate::pipeline::FilterGraph);
//! [`Terminal::set`] and [`Terminal::should_trigger`] are the two halves
//! the graph composes.

use crate::pipeline::id::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_WEIGHT: f64 = 1.0;
pub const DEFAULT_OFFSET: f64 = 0.0;
pub const DEFAULT_TERMINAL_NAME: &str = "default";
pub const DEFAULT_TERMINAL_ID: u32 = 0;

/// When a terminal notifies its consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    /// Trigger after every write.
    #[default]
    OnUpdate,
    /// Trigger only when the raw value differs from the previous one.
    OnChange,
}

impl TriggerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerMode::OnUpdate => "on_update",
            TriggerMode::OnChange => "on_change",
        }
    }
}

/// A named, transformable scalar input slot.
#[derive(Debug, Clone)]
pub struct Terminal {
    name: String,
    id: u32,
    weight: f64,
    offset: f64,
    mode: TriggerMode,
    inhibited: bool,
    raw_value: f64,
    value: f64,
    initial_value: f64,
    changed: bool,
    updated: bool,
    /// Writes since creation; never reset.
    writes: u64,
    /// Nodes that own this terminal as one of their inputs.
    consumers: Vec<NodeId>,
}

impl Terminal {
    /// Create a terminal with unit weight, zero offset and `OnUpdate` triggering.
    pub fn new(name: impl Into<String>, id: u32) -> Self {
        Self {
            name: name.into(),
            id,
            weight: DEFAULT_WEIGHT,
            offset: DEFAULT_OFFSET,
            mode: TriggerMode::default(),
            inhibited: false,
            raw_value: 0.0,
            value: DEFAULT_OFFSET,
            initial_value: 0.0,
            changed: false,
            updated: false,
            writes: 0,
            consumers: Vec::new(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self.value = self.transform(self.raw_value);
        self
    }

    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self.value = self.transform(self.raw_value);
        self
    }

    pub fn with_mode(mut self, mode: TriggerMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the initial value and apply it as the current raw value.
    pub fn with_initial(mut self, initial: f64) -> Self {
        self.initial_value = initial;
        self.raw_value = initial;
        self.value = self.transform(initial);
        self
    }

    #[inline]
    fn transform(&self, raw: f64) -> f64 {
        raw * self.weight + self.offset
    }

    // ── Writes ──

    /// Store a new raw value without propagating.
    pub fn set(&mut self, value: f64) {
        self.changed = value != self.raw_value;
        self.raw_value = value;
        self.value = self.transform(value);
        self.updated = true;
        self.writes = self.writes.wrapping_add(1);
        tracing::trace!(
            "Terminal '{}' set raw={} value={} changed={}",
            self.name,
            self.raw_value,
            self.value,
            self.changed
        );
    }

    /// Whether the terminal should notify its consumers after the last write.
    pub fn should_trigger(&self) -> bool {
        !self.inhibited
            && match self.mode {
                TriggerMode::OnChange => self.changed,
                TriggerMode::OnUpdate => self.updated,
            }
    }

    /// Reinitialise from `value`, clearing the change/update/inhibit flags.
    pub fn reset_to(&mut self, value: f64) {
        self.changed = false;
        self.updated = false;
        self.inhibited = false;
        self.raw_value = value;
        self.value = self.transform(value);
    }

    /// Reinitialise from the configured initial value.
    pub fn reset(&mut self) {
        self.reset_to(self.initial_value);
    }

    /// Number of writes since the terminal was created, including writes made
    /// by the cascade. Resets do not count and do not clear it.
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    // ── Consumers ──

    pub(crate) fn attach(&mut self, node: NodeId) {
        if !self.consumers.contains(&node) {
            self.consumers.push(node);
        }
    }

    pub(crate) fn detach(&mut self, node: NodeId) {
        self.consumers.retain(|&n| n != node);
    }

    /// Nodes notified when this terminal triggers.
    pub fn consumers(&self) -> &[NodeId] {
        &self.consumers
    }

    // ── Accessors ──

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Use [`FilterGraph::rename_terminal`](crate::pipeline::FilterGraph::rename_terminal)
    /// on a wired terminal so consumer nodes are re-checked.
    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Takes effect on the next write.
    pub fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Takes effect on the next write.
    pub fn set_offset(&mut self, offset: f64) {
        self.offset = offset;
    }

    pub fn mode(&self) -> TriggerMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: TriggerMode) {
        self.mode = mode;
    }

    pub fn is_inhibited(&self) -> bool {
        self.inhibited
    }

    pub fn set_inhibited(&mut self, inhibited: bool) {
        self.inhibited = inhibited;
    }

    pub fn initial_value(&self) -> f64 {
        self.initial_value
    }

    pub fn set_initial(&mut self, value: f64) {
        self.initial_value = value;
    }

    pub fn raw_value(&self) -> f64 {
        self.raw_value
    }

    /// The transformed value, `raw * weight + offset`.
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub fn is_updated(&self) -> bool {
        self.updated
    }
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new(DEFAULT_TERMINAL_NAME, DEFAULT_TERMINAL_ID)
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} id:{} w:{} o:{:.2} m:{} u:{} c:{} i:{}][r:{:.2} v:{:.2}]",
            self.name,
            self.id,
            self.weight,
            self.offset,
            self.mode.as_str(),
            self.updated,
            self.changed,
            self.inhibited,
            self.raw_value,
            self.value
        )
    }
}
