//! Node-based signal-conditioning graph.
//!
//! Values enter through input terminals, flow through filter nodes, and
//! land in downstream terminals that are themselves inputs of further
//! nodes. A single `put` walks the whole downstream graph synchronously.
//!
//! # Architecture
//!
//! ```text
//! east ──┬──► [Magnitude] ──► speed ──► [Boxcar] ──► speed_avg
//! north ─┴──► [Heading] ───► heading
//! ```
//!
//! # Design
//!
//! - **Arena storage**: `FilterGraph` owns every terminal and node; wiring is
//!   `TerminalId`/`NodeId` indices.
//! - **Enum dispatch on hot path**: `BuiltinFilter` enum for all built-in filters,
//!   `FilterPlugin` for the rest.
//! - **Acyclic by construction**: wiring that would close a loop is refused; the
//!   compiler re-checks and reports plan stats.
//! - **No allocation on the cascade**: compute reads inputs through a borrowed `InputView`.

pub mod compiled_plan;
pub mod compiler;
pub mod error;
pub mod graph;
pub mod id;
pub mod node;
pub mod nodes;
pub mod terminal;

pub use compiled_plan::{CompiledPlan, PlanStats};
pub use compiler::FilterCompiler;
pub use error::{PipelineError, PipelineResult};
pub use graph::FilterGraph;
pub use id::{NodeId, TerminalId};
pub use node::{
    AnyFilter, BuiltinFilter, FilterNode, FilterOutcome, FilterPlugin, InputGate, InputView,
    OutputGate,
};
pub use nodes::{
    BoxcarFilter, HeadingFilter, HeadingUnits, MagnitudeFilter, RangeFilter, UnityFilter,
    WeightedAverageFilter,
};
pub use terminal::{Terminal, TriggerMode};
