//! # sigcond-rs: signal conditioning for instrument samples
//!
//! A synchronous dataflow graph for conditioning scalar instrument samples,
//! plus the numeric components instrument drivers use alongside it: range
//! validation with fallback substitution and STA/LTA event detection.
//!
//! ## Architecture
//!
//! - **Pipeline**: input terminals feed filter nodes (boxcar, magnitude,
//!   heading, weighted average, unity, range); each node writes its result
//!   into downstream terminals, and a single `put` cascades depth-first
//!   through the whole graph before returning
//! - **Analysis**: range validator, sliding means and the STA/LTA detector
//! - **Config**: TOML/JSON network files built into a live `Network`
//! - **Replay**: readers for recorded sample files, used by the `sigcond` CLI
//!
//! Everything in the core is single-threaded and allocation-free on the
//! cascade path. Detector transitions can be forwarded to other threads
//! through a crossbeam channel with [`analysis::EventForwarder`].
//!
//! ## Example
//!
//! ```
//! use sigcond_rs::pipeline::{FilterGraph, FilterNode, MagnitudeFilter, Terminal};
//!
//! let mut graph = FilterGraph::new();
//! let east = graph.add_terminal(Terminal::new("east", 0));
//! let north = graph.add_terminal(Terminal::new("north", 1));
//! let speed = graph
//!     .add_node_with_inputs(FilterNode::new("speed", 0, MagnitudeFilter::new()), &[east, north])
//!     .unwrap();
//!
//! graph.put(east, 3.0).unwrap();
//! graph.put(north, 4.0).unwrap();
//! assert_eq!(graph.output_value(speed), Some(5.0));
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod replay;

// Re-export commonly used types
pub use analysis::{RangeValidator, StaLtaDetector};
pub use config::{Network, NetworkConfig};
pub use error::{Result, ResultExt, SigCondError};
pub use pipeline::{FilterGraph, FilterNode, Terminal};
