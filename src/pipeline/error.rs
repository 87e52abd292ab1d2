//! Pipeline-specific error types.

use crate::pipeline::id::{NodeId, TerminalId};
use thiserror::Error;

/// Errors that can occur while wiring or analysing a filter graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Unknown terminal {0:?}")]
    UnknownTerminal(TerminalId),

    #[error("Unknown node {0:?}")]
    UnknownNode(NodeId),

    /// An input with the same name or id is already owned by the node.
    #[error("Node {node:?} already has an input with {kind} '{key}'")]
    DuplicateInput {
        node: NodeId,
        kind: &'static str,
        key: String,
    },

    /// Wiring `from` into `to` would close a loop in the graph.
    #[error("Cycle detected: output of {from:?} would reach its own input through {to:?}")]
    CycleDetected { from: NodeId, to: NodeId },

    #[error("Node {node:?} ('{name}') needs {expected} input(s), has {found}")]
    Arity {
        node: NodeId,
        name: String,
        expected: usize,
        found: usize,
    },
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
