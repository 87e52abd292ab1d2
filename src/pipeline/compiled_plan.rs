use super::id::{NodeId, TerminalId};

/// Compiled analysis of a filter graph.
/// Produced by `FilterCompiler::compile` and cached by `FilterGraph` until the wiring changes.
#[derive(Debug, Clone)]
pub struct CompiledPlan {
    /// Nodes in topological order (upstream first)
    pub order: Vec<NodeId>,

    /// Node-to-node edges through shared terminals (producer, consumer)
    pub edges: Vec<(NodeId, NodeId)>,

    /// Terminals that feed nodes but are written by no node; callers `put` into these
    pub entry_terminals: Vec<TerminalId>,

    /// Nodes with no inputs; they can never fire
    pub idle_nodes: Vec<NodeId>,

    /// Cache invalidation generation number
    pub generation: u64,

    /// Compilation statistics
    pub stats: PlanStats,
}

/// Statistics about the compiled plan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanStats {
    /// Total number of nodes in the graph
    pub total_nodes: usize,

    /// Total number of terminals in the graph
    pub total_terminals: usize,

    /// Nodes with at least one input written from outside the graph
    pub entry_nodes: usize,

    /// Nodes with no downstream terminals
    pub sink_nodes: usize,

    /// Nodes with no inputs
    pub idle_nodes: usize,

    /// Longest chain of nodes a single `put` can traverse
    pub max_depth: usize,

    /// Compilation time in microseconds
    pub compile_time_us: u64,
}

impl CompiledPlan {
    /// Create a new empty compiled plan
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            edges: Vec::new(),
            entry_terminals: Vec::new(),
            idle_nodes: Vec::new(),
            generation: 0,
            stats: PlanStats::default(),
        }
    }

    /// Check if the plan has any nodes
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Position of `node` in the topological order.
    pub fn position(&self, node: NodeId) -> Option<usize> {
        self.order.iter().position(|&n| n == node)
    }
}

impl Default for CompiledPlan {
    fn default() -> Self {
        Self::new()
    }
}
