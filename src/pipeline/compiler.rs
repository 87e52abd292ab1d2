use super::compiled_plan::{CompiledPlan, PlanStats};
use super::error::{PipelineError, PipelineResult};
use super::id::{NodeId, TerminalId};
use super::node::FilterNode;
use super::terminal::Terminal;
use std::collections::VecDeque;

/// Compiles a filter graph into a validated plan
pub struct FilterCompiler;

impl FilterCompiler {
    /// Analyse the wiring of a filter graph.
    ///
    /// Node-to-node edges are derived from shared terminals: a node that
    /// writes terminal `t` feeds every node that consumes `t`.
    ///
    /// # Errors
    /// * `CycleDetected` if the edges do not form a DAG
    /// * `Arity` if a filter with a fixed input count owns a different number of inputs
    pub fn compile(
        nodes: &[FilterNode],
        terminals: &[Terminal],
        generation: u64,
    ) -> PipelineResult<CompiledPlan> {
        let start_time = std::time::Instant::now();

        let n = nodes.len();
        let edges = Self::build_edges(nodes, terminals);
        let producers = Self::producer_counts(nodes, terminals.len());

        let mut adj = vec![Vec::new(); n];
        for &(from, to) in &edges {
            adj[from.index()].push(to.index());
        }

        let order = Self::topological_sort(&adj);
        if order.len() != n {
            // Any edge between two unscheduled nodes lies on or feeds a cycle
            let scheduled: Vec<bool> = {
                let mut s = vec![false; n];
                for &i in &order {
                    s[i] = true;
                }
                s
            };
            let (from, to) = edges
                .iter()
                .copied()
                .find(|(a, b)| !scheduled[a.index()] && !scheduled[b.index()])
                .unwrap_or((NodeId::INVALID, NodeId::INVALID));
            return Err(PipelineError::CycleDetected { from, to });
        }

        Self::check_arity(nodes)?;

        let entry_terminals: Vec<TerminalId> = terminals
            .iter()
            .enumerate()
            .filter(|(i, t)| !t.consumers().is_empty() && producers[*i] == 0)
            .map(|(i, _)| TerminalId(i as u32))
            .collect();

        let entry_nodes = nodes
            .iter()
            .filter(|node| node.inputs().iter().any(|t| producers[t.index()] == 0))
            .count();

        let sink_nodes = nodes.iter().filter(|node| node.outputs().is_empty()).count();

        let idle_nodes: Vec<NodeId> = nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.inputs().is_empty())
            .map(|(i, _)| NodeId(i as u32))
            .collect();

        // Longest path, walking the topological order
        let mut depth = vec![1usize; n];
        for &i in &order {
            for &next in &adj[i] {
                depth[next] = depth[next].max(depth[i] + 1);
            }
        }
        let max_depth = depth.iter().copied().max().unwrap_or(0);

        let stats = PlanStats {
            total_nodes: n,
            total_terminals: terminals.len(),
            entry_nodes,
            sink_nodes,
            idle_nodes: idle_nodes.len(),
            max_depth,
            compile_time_us: start_time.elapsed().as_micros() as u64,
        };

        Ok(CompiledPlan {
            order: order.into_iter().map(|i| NodeId(i as u32)).collect(),
            edges,
            entry_terminals,
            idle_nodes,
            generation,
            stats,
        })
    }

    /// Producer → consumer node pairs, deduplicated
    fn build_edges(nodes: &[FilterNode], terminals: &[Terminal]) -> Vec<(NodeId, NodeId)> {
        let mut edges = Vec::new();
        for (from, node) in nodes.iter().enumerate() {
            for &t in node.outputs() {
                for &to in terminals[t.index()].consumers() {
                    edges.push((NodeId(from as u32), to));
                }
            }
        }
        edges.sort_unstable();
        edges.dedup();
        edges
    }

    /// Number of nodes writing each terminal
    fn producer_counts(nodes: &[FilterNode], terminal_count: usize) -> Vec<usize> {
        let mut counts = vec![0usize; terminal_count];
        for node in nodes {
            for &t in node.outputs() {
                counts[t.index()] += 1;
            }
        }
        counts
    }

    /// Kahn's algorithm. Returns the nodes it could schedule.
    fn topological_sort(adj: &[Vec<usize>]) -> Vec<usize> {
        let n = adj.len();
        let mut in_degree = vec![0usize; n];
        for targets in adj {
            for &to in targets {
                in_degree[to] += 1;
            }
        }

        let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);

        while let Some(node) = queue.pop_front() {
            order.push(node);
            for &next in &adj[node] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }

        order
    }

    fn check_arity(nodes: &[FilterNode]) -> PipelineResult<()> {
        for (i, node) in nodes.iter().enumerate() {
            if let Some(expected) = node.filter().required_inputs() {
                if node.input_count() != expected {
                    return Err(PipelineError::Arity {
                        node: NodeId(i as u32),
                        name: node.name().to_string(),
                        expected,
                        found: node.input_count(),
                    });
                }
            }
        }
        Ok(())
    }
}
