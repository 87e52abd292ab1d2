//! The filter graph arena.
//!
//! `FilterGraph` owns every terminal and every node; wiring is expressed
//! with `TerminalId`/`NodeId` indices. A node *owns* its input terminals
//! (the terminal records the node as a consumer) and *feeds* any number of
//! downstream terminals, which are in turn owned by other nodes.
//!
//! `put` runs the cascade: write the terminal, then depth-first for every
//! consumer run gate → compute → gate and write the result into each
//! downstream terminal, recursively. Wiring that would close a loop is
//! refused when it is made, so the cascade always terminates.

use super::compiled_plan::CompiledPlan;
use super::compiler::FilterCompiler;
use super::error::{PipelineError, PipelineResult};
use super::id::{NodeId, TerminalId};
use super::node::FilterNode;
use super::terminal::Terminal;
use std::fmt::Write as _;

pub struct FilterGraph {
    terminals: Vec<Terminal>,
    nodes: Vec<FilterNode>,

    compiled_plan: CompiledPlan,
    compiled_plan_dirty: bool,
    graph_generation: u64,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self {
            terminals: Vec::new(),
            nodes: Vec::new(),
            compiled_plan: CompiledPlan::new(),
            compiled_plan_dirty: true,
            graph_generation: 0,
        }
    }

    // ── Construction ──

    pub fn add_terminal(&mut self, terminal: Terminal) -> TerminalId {
        let id = TerminalId(self.terminals.len() as u32);
        tracing::debug!("Added terminal '{}' as {:?}", terminal.name(), id);
        self.terminals.push(terminal);
        self.invalidate_compiled_plan();
        id
    }

    /// Add a node. Any inputs or outputs already listed on `node` are ignored;
    /// wire them with [`add_input`](Self::add_input) and
    /// [`attach_output`](Self::attach_output).
    pub fn add_node(&mut self, mut node: FilterNode) -> NodeId {
        node.inputs.clear();
        node.outputs.clear();
        let id = NodeId(self.nodes.len() as u32);
        tracing::debug!(
            "Added node '{}' ({}) as {:?}",
            node.name(),
            node.filter().kind(),
            id
        );
        self.nodes.push(node);
        self.invalidate_compiled_plan();
        id
    }

    /// Add a node together with its initial inputs. Nothing is added if any input is rejected.
    pub fn add_node_with_inputs(
        &mut self,
        node: FilterNode,
        inputs: &[TerminalId],
    ) -> PipelineResult<NodeId> {
        for (i, &t) in inputs.iter().enumerate() {
            self.check_terminal(t)?;
            let term = &self.terminals[t.index()];
            for &earlier in &inputs[..i] {
                let other = &self.terminals[earlier.index()];
                if let Some((kind, key)) = Self::collision(other, term) {
                    return Err(PipelineError::DuplicateInput {
                        node: NodeId(self.nodes.len() as u32),
                        kind,
                        key,
                    });
                }
            }
        }

        let id = self.add_node(node);
        for &t in inputs {
            // A fresh node has no outputs, so no cycle can form
            self.nodes[id.index()].inputs.push(t);
            self.terminals[t.index()].attach(id);
        }
        Ok(id)
    }

    /// Give `node` ownership of `terminal`.
    ///
    /// # Errors
    /// * `DuplicateInput` if the node already owns a terminal with the same name or id
    /// * `CycleDetected` if the node's output can already reach `terminal`
    pub fn add_input(&mut self, node: NodeId, terminal: TerminalId) -> PipelineResult<()> {
        self.check_node(node)?;
        self.check_terminal(terminal)?;

        let term = &self.terminals[terminal.index()];
        for &existing in &self.nodes[node.index()].inputs {
            if let Some((kind, key)) = Self::collision(&self.terminals[existing.index()], term) {
                return Err(PipelineError::DuplicateInput { node, kind, key });
            }
        }

        for producer in self.producers_of(terminal) {
            if producer == node || self.reaches(node, producer) {
                return Err(PipelineError::CycleDetected {
                    from: node,
                    to: producer,
                });
            }
        }

        self.nodes[node.index()].inputs.push(terminal);
        self.terminals[terminal.index()].attach(node);
        self.invalidate_compiled_plan();
        Ok(())
    }

    /// Route `node`'s output into `terminal`. Idempotent.
    pub fn attach_output(&mut self, node: NodeId, terminal: TerminalId) -> PipelineResult<()> {
        self.check_node(node)?;
        self.check_terminal(terminal)?;

        if self.nodes[node.index()].outputs.contains(&terminal) {
            return Ok(());
        }

        for &consumer in self.terminals[terminal.index()].consumers() {
            if consumer == node || self.reaches(consumer, node) {
                return Err(PipelineError::CycleDetected {
                    from: node,
                    to: consumer,
                });
            }
        }

        self.nodes[node.index()].outputs.push(terminal);
        self.invalidate_compiled_plan();
        Ok(())
    }

    /// Stop routing `node`'s output into `terminal`. Returns whether it was attached.
    pub fn detach_output(&mut self, node: NodeId, terminal: TerminalId) -> PipelineResult<bool> {
        self.check_node(node)?;
        let outputs = &mut self.nodes[node.index()].outputs;
        let before = outputs.len();
        outputs.retain(|&t| t != terminal);
        let removed = outputs.len() != before;
        if removed {
            self.invalidate_compiled_plan();
        }
        Ok(removed)
    }

    /// Release the input called `name`. Returns its id if there was one.
    pub fn remove_input(&mut self, node: NodeId, name: &str) -> PipelineResult<Option<TerminalId>> {
        let Some(position) = self.index_of(node, name)? else {
            return Ok(None);
        };
        let terminal = self.nodes[node.index()].inputs.remove(position);
        self.terminals[terminal.index()].detach(node);
        self.invalidate_compiled_plan();
        Ok(Some(terminal))
    }

    pub fn remove_all_inputs(&mut self, node: NodeId) -> PipelineResult<()> {
        self.check_node(node)?;
        let inputs = std::mem::take(&mut self.nodes[node.index()].inputs);
        for terminal in inputs {
            self.terminals[terminal.index()].detach(node);
        }
        self.invalidate_compiled_plan();
        Ok(())
    }

    /// Rename a terminal. Refused if any node consuming it already owns
    /// another input with that name; nothing changes on error.
    pub fn rename_terminal(
        &mut self,
        terminal: TerminalId,
        name: impl Into<String>,
    ) -> PipelineResult<()> {
        self.check_terminal(terminal)?;
        let name = name.into();
        self.check_sibling_inputs(terminal, |other| other.name() == name)
            .map_err(|node| PipelineError::DuplicateInput {
                node,
                kind: "name",
                key: name.clone(),
            })?;
        self.terminals[terminal.index()].set_name(name);
        Ok(())
    }

    /// Change a terminal's id, with the same check as [`rename_terminal`](Self::rename_terminal).
    pub fn renumber_terminal(&mut self, terminal: TerminalId, id: u32) -> PipelineResult<()> {
        self.check_terminal(terminal)?;
        self.check_sibling_inputs(terminal, |other| other.id() == id)
            .map_err(|node| PipelineError::DuplicateInput {
                node,
                kind: "id",
                key: id.to_string(),
            })?;
        self.terminals[terminal.index()].set_id(id);
        Ok(())
    }

    // ── Cascade ──

    /// Write a value without propagating it.
    pub fn set(&mut self, terminal: TerminalId, value: f64) -> PipelineResult<()> {
        self.check_terminal(terminal)?;
        self.terminals[terminal.index()].set(value);
        Ok(())
    }

    /// Write a value and run the cascade to completion.
    pub fn put(&mut self, terminal: TerminalId, value: f64) -> PipelineResult<()> {
        self.check_terminal(terminal)?;
        self.terminals[terminal.index()].set(value);
        self.trigger_unchecked(terminal);
        Ok(())
    }

    /// Notify the terminal's consumers if its trigger mode allows.
    pub fn trigger(&mut self, terminal: TerminalId) -> PipelineResult<()> {
        self.check_terminal(terminal)?;
        self.trigger_unchecked(terminal);
        Ok(())
    }

    fn trigger_unchecked(&mut self, terminal: TerminalId) {
        if !self.terminals[terminal.index()].should_trigger() {
            return;
        }
        // Wiring cannot change during a cascade, so indexing stays valid
        let consumer_count = self.terminals[terminal.index()].consumers().len();
        for i in 0..consumer_count {
            let node = self.terminals[terminal.index()].consumers()[i];
            self.on_input_triggered(node, terminal);
        }
    }

    fn on_input_triggered(&mut self, node: NodeId, source: TerminalId) {
        let value = self.nodes[node.index()].evaluate(&self.terminals, source);
        if let Some(value) = value {
            self.propagate(node, value);
        }
    }

    fn propagate(&mut self, node: NodeId, value: f64) {
        let output_count = self.nodes[node.index()].outputs.len();
        for i in 0..output_count {
            let terminal = self.nodes[node.index()].outputs[i];
            self.terminals[terminal.index()].set(value);
            self.trigger_unchecked(terminal);
        }
    }

    // ── Reset ──

    /// Reset a terminal to its initial value.
    pub fn reset_terminal(&mut self, terminal: TerminalId) -> PipelineResult<()> {
        self.check_terminal(terminal)?;
        self.terminals[terminal.index()].reset();
        Ok(())
    }

    pub fn reset_node(&mut self, node: NodeId) -> PipelineResult<()> {
        self.check_node(node)?;
        self.nodes[node.index()].reset();
        Ok(())
    }

    /// Reset every node's filter state and every terminal to its initial value.
    pub fn reset_all(&mut self) {
        for node in &mut self.nodes {
            node.reset();
        }
        for terminal in &mut self.terminals {
            terminal.reset();
        }
        tracing::info!(
            "Reset {} nodes and {} terminals",
            self.nodes.len(),
            self.terminals.len()
        );
    }

    // ── Lookup ──

    pub fn terminal(&self, id: TerminalId) -> Option<&Terminal> {
        self.terminals.get(id.index())
    }

    /// Mutable access for reconfiguration (weight, offset, mode, inhibit).
    /// Names and ids change through [`rename_terminal`](Self::rename_terminal)
    /// and [`renumber_terminal`](Self::renumber_terminal).
    pub fn terminal_mut(&mut self, id: TerminalId) -> Option<&mut Terminal> {
        self.terminals.get_mut(id.index())
    }

    pub fn node(&self, id: NodeId) -> Option<&FilterNode> {
        self.nodes.get(id.index())
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut FilterNode> {
        self.nodes.get_mut(id.index())
    }

    /// First terminal with the given name.
    pub fn find_terminal(&self, name: &str) -> Option<TerminalId> {
        self.terminals
            .iter()
            .position(|t| t.name() == name)
            .map(|i| TerminalId(i as u32))
    }

    /// First node with the given name.
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.name() == name)
            .map(|i| NodeId(i as u32))
    }

    /// The node's input called `name`.
    pub fn input(&self, node: NodeId, name: &str) -> PipelineResult<Option<TerminalId>> {
        let position = self.index_of(node, name)?;
        Ok(position.map(|p| self.nodes[node.index()].inputs[p]))
    }

    /// The node's input at `position`.
    pub fn input_at(&self, node: NodeId, position: usize) -> PipelineResult<Option<TerminalId>> {
        self.check_node(node)?;
        Ok(self.nodes[node.index()].inputs.get(position).copied())
    }

    /// Position of the input called `name` among the node's inputs.
    pub fn index_of(&self, node: NodeId, name: &str) -> PipelineResult<Option<usize>> {
        self.check_node(node)?;
        Ok(self.nodes[node.index()]
            .inputs
            .iter()
            .position(|t| self.terminals[t.index()].name() == name))
    }

    pub fn input_count(&self, node: NodeId) -> PipelineResult<usize> {
        self.check_node(node)?;
        Ok(self.nodes[node.index()].input_count())
    }

    /// Last value propagated by `node`.
    pub fn output_value(&self, node: NodeId) -> Option<f64> {
        self.node(node).map(FilterNode::last_output_value)
    }

    pub fn terminals(&self) -> impl Iterator<Item = (TerminalId, &Terminal)> {
        self.terminals
            .iter()
            .enumerate()
            .map(|(i, t)| (TerminalId(i as u32), t))
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &FilterNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId(i as u32), n))
    }

    pub fn terminal_count(&self) -> usize {
        self.terminals.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Multi-line description of a node with its inputs and outputs.
    pub fn describe_node(&self, node: NodeId) -> PipelineResult<String> {
        self.check_node(node)?;
        let n = &self.nodes[node.index()];
        let mut out = format!(
            "{} [id:{} kind:{} fv:{:.2} ov:{:.2} in:{:?} out:{:?}]",
            n.name(),
            n.id(),
            n.filter().kind(),
            n.last_filter_value(),
            n.last_output_value(),
            n.input_gate(),
            n.output_gate()
        );
        for &t in n.inputs() {
            let _ = write!(out, "\n  input  {}", self.terminals[t.index()]);
        }
        for &t in n.outputs() {
            let _ = write!(out, "\n  output {}", self.terminals[t.index()]);
        }
        Ok(out)
    }

    // ── Plan ──

    /// Compiled analysis of the current wiring, recompiled if the wiring changed.
    pub fn plan(&mut self) -> PipelineResult<&CompiledPlan> {
        self.recompile_if_needed()?;
        Ok(&self.compiled_plan)
    }

    fn invalidate_compiled_plan(&mut self) {
        self.compiled_plan_dirty = true;
        self.graph_generation += 1;
    }

    fn recompile_if_needed(&mut self) -> PipelineResult<()> {
        if self.compiled_plan_dirty {
            self.compiled_plan =
                FilterCompiler::compile(&self.nodes, &self.terminals, self.graph_generation)?;
            self.compiled_plan_dirty = false;

            tracing::info!(
                "Filter graph compiled: {} nodes, {} terminals, depth {} (gen {})",
                self.compiled_plan.stats.total_nodes,
                self.compiled_plan.stats.total_terminals,
                self.compiled_plan.stats.max_depth,
                self.compiled_plan.generation,
            );

            for &idle in &self.compiled_plan.idle_nodes {
                tracing::warn!(
                    "Node '{}' ({:?}) has no inputs and will never fire",
                    self.nodes[idle.index()].name(),
                    idle
                );
            }
        }
        Ok(())
    }

    // ── Internals ──

    fn check_node(&self, node: NodeId) -> PipelineResult<()> {
        if node.index() < self.nodes.len() {
            Ok(())
        } else {
            Err(PipelineError::UnknownNode(node))
        }
    }

    fn check_terminal(&self, terminal: TerminalId) -> PipelineResult<()> {
        if terminal.index() < self.terminals.len() {
            Ok(())
        } else {
            Err(PipelineError::UnknownTerminal(terminal))
        }
    }

    fn collision(existing: &Terminal, candidate: &Terminal) -> Option<(&'static str, String)> {
        if existing.name() == candidate.name() {
            Some(("name", candidate.name().to_string()))
        } else if existing.id() == candidate.id() {
            Some(("id", candidate.id().to_string()))
        } else {
            None
        }
    }

    /// First consumer of `terminal` owning another input that `clashes`.
    fn check_sibling_inputs(
        &self,
        terminal: TerminalId,
        clashes: impl Fn(&Terminal) -> bool,
    ) -> std::result::Result<(), NodeId> {
        for &node in self.terminals[terminal.index()].consumers() {
            let clash = self.nodes[node.index()]
                .inputs
                .iter()
                .any(|&t| t != terminal && clashes(&self.terminals[t.index()]));
            if clash {
                return Err(node);
            }
        }
        Ok(())
    }

    fn producers_of(&self, terminal: TerminalId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.outputs.contains(&terminal))
            .map(|(i, _)| NodeId(i as u32))
            .collect()
    }

    /// Whether `target` is downstream of `from` through existing wiring.
    fn reaches(&self, from: NodeId, target: NodeId) -> bool {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![from];

        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            let idx = current.index();
            if visited[idx] {
                continue;
            }
            visited[idx] = true;

            for &t in &self.nodes[idx].outputs {
                stack.extend_from_slice(self.terminals[t.index()].consumers());
            }
        }
        false
    }
}

impl Default for FilterGraph {
    fn default() -> Self {
        Self::new()
    }
}
