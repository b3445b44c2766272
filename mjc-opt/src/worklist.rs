//! The worklist protocol shared by the peephole-style passes.
//!
//! Nodes of each graph are queued in topological order; `handle` computes
//! per-node facts (usually into the link slot) and returns whether the
//! fact changed, in which case all users are re-enqueued. A `cleanup`
//! sweep afterwards materializes the facts as rewrites. The link slot is
//! reserved for the duration of the run and the graph is re-verified after
//! unreachable code and `Bad` nodes are swept out.

use std::collections::VecDeque;

use mjc_ir::{verify_graph, Graph, Node, Program, Resources};

/// A pass driven by [run_worklist].
pub trait WorklistOptimization {
    fn name(&self) -> &'static str;

    /// Called in topological order (and again for users of changed nodes).
    /// Returns whether the node's fact changed.
    fn handle(&mut self, graph: &mut Graph, node: Node) -> bool;

    /// Called once per node after the worklist has drained.
    fn cleanup(&mut self, _graph: &mut Graph, _node: Node) {}

    /// Whether this run rewrote the graph.
    fn changed(&self) -> bool;

    /// Clears the change flag before a graph is processed.
    fn reset(&mut self);
}

/// Runs `opt` over every live graph of `program`.
pub fn run_worklist(program: &mut Program, opt: &mut dyn WorklistOptimization) -> bool {
    let mut changed = false;
    for id in program.graph_ids() {
        let graph = program.graph_mut(id);
        opt.reset();
        graph.reserve_resources(Resources::IRN_LINK);

        let mut queue: VecDeque<Node> = VecDeque::new();
        graph.walk_topological(|node| queue.push_back(node));
        while let Some(node) = queue.pop_front() {
            if graph.is_bad(node) {
                continue;
            }
            if opt.handle(graph, node) {
                for (user, _) in graph.out_edges(node) {
                    queue.push_back(user);
                }
            }
        }

        let mut order = Vec::new();
        graph.walk_topological(|node| order.push(node));
        for node in order {
            if !graph.is_bad(node) {
                opt.cleanup(graph, node);
            }
        }

        graph.free_resources(Resources::IRN_LINK);
        graph.remove_unreachable_code();
        graph.remove_bads();
        if let Err(err) = verify_graph(graph) {
            panic!("pass {} broke the graph: {err}", opt.name());
        }
        changed |= opt.changed();
    }
    changed
}
