//! Control-flow simplification.
//!
//! Blocks containing nothing but jumps and phis are "removable". A block
//! with exactly one predecessor edge coming from a jump is merged into the
//! predecessor block; phi inputs are rewritten accordingly and keep-alive
//! edges dropped when a looping phi collapses. A `Cond` whose true and
//! false successors reach the same block (with agreeing phi inputs) turns
//! into an unconditional jump. Afterwards unreachable code and `Bad`
//! nodes are swept and the graph is re-verified.

use mjc_ir::{verify_graph, Graph, Node, OpKind, Program, Resources};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::Optimization;

#[derive(Default)]
pub struct ControlFlow {
    changed: bool,
}

impl Optimization for ControlFlow {
    fn name(&self) -> &'static str {
        "control_flow"
    }

    fn optimize(&mut self, program: &mut Program) -> bool {
        self.changed = false;
        for id in program.graph_ids() {
            let graph = program.graph_mut(id);
            graph.reserve_resources(Resources::IRN_LINK | Resources::PHI_LIST);
            let mut pass = GraphPass {
                removable: compute_removable(graph),
                visited: FxHashSet::default(),
                changed: false,
            };
            let end_block = graph.end_block();
            pass.optimize_block(graph, end_block);
            self.changed |= pass.changed;
            graph.free_resources(Resources::IRN_LINK | Resources::PHI_LIST);
            graph.remove_unreachable_code();
            graph.remove_bads();
            if let Err(err) = verify_graph(graph) {
                panic!("control_flow broke the graph: {err}");
            }
        }
        self.changed
    }
}

/// A block is removable when it contains only jumps and phis.
fn compute_removable(graph: &Graph) -> FxHashMap<Node, bool> {
    let mut removable: FxHashMap<Node, bool> = FxHashMap::default();
    for block in graph.blocks() {
        removable.insert(block, true);
    }
    graph.walk(|node| {
        if graph.is_block(node) {
            return;
        }
        if !matches!(graph.op(node), OpKind::Jmp | OpKind::Phi { .. }) {
            removable.insert(graph.block_of(node), false);
        }
    });
    // start and end are structural and never merged away
    removable.insert(graph.start_block(), false);
    removable.insert(graph.end_block(), false);
    removable
}

struct GraphPass {
    removable: FxHashMap<Node, bool>,
    visited: FxHashSet<Node>,
    changed: bool,
}

impl GraphPass {
    fn is_removable(&self, block: Node) -> bool {
        self.removable.get(&block).copied().unwrap_or(false)
    }

    /// Walks the CFG bottom-up and simplifies each block once.
    fn optimize_block(&mut self, graph: &mut Graph, block: Node) -> bool {
        if !self.visited.insert(block) {
            return false;
        }
        for pred in pred_blocks(graph, block) {
            if self.optimize_block(graph, pred) {
                // the graph below changed shape; retry on the next round
                return false;
            }
        }

        let live_preds: Vec<(usize, Node)> = graph
            .ins(block)
            .iter()
            .enumerate()
            .filter(|(_, &pred)| !graph.is_bad(pred))
            .map(|(idx, &pred)| (idx, pred))
            .collect();
        if live_preds.len() == 1 && self.try_merge(graph, block, live_preds[0].0) {
            self.changed = true;
            return true;
        }

        if remove_trivial_cond(graph, block) {
            self.changed = true;
            return true;
        }

        if self.merge_removable_preds(graph, block) {
            self.changed = true;
        }
        false
    }

    /// Merges `block` into its unique predecessor when the incoming edge is
    /// a plain jump.
    fn try_merge(&mut self, graph: &mut Graph, block: Node, pred_idx: usize) -> bool {
        if block == graph.start_block() || block == graph.end_block() {
            return false;
        }
        let pred = graph.in_at(block, pred_idx);
        if !matches!(graph.op(pred), OpKind::Jmp) {
            return false;
        }
        let pred_block = graph.block_of(pred);
        if pred_block == block {
            return false;
        }
        // single predecessor: every phi forwards its only input
        for phi in graph.phis_of_block(block) {
            let input = graph.in_at(phi, pred_idx);
            exchange_phi(graph, phi, input);
        }
        if !self.is_removable(block) {
            self.removable.insert(pred_block, false);
        }
        graph.exchange(block, pred_block);
        true
    }

    /// Splices removable predecessor blocks into `block`'s predecessor
    /// list, so chains of empty blocks collapse.
    fn merge_removable_preds(&mut self, graph: &mut Graph, block: Node) -> bool {
        let preds: Vec<Node> = graph.ins(block).to_vec();
        let mut splice: Option<(usize, Node)> = None;
        for (idx, &pred) in preds.iter().enumerate() {
            if graph.is_bad(pred) || !matches!(graph.op(pred), OpKind::Jmp) {
                continue;
            }
            let pred_block = graph.block_of(pred);
            if pred_block == block
                || !self.is_removable(pred_block)
                || graph.arity(pred_block) < 2
            {
                continue;
            }
            // never splice a loop header into its successor
            let no_self_loop = graph
                .ins(pred_block)
                .iter()
                .all(|&p| graph.is_bad(p) || graph.block_of(p) != pred_block);
            // only splice when the values flowing through are expressible:
            // each phi input at this edge is either defined elsewhere or a
            // phi of the spliced block itself
            let splicable = graph.phis_of_block(block).into_iter().all(|phi| {
                let input = graph.in_at(phi, idx);
                graph.block_of(input) != pred_block || graph.is_phi(input)
            });
            let pred_phis_consumed_locally =
                graph.phis_of_block(pred_block).into_iter().all(|phi| {
                    graph
                        .out_edges(phi)
                        .into_iter()
                        .all(|(user, _)| graph.is_phi(user) && graph.block_of(user) == block)
                });
            if no_self_loop && splicable && pred_phis_consumed_locally {
                splice = Some((idx, pred_block));
                break;
            }
        }
        let Some((edge_idx, pred_block)) = splice else {
            return false;
        };

        // positions of the vanishing block's live edges; phi inputs are
        // indexed by raw position, so keep both views aligned
        let raw_pred_ins: Vec<Node> = graph.ins(pred_block).to_vec();
        let live_positions: Vec<usize> = raw_pred_ins
            .iter()
            .enumerate()
            .filter(|(_, &p)| !graph.is_bad(p))
            .map(|(pos, _)| pos)
            .collect();
        let spliced_preds: Vec<Node> =
            live_positions.iter().map(|&pos| raw_pred_ins[pos]).collect();

        // widen the phis of `block` first: the value arriving over the
        // spliced edge is replicated, or expanded if it was a phi of the
        // vanishing block
        for phi in graph.phis_of_block(block) {
            let mut new_ins: Vec<Node> = Vec::new();
            for (idx, &input) in graph.ins(phi).to_vec().iter().enumerate() {
                if idx != edge_idx {
                    new_ins.push(input);
                    continue;
                }
                if graph.is_phi(input) && graph.block_of(input) == pred_block {
                    for &pos in &live_positions {
                        new_ins.push(graph.in_at(input, pos));
                    }
                } else {
                    new_ins.extend(std::iter::repeat(input).take(spliced_preds.len()));
                }
            }
            graph.set_ins(phi, &new_ins);
        }

        let mut new_block_ins: Vec<Node> = Vec::new();
        for (idx, &pred) in graph.ins(block).to_vec().iter().enumerate() {
            if idx == edge_idx {
                new_block_ins.extend(&spliced_preds);
            } else {
                new_block_ins.push(pred);
            }
        }
        graph.set_ins(block, &new_block_ins);

        // the spliced block's phis are fully absorbed; retire them
        for phi in graph.phis_of_block(pred_block) {
            if graph.phi_loops(phi) {
                graph.remove_end_keepalive(phi);
            }
            let bad = graph.new_bad(graph.mode(phi));
            graph.exchange(phi, bad);
        }
        graph.exchange(pred_block, block);
        true
    }
}

fn pred_blocks(graph: &Graph, block: Node) -> Vec<Node> {
    let mut preds = Vec::new();
    for &pred in graph.ins(block) {
        if graph.is_bad(pred) {
            continue;
        }
        let pred_block = graph.block_of(pred);
        if pred_block != block && !preds.contains(&pred_block) {
            preds.push(pred_block);
        }
    }
    preds
}

/// Replaces a phi, dropping the keep-alive edge of looping phis.
fn exchange_phi(graph: &mut Graph, phi: Node, replacement: Node) {
    if graph.phi_loops(phi) {
        graph.remove_end_keepalive(phi);
    }
    graph.exchange(phi, replacement);
}

/// Collapses a `Cond` whose two successor edges enter `block` when all
/// phis agree on the two positions.
fn remove_trivial_cond(graph: &mut Graph, block: Node) -> bool {
    let preds: Vec<Node> = graph.ins(block).to_vec();
    let mut found = false;
    for i in 0..preds.len() {
        let pred_a = preds[i];
        if graph.is_bad(pred_a) || !matches!(graph.op(pred_a), OpKind::Proj { .. }) {
            continue;
        }
        let cond = graph.in_at(pred_a, 0);
        if !matches!(graph.op(cond), OpKind::Cond) {
            continue;
        }
        for j in (i + 1)..preds.len() {
            let pred_b = preds[j];
            if graph.is_bad(pred_b) || !matches!(graph.op(pred_b), OpKind::Proj { .. }) {
                continue;
            }
            if graph.in_at(pred_b, 0) != cond {
                continue;
            }
            let phis_agree = graph
                .phis_of_block(block)
                .into_iter()
                .all(|phi| graph.in_at(phi, i) == graph.in_at(phi, j));
            if !phis_agree {
                continue;
            }
            // both outcomes are the same: jump unconditionally
            let jmp = {
                let cond_block = graph.block_of(cond);
                graph.new_jmp(cond_block)
            };
            let bad = graph.new_bad(mjc_ir::Mode::X);
            graph.set_in(block, i, jmp);
            graph.set_in(block, j, bad);
            found = true;
            break;
        }
        if found {
            break;
        }
    }
    found
}
