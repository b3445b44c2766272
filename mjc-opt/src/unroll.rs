//! Full unrolling of small counting loops.
//!
//! A loop qualifies when its only exit is a comparison in the header
//! between a counter phi and a constant, the counter advances by a
//! constant step each iteration, the trip count is at most 10 and the
//! body stays within 20 branches and 200 nodes. The body is then cloned
//! once per iteration, the header checks disappear, and the original loop
//! becomes unreachable.

use mjc_ir::{
    find_loops, pn, verify_graph, Dominance, Graph, LoopInfo, Mode, Node, OpKind, Program,
    Resources,
};
use rustc_hash::FxHashMap;

use crate::Optimization;

const MAX_LOOP_BRANCHES: usize = 20;
const MAX_LOOP_SIZE: usize = 200;
const MAX_LOOP_ITERATIONS: u32 = 10;

#[derive(Default)]
pub struct LoopUnrolling {
    changed: bool,
}

impl Optimization for LoopUnrolling {
    fn name(&self) -> &'static str {
        "unroll"
    }

    fn optimize(&mut self, program: &mut Program) -> bool {
        self.changed = false;
        for id in program.graph_ids() {
            let graph = program.graph_mut(id);
            let dom = Dominance::compute(graph);
            let loops = find_loops(graph, &dom);
            // innermost first; after one rewrite the loop tree is stale,
            // so at most one loop per graph per round
            for l in &loops {
                let Some(plan) = analyze_loop(graph, l) else {
                    continue;
                };
                graph.reserve_resources(Resources::IRN_LINK | Resources::PHI_LIST);
                do_unroll(graph, &plan);
                graph.free_resources(Resources::IRN_LINK | Resources::PHI_LIST);
                graph.remove_unreachable_code();
                graph.remove_bads();
                if let Err(err) = verify_graph(graph) {
                    panic!("unroll broke the graph: {err}");
                }
                self.changed = true;
                break;
            }
        }
        self.changed
    }
}

struct UnrollPlan {
    header: Node,
    /// Index of the entry edge in the header's predecessor list.
    entry_idx: usize,
    /// Index of the back edge.
    back_idx: usize,
    /// The projections of the header's `Cond`.
    proj_true: Node,
    proj_false: Node,
    /// Blocks belonging to the loop.
    blocks: Vec<Node>,
    /// Non-block loop nodes, including the header's comparison but
    /// excluding its phis, the `Cond` and the projections.
    body_nodes: Vec<Node>,
    /// The phis of the header.
    header_phis: Vec<Node>,
    /// Number of times the body executes.
    trip_count: u32,
}

fn analyze_loop(graph: &Graph, l: &LoopInfo) -> Option<UnrollPlan> {
    let header = l.header;
    if graph.arity(header) != 2 {
        return None;
    }
    let mut entry_idx = None;
    let mut back_idx = None;
    for (idx, &pred) in graph.ins(header).iter().enumerate() {
        if graph.is_bad(pred) {
            return None;
        }
        if l.blocks.contains(&graph.block_of(pred)) {
            back_idx = Some(idx);
        } else {
            entry_idx = Some(idx);
        }
    }
    let (entry_idx, back_idx) = (entry_idx?, back_idx?);

    // the single exit must be the false projection of a header Cond
    let mut conds_in_loop = 0usize;
    let mut node_count = 0usize;
    let mut body_nodes = Vec::new();
    let mut header_phis = Vec::new();
    let mut cond = None;
    for &block in &l.blocks {
        if block == graph.start_block() || block == graph.end_block() {
            return None;
        }
        for node in graph.nodes_of_block(block) {
            if graph.is_bad(node) {
                continue;
            }
            match graph.op(node) {
                OpKind::Cond => {
                    conds_in_loop += 1;
                    if block == header {
                        cond = Some(node);
                    }
                }
                OpKind::Phi { .. } if block == header => header_phis.push(node),
                _ => {}
            }
            if !graph.op(node).is_nop() {
                node_count += 1;
            }
        }
    }
    let cond = cond?;
    if conds_in_loop > MAX_LOOP_BRANCHES || node_count > MAX_LOOP_SIZE {
        return None;
    }

    let mut proj_true = None;
    let mut proj_false = None;
    for (user, _) in graph.out_edges(cond) {
        match *graph.op(user) {
            OpKind::Proj { num: pn::COND_TRUE } => proj_true = Some(user),
            OpKind::Proj { num: pn::COND_FALSE } => proj_false = Some(user),
            _ => {}
        }
    }
    let (proj_true, proj_false) = (proj_true?, proj_false?);
    // the false edge must leave the loop, the true edge must stay inside
    let exit_users = graph.out_edges(proj_false);
    if exit_users.len() != 1 || l.blocks.contains(&exit_users[0].0) {
        return None;
    }
    let body_users = graph.out_edges(proj_true);
    if body_users.len() != 1 || !l.blocks.contains(&body_users[0].0) {
        return None;
    }

    // the header may hold nothing but its phis, the comparison and the
    // branch, so skipping the final check is safe
    let selector = graph.in_at(cond, 0);
    if !matches!(graph.op(selector), OpKind::Cmp { .. }) {
        return None;
    }
    for node in graph.nodes_of_block(header) {
        if graph.is_bad(node) {
            continue;
        }
        let structural = node == cond
            || node == proj_true
            || node == proj_false
            || node == selector
            || graph.is_phi(node);
        if !structural {
            return None;
        }
    }

    // counter shape: Cmp(phi, bound) with a constant entry value and a
    // constant step through Add or Sub
    let OpKind::Cmp { relation } = *graph.op(selector) else {
        return None;
    };
    let lhs = graph.in_at(selector, 0);
    let rhs = graph.in_at(selector, 1);
    let (phi, bound, relation) = match (const_int(graph, lhs), const_int(graph, rhs)) {
        (None, Some(bound)) => (lhs, bound, relation),
        (Some(bound), None) => (rhs, bound, relation.inversed()),
        _ => return None,
    };
    if !graph.is_phi(phi) || graph.block_of(phi) != header || graph.arity(phi) != 2 {
        return None;
    }
    let initial = const_int(graph, graph.in_at(phi, entry_idx))?;
    let step_expr = graph.in_at(phi, back_idx);
    let step = match graph.op(step_expr) {
        OpKind::Add | OpKind::Sub => {
            let (a, b) = (graph.in_at(step_expr, 0), graph.in_at(step_expr, 1));
            if a == phi {
                const_int(graph, b)?
            } else if b == phi && matches!(graph.op(step_expr), OpKind::Add) {
                const_int(graph, a)?
            } else {
                return None;
            }
        }
        _ => return None,
    };
    let decreasing = matches!(graph.op(step_expr), OpKind::Sub);

    // simulate the counter to find the trip count
    let mut value = initial;
    let mut trips = 0u32;
    while relation.eval(value, bound) {
        trips += 1;
        if trips > MAX_LOOP_ITERATIONS {
            return None;
        }
        value = if decreasing { value.wrapping_sub(step) } else { value.wrapping_add(step) };
    }
    if trips == 0 {
        // never taken; the conditional pass handles that better
        return None;
    }

    let mut blocks: Vec<Node> = l.blocks.iter().copied().collect();
    blocks.sort_unstable();
    for &block in &blocks {
        for node in graph.nodes_of_block(block) {
            if graph.is_bad(node) || node == cond || node == proj_true || node == proj_false {
                continue;
            }
            if graph.is_phi(node) && graph.block_of(node) == header {
                continue;
            }
            body_nodes.push(node);
        }
    }

    log::debug!(
        target: "opt",
        "unrolling loop at {header} with {trips} iterations, {node_count} nodes"
    );
    Some(UnrollPlan {
        header,
        entry_idx,
        back_idx,
        proj_true,
        proj_false,
        blocks,
        body_nodes,
        header_phis,
        trip_count: trips,
    })
}

fn const_int(graph: &Graph, node: Node) -> Option<i32> {
    match *graph.op(node) {
        OpKind::Const { value } => value.as_int(),
        _ => None,
    }
}

fn do_unroll(graph: &mut Graph, plan: &UnrollPlan) {
    // value of each header phi entering the current iteration
    let mut current: FxHashMap<Node, Node> = plan
        .header_phis
        .iter()
        .map(|&phi| (phi, graph.in_at(phi, plan.entry_idx)))
        .collect();
    let mut entry_edge = graph.in_at(plan.header, plan.entry_idx);
    let back_pred = graph.in_at(plan.header, plan.back_idx);

    for _ in 0..plan.trip_count {
        let mut map: FxHashMap<Node, Node> = FxHashMap::default();

        // blocks first, inputs patched below
        for &block in &plan.blocks {
            let clone = graph.new_block(&[]);
            map.insert(block, clone);
        }
        // the cloned header degenerates to a jump into the body clone
        let header_clone = map[&plan.header];
        let jmp = graph.new_jmp(header_clone);
        map.insert(plan.proj_true, jmp);
        graph.add_block_pred(header_clone, entry_edge);

        for &node in &plan.body_nodes {
            let block = map[&graph.block_of(node)];
            let op = *graph.op(node);
            let mode = graph.mode(node);
            let ins: Vec<Node> = graph.ins(node).to_vec();
            let clone = graph.new_node(block, op, mode, &ins);
            if matches!(op, OpKind::Phi { loops: true }) {
                // an inner loop's phis need their own keep-alive edges
                graph.add_end_keepalive(clone);
            }
            map.insert(node, clone);
        }

        // patch cloned inputs and block predecessor lists
        let resolve = |map: &FxHashMap<Node, Node>,
                       current: &FxHashMap<Node, Node>,
                       node: Node| {
            if let Some(&clone) = map.get(&node) {
                clone
            } else if let Some(&value) = current.get(&node) {
                value
            } else {
                node
            }
        };
        for &node in &plan.body_nodes {
            let clone = map[&node];
            for idx in 0..graph.arity(clone) {
                let input = graph.in_at(clone, idx);
                let mapped = resolve(&map, &current, input);
                graph.set_in(clone, idx, mapped);
            }
        }
        for &block in &plan.blocks {
            if block == plan.header {
                continue;
            }
            let clone = map[&block];
            let preds: Vec<Node> = graph.ins(block).to_vec();
            let mapped: Vec<Node> =
                preds.iter().map(|&p| resolve(&map, &current, p)).collect();
            graph.set_ins(clone, &mapped);
        }

        // next iteration's phi values come off the cloned back edge
        let mut next: FxHashMap<Node, Node> = FxHashMap::default();
        for &phi in &plan.header_phis {
            let back_value = graph.in_at(phi, plan.back_idx);
            next.insert(phi, resolve(&map, &current, back_value));
        }
        current = next;
        entry_edge = resolve(&map, &current, back_pred);
    }

    // the loop is exhausted: the last back edge continues where the false
    // projection used to go
    for (user, idx) in graph.out_edges(plan.proj_false) {
        graph.set_in(user, idx, entry_edge);
    }

    // live-out values of the counters are their final states
    for &phi in &plan.header_phis {
        if graph.phi_loops(phi) {
            graph.remove_end_keepalive(phi);
        }
        let replacement = current[&phi];
        graph.exchange(phi, replacement);
    }
    graph.remove_end_keepalive(plan.header);

    // cut the loop entry; the sweep removes the old body
    let bad = graph.new_bad(Mode::X);
    graph.set_in(plan.header, plan.entry_idx, bad);
}
