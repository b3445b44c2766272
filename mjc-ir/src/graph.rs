//! The per-method SSA graph.
//!
//! Nodes live in an arena and are identified by stable indices; edges are
//! input slots on the using node. Control flow is expressed through block
//! membership: every non-block node belongs to a block, a block's inputs
//! are the control-flow edges entering it. The graph owns a per-node link
//! slot that optimization passes may reserve for scratch data; the slot is
//! cleared on reservation and release.

use bitflags::bitflags;
use cranelift_entity::{entity_impl, PrimaryMap, SecondaryMap};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::entity::{EntityId, GraphId, TypeId};
use crate::mode::Mode;
use crate::op::{pn, OpKind, Relation};
use crate::tarval::Tarval;

/// Reference to a node within one graph.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Node(u32);
entity_impl!(Node, "n");

#[derive(Clone, Debug)]
pub struct NodeData {
    pub(crate) op: OpKind,
    pub(crate) mode: Mode,
    pub(crate) block: Node,
    pub(crate) ins: SmallVec<[Node; 2]>,
}

/// Per-node scratch data owned by the currently running pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Link {
    #[default]
    None,
    Value(Tarval),
    Node(Node),
}

impl Link {
    pub fn value(self) -> Option<Tarval> {
        match self {
            Link::Value(tv) => Some(tv),
            _ => None,
        }
    }

    pub fn node(self) -> Option<Node> {
        match self {
            Link::Node(node) => Some(node),
            _ => None,
        }
    }
}

bitflags! {
    /// Graph-local resources a pass must acquire before use and release
    /// when done.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Resources: u8 {
        /// The per-node link slot.
        const IRN_LINK = 1 << 0;
        /// The per-block phi lists.
        const PHI_LIST = 1 << 1;
    }
}

/// An SSA graph for one method.
pub struct Graph {
    pub id: GraphId,
    pub entity: EntityId,
    nodes: PrimaryMap<Node, NodeData>,
    start_block: Node,
    end_block: Node,
    start: Node,
    end: Node,
    initial_mem: Node,
    args: Node,
    link: SecondaryMap<Node, Link>,
    reserved: Resources,
}

impl Graph {
    /// Creates a graph with its start/end skeleton: start and end blocks,
    /// `Start` and `End` nodes, and the initial memory and argument
    /// projections.
    pub fn new(id: GraphId, entity: EntityId) -> Self {
        let mut nodes = PrimaryMap::new();
        let start_block = nodes.push(NodeData {
            op: OpKind::Block,
            mode: Mode::X,
            block: Node::from_u32(0),
            ins: SmallVec::new(),
        });
        let mut graph = Self {
            id,
            entity,
            nodes,
            start_block,
            end_block: start_block,
            start: start_block,
            end: start_block,
            initial_mem: start_block,
            args: start_block,
            link: SecondaryMap::new(),
            reserved: Resources::empty(),
        };
        graph.nodes[start_block].block = start_block;
        graph.end_block = graph.raw_new_block(&[]);
        graph.start = graph.add_node(graph.start_block, OpKind::Start, Mode::T, &[]);
        graph.end = graph.add_node(graph.end_block, OpKind::End, Mode::X, &[]);
        graph.initial_mem = graph.new_proj(graph.start, Mode::M, pn::START_M);
        graph.args = graph.new_proj(graph.start, Mode::T, pn::START_T_ARGS);
        graph
    }

    // Accessors.

    pub fn start_block(&self) -> Node {
        self.start_block
    }

    pub fn end_block(&self) -> Node {
        self.end_block
    }

    pub fn start(&self) -> Node {
        self.start
    }

    pub fn end(&self) -> Node {
        self.end
    }

    pub fn initial_mem(&self) -> Node {
        self.initial_mem
    }

    pub fn set_initial_mem(&mut self, node: Node) {
        self.initial_mem = node;
    }

    pub fn args(&self) -> Node {
        self.args
    }

    pub fn set_start_block(&mut self, block: Node) {
        debug_assert!(self.is_block(block));
        self.start_block = block;
    }

    pub fn op(&self, node: Node) -> &OpKind {
        &self.nodes[node].op
    }

    pub fn mode(&self, node: Node) -> Mode {
        self.nodes[node].mode
    }

    pub fn block_of(&self, node: Node) -> Node {
        self.nodes[node].block
    }

    pub fn set_block_of(&mut self, node: Node, block: Node) {
        debug_assert!(self.is_block(block));
        self.nodes[node].block = block;
    }

    pub fn ins(&self, node: Node) -> &[Node] {
        &self.nodes[node].ins
    }

    pub fn arity(&self, node: Node) -> usize {
        self.nodes[node].ins.len()
    }

    pub fn in_at(&self, node: Node, idx: usize) -> Node {
        self.nodes[node].ins[idx]
    }

    pub fn set_in(&mut self, node: Node, idx: usize, value: Node) {
        self.nodes[node].ins[idx] = value;
    }

    pub fn set_ins(&mut self, node: Node, ins: &[Node]) {
        self.nodes[node].ins = SmallVec::from_slice(ins);
    }

    pub fn is_block(&self, node: Node) -> bool {
        matches!(self.nodes[node].op, OpKind::Block)
    }

    pub fn is_bad(&self, node: Node) -> bool {
        matches!(self.nodes[node].op, OpKind::Bad)
    }

    pub fn is_phi(&self, node: Node) -> bool {
        matches!(self.nodes[node].op, OpKind::Phi { .. })
    }

    /// All node indices ever allocated, including dead ones.
    pub fn node_ids(&self) -> impl Iterator<Item = Node> + '_ {
        self.nodes.keys()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // Node construction.

    fn add_node(&mut self, block: Node, op: OpKind, mode: Mode, ins: &[Node]) -> Node {
        debug_assert!(self.is_block(block) || matches!(op, OpKind::Block));
        self.nodes.push(NodeData { op, mode, block, ins: SmallVec::from_slice(ins) })
    }

    fn raw_new_block(&mut self, preds: &[Node]) -> Node {
        let block = self.nodes.push(NodeData {
            op: OpKind::Block,
            mode: Mode::X,
            block: Node::from_u32(0),
            ins: SmallVec::from_slice(preds),
        });
        self.nodes[block].block = block;
        block
    }

    pub fn new_block(&mut self, preds: &[Node]) -> Node {
        self.raw_new_block(preds)
    }

    /// Creates a node from its raw parts, e.g. when cloning. The caller is
    /// responsible for arity and mode consistency.
    pub fn new_node(&mut self, block: Node, op: OpKind, mode: Mode, ins: &[Node]) -> Node {
        debug_assert!(!matches!(op, OpKind::Block));
        self.add_node(block, op, mode, ins)
    }

    /// Appends an incoming control-flow edge to a block.
    pub fn add_block_pred(&mut self, block: Node, pred: Node) {
        debug_assert!(self.is_block(block));
        self.nodes[block].ins.push(pred);
    }

    pub fn new_jmp(&mut self, block: Node) -> Node {
        self.add_node(block, OpKind::Jmp, Mode::X, &[])
    }

    pub fn new_cond(&mut self, block: Node, selector: Node) -> Node {
        self.add_node(block, OpKind::Cond, Mode::T, &[selector])
    }

    pub fn new_proj(&mut self, pred: Node, mode: Mode, num: u32) -> Node {
        let block = self.nodes[pred].block;
        self.add_node(block, OpKind::Proj { num }, mode, &[pred])
    }

    pub fn new_return(&mut self, block: Node, mem: Node, value: Option<Node>) -> Node {
        let mut ins: SmallVec<[Node; 2]> = SmallVec::new();
        ins.push(mem);
        ins.extend(value);
        self.add_node(block, OpKind::Return, Mode::X, &ins)
    }

    pub fn new_phi(&mut self, block: Node, ins: &[Node], mode: Mode) -> Node {
        self.add_node(block, OpKind::Phi { loops: false }, mode, ins)
    }

    /// A phi on a loop header, kept alive through an `End` edge so the loop
    /// body survives dead-code elimination.
    pub fn new_phi_loop(&mut self, block: Node, ins: &[Node], mode: Mode) -> Node {
        let phi = self.add_node(block, OpKind::Phi { loops: true }, mode, ins);
        self.add_end_keepalive(phi);
        phi
    }

    pub fn set_phi_loop(&mut self, node: Node, loops: bool) {
        debug_assert!(self.is_phi(node));
        self.nodes[node].op = OpKind::Phi { loops };
    }

    pub fn phi_loops(&self, node: Node) -> bool {
        matches!(self.nodes[node].op, OpKind::Phi { loops: true })
    }

    pub fn new_const(&mut self, value: Tarval) -> Node {
        let block = self.start_block;
        self.add_node(block, OpKind::Const { value }, value.mode(), &[])
    }

    pub fn new_member(&mut self, block: Node, ptr: Node, entity: EntityId) -> Node {
        self.add_node(block, OpKind::Member { entity }, Mode::P, &[ptr])
    }

    pub fn new_sel(&mut self, block: Node, ptr: Node, index: Node, element: TypeId) -> Node {
        self.add_node(block, OpKind::Sel { element }, Mode::P, &[ptr, index])
    }

    pub fn new_add(&mut self, block: Node, left: Node, right: Node, mode: Mode) -> Node {
        self.add_node(block, OpKind::Add, mode, &[left, right])
    }

    pub fn new_sub(&mut self, block: Node, left: Node, right: Node, mode: Mode) -> Node {
        self.add_node(block, OpKind::Sub, mode, &[left, right])
    }

    pub fn new_mul(&mut self, block: Node, left: Node, right: Node, mode: Mode) -> Node {
        self.add_node(block, OpKind::Mul, mode, &[left, right])
    }

    pub fn new_minus(&mut self, block: Node, value: Node, mode: Mode) -> Node {
        self.add_node(block, OpKind::Minus, mode, &[value])
    }

    pub fn new_div(&mut self, block: Node, mem: Node, left: Node, right: Node) -> Node {
        self.add_node(block, OpKind::Div, Mode::T, &[mem, left, right])
    }

    pub fn new_mod(&mut self, block: Node, mem: Node, left: Node, right: Node) -> Node {
        self.add_node(block, OpKind::Mod, Mode::T, &[mem, left, right])
    }

    pub fn new_cmp(&mut self, block: Node, left: Node, right: Node, relation: Relation) -> Node {
        self.add_node(block, OpKind::Cmp { relation }, Mode::Bu, &[left, right])
    }

    pub fn new_mux(&mut self, block: Node, sel: Node, if_false: Node, if_true: Node, mode: Mode) -> Node {
        self.add_node(block, OpKind::Mux, mode, &[sel, if_false, if_true])
    }

    pub fn new_load(&mut self, block: Node, mem: Node, ptr: Node) -> Node {
        self.add_node(block, OpKind::Load, Mode::T, &[mem, ptr])
    }

    pub fn new_store(&mut self, block: Node, mem: Node, ptr: Node, value: Node) -> Node {
        self.add_node(block, OpKind::Store, Mode::T, &[mem, ptr, value])
    }

    pub fn new_call(&mut self, block: Node, mem: Node, entity: EntityId, args: &[Node]) -> Node {
        let mut ins: SmallVec<[Node; 2]> = SmallVec::with_capacity(args.len() + 1);
        ins.push(mem);
        ins.extend_from_slice(args);
        self.add_node(block, OpKind::Call { entity }, Mode::T, &ins)
    }

    pub fn new_bad(&mut self, mode: Mode) -> Node {
        let block = self.start_block;
        self.add_node(block, OpKind::Bad, mode, &[])
    }

    pub fn new_unknown(&mut self, mode: Mode) -> Node {
        let block = self.start_block;
        self.add_node(block, OpKind::Unknown, mode, &[])
    }

    pub fn new_no_mem(&mut self) -> Node {
        let block = self.start_block;
        self.add_node(block, OpKind::NoMem, Mode::M, &[])
    }

    pub fn new_dummy(&mut self, mode: Mode) -> Node {
        let block = self.start_block;
        self.add_node(block, OpKind::Dummy, mode, &[])
    }

    // Keep-alive edges.

    pub fn keepalives(&self) -> &[Node] {
        &self.nodes[self.end].ins
    }

    pub fn add_end_keepalive(&mut self, node: Node) {
        let end = self.end;
        self.nodes[end].ins.push(node);
    }

    /// Replaces keep-alive edges to `node` with `Bad` placeholders.
    pub fn remove_end_keepalive(&mut self, node: Node) {
        let end = self.end;
        for idx in 0..self.nodes[end].ins.len() {
            if self.nodes[end].ins[idx] == node {
                let bad = self.new_bad(Mode::Any);
                self.nodes[end].ins[idx] = bad;
            }
        }
    }

    // Edges and uses.

    /// A snapshot of all uses of `node`: `(user, input slot)` pairs.
    ///
    /// Computed by scanning the arena, so the result reflects the graph at
    /// call time and stays valid (as a snapshot) across mutations.
    pub fn out_edges(&self, node: Node) -> Vec<(Node, usize)> {
        let mut edges = Vec::new();
        for (user, data) in self.nodes.iter() {
            for (idx, &input) in data.ins.iter().enumerate() {
                if input == node {
                    edges.push((user, idx));
                }
            }
        }
        edges
    }

    /// Control-flow successor blocks of `block`: `(successor, pred index)`
    /// pairs where `successor.ins[pred index]` lies in `block`.
    pub fn block_successors(&self, block: Node) -> Vec<(Node, usize)> {
        let mut succs = Vec::new();
        for (candidate, data) in self.nodes.iter() {
            if !matches!(data.op, OpKind::Block) {
                continue;
            }
            for (idx, &pred) in data.ins.iter().enumerate() {
                if !self.is_bad(pred) && self.nodes[pred].block == block {
                    succs.push((candidate, idx));
                }
            }
        }
        succs
    }

    /// The phi nodes of `block`.
    pub fn phis_of_block(&self, block: Node) -> Vec<Node> {
        self.nodes
            .iter()
            .filter(|(node, data)| {
                matches!(data.op, OpKind::Phi { .. }) && data.block == block && !self.is_bad(*node)
            })
            .map(|(node, _)| node)
            .collect()
    }

    /// All block nodes of the graph.
    pub fn blocks(&self) -> Vec<Node> {
        self.nodes
            .iter()
            .filter(|(_, data)| matches!(data.op, OpKind::Block))
            .map(|(node, _)| node)
            .collect()
    }

    /// Nodes that belong to `block`.
    pub fn nodes_of_block(&self, block: Node) -> Vec<Node> {
        self.nodes
            .iter()
            .filter(|(node, data)| data.block == block && *node != block)
            .map(|(node, _)| node)
            .collect()
    }

    // Rewriting.

    /// Redirects every use of `old` to `new` and retires `old` as `Bad`.
    pub fn exchange(&mut self, old: Node, new: Node) {
        debug_assert_ne!(old, new);
        let node_ids: Vec<Node> = self.nodes.keys().collect();
        for n in node_ids {
            for idx in 0..self.nodes[n].ins.len() {
                if self.nodes[n].ins[idx] == old {
                    self.nodes[n].ins[idx] = new;
                }
            }
            if self.nodes[n].block == old {
                self.nodes[n].block = if self.is_block(new) { new } else { self.nodes[new].block };
            }
        }
        if self.start_block == old {
            self.start_block = new;
        }
        if self.end_block == old {
            self.end_block = new;
        }
        if self.initial_mem == old {
            self.initial_mem = new;
        }
        if self.args == old {
            self.args = new;
        }
        let mode = self.nodes[old].mode;
        self.nodes[old] = NodeData {
            op: OpKind::Bad,
            mode,
            block: self.start_block,
            ins: SmallVec::new(),
        };
    }

    /// Replaces the operation of `node` in place, keeping block and inputs.
    /// The new operation must accept the existing input list.
    pub fn replace_op(&mut self, node: Node, op: OpKind) {
        self.nodes[node].op = op;
    }

    /// Clones the full node arena of `other` into this (freshly created)
    /// graph. Node indices are preserved, so references into `other`
    /// remain meaningful in the clone.
    pub(crate) fn clone_nodes_from(&mut self, other: &Graph) {
        self.nodes = other.nodes.clone();
        self.start_block = other.start_block;
        self.end_block = other.end_block;
        self.start = other.start;
        self.end = other.end;
        self.initial_mem = other.initial_mem;
        self.args = other.args;
    }

    // Resource management.

    pub fn reserve_resources(&mut self, resources: Resources) {
        debug_assert!(
            (self.reserved & resources).is_empty(),
            "resources {resources:?} already reserved"
        );
        self.reserved |= resources;
        if resources.contains(Resources::IRN_LINK) {
            self.link.clear();
        }
    }

    pub fn free_resources(&mut self, resources: Resources) {
        debug_assert!(self.reserved.contains(resources));
        self.reserved &= !resources;
        if resources.contains(Resources::IRN_LINK) {
            self.link.clear();
        }
    }

    pub fn link(&self, node: Node) -> Link {
        debug_assert!(self.reserved.contains(Resources::IRN_LINK));
        self.link[node]
    }

    pub fn set_link(&mut self, node: Node, link: Link) {
        debug_assert!(self.reserved.contains(Resources::IRN_LINK));
        self.link[node] = link;
    }

    // Walks.

    /// Visits the nodes reachable from `End` in topological order: every
    /// node after its inputs, with cycles broken at phi and block nodes.
    pub fn walk_topological(&self, mut f: impl FnMut(Node)) {
        let mut visited = FxHashSet::default();
        self.topo_visit(self.end, &mut visited, &mut f);
    }

    fn topo_visit(&self, node: Node, visited: &mut FxHashSet<Node>, f: &mut impl FnMut(Node)) {
        if visited.contains(&node) {
            return;
        }
        // cycles are only broken at loop headers: phis and blocks
        let breaks_loop = matches!(self.nodes[node].op, OpKind::Phi { .. } | OpKind::Block);
        if breaks_loop {
            visited.insert(node);
        }
        if !self.is_block(node) {
            self.topo_visit(self.nodes[node].block, visited, f);
        }
        for idx in 0..self.nodes[node].ins.len() {
            self.topo_visit(self.nodes[node].ins[idx], visited, f);
        }
        if !breaks_loop {
            visited.insert(node);
        }
        f(node);
    }

    /// Visits every node reachable from `End`, in no particular order.
    pub fn walk(&self, mut f: impl FnMut(Node)) {
        let mut visited = FxHashSet::default();
        let mut stack = vec![self.end];
        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            f(node);
            if !self.is_block(node) {
                stack.push(self.nodes[node].block);
            }
            stack.extend(self.nodes[node].ins.iter().copied());
        }
    }

    // Cleanup.

    /// Marks blocks not reachable from the start block (and all their
    /// nodes) as `Bad`.
    pub fn remove_unreachable_code(&mut self) {
        let mut reachable: FxHashSet<Node> = FxHashSet::default();
        reachable.insert(self.start_block);
        loop {
            let mut changed = false;
            for block in self.blocks() {
                if reachable.contains(&block) {
                    continue;
                }
                let entered = self.nodes[block].ins.iter().any(|&pred| {
                    !self.is_bad(pred) && reachable.contains(&self.nodes[pred].block)
                });
                if entered {
                    reachable.insert(block);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        // the end block is preserved even when no return reaches it yet
        reachable.insert(self.end_block);

        let node_ids: Vec<Node> = self.nodes.keys().collect();
        for node in node_ids {
            if node == self.start || node == self.end {
                continue;
            }
            let home =
                if self.is_block(node) { node } else { self.nodes[node].block };
            if !reachable.contains(&home) && !self.is_bad(node) {
                let mode = self.nodes[node].mode;
                self.nodes[node] = NodeData {
                    op: OpKind::Bad,
                    mode,
                    block: self.start_block,
                    ins: SmallVec::new(),
                };
            }
        }
    }

    /// Compacts `Bad` inputs out of blocks, their phis and the keep-alive
    /// list. Phis left with a single input are replaced by that input.
    pub fn remove_bads(&mut self) {
        for block in self.blocks() {
            if self.is_bad(block) {
                continue;
            }
            let bad_idxs: Vec<usize> = self
                .nodes[block]
                .ins
                .iter()
                .enumerate()
                .filter(|(_, &pred)| self.is_bad(pred))
                .map(|(idx, _)| idx)
                .collect();
            if bad_idxs.is_empty() {
                continue;
            }
            let phis = self.phis_of_block(block);
            for phi in phis {
                let kept: SmallVec<[Node; 2]> = self.nodes[phi]
                    .ins
                    .iter()
                    .enumerate()
                    .filter(|(idx, _)| !bad_idxs.contains(idx))
                    .map(|(_, &input)| input)
                    .collect();
                self.nodes[phi].ins = kept;
            }
            let kept: SmallVec<[Node; 2]> = self.nodes[block]
                .ins
                .iter()
                .enumerate()
                .filter(|(idx, _)| !bad_idxs.contains(idx))
                .map(|(_, &input)| input)
                .collect();
            self.nodes[block].ins = kept;

            for phi in self.phis_of_block(block) {
                if self.nodes[phi].ins.len() == 1 && self.nodes[phi].ins[0] != phi {
                    let replacement = self.nodes[phi].ins[0];
                    if self.phi_loops(phi) {
                        self.remove_end_keepalive(phi);
                    }
                    self.exchange(phi, replacement);
                }
            }
        }
        // drop dead keep-alive edges
        let end = self.end;
        let kept: SmallVec<[Node; 2]> = self.nodes[end]
            .ins
            .iter()
            .copied()
            .filter(|&keepalive| !self.is_bad(keepalive))
            .collect();
        self.nodes[end].ins = kept;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_graph() -> Graph {
        Graph::new(GraphId::from_u32(0), EntityId::from_u32(0))
    }

    #[test]
    fn skeleton_is_wired() {
        let g = test_graph();
        assert!(matches!(g.op(g.start()), OpKind::Start));
        assert!(matches!(g.op(g.end()), OpKind::End));
        assert_eq!(g.block_of(g.start()), g.start_block());
        assert_eq!(g.block_of(g.end()), g.end_block());
        assert_eq!(g.mode(g.initial_mem()), Mode::M);
        assert_eq!(g.ins(g.initial_mem()), &[g.start()]);
    }

    #[test]
    fn out_edges_are_use_slots() {
        let mut g = test_graph();
        let c1 = g.new_const(Tarval::Int(1));
        let c2 = g.new_const(Tarval::Int(2));
        let add = g.new_add(g.start_block(), c1, c2, Mode::Is);
        let add2 = g.new_add(g.start_block(), c1, c1, Mode::Is);
        assert_eq!(g.out_edges(c2), vec![(add, 1)]);
        assert_eq!(g.out_edges(c1), vec![(add, 0), (add2, 0), (add2, 1)]);
    }

    #[test]
    fn exchange_rewires_uses() {
        let mut g = test_graph();
        let c1 = g.new_const(Tarval::Int(1));
        let c2 = g.new_const(Tarval::Int(2));
        let add = g.new_add(g.start_block(), c1, c2, Mode::Is);
        let c3 = g.new_const(Tarval::Int(3));
        g.exchange(add, c3);
        assert!(g.is_bad(add));
        assert!(g.out_edges(add).is_empty());
        let mem = g.initial_mem();
        let ret = g.new_return(g.end_block(), mem, Some(c3));
        assert_eq!(g.ins(ret), &[mem, c3]);
    }

    #[test]
    fn topological_walk_visits_inputs_first() {
        let mut g = test_graph();
        let c1 = g.new_const(Tarval::Int(1));
        let c2 = g.new_const(Tarval::Int(2));
        let add = g.new_add(g.start_block(), c1, c2, Mode::Is);
        let jmp = g.new_jmp(g.start_block());
        g.add_block_pred(g.end_block(), jmp);
        let mem = g.initial_mem();
        let ret = g.new_return(g.end_block(), mem, Some(add));
        g.add_block_pred(g.end_block(), ret);

        let mut order = Vec::new();
        g.walk_topological(|n| order.push(n));
        let pos = |n: Node| order.iter().position(|&x| x == n).unwrap();
        assert!(pos(c1) < pos(add));
        assert!(pos(c2) < pos(add));
        assert!(pos(add) < pos(ret));
        assert!(pos(ret) < pos(g.end()));
    }

    #[test]
    fn link_slot_requires_reservation() {
        let mut g = test_graph();
        let c = g.new_const(Tarval::Int(1));
        g.reserve_resources(Resources::IRN_LINK);
        assert_eq!(g.link(c), Link::None);
        g.set_link(c, Link::Value(Tarval::Int(7)));
        assert_eq!(g.link(c).value(), Some(Tarval::Int(7)));
        g.free_resources(Resources::IRN_LINK);
        g.reserve_resources(Resources::IRN_LINK);
        // the slot is cleared between reservations
        assert_eq!(g.link(c), Link::None);
        g.free_resources(Resources::IRN_LINK);
    }

    #[test]
    fn unreachable_blocks_become_bad() {
        let mut g = test_graph();
        let jmp = g.new_jmp(g.start_block());
        let reached = g.new_block(&[jmp]);
        let orphan = g.new_block(&[]);
        let one_a = g.new_const(Tarval::Int(1));
        let one_b = g.new_const(Tarval::Int(1));
        let dead_const = g.new_add(orphan, one_a, one_b, Mode::Is);
        g.set_block_of(dead_const, orphan);
        let ret = g.new_return(reached, g.initial_mem(), None);
        g.add_block_pred(g.end_block(), ret);

        g.remove_unreachable_code();
        assert!(!g.is_bad(reached));
        assert!(g.is_bad(orphan));
        assert!(g.is_bad(dead_const));
    }

    #[test]
    fn remove_bads_compacts_phis() {
        let mut g = test_graph();
        let jmp_a = g.new_jmp(g.start_block());
        let other = g.new_block(&[]);
        let jmp_b = g.new_jmp(other);
        let join = g.new_block(&[jmp_a, jmp_b]);
        let c1 = g.new_const(Tarval::Int(1));
        let c2 = g.new_const(Tarval::Int(2));
        let phi = g.new_phi(join, &[c1, c2], Mode::Is);
        let ret = g.new_return(join, g.initial_mem(), Some(phi));
        g.add_block_pred(g.end_block(), ret);

        // `other` has no entry; kill it and compact
        g.remove_unreachable_code();
        assert!(g.is_bad(jmp_b));
        g.remove_bads();
        assert_eq!(g.arity(join), 1);
        // the phi collapsed onto its surviving input
        assert!(g.is_bad(phi));
        assert_eq!(g.ins(ret)[1], c1);
    }
}
