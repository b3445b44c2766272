//! Variable-based SSA construction.
//!
//! Implements on-the-fly SSA form with sealed blocks: the method builder
//! writes variables with [SsaBuilder::def_var] and reads them with
//! [SsaBuilder::use_var]; phi nodes appear automatically at control-flow
//! joins. A block is sealed once all its predecessors are known; reads in
//! unsealed blocks (loop headers under construction) create incomplete
//! phis that are completed on sealing. Trivial phis (all operands equal)
//! are removed on the fly.

use cranelift_entity::entity_impl;
use rustc_hash::{FxHashMap, FxHashSet};

use mjc_ir::{Graph, Mode, Node};

/// An abstract variable slot tracked during SSA construction: a source
/// local, a parameter, or the memory stream.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Variable(u32);
entity_impl!(Variable, "var");

#[derive(Default)]
pub struct SsaBuilder {
    modes: Vec<Mode>,
    current_defs: FxHashMap<(Variable, Node), Node>,
    sealed: FxHashSet<Node>,
    incomplete: FxHashMap<Node, Vec<(Variable, Node)>>,
    /// Forwarding chains for removed trivial phis.
    replaced: FxHashMap<Node, Node>,
}

impl SsaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_var(&mut self, mode: Mode) -> Variable {
        let var = Variable(self.modes.len() as u32);
        self.modes.push(mode);
        var
    }

    pub fn var_mode(&self, var: Variable) -> Mode {
        self.modes[var.0 as usize]
    }

    /// Sets the current definition of `var` in `block`.
    pub fn def_var(&mut self, var: Variable, block: Node, value: Node) {
        self.current_defs.insert((var, block), value);
    }

    /// Reads the current value of `var` in `block`, inserting phis where
    /// control flow joins.
    pub fn use_var(&mut self, graph: &mut Graph, var: Variable, block: Node) -> Node {
        if let Some(&value) = self.current_defs.get(&(var, block)) {
            return self.resolve(value);
        }
        self.read_var_recursive(graph, var, block)
    }

    fn read_var_recursive(&mut self, graph: &mut Graph, var: Variable, block: Node) -> Node {
        let mode = self.var_mode(var);
        let value = if !self.sealed.contains(&block) {
            // incomplete control flow; complete the phi when sealing
            let phi = graph.new_phi(block, &[], mode);
            self.incomplete.entry(block).or_default().push((var, phi));
            phi
        } else {
            let preds: Vec<Node> = graph.ins(block).to_vec();
            match preds.len() {
                0 => graph.new_unknown(mode),
                1 => {
                    let pred_block = graph.block_of(preds[0]);
                    self.use_var(graph, var, pred_block)
                }
                _ => {
                    // break potential def-use cycles through this block
                    let phi = graph.new_phi(block, &[], mode);
                    self.current_defs.insert((var, block), phi);
                    self.add_phi_operands(graph, var, phi, &preds)
                }
            }
        };
        let value = self.resolve(value);
        self.current_defs.insert((var, block), value);
        value
    }

    fn add_phi_operands(
        &mut self,
        graph: &mut Graph,
        var: Variable,
        phi: Node,
        preds: &[Node],
    ) -> Node {
        let mut operands = Vec::with_capacity(preds.len());
        for &pred in preds {
            let pred_block = graph.block_of(pred);
            operands.push(self.use_var(graph, var, pred_block));
        }
        graph.set_ins(phi, &operands);
        self.try_remove_trivial_phi(graph, phi)
    }

    /// Replaces a phi whose operands are all equal (or the phi itself) by
    /// that operand, recursively revisiting phi users that may have become
    /// trivial.
    fn try_remove_trivial_phi(&mut self, graph: &mut Graph, phi: Node) -> Node {
        let mut same: Option<Node> = None;
        for &operand in graph.ins(phi) {
            let operand = self.resolve(operand);
            if operand == phi {
                continue;
            }
            match same {
                None => same = Some(operand),
                Some(existing) if existing == operand => {}
                Some(_) => return phi,
            }
        }
        let Some(same) = same else {
            // unreachable or undefined; keep the phi as the unique value
            return phi;
        };

        let users: Vec<Node> = graph
            .out_edges(phi)
            .into_iter()
            .map(|(user, _)| user)
            .filter(|&user| user != phi && graph.is_phi(user))
            .collect();

        if graph.phi_loops(phi) {
            graph.remove_end_keepalive(phi);
        }
        graph.exchange(phi, same);
        self.replaced.insert(phi, same);
        for value in self.current_defs.values_mut() {
            if *value == phi {
                *value = same;
            }
        }
        for user in users {
            if !graph.is_bad(user) {
                self.try_remove_trivial_phi(graph, user);
            }
        }
        self.resolve(same)
    }

    fn resolve(&self, mut node: Node) -> Node {
        while let Some(&forward) = self.replaced.get(&node) {
            node = forward;
        }
        node
    }

    /// Declares that all predecessors of `block` are in place and completes
    /// its pending phis.
    pub fn seal_block(&mut self, graph: &mut Graph, block: Node) {
        debug_assert!(!self.sealed.contains(&block), "block sealed twice");
        self.sealed.insert(block);
        if let Some(pending) = self.incomplete.remove(&block) {
            let preds: Vec<Node> = graph.ins(block).to_vec();
            for (var, phi) in pending {
                self.add_phi_operands(graph, var, phi, &preds);
            }
        }
    }

    pub fn is_sealed(&self, block: Node) -> bool {
        self.sealed.contains(&block)
    }
}

#[cfg(test)]
mod tests {
    use cranelift_entity::EntityRef;
    use mjc_ir::{pn, EntityId, GraphId, OpKind, Tarval};

    use super::*;

    fn test_graph() -> Graph {
        Graph::new(GraphId::new(0), EntityId::new(0))
    }

    #[test]
    fn straight_line_reads_see_the_definition() {
        let mut g = test_graph();
        let mut ssa = SsaBuilder::new();
        let start = g.start_block();
        ssa.seal_block(&mut g, start);
        let x = ssa.declare_var(Mode::Is);
        let c = g.new_const(Tarval::Int(3));
        ssa.def_var(x, start, c);
        assert_eq!(ssa.use_var(&mut g, x, start), c);
    }

    #[test]
    fn diamond_join_inserts_a_phi() {
        let mut g = test_graph();
        let mut ssa = SsaBuilder::new();
        let start = g.start_block();
        ssa.seal_block(&mut g, start);
        let x = ssa.declare_var(Mode::Is);

        let sel = g.new_const(Tarval::Bool(true));
        let cond = g.new_cond(g.start_block(), sel);
        let pt = g.new_proj(cond, Mode::X, pn::COND_TRUE);
        let pf = g.new_proj(cond, Mode::X, pn::COND_FALSE);
        let then_block = g.new_block(&[pt]);
        ssa.seal_block(&mut g, then_block);
        let else_block = g.new_block(&[pf]);
        ssa.seal_block(&mut g, else_block);

        let c1 = g.new_const(Tarval::Int(1));
        let c2 = g.new_const(Tarval::Int(2));
        ssa.def_var(x, then_block, c1);
        ssa.def_var(x, else_block, c2);

        let jt = g.new_jmp(then_block);
        let je = g.new_jmp(else_block);
        let join = g.new_block(&[jt, je]);
        ssa.seal_block(&mut g, join);

        let value = ssa.use_var(&mut g, x, join);
        assert!(g.is_phi(value));
        assert_eq!(g.ins(value), &[c1, c2]);
    }

    #[test]
    fn same_definition_on_both_paths_needs_no_phi() {
        let mut g = test_graph();
        let mut ssa = SsaBuilder::new();
        let start = g.start_block();
        ssa.seal_block(&mut g, start);
        let x = ssa.declare_var(Mode::Is);
        let c = g.new_const(Tarval::Int(5));
        ssa.def_var(x, start, c);

        let sel = g.new_const(Tarval::Bool(true));
        let cond = g.new_cond(g.start_block(), sel);
        let pt = g.new_proj(cond, Mode::X, pn::COND_TRUE);
        let pf = g.new_proj(cond, Mode::X, pn::COND_FALSE);
        let then_block = g.new_block(&[pt]);
        ssa.seal_block(&mut g, then_block);
        let else_block = g.new_block(&[pf]);
        ssa.seal_block(&mut g, else_block);
        let jt = g.new_jmp(then_block);
        let je = g.new_jmp(else_block);
        let join = g.new_block(&[jt, je]);
        ssa.seal_block(&mut g, join);

        let value = ssa.use_var(&mut g, x, join);
        assert_eq!(value, c, "trivial phi must be removed");
    }

    #[test]
    fn loop_reads_create_header_phis() {
        let mut g = test_graph();
        let mut ssa = SsaBuilder::new();
        let start = g.start_block();
        ssa.seal_block(&mut g, start);
        let x = ssa.declare_var(Mode::Is);
        let zero = g.new_const(Tarval::Int(0));
        ssa.def_var(x, start, zero);

        let entry = g.new_jmp(start);
        let header = g.new_block(&[entry]);
        // header unsealed: the back edge is still missing
        let x_in_header = ssa.use_var(&mut g, x, header);
        assert!(g.is_phi(x_in_header));

        let body = {
            let sel = g.new_cmp(header, x_in_header, zero, mjc_ir::Relation::Less);
            let cond = g.new_cond(header, sel);
            let stay = g.new_proj(cond, Mode::X, pn::COND_TRUE);
            g.new_block(&[stay])
        };
        ssa.seal_block(&mut g, body);
        let one = g.new_const(Tarval::Int(1));
        let body_x = ssa.use_var(&mut g, x, body);
        let inc = g.new_add(body, body_x, one, Mode::Is);
        ssa.def_var(x, body, inc);
        let back = g.new_jmp(body);
        g.add_block_pred(header, back);
        ssa.seal_block(&mut g, header);

        assert!(g.is_phi(x_in_header));
        assert_eq!(g.ins(x_in_header), &[zero, inc]);
        assert!(matches!(g.op(x_in_header), OpKind::Phi { .. }));
    }

    #[test]
    fn unmodified_variable_in_a_loop_folds_back() {
        let mut g = test_graph();
        let mut ssa = SsaBuilder::new();
        let start = g.start_block();
        ssa.seal_block(&mut g, start);
        let x = ssa.declare_var(Mode::Is);
        let zero = g.new_const(Tarval::Int(0));
        ssa.def_var(x, start, zero);

        let entry = g.new_jmp(start);
        let header = g.new_block(&[entry]);
        let x_in_header = ssa.use_var(&mut g, x, header);
        let body_jmp = g.new_jmp(header);
        let body = g.new_block(&[body_jmp]);
        ssa.seal_block(&mut g, body);
        let back = g.new_jmp(body);
        g.add_block_pred(header, back);
        ssa.seal_block(&mut g, header);

        // x is never redefined inside the loop; the incomplete phi became
        // trivial and reads now yield the original definition
        assert_eq!(ssa.use_var(&mut g, x, header), zero);
        assert!(g.is_bad(x_in_header) || x_in_header == zero);
    }
}
