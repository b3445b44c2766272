//! Constant folding and algebraic simplification.
//!
//! The handle phase propagates constant values through the link slots in
//! topological order; the cleanup phase replaces every node whose link
//! holds a usable constant with a fresh `Const`, re-threading the memory
//! edge around removed `Div`/`Mod` nodes. Identities that need no
//! constant operands are applied as well: `x - x`, `x * 0`, `0 * x`,
//! `x / x`, `x % 1`, `x % -1`, `0 / x` and `x / 0` (undefined behavior,
//! folded to 0 so the node can be removed).

use mjc_ir::{slot, Graph, Link, Node, OpKind, Tarval};

use crate::worklist::{run_worklist, WorklistOptimization};
use crate::Optimization;

#[derive(Default)]
pub struct Folding {
    changed: bool,
}

impl Optimization for Folding {
    fn name(&self) -> &'static str {
        "folding"
    }

    fn optimize(&mut self, program: &mut mjc_ir::Program) -> bool {
        run_worklist(program, self)
    }
}

fn link_value(graph: &Graph, node: Node, idx: usize) -> Option<Tarval> {
    if idx < graph.arity(node) {
        graph.link(graph.in_at(node, idx)).value()
    } else {
        None
    }
}

fn int_of(tv: Option<Tarval>) -> Option<i32> {
    tv.and_then(Tarval::as_int)
}

fn is_num(tv: Option<Tarval>, num: i32) -> bool {
    matches!(tv, Some(tv) if tv.is_num(num))
}

impl Folding {
    fn compute(&self, graph: &Graph, node: Node) -> Option<Tarval> {
        match *graph.op(node) {
            OpKind::Const { value } => Some(value),
            OpKind::Add => {
                let left = int_of(link_value(graph, node, 0))?;
                let right = int_of(link_value(graph, node, 1))?;
                Some(Tarval::Int(left.wrapping_add(right)))
            }
            OpKind::Sub => {
                let left = int_of(link_value(graph, node, 0));
                let right = int_of(link_value(graph, node, 1));
                if let (Some(left), Some(right)) = (left, right) {
                    Some(Tarval::Int(left.wrapping_sub(right)))
                } else if graph.in_at(node, 0) == graph.in_at(node, 1) {
                    // x - x
                    Some(Tarval::Int(0))
                } else {
                    None
                }
            }
            OpKind::Mul => {
                let left = link_value(graph, node, 0);
                let right = link_value(graph, node, 1);
                if let (Some(l), Some(r)) = (int_of(left), int_of(right)) {
                    Some(Tarval::Int(l.wrapping_mul(r)))
                } else if is_num(left, 0) || is_num(right, 0) {
                    // x * 0 and 0 * x
                    Some(Tarval::Int(0))
                } else {
                    None
                }
            }
            OpKind::Div | OpKind::Mod => {
                let dividend = link_value(graph, node, slot::DIV_LEFT);
                let divisor = link_value(graph, node, slot::DIV_RIGHT);
                if is_num(dividend, 0) || is_num(divisor, 0) {
                    // 0 / x, and x / 0 is undefined behavior folded to 0
                    Some(Tarval::Int(0))
                } else if graph.in_at(node, slot::DIV_LEFT)
                    == graph.in_at(node, slot::DIV_RIGHT)
                {
                    // x / x and x % x
                    Some(Tarval::Int(if matches!(graph.op(node), OpKind::Div) {
                        1
                    } else {
                        0
                    }))
                } else if matches!(graph.op(node), OpKind::Div) {
                    let l = int_of(dividend)?;
                    let r = int_of(divisor)?;
                    Some(Tarval::Int(l.wrapping_div(r)))
                } else if is_num(divisor, 1) || is_num(divisor, -1) {
                    // x % 1 and x % -1
                    Some(Tarval::Int(0))
                } else {
                    let l = int_of(dividend)?;
                    let r = int_of(divisor)?;
                    Some(Tarval::Int(l.wrapping_rem(r)))
                }
            }
            OpKind::Minus => {
                let value = int_of(link_value(graph, node, 0))?;
                Some(Tarval::Int(value.wrapping_neg()))
            }
            OpKind::Cmp { relation } => {
                let left = int_of(link_value(graph, node, 0))?;
                let right = int_of(link_value(graph, node, 1))?;
                Some(Tarval::Bool(relation.eval(left, right)))
            }
            OpKind::Mux => link_value(graph, node, slot::MUX_SEL),
            OpKind::Phi { .. } => merge_phi(graph, node),
            _ => None,
        }
    }
}

/// The meet over a phi's operand facts: equal constants survive,
/// disagreeing ones become [Tarval::Bad].
pub(crate) fn merge_phi(graph: &Graph, node: Node) -> Option<Tarval> {
    let mut merged: Option<Tarval> = None;
    for idx in 0..graph.arity(node) {
        if graph.in_at(node, idx) == node {
            continue;
        }
        let tv = link_value(graph, node, idx)?;
        merged = match (merged, tv) {
            (_, Tarval::Bad) | (Some(Tarval::Bad), _) => Some(Tarval::Bad),
            (None, tv) => Some(tv),
            (Some(prev), tv) if prev == tv => Some(prev),
            (Some(_), _) => Some(Tarval::Bad),
        };
    }
    merged
}

impl WorklistOptimization for Folding {
    fn name(&self) -> &'static str {
        "folding"
    }

    fn handle(&mut self, graph: &mut Graph, node: Node) -> bool {
        let computed = self.compute(graph, node);
        let current = graph.link(node).value();
        let changed = match (current, computed) {
            (None, Some(_)) => true,
            (Some(old), Some(new)) => old != new,
            _ => computed.is_some(),
        };
        graph.set_link(
            node,
            match computed {
                Some(tv) => Link::Value(tv),
                None => Link::None,
            },
        );
        changed
    }

    fn cleanup(&mut self, graph: &mut Graph, node: Node) {
        if matches!(graph.op(node), OpKind::Const { .. }) {
            return;
        }
        let Some(tv) = graph.link(node).value() else { return };
        match *graph.op(node) {
            OpKind::Cmp { .. } => {
                // comparisons and their consumers belong to the
                // conditional pass; folding only seeds their links
            }
            OpKind::Mux => {
                if let Some(sel) = tv.as_bool() {
                    let input = if sel { slot::MUX_TRUE } else { slot::MUX_FALSE };
                    let replacement = graph.in_at(node, input);
                    graph.exchange(node, replacement);
                    self.changed = true;
                }
            }
            OpKind::Div | OpKind::Mod => {
                if tv.is_numeric() {
                    let constant = graph.new_const(tv);
                    let mem_in = graph.in_at(node, slot::DIV_MEM);
                    for (user, _) in graph.out_edges(node) {
                        if graph.mode(user) == mjc_ir::Mode::M {
                            // bypass the node in the memory stream
                            for (mem_user, idx) in graph.out_edges(user) {
                                graph.set_in(mem_user, idx, mem_in);
                            }
                        } else {
                            graph.exchange(user, constant);
                        }
                    }
                    self.changed = true;
                }
            }
            _ => {
                if tv.is_numeric() {
                    if graph.is_phi(node) && graph.phi_loops(node) {
                        graph.remove_end_keepalive(node);
                    }
                    let constant = graph.new_const(tv);
                    graph.exchange(node, constant);
                    self.changed = true;
                }
            }
        }
    }

    fn changed(&self) -> bool {
        self.changed
    }

    fn reset(&mut self) {
        self.changed = false;
    }
}

#[cfg(test)]
mod tests {
    use mjc_ir::{Mode, Program};

    use super::*;

    fn test_program() -> (Program, mjc_ir::GraphId) {
        let mut program = Program::new("test");
        let int_ty = program.new_primitive_type(Mode::Is);
        let mty = program.new_method_type(vec![], Some(int_ty));
        let ent = program.new_entity(None, "f", "f", mty);
        let id = program.new_graph(ent);
        (program, id)
    }

    fn returned_value(program: &Program, id: mjc_ir::GraphId, ret: Node) -> OpKind {
        *program.graph(id).op(program.graph(id).in_at(ret, 1))
    }

    #[test]
    fn constant_addition_folds() {
        let (mut program, id) = test_program();
        let ret = {
            let g = program.graph_mut(id);
            let c2 = g.new_const(Tarval::Int(2));
            let c3 = g.new_const(Tarval::Int(3));
            let sum = g.new_add(g.start_block(), c2, c3, Mode::Is);
            let mem = g.initial_mem();
            let end = g.end_block();
            let ret = g.new_return(end, mem, Some(sum));
            g.add_block_pred(end, ret);
            ret
        };
        assert!(Folding::default().optimize(&mut program));
        assert_eq!(returned_value(&program, id, ret), OpKind::Const { value: Tarval::Int(5) });
    }

    #[test]
    fn x_minus_x_folds_without_constants() {
        let (mut program, id) = test_program();
        let ret = {
            let g = program.graph_mut(id);
            let x = g.new_unknown(Mode::Is);
            let diff = g.new_sub(g.start_block(), x, x, Mode::Is);
            let mem = g.initial_mem();
            let end = g.end_block();
            let ret = g.new_return(end, mem, Some(diff));
            g.add_block_pred(end, ret);
            ret
        };
        assert!(Folding::default().optimize(&mut program));
        assert_eq!(returned_value(&program, id, ret), OpKind::Const { value: Tarval::Int(0) });
    }

    #[test]
    fn division_by_zero_folds_and_rethreads_memory() {
        let (mut program, id) = test_program();
        let (ret, mem_in) = {
            let g = program.graph_mut(id);
            let x = g.new_unknown(Mode::Is);
            let zero = g.new_const(Tarval::Int(0));
            let mem_in = g.initial_mem();
            let div = g.new_div(g.start_block(), mem_in, x, zero);
            let mem_out = g.new_proj(div, Mode::M, mjc_ir::pn::M);
            let result = g.new_proj(div, Mode::Is, mjc_ir::pn::RES);
            let end = g.end_block();
            let ret = g.new_return(end, mem_out, Some(result));
            g.add_block_pred(end, ret);
            (ret, mem_in)
        };
        assert!(Folding::default().optimize(&mut program));
        let g = program.graph(id);
        assert_eq!(returned_value(&program, id, ret), OpKind::Const { value: Tarval::Int(0) });
        // the return's memory bypasses the removed division
        assert_eq!(g.in_at(ret, 0), mem_in);
    }

    #[test]
    fn nothing_to_fold_reports_unchanged() {
        let (mut program, id) = test_program();
        {
            let g = program.graph_mut(id);
            let x = g.new_unknown(Mode::Is);
            let y = g.new_unknown(Mode::Is);
            let sum = g.new_add(g.start_block(), x, y, Mode::Is);
            let mem = g.initial_mem();
            let end = g.end_block();
            let ret = g.new_return(end, mem, Some(sum));
            g.add_block_pred(end, ret);
        }
        assert!(!Folding::default().optimize(&mut program));
    }
}
