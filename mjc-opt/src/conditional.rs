//! Conditional evaluation.
//!
//! Folds comparisons with two constant operands and reflexive comparisons
//! of a node with itself, propagates the verdict through `Mux`, `Cond` and
//! phi links, and rewires the control flow: the taken successor of a
//! decided `Cond` becomes an unconditional jump, the other one a `Bad`
//! predecessor that the post-pass sweep removes.

use mjc_ir::{pn, slot, Graph, Link, Mode, Node, OpKind, Relation, Tarval};

use crate::folding::merge_phi;
use crate::worklist::{run_worklist, WorklistOptimization};
use crate::Optimization;

#[derive(Default)]
pub struct Conditional {
    changed: bool,
}

impl Optimization for Conditional {
    fn name(&self) -> &'static str {
        "conditional"
    }

    fn optimize(&mut self, program: &mut mjc_ir::Program) -> bool {
        run_worklist(program, self)
    }
}

fn const_value(graph: &Graph, node: Node) -> Option<Tarval> {
    match *graph.op(node) {
        OpKind::Const { value } => Some(value),
        _ => None,
    }
}

fn fold_cmp(graph: &Graph, node: Node, relation: Relation) -> Option<Tarval> {
    let lhs = graph.in_at(node, 0);
    let rhs = graph.in_at(node, 1);
    if let (Some(l), Some(r)) = (const_value(graph, lhs), const_value(graph, rhs)) {
        match (l, r) {
            (Tarval::Int(l), Tarval::Int(r)) => return Some(Tarval::Bool(relation.eval(l, r))),
            (Tarval::Bool(l), Tarval::Bool(r)) => {
                // booleans are only compared with == and !=
                let equal = l == r;
                return match relation {
                    Relation::Equal => Some(Tarval::Bool(equal)),
                    Relation::LessGreater => Some(Tarval::Bool(!equal)),
                    _ => None,
                };
            }
            (Tarval::Null, Tarval::Null) => {
                return match relation {
                    Relation::Equal => Some(Tarval::Bool(true)),
                    Relation::LessGreater => Some(Tarval::Bool(false)),
                    _ => None,
                };
            }
            _ => return None,
        }
    }
    if lhs == rhs {
        // x cmp x decides every relation
        return Some(Tarval::Bool(relation.holds_reflexively()));
    }
    None
}

impl WorklistOptimization for Conditional {
    fn name(&self) -> &'static str {
        "conditional"
    }

    fn handle(&mut self, graph: &mut Graph, node: Node) -> bool {
        let computed = match *graph.op(node) {
            OpKind::Cmp { relation } => fold_cmp(graph, node, relation),
            OpKind::Const { value: value @ Tarval::Bool(_) } => Some(value),
            OpKind::Mux => graph.link(graph.in_at(node, slot::MUX_SEL)).value(),
            OpKind::Cond => {
                let selector = graph.in_at(node, 0);
                const_value(graph, selector).or_else(|| graph.link(selector).value())
            }
            OpKind::Phi { .. } => merge_phi(graph, node),
            _ => None,
        };
        let current = graph.link(node).value();
        let changed = match (current, computed) {
            (None, Some(_)) => true,
            (Some(old), Some(new)) => old != new,
            _ => false,
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
        match *graph.op(node) {
            OpKind::Cmp { .. } => {
                // a decided comparison becomes a boolean constant; Cond
                // projections were rewired off the link and survive this
                if let Some(tv @ Tarval::Bool(_)) = graph.link(node).value() {
                    let constant = graph.new_const(tv);
                    graph.exchange(node, constant);
                    self.changed = true;
                }
            }
            OpKind::Mux => {
                if let Some(sel) = graph.link(node).value().and_then(Tarval::as_bool) {
                    let input = if sel { slot::MUX_TRUE } else { slot::MUX_FALSE };
                    let replacement = graph.in_at(node, input);
                    graph.exchange(node, replacement);
                    self.changed = true;
                }
            }
            OpKind::Proj { num } if graph.mode(node) == Mode::X => {
                let cond = graph.in_at(node, 0);
                if !matches!(graph.op(cond), OpKind::Cond) {
                    return;
                }
                let Some(taken) = graph.link(cond).value().and_then(Tarval::as_bool) else {
                    return;
                };
                let replacement = if (num == pn::COND_TRUE) == taken {
                    let block = graph.block_of(cond);
                    graph.new_jmp(block)
                } else {
                    graph.new_bad(Mode::X)
                };
                graph.exchange(node, replacement);
                self.changed = true;
            }
            _ => {}
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
    use mjc_ir::Program;

    use super::*;

    fn test_program() -> (Program, mjc_ir::GraphId) {
        let mut program = Program::new("test");
        let bool_ty = program.new_primitive_type(Mode::Bu);
        let mty = program.new_method_type(vec![], Some(bool_ty));
        let ent = program.new_entity(None, "f", "f", mty);
        let id = program.new_graph(ent);
        (program, id)
    }

    #[test]
    fn reflexive_comparisons_decide() {
        let (mut program, id) = test_program();
        let ret = {
            let g = program.graph_mut(id);
            let x = g.new_unknown(Mode::Is);
            let cmp = g.new_cmp(g.start_block(), x, x, Relation::Less);
            let mem = g.initial_mem();
            let end = g.end_block();
            let ret = g.new_return(end, mem, Some(cmp));
            g.add_block_pred(end, ret);
            ret
        };
        assert!(Conditional::default().optimize(&mut program));
        let g = program.graph(id);
        assert_eq!(
            *g.op(g.in_at(ret, 1)),
            OpKind::Const { value: Tarval::Bool(false) },
            "x < x never holds"
        );
    }

    #[test]
    fn decided_conditions_become_jumps() {
        let (mut program, id) = test_program();
        let (then_block, else_block) = {
            let g = program.graph_mut(id);
            let sel = g.new_const(Tarval::Bool(true));
            let cond = g.new_cond(g.start_block(), sel);
            let proj_true = g.new_proj(cond, Mode::X, pn::COND_TRUE);
            let proj_false = g.new_proj(cond, Mode::X, pn::COND_FALSE);
            let then_block = g.new_block(&[proj_true]);
            let else_block = g.new_block(&[proj_false]);
            let mem = g.initial_mem();
            let then_const = g.new_const(Tarval::Bool(true));
            let ret = g.new_return(then_block, mem, Some(then_const));
            let end = g.end_block();
            g.add_block_pred(end, ret);
            let else_const = g.new_const(Tarval::Bool(false));
            let other = g.new_return(else_block, mem, Some(else_const));
            g.add_block_pred(end, other);
            (then_block, else_block)
        };
        assert!(Conditional::default().optimize(&mut program));
        let g = program.graph(id);
        assert!(!g.is_bad(then_block), "the taken branch survives");
        assert!(g.is_bad(else_block), "the dead branch is swept");
        assert!(matches!(*g.op(g.in_at(then_block, 0)), OpKind::Jmp));
    }

    #[test]
    fn decided_mux_selects_an_input() {
        let (mut program, id) = test_program();
        let (ret, if_true) = {
            let g = program.graph_mut(id);
            let sel = g.new_const(Tarval::Bool(true));
            let if_false = g.new_const(Tarval::Bool(false));
            let if_true = g.new_const(Tarval::Bool(true));
            let mux = g.new_mux(g.start_block(), sel, if_false, if_true, Mode::Bu);
            let mem = g.initial_mem();
            let end = g.end_block();
            let ret = g.new_return(end, mem, Some(mux));
            g.add_block_pred(end, ret);
            (ret, if_true)
        };
        assert!(Conditional::default().optimize(&mut program));
        let g = program.graph(id);
        assert_eq!(g.in_at(ret, 1), if_true);
    }
}
