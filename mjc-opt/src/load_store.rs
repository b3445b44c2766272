//! Load/store combining.
//!
//! Peepholes over adjacent pairs of memory operations on the same
//! location: a load after a load reuses the first result, a load after a
//! store reuses the stored value, a store after a store drops the first,
//! and a store writing back a value just loaded from the same location is
//! a no-op. Two addresses name the same location when they are the same
//! node or `Member`s of the same entity on the same base pointer.

use mjc_ir::{slot, Graph, Mode, Node, OpKind};

use crate::worklist::{run_worklist, WorklistOptimization};
use crate::Optimization;

#[derive(Default)]
pub struct LoadStore {
    changed: bool,
}

impl Optimization for LoadStore {
    fn name(&self) -> &'static str {
        "load_store"
    }

    fn optimize(&mut self, program: &mut mjc_ir::Program) -> bool {
        run_worklist(program, self)
    }
}

fn is_same_target(graph: &Graph, first: Node, second: Node) -> bool {
    if first == second {
        return true;
    }
    match (graph.op(first), graph.op(second)) {
        (OpKind::Member { entity: e1 }, OpKind::Member { entity: e2 }) => {
            e1 == e2 && graph.in_at(first, 0) == graph.in_at(second, 0)
        }
        _ => false,
    }
}

/// The non-memory result projection of a load, if any.
fn result_projection(graph: &Graph, node: Node) -> Option<Node> {
    graph
        .out_edges(node)
        .into_iter()
        .map(|(user, _)| user)
        .find(|&user| graph.mode(user) != Mode::M)
}

/// Redirects all users of `node` away from it: memory users are re-threaded
/// to the node's memory input, value users go to `replacement`.
fn bypass_node(graph: &mut Graph, node: Node, replacement: Option<Node>) {
    let mem_in = graph.in_at(node, slot::MEM);
    for (user, _) in graph.out_edges(node) {
        if graph.mode(user) == Mode::M {
            for (mem_user, idx) in graph.out_edges(user) {
                graph.set_in(mem_user, idx, mem_in);
            }
        } else if let Some(replacement) = replacement {
            graph.exchange(user, replacement);
        }
    }
}

impl LoadStore {
    fn handle_load(&mut self, graph: &mut Graph, node: Node) -> bool {
        let Some(result) = result_projection(graph, node) else {
            // the loaded value is never used
            bypass_node(graph, node, None);
            return true;
        };

        let mem_proj = graph.in_at(node, slot::MEM);
        let pred = graph.in_at(mem_proj, 0);
        match graph.op(pred) {
            OpKind::Load => {
                if !is_same_target(
                    graph,
                    graph.in_at(pred, slot::PTR),
                    graph.in_at(node, slot::PTR),
                ) {
                    return false;
                }
                let Some(first_result) = result_projection(graph, pred) else {
                    return false;
                };
                bypass_node(graph, node, Some(first_result));
                true
            }
            OpKind::Store => {
                if !is_same_target(
                    graph,
                    graph.in_at(pred, slot::PTR),
                    graph.in_at(node, slot::PTR),
                ) {
                    return false;
                }
                let stored = graph.in_at(pred, slot::STORE_VALUE);
                bypass_node(graph, node, Some(stored));
                true
            }
            _ => false,
        }
    }

    fn handle_store(&mut self, graph: &mut Graph, node: Node) -> bool {
        let mem_proj = graph.in_at(node, slot::MEM);
        let pred = graph.in_at(mem_proj, 0);
        match graph.op(pred) {
            OpKind::Load => {
                // storing back what was just loaded from the same place
                if !is_same_target(
                    graph,
                    graph.in_at(pred, slot::PTR),
                    graph.in_at(node, slot::PTR),
                ) {
                    return false;
                }
                let value = graph.in_at(node, slot::STORE_VALUE);
                let value_is_that_load = matches!(graph.op(value), OpKind::Proj { .. })
                    && graph.in_at(value, 0) == pred;
                if !value_is_that_load {
                    return false;
                }
                bypass_node(graph, node, None);
                true
            }
            OpKind::Store => {
                // the first store is overwritten before anyone reads it
                if !is_same_target(
                    graph,
                    graph.in_at(pred, slot::PTR),
                    graph.in_at(node, slot::PTR),
                ) {
                    return false;
                }
                let first_mem = graph.in_at(pred, slot::MEM);
                if graph.mode(first_mem) != Mode::M {
                    return false;
                }
                graph.set_in(node, slot::MEM, first_mem);
                true
            }
            _ => false,
        }
    }
}

impl WorklistOptimization for LoadStore {
    fn name(&self) -> &'static str {
        "load_store"
    }

    fn handle(&mut self, graph: &mut Graph, node: Node) -> bool {
        let has_mem_proj = graph.arity(node) > 0
            && matches!(graph.op(graph.in_at(node, slot::MEM)), OpKind::Proj { .. });
        if !has_mem_proj {
            return false;
        }
        let result = match graph.op(node) {
            OpKind::Load => self.handle_load(graph, node),
            OpKind::Store => self.handle_store(graph, node),
            _ => false,
        };
        self.changed |= result;
        result
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
    use mjc_ir::{pn, EntityId, Program, Tarval};

    use super::*;

    /// A program with one method graph and one class field to store into.
    fn test_program() -> (Program, mjc_ir::GraphId, EntityId) {
        let mut program = Program::new("test");
        let int_ty = program.new_primitive_type(Mode::Is);
        let class = program.new_class_type("C");
        let field = program.new_entity(Some(class), "x", "x", int_ty);
        program.default_layout(class);
        let mty = program.new_method_type(vec![], Some(int_ty));
        let ent = program.new_entity(None, "f", "f", mty);
        let id = program.new_graph(ent);
        (program, id, field)
    }

    #[test]
    fn load_after_store_uses_the_stored_value() {
        let (mut program, id, field) = test_program();
        let (ret, value) = {
            let g = program.graph_mut(id);
            let base = g.new_unknown(Mode::P);
            let block = g.start_block();
            let addr = g.new_member(block, base, field);
            let value = g.new_const(Tarval::Int(7));
            let mem = g.initial_mem();
            let store = g.new_store(block, mem, addr, value);
            let store_mem = g.new_proj(store, Mode::M, pn::M);
            let addr2 = g.new_member(block, base, field);
            let load = g.new_load(block, store_mem, addr2);
            let load_mem = g.new_proj(load, Mode::M, pn::M);
            let loaded = g.new_proj(load, Mode::Is, pn::RES);
            let end = g.end_block();
            let ret = g.new_return(end, load_mem, Some(loaded));
            g.add_block_pred(end, ret);
            (ret, value)
        };
        assert!(LoadStore::default().optimize(&mut program));
        let g = program.graph(id);
        assert_eq!(g.in_at(ret, 1), value, "the load is served by the store");
    }

    #[test]
    fn store_after_store_drops_the_first() {
        let (mut program, id, field) = test_program();
        let (second_store, initial_mem) = {
            let g = program.graph_mut(id);
            let base = g.new_unknown(Mode::P);
            let block = g.start_block();
            let addr = g.new_member(block, base, field);
            let initial_mem = g.initial_mem();
            let first_const = g.new_const(Tarval::Int(1));
            let first = g.new_store(block, initial_mem, addr, first_const);
            let first_mem = g.new_proj(first, Mode::M, pn::M);
            let second_const = g.new_const(Tarval::Int(2));
            let second = g.new_store(block, first_mem, addr, second_const);
            let second_mem = g.new_proj(second, Mode::M, pn::M);
            let end = g.end_block();
            let ret_const = g.new_const(Tarval::Int(0));
            let ret = g.new_return(end, second_mem, Some(ret_const));
            g.add_block_pred(end, ret);
            (second, initial_mem)
        };
        assert!(LoadStore::default().optimize(&mut program));
        let g = program.graph(id);
        assert_eq!(
            g.in_at(second_store, slot::MEM),
            initial_mem,
            "the overwritten store is bypassed"
        );
    }

    #[test]
    fn different_fields_do_not_combine() {
        let (mut program, id, field) = test_program();
        {
            let int_ty = program.new_primitive_type(Mode::Is);
            let class = program.new_class_type("D");
            let other_field = program.new_entity(Some(class), "y", "y", int_ty);
            program.default_layout(class);
            let g = program.graph_mut(id);
            let base = g.new_unknown(Mode::P);
            let block = g.start_block();
            let addr = g.new_member(block, base, field);
            let mem = g.initial_mem();
            let store_const = g.new_const(Tarval::Int(7));
            let store = g.new_store(block, mem, addr, store_const);
            let store_mem = g.new_proj(store, Mode::M, pn::M);
            let other_addr = g.new_member(block, base, other_field);
            let load = g.new_load(block, store_mem, other_addr);
            let load_mem = g.new_proj(load, Mode::M, pn::M);
            let loaded = g.new_proj(load, Mode::Is, pn::RES);
            let end = g.end_block();
            let ret = g.new_return(end, load_mem, Some(loaded));
            g.add_block_pred(end, ret);
        }
        assert!(!LoadStore::default().optimize(&mut program));
    }
}
