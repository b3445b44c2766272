//! Structural graph verification.
//!
//! Optimization passes must leave the graph verified; a violation is a
//! compiler bug, not a source error.

use crate::graph::{Graph, Node};
use crate::mode::Mode;
use crate::op::OpKind;

/// An invariant violation found by [verify_graph].
#[derive(Debug, thiserror::Error)]
#[error("graph verification failed at {node}: {message}")]
pub struct VerifyError {
    pub node: Node,
    pub message: String,
}

fn fail(node: Node, message: impl Into<String>) -> Result<(), VerifyError> {
    Err(VerifyError { node, message: message.into() })
}

/// Checks the structural invariants of `graph` over all nodes reachable
/// from its `End` node.
pub fn verify_graph(graph: &Graph) -> Result<(), VerifyError> {
    let mut result = Ok(());
    graph.walk(|node| {
        if result.is_err() {
            return;
        }
        result = verify_node(graph, node);
    });
    result
}

fn verify_node(graph: &Graph, node: Node) -> Result<(), VerifyError> {
    let arity = graph.arity(node);
    let op = graph.op(node).clone();

    if !graph.is_block(node) && !graph.is_block(graph.block_of(node)) {
        return fail(node, "node does not belong to a block");
    }

    let expected_arity: Option<usize> = match op {
        OpKind::Jmp
        | OpKind::Const { .. }
        | OpKind::Unknown
        | OpKind::Bad
        | OpKind::NoMem
        | OpKind::Dummy
        | OpKind::Start => Some(0),
        OpKind::Cond | OpKind::Proj { .. } | OpKind::Minus | OpKind::Member { .. } => Some(1),
        OpKind::Add
        | OpKind::Sub
        | OpKind::Mul
        | OpKind::Cmp { .. }
        | OpKind::Sel { .. }
        | OpKind::Load => Some(2),
        OpKind::Div | OpKind::Mod | OpKind::Store | OpKind::Mux => Some(3),
        OpKind::Return => {
            if arity != 1 && arity != 2 {
                return fail(node, format!("Return with arity {arity}"));
            }
            None
        }
        OpKind::Call { .. } => {
            if arity < 1 {
                return fail(node, "Call without memory input");
            }
            None
        }
        OpKind::Block | OpKind::End | OpKind::Phi { .. } => None,
    };
    if let Some(expected) = expected_arity {
        if arity != expected {
            return fail(node, format!("{} with arity {arity}, expected {expected}", op.name()));
        }
    }

    match op {
        OpKind::Block => {
            for &pred in graph.ins(node) {
                if graph.is_bad(pred) {
                    continue;
                }
                if graph.mode(pred) != Mode::X {
                    return fail(node, "block predecessor is not a control-flow node");
                }
            }
        }
        OpKind::Phi { .. } => {
            let block = graph.block_of(node);
            if graph.arity(block) != arity {
                return fail(
                    node,
                    format!(
                        "Phi with arity {arity} in a block with {} predecessors",
                        graph.arity(block)
                    ),
                );
            }
            for &input in graph.ins(node) {
                if graph.is_bad(input) || input == node {
                    continue;
                }
                let input_mode = graph.mode(input);
                if input_mode != graph.mode(node) && input_mode != Mode::Any {
                    return fail(node, "Phi input mode mismatch");
                }
            }
        }
        OpKind::Cond => {
            let sel = graph.in_at(node, 0);
            if !graph.is_bad(sel) && graph.mode(sel) != Mode::Bu {
                return fail(node, "Cond selector is not boolean");
            }
        }
        OpKind::Return | OpKind::Div | OpKind::Mod | OpKind::Load | OpKind::Store
        | OpKind::Call { .. } => {
            let mem = graph.in_at(node, 0);
            if !graph.is_bad(mem) && graph.mode(mem) != Mode::M {
                return fail(node, format!("{} without a memory input", op.name()));
            }
        }
        OpKind::Add | OpKind::Sub | OpKind::Mul => {
            for &input in graph.ins(node) {
                if !graph.is_bad(input) && graph.mode(input) != graph.mode(node) {
                    return fail(node, format!("{} operand mode mismatch", op.name()));
                }
            }
        }
        OpKind::Proj { .. } => {
            let pred = graph.in_at(node, 0);
            if !graph.is_bad(pred) && graph.mode(pred) != Mode::T {
                return fail(node, "Proj of a non-tuple node");
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use cranelift_entity::EntityRef;

    use crate::entity::{EntityId, GraphId};
    use crate::tarval::Tarval;

    use super::*;

    #[test]
    fn valid_graph_passes() {
        let mut g = Graph::new(GraphId::new(0), EntityId::new(0));
        let c = g.new_const(Tarval::Int(1));
        let ret = g.new_return(g.end_block(), g.initial_mem(), Some(c));
        g.add_block_pred(g.end_block(), ret);
        verify_graph(&g).unwrap();
    }

    #[test]
    fn phi_arity_mismatch_is_caught() {
        let mut g = Graph::new(GraphId::new(0), EntityId::new(0));
        let jmp = g.new_jmp(g.start_block());
        let block = g.new_block(&[jmp]);
        let c = g.new_const(Tarval::Int(1));
        let phi = g.new_phi(block, &[c, c], Mode::Is);
        let ret = g.new_return(block, g.initial_mem(), Some(phi));
        g.add_block_pred(g.end_block(), ret);
        assert!(verify_graph(&g).is_err());
    }

    #[test]
    fn cond_selector_must_be_boolean() {
        let mut g = Graph::new(GraphId::new(0), EntityId::new(0));
        let c = g.new_const(Tarval::Int(1));
        let cond = g.new_cond(g.start_block(), c);
        let proj = g.new_proj(cond, Mode::X, 0);
        let block = g.new_block(&[proj]);
        let ret = g.new_return(block, g.initial_mem(), None);
        g.add_block_pred(g.end_block(), ret);
        assert!(verify_graph(&g).is_err());
    }
}
