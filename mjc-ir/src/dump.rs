//! Deterministic textual dump of IR programs.
//!
//! The dump is the seam where a backend would attach: one section per
//! method graph, blocks in reverse postorder, nodes in topological order
//! within their block. It is stable across runs and intended for tests and
//! `--compile-firm` output.

use std::fmt::Write;

use crate::dominance::{block_preds, Dominance};
use crate::graph::{Graph, Node};
use crate::op::OpKind;
use crate::program::Program;

/// Renders all live graphs of `program`.
pub fn dump_program(program: &Program) -> String {
    let mut out = String::new();
    for id in program.graph_ids() {
        let graph = program.graph(id);
        dump_graph(program, graph, &mut out);
        out.push('\n');
    }
    out
}

/// Renders one graph into `out`.
pub fn dump_graph(program: &Program, graph: &Graph, out: &mut String) {
    let entity = program.entity(graph.entity);
    let _ = writeln!(out, "method {}:", entity.ld_name);

    // nodes in topological order, grouped by block afterwards
    let mut topo_order = Vec::new();
    graph.walk_topological(|node| topo_order.push(node));

    let dom = Dominance::compute(graph);
    let mut blocks: Vec<Node> = dom.reverse_postorder().to_vec();
    if !blocks.contains(&graph.end_block()) {
        blocks.push(graph.end_block());
    }

    for block in blocks {
        let preds = block_preds(graph, block);
        let rendered_preds = if preds.is_empty() {
            "-".to_owned()
        } else {
            preds.iter().map(|b| format!("{b}")).collect::<Vec<_>>().join(", ")
        };
        let _ = writeln!(out, "  block {block} [preds: {rendered_preds}]:");
        for &node in &topo_order {
            if node == block || graph.block_of(node) != block || graph.is_block(node) {
                continue;
            }
            let _ = writeln!(out, "    {node} = {}", render_node(program, graph, node));
        }
    }
}

fn render_node(program: &Program, graph: &Graph, node: Node) -> String {
    let mut rendered = match graph.op(node) {
        OpKind::Const { value } => format!("Const {value}"),
        OpKind::Proj { num } => format!("Proj {num}"),
        OpKind::Cmp { relation } => format!("Cmp {relation}"),
        OpKind::Phi { loops: true } => "Phi loop".to_owned(),
        OpKind::Call { entity } => format!("Call {}", program.entity(*entity).ld_name),
        OpKind::Member { entity } => format!("Member {}", program.entity(*entity).ld_name),
        op => op.name().to_owned(),
    };
    let mode = graph.mode(node);
    let _ = write!(rendered, " [{mode}]");
    if !graph.ins(node).is_empty() {
        let ins =
            graph.ins(node).iter().map(|n| format!("{n}")).collect::<Vec<_>>().join(", ");
        let _ = write!(rendered, " ({ins})");
    }
    rendered
}

#[cfg(test)]
mod tests {
    use crate::mode::Mode;
    use crate::tarval::Tarval;

    use super::*;

    #[test]
    fn dump_contains_constants_and_blocks() {
        let mut program = Program::new("test");
        let mty = program.new_method_type(vec![], None);
        let ent = program.new_entity(None, "f", "f_mangled", mty);
        let id = program.new_graph(ent);
        let graph = program.graph_mut(id);
        let c = graph.new_const(Tarval::Int(7));
        let mem = graph.initial_mem();
        let end_block = graph.end_block();
        let ret = graph.new_return(end_block, mem, Some(c));
        graph.add_block_pred(end_block, ret);

        let out = dump_program(&program);
        assert!(out.contains("method f_mangled:"), "got: {out}");
        assert!(out.contains("Const 7"), "got: {out}");
        assert!(out.contains("Return"), "got: {out}");
    }

    #[test]
    fn dump_is_deterministic() {
        let build = || {
            let mut program = Program::new("test");
            let mty = program.new_method_type(vec![], None);
            let ent = program.new_entity(None, "f", "f", mty);
            let id = program.new_graph(ent);
            let graph = program.graph_mut(id);
            let a = graph.new_const(Tarval::Int(1));
            let b = graph.new_const(Tarval::Int(2));
            let sum = graph.new_add(graph.start_block(), a, b, Mode::Is);
            let mem = graph.initial_mem();
            let end_block = graph.end_block();
            let ret = graph.new_return(end_block, mem, Some(sum));
            graph.add_block_pred(end_block, ret);
            dump_program(&program)
        };
        assert_eq!(build(), build());
    }
}
