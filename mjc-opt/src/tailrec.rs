//! Tail-recursion elimination.
//!
//! A `Return` whose memory comes straight out of a self-call in the same
//! block, and whose returned value (if any) is wired directly to that
//! call, is rewritten into a jump back to the method entry: the old start
//! block becomes a loop header, parameters and the memory stream become
//! phis over the original projections and the call's arguments, and the
//! returns die as `Bad` predecessors of the end block.

use mjc_ir::{
    pn, slot, verify_graph, Graph, GraphId, Mode, Node, OpKind, Program, Resources,
};

use crate::Optimization;

#[derive(Default)]
pub struct TailRecursion {
    changed: bool,
}

impl Optimization for TailRecursion {
    fn name(&self) -> &'static str {
        "tailrec"
    }

    fn optimize(&mut self, program: &mut Program) -> bool {
        self.changed = false;
        for id in program.graph_ids() {
            let entity = program.graph(id).entity;
            let own_graph = program.entity(entity).graph();
            debug_assert_eq!(own_graph, Some(id));
            let tail_returns = find_tail_recursion(program, id);
            if tail_returns.is_empty() {
                continue;
            }
            let graph = program.graph_mut(id);
            graph.reserve_resources(Resources::IRN_LINK | Resources::PHI_LIST);
            rewrite_as_loop(graph, &tail_returns);
            graph.free_resources(Resources::IRN_LINK | Resources::PHI_LIST);
            graph.remove_bads();
            if let Err(err) = verify_graph(graph) {
                panic!("tailrec broke the graph: {err}");
            }
            self.changed = true;
        }
        self.changed
    }
}

/// Tail-recursive returns of `graph`, paired with their call.
fn find_tail_recursion(program: &Program, id: GraphId) -> Vec<(Node, Node)> {
    let graph = program.graph(id);
    let mut found = Vec::new();
    for &ret in graph.ins(graph.end_block()) {
        if !matches!(graph.op(ret), OpKind::Return) {
            continue;
        }
        let mem = graph.in_at(ret, 0);
        if !matches!(graph.op(mem), OpKind::Proj { .. }) {
            continue;
        }
        let call = graph.in_at(mem, 0);
        let OpKind::Call { entity } = *graph.op(call) else {
            continue;
        };
        // the call must target this very graph and sit next to the return
        if program.entity(entity).graph() != Some(id) {
            continue;
        }
        if graph.block_of(ret) != graph.block_of(call) {
            continue;
        }
        // at most one returned value, wired directly to the call
        if graph.arity(ret) == 2 {
            let value = graph.in_at(ret, 1);
            if !matches!(graph.op(value), OpKind::Proj { .. }) {
                continue;
            }
            let tuple = graph.in_at(value, 0);
            if !matches!(graph.op(tuple), OpKind::Proj { .. })
                || graph.in_at(tuple, 0) != call
            {
                continue;
            }
        }
        found.push((ret, call));
    }
    found
}

fn rewrite_as_loop(graph: &mut Graph, tail_returns: &[(Node, Node)]) {
    let header = graph.start_block();

    // everything placed in the old start block moves to a fresh entry
    // block; the old start block becomes the loop header
    let entry_block = graph.new_block(&[]);
    let args = graph.args();
    let old_mem = graph.initial_mem();
    for node in graph.nodes_of_block(header) {
        if !graph.is_bad(node) {
            graph.set_block_of(node, entry_block);
        }
    }
    graph.set_start_block(entry_block);

    // one entry edge plus one back edge per rewritten return
    let mut header_ins = vec![graph.new_jmp(entry_block)];
    for &(ret, _) in tail_returns {
        let ret_block = graph.block_of(ret);
        header_ins.push(graph.new_jmp(ret_block));
    }
    graph.set_ins(header, &header_ins);
    graph.add_end_keepalive(header);

    // the memory stream loops: initial memory on entry, the call's memory
    // input on every back edge
    let mut mem_ins = vec![old_mem];
    for &(_, call) in tail_returns {
        mem_ins.push(graph.in_at(call, slot::CALL_MEM));
    }
    let mem_phi = graph.new_phi_loop(header, &mem_ins, Mode::M);
    graph.exchange(old_mem, mem_phi);
    let start = graph.start();
    let new_mem = graph.new_proj(start, Mode::M, pn::START_M);
    graph.set_in(mem_phi, 0, new_mem);
    graph.set_initial_mem(new_mem);

    // parameters become phis over the entry projection and the arguments
    // of the rewritten calls
    let params: Vec<(Node, u32)> = graph
        .out_edges(args)
        .into_iter()
        .filter_map(|(user, _)| match *graph.op(user) {
            OpKind::Proj { num } if !graph.is_bad(user) => Some((user, num)),
            _ => None,
        })
        .collect();
    for (param, num) in params {
        let mode = graph.mode(param);
        let mut phi_ins = vec![param];
        for &(_, call) in tail_returns {
            phi_ins.push(graph.in_at(call, slot::CALL_FIRST_ARG + num as usize));
        }
        let phi = graph.new_phi_loop(header, &phi_ins, mode);
        graph.exchange(param, phi);
        let fresh = graph.new_proj(args, mode, num);
        graph.set_in(phi, 0, fresh);
    }

    // the rewritten returns disappear from the end block
    for &(ret, _) in tail_returns {
        let bad = graph.new_bad(Mode::X);
        graph.exchange(ret, bad);
    }
}
