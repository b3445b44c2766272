//! Static allocation elimination.
//!
//! An allocation whose result is only ever used as the base of field
//! stores cannot be observed: no load, no escape, no argument position.
//! The call and the stores are unlinked from the memory stream, so the
//! object is never materialized.

use mjc_ir::{slot, EntityId, Graph, Mode, Node, OpKind};

use crate::worklist::{run_worklist, WorklistOptimization};
use crate::Optimization;

const RUNTIME_ALLOCATE: &str = "mj_runtime_allocate";

#[derive(Default)]
pub struct StaticAllocationElimination {
    changed: bool,
}

impl Optimization for StaticAllocationElimination {
    fn name(&self) -> &'static str {
        "gc"
    }

    fn optimize(&mut self, program: &mut mjc_ir::Program) -> bool {
        // resolve the allocator entity once per run
        let allocate = program
            .entities()
            .find(|(_, desc)| desc.ld_name == RUNTIME_ALLOCATE)
            .map(|(id, _)| id);
        let Some(allocate) = allocate else {
            return false;
        };
        let mut pass = GcPass { allocate, changed: false };
        self.changed = run_worklist(program, &mut pass);
        self.changed
    }
}

struct GcPass {
    allocate: EntityId,
    changed: bool,
}

/// Re-threads the memory stream around `node`, detaching its effect.
fn unlink_memory(graph: &mut Graph, node: Node) {
    let mem_in = graph.in_at(node, slot::MEM);
    for (user, _) in graph.out_edges(node) {
        if graph.mode(user) == Mode::M {
            for (mem_user, idx) in graph.out_edges(user) {
                graph.set_in(mem_user, idx, mem_in);
            }
        }
    }
}

impl GcPass {
    /// Collects the stores hanging off the allocation, or `None` when the
    /// pointer is observed in any other way.
    fn only_stores(&self, graph: &Graph, call: Node) -> Option<Vec<Node>> {
        let mut stores = Vec::new();
        for (proj, _) in graph.out_edges(call) {
            let proj_mode = graph.mode(proj);
            if proj_mode == Mode::M {
                continue;
            }
            if proj_mode != Mode::T {
                return None;
            }
            for (result, _) in graph.out_edges(proj) {
                if graph.mode(result) != Mode::P {
                    return None;
                }
                for (member, slot_idx) in graph.out_edges(result) {
                    if !matches!(graph.op(member), OpKind::Member { .. }) || slot_idx != 0 {
                        return None;
                    }
                    for (store, store_slot) in graph.out_edges(member) {
                        if !matches!(graph.op(store), OpKind::Store)
                            || store_slot != slot::PTR
                        {
                            return None;
                        }
                        stores.push(store);
                    }
                }
            }
        }
        Some(stores)
    }
}

impl WorklistOptimization for GcPass {
    fn name(&self) -> &'static str {
        "gc"
    }

    fn handle(&mut self, graph: &mut Graph, node: Node) -> bool {
        let OpKind::Call { entity } = *graph.op(node) else {
            return false;
        };
        if entity != self.allocate {
            return false;
        }
        let Some(stores) = self.only_stores(graph, node) else {
            return false;
        };
        for store in stores {
            unlink_memory(graph, store);
        }
        unlink_memory(graph, node);
        self.changed = true;
        false
    }

    fn changed(&self) -> bool {
        self.changed
    }

    fn reset(&mut self) {
        self.changed = false;
    }
}
