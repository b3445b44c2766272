//! Unused-parameter elimination.
//!
//! A method that never projects some of its parameters out of the `Start`
//! node gets a shrunk signature: a new method type and entity with only
//! the used parameters, a cloned graph whose argument projections are
//! renumbered, and every call site rewritten to pass only the surviving
//! arguments. The original graph is deleted.

use mjc_ir::{slot, verify_graph, OpKind, Program};
use rustc_hash::FxHashSet;

use crate::Optimization;

const MAIN_LD_NAME: &str = "minijava_main";

#[derive(Default)]
pub struct UnusedParams {
    changed: bool,
}

impl Optimization for UnusedParams {
    fn name(&self) -> &'static str {
        "unused_params"
    }

    fn optimize(&mut self, program: &mut Program) -> bool {
        self.changed = false;
        for id in program.graph_ids() {
            if program.is_graph_dead(id) {
                continue;
            }
            let entity = program.graph(id).entity;
            if program.entity(entity).ld_name == MAIN_LD_NAME {
                continue;
            }
            let (param_types, result) = {
                let (params, result) = program.method_signature(program.entity(entity).ty);
                (params.to_vec(), result)
            };
            if param_types.is_empty() {
                continue;
            }

            // parameters actually projected off the argument tuple
            let graph = program.graph(id);
            let args = graph.args();
            let mut used: FxHashSet<u32> = FxHashSet::default();
            graph.walk(|node| {
                if let OpKind::Proj { num } = *graph.op(node) {
                    if graph.arity(node) == 1 && graph.in_at(node, 0) == args {
                        used.insert(num);
                    }
                }
            });
            if used.len() >= param_types.len() {
                continue;
            }

            let mut kept: Vec<u32> = used.into_iter().collect();
            kept.sort_unstable();
            log::debug!(
                target: "opt",
                "shrinking {} from {} to {} parameters",
                program.entity(entity).ld_name,
                param_types.len(),
                kept.len()
            );

            // the reduced signature gets its own entity with a fresh name
            let new_params: Vec<_> =
                kept.iter().map(|&num| param_types[num as usize]).collect();
            let new_type = program.new_method_type(new_params, result);
            let owner = program.entity(entity).owner;
            let name = program.entity(entity).name.clone();
            let ld_name = format!("{}_p{}", program.entity(entity).ld_name, kept.len());
            let new_entity = program.new_entity(owner, name, ld_name, new_type);

            // clone the body and renumber the argument projections
            let new_id = program.clone_graph(id, new_entity);
            let clone = program.graph_mut(new_id);
            let clone_args = clone.args();
            let node_ids: Vec<_> = clone.node_ids().collect();
            for node in node_ids {
                if let OpKind::Proj { num } = *clone.op(node) {
                    if clone.arity(node) == 1 && clone.in_at(node, 0) == clone_args {
                        match kept.iter().position(|&k| k == num) {
                            Some(new_num) => {
                                clone.replace_op(node, OpKind::Proj { num: new_num as u32 })
                            }
                            // a projection of a dropped parameter can only
                            // be a leftover with no users
                            None => {
                                clone.replace_op(node, OpKind::Bad);
                                clone.set_ins(node, &[]);
                            }
                        }
                    }
                }
            }
            if let Err(err) = verify_graph(program.graph(new_id)) {
                panic!("unused_params broke the graph: {err}");
            }

            // rewrite every call site in the whole program
            rewrite_call_sites(program, entity, new_entity, &kept);
            program.free_graph(id);
            self.changed = true;
        }
        self.changed
    }
}

fn rewrite_call_sites(
    program: &mut Program,
    old_entity: mjc_ir::EntityId,
    new_entity: mjc_ir::EntityId,
    kept: &[u32],
) {
    for id in program.graph_ids() {
        let graph = program.graph_mut(id);
        let mut call_sites = Vec::new();
        graph.walk(|node| {
            if matches!(graph.op(node), OpKind::Call { entity } if *entity == old_entity) {
                call_sites.push(node);
            }
        });
        for call in call_sites {
            let mut new_ins = vec![graph.in_at(call, slot::CALL_MEM)];
            for &num in kept {
                new_ins.push(graph.in_at(call, slot::CALL_FIRST_ARG + num as usize));
            }
            graph.set_ins(call, &new_ins);
            graph.replace_op(call, OpKind::Call { entity: new_entity });
        }
    }
}
