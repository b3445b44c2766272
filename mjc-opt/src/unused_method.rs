//! Dead-method elimination.
//!
//! A method graph with no incoming call edge anywhere in the program is
//! deleted. The entry point `minijava_main` is always kept.

use mjc_ir::{OpKind, Program};

use crate::Optimization;

const MAIN_LD_NAME: &str = "minijava_main";

#[derive(Default)]
pub struct UnusedMethod {
    changed: bool,
}

impl Optimization for UnusedMethod {
    fn name(&self) -> &'static str {
        "unused_method"
    }

    fn optimize(&mut self, program: &mut Program) -> bool {
        self.changed = false;
        // newest first, so call chains of dead helpers unravel quickly
        for id in program.graph_ids().into_iter().rev() {
            if program.is_graph_dead(id) {
                continue;
            }
            let entity = program.graph(id).entity;
            if program.entity(entity).ld_name == MAIN_LD_NAME {
                continue;
            }
            let mut called = false;
            for other in program.graph_ids() {
                let graph = program.graph(other);
                graph.walk(|node| {
                    if let OpKind::Call { entity: callee } = *graph.op(node) {
                        if callee == entity {
                            called = true;
                        }
                    }
                });
                if called {
                    break;
                }
            }
            if !called {
                log::debug!(
                    target: "opt",
                    "removing uncalled method {}",
                    program.entity(entity).ld_name
                );
                program.free_graph(id);
                self.changed = true;
            }
        }
        self.changed
    }
}
