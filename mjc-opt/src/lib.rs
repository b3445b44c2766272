//! Middle-end optimizations.
//!
//! A driver iterates the registered passes in their recommended order
//! until a whole round reports no change, bounded at 100 rounds. Each pass
//! either implements [Optimization] directly or plugs into the
//! [worklist](worklist::run_worklist) protocol, which visits every node of
//! every graph in topological order, re-enqueues the users of changed
//! nodes, runs a cleanup sweep and restores the graph invariants
//! afterwards.

mod conditional;
mod control_flow;
mod folding;
mod gc;
mod load_store;
mod tailrec;
mod unroll;
mod unused_method;
mod unused_params;
pub mod worklist;

use mjc_ir::Program;

pub use self::conditional::Conditional;
pub use self::control_flow::ControlFlow;
pub use self::folding::Folding;
pub use self::gc::StaticAllocationElimination;
pub use self::load_store::LoadStore;
pub use self::tailrec::TailRecursion;
pub use self::unroll::LoopUnrolling;
pub use self::unused_method::UnusedMethod;
pub use self::unused_params::UnusedParams;

/// Upper bound on fixpoint rounds; reaching it means a pass oscillates.
const MAX_ROUNDS: u32 = 100;

/// A graph-rewriting optimization pass.
pub trait Optimization {
    fn name(&self) -> &'static str;

    /// Rewrites `program`, returning whether anything changed.
    fn optimize(&mut self, program: &mut Program) -> bool;
}

/// The ordered pass pipeline.
pub struct Optimizer {
    passes: Vec<Box<dyn Optimization>>,
}

impl Optimizer {
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    /// All known passes, in the recommended order.
    pub fn with_all_passes() -> Self {
        let mut optimizer = Self::new();
        optimizer.register(Box::new(Folding::default()));
        optimizer.register(Box::new(Conditional::default()));
        optimizer.register(Box::new(LoadStore::default()));
        optimizer.register(Box::new(ControlFlow::default()));
        optimizer.register(Box::new(TailRecursion::default()));
        optimizer.register(Box::new(UnusedMethod::default()));
        optimizer.register(Box::new(UnusedParams::default()));
        optimizer.register(Box::new(StaticAllocationElimination::default()));
        optimizer.register(Box::new(LoopUnrolling::default()));
        optimizer
    }

    pub fn register(&mut self, pass: Box<dyn Optimization>) {
        self.passes.push(pass);
    }

    /// Names of the registered passes, in execution order.
    pub fn names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }

    /// Runs all passes to a fixpoint.
    pub fn run(&mut self, program: &mut Program) {
        for round in 0..MAX_ROUNDS {
            let mut changed = false;
            for pass in &mut self.passes {
                let pass_changed = pass.optimize(program);
                log::debug!(
                    target: "opt",
                    "round {round}: {} {}",
                    pass.name(),
                    if pass_changed { "changed" } else { "unchanged" }
                );
                changed |= pass_changed;
            }
            if !changed {
                return;
            }
        }
        log::warn!(target: "opt", "optimization did not converge within {MAX_ROUNDS} rounds");
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::with_all_passes()
    }
}
