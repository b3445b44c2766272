//! Lowering of annotated MiniJava ASTs into the SSA graph IR.
//!
//! Two sequential passes: the first materializes IR types and entities
//! from the semantic information, the second builds an SSA graph for every
//! method body. The [GlobalIrState] guard enforces that at most one IR
//! build owns the program tables at a time.

mod mangle;
mod method;
mod ssa;
mod state;
mod types;

use mjc_frontend::Program as Ast;
use mjc_semantic::SemanticInfo;
use mjc_symbol::SymbolPool;

pub use self::mangle::{
    mangle_class, mangle_field, mangle_local, mangle_method, MAIN_LD_NAME, RUNTIME_ALLOCATE,
    RUNTIME_PRINTLN,
};
pub use self::method::create_methods;
pub use self::ssa::{SsaBuilder, Variable};
pub use self::state::{GlobalIrState, StateError};
pub use self::types::{create_types, IrTypes, RuntimeLib};

/// Runs both IR passes over a semantically checked program.
///
/// The guard witnesses exclusive ownership of the IR state; the behavior
/// is undefined for an AST that did not pass [mjc_semantic::check_program].
pub fn build_ir(
    _state: &GlobalIrState,
    ast: &Ast,
    seminfo: &SemanticInfo,
    pool: &SymbolPool,
) -> (mjc_ir::Program, IrTypes) {
    let mut program = mjc_ir::Program::new("minijava");
    let types = create_types(ast, seminfo, pool, &mut program);
    create_methods(ast, seminfo, &types, &mut program);
    log::debug!(target: "irbuild", "built {} method graphs", program.graph_count());
    (program, types)
}
