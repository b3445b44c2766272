//! The SSA graph intermediate representation of the MiniJava compiler.
//!
//! Nodes live in per-graph arenas identified by stable indices; a program
//! aggregates the graphs with the type and entity tables. The crate also
//! provides the analyses the optimizer builds on: out-edge queries,
//! topological walks, dominance and natural loops, a structural verifier
//! and a deterministic textual dump.

mod dominance;
mod dump;
mod entity;
mod graph;
mod mode;
mod op;
mod program;
mod tarval;
mod verify;

pub use self::dominance::{block_preds, block_succs, find_loops, Dominance, LoopInfo};
pub use self::dump::{dump_graph, dump_program};
pub use self::entity::{EntityDesc, EntityId, EntityKind, GraphId, TypeDesc, TypeId};
pub use self::graph::{Graph, Link, Node, Resources};
pub use self::mode::Mode;
pub use self::op::{pn, slot, OpKind, Relation};
pub use self::program::Program;
pub use self::tarval::Tarval;
pub use self::verify::{verify_graph, VerifyError};
