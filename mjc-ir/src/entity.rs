//! IR types and entities.
//!
//! Types describe value layouts (primitives, pointers, arrays, class
//! records, method signatures); entities are named program objects (fields,
//! methods, runtime functions) owned by a class type or global. Both live
//! in the [Program](crate::program::Program) and are referenced by index.

use cranelift_entity::entity_impl;

use crate::mode::Mode;

/// Reference to a type in the program's type table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);
entity_impl!(TypeId, "ty");

/// Reference to an entity in the program's entity table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u32);
entity_impl!(EntityId, "ent");

/// Reference to a method graph.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphId(u32);
entity_impl!(GraphId, "irg");

/// Description of a type.
#[derive(Clone, Debug)]
pub enum TypeDesc {
    Primitive { mode: Mode },
    Pointer { points_to: TypeId },
    /// Unbounded array of `element`, always accessed through a pointer.
    Array { element: TypeId },
    /// A class record. Field offsets are assigned by
    /// [Program::default_layout](crate::program::Program::default_layout).
    Class { name: String, fields: Vec<EntityId>, size: Option<u32>, align: u32 },
    Method { params: Vec<TypeId>, result: Option<TypeId> },
}

/// What kind of program object an entity is.
#[derive(Clone, Debug)]
pub enum EntityKind {
    /// A class field; `offset` is set once the owner is laid out.
    Field { offset: Option<u32> },
    /// A method; `graph` is present for defined (non-external) methods.
    Method { graph: Option<GraphId> },
}

/// A named program object.
#[derive(Clone, Debug)]
pub struct EntityDesc {
    /// Source-level name.
    pub name: String,
    /// Mangled linker name.
    pub ld_name: String,
    pub ty: TypeId,
    /// Owning class type; `None` for global entities.
    pub owner: Option<TypeId>,
    pub kind: EntityKind,
}

impl EntityDesc {
    pub fn graph(&self) -> Option<GraphId> {
        match self.kind {
            EntityKind::Method { graph } => graph,
            EntityKind::Field { .. } => None,
        }
    }

    pub fn offset(&self) -> Option<u32> {
        match self.kind {
            EntityKind::Field { offset } => offset,
            EntityKind::Method { .. } => None,
        }
    }
}
