//! The program-wide IR state: type table, entity table and method graphs.

use cranelift_entity::PrimaryMap;

use crate::entity::{EntityDesc, EntityId, EntityKind, GraphId, TypeDesc, TypeId};
use crate::graph::Graph;
use crate::mode::Mode;

/// All IR data of one compilation: types, entities and graphs.
///
/// Mirrors the classic "program" singleton of graph libraries, but owned:
/// exactly one `Program` exists per compilation, enforced by the state
/// guard of the IR builder.
pub struct Program {
    name: String,
    types: PrimaryMap<TypeId, TypeDesc>,
    entities: PrimaryMap<EntityId, EntityDesc>,
    graphs: PrimaryMap<GraphId, Graph>,
    dead_graphs: Vec<GraphId>,
}

impl Program {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: PrimaryMap::new(),
            entities: PrimaryMap::new(),
            graphs: PrimaryMap::new(),
            dead_graphs: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // Types.

    pub fn new_primitive_type(&mut self, mode: Mode) -> TypeId {
        self.types.push(TypeDesc::Primitive { mode })
    }

    pub fn new_pointer_type(&mut self, points_to: TypeId) -> TypeId {
        self.types.push(TypeDesc::Pointer { points_to })
    }

    pub fn new_array_type(&mut self, element: TypeId) -> TypeId {
        self.types.push(TypeDesc::Array { element })
    }

    pub fn new_class_type(&mut self, name: impl Into<String>) -> TypeId {
        self.types.push(TypeDesc::Class {
            name: name.into(),
            fields: Vec::new(),
            size: None,
            align: 8,
        })
    }

    pub fn new_method_type(&mut self, params: Vec<TypeId>, result: Option<TypeId>) -> TypeId {
        self.types.push(TypeDesc::Method { params, result })
    }

    pub fn type_desc(&self, ty: TypeId) -> &TypeDesc {
        &self.types[ty]
    }

    /// The machine mode of values of `ty`.
    pub fn type_mode(&self, ty: TypeId) -> Mode {
        match &self.types[ty] {
            TypeDesc::Primitive { mode } => *mode,
            TypeDesc::Pointer { .. } | TypeDesc::Array { .. } | TypeDesc::Class { .. } => Mode::P,
            TypeDesc::Method { .. } => Mode::P,
        }
    }

    /// The store size of values of `ty` in bytes.
    pub fn type_size(&self, ty: TypeId) -> u32 {
        match &self.types[ty] {
            TypeDesc::Primitive { mode } => match mode {
                Mode::Is => 4,
                Mode::Bu => 1,
                _ => 8,
            },
            TypeDesc::Pointer { .. } | TypeDesc::Array { .. } | TypeDesc::Method { .. } => 8,
            TypeDesc::Class { size, .. } => size.expect("class type has been laid out"),
        }
    }

    pub fn method_signature(&self, ty: TypeId) -> (&[TypeId], Option<TypeId>) {
        match &self.types[ty] {
            TypeDesc::Method { params, result } => (params, *result),
            other => panic!("expected method type, found {other:?}"),
        }
    }

    /// Assigns field offsets, alignment and total size to a class type.
    /// Every field's type size must already be known.
    pub fn default_layout(&mut self, class: TypeId) {
        let fields = match &self.types[class] {
            TypeDesc::Class { fields, .. } => fields.clone(),
            other => panic!("expected class type, found {other:?}"),
        };
        let mut offset = 0u32;
        let mut max_align = 1u32;
        for field in fields {
            let field_ty = self.entities[field].ty;
            let size = self.type_size(field_ty);
            let align = size.min(8).max(1);
            max_align = max_align.max(align);
            offset = offset.div_ceil(align) * align;
            match &mut self.entities[field].kind {
                EntityKind::Field { offset: slot } => *slot = Some(offset),
                other => panic!("class member is not a field: {other:?}"),
            }
            offset += size;
        }
        let size = offset.div_ceil(max_align) * max_align;
        match &mut self.types[class] {
            TypeDesc::Class { size: s, align, .. } => {
                *s = Some(size.max(1));
                *align = max_align;
            }
            _ => unreachable!(),
        }
    }

    // Entities.

    pub fn new_entity(
        &mut self,
        owner: Option<TypeId>,
        name: impl Into<String>,
        ld_name: impl Into<String>,
        ty: TypeId,
    ) -> EntityId {
        let kind = match self.types[ty] {
            TypeDesc::Method { .. } => EntityKind::Method { graph: None },
            _ => EntityKind::Field { offset: None },
        };
        let entity = self.entities.push(EntityDesc {
            name: name.into(),
            ld_name: ld_name.into(),
            ty,
            owner,
            kind,
        });
        if let (Some(owner), EntityKind::Field { .. }) = (owner, &self.entities[entity].kind) {
            if let TypeDesc::Class { fields, .. } = &mut self.types[owner] {
                fields.push(entity);
            }
        }
        entity
    }

    pub fn entity(&self, id: EntityId) -> &EntityDesc {
        &self.entities[id]
    }

    pub fn entity_mut(&mut self, id: EntityId) -> &mut EntityDesc {
        &mut self.entities[id]
    }

    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &EntityDesc)> {
        self.entities.iter()
    }

    // Graphs.

    /// Creates an empty graph for `entity` and links the two.
    pub fn new_graph(&mut self, entity: EntityId) -> GraphId {
        let id = self.graphs.next_key();
        let graph = Graph::new(id, entity);
        let id = self.graphs.push(graph);
        match &mut self.entities[entity].kind {
            EntityKind::Method { graph } => *graph = Some(id),
            other => panic!("graphs belong to method entities, found {other:?}"),
        }
        id
    }

    /// Clones the graph `from` for a different method entity, preserving
    /// node indices. Used when a pass rebuilds a method with a changed
    /// signature.
    pub fn clone_graph(&mut self, from: GraphId, entity: EntityId) -> GraphId {
        let id = self.new_graph(entity);
        debug_assert_ne!(from, id);
        let mut clone = Graph::new(id, entity);
        clone.clone_nodes_from(&self.graphs[from]);
        self.graphs[id] = clone;
        id
    }

    pub fn graph(&self, id: GraphId) -> &Graph {
        &self.graphs[id]
    }

    pub fn graph_mut(&mut self, id: GraphId) -> &mut Graph {
        &mut self.graphs[id]
    }

    pub fn graph_count(&self) -> usize {
        self.graphs.len() - self.dead_graphs.len()
    }

    /// IDs of all live graphs, in creation order.
    pub fn graph_ids(&self) -> Vec<GraphId> {
        self.graphs.keys().filter(|id| !self.dead_graphs.contains(id)).collect()
    }

    pub fn is_graph_dead(&self, id: GraphId) -> bool {
        self.dead_graphs.contains(&id)
    }

    /// Deletes a method graph, e.g. for an uncalled method. The entity
    /// stays but loses its definition.
    pub fn free_graph(&mut self, id: GraphId) {
        debug_assert!(!self.dead_graphs.contains(&id));
        let entity = self.graphs[id].entity;
        match &mut self.entities[entity].kind {
            EntityKind::Method { graph } => *graph = None,
            _ => unreachable!(),
        }
        self.dead_graphs.push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_layout_assigns_offsets() {
        let mut prog = Program::new("test");
        let int_ty = prog.new_primitive_type(Mode::Is);
        let bool_ty = prog.new_primitive_type(Mode::Bu);
        let class = prog.new_class_type("C");
        let ptr = prog.new_pointer_type(class);
        let a = prog.new_entity(Some(class), "a", "a", bool_ty);
        let b = prog.new_entity(Some(class), "b", "b", int_ty);
        let c = prog.new_entity(Some(class), "c", "c", ptr);
        prog.default_layout(class);

        assert_eq!(prog.entity(a).offset(), Some(0));
        assert_eq!(prog.entity(b).offset(), Some(4));
        assert_eq!(prog.entity(c).offset(), Some(8));
        assert_eq!(prog.type_size(class), 16);
    }

    #[test]
    fn empty_class_layout_is_non_zero() {
        let mut prog = Program::new("test");
        let class = prog.new_class_type("Empty");
        prog.default_layout(class);
        assert!(prog.type_size(class) >= 1);
    }

    #[test]
    fn freeing_a_graph_unlinks_the_entity() {
        let mut prog = Program::new("test");
        let mty = prog.new_method_type(vec![], None);
        let ent = prog.new_entity(None, "f", "f", mty);
        let graph = prog.new_graph(ent);
        assert_eq!(prog.entity(ent).graph(), Some(graph));
        assert_eq!(prog.graph_count(), 1);
        prog.free_graph(graph);
        assert_eq!(prog.entity(ent).graph(), None);
        assert_eq!(prog.graph_count(), 0);
        assert!(prog.graph_ids().is_empty());
    }
}
