//! First IR pass: types and entities.
//!
//! Materializes an IR class type (plus pointer type) for every class, an
//! entity for every field and method, and the chains of array types the
//! program actually mentions. Class records are laid out once all fields
//! are in place; empty classes receive a synthetic `int` field because the
//! backend cannot handle empty records. The runtime allocator and print
//! routine are registered as external entities.

use mjc_frontend::{NodeId, Program as Ast};
use mjc_ir::{EntityId, Mode, Program, TypeId};
use mjc_semantic::{SemType, SemanticInfo};
use mjc_symbol::SymbolPool;
use rustc_hash::FxHashMap;

use crate::mangle;

/// External runtime entities.
pub struct RuntimeLib {
    /// `void* mj_runtime_allocate(size_t element_size, size_t count)`.
    pub allocate: EntityId,
    /// `void mj_runtime_println(int32_t n)`.
    pub println: EntityId,
}

/// The result of the first IR pass, consumed by the method builder.
pub struct IrTypes {
    pub int_type: TypeId,
    pub boolean_type: TypeId,
    pub pointer_type: TypeId,
    pub runtime: RuntimeLib,
    type_map: FxHashMap<SemType, TypeId>,
    class_map: FxHashMap<NodeId, TypeId>,
    class_ptr_map: FxHashMap<NodeId, TypeId>,
    field_map: FxHashMap<NodeId, EntityId>,
    method_map: FxHashMap<NodeId, EntityId>,
    sizes: FxHashMap<TypeId, u32>,
}

impl IrTypes {
    /// The IR type for a semantic variable type.
    pub fn var_type(&self, ty: SemType) -> TypeId {
        self.type_map[&ty]
    }

    /// The class record type of a `class_declaration` node.
    pub fn class_type(&self, class: NodeId) -> TypeId {
        self.class_map[&class]
    }

    /// The field entity of a field `var_decl` node, if one was created.
    /// Builtin class fields have no storage and no entity.
    pub fn field_entity(&self, field: NodeId) -> Option<EntityId> {
        self.field_map.get(&field).copied()
    }

    /// The method entity a resolved invocation target maps to. Builtin
    /// `println` maps to the runtime print routine.
    pub fn method_entity(&self, method: NodeId) -> EntityId {
        self.method_map[&method]
    }

    pub fn size_of(&self, ty: TypeId) -> u32 {
        self.sizes[&ty]
    }
}

/// Runs the first IR pass over the user program and the builtin classes.
pub fn create_types(
    ast: &Ast,
    seminfo: &SemanticInfo,
    pool: &SymbolPool,
    program: &mut Program,
) -> IrTypes {
    let int_type = program.new_primitive_type(Mode::Is);
    let boolean_type = program.new_primitive_type(Mode::Bu);
    let pointer_type = program.new_primitive_type(Mode::P);

    let mut types = IrTypes {
        int_type,
        boolean_type,
        pointer_type,
        runtime: create_runtime(program, int_type, pointer_type),
        type_map: FxHashMap::default(),
        class_map: FxHashMap::default(),
        class_ptr_map: FxHashMap::default(),
        field_map: FxHashMap::default(),
        method_map: FxHashMap::default(),
        sizes: FxHashMap::default(),
    };
    types.sizes.insert(int_type, 4);
    types.sizes.insert(boolean_type, 1);
    types.sizes.insert(pointer_type, 8);

    // class records first so field and variable types can refer to them
    for class in ast.classes.iter().chain(&seminfo.builtin_ast().classes) {
        let name = pool.resolve(class.name);
        let class_type = program.new_class_type(name);
        let ptr = program.new_pointer_type(class_type);
        types.sizes.insert(ptr, 8);
        types.class_map.insert(class.info.id, class_type);
        types.class_ptr_map.insert(class.info.id, ptr);
    }

    // every type the semantic analysis annotated somewhere
    let mut annotated: Vec<SemType> =
        seminfo.type_annotations().values().copied().collect();
    annotated.sort_by_key(|ty| (ty.rank, ty.info.name, ty.info.declaration));
    annotated.dedup();
    for ty in annotated {
        if !ty.is_void() {
            var_type(&mut types, program, ty);
        }
    }

    // fields, then layout
    for class in ast.classes.iter().chain(&seminfo.builtin_ast().classes) {
        let class_type = types.class_map[&class.info.id];
        let builtin = seminfo.classes()[&class.name].is_builtin();
        for field in &class.fields {
            if builtin {
                continue;
            }
            let field_sem = seminfo.type_of(field.info.id).expect("fields are annotated");
            let field_ir = var_type(&mut types, program, field_sem);
            let entity = program.new_entity(
                Some(class_type),
                pool.resolve(field.name),
                mangle::mangle_field(pool, class.name, field.name),
                field_ir,
            );
            types.field_map.insert(field.info.id, entity);
        }
        if builtin || class.fields.is_empty() {
            // the backend chokes on empty records
            program.new_entity(
                Some(class_type),
                "__prevent_empty_class",
                "__prevent_empty_class",
                int_type,
            );
        }
        program.default_layout(class_type);
        types.sizes.insert(class_type, program.type_size(class_type));
    }

    // method types and entities
    for class in &ast.classes {
        let class_type = types.class_map[&class.info.id];
        let this_ptr = types.class_ptr_map[&class.info.id];
        for method in &class.instance_methods {
            let mut params = vec![this_ptr];
            for param in &method.parameters {
                let sem = seminfo.type_of(param.info.id).expect("parameters are annotated");
                params.push(var_type(&mut types, program, sem));
            }
            let return_sem = seminfo.type_of(method.info.id).expect("methods are annotated");
            let result = if return_sem.is_void() {
                None
            } else {
                Some(var_type(&mut types, program, return_sem))
            };
            let method_type = program.new_method_type(params, result);
            let entity = program.new_entity(
                Some(class_type),
                pool.resolve(method.name),
                mangle::mangle_method(pool, class.name, method.name),
                method_type,
            );
            types.method_map.insert(method.info.id, entity);
        }
        for main in &class.main_methods {
            let method_type = program.new_method_type(Vec::new(), None);
            let entity = program.new_entity(
                None,
                pool.resolve(main.name),
                mangle::MAIN_LD_NAME,
                method_type,
            );
            types.method_map.insert(main.info.id, entity);
        }
    }

    // calls resolved to the builtin println are redirected to the runtime
    let println = seminfo.builtin_ast().classes[1].instance_methods[0].info.id;
    types.method_map.insert(println, types.runtime.println);

    log::debug!(
        target: "irbuild",
        "created {} classes, {} fields, {} methods",
        types.class_map.len(),
        types.field_map.len(),
        types.method_map.len()
    );
    types
}

fn create_runtime(program: &mut Program, int_type: TypeId, pointer_type: TypeId) -> RuntimeLib {
    let alloc_type = program.new_method_type(vec![int_type, int_type], Some(pointer_type));
    let allocate = program.new_entity(
        None,
        mangle::RUNTIME_ALLOCATE,
        mangle::RUNTIME_ALLOCATE,
        alloc_type,
    );
    let println_type = program.new_method_type(vec![int_type], None);
    let println = program.new_entity(
        None,
        mangle::RUNTIME_PRINTLN,
        mangle::RUNTIME_PRINTLN,
        println_type,
    );
    RuntimeLib { allocate, println }
}

/// Materializes the IR type for `ty`, creating array chains lazily.
fn var_type(types: &mut IrTypes, program: &mut Program, ty: SemType) -> TypeId {
    if let Some(&existing) = types.type_map.get(&ty) {
        return existing;
    }
    let ir = if ty.rank == 0 {
        if ty.info.is_boolean() {
            types.boolean_type
        } else if ty.info.is_int() {
            types.int_type
        } else if ty.info.is_null() {
            types.pointer_type
        } else {
            let decl = ty.info.declaration.expect("reference types have a declaration");
            types.class_ptr_map[&decl]
        }
    } else {
        let element = var_type(types, program, ty.element_type());
        let array = program.new_array_type(element);
        let ptr = program.new_pointer_type(array);
        types.sizes.insert(array, 8);
        types.sizes.insert(ptr, 8);
        ptr
    };
    types.type_map.insert(ty, ir);
    types.type_map[&ty]
}
