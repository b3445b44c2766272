//! The immutable aggregate of all semantic information.

use mjc_frontend::{NodeId, Program, VarDecl};
use mjc_symbol::Symbol;
use rustc_hash::FxHashMap;

use crate::type_info::{BasicTypeInfo, SemType};

/// Maps class names (builtin and user-defined) to their type definitions.
pub type ClassDefinitions = FxHashMap<Symbol, BasicTypeInfo>;

/// Maps expression, `var_decl` and method nodes to their type.
pub type TypeAnnotations = FxHashMap<NodeId, SemType>;

/// Maps method nodes to the declarations of their parameters and locals.
pub type LocalsAnnotations = FxHashMap<NodeId, Vec<NodeId>>;

/// Maps variable and array accesses to the declaration they refer to.
pub type VarDeclAnnotations = FxHashMap<NodeId, NodeId>;

/// Maps method invocations to the instance method they call.
pub type MethodAnnotations = FxHashMap<NodeId, NodeId>;

/// Maps constant-valued expressions to their value.
pub type ConstAnnotations = FxHashMap<NodeId, i32>;

/// Everything the semantic analysis learned about a program.
///
/// The aggregate owns the synthesized builtin class AST and the implicit
/// global declarations, so annotations referring to them stay valid for as
/// long as the `SemanticInfo` lives. All side tables are immutable once
/// [check_program](crate::check_program) returns.
pub struct SemanticInfo {
    pub(crate) class_definitions: ClassDefinitions,
    pub(crate) type_annotations: TypeAnnotations,
    pub(crate) locals_annotations: LocalsAnnotations,
    pub(crate) vardecl_annotations: VarDeclAnnotations,
    pub(crate) method_annotations: MethodAnnotations,
    pub(crate) const_annotations: ConstAnnotations,
    pub(crate) builtin_ast: Program,
    pub(crate) globals: Vec<VarDecl>,
    /// The single `main_method` node of the program.
    pub(crate) main_method: NodeId,
}

impl SemanticInfo {
    pub fn classes(&self) -> &ClassDefinitions {
        &self.class_definitions
    }

    pub fn type_annotations(&self) -> &TypeAnnotations {
        &self.type_annotations
    }

    pub fn type_of(&self, id: NodeId) -> Option<SemType> {
        self.type_annotations.get(&id).copied()
    }

    pub fn locals_annotations(&self) -> &LocalsAnnotations {
        &self.locals_annotations
    }

    pub fn vardecl_annotations(&self) -> &VarDeclAnnotations {
        &self.vardecl_annotations
    }

    pub fn method_annotations(&self) -> &MethodAnnotations {
        &self.method_annotations
    }

    pub fn const_annotations(&self) -> &ConstAnnotations {
        &self.const_annotations
    }

    pub fn const_of(&self, id: NodeId) -> Option<i32> {
        self.const_annotations.get(&id).copied()
    }

    /// The AST of the builtin classes, owned by this aggregate.
    pub fn builtin_ast(&self) -> &Program {
        &self.builtin_ast
    }

    /// Declarations of the implicit globals (`System`), sorted by node ID.
    pub fn globals(&self) -> &[VarDecl] {
        &self.globals
    }

    /// The unique `main_method` node.
    pub fn main_method(&self) -> NodeId {
        self.main_method
    }
}
