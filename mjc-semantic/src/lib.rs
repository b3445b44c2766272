//! Semantic analysis for MiniJava: name resolution, type checking and
//! constant-folding annotations over an immutable AST.

mod analysis;
mod constant;
mod definitions;
mod info;
mod type_info;

pub use self::analysis::{check_program, SemanticError};
pub use self::constant::{fold_binary, fold_minus, parse_literal};
pub use self::definitions::{create_builtins, BuiltinDefinitions};
pub use self::info::{
    ClassDefinitions, ConstAnnotations, LocalsAnnotations, MethodAnnotations, SemanticInfo,
    TypeAnnotations, VarDeclAnnotations,
};
pub use self::type_info::{BasicTypeInfo, SemType, TypeCategory};
