//! Type meta information collected during semantic analysis.

use mjc_frontend::NodeId;
use mjc_symbol::{Symbol, SymbolPool};

/// Category of a basic (non-array) type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeCategory {
    /// A class declared by the program under analysis.
    UserDefined,
    /// One of the builtin classes `String`, `java.io.PrintStream`,
    /// `java.lang.System`.
    BuiltinClass,
    /// The type of the `null` literal.
    Null,
    Void,
    Int,
    Boolean,
}

/// Meta information describing a basic, i.e. non-array, type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BasicTypeInfo {
    pub category: TypeCategory,
    /// The name the type is registered under in the class definitions.
    pub name: Symbol,
    /// The `class_declaration` node for class types.
    pub declaration: Option<NodeId>,
}

impl BasicTypeInfo {
    pub fn primitive(category: TypeCategory, name: Symbol) -> Self {
        debug_assert!(!matches!(category, TypeCategory::UserDefined | TypeCategory::BuiltinClass));
        Self { category, name, declaration: None }
    }

    pub fn class(name: Symbol, declaration: NodeId, builtin: bool) -> Self {
        let category =
            if builtin { TypeCategory::BuiltinClass } else { TypeCategory::UserDefined };
        Self { category, name, declaration: Some(declaration) }
    }

    pub fn is_builtin(&self) -> bool {
        !matches!(self.category, TypeCategory::UserDefined)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self.category,
            TypeCategory::Void | TypeCategory::Int | TypeCategory::Boolean
        )
    }

    /// Whether instances of this type are valid variables. False only for
    /// `void` and `null`.
    pub fn is_instantiable(&self) -> bool {
        !matches!(self.category, TypeCategory::Void | TypeCategory::Null)
    }

    pub fn is_reference(&self) -> bool {
        !self.is_primitive()
    }

    pub fn is_user_defined(&self) -> bool {
        self.category == TypeCategory::UserDefined
    }

    pub fn is_null(&self) -> bool {
        self.category == TypeCategory::Null
    }

    pub fn is_void(&self) -> bool {
        self.category == TypeCategory::Void
    }

    pub fn is_int(&self) -> bool {
        self.category == TypeCategory::Int
    }

    pub fn is_boolean(&self) -> bool {
        self.category == TypeCategory::Boolean
    }
}

/// A semantic type: a basic type and an array rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SemType {
    pub info: BasicTypeInfo,
    pub rank: usize,
}

impl SemType {
    pub fn new(info: BasicTypeInfo, rank: usize) -> Self {
        Self { info, rank }
    }

    pub fn scalar(info: BasicTypeInfo) -> Self {
        Self { info, rank: 0 }
    }

    pub fn is_array(&self) -> bool {
        self.rank > 0
    }

    pub fn is_int(&self) -> bool {
        self.rank == 0 && self.info.is_int()
    }

    pub fn is_boolean(&self) -> bool {
        self.rank == 0 && self.info.is_boolean()
    }

    pub fn is_void(&self) -> bool {
        self.rank == 0 && self.info.is_void()
    }

    pub fn is_null(&self) -> bool {
        self.rank == 0 && self.info.is_null()
    }

    /// Arrays and class instances are references; `null` is one too.
    pub fn is_reference(&self) -> bool {
        self.rank > 0 || self.info.is_reference()
    }

    /// A reference to an object with fields and methods.
    pub fn is_object(&self) -> bool {
        self.rank == 0 && self.info.declaration.is_some()
    }

    /// The element type of an array, with one rank peeled off.
    pub fn element_type(&self) -> SemType {
        debug_assert!(self.is_array());
        Self { info: self.info, rank: self.rank - 1 }
    }

    /// Whether a value of type `self` may be assigned to a slot of type
    /// `target`: equal types, or `null` to any reference type.
    pub fn assignable_to(&self, target: &SemType) -> bool {
        self == target || (self.is_null() && target.is_reference())
    }

    /// Whether `self` and `other` may be compared with `==`/`!=`.
    pub fn comparable_to(&self, other: &SemType) -> bool {
        self.assignable_to(other) || other.assignable_to(self)
    }

    /// Renders the type for diagnostics, e.g. `int[][]` or `Foo`.
    pub fn display(&self, pool: &SymbolPool) -> String {
        let mut rendered = pool.resolve(self.info.name).to_owned();
        for _ in 0..self.rank {
            rendered.push_str("[]");
        }
        rendered
    }
}

#[cfg(test)]
mod tests {
    use mjc_symbol::predefined;

    use super::*;

    fn int_type() -> SemType {
        SemType::scalar(BasicTypeInfo::primitive(TypeCategory::Int, predefined::INT))
    }

    fn null_type() -> SemType {
        SemType::scalar(BasicTypeInfo::primitive(TypeCategory::Null, predefined::KW_NULL))
    }

    #[test]
    fn assignability() {
        let int_array = SemType::new(int_type().info, 1);
        assert!(int_type().assignable_to(&int_type()));
        assert!(!int_type().assignable_to(&int_array));
        assert!(null_type().assignable_to(&int_array));
        assert!(!null_type().assignable_to(&int_type()));
        assert!(int_array.comparable_to(&null_type()));
    }

    #[test]
    fn array_ranks() {
        let matrix = SemType::new(int_type().info, 2);
        assert!(matrix.is_array());
        assert!(matrix.is_reference());
        assert_eq!(matrix.element_type().rank, 1);
        assert!(!matrix.is_int());
    }

    #[test]
    fn display_renders_ranks() {
        let pool = SymbolPool::new();
        let matrix = SemType::new(int_type().info, 2);
        assert_eq!(matrix.display(&pool), "int[][]");
    }
}
