//! String interning for the MiniJava compiler.
//!
//! A [SymbolPool] maps byte-string content to canonical [Symbol] handles.
//! Two symbols drawn from the same pool compare equal if and only if they
//! denote the same string, so downstream stages compare and hash fixed-width
//! handles instead of string content. Keywords, primitive type names and the
//! reserved builtin class names are interned on construction with stable
//! indices, available as constants in [predefined].

use core::fmt;
use core::num::NonZeroU32;
use std::rc::Rc;

use rustc_hash::FxHashMap;

/// A canonical handle for an interned string.
///
/// Symbols are only meaningful together with the pool that created them;
/// resolving a symbol against a different pool is a logic error (and panics
/// in debug builds when the index is out of range).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(NonZeroU32);

impl Symbol {
    const fn from_index(index: u32) -> Self {
        match NonZeroU32::new(index + 1) {
            Some(raw) => Self(raw),
            None => panic!("symbol index overflow"),
        }
    }

    /// Returns the dense index of this symbol within its pool.
    #[inline]
    pub const fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }

    /// Returns the raw non-zero representation, useful for dense side tables.
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.index())
    }
}

macro_rules! predefine_symbols {
    ($($name:ident = $value:literal),* $(,)?) => {
        /// Symbols interned by [SymbolPool::new], in declaration order.
        pub mod predefined {
            use super::Symbol;

            predefine_symbols!(@consts 0u32; $($name = $value),*);

            pub(crate) const STRINGS: &[&str] = &[$($value),*];
        }
    };
    (@consts $idx:expr; $name:ident = $value:literal $(, $rest:ident = $restval:literal)*) => {
        pub const $name: Symbol = Symbol::from_index($idx);
        predefine_symbols!(@consts $idx + 1u32; $($rest = $restval),*);
    };
    (@consts $idx:expr;) => {};
}

predefine_symbols! {
    // primitive type names
    INT = "int",
    BOOLEAN = "boolean",
    VOID = "void",
    // reserved builtin class names
    STRING = "String",
    SYSTEM = "System",
    PRINT_STREAM = "PrintStream",
    JAVA_IO_PRINT_STREAM = "java.io.PrintStream",
    JAVA_LANG_SYSTEM = "java.lang.System",
    // builtin member names
    OUT = "out",
    PRINTLN = "println",
    MAIN = "main",
    ARG = "arg",
    // keyword spellings (MiniJava uses a subset, the rest are reserved)
    KW_ABSTRACT = "abstract",
    KW_ASSERT = "assert",
    KW_BREAK = "break",
    KW_BYTE = "byte",
    KW_CASE = "case",
    KW_CATCH = "catch",
    KW_CHAR = "char",
    KW_CLASS = "class",
    KW_CONST = "const",
    KW_CONTINUE = "continue",
    KW_DEFAULT = "default",
    KW_DOUBLE = "double",
    KW_DO = "do",
    KW_ELSE = "else",
    KW_ENUM = "enum",
    KW_EXTENDS = "extends",
    KW_FALSE = "false",
    KW_FINALLY = "finally",
    KW_FINAL = "final",
    KW_FLOAT = "float",
    KW_FOR = "for",
    KW_GOTO = "goto",
    KW_IF = "if",
    KW_IMPLEMENTS = "implements",
    KW_IMPORT = "import",
    KW_INSTANCEOF = "instanceof",
    KW_INTERFACE = "interface",
    KW_LONG = "long",
    KW_NATIVE = "native",
    KW_NEW = "new",
    KW_NULL = "null",
    KW_PACKAGE = "package",
    KW_PRIVATE = "private",
    KW_PROTECTED = "protected",
    KW_PUBLIC = "public",
    KW_RETURN = "return",
    KW_SHORT = "short",
    KW_STATIC = "static",
    KW_STRICTFP = "strictfp",
    KW_SUPER = "super",
    KW_SWITCH = "switch",
    KW_SYNCHRONIZED = "synchronized",
    KW_THIS = "this",
    KW_THROWS = "throws",
    KW_THROW = "throw",
    KW_TRANSIENT = "transient",
    KW_TRUE = "true",
    KW_TRY = "try",
    KW_VOLATILE = "volatile",
    KW_WHILE = "while",
}

/// A pool of canonical string representations.
///
/// Interning the same content twice yields the same [Symbol]; distinct
/// content yields distinct symbols. The pool owns the string storage, so
/// symbols are valid only while the pool lives.
pub struct SymbolPool {
    strings: Vec<Rc<str>>,
    table: FxHashMap<Rc<str>, Symbol>,
}

impl SymbolPool {
    /// Creates a pool with all [predefined] symbols already interned.
    pub fn new() -> Self {
        let mut pool = Self {
            strings: Vec::with_capacity(predefined::STRINGS.len() + 64),
            table: FxHashMap::default(),
        };
        for s in predefined::STRINGS {
            pool.intern(s);
        }
        pool
    }

    /// Interns `content`, returning its canonical symbol.
    pub fn intern(&mut self, content: &str) -> Symbol {
        if let Some(&sym) = self.table.get(content) {
            return sym;
        }
        let sym = Symbol::from_index(u32::try_from(self.strings.len()).expect("pool overflow"));
        let stored: Rc<str> = Rc::from(content);
        self.strings.push(Rc::clone(&stored));
        self.table.insert(stored, sym);
        sym
    }

    /// Returns the symbol for `content` if it has been interned before.
    pub fn get(&self, content: &str) -> Option<Symbol> {
        self.table.get(content).copied()
    }

    /// Resolves a symbol back to the interned string.
    pub fn resolve(&self, sym: Symbol) -> &str {
        &self.strings[sym.index()]
    }

    /// Number of distinct strings in the pool.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl Default for SymbolPool {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SymbolPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolPool").field("len", &self.len()).finish_non_exhaustive()
    }
}
