//! Linker name mangling.
//!
//! Linker names are deterministic functions of class and member names so
//! calls resolve across compilation units. The main method always gets the
//! fixed name `minijava_main`, which the runtime's `main` calls.

use mjc_symbol::{Symbol, SymbolPool};

/// Linker name of the program entry point.
pub const MAIN_LD_NAME: &str = "minijava_main";

/// Linker name of the runtime allocator.
pub const RUNTIME_ALLOCATE: &str = "mj_runtime_allocate";

/// Linker name of the runtime integer print routine.
pub const RUNTIME_PRINTLN: &str = "mj_runtime_println";

/// `Mj_<C>_c<len(C)>`.
pub fn mangle_class(pool: &SymbolPool, class: Symbol) -> String {
    let name = pool.resolve(class);
    format!("Mj_{}_c{}", name, name.len())
}

/// `Mj_<C>_c<len(C)>_<F>_f<len(F)>`.
pub fn mangle_field(pool: &SymbolPool, class: Symbol, field: Symbol) -> String {
    let field_name = pool.resolve(field);
    format!("{}_{}_f{}", mangle_class(pool, class), field_name, field_name.len())
}

/// `Mj_<C>_c<len(C)>_<M>_m<len(M)>`.
pub fn mangle_method(pool: &SymbolPool, class: Symbol, method: Symbol) -> String {
    let method_name = pool.resolve(method);
    format!("{}_{}_m{}", mangle_class(pool, class), method_name, method_name.len())
}

/// `mj_<v>_v<len(v)>`, for backends that emit named local slots.
pub fn mangle_local(pool: &SymbolPool, local: Symbol) -> String {
    let name = pool.resolve(local);
    format!("mj_{}_v{}", name, name.len())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn mangling_scheme() {
        let mut pool = SymbolPool::new();
        let foo = pool.intern("Foo");
        let bar = pool.intern("bar");
        assert_eq!(mangle_class(&pool, foo), "Mj_Foo_c3");
        assert_eq!(mangle_field(&pool, foo, bar), "Mj_Foo_c3_bar_f3");
        assert_eq!(mangle_method(&pool, foo, bar), "Mj_Foo_c3_bar_m3");
        assert_eq!(mangle_local(&pool, bar), "mj_bar_v3");
    }

    #[test]
    fn length_suffix_disambiguates_underscores() {
        let mut pool = SymbolPool::new();
        let a = pool.intern("a_b");
        let ab = pool.intern("a");
        let c = pool.intern("c");
        let b_c = pool.intern("b_c");
        // `a_b` + `c` and `a` + `b_c` must not collide
        assert_ne!(mangle_field(&pool, a, c), mangle_field(&pool, ab, b_c));
    }
}
