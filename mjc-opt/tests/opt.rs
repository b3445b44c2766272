//! End-to-end optimizer tests over freshly built IR.

use mjc_frontend::{parse_program, AstFactory, Lexer};
use mjc_irbuild::{build_ir, GlobalIrState};
use mjc_opt::Optimizer;
use mjc_symbol::SymbolPool;

fn acquire_state() -> GlobalIrState {
    loop {
        if let Ok(state) = GlobalIrState::initialize() {
            return state;
        }
        std::thread::yield_now();
    }
}

fn optimize(src: &str) -> String {
    let mut pool = SymbolPool::new();
    let mut factory = AstFactory::default();
    let ast = {
        let lexer = Lexer::new(src.as_bytes(), &mut pool);
        parse_program(lexer, &mut factory).expect("test source parses")
    };
    let seminfo =
        mjc_semantic::check_program(&ast, &pool, &mut factory).expect("test source checks");
    let state = acquire_state();
    let (mut program, _types) = build_ir(&state, &ast, &seminfo, &pool);
    let mut optimizer = Optimizer::with_all_passes();
    optimizer.run(&mut program);
    mjc_ir::dump_program(&program)
}

#[test]
fn pass_registry_lists_the_recommended_order() {
    let optimizer = Optimizer::with_all_passes();
    assert_eq!(
        optimizer.names(),
        vec![
            "folding",
            "conditional",
            "load_store",
            "control_flow",
            "tailrec",
            "unused_method",
            "unused_params",
            "gc",
            "unroll",
        ]
    );
}

#[test]
fn folding_propagates_through_joins() {
    // both branches assign the same constant, so x + 1 folds
    let dump = optimize(
        "class Main { public int f(boolean c) { int x; if (c) x = 2; else x = 2; \
         return x + 1; } public static void main(String[] args) { \
         System.out.println(new Main().f(true)); } }",
    );
    assert!(dump.contains("Const 3"), "got: {dump}");
}

#[test]
fn algebraic_identities() {
    let dump = optimize(
        "class Main { public int f(int x) { return (x - x) + (x / x); } \
         public static void main(String[] args) { \
         System.out.println(new Main().f(5)); } }",
    );
    // x - x is 0, x / x is 1, 0 + 1 folds to 1
    assert!(dump.contains("method Mj_Main_c4_f_m1:"), "got: {dump}");
    let section = dump.split("method Mj_Main_c4_f_m1:").nth(1).unwrap();
    let section = section.split("\nmethod ").next().unwrap();
    assert!(!section.contains("Sub"), "x - x must fold, got: {section}");
    assert!(!section.contains("Div"), "x / x must fold, got: {section}");
    assert!(section.contains("Const 1"), "got: {section}");
}

#[test]
fn division_by_constant_zero_folds_to_zero() {
    let dump = optimize(
        "class Main { public int f(int x) { return x / 0; } \
         public static void main(String[] args) { \
         System.out.println(new Main().f(5)); } }",
    );
    let section = dump.split("method Mj_Main_c4_f_m1:").nth(1).unwrap();
    let section = section.split("\nmethod ").next().unwrap();
    assert!(!section.contains("Div"), "got: {section}");
    assert!(section.contains("Const 0"), "got: {section}");
}

#[test]
fn constant_conditions_remove_dead_branches() {
    let dump = optimize(
        "class Main { public static void main(String[] args) { \
         boolean t = true; if (t) { System.out.println(1); } else { \
         System.out.println(2); } } }",
    );
    assert!(dump.contains("Const 1"), "got: {dump}");
    assert!(!dump.contains("Const 2"), "dead branch must vanish, got: {dump}");
}

#[test]
fn load_after_store_reuses_the_value() {
    let dump = optimize(
        "class Box { public int x; public int f() { this.x = 5; return this.x; } } \
         class Main { public static void main(String[] args) { \
         System.out.println(new Box().f()); } }",
    );
    let section = dump.split("method Mj_Box_c3_f_m1:").nth(1).unwrap();
    let section = section.split("\nmethod ").next().unwrap();
    assert!(!section.contains("Load"), "load must be combined away, got: {section}");
}

#[test]
fn tail_recursion_becomes_a_loop() {
    let dump = optimize(
        "class Main { public int count(int n) { if (n < 1) return 0; \
         return this.count(n - 1); } \
         public static void main(String[] args) { \
         System.out.println(new Main().count(9)); } }",
    );
    let section = dump.split("method Mj_Main_c4_count_m5:").nth(1).unwrap();
    let section = section.split("\nmethod ").next().unwrap();
    assert!(
        !section.contains("Call Mj_Main_c4_count_m5"),
        "self call must become a back edge, got: {section}"
    );
    assert!(section.contains("Phi"), "parameters must loop through phis, got: {section}");
}

#[test]
fn uncalled_methods_are_deleted() {
    let dump = optimize(
        "class Main { public int dead() { return 1; } \
         public static void main(String[] args) { System.out.println(0); } }",
    );
    assert!(!dump.contains("dead"), "got: {dump}");
    assert!(dump.contains("minijava_main"), "got: {dump}");
}

#[test]
fn unused_parameters_are_dropped_at_definition_and_call_sites() {
    let dump = optimize(
        "class Main { public int pick(int used, int ignored) { return used; } \
         public static void main(String[] args) { \
         System.out.println(new Main().pick(7, 8)); } }",
    );
    // the shrunk entity keeps the receiver and the used parameter only
    assert!(dump.contains("Mj_Main_c4_pick_m4_p"), "got: {dump}");
    assert!(!dump.contains("Call Mj_Main_c4_pick_m4 "), "got: {dump}");
}

#[test]
fn unobserved_allocations_disappear() {
    let dump = optimize(
        "class Obj { public int x; } \
         class Main { public static void main(String[] args) { \
         Obj o = new Obj(); o.x = 5; System.out.println(1); } }",
    );
    let section = dump.split("method minijava_main:").nth(1).unwrap();
    assert!(
        !section.contains("mj_runtime_allocate"),
        "allocation must be eliminated, got: {section}"
    );
    assert!(!section.contains("Store"), "got: {section}");
}

#[test]
fn small_counting_loops_unroll_and_fold() {
    let dump = optimize(
        "class Main { public static void main(String[] args) { \
         int s = 0; int i = 0; while (i < 3) { s = s + 2; i = i + 1; } \
         System.out.println(s); } }",
    );
    assert!(dump.contains("Const 6"), "3 iterations of s + 2, got: {dump}");
    assert!(!dump.contains("Phi loop"), "the loop must be gone, got: {dump}");
}

#[test]
fn optimizer_reaches_a_fixpoint() {
    let src = "class Fibonacci { public int fib(int n) { if (n < 2) return n; \
               return this.fib(n - 1) + this.fib(n - 2); } } \
               class Main { public static void main(String[] args) { \
               System.out.println(new Fibonacci().fib(9)); } }";
    let mut pool = SymbolPool::new();
    let mut factory = AstFactory::default();
    let ast = {
        let lexer = Lexer::new(src.as_bytes(), &mut pool);
        parse_program(lexer, &mut factory).unwrap()
    };
    let seminfo = mjc_semantic::check_program(&ast, &pool, &mut factory).unwrap();
    let state = acquire_state();
    let (mut program, _types) = build_ir(&state, &ast, &seminfo, &pool);
    let mut optimizer = Optimizer::with_all_passes();
    optimizer.run(&mut program);
    let first = mjc_ir::dump_program(&program);
    optimizer.run(&mut program);
    let second = mjc_ir::dump_program(&program);
    assert_eq!(first, second, "a second run must change nothing");
}
