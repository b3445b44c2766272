//! Integration tests for the semantic analyzer.

use mjc_frontend::{parse_program, AstFactory, ExprKind, Lexer, Program, StmtKind};
use mjc_semantic::{check_program, SemanticError, SemanticInfo};
use mjc_symbol::SymbolPool;

fn analyze(src: &str) -> Result<(Program, SemanticInfo, SymbolPool), SemanticError> {
    let mut pool = SymbolPool::new();
    let mut factory = AstFactory::default();
    let ast = {
        let lexer = Lexer::new(src.as_bytes(), &mut pool);
        parse_program(lexer, &mut factory).expect("test source must parse")
    };
    let info = check_program(&ast, &pool, &mut factory)?;
    Ok((ast, info, pool))
}

fn assert_rejected(src: &str, message_part: &str) {
    match analyze(src) {
        Ok(_) => panic!("expected semantic error containing {message_part:?}"),
        Err(err) => assert!(
            err.message.contains(message_part),
            "expected error containing {message_part:?}, got {:?}",
            err.message
        ),
    }
}

const MAIN: &str = "class Main { public static void main(String[] args) { } }";

#[test]
fn hello_world_checks() {
    let (_, info, _) = analyze(
        "class MiniJava { public static void main(String[] args) { \
         System.out.println(42); } }",
    )
    .unwrap();
    assert!(!info.method_annotations().is_empty());
}

#[test]
fn duplicate_class_names_are_rejected() {
    assert_rejected("class A { } class A { }", "Duplicate class name 'A'");
    assert_rejected(&format!("class String {{ }} {MAIN}"), "Duplicate class name 'String'");
}

#[test]
fn duplicate_members_are_rejected() {
    assert_rejected(
        &format!("class A {{ public int x; public boolean x; }} {MAIN}"),
        "Field 'x' has already been defined",
    );
    assert_rejected(
        &format!("class A {{ public int f() {{ return 0; }} public void f() {{ }} }} {MAIN}"),
        "Method 'f' has already been defined",
    );
}

#[test]
fn exactly_one_main() {
    assert_rejected("class A { }", "No main method found");
    assert_rejected(
        "class A { public static void main(String[] args) { } } \
         class B { public static void main(String[] args) { } }",
        "Only one main method",
    );
    assert_rejected(
        "class A { public static void main(int[] args) { } }",
        "must have type 'String[]'",
    );
}

#[test]
fn this_is_forbidden_in_main() {
    assert_rejected(
        "class A { public int x; public static void main(String[] args) { int y = this.x; } }",
        "'this' is not allowed",
    );
}

#[test]
fn unqualified_calls_are_forbidden_in_main() {
    assert_rejected(
        "class A { public void f() { } public static void main(String[] args) { f(); } }",
        "without an object",
    );
}

#[test]
fn fields_are_not_visible_in_main() {
    assert_rejected(
        "class A { public int x; public static void main(String[] args) { x = 1; } }",
        "No variable 'x'",
    );
}

#[test]
fn undefined_names_are_rejected() {
    assert_rejected(
        "class A { public static void main(String[] args) { y = 1; } }",
        "No variable 'y'",
    );
    assert_rejected(
        &format!("class A {{ public Unknown u; }} {MAIN}"),
        "Cannot resolve type name 'Unknown'",
    );
}

#[test]
fn shadowing_rules() {
    // shadowing a field by a local is fine
    analyze(
        &format!(
            "class A {{ public int x; public void f() {{ int x = 0; x = x + 1; }} }} {MAIN}"
        ),
    )
    .unwrap();
    // redeclaring in a nested block is not
    assert_rejected(
        &format!(
            "class A {{ public void f() {{ int x = 0; {{ int x = 1; }} }} }} {MAIN}"
        ),
        "already been defined",
    );
    // parameters cannot be redeclared either
    assert_rejected(
        &format!("class A {{ public void f(int x) {{ int x = 0; }} }} {MAIN}"),
        "already been defined",
    );
}

#[test]
fn system_is_shadowable() {
    // a local named System hides the global; println is gone then
    assert_rejected(
        "class A { public static void main(String[] args) { \
         int System = 1; System.out.println(2); } }",
        "has no fields",
    );
}

#[test]
fn type_rules() {
    assert_rejected(
        &format!("class A {{ public void f() {{ int x = true; }} }} {MAIN}"),
        "Expected type 'int'",
    );
    assert_rejected(
        &format!("class A {{ public void f() {{ boolean b = 1 && true; }} }} {MAIN}"),
        "Expected type 'boolean'",
    );
    assert_rejected(
        &format!("class A {{ public void f(int[] a) {{ int x = a[true]; }} }} {MAIN}"),
        "Expected type 'int'",
    );
    assert_rejected(
        &format!("class A {{ public void f(int x) {{ int y = x[0]; }} }} {MAIN}"),
        "Expected an array expression",
    );
    assert_rejected(
        &format!("class A {{ public void f() {{ int x = new void[3][0]; }} }} {MAIN}"),
        "void",
    );
    assert_rejected(
        &format!("class A {{ public void f() {{ void v; }} }} {MAIN}"),
        "void",
    );
}

#[test]
fn reference_comparisons() {
    analyze(
        &format!(
            "class A {{ public boolean f(A other, int[] a) {{ \
             return this == other && a != null && null == null; }} }} {MAIN}"
        ),
    )
    .unwrap();
    assert_rejected(
        &format!("class A {{ public boolean f(int[] a) {{ return a == 1; }} }} {MAIN}"),
        "Cannot compare",
    );
    assert_rejected(
        &format!(
            "class B {{ }} class A {{ public boolean f(B b) {{ return this == b; }} }} {MAIN}"
        ),
        "Cannot compare",
    );
}

#[test]
fn assignment_requires_lvalue() {
    assert_rejected(
        &format!("class A {{ public void f(int x) {{ 1 = x; }} }} {MAIN}"),
        "not assignable",
    );
    assert_rejected(
        &format!("class A {{ public int g() {{ return 1; }} \
                  public void f() {{ g() = 2; }} }} {MAIN}"),
        "not assignable",
    );
    analyze(
        &format!(
            "class A {{ public int x; public void f(int[] a, A other) {{ \
             x = 1; a[0] = 2; other.x = 3; this.x = 4; }} }} {MAIN}"
        ),
    )
    .unwrap();
}

#[test]
fn instantiation_rules() {
    assert_rejected(
        "class A { public static void main(String[] args) { String s = new String(); } }",
        "Cannot instantiate builtin type 'String'",
    );
    analyze(
        "class A { public static void main(String[] args) { A a = new A(); } }",
    )
    .unwrap();
}

#[test]
fn return_path_analysis() {
    assert_rejected(
        &format!("class A {{ public int f(boolean c) {{ if (c) return 1; }} }} {MAIN}"),
        "must return a value on every path",
    );
    analyze(
        &format!(
            "class A {{ public int f(boolean c) {{ if (c) return 1; else return 2; }} }} {MAIN}"
        ),
    )
    .unwrap();
    analyze(
        &format!(
            "class A {{ public int f(boolean c) {{ while (c) {{ }} return 1; }} }} {MAIN}"
        ),
    )
    .unwrap();
    assert_rejected(
        &format!("class A {{ public int f(boolean c) {{ while (c) return 1; }} }} {MAIN}"),
        "must return a value on every path",
    );
    assert_rejected(
        &format!("class A {{ public void f() {{ return 1; }} }} {MAIN}"),
        "return type 'void'",
    );
    assert_rejected(
        "class A { public static void main(String[] args) { return 1; } }",
        "return type 'void'",
    );
}

#[test]
fn method_call_checking() {
    assert_rejected(
        &format!("class A {{ public void f(int x) {{ this.f(); }} }} {MAIN}"),
        "expects 1 arguments but 0 were given",
    );
    assert_rejected(
        &format!("class A {{ public void f(int x) {{ this.f(true); }} }} {MAIN}"),
        "Expected type 'int'",
    );
    assert_rejected(
        &format!("class A {{ public void f() {{ this.g(); }} }} {MAIN}"),
        "has no method 'g'",
    );
    // unqualified call resolves against the enclosing class
    analyze(
        &format!("class A {{ public int g() {{ return 0; }} \
                  public int f() {{ return g(); }} }} {MAIN}"),
    )
    .unwrap();
}

#[test]
fn integer_literal_ranges() {
    analyze(
        &format!("class A {{ public int f() {{ return -2147483648; }} }} {MAIN}"),
    )
    .unwrap();
    assert_rejected(
        &format!("class A {{ public int f() {{ return 2147483648; }} }} {MAIN}"),
        "out of range",
    );
    assert_rejected(
        &format!("class A {{ public int f() {{ return -(2147483648); }} }} {MAIN}"),
        "out of range",
    );
}

#[test]
fn constant_annotations() {
    let (ast, info, _) = analyze(
        &format!("class A {{ public int f() {{ return 1 + 2 * 3; }} }} {MAIN}"),
    )
    .unwrap();
    // the `1 + 2 * 3` node must be annotated with 7
    let method = &ast.classes[0].instance_methods[0];
    let StmtKind::Return(Some(expr)) = &method.body.statements[0].kind else {
        panic!("expected return statement");
    };
    assert_eq!(info.const_of(expr.info.id), Some(7));
}

#[test]
fn division_by_constant_zero_is_accepted_but_not_annotated() {
    let (ast, info, _) = analyze(
        &format!("class A {{ public int f() {{ return 1 / 0; }} }} {MAIN}"),
    )
    .unwrap();
    let method = &ast.classes[0].instance_methods[0];
    let StmtKind::Return(Some(expr)) = &method.body.statements[0].kind else { panic!() };
    assert_eq!(info.const_of(expr.info.id), None);
}

#[test]
fn comparison_constants_fold_to_zero_or_one() {
    let (ast, info, _) = analyze(
        &format!("class A {{ public boolean f() {{ return 3 < 4; }} }} {MAIN}"),
    )
    .unwrap();
    let method = &ast.classes[0].instance_methods[0];
    let StmtKind::Return(Some(expr)) = &method.body.statements[0].kind else { panic!() };
    assert_eq!(info.const_of(expr.info.id), Some(1));
}

#[test]
fn locals_annotations_cover_params_and_locals() {
    let (ast, info, _) = analyze(
        &format!(
            "class A {{ public int f(int a, int b) {{ int c = a; {{ int d = b; }} \
             return c; }} }} {MAIN}"
        ),
    )
    .unwrap();
    let method = &ast.classes[0].instance_methods[0];
    let locals = &info.locals_annotations()[&method.info.id];
    assert_eq!(locals.len(), 4, "a, b, c and d");
}

#[test]
fn println_resolves_to_the_builtin() {
    let (ast, info, _) = analyze(
        "class A { public static void main(String[] args) { System.out.println(7); } }",
    )
    .unwrap();
    let main = &ast.classes[0].main_methods[0];
    let StmtKind::Expression(call) = &main.body.statements[0].kind else { panic!() };
    assert!(matches!(call.kind, ExprKind::MethodInvocation { .. }));
    let callee = info.method_annotations()[&call.info.id];
    let builtin_println = &info.builtin_ast().classes[1].instance_methods[0];
    assert_eq!(callee, builtin_println.info.id);
}

#[test]
fn analysis_is_deterministic() {
    let src = "class A { public int x; public int f(int y) { return x + y; } } \
               class Main { public static void main(String[] args) { \
               System.out.println(new A().f(1)); } }";
    let (_, first, _) = analyze(src).unwrap();
    let (_, second, _) = analyze(src).unwrap();
    assert_eq!(first.type_annotations().len(), second.type_annotations().len());
    assert_eq!(first.const_annotations(), second.const_annotations());
    assert_eq!(first.vardecl_annotations(), second.vardecl_annotations());
}
