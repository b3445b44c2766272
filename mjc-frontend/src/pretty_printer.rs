//! The AST pretty-printer.
//!
//! Produces canonical source text: tab indentation, braces on the line of
//! their construct, empty bodies collapsed to `{ }`, class members sorted
//! (methods first, then fields, each by name) and expressions fully
//! parenthesized except at statement roots, inside `[...]`, inside argument
//! lists and for a standalone `-` before an integer literal. Classes are
//! printed in source order. The output is idempotent under
//! parse-then-print.

use std::fmt::Write;

use mjc_symbol::SymbolPool;

use crate::ast::*;

/// Renders `program` as canonical MiniJava source text.
pub fn pretty_print(program: &Program, pool: &SymbolPool) -> String {
    let mut printer = PrettyPrinter::new(pool);
    printer.print_program(program);
    printer.output
}

struct PrettyPrinter<'pool> {
    pool: &'pool SymbolPool,
    output: String,
    indentation_level: usize,
    print_expression_parens: bool,
    in_parameters: bool,
    start_if: bool,
    start_else: bool,
    start_loop: bool,
    start_method: bool,
}

impl<'pool> PrettyPrinter<'pool> {
    fn new(pool: &'pool SymbolPool) -> Self {
        Self {
            pool,
            output: String::new(),
            indentation_level: 0,
            print_expression_parens: true,
            in_parameters: false,
            start_if: false,
            start_else: false,
            start_loop: false,
            start_method: false,
        }
    }

    fn print(&mut self, line: &str) {
        for _ in 0..self.indentation_level {
            self.output.push('\t');
        }
        self.output.push_str(line);
    }

    fn println(&mut self, line: &str) {
        self.print(line);
        self.output.push('\n');
    }

    fn name(&self, sym: mjc_symbol::Symbol) -> &'pool str {
        self.pool.resolve(sym)
    }

    fn type_name(&self, name: BasicTypeName) -> &'pool str {
        match name {
            BasicTypeName::Int => "int",
            BasicTypeName::Boolean => "boolean",
            BasicTypeName::Void => "void",
            BasicTypeName::Class(sym) => self.name(sym),
        }
    }

    fn print_program(&mut self, node: &Program) {
        // classes keep their source order; members get sorted below
        let mut first = true;
        for class in &node.classes {
            if !first {
                self.output.push('\n');
            }
            first = false;
            self.print_class(class);
        }
    }

    fn print_class(&mut self, node: &ClassDeclaration) {
        let class_name = self.name(node.name);
        if node.fields.is_empty()
            && node.instance_methods.is_empty()
            && node.main_methods.is_empty()
        {
            self.println(&format!("class {class_name} {{ }}"));
            return;
        }
        self.println(&format!("class {class_name} {{"));
        self.indentation_level += 1;

        enum Member<'a> {
            Instance(&'a InstanceMethod),
            Main(&'a MainMethod),
        }
        let mut methods: Vec<(&str, Member<'_>)> = node
            .instance_methods
            .iter()
            .map(|m| (self.name(m.name), Member::Instance(m)))
            .chain(node.main_methods.iter().map(|m| (self.name(m.name), Member::Main(m))))
            .collect();
        methods.sort_by_key(|(name, _)| *name);
        for (_, member) in methods {
            match member {
                Member::Instance(m) => self.print_instance_method(m),
                Member::Main(m) => self.print_main_method(m),
            }
        }

        let mut fields: Vec<&VarDecl> = node.fields.iter().collect();
        fields.sort_by_key(|f| self.name(f.name));
        for field in fields {
            let rendered = self.render_var_decl(field);
            self.println(&format!("public {rendered};"));
        }

        self.indentation_level -= 1;
        self.println("}");
    }

    fn render_type(&self, node: &Type) -> String {
        let mut rendered = self.type_name(node.name).to_owned();
        for _ in 0..node.rank {
            rendered.push_str("[]");
        }
        rendered
    }

    fn render_var_decl(&self, node: &VarDecl) -> String {
        format!("{} {}", self.render_type(&node.var_type), self.name(node.name))
    }

    fn print_main_method(&mut self, node: &MainMethod) {
        let rendered_argv = self.render_var_decl(&node.argv);
        let name = self.name(node.name);
        self.print(&format!("public static void {name}({rendered_argv})"));
        self.start_method = true;
        self.print_block(&node.body);
    }

    fn print_instance_method(&mut self, node: &InstanceMethod) {
        let return_type = self.render_type(&node.return_type);
        let name = self.name(node.name);
        self.print(&format!("public {return_type} {name}("));
        self.in_parameters = true;
        let mut first = true;
        for param in &node.parameters {
            if !first {
                self.output.push_str(", ");
            }
            first = false;
            let rendered = self.render_var_decl(param);
            self.output.push_str(&rendered);
        }
        self.in_parameters = false;
        self.output.push(')');
        self.start_method = true;
        self.print_block(&node.body);
    }

    /// Common prefix handling for statements that follow a single-line
    /// `if`/`else`/`while` head.
    fn start_block_statement(&mut self) {
        if self.start_if || self.start_else || self.start_loop {
            self.output.push('\n');
            self.start_if = false;
            self.start_else = false;
            self.start_loop = false;
        }
    }

    fn print_block(&mut self, node: &Block) {
        let is_conditional = self.start_if || self.start_else;
        let is_empty = node.is_effectively_empty();

        if is_conditional || self.start_loop || self.start_method {
            self.output.push_str(" {");
            self.start_if = false;
            self.start_else = false;
            self.start_loop = false;
            self.start_method = false;
        } else {
            self.print("{");
        }
        if is_empty {
            self.output.push_str(" }\n");
            return;
        }
        self.output.push('\n');
        self.indentation_level += 1;
        for statement in &node.statements {
            self.print_statement(statement);
        }
        self.indentation_level -= 1;
        self.print("}");
        if !is_conditional {
            self.output.push('\n');
        }
    }

    fn print_statement(&mut self, node: &Statement) {
        match &node.kind {
            StmtKind::Block(block) => self.print_block(block),
            StmtKind::Empty => {
                let print = self.start_if || self.start_else || self.start_loop;
                self.start_block_statement();
                if print {
                    self.println(";");
                }
            }
            StmtKind::Expression(expr) => {
                self.start_block_statement();
                self.print("");
                self.print_expression_parens = false;
                self.print_expression(expr);
                self.output.push_str(";\n");
            }
            StmtKind::LocalVariable { decl, initial_value } => {
                self.start_block_statement();
                let rendered = self.render_var_decl(decl);
                self.print(&rendered);
                if let Some(init) = initial_value {
                    self.output.push_str(" = ");
                    self.print_expression_parens = false;
                    self.print_expression(init);
                }
                self.output.push_str(";\n");
            }
            StmtKind::If { condition, then_statement, else_statement } => {
                self.print_if(condition, then_statement, else_statement.as_deref());
            }
            StmtKind::While { condition, body } => {
                self.start_block_statement();
                self.print("while (");
                self.print_expression_parens = false;
                self.print_expression(condition);
                self.output.push(')');
                let body_is_block = is_nonempty_block(body);
                if !body_is_block {
                    self.indentation_level += 1;
                }
                self.start_loop = true;
                self.print_statement(body);
                if !body_is_block {
                    self.indentation_level -= 1;
                }
            }
            StmtKind::Return(value) => {
                self.start_block_statement();
                match value {
                    None => self.print("return;"),
                    Some(value) => {
                        self.print("return ");
                        self.print_expression_parens = false;
                        self.print_expression(value);
                        self.output.push(';');
                    }
                }
                self.output.push('\n');
            }
        }
    }

    fn print_if(
        &mut self,
        condition: &Expression,
        then_statement: &Statement,
        else_statement: Option<&Statement>,
    ) {
        let then_is_block = is_nonempty_block(then_statement);
        let else_is_block = else_statement.is_some_and(is_nonempty_block);
        let else_is_chain =
            matches!(else_statement, Some(stmt) if matches!(stmt.kind, StmtKind::If { .. }));

        if self.start_else {
            self.output.push_str(" if (");
        } else {
            if self.start_if || self.start_loop {
                self.output.push('\n');
            }
            self.print("if (");
        }
        self.start_if = false;
        self.start_else = false;
        self.start_loop = false;
        self.print_expression_parens = false;
        self.print_expression(condition);
        self.output.push(')');

        if !then_is_block {
            self.indentation_level += 1;
        }
        self.start_if = true;
        self.print_statement(then_statement);
        if !then_is_block {
            self.indentation_level -= 1;
        }

        if let Some(else_statement) = else_statement {
            if then_is_block {
                self.output.push_str(" else");
            } else {
                self.print("else");
            }
            if !else_is_block && !else_is_chain {
                self.indentation_level += 1;
            }
            self.start_else = true;
            self.print_statement(else_statement);
            if !else_is_block && !else_is_chain {
                self.indentation_level -= 1;
            } else if else_is_block {
                self.output.push('\n');
            }
        } else if then_is_block {
            self.output.push('\n');
        }
    }

    fn print_expression(&mut self, node: &Expression) {
        let parens = self.print_expression_parens;
        match &node.kind {
            ExprKind::Binary { op, lhs, rhs } => {
                if parens {
                    self.output.push('(');
                }
                self.print_expression_parens = true;
                self.print_expression(lhs);
                let _ = write!(self.output, " {} ", op.spelling());
                self.print_expression_parens = true;
                self.print_expression(rhs);
                if parens {
                    self.output.push(')');
                }
            }
            ExprKind::Unary { op, target } => {
                if parens {
                    self.output.push('(');
                }
                self.output.push_str(op.spelling());
                self.print_expression_parens = true;
                self.print_expression(target);
                if parens {
                    self.output.push(')');
                }
            }
            ExprKind::ObjectInstantiation { class_name } => {
                if parens {
                    self.output.push('(');
                }
                let _ = write!(self.output, "new {}()", self.name(*class_name));
                if parens {
                    self.output.push(')');
                }
            }
            ExprKind::ArrayInstantiation { array_type, extent } => {
                if parens {
                    self.output.push('(');
                }
                let _ = write!(self.output, "new {}", self.type_name(array_type.name));
                self.output.push('[');
                self.print_expression_parens = false;
                self.print_expression(extent);
                self.output.push(']');
                for _ in 1..array_type.rank {
                    self.output.push_str("[]");
                }
                if parens {
                    self.output.push(')');
                }
            }
            ExprKind::ArrayAccess { target, index } => {
                if parens {
                    self.output.push('(');
                }
                self.print_expression_parens = true;
                self.print_expression(target);
                self.output.push('[');
                self.print_expression_parens = false;
                self.print_expression(index);
                self.output.push(']');
                if parens {
                    self.output.push(')');
                }
            }
            ExprKind::VariableAccess { target, name } => {
                let need_parens = parens && target.is_some();
                if need_parens {
                    self.output.push('(');
                }
                if let Some(target) = target {
                    self.print_expression_parens = true;
                    self.print_expression(target);
                    self.output.push('.');
                }
                self.output.push_str(self.name(*name));
                if need_parens {
                    self.output.push(')');
                }
            }
            ExprKind::MethodInvocation { target, name, arguments } => {
                if parens {
                    self.output.push('(');
                }
                if let Some(target) = target {
                    self.print_expression_parens = true;
                    self.print_expression(target);
                    self.output.push('.');
                }
                let _ = write!(self.output, "{}(", self.name(*name));
                let mut first = true;
                for argument in arguments {
                    if !first {
                        self.output.push_str(", ");
                    }
                    first = false;
                    self.print_expression_parens = false;
                    self.print_expression(argument);
                }
                self.output.push(')');
                if parens {
                    self.output.push(')');
                }
            }
            ExprKind::ThisRef => self.output.push_str("this"),
            ExprKind::NullConstant => self.output.push_str("null"),
            ExprKind::BooleanConstant { value } => {
                self.output.push_str(if *value { "true" } else { "false" })
            }
            ExprKind::IntegerConstant { literal, negative } => {
                let literal = self.name(*literal);
                if *negative {
                    if parens {
                        let _ = write!(self.output, "(-{literal})");
                    } else {
                        let _ = write!(self.output, "-{literal}");
                    }
                } else {
                    self.output.push_str(literal);
                }
            }
        }
        self.print_expression_parens = parens;
    }
}

fn is_nonempty_block(stmt: &Statement) -> bool {
    matches!(&stmt.kind, StmtKind::Block(block) if !block.is_effectively_empty())
}

#[cfg(test)]
mod tests {
    use mjc_symbol::SymbolPool;
    use pretty_assertions::assert_eq;

    use crate::ast_factory::AstFactory;
    use crate::lexer::Lexer;
    use crate::parser::parse_program;

    use super::*;

    fn print(src: &str) -> String {
        let mut pool = SymbolPool::new();
        let mut factory = AstFactory::default();
        let lexer = Lexer::new(src.as_bytes(), &mut pool);
        let program = parse_program(lexer, &mut factory).unwrap();
        pretty_print(&program, &pool)
    }

    fn assert_idempotent(src: &str) -> String {
        let once = print(src);
        let twice = print(&once);
        assert_eq!(once, twice, "pretty-printing must be idempotent");
        once
    }

    #[test]
    fn single_method_with_expression() {
        let out = print("class C{public int f(){return 1+2*3;}}");
        assert_eq!(out, "class C {\n\tpublic int f() {\n\t\treturn 1 + (2 * 3);\n\t}\n}\n");
        assert_idempotent("class C{public int f(){return 1+2*3;}}");
    }

    #[test]
    fn empty_class_and_empty_body() {
        assert_eq!(print("class A { }"), "class A { }\n");
        assert_eq!(
            print("class A { public void f() { } }"),
            "class A {\n\tpublic void f() { }\n}\n"
        );
        // a body of only empty statements collapses too
        assert_eq!(
            print("class A { public void f() { ;; } }"),
            "class A {\n\tpublic void f() { }\n}\n"
        );
    }

    #[test]
    fn members_are_sorted_methods_before_fields() {
        let out = assert_idempotent(
            "class A { public int z; public int a; public void m() { } \
             public static void main(String[] args) { } public void b() { } }",
        );
        let expected = "class A {\n\
                        \tpublic void b() { }\n\
                        \tpublic void m() { }\n\
                        \tpublic static void main(String[] args) { }\n\
                        \tpublic int a;\n\
                        \tpublic int z;\n\
                        }\n";
        assert_eq!(out, expected);
    }

    #[test]
    fn classes_keep_source_order() {
        let out = assert_idempotent("class B { } class A { }");
        assert_eq!(out, "class B { }\n\nclass A { }\n");
    }

    #[test]
    fn single_statement_bodies_are_indented() {
        let out = assert_idempotent(
            "class A { public void f(int x) { while (x > 0) x = x - 1; } }",
        );
        let expected = "class A {\n\
                        \tpublic void f(int x) {\n\
                        \t\twhile (x > 0)\n\
                        \t\t\tx = x - 1;\n\
                        \t}\n\
                        }\n";
        assert_eq!(out, expected);
    }

    #[test]
    fn else_if_chains_stay_flat() {
        let out = assert_idempotent(
            "class A { public int f(int x) { if (x == 0) { return 0; } else if (x == 1) { \
             return 1; } else { return 2; } } }",
        );
        let expected = "class A {\n\
                        \tpublic int f(int x) {\n\
                        \t\tif (x == 0) {\n\
                        \t\t\treturn 0;\n\
                        \t\t} else if (x == 1) {\n\
                        \t\t\treturn 1;\n\
                        \t\t} else {\n\
                        \t\t\treturn 2;\n\
                        \t\t}\n\
                        \t}\n\
                        }\n";
        assert_eq!(out, expected);
    }

    #[test]
    fn expressions_fully_parenthesized_except_at_roots() {
        let out = assert_idempotent(
            "class A { public void f(int[] a, int i) { a[i + 1] = f2(i * 2, -i); } \
             public int f2(int x, int y) { return x; } }",
        );
        assert!(out.contains("(a[i + 1]) = f2(i * 2, -i);"), "got: {out}");
    }

    #[test]
    fn negative_literals() {
        let out = print("class A { public int f() { return -2147483648; } }");
        assert!(out.contains("return -2147483648;"));
        let out = print("class A { public int f(int x) { return x * -1; } }");
        assert!(out.contains("return x * (-1);"));
    }

    #[test]
    fn array_instantiation_rank_suffixes() {
        let out = assert_idempotent(
            "class A { public void f() { int[][] a = new int[3][]; } }",
        );
        assert!(out.contains("int[][] a = new int[3][];"));
    }

    #[test]
    fn idempotence_on_a_larger_program() {
        assert_idempotent(
            "class Fibonacci { public int fib(int n) { if (n < 2) return n; \
             return this.fib(n - 1) + this.fib(n - 2); } } \
             class Main { public static void main(String[] args) { \
             Fibonacci f = new Fibonacci(); System.out.println(f.fib(9)); } }",
        );
    }
}
