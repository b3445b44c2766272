//! A read-only visitor over the AST.
//!
//! Override the `visit_*` hooks you care about and call the matching
//! `walk_*` function to descend. The default hooks walk the whole tree.

use crate::ast::*;

pub trait Visitor {
    fn visit_program(&mut self, node: &Program) {
        walk_program(self, node);
    }

    fn visit_class(&mut self, node: &ClassDeclaration) {
        walk_class(self, node);
    }

    fn visit_main_method(&mut self, node: &MainMethod) {
        walk_main_method(self, node);
    }

    fn visit_instance_method(&mut self, node: &InstanceMethod) {
        walk_instance_method(self, node);
    }

    fn visit_var_decl(&mut self, node: &VarDecl) {
        walk_var_decl(self, node);
    }

    fn visit_type(&mut self, _node: &Type) {}

    fn visit_block(&mut self, node: &Block) {
        walk_block(self, node);
    }

    fn visit_statement(&mut self, node: &Statement) {
        walk_statement(self, node);
    }

    fn visit_expression(&mut self, node: &Expression) {
        walk_expression(self, node);
    }
}

pub fn walk_program<V: Visitor + ?Sized>(v: &mut V, node: &Program) {
    for class in &node.classes {
        v.visit_class(class);
    }
}

pub fn walk_class<V: Visitor + ?Sized>(v: &mut V, node: &ClassDeclaration) {
    for field in &node.fields {
        v.visit_var_decl(field);
    }
    for method in &node.instance_methods {
        v.visit_instance_method(method);
    }
    for main in &node.main_methods {
        v.visit_main_method(main);
    }
}

pub fn walk_main_method<V: Visitor + ?Sized>(v: &mut V, node: &MainMethod) {
    v.visit_var_decl(&node.argv);
    v.visit_block(&node.body);
}

pub fn walk_instance_method<V: Visitor + ?Sized>(v: &mut V, node: &InstanceMethod) {
    v.visit_type(&node.return_type);
    for param in &node.parameters {
        v.visit_var_decl(param);
    }
    v.visit_block(&node.body);
}

pub fn walk_var_decl<V: Visitor + ?Sized>(v: &mut V, node: &VarDecl) {
    v.visit_type(&node.var_type);
}

pub fn walk_block<V: Visitor + ?Sized>(v: &mut V, node: &Block) {
    for statement in &node.statements {
        v.visit_statement(statement);
    }
}

pub fn walk_statement<V: Visitor + ?Sized>(v: &mut V, node: &Statement) {
    match &node.kind {
        StmtKind::Empty => {}
        StmtKind::Expression(expr) => v.visit_expression(expr),
        StmtKind::LocalVariable { decl, initial_value } => {
            v.visit_var_decl(decl);
            if let Some(init) = initial_value {
                v.visit_expression(init);
            }
        }
        StmtKind::Block(block) => v.visit_block(block),
        StmtKind::If { condition, then_statement, else_statement } => {
            v.visit_expression(condition);
            v.visit_statement(then_statement);
            if let Some(else_statement) = else_statement {
                v.visit_statement(else_statement);
            }
        }
        StmtKind::While { condition, body } => {
            v.visit_expression(condition);
            v.visit_statement(body);
        }
        StmtKind::Return(value) => {
            if let Some(value) = value {
                v.visit_expression(value);
            }
        }
    }
}

pub fn walk_expression<V: Visitor + ?Sized>(v: &mut V, node: &Expression) {
    match &node.kind {
        ExprKind::IntegerConstant { .. }
        | ExprKind::BooleanConstant { .. }
        | ExprKind::NullConstant
        | ExprKind::ThisRef => {}
        ExprKind::VariableAccess { target, .. } => {
            if let Some(target) = target {
                v.visit_expression(target);
            }
        }
        ExprKind::ArrayAccess { target, index } => {
            v.visit_expression(target);
            v.visit_expression(index);
        }
        ExprKind::MethodInvocation { target, arguments, .. } => {
            if let Some(target) = target {
                v.visit_expression(target);
            }
            for argument in arguments {
                v.visit_expression(argument);
            }
        }
        ExprKind::ObjectInstantiation { .. } => {}
        ExprKind::ArrayInstantiation { array_type, extent } => {
            v.visit_type(array_type);
            v.visit_expression(extent);
        }
        ExprKind::Binary { lhs, rhs, .. } => {
            v.visit_expression(lhs);
            v.visit_expression(rhs);
        }
        ExprKind::Unary { target, .. } => v.visit_expression(target),
    }
}
