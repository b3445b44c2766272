//! Structural AST equality.
//!
//! Two trees are equal when they pretty-print identically: node IDs and
//! source positions are ignored, class members are compared in their
//! canonical (printed) order, empty statements inside blocks are invisible,
//! and a unary minus directly wrapping a non-negative integer literal is
//! the same as the negative-tagged literal. Both trees must draw their
//! symbols from the same pool.

use mjc_symbol::SymbolPool;

use crate::ast::*;

pub fn program_eq(a: &Program, b: &Program, pool: &SymbolPool) -> bool {
    a.classes.len() == b.classes.len()
        && a.classes.iter().zip(&b.classes).all(|(ca, cb)| class_eq(ca, cb, pool))
}

fn class_eq(a: &ClassDeclaration, b: &ClassDeclaration, pool: &SymbolPool) -> bool {
    if a.name != b.name {
        return false;
    }

    let methods_a = sorted_methods(a, pool);
    let methods_b = sorted_methods(b, pool);
    if methods_a.len() != methods_b.len() {
        return false;
    }
    let methods_equal = methods_a.iter().zip(&methods_b).all(|(ma, mb)| match (ma, mb) {
        (Method::Instance(x), Method::Instance(y)) => instance_method_eq(x, y),
        (Method::Main(x), Method::Main(y)) => main_method_eq(x, y),
        _ => false,
    });
    if !methods_equal {
        return false;
    }

    let fields_a = sorted_fields(a, pool);
    let fields_b = sorted_fields(b, pool);
    fields_a.len() == fields_b.len()
        && fields_a.iter().zip(&fields_b).all(|(fa, fb)| var_decl_eq(fa, fb))
}

enum Method<'a> {
    Instance(&'a InstanceMethod),
    Main(&'a MainMethod),
}

fn sorted_methods<'a>(class: &'a ClassDeclaration, pool: &SymbolPool) -> Vec<Method<'a>> {
    let mut methods: Vec<(&str, Method<'a>)> = class
        .instance_methods
        .iter()
        .map(|m| (pool.resolve(m.name), Method::Instance(m)))
        .chain(class.main_methods.iter().map(|m| (pool.resolve(m.name), Method::Main(m))))
        .collect();
    methods.sort_by_key(|(name, _)| *name);
    methods.into_iter().map(|(_, m)| m).collect()
}

fn sorted_fields<'a>(class: &'a ClassDeclaration, pool: &SymbolPool) -> Vec<&'a VarDecl> {
    let mut fields: Vec<&VarDecl> = class.fields.iter().collect();
    fields.sort_by_key(|f| pool.resolve(f.name));
    fields
}

fn instance_method_eq(a: &InstanceMethod, b: &InstanceMethod) -> bool {
    a.name == b.name
        && type_eq(&a.return_type, &b.return_type)
        && a.parameters.len() == b.parameters.len()
        && a.parameters.iter().zip(&b.parameters).all(|(pa, pb)| var_decl_eq(pa, pb))
        && block_eq(&a.body, &b.body)
}

fn main_method_eq(a: &MainMethod, b: &MainMethod) -> bool {
    a.name == b.name && var_decl_eq(&a.argv, &b.argv) && block_eq(&a.body, &b.body)
}

fn var_decl_eq(a: &VarDecl, b: &VarDecl) -> bool {
    a.name == b.name && type_eq(&a.var_type, &b.var_type)
}

fn type_eq(a: &Type, b: &Type) -> bool {
    a.name == b.name && a.rank == b.rank
}

fn block_eq(a: &Block, b: &Block) -> bool {
    // empty statements print as nothing inside a block
    let stmts_a: Vec<_> =
        a.statements.iter().filter(|s| !matches!(s.kind, StmtKind::Empty)).collect();
    let stmts_b: Vec<_> =
        b.statements.iter().filter(|s| !matches!(s.kind, StmtKind::Empty)).collect();
    stmts_a.len() == stmts_b.len()
        && stmts_a.iter().zip(&stmts_b).all(|(sa, sb)| statement_eq(sa, sb))
}

fn statement_eq(a: &Statement, b: &Statement) -> bool {
    match (&a.kind, &b.kind) {
        (StmtKind::Empty, StmtKind::Empty) => true,
        (StmtKind::Expression(ea), StmtKind::Expression(eb)) => expression_eq(ea, eb),
        (
            StmtKind::LocalVariable { decl: da, initial_value: ia },
            StmtKind::LocalVariable { decl: db, initial_value: ib },
        ) => {
            var_decl_eq(da, db)
                && match (ia, ib) {
                    (None, None) => true,
                    (Some(ea), Some(eb)) => expression_eq(ea, eb),
                    _ => false,
                }
        }
        (StmtKind::Block(ba), StmtKind::Block(bb)) => block_eq(ba, bb),
        (
            StmtKind::If {
                condition: ca,
                then_statement: ta,
                else_statement: ea,
            },
            StmtKind::If {
                condition: cb,
                then_statement: tb,
                else_statement: eb,
            },
        ) => {
            expression_eq(ca, cb)
                && statement_eq(ta, tb)
                && match (ea, eb) {
                    (None, None) => true,
                    (Some(sa), Some(sb)) => statement_eq(sa, sb),
                    _ => false,
                }
        }
        (
            StmtKind::While { condition: ca, body: ba },
            StmtKind::While { condition: cb, body: bb },
        ) => expression_eq(ca, cb) && statement_eq(ba, bb),
        (StmtKind::Return(va), StmtKind::Return(vb)) => match (va, vb) {
            (None, None) => true,
            (Some(ea), Some(eb)) => expression_eq(ea, eb),
            _ => false,
        },
        _ => false,
    }
}

/// Looks through a unary minus wrapping a plain integer literal, which
/// prints identically to the negative-tagged literal.
fn as_negative_literal(e: &Expression) -> Option<mjc_symbol::Symbol> {
    match &e.kind {
        ExprKind::IntegerConstant { literal, negative: true } => Some(*literal),
        ExprKind::Unary { op: UnaryOp::Minus, target } => match &target.kind {
            ExprKind::IntegerConstant { literal, negative: false } => Some(*literal),
            _ => None,
        },
        _ => None,
    }
}

fn expression_eq(a: &Expression, b: &Expression) -> bool {
    if let (Some(la), Some(lb)) = (as_negative_literal(a), as_negative_literal(b)) {
        return la == lb;
    }
    match (&a.kind, &b.kind) {
        (
            ExprKind::IntegerConstant { literal: la, negative: na },
            ExprKind::IntegerConstant { literal: lb, negative: nb },
        ) => la == lb && na == nb,
        (
            ExprKind::BooleanConstant { value: va },
            ExprKind::BooleanConstant { value: vb },
        ) => va == vb,
        (ExprKind::NullConstant, ExprKind::NullConstant) => true,
        (ExprKind::ThisRef, ExprKind::ThisRef) => true,
        (
            ExprKind::VariableAccess { target: ta, name: na },
            ExprKind::VariableAccess { target: tb, name: nb },
        ) => na == nb && option_expr_eq(ta.as_deref(), tb.as_deref()),
        (
            ExprKind::ArrayAccess { target: ta, index: ia },
            ExprKind::ArrayAccess { target: tb, index: ib },
        ) => expression_eq(ta, tb) && expression_eq(ia, ib),
        (
            ExprKind::MethodInvocation { target: ta, name: na, arguments: aa },
            ExprKind::MethodInvocation { target: tb, name: nb, arguments: ab },
        ) => {
            na == nb
                && option_expr_eq(ta.as_deref(), tb.as_deref())
                && aa.len() == ab.len()
                && aa.iter().zip(ab).all(|(xa, xb)| expression_eq(xa, xb))
        }
        (
            ExprKind::ObjectInstantiation { class_name: ca },
            ExprKind::ObjectInstantiation { class_name: cb },
        ) => ca == cb,
        (
            ExprKind::ArrayInstantiation { array_type: ta, extent: ea },
            ExprKind::ArrayInstantiation { array_type: tb, extent: eb },
        ) => type_eq(ta, tb) && expression_eq(ea, eb),
        (
            ExprKind::Binary { op: oa, lhs: la, rhs: ra },
            ExprKind::Binary { op: ob, lhs: lb, rhs: rb },
        ) => oa == ob && expression_eq(la, lb) && expression_eq(ra, rb),
        (
            ExprKind::Unary { op: oa, target: ta },
            ExprKind::Unary { op: ob, target: tb },
        ) => oa == ob && expression_eq(ta, tb),
        _ => false,
    }
}

fn option_expr_eq(a: Option<&Expression>, b: Option<&Expression>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(ea), Some(eb)) => expression_eq(ea, eb),
        _ => false,
    }
}
