//! Name resolution and type checking.
//!
//! One pass collects class and member declarations, a second resolves all
//! declared types, and a third walks every method body in scope order,
//! computing expression types bottom-up and attaching the annotation side
//! tables. Scoping is stricter than Java: redeclaring a name visible in an
//! enclosing block is an error, only class fields may be shadowed by
//! parameters and locals.

use mjc_frontend::{
    AstFactory, BasicTypeName, BinaryOp, Block, ClassDeclaration, Expression, ExprKind,
    InstanceMethod, MainMethod, NodeId, Position, Program, Statement, StmtKind, Type, UnaryOp,
    VarDecl,
};
use mjc_symbol::{predefined, Symbol, SymbolPool};
use rustc_hash::FxHashMap;

use crate::constant;
use crate::definitions::{create_builtins, BuiltinDefinitions};
use crate::info::SemanticInfo;
use crate::type_info::{BasicTypeInfo, SemType, TypeCategory};

/// A violation of the MiniJava semantic rules.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub struct SemanticError {
    pub position: Position,
    pub message: String,
}

type Result<T> = std::result::Result<T, SemanticError>;

fn err<T>(position: Position, message: impl Into<String>) -> Result<T> {
    Err(SemanticError { position, message: message.into() })
}

/// Runs the full semantic analysis over `ast`.
///
/// The factory must be the one that built `ast`; it continues the ID
/// sequence for the synthesized builtin classes so node IDs stay unique
/// across both trees. The analysis is deterministic and leaves the AST
/// untouched; all results live in the returned [SemanticInfo].
pub fn check_program(
    ast: &Program,
    pool: &SymbolPool,
    factory: &mut AstFactory,
) -> Result<SemanticInfo> {
    let builtins = create_builtins(factory);
    let mut analyzer = Analyzer::new(pool);
    analyzer.install_builtins(&builtins)?;
    analyzer.collect_classes(ast)?;
    analyzer.declare_members(&builtins.ast)?;
    analyzer.declare_members(ast)?;
    let main_method = analyzer.check_main(ast)?;
    analyzer.check_bodies(ast)?;
    log::debug!(
        target: "semantic",
        "checked {} classes, {} typed nodes",
        ast.classes.len(),
        analyzer.type_annotations.len()
    );
    let Analyzer {
        class_definitions,
        type_annotations,
        locals_annotations,
        vardecl_annotations,
        method_annotations,
        const_annotations,
        ..
    } = analyzer;
    let BuiltinDefinitions { ast: builtin_ast, globals } = builtins;
    Ok(SemanticInfo {
        class_definitions,
        type_annotations,
        locals_annotations,
        vardecl_annotations,
        method_annotations,
        const_annotations,
        builtin_ast,
        globals,
        main_method,
    })
}

struct ClassScope<'ast> {
    decl: &'ast ClassDeclaration,
    fields: FxHashMap<Symbol, &'ast VarDecl>,
    methods: FxHashMap<Symbol, &'ast InstanceMethod>,
}

struct Scope {
    may_overwrite: bool,
    symbols: FxHashMap<Symbol, NodeId>,
}

struct Analyzer<'ast, 'pool> {
    pool: &'pool SymbolPool,
    class_definitions: FxHashMap<Symbol, BasicTypeInfo>,
    class_scopes: FxHashMap<NodeId, ClassScope<'ast>>,
    type_annotations: FxHashMap<NodeId, SemType>,
    locals_annotations: FxHashMap<NodeId, Vec<NodeId>>,
    vardecl_annotations: FxHashMap<NodeId, NodeId>,
    method_annotations: FxHashMap<NodeId, NodeId>,
    const_annotations: FxHashMap<NodeId, i32>,
    /// Implicit globals: name and declaration node.
    globals: Vec<(Symbol, NodeId)>,
    scopes: Vec<Scope>,
    current_class: Option<NodeId>,
    current_return: Option<SemType>,
    current_locals: Vec<NodeId>,
    in_main: bool,
}

impl<'ast, 'pool> Analyzer<'ast, 'pool> {
    fn new(pool: &'pool SymbolPool) -> Self {
        Self {
            pool,
            class_definitions: FxHashMap::default(),
            class_scopes: FxHashMap::default(),
            type_annotations: FxHashMap::default(),
            locals_annotations: FxHashMap::default(),
            vardecl_annotations: FxHashMap::default(),
            method_annotations: FxHashMap::default(),
            const_annotations: FxHashMap::default(),
            globals: Vec::new(),
            scopes: Vec::new(),
            current_class: None,
            current_return: None,
            current_locals: Vec::new(),
            in_main: false,
        }
    }

    fn name(&self, sym: Symbol) -> &'pool str {
        self.pool.resolve(sym)
    }

    fn int_type(&self) -> SemType {
        SemType::scalar(BasicTypeInfo::primitive(TypeCategory::Int, predefined::INT))
    }

    fn boolean_type(&self) -> SemType {
        SemType::scalar(BasicTypeInfo::primitive(TypeCategory::Boolean, predefined::BOOLEAN))
    }

    fn void_type(&self) -> SemType {
        SemType::scalar(BasicTypeInfo::primitive(TypeCategory::Void, predefined::VOID))
    }

    fn null_type(&self) -> SemType {
        SemType::scalar(BasicTypeInfo::primitive(TypeCategory::Null, predefined::KW_NULL))
    }

    // Pass 0: builtin classes and globals.

    fn install_builtins(&mut self, builtins: &'ast BuiltinDefinitions) -> Result<()> {
        self.class_definitions.insert(predefined::INT, self.int_type().info);
        self.class_definitions.insert(predefined::BOOLEAN, self.boolean_type().info);
        self.class_definitions.insert(predefined::VOID, self.void_type().info);
        self.class_definitions.insert(predefined::KW_NULL, self.null_type().info);
        for class in &builtins.ast.classes {
            self.add_class(class, true)?;
        }
        for global in &builtins.globals {
            let ty = self.resolve_type(&global.var_type, false)?;
            self.type_annotations.insert(global.info.id, ty);
            self.globals.push((global.name, global.info.id));
        }
        self.globals.sort_by_key(|(_, id)| *id);
        Ok(())
    }

    // Pass 1: class and member collection.

    fn collect_classes(&mut self, ast: &'ast Program) -> Result<()> {
        for class in &ast.classes {
            self.add_class(class, false)?;
        }
        Ok(())
    }

    fn add_class(&mut self, class: &'ast ClassDeclaration, builtin: bool) -> Result<()> {
        if self.class_definitions.contains_key(&class.name) {
            return err(
                class.info.position,
                format!("Duplicate class name '{}'", self.name(class.name)),
            );
        }
        self.class_definitions
            .insert(class.name, BasicTypeInfo::class(class.name, class.info.id, builtin));

        let mut scope = ClassScope {
            decl: class,
            fields: FxHashMap::default(),
            methods: FxHashMap::default(),
        };
        for field in &class.fields {
            if scope.fields.insert(field.name, field).is_some() {
                return err(
                    field.info.position,
                    format!(
                        "Field '{}' has already been defined in '{}'",
                        self.name(field.name),
                        self.name(class.name)
                    ),
                );
            }
        }
        let mut method_names: FxHashMap<Symbol, ()> = FxHashMap::default();
        for method in &class.instance_methods {
            if method_names.insert(method.name, ()).is_some() {
                return err(
                    method.info.position,
                    format!(
                        "Method '{}' has already been defined in '{}'",
                        self.name(method.name),
                        self.name(class.name)
                    ),
                );
            }
            scope.methods.insert(method.name, method);
        }
        for main in &class.main_methods {
            if method_names.insert(main.name, ()).is_some() {
                return err(
                    main.info.position,
                    format!(
                        "Method '{}' has already been defined in '{}'",
                        self.name(main.name),
                        self.name(class.name)
                    ),
                );
            }
        }
        self.class_scopes.insert(class.info.id, scope);
        Ok(())
    }

    // Pass 2: declared types.

    fn declare_members(&mut self, ast: &'ast Program) -> Result<()> {
        for class in &ast.classes {
            for field in &class.fields {
                let ty = self.resolve_type(&field.var_type, false)?;
                self.type_annotations.insert(field.info.id, ty);
            }
            for method in &class.instance_methods {
                let return_type = self.resolve_type(&method.return_type, true)?;
                self.type_annotations.insert(method.info.id, return_type);
                for param in &method.parameters {
                    let ty = self.resolve_type(&param.var_type, false)?;
                    self.type_annotations.insert(param.info.id, ty);
                }
            }
            for main in &class.main_methods {
                self.type_annotations.insert(main.info.id, self.void_type());
                let argv_type = self.resolve_type(&main.argv.var_type, false)?;
                self.type_annotations.insert(main.argv.info.id, argv_type);
            }
        }
        Ok(())
    }

    fn resolve_type(&self, ty: &Type, allow_void: bool) -> Result<SemType> {
        let info = match ty.name {
            BasicTypeName::Int => self.int_type().info,
            BasicTypeName::Boolean => self.boolean_type().info,
            BasicTypeName::Void => self.void_type().info,
            BasicTypeName::Class(sym) => match self.class_definitions.get(&sym) {
                Some(info) if info.declaration.is_some() => *info,
                _ => {
                    return err(
                        ty.info.position,
                        format!("Cannot resolve type name '{}'", self.name(sym)),
                    )
                }
            },
        };
        if info.is_void() {
            if ty.rank > 0 {
                return err(ty.info.position, "Array of type 'void' is not allowed");
            }
            if !allow_void {
                return err(ty.info.position, "Type 'void' is only allowed as return type");
            }
        }
        Ok(SemType::new(info, ty.rank))
    }

    // Pass 3: the main method.

    fn check_main(&mut self, ast: &'ast Program) -> Result<NodeId> {
        let mut main: Option<&MainMethod> = None;
        for class in &ast.classes {
            for candidate in &class.main_methods {
                if main.is_some() {
                    return err(
                        candidate.info.position,
                        "Only one main method is allowed per program",
                    );
                }
                main = Some(candidate);
            }
        }
        let Some(main) = main else {
            return err(ast.info.position, "No main method found");
        };
        let argv_type = self.type_annotations[&main.argv.info.id];
        if argv_type.info.name != predefined::STRING || argv_type.rank != 1 {
            return err(
                main.argv.info.position,
                format!(
                    "The parameter of main must have type 'String[]', not '{}'",
                    argv_type.display(self.pool)
                ),
            );
        }
        Ok(main.info.id)
    }

    // Pass 4: method bodies.

    fn check_bodies(&mut self, ast: &'ast Program) -> Result<()> {
        for class in &ast.classes {
            self.current_class = Some(class.info.id);
            for method in &class.instance_methods {
                self.check_instance_method(method)?;
            }
            for main in &class.main_methods {
                self.check_main_method(main)?;
            }
            self.current_class = None;
        }
        Ok(())
    }

    fn check_instance_method(&mut self, method: &'ast InstanceMethod) -> Result<()> {
        self.enter_scope(true);
        self.current_locals = Vec::new();
        self.in_main = false;
        for param in &method.parameters {
            self.declare_predeclared(param)?;
        }
        let return_type = self.type_annotations[&method.info.id];
        self.current_return = Some(return_type);
        self.check_block(&method.body)?;
        self.leave_scope();
        if !return_type.is_void() && !block_returns(&method.body) {
            return err(
                method.info.position,
                format!("Method '{}' must return a value on every path", self.name(method.name)),
            );
        }
        let locals = std::mem::take(&mut self.current_locals);
        self.locals_annotations.insert(method.info.id, locals);
        Ok(())
    }

    fn check_main_method(&mut self, main: &'ast MainMethod) -> Result<()> {
        self.enter_scope(true);
        self.current_locals = Vec::new();
        self.in_main = true;
        self.declare_predeclared(&main.argv)?;
        self.current_return = Some(self.void_type());
        self.check_block(&main.body)?;
        self.leave_scope();
        self.in_main = false;
        let locals = std::mem::take(&mut self.current_locals);
        self.locals_annotations.insert(main.info.id, locals);
        Ok(())
    }

    // Scope management.

    fn enter_scope(&mut self, may_overwrite: bool) {
        self.scopes.push(Scope { may_overwrite, symbols: FxHashMap::default() });
    }

    fn leave_scope(&mut self) {
        self.scopes.pop();
    }

    /// Whether `name` is already declared in a scope that must not be
    /// shadowed: everything up to and including the innermost
    /// `may_overwrite` scope.
    fn is_defined_in_dependent_scope(&self, name: Symbol) -> bool {
        for scope in self.scopes.iter().rev() {
            if scope.symbols.contains_key(&name) {
                return true;
            }
            if scope.may_overwrite {
                break;
            }
        }
        false
    }

    /// Declares a parameter or local whose type annotation already exists
    /// (parameters) or has just been computed (locals).
    fn declare_predeclared(&mut self, decl: &'ast VarDecl) -> Result<()> {
        if self.is_defined_in_dependent_scope(decl.name) {
            return err(
                decl.info.position,
                format!(
                    "Variable '{}' has already been defined in the current scope",
                    self.name(decl.name)
                ),
            );
        }
        self.scopes
            .last_mut()
            .expect("a scope is always open inside a method")
            .symbols
            .insert(decl.name, decl.info.id);
        self.current_locals.push(decl.info.id);
        Ok(())
    }

    fn lookup_var(&self, name: Symbol) -> Option<NodeId> {
        for scope in self.scopes.iter().rev() {
            if let Some(&id) = scope.symbols.get(&name) {
                return Some(id);
            }
        }
        if !self.in_main {
            let class_id = self.current_class.expect("bodies are checked inside a class");
            if let Some(field) = self.class_scopes[&class_id].fields.get(&name) {
                return Some(field.info.id);
            }
        }
        self.globals.iter().find(|(n, _)| *n == name).map(|(_, id)| *id)
    }

    // Statements.

    fn check_block(&mut self, block: &'ast Block) -> Result<()> {
        self.enter_scope(false);
        for statement in &block.statements {
            self.check_statement(statement)?;
        }
        self.leave_scope();
        Ok(())
    }

    fn check_statement(&mut self, statement: &'ast Statement) -> Result<()> {
        match &statement.kind {
            StmtKind::Empty => Ok(()),
            StmtKind::Expression(expr) => {
                self.check_expression(expr)?;
                Ok(())
            }
            StmtKind::LocalVariable { decl, initial_value } => {
                let ty = self.resolve_type(&decl.var_type, false)?;
                self.type_annotations.insert(decl.info.id, ty);
                self.declare_predeclared(decl)?;
                if let Some(init) = initial_value {
                    let init_type = self.check_expression(init)?;
                    self.require_assignable(init.info.position, &init_type, &ty)?;
                }
                Ok(())
            }
            StmtKind::Block(block) => self.check_block(block),
            StmtKind::If { condition, then_statement, else_statement } => {
                let cond_type = self.check_expression(condition)?;
                self.require_boolean(condition.info.position, &cond_type)?;
                self.check_statement(then_statement)?;
                if let Some(else_statement) = else_statement {
                    self.check_statement(else_statement)?;
                }
                Ok(())
            }
            StmtKind::While { condition, body } => {
                let cond_type = self.check_expression(condition)?;
                self.require_boolean(condition.info.position, &cond_type)?;
                self.check_statement(body)
            }
            StmtKind::Return(value) => {
                let return_type =
                    self.current_return.expect("bodies are checked inside a method");
                match value {
                    None if return_type.is_void() => Ok(()),
                    None => err(
                        statement.info.position,
                        "Method with non-void return type must return a value",
                    ),
                    Some(_) if return_type.is_void() => err(
                        statement.info.position,
                        "Cannot return a value from a method with return type 'void'",
                    ),
                    Some(value) => {
                        let value_type = self.check_expression(value)?;
                        self.require_assignable(value.info.position, &value_type, &return_type)
                    }
                }
            }
        }
    }

    fn require_boolean(&self, position: Position, actual: &SemType) -> Result<()> {
        if actual.is_boolean() {
            Ok(())
        } else {
            err(
                position,
                format!("Expected type 'boolean' but actual type is '{}'", actual.display(self.pool)),
            )
        }
    }

    fn require_int(&self, position: Position, actual: &SemType) -> Result<()> {
        if actual.is_int() {
            Ok(())
        } else {
            err(
                position,
                format!("Expected type 'int' but actual type is '{}'", actual.display(self.pool)),
            )
        }
    }

    fn require_assignable(
        &self,
        position: Position,
        actual: &SemType,
        expected: &SemType,
    ) -> Result<()> {
        if actual.assignable_to(expected) {
            Ok(())
        } else {
            err(
                position,
                format!(
                    "Expected type '{}' but actual type is '{}'",
                    expected.display(self.pool),
                    actual.display(self.pool)
                ),
            )
        }
    }

    // Expressions.

    fn check_expression(&mut self, expr: &'ast Expression) -> Result<SemType> {
        let ty = self.compute_expression_type(expr)?;
        self.type_annotations.insert(expr.info.id, ty);
        Ok(ty)
    }

    fn compute_expression_type(&mut self, expr: &'ast Expression) -> Result<SemType> {
        let position = expr.info.position;
        match &expr.kind {
            ExprKind::IntegerConstant { literal, negative } => {
                let lexeme = self.name(*literal);
                match constant::parse_literal(lexeme, *negative) {
                    Some(value) => {
                        self.const_annotations.insert(expr.info.id, value);
                        Ok(self.int_type())
                    }
                    None => {
                        let sign = if *negative { "-" } else { "" };
                        err(position, format!("Integer literal '{sign}{lexeme}' is out of range"))
                    }
                }
            }
            ExprKind::BooleanConstant { .. } => Ok(self.boolean_type()),
            ExprKind::NullConstant => Ok(self.null_type()),
            ExprKind::ThisRef => {
                if self.in_main {
                    return err(position, "'this' is not allowed in a static method");
                }
                let class_id = self.current_class.expect("bodies are checked inside a class");
                let decl = self.class_scopes[&class_id].decl;
                Ok(SemType::scalar(self.class_definitions[&decl.name]))
            }
            ExprKind::VariableAccess { target: None, name } => match self.lookup_var(*name) {
                Some(decl_id) => {
                    self.vardecl_annotations.insert(expr.info.id, decl_id);
                    Ok(self.type_annotations[&decl_id])
                }
                None => err(
                    position,
                    format!("No variable '{}' defined in current scope", self.name(*name)),
                ),
            },
            ExprKind::VariableAccess { target: Some(target), name } => {
                let target_type = self.check_expression(target)?;
                if !target_type.is_object() {
                    return err(
                        position,
                        format!("Type '{}' has no fields", target_type.display(self.pool)),
                    );
                }
                let class_id =
                    target_type.info.declaration.expect("object types have a declaration");
                let scope = &self.class_scopes[&class_id];
                match scope.fields.get(name) {
                    Some(field) => {
                        let field_id = field.info.id;
                        self.vardecl_annotations.insert(expr.info.id, field_id);
                        Ok(self.type_annotations[&field_id])
                    }
                    None => err(
                        position,
                        format!(
                            "Class '{}' has no field '{}'",
                            self.name(scope.decl.name),
                            self.name(*name)
                        ),
                    ),
                }
            }
            ExprKind::ArrayAccess { target, index } => {
                let target_type = self.check_expression(target)?;
                if !target_type.is_array() {
                    return err(
                        position,
                        format!(
                            "Expected an array expression but found type '{}'",
                            target_type.display(self.pool)
                        ),
                    );
                }
                let index_type = self.check_expression(index)?;
                self.require_int(index.info.position, &index_type)?;
                // the access names the same storage as its base
                if let Some(&decl) = self.vardecl_annotations.get(&target.info.id) {
                    self.vardecl_annotations.insert(expr.info.id, decl);
                }
                Ok(target_type.element_type())
            }
            ExprKind::MethodInvocation { target, name, arguments } => {
                self.check_method_invocation(expr, position, target.as_deref(), *name, arguments)
            }
            ExprKind::ObjectInstantiation { class_name } => {
                match self.class_definitions.get(class_name) {
                    Some(info) if info.is_user_defined() => Ok(SemType::scalar(*info)),
                    Some(_) => err(
                        position,
                        format!("Cannot instantiate builtin type '{}'", self.name(*class_name)),
                    ),
                    None => err(
                        position,
                        format!("Cannot resolve type name '{}'", self.name(*class_name)),
                    ),
                }
            }
            ExprKind::ArrayInstantiation { array_type, extent } => {
                let ty = self.resolve_type(array_type, false)?;
                debug_assert!(ty.rank >= 1);
                let extent_type = self.check_expression(extent)?;
                self.require_int(extent.info.position, &extent_type)?;
                Ok(ty)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.check_binary_expression(expr, position, *op, lhs, rhs)
            }
            ExprKind::Unary { op, target } => {
                let target_type = self.check_expression(target)?;
                match op {
                    UnaryOp::LogicalNot => {
                        self.require_boolean(target.info.position, &target_type)?;
                        Ok(self.boolean_type())
                    }
                    UnaryOp::Minus => {
                        self.require_int(target.info.position, &target_type)?;
                        if let Some(&value) = self.const_annotations.get(&target.info.id) {
                            self.const_annotations
                                .insert(expr.info.id, constant::fold_minus(value));
                        }
                        Ok(self.int_type())
                    }
                }
            }
        }
    }

    fn check_binary_expression(
        &mut self,
        expr: &'ast Expression,
        position: Position,
        op: BinaryOp,
        lhs: &'ast Expression,
        rhs: &'ast Expression,
    ) -> Result<SemType> {
        if op == BinaryOp::Assign {
            if !lhs.is_lvalue() {
                return err(position, "Left-hand side of assignment is not assignable");
            }
            let lhs_type = self.check_expression(lhs)?;
            if let Some(decl) = self.vardecl_annotations.get(&lhs.info.id) {
                if self.globals.iter().any(|(_, id)| id == decl) {
                    return err(position, "Cannot assign to a global");
                }
            }
            let rhs_type = self.check_expression(rhs)?;
            self.require_assignable(rhs.info.position, &rhs_type, &lhs_type)?;
            // assignments are never constant-annotated
            return Ok(lhs_type);
        }

        let lhs_type = self.check_expression(lhs)?;
        let rhs_type = self.check_expression(rhs)?;
        let result = match op {
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr => {
                self.require_boolean(lhs.info.position, &lhs_type)?;
                self.require_boolean(rhs.info.position, &rhs_type)?;
                self.boolean_type()
            }
            BinaryOp::Equal | BinaryOp::NotEqual => {
                let ok = (lhs_type.is_int() && rhs_type.is_int())
                    || (lhs_type.is_boolean() && rhs_type.is_boolean())
                    || (lhs_type.is_reference()
                        && rhs_type.is_reference()
                        && lhs_type.comparable_to(&rhs_type));
                if !ok {
                    return err(
                        position,
                        format!(
                            "Cannot compare type '{}' with type '{}'",
                            lhs_type.display(self.pool),
                            rhs_type.display(self.pool)
                        ),
                    );
                }
                self.boolean_type()
            }
            BinaryOp::LessThan
            | BinaryOp::LessEqual
            | BinaryOp::GreaterThan
            | BinaryOp::GreaterEqual => {
                self.require_int(lhs.info.position, &lhs_type)?;
                self.require_int(rhs.info.position, &rhs_type)?;
                self.boolean_type()
            }
            BinaryOp::Plus
            | BinaryOp::Minus
            | BinaryOp::Multiply
            | BinaryOp::Divide
            | BinaryOp::Modulo => {
                // division and modulo by a literal zero are accepted here;
                // the optimizer or the runtime deals with them
                self.require_int(lhs.info.position, &lhs_type)?;
                self.require_int(rhs.info.position, &rhs_type)?;
                self.int_type()
            }
            BinaryOp::Assign => unreachable!("handled above"),
        };

        if let (Some(&l), Some(&r)) = (
            self.const_annotations.get(&lhs.info.id),
            self.const_annotations.get(&rhs.info.id),
        ) {
            if let Some(value) = constant::fold_binary(op, l, r) {
                self.const_annotations.insert(expr.info.id, value);
            }
        }
        Ok(result)
    }

    fn check_method_invocation(
        &mut self,
        expr: &'ast Expression,
        position: Position,
        target: Option<&'ast Expression>,
        name: Symbol,
        arguments: &'ast [Expression],
    ) -> Result<SemType> {
        let receiver_type = match target {
            Some(target) => self.check_expression(target)?,
            None => {
                if self.in_main {
                    return err(
                        position,
                        format!(
                            "Cannot call method '{}' without an object in a static method",
                            self.name(name)
                        ),
                    );
                }
                let class_id = self.current_class.expect("bodies are checked inside a class");
                let decl = self.class_scopes[&class_id].decl;
                SemType::scalar(self.class_definitions[&decl.name])
            }
        };
        if !receiver_type.is_object() {
            return err(
                position,
                format!("Type '{}' has no methods", receiver_type.display(self.pool)),
            );
        }
        let class_id = receiver_type.info.declaration.expect("object types have a declaration");
        let (method_id, class_name, parameters) = {
            let scope = &self.class_scopes[&class_id];
            match scope.methods.get(&name) {
                Some(method) => {
                    let params: Vec<NodeId> =
                        method.parameters.iter().map(|p| p.info.id).collect();
                    (method.info.id, scope.decl.name, params)
                }
                None => {
                    return err(
                        position,
                        format!(
                            "Class '{}' has no method '{}'",
                            self.name(scope.decl.name),
                            self.name(name)
                        ),
                    )
                }
            }
        };
        if arguments.len() != parameters.len() {
            return err(
                position,
                format!(
                    "Method '{}' of class '{}' expects {} arguments but {} were given",
                    self.name(name),
                    self.name(class_name),
                    parameters.len(),
                    arguments.len()
                ),
            );
        }
        for (argument, param_id) in arguments.iter().zip(parameters) {
            let argument_type = self.check_expression(argument)?;
            let param_type = self.type_annotations[&param_id];
            self.require_assignable(argument.info.position, &argument_type, &param_type)?;
        }
        self.method_annotations.insert(expr.info.id, method_id);
        Ok(self.type_annotations[&method_id])
    }
}

/// Structural definite-return analysis: no data flow, only the statement
/// grammar. A block returns if any of its statements does; an `if` returns
/// only when both branches exist and return.
fn statement_returns(statement: &Statement) -> bool {
    match &statement.kind {
        StmtKind::Return(_) => true,
        StmtKind::Block(block) => block_returns(block),
        StmtKind::If { then_statement, else_statement: Some(else_statement), .. } => {
            statement_returns(then_statement) && statement_returns(else_statement)
        }
        _ => false,
    }
}

fn block_returns(block: &Block) -> bool {
    block.statements.iter().any(statement_returns)
}
