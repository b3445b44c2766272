//! Second IR pass: method bodies.
//!
//! Lowers every annotated method body into an SSA graph. Local variables
//! and the memory stream are SSA variables; field and array accesses go
//! through `Member`/`Sel` addresses and `Load`/`Store` nodes threaded on
//! the single per-graph memory stream. Control flow is built block by
//! block with sealed-block SSA construction; `&&`, `||` and `!` evaluate
//! lazily in conditions, and lazily via a join phi when their value is
//! needed. The behavior is undefined for an AST that did not pass
//! semantic analysis.

use mjc_frontend::{
    BinaryOp, Block as AstBlock, Expression, ExprKind, NodeId, Program as Ast, Statement,
    StmtKind, UnaryOp,
};
use mjc_ir::{pn, Graph, Mode, Node, Program, Relation, Tarval};
use mjc_semantic::{SemType, SemanticInfo};
use rustc_hash::FxHashMap;

use crate::ssa::{SsaBuilder, Variable};
use crate::types::IrTypes;

/// Lowers all method bodies of `ast` into graphs of `program`.
pub fn create_methods(ast: &Ast, seminfo: &SemanticInfo, types: &IrTypes, program: &mut Program) {
    let globals: Vec<NodeId> = seminfo.globals().iter().map(|g| g.info.id).collect();

    for class in &ast.classes {
        for method in &class.instance_methods {
            let entity = types.method_entity(method.info.id);
            let graph_id = program.new_graph(entity);
            let mut builder =
                MethodBuilder::new(program.graph_mut(graph_id), seminfo, types, &globals);
            builder.lower_instance_method(method);
        }
        for main in &class.main_methods {
            let entity = types.method_entity(main.info.id);
            let graph_id = program.new_graph(entity);
            let mut builder =
                MethodBuilder::new(program.graph_mut(graph_id), seminfo, types, &globals);
            builder.lower_main_method(main);
        }
    }

    for id in program.graph_ids() {
        let graph = program.graph(id);
        if let Err(err) = mjc_ir::verify_graph(graph) {
            let name = &program.entity(graph.entity).ld_name;
            panic!("IR construction produced an invalid graph for {name}: {err}");
        }
    }
}

fn mode_of(ty: SemType) -> Option<Mode> {
    if ty.is_void() {
        None
    } else if ty.is_int() {
        Some(Mode::Is)
    } else if ty.is_boolean() {
        Some(Mode::Bu)
    } else {
        Some(Mode::P)
    }
}

struct MethodBuilder<'a> {
    graph: &'a mut Graph,
    seminfo: &'a SemanticInfo,
    types: &'a IrTypes,
    globals: &'a [NodeId],
    ssa: SsaBuilder,
    vars: FxHashMap<NodeId, Variable>,
    mem_var: Variable,
    this_value: Option<Node>,
    /// The block under construction; `None` after a `return`.
    current: Option<Node>,
}

impl<'a> MethodBuilder<'a> {
    fn new(
        graph: &'a mut Graph,
        seminfo: &'a SemanticInfo,
        types: &'a IrTypes,
        globals: &'a [NodeId],
    ) -> Self {
        let mut ssa = SsaBuilder::new();
        let mem_var = ssa.declare_var(Mode::M);
        let start_block = graph.start_block();
        ssa.seal_block(graph, start_block);
        let initial_mem = graph.initial_mem();
        ssa.def_var(mem_var, start_block, initial_mem);
        Self {
            graph,
            seminfo,
            types,
            globals,
            ssa,
            vars: FxHashMap::default(),
            mem_var,
            this_value: None,
            current: None,
        }
    }

    fn block(&self) -> Node {
        self.current.expect("statements are only lowered in a live block")
    }

    fn mem(&mut self) -> Node {
        let block = self.block();
        self.ssa.use_var(self.graph, self.mem_var, block)
    }

    fn set_mem(&mut self, mem: Node) {
        let block = self.block();
        self.ssa.def_var(self.mem_var, block, mem);
    }

    fn sem_type(&self, node: NodeId) -> SemType {
        self.seminfo.type_of(node).expect("expression nodes are annotated")
    }

    fn declare_locals(&mut self, method: NodeId) {
        let locals = &self.seminfo.locals_annotations()[&method];
        for &decl in locals {
            let sem = self.sem_type(decl);
            let mode = mode_of(sem).expect("variables are never void");
            let var = self.ssa.declare_var(mode);
            self.vars.insert(decl, var);
        }
    }

    fn lower_instance_method(&mut self, method: &mjc_frontend::InstanceMethod) {
        self.declare_locals(method.info.id);
        let start_block = self.graph.start_block();
        self.current = Some(start_block);

        // `this` is parameter 0; declared parameters follow
        let args = self.graph.args();
        let this = self.graph.new_proj(args, Mode::P, 0);
        self.this_value = Some(this);
        for (idx, param) in method.parameters.iter().enumerate() {
            let var = self.vars[&param.info.id];
            let mode = self.ssa.var_mode(var);
            let proj = self.graph.new_proj(args, mode, (idx + 1) as u32);
            self.ssa.def_var(var, start_block, proj);
        }

        self.lower_block(&method.body);
        let returns_value = !self.sem_type(method.info.id).is_void();
        self.finish(returns_value);
    }

    fn lower_main_method(&mut self, main: &mjc_frontend::MainMethod) {
        self.declare_locals(main.info.id);
        let start_block = self.graph.start_block();
        self.current = Some(start_block);

        // the argument vector has no runtime representation
        let argv_var = self.vars[&main.argv.info.id];
        let undefined = self.graph.new_unknown(Mode::P);
        self.ssa.def_var(argv_var, start_block, undefined);

        self.lower_block(&main.body);
        self.finish(false);
    }

    /// Closes a fall-through path with an implicit `return` and wires all
    /// returns into the end block.
    fn finish(&mut self, returns_value: bool) {
        if self.current.is_some() {
            debug_assert!(!returns_value, "non-void methods return on every path");
            let mem = self.mem();
            let block = self.block();
            let ret = self.graph.new_return(block, mem, None);
            let end_block = self.graph.end_block();
            self.graph.add_block_pred(end_block, ret);
            self.current = None;
        }
        let end_block = self.graph.end_block();
        if !self.ssa.is_sealed(end_block) {
            self.ssa.seal_block(self.graph, end_block);
        }
    }

    // Statements.

    fn lower_block(&mut self, block: &AstBlock) {
        for statement in &block.statements {
            if self.current.is_none() {
                // unreachable code after a return is legal and simply dropped
                return;
            }
            self.lower_statement(statement);
        }
    }

    fn lower_statement(&mut self, statement: &Statement) {
        match &statement.kind {
            StmtKind::Empty => {}
            StmtKind::Block(block) => self.lower_block(block),
            StmtKind::Expression(expr) => {
                self.lower_expression(expr);
            }
            StmtKind::LocalVariable { decl, initial_value } => {
                let var = self.vars[&decl.info.id];
                let value = match initial_value {
                    Some(init) => self.lower_value(init),
                    None => {
                        // zero initialization mirrors the allocator contract
                        let zero = match self.ssa.var_mode(var) {
                            Mode::Is => Tarval::Int(0),
                            Mode::Bu => Tarval::Bool(false),
                            _ => Tarval::Null,
                        };
                        self.graph.new_const(zero)
                    }
                };
                let block = self.block();
                self.ssa.def_var(var, block, value);
            }
            StmtKind::Return(value) => {
                let value = value.as_ref().map(|v| self.lower_value(v));
                let mem = self.mem();
                let block = self.block();
                let ret = self.graph.new_return(block, mem, value);
                let end_block = self.graph.end_block();
                self.graph.add_block_pred(end_block, ret);
                self.current = None;
            }
            StmtKind::If { condition, then_statement, else_statement } => {
                let (true_edges, false_edges) = self.lower_condition(condition);

                let mut join_preds = Vec::new();

                self.current = self.new_sealed_block(&true_edges);
                if self.current.is_some() {
                    self.lower_statement(then_statement);
                }
                if let Some(block) = self.current {
                    join_preds.push(self.graph.new_jmp(block));
                }

                match else_statement {
                    Some(else_statement) => {
                        self.current = self.new_sealed_block(&false_edges);
                        if self.current.is_some() {
                            self.lower_statement(else_statement);
                        }
                        if let Some(block) = self.current {
                            join_preds.push(self.graph.new_jmp(block));
                        }
                    }
                    None => join_preds.extend(false_edges),
                }

                self.current = self.new_sealed_block(&join_preds);
            }
            StmtKind::While { condition, body } => {
                let entry_block = self.block();
                let entry = self.graph.new_jmp(entry_block);
                let header = self.graph.new_block(&[entry]);
                // unsealed until the back edge is in place
                self.current = Some(header);
                let (true_edges, false_edges) = self.lower_condition(condition);

                self.current = self.new_sealed_block(&true_edges);
                if self.current.is_some() {
                    self.lower_statement(body);
                }
                if let Some(block) = self.current {
                    let back = self.graph.new_jmp(block);
                    self.graph.add_block_pred(header, back);
                }
                self.ssa.seal_block(self.graph, header);

                // keep the loop alive even when nothing escapes it
                self.graph.add_end_keepalive(header);
                for phi in self.graph.phis_of_block(header) {
                    if !self.graph.phi_loops(phi) {
                        self.graph.set_phi_loop(phi, true);
                        self.graph.add_end_keepalive(phi);
                    }
                }

                self.current = self.new_sealed_block(&false_edges);
            }
        }
    }

    /// Creates a block over `preds` and seals it. With no predecessors the
    /// path is unreachable and lowering continues nowhere.
    fn new_sealed_block(&mut self, preds: &[Node]) -> Option<Node> {
        if preds.is_empty() {
            return None;
        }
        let block = self.graph.new_block(preds);
        self.ssa.seal_block(self.graph, block);
        Some(block)
    }

    // Conditions: lazy evaluation producing true/false edge sets.

    fn lower_condition(&mut self, expr: &Expression) -> (Vec<Node>, Vec<Node>) {
        match &expr.kind {
            ExprKind::Binary { op: BinaryOp::LogicalAnd, lhs, rhs } => {
                let (lhs_true, mut false_edges) = self.lower_condition(lhs);
                self.current = self.new_sealed_block(&lhs_true);
                if self.current.is_none() {
                    return (Vec::new(), false_edges);
                }
                let (true_edges, rhs_false) = self.lower_condition(rhs);
                false_edges.extend(rhs_false);
                (true_edges, false_edges)
            }
            ExprKind::Binary { op: BinaryOp::LogicalOr, lhs, rhs } => {
                let (mut true_edges, lhs_false) = self.lower_condition(lhs);
                self.current = self.new_sealed_block(&lhs_false);
                if self.current.is_none() {
                    return (true_edges, Vec::new());
                }
                let (rhs_true, false_edges) = self.lower_condition(rhs);
                true_edges.extend(rhs_true);
                (true_edges, false_edges)
            }
            ExprKind::Unary { op: UnaryOp::LogicalNot, target } => {
                let (true_edges, false_edges) = self.lower_condition(target);
                (false_edges, true_edges)
            }
            _ => {
                let selector = self.lower_value(expr);
                let block = self.block();
                let cond = self.graph.new_cond(block, selector);
                let true_edge = self.graph.new_proj(cond, Mode::X, pn::COND_TRUE);
                let false_edge = self.graph.new_proj(cond, Mode::X, pn::COND_FALSE);
                (vec![true_edge], vec![false_edge])
            }
        }
    }

    // Expressions.

    /// Lowers an expression whose value is needed.
    fn lower_value(&mut self, expr: &Expression) -> Node {
        self.lower_expression(expr).expect("non-void expression")
    }

    fn lower_expression(&mut self, expr: &Expression) -> Option<Node> {
        // a constant annotation replaces the whole (side-effect free)
        // computation
        if let Some(value) = self.seminfo.const_of(expr.info.id) {
            return Some(self.graph.new_const(Tarval::Int(value)));
        }
        match &expr.kind {
            ExprKind::IntegerConstant { .. } => {
                unreachable!("integer literals always carry a constant annotation")
            }
            ExprKind::BooleanConstant { value } => {
                Some(self.graph.new_const(Tarval::Bool(*value)))
            }
            ExprKind::NullConstant => Some(self.graph.new_const(Tarval::Null)),
            ExprKind::ThisRef => Some(self.this_value.expect("`this` is rejected in main")),
            ExprKind::VariableAccess { .. } => Some(self.lower_variable_read(expr)),
            ExprKind::ArrayAccess { target, index } => {
                let sel = self.lower_element_address(expr, target, index);
                let mode = mode_of(self.sem_type(expr.info.id)).expect("elements are not void");
                Some(self.lower_load(sel, mode))
            }
            ExprKind::MethodInvocation { target, arguments, .. } => {
                self.lower_invocation(expr, target.as_deref(), arguments)
            }
            ExprKind::ObjectInstantiation { .. } => {
                let sem = self.sem_type(expr.info.id);
                let class =
                    sem.info.declaration.expect("instantiated types have a declaration");
                let class_size = self.types.size_of(self.types.class_type(class));
                let size = self.graph.new_const(Tarval::Int(class_size as i32));
                let one = self.graph.new_const(Tarval::Int(1));
                Some(self.lower_allocation(size, one))
            }
            ExprKind::ArrayInstantiation { extent, .. } => {
                let sem = self.sem_type(expr.info.id);
                let element_ir = self.types.var_type(sem.element_type());
                let element_size = self.types.size_of(element_ir);
                let count = self.lower_value(extent);
                let size = self.graph.new_const(Tarval::Int(element_size as i32));
                Some(self.lower_allocation(size, count))
            }
            ExprKind::Binary { op: BinaryOp::Assign, lhs, rhs } => {
                Some(self.lower_assignment(lhs, rhs))
            }
            ExprKind::Binary { op: BinaryOp::LogicalAnd | BinaryOp::LogicalOr, .. } => {
                Some(self.materialize_condition(expr))
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let left = self.lower_value(lhs);
                let right = self.lower_value(rhs);
                let block = self.block();
                let node = match op {
                    BinaryOp::Plus => self.graph.new_add(block, left, right, Mode::Is),
                    BinaryOp::Minus => self.graph.new_sub(block, left, right, Mode::Is),
                    BinaryOp::Multiply => self.graph.new_mul(block, left, right, Mode::Is),
                    BinaryOp::Divide | BinaryOp::Modulo => {
                        let mem = self.mem();
                        let node = if *op == BinaryOp::Divide {
                            self.graph.new_div(block, mem, left, right)
                        } else {
                            self.graph.new_mod(block, mem, left, right)
                        };
                        let mem_out = self.graph.new_proj(node, Mode::M, pn::M);
                        self.set_mem(mem_out);
                        return Some(self.graph.new_proj(node, Mode::Is, pn::RES));
                    }
                    BinaryOp::Equal => self.graph.new_cmp(block, left, right, Relation::Equal),
                    BinaryOp::NotEqual => {
                        self.graph.new_cmp(block, left, right, Relation::LessGreater)
                    }
                    BinaryOp::LessThan => self.graph.new_cmp(block, left, right, Relation::Less),
                    BinaryOp::LessEqual => {
                        self.graph.new_cmp(block, left, right, Relation::LessEqual)
                    }
                    BinaryOp::GreaterThan => {
                        self.graph.new_cmp(block, left, right, Relation::Greater)
                    }
                    BinaryOp::GreaterEqual => {
                        self.graph.new_cmp(block, left, right, Relation::GreaterEqual)
                    }
                    BinaryOp::Assign | BinaryOp::LogicalAnd | BinaryOp::LogicalOr => {
                        unreachable!("handled above")
                    }
                };
                Some(node)
            }
            ExprKind::Unary { op: UnaryOp::Minus, target } => {
                let value = self.lower_value(target);
                let block = self.block();
                Some(self.graph.new_minus(block, value, Mode::Is))
            }
            ExprKind::Unary { op: UnaryOp::LogicalNot, target } => {
                let value = self.lower_value(target);
                let block = self.block();
                let true_const = self.graph.new_const(Tarval::Bool(true));
                let false_const = self.graph.new_const(Tarval::Bool(false));
                Some(self.graph.new_mux(block, value, true_const, false_const, Mode::Bu))
            }
        }
    }

    /// Evaluates a short-circuit connective for its value: both outcomes
    /// jump to a join block whose phi selects the boolean result.
    fn materialize_condition(&mut self, expr: &Expression) -> Node {
        let (true_edges, false_edges) = self.lower_condition(expr);
        let mut preds = Vec::with_capacity(true_edges.len() + false_edges.len());
        preds.extend(&true_edges);
        preds.extend(&false_edges);
        let join = self
            .new_sealed_block(&preds)
            .expect("a condition always produces at least one outcome");
        let true_const = self.graph.new_const(Tarval::Bool(true));
        let false_const = self.graph.new_const(Tarval::Bool(false));
        let mut ins = Vec::with_capacity(preds.len());
        ins.extend(std::iter::repeat(true_const).take(true_edges.len()));
        ins.extend(std::iter::repeat(false_const).take(false_edges.len()));
        let phi = self.graph.new_phi(join, &ins, Mode::Bu);
        self.current = Some(join);
        phi
    }

    fn lower_allocation(&mut self, element_size: Node, count: Node) -> Node {
        let mem = self.mem();
        let block = self.block();
        let call =
            self.graph.new_call(block, mem, self.types.runtime.allocate, &[element_size, count]);
        let mem_out = self.graph.new_proj(call, Mode::M, pn::M);
        self.set_mem(mem_out);
        let results = self.graph.new_proj(call, Mode::T, pn::CALL_T_RESULT);
        self.graph.new_proj(results, Mode::P, 0)
    }

    fn lower_invocation(
        &mut self,
        expr: &Expression,
        target: Option<&Expression>,
        arguments: &[Expression],
    ) -> Option<Node> {
        let method_id = self.seminfo.method_annotations()[&expr.info.id];
        let callee = self.types.method_entity(method_id);

        let mut call_args = Vec::with_capacity(arguments.len() + 1);
        if callee == self.types.runtime.println {
            // System.out.println(x) goes straight to the runtime; the
            // receiver has no runtime representation and no effects
            call_args.push(self.lower_value(&arguments[0]));
        } else {
            let receiver = match target {
                Some(target) => self.lower_value(target),
                None => self.this_value.expect("unqualified calls are rejected in main"),
            };
            call_args.push(receiver);
            for argument in arguments {
                call_args.push(self.lower_value(argument));
            }
        }

        let mem = self.mem();
        let block = self.block();
        let call = self.graph.new_call(block, mem, callee, &call_args);
        let mem_out = self.graph.new_proj(call, Mode::M, pn::M);
        self.set_mem(mem_out);

        let return_mode = mode_of(self.sem_type(method_id));
        return_mode.map(|mode| {
            let results = self.graph.new_proj(call, Mode::T, pn::CALL_T_RESULT);
            self.graph.new_proj(results, mode, 0)
        })
    }

    fn lower_load(&mut self, ptr: Node, mode: Mode) -> Node {
        let mem = self.mem();
        let block = self.block();
        let load = self.graph.new_load(block, mem, ptr);
        let mem_out = self.graph.new_proj(load, Mode::M, pn::M);
        self.set_mem(mem_out);
        self.graph.new_proj(load, mode, pn::RES)
    }

    fn lower_store(&mut self, ptr: Node, value: Node) {
        let mem = self.mem();
        let block = self.block();
        let store = self.graph.new_store(block, mem, ptr, value);
        let mem_out = self.graph.new_proj(store, Mode::M, pn::M);
        self.set_mem(mem_out);
    }

    fn is_global(&self, decl: NodeId) -> bool {
        self.globals.contains(&decl)
    }

    fn lower_variable_read(&mut self, expr: &Expression) -> Node {
        let ExprKind::VariableAccess { target, .. } = &expr.kind else {
            unreachable!("caller matched a variable access");
        };
        let decl = self.seminfo.vardecl_annotations()[&expr.info.id];
        if let Some(&var) = self.vars.get(&decl) {
            let block = self.block();
            return self.ssa.use_var(self.graph, var, block);
        }
        if self.is_global(decl) {
            // the global System has no storage; its value is never used
            // beyond feeding the builtin println receiver
            return self.graph.new_const(Tarval::Null);
        }
        match self.types.field_entity(decl) {
            Some(entity) => {
                let base = match target {
                    Some(target) => self.lower_value(target),
                    None => self.this_value.expect("field reads outside main have a receiver"),
                };
                let block = self.block();
                let addr = self.graph.new_member(block, base, entity);
                let mode =
                    mode_of(self.sem_type(expr.info.id)).expect("fields are never void");
                self.lower_load(addr, mode)
            }
            // a builtin class field (System.out); no storage behind it
            None => {
                if let Some(target) = target {
                    self.lower_expression(target);
                }
                self.graph.new_const(Tarval::Null)
            }
        }
    }

    fn lower_element_address(
        &mut self,
        expr: &Expression,
        target: &Expression,
        index: &Expression,
    ) -> Node {
        let base = self.lower_value(target);
        let idx = self.lower_value(index);
        let element_sem = self.sem_type(expr.info.id);
        let element_ir = self.types.var_type(element_sem);
        let block = self.block();
        self.graph.new_sel(block, base, idx, element_ir)
    }

    /// Assignment: the address is computed before the right-hand side,
    /// locals become SSA redefinitions, everything else is a store.
    fn lower_assignment(&mut self, lhs: &Expression, rhs: &Expression) -> Node {
        match &lhs.kind {
            ExprKind::VariableAccess { target, .. } => {
                let decl = self.seminfo.vardecl_annotations()[&lhs.info.id];
                if let Some(&var) = self.vars.get(&decl) {
                    let value = self.lower_value(rhs);
                    let block = self.block();
                    self.ssa.def_var(var, block, value);
                    return value;
                }
                let entity = self
                    .types
                    .field_entity(decl)
                    .expect("assignable fields belong to user classes");
                let base = match target {
                    Some(target) => self.lower_value(target),
                    None => self.this_value.expect("field writes outside main have a receiver"),
                };
                let block = self.block();
                let addr = self.graph.new_member(block, base, entity);
                let value = self.lower_value(rhs);
                self.lower_store(addr, value);
                value
            }
            ExprKind::ArrayAccess { target, index } => {
                let addr = self.lower_element_address(lhs, target, index);
                let value = self.lower_value(rhs);
                self.lower_store(addr, value);
                value
            }
            _ => unreachable!("semantic analysis enforces lvalues"),
        }
    }
}
