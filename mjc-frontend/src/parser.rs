//! Recursive-descent parser for MiniJava.
//!
//! Statements and declarations are parsed by plain recursive descent;
//! expressions use precedence climbing. The parser needs bounded lookahead
//! (at most two tokens past the current one) to tell local variable
//! declarations from expression statements and to fold `[]` suffixes of
//! `new` array expressions; there is no backtracking.

use std::collections::VecDeque;
use std::fmt;

use mjc_symbol::Symbol;

use crate::ast::*;
use crate::ast_factory::AstFactory;
use crate::lexer::{Lexer, LexicalError};
use crate::position::Position;
use crate::token::{Token, TokenKind};

/// An unexpected token, with the set of kinds that would have been accepted.
#[derive(Clone, Debug)]
pub struct SyntaxError {
    pub position: Position,
    pub expected: Vec<TokenKind>,
    pub actual: TokenKind,
}

impl std::error::Error for SyntaxError {}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.expected.as_slice() {
            [] => write!(f, "unexpected {}", describe(self.actual)),
            [single] => {
                write!(f, "expected {}, found {}", describe(*single), describe(self.actual))
            }
            expected => {
                f.write_str("expected one of ")?;
                for (i, kind) in expected.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(&describe(*kind))?;
                }
                write!(f, "; found {}", describe(self.actual))
            }
        }
    }
}

fn describe(kind: TokenKind) -> String {
    use crate::token::TokenCategory::*;
    match kind.category() {
        Identifier | Literal | Synthetic => kind.name().to_owned(),
        Keyword | Punctuation => format!("`{}`", kind.name()),
    }
}

/// Errors the parser can stop with: its own, or one from the lexer below.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Lexical(#[from] LexicalError),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
}

impl ParseError {
    pub fn position(&self) -> Position {
        match self {
            ParseError::Lexical(err) => err.position,
            ParseError::Syntax(err) => err.position,
        }
    }
}

/// Parses a whole program from `lexer`, building nodes through `factory`.
pub fn parse_program(
    lexer: Lexer<'_, '_>,
    factory: &mut AstFactory,
) -> Result<Program, ParseError> {
    Parser::new(lexer, factory)?.parse_program()
}

struct Parser<'src, 'pool, 'f> {
    lexer: Lexer<'src, 'pool>,
    factory: &'f mut AstFactory,
    current: Token,
    lookahead: VecDeque<Token>,
}

impl<'src, 'pool, 'f> Parser<'src, 'pool, 'f> {
    fn new(
        mut lexer: Lexer<'src, 'pool>,
        factory: &'f mut AstFactory,
    ) -> Result<Self, ParseError> {
        let current = lexer.next_token()?;
        Ok(Self { lexer, factory, current, lookahead: VecDeque::new() })
    }

    fn info(&mut self, position: Position) -> NodeInfo {
        self.factory.make(position)
    }

    /// The `n`-th token after the current one (`n >= 1`).
    fn peek(&mut self, n: usize) -> Result<&Token, ParseError> {
        debug_assert!(n >= 1);
        while self.lookahead.len() < n {
            let token = self.lexer.next_token()?;
            self.lookahead.push_back(token);
        }
        Ok(&self.lookahead[n - 1])
    }

    fn bump(&mut self) -> Result<Token, ParseError> {
        let next = match self.lookahead.pop_front() {
            Some(token) => token,
            None => self.lexer.next_token()?,
        };
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn error(&self, expected: Vec<TokenKind>) -> SyntaxError {
        SyntaxError {
            position: self.current.position,
            expected,
            actual: self.current.kind,
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.at(kind) {
            self.bump()
        } else {
            Err(self.error(vec![kind]).into())
        }
    }

    fn accept(&mut self, kind: TokenKind) -> Result<bool, ParseError> {
        if self.at(kind) {
            self.bump()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect_identifier(&mut self) -> Result<(Symbol, Position), ParseError> {
        let token = self.expect(TokenKind::Identifier)?;
        Ok((token.lexeme.expect("identifier tokens carry a lexeme"), token.position))
    }

    // Program := ClassDeclaration* EOF

    fn parse_program(mut self) -> Result<Program, ParseError> {
        let position = self.current.position;
        let mut classes = Vec::new();
        while !self.at(TokenKind::Eof) {
            if !self.at(TokenKind::Class) {
                return Err(self.error(vec![TokenKind::Class, TokenKind::Eof]).into());
            }
            classes.push(self.parse_class()?);
        }
        let info = self.info(position);
        log::debug!(target: "parser", "parsed {} classes, {} nodes", classes.len(), self.factory.id());
        Ok(Program { info, classes })
    }

    // ClassDeclaration := `class` IDENT `{` ClassMember* `}`

    fn parse_class(&mut self) -> Result<ClassDeclaration, ParseError> {
        let class_token = self.expect(TokenKind::Class)?;
        let (name, _) = self.expect_identifier()?;
        self.expect(TokenKind::LeftBrace)?;
        let mut fields = Vec::new();
        let mut instance_methods = Vec::new();
        let mut main_methods = Vec::new();
        while !self.accept(TokenKind::RightBrace)? {
            if !self.at(TokenKind::Public) {
                return Err(self.error(vec![TokenKind::Public, TokenKind::RightBrace]).into());
            }
            self.parse_class_member(&mut fields, &mut instance_methods, &mut main_methods)?;
        }
        let info = self.info(class_token.position);
        Ok(ClassDeclaration { info, name, fields, instance_methods, main_methods })
    }

    // ClassMember := `public` (MainMethod | Field | Method)

    fn parse_class_member(
        &mut self,
        fields: &mut Vec<VarDecl>,
        instance_methods: &mut Vec<InstanceMethod>,
        main_methods: &mut Vec<MainMethod>,
    ) -> Result<(), ParseError> {
        let public_token = self.expect(TokenKind::Public)?;
        if self.at(TokenKind::Static) {
            main_methods.push(self.parse_main_method(public_token.position)?);
            return Ok(());
        }
        let member_type = self.parse_type()?;
        let (name, _) = self.expect_identifier()?;
        if self.accept(TokenKind::Semicolon)? {
            let info = self.info(member_type.info.position);
            fields.push(VarDecl { info, var_type: member_type, name });
        } else if self.at(TokenKind::LeftParen) {
            instance_methods.push(self.parse_instance_method(
                public_token.position,
                member_type,
                name,
            )?);
        } else {
            return Err(self.error(vec![TokenKind::Semicolon, TokenKind::LeftParen]).into());
        }
        Ok(())
    }

    // MainMethod := `static` `void` IDENT `(` Type IDENT `)` MethodRest? Block

    fn parse_main_method(&mut self, position: Position) -> Result<MainMethod, ParseError> {
        self.expect(TokenKind::Static)?;
        self.expect(TokenKind::Void)?;
        let (name, _) = self.expect_identifier()?;
        self.expect(TokenKind::LeftParen)?;
        let argv_type = self.parse_type()?;
        let (argv_name, _) = self.expect_identifier()?;
        let argv_info = self.info(argv_type.info.position);
        let argv = VarDecl { info: argv_info, var_type: argv_type, name: argv_name };
        self.expect(TokenKind::RightParen)?;
        self.parse_method_rest()?;
        let body = self.parse_block()?;
        let info = self.info(position);
        Ok(MainMethod { info, name, argv, body })
    }

    // Method := Type IDENT `(` Parameters? `)` MethodRest? Block

    fn parse_instance_method(
        &mut self,
        position: Position,
        return_type: Type,
        name: Symbol,
    ) -> Result<InstanceMethod, ParseError> {
        self.expect(TokenKind::LeftParen)?;
        let mut parameters = Vec::new();
        if !self.at(TokenKind::RightParen) {
            loop {
                parameters.push(self.parse_parameter()?);
                if !self.accept(TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen)?;
        self.parse_method_rest()?;
        let body = self.parse_block()?;
        let info = self.info(position);
        Ok(InstanceMethod { info, return_type, name, parameters, body })
    }

    // MethodRest := `throws` IDENT
    //
    // Accepted and discarded; MiniJava has no exceptions.
    fn parse_method_rest(&mut self) -> Result<(), ParseError> {
        if self.accept(TokenKind::Throws)? {
            self.expect_identifier()?;
        }
        Ok(())
    }

    fn parse_parameter(&mut self) -> Result<VarDecl, ParseError> {
        let var_type = self.parse_type()?;
        let (name, _) = self.expect_identifier()?;
        let info = self.info(var_type.info.position);
        Ok(VarDecl { info, var_type, name })
    }

    // Type := BasicType (`[` `]`)*

    fn parse_type(&mut self) -> Result<Type, ParseError> {
        let (name, position) = self.parse_basic_type()?;
        let mut rank = 0;
        while self.accept(TokenKind::LeftBracket)? {
            self.expect(TokenKind::RightBracket)?;
            rank += 1;
        }
        let info = self.info(position);
        Ok(Type { info, name, rank })
    }

    fn parse_basic_type(&mut self) -> Result<(BasicTypeName, Position), ParseError> {
        let name = match self.current.kind {
            TokenKind::Int => BasicTypeName::Int,
            TokenKind::Boolean => BasicTypeName::Boolean,
            TokenKind::Void => BasicTypeName::Void,
            TokenKind::Identifier => {
                BasicTypeName::Class(self.current.lexeme.expect("identifier lexeme"))
            }
            _ => {
                return Err(self
                    .error(vec![
                        TokenKind::Int,
                        TokenKind::Boolean,
                        TokenKind::Void,
                        TokenKind::Identifier,
                    ])
                    .into())
            }
        };
        let token = self.bump()?;
        Ok((name, token.position))
    }

    // Block := `{` BlockStatement* `}`

    fn parse_block(&mut self) -> Result<Block, ParseError> {
        let open = self.expect(TokenKind::LeftBrace)?;
        let mut statements = Vec::new();
        while !self.accept(TokenKind::RightBrace)? {
            statements.push(self.parse_block_statement()?);
        }
        let info = self.info(open.position);
        Ok(Block { info, statements })
    }

    // BlockStatement := LocalVariableDeclarationStatement | Statement
    //
    // A statement starting with `int`, `boolean` or `void` is always a
    // declaration. For a leading identifier the next one or two tokens
    // decide: `IDENT IDENT` and `IDENT [ ]` open declarations, everything
    // else is an expression statement.
    fn parse_block_statement(&mut self) -> Result<Statement, ParseError> {
        let is_declaration = match self.current.kind {
            TokenKind::Int | TokenKind::Boolean | TokenKind::Void => true,
            TokenKind::Identifier => match self.peek(1)?.kind {
                TokenKind::Identifier => true,
                TokenKind::LeftBracket => self.peek(2)?.kind == TokenKind::RightBracket,
                _ => false,
            },
            _ => false,
        };
        if is_declaration {
            self.parse_local_variable_statement()
        } else {
            self.parse_statement()
        }
    }

    fn parse_local_variable_statement(&mut self) -> Result<Statement, ParseError> {
        let var_type = self.parse_type()?;
        let position = var_type.info.position;
        let (name, _) = self.expect_identifier()?;
        let decl_info = self.info(position);
        let decl = VarDecl { info: decl_info, var_type, name };
        let initial_value =
            if self.accept(TokenKind::Assign)? { Some(self.parse_expression()?) } else { None };
        self.expect(TokenKind::Semicolon)?;
        let info = self.info(position);
        Ok(Statement { info, kind: StmtKind::LocalVariable { decl, initial_value } })
    }

    // Statement := Block | `;` | IfStatement | WhileStatement
    //            | ReturnStatement | ExpressionStatement

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        match self.current.kind {
            TokenKind::LeftBrace => {
                let block = self.parse_block()?;
                let position = block.info.position;
                let info = self.info(position);
                Ok(Statement { info, kind: StmtKind::Block(block) })
            }
            TokenKind::Semicolon => {
                let token = self.bump()?;
                let info = self.info(token.position);
                Ok(Statement { info, kind: StmtKind::Empty })
            }
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::Return => self.parse_return_statement(),
            _ => {
                let expression = self.parse_expression()?;
                let position = expression.info.position;
                self.expect(TokenKind::Semicolon)?;
                let info = self.info(position);
                Ok(Statement { info, kind: StmtKind::Expression(expression) })
            }
        }
    }

    fn parse_if_statement(&mut self) -> Result<Statement, ParseError> {
        let if_token = self.expect(TokenKind::If)?;
        self.expect(TokenKind::LeftParen)?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RightParen)?;
        let then_statement = Box::new(self.parse_statement()?);
        let else_statement = if self.accept(TokenKind::Else)? {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        let info = self.info(if_token.position);
        Ok(Statement { info, kind: StmtKind::If { condition, then_statement, else_statement } })
    }

    fn parse_while_statement(&mut self) -> Result<Statement, ParseError> {
        let while_token = self.expect(TokenKind::While)?;
        self.expect(TokenKind::LeftParen)?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RightParen)?;
        let body = Box::new(self.parse_statement()?);
        let info = self.info(while_token.position);
        Ok(Statement { info, kind: StmtKind::While { condition, body } })
    }

    fn parse_return_statement(&mut self) -> Result<Statement, ParseError> {
        let return_token = self.expect(TokenKind::Return)?;
        let value =
            if self.at(TokenKind::Semicolon) { None } else { Some(self.parse_expression()?) };
        self.expect(TokenKind::Semicolon)?;
        let info = self.info(return_token.position);
        Ok(Statement { info, kind: StmtKind::Return(value) })
    }

    // Expressions, by precedence climbing.

    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        self.parse_binary_expression(1)
    }

    fn parse_binary_expression(&mut self, min_precedence: u8) -> Result<Expression, ParseError> {
        let mut lhs = self.parse_unary_expression()?;
        while let Some((op, precedence)) = binary_operator(self.current.kind) {
            if precedence < min_precedence {
                break;
            }
            self.bump()?;
            // assignment is the only right-associative binary operator
            let next_min = if op == BinaryOp::Assign { precedence } else { precedence + 1 };
            let rhs = self.parse_binary_expression(next_min)?;
            let info = self.info(lhs.info.position);
            lhs = Expression {
                info,
                kind: ExprKind::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) },
            };
        }
        Ok(lhs)
    }

    fn parse_unary_expression(&mut self) -> Result<Expression, ParseError> {
        match self.current.kind {
            TokenKind::Not => {
                let token = self.bump()?;
                let target = self.parse_unary_expression()?;
                let info = self.info(token.position);
                Ok(Expression {
                    info,
                    kind: ExprKind::Unary { op: UnaryOp::LogicalNot, target: Box::new(target) },
                })
            }
            TokenKind::Minus => {
                let token = self.bump()?;
                // `-` directly before an integer literal becomes one
                // negative-tagged constant; `-2147483648` has no other parse
                if self.at(TokenKind::IntegerLiteral) {
                    let literal_token = self.bump()?;
                    let literal = literal_token.lexeme.expect("literal lexeme");
                    let info = self.info(token.position);
                    let constant = Expression {
                        info,
                        kind: ExprKind::IntegerConstant { literal, negative: true },
                    };
                    return self.parse_postfix_ops(constant);
                }
                let target = self.parse_unary_expression()?;
                let info = self.info(token.position);
                Ok(Expression {
                    info,
                    kind: ExprKind::Unary { op: UnaryOp::Minus, target: Box::new(target) },
                })
            }
            _ => self.parse_postfix_expression(),
        }
    }

    // PostfixExpression := PrimaryExpression (`.` IDENT (`(` Arguments `)`)? | `[` Expression `]`)*

    fn parse_postfix_expression(&mut self) -> Result<Expression, ParseError> {
        let primary = self.parse_primary_expression()?;
        self.parse_postfix_ops(primary)
    }

    fn parse_postfix_ops(&mut self, mut expr: Expression) -> Result<Expression, ParseError> {
        loop {
            let position = expr.info.position;
            if self.accept(TokenKind::Dot)? {
                let (name, _) = self.expect_identifier()?;
                if self.at(TokenKind::LeftParen) {
                    let arguments = self.parse_arguments()?;
                    let info = self.info(position);
                    expr = Expression {
                        info,
                        kind: ExprKind::MethodInvocation {
                            target: Some(Box::new(expr)),
                            name,
                            arguments,
                        },
                    };
                } else {
                    let info = self.info(position);
                    expr = Expression {
                        info,
                        kind: ExprKind::VariableAccess { target: Some(Box::new(expr)), name },
                    };
                }
            } else if self.accept(TokenKind::LeftBracket)? {
                let index = self.parse_expression()?;
                self.expect(TokenKind::RightBracket)?;
                let info = self.info(position);
                expr = Expression {
                    info,
                    kind: ExprKind::ArrayAccess {
                        target: Box::new(expr),
                        index: Box::new(index),
                    },
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expression>, ParseError> {
        self.expect(TokenKind::LeftParen)?;
        let mut arguments = Vec::new();
        if !self.at(TokenKind::RightParen) {
            loop {
                arguments.push(self.parse_expression()?);
                if !self.accept(TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen)?;
        Ok(arguments)
    }

    fn parse_primary_expression(&mut self) -> Result<Expression, ParseError> {
        match self.current.kind {
            TokenKind::Null => {
                let token = self.bump()?;
                let info = self.info(token.position);
                Ok(Expression { info, kind: ExprKind::NullConstant })
            }
            TokenKind::True | TokenKind::False => {
                let token = self.bump()?;
                let info = self.info(token.position);
                let value = token.kind == TokenKind::True;
                Ok(Expression { info, kind: ExprKind::BooleanConstant { value } })
            }
            TokenKind::IntegerLiteral => {
                let token = self.bump()?;
                let literal = token.lexeme.expect("literal lexeme");
                let info = self.info(token.position);
                Ok(Expression { info, kind: ExprKind::IntegerConstant { literal, negative: false } })
            }
            TokenKind::This => {
                let token = self.bump()?;
                let info = self.info(token.position);
                Ok(Expression { info, kind: ExprKind::ThisRef })
            }
            TokenKind::Identifier => {
                let (name, position) = self.expect_identifier()?;
                if self.at(TokenKind::LeftParen) {
                    let arguments = self.parse_arguments()?;
                    let info = self.info(position);
                    Ok(Expression {
                        info,
                        kind: ExprKind::MethodInvocation { target: None, name, arguments },
                    })
                } else {
                    let info = self.info(position);
                    Ok(Expression { info, kind: ExprKind::VariableAccess { target: None, name } })
                }
            }
            TokenKind::LeftParen => {
                self.bump()?;
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RightParen)?;
                Ok(inner)
            }
            TokenKind::New => self.parse_new_expression(),
            _ => Err(self
                .error(vec![
                    TokenKind::Null,
                    TokenKind::False,
                    TokenKind::True,
                    TokenKind::IntegerLiteral,
                    TokenKind::Identifier,
                    TokenKind::This,
                    TokenKind::LeftParen,
                    TokenKind::New,
                    TokenKind::Minus,
                    TokenKind::Not,
                ])
                .into()),
        }
    }

    // NewObjectExpression := `new` IDENT `(` `)`
    // NewArrayExpression  := `new` BasicType `[` Expression `]` (`[` `]`)*

    fn parse_new_expression(&mut self) -> Result<Expression, ParseError> {
        let new_token = self.expect(TokenKind::New)?;
        if self.at(TokenKind::Identifier) && self.peek(1)?.kind == TokenKind::LeftParen {
            let (class_name, _) = self.expect_identifier()?;
            self.expect(TokenKind::LeftParen)?;
            self.expect(TokenKind::RightParen)?;
            let info = self.info(new_token.position);
            return Ok(Expression { info, kind: ExprKind::ObjectInstantiation { class_name } });
        }
        let (name, type_position) = self.parse_basic_type()?;
        self.expect(TokenKind::LeftBracket)?;
        let extent = self.parse_expression()?;
        self.expect(TokenKind::RightBracket)?;
        let mut rank = 1;
        // a trailing `[` only belongs to the type if a `]` follows;
        // otherwise it is an array access on the new expression
        while self.at(TokenKind::LeftBracket) && self.peek(1)?.kind == TokenKind::RightBracket {
            self.bump()?;
            self.bump()?;
            rank += 1;
        }
        let type_info = self.info(type_position);
        let array_type = Type { info: type_info, name, rank };
        let info = self.info(new_token.position);
        Ok(Expression {
            info,
            kind: ExprKind::ArrayInstantiation { array_type, extent: Box::new(extent) },
        })
    }
}

/// Binary operator and precedence for a token, if it is one. Higher binds
/// tighter; level 1 (`=`) is right-associative.
fn binary_operator(kind: TokenKind) -> Option<(BinaryOp, u8)> {
    let entry = match kind {
        TokenKind::Assign => (BinaryOp::Assign, 1),
        TokenKind::LogicalOr => (BinaryOp::LogicalOr, 2),
        TokenKind::LogicalAnd => (BinaryOp::LogicalAnd, 3),
        TokenKind::Equal => (BinaryOp::Equal, 4),
        TokenKind::NotEqual => (BinaryOp::NotEqual, 4),
        TokenKind::LessThan => (BinaryOp::LessThan, 5),
        TokenKind::LessEqual => (BinaryOp::LessEqual, 5),
        TokenKind::GreaterThan => (BinaryOp::GreaterThan, 5),
        TokenKind::GreaterEqual => (BinaryOp::GreaterEqual, 5),
        TokenKind::Plus => (BinaryOp::Plus, 6),
        TokenKind::Minus => (BinaryOp::Minus, 6),
        TokenKind::Multiply => (BinaryOp::Multiply, 7),
        TokenKind::Divide => (BinaryOp::Divide, 7),
        TokenKind::Modulo => (BinaryOp::Modulo, 7),
        _ => return None,
    };
    Some(entry)
}

#[cfg(test)]
mod tests {
    use mjc_symbol::SymbolPool;

    use super::*;

    fn parse(src: &str) -> Result<Program, ParseError> {
        let mut pool = SymbolPool::new();
        let mut factory = AstFactory::default();
        let lexer = Lexer::new(src.as_bytes(), &mut pool);
        parse_program(lexer, &mut factory)
    }

    fn first_statement(program: &Program) -> &Statement {
        let class = &program.classes[0];
        let body = if let Some(main) = class.main_methods.first() {
            &main.body
        } else {
            &class.instance_methods[0].body
        };
        &body.statements[0]
    }

    fn parse_stmt(stmt: &str) -> Program {
        let src =
            format!("class T {{ public static void main(String[] args) {{ {stmt} }} }}");
        parse(&src).unwrap()
    }

    #[test]
    fn accepts_hello_world() {
        let program = parse(
            "class MiniJava { public static void main(String[] args) { \
             System.out.println(42); } }",
        )
        .unwrap();
        assert_eq!(program.classes.len(), 1);
        assert_eq!(program.classes[0].main_methods.len(), 1);
    }

    #[test]
    fn precedence_mul_binds_tighter_than_add() {
        let program = parse_stmt("int x = 1 + 2 * 3;");
        let stmt = first_statement(&program);
        let StmtKind::LocalVariable { initial_value: Some(init), .. } = &stmt.kind else {
            panic!("expected local variable statement");
        };
        let ExprKind::Binary { op: BinaryOp::Plus, rhs, .. } = &init.kind else {
            panic!("expected addition at the root, got {:?}", init.kind);
        };
        assert!(matches!(rhs.kind, ExprKind::Binary { op: BinaryOp::Multiply, .. }));
    }

    #[test]
    fn assignment_is_right_associative() {
        let program = parse_stmt("a = b = c;");
        let stmt = first_statement(&program);
        let StmtKind::Expression(expr) = &stmt.kind else { panic!() };
        let ExprKind::Binary { op: BinaryOp::Assign, lhs, rhs } = &expr.kind else {
            panic!("expected assignment at the root");
        };
        assert!(matches!(lhs.kind, ExprKind::VariableAccess { .. }));
        assert!(matches!(rhs.kind, ExprKind::Binary { op: BinaryOp::Assign, .. }));
    }

    #[test]
    fn comparison_is_left_associative() {
        // (1 < 2) == true is ill-typed later, but parses fine
        let program = parse_stmt("boolean b = 1 < 2 == true;");
        let stmt = first_statement(&program);
        let StmtKind::LocalVariable { initial_value: Some(init), .. } = &stmt.kind else {
            panic!()
        };
        let ExprKind::Binary { op: BinaryOp::Equal, lhs, .. } = &init.kind else {
            panic!("expected `==` at the root");
        };
        assert!(matches!(lhs.kind, ExprKind::Binary { op: BinaryOp::LessThan, .. }));
    }

    #[test]
    fn negative_literal_is_folded() {
        let program = parse_stmt("int x = -2147483648;");
        let stmt = first_statement(&program);
        let StmtKind::LocalVariable { initial_value: Some(init), .. } = &stmt.kind else {
            panic!()
        };
        assert!(matches!(init.kind, ExprKind::IntegerConstant { negative: true, .. }));
    }

    #[test]
    fn parenthesized_literal_is_not_folded() {
        let program = parse_stmt("int x = -(5);");
        let stmt = first_statement(&program);
        let StmtKind::LocalVariable { initial_value: Some(init), .. } = &stmt.kind else {
            panic!()
        };
        let ExprKind::Unary { op: UnaryOp::Minus, target } = &init.kind else {
            panic!("expected unary minus, got {:?}", init.kind);
        };
        assert!(matches!(target.kind, ExprKind::IntegerConstant { negative: false, .. }));
    }

    #[test]
    fn folded_negative_literal_may_be_indexed() {
        // weird but grammatical: (-1)[0]
        let program = parse_stmt("int x = -1[0];");
        let stmt = first_statement(&program);
        let StmtKind::LocalVariable { initial_value: Some(init), .. } = &stmt.kind else {
            panic!()
        };
        assert!(matches!(init.kind, ExprKind::ArrayAccess { .. }));
    }

    #[test]
    fn local_declaration_lookahead() {
        let program = parse_stmt("Foo bar;");
        assert!(matches!(
            first_statement(&program).kind,
            StmtKind::LocalVariable { initial_value: None, .. }
        ));

        let program = parse_stmt("Foo[] bar;");
        let StmtKind::LocalVariable { decl, .. } = &first_statement(&program).kind else {
            panic!()
        };
        assert_eq!(decl.var_type.rank, 1);

        // `foo[0] = 1;` is an expression statement, not a declaration
        let program = parse_stmt("foo[0] = 1;");
        assert!(matches!(first_statement(&program).kind, StmtKind::Expression(_)));
    }

    #[test]
    fn new_array_rank_suffixes() {
        let program = parse_stmt("int[][][] a = new int[5][][];");
        let StmtKind::LocalVariable { decl, initial_value: Some(init) } =
            &first_statement(&program).kind
        else {
            panic!()
        };
        assert_eq!(decl.var_type.rank, 3);
        let ExprKind::ArrayInstantiation { array_type, .. } = &init.kind else { panic!() };
        assert_eq!(array_type.rank, 3);

        // `new int[5][0]` is an array access on a rank-1 instantiation
        let program = parse_stmt("int x = new int[5][0];");
        let StmtKind::LocalVariable { initial_value: Some(init), .. } =
            &first_statement(&program).kind
        else {
            panic!()
        };
        assert!(matches!(init.kind, ExprKind::ArrayAccess { .. }));
    }

    #[test]
    fn postfix_chains() {
        let program = parse_stmt("a.b.c(1, 2)[3].d = 0;");
        let StmtKind::Expression(expr) = &first_statement(&program).kind else { panic!() };
        let ExprKind::Binary { op: BinaryOp::Assign, lhs, .. } = &expr.kind else { panic!() };
        let ExprKind::VariableAccess { target: Some(target), .. } = &lhs.kind else {
            panic!("expected field access on the left");
        };
        assert!(matches!(target.kind, ExprKind::ArrayAccess { .. }));
    }

    #[test]
    fn rejects_non_minijava_operators() {
        let err = parse_stmt_err("int x = 1 << 2;");
        assert!(matches!(err, ParseError::Syntax(_)));
        let err = parse_stmt_err("x++;");
        assert!(matches!(err, ParseError::Syntax(_)));
    }

    fn parse_stmt_err(stmt: &str) -> ParseError {
        let src =
            format!("class T {{ public static void main(String[] args) {{ {stmt} }} }}");
        parse(&src).unwrap_err()
    }

    #[test]
    fn error_carries_position_and_expectation() {
        let err = parse("class A {").unwrap_err();
        let ParseError::Syntax(err) = err else { panic!("expected syntax error") };
        assert_eq!(err.actual, TokenKind::Eof);
        assert!(err.expected.contains(&TokenKind::Public));
        assert!(err.expected.contains(&TokenKind::RightBrace));
        assert_eq!(err.position, Position::new(1, 10));
    }

    #[test]
    fn lexical_errors_pass_through() {
        let err = parse("class A { public int x §; }").unwrap_err();
        assert!(matches!(err, ParseError::Lexical(_)));
    }

    #[test]
    fn node_ids_are_dense() {
        let mut pool = SymbolPool::new();
        let mut factory = AstFactory::default();
        let lexer = Lexer::new(
            b"class A { public int f(int x) { while (x > 0) x = x - 1; return x; } }",
            &mut pool,
        );
        let program = parse_program(lexer, &mut factory).unwrap();

        struct IdCollector(Vec<u64>);
        impl crate::visit::Visitor for IdCollector {
            fn visit_type(&mut self, node: &Type) {
                self.0.push(node.info.id);
            }
            fn visit_var_decl(&mut self, node: &VarDecl) {
                self.0.push(node.info.id);
                crate::visit::walk_var_decl(self, node);
            }
            fn visit_class(&mut self, node: &ClassDeclaration) {
                self.0.push(node.info.id);
                crate::visit::walk_class(self, node);
            }
            fn visit_instance_method(&mut self, node: &InstanceMethod) {
                self.0.push(node.info.id);
                crate::visit::walk_instance_method(self, node);
            }
            fn visit_main_method(&mut self, node: &MainMethod) {
                self.0.push(node.info.id);
                crate::visit::walk_main_method(self, node);
            }
            fn visit_block(&mut self, node: &Block) {
                self.0.push(node.info.id);
                crate::visit::walk_block(self, node);
            }
            fn visit_statement(&mut self, node: &Statement) {
                self.0.push(node.info.id);
                crate::visit::walk_statement(self, node);
            }
            fn visit_expression(&mut self, node: &Expression) {
                self.0.push(node.info.id);
                crate::visit::walk_expression(self, node);
            }
            fn visit_program(&mut self, node: &Program) {
                self.0.push(node.info.id);
                crate::visit::walk_program(self, node);
            }
        }

        let mut collector = IdCollector(Vec::new());
        crate::visit::Visitor::visit_program(&mut collector, &program);
        let mut ids = collector.0;
        ids.sort_unstable();
        let expected: Vec<u64> = (1..=factory.id()).collect();
        assert_eq!(ids, expected, "node IDs must cover 1..=N exactly once");
    }
}
