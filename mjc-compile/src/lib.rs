//! The staged compilation pipeline.
//!
//! Wires the frontend, semantic analysis, IR construction and the
//! optimizer into the stage sequence selected on the command line. Errors
//! from all stages funnel into [CompileError], which keeps the source
//! position for rendering `error: <file>:<line>:<column>: <message>`.

mod stage;

use std::cell::RefCell;
use std::io::Write;

use mjc_frontend::{
    parse_program, AstFactory, LexicalError, Position, Program, SyntaxError,
};
use mjc_irbuild::{GlobalIrState, IrTypes, StateError};
use mjc_opt::Optimizer;
use mjc_semantic::{SemanticError, SemanticInfo};
use mjc_session::{CompilationStage, InputError, Session, SourceData};
use mjc_symbol::SymbolPool;

pub use self::stage::{Chain, Stage};

/// Any failure of the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Lexical(#[from] LexicalError),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Semantic(#[from] SemanticError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CompileError {
    /// The source position, for errors that have one.
    pub fn position(&self) -> Option<Position> {
        match self {
            CompileError::Lexical(err) => Some(err.position),
            CompileError::Syntax(err) => Some(err.position),
            CompileError::Semantic(err) => Some(err.position),
            CompileError::Input(_) | CompileError::State(_) | CompileError::Io(_) => None,
        }
    }
}

impl From<mjc_frontend::ParseError> for CompileError {
    fn from(err: mjc_frontend::ParseError) -> Self {
        match err {
            mjc_frontend::ParseError::Lexical(err) => CompileError::Lexical(err),
            mjc_frontend::ParseError::Syntax(err) => CompileError::Syntax(err),
        }
    }
}

/// Shared state of one pipeline run.
pub struct Context {
    pub session: Session,
    pool: RefCell<SymbolPool>,
    factory: RefCell<AstFactory>,
}

impl Context {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            pool: RefCell::new(SymbolPool::new()),
            factory: RefCell::new(AstFactory::default()),
        }
    }
}

// Individual stages.

/// Reads the source text of the session input.
struct LoadSource;

impl Stage for LoadSource {
    type Input = ();
    type Output = SourceData;

    fn name(&self) -> &'static str {
        "load"
    }

    fn run(&mut self, _input: (), context: &Context) -> Result<SourceData, CompileError> {
        Ok(context.session.input.read()?)
    }
}

/// Parses the source into an AST.
struct Parse;

impl Stage for Parse {
    type Input = SourceData;
    type Output = Program;

    fn name(&self) -> &'static str {
        "parse"
    }

    fn run(&mut self, source: SourceData, context: &Context) -> Result<Program, CompileError> {
        let mut pool = context.pool.borrow_mut();
        let mut factory = context.factory.borrow_mut();
        let lexer = mjc_frontend::Lexer::new(&source, &mut pool);
        Ok(parse_program(lexer, &mut factory)?)
    }
}

/// Runs the semantic analysis.
struct Check;

impl Stage for Check {
    type Input = Program;
    type Output = (Program, SemanticInfo);

    fn name(&self) -> &'static str {
        "check"
    }

    fn run(
        &mut self,
        ast: Program,
        context: &Context,
    ) -> Result<(Program, SemanticInfo), CompileError> {
        let pool = context.pool.borrow();
        let mut factory = context.factory.borrow_mut();
        let info = mjc_semantic::check_program(&ast, &pool, &mut factory)?;
        Ok((ast, info))
    }
}

/// Lowers the checked AST into the IR; owns the global IR state for the
/// rest of the compilation.
struct BuildIr {
    state: GlobalIrState,
}

impl Stage for BuildIr {
    type Input = (Program, SemanticInfo);
    type Output = (mjc_ir::Program, IrTypes);

    fn name(&self) -> &'static str {
        "irbuild"
    }

    fn run(
        &mut self,
        (ast, info): (Program, SemanticInfo),
        context: &Context,
    ) -> Result<(mjc_ir::Program, IrTypes), CompileError> {
        let pool = context.pool.borrow();
        Ok(mjc_irbuild::build_ir(&self.state, &ast, &info, &pool))
    }
}

/// Runs the optimization pipeline to its fixpoint.
struct Optimize;

impl Stage for Optimize {
    type Input = (mjc_ir::Program, IrTypes);
    type Output = mjc_ir::Program;

    fn name(&self) -> &'static str {
        "optimize"
    }

    fn run(
        &mut self,
        (mut program, _types): (mjc_ir::Program, IrTypes),
        _context: &Context,
    ) -> Result<mjc_ir::Program, CompileError> {
        Optimizer::with_all_passes().run(&mut program);
        Ok(program)
    }
}

/// Writes the textual IR; the seam where the assembly backend would
/// attach.
struct EmitIr;

impl Stage for EmitIr {
    type Input = mjc_ir::Program;
    type Output = ();

    fn name(&self) -> &'static str {
        "emit"
    }

    fn run(&mut self, program: mjc_ir::Program, context: &Context) -> Result<(), CompileError> {
        let mut out = context.session.options.output.writer()?;
        out.write_all(mjc_ir::dump_program(&program).as_bytes())?;
        Ok(())
    }
}

/// Runs the stage sequence selected by the session options.
pub fn compile(context: &Context) -> Result<(), CompileError> {
    let stage = context.session.options.stage;
    let source = LoadSource.run((), context)?;
    match stage {
        CompilationStage::Echo => {
            let mut out = context.session.options.output.writer()?;
            out.write_all(&source)?;
            Ok(())
        }
        CompilationStage::LexTest => {
            let mut pool = context.pool.borrow_mut();
            let mut lexer = mjc_frontend::Lexer::new(&source, &mut pool);
            let mut out = context.session.options.output.writer()?;
            mjc_frontend::serialize_tokens(&mut lexer, &mut out).map_err(|err| match err {
                mjc_frontend::SerializeError::Lexical(err) => CompileError::Lexical(err),
                mjc_frontend::SerializeError::Io(err) => CompileError::Io(err),
            })
        }
        CompilationStage::ParseTest => {
            Parse.run(source, context)?;
            Ok(())
        }
        CompilationStage::PrintAst => {
            let ast = Parse.run(source, context)?;
            let pool = context.pool.borrow();
            let mut out = context.session.options.output.writer()?;
            out.write_all(mjc_frontend::pretty_print(&ast, &pool).as_bytes())?;
            Ok(())
        }
        CompilationStage::Check => {
            Parse.next(Check).run(source, context)?;
            Ok(())
        }
        CompilationStage::CompileFirm => {
            let state = GlobalIrState::initialize()?;
            Parse
                .next(Check)
                .next(BuildIr { state })
                .next(Optimize)
                .next(EmitIr)
                .run(source, context)
        }
    }
}
