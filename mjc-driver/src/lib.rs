//! The `mjc` command-line surface.

use std::ffi::OsString;

use anyhow::anyhow;
use clap::{ArgGroup, Parser};
use mjc_compile::{compile, CompileError, Context};
use mjc_session::{CompilationStage, InputFile, Options, OutputFile, Session};

/// A compiler for the MiniJava language.
#[derive(Debug, Parser)]
#[command(name = "mjc")]
#[command(author, version, about = "A compiler for the MiniJava language", long_about = None)]
#[command(group = ArgGroup::new("stage").multiple(false))]
pub struct Mjc {
    /// The input file to compile; `-` reads from stdin.
    #[arg(value_name = "FILE", default_value = "-")]
    input: InputFile,

    /// Copy the source to the output.
    #[arg(long, group = "stage")]
    echo: bool,

    /// Tokenize and print one token per line.
    #[arg(long, group = "stage")]
    lextest: bool,

    /// Parse; exit successfully when the input is syntactically valid.
    #[arg(long, group = "stage")]
    parsetest: bool,

    /// Parse and pretty-print the program.
    #[arg(long = "print-ast", group = "stage")]
    print_ast: bool,

    /// Run up to and including semantic analysis.
    #[arg(long, group = "stage")]
    check: bool,

    /// Run the full pipeline and emit the optimized intermediate
    /// representation.
    #[arg(long = "compile-firm", group = "stage")]
    compile_firm: bool,

    /// Output destination; `-` writes to stdout.
    #[arg(short = 'o', value_name = "FILE", default_value = "-")]
    output: OutputFile,
}

impl Mjc {
    fn stage(&self) -> CompilationStage {
        if self.echo {
            CompilationStage::Echo
        } else if self.lextest {
            CompilationStage::LexTest
        } else if self.parsetest {
            CompilationStage::ParseTest
        } else if self.print_ast {
            CompilationStage::PrintAst
        } else if self.check {
            CompilationStage::Check
        } else {
            CompilationStage::CompileFirm
        }
    }

    /// Parses `args` and runs the selected pipeline. Usage errors, `--help`
    /// and `--version` exit directly; the returned error is already
    /// rendered for stderr.
    pub fn run<A>(args: A) -> anyhow::Result<()>
    where
        A: IntoIterator<Item = OsString>,
    {
        let cli = Self::parse_from(args);
        let session = Session::new(
            cli.input.clone(),
            Options { stage: cli.stage(), output: cli.output.clone() },
        );
        let context = Context::new(session);
        compile(&context).map_err(|err| anyhow!(render_error(&context, &err)))
    }
}

/// `error: <file>:<line>:<column>: <message>`, position permitting.
fn render_error(context: &Context, err: &CompileError) -> String {
    let file = context.session.input_name();
    match err.position() {
        Some(position) => {
            format!("error: {}:{}:{}: {}", file, position.line(), position.column(), err)
        }
        None => format!("error: {file}: {err}"),
    }
}
