//! Inputs, outputs and options of a single compiler invocation.

mod inputs;
mod outputs;

use core::fmt;

pub use self::inputs::{InputError, InputFile, SourceData, NO_MMAP_ENV};
pub use self::outputs::OutputFile;

/// How far the pipeline runs and what it emits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CompilationStage {
    /// Copy the source to the output.
    Echo,
    /// Tokenize and print one token per line.
    LexTest,
    /// Parse; succeed silently.
    ParseTest,
    /// Parse and pretty-print the AST.
    PrintAst,
    /// Run through semantic analysis.
    Check,
    /// Full pipeline: build and optimize the IR, emit its textual form.
    #[default]
    CompileFirm,
}

impl fmt::Display for CompilationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompilationStage::Echo => "echo",
            CompilationStage::LexTest => "lextest",
            CompilationStage::ParseTest => "parsetest",
            CompilationStage::PrintAst => "print-ast",
            CompilationStage::Check => "check",
            CompilationStage::CompileFirm => "compile-firm",
        };
        f.write_str(name)
    }
}

/// Options of one invocation.
#[derive(Clone, Debug)]
pub struct Options {
    pub stage: CompilationStage,
    pub output: OutputFile,
}

impl Default for Options {
    fn default() -> Self {
        Self { stage: CompilationStage::default(), output: OutputFile::Stdout }
    }
}

/// Metadata and configuration of a compilation.
#[derive(Debug)]
pub struct Session {
    pub input: InputFile,
    pub options: Options,
}

impl Session {
    pub fn new(input: InputFile, options: Options) -> Self {
        log::debug!(
            target: "session",
            "session for {} (stage {})",
            input.display_name(),
            options.stage
        );
        Self { input, options }
    }

    /// The input name used in diagnostics.
    pub fn input_name(&self) -> String {
        self.input.display_name()
    }
}
