//! Token stream serialization for `--lextest`.

use std::io::{self, Write};

use crate::lexer::{Lexer, LexicalError};
use crate::token::{Token, TokenKind};

/// Failure while serializing a token stream.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error(transparent)]
    Lexical(#[from] LexicalError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Writes one line per token: `identifier <name>`, `integer literal <value>`,
/// the spelling for keywords and punctuation, and a final `EOF`.
pub fn serialize_tokens(
    lexer: &mut Lexer<'_, '_>,
    out: &mut dyn Write,
) -> Result<(), SerializeError> {
    loop {
        let token = lexer.next_token()?;
        write_token(&token, lexer, out)?;
        if token.is_eof() {
            return Ok(());
        }
    }
}

fn write_token(
    token: &Token,
    lexer: &Lexer<'_, '_>,
    out: &mut dyn Write,
) -> io::Result<()> {
    match token.kind {
        TokenKind::Identifier | TokenKind::IntegerLiteral => {
            let lexeme = token.lexeme.expect("identifier and literal tokens carry a lexeme");
            writeln!(out, "{} {}", token.kind.name(), lexer.pool().resolve(lexeme))
        }
        kind => writeln!(out, "{}", kind.name()),
    }
}

#[cfg(test)]
mod tests {
    use mjc_symbol::SymbolPool;
    use pretty_assertions::assert_eq;

    use super::*;

    fn lextest(src: &str) -> String {
        let mut pool = SymbolPool::new();
        let mut lexer = Lexer::new(src.as_bytes(), &mut pool);
        let mut out = Vec::new();
        serialize_tokens(&mut lexer, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn serializes_one_token_per_line() {
        let out = lextest("class Foo { int x0; }");
        assert_eq!(out, "class\nidentifier Foo\n{\nint\nidentifier x0\n;\n}\nEOF\n");
    }

    #[test]
    fn hello_world_tail() {
        let out = lextest(
            "class MiniJava { public static void main(String[] args) { \
             System.out.println(42); } }",
        );
        assert!(out.ends_with("integer literal 42\n)\n;\n}\n}\nEOF\n"));
    }

    #[test]
    fn literal_values_are_not_converted() {
        // 2147483648 overflows i32 but lexes fine; the value is kept verbatim
        let out = lextest("2147483648");
        assert_eq!(out, "integer literal 2147483648\nEOF\n");
    }
}
