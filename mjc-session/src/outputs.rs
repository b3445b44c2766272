//! Compiler output destinations.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::str::FromStr;

use crate::inputs::InputError;

/// Where produced text goes: standard output (`-`) or a file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputFile {
    Stdout,
    Path(PathBuf),
}

impl OutputFile {
    pub fn display_name(&self) -> String {
        match self {
            OutputFile::Stdout => "<stdout>".to_owned(),
            OutputFile::Path(path) => path.display().to_string(),
        }
    }

    /// Opens the destination for writing, truncating existing files.
    pub fn writer(&self) -> Result<Box<dyn Write>, InputError> {
        match self {
            OutputFile::Stdout => Ok(Box::new(io::stdout())),
            OutputFile::Path(path) => {
                let file = File::create(path)
                    .map_err(|error| InputError { file: self.display_name(), error })?;
                Ok(Box::new(file))
            }
        }
    }
}

impl FromStr for OutputFile {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value == "-" {
            Ok(OutputFile::Stdout)
        } else {
            Ok(OutputFile::Path(PathBuf::from(value)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stdout_marker() {
        assert_eq!(OutputFile::from_str("-").unwrap(), OutputFile::Stdout);
        assert!(matches!(OutputFile::from_str("out.s").unwrap(), OutputFile::Path(_)));
    }

    #[test]
    fn writes_to_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let output = OutputFile::Path(path.clone());
        output.writer().unwrap().write_all(b"hello").unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"hello");
    }
}
