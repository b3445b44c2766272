//! Compiler input files.

use std::fs::File;
use std::io::{self, Read};
use std::ops::Deref;
use std::path::PathBuf;
use std::str::FromStr;

/// Environment variable forcing stream I/O instead of memory mapping.
pub const NO_MMAP_ENV: &str = "MINIJAVA_NO_MMAP";

/// An input to compile: a file path or standard input (`-`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputFile {
    Stdin,
    Path(PathBuf),
}

impl InputFile {
    /// The name used in diagnostics.
    pub fn display_name(&self) -> String {
        match self {
            InputFile::Stdin => "<stdin>".to_owned(),
            InputFile::Path(path) => path.display().to_string(),
        }
    }

    /// Loads the source text.
    ///
    /// Regular files are memory-mapped when possible; pipes, stdin, and
    /// runs with `MINIJAVA_NO_MMAP` set fall back to stream I/O. Both
    /// paths report the same error kind.
    pub fn read(&self) -> Result<SourceData, InputError> {
        let fail = |error: io::Error| InputError { file: self.display_name(), error };
        match self {
            InputFile::Stdin => {
                let mut buffer = Vec::new();
                io::stdin().read_to_end(&mut buffer).map_err(fail)?;
                Ok(SourceData::Buffered(buffer))
            }
            InputFile::Path(path) => {
                let mut file = File::open(path).map_err(fail)?;
                let use_mmap = std::env::var_os(NO_MMAP_ENV)
                    .map(|value| value.is_empty())
                    .unwrap_or(true);
                if use_mmap {
                    // mapping fails for irregular files; fall through to
                    // plain reads then
                    if let Ok(map) = unsafe { memmap2::Mmap::map(&file) } {
                        log::debug!(target: "session", "mapped {}", self.display_name());
                        return Ok(SourceData::Mapped(map));
                    }
                }
                let mut buffer = Vec::new();
                file.read_to_end(&mut buffer).map_err(fail)?;
                Ok(SourceData::Buffered(buffer))
            }
        }
    }
}

impl FromStr for InputFile {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value == "-" {
            Ok(InputFile::Stdin)
        } else {
            Ok(InputFile::Path(PathBuf::from(value)))
        }
    }
}

/// Loaded source text, exposed as an immutable byte slice.
#[derive(Debug)]
pub enum SourceData {
    Mapped(memmap2::Mmap),
    Buffered(Vec<u8>),
}

impl Deref for SourceData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            SourceData::Mapped(map) => map,
            SourceData::Buffered(buffer) => buffer,
        }
    }
}

/// An input could not be read; carries the OS error.
#[derive(Debug, thiserror::Error)]
#[error("{file}: {error}")]
pub struct InputError {
    pub file: String,
    #[source]
    pub error: io::Error,
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_stdin_marker() {
        assert_eq!(InputFile::from_str("-").unwrap(), InputFile::Stdin);
        assert_eq!(
            InputFile::from_str("foo.java").unwrap(),
            InputFile::Path(PathBuf::from("foo.java"))
        );
    }

    #[test]
    fn reads_regular_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"class A { }").unwrap();
        file.flush().unwrap();
        let input = InputFile::Path(file.path().to_path_buf());
        let data = input.read().unwrap();
        assert_eq!(&*data, b"class A { }");
    }

    #[test]
    fn missing_files_report_the_os_error() {
        let input = InputFile::Path(PathBuf::from("/nonexistent/some.java"));
        let err = input.read().unwrap_err();
        assert_eq!(err.error.kind(), io::ErrorKind::NotFound);
        assert!(err.to_string().contains("some.java"));
    }
}
