//! Value modes of IR nodes.

use core::fmt;

/// The mode (machine-level kind) of the value a node produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Signed 32-bit integer.
    Is,
    /// Boolean byte.
    Bu,
    /// Pointer.
    P,
    /// Memory stream.
    M,
    /// Control flow.
    X,
    /// Tuple, deconstructed by `Proj` nodes.
    T,
    /// No particular mode (`Bad`, `Unknown` and friends).
    Any,
}

impl Mode {
    /// Whether values of this mode are data carried in registers.
    pub fn is_data(self) -> bool {
        matches!(self, Mode::Is | Mode::Bu | Mode::P)
    }

    /// Whether this mode uses two's-complement arithmetic.
    pub fn is_numeric(self) -> bool {
        self == Mode::Is
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Is => "Is",
            Mode::Bu => "Bu",
            Mode::P => "P",
            Mode::M => "M",
            Mode::X => "X",
            Mode::T => "T",
            Mode::Any => "Any",
        };
        f.write_str(name)
    }
}
