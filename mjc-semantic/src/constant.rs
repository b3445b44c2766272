//! Compile-time evaluation of constant integer expressions.
//!
//! Arithmetic is signed 32-bit two's complement with wrap-around, matching
//! the target semantics. Division and modulo by zero produce no value so
//! that the offending node keeps its runtime behavior.

use mjc_frontend::BinaryOp;

/// Converts an integer literal lexeme into its value. `negative` is set for
/// literals the parser folded a unary minus into; only then is `2147483648`
/// in range.
pub fn parse_literal(lexeme: &str, negative: bool) -> Option<i32> {
    let magnitude: u64 = lexeme.parse().ok()?;
    if negative {
        if magnitude > 1 << 31 {
            return None;
        }
        Some((magnitude as i64).wrapping_neg() as i32)
    } else {
        i32::try_from(magnitude).ok()
    }
}

/// Folds a binary operation over two constant operands. Returns `None` for
/// operators that never fold (assignment, logical connectives) and for
/// division or modulo by zero.
pub fn fold_binary(op: BinaryOp, lhs: i32, rhs: i32) -> Option<i32> {
    let value = match op {
        BinaryOp::Plus => lhs.wrapping_add(rhs),
        BinaryOp::Minus => lhs.wrapping_sub(rhs),
        BinaryOp::Multiply => lhs.wrapping_mul(rhs),
        BinaryOp::Divide => {
            if rhs == 0 {
                return None;
            }
            lhs.wrapping_div(rhs)
        }
        BinaryOp::Modulo => {
            if rhs == 0 {
                return None;
            }
            lhs.wrapping_rem(rhs)
        }
        BinaryOp::Equal => (lhs == rhs) as i32,
        BinaryOp::NotEqual => (lhs != rhs) as i32,
        BinaryOp::LessThan => (lhs < rhs) as i32,
        BinaryOp::LessEqual => (lhs <= rhs) as i32,
        BinaryOp::GreaterThan => (lhs > rhs) as i32,
        BinaryOp::GreaterEqual => (lhs >= rhs) as i32,
        BinaryOp::Assign | BinaryOp::LogicalAnd | BinaryOp::LogicalOr => return None,
    };
    Some(value)
}

/// Folds unary minus with wrap-around: `-(-2147483648)` is `-2147483648`.
pub fn fold_minus(value: i32) -> i32 {
    value.wrapping_neg()
}
