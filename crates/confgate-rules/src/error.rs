//! Evaluation errors.
//!
//! These are distinct from policy violations: they mean a rule could not be
//! evaluated against a document. Undefined references are never errors.

use thiserror::Error;

/// A rule could not be evaluated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// An operator was applied to operands of incompatible types.
    #[error("type error: cannot apply `{op}` to {left} and {right}")]
    Operands {
        /// Operator symbol.
        op: &'static str,
        /// Type name of the left operand.
        left: &'static str,
        /// Type name of the right operand.
        right: &'static str,
    },

    /// Unary minus applied to a non-number.
    #[error("type error: cannot negate {0}")]
    Negate(&'static str),

    /// `/` or `%` with a zero divisor.
    #[error("division by zero")]
    DivisionByZero,

    /// A builtin rejected its arguments.
    #[error("{function}: {message}")]
    Builtin {
        /// Builtin name.
        function: String,
        /// What was wrong with the arguments.
        message: String,
    },
}
