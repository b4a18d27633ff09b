//! Error types for conflux-expr

use thiserror::Error;

/// Result type alias for conflux-expr operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while compiling or evaluating expressions
#[derive(Error, Debug)]
pub enum Error {
    /// The expression source failed to lex or parse
    #[error("parse error at offset {position}: {message}")]
    Parse {
        /// Character offset of the problem
        position: usize,
        /// Description of the problem
        message: String,
    },

    /// A called function is not present in the registry at compile time
    #[error("unknown function '{name}'")]
    UnknownFunction {
        /// The unresolved function name
        name: String,
    },

    /// A function name was registered twice
    #[error("function '{name}' is already registered")]
    DuplicateFunction {
        /// The conflicting name
        name: String,
    },

    /// A binary operator was applied to operand types it does not support
    #[error("operator '{op}' not defined for {left} and {right}")]
    InvalidOperands {
        /// Operator symbol
        op: String,
        /// Runtime type of the left operand
        left: String,
        /// Runtime type of the right operand
        right: String,
    },

    /// A unary operator was applied to an unsupported operand
    #[error("unary '{op}' not defined for {operand}")]
    InvalidUnaryOperand {
        /// Operator symbol
        op: String,
        /// Runtime type of the operand
        operand: String,
    },

    /// Integer division or modulo by zero
    #[error("division by zero")]
    DivisionByZero,

    /// Integer arithmetic overflowed
    #[error("integer overflow in '{op}'")]
    Overflow {
        /// Operator symbol
        op: String,
    },

    /// A registered function failed, or was invoked with a bad arity
    #[error("function '{name}' failed: {message}")]
    Function {
        /// Function name
        name: String,
        /// Failure description
        message: String,
    },

    /// Underlying coercion, path, or resolution failure
    #[error(transparent)]
    Core(#[from] conflux_core::Error),
}

impl Error {
    /// True for the "not found" error class swallowed by `isDefined` and
    /// `getValue`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Core(e) if e.is_not_found())
    }
}
