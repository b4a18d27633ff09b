//! Error types for conflux-mapper

use thiserror::Error;

/// Result type alias for conflux-mapper operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while compiling or applying mappings
#[derive(Error, Debug)]
pub enum Error {
    /// The mapping spec shape is invalid
    #[error("invalid mapping: {message}")]
    InvalidSpec {
        /// Description of the problem
        message: String,
    },

    /// A `@foreach(...)` header is malformed
    #[error("invalid foreach '{header}': {message}")]
    InvalidForeach {
        /// The offending key text
        header: String,
        /// Description of the problem
        message: String,
    },

    /// Expression compilation or evaluation failure
    #[error(transparent)]
    Expr(#[from] conflux_expr::Error),

    /// Coercion, path, or resolution failure
    #[error(transparent)]
    Core(#[from] conflux_core::Error),
}

impl Error {
    /// True for the "not found" error class that relaxed mapping degrades
    /// to null instead of propagating.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Expr(e) => e.is_not_found(),
            Error::Core(e) => e.is_not_found(),
            _ => false,
        }
    }
}
