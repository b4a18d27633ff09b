//! Error types for conflux-core

use thiserror::Error;

use crate::types::DataType;

/// Result type alias for conflux-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in conflux-core
#[derive(Error, Debug)]
pub enum Error {
    /// Value cannot be converted to the requested canonical type
    #[error("unable to coerce {value} to type {target}")]
    Coercion {
        /// Display form of the offending value
        value: String,
        /// Target canonical type
        target: DataType,
    },

    /// The named canonical type does not exist
    #[error("unknown data type '{name}'")]
    UnknownType {
        /// The unrecognized type name
        name: String,
    },

    /// A path segment did not resolve to an existing key or field
    #[error("path not found: {path}")]
    PathNotFound {
        /// The path segment(s) that failed to resolve
        path: String,
    },

    /// An index segment was applied to a non-array value
    #[error("value at '{path}' is not an array")]
    NotAnArray {
        /// Path of the non-array value
        path: String,
    },

    /// An index segment could not be parsed as a number
    #[error("invalid index '{index}'")]
    InvalidIndex {
        /// The malformed index text
        index: String,
    },

    /// An index segment was outside the bounds of the array
    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Length of the array
        len: usize,
    },

    /// A malformed directive or path was rejected at compile time
    #[error("invalid directive '{directive}': {message}")]
    InvalidDirective {
        /// The directive text
        directive: String,
        /// Description of the problem
        message: String,
    },

    /// The directive names a resolver that is not registered
    #[error("unable to find resolver '{name}'")]
    ResolverNotFound {
        /// Resolver namespace
        name: String,
    },

    /// A resolver could not find the named item or value
    #[error("value '{name}' not found in {location}")]
    ValueNotFound {
        /// The item or value name that was looked up
        name: String,
        /// Where the lookup happened (resolver namespace or "scope")
        location: String,
    },

    /// Failed to parse YAML settings
    #[error("failed to parse settings: {0}")]
    SettingsParse(#[from] serde_yaml::Error),
}

impl Error {
    /// True for the "not found" error class.
    ///
    /// Callers such as `isDefined` and the skip-missing toggle are allowed
    /// to swallow these; structural errors (bad index, wrong container
    /// shape, coercion failures) always propagate.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::PathNotFound { .. }
                | Error::ValueNotFound { .. }
                | Error::IndexOutOfRange { .. }
        )
    }
}
