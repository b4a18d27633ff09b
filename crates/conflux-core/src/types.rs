//! Canonical data types
//!
//! Every value moving through the engine is described by one of these
//! canonical types. Conversions between them live in [`crate::coerce`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Canonical type of a runtime value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Any value; coercion is the identity
    Any,
    /// UTF-8 string
    String,
    /// Signed integer (platform width, handled as 64-bit)
    Int,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 32-bit float
    Float32,
    /// 64-bit float
    Float64,
    /// Boolean
    Bool,
    /// Raw byte sequence
    Bytes,
    /// Date/time instant
    DateTime,
    /// Keyed object
    Object,
    /// Ordered array
    Array,
    /// String-to-string parameter map
    Params,
    /// Keyed map with arbitrary values
    Map,
    /// Connection configuration handle
    Connection,
}

impl DataType {
    /// Canonical lowercase name of the type
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Any => "any",
            DataType::String => "string",
            DataType::Int => "int",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
            DataType::Bool => "bool",
            DataType::Bytes => "bytes",
            DataType::DateTime => "datetime",
            DataType::Object => "object",
            DataType::Array => "array",
            DataType::Params => "params",
            DataType::Map => "map",
            DataType::Connection => "connection",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "any" => Ok(DataType::Any),
            "string" => Ok(DataType::String),
            "int" | "integer" => Ok(DataType::Int),
            "int32" => Ok(DataType::Int32),
            "int64" | "long" => Ok(DataType::Int64),
            "float32" => Ok(DataType::Float32),
            "float64" | "double" => Ok(DataType::Float64),
            "bool" | "boolean" => Ok(DataType::Bool),
            "bytes" => Ok(DataType::Bytes),
            "datetime" => Ok(DataType::DateTime),
            "object" => Ok(DataType::Object),
            "array" => Ok(DataType::Array),
            "params" => Ok(DataType::Params),
            "map" => Ok(DataType::Map),
            "connection" => Ok(DataType::Connection),
            _ => Err(Error::UnknownType {
                name: s.to_string(),
            }),
        }
    }
}
