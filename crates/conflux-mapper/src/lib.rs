//! Conflux Declarative Mapper
//!
//! This crate compiles nested, JSON-shaped mapping specifications into
//! executable trees and applies them to evaluation scopes:
//! - Object construction with ordered fields and `@var(...)` declarations
//! - Array iteration via `@foreach(source[, scopeName[, filterExpr]])`
//! - Conditional branching via `@conditional` and `@if`/`@elseIf`/`@else`
//! - `=`-prefixed expression values and verbatim literals
//!
//! # Example
//!
//! ```rust,ignore
//! use conflux_mapper::MapperFactory;
//! use conflux_expr::ExprFactory;
//!
//! let factory = MapperFactory::new(ExprFactory::new());
//! let mapper = factory.new_mapper(&serde_json::json!({
//!     "full": "=$.first + \" \" + $.last",
//! }))?;
//! let output = mapper.apply(&scope)?;
//! ```
//!
//! Mappings compile once at configuration time; a compiled mapper can be
//! applied concurrently as long as each caller supplies its own scope.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compile;
pub mod error;
pub mod node;

pub use compile::{Mapper, MapperFactory};
pub use error::{Error, Result};
pub use node::MappingNode;
