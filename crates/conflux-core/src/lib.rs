//! Conflux Core Library
//!
//! This crate provides the foundation the Conflux engine is built on:
//! - Canonical data types and value coercion
//! - Path navigation over nested JSON values
//! - Evaluation scopes (chained, parent-aware lookup contexts)
//! - The resolver framework that turns `$resolver[item].value` directives
//!   into values
//! - Process-wide engine settings
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Directive  │────▶│  Resolver   │────▶│    Path     │
//! │  ($.a.b)    │     │  Framework  │     │  Navigator  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            │
//!                            ▼
//!                     ┌─────────────┐
//!                     │    Scope    │
//!                     └─────────────┘
//! ```
//!
//! All runtime values are `serde_json::Value`; struct-like inputs must be
//! serialized into keyed JSON objects before they reach this crate.
//!
//! # Example
//!
//! ```rust,ignore
//! use conflux_core::{SimpleScope, resolvers};
//!
//! let mut scope = SimpleScope::new();
//! scope.set_value("name", serde_json::json!("orders"));
//! let value = resolvers::default_resolver().resolve("$.name", &scope)?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coerce;
pub mod error;
pub mod path;
pub mod resolve;
pub mod resolvers;
pub mod scope;
pub mod settings;
pub mod types;

pub use error::{Error, Result};
pub use resolve::{CompositeResolver, Resolution, Resolver, ResolverInfo};
pub use scope::{ChildScope, Scope, SharedScope, SimpleScope};
pub use settings::EngineSettings;
pub use types::DataType;
