//! Built-in resolvers
//!
//! The engine registers four namespaces out of the box:
//!
//! - `$.name` - the invocation scope
//! - `$env[NAME]` - process environment (static)
//! - `$property[name]` - the application property bag (static)
//! - `$loop.name` - foreach loop bindings
//!
//! Custom namespaces are registered on a [`CompositeResolver`] during
//! initialization; [`default_resolver`] carries the built-ins only.

use once_cell::sync::Lazy;
use serde_json::Value;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::path;
use crate::resolve::{CompositeResolver, Resolver, ResolverInfo};
use crate::scope::{Scope, SharedScope};

/// Scope binding carrying the current foreach element
pub const LOOP_BINDING: &str = "_loop";

/// Scope binding carrying the current foreach index
pub const LOOP_INDEX: &str = "index";

/// `$.name<path>` - reads a named value from the invocation scope.
pub struct ScopeResolver;

impl Resolver for ScopeResolver {
    fn info(&self) -> ResolverInfo {
        ResolverInfo::default()
    }

    fn resolve(
        &self,
        scope: Option<&dyn Scope>,
        _item_name: &str,
        value_name: &str,
    ) -> Result<Value> {
        scope
            .and_then(|s| s.get_value(value_name))
            .ok_or_else(|| Error::ValueNotFound {
                name: value_name.to_string(),
                location: "scope".to_string(),
            })
    }
}

/// `$env[NAME]` - reads a process environment variable.
///
/// Static: resolved once when the directive is compiled.
pub struct EnvResolver;

impl Resolver for EnvResolver {
    fn info(&self) -> ResolverInfo {
        ResolverInfo {
            is_static: true,
            uses_item_format: true,
        }
    }

    fn resolve(
        &self,
        _scope: Option<&dyn Scope>,
        item_name: &str,
        value_name: &str,
    ) -> Result<Value> {
        let raw = std::env::var(item_name).map_err(|_| Error::ValueNotFound {
            name: item_name.to_string(),
            location: "env".to_string(),
        })?;
        apply_value_name(Value::String(raw), value_name)
    }
}

/// `$property[name]` - reads the application property bag.
///
/// Static: properties are installed during engine initialization, before
/// any directive is compiled.
pub struct PropertyResolver;

impl Resolver for PropertyResolver {
    fn info(&self) -> ResolverInfo {
        ResolverInfo {
            is_static: true,
            uses_item_format: true,
        }
    }

    fn resolve(
        &self,
        _scope: Option<&dyn Scope>,
        item_name: &str,
        value_name: &str,
    ) -> Result<Value> {
        let value = app_properties()
            .get_value(item_name)
            .ok_or_else(|| Error::ValueNotFound {
                name: item_name.to_string(),
                location: "property".to_string(),
            })?;
        apply_value_name(value, value_name)
    }
}

/// `$loop.name<path>` - reads the innermost foreach bindings.
///
/// A value name that matches a scope binding (the alias, `index`, or the
/// element itself) wins; otherwise the name is read as a field of the
/// current element, so both `$loop.alias.x` and `$loop.x` resolve.
pub struct LoopResolver;

impl Resolver for LoopResolver {
    fn info(&self) -> ResolverInfo {
        ResolverInfo::default()
    }

    fn resolve(
        &self,
        scope: Option<&dyn Scope>,
        _item_name: &str,
        value_name: &str,
    ) -> Result<Value> {
        let scope = scope.ok_or_else(|| Error::ValueNotFound {
            name: value_name.to_string(),
            location: "loop".to_string(),
        })?;
        if value_name.is_empty() {
            return scope
                .get_value(LOOP_BINDING)
                .ok_or_else(|| Error::ValueNotFound {
                    name: LOOP_BINDING.to_string(),
                    location: "loop".to_string(),
                });
        }
        if let Some(bound) = scope.get_value(value_name) {
            return Ok(bound);
        }
        let element = scope
            .get_value(LOOP_BINDING)
            .ok_or_else(|| Error::ValueNotFound {
                name: value_name.to_string(),
                location: "loop".to_string(),
            })?;
        path::get_value(&element, &format!(".{value_name}"))
    }
}

/// Resolve an optional value-name segment as a field of `value`.
fn apply_value_name(value: Value, value_name: &str) -> Result<Value> {
    if value_name.is_empty() {
        Ok(value)
    } else {
        path::get_value(&value, &format!(".{value_name}"))
    }
}

static APP_PROPERTIES: Lazy<SharedScope> = Lazy::new(SharedScope::new);

/// The process-wide application property bag.
///
/// Written once during engine initialization; the synchronized scope is
/// the only shared state in the core.
pub fn app_properties() -> &'static SharedScope {
    &APP_PROPERTIES
}

static DEFAULT_RESOLVER: Lazy<Arc<CompositeResolver>> = Lazy::new(|| {
    let mut composite = CompositeResolver::new();
    composite.register(".", Arc::new(ScopeResolver));
    composite.register("env", Arc::new(EnvResolver));
    composite.register("property", Arc::new(PropertyResolver));
    composite.register("loop", Arc::new(LoopResolver));
    Arc::new(composite)
});

/// The process-wide composite with the built-in namespaces registered.
pub fn default_resolver() -> Arc<CompositeResolver> {
    DEFAULT_RESOLVER.clone()
}
