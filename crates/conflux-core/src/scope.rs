//! Evaluation scopes
//!
//! A scope is the chained, parent-aware lookup context that expressions
//! and mappings are evaluated against. Scopes are created per invocation
//! and discarded afterwards; only [`SharedScope`] (process-wide state) is
//! synchronized.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

/// Trait for resolving named values during evaluation.
///
/// Lookup cascades to the parent scope on a miss; implementations decide
/// whether a parent exists.
pub trait Scope: Send + Sync {
    /// Resolve a name to its value, or `None` when unbound.
    fn get_value(&self, name: &str) -> Option<Value>;

    /// Check whether a name is bound.
    fn has(&self, name: &str) -> bool {
        self.get_value(name).is_some()
    }
}

/// A flat, map-backed scope.
#[derive(Debug, Clone, Default)]
pub struct SimpleScope {
    bindings: HashMap<String, Value>,
}

impl SimpleScope {
    /// Create an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scope from an iterator of bindings.
    pub fn from_iter(bindings: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            bindings: bindings.into_iter().collect(),
        }
    }

    /// Bind a name, replacing any existing binding.
    pub fn set_value(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// True when the scope has no bindings.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl Scope for SimpleScope {
    fn get_value(&self, name: &str) -> Option<Value> {
        self.bindings.get(name).cloned()
    }

    fn has(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }
}

/// A scope chained to a parent; local bindings shadow the parent.
///
/// Foreach loops build one of these per element to expose the loop
/// bindings without touching the caller's scope.
pub struct ChildScope<'a> {
    parent: &'a dyn Scope,
    local: HashMap<String, Value>,
}

impl<'a> ChildScope<'a> {
    /// Create a child of `parent` with no local bindings.
    pub fn new(parent: &'a dyn Scope) -> Self {
        Self {
            parent,
            local: HashMap::new(),
        }
    }

    /// Builder-style local binding.
    pub fn with_binding(mut self, name: impl Into<String>, value: Value) -> Self {
        self.local.insert(name.into(), value);
        self
    }

    /// Bind a name locally, shadowing the parent.
    pub fn set_value(&mut self, name: impl Into<String>, value: Value) {
        self.local.insert(name.into(), value);
    }
}

impl Scope for ChildScope<'_> {
    fn get_value(&self, name: &str) -> Option<Value> {
        self.local
            .get(name)
            .cloned()
            .or_else(|| self.parent.get_value(name))
    }

    fn has(&self, name: &str) -> bool {
        self.local.contains_key(name) || self.parent.has(name)
    }
}

/// A synchronized scope for process-wide shared state.
///
/// Reads take the lock briefly and clone out the value; writes go through
/// `&self`, so a single instance can back a global.
#[derive(Debug, Default)]
pub struct SharedScope {
    bindings: RwLock<HashMap<String, Value>>,
}

impl SharedScope {
    /// Create an empty shared scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a name, replacing any existing binding.
    pub fn set_value(&self, name: impl Into<String>, value: Value) {
        self.bindings
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(name.into(), value);
    }

    /// Remove a binding.
    pub fn remove(&self, name: &str) -> Option<Value> {
        self.bindings
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(name)
    }
}

impl Scope for SharedScope {
    fn get_value(&self, name: &str) -> Option<Value> {
        self.bindings
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
            .cloned()
    }
}

impl<T: Scope + ?Sized> Scope for &T {
    fn get_value(&self, name: &str) -> Option<Value> {
        (**self).get_value(name)
    }

    fn has(&self, name: &str) -> bool {
        (**self).has(name)
    }
}

impl<T: Scope> Scope for Box<T> {
    fn get_value(&self, name: &str) -> Option<Value> {
        (**self).get_value(name)
    }

    fn has(&self, name: &str) -> bool {
        (**self).has(name)
    }
}
