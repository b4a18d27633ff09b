//! Resolver framework
//!
//! A resolver binds a symbolic namespace (`env`, `property`, `loop`, `.`)
//! to a value lookup. The [`CompositeResolver`] owns the namespace
//! registry, parses resolve directives of the form
//! `$resolverName[itemName].valueName<path>`, and produces
//! [`Resolution`]s - compiled lookups that can be evaluated against a
//! [`Scope`] many times.
//!
//! Directives for static resolvers (resolvable without a scope) are
//! resolved once at compile time and cached; everything else re-reads the
//! scope on every access.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::path;
use crate::scope::Scope;

/// Default dereference marker prefixing resolve directives
pub const DEFAULT_MARKER: char = '$';

/// Capability flags a resolver advertises
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverInfo {
    /// Resolvable without a scope; resolved once and cached
    pub is_static: bool,

    /// Directive requires `name[item]` bracket syntax before an optional
    /// `.valueName`
    pub uses_item_format: bool,
}

/// A named value source
pub trait Resolver: Send + Sync {
    /// Capability flags used during directive parsing and caching
    fn info(&self) -> ResolverInfo;

    /// Resolve `item_name`/`value_name` to a value.
    ///
    /// Static resolvers are invoked with `scope == None`.
    fn resolve(
        &self,
        scope: Option<&dyn Scope>,
        item_name: &str,
        value_name: &str,
    ) -> Result<Value>;
}

/// Parsed pieces of a resolve directive (after the resolver name)
#[derive(Debug, Clone, PartialEq, Eq)]
struct DirectiveParts {
    item_name: String,
    value_name: String,
    path: String,
}

/// A compiled resolve directive.
///
/// Immutable once created; safe to evaluate concurrently.
#[derive(Clone)]
pub enum Resolution {
    /// Resolved at compile time; scope-independent
    Static {
        /// The cached value
        value: Value,
    },
    /// Re-resolved against the scope on every access
    Dynamic {
        /// Resolver performing the lookup
        resolver: Arc<dyn Resolver>,
        /// Bracket-enclosed item name, or empty
        item_name: String,
        /// Named value, or empty
        value_name: String,
        /// Trailing navigation path, or empty
        path: String,
    },
}

impl Resolution {
    /// True when the resolution was computed at compile time.
    pub fn is_static(&self) -> bool {
        matches!(self, Resolution::Static { .. })
    }

    /// Evaluate the resolution against `scope`.
    ///
    /// Static resolutions return their cached value for any scope.
    pub fn get_value(&self, scope: &dyn Scope) -> Result<Value> {
        match self {
            Resolution::Static { value } => Ok(value.clone()),
            Resolution::Dynamic {
                resolver,
                item_name,
                value_name,
                path,
            } => {
                let base = resolver.resolve(Some(scope), item_name, value_name)?;
                if path.is_empty() {
                    Ok(base)
                } else {
                    path::get_value(&base, path)
                }
            }
        }
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Static { value } => {
                f.debug_struct("Static").field("value", value).finish()
            }
            Resolution::Dynamic {
                item_name,
                value_name,
                path,
                ..
            } => f
                .debug_struct("Dynamic")
                .field("item_name", item_name)
                .field("value_name", value_name)
                .field("path", path)
                .finish_non_exhaustive(),
        }
    }
}

/// Registry of named resolvers composed into one addressing scheme
pub struct CompositeResolver {
    marker: char,
    resolvers: HashMap<String, Arc<dyn Resolver>>,
}

impl Default for CompositeResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeResolver {
    /// Create an empty composite using the default `$` marker.
    pub fn new() -> Self {
        Self::with_marker(DEFAULT_MARKER)
    }

    /// Create an empty composite with a custom dereference marker.
    pub fn with_marker(marker: char) -> Self {
        Self {
            marker,
            resolvers: HashMap::new(),
        }
    }

    /// Register a resolver under its namespace.
    ///
    /// Registration happens during initialization, before any evaluation
    /// traffic; later registrations replace earlier ones.
    pub fn register(&mut self, name: impl Into<String>, resolver: Arc<dyn Resolver>) {
        self.resolvers.insert(name.into(), resolver);
    }

    /// Look up a registered resolver.
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Resolver>> {
        self.resolvers.get(name).cloned()
    }

    /// Resolve a directive against `scope` in one step.
    pub fn resolve(&self, directive: &str, scope: &dyn Scope) -> Result<Value> {
        let Some(body) = directive.strip_prefix(self.marker) else {
            // no dereference marker: the whole string is a direct scope lookup
            return scope
                .get_value(directive)
                .ok_or_else(|| Error::ValueNotFound {
                    name: directive.to_string(),
                    location: "scope".to_string(),
                });
        };
        let (resolver, parts) = self.parse(directive, body)?;
        debug!(directive, "resolving directive");
        let base = resolver.resolve(Some(scope), &parts.item_name, &parts.value_name)?;
        if parts.path.is_empty() {
            Ok(base)
        } else {
            path::get_value(&base, &parts.path)
        }
    }

    /// Compile a directive into a [`Resolution`] without a scope.
    ///
    /// Static resolvers are resolved immediately and cached; everything
    /// else yields a lazy resolution.
    pub fn get_resolution(&self, directive: &str) -> Result<Resolution> {
        let Some(body) = directive.strip_prefix(self.marker) else {
            // no marker: compile to a lazy direct scope lookup
            let resolver = self.lookup(".").ok_or_else(|| Error::InvalidDirective {
                directive: directive.to_string(),
                message: "no scope resolver registered for direct lookups".to_string(),
            })?;
            return Ok(Resolution::Dynamic {
                resolver,
                item_name: String::new(),
                value_name: directive.to_string(),
                path: String::new(),
            });
        };
        let (resolver, parts) = self.parse(directive, body)?;
        if resolver.info().is_static {
            let base = resolver.resolve(None, &parts.item_name, &parts.value_name)?;
            let value = if parts.path.is_empty() {
                base
            } else {
                path::get_value(&base, &parts.path)?
            };
            debug!(directive, "cached static resolution");
            Ok(Resolution::Static { value })
        } else {
            Ok(Resolution::Dynamic {
                resolver,
                item_name: parts.item_name,
                value_name: parts.value_name,
                path: parts.path,
            })
        }
    }

    /// Split a marker-stripped directive body into its resolver and parts.
    fn parse(&self, directive: &str, body: &str) -> Result<(Arc<dyn Resolver>, DirectiveParts)> {
        let name_end = body.find(['.', '[']).unwrap_or(body.len());
        let name = if name_end == 0 { "." } else { &body[..name_end] };
        let resolver = self.lookup(name).ok_or_else(|| Error::ResolverNotFound {
            name: name.to_string(),
        })?;
        let rest = if name_end == 0 && body.starts_with('.') {
            // scope shortcut: the '.' is both the name and the separator
            &body[1..]
        } else {
            &body[name_end..]
        };
        let parts = parse_parts(directive, rest, resolver.info())?;
        Ok((resolver, parts))
    }
}

/// Parse `{item, value, path}` from the text following the resolver name.
fn parse_parts(directive: &str, rest: &str, info: ResolverInfo) -> Result<DirectiveParts> {
    let mut rest = rest;
    let item_name = if info.uses_item_format {
        let inner = rest
            .strip_prefix('[')
            .ok_or_else(|| Error::InvalidDirective {
                directive: directive.to_string(),
                message: "resolver requires [item] syntax".to_string(),
            })?;
        let close = inner.find(']').ok_or_else(|| Error::InvalidDirective {
            directive: directive.to_string(),
            message: "unterminated [item] bracket".to_string(),
        })?;
        let item = inner[..close].to_string();
        rest = &inner[close + 1..];
        item
    } else {
        String::new()
    };

    let body = rest.strip_prefix('.').unwrap_or(rest);
    let value_end = body.find(['.', '[']).unwrap_or(body.len());
    Ok(DirectiveParts {
        item_name,
        value_name: body[..value_end].to_string(),
        path: body[value_end..].to_string(),
    })
}

/// Grammar guard: does this string parse as a pure resolve directive?
///
/// Strings that carry bare operators, quotes, or unmatched brackets
/// outside a nested indexer are rejected so they fall through to the
/// expression evaluator instead of being misparsed as a reference.
pub fn is_resolve_expr(s: &str) -> bool {
    let Some(body) = s.strip_prefix(DEFAULT_MARKER) else {
        return false;
    };
    if body.is_empty() {
        return false;
    }
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in body.chars() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => {
                if depth == 0 {
                    return false;
                }
                quote = Some(c);
            }
            '[' => depth += 1,
            ']' => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            _ if depth > 0 => {}
            c if c.is_alphanumeric() || c == '_' || c == '.' => {}
            _ => return false,
        }
    }
    depth == 0 && quote.is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::SimpleScope;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Static item-format resolver over a fixed configuration bag.
    struct BagResolver {
        calls: AtomicUsize,
    }

    impl Resolver for BagResolver {
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
            self.calls.fetch_add(1, Ordering::SeqCst);
            let bag = json!({"cfg": {"endpoint": "https://api", "port": 8080}});
            let item = bag.get(item_name).ok_or_else(|| Error::ValueNotFound {
                name: item_name.to_string(),
                location: "bag".to_string(),
            })?;
            if value_name.is_empty() {
                return Ok(item.clone());
            }
            item.get(value_name)
                .cloned()
                .ok_or_else(|| Error::ValueNotFound {
                    name: value_name.to_string(),
                    location: "bag".to_string(),
                })
        }
    }

    /// Dynamic resolver reading the value name straight from the scope.
    struct EchoResolver {
        calls: AtomicUsize,
    }

    impl Resolver for EchoResolver {
        fn info(&self) -> ResolverInfo {
            ResolverInfo::default()
        }

        fn resolve(
            &self,
            scope: Option<&dyn Scope>,
            _item_name: &str,
            value_name: &str,
        ) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let scope = scope.ok_or_else(|| Error::ValueNotFound {
                name: value_name.to_string(),
                location: "test".to_string(),
            })?;
            scope
                .get_value(value_name)
                .ok_or_else(|| Error::ValueNotFound {
                    name: value_name.to_string(),
                    location: "test".to_string(),
                })
        }
    }

    fn composite() -> (CompositeResolver, Arc<BagResolver>, Arc<EchoResolver>) {
        let fixed = Arc::new(BagResolver {
            calls: AtomicUsize::new(0),
        });
        let dynamic = Arc::new(EchoResolver {
            calls: AtomicUsize::new(0),
        });
        let mut composite = CompositeResolver::new();
        composite.register("fixed", fixed.clone());
        composite.register("dyn", dynamic.clone());
        (composite, fixed, dynamic)
    }

    #[test]
    fn test_unknown_resolver_errors() {
        let (composite, _, _) = composite();
        let scope = SimpleScope::new();
        let err = composite.resolve("$nope.x", &scope).unwrap_err();
        assert!(err.to_string().contains("unable to find resolver"));
    }

    #[test]
    fn test_item_format_is_enforced() {
        let (composite, _, _) = composite();
        let err = composite.get_resolution("$fixed.x").unwrap_err();
        assert!(matches!(err, Error::InvalidDirective { .. }));
    }

    #[test]
    fn test_directive_parsing_item_value_path() {
        let (composite, _, _) = composite();
        let scope = SimpleScope::new();
        let value = composite.resolve("$fixed[cfg]", &scope).unwrap();
        assert_eq!(value, json!({"endpoint": "https://api", "port": 8080}));

        let value = composite.resolve("$fixed[cfg].port", &scope).unwrap();
        assert_eq!(value, json!(8080));

        let err = composite.resolve("$fixed[missing]", &scope).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_dynamic_resolution_with_trailing_path() {
        let (composite, _, _) = composite();
        let mut scope = SimpleScope::new();
        scope.set_value("order", json!({"items": [{"sku": "a-1"}]}));
        let value = composite.resolve("$dyn.order.items[0].sku", &scope).unwrap();
        assert_eq!(value, json!("a-1"));
    }

    #[test]
    fn test_static_resolution_is_cached_and_scope_independent() {
        let (composite, fixed, _) = composite();
        let resolution = composite.get_resolution("$fixed[cfg].endpoint").unwrap();
        assert!(resolution.is_static());
        assert_eq!(fixed.calls.load(Ordering::SeqCst), 1);

        let scope_a = SimpleScope::from_iter([("x".to_string(), json!(1))]);
        let scope_b = SimpleScope::new();
        assert_eq!(resolution.get_value(&scope_a).unwrap(), json!("https://api"));
        assert_eq!(resolution.get_value(&scope_b).unwrap(), json!("https://api"));
        // no further resolver calls after compile time
        assert_eq!(fixed.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dynamic_resolution_rereads_scope() {
        let (composite, _, dynamic) = composite();
        let resolution = composite.get_resolution("$dyn.x").unwrap();
        assert!(!resolution.is_static());
        assert_eq!(dynamic.calls.load(Ordering::SeqCst), 0);

        let scope_a = SimpleScope::from_iter([("x".to_string(), json!(1))]);
        let scope_b = SimpleScope::from_iter([("x".to_string(), json!(2))]);
        assert_eq!(resolution.get_value(&scope_a).unwrap(), json!(1));
        assert_eq!(resolution.get_value(&scope_b).unwrap(), json!(2));
        assert_eq!(dynamic.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_markerless_directive_is_direct_scope_lookup() {
        let (composite, _, _) = composite();
        let mut scope = SimpleScope::new();
        scope.set_value("plain", json!("value"));
        assert_eq!(composite.resolve("plain", &scope).unwrap(), json!("value"));
        assert!(composite.resolve("absent", &scope).is_err());
    }

    #[test]
    fn test_is_resolve_expr_accepts_directives() {
        assert!(is_resolve_expr("$.first"));
        assert!(is_resolve_expr("$env[HOME]"));
        assert!(is_resolve_expr("$loop.it.x"));
        assert!(is_resolve_expr("$.items[0].sku"));
        assert!(is_resolve_expr("$.rows[\"col name\"]"));
        assert!(is_resolve_expr("$.rows[`$.a.b`]"));
        // computed indexer: still a reference
        assert!(is_resolve_expr("$.items[$.idx]"));
    }

    #[test]
    fn test_is_resolve_expr_rejects_expressions() {
        assert!(!is_resolve_expr("1 + 2"));
        assert!(!is_resolve_expr("$.a > 5"));
        assert!(!is_resolve_expr("$.a + $.b"));
        assert!(!is_resolve_expr("$.a['unterminated"));
        assert!(!is_resolve_expr("$.a]"));
        assert!(!is_resolve_expr("$.name == \"x\""));
        assert!(!is_resolve_expr("$"));
    }
}
