//! Mapping compilation
//!
//! Compiles JSON-shaped mapping specs into executable [`MappingNode`]
//! trees. Compilation dispatches on spec shape:
//!
//! - keyed object → object node (or foreach/conditional/if-else when a
//!   special-prefixed key says so)
//! - native sequence → literal array node
//! - string starting with `=` → expression node
//! - any other scalar → verbatim literal
//!
//! All grammar problems surface here, at configuration-load time, before
//! any runtime traffic.

use serde_json::{Map, Value};
use tracing::debug;

use conflux_core::scope::Scope;
use conflux_core::settings::{self, EngineSettings};
use conflux_expr::ExprFactory;

use crate::error::{Error, Result};
use crate::node::{ConditionalNode, ForeachNode, MappingNode, VariableDecl};

/// A compiled mapping, ready to apply to scopes
#[derive(Debug, Clone)]
pub struct Mapper {
    root: MappingNode,
    relaxed: bool,
}

impl Mapper {
    /// Apply the mapping to `scope`, producing the output structure.
    pub fn apply(&self, scope: &dyn Scope) -> Result<Value> {
        self.root.apply(scope, self.relaxed)
    }

    /// The compiled root node.
    pub fn root(&self) -> &MappingNode {
        &self.root
    }
}

/// Compiles mapping specs against an expression factory
#[derive(Clone)]
pub struct MapperFactory {
    exprs: ExprFactory,
    settings: EngineSettings,
}

impl Default for MapperFactory {
    fn default() -> Self {
        Self::new(ExprFactory::new())
    }
}

impl MapperFactory {
    /// Factory using the process-wide engine settings.
    pub fn new(exprs: ExprFactory) -> Self {
        Self {
            exprs,
            settings: settings::settings(),
        }
    }

    /// Factory with explicit settings (callers owning their own config).
    pub fn with_settings(exprs: ExprFactory, settings: EngineSettings) -> Self {
        Self { exprs, settings }
    }

    /// Compile a mapping spec.
    pub fn new_mapper(&self, spec: &Value) -> Result<Mapper> {
        let root = self.compile(spec)?;
        debug!("compiled mapping");
        Ok(Mapper {
            root,
            relaxed: self.settings.relaxed_mapping,
        })
    }

    /// Compile a mapping spec written in YAML.
    pub fn new_mapper_from_yaml(&self, yaml: &str) -> Result<Mapper> {
        let spec: Value = serde_yaml::from_str(yaml).map_err(|e| Error::InvalidSpec {
            message: e.to_string(),
        })?;
        self.new_mapper(&spec)
    }

    fn compile(&self, spec: &Value) -> Result<MappingNode> {
        match spec {
            Value::Object(map) => self.compile_object(map),
            Value::Array(items) => {
                let mut nodes = Vec::with_capacity(items.len());
                for item in items {
                    nodes.push(self.compile(item)?);
                }
                Ok(MappingNode::LiteralArray(nodes))
            }
            Value::String(s) => match s.strip_prefix('=') {
                Some(source) => Ok(MappingNode::Expression(self.exprs.new_expr(source.trim())?)),
                None => Ok(MappingNode::Literal(spec.clone())),
            },
            other => Ok(MappingNode::Literal(other.clone())),
        }
    }

    fn compile_object(&self, map: &Map<String, Value>) -> Result<MappingNode> {
        // a lone special key turns the whole object into that node
        if map.len() == 1 {
            if let Some((key, body)) = map.iter().next() {
                if let Some(header) = key.strip_prefix("@foreach") {
                    return self.compile_foreach(key, header, body);
                }
                if key == "@conditional" || key.starts_with("@conditional(") {
                    return self.compile_conditional(key, body);
                }
            }
        } else if let Some(bad) = map
            .keys()
            .find(|k| k.starts_with("@foreach") || k.starts_with("@conditional"))
        {
            return Err(Error::InvalidSpec {
                message: format!("'{bad}' must be the only key of its object"),
            });
        }

        if map
            .keys()
            .any(|k| k.starts_with("@if") || k.starts_with("@elseIf") || k.as_str() == "@else")
        {
            return self.compile_if_else(map);
        }

        let mut vars = Vec::new();
        let mut fields = Vec::new();
        for (key, value) in map {
            if let Some(inner) = key.strip_prefix("@var(") {
                let name = inner.strip_suffix(')').ok_or_else(|| Error::InvalidSpec {
                    message: format!("malformed variable declaration '{key}'"),
                })?;
                vars.push(VariableDecl {
                    name: unquote(name).to_string(),
                    node: self.compile(value)?,
                });
            } else {
                fields.push((key.clone(), self.compile(value)?));
            }
        }
        Ok(MappingNode::Object { vars, fields })
    }

    fn compile_foreach(&self, key: &str, header: &str, body: &Value) -> Result<MappingNode> {
        let invalid = |message: &str| Error::InvalidForeach {
            header: key.to_string(),
            message: message.to_string(),
        };
        let inner = header
            .trim()
            .strip_prefix('(')
            .and_then(|h| h.strip_suffix(')'))
            .ok_or_else(|| invalid("expected @foreach(source[, scopeName[, filterExpr]])"))?;
        let args = smart_split(inner);
        if args.is_empty() {
            return Err(invalid("missing source"));
        }
        if args.len() > 3 {
            return Err(invalid("too many arguments"));
        }
        let source = if args[0] == "NEWARRAY" {
            None
        } else {
            Some(self.exprs.new_expr(&args[0])?)
        };
        let scope_name = args
            .get(1)
            .map(|a| unquote(a).to_string())
            .filter(|a| !a.is_empty());
        let filter = match args.get(2) {
            Some(f) => Some(self.exprs.new_expr(f)?),
            None => None,
        };
        let body_map = body
            .as_object()
            .ok_or_else(|| invalid("body must be an object"))?;
        let mut fields = Vec::new();
        let mut assign = None;
        for (field_key, field_value) in body_map {
            if field_key == "=" {
                assign = Some(self.compile(field_value)?);
            } else {
                fields.push((field_key.clone(), self.compile(field_value)?));
            }
        }
        Ok(MappingNode::Foreach(Box::new(ForeachNode {
            source,
            scope_name,
            filter,
            fields,
            assign,
        })))
    }

    fn compile_conditional(&self, key: &str, body: &Value) -> Result<MappingNode> {
        let prefix = key
            .strip_prefix("@conditional")
            .unwrap_or("")
            .trim()
            .strip_prefix('(')
            .and_then(|p| p.strip_suffix(')'))
            .map(str::trim)
            .unwrap_or("");
        let branch_map = body.as_object().ok_or_else(|| Error::InvalidSpec {
            message: "conditional body must be an object".to_string(),
        })?;
        let mut branches = Vec::new();
        let mut otherwise = None;
        for (branch_key, branch_value) in branch_map {
            if branch_key == "@otherwise" {
                otherwise = Some(self.compile(branch_value)?);
                continue;
            }
            // short-form branches are appended to the header prefix
            let source = if prefix.is_empty() {
                branch_key.clone()
            } else {
                format!("{prefix} {branch_key}")
            };
            let condition = self.exprs.new_expr(&source)?;
            branches.push((condition, self.compile(branch_value)?));
        }
        if branches.is_empty() && otherwise.is_none() {
            return Err(Error::InvalidSpec {
                message: "conditional has no branches".to_string(),
            });
        }
        Ok(MappingNode::Conditional(Box::new(ConditionalNode {
            branches,
            otherwise,
        })))
    }

    fn compile_if_else(&self, map: &Map<String, Value>) -> Result<MappingNode> {
        let mut branches = Vec::new();
        let mut otherwise = None;
        for (key, value) in map {
            if let Some(condition) = extract_condition(key, "@if") {
                branches.push((self.exprs.new_expr(condition)?, self.compile(value)?));
            } else if let Some(condition) = extract_condition(key, "@elseIf") {
                branches.push((self.exprs.new_expr(condition)?, self.compile(value)?));
            } else if key == "@else" {
                otherwise = Some(self.compile(value)?);
            } else {
                return Err(Error::InvalidSpec {
                    message: format!("unexpected key '{key}' in if/else mapping"),
                });
            }
        }
        if branches.is_empty() {
            return Err(Error::InvalidSpec {
                message: "if/else mapping has no '@if' branch".to_string(),
            });
        }
        Ok(MappingNode::Conditional(Box::new(ConditionalNode {
            branches,
            otherwise,
        })))
    }
}

/// Extract the parenthesized condition of an `@if(...)`-style key.
fn extract_condition<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    key.strip_prefix(prefix)?
        .trim()
        .strip_prefix('(')?
        .strip_suffix(')')
}

/// Split foreach arguments on top-level commas.
///
/// Commas inside quotes, backticks, or nested brackets/parens do not
/// split.
fn smart_split(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in input.chars() {
        if let Some(q) = quote {
            current.push(c);
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
                quote = Some(c);
                current.push(c);
            }
            '(' | '[' | '{' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                parts.push(std::mem::take(&mut current).trim().to_string());
            }
            _ => current.push(c),
        }
    }
    let last = current.trim().to_string();
    if !last.is_empty() {
        parts.push(last);
    }
    parts
}

/// Strip one layer of matching single or double quotes.
fn unquote(s: &str) -> &str {
    let s = s.trim();
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let matched = (bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\'');
        if matched {
            return &s[1..s.len() - 1];
        }
    }
    s
}
