//! Compiled mapping trees
//!
//! A mapping spec compiles into a tree of [`MappingNode`]s; applying the
//! tree to a scope produces the output structure. Trees are immutable
//! after compilation and can be applied concurrently as long as each
//! caller supplies its own scope.
//!
//! A failing apply abandons the whole call: there is no partial output,
//! even when earlier elements or fields were already computed.

use serde_json::{Map, Value};
use tracing::debug;

use conflux_core::coerce;
use conflux_core::resolvers::{LOOP_BINDING, LOOP_INDEX};
use conflux_core::scope::{ChildScope, Scope};
use conflux_expr::Expr;

use crate::error::Result;

/// One node of a compiled mapping tree
#[derive(Debug, Clone)]
pub enum MappingNode {
    /// Keyed object; fields are evaluated in compiled order
    Object {
        /// `@var(name)` declarations, evaluated before the fields and
        /// bound into a child scope visible to them
        vars: Vec<VariableDecl>,
        /// Ordered (key, node) pairs
        fields: Vec<(String, MappingNode)>,
    },

    /// Array literal with recursively mapped elements
    LiteralArray(Vec<MappingNode>),

    /// Array iteration with optional filtering
    Foreach(Box<ForeachNode>),

    /// First-true conditional branches
    Conditional(Box<ConditionalNode>),

    /// Compiled expression leaf (`=`-prefixed mapping value)
    Expression(Expr),

    /// Verbatim literal leaf
    Literal(Value),
}

/// A `@var(name)` declaration inside an object mapping
#[derive(Debug, Clone)]
pub struct VariableDecl {
    /// Binding name
    pub name: String,
    /// Value node, evaluated once per apply
    pub node: MappingNode,
}

/// Compiled `@foreach(source[, scopeName[, filterExpr]])` node
#[derive(Debug, Clone)]
pub struct ForeachNode {
    /// Source expression; `None` for `NEWARRAY` (one synthesized
    /// placeholder element)
    pub source: Option<Expr>,
    /// Optional loop scope alias for the current element
    pub scope_name: Option<String>,
    /// Optional element filter, coerced to bool per element
    pub filter: Option<Expr>,
    /// Per-element object fields
    pub fields: Vec<(String, MappingNode)>,
    /// Whole-element `=` assignment
    pub assign: Option<MappingNode>,
}

/// Compiled conditional node (`@conditional` or `@if`/`@elseIf`/`@else`)
#[derive(Debug, Clone)]
pub struct ConditionalNode {
    /// (condition, result) branches in declaration order
    pub branches: Vec<(Expr, MappingNode)>,
    /// `@otherwise`/`@else` default branch
    pub otherwise: Option<MappingNode>,
}

impl MappingNode {
    /// Apply the node to `scope`.
    pub(crate) fn apply(&self, scope: &dyn Scope, relaxed: bool) -> Result<Value> {
        match self {
            MappingNode::Literal(value) => Ok(value.clone()),
            MappingNode::Expression(expr) => Ok(expr.eval(scope)?),
            MappingNode::LiteralArray(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(item.apply(scope, relaxed)?);
                }
                Ok(Value::Array(out))
            }
            MappingNode::Object { vars, fields } => {
                if vars.is_empty() {
                    return Ok(Value::Object(apply_fields(fields, scope, relaxed)?));
                }
                let mut child = ChildScope::new(scope);
                for var in vars {
                    let value = var.node.apply(&child, relaxed)?;
                    child.set_value(var.name.clone(), value);
                }
                Ok(Value::Object(apply_fields(fields, &child, relaxed)?))
            }
            MappingNode::Foreach(foreach) => foreach.apply(scope, relaxed),
            MappingNode::Conditional(conditional) => conditional.apply(scope, relaxed),
        }
    }
}

/// Evaluate ordered object fields against `scope`.
fn apply_fields(
    fields: &[(String, MappingNode)],
    scope: &dyn Scope,
    relaxed: bool,
) -> Result<Map<String, Value>> {
    let mut out = Map::new();
    for (key, node) in fields {
        let value = match node.apply(scope, relaxed) {
            Ok(v) => v,
            Err(e) if relaxed && e.is_not_found() => Value::Null,
            Err(e) => return Err(e),
        };
        out.insert(key.clone(), value);
    }
    Ok(out)
}

impl ForeachNode {
    fn apply(&self, scope: &dyn Scope, relaxed: bool) -> Result<Value> {
        let items = match &self.source {
            // NEWARRAY: build the array from one placeholder element
            None => vec![Value::Null],
            Some(source) => {
                let resolved = match source.eval(scope) {
                    Ok(v) => v,
                    Err(e) if relaxed && e.is_not_found() => Value::Null,
                    Err(e) => return Err(e.into()),
                };
                match coerce::to_array(&resolved)? {
                    Value::Array(items) => items,
                    // a null source iterates zero times
                    _ => Vec::new(),
                }
            }
        };
        debug!(count = items.len(), "applying foreach");
        let mut out = Vec::with_capacity(items.len());
        for (index, element) in items.into_iter().enumerate() {
            let mut child = ChildScope::new(scope);
            child.set_value(LOOP_BINDING, element.clone());
            child.set_value(LOOP_INDEX, Value::from(index as u64));
            if let Some(alias) = &self.scope_name {
                child.set_value(alias.clone(), element);
            }
            if let Some(filter) = &self.filter {
                if !coerce::to_bool(&filter.eval(&child)?)? {
                    continue;
                }
            }
            let entry = match &self.assign {
                None => Value::Object(apply_fields(&self.fields, &child, relaxed)?),
                Some(assign) => {
                    let mut assigned = assign.apply(&child, relaxed)?;
                    if !self.fields.is_empty() {
                        let extra = apply_fields(&self.fields, &child, relaxed)?;
                        // field results merge into containers only
                        match &mut assigned {
                            Value::Object(map) => {
                                for (key, value) in extra {
                                    map.insert(key, value);
                                }
                            }
                            Value::Array(seq) => seq.push(Value::Object(extra)),
                            _ => {}
                        }
                    }
                    assigned
                }
            };
            out.push(entry);
        }
        Ok(Value::Array(out))
    }
}

impl ConditionalNode {
    fn apply(&self, scope: &dyn Scope, relaxed: bool) -> Result<Value> {
        for (condition, node) in &self.branches {
            if coerce::to_bool(&condition.eval(scope)?)? {
                return node.apply(scope, relaxed);
            }
        }
        match &self.otherwise {
            Some(node) => node.apply(scope, relaxed),
            None => Ok(Value::Null),
        }
    }
}
