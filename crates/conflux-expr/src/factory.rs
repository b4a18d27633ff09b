//! Expression factory
//!
//! Compiles expression source strings into evaluable [`Expr`] trees.
//! The factory decides the compilation route:
//!
//! - strings carrying `{{` compile as templates,
//! - strings that pass the resolve-directive grammar guard compile as
//!   references directly,
//! - everything else goes through the lexer and parser.
//!
//! Unknown function names and malformed references are compile-time
//! errors; nothing is deferred to evaluation that can fail earlier.

use std::sync::Arc;

use conflux_core::resolve::{self, CompositeResolver};
use conflux_core::resolvers;
use tracing::debug;

use crate::ast::{Expr, RefExpr, RefSegment, TemplatePart};
use crate::error::{Error, Result};
use crate::function;
use crate::parser::{self, Parser};
use crate::template::{self, RawPart};

/// Compiles expression strings against a resolver registry
#[derive(Clone)]
pub struct ExprFactory {
    resolver: Arc<CompositeResolver>,
}

impl Default for ExprFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ExprFactory {
    /// Factory over the process-wide default resolver.
    pub fn new() -> Self {
        Self {
            resolver: resolvers::default_resolver(),
        }
    }

    /// Factory over a custom resolver registry.
    pub fn with_resolver(resolver: Arc<CompositeResolver>) -> Self {
        Self { resolver }
    }

    /// The resolver this factory compiles references against.
    pub fn resolver(&self) -> &Arc<CompositeResolver> {
        &self.resolver
    }

    /// Compile an expression source string.
    pub fn new_expr(&self, source: &str) -> Result<Expr> {
        if template::has_template(source) {
            return self.compile_template(source);
        }
        let trimmed = source.trim();
        let expr = if resolve::is_resolve_expr(trimmed) {
            parser::compile_reference(trimmed, &self.resolver)?
        } else {
            Parser::parse(trimmed, &self.resolver)?
        };
        check_functions(&expr)?;
        debug!(source = trimmed, "compiled expression");
        Ok(expr)
    }

    fn compile_template(&self, source: &str) -> Result<Expr> {
        let mut parts = Vec::new();
        for raw in template::scan(source) {
            match raw {
                RawPart::Literal(text) => parts.push(TemplatePart::Literal(text)),
                RawPart::Expr(span) => {
                    let trimmed = span.trim();
                    let expr = if resolve::is_resolve_expr(trimmed) {
                        parser::compile_reference(trimmed, &self.resolver)?
                    } else {
                        Parser::parse(trimmed, &self.resolver)?
                    };
                    check_functions(&expr)?;
                    parts.push(TemplatePart::Expr(expr));
                }
            }
        }
        Ok(Expr::Template { parts })
    }
}

/// Compile-time check that every called function exists in the registry.
///
/// `isDefined` and `getValue` are intercepted by the evaluator and are
/// exempt.
fn check_functions(expr: &Expr) -> Result<()> {
    match expr {
        Expr::Call { name, args } => {
            if name != "isDefined" && name != "getValue" && !function::is_registered(name) {
                return Err(Error::UnknownFunction { name: name.clone() });
            }
            args.iter().try_for_each(check_functions)
        }
        Expr::Arithmetic { left, right, .. }
        | Expr::Comparison { left, right, .. }
        | Expr::Logical { left, right, .. } => {
            check_functions(left)?;
            check_functions(right)
        }
        Expr::Unary { operand, .. } => check_functions(operand),
        Expr::Ternary {
            cond,
            then_expr,
            else_expr,
        } => {
            check_functions(cond)?;
            check_functions(then_expr)?;
            check_functions(else_expr)
        }
        Expr::Template { parts } => parts.iter().try_for_each(|part| match part {
            TemplatePart::Expr(expr) => check_functions(expr),
            TemplatePart::Literal(_) => Ok(()),
        }),
        Expr::Reference(RefExpr::Dynamic { segments, .. }) => {
            segments.iter().try_for_each(|segment| match segment {
                RefSegment::Computed(expr) => check_functions(expr),
                RefSegment::Literal(_) => Ok(()),
            })
        }
        Expr::Reference(RefExpr::Resolved(_)) | Expr::Literal(_) => Ok(()),
    }
}
