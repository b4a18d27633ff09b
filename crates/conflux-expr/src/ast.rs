//! Expression AST
//!
//! Compiled expression nodes. Trees are built once at configuration time
//! and are immutable afterwards; a tree can be evaluated concurrently as
//! long as each caller supplies its own scope.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use conflux_core::resolve::{CompositeResolver, Resolution};

/// Binary arithmetic operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    /// `+` (numeric addition or string concatenation)
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Mod => "%",
        })
    }
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        })
    }
}

/// Short-circuit logical operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    /// `&&`
    And,
    /// `||`
    Or,
}

impl fmt::Display for LogicOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogicOp::And => "&&",
            LogicOp::Or => "||",
        })
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// `-`
    Neg,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
        })
    }
}

/// A compiled expression node
#[derive(Debug, Clone)]
pub enum Expr {
    /// Literal value
    Literal(Value),

    /// Resolve-directive reference
    Reference(RefExpr),

    /// Binary arithmetic
    Arithmetic {
        /// Operator
        op: ArithOp,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },

    /// Binary comparison
    Comparison {
        /// Operator
        op: CmpOp,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },

    /// Short-circuit logical operation
    Logical {
        /// Operator
        op: LogicOp,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },

    /// Unary operation
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: Box<Expr>,
    },

    /// `cond ? then : else`; exactly one branch is evaluated
    Ternary {
        /// Condition, coerced to bool
        cond: Box<Expr>,
        /// Branch taken when true
        then_expr: Box<Expr>,
        /// Branch taken when false
        else_expr: Box<Expr>,
    },

    /// Function invocation
    Call {
        /// Registered (possibly aliased) function name
        name: String,
        /// Positional arguments, evaluated left-to-right
        args: Vec<Expr>,
    },

    /// `{{ expr }}` template string
    Template {
        /// Ordered literal and sub-expression spans
        parts: Vec<TemplatePart>,
    },
}

/// One span of a template string
#[derive(Debug, Clone)]
pub enum TemplatePart {
    /// Verbatim text
    Literal(String),
    /// Embedded sub-expression, coerced to string on evaluation
    Expr(Expr),
}

/// A compiled reference
#[derive(Clone)]
pub enum RefExpr {
    /// All segments literal; resolved once at compile time
    Resolved(Resolution),

    /// Contains computed segments; the directive string is rebuilt and
    /// re-resolved on every evaluation
    Dynamic {
        /// Literal and computed directive segments, in order
        segments: Vec<RefSegment>,
        /// Resolver used for the per-evaluation re-resolution
        resolver: Arc<CompositeResolver>,
    },
}

impl fmt::Debug for RefExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefExpr::Resolved(resolution) => {
                f.debug_tuple("Resolved").field(resolution).finish()
            }
            RefExpr::Dynamic { segments, .. } => f
                .debug_struct("Dynamic")
                .field("segments", segments)
                .finish_non_exhaustive(),
        }
    }
}

/// One piece of a reference directive
#[derive(Debug, Clone)]
pub enum RefSegment {
    /// Verbatim directive text
    Literal(String),
    /// Bracket-indexed sub-expression evaluated against the current scope
    Computed(Box<Expr>),
}
