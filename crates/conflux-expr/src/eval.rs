//! Tree-walking evaluator
//!
//! Depth-first evaluation of compiled expression trees against a scope.
//! `&&`, `||`, and the ternary are lazy: short-circuited operands and the
//! untaken branch are never evaluated. Everything else evaluates its
//! operands left-to-right before applying the operation.

use serde_json::{Number, Value};
use tracing::trace;

use conflux_core::coerce;
use conflux_core::scope::Scope;

use crate::ast::{ArithOp, CmpOp, Expr, LogicOp, RefExpr, RefSegment, TemplatePart, UnaryOp};
use crate::error::{Error, Result};
use crate::function;

impl Expr {
    /// Evaluate the expression against `scope`.
    pub fn eval(&self, scope: &dyn Scope) -> Result<Value> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Reference(reference) => eval_reference(reference, scope),
            Expr::Arithmetic { op, left, right } => {
                let left = left.eval(scope)?;
                let right = right.eval(scope)?;
                eval_arithmetic(*op, &left, &right)
            }
            Expr::Comparison { op, left, right } => {
                let left = left.eval(scope)?;
                let right = right.eval(scope)?;
                eval_comparison(*op, &left, &right)
            }
            Expr::Logical { op, left, right } => eval_logical(*op, left, right, scope),
            Expr::Unary { op, operand } => {
                let value = operand.eval(scope)?;
                eval_unary(*op, &value)
            }
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                if coerce::to_bool(&cond.eval(scope)?)? {
                    then_expr.eval(scope)
                } else {
                    else_expr.eval(scope)
                }
            }
            Expr::Call { name, args } => eval_call(name, args, scope),
            Expr::Template { parts } => eval_template(parts, scope),
        }
    }
}

/// Runtime type name used in operator error messages.
fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "nil",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn invalid_operands(op: impl ToString, left: &Value, right: &Value) -> Error {
    Error::InvalidOperands {
        op: op.to_string(),
        left: type_name(left).to_string(),
        right: type_name(right).to_string(),
    }
}

fn eval_reference(reference: &RefExpr, scope: &dyn Scope) -> Result<Value> {
    match reference {
        RefExpr::Resolved(resolution) => Ok(resolution.get_value(scope)?),
        RefExpr::Dynamic { segments, resolver } => {
            let mut directive = String::new();
            for segment in segments {
                match segment {
                    RefSegment::Literal(text) => directive.push_str(text),
                    RefSegment::Computed(expr) => match expr.eval(scope)? {
                        Value::Number(n) => directive.push_str(&format!("[{n}]")),
                        Value::String(s) => directive.push_str(&format!("[\"{s}\"]")),
                        other => {
                            return Err(Error::Core(conflux_core::Error::InvalidIndex {
                                index: other.to_string(),
                            }));
                        }
                    },
                }
            }
            trace!(directive, "re-resolving dynamic reference");
            Ok(resolver.get_resolution(&directive)?.get_value(scope)?)
        }
    }
}

fn eval_arithmetic(op: ArithOp, left: &Value, right: &Value) -> Result<Value> {
    // string `+` is concatenation; the other side is coerced to string
    if op == ArithOp::Add && (left.is_string() || right.is_string()) {
        let mut out = coerce::to_string(left)?;
        out.push_str(&coerce::to_string(right)?);
        return Ok(Value::String(out));
    }
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => {
            if let (Some(li), Some(ri)) = (l.as_i64(), r.as_i64()) {
                int_arithmetic(op, li, ri)
            } else {
                let lf = coerce::to_float64(left)?;
                let rf = coerce::to_float64(right)?;
                float_arithmetic(op, lf, rf)
            }
        }
        _ => Err(invalid_operands(op, left, right)),
    }
}

fn int_arithmetic(op: ArithOp, left: i64, right: i64) -> Result<Value> {
    if right == 0 && matches!(op, ArithOp::Div | ArithOp::Mod) {
        return Err(Error::DivisionByZero);
    }
    let out = match op {
        ArithOp::Add => left.checked_add(right),
        ArithOp::Sub => left.checked_sub(right),
        ArithOp::Mul => left.checked_mul(right),
        ArithOp::Div => left.checked_div(right),
        ArithOp::Mod => left.checked_rem(right),
    };
    out.map(Value::from).ok_or_else(|| Error::Overflow {
        op: op.to_string(),
    })
}

fn float_arithmetic(op: ArithOp, left: f64, right: f64) -> Result<Value> {
    if op == ArithOp::Div && right == 0.0 {
        return Err(Error::DivisionByZero);
    }
    let out = match op {
        ArithOp::Add => left + right,
        ArithOp::Sub => left - right,
        ArithOp::Mul => left * right,
        ArithOp::Div => left / right,
        // modulo truncates both operands to ints first
        ArithOp::Mod => {
            return int_arithmetic(op, left.trunc() as i64, right.trunc() as i64);
        }
    };
    Number::from_f64(out)
        .map(Value::Number)
        .ok_or_else(|| Error::Overflow {
            op: op.to_string(),
        })
}

fn eval_comparison(op: CmpOp, left: &Value, right: &Value) -> Result<Value> {
    let result = match op {
        CmpOp::Eq => values_equal(left, right),
        CmpOp::Ne => !values_equal(left, right),
        _ => values_ordered(op, left, right)?,
    };
    Ok(Value::Bool(result))
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        // nil compares equal to nil only
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Number(l), Value::Number(r)) => {
            if let (Some(li), Some(ri)) = (l.as_i64(), r.as_i64()) {
                li == ri
            } else {
                l.as_f64() == r.as_f64()
            }
        }
        (Value::String(l), Value::String(r)) => {
            match (coerce::parse_datetime(l), coerce::parse_datetime(r)) {
                (Some(dl), Some(dr)) => dl == dr,
                _ => l == r,
            }
        }
        _ => left == right,
    }
}

fn values_ordered(op: CmpOp, left: &Value, right: &Value) -> Result<bool> {
    use std::cmp::Ordering;

    // boolean ordering is not defined; it is false rather than an error
    if left.is_boolean() && right.is_boolean() {
        return Ok(false);
    }
    let ordering = match (left, right) {
        (Value::Number(l), Value::Number(r)) => {
            if let (Some(li), Some(ri)) = (l.as_i64(), r.as_i64()) {
                li.cmp(&ri)
            } else {
                let lf = coerce::to_float64(left)?;
                let rf = coerce::to_float64(right)?;
                lf.partial_cmp(&rf)
                    .ok_or_else(|| invalid_operands(op, left, right))?
            }
        }
        (Value::String(l), Value::String(r)) => {
            match (coerce::parse_datetime(l), coerce::parse_datetime(r)) {
                (Some(dl), Some(dr)) => dl.cmp(&dr),
                _ => l.cmp(r),
            }
        }
        _ => return Err(invalid_operands(op, left, right)),
    };
    Ok(match op {
        CmpOp::Lt => ordering == Ordering::Less,
        CmpOp::Le => ordering != Ordering::Greater,
        CmpOp::Gt => ordering == Ordering::Greater,
        CmpOp::Ge => ordering != Ordering::Less,
        CmpOp::Eq => ordering == Ordering::Equal,
        CmpOp::Ne => ordering != Ordering::Equal,
    })
}

fn eval_logical(op: LogicOp, left: &Expr, right: &Expr, scope: &dyn Scope) -> Result<Value> {
    let left = coerce::to_bool(&left.eval(scope)?)?;
    match op {
        LogicOp::Or if left => Ok(Value::Bool(true)),
        LogicOp::And if !left => Ok(Value::Bool(false)),
        _ => {
            let right = coerce::to_bool(&right.eval(scope)?)?;
            Ok(Value::Bool(match op {
                LogicOp::And => left && right,
                LogicOp::Or => left || right,
            }))
        }
    }
}

fn eval_unary(op: UnaryOp, value: &Value) -> Result<Value> {
    match op {
        UnaryOp::Not => match value {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            _ => Err(Error::InvalidUnaryOperand {
                op: "!".to_string(),
                operand: type_name(value).to_string(),
            }),
        },
        UnaryOp::Neg => negate(value),
    }
}

fn negate(value: &Value) -> Result<Value> {
    let invalid = || Error::InvalidUnaryOperand {
        op: "-".to_string(),
        operand: type_name(value).to_string(),
    };
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.checked_neg()
                    .map(Value::from)
                    .ok_or_else(|| Error::Overflow {
                        op: "-".to_string(),
                    })
            } else {
                let f = n.as_f64().ok_or_else(invalid)?;
                Number::from_f64(-f).map(Value::Number).ok_or_else(invalid)
            }
        }
        // numeric strings negate; anything else is an error
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                Ok(Value::from(-i))
            } else if let Ok(f) = s.parse::<f64>() {
                Number::from_f64(-f).map(Value::Number).ok_or_else(invalid)
            } else {
                Err(invalid())
            }
        }
        _ => Err(invalid()),
    }
}

fn eval_call(name: &str, args: &[Expr], scope: &dyn Scope) -> Result<Value> {
    match name {
        // intercepted before any registry lookup
        "isDefined" => {
            check_arity(name, args, 1)?;
            match args[0].eval(scope) {
                Ok(value) => Ok(Value::Bool(!value.is_null())),
                Err(e) if e.is_not_found() => Ok(Value::Bool(false)),
                Err(e) => Err(e),
            }
        }
        "getValue" => {
            check_arity(name, args, 2)?;
            match args[0].eval(scope) {
                Ok(value) if !value.is_null() => Ok(value),
                Ok(_) => args[1].eval(scope),
                Err(e) if e.is_not_found() => args[1].eval(scope),
                Err(e) => Err(e),
            }
        }
        _ => {
            let function = function::get(name).ok_or_else(|| Error::UnknownFunction {
                name: name.to_string(),
            })?;
            let signature = function.signature();
            if signature.variadic {
                let min = signature.params.len().saturating_sub(1);
                if args.len() < min {
                    return Err(Error::Function {
                        name: name.to_string(),
                        message: format!(
                            "expected at least {min} arguments, got {}",
                            args.len()
                        ),
                    });
                }
            } else if args.len() != signature.params.len() {
                return Err(Error::Function {
                    name: name.to_string(),
                    message: format!(
                        "expected {} arguments, got {}",
                        signature.params.len(),
                        args.len()
                    ),
                });
            }
            let mut coerced = Vec::with_capacity(args.len());
            for (i, arg) in args.iter().enumerate() {
                let value = arg.eval(scope)?;
                let target = if i < signature.params.len() {
                    signature.params[i]
                } else {
                    signature
                        .params
                        .last()
                        .copied()
                        .unwrap_or(conflux_core::DataType::Any)
                };
                coerced.push(coerce::to_type(&value, target)?);
            }
            function.eval(&coerced)
        }
    }
}

fn check_arity(name: &str, args: &[Expr], expected: usize) -> Result<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(Error::Function {
            name: name.to_string(),
            message: format!("expected {expected} arguments, got {}", args.len()),
        })
    }
}

fn eval_template(parts: &[TemplatePart], scope: &dyn Scope) -> Result<Value> {
    let mut out = String::new();
    for part in parts {
        match part {
            TemplatePart::Literal(text) => out.push_str(text),
            TemplatePart::Expr(expr) => out.push_str(&coerce::to_string(&expr.eval(scope)?)?),
        }
    }
    Ok(Value::String(out))
}
