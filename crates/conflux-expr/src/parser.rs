//! Expression parser
//!
//! Recursive-descent precedence climbing over the token stream:
//! unary `!`/`-` binds tightest, then `* / %`, `+ -`, comparisons, `&&`,
//! `||`, and finally the ternary. Parentheses override.
//!
//! Reference tokens are split here into literal and computed segments;
//! fully literal references are resolved into a cached [`Resolution`] at
//! compile time.

use std::sync::Arc;

use conflux_core::resolve::CompositeResolver;

use crate::ast::{ArithOp, CmpOp, Expr, LogicOp, RefExpr, RefSegment, UnaryOp};
use crate::error::{Error, Result};
use crate::token::{self, Token};

pub(crate) struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    resolver: &'a Arc<CompositeResolver>,
}

impl<'a> Parser<'a> {
    /// Parse a complete expression source string.
    pub(crate) fn parse(source: &str, resolver: &'a Arc<CompositeResolver>) -> Result<Expr> {
        let tokens = token::tokenize(source)?;
        if tokens.is_empty() {
            return Err(Error::Parse {
                position: 0,
                message: "empty expression".to_string(),
            });
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            resolver,
        };
        let expr = parser.ternary()?;
        if parser.pos < parser.tokens.len() {
            return Err(Error::Parse {
                position: parser.pos,
                message: "unexpected trailing input".to_string(),
            });
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<()> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(Error::Parse {
                position: self.pos,
                message: format!("expected {what}"),
            })
        }
    }

    fn ternary(&mut self) -> Result<Expr> {
        let cond = self.or_expr()?;
        if self.peek() == Some(&Token::Question) {
            self.pos += 1;
            let then_expr = self.ternary()?;
            self.expect(&Token::Colon, "':'")?;
            let else_expr = self.ternary()?;
            return Ok(Expr::Ternary {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            });
        }
        Ok(cond)
    }

    fn or_expr(&mut self) -> Result<Expr> {
        let mut left = self.and_expr()?;
        while self.peek() == Some(&Token::OrOr) {
            self.pos += 1;
            let right = self.and_expr()?;
            left = Expr::Logical {
                op: LogicOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr> {
        let mut left = self.comparison()?;
        while self.peek() == Some(&Token::AndAnd) {
            self.pos += 1;
            let right = self.comparison()?;
            left = Expr::Logical {
                op: LogicOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut left = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => CmpOp::Eq,
                Some(Token::NotEq) => CmpOp::Ne,
                Some(Token::Lt) => CmpOp::Lt,
                Some(Token::LtEq) => CmpOp::Le,
                Some(Token::Gt) => CmpOp::Gt,
                Some(Token::GtEq) => CmpOp::Ge,
                _ => break,
            };
            self.pos += 1;
            let right = self.additive()?;
            left = Expr::Comparison {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => ArithOp::Add,
                Some(Token::Minus) => ArithOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.multiplicative()?;
            left = Expr::Arithmetic {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => ArithOp::Mul,
                Some(Token::Slash) => ArithOp::Div,
                Some(Token::Percent) => ArithOp::Mod,
                _ => break,
            };
            self.pos += 1;
            let right = self.unary()?;
            left = Expr::Arithmetic {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr> {
        match self.peek() {
            Some(Token::Bang) => {
                self.pos += 1;
                Ok(Expr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(self.unary()?),
                })
            }
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(self.unary()?),
                })
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        let position = self.pos;
        match self.advance() {
            Some(Token::Int(i)) => Ok(Expr::Literal(i.into())),
            Some(Token::Float(f)) => Ok(Expr::Literal(f.into())),
            Some(Token::Str(s)) => Ok(Expr::Literal(s.into())),
            Some(Token::Ident(name)) => match name.as_str() {
                "true" => Ok(Expr::Literal(true.into())),
                "false" => Ok(Expr::Literal(false.into())),
                "nil" | "null" => Ok(Expr::Literal(serde_json::Value::Null)),
                _ => {
                    self.expect(&Token::LParen, "'(' after function name")?;
                    let args = self.call_args()?;
                    Ok(Expr::Call { name, args })
                }
            },
            Some(Token::Ref(text)) => compile_reference(&text, self.resolver),
            Some(Token::LParen) => {
                let expr = self.ternary()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(expr)
            }
            _ => Err(Error::Parse {
                position,
                message: "expected a value".to_string(),
            }),
        }
    }

    fn call_args(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.ternary()?);
            match self.advance() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => break,
                _ => {
                    return Err(Error::Parse {
                        position: self.pos,
                        message: "expected ',' or ')' in argument list".to_string(),
                    });
                }
            }
        }
        Ok(args)
    }
}

/// Compile a `$...` reference into an expression node.
///
/// References with only literal segments resolve at compile time (static
/// resolver caching applies); any computed bracket segment defers the
/// whole reference to evaluation time.
pub(crate) fn compile_reference(
    text: &str,
    resolver: &Arc<CompositeResolver>,
) -> Result<Expr> {
    let segments = split_ref_segments(text, resolver)?;
    let mut directive = String::new();
    let mut computed = false;
    for segment in &segments {
        match segment {
            RefSegment::Literal(part) => directive.push_str(part),
            RefSegment::Computed(_) => {
                computed = true;
                break;
            }
        }
    }
    if computed {
        Ok(Expr::Reference(RefExpr::Dynamic {
            segments,
            resolver: resolver.clone(),
        }))
    } else {
        let resolution = resolver.get_resolution(&directive)?;
        Ok(Expr::Reference(RefExpr::Resolved(resolution)))
    }
}

/// True when bracket content is a plain index, name, or quoted/backtick
/// key rather than a computed sub-expression.
fn is_literal_indexer(content: &str) -> bool {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return false;
    }
    if trimmed.starts_with('\'') || trimmed.starts_with('"') || trimmed.starts_with('`') {
        return true;
    }
    trimmed
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '-' | ' '))
}

fn split_ref_segments(
    text: &str,
    resolver: &Arc<CompositeResolver>,
) -> Result<Vec<RefSegment>> {
    let chars: Vec<char> = text.chars().collect();
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut pos = 0usize;
    while pos < chars.len() {
        let c = chars[pos];
        if c != '[' {
            literal.push(c);
            pos += 1;
            continue;
        }
        // find the matching close, quote-aware and nesting-aware
        let mut depth = 1usize;
        let mut quote: Option<char> = None;
        let mut escaped = false;
        let mut end = None;
        let mut i = pos + 1;
        while i < chars.len() {
            let ch = chars[i];
            if let Some(q) = quote {
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == q {
                    quote = None;
                }
            } else {
                match ch {
                    '\'' | '"' | '`' => quote = Some(ch),
                    '[' => depth += 1,
                    ']' => {
                        depth -= 1;
                        if depth == 0 {
                            end = Some(i);
                            break;
                        }
                    }
                    _ => {}
                }
            }
            i += 1;
        }
        let end = end.ok_or_else(|| Error::Parse {
            position: pos,
            message: "unterminated indexer in reference".to_string(),
        })?;
        let content: String = chars[pos + 1..end].iter().collect();
        if is_literal_indexer(&content) {
            literal.push('[');
            literal.push_str(&content);
            literal.push(']');
        } else {
            if !literal.is_empty() {
                segments.push(RefSegment::Literal(std::mem::take(&mut literal)));
            }
            let sub = Parser::parse(content.trim(), resolver)?;
            segments.push(RefSegment::Computed(Box::new(sub)));
        }
        pos = end + 1;
    }
    if !literal.is_empty() {
        segments.push(RefSegment::Literal(literal));
    }
    if segments.is_empty() {
        return Err(Error::Parse {
            position: 0,
            message: "empty reference".to_string(),
        });
    }
    Ok(segments)
}
