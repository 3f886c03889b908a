//! Sandboxed expressions for `if` and `execute` attributes.
//!
//! Attribute expressions are parsed once into a small AST and evaluated
//! against the element's [`Context`]. The language is deliberately tiny:
//! literals, dotted paths, `!`/unary `-`, `* /`, `+ -`, comparisons,
//! `== !=`, `&& ||`, and parentheses. There is no call syntax, no
//! assignment, and no access to anything outside the context.
//!
//! A path that does not resolve evaluates to null, so guards over sparse
//! data degrade to hidden rather than failing.

use thiserror::Error;

use crate::context::Context;
use tether_core::Value;

/// Errors raised while parsing or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    /// A character the lexer does not understand.
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar {
        /// The offending character.
        ch: char,
        /// Byte position in the source.
        pos: usize,
    },
    /// A string literal without a closing quote.
    #[error("unterminated string literal")]
    UnterminatedString,
    /// A token in a position the grammar does not allow.
    #[error("unexpected token at position {pos}")]
    UnexpectedToken {
        /// Byte position in the source.
        pos: usize,
    },
    /// Source ended where the grammar expected more.
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    /// An operator applied to operands it does not support.
    #[error("operator '{op}' cannot be applied to {kind} values")]
    TypeMismatch {
        /// The operator.
        op: &'static str,
        /// The offending operand kind.
        kind: &'static str,
    },
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Logical negation.
    Not,
    /// Arithmetic negation.
    Neg,
}

/// Binary operators, loosest-binding first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    fn name(self) -> &'static str {
        match self {
            BinOp::Or => "||",
            BinOp::And => "&&",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
        }
    }
}

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal value.
    Literal(Value),
    /// A dotted context path.
    Path(String),
    /// A unary operation.
    Unary(UnaryOp, Box<Expr>),
    /// A binary operation.
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Parse an expression from source text.
    pub fn parse(source: &str) -> Result<Expr, ExprError> {
        let tokens = lex(source)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.or_expr()?;
        match parser.peek() {
            Some(token) => Err(ExprError::UnexpectedToken { pos: token.pos }),
            None => Ok(expr),
        }
    }

    /// Evaluate against a context.
    pub fn eval(&self, context: &Context) -> Result<Value, ExprError> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Path(path) => Ok(context.resolve_value(path).unwrap_or(Value::Null)),
            Expr::Unary(op, inner) => {
                let value = inner.eval(context)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!truthy(&value))),
                    UnaryOp::Neg => match value {
                        Value::Int(n) => Ok(Value::Int(-n)),
                        Value::Float(n) => Ok(Value::Float(-n)),
                        other => Err(ExprError::TypeMismatch {
                            op: "-",
                            kind: other.kind(),
                        }),
                    },
                }
            }
            Expr::Binary(op, lhs, rhs) => match op {
                BinOp::Or => {
                    let left = lhs.eval(context)?;
                    if truthy(&left) {
                        Ok(Value::Bool(true))
                    } else {
                        Ok(Value::Bool(truthy(&rhs.eval(context)?)))
                    }
                }
                BinOp::And => {
                    let left = lhs.eval(context)?;
                    if !truthy(&left) {
                        Ok(Value::Bool(false))
                    } else {
                        Ok(Value::Bool(truthy(&rhs.eval(context)?)))
                    }
                }
                BinOp::Eq => Ok(Value::Bool(loose_eq(&lhs.eval(context)?, &rhs.eval(context)?))),
                BinOp::Ne => Ok(Value::Bool(!loose_eq(&lhs.eval(context)?, &rhs.eval(context)?))),
                BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                    compare(*op, &lhs.eval(context)?, &rhs.eval(context)?)
                }
                BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => {
                    arithmetic(*op, &lhs.eval(context)?, &rhs.eval(context)?)
                }
            },
        }
    }

    /// Evaluate in guard position: the result's truthiness.
    pub fn eval_truthy(&self, context: &Context) -> Result<bool, ExprError> {
        Ok(truthy(&self.eval(context)?))
    }
}

/// Truthiness: null, false, zero, NaN, and the empty string are falsy;
/// everything else (structured values included) is truthy.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(n) => *n != 0,
        Value::Float(n) => *n != 0.0 && !n.is_nan(),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left.as_float(), right.as_float()) {
        (Some(a), Some(b)) => a == b,
        _ => left == right,
    }
}

fn compare(op: BinOp, left: &Value, right: &Value) -> Result<Value, ExprError> {
    let ordering = match (left, right) {
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => match (left.as_float(), right.as_float()) {
            (Some(a), Some(b)) => a
                .partial_cmp(&b)
                .ok_or(ExprError::TypeMismatch { op: op.name(), kind: "float" })?,
            _ => {
                let offender = if left.as_float().is_none() { left } else { right };
                return Err(ExprError::TypeMismatch {
                    op: op.name(),
                    kind: offender.kind(),
                });
            }
        },
    };
    Ok(Value::Bool(match op {
        BinOp::Lt => ordering.is_lt(),
        BinOp::Le => ordering.is_le(),
        BinOp::Gt => ordering.is_gt(),
        BinOp::Ge => ordering.is_ge(),
        _ => unreachable!("compare called with non-comparison operator"),
    }))
}

fn arithmetic(op: BinOp, left: &Value, right: &Value) -> Result<Value, ExprError> {
    if op == BinOp::Add && (matches!(left, Value::String(_)) || matches!(right, Value::String(_))) {
        return Ok(Value::String(format!(
            "{}{}",
            left.display_string(),
            right.display_string()
        )));
    }
    // Integer arithmetic stays integral except for division.
    if let (Value::Int(a), Value::Int(b)) = (left, right) {
        return Ok(match op {
            BinOp::Add => Value::Int(a + b),
            BinOp::Sub => Value::Int(a - b),
            BinOp::Mul => Value::Int(a * b),
            BinOp::Div => Value::Float(*a as f64 / *b as f64),
            _ => unreachable!("arithmetic called with non-arithmetic operator"),
        });
    }
    let (Some(a), Some(b)) = (left.as_float(), right.as_float()) else {
        let offender = if left.as_float().is_none() { left } else { right };
        return Err(ExprError::TypeMismatch {
            op: op.name(),
            kind: offender.kind(),
        });
    };
    Ok(Value::Float(match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => a / b,
        _ => unreachable!("arithmetic called with non-arithmetic operator"),
    }))
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Path(String),
    Number(f64),
    Str(String),
    True,
    False,
    Null,
    LParen,
    RParen,
    Bang,
    Minus,
    Plus,
    Star,
    Slash,
    EqEq,
    BangEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    pos: usize,
}

fn lex(source: &str) -> Result<Vec<Token>, ExprError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let start = i;
        let Some(ch) = source[i..].chars().next() else {
            break;
        };
        // Non-ASCII is only meaningful inside string literals, which are
        // sliced out whole below.
        if !ch.is_ascii() {
            return Err(ExprError::UnexpectedChar { ch, pos: start });
        }
        match ch {
            ' ' | '\t' | '\n' | '\r' => {
                i += 1;
                continue;
            }
            '(' => tokens.push(Token { kind: TokenKind::LParen, pos: start }),
            ')' => tokens.push(Token { kind: TokenKind::RParen, pos: start }),
            '+' => tokens.push(Token { kind: TokenKind::Plus, pos: start }),
            '-' => tokens.push(Token { kind: TokenKind::Minus, pos: start }),
            '*' => tokens.push(Token { kind: TokenKind::Star, pos: start }),
            '/' => tokens.push(Token { kind: TokenKind::Slash, pos: start }),
            '!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    i += 1;
                    tokens.push(Token { kind: TokenKind::BangEq, pos: start });
                } else {
                    tokens.push(Token { kind: TokenKind::Bang, pos: start });
                }
            }
            '=' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    i += 1;
                    tokens.push(Token { kind: TokenKind::EqEq, pos: start });
                } else {
                    return Err(ExprError::UnexpectedChar { ch, pos: start });
                }
            }
            '<' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    i += 1;
                    tokens.push(Token { kind: TokenKind::Le, pos: start });
                } else {
                    tokens.push(Token { kind: TokenKind::Lt, pos: start });
                }
            }
            '>' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    i += 1;
                    tokens.push(Token { kind: TokenKind::Ge, pos: start });
                } else {
                    tokens.push(Token { kind: TokenKind::Gt, pos: start });
                }
            }
            '&' => {
                if bytes.get(i + 1) == Some(&b'&') {
                    i += 1;
                    tokens.push(Token { kind: TokenKind::AndAnd, pos: start });
                } else {
                    return Err(ExprError::UnexpectedChar { ch, pos: start });
                }
            }
            '|' => {
                if bytes.get(i + 1) == Some(&b'|') {
                    i += 1;
                    tokens.push(Token { kind: TokenKind::OrOr, pos: start });
                } else {
                    return Err(ExprError::UnexpectedChar { ch, pos: start });
                }
            }
            '\'' | '"' => {
                let quote = ch as u8;
                let mut j = i + 1;
                while j < bytes.len() && bytes[j] != quote {
                    j += 1;
                }
                if j == bytes.len() {
                    return Err(ExprError::UnterminatedString);
                }
                // The quote is ASCII, so the byte scan cannot stop inside a
                // multi-byte character and the slice keeps non-ASCII
                // content intact.
                let literal = source[i + 1..j].to_string();
                i = j;
                tokens.push(Token { kind: TokenKind::Str(literal), pos: start });
            }
            '0'..='9' => {
                let mut j = i;
                while j < bytes.len() && (bytes[j].is_ascii_digit() || bytes[j] == b'.') {
                    j += 1;
                }
                let text = &source[i..j];
                let number: f64 = text
                    .parse()
                    .map_err(|_| ExprError::UnexpectedChar { ch, pos: start })?;
                i = j - 1;
                tokens.push(Token { kind: TokenKind::Number(number), pos: start });
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let mut j = i;
                while j < bytes.len()
                    && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_' || bytes[j] == b'.')
                {
                    j += 1;
                }
                let word = &source[i..j];
                i = j - 1;
                let kind = match word {
                    "true" => TokenKind::True,
                    "false" => TokenKind::False,
                    "null" => TokenKind::Null,
                    _ => TokenKind::Path(word.to_string()),
                };
                tokens.push(Token { kind, pos: start });
            }
            other => return Err(ExprError::UnexpectedChar { ch: other, pos: start }),
        }
        i += 1;
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
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

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().map(|t| &t.kind) == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn or_expr(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.and_expr()?;
        while self.eat(&TokenKind::OrOr) {
            let rhs = self.and_expr()?;
            expr = Expr::Binary(BinOp::Or, Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn and_expr(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.equality()?;
        while self.eat(&TokenKind::AndAnd) {
            let rhs = self.equality()?;
            expr = Expr::Binary(BinOp::And, Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.comparison()?;
        loop {
            let op = if self.eat(&TokenKind::EqEq) {
                BinOp::Eq
            } else if self.eat(&TokenKind::BangEq) {
                BinOp::Ne
            } else {
                return Ok(expr);
            };
            let rhs = self.comparison()?;
            expr = Expr::Binary(op, Box::new(expr), Box::new(rhs));
        }
    }

    fn comparison(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.additive()?;
        loop {
            let op = if self.eat(&TokenKind::Le) {
                BinOp::Le
            } else if self.eat(&TokenKind::Lt) {
                BinOp::Lt
            } else if self.eat(&TokenKind::Ge) {
                BinOp::Ge
            } else if self.eat(&TokenKind::Gt) {
                BinOp::Gt
            } else {
                return Ok(expr);
            };
            let rhs = self.additive()?;
            expr = Expr::Binary(op, Box::new(expr), Box::new(rhs));
        }
    }

    fn additive(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.multiplicative()?;
        loop {
            let op = if self.eat(&TokenKind::Plus) {
                BinOp::Add
            } else if self.eat(&TokenKind::Minus) {
                BinOp::Sub
            } else {
                return Ok(expr);
            };
            let rhs = self.multiplicative()?;
            expr = Expr::Binary(op, Box::new(expr), Box::new(rhs));
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.unary()?;
        loop {
            let op = if self.eat(&TokenKind::Star) {
                BinOp::Mul
            } else if self.eat(&TokenKind::Slash) {
                BinOp::Div
            } else {
                return Ok(expr);
            };
            let rhs = self.unary()?;
            expr = Expr::Binary(op, Box::new(expr), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        if self.eat(&TokenKind::Bang) {
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(self.unary()?)));
        }
        if self.eat(&TokenKind::Minus) {
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let Some(token) = self.advance() else {
            return Err(ExprError::UnexpectedEnd);
        };
        match token.kind {
            TokenKind::Number(n) => {
                if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                    Ok(Expr::Literal(Value::Int(n as i64)))
                } else {
                    Ok(Expr::Literal(Value::Float(n)))
                }
            }
            TokenKind::Str(s) => Ok(Expr::Literal(Value::String(s))),
            TokenKind::True => Ok(Expr::Literal(Value::Bool(true))),
            TokenKind::False => Ok(Expr::Literal(Value::Bool(false))),
            TokenKind::Null => Ok(Expr::Literal(Value::Null)),
            TokenKind::Path(path) => Ok(Expr::Path(path)),
            TokenKind::LParen => {
                let expr = self.or_expr()?;
                if self.eat(&TokenKind::RParen) {
                    Ok(expr)
                } else {
                    Err(ExprError::UnexpectedEnd)
                }
            }
            _ => Err(ExprError::UnexpectedToken { pos: token.pos }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tether_core::wrap;

    fn context() -> Context {
        let mut context = Context::new();
        let item = wrap(Value::from(json!({"done": true, "count": 3, "name": "todo"}))).unwrap();
        context.set("item", item);
        context.set("status", Value::from(json!({"index": 1, "last": false})));
        context
    }

    fn eval(source: &str) -> Value {
        Expr::parse(source).unwrap().eval(&context()).unwrap()
    }

    #[test]
    fn test_literals() {
        assert_eq!(eval("3"), Value::Int(3));
        assert_eq!(eval("2.5"), Value::Float(2.5));
        assert_eq!(eval("'abc'"), Value::String("abc".into()));
        assert_eq!(eval("true"), Value::Bool(true));
        assert_eq!(eval("null"), Value::Null);
    }

    #[test]
    fn test_paths() {
        assert_eq!(eval("item.count"), Value::Int(3));
        assert_eq!(eval("status.index"), Value::Int(1));
        // Unresolved paths are null, not an error.
        assert_eq!(eval("item.missing"), Value::Null);
    }

    #[test]
    fn test_comparison_and_equality() {
        assert_eq!(eval("item.count > 2"), Value::Bool(true));
        assert_eq!(eval("item.count <= 2"), Value::Bool(false));
        assert_eq!(eval("item.done == true"), Value::Bool(true));
        assert_eq!(eval("item.name != 'todo'"), Value::Bool(false));
        assert_eq!(eval("'a' < 'b'"), Value::Bool(true));
        assert_eq!(eval("item.count == 3.0"), Value::Bool(true));
    }

    #[test]
    fn test_logic_and_precedence() {
        assert_eq!(eval("item.done && status.index == 1"), Value::Bool(true));
        assert_eq!(eval("status.last || item.done"), Value::Bool(true));
        assert_eq!(eval("!item.done"), Value::Bool(false));
        assert_eq!(eval("1 + 2 * 3"), Value::Int(7));
        assert_eq!(eval("(1 + 2) * 3"), Value::Int(9));
        assert_eq!(eval("1 + 2 == 3 && 4 > 1"), Value::Bool(true));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("item.count + 1"), Value::Int(4));
        assert_eq!(eval("item.count / 2"), Value::Float(1.5));
        assert_eq!(eval("-item.count"), Value::Int(-3));
        assert_eq!(eval("'n=' + item.count"), Value::String("n=3".into()));
    }

    #[test]
    fn test_truthiness() {
        assert!(!truthy(&Value::Null));
        assert!(!truthy(&Value::Int(0)));
        assert!(!truthy(&Value::String(String::new())));
        assert!(truthy(&Value::String("x".into())));
        assert!(truthy(&Value::Array(vec![])));
    }

    #[test]
    fn test_non_ascii_string_literals() {
        let mut context = Context::new();
        context.set("name", Value::String("Ada Müller".into()));
        let expr = Expr::parse("name == 'Ada Müller'").unwrap();
        assert_eq!(expr.eval(&context), Ok(Value::Bool(true)));
        // Outside a literal, a non-ASCII character is an error naming the
        // character itself.
        assert!(matches!(
            Expr::parse("café"),
            Err(ExprError::UnexpectedChar { ch: 'é', .. })
        ));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Expr::parse("a @ b"),
            Err(ExprError::UnexpectedChar { ch: '@', .. })
        ));
        assert_eq!(Expr::parse("'abc"), Err(ExprError::UnterminatedString));
        assert_eq!(Expr::parse("1 +"), Err(ExprError::UnexpectedEnd));
        assert!(matches!(
            Expr::parse("1 2"),
            Err(ExprError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_eval_type_errors() {
        let result = Expr::parse("item.name - 1").unwrap().eval(&context());
        assert_eq!(
            result,
            Err(ExprError::TypeMismatch { op: "-", kind: "string" })
        );
        let result = Expr::parse("-'x'").unwrap().eval(&context());
        assert!(matches!(result, Err(ExprError::TypeMismatch { op: "-", .. })));
    }
}
