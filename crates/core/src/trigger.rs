// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trigger-condition expressions for watcher agents.
//!
//! A small numeric/boolean language evaluated against the JSON context a
//! watch script returns:
//!
//! ```text
//! new_prs > 0 and not draft
//! (errors / total) * 100 >= 5 || status == "down"
//! repo.stars % 100 == 0 ? true : false
//! ```
//!
//! Operators by precedence, lowest first: `?:`, `or`/`||`, `and`/`&&`,
//! `not`/`!`, comparisons, `+ -`, `* / %`, unary `-`, `^`. Identifiers
//! resolve against the context, with `.` for nested fields.

use serde_json::Value as Json;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ExprError {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("unterminated string")]
    UnterminatedString,
    #[error("unexpected token {0}")]
    UnexpectedToken(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("undefined variable '{0}'")]
    Undefined(String),
    #[error("type error: {0}")]
    Type(String),
    #[error("expression nested deeper than {MAX_DEPTH} levels")]
    TooDeep,
    #[error("expression longer than {MAX_TOKENS} tokens")]
    TooLong,
}

/// Parenthesis, unary and ternary nesting allowed in one condition
pub const MAX_DEPTH: usize = 64;
/// Tokens allowed in one condition; bounds left-nested operator chains too
pub const MAX_TOKENS: usize = 512;

/// Evaluate a trigger condition. Empty conditions are true; anything that
/// fails to parse or evaluate is false.
pub fn evaluate(condition: &str, context: &Json) -> bool {
    if condition.trim().is_empty() {
        return true;
    }
    try_evaluate(condition, context).unwrap_or(false)
}

/// Evaluate a condition, reporting why it failed.
pub fn try_evaluate(condition: &str, context: &Json) -> Result<bool, ExprError> {
    let tokens = tokenize(condition)?;
    if tokens.len() > MAX_TOKENS {
        return Err(ExprError::TooLong);
    }
    let mut parser = Parser { tokens, pos: 0, depth: 0 };
    let expr = parser.ternary()?;
    if let Some(tok) = parser.peek() {
        return Err(ExprError::UnexpectedToken(format!("{tok:?}")));
    }
    Ok(expr.eval(context)?.truthy())
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Str(String),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
    Question,
    Colon,
}

const OPERATORS: [&str; 16] =
    ["==", "!=", "<=", ">=", "&&", "||", "<", ">", "+", "-", "*", "/", "%", "^", "!", "."];

fn tokenize(src: &str) -> Result<Vec<Token>, ExprError> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(char::is_ascii_digit)) {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let n = text.parse::<f64>().map_err(|_| ExprError::UnexpectedToken(text.clone()))?;
            tokens.push(Token::Num(n));
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else if c == '"' || c == '\'' {
            let quote = c;
            let mut s = String::new();
            i += 1;
            loop {
                match chars.get(i) {
                    None => return Err(ExprError::UnterminatedString),
                    Some('\\') => {
                        if let Some(next) = chars.get(i + 1) {
                            s.push(*next);
                        }
                        i += 2;
                    }
                    Some(ch) if *ch == quote => {
                        i += 1;
                        break;
                    }
                    Some(ch) => {
                        s.push(*ch);
                        i += 1;
                    }
                }
            }
            tokens.push(Token::Str(s));
        } else if c == '(' {
            tokens.push(Token::LParen);
            i += 1;
        } else if c == ')' {
            tokens.push(Token::RParen);
            i += 1;
        } else if c == '?' {
            tokens.push(Token::Question);
            i += 1;
        } else if c == ':' {
            tokens.push(Token::Colon);
            i += 1;
        } else {
            let rest: String = chars[i..chars.len().min(i + 2)].iter().collect();
            let op = OPERATORS
                .iter()
                .find(|op| rest.starts_with(*op))
                .ok_or(ExprError::UnexpectedChar(c))?;
            tokens.push(Token::Op(op));
            i += op.len();
        }
    }
    Ok(tokens)
}

#[derive(Debug)]
enum Expr {
    Lit(Value),
    Var(Vec<String>),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Binary(&'static str, Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Cond(Box<Expr>, Box<Expr>, Box<Expr>),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn eat_op(&mut self, ops: &[&str]) -> Option<&'static str> {
        match self.peek() {
            Some(Token::Op(op)) if ops.contains(op) => {
                let op = *op;
                self.pos += 1;
                Some(op)
            }
            _ => None,
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(w)) if w == word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, want: Token) -> Result<(), ExprError> {
        match self.next() {
            Some(tok) if tok == want => Ok(()),
            Some(tok) => Err(ExprError::UnexpectedToken(format!("{tok:?}"))),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    /// Run `f` one nesting level down, failing past [`MAX_DEPTH`].
    fn nested(&mut self, f: fn(&mut Self) -> Result<Expr, ExprError>) -> Result<Expr, ExprError> {
        if self.depth >= MAX_DEPTH {
            return Err(ExprError::TooDeep);
        }
        self.depth += 1;
        let expr = f(self);
        self.depth -= 1;
        expr
    }

    fn ternary(&mut self) -> Result<Expr, ExprError> {
        self.nested(Self::ternary_level)
    }

    fn ternary_level(&mut self) -> Result<Expr, ExprError> {
        let cond = self.or()?;
        if self.peek() == Some(&Token::Question) {
            self.pos += 1;
            let then = self.ternary()?;
            self.expect(Token::Colon)?;
            let otherwise = self.ternary()?;
            return Ok(Expr::Cond(Box::new(cond), Box::new(then), Box::new(otherwise)));
        }
        Ok(cond)
    }

    fn or(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.and()?;
        while self.eat_word("or") || self.eat_op(&["||"]).is_some() {
            let rhs = self.and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.not()?;
        while self.eat_word("and") || self.eat_op(&["&&"]).is_some() {
            let rhs = self.not()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn not(&mut self) -> Result<Expr, ExprError> {
        if self.eat_word("not") || self.eat_op(&["!"]).is_some() {
            return Ok(Expr::Not(Box::new(self.nested(Self::not)?)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ExprError> {
        let lhs = self.additive()?;
        if let Some(op) = self.eat_op(&["==", "!=", "<", "<=", ">", ">="]) {
            let rhs = self.additive()?;
            return Ok(Expr::Binary(op, Box::new(lhs), Box::new(rhs)));
        }
        Ok(lhs)
    }

    fn additive(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.multiplicative()?;
        while let Some(op) = self.eat_op(&["+", "-"]) {
            let rhs = self.multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.unary()?;
        while let Some(op) = self.eat_op(&["*", "/", "%"]) {
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        if self.eat_op(&["-"]).is_some() {
            return Ok(Expr::Neg(Box::new(self.nested(Self::unary)?)));
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr, ExprError> {
        let base = self.primary()?;
        if self.eat_op(&["^"]).is_some() {
            let exp = self.nested(Self::unary)?;
            return Ok(Expr::Binary("^", Box::new(base), Box::new(exp)));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        match self.next() {
            Some(Token::Num(n)) => Ok(Expr::Lit(Value::Num(n))),
            Some(Token::Str(s)) => Ok(Expr::Lit(Value::Str(s))),
            Some(Token::LParen) => {
                let inner = self.ternary()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(word)) => match word.as_str() {
                "true" => Ok(Expr::Lit(Value::Bool(true))),
                "false" => Ok(Expr::Lit(Value::Bool(false))),
                "null" => Ok(Expr::Lit(Value::Null)),
                "and" | "or" | "not" => Err(ExprError::UnexpectedToken(word)),
                _ => {
                    let mut path = vec![word];
                    while self.eat_op(&["."]).is_some() {
                        match self.next() {
                            Some(Token::Ident(field)) => path.push(field),
                            Some(tok) => return Err(ExprError::UnexpectedToken(format!("{tok:?}"))),
                            None => return Err(ExprError::UnexpectedEnd),
                        }
                    }
                    Ok(Expr::Var(path))
                }
            },
            Some(tok) => Err(ExprError::UnexpectedToken(format!("{tok:?}"))),
            None => Err(ExprError::UnexpectedEnd),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Num(f64),
    Bool(bool),
    Str(String),
    Null,
}

impl Value {
    fn truthy(&self) -> bool {
        match self {
            Value::Num(n) => *n != 0.0 && !n.is_nan(),
            Value::Bool(b) => *b,
            Value::Str(s) => !s.is_empty(),
            Value::Null => false,
        }
    }

    fn number(&self) -> Result<f64, ExprError> {
        match self {
            Value::Num(n) => Ok(*n),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            other => Err(ExprError::Type(format!("{other:?} is not a number"))),
        }
    }

    fn from_json(name: &str, json: &Json) -> Result<Self, ExprError> {
        match json {
            Json::Null => Ok(Value::Null),
            Json::Bool(b) => Ok(Value::Bool(*b)),
            Json::Number(n) => n
                .as_f64()
                .map(Value::Num)
                .ok_or_else(|| ExprError::Type(format!("{name} is not representable"))),
            Json::String(s) => Ok(Value::Str(s.clone())),
            Json::Array(_) | Json::Object(_) => {
                Err(ExprError::Type(format!("{name} is not a scalar")))
            }
        }
    }
}

impl Expr {
    fn eval(&self, ctx: &Json) -> Result<Value, ExprError> {
        match self {
            Expr::Lit(v) => Ok(v.clone()),
            Expr::Var(path) => {
                let name = path.join(".");
                let mut cur = ctx;
                for field in path {
                    cur = cur.get(field).ok_or_else(|| ExprError::Undefined(name.clone()))?;
                }
                Value::from_json(&name, cur)
            }
            Expr::Not(inner) => Ok(Value::Bool(!inner.eval(ctx)?.truthy())),
            Expr::Neg(inner) => Ok(Value::Num(-inner.eval(ctx)?.number()?)),
            Expr::And(lhs, rhs) => {
                Ok(Value::Bool(lhs.eval(ctx)?.truthy() && rhs.eval(ctx)?.truthy()))
            }
            Expr::Or(lhs, rhs) => {
                Ok(Value::Bool(lhs.eval(ctx)?.truthy() || rhs.eval(ctx)?.truthy()))
            }
            Expr::Cond(cond, then, otherwise) => {
                if cond.eval(ctx)?.truthy() {
                    then.eval(ctx)
                } else {
                    otherwise.eval(ctx)
                }
            }
            Expr::Binary(op, lhs, rhs) => binary(op, lhs.eval(ctx)?, rhs.eval(ctx)?),
        }
    }
}

fn binary(op: &str, lhs: Value, rhs: Value) -> Result<Value, ExprError> {
    match op {
        "==" => Ok(Value::Bool(loose_eq(&lhs, &rhs))),
        "!=" => Ok(Value::Bool(!loose_eq(&lhs, &rhs))),
        "<" | "<=" | ">" | ">=" => {
            let ord = match (&lhs, &rhs) {
                (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
                _ => lhs.number()?.partial_cmp(&rhs.number()?),
            };
            let Some(ord) = ord else {
                return Ok(Value::Bool(false));
            };
            Ok(Value::Bool(match op {
                "<" => ord.is_lt(),
                "<=" => ord.is_le(),
                ">" => ord.is_gt(),
                _ => ord.is_ge(),
            }))
        }
        "+" => match (lhs, rhs) {
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
            (a, b) => Ok(Value::Num(a.number()? + b.number()?)),
        },
        "-" => Ok(Value::Num(lhs.number()? - rhs.number()?)),
        "*" => Ok(Value::Num(lhs.number()? * rhs.number()?)),
        "/" => Ok(Value::Num(lhs.number()? / rhs.number()?)),
        "%" => Ok(Value::Num(lhs.number()? % rhs.number()?)),
        "^" => Ok(Value::Num(lhs.number()?.powf(rhs.number()?))),
        other => Err(ExprError::UnexpectedToken(other.to_string())),
    }
}

fn loose_eq(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Str(_), _) | (_, Value::Str(_)) => false,
        (a, b) => match (a.number(), b.number()) {
            (Ok(x), Ok(y)) => x == y,
            _ => false,
        },
    }
}

#[cfg(test)]
#[path = "trigger_tests.rs"]
mod tests;
