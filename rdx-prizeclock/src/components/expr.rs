//! Time-field expressions.
//!
//! Each prize carries an hour, minute and second field written by the user,
//! e.g. `+5`, `*2`, `/3`, `-30` or `(1+2)*3`. A field transforms the current
//! value of its unit. The grammar is closed: numbers, `+ - * /`, parentheses
//! and unary signs. Anything else is a parse failure and leaves the field's
//! value untouched.

use crate::session::TimeDeltas;
use std::fmt;

/// Parenthesis/unary nesting limit. Deeper input is rejected instead of
/// recursing further.
const MAX_DEPTH: usize = 64;

/// Arithmetic syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
}

impl Expr {
    /// Evaluates by structural recursion. Division by zero yields a
    /// non-finite value, which callers treat as a failed evaluation.
    pub fn eval(&self) -> f64 {
        match self {
            Expr::Num(n) => *n,
            Expr::Add(a, b) => a.eval() + b.eval(),
            Expr::Sub(a, b) => a.eval() - b.eval(),
            Expr::Mul(a, b) => a.eval() * b.eval(),
            Expr::Div(a, b) => a.eval() / b.eval(),
            Expr::Neg(a) => -a.eval(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ParseError {
    UnexpectedChar(char),
    UnexpectedToken(Token),
    UnexpectedEnd,
    MalformedNumber(String),
    TooDeep,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnexpectedChar(c) => write!(f, "unexpected character {c:?}"),
            ParseError::UnexpectedToken(t) => write!(f, "unexpected token {t:?}"),
            ParseError::UnexpectedEnd => f.write_str("unexpected end of expression"),
            ParseError::MalformedNumber(s) => write!(f, "malformed number {s:?}"),
            ParseError::TooDeep => f.write_str("expression nested too deeply"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Token {
    Num(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(src: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        let token = match c {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '0'..='9' | '.' => {
                let mut end = start;
                while let Some(&(i, d)) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        end = i + d.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let literal = &src[start..end];
                let valid = literal.matches('.').count() <= 1 && literal != ".";
                match literal.parse::<f64>() {
                    Ok(n) if valid => Token::Num(n),
                    _ => return Err(ParseError::MalformedNumber(literal.to_string())),
                }
            }
            _ => {
                chars.next();
                match c {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    other => return Err(ParseError::UnexpectedChar(other)),
                }
            }
        };
        tokens.push(token);
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn descend(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::TooDeep);
        }
        Ok(())
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.bump();
            let rhs = self.term()?;
            lhs = match op {
                Token::Plus => Expr::Add(Box::new(lhs), Box::new(rhs)),
                _ => Expr::Sub(Box::new(lhs), Box::new(rhs)),
            };
        }
        Ok(lhs)
    }

    // term := unary (('*' | '/') unary)*
    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.unary()?;
        while let Some(op @ (Token::Star | Token::Slash)) = self.peek() {
            self.bump();
            let rhs = self.unary()?;
            lhs = match op {
                Token::Star => Expr::Mul(Box::new(lhs), Box::new(rhs)),
                _ => Expr::Div(Box::new(lhs), Box::new(rhs)),
            };
        }
        Ok(lhs)
    }

    // unary := ('-' | '+') unary | primary
    fn unary(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.bump();
                self.descend()?;
                let inner = self.unary()?;
                self.depth -= 1;
                Ok(Expr::Neg(Box::new(inner)))
            }
            Some(Token::Plus) => {
                self.bump();
                self.descend()?;
                let inner = self.unary()?;
                self.depth -= 1;
                Ok(inner)
            }
            _ => self.primary(),
        }
    }

    // primary := number | '(' expr ')'
    fn primary(&mut self) -> Result<Expr, ParseError> {
        match self.bump() {
            Some(Token::Num(n)) => Ok(Expr::Num(n)),
            Some(Token::LParen) => {
                self.descend()?;
                let inner = self.expr()?;
                self.depth -= 1;
                match self.bump() {
                    Some(Token::RParen) => Ok(inner),
                    Some(other) => Err(ParseError::UnexpectedToken(other)),
                    None => Err(ParseError::UnexpectedEnd),
                }
            }
            Some(other) => Err(ParseError::UnexpectedToken(other)),
            None => Err(ParseError::UnexpectedEnd),
        }
    }
}

pub(crate) fn parse(src: &str) -> Result<Expr, ParseError> {
    let mut parser = Parser {
        tokens: tokenize(src)?,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(ParseError::UnexpectedToken(token)),
    }
}

/// Parses and evaluates `src`, returning `None` on a parse failure or a
/// non-finite result.
pub fn evaluate(src: &str) -> Option<f64> {
    match parse(src) {
        Ok(expr) => Some(expr.eval()).filter(|v| v.is_finite()),
        Err(err) => {
            tracing::debug!("Ignoring time expression {:?}: {}", src, err);
            None
        }
    }
}

/// Applies one field expression to the field's current value.
///
/// - blank: unchanged
/// - leading `*` / `/`: scale by the operand; an empty, unparsable or zero
///   divisor leaves the value unchanged
/// - anything else, signed or bare: added to the current value
pub fn apply_field(input: &str, current: f64) -> f64 {
    let input = input.trim();
    if input.is_empty() {
        return current;
    }

    let result = if let Some(operand) = input.strip_prefix('*') {
        evaluate(operand).map(|factor| current * factor)
    } else if let Some(operand) = input.strip_prefix('/') {
        evaluate(operand)
            .filter(|divisor| *divisor != 0.0)
            .map(|divisor| current / divisor)
    } else {
        // Leading '+' / '-' parse as unary signs, so signed and bare input
        // both land here as an additive delta.
        evaluate(input).map(|delta| current + delta)
    };

    result.filter(|v| v.is_finite()).unwrap_or(current)
}

/// Splits a total into hour, minute and second parts that sum back to the
/// total. Every part carries the sign of the total, so an overdue timer has
/// negative minutes and seconds.
pub fn decompose(total_seconds: i64) -> (i64, i64, i64) {
    (
        total_seconds / 3600,
        (total_seconds % 3600) / 60,
        total_seconds % 60,
    )
}

/// Applies a prize's three field expressions to a countdown total and
/// recombines the result, rounded to whole seconds. Not clamped.
pub fn apply_time_deltas(total_seconds: i64, deltas: &TimeDeltas) -> i64 {
    let (h, m, s) = decompose(total_seconds);
    let h = apply_field(&deltas.h, h as f64);
    let m = apply_field(&deltas.m, m as f64);
    let s = apply_field(&deltas.s, s as f64);
    (h * 3600.0 + m * 60.0 + s).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn field_rules_against_current_ten() {
        assert_eq!(apply_field("+5", 10.0), 15.0);
        assert_eq!(apply_field("*2", 10.0), 20.0);
        assert_eq!(apply_field("/0", 10.0), 10.0);
        assert_eq!(apply_field("", 10.0), 10.0);
        assert_eq!(apply_field("abc", 10.0), 10.0);
    }

    #[test]
    fn bare_literal_is_a_delta() {
        assert_eq!(apply_field("5", 10.0), 15.0);
        assert_eq!(apply_field("0", 10.0), 10.0);
    }

    #[test]
    fn signed_expressions_add_the_whole_expression() {
        assert_eq!(apply_field("-30", 10.0), -20.0);
        assert_eq!(apply_field("-5+3", 10.0), 8.0);
        assert_eq!(apply_field("+2*3", 10.0), 16.0);
    }

    #[test]
    fn scale_operands_are_expressions() {
        assert_eq!(apply_field("/ (1+1)", 10.0), 5.0);
        assert_eq!(apply_field("*0.5", 10.0), 5.0);
        assert_eq!(apply_field("*-1", 10.0), -10.0);
        assert_eq!(apply_field("*", 10.0), 10.0);
        assert_eq!(apply_field("/", 10.0), 10.0);
        assert_eq!(apply_field("/(2-2)", 10.0), 10.0);
    }

    #[test]
    fn rejects_anything_outside_the_grammar() {
        for input in ["2**3", "1.2.3", "(1", "1)", "alert(1)", "2e3", "0x10", ".", "-", "1 2"] {
            assert_eq!(apply_field(input, 10.0), 10.0, "input {input:?}");
        }
    }

    #[test]
    fn precedence_and_parentheses() {
        assert_eq!(evaluate("1+2*3"), Some(7.0));
        assert_eq!(evaluate("(1+2)*3"), Some(9.0));
        assert_eq!(evaluate("8/2/2"), Some(2.0));
        assert_eq!(evaluate("--1"), Some(1.0));
        assert_eq!(evaluate(".5+1"), Some(1.5));
    }

    #[test]
    fn builds_the_expected_tree() {
        let tree = parse("-(1-2)/3").unwrap();
        assert_eq!(
            tree,
            Expr::Div(
                Box::new(Expr::Neg(Box::new(Expr::Sub(
                    Box::new(Expr::Num(1.0)),
                    Box::new(Expr::Num(2.0)),
                )))),
                Box::new(Expr::Num(3.0)),
            )
        );
    }

    #[test]
    fn deep_nesting_is_rejected_not_overflowed() {
        let deep = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(parse(&deep), Err(ParseError::TooDeep));
        assert_eq!(apply_field(&deep, 3.0), 3.0);
    }

    #[test]
    fn decompose_sums_back_to_total() {
        assert_eq!(decompose(3725), (1, 2, 5));
        assert_eq!(decompose(0), (0, 0, 0));
        assert_eq!(decompose(-10), (0, 0, -10));
        assert_eq!(decompose(-3725), (-1, -2, -5));
        for total in [-7261, -3600, -59, 59, 3599, 90061] {
            let (h, m, s) = decompose(total);
            assert_eq!(h * 3600 + m * 60 + s, total);
        }
    }

    #[test]
    fn overdue_fields_keep_their_sign() {
        let double_seconds = TimeDeltas::new("", "", "*2");
        assert_eq!(apply_time_deltas(-10, &double_seconds), -20);

        let halve_seconds = TimeDeltas::new("", "", "/2");
        assert_eq!(apply_time_deltas(-10, &halve_seconds), -5);

        let double_minutes = TimeDeltas::new("", "*2", "");
        assert_eq!(apply_time_deltas(-150, &double_minutes), -270);
    }

    #[test]
    fn time_deltas_combine_units() {
        let plus_one_minute = TimeDeltas::new("", "1", "");
        assert_eq!(apply_time_deltas(30, &plus_one_minute), 90);

        let double_hours = TimeDeltas::new("*2", "", "");
        assert_eq!(apply_time_deltas(3600 + 5, &double_hours), 7200 + 5);

        let minus_thirty = TimeDeltas::new("", "", "-30");
        assert_eq!(apply_time_deltas(10, &minus_thirty), -20);

        let halve_seconds = TimeDeltas::new("", "", "/2");
        assert_eq!(apply_time_deltas(5, &halve_seconds), 3);
    }

    proptest! {
        #[test]
        fn arbitrary_input_never_panics(input in ".{0,40}", current in -1e6f64..1e6) {
            let out = apply_field(&input, current);
            prop_assert!(out.is_finite());
        }
    }
}
