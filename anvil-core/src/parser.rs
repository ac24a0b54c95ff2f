//! Recursive-descent parser for the two compact grammars this runtime defines:
//!
//! - `type_expr`: `IDENT | IDENT "[" EXPR "]"` — used by `add_parameter`.
//! - `EXPR`: terms joined by `+ - *` and the pseudo-function `ceilDiv(a, b)`,
//!   operands integer literals or identifiers — used by array extents,
//!   dimension extents, and grid expressions.
//!
//! Parsed once at spec-build time; see `crate::shape` for the AST these
//! produce and its bind-time evaluator.

use crate::error::{Error, Result};
use crate::shape::{Expr, Shape};

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Ident(String),
    Number(i64),
    Plus,
    Minus,
    Star,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
}

fn tokenize(src: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '+' => { tokens.push(Token::Plus); i += 1; }
            '-' => { tokens.push(Token::Minus); i += 1; }
            '*' => { tokens.push(Token::Star); i += 1; }
            '(' => { tokens.push(Token::LParen); i += 1; }
            ')' => { tokens.push(Token::RParen); i += 1; }
            '[' => { tokens.push(Token::LBracket); i += 1; }
            ']' => { tokens.push(Token::RBracket); i += 1; }
            ',' => { tokens.push(Token::Comma); i += 1; }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let n: i64 = text.parse().map_err(|_| Error::UnknownIdentifier {
                    context: "integer literal",
                    name: text.clone(),
                })?;
                tokens.push(Token::Number(n));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                tokens.push(Token::Ident(text));
            }
            other => {
                return Err(Error::UnknownIdentifier {
                    context: "expression token",
                    name: other.to_string(),
                })
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Parser {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, want: &Token) -> Result<()> {
        match self.next() {
            Some(ref got) if got == want => Ok(()),
            Some(got) => Err(unexpected_token(&format!("{:?}", got))),
            None => Err(unexpected_token("end of expression")),
        }
    }

    /// `EXPR := term (('+' | '-') term)*`
    fn parse_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.next();
                    let rhs = self.parse_term()?;
                    lhs = Expr::Add(Box::new(lhs), Box::new(rhs));
                }
                Some(Token::Minus) => {
                    self.next();
                    let rhs = self.parse_term()?;
                    lhs = Expr::Sub(Box::new(lhs), Box::new(rhs));
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    /// `term := factor ('*' factor)*`
    fn parse_term(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_factor()?;
        while let Some(Token::Star) = self.peek() {
            self.next();
            let rhs = self.parse_factor()?;
            lhs = Expr::Mul(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    /// `factor := NUMBER | IDENT | "ceilDiv" "(" EXPR "," EXPR ")" | "(" EXPR ")"`
    fn parse_factor(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Const(n)),
            Some(Token::Ident(name)) if name == "ceilDiv" || name == "CeilDiv" => {
                self.expect(&Token::LParen)?;
                let a = self.parse_expr()?;
                self.expect(&Token::Comma)?;
                let b = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(Expr::CeilDiv(Box::new(a), Box::new(b)))
            }
            Some(Token::Ident(name)) => Ok(Expr::Id(name)),
            Some(Token::LParen) => {
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(other) => Err(unexpected_token(&format!("{:?}", other))),
            None => Err(unexpected_token("end of expression")),
        }
    }
}

fn unexpected_token(what: &str) -> Error {
    Error::UnknownIdentifier { context: "expression syntax", name: what.to_string() }
}

/// Parses a standalone `EXPR` (used for dimension extents, tuneable
/// defaults expressed symbolically, and each element of a grid expression
/// list).
pub fn parse_expr(src: &str) -> Result<Expr> {
    let tokens = tokenize(src)?;
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(unexpected_token("trailing tokens"));
    }
    Ok(expr)
}

/// Parses a bracketed, comma-separated list of expressions, as used by
/// `set_grid_expression`'s `global`/`local` arguments.
pub fn parse_expr_list(src: &str) -> Result<Vec<Expr>> {
    let trimmed = src.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| unexpected_token("expected a bracketed expression list"))?;

    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }

    inner.split(',').map(parse_expr).collect()
}

/// Parses `type_expr := IDENT | IDENT "[" EXPR "]"`, returning the element
/// type name and the parsed `Shape`.
pub fn parse_type_expr(src: &str) -> Result<(String, Shape)> {
    let src = src.trim();
    match src.find('[') {
        None => Ok((src.to_string(), Shape::Scalar)),
        Some(open) => {
            if !src.ends_with(']') {
                return Err(unexpected_token("expected closing ']'"));
            }
            let prim = src[..open].trim().to_string();
            let expr_src = &src[open + 1..src.len() - 1];
            let expr = parse_expr(expr_src)?;
            Ok((prim, Shape::Array(expr)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Env;

    #[test]
    fn parses_bare_scalar_type() {
        let (prim, shape) = parse_type_expr("u32").unwrap();
        assert_eq!(prim, "u32");
        assert_eq!(shape, Shape::Scalar);
    }

    #[test]
    fn parses_array_type_with_arithmetic_shape() {
        let (prim, shape) = parse_type_expr("u32[nf + 1]").unwrap();
        assert_eq!(prim, "u32");
        let mut env = Env::new();
        env.bind("nf", 9);
        match shape {
            Shape::Array(expr) => assert_eq!(expr.eval(&env).unwrap(), 10),
            Shape::Scalar => panic!("expected an array shape"),
        }
    }

    #[test]
    fn parses_ceil_div_grid_expression() {
        let exprs = parse_expr_list("[ceilDiv(n,64)*64]").unwrap();
        assert_eq!(exprs.len(), 1);
        let mut env = Env::new();
        env.bind("n", 100);
        assert_eq!(exprs[0].eval(&env).unwrap(), 128);
    }

    #[test]
    fn parses_multi_axis_grid_expression() {
        let exprs = parse_expr_list("[blocksPerGrid, numActiveFeatures+1]").unwrap();
        assert_eq!(exprs.len(), 2);
        let mut env = Env::new();
        env.bind("blocksPerGrid", 4);
        env.bind("numActiveFeatures", 10);
        assert_eq!(exprs[0].eval(&env).unwrap(), 4);
        assert_eq!(exprs[1].eval(&env).unwrap(), 11);
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(parse_expr("1 + 2 )").is_err());
    }
}
