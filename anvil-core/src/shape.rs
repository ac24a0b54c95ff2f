//! The grid/shape mini-language: a small arithmetic AST describing either an
//! array extent (`u32[nf + 1]`) or a grid dimension
//! (`[blocksPerGrid, numActiveFeatures+1]`).
//!
//! Parsed once at spec-build time (see `crate::parser`), evaluated at bind
//! time against an `Env` built from dimensions, tuneables, and primitive
//! parameter values.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// A parsed shape/grid expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    Const(i64),
    Id(String),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    CeilDiv(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Every free identifier referenced anywhere in this expression.
    pub fn identifiers(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_identifiers(&mut out);
        out
    }

    fn collect_identifiers<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Const(_) => {}
            Expr::Id(name) => out.push(name.as_str()),
            Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::CeilDiv(a, b) => {
                a.collect_identifiers(out);
                b.collect_identifiers(out);
            }
        }
    }

    /// Evaluates this expression against `env`, failing with
    /// `UnknownIdentifier` if a referenced name isn't bound.
    pub fn eval(&self, env: &Env) -> Result<i64> {
        match self {
            Expr::Const(n) => Ok(*n),
            Expr::Id(name) => env.get(name),
            Expr::Add(a, b) => Ok(a.eval(env)? + b.eval(env)?),
            Expr::Sub(a, b) => Ok(a.eval(env)? - b.eval(env)?),
            Expr::Mul(a, b) => Ok(a.eval(env)? * b.eval(env)?),
            Expr::CeilDiv(a, b) => Ok(ceil_div(a.eval(env)?, b.eval(env)?)),
        }
    }
}

/// The environment an `Expr` is evaluated against: tuneables, declared grid
/// dimensions, and the values of any primitive formal parameters the
/// expression is allowed to reference.
#[derive(Clone, Debug, Default)]
pub struct Env {
    values: HashMap<String, i64>,
}

impl Env {
    pub fn new() -> Env {
        Env { values: HashMap::new() }
    }

    pub fn bind(&mut self, name: impl Into<String>, value: i64) -> &mut Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Result<i64> {
        self.values.get(name).copied().ok_or_else(|| Error::UnknownIdentifier {
            context: "shape or grid expression",
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

/// Rounds `global` up to the next multiple of `local`; `(a + b - 1) / b`
/// using integer division, the same rule `ocl_core::util::padded_len`
/// follows.
pub fn ceil_div(global: i64, local: i64) -> i64 {
    if local == 0 {
        return 0;
    }
    (global + local - 1) / local
}

/// The shape of a formal parameter: either a bare primitive or an array
/// whose length is given by a shape expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Shape {
    Scalar,
    Array(Expr),
}

impl Shape {
    pub fn is_scalar(&self) -> bool {
        matches!(self, Shape::Scalar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceil_div_rounds_up() {
        assert_eq!(ceil_div(100, 64), 2);
        assert_eq!(ceil_div(128, 64), 2);
        assert_eq!(ceil_div(1, 64), 1);
        assert_eq!(ceil_div(0, 64), 0);
    }

    #[test]
    fn eval_resolves_bound_identifiers() {
        let mut env = Env::new();
        env.bind("nf", 7);
        let expr = Expr::Add(Box::new(Expr::Id("nf".into())), Box::new(Expr::Const(1)));
        assert_eq!(expr.eval(&env).unwrap(), 8);
    }

    #[test]
    fn eval_fails_on_unbound_identifier() {
        let env = Env::new();
        let expr = Expr::Id("missing".into());
        match expr.eval(&env) {
            Err(Error::UnknownIdentifier { name, .. }) => assert_eq!(name, "missing"),
            other => panic!("expected UnknownIdentifier, got {:?}", other),
        }
    }

    #[test]
    fn identifiers_collects_all_free_names() {
        let expr = Expr::CeilDiv(
            Box::new(Expr::Id("n".into())),
            Box::new(Expr::Mul(Box::new(Expr::Id("blockSize".into())), Box::new(Expr::Const(2)))),
        );
        let mut ids = expr.identifiers();
        ids.sort();
        assert_eq!(ids, vec!["blockSize", "n"]);
    }
}
