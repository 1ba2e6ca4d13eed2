//! Many-sorted first-order terms.
//!
//! This is the minimal formula carrier the engine needs: ground and
//! quantifier-free terms over booleans and integers, with substitution,
//! free-variable collection and light constant folding. Everything the
//! search learns (lemmas, obligations, reach facts) is a [`Cube`] of
//! literals over relation argument variables.

// These constructors build AST nodes, not perform operations.
#![allow(clippy::should_implement_trait)]

use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use std::sync::Arc;

mod cube;

pub use cube::Cube;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sort {
    Bool,
    Int,
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Bool => write!(f, "Bool"),
            Sort::Int => write!(f, "Int"),
        }
    }
}

/// A sorted variable, identified by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var {
    pub name: String,
    pub sort: Sort,
}

impl Var {
    pub fn new(name: impl Into<String>, sort: Sort) -> Self {
        Self {
            name: name.into(),
            sort,
        }
    }

    /// Same variable under a different name, used for origin-indexed
    /// renaming of relation argument variables.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sort: self.sort,
        }
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A concrete value assigned by a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    Bool(bool),
    Int(i64),
}

impl Value {
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(b),
            Value::Int(_) => None,
        }
    }

    pub fn as_int(self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(i),
            Value::Bool(_) => None,
        }
    }

    pub fn to_term(self) -> Term {
        match self {
            Value::Bool(b) => Term::Bool(b),
            Value::Int(i) => Term::Int(i),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Op {
    Not,
    And,
    Or,
    Implies,
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Neg,
}

impl Op {
    fn symbol(self) -> &'static str {
        match self {
            Op::Not => "not",
            Op::And => "and",
            Op::Or => "or",
            Op::Implies => "=>",
            Op::Eq => "=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Neg => "-",
        }
    }
}

/// A quantifier-free term. Children are shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    Bool(bool),
    Int(i64),
    Var(Var),
    Op(Op, Vec<Arc<Term>>),
}

fn args(ts: impl IntoIterator<Item = Term>) -> Vec<Arc<Term>> {
    ts.into_iter().map(Arc::new).collect()
}

impl Term {
    pub fn int(i: i64) -> Self {
        Term::Int(i)
    }

    pub fn var(v: Var) -> Self {
        Term::Var(v)
    }

    pub fn tt() -> Self {
        Term::Bool(true)
    }

    pub fn ff() -> Self {
        Term::Bool(false)
    }

    pub fn not(t: Term) -> Self {
        match t {
            Term::Bool(b) => Term::Bool(!b),
            // double negation elimination
            Term::Op(Op::Not, a) if a.len() == 1 => (*a[0]).clone(),
            t => Term::Op(Op::Not, args([t])),
        }
    }

    /// Conjunction, flattened; `true` conjuncts vanish, `false` dominates.
    pub fn and(ts: impl IntoIterator<Item = Term>) -> Self {
        let mut out = Vec::new();
        for t in ts {
            match t {
                Term::Bool(true) => {}
                Term::Bool(false) => return Term::Bool(false),
                Term::Op(Op::And, inner) => out.extend(inner.iter().map(|a| (**a).clone())),
                t => out.push(t),
            }
        }
        match out.len() {
            0 => Term::Bool(true),
            1 => out.pop().unwrap(),
            _ => Term::Op(Op::And, args(out)),
        }
    }

    pub fn or(ts: impl IntoIterator<Item = Term>) -> Self {
        let mut out = Vec::new();
        for t in ts {
            match t {
                Term::Bool(false) => {}
                Term::Bool(true) => return Term::Bool(true),
                Term::Op(Op::Or, inner) => out.extend(inner.iter().map(|a| (**a).clone())),
                t => out.push(t),
            }
        }
        match out.len() {
            0 => Term::Bool(false),
            1 => out.pop().unwrap(),
            _ => Term::Op(Op::Or, args(out)),
        }
    }

    pub fn implies(a: Term, b: Term) -> Self {
        match (a, b) {
            (Term::Bool(false), _) => Term::Bool(true),
            (Term::Bool(true), b) => b,
            (_, Term::Bool(true)) => Term::Bool(true),
            (a, Term::Bool(false)) => Term::not(a),
            (a, b) => Term::Op(Op::Implies, args([a, b])),
        }
    }

    pub fn eq(a: Term, b: Term) -> Self {
        match (&a, &b) {
            (Term::Int(x), Term::Int(y)) => Term::Bool(x == y),
            (Term::Bool(x), Term::Bool(y)) => Term::Bool(x == y),
            _ if a == b => Term::Bool(true),
            _ => Term::Op(Op::Eq, args([a, b])),
        }
    }

    pub fn lt(a: Term, b: Term) -> Self {
        match (&a, &b) {
            (Term::Int(x), Term::Int(y)) => Term::Bool(x < y),
            _ => Term::Op(Op::Lt, args([a, b])),
        }
    }

    pub fn le(a: Term, b: Term) -> Self {
        match (&a, &b) {
            (Term::Int(x), Term::Int(y)) => Term::Bool(x <= y),
            _ => Term::Op(Op::Le, args([a, b])),
        }
    }

    pub fn gt(a: Term, b: Term) -> Self {
        match (&a, &b) {
            (Term::Int(x), Term::Int(y)) => Term::Bool(x > y),
            _ => Term::Op(Op::Gt, args([a, b])),
        }
    }

    pub fn ge(a: Term, b: Term) -> Self {
        match (&a, &b) {
            (Term::Int(x), Term::Int(y)) => Term::Bool(x >= y),
            _ => Term::Op(Op::Ge, args([a, b])),
        }
    }

    pub fn add(a: Term, b: Term) -> Self {
        match (&a, &b) {
            (Term::Int(x), Term::Int(y)) => Term::Int(x.wrapping_add(*y)),
            (Term::Int(0), _) => b,
            (_, Term::Int(0)) => a,
            _ => Term::Op(Op::Add, args([a, b])),
        }
    }

    pub fn sub(a: Term, b: Term) -> Self {
        match (&a, &b) {
            (Term::Int(x), Term::Int(y)) => Term::Int(x.wrapping_sub(*y)),
            (_, Term::Int(0)) => a,
            _ => Term::Op(Op::Sub, args([a, b])),
        }
    }

    pub fn mul(a: Term, b: Term) -> Self {
        match (&a, &b) {
            (Term::Int(x), Term::Int(y)) => Term::Int(x.wrapping_mul(*y)),
            _ => Term::Op(Op::Mul, args([a, b])),
        }
    }

    pub fn neg(a: Term) -> Self {
        match a {
            Term::Int(x) => Term::Int(x.wrapping_neg()),
            a => Term::Op(Op::Neg, args([a])),
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Term::Bool(true))
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Term::Bool(false))
    }

    /// Replace variables according to `map`, rebuilding with the smart
    /// constructors so ground subterms fold away.
    pub fn substitute(&self, map: &FxHashMap<Var, Term>) -> Term {
        match self {
            Term::Bool(_) | Term::Int(_) => self.clone(),
            Term::Var(v) => map.get(v).cloned().unwrap_or_else(|| self.clone()),
            Term::Op(op, ts) => {
                let ts: Vec<Term> = ts.iter().map(|t| t.substitute(map)).collect();
                rebuild(*op, ts)
            }
        }
    }

    /// Rename variables according to `map`.
    pub fn rename(&self, map: &FxHashMap<Var, Var>) -> Term {
        let map: FxHashMap<Var, Term> = map
            .iter()
            .map(|(from, to)| (from.clone(), Term::Var(to.clone())))
            .collect();
        self.substitute(&map)
    }

    pub fn collect_vars(&self, out: &mut FxHashSet<Var>) {
        match self {
            Term::Bool(_) | Term::Int(_) => {}
            Term::Var(v) => {
                out.insert(v.clone());
            }
            Term::Op(_, ts) => {
                for t in ts {
                    t.collect_vars(out);
                }
            }
        }
    }

    pub fn free_vars(&self) -> FxHashSet<Var> {
        let mut out = FxHashSet::default();
        self.collect_vars(&mut out);
        out
    }

    /// Evaluate under a total assignment; `None` on an unassigned variable
    /// or a sort mismatch.
    pub fn eval(&self, assign: &dyn Fn(&Var) -> Option<Value>) -> Option<Value> {
        match self {
            Term::Bool(b) => Some(Value::Bool(*b)),
            Term::Int(i) => Some(Value::Int(*i)),
            Term::Var(v) => assign(v),
            Term::Op(op, ts) => {
                let vs: Vec<Value> = ts
                    .iter()
                    .map(|t| t.eval(assign))
                    .collect::<Option<Vec<_>>>()?;
                eval_op(*op, &vs)
            }
        }
    }
}

fn rebuild(op: Op, mut ts: Vec<Term>) -> Term {
    match op {
        Op::Not => Term::not(ts.pop().unwrap()),
        Op::And => Term::and(ts),
        Op::Or => Term::or(ts),
        Op::Implies => {
            let b = ts.pop().unwrap();
            Term::implies(ts.pop().unwrap(), b)
        }
        Op::Eq => {
            let b = ts.pop().unwrap();
            Term::eq(ts.pop().unwrap(), b)
        }
        Op::Lt => {
            let b = ts.pop().unwrap();
            Term::lt(ts.pop().unwrap(), b)
        }
        Op::Le => {
            let b = ts.pop().unwrap();
            Term::le(ts.pop().unwrap(), b)
        }
        Op::Gt => {
            let b = ts.pop().unwrap();
            Term::gt(ts.pop().unwrap(), b)
        }
        Op::Ge => {
            let b = ts.pop().unwrap();
            Term::ge(ts.pop().unwrap(), b)
        }
        Op::Add => {
            let b = ts.pop().unwrap();
            Term::add(ts.pop().unwrap(), b)
        }
        Op::Sub => {
            let b = ts.pop().unwrap();
            Term::sub(ts.pop().unwrap(), b)
        }
        Op::Mul => {
            let b = ts.pop().unwrap();
            Term::mul(ts.pop().unwrap(), b)
        }
        Op::Neg => Term::neg(ts.pop().unwrap()),
    }
}

fn eval_op(op: Op, vs: &[Value]) -> Option<Value> {
    let b = |i: usize| vs.get(i).copied().and_then(Value::as_bool);
    let i = |i: usize| vs.get(i).copied().and_then(Value::as_int);
    Some(match op {
        Op::Not => Value::Bool(!b(0)?),
        Op::And => {
            let mut r = true;
            for v in vs {
                r &= v.as_bool()?;
            }
            Value::Bool(r)
        }
        Op::Or => {
            let mut r = false;
            for v in vs {
                r |= v.as_bool()?;
            }
            Value::Bool(r)
        }
        Op::Implies => Value::Bool(!b(0)? || b(1)?),
        Op::Eq => Value::Bool(vs.first()? == vs.get(1)?),
        Op::Lt => Value::Bool(i(0)? < i(1)?),
        Op::Le => Value::Bool(i(0)? <= i(1)?),
        Op::Gt => Value::Bool(i(0)? > i(1)?),
        Op::Ge => Value::Bool(i(0)? >= i(1)?),
        Op::Add => Value::Int(i(0)?.wrapping_add(i(1)?)),
        Op::Sub => Value::Int(i(0)?.wrapping_sub(i(1)?)),
        Op::Mul => Value::Int(i(0)?.wrapping_mul(i(1)?)),
        Op::Neg => Value::Int(i(0)?.wrapping_neg()),
    })
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Bool(b) => write!(f, "{b}"),
            Term::Int(i) => write!(f, "{i}"),
            Term::Var(v) => write!(f, "{v}"),
            Term::Op(op, ts) => {
                write!(f, "({}", op.symbol())?;
                for t in ts {
                    write!(f, " {t}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Var {
        Var::new("x", Sort::Int)
    }

    #[test]
    fn constructors_fold_constants() {
        assert_eq!(Term::add(Term::int(2), Term::int(3)), Term::Int(5));
        assert_eq!(Term::lt(Term::int(2), Term::int(3)), Term::Bool(true));
        assert_eq!(Term::not(Term::not(Term::var(x()))), Term::var(x()));
        assert_eq!(
            Term::and([Term::tt(), Term::var(Var::new("b", Sort::Bool))]),
            Term::var(Var::new("b", Sort::Bool))
        );
        assert!(Term::and([Term::ff(), Term::var(x())]).is_false());
    }

    #[test]
    fn substitute_folds() {
        let t = Term::lt(Term::add(Term::var(x()), Term::int(1)), Term::int(10));
        let mut map = FxHashMap::default();
        map.insert(x(), Term::int(4));
        assert_eq!(t.substitute(&map), Term::Bool(true));
        map.insert(x(), Term::int(9));
        assert_eq!(t.substitute(&map), Term::Bool(false));
    }

    #[test]
    fn eval_and_free_vars() {
        let t = Term::ge(Term::var(x()), Term::int(10));
        assert_eq!(t.free_vars().len(), 1);
        let v = t.eval(&|v| (v == &x()).then_some(Value::Int(11)));
        assert_eq!(v, Some(Value::Bool(true)));
        assert_eq!(t.eval(&|_| None), None);
    }
}
