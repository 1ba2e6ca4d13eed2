//! The satisfiability oracle consumed by the search.
//!
//! The engine never inspects how queries are decided; it talks to a
//! [`Oracle`] through incremental scoped assertions and assumption-based
//! checks, and pulls models and unsat cores back out. Instances are pooled
//! and handed out per query slot by [`pool::OraclePool`].

use crate::fol::{Term, Value, Var};
use rustc_hash::FxHashMap;
use std::fmt;

pub mod enumerate;
pub mod pool;

pub use enumerate::EnumOracle;
pub use pool::{OraclePool, Slot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SatResult {
    Sat,
    Unsat,
    Unknown,
}

/// A satisfying assignment.
#[derive(Debug, Clone, Default)]
pub struct Model {
    values: FxHashMap<Var, Value>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, var: Var, value: Value) {
        self.values.insert(var, value);
    }

    pub fn get(&self, var: &Var) -> Option<Value> {
        self.values.get(var).copied()
    }

    pub fn eval(&self, t: &Term) -> Option<Value> {
        t.eval(&|v| self.get(v))
    }

    /// True iff `t` evaluates to true under this assignment.
    pub fn holds(&self, t: &Term) -> bool {
        self.eval(t) == Some(Value::Bool(true))
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<_> = self.values.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        write!(f, "[")?;
        for (i, (v, val)) in entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}={}", val.to_term())?;
        }
        write!(f, "]")
    }
}

/// An incremental satisfiability solver with scoped assertions.
///
/// `model` is meaningful only after a `Sat` check, `unsat_core` only after
/// an `Unsat` one; the core is a subset of the assumptions passed to that
/// check.
pub trait Oracle {
    fn push(&mut self);

    fn pop(&mut self);

    fn assert(&mut self, fml: &Term);

    fn check(&mut self, assumptions: &[Term]) -> SatResult;

    fn model(&self) -> Model;

    fn unsat_core(&self) -> Vec<Term>;
}
