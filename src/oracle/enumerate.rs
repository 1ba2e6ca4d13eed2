//! A reference oracle deciding quantifier-free formulas over a bounded
//! integer range by model enumeration.
//!
//! Complete within its range and budget, honest outside of them: a query
//! whose assignment space exceeds the budget reports `Unknown` rather than
//! guessing. Unsat cores are deletion-minimized over the assumptions. This
//! is the oracle the test suite runs the engine against; a production
//! embedding would wire an SMT solver behind the same trait.

use super::{Model, Oracle, SatResult};
use crate::fol::{Sort, Term, Value, Var};
use rustc_hash::{FxHashMap, FxHashSet};

pub struct EnumOracle {
    lo: i64,
    hi: i64,
    budget: u64,
    asserts: Vec<Term>,
    scopes: Vec<usize>,
    last_model: Model,
    last_core: Vec<Term>,
}

enum Outcome {
    Sat(Model),
    Unsat,
    Unknown,
}

impl EnumOracle {
    pub fn new(lo: i64, hi: i64) -> Self {
        assert!(lo <= hi);
        Self {
            lo,
            hi,
            budget: 1 << 22,
            asserts: Vec::new(),
            scopes: Vec::new(),
            last_model: Model::new(),
            last_core: Vec::new(),
        }
    }

    pub fn with_budget(mut self, budget: u64) -> Self {
        self.budget = budget;
        self
    }

    fn solve(&self, extra: &[Term]) -> Outcome {
        let mut var_set = FxHashSet::default();
        for t in self.asserts.iter().chain(extra) {
            t.collect_vars(&mut var_set);
        }
        let mut vars: Vec<Var> = var_set.into_iter().collect();
        vars.sort();

        let range = (self.hi - self.lo) as u64 + 1;
        let mut space: u64 = 1;
        for v in &vars {
            let width = match v.sort {
                Sort::Bool => 2,
                Sort::Int => range,
            };
            space = match space.checked_mul(width) {
                Some(s) if s <= self.budget => s,
                _ => return Outcome::Unknown,
            };
        }

        let pos: FxHashMap<Var, usize> =
            vars.iter().cloned().zip(0..vars.len()).collect();
        let mut idx = vec![0u64; vars.len()];
        let mut vals: Vec<Value> = vars
            .iter()
            .map(|v| match v.sort {
                Sort::Bool => Value::Bool(false),
                Sort::Int => Value::Int(self.lo),
            })
            .collect();
        loop {
            {
                let assign = |v: &Var| pos.get(v).map(|&i| vals[i]);
                if self
                    .asserts
                    .iter()
                    .chain(extra)
                    .all(|t| t.eval(&assign) == Some(Value::Bool(true)))
                {
                    let mut model = Model::new();
                    for (v, val) in vars.iter().zip(&vals) {
                        model.set(v.clone(), *val);
                    }
                    return Outcome::Sat(model);
                }
            }
            // odometer step
            let mut carry = true;
            for i in 0..vars.len() {
                if !carry {
                    break;
                }
                let width = match vars[i].sort {
                    Sort::Bool => 2,
                    Sort::Int => range,
                };
                idx[i] += 1;
                carry = idx[i] == width;
                if carry {
                    idx[i] = 0;
                }
                vals[i] = match vars[i].sort {
                    Sort::Bool => Value::Bool(idx[i] == 1),
                    Sort::Int => Value::Int(self.lo + idx[i] as i64),
                };
            }
            if carry {
                return Outcome::Unsat;
            }
        }
    }

    /// Deletion-based core minimization: keep dropping assumptions whose
    /// removal leaves the query unsat.
    fn minimize_core(&self, assumptions: &[Term]) -> Vec<Term> {
        let mut core: Vec<Term> = assumptions.to_vec();
        let mut i = 0;
        while i < core.len() {
            let mut candidate = core.clone();
            candidate.remove(i);
            match self.solve(&candidate) {
                Outcome::Unsat => {
                    core = candidate;
                }
                _ => i += 1,
            }
        }
        core
    }
}

impl Default for EnumOracle {
    fn default() -> Self {
        Self::new(-64, 64)
    }
}

impl Oracle for EnumOracle {
    fn push(&mut self) {
        self.scopes.push(self.asserts.len());
    }

    fn pop(&mut self) {
        let mark = self.scopes.pop().expect("pop without matching push");
        self.asserts.truncate(mark);
    }

    fn assert(&mut self, fml: &Term) {
        self.asserts.push(fml.clone());
    }

    fn check(&mut self, assumptions: &[Term]) -> SatResult {
        match self.solve(assumptions) {
            Outcome::Sat(model) => {
                self.last_model = model;
                SatResult::Sat
            }
            Outcome::Unsat => {
                self.last_core = self.minimize_core(assumptions);
                SatResult::Unsat
            }
            Outcome::Unknown => SatResult::Unknown,
        }
    }

    fn model(&self) -> Model {
        self.last_model.clone()
    }

    fn unsat_core(&self) -> Vec<Term> {
        self.last_core.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Var {
        Var::new("x", Sort::Int)
    }

    fn y() -> Var {
        Var::new("y", Sort::Int)
    }

    #[test]
    fn sat_with_model() {
        let mut o = EnumOracle::new(-8, 8);
        o.assert(&Term::gt(Term::var(x()), Term::int(3)));
        o.assert(&Term::lt(Term::var(x()), Term::int(5)));
        assert_eq!(o.check(&[]), SatResult::Sat);
        assert_eq!(o.model().get(&x()), Some(Value::Int(4)));
    }

    #[test]
    fn unsat_core_is_minimized() {
        let mut o = EnumOracle::new(-8, 8);
        o.assert(&Term::eq(Term::var(x()), Term::int(0)));
        let keep = Term::ge(Term::var(x()), Term::int(1));
        let irrelevant = Term::le(Term::var(y()), Term::int(8));
        assert_eq!(o.check(&[irrelevant, keep.clone()]), SatResult::Unsat);
        assert_eq!(o.unsat_core(), vec![keep]);
    }

    #[test]
    fn scopes_restore_assertions() {
        let mut o = EnumOracle::new(-8, 8);
        o.assert(&Term::ge(Term::var(x()), Term::int(5)));
        o.push();
        o.assert(&Term::le(Term::var(x()), Term::int(4)));
        assert_eq!(o.check(&[]), SatResult::Unsat);
        o.pop();
        assert_eq!(o.check(&[]), SatResult::Sat);
    }

    #[test]
    fn budget_overflow_is_unknown() {
        let mut o = EnumOracle::new(-64, 64).with_budget(16);
        o.assert(&Term::eq(Term::var(x()), Term::var(y())));
        assert_eq!(o.check(&[]), SatResult::Unknown);
    }

    #[test]
    fn trivial_queries() {
        let mut o = EnumOracle::new(0, 1);
        assert_eq!(o.check(&[]), SatResult::Sat);
        assert_eq!(o.check(&[Term::ff()]), SatResult::Unsat);
        assert!(o.unsat_core().is_empty() || o.unsat_core() == vec![Term::ff()]);
    }
}
