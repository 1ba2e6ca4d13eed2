use super::{Term, Var};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;

/// An ordered, deduplicated conjunction of literals.
///
/// Cubes are the unit the search manipulates: a pob's post-condition, a
/// lemma's blocked region and a reach fact are all cubes over the owning
/// relation's argument variables. The ordering makes subsumption a subset
/// test, like an ordered literal cube in a SAT-level IC3.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cube {
    lits: Vec<Term>,
}

impl Cube {
    pub fn new(lits: impl IntoIterator<Item = Term>) -> Self {
        let mut lits: Vec<Term> = lits
            .into_iter()
            .filter(|l| !l.is_true())
            .collect();
        lits.sort();
        lits.dedup();
        Self { lits }
    }

    /// The empty cube, i.e. the formula `true`; as a lemma it blocks the
    /// relation's entire state space.
    pub fn tt() -> Self {
        Self::default()
    }

    /// Conjuncts of `t`, flattened one level.
    pub fn from_term(t: &Term) -> Self {
        match t {
            Term::Op(super::Op::And, ts) => Self::new(ts.iter().map(|a| (**a).clone())),
            t => Self::new([t.clone()]),
        }
    }

    pub fn len(&self) -> usize {
        self.lits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lits.is_empty()
    }

    pub fn get(&self, idx: usize) -> &Term {
        &self.lits[idx]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Term> {
        self.lits.iter()
    }

    pub fn contains(&self, lit: &Term) -> bool {
        self.lits.binary_search(lit).is_ok()
    }

    /// True if every literal of `self` occurs in `other`. A subsuming cube
    /// constrains less, so as a blocked region it covers `other`.
    pub fn subsume(&self, other: &Cube) -> bool {
        if self.len() > other.len() {
            return false;
        }
        self.lits.iter().all(|l| other.contains(l))
    }

    /// Cube without the literal at `idx`.
    pub fn without(&self, idx: usize) -> Cube {
        let mut lits = self.lits.clone();
        lits.remove(idx);
        Cube { lits }
    }

    /// Cube with the literal at `idx` replaced; re-sorts.
    pub fn replace(&self, idx: usize, lit: Term) -> Cube {
        let mut lits = self.lits.clone();
        lits[idx] = lit;
        Cube::new(lits)
    }

    /// The conjunction as a term.
    pub fn to_term(&self) -> Term {
        Term::and(self.lits.iter().cloned())
    }

    /// Negation of the conjunction; the lemma formula for a blocked cube.
    pub fn negation(&self) -> Term {
        Term::not(self.to_term())
    }

    pub fn rename(&self, map: &FxHashMap<Var, Var>) -> Cube {
        Cube::new(self.lits.iter().map(|l| l.rename(map)))
    }

    pub fn collect_vars(&self, out: &mut FxHashSet<Var>) {
        for l in &self.lits {
            l.collect_vars(out);
        }
    }
}

impl fmt::Display for Cube {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_term())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fol::{Sort, Var};

    fn lit(n: i64) -> Term {
        Term::ge(Term::var(Var::new("x", Sort::Int)), Term::int(n))
    }

    #[test]
    fn subsume_is_subset() {
        let a = Cube::new([lit(1)]);
        let b = Cube::new([lit(1), lit(2)]);
        assert!(a.subsume(&b));
        assert!(!b.subsume(&a));
        assert!(Cube::tt().subsume(&a));
        assert!(a.subsume(&a));
    }

    #[test]
    fn new_sorts_and_dedups() {
        let c = Cube::new([lit(2), lit(1), lit(2), Term::tt()]);
        assert_eq!(c.len(), 2);
        let d = Cube::new([lit(1), lit(2)]);
        assert_eq!(c, d);
    }

    #[test]
    fn empty_cube_negates_to_false() {
        assert!(Cube::tt().to_term().is_true());
        assert!(Cube::tt().negation().is_false());
    }
}
