use super::proofoblig::WeakPob;
use crate::chc::RuleId;
use crate::fol::{Cube, Term};
use crate::oracle::Model;
use log::trace;
use std::fmt;

/// A frame level: a non-negative integer or infinity ("proven for all
/// time"). `next(∞) = ∞` and `prev(0) = 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Level(usize);

impl Level {
    pub const INF: Level = Level(usize::MAX);

    pub fn new(l: usize) -> Self {
        assert!(l < usize::MAX);
        Level(l)
    }

    pub fn is_inf(self) -> bool {
        self == Self::INF
    }

    pub fn next(self) -> Self {
        if self.is_inf() { self } else { Level(self.0 + 1) }
    }

    pub fn prev(self) -> Self {
        if self.is_inf() || self.0 == 0 {
            self
        } else {
            Level(self.0 - 1)
        }
    }

    pub fn finite(self) -> Option<usize> {
        (!self.is_inf()).then_some(self.0)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_inf() {
            write!(f, "oo")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// A learned blocking lemma: the states in `cube` are not reachable within
/// `level` steps. The formula contributed to a frame is the cube's
/// negation. Immutable once committed, except for the level, which only
/// ever increases.
pub struct Lemma {
    cube: Cube,
    level: Level,
    /// The obligation this lemma was learned for, if any.
    pub po: Option<WeakPob>,
    /// Counterexample to pushing: the model (and the rule it satisfied)
    /// that last defeated a push attempt.
    pub ctp: Option<(RuleId, Model)>,
}

impl Lemma {
    pub fn new(cube: Cube, level: Level, po: Option<WeakPob>) -> Self {
        Self {
            cube,
            level,
            po,
            ctp: None,
        }
    }

    pub fn cube(&self) -> &Cube {
        &self.cube
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// Raise the lemma's level. Levels are monotone; lowering one would
    /// unsoundly strengthen a frame.
    pub fn set_level(&mut self, level: Level) {
        assert!(level >= self.level);
        self.level = level;
        self.ctp = None;
    }
}

/// One relation's lemmas, tagged by level. `frame(L)` is the conjunction
/// of the negations of all cubes whose level is at least `L`.
#[derive(Default)]
pub struct Frames {
    lemmas: Vec<Lemma>,
}

impl Frames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lemmas(&self) -> &[Lemma] {
        &self.lemmas
    }

    pub fn lemmas_mut(&mut self) -> &mut [Lemma] {
        &mut self.lemmas
    }

    /// The formulas in force at `level`.
    pub fn frame_terms(&self, level: Level) -> impl Iterator<Item = Term> + '_ {
        self.lemmas
            .iter()
            .filter(move |l| l.level >= level)
            .map(|l| l.cube.negation())
    }

    /// Indices of lemmas sitting at exactly `level`, shortest cube first
    /// (the subsumption tie-break: prefer the strongest blockers).
    pub fn at_level(&self, level: Level) -> Vec<usize> {
        let mut idx: Vec<usize> = (0..self.lemmas.len())
            .filter(|&i| self.lemmas[i].level == level)
            .collect();
        idx.sort_by_key(|&i| self.lemmas[i].cube.len());
        idx
    }

    /// True if some lemma at `level` or above already blocks `cube`.
    pub fn blocks(&self, level: Level, cube: &Cube) -> bool {
        self.lemmas
            .iter()
            .any(|l| l.level >= level && l.cube.subsume(cube))
    }

    /// Insert a lemma, keeping the set irredundant: a no-op when an
    /// equal-or-stronger lemma already holds at the level or above, a level
    /// bump when the same cube is already present lower, and otherwise an
    /// insertion that evicts the lemmas it subsumes at or below the level.
    /// Returns whether the frame set changed.
    pub fn add_lemma(&mut self, cube: Cube, level: Level, po: Option<WeakPob>) -> bool {
        if self
            .lemmas
            .iter()
            .any(|l| l.level >= level && l.cube.subsume(&cube))
        {
            return false;
        }
        if let Some(pos) = self.lemmas.iter().position(|l| l.cube == cube) {
            trace!("raising lemma {} to level {level}", cube);
            let lemma = &mut self.lemmas[pos];
            lemma.set_level(level);
            if po.is_some() {
                lemma.po = po;
            }
            return true;
        }
        self.lemmas
            .retain(|l| !(cube.subsume(&l.cube) && l.level <= level));
        trace!("add lemma: level {level}, {cube}");
        self.lemmas.push(Lemma::new(cube, level, po));
        true
    }

    /// The infinity-level lemmas, i.e. the relation's piece of the
    /// inductive invariant.
    pub fn invariant(&self) -> Vec<&Cube> {
        let mut inv: Vec<&Cube> = self
            .lemmas
            .iter()
            .filter(|l| l.level.is_inf())
            .map(|l| &l.cube)
            .collect();
        inv.sort();
        inv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fol::{Sort, Var};

    fn ge(n: i64) -> Term {
        Term::ge(Term::var(Var::new("x", Sort::Int)), Term::int(n))
    }

    #[test]
    fn level_arithmetic() {
        assert_eq!(Level::new(3).next(), Level::new(4));
        assert_eq!(Level::new(0).prev(), Level::new(0));
        assert_eq!(Level::INF.next(), Level::INF);
        assert_eq!(Level::INF.prev(), Level::INF);
        assert!(Level::INF > Level::new(1 << 40));
        assert_eq!(Level::new(7).finite(), Some(7));
        assert_eq!(Level::INF.finite(), None);
    }

    #[test]
    fn add_lemma_subsumption() {
        let mut f = Frames::new();
        let strong = Cube::new([ge(10)]);
        let weak = Cube::new([ge(10), ge(0)]);
        assert!(f.add_lemma(weak.clone(), Level::new(2), None));
        // stronger cube evicts the weaker one at the same level
        assert!(f.add_lemma(strong.clone(), Level::new(2), None));
        assert_eq!(f.lemmas().len(), 1);
        assert_eq!(f.lemmas()[0].cube(), &strong);
        // weaker cube at a lower level is already covered
        assert!(!f.add_lemma(weak, Level::new(1), None));
        assert!(!f.add_lemma(strong.clone(), Level::new(2), None));
        // same cube at a higher level bumps in place
        assert!(f.add_lemma(strong, Level::new(3), None));
        assert_eq!(f.lemmas().len(), 1);
        assert_eq!(f.lemmas()[0].level(), Level::new(3));
    }

    #[test]
    fn weaker_lemma_at_higher_level_survives() {
        let mut f = Frames::new();
        let strong = Cube::new([ge(10)]);
        let weak = Cube::new([ge(10), ge(0)]);
        assert!(f.add_lemma(weak.clone(), Level::new(5), None));
        // a subsuming cube entering below must not evict the higher lemma
        assert!(f.add_lemma(strong.clone(), Level::new(1), None));
        assert_eq!(f.lemmas().len(), 2);
        assert!(f.blocks(Level::new(5), &weak));
        assert!(f.blocks(Level::new(1), &strong));
        assert!(!f.blocks(Level::new(2), &strong));
    }

    #[test]
    fn frame_terms_by_level() {
        let mut f = Frames::new();
        f.add_lemma(Cube::new([ge(10)]), Level::new(1), None);
        f.add_lemma(Cube::new([ge(20)]), Level::INF, None);
        assert_eq!(f.frame_terms(Level::new(0)).count(), 2);
        assert_eq!(f.frame_terms(Level::new(2)).count(), 1);
        assert_eq!(f.invariant().len(), 1);
    }

    #[test]
    #[should_panic]
    fn lemma_levels_never_decrease() {
        let mut l = Lemma::new(Cube::new([ge(1)]), Level::new(4), None);
        l.set_level(Level::new(3));
    }
}
