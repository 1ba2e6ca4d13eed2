//! A bounded pool of oracle instances.
//!
//! Queries of different kinds reuse different instances, keyed by [`Slot`];
//! within a slot, instances are handed out round-robin. Acquisition is
//! scoped: the guard pushes an assertion scope on acquire and pops it on
//! drop, so no query can leak assertions into the next one.

use super::Oracle;
use std::ops::{Deref, DerefMut};

/// The logical query kind an oracle is acquired for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Backward reachability queries driven by proof obligations.
    Reachability = 0,
    /// Lemma pushing and inductiveness checks.
    Propagation = 1,
    /// Reach-fact coverage queries.
    ReachFact = 2,
}

const NUM_SLOTS: usize = 3;

pub struct OraclePool {
    slots: Vec<Vec<Box<dyn Oracle>>>,
    next: [usize; NUM_SLOTS],
}

impl OraclePool {
    pub fn new(factory: impl Fn() -> Box<dyn Oracle>, per_slot: usize) -> Self {
        assert!(per_slot > 0);
        let slots = (0..NUM_SLOTS)
            .map(|_| (0..per_slot).map(|_| factory()).collect())
            .collect();
        Self {
            slots,
            next: [0; NUM_SLOTS],
        }
    }

    /// Acquire an oracle for one query. The returned guard owns a fresh
    /// assertion scope for the duration of the borrow.
    pub fn acquire(&mut self, slot: Slot) -> ScopedOracle<'_> {
        let s = slot as usize;
        let i = self.next[s];
        self.next[s] = (i + 1) % self.slots[s].len();
        let oracle = self.slots[s][i].as_mut();
        oracle.push();
        ScopedOracle { oracle }
    }
}

pub struct ScopedOracle<'a> {
    oracle: &'a mut dyn Oracle,
}

impl<'a> Deref for ScopedOracle<'a> {
    type Target = dyn Oracle + 'a;

    fn deref(&self) -> &Self::Target {
        self.oracle
    }
}

impl DerefMut for ScopedOracle<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.oracle
    }
}

impl Drop for ScopedOracle<'_> {
    fn drop(&mut self) {
        self.oracle.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fol::Term;
    use crate::oracle::{EnumOracle, SatResult};

    fn pool(per_slot: usize) -> OraclePool {
        OraclePool::new(|| Box::new(EnumOracle::new(-4, 4)), per_slot)
    }

    #[test]
    fn guard_scopes_assertions() {
        let mut p = pool(1);
        {
            let mut o = p.acquire(Slot::Reachability);
            o.assert(&Term::ff());
            assert_eq!(o.check(&[]), SatResult::Unsat);
        }
        // the contradiction must not survive the guard
        let mut o = p.acquire(Slot::Reachability);
        assert_eq!(o.check(&[]), SatResult::Sat);
    }

    #[test]
    fn slots_are_distinct_instances() {
        let mut p = pool(1);
        {
            let mut o = p.acquire(Slot::Propagation);
            o.assert(&Term::ff());
            // guard dropped here; Propagation slot is clean again
        }
        let mut o = p.acquire(Slot::ReachFact);
        assert_eq!(o.check(&[]), SatResult::Sat);
    }

    #[test]
    fn round_robin_cycles_within_slot() {
        let mut p = pool(2);
        for _ in 0..4 {
            let mut o = p.acquire(Slot::Reachability);
            assert_eq!(o.check(&[]), SatResult::Sat);
        }
        assert_eq!(p.next[Slot::Reachability as usize], 0);
    }
}
