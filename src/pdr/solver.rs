use super::Pdr;
use super::frame::Level;
use super::reach::ReachFactId;
use crate::chc::{RelationId, RuleId};
use crate::error::{Error, Result};
use crate::fol::{Cube, Term};
use crate::oracle::{Model, SatResult, Slot};
use log::trace;

/// Outcome of asking whether `cube` is producible at a level.
pub(super) enum CheckResult {
    /// No rule can produce a `cube` state; the core is the sub-cube the
    /// refutations jointly relied on.
    Blocked(Cube),
    /// Some rule can; the model witnesses one application.
    Reachable(RuleId, Model),
}

enum RuleQuery {
    Sat(Model),
    Unsat(Vec<Term>),
}

impl Pdr {
    /// Can `rule` produce a state satisfying `cube` from body states in the
    /// frames at `level - 1`? The cube's literals ride as assumptions so an
    /// unsat answer yields a core over them.
    fn rule_query(
        &mut self,
        slot: Slot,
        rule: RuleId,
        level: usize,
        cube: &Cube,
    ) -> Result<RuleQuery> {
        self.statistic.num_oracle_queries += 1;
        let rule = self.sys.rule(rule);
        let mut oracle = self.pool.acquire(slot);
        oracle.assert(&rule.trans);
        if level > 0 {
            let prev = Level::new(level - 1);
            for (oidx, &brel) in rule.body.iter().enumerate() {
                let map = self.sys.relation(brel).origin_map(oidx);
                for t in self.frames[brel.index()].frame_terms(prev) {
                    oracle.assert(&t.rename(&map));
                }
            }
        }
        let assumptions: Vec<Term> = cube.iter().cloned().collect();
        match oracle.check(&assumptions) {
            SatResult::Sat => Ok(RuleQuery::Sat(oracle.model())),
            SatResult::Unsat => Ok(RuleQuery::Unsat(oracle.unsat_core())),
            SatResult::Unknown => Err(Error::OracleUnknown),
        }
    }

    /// Is `cube` blocked for `rel` at `level`, i.e. producible by no rule?
    /// At level 0 only init rules are consulted; states with uninterpreted
    /// premises need at least one prior step.
    pub(super) fn check_blocked(
        &mut self,
        slot: Slot,
        rel: RelationId,
        level: usize,
        cube: &Cube,
    ) -> Result<CheckResult> {
        let rules: Vec<RuleId> = self.sys.rules_of(rel).to_vec();
        let mut core = Vec::new();
        for rid in rules {
            if level == 0 && !self.sys.rule(rid).is_init() {
                continue;
            }
            match self.rule_query(slot, rid, level, cube)? {
                RuleQuery::Sat(model) => {
                    trace!("{rel} {cube} reachable at {level} via {rid}");
                    return Ok(CheckResult::Reachable(rid, model));
                }
                RuleQuery::Unsat(c) => core.extend(c),
            }
        }
        // a relation with no applicable rule is blocked by the empty core
        Ok(CheckResult::Blocked(Cube::new(core)))
    }

    /// Scan existing reach facts of `rel` for one entailing `state`,
    /// most recent first.
    pub(super) fn fact_cover(&mut self, rel: RelationId, state: &Cube) -> Result<Option<ReachFactId>> {
        let ids: Vec<ReachFactId> = self.facts.of(rel).iter().rev().copied().collect();
        for fid in ids {
            self.statistic.num_oracle_queries += 1;
            let fact = self.facts.get(fid).state.to_term();
            let mut oracle = self.pool.acquire(Slot::ReachFact);
            oracle.assert(&fact);
            oracle.assert(&state.negation());
            match oracle.check(&[]) {
                SatResult::Unsat => {
                    self.statistic.fact_cover.record(true);
                    return Ok(Some(fid));
                }
                SatResult::Sat => {}
                SatResult::Unknown => return Err(Error::OracleUnknown),
            }
        }
        self.statistic.fact_cover.record(false);
        Ok(None)
    }
}
