use super::Pdr;
use super::frame::Level;
use super::proofoblig::Pob;
use super::reach::ReachFactId;
use crate::chc::{Rule, RuleId};
use crate::error::{Error, Result};
use crate::fol::{Cube, Term, Var};
use crate::oracle::{Model, SatResult, Slot};
use rustc_hash::FxHashMap;

/// An in-progress explanation of a reachable obligation: `rule` fired
/// under the model, `resolved` certifies its leading body premises with
/// reach facts, and `child` is the obligation for the first premise no
/// fact covers yet.
pub struct Derivation {
    pub rule: RuleId,
    pub resolved: Vec<ReachFactId>,
    pub child: Pob,
}

/// What deriving an obligation's witness produced.
pub(super) enum DeriveStep {
    /// A premise needs its own proof first.
    Child(Pob),
    /// Every premise is certified; the obligation is concretely reachable.
    Concrete {
        rule: RuleId,
        model: Model,
        premises: Vec<ReachFactId>,
    },
}

impl Pdr {
    /// Project the witnessing model onto body occurrence `oidx`, as a cube
    /// over that relation's canonical variables.
    fn premise_state(&self, rule: &Rule, oidx: usize, model: &Model) -> Cube {
        let rel = self.sys.relation(rule.body[oidx]);
        let ovars = rel.origin_args(oidx);
        let t = self.projector.project(&rule.trans, model, &ovars);
        let back: FxHashMap<Var, Var> =
            ovars.into_iter().zip(rel.args.iter().cloned()).collect();
        Cube::from_term(&t.rename(&back))
    }

    /// Start explaining `pob` through one application of `rule_id`
    /// witnessed by `model`.
    pub(super) fn derive(&mut self, pob: &Pob, rule_id: RuleId, model: Model) -> Result<DeriveStep> {
        self.scan_premises(pob, rule_id, model, Vec::new())
    }

    /// Continue a suspended derivation after its child obligation was
    /// discharged. `None` means the derivation is dead (the child was
    /// blocked, or the frames have strengthened past the rule) and the
    /// obligation must be expanded afresh.
    pub(super) fn resume(&mut self, pob: &Pob) -> Result<Option<DeriveStep>> {
        let Some(mut deriv) = pob.derivation.borrow_mut().take() else {
            return Ok(None);
        };
        let Some(fact) = deriv.child.reach_fact() else {
            return Ok(None);
        };
        deriv.resolved.push(fact);
        let Some(model) = self.rule_query_facts(deriv.rule, pob, &deriv.resolved)? else {
            return Ok(None);
        };
        self.scan_premises(pob, deriv.rule, model, deriv.resolved)
            .map(Some)
    }

    /// Walk the body premises from the first unresolved one: cover each by
    /// an existing reach fact, or spawn a child obligation one level down
    /// and suspend.
    fn scan_premises(
        &mut self,
        pob: &Pob,
        rule_id: RuleId,
        model: Model,
        mut resolved: Vec<ReachFactId>,
    ) -> Result<DeriveStep> {
        let rule = self.sys.rule(rule_id).clone();
        for oidx in resolved.len()..rule.body.len() {
            let brel = rule.body[oidx];
            let state = self.premise_state(&rule, oidx, &model);
            match self.fact_cover(brel, &state)? {
                Some(f) => resolved.push(f),
                None => {
                    debug_assert!(pob.level() > 0);
                    self.pob_seq += 1;
                    let child =
                        Pob::new_child(self.pob_seq, pob, oidx, brel, state, pob.level() - 1);
                    *pob.derivation.borrow_mut() = Some(Derivation {
                        rule: rule_id,
                        resolved,
                        child: child.clone(),
                    });
                    return Ok(DeriveStep::Child(child));
                }
            }
        }
        Ok(DeriveStep::Concrete {
            rule: rule_id,
            model,
            premises: resolved,
        })
    }

    /// Re-solve `rule_id` for `pob` with the leading premises pinned to
    /// their certifying facts and the rest under the previous frames.
    fn rule_query_facts(
        &mut self,
        rule_id: RuleId,
        pob: &Pob,
        resolved: &[ReachFactId],
    ) -> Result<Option<Model>> {
        debug_assert!(pob.level() > 0);
        self.statistic.num_oracle_queries += 1;
        let rule = self.sys.rule(rule_id);
        let prev = Level::new(pob.level() - 1);
        let mut oracle = self.pool.acquire(Slot::Reachability);
        oracle.assert(&rule.trans);
        for (oidx, &brel) in rule.body.iter().enumerate() {
            let map = self.sys.relation(brel).origin_map(oidx);
            if let Some(&fid) = resolved.get(oidx) {
                oracle.assert(&self.facts.get(fid).state.rename(&map).to_term());
            } else {
                for t in self.frames[brel.index()].frame_terms(prev) {
                    oracle.assert(&t.rename(&map));
                }
            }
        }
        let assumptions: Vec<Term> = pob.post.iter().cloned().collect();
        match oracle.check(&assumptions) {
            SatResult::Sat => Ok(Some(oracle.model())),
            SatResult::Unsat => Ok(None),
            SatResult::Unknown => Err(Error::OracleUnknown),
        }
    }
}
