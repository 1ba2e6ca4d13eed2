use super::Pdr;
use super::derive::DeriveStep;
use super::frame::Level;
use super::proofoblig::Pob;
use super::reach::ReachFactId;
use super::solver::CheckResult;
use crate::chc::{RelationId, RuleId};
use crate::error::{Error, Result};
use crate::fol::Cube;
use crate::oracle::{Model, Slot};
use log::trace;

impl Pdr {
    /// Process one dequeued obligation: discharge it as reachable (via an
    /// existing fact, a resumed derivation, or a fresh rule model) or as
    /// blocked (learning a lemma), or suspend it behind a new child.
    pub(super) fn expand_pob(&mut self, pob: &Pob) -> Result<()> {
        self.statistic.num_expand += 1;
        self.expanded += 1;
        trace!("expand {pob:?}");

        if let Some(fid) = self.fact_cover(pob.relation, &pob.post)? {
            trace!("covered by existing fact {fid:?}");
            self.statistic.num_reachable += 1;
            pob.close_reachable(fid);
            return Ok(());
        }
        if self.frames[pob.relation.index()].blocks(Level::new(pob.level()), &pob.post) {
            trace!("blocked by existing lemma");
            self.statistic.num_blocked += 1;
            self.discharge_blocked(pob);
            return Ok(());
        }

        let step = match self.resume(pob)? {
            Some(step) => step,
            None => {
                match self.check_blocked(
                    Slot::Reachability,
                    pob.relation,
                    pob.level(),
                    &pob.post,
                )? {
                    CheckResult::Blocked(core) => {
                        self.learn_lemma(pob, core)?;
                        self.discharge_blocked(pob);
                        return Ok(());
                    }
                    CheckResult::Reachable(rule, model) => self.derive(pob, rule, model)?,
                }
            }
        };
        match step {
            DeriveStep::Child(child) => {
                // the parent waits in the queue behind its child
                self.queue.add(child);
                self.queue.add(pob.clone());
            }
            DeriveStep::Concrete {
                rule,
                model,
                premises,
            } => {
                let fid = self.certify(pob.relation, rule, &model, premises);
                self.statistic.num_reachable += 1;
                pob.close_reachable(fid);
            }
        }
        Ok(())
    }

    /// The root obligation is re-leveled and re-queued across ceilings, so
    /// it is never closed; everything else closes for good.
    fn discharge_blocked(&mut self, pob: &Pob) {
        if *pob == self.root {
            pob.remove_descendants();
        } else {
            pob.close_blocked();
        }
    }

    /// Mint the reach fact for a concretely explained obligation: the
    /// witnessing model projected onto the head's canonical variables.
    fn certify(
        &mut self,
        rel: RelationId,
        rule: RuleId,
        model: &Model,
        premises: Vec<ReachFactId>,
    ) -> ReachFactId {
        let state = Cube::from_term(&self.projector.project(
            &self.sys.rule(rule).trans,
            model,
            &self.sys.relation(rel).args,
        ));
        self.statistic.num_reach_facts += 1;
        self.facts.add(rel, state, rule, premises)
    }

    /// Turn a refutation core into a lemma: weaken it through the
    /// generalizer chain, push it to the highest level it stays blocked at,
    /// and commit it to the relation's frames.
    fn learn_lemma(&mut self, pob: &Pob, core: Cube) -> Result<()> {
        self.statistic.num_blocked += 1;
        let rel = pob.relation;
        let mut cube = core;
        let mut gens = std::mem::take(&mut self.generalizers);
        let mut res = Ok(());
        for g in gens.iter_mut() {
            res = g.generalize(self, rel, pob.level(), &mut cube);
            if res.is_err() {
                break;
            }
        }
        self.generalizers = gens;
        res?;
        let (level, cube) = self.push_lemma(rel, pob.level(), cube)?;
        self.statistic.num_lemmas += 1;
        self.frames[rel.index()].add_lemma(cube, Level::new(level), Some(pob.downgrade()));
        Ok(())
    }

    /// Ride the lemma up the frames while it stays blocked, up to the
    /// current ceiling. Refutation cores shrink it along the way. An
    /// undecided attempt just stops the ride.
    fn push_lemma(&mut self, rel: RelationId, mut level: usize, mut cube: Cube) -> Result<(usize, Cube)> {
        while level < self.level {
            match self.check_blocked(Slot::Propagation, rel, level + 1, &cube) {
                Ok(CheckResult::Blocked(core)) => {
                    self.statistic.push.record(true);
                    cube = core;
                    level += 1;
                }
                Ok(CheckResult::Reachable(..)) => {
                    self.statistic.push.record(false);
                    break;
                }
                Err(Error::OracleUnknown) => break,
                Err(e) => return Err(e),
            }
        }
        Ok((level, cube))
    }
}
