use super::Pdr;
use super::frame::Level;
use super::proofoblig::WeakPob;
use super::solver::CheckResult;
use crate::chc::{RelationId, RuleId};
use crate::error::{Error, Result};
use crate::fol::Cube;
use crate::oracle::{Model, Slot};
use log::{debug, info};
use rand::seq::SliceRandom;

impl Pdr {
    /// Push lemmas up one level at a time across all relations. Returns the
    /// first level whose lemmas all moved, which makes that frame equal to
    /// the next and hence an inductive fixpoint; `None` if every level kept
    /// at least one lemma behind.
    pub(super) fn propagate(&mut self) -> Result<Option<usize>> {
        for lvl in 1..=self.level {
            if !self.propagate_level(lvl)? {
                info!("frame fixpoint at level {lvl}");
                return Ok(Some(lvl));
            }
        }
        Ok(None)
    }

    /// Try to move every lemma at exactly `lvl` to `lvl + 1`. Returns
    /// whether any lemma stayed behind. A lemma whose push cannot be
    /// decided stays behind too; leaving it low is the sound direction.
    fn propagate_level(&mut self, lvl: usize) -> Result<bool> {
        let mut failed = false;
        // visit relations in a seeded random order so no fixed relation
        // always pushes first
        let mut order: Vec<usize> = (0..self.frames.len()).collect();
        order.shuffle(&mut self.rng);
        for rel_idx in order {
            let rel = RelationId::from_index(rel_idx);
            let items: Vec<(Cube, Option<WeakPob>, Option<(RuleId, Model)>)> = self.frames
                [rel_idx]
                .at_level(Level::new(lvl))
                .into_iter()
                .map(|i| {
                    let l = &self.frames[rel_idx].lemmas()[i];
                    (l.cube().clone(), l.po.clone(), l.ctp.clone())
                })
                .collect();
            for (cube, po, ctp) in items {
                if self.cfg.pdr.ctp
                    && let Some((rid, m)) = &ctp
                    && self.ctp_blocks_push(*rid, m, lvl)
                {
                    self.statistic.ctp_skip.record(true);
                    failed = true;
                    continue;
                }
                match self.check_blocked(Slot::Propagation, rel, lvl + 1, &cube) {
                    Ok(CheckResult::Blocked(core)) => {
                        self.statistic.push.record(true);
                        self.frames[rel_idx].add_lemma(core, Level::new(lvl + 1), po);
                    }
                    Ok(CheckResult::Reachable(rid, m)) => {
                        self.statistic.push.record(false);
                        failed = true;
                        if self.cfg.pdr.ctp
                            && let Some(l) = self.frames[rel_idx]
                                .lemmas_mut()
                                .iter_mut()
                                .find(|l| l.cube() == &cube)
                        {
                            l.ctp = Some((rid, m));
                        }
                    }
                    Err(Error::OracleUnknown) => {
                        debug!("push of {rel} {cube} to {} undecided", lvl + 1);
                        failed = true;
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(failed)
    }

    /// Does the recorded counterexample-to-push still satisfy the current
    /// frames? If so the failing model survives and re-querying is futile.
    fn ctp_blocks_push(&self, rid: RuleId, m: &Model, lvl: usize) -> bool {
        let rule = self.sys.rule(rid);
        rule.body.iter().enumerate().all(|(oidx, &brel)| {
            let map = self.sys.relation(brel).origin_map(oidx);
            self.frames[brel.index()]
                .frame_terms(Level::new(lvl))
                .all(|t| m.holds(&t.rename(&map)))
        })
    }

    /// Promote every lemma at `from` or above to the infinity frame; they
    /// are jointly inductive once a fixpoint is found below them.
    pub(super) fn propagate_to_infinity(&mut self, from: usize) {
        let from = Level::new(from);
        for frames in &mut self.frames {
            for lemma in frames.lemmas_mut() {
                if !lemma.level().is_inf() && lemma.level() >= from {
                    lemma.set_level(Level::INF);
                }
            }
        }
    }
}
