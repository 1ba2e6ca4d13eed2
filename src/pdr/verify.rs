use super::{Invariant, Pdr};
use crate::chc::RuleId;
use crate::error::{Error, Result};
use crate::fol::Term;
use crate::oracle::{SatResult, Slot};
use log::{debug, warn};

impl Pdr {
    /// Audit the extracted invariant: it must be false at the query
    /// relation and closed under every rule. A failure here means the
    /// engine's own bookkeeping went wrong, so it is reported as an
    /// internal inconsistency rather than a verdict.
    pub(super) fn verify(&mut self, inv: &Invariant) -> Result<()> {
        if !inv.of(self.sys.query()).is_false() {
            return Err(Error::Inconsistency(
                "invariant does not exclude the query relation".to_string(),
            ));
        }
        for rid in 0..self.sys.rules().len() {
            let rule = self.sys.rule(RuleId::from_index(rid));
            let mut oracle = self.pool.acquire(Slot::Propagation);
            oracle.assert(&rule.trans);
            for (oidx, &brel) in rule.body.iter().enumerate() {
                let map = self.sys.relation(brel).origin_map(oidx);
                oracle.assert(&inv.of(brel).rename(&map));
            }
            oracle.assert(&Term::not(inv.of(rule.head).clone()));
            match oracle.check(&[]) {
                SatResult::Unsat => {}
                SatResult::Sat => {
                    return Err(Error::Inconsistency(format!(
                        "invariant not closed under {}",
                        rule.id
                    )));
                }
                SatResult::Unknown => {
                    warn!("invariant audit undecided for {}", rule.id);
                }
            }
        }
        debug!("invariant audit passed");
        Ok(())
    }
}
