use super::Pdr;
use super::solver::CheckResult;
use crate::chc::RelationId;
use crate::error::{Error, Result};
use crate::fol::{Cube, Op, Term, Var};
use crate::oracle::Slot;
use log::trace;

/// Weakens a blocked cube (covering more states) while keeping it blocked
/// at the same level. Failing to weaken is never an error, and an oracle
/// that cannot decide a weakening attempt just ends the attempt; the
/// incoming cube is always a sound fallback.
pub trait Generalizer {
    fn name(&self) -> &'static str;

    fn generalize(
        &mut self,
        pdr: &mut Pdr,
        rel: RelationId,
        level: usize,
        cube: &mut Cube,
    ) -> Result<()>;
}

/// Inductive generalization by literal dropping: try removing each literal
/// and keep the removal if the rest stays blocked. The refutation core of
/// a successful check shrinks the cube further for free.
pub struct DropConjuncts;

impl Generalizer for DropConjuncts {
    fn name(&self) -> &'static str {
        "drop"
    }

    fn generalize(
        &mut self,
        pdr: &mut Pdr,
        rel: RelationId,
        level: usize,
        cube: &mut Cube,
    ) -> Result<()> {
        let mut i = 0;
        while i < cube.len() {
            let cand = cube.without(i);
            match pdr.check_blocked(Slot::Propagation, rel, level, &cand) {
                Ok(CheckResult::Blocked(core)) => {
                    pdr.statistic.gen_drop.record(true);
                    *cube = core;
                    i = 0;
                }
                Ok(CheckResult::Reachable(..)) => {
                    pdr.statistic.gen_drop.record(false);
                    i += 1;
                }
                Err(Error::OracleUnknown) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// Widens ground equalities into half-bounds: replace `v = c` by `v >= c`
/// or `v <= c` when the widened cube is still blocked. Turns the point
/// cubes a ground projector produces into interval lemmas, which is what
/// lets frames over counter-like relations converge.
pub struct WidenBound;

fn as_var_eq_int(lit: &Term) -> Option<(&Var, i64)> {
    let Term::Op(Op::Eq, args) = lit else {
        return None;
    };
    match (args[0].as_ref(), args[1].as_ref()) {
        (Term::Var(v), Term::Int(c)) | (Term::Int(c), Term::Var(v)) => Some((v, *c)),
        _ => None,
    }
}

impl Generalizer for WidenBound {
    fn name(&self) -> &'static str {
        "widen"
    }

    fn generalize(
        &mut self,
        pdr: &mut Pdr,
        rel: RelationId,
        level: usize,
        cube: &mut Cube,
    ) -> Result<()> {
        let mut i = 0;
        'lits: while i < cube.len() {
            let Some((v, c)) = as_var_eq_int(cube.get(i)) else {
                i += 1;
                continue;
            };
            let var = Term::var(v.clone());
            for wide in [
                Term::ge(var.clone(), Term::int(c)),
                Term::le(var, Term::int(c)),
            ] {
                let cand = cube.replace(i, wide);
                match pdr.check_blocked(Slot::Propagation, rel, level, &cand) {
                    Ok(CheckResult::Blocked(core)) => {
                        pdr.statistic.gen_widen.record(true);
                        trace!("widened lemma for {rel}: {core}");
                        *cube = core;
                        i = 0;
                        continue 'lits;
                    }
                    Ok(CheckResult::Reachable(..)) => {
                        pdr.statistic.gen_widen.record(false);
                    }
                    Err(Error::OracleUnknown) => return Ok(()),
                    Err(e) => return Err(e),
                }
            }
            i += 1;
        }
        Ok(())
    }
}
