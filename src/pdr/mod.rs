//! The backward-reachability engine.
//!
//! The search keeps, per relation, a sequence of over-approximating frames
//! built from level-tagged lemmas, and a global pool of under-approximating
//! reach facts. A priority queue of proof obligations drives blocking from
//! the query downward; when the queue drains at the current ceiling,
//! propagation pushes lemmas up and checks for an inductive fixpoint, and
//! otherwise the ceiling rises and the root obligation is retried one level
//! higher. The run ends with an inductive invariant, a concrete
//! counterexample derivation, or an honest unknown.

mod block;
mod derive;
mod frame;
mod generalize;
mod proofoblig;
mod propagate;
mod reach;
mod solver;
mod statistic;
mod verify;

pub use derive::Derivation;
pub use frame::{Frames, Lemma, Level};
pub use generalize::{DropConjuncts, Generalizer, WidenBound};
pub use proofoblig::{Pob, PobInner, PobQueue, PobState, WeakPob};
pub use reach::{ReachFact, ReachFactId, ReachFacts, Trace, TraceStep};
pub use statistic::{Statistic, SuccessRate};

use crate::chc::{HornSystem, RelationId};
use crate::config::Config;
use crate::error::{Error, Resource, Result};
use crate::fol::Term;
use crate::mbp::{ModelSubst, Projector};
use crate::oracle::{Oracle, OraclePool};
use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// The per-relation inductive invariant certifying an unsat verdict.
pub struct Invariant {
    terms: Vec<Term>,
}

impl Invariant {
    pub fn of(&self, rel: RelationId) -> &Term {
        &self.terms[rel.index()]
    }
}

impl fmt::Display for Invariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, t) in self.terms.iter().enumerate() {
            writeln!(f, "{}: {t}", RelationId::from_index(i))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownReason {
    /// The oracle answered unknown on a query the verdict depends on.
    Oracle,
    Interrupted,
    ObligationBudget,
    LevelBudget,
}

/// The outcome of a run. `Unknown` is a first-class answer, never a
/// repackaged sat or unsat.
pub enum Verdict {
    /// The query relation is unreachable; the invariant certifies it.
    Unsat(Invariant),
    /// The query relation is reachable; the trace derives it.
    Sat(Trace),
    Unknown(UnknownReason),
}

impl fmt::Debug for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Unsat(_) => write!(f, "Unsat"),
            Verdict::Sat(t) => write!(f, "Sat(depth {})", t.depth()),
            Verdict::Unknown(r) => write!(f, "Unknown({r:?})"),
        }
    }
}

/// Cooperative cancellation for a running solve.
#[derive(Clone)]
pub struct InterruptHandle {
    flag: Arc<AtomicBool>,
}

impl InterruptHandle {
    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }
}

pub struct Pdr {
    cfg: Config,
    sys: HornSystem,
    pool: OraclePool,
    projector: Box<dyn Projector>,
    generalizers: Vec<Box<dyn Generalizer>>,
    /// Per-relation frames, indexed by `RelationId`.
    frames: Vec<Frames>,
    facts: ReachFacts,
    queue: PobQueue,
    root: Pob,
    /// Current search ceiling; the root obligation sits here.
    level: usize,
    pob_seq: u64,
    expanded: usize,
    interrupt: Arc<AtomicBool>,
    statistic: Statistic,
    rng: StdRng,
}

impl Pdr {
    pub fn new(cfg: Config, sys: HornSystem, factory: impl Fn() -> Box<dyn Oracle>) -> Self {
        let pool = OraclePool::new(factory, cfg.pdr.pool as usize);
        let num = sys.num_relations();
        let root = Pob::new_root(0, sys.query());
        let mut generalizers: Vec<Box<dyn Generalizer>> = Vec::new();
        if !cfg.pdr.no_drop {
            generalizers.push(Box::new(DropConjuncts));
        }
        if !cfg.pdr.no_widen {
            generalizers.push(Box::new(WidenBound));
        }
        Self {
            rng: StdRng::seed_from_u64(cfg.rseed),
            projector: Box::new(ModelSubst),
            generalizers,
            frames: (0..num).map(|_| Frames::new()).collect(),
            facts: ReachFacts::new(num),
            queue: PobQueue::new(),
            root,
            level: 0,
            pob_seq: 0,
            expanded: 0,
            interrupt: Arc::new(AtomicBool::new(false)),
            statistic: Statistic::default(),
            cfg,
            sys,
            pool,
        }
    }

    /// Swap in a different model-based projector.
    pub fn set_projector(&mut self, projector: Box<dyn Projector>) {
        self.projector = projector;
    }

    /// Append a generalizer to the chain.
    pub fn push_generalizer(&mut self, g: Box<dyn Generalizer>) {
        self.generalizers.push(g);
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle {
            flag: self.interrupt.clone(),
        }
    }

    pub fn statistic(&self) -> &Statistic {
        &self.statistic
    }

    /// Run the search to a verdict. Resource exhaustion and oracle
    /// indecision come back as `Verdict::Unknown`; an `Err` is reserved for
    /// internal inconsistencies.
    pub fn solve(&mut self) -> Result<Verdict> {
        let res = self.search();
        debug!("{:#?}", self.statistic);
        match res {
            Ok(v) => Ok(v),
            Err(Error::OracleUnknown) => Ok(Verdict::Unknown(UnknownReason::Oracle)),
            Err(Error::ResourceExhausted(r)) => Ok(Verdict::Unknown(match r {
                Resource::Interrupted => UnknownReason::Interrupted,
                Resource::Obligations => UnknownReason::ObligationBudget,
                Resource::Levels => UnknownReason::LevelBudget,
            })),
            Err(e) => Err(e),
        }
    }

    fn search(&mut self) -> Result<Verdict> {
        self.queue.add(self.root.clone());
        loop {
            let start = Instant::now();
            while let Some(pob) = self.queue.pop() {
                self.checkpoint()?;
                self.expand_pob(&pob)?;
                if let Some(fid) = self.root.reach_fact() {
                    let trace = self.facts.trace(fid);
                    info!("query reachable: counterexample of depth {}", trace.depth());
                    return Ok(Verdict::Sat(trace));
                }
            }
            self.statistic.block_time += start.elapsed();
            let start = Instant::now();
            let fixpoint = self.propagate()?;
            self.statistic.propagate_time += start.elapsed();
            if let Some(lvl) = fixpoint {
                self.propagate_to_infinity(lvl + 1);
                let inv = self.invariant();
                if !self.cfg.pdr.no_verify {
                    self.verify(&inv)?;
                }
                info!("query unreachable: inductive invariant found");
                return Ok(Verdict::Unsat(inv));
            }
            self.inc_level()?;
        }
    }

    /// Raise the search ceiling and retry the root obligation one level
    /// higher. Everything below the root is stale at the new ceiling.
    fn inc_level(&mut self) -> Result<()> {
        if self.level >= self.cfg.pdr.max_level {
            return Err(Error::ResourceExhausted(Resource::Levels));
        }
        self.level += 1;
        debug!("search ceiling raised to {}", self.level);
        self.root.remove_descendants();
        self.root.set_level(self.level);
        self.queue.clear();
        self.queue.add(self.root.clone());
        Ok(())
    }

    fn checkpoint(&self) -> Result<()> {
        if self.interrupt.load(Ordering::Relaxed) {
            return Err(Error::ResourceExhausted(Resource::Interrupted));
        }
        if self.expanded >= self.cfg.pdr.max_obligations {
            return Err(Error::ResourceExhausted(Resource::Obligations));
        }
        Ok(())
    }

    fn invariant(&self) -> Invariant {
        Invariant {
            terms: self
                .frames
                .iter()
                .map(|f| Term::and(f.invariant().into_iter().map(|c| c.negation())))
                .collect(),
        }
    }
}
