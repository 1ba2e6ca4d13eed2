use crate::chc::{RelationId, RuleId};
use crate::fol::Cube;
use log::trace;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReachFactId(pub(crate) u32);

impl ReachFactId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A certified under-approximation: every state satisfying `state` is
/// reachable in `relation`. `rule` produced it and `justification` names
/// one supporting fact per body atom, in origin order.
#[derive(Debug, Clone)]
pub struct ReachFact {
    pub id: ReachFactId,
    pub relation: RelationId,
    pub state: Cube,
    pub rule: RuleId,
    pub justification: Vec<ReachFactId>,
}

/// Append-only arena of reachability facts, indexed per relation.
#[derive(Default)]
pub struct ReachFacts {
    facts: Vec<ReachFact>,
    of: Vec<Vec<ReachFactId>>,
}

impl ReachFacts {
    pub fn new(num_relations: usize) -> Self {
        Self {
            facts: Vec::new(),
            of: vec![Vec::new(); num_relations],
        }
    }

    pub fn add(
        &mut self,
        relation: RelationId,
        state: Cube,
        rule: RuleId,
        justification: Vec<ReachFactId>,
    ) -> ReachFactId {
        let id = ReachFactId(self.facts.len() as u32);
        trace!("reach fact {id:?}: {relation} {state} via {rule}");
        self.facts.push(ReachFact {
            id,
            relation,
            state,
            rule,
            justification,
        });
        self.of[relation.index()].push(id);
        id
    }

    pub fn get(&self, id: ReachFactId) -> &ReachFact {
        &self.facts[id.index()]
    }

    /// Facts of a relation, oldest first. Callers scanning for coverage
    /// iterate in reverse so recent (usually more relevant) facts win.
    pub fn of(&self, relation: RelationId) -> &[ReachFactId] {
        &self.of[relation.index()]
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Unwind the justification dag below `root` into a concrete witness:
    /// rule applications in a valid derivation order, premises before the
    /// steps that consume them.
    pub fn trace(&self, root: ReachFactId) -> Trace {
        let mut steps = Vec::new();
        let depth = self.unwind(root, &mut steps);
        Trace { steps, depth }
    }

    /// Returns the depth of `id`'s justification tree: init facts sit at
    /// depth 0, every other fact one above its deepest premise.
    fn unwind(&self, id: ReachFactId, steps: &mut Vec<TraceStep>) -> usize {
        let fact = self.get(id);
        let mut depth = 0;
        for &premise in &fact.justification {
            depth = depth.max(1 + self.unwind(premise, steps));
        }
        steps.push(TraceStep {
            relation: fact.relation,
            rule: fact.rule,
            state: fact.state.clone(),
        });
        depth
    }
}

/// One rule application of a counterexample derivation.
#[derive(Debug, Clone)]
pub struct TraceStep {
    pub relation: RelationId,
    pub rule: RuleId,
    pub state: Cube,
}

/// A counterexample: a derivation of the query relation from init rules.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    pub steps: Vec<TraceStep>,
    depth: usize,
}

impl Trace {
    /// Depth of the derivation tree: edges along the longest premise chain.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps deriving states of `rel`, in derivation order.
    pub fn states_of(&self, rel: RelationId) -> Vec<&TraceStep> {
        self.steps.iter().filter(|s| s.relation == rel).collect()
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            writeln!(f, "{i}: {} {} [{}]", step.relation, step.state, step.rule)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chc::HornSystem;
    use crate::fol::{Sort, Term, Var};

    fn state(n: i64) -> Cube {
        Cube::new([Term::eq(
            Term::var(Var::new("P#0", Sort::Int)),
            Term::int(n),
        )])
    }

    #[test]
    fn trace_orders_premises_first() {
        let mut sys = HornSystem::new();
        let p = sys.declare_relation("P", vec![Sort::Int]);
        let x = Var::new("x", Sort::Int);
        let init = sys.add_rule(p, &[Term::int(0)], &[], Term::tt());
        let step = sys.add_rule(
            p,
            &[Term::add(Term::var(x.clone()), Term::int(1))],
            &[(p, vec![Term::var(x)])],
            Term::tt(),
        );

        let mut facts = ReachFacts::new(sys.num_relations());
        let f0 = facts.add(p, state(0), init, vec![]);
        let f1 = facts.add(p, state(1), step, vec![f0]);
        let f2 = facts.add(p, state(2), step, vec![f1]);

        let trace = facts.trace(f2);
        assert_eq!(trace.len(), 3);
        assert_eq!(trace.depth(), 2);
        assert_eq!(trace.steps[0].rule, init);
        assert_eq!(trace.steps[1].state, state(1));
        assert_eq!(trace.steps[2].state, state(2));
        assert_eq!(trace.states_of(p).len(), 3);
    }

    #[test]
    fn facts_indexed_per_relation() {
        let mut sys = HornSystem::new();
        let p = sys.declare_relation("P", vec![Sort::Int]);
        let q = sys.declare_relation("Q", vec![]);
        let r = sys.add_rule(p, &[Term::int(0)], &[], Term::tt());
        let mut facts = ReachFacts::new(sys.num_relations());
        let f = facts.add(p, state(0), r, vec![]);
        assert_eq!(facts.of(p), &[f]);
        assert!(facts.of(q).is_empty());
        assert_eq!(facts.get(f).relation, p);
    }
}
