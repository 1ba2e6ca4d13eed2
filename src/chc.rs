//! Constrained Horn clause systems.
//!
//! A [`HornSystem`] declares relations (uninterpreted predicates with fixed
//! signatures) and rules `body-relations ∧ constraint ⇒ head-relation`, and
//! designates one query relation. Rules are normalized on insertion into the
//! origin-indexed form the search works with: the transition formula relates
//! the head relation's canonical argument variables to one renamed copy of
//! each body relation's argument variables, plus rule-local auxiliaries.

use crate::fol::{Sort, Term, Var};
use rustc_hash::FxHashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationId(u32);

impl RelationId {
    pub(crate) fn from_index(i: usize) -> Self {
        RelationId(i as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleId(u32);

impl RuleId {
    pub(crate) fn from_index(i: usize) -> Self {
        RuleId(i as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// An uninterpreted relation with a fixed signature. Immutable once
/// declared.
#[derive(Debug, Clone)]
pub struct Relation {
    pub id: RelationId,
    pub name: String,
    pub sig: Vec<Sort>,
    /// Canonical argument variables, `name#i`. Lemmas, obligations and
    /// reach facts of this relation are formulas over these.
    pub args: Vec<Var>,
}

impl Relation {
    fn new(id: RelationId, name: String, sig: Vec<Sort>) -> Self {
        let args = sig
            .iter()
            .enumerate()
            .map(|(i, s)| Var::new(format!("{name}#{i}"), *s))
            .collect();
        Self {
            id,
            name,
            sig,
            args,
        }
    }

    pub fn arity(&self) -> usize {
        self.sig.len()
    }

    /// The canonical argument variables renamed for body occurrence
    /// `oidx` of a rule.
    pub fn origin_args(&self, oidx: usize) -> Vec<Var> {
        self.args
            .iter()
            .map(|v| v.renamed(format!("{}@{oidx}", v.name)))
            .collect()
    }

    /// Canonical-to-origin renaming for body occurrence `oidx`.
    pub fn origin_map(&self, oidx: usize) -> FxHashMap<Var, Var> {
        self.args
            .iter()
            .cloned()
            .zip(self.origin_args(oidx))
            .collect()
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity())
    }
}

/// A normalized Horn rule. Immutable.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: RuleId,
    pub head: RelationId,
    /// Body relations in origin order.
    pub body: Vec<RelationId>,
    /// Transition formula over the head's canonical variables, each body
    /// occurrence's origin variables, and `aux`.
    pub trans: Term,
    /// Rule-local existential variables.
    pub aux: Vec<Var>,
}

impl Rule {
    /// A rule with no uninterpreted body; its models are initial states of
    /// the head relation.
    pub fn is_init(&self) -> bool {
        self.body.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct HornSystem {
    relations: Vec<Relation>,
    names: FxHashMap<String, RelationId>,
    rules: Vec<Rule>,
    rules_of: Vec<Vec<RuleId>>,
    query: Option<RelationId>,
}

impl HornSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_relation(&mut self, name: impl Into<String>, sig: Vec<Sort>) -> RelationId {
        let name = name.into();
        assert!(
            !self.names.contains_key(&name),
            "relation {name} already declared"
        );
        let id = RelationId::from_index(self.relations.len());
        self.names.insert(name.clone(), id);
        self.relations.push(Relation::new(id, name, sig));
        self.rules_of.push(Vec::new());
        id
    }

    /// Add the clause `body ∧ constraint ⇒ head(head_args)`, where argument
    /// positions are arbitrary terms over clause-local variables. The clause
    /// is normalized: clause variables are renamed apart, and argument terms
    /// become equalities with canonical (head) and origin (body) variables.
    pub fn add_rule(
        &mut self,
        head: RelationId,
        head_args: &[Term],
        body: &[(RelationId, Vec<Term>)],
        constraint: Term,
    ) -> RuleId {
        let id = RuleId::from_index(self.rules.len());
        assert!(
            head_args.len() == self.relation(head).arity(),
            "arity mismatch in head of {id}"
        );

        // Rename clause-local variables apart from canonical/origin ones.
        let mut clause_vars = constraint.free_vars();
        for a in head_args {
            a.collect_vars(&mut clause_vars);
        }
        for (_, bargs) in body {
            for a in bargs {
                a.collect_vars(&mut clause_vars);
            }
        }
        let mut aux: Vec<Var> = clause_vars
            .into_iter()
            .map(|v| v.renamed(format!("{id}!{}", v.name)))
            .collect();
        aux.sort();
        let renaming: FxHashMap<Var, Var> = aux
            .iter()
            .map(|v| {
                let orig = v.name.split_once('!').unwrap().1;
                (Var::new(orig, v.sort), v.clone())
            })
            .collect();

        let mut conjuncts = vec![constraint.rename(&renaming)];
        for (canon, arg) in self.relation(head).args.iter().zip(head_args) {
            conjuncts.push(Term::eq(Term::var(canon.clone()), arg.rename(&renaming)));
        }
        for (oidx, (rel, bargs)) in body.iter().enumerate() {
            assert!(
                bargs.len() == self.relation(*rel).arity(),
                "arity mismatch in body atom {oidx} of {id}"
            );
            for (ovar, arg) in self.relation(*rel).origin_args(oidx).iter().zip(bargs) {
                conjuncts.push(Term::eq(Term::var(ovar.clone()), arg.rename(&renaming)));
            }
        }

        self.rules.push(Rule {
            id,
            head,
            body: body.iter().map(|(r, _)| *r).collect(),
            trans: Term::and(conjuncts),
            aux,
        });
        self.rules_of[head.index()].push(id);
        id
    }

    pub fn set_query(&mut self, rel: RelationId) {
        self.query = Some(rel);
    }

    pub fn query(&self) -> RelationId {
        self.query.expect("no query relation designated")
    }

    pub fn relation(&self, id: RelationId) -> &Relation {
        &self.relations[id.index()]
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn num_relations(&self) -> usize {
        self.relations.len()
    }

    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.index()]
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Rules with the given head relation.
    pub fn rules_of(&self, rel: RelationId) -> &[RuleId] {
        &self.rules_of[rel.index()]
    }
}
