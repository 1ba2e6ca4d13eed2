use hornet::chc::HornSystem;
use hornet::config::Config;
use hornet::fol::{Sort, Term, Value, Var};
use hornet::oracle::{EnumOracle, Model, Oracle, SatResult};
use hornet::pdr::{Pdr, UnknownReason, Verdict};

fn init_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// The bounded counter: `P(0)`, `P(x) ∧ x < 10 ⇒ P(x+1)`, and a query
/// guarded by `x > 10` (unreachable) or `x >= 10` (reachable at x = 10).
fn counter_system(strict_guard: bool) -> HornSystem {
    let mut sys = HornSystem::new();
    let p = sys.declare_relation("P", vec![Sort::Int]);
    let q = sys.declare_relation("Query", vec![]);
    let x = Var::new("x", Sort::Int);
    sys.add_rule(p, &[Term::int(0)], &[], Term::tt());
    sys.add_rule(
        p,
        &[Term::add(Term::var(x.clone()), Term::int(1))],
        &[(p, vec![Term::var(x.clone())])],
        Term::lt(Term::var(x.clone()), Term::int(10)),
    );
    let guard = if strict_guard {
        Term::gt(Term::var(x.clone()), Term::int(10))
    } else {
        Term::ge(Term::var(x.clone()), Term::int(10))
    };
    sys.add_rule(q, &[], &[(p, vec![Term::var(x)])], guard);
    sys.set_query(q);
    sys
}

fn counter_oracle() -> Box<dyn Oracle> {
    Box::new(EnumOracle::new(-2, 13))
}

#[test]
fn bounded_counter_is_unreachable() {
    init_log();
    let sys = counter_system(true);
    let p = sys.relations()[0].id;
    let q = sys.query();
    let mut pdr = Pdr::new(Config::default(), sys, counter_oracle);
    let Verdict::Unsat(inv) = pdr.solve().unwrap() else {
        panic!("expected unsat");
    };
    assert!(inv.of(q).is_false());
    // the invariant admits every reachable counter value and excludes 11
    let x = Var::new("P#0", Sort::Int);
    for v in 0..=10 {
        let mut m = Model::new();
        m.set(x.clone(), Value::Int(v));
        assert!(m.holds(inv.of(p)), "invariant rejects reachable P({v})");
    }
    let mut m = Model::new();
    m.set(x, Value::Int(11));
    assert!(!m.holds(inv.of(p)), "invariant admits unreachable P(11)");
}

#[test]
fn relaxed_counter_is_reachable() {
    init_log();
    let sys = counter_system(false);
    let p = sys.relations()[0].id;
    let q = sys.query();
    let mut pdr = Pdr::new(Config::default(), sys, counter_oracle);
    let Verdict::Sat(trace) = pdr.solve().unwrap() else {
        panic!("expected sat");
    };
    // the counter must be driven 0 -> 10 before the query fires
    let states = trace.states_of(p);
    assert_eq!(states.len(), 11);
    let x = Var::new("P#0", Sort::Int);
    for (v, step) in states.iter().enumerate() {
        let lit = Term::eq(Term::var(x.clone()), Term::int(v as i64));
        assert!(step.state.contains(&lit), "step {v} is not P({v})");
    }
    let last = trace.steps.last().unwrap();
    assert_eq!(last.relation, q);
    assert_eq!(trace.len(), 12);
    assert_eq!(trace.depth(), 11);
}

/// A query fed by two independent premises; the counterexample must
/// justify both.
fn pair_system(target: i64) -> HornSystem {
    let mut sys = HornSystem::new();
    let a = sys.declare_relation("A", vec![Sort::Int]);
    let b = sys.declare_relation("B", vec![Sort::Int]);
    let q = sys.declare_relation("Query", vec![]);
    let x = Var::new("x", Sort::Int);
    let y = Var::new("y", Sort::Int);
    sys.add_rule(a, &[Term::int(0)], &[], Term::tt());
    sys.add_rule(
        a,
        &[Term::add(Term::var(x.clone()), Term::int(1))],
        &[(a, vec![Term::var(x.clone())])],
        Term::lt(Term::var(x.clone()), Term::int(2)),
    );
    sys.add_rule(b, &[Term::int(1)], &[], Term::tt());
    sys.add_rule(
        q,
        &[],
        &[(a, vec![Term::var(x.clone())]), (b, vec![Term::var(y.clone())])],
        Term::and([
            Term::eq(Term::var(x), Term::int(target)),
            Term::eq(Term::var(y), Term::int(1)),
        ]),
    );
    sys.set_query(q);
    sys
}

fn pair_oracle() -> Box<dyn Oracle> {
    Box::new(EnumOracle::new(-2, 8))
}

#[test]
fn two_premise_query_reachable() {
    init_log();
    let sys = pair_system(2);
    let a = sys.relations()[0].id;
    let b = sys.relations()[1].id;
    let mut pdr = Pdr::new(Config::default(), sys, pair_oracle);
    let Verdict::Sat(trace) = pdr.solve().unwrap() else {
        panic!("expected sat");
    };
    // both premises are justified: the full A chain and the single B fact
    assert_eq!(trace.states_of(a).len(), 3);
    assert_eq!(trace.states_of(b).len(), 1);
    assert_eq!(trace.len(), 5);
    assert_eq!(trace.depth(), 3);
}

#[test]
fn two_premise_query_unreachable() {
    init_log();
    let sys = pair_system(5);
    let a = sys.relations()[0].id;
    let mut pdr = Pdr::new(Config::default(), sys, pair_oracle);
    let Verdict::Unsat(inv) = pdr.solve().unwrap() else {
        panic!("expected unsat");
    };
    let mut m = Model::new();
    m.set(Var::new("A#0", Sort::Int), Value::Int(5));
    assert!(!m.holds(inv.of(a)));
}

struct UnknownOracle;

impl Oracle for UnknownOracle {
    fn push(&mut self) {}

    fn pop(&mut self) {}

    fn assert(&mut self, _fml: &Term) {}

    fn check(&mut self, _assumptions: &[Term]) -> SatResult {
        SatResult::Unknown
    }

    fn model(&self) -> Model {
        Model::new()
    }

    fn unsat_core(&self) -> Vec<Term> {
        Vec::new()
    }
}

#[test]
fn oracle_unknown_is_surfaced() {
    init_log();
    let sys = counter_system(true);
    let mut pdr = Pdr::new(Config::default(), sys, || Box::new(UnknownOracle));
    match pdr.solve().unwrap() {
        Verdict::Unknown(UnknownReason::Oracle) => {}
        v => panic!("expected unknown from oracle, got {v:?}"),
    }
}

#[test]
fn obligation_budget_gives_unknown() {
    init_log();
    let mut cfg = Config::default();
    cfg.pdr.max_obligations = 3;
    let mut pdr = Pdr::new(cfg, counter_system(false), counter_oracle);
    match pdr.solve().unwrap() {
        Verdict::Unknown(UnknownReason::ObligationBudget) => {}
        v => panic!("expected obligation budget, got {v:?}"),
    }
}

#[test]
fn level_budget_gives_unknown() {
    init_log();
    let mut cfg = Config::default();
    cfg.pdr.max_level = 5;
    // the counterexample needs ceiling 11, so the budget hits first
    let mut pdr = Pdr::new(cfg, counter_system(false), counter_oracle);
    match pdr.solve().unwrap() {
        Verdict::Unknown(UnknownReason::LevelBudget) => {}
        v => panic!("expected level budget, got {v:?}"),
    }
}

#[test]
fn interrupt_gives_unknown() {
    init_log();
    let mut pdr = Pdr::new(Config::default(), counter_system(true), counter_oracle);
    pdr.interrupt_handle().interrupt();
    match pdr.solve().unwrap() {
        Verdict::Unknown(UnknownReason::Interrupted) => {}
        v => panic!("expected interrupted, got {v:?}"),
    }
}

#[test]
fn verdicts_stable_without_generalizers_on_small_system() {
    init_log();
    // with literal dropping disabled the point lemmas still converge on a
    // two-step system
    let mut cfg = Config::default();
    cfg.pdr.no_drop = true;
    let mut pdr = Pdr::new(cfg, pair_system(5), pair_oracle);
    assert!(matches!(pdr.solve().unwrap(), Verdict::Unsat(_)));
}

#[test]
fn ctp_does_not_change_verdicts() {
    init_log();
    let mut cfg = Config::default();
    cfg.pdr.ctp = true;
    let mut pdr = Pdr::new(cfg.clone(), counter_system(true), counter_oracle);
    assert!(matches!(pdr.solve().unwrap(), Verdict::Unsat(_)));
    let mut pdr = Pdr::new(cfg, counter_system(false), counter_oracle);
    assert!(matches!(pdr.solve().unwrap(), Verdict::Sat(_)));
}
