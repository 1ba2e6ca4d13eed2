//! Model-based projection.
//!
//! Given a formula, a model of it and a set of variables to keep, a
//! projector returns a formula over the kept variables that the model
//! entails and that implies the existential closure of the original over
//! the eliminated variables. The default projector is the trivial one:
//! substitute every kept variable by its model value, yielding the ground
//! point the model picked (a ground CTI). Arithmetic projectors can be
//! plugged in behind the same trait.

use crate::fol::{Term, Var};
use crate::oracle::Model;

pub trait Projector {
    fn project(&self, fml: &Term, model: &Model, keep: &[Var]) -> Term;
}

/// Ground projection: the conjunction `v = model(v)` over the kept
/// variables the model assigns. Unassigned variables are unconstrained by
/// the query and stay unconstrained in the projection.
#[derive(Debug, Default)]
pub struct ModelSubst;

impl Projector for ModelSubst {
    fn project(&self, _fml: &Term, model: &Model, keep: &[Var]) -> Term {
        Term::and(keep.iter().filter_map(|v| {
            model
                .get(v)
                .map(|val| Term::eq(Term::var(v.clone()), val.to_term()))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fol::{Sort, Value};

    #[test]
    fn ground_projection_pins_kept_vars() {
        let x = Var::new("x", Sort::Int);
        let y = Var::new("y", Sort::Int);
        let mut model = Model::new();
        model.set(x.clone(), Value::Int(3));
        model.set(y.clone(), Value::Int(7));
        let fml = Term::lt(Term::var(x.clone()), Term::var(y.clone()));
        let proj = ModelSubst.project(&fml, &model, std::slice::from_ref(&x));
        assert_eq!(proj, Term::eq(Term::var(x.clone()), Term::int(3)));
        assert!(model.holds(&proj));
    }

    #[test]
    fn unassigned_vars_stay_unconstrained() {
        let x = Var::new("x", Sort::Int);
        let proj = ModelSubst.project(&Term::tt(), &Model::new(), &[x]);
        assert!(proj.is_true());
    }
}
