//! The equality theory that `rewrite` and `autobind` build on, plus a few default rules.
//!
//! Everything here goes through the same public construction API a domain theory would use.
//! The axioms are suppositions in whatever deduction is current when `install` runs,
//! normally the root.

use tracing::debug;

use crate::auto::error::TacticError;
use crate::auto::rule::{Bindings, Notation, Rule};
use crate::auto::tactics::bind_lemma;
use crate::kernel::atom::Variable;
use crate::kernel::construction::Kernel;
use crate::kernel::error::KernelError;
use crate::kernel::expression::{BinderKind, Expression, AND, IN, SUBST};

pub const EQ_REFL: &str = "eq_refl";
pub const EQ_SYM: &str = "eq_sym";
pub const EQ_TRANS: &str = "eq_trans";
pub const EQ_ELIM: &str = "eq_elim";
pub const SUBST_CONGRUENCE: &str = "subst_congruence";
pub const AND_INTRO: &str = "and_intro";

/// `(forall-in S (lambda (x) P))` means `(forall (x) (-> (in x S) P))`.
pub const FORALL_IN: &str = "forall-in";

fn var(v: &Variable) -> Expression {
    Expression::variable(v)
}

/// The axioms, by name.
pub fn axioms() -> Vec<(&'static str, Expression)> {
    let a = Variable::fresh("a");
    let b = Variable::fresh("b");
    let c = Variable::fresh("c");
    let t = Variable::fresh("t");
    let x = Variable::fresh("x");
    let y = Variable::fresh("y");
    let i = Variable::fresh("i");
    let eq = Expression::equality;

    let reflexivity = Expression::forall(a.clone(), eq(var(&a), var(&a)));
    let symmetry = Expression::forall_all(
        &[a.clone(), b.clone()],
        Expression::rule(eq(var(&a), var(&b)), eq(var(&b), var(&a))),
    );
    let transitivity = Expression::forall_all(
        &[a.clone(), b.clone(), c.clone()],
        Expression::rules(
            vec![eq(var(&a), var(&b)), eq(var(&b), var(&c))],
            eq(var(&a), var(&c)),
        ),
    );
    let elimination = Expression::forall_all(
        &[a.clone(), b.clone()],
        Expression::rules(vec![eq(var(&a), var(&b)), var(&a)], var(&b)),
    );

    // Replacing things by equal things changes nothing.
    let notation = Expression::call(
        SUBST,
        vec![
            var(&t),
            Expression::apply(vec![Expression::apply(vec![var(&x), var(&y)])]),
            var(&i),
        ],
    );
    let congruence = Expression::forall_all(
        &[t.clone(), x.clone(), y.clone(), i.clone()],
        Expression::rule(eq(var(&x), var(&y)), eq(notation, var(&t))),
    );

    let conjunction = Expression::forall_all(
        &[a.clone(), b.clone()],
        Expression::rules(vec![var(&a), var(&b)], Expression::and(var(&a), var(&b))),
    );

    vec![
        (EQ_REFL, reflexivity),
        (EQ_SYM, symmetry),
        (EQ_TRANS, transitivity),
        (EQ_ELIM, elimination),
        (SUBST_CONGRUENCE, congruence),
        (AND_INTRO, conjunction),
    ]
}

/// Expands the bounded quantifier, if its body is a lambda.
fn expand_forall_in(args: &[Expression]) -> Option<Expression> {
    let [set, body] = args else {
        return None;
    };
    let (x, body) = body.as_binder(BinderKind::Lambda)?;
    Some(Expression::forall(
        x.clone(),
        Expression::rule(
            Expression::call(IN, vec![var(x), set.clone()]),
            body.clone(),
        ),
    ))
}

/// Supposes the axioms and registers the default rules and notations in the current deduction.
pub fn install(kernel: &mut Kernel) -> Result<(), KernelError> {
    for (name, axiom) in axioms() {
        kernel.suppose(Some(name), axiom)?;
    }

    let a = Variable::fresh("a");
    let b = Variable::fresh("b");
    let pa = Expression::pattern_variable(&a);
    let pb = Expression::pattern_variable(&b);

    kernel.add_rule(Rule::new(
        "reflexivity",
        Expression::equality(pa.clone(), pa.clone()),
        {
            let values = vec![pa.clone()];
            move |k: &mut Kernel, bindings: &Bindings, _: &Expression| {
                bind_lemma(k, EQ_REFL, &values, bindings)
            }
        },
    ));

    // Only flips equalities that are already known, so it can't loop.
    kernel.add_rule(Rule::new(
        "symmetry",
        Expression::equality(pa.clone(), pb.clone()),
        {
            let (a, b) = (a.clone(), b.clone());
            move |k: &mut Kernel, bindings: &Bindings, goal: &Expression| {
                let (Some(left), Some(right)) = (bindings.get(&a), bindings.get(&b)) else {
                    return Err(TacticError::failed(goal, "unbound pattern"));
                };
                let flipped = Expression::equality(right.clone(), left.clone());
                let Some(known) = k.recall(&flipped) else {
                    return Err(TacticError::failed(goal, "the flipped equality is not known"));
                };
                let rule = k.autobind(EQ_SYM, &[right.clone(), left.clone()])?;
                Ok(k.apply(rule.as_str(), known.as_str())?)
            }
        },
    ));

    kernel.add_rule(Rule::new(
        "conjunction",
        Expression::call(AND, vec![pa.clone(), pb.clone()]),
        {
            let values = vec![pa, pb];
            move |k: &mut Kernel, bindings: &Bindings, _: &Expression| {
                bind_lemma(k, AND_INTRO, &values, bindings)
            }
        },
    ));

    kernel.add_notation(Notation::new(FORALL_IN, expand_forall_in));
    debug!("prelude installed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::equality::equal;

    fn sym(s: &str) -> Expression {
        Expression::symbol(s)
    }

    #[test]
    fn test_default_rules() {
        let mut kernel = Kernel::new();
        install(&mut kernel).unwrap();

        let refl = Expression::equality(sym("k"), sym("k"));
        let name = kernel.autodeduce(&refl).unwrap();
        assert!(equal(kernel.lookup(&name).unwrap(), &refl));

        kernel
            .suppose(Some("h"), Expression::equality(sym("a"), sym("b")))
            .unwrap();
        let flipped = Expression::equality(sym("b"), sym("a"));
        let name = kernel.autodeduce(&flipped).unwrap();
        assert!(equal(kernel.lookup(&name).unwrap(), &flipped));

        kernel.suppose(Some("p"), sym("p")).unwrap();
        let both = Expression::and(sym("p"), refl.clone());
        let name = kernel.autodeduce(&both).unwrap();
        assert!(equal(kernel.lookup(&name).unwrap(), &both));
    }

    #[test]
    fn test_expand_forall_in() {
        let x = Variable::fresh("x");
        let body = Expression::lambda(x.clone(), Expression::call("P", vec![var(&x)]));
        let expanded = expand_forall_in(&[sym("S"), body]).unwrap();
        let expected = Expression::forall(
            x.clone(),
            Expression::rule(
                Expression::member(var(&x), sym("S")),
                Expression::call("P", vec![var(&x)]),
            ),
        );
        assert!(equal(&expanded, &expected));
        assert!(expand_forall_in(&[sym("S"), sym("P")]).is_none());
    }
}
