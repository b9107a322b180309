use crate::kernel::atom::{Atom, Variable};
use crate::kernel::expression::{Expression, AND, OR};

/// Structural rewrites that `Goal::conclude` accepts on top of alpha-equivalence.
/// Each one is an equivalence, so accepting it never proves anything new.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Normalization {
    /// (and A B) is the same as (and B A).
    CommuteConjunction,

    /// (or A B) is the same as (or B A).
    CommuteDisjunction,

    /// (= a b) is the same as (= b a).
    SymmetricEquality,
}

pub const ADMISSIBLE_NORMALIZATIONS: &[Normalization] = &[
    Normalization::CommuteConjunction,
    Normalization::CommuteDisjunction,
    Normalization::SymmetricEquality,
];

/// Alpha-equivalence.
/// This is exact: it never says two expressions are equal when they aren't.
pub fn equal(a: &Expression, b: &Expression) -> bool {
    Comparer::new(&[]).compare(a, b)
}

/// Alpha-equivalence plus the given normalizations, applied at any depth.
pub fn equal_modulo(a: &Expression, b: &Expression, normalizations: &[Normalization]) -> bool {
    Comparer::new(normalizations).compare(a, b)
}

/// Compares two expressions while tracking which bound variables are identified.
///
/// Entering a pair of binders over x (left) and y (right) pushes (x, y).
/// A variable occurrence resolves against the innermost pair that mentions it on its own side,
/// and the two sides must resolve to the same pair.
/// Unpaired variables are free and must be identical.
/// This is the renaming of the right binder to the left one, with the escape check built in:
/// if x occurs free in the right body, it resolves to no pair there and can't match.
struct Comparer<'a> {
    bound: Vec<(&'a Variable, &'a Variable)>,
    normalizations: &'a [Normalization],
}

impl<'a> Comparer<'a> {
    fn new(normalizations: &'a [Normalization]) -> Self {
        Comparer {
            bound: vec![],
            normalizations,
        }
    }

    fn allows(&self, normalization: Normalization) -> bool {
        self.normalizations.contains(&normalization)
    }

    fn compare_variables(&self, left: &Variable, right: &Variable) -> bool {
        for (l, r) in self.bound.iter().rev() {
            if *l == left || *r == right {
                return *l == left && *r == right;
            }
        }
        left == right
    }

    fn compare_all(&mut self, left: &'a [Expression], right: &'a [Expression]) -> bool {
        left.len() == right.len()
            && left
                .iter()
                .zip(right.iter())
                .all(|(l, r)| self.compare(l, r))
    }

    fn compare(&mut self, left: &'a Expression, right: &'a Expression) -> bool {
        match (left, right) {
            (Expression::Atom(Atom::Variable(l)), Expression::Atom(Atom::Variable(r))) => {
                self.compare_variables(l, r)
            }
            (Expression::Atom(l), Expression::Atom(r)) => l == r,
            (Expression::Binder(lk, lv, lbody), Expression::Binder(rk, rv, rbody)) => {
                if lk != rk {
                    return false;
                }
                self.bound.push((lv, rv));
                let answer = self.compare(lbody, rbody);
                self.bound.pop();
                answer
            }
            (Expression::Rule(lc, lconc), Expression::Rule(rc, rconc)) => {
                self.compare(lc, rc) && self.compare(lconc, rconc)
            }
            (Expression::Equality(ll, lr), Expression::Equality(rl, rr)) => {
                if self.compare(ll, rl) && self.compare(lr, rr) {
                    return true;
                }
                self.allows(Normalization::SymmetricEquality)
                    && self.compare(ll, rr)
                    && self.compare(lr, rl)
            }
            (Expression::Application(l), Expression::Application(r)) => {
                if self.compare_all(l, r) {
                    return true;
                }
                self.compare_commuted(left, right)
            }
            _ => false,
        }
    }

    /// Tries the commutativity normalizations on two binary applications.
    fn compare_commuted(&mut self, left: &'a Expression, right: &'a Expression) -> bool {
        let head = match left.head_symbol() {
            Some(AND) if self.allows(Normalization::CommuteConjunction) => AND,
            Some(OR) if self.allows(Normalization::CommuteDisjunction) => OR,
            _ => return false,
        };
        match (left.as_call(head), right.as_call(head)) {
            (Some([la, lb]), Some([ra, rb])) => self.compare(la, rb) && self.compare(lb, ra),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Expression {
        Expression::symbol(s)
    }

    fn var(v: &Variable) -> Expression {
        Expression::variable(v)
    }

    #[test]
    fn test_numbers_compare_canonically() {
        assert!(equal(&Expression::number(2), &Expression::number(2)));
        let two = Expression::Atom(Atom::parse("2"));
        let two_point_oh = Expression::Atom(Atom::parse("2.0"));
        assert!(equal(&two, &two_point_oh));
        assert!(!equal(&two, &Expression::number(3)));
    }

    #[test]
    fn test_renamed_binders_are_equal() {
        let x = Variable::fresh("x");
        let y = Variable::fresh("y");
        let px = Expression::forall(x.clone(), Expression::call("P", vec![var(&x)]));
        let py = Expression::forall(y.clone(), Expression::call("P", vec![var(&y)]));
        assert!(equal(&px, &py));
        assert!(equal(&py, &px));
    }

    #[test]
    fn test_escape_check() {
        // forall x. x = y  versus  forall y. y = y
        let x = Variable::fresh("x");
        let y = Variable::fresh("y");
        let a = Expression::forall(x.clone(), Expression::equality(var(&x), var(&y)));
        let b = Expression::forall(y.clone(), Expression::equality(var(&y), var(&y)));
        assert!(!equal(&a, &b));
        assert!(!equal(&b, &a));
    }

    #[test]
    fn test_free_variables_with_same_hint_differ() {
        let x1 = Variable::fresh("x");
        let x2 = Variable::fresh("x");
        assert!(!equal(&var(&x1), &var(&x2)));
        assert!(equal(&var(&x1), &var(&x1)));
    }

    #[test]
    fn test_nested_binders_keep_order() {
        // forall x. forall y. R(x, y)  versus  forall y. forall x. R(x, y)
        let x = Variable::fresh("x");
        let y = Variable::fresh("y");
        let body = Expression::call("R", vec![var(&x), var(&y)]);
        let a = Expression::forall(x.clone(), Expression::forall(y.clone(), body.clone()));
        let b = Expression::forall(y.clone(), Expression::forall(x.clone(), body));
        assert!(!equal(&a, &b));
        assert!(equal(&a, &a.clone()));
    }

    #[test]
    fn test_binder_kinds_must_match() {
        let x = Variable::fresh("x");
        let a = Expression::forall(x.clone(), var(&x));
        let b = Expression::exists(x.clone(), var(&x));
        assert!(!equal(&a, &b));
    }

    #[test]
    fn test_normalizations() {
        let ab = Expression::and(sym("a"), sym("b"));
        let ba = Expression::and(sym("b"), sym("a"));
        assert!(!equal(&ab, &ba));
        assert!(equal_modulo(&ab, &ba, ADMISSIBLE_NORMALIZATIONS));
        assert!(!equal_modulo(&ab, &ba, &[Normalization::SymmetricEquality]));

        let e1 = Expression::rule(sym("h"), Expression::equality(sym("a"), sym("b")));
        let e2 = Expression::rule(sym("h"), Expression::equality(sym("b"), sym("a")));
        assert!(equal_modulo(&e1, &e2, ADMISSIBLE_NORMALIZATIONS));
        assert!(!equal(&e1, &e2));
    }
}
