use std::collections::BTreeSet;

use crate::kernel::atom::Variable;
use crate::kernel::equality::equal;
use crate::kernel::expression::{Expression, SUBST};

/// A capture-avoiding rewrite of selected occurrences of subterms.
///
/// Occurrences are counted depth-first, pre-order, across all keys, starting at 0.
/// An empty occurrence set means every occurrence.
/// Matched nodes are replaced whole and never descended into.
pub struct Substitution<'a> {
    replacements: &'a [(Expression, Expression)],
    occurrences: &'a BTreeSet<usize>,
    counter: usize,
}

impl<'a> Substitution<'a> {
    pub fn new(
        replacements: &'a [(Expression, Expression)],
        occurrences: &'a BTreeSet<usize>,
    ) -> Self {
        Substitution {
            replacements,
            occurrences,
            counter: 0,
        }
    }

    /// How many matches the walk has seen so far, replaced or not.
    pub fn matches_seen(&self) -> usize {
        self.counter
    }

    pub fn apply(&mut self, target: &Expression) -> Expression {
        let active: Vec<bool> = vec![true; self.replacements.len()];
        self.walk(target, &active)
    }

    fn selected(&mut self) -> bool {
        let index = self.counter;
        self.counter += 1;
        self.occurrences.is_empty() || self.occurrences.contains(&index)
    }

    fn walk(&mut self, node: &Expression, active: &[bool]) -> Expression {
        let found = self
            .replacements
            .iter()
            .zip(active)
            .find(|((key, _), on)| **on && equal(key, node));
        if let Some(((_, value), _)) = found {
            return if self.selected() {
                value.clone()
            } else {
                node.clone()
            };
        }

        match node {
            Expression::Atom(_) => node.clone(),
            Expression::Binder(kind, var, body) => {
                // Keys mentioning the bound variable refer to something else under the binder.
                let inner: Vec<bool> = self
                    .replacements
                    .iter()
                    .zip(active)
                    .map(|((key, _), on)| *on && !key.occurs_free(var))
                    .collect();
                let captured = self
                    .replacements
                    .iter()
                    .zip(&inner)
                    .any(|((_, value), on)| *on && value.occurs_free(var));
                if captured {
                    let renamed = var.refresh();
                    let body = rename(body, var, &renamed);
                    let body = self.walk(&body, &inner);
                    Expression::binder(*kind, renamed, body)
                } else {
                    Expression::binder(*kind, var.clone(), self.walk(body, &inner))
                }
            }
            Expression::Rule(condition, conclusion) => {
                let condition = self.walk(condition, active);
                Expression::rule(condition, self.walk(conclusion, active))
            }
            Expression::Equality(left, right) => {
                let left = self.walk(left, active);
                Expression::equality(left, self.walk(right, active))
            }
            Expression::Application(items) => {
                Expression::apply(items.iter().map(|item| self.walk(item, active)).collect())
            }
        }
    }
}

/// Replaces the selected occurrences of each key with its value.
pub fn substitute(
    target: &Expression,
    replacements: &[(Expression, Expression)],
    occurrences: &BTreeSet<usize>,
) -> Expression {
    Substitution::new(replacements, occurrences).apply(target)
}

/// Renames free occurrences of one variable to another.
/// The new variable must be fresh, so nothing can capture it.
pub fn rename(target: &Expression, from: &Variable, to: &Variable) -> Expression {
    let replacements = [(Expression::variable(from), Expression::variable(to))];
    substitute(target, &replacements, &BTreeSet::new())
}

/// Replaces the bound variable of a binder with a value throughout its body.
/// Returns None if the expression isn't a binder.
pub fn instantiate(binder: &Expression, value: &Expression) -> Option<Expression> {
    let Expression::Binder(_, var, body) = binder else {
        return None;
    };
    let replacements = [(Expression::variable(var), value.clone())];
    Some(substitute(body, &replacements, &BTreeSet::new()))
}

/// The symbolic notation for a substitution, (subst target ((key value) ...) (index ...)).
pub fn notation(
    target: &Expression,
    replacements: &[(Expression, Expression)],
    occurrences: &BTreeSet<usize>,
) -> Expression {
    let pairs = replacements
        .iter()
        .map(|(k, v)| Expression::apply(vec![k.clone(), v.clone()]))
        .collect();
    Expression::call(
        SUBST,
        vec![
            target.clone(),
            Expression::apply(pairs),
            occurrence_list(occurrences),
        ],
    )
}

/// An occurrence set as an expression, a list of numbers.
pub fn occurrence_list(occurrences: &BTreeSet<usize>) -> Expression {
    Expression::apply(
        occurrences
            .iter()
            .map(|i| Expression::number(*i as i64))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::atom::Variable;

    fn sym(s: &str) -> Expression {
        Expression::symbol(s)
    }

    fn var(v: &Variable) -> Expression {
        Expression::variable(v)
    }

    fn indices(items: &[usize]) -> BTreeSet<usize> {
        items.iter().copied().collect()
    }

    #[test]
    fn test_replace_all_occurrences() {
        let target = Expression::call("f", vec![sym("a"), Expression::call("g", vec![sym("a")])]);
        let result = substitute(&target, &[(sym("a"), sym("b"))], &BTreeSet::new());
        assert_eq!(
            result,
            Expression::call("f", vec![sym("b"), Expression::call("g", vec![sym("b")])])
        );
    }

    #[test]
    fn test_selected_occurrences() {
        let target = Expression::call("f", vec![sym("a"), sym("a"), sym("a")]);
        let result = substitute(&target, &[(sym("a"), sym("b"))], &indices(&[2]));
        assert_eq!(
            result,
            Expression::call("f", vec![sym("a"), sym("a"), sym("b")])
        );
        let result = substitute(&target, &[(sym("a"), sym("b"))], &indices(&[0, 1]));
        assert_eq!(
            result,
            Expression::call("f", vec![sym("b"), sym("b"), sym("a")])
        );
    }

    #[test]
    fn test_matched_node_is_not_descended_into() {
        let fa = Expression::call("f", vec![sym("a")]);
        let target = Expression::equality(fa.clone(), sym("a"));
        let replacements = [(fa, sym("c")), (sym("a"), sym("d"))];
        let empty = BTreeSet::new();
        let mut substitution = Substitution::new(&replacements, &empty);
        let result = substitution.apply(&target);
        assert_eq!(result, Expression::equality(sym("c"), sym("d")));
        assert_eq!(substitution.matches_seen(), 2);
    }

    #[test]
    fn test_bound_occurrences_are_not_replaced() {
        let x = Variable::fresh("x");
        // (= x (forall x. P x)) with x := c only touches the free x.
        let target = Expression::equality(
            var(&x),
            Expression::forall(x.clone(), Expression::call("P", vec![var(&x)])),
        );
        let result = substitute(&target, &[(var(&x), sym("c"))], &BTreeSet::new());
        assert_eq!(
            result,
            Expression::equality(
                sym("c"),
                Expression::forall(x.clone(), Expression::call("P", vec![var(&x)]))
            )
        );
    }

    #[test]
    fn test_capture_avoidance() {
        // forall y. P(x, y) with x := y must not capture the free y.
        let x = Variable::fresh("x");
        let y = Variable::fresh("y");
        let target = Expression::forall(
            y.clone(),
            Expression::call("P", vec![var(&x), var(&y)]),
        );
        let result = substitute(&target, &[(var(&x), var(&y))], &BTreeSet::new());
        let (bound, body) = result.as_forall().unwrap();
        assert_ne!(bound, &y);
        assert_eq!(
            body,
            &Expression::call("P", vec![var(&y), var(bound)])
        );
        assert!(result.occurs_free(&y));
    }

    #[test]
    fn test_instantiate() {
        let x = Variable::fresh("x");
        let forall = Expression::forall(
            x.clone(),
            Expression::equality(
                Expression::call("Q", vec![var(&x)]),
                Expression::call("R", vec![var(&x)]),
            ),
        );
        let v = sym("v");
        assert_eq!(
            instantiate(&forall, &v).unwrap(),
            Expression::equality(
                Expression::call("Q", vec![v.clone()]),
                Expression::call("R", vec![v.clone()]),
            )
        );
        assert!(instantiate(&v, &v).is_none());
    }
}
