use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use crate::auto::error::TacticError;
use crate::kernel::atom::{Atom, Variable};
use crate::kernel::construction::Kernel;
use crate::kernel::equality::equal;
use crate::kernel::expression::Expression;
use crate::kernel::substitution::substitute;

/// What a successful unification learned: the value of each pattern variable.
/// Unification returns a new map rather than filling in slots on the pattern,
/// so the same pattern can be matched any number of times, nested or not.
pub type Bindings = im::HashMap<Variable, Expression>;

/// A tactic proves the proposition its rule's pattern matched, given the bindings.
/// It returns the name of the proof it installed.
pub type Tactic = Rc<dyn Fn(&mut Kernel, &Bindings, &Expression) -> Result<String, TacticError>>;

/// A pattern-triggered tactic.
#[derive(Clone)]
pub struct Rule {
    // Only for logging.
    pub name: String,

    pub pattern: Expression,

    pub tactic: Tactic,
}

impl Rule {
    pub fn new(
        name: &str,
        pattern: Expression,
        tactic: impl Fn(&mut Kernel, &Bindings, &Expression) -> Result<String, TacticError> + 'static,
    ) -> Rule {
        Rule {
            name: name.to_string(),
            pattern,
            tactic: Rc::new(tactic),
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .finish()
    }
}

/// Expands the arguments of a sugared application into its meaning, if it has one.
pub type Expansion = Rc<dyn Fn(&[Expression]) -> Option<Expression>>;

/// Surface sugar for applications with a given head symbol.
#[derive(Clone)]
pub struct Notation {
    pub head: String,
    pub expand: Expansion,
}

impl Notation {
    pub fn new(head: &str, expand: impl Fn(&[Expression]) -> Option<Expression> + 'static) -> Notation {
        Notation {
            head: head.to_string(),
            expand: Rc::new(expand),
        }
    }
}

impl fmt::Debug for Notation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Notation").field("head", &self.head).finish()
    }
}

/// One-way structural matching of a pattern against a term.
/// Only pattern variables in the pattern get bound; the term is never changed.
pub fn unify(pattern: &Expression, term: &Expression) -> Option<Bindings> {
    unify_with(pattern, term, Bindings::new())
}

/// Unification that extends bindings that are already known.
pub fn unify_with(pattern: &Expression, term: &Expression, bindings: Bindings) -> Option<Bindings> {
    Matcher { bound: vec![] }.unify(pattern, term, bindings)
}

struct Matcher {
    // Pairs of binder variables, pattern side and term side, that currently stand for each other.
    bound: Vec<(Variable, Variable)>,
}

impl Matcher {
    fn unify(&mut self, pattern: &Expression, term: &Expression, bindings: Bindings) -> Option<Bindings> {
        match (pattern, term) {
            (Expression::Atom(Atom::PatternVariable(slot)), _) => {
                // A value can't mention a variable that is bound inside the match.
                if self.bound.iter().any(|(_, inner)| term.occurs_free(inner)) {
                    return None;
                }
                match bindings.get(slot) {
                    Some(existing) => equal(existing, term).then_some(bindings),
                    None => Some(bindings.update(slot.clone(), term.clone())),
                }
            }
            (Expression::Atom(Atom::Variable(left)), Expression::Atom(Atom::Variable(right))) => {
                for (p, t) in self.bound.iter().rev() {
                    if p == left || t == right {
                        return (p == left && t == right).then_some(bindings);
                    }
                }
                (left == right).then_some(bindings)
            }
            (Expression::Atom(left), Expression::Atom(right)) => (left == right).then_some(bindings),
            (Expression::Binder(k1, v1, b1), Expression::Binder(k2, v2, b2)) if k1 == k2 => {
                self.bound.push((v1.clone(), v2.clone()));
                let answer = self.unify(b1, b2, bindings);
                self.bound.pop();
                answer
            }
            (Expression::Rule(c1, d1), Expression::Rule(c2, d2))
            | (Expression::Equality(c1, d1), Expression::Equality(c2, d2)) => {
                let bindings = self.unify(c1, c2, bindings)?;
                self.unify(d1, d2, bindings)
            }
            (Expression::Application(xs), Expression::Application(ys)) if xs.len() == ys.len() => {
                let mut bindings = bindings;
                for (x, y) in xs.iter().zip(ys) {
                    bindings = self.unify(x, y, bindings)?;
                }
                Some(bindings)
            }
            _ => None,
        }
    }
}

/// Replaces every bound pattern variable with its value. Unbound ones stay as they are.
pub fn fill(pattern: &Expression, bindings: &Bindings) -> Expression {
    let replacements: Vec<(Expression, Expression)> = bindings
        .iter()
        .map(|(slot, value)| (Expression::pattern_variable(slot), value.clone()))
        .collect();
    if replacements.is_empty() {
        return pattern.clone();
    }
    substitute(pattern, &replacements, &BTreeSet::new())
}

/// Turns the leading universal quantifiers of a statement into pattern variables.
/// Returns the new pattern variables, outermost first, and the rest of the statement.
pub fn open_foralls(statement: &Expression) -> (Vec<Variable>, Expression) {
    let (vars, body) = statement.strip_foralls();
    let slots: Vec<Variable> = vars.iter().map(|v| v.refresh()).collect();
    let replacements: Vec<(Expression, Expression)> = vars
        .iter()
        .zip(&slots)
        .map(|(var, slot)| (Expression::variable(var), Expression::pattern_variable(slot)))
        .collect();
    let body = if replacements.is_empty() {
        body.clone()
    } else {
        substitute(body, &replacements, &BTreeSet::new())
    };
    (slots, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Expression {
        Expression::symbol(s)
    }

    #[test]
    fn test_unify_binds_consistently() {
        let p = Variable::fresh("p");
        let pattern = Expression::equality(Expression::pattern_variable(&p), Expression::pattern_variable(&p));
        let bindings = unify(&pattern, &Expression::equality(sym("a"), sym("a"))).unwrap();
        assert_eq!(bindings.get(&p), Some(&sym("a")));
        assert!(unify(&pattern, &Expression::equality(sym("a"), sym("b"))).is_none());
    }

    #[test]
    fn test_unify_leaves_pattern_untouched() {
        let p = Variable::fresh("p");
        let pattern = Expression::call("f", vec![Expression::pattern_variable(&p)]);
        let first = unify(&pattern, &Expression::call("f", vec![sym("a")])).unwrap();
        let second = unify(&pattern, &Expression::call("f", vec![sym("b")])).unwrap();
        assert_eq!(first.get(&p), Some(&sym("a")));
        assert_eq!(second.get(&p), Some(&sym("b")));
        assert!(pattern.has_pattern_variables());
    }

    #[test]
    fn test_unify_under_binders() {
        let p = Variable::fresh("p");
        let x = Variable::fresh("x");
        let y = Variable::fresh("y");
        let pattern = Expression::forall(
            x.clone(),
            Expression::equality(Expression::variable(&x), Expression::pattern_variable(&p)),
        );
        let term = Expression::forall(
            y.clone(),
            Expression::equality(Expression::variable(&y), sym("c")),
        );
        let bindings = unify(&pattern, &term).unwrap();
        assert_eq!(bindings.get(&p), Some(&sym("c")));

        // The bound variable can't escape into a binding.
        let escaping = Expression::forall(
            y.clone(),
            Expression::equality(Expression::variable(&y), Expression::variable(&y)),
        );
        assert!(unify(&pattern, &escaping).is_none());
    }

    #[test]
    fn test_fill_and_open_foralls() {
        let x = Variable::fresh("x");
        let statement = Expression::forall(
            x.clone(),
            Expression::equality(Expression::variable(&x), Expression::variable(&x)),
        );
        let (slots, body) = open_foralls(&statement);
        assert_eq!(slots.len(), 1);
        let bindings = unify(&body, &Expression::equality(sym("b"), sym("b"))).unwrap();
        assert_eq!(fill(&body, &bindings), Expression::equality(sym("b"), sym("b")));
    }
}
