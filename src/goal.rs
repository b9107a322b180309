use std::ops::{Deref, DerefMut};

use tracing::debug;

use crate::kernel::atom::Variable;
use crate::kernel::construction::Kernel;
use crate::kernel::equality::{equal_modulo, ADMISSIBLE_NORMALIZATIONS};
use crate::kernel::error::KernelError;
use crate::kernel::expression::Expression;
use crate::kernel::substitution::instantiate;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GoalState {
    // Nothing has been introduced yet.
    Open,

    // At least one layer of the goal has been peeled.
    Peeling,

    // The goal has been concluded into its parent.
    Closed,
}

/// What one call to `introduce` did.
#[derive(Clone, Debug, PartialEq)]
pub enum Introduction {
    /// A universal quantifier became a parameter.
    Parameter(Variable),

    /// The condition of a rule became a hypothesis.
    Hypothesis { name: String, expression: Expression },

    /// Nothing was left to peel.
    Done,
}

/// A proposition to be proved, along with the deduction that proves it.
///
/// The goal derefs to the kernel, so proof steps go straight through it.
/// Dropping a goal that was not concluded discards its deduction.
pub struct Goal<'k> {
    kernel: &'k mut Kernel,

    // The name the theorem is installed under. Defaults to the deduction's generated name.
    name: Option<String>,

    // The proposition to be proved, as stated.
    original: Expression,

    // What is left of it after introductions.
    remaining: Expression,

    state: GoalState,

    // The stack depth with the goal's deduction on top.
    depth: usize,
}

impl<'k> Goal<'k> {
    pub fn new(kernel: &'k mut Kernel, name: Option<&str>, proposition: Expression) -> Goal<'k> {
        let depth = kernel.push(name);
        debug!(goal = %proposition, "goal");
        Goal {
            kernel,
            name: name.map(|s| s.to_string()),
            remaining: proposition.clone(),
            original: proposition,
            state: GoalState::Open,
            depth,
        }
    }

    pub fn original(&self) -> &Expression {
        &self.original
    }

    pub fn remaining(&self) -> &Expression {
        &self.remaining
    }

    pub fn state(&self) -> GoalState {
        self.state
    }

    pub fn introduce(&mut self) -> Result<Introduction, KernelError> {
        self.introduce_named(None)
    }

    /// Peels one quantifier or one condition off the remaining goal.
    /// A hypothesis is supposed under the given name, if there is one.
    pub fn introduce_named(&mut self, name: Option<&str>) -> Result<Introduction, KernelError> {
        if self.state == GoalState::Closed {
            return Err(KernelError::GoalClosed(self.original.clone()));
        }
        let introduction = match &self.remaining {
            Expression::Binder(..) if self.remaining.as_forall().is_some() => {
                // The parameter is always fresh, so nothing already known about
                // the bound variable's name can leak into the proof.
                let var = match self.remaining.as_forall() {
                    Some((bound, _)) => bound.refresh(),
                    None => return Ok(Introduction::Done),
                };
                let body = instantiate(&self.remaining, &Expression::variable(&var))
                    .unwrap_or_else(|| self.remaining.clone());
                self.kernel.add_parameter(var.clone())?;
                self.remaining = body;
                Introduction::Parameter(var)
            }
            Expression::Rule(condition, conclusion) => {
                let condition = (**condition).clone();
                let conclusion = (**conclusion).clone();
                let name = self.kernel.suppose(name, condition.clone())?;
                self.remaining = conclusion;
                Introduction::Hypothesis {
                    name,
                    expression: condition,
                }
            }
            _ => return Ok(Introduction::Done),
        };
        self.state = GoalState::Peeling;
        Ok(introduction)
    }

    /// Introduces until there is nothing left to peel.
    pub fn intros(&mut self) -> Result<Vec<Introduction>, KernelError> {
        let mut answer = vec![];
        loop {
            match self.introduce()? {
                Introduction::Done => return Ok(answer),
                introduction => answer.push(introduction),
            }
        }
    }

    /// Checks that the deduction proved the original goal, and installs it in the parent.
    /// On a mismatch the deduction is discarded and the error shows both propositions.
    pub fn conclude(mut self) -> Result<String, KernelError> {
        if self.state == GoalState::Closed {
            return Err(KernelError::GoalClosed(self.original.clone()));
        }
        self.kernel.truncate(self.depth);
        let actual = self.kernel.theorem()?;
        if !equal_modulo(&actual, &self.original, ADMISSIBLE_NORMALIZATIONS) {
            return Err(KernelError::GoalMismatch {
                expected: self.original.clone(),
                actual,
            });
        }
        let name = self.kernel.conclude_as(self.name.as_deref())?;
        self.state = GoalState::Closed;
        Ok(name)
    }
}

impl Deref for Goal<'_> {
    type Target = Kernel;

    fn deref(&self) -> &Kernel {
        self.kernel
    }
}

impl DerefMut for Goal<'_> {
    fn deref_mut(&mut self) -> &mut Kernel {
        self.kernel
    }
}

impl Drop for Goal<'_> {
    fn drop(&mut self) {
        if self.state != GoalState::Closed {
            self.kernel.truncate(self.depth - 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::equality::equal;

    fn sym(s: &str) -> Expression {
        Expression::symbol(s)
    }

    #[test]
    fn test_intros_peel_everything() {
        let mut kernel = Kernel::new();
        let x = Variable::fresh("x");
        let goal_expr = Expression::forall(
            x.clone(),
            Expression::rule(
                Expression::call("P", vec![Expression::variable(&x)]),
                Expression::call("P", vec![Expression::variable(&x)]),
            ),
        );
        let mut goal = Goal::new(&mut kernel, Some("id"), goal_expr.clone());
        assert_eq!(goal.state(), GoalState::Open);
        let intros = goal.intros().unwrap();
        assert_eq!(intros.len(), 2);
        assert_eq!(goal.state(), GoalState::Peeling);
        let Introduction::Parameter(param) = &intros[0] else {
            panic!("expected a parameter");
        };
        assert_ne!(param, &x);
        assert_eq!(goal.introduce().unwrap(), Introduction::Done);
        assert_eq!(goal.depth(), 2);

        // Only a hypothesis so far, so there is nothing to conclude.
        let err = goal.conclude().unwrap_err();
        assert!(matches!(err, KernelError::EmptyDeduction(_)));
        assert_eq!(kernel.depth(), 1);
    }

    #[test]
    fn test_goal_mismatch_discards() {
        let mut kernel = Kernel::new();
        kernel.suppose(Some("a"), sym("a")).unwrap();
        {
            let mut goal = Goal::new(&mut kernel, None, sym("b"));
            goal.verify_elementary(Expression::equality(
                Expression::number(1),
                Expression::number(1),
            ))
            .unwrap();
            let err = goal.conclude().unwrap_err();
            assert!(matches!(err, KernelError::GoalMismatch { .. }));
        }
        assert_eq!(kernel.depth(), 1);
    }

    #[test]
    fn test_goal_accepts_commuted_conjunction() {
        let mut kernel = Kernel::new();
        kernel
            .suppose(
                Some("swap"),
                Expression::rule(sym("q"), Expression::and(sym("p"), sym("q"))),
            )
            .unwrap();
        let goal_expr = Expression::rule(sym("q"), Expression::and(sym("q"), sym("p")));
        let mut goal = Goal::new(&mut kernel, Some("g"), goal_expr.clone());
        let intros = goal.intros().unwrap();
        let Introduction::Hypothesis { name, .. } = &intros[0] else {
            panic!("expected a hypothesis");
        };
        let name = name.clone();
        goal.apply("swap", name.as_str()).unwrap();
        let installed = goal.conclude().unwrap();
        assert_eq!(installed, "g");
        assert!(!equal(kernel.lookup("g").unwrap(), &goal_expr));
        assert_eq!(kernel.depth(), 1);
    }
}
