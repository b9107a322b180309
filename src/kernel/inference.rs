//! The primitive inference rules, as pure functions from premises to conclusions:
//! - Modus ponens
//! - Binding (universal instantiation)
//! - Substitution
//! - Elementary verification
//!
//! The deduction rule lives on `Deduction::theorem`.
//! Nothing else in the crate creates a derived proposition.

use std::collections::BTreeSet;

use crate::kernel::equality::equal;
use crate::kernel::error::KernelError;
use crate::kernel::evaluator::Evaluator;
use crate::kernel::expression::Expression;
use crate::kernel::substitution::{instantiate, notation, substitute};

/// From `(-> C D)` and something alpha-equal to `C`, concludes `D`.
pub fn modus_ponens(
    rule_name: &str,
    rule: &Expression,
    condition: &Expression,
) -> Result<Expression, KernelError> {
    let Some((expected, conclusion)) = rule.as_rule() else {
        return Err(KernelError::NotARule {
            name: rule_name.to_string(),
            found: rule.clone(),
        });
    };
    if !equal(expected, condition) {
        return Err(KernelError::ConditionMismatch {
            rule: rule_name.to_string(),
            expected: expected.clone(),
            found: condition.clone(),
        });
    }
    Ok(conclusion.clone())
}

/// From `(forall x P)` concludes `P[x:=value]`.
pub fn binding(
    target_name: &str,
    target: &Expression,
    value: &Expression,
) -> Result<Expression, KernelError> {
    if target.as_forall().is_none() {
        return Err(KernelError::NotAQuantification {
            name: target_name.to_string(),
            found: target.clone(),
        });
    }
    // A forall is a binder, so this can't fail.
    Ok(instantiate(target, value).unwrap_or_else(|| target.clone()))
}

/// Concludes `(= (subst target ...) reduced)` for any target.
pub fn substitution(
    target: &Expression,
    replacements: &[(Expression, Expression)],
    occurrences: &BTreeSet<usize>,
) -> Expression {
    Expression::equality(
        notation(target, replacements, occurrences),
        substitute(target, replacements, occurrences),
    )
}

/// Concludes the expression if the evaluator says it holds, and its negation otherwise.
/// The flag says which one.
pub fn elementary_verification(expression: &Expression) -> Result<(Expression, bool), KernelError> {
    let holds = Evaluator::evaluate(expression)?;
    let conclusion = if holds {
        expression.clone()
    } else {
        Expression::not(expression.clone())
    };
    Ok((conclusion, holds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::atom::Variable;

    fn sym(s: &str) -> Expression {
        Expression::symbol(s)
    }

    #[test]
    fn test_modus_ponens_on_alpha_equal_condition() {
        let x = Variable::fresh("x");
        let y = Variable::fresh("y");
        let cx = Expression::forall(x.clone(), Expression::call("P", vec![Expression::variable(&x)]));
        let cy = Expression::forall(y.clone(), Expression::call("P", vec![Expression::variable(&y)]));
        let rule = Expression::rule(cx, sym("D"));
        assert_eq!(modus_ponens("r", &rule, &cy).unwrap(), sym("D"));
    }

    #[test]
    fn test_modus_ponens_failures() {
        let rule = Expression::rule(sym("C"), sym("D"));
        assert!(matches!(
            modus_ponens("r", &rule, &sym("E")),
            Err(KernelError::ConditionMismatch { .. })
        ));
        assert!(matches!(
            modus_ponens("r", &sym("C"), &sym("C")),
            Err(KernelError::NotARule { .. })
        ));
    }

    #[test]
    fn test_binding_requires_forall() {
        let e = Expression::equality(sym("a"), sym("b"));
        assert!(matches!(
            binding("t", &e, &sym("v")),
            Err(KernelError::NotAQuantification { .. })
        ));
    }

    #[test]
    fn test_elementary_verification_negates_false() {
        let e = Expression::equality(Expression::number(2), Expression::number(3));
        let (conclusion, holds) = elementary_verification(&e).unwrap();
        assert!(!holds);
        assert_eq!(conclusion, Expression::not(e));
    }
}
