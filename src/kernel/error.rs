use std::fmt;

use crate::kernel::atom::Variable;
use crate::kernel::evaluator::EvaluationError;
use crate::kernel::expression::Expression;

/// A fatal error in proof construction.
/// None of these are retried; they end the enclosing attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum KernelError {
    // A name is already taken by a different proposition.
    DuplicateName {
        name: String,
        existing: Expression,
        new: Expression,
    },

    // No visible deduction has a proposition with this name.
    MissingProposition(String),

    // A relative reference that is not negative, or reaches past the root.
    BadRelativeIndex(isize),

    // ModusPonens on something that isn't a rule.
    NotARule { name: String, found: Expression },

    // ModusPonens whose condition doesn't match the rule's.
    ConditionMismatch {
        rule: String,
        expected: Expression,
        found: Expression,
    },

    // Binding on something that isn't a universal quantification.
    NotAQuantification { name: String, found: Expression },

    // Rewriting through something that isn't an equality.
    NotAnEquality { name: String, found: Expression },

    // The ground evaluator could not decide an expression.
    // This means the kernel was asked to verify something it can't; it is never swallowed.
    Evaluation(EvaluationError),

    // A parameter that an enclosing deduction already uses, either as its own
    // parameter or free in the named proposition.
    ParameterNotFresh {
        parameter: Variable,
        name: Option<String>,
    },

    // Concluding a deduction that derived nothing.
    EmptyDeduction(String),

    // Trying to pop or conclude the root deduction.
    RootDeduction,

    // A goal's proof established something other than the goal.
    GoalMismatch {
        expected: Expression,
        actual: Expression,
    },

    // Using a goal after it was concluded.
    GoalClosed(Expression),
}

impl KernelError {
    /// A short name for the kind of error, for reporting.
    pub fn error_type(&self) -> &'static str {
        match self {
            KernelError::DuplicateName { .. } => "DuplicateName",
            KernelError::MissingProposition(_) => "MissingProposition",
            KernelError::BadRelativeIndex(_) => "BadRelativeIndex",
            KernelError::NotARule { .. } => "NotARule",
            KernelError::ConditionMismatch { .. } => "ConditionMismatch",
            KernelError::NotAQuantification { .. } => "NotAQuantification",
            KernelError::NotAnEquality { .. } => "NotAnEquality",
            KernelError::Evaluation(_) => "Evaluation",
            KernelError::ParameterNotFresh { .. } => "ParameterNotFresh",
            KernelError::EmptyDeduction(_) => "EmptyDeduction",
            KernelError::RootDeduction => "RootDeduction",
            KernelError::GoalMismatch { .. } => "GoalMismatch",
            KernelError::GoalClosed(_) => "GoalClosed",
        }
    }
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            KernelError::DuplicateName {
                name,
                existing,
                new,
            } => write!(
                f,
                "the name '{}' already refers to {}, cannot reuse it for {}",
                name, existing, new
            ),
            KernelError::MissingProposition(name) => {
                write!(f, "missing proposition: '{}'", name)
            }
            KernelError::BadRelativeIndex(index) => {
                write!(f, "no proposition at relative index {}", index)
            }
            KernelError::NotARule { name, found } => {
                write!(f, "'{}' is not a rule: {}", name, found)
            }
            KernelError::ConditionMismatch {
                rule,
                expected,
                found,
            } => write!(
                f,
                "rule '{}' needs the condition {} but was given {}",
                rule, expected, found
            ),
            KernelError::NotAQuantification { name, found } => {
                write!(f, "'{}' is not a universal quantification: {}", name, found)
            }
            KernelError::NotAnEquality { name, found } => {
                write!(f, "'{}' is not an equality: {}", name, found)
            }
            KernelError::Evaluation(e) => write!(f, "elementary verification failed: {}", e),
            KernelError::ParameterNotFresh {
                parameter,
                name: Some(name),
            } => write!(
                f,
                "cannot generalize over {}: it occurs free in '{}'",
                parameter, name
            ),
            KernelError::ParameterNotFresh {
                parameter,
                name: None,
            } => write!(
                f,
                "cannot generalize over {}: an enclosing deduction already does",
                parameter
            ),
            KernelError::EmptyDeduction(name) => {
                write!(f, "deduction '{}' did not derive anything", name)
            }
            KernelError::RootDeduction => write!(f, "the root deduction cannot be closed"),
            KernelError::GoalMismatch { expected, actual } => write!(
                f,
                "the proof established\n  {}\nbut the goal was\n  {}",
                actual, expected
            ),
            KernelError::GoalClosed(goal) => write!(f, "the goal {} is already concluded", goal),
        }
    }
}

impl std::error::Error for KernelError {}

impl From<EvaluationError> for KernelError {
    fn from(e: EvaluationError) -> Self {
        KernelError::Evaluation(e)
    }
}
