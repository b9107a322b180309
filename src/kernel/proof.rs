use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::kernel::deduction::Deduction;
use crate::kernel::expression::Expression;

/// How a proposition was established.
/// The set of variants is closed: every proposition in a deduction has exactly one of these.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Proof {
    /// Trusted input. An axiom at the root, a hypothesis anywhere else.
    Supposition,

    /// The conclusion of the rule named `rule`, whose condition is the proposition named `condition`.
    ModusPonens { rule: String, condition: String },

    /// The universal quantification named `target`, instantiated with `value`.
    Binding { target: String, value: Expression },

    /// The equality between the substitution notation and the substituted expression.
    Substitution {
        target: Expression,
        replacements: Vec<(Expression, Expression)>,
        occurrences: BTreeSet<usize>,
    },

    /// Decided by the ground evaluator.
    /// When `holds` is false, the proposition is the negation of `expression`.
    ElementaryVerification { expression: Expression, holds: bool },

    /// The closed theorem of a finished sub-deduction.
    Deduction(Box<Deduction>),
}

impl Proof {
    pub fn is_supposition(&self) -> bool {
        matches!(self, Proof::Supposition)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Proof::Supposition => "supposition",
            Proof::ModusPonens { .. } => "modus ponens",
            Proof::Binding { .. } => "binding",
            Proof::Substitution { .. } => "substitution",
            Proof::ElementaryVerification { .. } => "elementary verification",
            Proof::Deduction(_) => "deduction",
        }
    }
}

impl fmt::Display for Proof {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Proof::Supposition => write!(f, "supposition"),
            Proof::ModusPonens { rule, condition } => {
                write!(f, "modus ponens on '{}' with '{}'", rule, condition)
            }
            Proof::Binding { target, value } => write!(f, "binding '{}' to {}", target, value),
            Proof::Substitution { target, .. } => write!(f, "substitution in {}", target),
            Proof::ElementaryVerification { expression, holds } => {
                write!(f, "elementary verification of {} ({})", expression, holds)
            }
            Proof::Deduction(d) => write!(f, "deduction '{}'", d.name),
        }
    }
}
