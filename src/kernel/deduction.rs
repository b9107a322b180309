use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::kernel::atom::Variable;
use crate::kernel::equality::equal;
use crate::kernel::error::KernelError;
use crate::kernel::expression::Expression;
use crate::kernel::proof::Proof;

/// A proof-construction context.
///
/// A deduction universally quantifies its parameters, assumes its conditions (the propositions
/// proved by supposition) and derives everything else.
/// When it is finished, its closed theorem says that the conditions imply its last derived
/// proposition, for all values of the parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Deduction {
    pub name: String,

    // Fresh variables quantified by this deduction, in the order they were introduced.
    parameters: Vec<Variable>,

    // Local propositions by name.
    propositions: HashMap<String, Expression>,

    // Names in insertion order, for relative references.
    order: Vec<String>,

    // Every local proposition has exactly one proof.
    proofs: HashMap<String, Proof>,
}

impl Deduction {
    pub fn new(name: &str) -> Deduction {
        Deduction {
            name: name.to_string(),
            parameters: vec![],
            propositions: HashMap::new(),
            order: vec![],
            proofs: HashMap::new(),
        }
    }

    pub fn parameters(&self) -> &[Variable] {
        &self.parameters
    }

    pub fn add_parameter(&mut self, var: Variable) {
        if !self.parameters.contains(&var) {
            self.parameters.push(var);
        }
    }

    /// Local names, oldest first.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Expression> {
        self.propositions.get(name)
    }

    pub fn proof(&self, name: &str) -> Option<&Proof> {
        self.proofs.get(name)
    }

    /// Adds a proposition.
    /// Returns false when the name already holds an alpha-equal proposition, which is a no-op.
    pub fn insert(
        &mut self,
        name: &str,
        expression: Expression,
        proof: Proof,
    ) -> Result<bool, KernelError> {
        if let Some(existing) = self.propositions.get(name) {
            if equal(existing, &expression) {
                return Ok(false);
            }
            return Err(KernelError::DuplicateName {
                name: name.to_string(),
                existing: existing.clone(),
                new: expression,
            });
        }
        self.propositions.insert(name.to_string(), expression);
        self.proofs.insert(name.to_string(), proof);
        self.order.push(name.to_string());
        Ok(true)
    }

    /// Local propositions, oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&str, &Expression)> {
        self.order
            .iter()
            .map(move |name| (name.as_str(), &self.propositions[name]))
    }

    pub fn is_condition(&self, name: &str) -> bool {
        self.proofs.get(name).map_or(false, |p| p.is_supposition())
    }

    /// The hypotheses, oldest first.
    pub fn conditions(&self) -> Vec<&Expression> {
        self.iter()
            .filter(|(name, _)| self.is_condition(name))
            .map(|(_, e)| e)
            .collect()
    }

    /// The most recently derived proposition.
    pub fn last_derived(&self) -> Option<(&str, &Expression)> {
        self.iter().rev().find(|(name, _)| !self.is_condition(name))
    }

    /// The closed theorem.
    /// Conditions nest to the right around the last derived proposition, then the parameters
    /// are quantified, the first parameter outermost.
    pub fn theorem(&self) -> Result<Expression, KernelError> {
        let Some((_, conclusion)) = self.last_derived() else {
            return Err(KernelError::EmptyDeduction(self.name.clone()));
        };
        let conditions = self.conditions().into_iter().cloned().collect();
        let body = Expression::rules(conditions, conclusion.clone());
        Ok(Expression::forall_all(&self.parameters, body))
    }

    /// Forgets everything added after the given sizes.
    pub fn truncate(&mut self, num_names: usize, num_parameters: usize) {
        for name in self.order.drain(num_names.min(self.order.len())..) {
            self.propositions.remove(&name);
            self.proofs.remove(&name);
        }
        self.parameters.truncate(num_parameters);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Expression {
        Expression::symbol(s)
    }

    #[test]
    fn test_reinsertion() {
        let mut d = Deduction::new("d");
        assert!(d.insert("h", sym("a"), Proof::Supposition).unwrap());
        assert!(!d.insert("h", sym("a"), Proof::Supposition).unwrap());
        assert_eq!(d.len(), 1);
        assert!(matches!(
            d.insert("h", sym("b"), Proof::Supposition),
            Err(KernelError::DuplicateName { .. })
        ));
    }

    #[test]
    fn test_theorem_shape() {
        let x = Variable::fresh("x");
        let mut d = Deduction::new("d");
        d.add_parameter(x.clone());
        let xe = Expression::variable(&x);
        let nat = sym("N");
        d.insert("h", Expression::member(xe.clone(), nat.clone()), Proof::Supposition)
            .unwrap();
        let succ = Expression::member(
            Expression::call("+", vec![xe.clone(), Expression::number(1)]),
            nat.clone(),
        );
        d.insert(
            "s",
            succ.clone(),
            Proof::ModusPonens {
                rule: "r".to_string(),
                condition: "h".to_string(),
            },
        )
        .unwrap();
        let expected = Expression::forall(
            x.clone(),
            Expression::rule(Expression::member(xe, nat), succ),
        );
        assert!(equal(&d.theorem().unwrap(), &expected));
    }

    #[test]
    fn test_empty_deduction() {
        let mut d = Deduction::new("d");
        d.insert("h", sym("a"), Proof::Supposition).unwrap();
        assert!(matches!(d.theorem(), Err(KernelError::EmptyDeduction(_))));
    }

    #[test]
    fn test_truncate() {
        let mut d = Deduction::new("d");
        d.insert("a", sym("a"), Proof::Supposition).unwrap();
        d.add_parameter(Variable::fresh("x"));
        d.insert("b", sym("b"), Proof::Supposition).unwrap();
        d.truncate(1, 0);
        assert_eq!(d.names(), &["a".to_string()]);
        assert!(d.get("b").is_none());
        assert!(d.parameters().is_empty());
    }
}
