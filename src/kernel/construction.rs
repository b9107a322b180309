use std::collections::BTreeSet;
use std::fmt;
use std::ops::{Deref, DerefMut};

use tracing::debug;

use crate::auto::rule::{Notation, Rule};
use crate::kernel::atom::Variable;
use crate::kernel::deduction::Deduction;
use crate::kernel::error::KernelError;
use crate::kernel::expression::Expression;
use crate::kernel::inference;
use crate::kernel::proof::Proof;

/// Configuration options for proof construction.
#[derive(Clone, Debug)]
pub struct KernelConfig {
    // How deeply autodeduce may recurse through rules before giving up on a branch.
    pub max_auto_depth: usize,

    // Whether to log every rule attempt at debug level instead of trace level.
    pub trace_rules: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            max_auto_depth: 16,
            trace_rules: false,
        }
    }
}

/// A way to refer to a visible proposition.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Reference {
    Name(String),

    // -1 is the most recent insertion, -2 the one before, spanning into ancestors.
    Relative(isize),
}

impl From<&str> for Reference {
    fn from(name: &str) -> Self {
        Reference::Name(name.to_string())
    }
}

impl From<String> for Reference {
    fn from(name: String) -> Self {
        Reference::Name(name)
    }
}

impl From<&String> for Reference {
    fn from(name: &String) -> Self {
        Reference::Name(name.clone())
    }
}

impl From<isize> for Reference {
    fn from(index: isize) -> Self {
        Reference::Relative(index)
    }
}

impl From<i32> for Reference {
    fn from(index: i32) -> Self {
        Reference::Relative(index as isize)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Reference::Name(name) => write!(f, "{}", name),
            Reference::Relative(index) => write!(f, "{}", index),
        }
    }
}

/// One open deduction, with the automation registered while it was current.
pub struct Frame {
    pub deduction: Deduction,
    pub rules: Vec<Rule>,
    pub notations: Vec<Notation>,
}

impl Frame {
    fn new(name: &str) -> Frame {
        Frame {
            deduction: Deduction::new(name),
            rules: vec![],
            notations: vec![],
        }
    }
}

/// A snapshot of construction state that `rollback` can return to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Checkpoint {
    depth: usize,
    names: usize,
    parameters: usize,
    rules: usize,
    notations: usize,
}

/// The Kernel owns the construction stack: the open deductions, root first.
/// The last one is current, and every construction primitive targets it.
/// Independent proofs use independent kernels; nothing is shared between them.
pub struct Kernel {
    frames: Vec<Frame>,

    pub config: KernelConfig,

    // Counter for generated names.
    next_name: usize,

    // How many autodeduce calls are currently running.
    pub(crate) auto_depth: usize,
}

impl Default for Kernel {
    fn default() -> Self {
        Kernel::new()
    }
}

impl Kernel {
    pub fn new() -> Kernel {
        Kernel::with_config(KernelConfig::default())
    }

    pub fn with_config(config: KernelConfig) -> Kernel {
        Kernel {
            frames: vec![Frame::new("root")],
            config,
            next_name: 0,
            auto_depth: 0,
        }
    }

    /// The number of open deductions, counting the root.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn current(&self) -> &Deduction {
        &self.current_frame().deduction
    }

    pub fn root(&self) -> &Deduction {
        &self.frames[0].deduction
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub(crate) fn current_frame(&self) -> &Frame {
        // The root frame is never popped.
        &self.frames[self.frames.len() - 1]
    }

    pub(crate) fn current_frame_mut(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    fn is_visible(&self, name: &str) -> bool {
        self.frames.iter().any(|f| f.deduction.get(name).is_some())
    }

    /// A name that no visible proposition uses.
    pub fn fresh_name(&mut self) -> String {
        loop {
            let name = format!("#{}", self.next_name);
            self.next_name += 1;
            if !self.is_visible(&name) {
                return name;
            }
        }
    }

    fn name_or_fresh(&mut self, name: Option<&str>) -> String {
        match name {
            Some(name) => name.to_string(),
            None => self.fresh_name(),
        }
    }

    fn install(
        &mut self,
        name: String,
        expression: Expression,
        proof: Proof,
    ) -> Result<String, KernelError> {
        let kind = proof.kind();
        let deduction = &mut self.current_frame_mut().deduction;
        if deduction.insert(&name, expression, proof)? {
            if let Some(expression) = deduction.get(&name) {
                debug!(name = %name, proposition = %expression, proof = kind, "installed");
            }
        }
        Ok(name)
    }

    /// Installs an expression as a condition of the current deduction.
    /// Supposing an alpha-equal expression under the same name again does nothing.
    pub fn suppose(
        &mut self,
        name: Option<&str>,
        expression: Expression,
    ) -> Result<String, KernelError> {
        let name = self.name_or_fresh(name);
        self.install(name, expression, Proof::Supposition)
    }

    /// Installs a condition into an ancestor frame rather than the current one.
    pub(crate) fn suppose_in_frame(
        &mut self,
        index: usize,
        expression: Expression,
    ) -> Result<String, KernelError> {
        let name = self.fresh_name();
        let Some(frame) = self.frames.get_mut(index) else {
            return Err(KernelError::RootDeduction);
        };
        frame
            .deduction
            .insert(&name, expression, Proof::Supposition)?;
        debug!(name = %name, frame = index, "installed definition");
        Ok(name)
    }

    /// A fresh variable, quantified by the current deduction.
    pub fn forall(&mut self, hint: &str) -> Variable {
        let var = Variable::fresh(hint);
        debug!(parameter = %var, "parameter");
        self.current_frame_mut().deduction.add_parameter(var.clone());
        var
    }

    /// Makes an existing variable a parameter of the current deduction.
    /// The variable must not occur free in anything an enclosing deduction knows,
    /// since concluding generalizes over it.
    pub(crate) fn add_parameter(&mut self, var: Variable) -> Result<(), KernelError> {
        let ancestors = &self.frames[..self.frames.len() - 1];
        for frame in ancestors {
            if frame.deduction.parameters().contains(&var) {
                return Err(KernelError::ParameterNotFresh {
                    parameter: var,
                    name: None,
                });
            }
            if let Some((name, _)) = frame
                .deduction
                .iter()
                .find(|(_, expression)| expression.occurs_free(&var))
            {
                return Err(KernelError::ParameterNotFresh {
                    parameter: var,
                    name: Some(name.to_string()),
                });
            }
        }
        debug!(parameter = %var, "parameter");
        self.current_frame_mut().deduction.add_parameter(var);
        Ok(())
    }

    /// Finds a proposition by name, looking through ancestors when it isn't local.
    pub fn lookup(&self, name: &str) -> Result<&Expression, KernelError> {
        self.frames
            .iter()
            .rev()
            .find_map(|f| f.deduction.get(name))
            .ok_or_else(|| KernelError::MissingProposition(name.to_string()))
    }

    pub fn proof(&self, name: &str) -> Option<&Proof> {
        self.frames
            .iter()
            .rev()
            .find_map(|f| f.deduction.proof(name))
    }

    /// The name of the k-th most recent insertion, for negative k.
    pub fn relative_name(&self, k: isize) -> Result<&str, KernelError> {
        if k >= 0 {
            return Err(KernelError::BadRelativeIndex(k));
        }
        let mut remaining = k.unsigned_abs();
        for frame in self.frames.iter().rev() {
            let names = frame.deduction.names();
            if remaining <= names.len() {
                return Ok(names[names.len() - remaining].as_str());
            }
            remaining -= names.len();
        }
        Err(KernelError::BadRelativeIndex(k))
    }

    /// Resolves a reference to the name it refers to.
    pub fn name(&self, reference: impl Into<Reference>) -> Result<String, KernelError> {
        match reference.into() {
            Reference::Name(name) => {
                self.lookup(&name)?;
                Ok(name)
            }
            Reference::Relative(k) => Ok(self.relative_name(k)?.to_string()),
        }
    }

    pub fn proposition(&self, reference: impl Into<Reference>) -> Result<&Expression, KernelError> {
        match reference.into() {
            Reference::Name(name) => self.lookup(&name),
            Reference::Relative(k) => {
                let name = self.relative_name(k)?;
                self.lookup(name)
            }
        }
    }

    /// Every visible proposition, most recent first.
    pub fn history(&self) -> impl Iterator<Item = (&str, &Expression)> {
        self.frames.iter().rev().flat_map(|f| f.deduction.iter().rev())
    }

    /// Instantiates the universal quantification `target` with `value`.
    pub fn bind(
        &mut self,
        target: impl Into<Reference>,
        value: Expression,
    ) -> Result<String, KernelError> {
        let target = self.name(target)?;
        let conclusion = inference::binding(&target, self.lookup(&target)?, &value)?;
        let name = self.fresh_name();
        self.install(name, conclusion, Proof::Binding { target, value })
    }

    /// Modus ponens: the conclusion of `rule`, given that `condition` proves its condition.
    pub fn apply(
        &mut self,
        rule: impl Into<Reference>,
        condition: impl Into<Reference>,
    ) -> Result<String, KernelError> {
        let rule = self.name(rule)?;
        let condition = self.name(condition)?;
        let conclusion =
            inference::modus_ponens(&rule, self.lookup(&rule)?, self.lookup(&condition)?)?;
        let name = self.fresh_name();
        self.install(name, conclusion, Proof::ModusPonens { rule, condition })
    }

    /// Proves the equality between a substitution's notation and its result.
    pub fn substitute(
        &mut self,
        target: Expression,
        replacements: Vec<(Expression, Expression)>,
        occurrences: BTreeSet<usize>,
    ) -> Result<String, KernelError> {
        let conclusion = inference::substitution(&target, &replacements, &occurrences);
        let name = self.fresh_name();
        self.install(
            name,
            conclusion,
            Proof::Substitution {
                target,
                replacements,
                occurrences,
            },
        )
    }

    /// Proves a ground expression, or its negation if it is false.
    pub fn verify_elementary(&mut self, expression: Expression) -> Result<String, KernelError> {
        let (conclusion, holds) = inference::elementary_verification(&expression)?;
        let name = self.fresh_name();
        self.install(
            name,
            conclusion,
            Proof::ElementaryVerification { expression, holds },
        )
    }

    /// Opens a child deduction, which becomes current.
    /// Prefer `subdeduction`, which closes it on every exit path.
    pub fn push(&mut self, name: Option<&str>) -> usize {
        let name = self.name_or_fresh(name);
        debug!(deduction = %name, depth = self.frames.len(), "push");
        self.frames.push(Frame::new(&name));
        self.frames.len()
    }

    /// Closes the current deduction without installing it anywhere.
    pub fn pop(&mut self) -> Result<Deduction, KernelError> {
        if self.frames.len() <= 1 {
            return Err(KernelError::RootDeduction);
        }
        let frame = self.frames.pop().ok_or(KernelError::RootDeduction)?;
        debug!(deduction = %frame.deduction.name, depth = self.frames.len(), "pop");
        Ok(frame.deduction)
    }

    /// Discards every deduction above the given depth.
    pub fn truncate(&mut self, depth: usize) {
        while self.frames.len() > depth.max(1) {
            if let Some(frame) = self.frames.pop() {
                debug!(deduction = %frame.deduction.name, "discarded");
            }
        }
    }

    /// The closed theorem the current deduction would conclude.
    pub fn theorem(&self) -> Result<Expression, KernelError> {
        self.current().theorem()
    }

    /// Closes the current deduction and installs its closed theorem in the parent,
    /// under the deduction's own name.
    pub fn conclude(&mut self) -> Result<String, KernelError> {
        self.conclude_as(None)
    }

    pub fn conclude_as(&mut self, name: Option<&str>) -> Result<String, KernelError> {
        if self.frames.len() <= 1 {
            return Err(KernelError::RootDeduction);
        }
        let theorem = self.theorem()?;
        let deduction = self.pop()?;
        let name = match name {
            Some(name) => name.to_string(),
            None => deduction.name.clone(),
        };
        self.install(name, theorem, Proof::Deduction(Box::new(deduction)))
    }

    /// Opens a child deduction that is discarded unless it is explicitly concluded.
    pub fn subdeduction(&mut self, name: Option<&str>) -> DeductionGuard<'_> {
        let depth = self.push(name);
        DeductionGuard {
            kernel: self,
            depth,
            concluded: false,
        }
    }

    pub fn checkpoint(&self) -> Checkpoint {
        let frame = self.current_frame();
        Checkpoint {
            depth: self.frames.len(),
            names: frame.deduction.len(),
            parameters: frame.deduction.parameters().len(),
            rules: frame.rules.len(),
            notations: frame.notations.len(),
        }
    }

    /// Forgets everything done since the checkpoint.
    pub fn rollback(&mut self, checkpoint: &Checkpoint) {
        self.truncate(checkpoint.depth);
        let frame = self.current_frame_mut();
        frame
            .deduction
            .truncate(checkpoint.names, checkpoint.parameters);
        frame.rules.truncate(checkpoint.rules);
        frame.notations.truncate(checkpoint.notations);
    }
}

/// A child deduction that closes itself.
/// Dropping the guard without concluding discards the deduction and anything opened above it,
/// so the stack always returns to the depth it had before the guard was created.
pub struct DeductionGuard<'k> {
    kernel: &'k mut Kernel,
    depth: usize,
    concluded: bool,
}

impl DeductionGuard<'_> {
    /// Installs the closed theorem into the parent deduction, and returns its name.
    pub fn conclude(self) -> Result<String, KernelError> {
        self.conclude_as(None)
    }

    pub fn conclude_as(mut self, name: Option<&str>) -> Result<String, KernelError> {
        self.kernel.truncate(self.depth);
        let name = self.kernel.conclude_as(name)?;
        self.concluded = true;
        Ok(name)
    }

    /// Closes the deduction and hands it back instead of installing it.
    pub fn finish(mut self) -> Result<Deduction, KernelError> {
        self.kernel.truncate(self.depth);
        let deduction = self.kernel.pop()?;
        self.concluded = true;
        Ok(deduction)
    }
}

impl Deref for DeductionGuard<'_> {
    type Target = Kernel;

    fn deref(&self) -> &Kernel {
        self.kernel
    }
}

impl DerefMut for DeductionGuard<'_> {
    fn deref_mut(&mut self) -> &mut Kernel {
        self.kernel
    }
}

impl Drop for DeductionGuard<'_> {
    fn drop(&mut self) {
        if !self.concluded {
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
    fn test_relative_names_span_into_parent() {
        let mut kernel = Kernel::new();
        kernel.suppose(Some("a"), sym("a")).unwrap();
        kernel.suppose(Some("b"), sym("b")).unwrap();
        let mut sub = kernel.subdeduction(Some("sub"));
        sub.suppose(Some("c"), sym("c")).unwrap();
        assert_eq!(sub.relative_name(-1).unwrap(), "c");
        assert_eq!(sub.relative_name(-2).unwrap(), "b");
        assert_eq!(sub.relative_name(-3).unwrap(), "a");
        assert!(sub.relative_name(-4).is_err());
        assert!(sub.relative_name(0).is_err());
        assert_eq!(sub.proposition(-2).unwrap(), &sym("b"));
    }

    #[test]
    fn test_guard_discards_on_drop() {
        let mut kernel = Kernel::new();
        {
            let mut sub = kernel.subdeduction(None);
            sub.suppose(Some("h"), sym("h")).unwrap();
            sub.push(Some("inner"));
            assert_eq!(sub.depth(), 3);
        }
        assert_eq!(kernel.depth(), 1);
        assert!(kernel.lookup("h").is_err());
    }

    #[test]
    fn test_conclude_installs_composite() {
        let mut kernel = Kernel::new();
        kernel
            .suppose(Some("r"), Expression::rule(sym("p"), sym("q")))
            .unwrap();
        let mut sub = kernel.subdeduction(Some("lemma"));
        sub.suppose(Some("hp"), sym("p")).unwrap();
        sub.apply("r", "hp").unwrap();
        let name = sub.conclude().unwrap();
        assert_eq!(name, "lemma");
        assert_eq!(kernel.depth(), 1);
        assert!(equal(
            kernel.lookup("lemma").unwrap(),
            &Expression::rule(sym("p"), sym("q"))
        ));
        assert!(matches!(kernel.proof("lemma"), Some(Proof::Deduction(_))));
    }

    #[test]
    fn test_root_cannot_be_closed() {
        let mut kernel = Kernel::new();
        assert!(matches!(kernel.pop(), Err(KernelError::RootDeduction)));
        assert!(matches!(kernel.conclude(), Err(KernelError::RootDeduction)));
    }

    #[test]
    fn test_parameter_must_be_fresh_for_ancestors() {
        let v = Variable::fresh("v");
        let pv = Expression::call("P", vec![Expression::variable(&v)]);
        let qv = Expression::call("Q", vec![Expression::variable(&v)]);
        let mut kernel = Kernel::new();
        kernel
            .suppose(Some("r"), Expression::rule(pv.clone(), qv))
            .unwrap();
        kernel.suppose(Some("h"), pv).unwrap();

        let mut sub = kernel.subdeduction(Some("all"));
        let err = sub.add_parameter(v.clone()).unwrap_err();
        assert_eq!(
            err,
            KernelError::ParameterNotFresh {
                parameter: v.clone(),
                name: Some("r".to_string()),
            }
        );
        assert!(sub.current().parameters().is_empty());

        // Unrelated variables are still fine, but only once per chain of deductions.
        let w = Variable::fresh("w");
        sub.add_parameter(w.clone()).unwrap();
        sub.push(None);
        assert_eq!(
            sub.add_parameter(w).unwrap_err().error_type(),
            "ParameterNotFresh"
        );
    }

    #[test]
    fn test_rollback() {
        let mut kernel = Kernel::new();
        kernel.suppose(Some("a"), sym("a")).unwrap();
        let checkpoint = kernel.checkpoint();
        kernel.suppose(Some("b"), sym("b")).unwrap();
        kernel.forall("x");
        kernel.push(None);
        kernel.rollback(&checkpoint);
        assert_eq!(kernel.depth(), 1);
        assert!(kernel.lookup("b").is_err());
        assert!(kernel.current().parameters().is_empty());
        assert_eq!(kernel.checkpoint(), checkpoint);
    }

    #[test]
    fn test_generated_names_skip_taken_ones() {
        let mut kernel = Kernel::new();
        kernel.suppose(Some("#0"), sym("a")).unwrap();
        let name = kernel.suppose(None, sym("b")).unwrap();
        assert_eq!(name, "#1");
    }
}
