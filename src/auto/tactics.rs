use std::collections::BTreeSet;

use tracing::{debug, trace};

use crate::auto::error::TacticError;
use crate::auto::rule::{fill, open_foralls, unify, Bindings, Notation, Rule};
use crate::kernel::construction::{Kernel, Reference};
use crate::kernel::equality::equal;
use crate::kernel::error::KernelError;
use crate::kernel::evaluator::Evaluator;
use crate::kernel::expression::Expression;
use crate::kernel::substitution::occurrence_list;
use crate::prelude::{EQ_ELIM, EQ_SYM, EQ_TRANS, SUBST_CONGRUENCE};

// Notations can expand into other notations, but not forever.
const MAX_EXPANSIONS: usize = 8;

impl Kernel {
    /// Registers a rule in the current deduction. It applies there and in every descendant.
    pub fn add_rule(&mut self, rule: Rule) {
        debug!(rule = %rule.name, pattern = %rule.pattern, "rule");
        self.current_frame_mut().rules.push(rule);
    }

    /// Registers surface sugar in the current deduction.
    pub fn add_notation(&mut self, notation: Notation) {
        debug!(head = %notation.head, "notation");
        self.current_frame_mut().notations.push(notation);
    }

    /// The name of a visible proposition alpha-equal to this one, most recent first.
    pub fn recall(&self, proposition: &Expression) -> Option<String> {
        self.history()
            .find(|(_, e)| equal(e, proposition))
            .map(|(name, _)| name.to_string())
    }

    /// Proves a proposition by recall, then elementary verification, then the rule tables.
    /// Rules are tried from the innermost deduction outwards, in registration order.
    /// Whatever a failing rule did is rolled back before the next one runs.
    pub fn autodeduce(&mut self, proposition: &Expression) -> Result<String, TacticError> {
        if let Some(name) = self.recall(proposition) {
            trace!(name = %name, proposition = %proposition, "recalled");
            return Ok(name);
        }

        // A false verification would prove the negation, which is no use here.
        if proposition.is_ground() && matches!(Evaluator::evaluate(proposition), Ok(true)) {
            return Ok(self.verify_elementary(proposition.clone())?);
        }

        if self.auto_depth >= self.config.max_auto_depth {
            return Err(TacticError::failed(proposition, "automation depth limit reached"));
        }
        let rules: Vec<Rule> = self
            .frames()
            .iter()
            .rev()
            .flat_map(|frame| frame.rules.iter().cloned())
            .collect();
        self.auto_depth += 1;
        let answer = self.search_rules(&rules, proposition);
        self.auto_depth -= 1;
        answer
    }

    fn search_rules(&mut self, rules: &[Rule], proposition: &Expression) -> Result<String, TacticError> {
        for rule in rules {
            let Some(bindings) = unify(&rule.pattern, proposition) else {
                continue;
            };
            if self.config.trace_rules {
                debug!(rule = %rule.name, proposition = %proposition, "trying rule");
            } else {
                trace!(rule = %rule.name, proposition = %proposition, "trying rule");
            }
            let checkpoint = self.checkpoint();
            match (rule.tactic)(self, &bindings, proposition) {
                Ok(name) => {
                    if self.lookup(&name).map_or(false, |e| equal(e, proposition)) {
                        return Ok(name);
                    }
                    trace!(rule = %rule.name, "rule proved something else");
                    self.rollback(&checkpoint);
                }
                Err(TacticError::Failed { reason, .. }) => {
                    trace!(rule = %rule.name, reason = %reason, "rule failed");
                    self.rollback(&checkpoint);
                }
                Err(e) => {
                    self.rollback(&checkpoint);
                    return Err(e);
                }
            }
        }
        Err(TacticError::failed(proposition, "no rule applies"))
    }

    /// The expansion of a sugared application, along with the index of the frame whose notation
    /// expanded it.
    pub fn expand_notation(&self, expression: &Expression) -> Option<(usize, Expression)> {
        let head = expression.head_symbol()?;
        let args = expression.as_call(head)?;
        self.frames()
            .iter()
            .enumerate()
            .rev()
            .flat_map(|(index, frame)| frame.notations.iter().map(move |n| (index, n)))
            .filter(|(_, notation)| notation.head == head)
            .find_map(|(index, notation)| (notation.expand)(args).map(|e| (index, e)))
    }

    /// Makes sure the named proposition is literally a universal quantification,
    /// rewriting it through the definitions of any notation it uses.
    fn expose_forall(&mut self, name: &str) -> Result<String, TacticError> {
        let mut name = name.to_string();
        for _ in 0..MAX_EXPANSIONS {
            let target = self.lookup(&name)?.clone();
            if target.as_forall().is_some() {
                return Ok(name);
            }
            let Some((frame, expanded)) = self.expand_notation(&target) else {
                return Err(KernelError::NotAQuantification {
                    name,
                    found: target,
                }
                .into());
            };
            let definition = Expression::equality(target, expanded);
            let equation = match self.autodeduce(&definition) {
                Ok(equation) => equation,
                Err(TacticError::Failed { .. }) => self.suppose_in_frame(frame, definition)?,
                Err(e) => return Err(e),
            };
            name = self.eliminate(&equation, &name)?;
        }
        let target = self.lookup(&name)?.clone();
        Err(TacticError::failed(&target, "too many notation expansions"))
    }

    /// From `a = b` and `a`, concludes `b`.
    fn eliminate(&mut self, equation: &str, target: &str) -> Result<String, KernelError> {
        let (left, right) = self.equality_sides(equation)?;
        let rule = self.bind_all(EQ_ELIM, vec![left, right])?;
        let rule = self.apply(rule.as_str(), equation)?;
        self.apply(rule.as_str(), target)
    }

    fn equality_sides(&self, name: &str) -> Result<(Expression, Expression), KernelError> {
        let found = self.lookup(name)?;
        match found.as_equality() {
            Some((left, right)) => Ok((left.clone(), right.clone())),
            None => Err(KernelError::NotAnEquality {
                name: name.to_string(),
                found: found.clone(),
            }),
        }
    }

    fn bind_all(&mut self, target: &str, values: Vec<Expression>) -> Result<String, KernelError> {
        let mut current = target.to_string();
        for value in values {
            current = self.bind(current.as_str(), value)?;
        }
        Ok(current)
    }

    /// Binds the leading quantifiers of the target, one value each.
    /// Sugared quantifiers are expanded into plain ones first.
    pub fn autobind(
        &mut self,
        target: impl Into<Reference>,
        values: &[Expression],
    ) -> Result<String, TacticError> {
        let mut current = self.name(target)?;
        for value in values {
            current = self.expose_forall(&current)?;
            current = self.bind(current.as_str(), value.clone())?;
        }
        Ok(current)
    }

    /// Discharges the conditions of the target one at a time with autodeduce.
    /// Stops at the first conclusion that is not a rule.
    pub fn autoapply(&mut self, target: impl Into<Reference>) -> Result<String, TacticError> {
        let mut current = self.name(target)?;
        loop {
            let Some((condition, _)) = self.lookup(&current)?.as_rule() else {
                return Ok(current);
            };
            let condition = condition.clone();
            let proof = self.autodeduce(&condition)?;
            current = self.apply(current.as_str(), proof.as_str())?;
        }
    }

    /// From `P` and `a = b`, derives `P` with the selected occurrences of `a` replaced by `b`.
    /// An empty set of occurrences replaces all of them.
    pub fn rewrite(
        &mut self,
        target: impl Into<Reference>,
        equation: impl Into<Reference>,
        occurrences: &BTreeSet<usize>,
    ) -> Result<String, KernelError> {
        let target = self.name(target)?;
        let equation = self.name(equation)?;
        let original = self.lookup(&target)?.clone();
        let (a, b) = self.equality_sides(&equation)?;

        // (subst P ((a b)) i) = P'
        let reduction =
            self.substitute(original.clone(), vec![(a.clone(), b.clone())], occurrences.clone())?;
        let (notation, rewritten) = self.equality_sides(&reduction)?;

        // (subst P ((a b)) i) = P
        let congruence = self.bind_all(
            SUBST_CONGRUENCE,
            vec![original.clone(), a, b, occurrence_list(occurrences)],
        )?;
        let unchanged = self.apply(congruence.as_str(), equation.as_str())?;

        // P = (subst P ((a b)) i)
        let symmetry = self.bind_all(EQ_SYM, vec![notation.clone(), original.clone()])?;
        let flipped = self.apply(symmetry.as_str(), unchanged.as_str())?;

        // P = P'
        let transitivity = self.bind_all(EQ_TRANS, vec![original, notation, rewritten])?;
        let transitivity = self.apply(transitivity.as_str(), flipped.as_str())?;
        let bridge = self.apply(transitivity.as_str(), reduction.as_str())?;

        self.eliminate(&bridge, &target)
    }

    /// Proves the goal from a lemma, working out the values of the lemma's quantifiers
    /// from the goal and discharging its conditions with autodeduce.
    pub fn by_lemma(
        &mut self,
        lemma: impl Into<Reference>,
        goal: &Expression,
    ) -> Result<String, TacticError> {
        let lemma = self.name(lemma)?;
        let statement = self.lookup(&lemma)?.clone();
        let (slots, body) = open_foralls(&statement);
        let (_, conclusion) = body.strip_rules();
        let Some(bindings) = unify(conclusion, goal) else {
            return Err(TacticError::failed(goal, &format!("'{}' does not conclude it", lemma)));
        };
        let values: Option<Vec<Expression>> =
            slots.iter().map(|slot| bindings.get(slot).cloned()).collect();
        let Some(values) = values else {
            return Err(TacticError::failed(
                goal,
                &format!("the goal does not determine every variable of '{}'", lemma),
            ));
        };
        let bound = self.autobind(lemma.as_str(), &values)?;
        let applied = self.autoapply(bound.as_str())?;
        if !equal(self.lookup(&applied)?, goal) {
            return Err(TacticError::failed(goal, &format!("'{}' proved something else", lemma)));
        }
        Ok(applied)
    }

    /// Registers a rule that proves instances of the lemma's conclusion with `by_lemma`.
    pub fn hint(&mut self, lemma: impl Into<Reference>) -> Result<(), KernelError> {
        let lemma = self.name(lemma)?;
        let (_, body) = open_foralls(self.lookup(&lemma)?);
        let (_, conclusion) = body.strip_rules();
        let pattern = conclusion.clone();
        let captured = lemma.clone();
        self.add_rule(Rule::new(&lemma, pattern, move |kernel, _, goal| {
            kernel.by_lemma(captured.as_str(), goal)
        }));
        Ok(())
    }
}

/// A tactic for rules whose pattern fully describes a lemma instance:
/// fills the pattern variables into `values` and binds them into the lemma.
pub fn bind_lemma(
    kernel: &mut Kernel,
    lemma: &str,
    values: &[Expression],
    bindings: &Bindings,
) -> Result<String, TacticError> {
    let values: Vec<Expression> = values.iter().map(|v| fill(v, bindings)).collect();
    let bound = kernel.autobind(lemma, &values)?;
    kernel.autoapply(bound.as_str())
}
