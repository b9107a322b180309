use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::kernel::atom::{Atom, Variable};

/// The symbol heading the notation of a substitution: (subst target ((key value) ...) (index ...)).
pub const SUBST: &str = "subst";
pub const NOT: &str = "not";
pub const AND: &str = "and";
pub const OR: &str = "or";
pub const IN: &str = "in";

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum BinderKind {
    Forall,
    Exists,
    Lambda,
}

impl BinderKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            BinderKind::Forall => "forall",
            BinderKind::Exists => "exists",
            BinderKind::Lambda => "lambda",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<BinderKind> {
        match keyword {
            "forall" => Some(BinderKind::Forall),
            "exists" => Some(BinderKind::Exists),
            "lambda" => Some(BinderKind::Lambda),
            _ => None,
        }
    }
}

/// The term language.
///
/// The derived equality is syntactic: two binders over different variables are different.
/// Use `equality::equal` for alpha-equivalence, which is what the kernel means by "the same".
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Atom(Atom),

    // A quantification block. The variable is bound in the body.
    Binder(BinderKind, Variable, Box<Expression>),

    // Condition, conclusion.
    Rule(Box<Expression>, Box<Expression>),

    Equality(Box<Expression>, Box<Expression>),

    // Any other ordered sequence. By convention the head is a symbol.
    Application(Vec<Expression>),
}

impl From<Atom> for Expression {
    fn from(atom: Atom) -> Expression {
        Expression::Atom(atom)
    }
}

impl From<&Variable> for Expression {
    fn from(var: &Variable) -> Expression {
        Expression::variable(var)
    }
}

impl Expression {
    pub fn symbol(name: &str) -> Expression {
        Expression::Atom(Atom::symbol(name))
    }

    pub fn string(text: &str) -> Expression {
        Expression::Atom(Atom::string(text))
    }

    pub fn number(value: i64) -> Expression {
        Expression::Atom(Atom::number(value))
    }

    pub fn variable(var: &Variable) -> Expression {
        Expression::Atom(Atom::Variable(var.clone()))
    }

    pub fn pattern_variable(var: &Variable) -> Expression {
        Expression::Atom(Atom::PatternVariable(var.clone()))
    }

    pub fn binder(kind: BinderKind, var: Variable, body: Expression) -> Expression {
        Expression::Binder(kind, var, Box::new(body))
    }

    pub fn forall(var: Variable, body: Expression) -> Expression {
        Expression::binder(BinderKind::Forall, var, body)
    }

    /// Quantifies over each variable, the first one outermost.
    pub fn forall_all(vars: &[Variable], body: Expression) -> Expression {
        vars.iter()
            .rev()
            .fold(body, |acc, var| Expression::forall(var.clone(), acc))
    }

    pub fn exists(var: Variable, body: Expression) -> Expression {
        Expression::binder(BinderKind::Exists, var, body)
    }

    pub fn lambda(var: Variable, body: Expression) -> Expression {
        Expression::binder(BinderKind::Lambda, var, body)
    }

    pub fn rule(condition: Expression, conclusion: Expression) -> Expression {
        Expression::Rule(Box::new(condition), Box::new(conclusion))
    }

    /// Nests rules to the right, so the first condition is outermost.
    pub fn rules(conditions: Vec<Expression>, conclusion: Expression) -> Expression {
        conditions
            .into_iter()
            .rev()
            .fold(conclusion, |acc, condition| Expression::rule(condition, acc))
    }

    pub fn equality(left: Expression, right: Expression) -> Expression {
        Expression::Equality(Box::new(left), Box::new(right))
    }

    pub fn apply(items: Vec<Expression>) -> Expression {
        Expression::Application(items)
    }

    /// An application headed by a symbol.
    pub fn call(head: &str, args: Vec<Expression>) -> Expression {
        let mut items = Vec::with_capacity(args.len() + 1);
        items.push(Expression::symbol(head));
        items.extend(args);
        Expression::Application(items)
    }

    pub fn not(e: Expression) -> Expression {
        Expression::call(NOT, vec![e])
    }

    pub fn and(left: Expression, right: Expression) -> Expression {
        Expression::call(AND, vec![left, right])
    }

    pub fn member(element: Expression, set: Expression) -> Expression {
        Expression::call(IN, vec![element, set])
    }

    pub fn as_atom(&self) -> Option<&Atom> {
        match self {
            Expression::Atom(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        self.as_atom().and_then(|a| a.as_variable())
    }

    pub fn as_binder(&self, kind: BinderKind) -> Option<(&Variable, &Expression)> {
        match self {
            Expression::Binder(k, var, body) if *k == kind => Some((var, body)),
            _ => None,
        }
    }

    pub fn as_forall(&self) -> Option<(&Variable, &Expression)> {
        self.as_binder(BinderKind::Forall)
    }

    pub fn as_rule(&self) -> Option<(&Expression, &Expression)> {
        match self {
            Expression::Rule(condition, conclusion) => Some((condition, conclusion)),
            _ => None,
        }
    }

    pub fn as_equality(&self) -> Option<(&Expression, &Expression)> {
        match self {
            Expression::Equality(left, right) => Some((left, right)),
            _ => None,
        }
    }

    pub fn head_symbol(&self) -> Option<&str> {
        match self {
            Expression::Application(items) => items.first()?.as_atom()?.as_symbol(),
            _ => None,
        }
    }

    /// The arguments of an application headed by the given symbol.
    pub fn as_call(&self, head: &str) -> Option<&[Expression]> {
        match self {
            Expression::Application(items) if self.head_symbol() == Some(head) => Some(&items[1..]),
            _ => None,
        }
    }

    pub fn as_negation(&self) -> Option<&Expression> {
        match self.as_call(NOT)? {
            [e] => Some(e),
            _ => None,
        }
    }

    /// Peels leading universal quantifiers.
    pub fn strip_foralls(&self) -> (Vec<&Variable>, &Expression) {
        let mut vars = vec![];
        let mut e = self;
        while let Some((var, body)) = e.as_forall() {
            vars.push(var);
            e = body;
        }
        (vars, e)
    }

    /// Peels nested rules into their conditions and the final conclusion.
    pub fn strip_rules(&self) -> (Vec<&Expression>, &Expression) {
        let mut conditions = vec![];
        let mut e = self;
        while let Some((condition, conclusion)) = e.as_rule() {
            conditions.push(condition);
            e = conclusion;
        }
        (conditions, e)
    }

    /// The immediate subexpressions, in order.
    pub fn children(&self) -> Vec<&Expression> {
        match self {
            Expression::Atom(_) => vec![],
            Expression::Binder(_, _, body) => vec![body],
            Expression::Rule(a, b) | Expression::Equality(a, b) => vec![a, b],
            Expression::Application(items) => items.iter().collect(),
        }
    }

    pub fn occurs_free(&self, var: &Variable) -> bool {
        match self {
            Expression::Atom(Atom::Variable(v)) => v == var,
            Expression::Atom(_) => false,
            Expression::Binder(_, v, body) => v != var && body.occurs_free(var),
            _ => self.children().iter().any(|c| c.occurs_free(var)),
        }
    }

    pub fn free_variables(&self) -> BTreeSet<Variable> {
        let mut answer = BTreeSet::new();
        self.collect_free_variables(&mut Vec::new(), &mut answer);
        answer
    }

    fn collect_free_variables<'a>(
        &'a self,
        bound: &mut Vec<&'a Variable>,
        answer: &mut BTreeSet<Variable>,
    ) {
        match self {
            Expression::Atom(Atom::Variable(v)) => {
                if !bound.contains(&v) {
                    answer.insert(v.clone());
                }
            }
            Expression::Atom(_) => {}
            Expression::Binder(_, v, body) => {
                bound.push(v);
                body.collect_free_variables(bound, answer);
                bound.pop();
            }
            _ => {
                for child in self.children() {
                    child.collect_free_variables(bound, answer);
                }
            }
        }
    }

    /// Ground means no free variables and no pattern variables.
    pub fn is_ground(&self) -> bool {
        self.free_variables().is_empty() && !self.has_pattern_variables()
    }

    pub fn has_pattern_variables(&self) -> bool {
        match self {
            Expression::Atom(a) => a.is_pattern_variable(),
            _ => self.children().iter().any(|c| c.has_pattern_variables()),
        }
    }

    /// Counts nodes. Used to keep diagnostics and searches honest about size.
    pub fn size(&self) -> usize {
        1 + self.children().iter().map(|c| c.size()).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_nest_to_the_right() {
        let (a, b, c) = (
            Expression::symbol("a"),
            Expression::symbol("b"),
            Expression::symbol("c"),
        );
        let e = Expression::rules(vec![a.clone(), b.clone()], c.clone());
        let (conditions, conclusion) = e.strip_rules();
        assert_eq!(conditions, vec![&a, &b]);
        assert_eq!(conclusion, &c);
    }

    #[test]
    fn test_free_variables_skip_bound() {
        let x = Variable::fresh("x");
        let y = Variable::fresh("y");
        let e = Expression::forall(
            x.clone(),
            Expression::equality(Expression::variable(&x), Expression::variable(&y)),
        );
        assert!(!e.occurs_free(&x));
        assert!(e.occurs_free(&y));
        assert_eq!(e.free_variables().into_iter().collect::<Vec<_>>(), vec![y]);
        assert!(!e.is_ground());
    }

    #[test]
    fn test_call_recognizers() {
        let e = Expression::not(Expression::symbol("p"));
        assert_eq!(e.head_symbol(), Some(NOT));
        assert_eq!(e.as_negation(), Some(&Expression::symbol("p")));
        assert!(Expression::symbol("p").as_negation().is_none());
    }
}
