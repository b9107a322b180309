use std::collections::HashMap;

use crate::kernel::atom::{Atom, Variable};
use crate::kernel::expression::{BinderKind, Expression};
use crate::syntax::sexp::{parse_one, Sexp, SyntaxError};

/// The variable names in scope while reading expressions.
/// Later bindings shadow earlier ones.
#[derive(Clone, Debug, Default)]
pub struct Scope {
    names: Vec<(String, Variable)>,
}

impl Scope {
    pub fn new() -> Scope {
        Scope::default()
    }

    /// Binds a name to a fresh variable.
    pub fn bind(&mut self, name: &str) -> Variable {
        let var = Variable::fresh(name);
        self.names.push((name.to_string(), var.clone()));
        var
    }

    /// Binds a name to a variable that already exists, such as a deduction parameter.
    pub fn define(&mut self, name: &str, var: Variable) {
        self.names.push((name.to_string(), var));
    }

    pub fn lookup(&self, name: &str) -> Option<&Variable> {
        self.names
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// A marker for `restore`.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Forgets every binding made since `len` returned the given value.
    pub fn restore(&mut self, len: usize) {
        self.names.truncate(len);
    }
}

/// Reads s-expressions as Expressions.
///
/// `(forall (x y) body)`, `(exists (x) body)` and `(lambda (x) body)` bind their variables
/// in the body, and a single unparenthesized variable is allowed too.
/// `(-> a b c)` is `a -> (b -> c)`, `(= a b)` is an equality, `?name` is a pattern variable,
/// and any other list is an application.
pub struct Converter<'a> {
    scope: &'a mut Scope,

    // The same ?name means the same pattern variable within one conversion.
    patterns: HashMap<String, Variable>,
}

impl<'a> Converter<'a> {
    pub fn new(scope: &'a mut Scope) -> Converter<'a> {
        Converter {
            scope,
            patterns: HashMap::new(),
        }
    }

    pub fn convert(&mut self, sexp: &Sexp) -> Result<Expression, SyntaxError> {
        match sexp {
            Sexp::Str(token) => Ok(Expression::string(&token.text)),
            Sexp::Word(token) => {
                let text = token.text.as_str();
                if let Some(var) = self.scope.lookup(text) {
                    return Ok(Expression::variable(var));
                }
                if let Some(name) = text.strip_prefix('?') {
                    if name.is_empty() {
                        return Err(token.error("a pattern variable needs a name"));
                    }
                    let var = self
                        .patterns
                        .entry(name.to_string())
                        .or_insert_with(|| Variable::fresh(name));
                    return Ok(Expression::pattern_variable(var));
                }
                Ok(Expression::Atom(Atom::parse(text)))
            }
            Sexp::List(_, items) => {
                let Some((head, args)) = items.split_first() else {
                    return Ok(Expression::apply(vec![]));
                };
                let keyword = head.as_word();
                if let Some(kind) = keyword.and_then(BinderKind::from_keyword) {
                    return self.convert_binder(sexp, kind, args);
                }
                match keyword {
                    Some("->") => {
                        if args.len() < 2 {
                            return Err(sexp.error("a rule needs a condition and a conclusion"));
                        }
                        let mut parts = args
                            .iter()
                            .map(|arg| self.convert(arg))
                            .collect::<Result<Vec<_>, _>>()?;
                        let conclusion = parts.pop().ok_or_else(|| sexp.error("empty rule"))?;
                        Ok(Expression::rules(parts, conclusion))
                    }
                    Some("=") => {
                        let [left, right] = args else {
                            return Err(sexp.error("an equality needs exactly two sides"));
                        };
                        Ok(Expression::equality(
                            self.convert(left)?,
                            self.convert(right)?,
                        ))
                    }
                    _ => {
                        let items = items
                            .iter()
                            .map(|item| self.convert(item))
                            .collect::<Result<Vec<_>, _>>()?;
                        Ok(Expression::apply(items))
                    }
                }
            }
        }
    }

    fn convert_binder(
        &mut self,
        sexp: &Sexp,
        kind: BinderKind,
        args: &[Sexp],
    ) -> Result<Expression, SyntaxError> {
        let [vars, body] = args else {
            return Err(sexp.error("a binder needs variables and a body"));
        };
        let names: Vec<&Sexp> = match vars {
            Sexp::List(_, items) => items.iter().collect(),
            word => vec![word],
        };
        if names.is_empty() {
            return Err(vars.error("a binder needs at least one variable"));
        }
        let mark = self.scope.len();
        let mut bound = vec![];
        for name in names {
            let Some(text) = name.as_word() else {
                self.scope.restore(mark);
                return Err(name.error("expected a variable name"));
            };
            bound.push(self.scope.bind(text));
        }
        let body = self.convert(body);
        self.scope.restore(mark);
        let mut answer = body?;
        for var in bound.into_iter().rev() {
            answer = Expression::binder(kind, var, answer);
        }
        Ok(answer)
    }
}

/// Reads one expression with nothing in scope.
pub fn parse_expression(input: &str) -> Result<Expression, SyntaxError> {
    let sexp = parse_one(input)?;
    Converter::new(&mut Scope::new()).convert(&sexp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::equality::equal;

    #[test]
    fn test_binders_and_rules() {
        let e = parse_expression("(forall (x y) (-> (in x N) (= x y) (in y N)))").unwrap();
        let (vars, body) = e.strip_foralls();
        assert_eq!(vars.len(), 2);
        let (conditions, _) = body.strip_rules();
        assert_eq!(conditions.len(), 2);

        // Alpha-equivalent readings of the same text.
        let again = parse_expression("(forall (a b) (-> (in a N) (= a b) (in b N)))").unwrap();
        assert!(equal(&e, &again));
    }

    #[test]
    fn test_shadowing_and_scope() {
        let mut scope = Scope::new();
        let x = scope.bind("x");
        let sexp = parse_one("(f x (lambda x x))").unwrap();
        let e = Converter::new(&mut scope).convert(&sexp).unwrap();
        assert!(e.occurs_free(&x));
        let Expression::Application(items) = &e else {
            panic!("expected an application");
        };
        assert!(!items[2].occurs_free(&x));
        assert_eq!(scope.len(), 1);
    }

    #[test]
    fn test_atoms() {
        assert_eq!(parse_expression("2").unwrap(), Expression::number(2));
        assert_eq!(parse_expression("\"hi\"").unwrap(), Expression::string("hi"));
        assert_eq!(parse_expression("abc").unwrap(), Expression::symbol("abc"));
        let e = parse_expression("(= ?a ?a)").unwrap();
        let (left, right) = e.as_equality().unwrap();
        assert_eq!(left, right);
        assert!(e.has_pattern_variables());
    }

    #[test]
    fn test_malformed() {
        assert!(parse_expression("(= a)").is_err());
        assert!(parse_expression("(-> a)").is_err());
        assert!(parse_expression("(forall () a)").is_err());
        assert!(parse_expression("(forall (x) a b)").is_err());
        assert!(parse_expression("?").is_err());
    }
}
