use std::fmt;

use pretty::{DocAllocator, DocBuilder, Pretty};

use crate::kernel::expression::{BinderKind, Expression};

/// Expressions that don't fit in this width are broken across lines.
pub const PRINT_WIDTH: usize = 80;

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let allocator = pretty::Arena::<()>::new();
        let doc = self.pretty_ref(&allocator);
        doc.render_fmt(PRINT_WIDTH, f)?;
        Ok(())
    }
}

impl<'a, D, A> Pretty<'a, D, A> for &'a Expression
where
    A: 'a,
    D: DocAllocator<'a, A>,
{
    fn pretty(self, allocator: &'a D) -> DocBuilder<'a, D, A> {
        self.pretty_ref(allocator)
    }
}

impl Expression {
    /// Renders in the same s-expression syntax the reader accepts.
    /// Nested foralls share one variable list and nested rules print as one arrow.
    fn pretty_ref<'a, D, A>(&'a self, allocator: &'a D) -> DocBuilder<'a, D, A>
    where
        A: 'a,
        D: DocAllocator<'a, A>,
    {
        match self {
            Expression::Atom(atom) => allocator.text(atom.to_string()),
            Expression::Binder(kind, var, body) => {
                let mut vars = vec![var.to_string()];
                let mut body: &Expression = body;
                if *kind == BinderKind::Forall {
                    while let Some((inner, inner_body)) = body.as_forall() {
                        vars.push(inner.to_string());
                        body = inner_body;
                    }
                }
                let header = allocator
                    .text(kind.keyword())
                    .append(allocator.text(" ("))
                    .append(allocator.text(vars.join(" ")))
                    .append(allocator.text(")"));
                write_list_pretty(allocator, header, &[body])
            }
            Expression::Rule(..) => {
                let (conditions, conclusion) = self.strip_rules();
                let mut items = conditions;
                items.push(conclusion);
                write_list_pretty(allocator, allocator.text("->"), &items)
            }
            Expression::Equality(left, right) => {
                write_list_pretty(allocator, allocator.text("="), &[&**left, &**right])
            }
            Expression::Application(items) => match items.split_first() {
                None => allocator.text("()"),
                Some((head, rest)) => {
                    let rest: Vec<&Expression> = rest.iter().collect();
                    write_list_pretty(allocator, head.pretty_ref(allocator), &rest)
                }
            },
        }
    }
}

fn write_list_pretty<'a, D, A>(
    allocator: &'a D,
    head: DocBuilder<'a, D, A>,
    items: &[&'a Expression],
) -> DocBuilder<'a, D, A>
where
    A: 'a,
    D: DocAllocator<'a, A>,
{
    let mut inner = head;
    for item in items {
        inner = inner
            .append(allocator.line())
            .append(item.pretty_ref(allocator));
    }
    allocator
        .text("(")
        .append(inner.nest(2))
        .append(allocator.text(")"))
        .group()
}

#[cfg(test)]
mod tests {
    use crate::kernel::atom::Variable;
    use crate::kernel::expression::Expression;

    #[test]
    fn test_display_flat() {
        let e = Expression::equality(
            Expression::call("+", vec![Expression::number(2), Expression::number(2)]),
            Expression::number(4),
        );
        assert_eq!(e.to_string(), "(= (+ 2 2) 4)");
        let r = Expression::rules(
            vec![Expression::symbol("a"), Expression::symbol("b")],
            Expression::symbol("c"),
        );
        assert_eq!(r.to_string(), "(-> a b c)");
        assert_eq!(Expression::apply(vec![]).to_string(), "()");
        assert_eq!(Expression::string("hi").to_string(), "\"hi\"");
    }

    #[test]
    fn test_display_forall_groups_variables() {
        let x = Variable::fresh("x");
        let y = Variable::fresh("y");
        let e = Expression::forall_all(
            &[x.clone(), y.clone()],
            Expression::equality(Expression::variable(&x), Expression::variable(&y)),
        );
        assert_eq!(
            e.to_string(),
            format!("(forall ({} {}) (= {} {}))", x, y, x, y)
        );
    }

    #[test]
    fn test_display_breaks_long_lines() {
        let items = (0..40).map(|i| Expression::number(i as i64)).collect();
        let e = Expression::call("f", items);
        assert!(e.to_string().contains('\n'));
    }
}
