//! Proof scripts: s-expression commands, each one a kernel or tactic operation.
//!
//! ```text
//! (axiom sym (forall (a b) (-> (= a b) (= b a))))
//! (goal flip (forall (x) (-> (= x 0) (= 0 x)))
//!   (intros x h)
//!   (autobind sym x 0)
//!   (autoapply -1))
//! ```

use std::collections::BTreeSet;
use std::fmt;

use tracing::{debug, info, warn};

use crate::auto::error::{Abort, TacticError};
use crate::goal::{Goal, Introduction};
use crate::kernel::construction::{Kernel, Reference};
use crate::kernel::equality::equal;
use crate::kernel::error::KernelError;
use crate::kernel::expression::Expression;
use crate::syntax::convert::{Converter, Scope};
use crate::syntax::sexp::{parse, Sexp, SyntaxError};

/// Why a script stopped.
#[derive(Clone, Debug, PartialEq)]
pub enum ScriptError {
    // The text doesn't parse.
    Syntax(SyntaxError),

    // The text parses, but isn't a command we understand.
    Malformed(SyntaxError),

    // A proof step failed. The position is that of the command.
    Kernel {
        error: KernelError,
        line: u32,
        column: u32,
    },

    // A tactic could not prove what it was asked to.
    Tactic {
        error: TacticError,
        line: u32,
        column: u32,
    },

    // An `expect` command found a different proposition.
    Expectation {
        expected: Expression,
        actual: Expression,
        line: u32,
        column: u32,
    },

    // An abort that no `try` caught.
    Aborted(Abort),
}

impl ScriptError {
    fn malformed(sexp: &Sexp, message: &str) -> ScriptError {
        ScriptError::Malformed(sexp.error(message))
    }

    fn kernel(error: KernelError, sexp: &Sexp) -> ScriptError {
        let token = sexp.token();
        ScriptError::Kernel {
            error,
            line: token.line,
            column: token.column,
        }
    }

    fn tactic(error: TacticError, sexp: &Sexp) -> ScriptError {
        let token = sexp.token();
        match error {
            TacticError::Abort(abort) => ScriptError::Aborted(abort),
            TacticError::Kernel(error) => ScriptError::kernel(error, sexp),
            error => ScriptError::Tactic {
                error,
                line: token.line,
                column: token.column,
            },
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ScriptError::Syntax(_) => "Syntax",
            ScriptError::Malformed(_) => "Malformed",
            ScriptError::Kernel { error, .. } => error.error_type(),
            ScriptError::Tactic { error, .. } => error.error_type(),
            ScriptError::Expectation { .. } => "Expectation",
            ScriptError::Aborted(_) => "Aborted",
        }
    }

    /// The 1-based line the error happened on, if it has one.
    pub fn line(&self) -> Option<u32> {
        match self {
            ScriptError::Syntax(e) | ScriptError::Malformed(e) => Some(e.line),
            ScriptError::Kernel { line, .. }
            | ScriptError::Tactic { line, .. }
            | ScriptError::Expectation { line, .. } => Some(*line),
            ScriptError::Aborted(_) => None,
        }
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScriptError::Syntax(e) => write!(f, "syntax error at {}", e),
            ScriptError::Malformed(e) => write!(f, "bad command at {}", e),
            ScriptError::Kernel {
                error,
                line,
                column,
            } => write!(f, "{}:{}: {}", line, column, error),
            ScriptError::Tactic {
                error,
                line,
                column,
            } => write!(f, "{}:{}: {}", line, column, error),
            ScriptError::Expectation {
                expected,
                actual,
                line,
                column,
            } => write!(
                f,
                "{}:{}: expected {} but found {}",
                line, column, expected, actual
            ),
            ScriptError::Aborted(abort) => write!(f, "{}", abort),
        }
    }
}

impl std::error::Error for ScriptError {}

impl From<SyntaxError> for ScriptError {
    fn from(e: SyntaxError) -> Self {
        ScriptError::Syntax(e)
    }
}

/// What a script did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScriptOutput {
    // The text of every `show`, in order.
    pub shown: Vec<String>,

    // The names of the theorems installed by top-level goals and deductions.
    pub proved: Vec<String>,

    // How many commands ran, counting nested ones.
    pub commands: usize,

    // Set when an abort reached the top of the script.
    pub aborted: Option<Abort>,
}

/// Runs a script against a kernel. The kernel keeps whatever the script installed at the root.
pub fn run_script(kernel: &mut Kernel, text: &str) -> Result<ScriptOutput, ScriptError> {
    let commands = parse(text)?;
    let mut interpreter = Interpreter::new();
    let depth = kernel.depth();
    for command in &commands {
        match interpreter.command(kernel, command) {
            Ok(()) => {}
            Err(ScriptError::Aborted(abort)) => {
                warn!(reason = %abort.reason, "script aborted");
                kernel.truncate(depth);
                interpreter.output.aborted = Some(abort);
                break;
            }
            Err(e) => {
                kernel.truncate(depth);
                return Err(e);
            }
        }
    }
    Ok(interpreter.output)
}

/// Runs one command at a time, keeping track of the names the script has given to variables.
pub struct Interpreter {
    scope: Scope,
    output: ScriptOutput,

    // How many goals and deductions the current command is nested in.
    nesting: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}

fn word<'a>(sexp: &'a Sexp, what: &str) -> Result<&'a str, ScriptError> {
    sexp.as_word()
        .ok_or_else(|| ScriptError::malformed(sexp, &format!("expected {}", what)))
}

fn reference(sexp: &Sexp) -> Result<Reference, ScriptError> {
    let text = word(sexp, "a name or a negative index")?;
    if text.starts_with('-') {
        if let Ok(index) = text.parse::<isize>() {
            return Ok(Reference::Relative(index));
        }
    }
    Ok(Reference::Name(text.to_string()))
}

fn occurrences(sexps: &[Sexp]) -> Result<BTreeSet<usize>, ScriptError> {
    sexps
        .iter()
        .map(|sexp| {
            word(sexp, "an occurrence index")?
                .parse::<usize>()
                .map_err(|_| ScriptError::malformed(sexp, "expected an occurrence index"))
        })
        .collect()
}

impl Interpreter {
    pub fn new() -> Interpreter {
        Interpreter {
            scope: Scope::new(),
            output: ScriptOutput::default(),
            nesting: 0,
        }
    }

    pub fn output(&self) -> &ScriptOutput {
        &self.output
    }

    fn expression(&mut self, sexp: &Sexp) -> Result<Expression, ScriptError> {
        Ok(Converter::new(&mut self.scope).convert(sexp)?)
    }

    fn expressions(&mut self, sexps: &[Sexp]) -> Result<Vec<Expression>, ScriptError> {
        sexps.iter().map(|sexp| self.expression(sexp)).collect()
    }

    fn block(&mut self, kernel: &mut Kernel, commands: &[Sexp]) -> Result<(), ScriptError> {
        for command in commands {
            self.command(kernel, command)?;
        }
        Ok(())
    }

    /// Runs a single command.
    pub fn command(&mut self, kernel: &mut Kernel, sexp: &Sexp) -> Result<(), ScriptError> {
        let Some((head, args)) = sexp.as_form() else {
            return Err(ScriptError::malformed(sexp, "expected a command"));
        };
        self.output.commands += 1;
        let kernel_error = |e: KernelError| ScriptError::kernel(e, sexp);
        let tactic_error = |e: TacticError| ScriptError::tactic(e, sexp);

        let installed = match (head, args) {
            ("axiom", [name, statement]) => {
                let name = word(name, "a name")?;
                let statement = self.expression(statement)?;
                kernel.suppose(Some(name), statement).map_err(kernel_error)?
            }
            ("suppose", [statement]) => {
                let statement = self.expression(statement)?;
                kernel.suppose(None, statement).map_err(kernel_error)?
            }
            ("suppose", [name, statement]) => {
                let name = word(name, "a name")?;
                let statement = self.expression(statement)?;
                kernel.suppose(Some(name), statement).map_err(kernel_error)?
            }
            ("forall", names) if !names.is_empty() => {
                for name in names {
                    let name = word(name, "a variable name")?;
                    let var = kernel.forall(name);
                    self.scope.define(name, var);
                }
                return Ok(());
            }
            ("bind", [target, values @ ..]) if !values.is_empty() => {
                let mut current = kernel.name(reference(target)?).map_err(kernel_error)?;
                for value in self.expressions(values)? {
                    current = kernel.bind(current.as_str(), value).map_err(kernel_error)?;
                }
                current
            }
            ("apply", [rule, condition]) => kernel
                .apply(reference(rule)?, reference(condition)?)
                .map_err(kernel_error)?,
            ("substitute", [target, pairs, indices @ ..]) if indices.len() <= 1 => {
                let target = self.expression(target)?;
                let Some(pairs) = pairs.as_list() else {
                    return Err(ScriptError::malformed(sexp, "expected a list of replacements"));
                };
                let mut replacements = vec![];
                for pair in pairs {
                    let Some([key, value]) = pair.as_list() else {
                        return Err(ScriptError::malformed(pair, "expected (key value)"));
                    };
                    replacements.push((self.expression(key)?, self.expression(value)?));
                }
                let indices = match indices.first() {
                    Some(list) => match list.as_list() {
                        Some(items) => occurrences(items)?,
                        None => return Err(ScriptError::malformed(list, "expected a list of indices")),
                    },
                    None => BTreeSet::new(),
                };
                kernel
                    .substitute(target, replacements, indices)
                    .map_err(kernel_error)?
            }
            ("verify", [statement]) => {
                let statement = self.expression(statement)?;
                kernel.verify_elementary(statement).map_err(kernel_error)?
            }
            ("deduction", _) => {
                let (name, body) = match args.split_first() {
                    Some((first, rest)) if first.as_word().is_some() => (first.as_word(), rest),
                    _ => (None, args),
                };
                let mark = self.scope.len();
                let mut sub = kernel.subdeduction(name);
                self.nesting += 1;
                let result = self.block(&mut sub, body);
                self.nesting -= 1;
                self.scope.restore(mark);
                result?;
                let name = sub.conclude().map_err(kernel_error)?;
                self.record(&name);
                name
            }
            ("goal", [name, statement, body @ ..]) => {
                let name = word(name, "a name")?;
                let statement = self.expression(statement)?;
                let mark = self.scope.len();
                let mut goal = Goal::new(kernel, Some(name), statement);
                self.nesting += 1;
                let mut result = Ok(());
                for command in body {
                    result = self.goal_command(&mut goal, command);
                    if result.is_err() {
                        break;
                    }
                }
                self.nesting -= 1;
                self.scope.restore(mark);
                result?;
                let name = goal.conclude().map_err(kernel_error)?;
                self.record(&name);
                name
            }
            ("introduce", _) | ("intros", _) => {
                return Err(ScriptError::malformed(sexp, "introductions only work inside a goal"));
            }
            ("autodeduce", [statement]) => {
                let statement = self.expression(statement)?;
                kernel.autodeduce(&statement).map_err(tactic_error)?
            }
            ("autobind", [target, values @ ..]) if !values.is_empty() => {
                let values = self.expressions(values)?;
                kernel
                    .autobind(reference(target)?, &values)
                    .map_err(tactic_error)?
            }
            ("autoapply", [target]) => kernel.autoapply(reference(target)?).map_err(tactic_error)?,
            ("rewrite", [target, equation, indices @ ..]) => kernel
                .rewrite(reference(target)?, reference(equation)?, &occurrences(indices)?)
                .map_err(kernel_error)?,
            ("by-lemma", [lemma, statement]) => {
                let statement = self.expression(statement)?;
                kernel
                    .by_lemma(reference(lemma)?, &statement)
                    .map_err(tactic_error)?
            }
            ("hint", [lemma]) => {
                kernel.hint(reference(lemma)?).map_err(kernel_error)?;
                return Ok(());
            }
            ("expect", [target, statement]) => {
                let expected = self.expression(statement)?;
                let actual = kernel
                    .proposition(reference(target)?)
                    .map_err(kernel_error)?
                    .clone();
                if !equal(&expected, &actual) {
                    let token = sexp.token();
                    return Err(ScriptError::Expectation {
                        expected,
                        actual,
                        line: token.line,
                        column: token.column,
                    });
                }
                return Ok(());
            }
            ("show", [target]) => {
                let name = kernel.name(reference(target)?).map_err(kernel_error)?;
                let proposition = kernel.lookup(&name).map_err(kernel_error)?;
                info!(name = %name, proposition = %proposition, "show");
                self.output.shown.push(format!("{}: {}", name, proposition));
                return Ok(());
            }
            ("try", body) => {
                let checkpoint = kernel.checkpoint();
                let mark = self.scope.len();
                match self.block(kernel, body) {
                    Err(ScriptError::Aborted(abort)) => {
                        warn!(reason = %abort.reason, "caught abort");
                        kernel.rollback(&checkpoint);
                        self.scope.restore(mark);
                    }
                    result => result?,
                }
                return Ok(());
            }
            ("abort", []) => return Err(ScriptError::Aborted(Abort::new("abort"))),
            ("abort", [reason]) => {
                let reason = match reason {
                    Sexp::Str(token) | Sexp::Word(token) => token.text.as_str(),
                    Sexp::List(..) => return Err(ScriptError::malformed(reason, "expected a reason")),
                };
                return Err(ScriptError::Aborted(Abort::new(reason)));
            }
            _ => {
                return Err(ScriptError::malformed(
                    sexp,
                    &format!("unknown command or wrong arguments for '{}'", head),
                ))
            }
        };
        debug!(command = head, name = %installed, "ran command");
        Ok(())
    }

    fn record(&mut self, name: &str) {
        if self.nesting == 0 {
            info!(name = %name, "proved");
            self.output.proved.push(name.to_string());
        }
    }

    fn goal_command(&mut self, goal: &mut Goal, sexp: &Sexp) -> Result<(), ScriptError> {
        match sexp.as_form() {
            Some(("introduce", [])) => {
                self.output.commands += 1;
                self.introduce(goal, None, sexp)?;
                Ok(())
            }
            Some(("introduce", [name])) => {
                self.output.commands += 1;
                let name = word(name, "a name")?;
                self.introduce(goal, Some(name), sexp)?;
                Ok(())
            }
            Some(("intros", names)) => {
                self.output.commands += 1;
                for name_sexp in names {
                    let name = word(name_sexp, "a name")?;
                    if !self.introduce(goal, Some(name), sexp)? {
                        return Err(ScriptError::malformed(name_sexp, "nothing left to introduce"));
                    }
                }
                while self.introduce(goal, None, sexp)? {}
                Ok(())
            }
            _ => self.command(goal, sexp),
        }
    }

    /// Returns false when there was nothing left to introduce.
    fn introduce(
        &mut self,
        goal: &mut Goal,
        name: Option<&str>,
        sexp: &Sexp,
    ) -> Result<bool, ScriptError> {
        let introduction = goal
            .introduce_named(name)
            .map_err(|e| ScriptError::kernel(e, sexp))?;
        match introduction {
            Introduction::Parameter(var) => {
                let name = name.unwrap_or(var.hint()).to_string();
                self.scope.define(&name, var);
                Ok(true)
            }
            Introduction::Hypothesis { name, .. } => {
                debug!(name = %name, "hypothesis");
                Ok(true)
            }
            Introduction::Done => Ok(false),
        }
    }
}
