use std::fmt;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::kernel::atom::{Atom, Number};
use crate::kernel::expression::{Expression, AND, IN, NOT, OR};

/// A ground value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Number(Number),
    Str(String),
    Bool(bool),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Why a ground evaluation could not produce a truth value.
#[derive(Clone, Debug, PartialEq)]
pub enum EvaluationError {
    /// The expression mentions a variable or a pattern variable.
    NotGround(Expression),

    /// No evaluation rule covers this shape.
    Unrecognized(Expression),

    /// The shape is known, but the operation has no value here, like division by zero.
    Undefined(Expression, String),
}

impl fmt::Display for EvaluationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EvaluationError::NotGround(e) => write!(f, "not a ground expression: {}", e),
            EvaluationError::Unrecognized(e) => write!(f, "no evaluation rule for: {}", e),
            EvaluationError::Undefined(e, reason) => write!(f, "{} is undefined: {}", e, reason),
        }
    }
}

/// The numeric domains that membership can be decided for.
fn domain_contains(domain: &str, n: &BigRational) -> Option<bool> {
    let integral = n.is_integer();
    match domain {
        "N" | "ℕ" => Some(integral && !n.is_negative()),
        "N+" | "ℕ+" => Some(integral && n.is_positive()),
        "Z" | "ℤ" => Some(integral),
        // Every number the kernel can write down is real.
        "R" | "ℝ" => Some(true),
        _ => None,
    }
}

// Exact powers grow fast, so the exponent is capped.
const MAX_EXPONENT: u32 = 4096;

/// Decides ground propositions built from arithmetic, string and domain-membership operators.
pub struct Evaluator;

impl Evaluator {
    /// The truth value of a ground proposition.
    pub fn evaluate(expression: &Expression) -> Result<bool, EvaluationError> {
        if !expression.is_ground() {
            return Err(EvaluationError::NotGround(expression.clone()));
        }
        match Evaluator::value(expression)? {
            Value::Bool(b) => Ok(b),
            _ => Err(EvaluationError::Unrecognized(expression.clone())),
        }
    }

    pub fn value(expression: &Expression) -> Result<Value, EvaluationError> {
        let unrecognized = || EvaluationError::Unrecognized(expression.clone());
        match expression {
            Expression::Atom(Atom::Number(n)) => Ok(Value::Number(n.clone())),
            Expression::Atom(Atom::Str(s)) => Ok(Value::Str(s.to_string())),
            Expression::Atom(Atom::Symbol(s)) => match &**s {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(unrecognized()),
            },
            Expression::Atom(_) => Err(EvaluationError::NotGround(expression.clone())),
            Expression::Equality(left, right) => {
                let left = Evaluator::value(left)?;
                let right = Evaluator::value(right)?;
                Ok(Value::Bool(left == right))
            }
            Expression::Rule(condition, conclusion) => {
                let condition = Evaluator::truth(condition)?;
                Ok(Value::Bool(!condition || Evaluator::truth(conclusion)?))
            }
            Expression::Binder(..) => Err(unrecognized()),
            Expression::Application(items) => {
                let Some(head) = expression.head_symbol() else {
                    return Err(unrecognized());
                };
                Evaluator::apply(expression, head, &items[1..])
            }
        }
    }

    fn truth(expression: &Expression) -> Result<bool, EvaluationError> {
        match Evaluator::value(expression)? {
            Value::Bool(b) => Ok(b),
            _ => Err(EvaluationError::Unrecognized(expression.clone())),
        }
    }

    fn number(expression: &Expression) -> Result<BigRational, EvaluationError> {
        match Evaluator::value(expression)? {
            Value::Number(n) => Ok(n.into_ratio()),
            _ => Err(EvaluationError::Unrecognized(expression.clone())),
        }
    }

    fn numbers(args: &[Expression]) -> Result<Vec<BigRational>, EvaluationError> {
        args.iter().map(Evaluator::number).collect()
    }

    /// `base` to an integer power, when the power is small enough to compute exactly.
    fn power(base: BigRational, exponent: BigRational) -> Result<BigRational, &'static str> {
        if !exponent.is_integer() {
            return Err("the exponent is not an integer");
        }
        let steps = exponent
            .to_integer()
            .abs()
            .to_u32()
            .filter(|n| *n <= MAX_EXPONENT)
            .ok_or("the exponent is too large")?;
        if base.is_zero() && exponent.is_negative() {
            return Err("zero to a negative power");
        }
        let mut answer = BigRational::one();
        for _ in 0..steps {
            answer *= &base;
        }
        Ok(if exponent.is_negative() {
            answer.recip()
        } else {
            answer
        })
    }

    fn string(expression: &Expression) -> Result<String, EvaluationError> {
        match Evaluator::value(expression)? {
            Value::Str(s) => Ok(s),
            _ => Err(EvaluationError::Unrecognized(expression.clone())),
        }
    }

    fn apply(
        expression: &Expression,
        head: &str,
        args: &[Expression],
    ) -> Result<Value, EvaluationError> {
        let unrecognized = || EvaluationError::Unrecognized(expression.clone());
        let undefined =
            |reason: &str| EvaluationError::Undefined(expression.clone(), reason.to_string());
        let number = |x: BigRational| -> Result<Value, EvaluationError> {
            Ok(Value::Number(Number::from_ratio(x)))
        };
        let boolean = |b: bool| -> Result<Value, EvaluationError> { Ok(Value::Bool(b)) };

        match (head, args) {
            (NOT, [p]) => boolean(!Evaluator::truth(p)?),
            (AND, _) if !args.is_empty() => {
                for arg in args {
                    if !Evaluator::truth(arg)? {
                        return boolean(false);
                    }
                }
                boolean(true)
            }
            (OR, _) if !args.is_empty() => {
                for arg in args {
                    if Evaluator::truth(arg)? {
                        return boolean(true);
                    }
                }
                boolean(false)
            }
            (IN, [element, domain]) => {
                let Some(domain) = domain.as_atom().and_then(|a| a.as_symbol()) else {
                    return Err(unrecognized());
                };
                let n = Evaluator::number(element)?;
                match domain_contains(domain, &n) {
                    Some(b) => boolean(b),
                    None => Err(unrecognized()),
                }
            }
            ("!=", [a, b]) => boolean(Evaluator::value(a)? != Evaluator::value(b)?),
            ("<", [a, b]) => boolean(Evaluator::number(a)? < Evaluator::number(b)?),
            ("<=", [a, b]) => boolean(Evaluator::number(a)? <= Evaluator::number(b)?),
            (">", [a, b]) => boolean(Evaluator::number(a)? > Evaluator::number(b)?),
            (">=", [a, b]) => boolean(Evaluator::number(a)? >= Evaluator::number(b)?),
            ("+", _) if !args.is_empty() => number(
                Evaluator::numbers(args)?
                    .into_iter()
                    .fold(BigRational::zero(), |a, b| a + b),
            ),
            ("*", _) if !args.is_empty() => number(
                Evaluator::numbers(args)?
                    .into_iter()
                    .fold(BigRational::one(), |a, b| a * b),
            ),
            ("-", [a]) => number(-Evaluator::number(a)?),
            ("-", [a, b]) => number(Evaluator::number(a)? - Evaluator::number(b)?),
            ("/", [a, b]) => {
                let divisor = Evaluator::number(b)?;
                if divisor.is_zero() {
                    return Err(undefined("division by zero"));
                }
                number(Evaluator::number(a)? / divisor)
            }
            ("%", [a, b]) => {
                let divisor = Evaluator::number(b)?.abs();
                if divisor.is_zero() {
                    return Err(undefined("remainder by zero"));
                }
                let dividend = Evaluator::number(a)?;
                let quotient = (&dividend / &divisor).floor();
                number(dividend - divisor * quotient)
            }
            ("^", [a, b]) => {
                let base = Evaluator::number(a)?;
                let exponent = Evaluator::number(b)?;
                number(Evaluator::power(base, exponent).map_err(undefined)?)
            }
            ("abs", [a]) => number(Evaluator::number(a)?.abs()),
            ("min", [a, b]) => number(Evaluator::number(a)?.min(Evaluator::number(b)?)),
            ("max", [a, b]) => number(Evaluator::number(a)?.max(Evaluator::number(b)?)),
            ("concat", _) => {
                let mut answer = String::new();
                for arg in args {
                    answer.push_str(&Evaluator::string(arg)?);
                }
                Ok(Value::Str(answer))
            }
            ("len", [s]) => {
                let count = Evaluator::string(s)?.chars().count();
                number(BigRational::from_integer(BigInt::from(count)))
            }
            _ => Err(unrecognized()),
        }
    }
}
