use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use serde::{Deserialize, Serialize};

pub type VariableId = u64;

/// Every variable ever created gets a distinct id from this counter.
/// Freshness is the only thing that keeps independently built derivations from
/// capturing each other's variables, so ids are never reused.
static NEXT_VARIABLE_ID: AtomicU64 = AtomicU64::new(1);

/// A variable is identified by its id alone.
/// The hint is a human-readable name that only matters for display.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Variable {
    hint: Arc<str>,
    id: VariableId,
}

impl Variable {
    /// Creates a variable that has never been seen before.
    pub fn fresh(hint: &str) -> Variable {
        let id = NEXT_VARIABLE_ID.fetch_add(1, AtomicOrdering::Relaxed);
        Variable {
            hint: Arc::from(hint),
            id,
        }
    }

    /// A fresh variable with the same hint as this one.
    pub fn refresh(&self) -> Variable {
        Variable {
            hint: self.hint.clone(),
            id: NEXT_VARIABLE_ID.fetch_add(1, AtomicOrdering::Relaxed),
        }
    }

    pub fn hint(&self) -> &str {
        &self.hint
    }

    pub fn id(&self) -> VariableId {
        self.id
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Variable {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Variable {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}_{}", self.hint, self.id)
    }
}

/// An exact rational number.
/// Equal values have the same canonical form, so 2 and 2.0 are the same number.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Number(BigRational);

impl Number {
    pub fn integer(value: i64) -> Number {
        Number(BigRational::from_integer(BigInt::from(value)))
    }

    pub fn from_ratio(value: BigRational) -> Number {
        Number(value)
    }

    pub fn ratio(&self) -> &BigRational {
        &self.0
    }

    pub fn into_ratio(self) -> BigRational {
        self.0
    }

    pub fn is_integer(&self) -> bool {
        self.0.is_integer()
    }

    /// Reads `12`, `-0.25` or `1/3`. Anything else, exponents included, is not a number.
    pub fn parse(text: &str) -> Option<Number> {
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        let value = if let Some((numer, denom)) = digits.split_once('/') {
            if !all_digits(numer) || !all_digits(denom) {
                return None;
            }
            let numer = BigInt::parse_bytes(numer.as_bytes(), 10)?;
            let denom = BigInt::parse_bytes(denom.as_bytes(), 10)?;
            if denom.is_zero() {
                return None;
            }
            BigRational::new(numer, denom)
        } else {
            let (whole, fraction) = match digits.split_once('.') {
                Some((whole, fraction)) if all_digits(fraction) => (whole, fraction),
                Some(_) => return None,
                None => (digits, ""),
            };
            if !all_digits(whole) {
                return None;
            }
            let numer = BigInt::parse_bytes(format!("{}{}", whole, fraction).as_bytes(), 10)?;
            let scale = u32::try_from(fraction.len()).ok()?;
            BigRational::new(numer, BigInt::from(10).pow(scale))
        };
        Some(Number(if negative { -value } else { value }))
    }

    /// Integers print as integers, terminating fractions as decimals, and the rest as `p/q`.
    pub fn canonical(&self) -> String {
        if self.0.is_integer() {
            return self.0.numer().to_string();
        }
        let two = BigInt::from(2);
        let five = BigInt::from(5);
        let mut rest = self.0.denom().clone();
        let (mut twos, mut fives) = (0u32, 0u32);
        while (&rest % &two).is_zero() {
            rest /= &two;
            twos += 1;
        }
        while (&rest % &five).is_zero() {
            rest /= &five;
            fives += 1;
        }
        if !rest.is_one() {
            return format!("{}/{}", self.0.numer(), self.0.denom());
        }

        let scale = twos.max(fives);
        let shifted = &self.0 * BigRational::from_integer(BigInt::from(10).pow(scale));
        let digits = shifted.to_integer().abs().to_string();
        let scale = scale as usize;
        let digits = format!("{:0>width$}", digits, width = scale + 1);
        let (whole, fraction) = digits.split_at(digits.len() - scale);
        let sign = if self.0.is_negative() { "-" } else { "" };
        format!("{}{}.{}", sign, whole, fraction)
    }
}

impl From<Number> for String {
    fn from(n: Number) -> String {
        n.canonical()
    }
}

impl TryFrom<String> for Number {
    type Error = String;

    fn try_from(text: String) -> Result<Number, String> {
        Number::parse(&text).ok_or_else(|| format!("not a number: {}", text))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// An atom has no internal structure.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Atom {
    // A constant, function or connective name.
    Symbol(Arc<str>),

    // A string literal.
    Str(Arc<str>),

    Number(Number),

    // A variable created by the fresh-name generator.
    // Quantified by a binder, by a Deduction parameter, or free.
    Variable(Variable),

    // A slot in a rule pattern. Only unification gives these a meaning.
    PatternVariable(Variable),
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Atom::Symbol(s) => write!(f, "{}", s),
            Atom::Str(s) => write!(f, "{:?}", s),
            Atom::Number(n) => write!(f, "{}", n),
            Atom::Variable(v) => write!(f, "{}", v),
            Atom::PatternVariable(v) => write!(f, "?{}", v),
        }
    }
}

impl Atom {
    pub fn symbol(name: &str) -> Atom {
        Atom::Symbol(Arc::from(name))
    }

    pub fn string(text: &str) -> Atom {
        Atom::Str(Arc::from(text))
    }

    pub fn number(value: i64) -> Atom {
        Atom::Number(Number::integer(value))
    }

    /// Parses a bare token as a number if it looks like one, and as a symbol otherwise.
    pub fn parse(token: &str) -> Atom {
        let looks_numeric = token
            .chars()
            .next()
            .map_or(false, |c| c.is_ascii_digit() || (c == '-' && token.len() > 1));
        if looks_numeric {
            if let Some(n) = Number::parse(token) {
                return Atom::Number(n);
            }
        }
        Atom::symbol(token)
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Atom::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Atom::Variable(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Atom::Variable(_))
    }

    pub fn is_pattern_variable(&self) -> bool {
        matches!(self, Atom::PatternVariable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_variables_are_distinct() {
        let a = Variable::fresh("x");
        let b = Variable::fresh("x");
        assert_ne!(a, b);
        assert!(a < b);
        assert_eq!(a.hint(), b.hint());
        assert_eq!(a, a.clone());
        assert_ne!(a, a.refresh());
    }

    fn number(text: &str) -> Number {
        Number::parse(text).unwrap()
    }

    #[test]
    fn test_number_canonical_form() {
        assert_eq!(number("2.0").canonical(), "2");
        assert_eq!(number("-0").canonical(), "0");
        assert_eq!(number("2.50").canonical(), "2.5");
        assert_eq!(number("-0.05").canonical(), "-0.05");
        assert_eq!(number("2/6").canonical(), "1/3");
        assert_eq!(number("2"), number("2.0000"));
        assert_ne!(number("2"), number("2.1"));
    }

    #[test]
    fn test_large_integers_are_exact() {
        let big = number("9007199254740993");
        assert_ne!(big, number("9007199254740992"));
        assert_eq!(big.canonical(), "9007199254740993");
    }

    #[test]
    fn test_atom_parse() {
        assert_eq!(Atom::parse("2"), Atom::parse("2.0"));
        assert_eq!(Atom::parse("-3"), Atom::number(-3));
        assert_eq!(Atom::parse("1e5"), Atom::symbol("1e5"));
        assert_eq!(Atom::parse("2."), Atom::symbol("2."));
        assert_eq!(Atom::parse("-"), Atom::symbol("-"));
        assert_eq!(Atom::parse("foo"), Atom::symbol("foo"));
        assert_eq!(Atom::parse("1abc"), Atom::symbol("1abc"));
    }
}
