use std::fmt;

use tracing::warn;

use crate::kernel::construction::Kernel;
use crate::kernel::error::KernelError;
use crate::kernel::expression::Expression;

/// A deliberate stop, unwinding every open deduction up to whoever catches it.
#[derive(Clone, Debug, PartialEq)]
pub struct Abort {
    pub reason: String,

    // The name of the catcher this abort is meant for. None means the nearest one.
    pub target: Option<String>,
}

impl Abort {
    pub fn new(reason: &str) -> Abort {
        Abort {
            reason: reason.to_string(),
            target: None,
        }
    }

    pub fn to(target: &str, reason: &str) -> Abort {
        Abort {
            reason: reason.to_string(),
            target: Some(target.to_string()),
        }
    }
}

impl fmt::Display for Abort {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.target {
            Some(target) => write!(f, "aborted to '{}': {}", target, self.reason),
            None => write!(f, "aborted: {}", self.reason),
        }
    }
}

/// Why a tactic didn't produce a proof.
#[derive(Clone, Debug, PartialEq)]
pub enum TacticError {
    // The tactic did not apply. The rule search rolls back and tries the next rule.
    Failed { expression: Expression, reason: String },

    // Passes through every rule search untouched.
    Abort(Abort),

    // Fatal. Never retried.
    Kernel(KernelError),
}

impl TacticError {
    pub fn failed(expression: &Expression, reason: &str) -> TacticError {
        TacticError::Failed {
            expression: expression.clone(),
            reason: reason.to_string(),
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            TacticError::Failed { .. } => "Failed",
            TacticError::Abort(_) => "Abort",
            TacticError::Kernel(e) => e.error_type(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, TacticError::Failed { .. })
    }
}

impl fmt::Display for TacticError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TacticError::Failed { expression, reason } => {
                write!(f, "could not prove {}: {}", expression, reason)
            }
            TacticError::Abort(abort) => write!(f, "{}", abort),
            TacticError::Kernel(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for TacticError {}

impl From<KernelError> for TacticError {
    fn from(e: KernelError) -> Self {
        TacticError::Kernel(e)
    }
}

impl From<Abort> for TacticError {
    fn from(abort: Abort) -> Self {
        TacticError::Abort(abort)
    }
}

/// Runs `f`, catching aborts addressed to `name` or to nobody in particular.
/// A caught abort discards everything `f` opened, and comes back as the inner error.
/// Failures and kernel errors pass through.
pub fn catch_abort<T>(
    kernel: &mut Kernel,
    name: Option<&str>,
    f: impl FnOnce(&mut Kernel) -> Result<T, TacticError>,
) -> Result<Result<T, Abort>, TacticError> {
    let checkpoint = kernel.checkpoint();
    match f(kernel) {
        Ok(value) => Ok(Ok(value)),
        Err(TacticError::Abort(abort))
            if abort.target.is_none() || abort.target.as_deref() == name =>
        {
            warn!(reason = %abort.reason, depth = kernel.depth(), "caught abort");
            kernel.rollback(&checkpoint);
            Ok(Err(abort))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catch_abort_restores_depth() {
        let mut kernel = Kernel::new();
        let caught = catch_abort(&mut kernel, None, |k| -> Result<(), TacticError> {
            k.push(None);
            k.push(None);
            Err(Abort::new("stop").into())
        })
        .unwrap();
        assert_eq!(caught, Err(Abort::new("stop")));
        assert_eq!(kernel.depth(), 1);
    }

    #[test]
    fn test_targeted_abort_passes_other_catchers() {
        let mut kernel = Kernel::new();
        let outer = catch_abort(&mut kernel, Some("outer"), |k| {
            let inner = catch_abort(k, Some("inner"), |_| -> Result<(), TacticError> {
                Err(Abort::to("outer", "skip").into())
            });
            assert!(matches!(inner, Err(TacticError::Abort(_))));
            let _ = inner?;
            Ok(())
        })
        .unwrap();
        assert_eq!(outer.unwrap_err().target.as_deref(), Some("outer"));
    }

    #[test]
    fn test_failures_are_not_caught() {
        let mut kernel = Kernel::new();
        let result = catch_abort(&mut kernel, None, |_| -> Result<(), TacticError> {
            Err(TacticError::failed(&Expression::symbol("p"), "no"))
        });
        assert!(matches!(result, Err(TacticError::Failed { .. })));
    }
}
