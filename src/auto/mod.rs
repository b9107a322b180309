//! Automation on top of the kernel.
//!
//! Nothing in here creates a proposition except through the kernel's construction primitives,
//! so a tactic bug can make a proof fail but can't make a false one succeed.

pub mod error;
pub mod rule;
pub mod tactics;

pub use error::{catch_abort, Abort, TacticError};
pub use rule::{unify, Bindings, Notation, Rule, Tactic};
