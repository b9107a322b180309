pub mod atom;
pub mod construction;
pub mod deduction;
pub mod display;
pub mod equality;
pub mod error;
pub mod evaluator;
pub mod expression;
pub mod inference;
pub mod proof;
pub mod substitution;

pub use atom::{Atom, Number, Variable};
pub use construction::{Checkpoint, DeductionGuard, Kernel, KernelConfig, Reference};
pub use deduction::Deduction;
pub use equality::{equal, equal_modulo, Normalization, ADMISSIBLE_NORMALIZATIONS};
pub use error::KernelError;
pub use expression::{BinderKind, Expression};
pub use proof::Proof;
