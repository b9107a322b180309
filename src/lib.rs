pub mod auto;
pub mod goal;
pub mod kernel;
pub mod prelude;
pub mod script;
pub mod syntax;
pub mod verifier;

#[cfg(test)]
mod tests;
