use crate::kernel::construction::Kernel;
use crate::kernel::equality::equal;
use crate::kernel::expression::Expression;
use crate::prelude;
use crate::script::{run_script, ScriptOutput};
use crate::syntax::convert::parse_expression;

/// Reads an expression, panicking on bad syntax.
pub fn expr(text: &str) -> Expression {
    match parse_expression(text) {
        Ok(e) => e,
        Err(e) => panic!("bad expression {:?}: {}", text, e),
    }
}

/// A kernel with the equality prelude installed.
pub fn kernel() -> Kernel {
    let mut kernel = Kernel::new();
    prelude::install(&mut kernel).expect("prelude failed");
    kernel
}

/// Runs a script in a fresh kernel, expecting it to succeed.
pub fn run(text: &str) -> (Kernel, ScriptOutput) {
    let mut kernel = kernel();
    match run_script(&mut kernel, text) {
        Ok(output) => (kernel, output),
        Err(e) => panic!("script failed: {}", e),
    }
}

/// Expects the named proposition to be alpha-equal to the given text.
pub fn expect_proposition(kernel: &Kernel, name: &str, text: &str) {
    let found = match kernel.lookup(name) {
        Ok(e) => e,
        Err(e) => panic!("{}", e),
    };
    let expected = expr(text);
    if !equal(found, &expected) {
        panic!("{} is {}, expected {}", name, found, expected);
    }
}
