pub mod convert;
pub mod sexp;

pub use convert::{parse_expression, Converter, Scope};
pub use sexp::{parse, parse_one, Sexp, SyntaxError, Token, TokenType};
