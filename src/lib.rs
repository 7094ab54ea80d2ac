//! Interpreter for the toys language: integer arithmetic, variables,
//! `if`/`while`, recursive functions and `println`.
//!
//! ```
//! let program = toys::parser::parse("define main() { 6 * 7 }").unwrap();
//! assert_eq!(42, toys::run_program_with_writer(&program, Vec::new()).unwrap());
//! ```

pub mod ast;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod parser;

use std::io::Write;

pub use crate::error::{Error, EvalError, ParseError};
pub use crate::interpreter::{run_program, run_program_with_writer, Interpreter};

/// Parses and runs `source`, writing `println` output to `writer`.
pub fn run_source<W: Write>(source: &str, writer: W) -> Result<i64, Error> {
    let program = parser::parse(source)?;
    Ok(run_program_with_writer(&program, writer)?)
}
