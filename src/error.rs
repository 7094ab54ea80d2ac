use std::io;

use thiserror::Error;

use crate::ast::Operator;

/// Failures while evaluating a program. All of them abort the run.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("unbound identifier `{0}`")]
    UnboundIdentifier(String),

    #[error("undefined function `{0}`")]
    UndefinedFunction(String),

    #[error("function `{name}` takes {expected} argument(s) but {found} were given")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("program has no zero-argument `main` function")]
    MissingEntryPoint,

    #[error("malformed expression: {0}")]
    MalformedExpression(String),

    #[error("integer overflow in `{0}`")]
    IntegerOverflow(Operator),

    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

pub type EvalResult<T = i64> = Result<T, EvalError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("syntax error at {line}:{column}: unexpected {found}")]
    Syntax {
        line: usize,
        column: usize,
        found: String,
    },

    #[error("expected `define` or `global` at {line}:{column}")]
    ExpectedTopLevel { line: usize, column: usize },

    #[error("integer literal `{literal}` at {line}:{column} does not fit in 64 bits")]
    IntegerOutOfRange {
        line: usize,
        column: usize,
        literal: String,
    },
}

impl ParseError {
    /// Line and column (both 1-based) where the error was detected.
    pub fn position(&self) -> (usize, usize) {
        match self {
            ParseError::Syntax { line, column, .. }
            | ParseError::ExpectedTopLevel { line, column }
            | ParseError::IntegerOutOfRange { line, column, .. } => (*line, *column),
        }
    }
}

/// Anything that can go wrong between reading source text and producing a result.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}
