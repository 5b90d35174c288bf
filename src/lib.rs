//! lispy - a minimal reader and evaluator for a small Lisp dialect
//!
//! Source text is turned into an expression tree by the [`reader`] and that tree is
//! evaluated against a mutable [`evaluator::Environment`] by the [`evaluator`]:
//!
//! ```scheme
//! (begin (define r 10) (* pi (* r r)))   ; => 314.1592653589793
//! (if (> 3 2) 1 2)                       ; => 1
//! (car (list 1 2 3))                     ; => 1
//! ```
//!
//! ## Language
//!
//! - Atoms are integers, floats, or symbols. A token is classified as an integer if it
//!   parses losslessly as one, otherwise as a float, otherwise as a symbol.
//! - `(if test conseq alt)` evaluates exactly one branch.
//! - `(define name expr)` binds `name` in the environment, overwriting any previous
//!   binding.
//! - Every other list is a procedure application with left-to-right argument
//!   evaluation.
//!
//! There is a single flat environment: no `lambda`, no closures, no lexical scoping.
//! Builtin procedures live in [`builtinops`] and are installed by
//! [`evaluator::standard_env`].
//!
//! ## Modules
//!
//! - `ast`: expression and value types
//! - `reader`: tokenizer, recursive-descent parser and atom classifier
//! - `evaluator`: environment model and tree-walking evaluation
//! - `builtinops`: the builtin procedure table

use thiserror::Error;

/// Recursion bound offered to hosts that want one. Neither the reader nor the
/// evaluator applies it unless asked to through their config structs.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Categorizes the different kinds of reader failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Tokens ran out while a `(` was still open, or the input was empty
    UnexpectedEof,
    /// A `)` appeared where an expression was expected
    UnmatchedCloseParen,
    /// Tokens remained after the first complete expression
    TrailingTokens,
    /// List nesting exceeded the configured maximum depth
    TooDeeplyNested,
}

/// Error types for the reader and the evaluator
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("ParseError: {message}")]
    Parse {
        kind: ParseErrorKind,
        message: String,
    },
    #[error("Unbound symbol: {0}")]
    UnboundSymbol(String),
    #[error("Not callable: {0}")]
    NotCallable(String),
    #[error("ArityError: {name} expected {expected} arguments, got {got}")]
    ArityMismatch {
        name: String,
        expected: String,
        got: usize,
    },
    #[error("Type error: {0}")]
    TypeError(String),
    #[error("EvaluationError: {0}")]
    EvalError(String),
    #[error("Evaluation depth limit exceeded (max: {0})")]
    DepthLimitExceeded(usize),
}

impl Error {
    pub(crate) fn parse(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Error::Parse {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn arity(name: &str, expected: impl ToString, got: usize) -> Self {
        Error::ArityMismatch {
            name: name.to_owned(),
            expected: expected.to_string(),
            got,
        }
    }

    /// The reader failure kind, if this is a parse error
    pub fn parse_kind(&self) -> Option<ParseErrorKind> {
        match self {
            Error::Parse { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

pub mod ast;
pub mod builtinops;
pub mod evaluator;
pub mod reader;

pub use ast::{Atom, Expr, Number, Value};
pub use evaluator::{Environment, EvalConfig, eval, eval_with_config, standard_env};
pub use reader::{ParseConfig, TrailingInput, parse, parse_with_config};

/// Parse exactly one expression from `source` and evaluate it in `env`.
pub fn run(source: &str, env: &mut Environment) -> Result<Value, Error> {
    let expr = parse(source)?;
    eval(&expr, env)
}
