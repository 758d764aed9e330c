/*!

  Every fallible operation in the interpreter returns a [`Result`] built on
  this error type. The CLI boundary is the only place that collapses a
  `Result` down to the language's own "success or abort" contract: there is
  no catch form, no user-visible error value, and no recovery inside the
  interpreted language itself.

*/

use thiserror::Error;

pub type Result<T> = std::result::Result<T, InterpreterError>;

#[derive(Error, Debug, Clone)]
pub enum InterpreterError {
  #[error("read error: {0}")]
  Read(String),

  #[error("unbound symbol: {0}")]
  UnboundSymbol(String),

  #[error("unbound global: {0}")]
  UnboundGlobal(String),

  #[error("type error: expected {expected}, found {found}")]
  Type { expected: String, found: String },

  #[error("arity error: expected {expected}, got {got}")]
  Arity { expected: String, got: usize },

  #[error("uncallable value: {0}")]
  Uncallable(String),

  #[error("division by zero")]
  DivideByZero,

  #[error("abort: {0}")]
  Abort(String),

  #[error("io error: {0}")]
  Io(String),
}

impl From<std::io::Error> for InterpreterError {
  fn from(err: std::io::Error) -> Self {
    InterpreterError::Io(err.to_string())
  }
}
