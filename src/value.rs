/*!

  The value model: an immutable tagged variant with one case per
  distinct kind of denotable value. Values are deeply immutable — there
  is no mutator anywhere in this
  module — and freely shared via `Rc`, which is also what lets `=`'s
  "identity equality otherwise" fallback be implemented as pointer
  comparison on the `Rc`-backed variants.

*/

use std::fmt;
use std::rc::Rc;

use strum::Display;

use crate::continuation::Stack;
use crate::environment::Env;
use crate::error::{InterpreterError, Result};
use crate::symbol::Symbol;

/// One variant per [`Value`] case, carrying no payload — used only to name
/// a value's kind in diagnostics (`type_error`'s "expected"/"found"
/// fields). Mirrors the teacher's `Exception` enum, a plain
/// `strum::Display`-derived tag type used the same way.
#[derive(Copy, Clone, Eq, PartialEq, Display, Debug, Hash)]
#[strum(serialize_all = "snake_case")]
pub enum ValueKind {
  Integer,
  String,
  Symbol,
  Nil,
  Boolean,
  Cons,
  Builtin,
  Lambda,
  #[strum(serialize = "vararg")]
  VarArgLambda,
}

/// A cons cell is heap-allocated exactly once per `cons` call, so that
/// two separately constructed cells are never pointer-equal even when
/// structurally identical — this is what gives `Value::Cons` genuine
/// identity semantics rather than accidental structural equality.
#[derive(Clone)]
pub struct ConsCell {
  pub car: Value,
  pub cdr: Value,
}

pub type BuiltinHandler = fn(&Value, Stack) -> Result<(Value, Stack)>;

#[derive(Clone)]
pub struct Builtin {
  pub name: &'static str,
  pub handler: BuiltinHandler,
}

/// A user-defined function. `env` is the environment captured at the
/// point of the enclosing `fn`, already extended with a `__self__`
/// binding that resolves back to this same `LambdaData` (see
/// `environment::bind_self_ref`); `params` and `body` are the raw
/// parameter list and `do`-wrapped body `Value`s from the `fn` form.
pub struct LambdaData {
  pub env: Env,
  pub params: Value,
  pub body: Value,
}

#[derive(Clone)]
pub enum Value {
  Integer(i64),
  Str(Rc<str>),
  Symbol(Symbol),
  Nil,
  Boolean(bool),
  Cons(Rc<ConsCell>),
  Builtin(Rc<Builtin>),
  Lambda(Rc<LambdaData>),
  /// Wraps another callable `f`; invoking the wrapper with argument list
  /// `A` invokes `f` with the one-element list `(A)`.
  VarArgLambda(Rc<Value>),
}

pub fn cons(car: Value, cdr: Value) -> Value {
  Value::Cons(Rc::new(ConsCell { car, cdr }))
}

/// Builds a proper list from `items`, right to left, terminated by `Nil`.
pub fn from_vec(items: Vec<Value>) -> Value {
  let mut acc = Value::Nil;
  for item in items.into_iter().rev() {
    acc = cons(item, acc);
  }
  acc
}

/// Truthiness: everything but `nil` and `false` is
/// truthy, including `0` and the empty string.
pub fn is_truthy(value: &Value) -> bool {
  !matches!(value, Value::Nil | Value::Boolean(false))
}

impl Value {
  pub fn kind(&self) -> ValueKind {
    match self {
      Value::Integer(_) => ValueKind::Integer,
      Value::Str(_) => ValueKind::String,
      Value::Symbol(_) => ValueKind::Symbol,
      Value::Nil => ValueKind::Nil,
      Value::Boolean(_) => ValueKind::Boolean,
      Value::Cons(_) => ValueKind::Cons,
      Value::Builtin(_) => ValueKind::Builtin,
      Value::Lambda(_) => ValueKind::Lambda,
      Value::VarArgLambda(_) => ValueKind::VarArgLambda,
    }
  }

  pub fn type_error(expected: &str, found: &Value) -> InterpreterError {
    InterpreterError::Type { expected: expected.to_string(), found: found.kind().to_string() }
  }

  /// `car` of a non-cons is undefined; we surface that
  /// as a type error rather than panicking.
  pub fn car(&self) -> Result<Value> {
    match self {
      Value::Cons(cell) => Ok(cell.car.clone()),
      other => Err(Value::type_error("cons", other)),
    }
  }

  pub fn cdr(&self) -> Result<Value> {
    match self {
      Value::Cons(cell) => Ok(cell.cdr.clone()),
      other => Err(Value::type_error("cons", other)),
    }
  }

  pub fn as_symbol(&self) -> Result<Symbol> {
    match self {
      Value::Symbol(s) => Ok(*s),
      other => Err(Value::type_error("symbol", other)),
    }
  }

  pub fn as_integer(&self) -> Result<i64> {
    match self {
      Value::Integer(i) => Ok(*i),
      other => Err(Value::type_error("integer", other)),
    }
  }

  pub fn as_str(&self) -> Result<Rc<str>> {
    match self {
      Value::Str(s) => Ok(s.clone()),
      other => Err(Value::type_error("string", other)),
    }
  }

  /// The length of a proper list rooted at `self`, and an error if the
  /// spine is improper: surfaced as a type error rather than silently
  /// misinterpreted as a shorter proper list.
  pub fn list_len(&self) -> Result<usize> {
    let mut node = self.clone();
    let mut len = 0;
    loop {
      match node {
        Value::Nil => return Ok(len),
        Value::Cons(cell) => {
          len += 1;
          node = cell.cdr.clone();
        }
        other => return Err(Value::type_error("proper list", &other)),
      }
    }
  }

  /// Models the semantics of pointer/identity equality used by the `=`
  /// built-in when at least one operand is not an integer. Integers and the true/false/nil singletons compare by value
  /// since that *is* identity for them; everything else compares by the
  /// identity of its backing allocation.
  pub fn identity_eq(&self, other: &Value) -> bool {
    match (self, other) {
      (Value::Integer(a), Value::Integer(b)) => a == b,
      (Value::Nil, Value::Nil) => true,
      (Value::Boolean(a), Value::Boolean(b)) => a == b,
      (Value::Symbol(a), Value::Symbol(b)) => a == b,
      (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b),
      (Value::Cons(a), Value::Cons(b)) => Rc::ptr_eq(a, b),
      (Value::Builtin(a), Value::Builtin(b)) => Rc::ptr_eq(a, b),
      (Value::Lambda(a), Value::Lambda(b)) => Rc::ptr_eq(a, b),
      (Value::VarArgLambda(a), Value::VarArgLambda(b)) => Rc::ptr_eq(a, b),
      _ => false,
    }
  }

  /// The sole call-site for function application. Dispatches to a builtin handler or to lambda
  /// invocation; neither path recurses into the trampoline, it only
  /// produces the next `(value, stack)` pair for the driver loop to
  /// consume.
  pub fn invoke(&self, args: Value, stack: Stack) -> Result<(Value, Stack)> {
    match self {
      Value::Builtin(b) => (b.handler)(&args, stack),
      Value::Lambda(lambda) => invoke_lambda(lambda, args, stack),
      Value::VarArgLambda(inner) => {
        let wrapped = cons(args, Value::Nil);
        inner.invoke(wrapped, stack)
      }
      other => Err(InterpreterError::Uncallable(format!("{other}"))),
    }
  }
}

fn invoke_lambda(lambda: &Rc<LambdaData>, args: Value, stack: Stack) -> Result<(Value, Stack)> {
  let expected = lambda.params.list_len()?;
  let got = args.list_len()?;
  if expected != got {
    return Err(InterpreterError::Arity { expected: expected.to_string(), got });
  }

  let mut env = lambda.env.clone();
  let mut params = lambda.params.clone();
  let mut args = args;
  loop {
    match (&params, &args) {
      (Value::Cons(p), Value::Cons(a)) => {
        let symbol = p.car.as_symbol()?;
        env = crate::environment::bind(env, symbol, a.car.clone());
        params = p.cdr.clone();
        args = a.cdr.clone();
      }
      _ => break,
    }
  }

  Ok((Value::Nil, crate::continuation::push(stack, crate::continuation::Continuation::EvalExpr(env, lambda.body.clone()))))
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Integer(i) => write!(f, "{i}"),
      Value::Str(s) => write!(f, "\"{s}\""),
      Value::Symbol(s) => write!(f, "{s}"),
      Value::Nil => write!(f, "nil"),
      Value::Boolean(true) => write!(f, "true"),
      Value::Boolean(false) => write!(f, "false"),
      Value::Cons(_) => fmt_cons(self, f),
      Value::Builtin(b) => write!(f, "#<builtin:{}>", b.name),
      Value::Lambda(_) => write!(f, "#<lambda>"),
      Value::VarArgLambda(_) => write!(f, "#<vararg>"),
    }
  }
}

fn fmt_cons(mut value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
  write!(f, "(")?;
  let mut first = true;
  loop {
    match value {
      Value::Cons(cell) => {
        if !first {
          write!(f, " ")?;
        }
        first = false;
        write!(f, "{}", cell.car)?;
        value = &cell.cdr;
      }
      Value::Nil => break,
      other => {
        write!(f, " . {other}")?;
        break;
      }
    }
  }
  write!(f, ")")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn proper_list_prints_without_dot() {
    let list = from_vec(vec![Value::Integer(1), Value::Integer(2)]);
    assert_eq!(format!("{list}"), "(1 2)");
  }

  #[test]
  fn improper_list_prints_with_dot() {
    let list = cons(Value::Integer(1), Value::Integer(2));
    assert_eq!(format!("{list}"), "(1 . 2)");
  }

  #[test]
  fn truthiness_excludes_only_nil_and_false() {
    assert!(is_truthy(&Value::Integer(0)));
    assert!(is_truthy(&Value::Str("".into())));
    assert!(!is_truthy(&Value::Nil));
    assert!(!is_truthy(&Value::Boolean(false)));
  }

  #[test]
  fn two_conses_are_never_identity_equal() {
    let a = cons(Value::Integer(1), Value::Nil);
    let b = cons(Value::Integer(1), Value::Nil);
    assert!(!a.identity_eq(&b));
    assert!(a.identity_eq(&a.clone()));
  }
}
