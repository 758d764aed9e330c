/*!

  The evaluator: `eval_one` performs one dispatch step without ever
  recursing into itself, and the trampoline in `run` is the only loop
  that drives a program to completion. Every control-flow construct is a
  [`Continuation`] variant pushed onto an explicit [`Stack`]; nothing here
  relies on the host call stack for anything but a single `match` arm per
  step, which is what makes arbitrarily deep recursion in the
  interpreted language safe regardless of Rust's own stack size.

*/

use std::rc::{Rc, Weak};

use crate::continuation::{self, Continuation, Stack};
use crate::environment::{self, Env};
use crate::error::{InterpreterError, Result};
use crate::globals;
use crate::special_forms::FORMS;
use crate::value::{cons, is_truthy, LambdaData, Value};

/// Performs one evaluation step. Dispatch on `expr`
pub fn eval_one(env: Env, expr: Value, stack: Stack) -> Result<(Value, Stack)> {
  match &expr {
    Value::Cons(cell) => {
      if let Value::Symbol(sym) = &cell.car {
        if let Some(result) = eval_special_form(*sym, &cell.cdr, &env, stack.clone())? {
          return Ok(result);
        }
      }
      // Application: evaluate the operator, then the arguments left to right.
      let stack = continuation::push(stack, Continuation::EvalApply(env.clone(), cell.cdr.clone(), 1));
      Ok((Value::Nil, continuation::push(stack, Continuation::EvalExpr(env, cell.car.clone()))))
    }

    Value::Symbol(sym) => {
      if let Some(v) = environment::lookup(&env, *sym) {
        Ok((v, stack))
      } else {
        globals::get_global(*sym)
          .map(|v| (v, stack))
          .map_err(|_| InterpreterError::UnboundSymbol(sym.name()))
      }
    }

    // Any other atom is self-evaluating.
    _ => Ok((expr, stack)),
  }
}

/// Recognizes a special form by identity match on the leading symbol and,
/// if `sym` names one, returns the `(value, stack)` pair that dispatching
/// it produces. Returns `None` for an ordinary application, letting the
/// caller fall through to `EvalApply`.
fn eval_special_form(sym: crate::symbol::Symbol, args: &Value, env: &Env, stack: Stack) -> Result<Option<(Value, Stack)>> {
  if sym == FORMS.if_sym {
    let cond = args.car()?;
    let then = args.cdr()?.car()?;
    let els = args.cdr()?.cdr()?.car()?;
    let stack = continuation::push(stack, Continuation::IfContinuation(env.clone(), then, els));
    let stack = continuation::push(stack, Continuation::EvalExpr(env.clone(), cond));
    return Ok(Some((Value::Nil, stack)));
  }

  if sym == FORMS.do_sym {
    let stack = continuation::push(stack, Continuation::DoContinuation(env.clone(), args.clone()));
    return Ok(Some((Value::Nil, stack)));
  }

  if sym == FORMS.def_sym {
    let name = args.car()?.as_symbol()?;
    let init = args.cdr()?.car()?;
    let stack = continuation::push(stack, Continuation::DefContinuation(name));
    let stack = continuation::push(stack, Continuation::EvalExpr(env.clone(), init));
    return Ok(Some((Value::Nil, stack)));
  }

  if sym == FORMS.quote_sym {
    return Ok(Some((args.car()?, stack)));
  }

  if sym == FORMS.cond_sym {
    if matches!(args, Value::Nil) {
      return Ok(Some((Value::Nil, stack)));
    }
    let first_test = args.car()?;
    let rest = args.cdr()?;
    let stack = continuation::push(stack, Continuation::CondContinuation(env.clone(), rest));
    let stack = continuation::push(stack, Continuation::EvalExpr(env.clone(), first_test));
    return Ok(Some((Value::Nil, stack)));
  }

  if sym == FORMS.resolve_sym {
    let inner = args.car()?;
    let stack = continuation::push(stack, Continuation::ResolveContinuation);
    let stack = continuation::push(stack, Continuation::EvalExpr(env.clone(), inner));
    return Ok(Some((Value::Nil, stack)));
  }

  if sym == FORMS.let_sym {
    let binds = args.car()?;
    let body = args.cdr()?;
    if matches!(binds, Value::Nil) {
      let stack = continuation::push(stack, Continuation::DoContinuation(env.clone(), body));
      return Ok(Some((Value::Nil, stack)));
    }
    let name = binds.car()?.as_symbol()?;
    let init = binds.cdr()?.car()?;
    let remaining = binds.cdr()?.cdr()?;
    let stack = continuation::push(stack, Continuation::LetContinuation(env.clone(), name, remaining, body));
    let stack = continuation::push(stack, Continuation::EvalExpr(env.clone(), init));
    return Ok(Some((Value::Nil, stack)));
  }

  if sym == FORMS.fn_sym {
    let params = args.car()?;
    let body = cons(Value::Symbol(FORMS.do_sym), args.cdr()?);
    let lambda = make_lambda(env.clone(), params, body);
    return Ok(Some((Value::Lambda(lambda), stack)));
  }

  Ok(None)
}

/// Builds a lambda whose captured environment's `__self__` binding
/// resolves back to the lambda itself, without leaking the `Rc` cycle
/// that a strong self-binding would create.
fn make_lambda(env: Env, params: Value, body: Value) -> Rc<LambdaData> {
  Rc::new_cyclic(|weak: &Weak<LambdaData>| {
    let captured_env = environment::bind_self_ref(env, FORMS.self_sym, weak.clone());
    LambdaData { env: captured_env, params, body }
  })
}

impl Continuation {
  /// Interprets one continuation, producing the next `(value, stack)`
  /// pair for the trampoline to consume. Never calls `eval_one`
  /// recursively from within a loop of its own — at most one `eval_one`
  /// call per variant, which itself only pushes further continuations.
  pub fn call_continuation(self, current: Value, stack: Stack) -> Result<(Value, Stack)> {
    match self {
      Continuation::EvalExpr(env, expr) => eval_one(env, expr, stack),

      Continuation::Val(v) => Ok((v, stack)),

      Continuation::EvalApply(env, remaining, count) => eval_apply(env, remaining, count, current, stack),

      Continuation::ApplyContinuation(_env, f, args) => f.invoke(args, stack),

      Continuation::DoContinuation(env, exprs) => match &exprs {
        Value::Nil => Ok((Value::Nil, stack)),
        Value::Cons(cell) if matches!(cell.cdr, Value::Nil) => {
          Ok((Value::Nil, continuation::push(stack, Continuation::EvalExpr(env, cell.car.clone()))))
        }
        Value::Cons(cell) => {
          let stack = continuation::push(stack, Continuation::DoContinuation(env.clone(), cell.cdr.clone()));
          Ok((Value::Nil, continuation::push(stack, Continuation::EvalExpr(env, cell.car.clone()))))
        }
        other => Err(Value::type_error("proper list", other)),
      },

      Continuation::IfContinuation(env, then, els) => {
        let branch = if is_truthy(&current) { then } else { els };
        Ok((Value::Nil, continuation::push(stack, Continuation::EvalExpr(env, branch))))
      }

      Continuation::CondContinuation(env, remaining) => {
        if is_truthy(&current) {
          let body = remaining.car()?;
          return Ok((Value::Nil, continuation::push(stack, Continuation::EvalExpr(env, body))));
        }
        if matches!(remaining.cdr()?, Value::Nil) {
          return Ok((Value::Nil, stack));
        }
        let next_test = remaining.cdr()?.car()?;
        let rest = remaining.cdr()?.cdr()?;
        let stack = continuation::push(stack, Continuation::CondContinuation(env.clone(), rest));
        Ok((Value::Nil, continuation::push(stack, Continuation::EvalExpr(env, next_test))))
      }

      Continuation::DefContinuation(sym) => {
        globals::def_global(sym, current.clone());
        log::debug!("def {sym} (revision {})", globals::revision());
        Ok((current, stack))
      }

      Continuation::ResolveContinuation => {
        let sym = current.as_symbol()?;
        globals::get_global(sym).map(|v| (v, stack))
      }

      Continuation::LetContinuation(env, sym, remaining, body) => {
        let new_env = environment::bind(env, sym, current);
        if matches!(remaining, Value::Nil) {
          Ok((Value::Nil, continuation::push(stack, Continuation::DoContinuation(new_env, body))))
        } else {
          let next_sym = remaining.car()?.as_symbol()?;
          let next_init = remaining.cdr()?.car()?;
          let rest = remaining.cdr()?.cdr()?;
          let stack = continuation::push(stack, Continuation::LetContinuation(new_env.clone(), next_sym, rest, body));
          Ok((Value::Nil, continuation::push(stack, Continuation::EvalExpr(new_env, next_init))))
        }
      }
    }
  }
}

/// Left-to-right argument evaluation. `count` is the
/// number of sub-expressions evaluated so far, starting at 1 for the
/// operator itself; `current` is the value most recently produced.
fn eval_apply(env: Env, remaining: Value, count: usize, current: Value, stack: Stack) -> Result<(Value, Stack)> {
  if matches!(remaining, Value::Nil) {
    if count == 1 {
      let f = current;
      let stack = continuation::push(stack, Continuation::ApplyContinuation(env, f, Value::Nil));
      return Ok((Value::Nil, stack));
    }

    let mut args = cons(current, Value::Nil);
    let mut stack = stack;
    for _ in 0..(count - 2) {
      let (k, rest) = continuation::pop(stack).ok_or_else(|| InterpreterError::Read("stack underflow reconstructing arguments".into()))?;
      let v = match k {
        Continuation::Val(v) => v,
        _ => return Err(InterpreterError::Read("expected a Val frame while reconstructing arguments".into())),
      };
      args = cons(v, args);
      stack = rest;
    }
    let (k, rest) = continuation::pop(stack).ok_or_else(|| InterpreterError::Read("stack underflow recovering function".into()))?;
    let f = match k {
      Continuation::Val(v) => v,
      _ => return Err(InterpreterError::Read("expected a Val frame while recovering the function".into())),
    };
    let stack = continuation::push(rest, Continuation::ApplyContinuation(env, f, args));
    return Ok((Value::Nil, stack));
  }

  let car = remaining.car()?;
  let cdr = remaining.cdr()?;
  let stack = continuation::push(stack, Continuation::Val(current));
  let stack = continuation::push(stack, Continuation::EvalApply(env.clone(), cdr, count + 1));
  let stack = continuation::push(stack, Continuation::EvalExpr(env, car));
  Ok((Value::Nil, stack))
}

/// The trampoline: pushes an initial `EvalExpr`
/// continuation, then repeatedly pops the top continuation, invokes it,
/// and loops until the stack is empty.
pub fn run(program: Value) -> Result<Value> {
  let env = environment::root(FORMS.self_sym);
  let stack = continuation::empty();
  let (mut value, mut stack) = eval_one(env, program, stack)?;

  while !continuation::is_empty(&stack) {
    let (k, rest) = continuation::pop(stack).expect("a non-empty stack always yields a frame");
    log::trace!("trampoline step");
    let (next_value, next_stack) = k.call_continuation(value, rest)?;
    value = next_value;
    stack = next_stack;
  }

  Ok(value)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::reader;
  use crate::symbol::intern;

  fn eval_str(src: &str) -> Result<Value> {
    globals::clear();
    crate::builtins::install();
    let mut reader = reader::PushbackReader::from_bytes(src.as_bytes().to_vec());
    let program = reader::read_all(&mut reader)?;
    run(program)
  }

  #[test]
  fn arithmetic() {
    let v = eval_str("(+ 1 2)").unwrap();
    assert!(matches!(v, Value::Integer(3)));
  }

  #[test]
  fn factorial_via_self_recursion_by_name() {
    let v = eval_str(
      "(def fact (fn [n] (if (<= n 1) 1 (* n (fact (dec n)))))) (fact 6)",
    )
    .unwrap();
    assert!(matches!(v, Value::Integer(720)));
  }

  #[test]
  fn let_sequential_bindings() {
    let v = eval_str("(let [a 1 b 2 c (+ a b)] c)").unwrap();
    assert!(matches!(v, Value::Integer(3)));
  }

  #[test]
  fn apply_builtin() {
    let v = eval_str("(apply + (quote (1 2)))").unwrap();
    assert!(matches!(v, Value::Integer(3)));
  }

  #[test]
  fn cond_fallthrough_yields_nil() {
    let v = eval_str("(cond false 1 false 2)").unwrap();
    assert!(matches!(v, Value::Nil));
  }

  #[test]
  fn lexical_capture_is_insensitive_to_later_def() {
    let v = eval_str("(let [x 1] ((fn [] x)))").unwrap();
    assert!(matches!(v, Value::Integer(1)));
  }

  #[test]
  fn self_recursion_via_self_binding() {
    let v = eval_str("((fn [n] (if (= n 0) 'done (__self__ (dec n)))) 5)").unwrap();
    assert!(matches!(v, Value::Symbol(s) if s == intern("done")));
  }

  #[test]
  fn tail_call_safety_does_not_overflow_the_host_stack() {
    let v = eval_str(
      "(def loop (fn [n] (if (= n 0) 'done (loop (dec n))))) (loop 1000000)",
    )
    .unwrap();
    assert!(matches!(v, Value::Symbol(s) if s == intern("done")));
  }

  #[test]
  fn shadowing_restores_the_global_after_scope_exit() {
    let v = eval_str("(def x 1) (let [x 2] x) (def y (+ x 0)) y").unwrap();
    assert!(matches!(v, Value::Integer(1)));
  }

  #[test]
  fn redefining_a_global_changes_subsequent_resolve() {
    let v = eval_str("(def x 1) (def x 2) (resolve (quote x))").unwrap();
    assert!(matches!(v, Value::Integer(2)));
  }
}
