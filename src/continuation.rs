/*!

  Reified evaluation steps. Each variant carries its own frozen state (the
  fields below) and has no behavior of its own — `call_continuation`, in
  `eval.rs`, is the only place that interprets a continuation. Keeping the
  data and the interpretation separate means nothing in this module can
  recurse: a continuation is just a value, and "running" one is a single
  non-recursive match arm that returns the next `(value, stack)` pair.

  The stack itself is an immutable singly-linked list — `push`/`pop`
  return new `Stack` values and never mutate an existing one, so multiple
  in-flight trampoline states can share a tail.

*/

use std::rc::Rc;

use crate::environment::Env;
use crate::symbol::Symbol;
use crate::value::Value;

pub enum Continuation {
  /// Delegates to `eval_one`, ignoring the current value.
  EvalExpr(Env, Value),

  /// A sentinel that carries a value for later retrieval by `EvalApply`.
  Val(Value),

  /// Left-to-right argument evaluator. `count` is the number of
  /// sub-expressions evaluated so far, starting at 1 for the operator
  /// itself.
  EvalApply(Env, Value, usize),

  /// The sole call-site for function application.
  ApplyContinuation(Env, Value, Value),

  /// Sequential evaluation, returning the last value.
  DoContinuation(Env, Value),

  IfContinuation(Env, Value, Value),

  CondContinuation(Env, Value),

  DefContinuation(Symbol),

  ResolveContinuation,

  LetContinuation(Env, Symbol, Value, Value),
}

pub enum StackNode {
  Empty,
  Frame(Continuation, Stack),
}

/// An immutable singly-linked list of continuation records.
pub type Stack = Rc<StackNode>;

pub fn empty() -> Stack {
  Rc::new(StackNode::Empty)
}

pub fn push(stack: Stack, continuation: Continuation) -> Stack {
  Rc::new(StackNode::Frame(continuation, stack))
}

pub fn is_empty(stack: &Stack) -> bool {
  matches!(**stack, StackNode::Empty)
}

/// Pops the top continuation off `stack`. The returned `Continuation` is
/// moved out of its frame (frames are not `Clone`, matching the "a
/// continuation carries its own frozen state" design: once popped, a
/// frame is consumed exactly once).
pub fn pop(stack: Stack) -> Option<(Continuation, Stack)> {
  match Rc::try_unwrap(stack) {
    Ok(StackNode::Frame(k, rest)) => Some((k, rest)),
    Ok(StackNode::Empty) => None,
    // The frame is shared (another Stack value still references it); we
    // cannot move the Continuation out without cloning the underlying
    // Value fields it holds, so reconstruct a fresh frame from a clone.
    Err(shared) => match &*shared {
      StackNode::Frame(k, rest) => Some((k.shallow_clone(), rest.clone())),
      StackNode::Empty => None,
    },
  }
}

impl Continuation {
  /// Continuations only ever hold cheaply-clonable `Value`/`Env`/`Symbol`
  /// fields (each already `Rc`-backed internally), so a structural clone
  /// is always cheap; this is only exercised when a stack tail is shared
  /// by more than one in-flight continuation chain.
  fn shallow_clone(&self) -> Continuation {
    match self {
      Continuation::EvalExpr(env, expr) => Continuation::EvalExpr(env.clone(), expr.clone()),
      Continuation::Val(v) => Continuation::Val(v.clone()),
      Continuation::EvalApply(env, rest, count) => Continuation::EvalApply(env.clone(), rest.clone(), *count),
      Continuation::ApplyContinuation(env, f, args) => Continuation::ApplyContinuation(env.clone(), f.clone(), args.clone()),
      Continuation::DoContinuation(env, exprs) => Continuation::DoContinuation(env.clone(), exprs.clone()),
      Continuation::IfContinuation(env, then, els) => Continuation::IfContinuation(env.clone(), then.clone(), els.clone()),
      Continuation::CondContinuation(env, rest) => Continuation::CondContinuation(env.clone(), rest.clone()),
      Continuation::DefContinuation(sym) => Continuation::DefContinuation(*sym),
      Continuation::ResolveContinuation => Continuation::ResolveContinuation,
      Continuation::LetContinuation(env, sym, rest, body) => {
        Continuation::LetContinuation(env.clone(), *sym, rest.clone(), body.clone())
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn push_pop_round_trips() {
    let stack = empty();
    let stack = push(stack, Continuation::Val(Value::Integer(1)));
    let (k, rest) = pop(stack).unwrap();
    assert!(matches!(k, Continuation::Val(Value::Integer(1))));
    assert!(is_empty(&rest));
  }

  #[test]
  fn pop_of_empty_is_none() {
    assert!(pop(empty()).is_none());
  }
}
