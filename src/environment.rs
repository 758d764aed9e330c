/*!

  An `Environment` is an immutable singly-linked chain of frames, each
  holding one `(symbol, value)` binding and a link to its parent. Binding
  is non-destructive: `bind` returns a new head frame linked to the prior
  chain, and lookup walks the chain looking for the first match.

  The root frame conventionally binds `__self__` to `nil`; a lambda's
  captured environment rebinds `__self__` to (a reference to) the lambda
  itself, which is what lets a lambda call itself without being named. Because a `Lambda` value must be reachable from
  its own captured environment, that one binding is stored as a `Weak`
  reference (see [`Binding::SelfRef`]) rather than a strong `Value` — an
  ordinary strong binding would make the `Lambda`/`Environment` pair an
  `Rc` cycle that is never reclaimed.

*/

use std::rc::{Rc, Weak};

use crate::symbol::Symbol;
use crate::value::{LambdaData, Value};

#[derive(Clone)]
enum Binding {
  Value(Value),
  SelfRef(Weak<LambdaData>),
}

struct Frame {
  symbol: Symbol,
  binding: Binding,
  parent: Option<Env>,
}

/// An environment is just a reference to its head frame; frames are
/// shared (never copied) between every environment that extends them.
pub type Env = Rc<Frame>;

/// A fresh environment whose only binding is the conventional
/// `__self__ → nil` root binding.
pub fn root(self_symbol: Symbol) -> Env {
  Rc::new(Frame { symbol: self_symbol, binding: Binding::Value(Value::Nil), parent: None })
}

/// Extends `env` with a new binding of `symbol` to `value`, returning the
/// new head frame. `env` itself is untouched and remains valid.
pub fn bind(env: Env, symbol: Symbol, value: Value) -> Env {
  Rc::new(Frame { symbol, binding: Binding::Value(value), parent: Some(env) })
}

/// Extends `env` with a `__self__`-style weak binding, used while
/// constructing a lambda's captured environment.
pub fn bind_self_ref(env: Env, symbol: Symbol, lambda: Weak<LambdaData>) -> Env {
  Rc::new(Frame { symbol, binding: Binding::SelfRef(lambda), parent: Some(env) })
}

/// Walks the frame chain looking for `symbol`, returning its bound value
/// if found locally. A `None` result means the caller should fall
/// through to the globals registry.
pub fn lookup(env: &Env, symbol: Symbol) -> Option<Value> {
  let mut frame = env;
  loop {
    if frame.symbol == symbol {
      return Some(match &frame.binding {
        Binding::Value(v) => v.clone(),
        Binding::SelfRef(weak) => weak.upgrade().map(Value::Lambda).unwrap_or(Value::Nil),
      });
    }
    match &frame.parent {
      Some(parent) => frame = parent,
      None => return None,
    }
  }
}
