/*!

  A process-wide mapping from symbol identity to value, with an auxiliary
  set of symbols marked mutable and a monotonic revision counter.

  Unlike the symbol table, the registry's payload is ordinary `Value`s,
  which are `Rc`-backed and therefore not `Send`. Rather than force them
  through a `Mutex` (which would need to be `Sync`, which in turn needs
  `Send` payload), the registry lives in `std::thread_local!` storage —
  the idiomatic Rust rendition of "process-wide singleton that happens to
  never leave the single thread it was created on".

*/

use std::cell::RefCell;

use ahash::{AHashMap, AHashSet};

use crate::error::{InterpreterError, Result};
use crate::symbol::Symbol;
use crate::value::Value;

#[derive(Default)]
pub struct Globals {
  bindings: AHashMap<Symbol, Value>,
  mutable: AHashSet<Symbol>,
  revision: u64,
}

impl Globals {
  /// If `symbol` is already defined and not yet marked mutable, marks it
  /// mutable and bumps the revision counter — any symbol redefined at
  /// least once is mutable from then on. Installs `symbol → value`
  /// either way.
  pub fn def_global(&mut self, symbol: Symbol, value: Value) {
    if self.bindings.contains_key(&symbol) {
      if self.mutable.insert(symbol) {
        self.revision += 1;
      }
    } else {
      self.revision += 1;
    }
    self.bindings.insert(symbol, value);
  }

  pub fn get_global(&self, symbol: Symbol) -> Result<Value> {
    self
      .bindings
      .get(&symbol)
      .cloned()
      .ok_or_else(|| InterpreterError::UnboundGlobal(symbol.name()))
  }

  pub fn is_mutable(&self, symbol: Symbol) -> bool {
    self.mutable.contains(&symbol)
  }

  pub fn revision(&self) -> u64 {
    self.revision
  }

  /// Called at startup to re-seed built-ins; also useful between test
  /// cases so one test's `def`s cannot leak into another's.
  pub fn clear(&mut self) {
    self.bindings.clear();
    self.mutable.clear();
    self.revision = 0;
  }
}

thread_local! {
  static GLOBALS: RefCell<Globals> = RefCell::new(Globals::default());
}

pub fn def_global(symbol: Symbol, value: Value) {
  GLOBALS.with(|g| g.borrow_mut().def_global(symbol, value));
}

pub fn get_global(symbol: Symbol) -> Result<Value> {
  GLOBALS.with(|g| g.borrow().get_global(symbol))
}

pub fn is_mutable(symbol: Symbol) -> bool {
  GLOBALS.with(|g| g.borrow().is_mutable(symbol))
}

pub fn revision() -> u64 {
  GLOBALS.with(|g| g.borrow().revision())
}

pub fn clear() {
  GLOBALS.with(|g| g.borrow_mut().clear());
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::symbol::intern;

  #[test]
  fn first_definition_is_immutable() {
    clear();
    let sym = intern("globals_test_first_definition_is_immutable");
    def_global(sym, Value::Integer(1));
    assert!(!is_mutable(sym));
  }

  #[test]
  fn redefinition_marks_mutable_and_is_visible() {
    clear();
    let sym = intern("globals_test_redefinition_marks_mutable_and_is_visible");
    def_global(sym, Value::Integer(1));
    def_global(sym, Value::Integer(2));
    assert!(is_mutable(sym));
    assert!(matches!(get_global(sym), Ok(Value::Integer(2))));
  }

  #[test]
  fn missing_key_is_an_error() {
    clear();
    let sym = intern("globals_test_missing_key_is_an_error");
    assert!(get_global(sym).is_err());
  }
}
