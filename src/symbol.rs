/*!

  Global interning map: string → canonical symbol identity.

  A `Symbol` is a `Copy` handle into a process-wide table rather than an
  `Rc<str>` directly, so that two symbols built from the same text are
  identical by a cheap integer comparison. Keeping the table's payload as
  plain `String`s (not `Rc<str>`) is what lets the table sit behind a
  `lazy_static` `Mutex`: `Mutex<T>` is only `Sync` when `T: Send`, and an
  `Rc`-based payload would not be, even though the table in fact never
  leaves the single thread this interpreter runs on (see DESIGN.md).

*/

use std::fmt;
use std::sync::Mutex;

use ahash::AHashMap;
use lazy_static::lazy_static;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol(u32);

impl fmt::Debug for Symbol {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.name())
  }
}

impl fmt::Display for Symbol {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.name())
  }
}

impl Symbol {
  /// Clones the backing text out of the intern table. Called rarely — on
  /// printing and in diagnostics — never on the evaluator's hot path.
  pub fn name(&self) -> String {
    SYMBOL_TABLE.lock().unwrap().name_of(*self)
  }
}

#[derive(Default)]
struct SymbolTable {
  name_to_id: AHashMap<String, Symbol>,
  names: Vec<String>,
}

impl SymbolTable {
  fn intern(&mut self, name: &str) -> Symbol {
    if let Some(sym) = self.name_to_id.get(name) {
      return *sym;
    }
    let id = self.names.len() as u32;
    let sym = Symbol(id);
    self.names.push(name.to_string());
    self.name_to_id.insert(name.to_string(), sym);
    sym
  }

  fn name_of(&self, sym: Symbol) -> String {
    self.names[sym.0 as usize].clone()
  }
}

lazy_static! {
  static ref SYMBOL_TABLE: Mutex<SymbolTable> = Mutex::new(SymbolTable::default());
}

/// Interns `name`, returning the canonical [`Symbol`] for it. Repeated
/// calls with the same text return an identical `Symbol`.
pub fn intern(name: &str) -> Symbol {
  SYMBOL_TABLE.lock().unwrap().intern(name)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn intern_is_idempotent() {
    let a = intern("loop");
    let b = intern("loop");
    assert_eq!(a, b);
  }

  #[test]
  fn distinct_text_interns_distinct_symbols() {
    let a = intern("foo");
    let b = intern("bar");
    assert_ne!(a, b);
  }

  #[test]
  fn name_round_trips() {
    let s = intern("__self__");
    assert_eq!(s.name(), "__self__");
  }
}
