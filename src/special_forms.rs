/*!

  The symbols that name special forms are interned once,
  at first use, and cached here — mirroring how the original RPython
  interpreter computes `quote_sym = Symbol.intern("quote")` and friends as
  module-level constants
  (`examples/original_source/src/lisp_in_x/in_rpython_jit.py`). Because a
  `Symbol` is a plain `Copy` `u32` handle, this cache can sit behind an
  ordinary `lazy_static` without any of the `Send`/`Sync` contortions the
  `Rc`-backed registries need (see `globals.rs`).

*/

use lazy_static::lazy_static;

use crate::symbol::{intern, Symbol};

pub struct SpecialForms {
  pub if_sym: Symbol,
  pub do_sym: Symbol,
  pub def_sym: Symbol,
  pub quote_sym: Symbol,
  pub cond_sym: Symbol,
  pub resolve_sym: Symbol,
  pub let_sym: Symbol,
  pub fn_sym: Symbol,
  pub self_sym: Symbol,
}

lazy_static! {
  pub static ref FORMS: SpecialForms = SpecialForms {
    if_sym: intern("if"),
    do_sym: intern("do"),
    def_sym: intern("def"),
    quote_sym: intern("quote"),
    cond_sym: intern("cond"),
    resolve_sym: intern("resolve"),
    let_sym: intern("let"),
    fn_sym: intern("fn"),
    self_sym: intern("__self__"),
  };
}
