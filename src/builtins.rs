/*!

  The primitive table. Each entry is an ordinary Rust `fn`
  matching [`crate::value::BuiltinHandler`]: it receives the already-
  evaluated argument list and the current stack, and returns the next
  `(value, stack)` pair exactly like a continuation does — a builtin is
  just a leaf of the same machinery, not a special case of it.

  `install` seeds the globals registry; it is called once by `main` at
  startup and again by every test in this crate that needs a clean
  environment (`globals::clear()` followed by `builtins::install()`).

*/

use std::fs;
use std::rc::Rc;

use crate::continuation::{self, Continuation, Stack};
use crate::environment;
use crate::error::{InterpreterError, Result};
use crate::globals;
use crate::reader;
use crate::special_forms::FORMS;
use crate::symbol::intern;
use crate::value::{cons, Builtin, Value};

fn two_integers(args: &Value) -> Result<(i64, i64)> {
  let a = args.car()?.as_integer()?;
  let b = args.cdr()?.car()?.as_integer()?;
  Ok((a, b))
}

/// Concatenates an argument list the way `println`/`die` print it:
/// strings contribute their raw bytes, everything else its printed form.
fn render_args(args: &Value) -> Result<String> {
  let mut parts = Vec::new();
  let mut node = args.clone();
  loop {
    match node {
      Value::Nil => break,
      Value::Cons(cell) => {
        match &cell.car {
          Value::Str(s) => parts.push(s.to_string()),
          other => parts.push(format!("{other}")),
        }
        node = cell.cdr.clone();
      }
      other => return Err(Value::type_error("proper list", &other)),
    }
  }
  Ok(parts.concat())
}

fn println_builtin(args: &Value, stack: Stack) -> Result<(Value, Stack)> {
  println!("{}", render_args(args)?);
  Ok((Value::Nil, stack))
}

fn die_builtin(args: &Value, _stack: Stack) -> Result<(Value, Stack)> {
  Err(InterpreterError::Abort(render_args(args)?))
}

/// Reads, parses, and evaluates the named file in a fresh root
/// environment, by pushing the loaded program's `EvalExpr` continuation
/// onto the current stack rather than re-entering the trampoline
/// recursively. The loaded program's own last value becomes the current
/// value threaded to whatever continuation follows `load-file`.
fn load_file_builtin(args: &Value, stack: Stack) -> Result<(Value, Stack)> {
  let path = args.car()?.as_str()?;
  let bytes = fs::read(&*path)?;
  let mut reader = reader::PushbackReader::from_bytes(bytes);
  let program = reader::read_all(&mut reader)?;
  let env = environment::root(FORMS.self_sym);
  let stack = continuation::push(stack, Continuation::EvalExpr(env, program));
  Ok((Value::Nil, stack))
}

/// Parses the named file and returns the form list without evaluating it.
fn read_file_builtin(args: &Value, stack: Stack) -> Result<(Value, Stack)> {
  let path = args.car()?.as_str()?;
  let bytes = fs::read(&*path)?;
  let mut reader = reader::PushbackReader::from_bytes(bytes);
  let program = reader::read_all(&mut reader)?;
  Ok((program, stack))
}

fn lt_builtin(args: &Value, stack: Stack) -> Result<(Value, Stack)> {
  let (a, b) = two_integers(args)?;
  Ok((Value::Boolean(a < b), stack))
}

fn gt_builtin(args: &Value, stack: Stack) -> Result<(Value, Stack)> {
  let (a, b) = two_integers(args)?;
  Ok((Value::Boolean(a > b), stack))
}

fn le_builtin(args: &Value, stack: Stack) -> Result<(Value, Stack)> {
  let (a, b) = two_integers(args)?;
  Ok((Value::Boolean(a <= b), stack))
}

fn ge_builtin(args: &Value, stack: Stack) -> Result<(Value, Stack)> {
  let (a, b) = two_integers(args)?;
  Ok((Value::Boolean(a >= b), stack))
}

/// Integer equality when both operands are integers, identity equality
/// otherwise.
fn eq_builtin(args: &Value, stack: Stack) -> Result<(Value, Stack)> {
  let a = args.car()?;
  let b = args.cdr()?.car()?;
  let equal = match (&a, &b) {
    (Value::Integer(x), Value::Integer(y)) => x == y,
    _ => a.identity_eq(&b),
  };
  Ok((Value::Boolean(equal), stack))
}

fn car_builtin(args: &Value, stack: Stack) -> Result<(Value, Stack)> {
  Ok((args.car()?.car()?, stack))
}

fn cdr_builtin(args: &Value, stack: Stack) -> Result<(Value, Stack)> {
  Ok((args.car()?.cdr()?, stack))
}

fn cons_builtin(args: &Value, stack: Stack) -> Result<(Value, Stack)> {
  let a = args.car()?;
  let b = args.cdr()?.car()?;
  Ok((cons(a, b), stack))
}

fn nil_p_builtin(args: &Value, stack: Stack) -> Result<(Value, Stack)> {
  Ok((Value::Boolean(matches!(args.car()?, Value::Nil)), stack))
}

fn cons_p_builtin(args: &Value, stack: Stack) -> Result<(Value, Stack)> {
  Ok((Value::Boolean(matches!(args.car()?, Value::Cons(_))), stack))
}

fn symbol_p_builtin(args: &Value, stack: Stack) -> Result<(Value, Stack)> {
  Ok((Value::Boolean(matches!(args.car()?, Value::Symbol(_))), stack))
}

fn inc_builtin(args: &Value, stack: Stack) -> Result<(Value, Stack)> {
  Ok((Value::Integer(args.car()?.as_integer()? + 1), stack))
}

fn dec_builtin(args: &Value, stack: Stack) -> Result<(Value, Stack)> {
  Ok((Value::Integer(args.car()?.as_integer()? - 1), stack))
}

fn add_builtin(args: &Value, stack: Stack) -> Result<(Value, Stack)> {
  let (a, b) = two_integers(args)?;
  Ok((Value::Integer(a + b), stack))
}

fn sub_builtin(args: &Value, stack: Stack) -> Result<(Value, Stack)> {
  let (a, b) = two_integers(args)?;
  Ok((Value::Integer(a - b), stack))
}

fn mul_builtin(args: &Value, stack: Stack) -> Result<(Value, Stack)> {
  let (a, b) = two_integers(args)?;
  Ok((Value::Integer(a * b), stack))
}

/// Integer division truncating toward zero, matching Rust's `/` on `i64`
/// and thus requiring no extra work beyond the zero-divisor check
///.
fn div_builtin(args: &Value, stack: Stack) -> Result<(Value, Stack)> {
  let (a, b) = two_integers(args)?;
  if b == 0 {
    return Err(InterpreterError::DivideByZero);
  }
  Ok((Value::Integer(a / b), stack))
}

fn apply_builtin(args: &Value, stack: Stack) -> Result<(Value, Stack)> {
  let f = args.car()?;
  let arglist = args.cdr()?.car()?;
  f.invoke(arglist, stack)
}

fn vararg_builtin(args: &Value, stack: Stack) -> Result<(Value, Stack)> {
  let f = args.car()?;
  Ok((Value::VarArgLambda(Rc::new(f)), stack))
}

const BUILTINS: &[(&str, crate::value::BuiltinHandler)] = &[
  ("println", println_builtin),
  ("load-file", load_file_builtin),
  ("read-file", read_file_builtin),
  ("<", lt_builtin),
  (">", gt_builtin),
  ("<=", le_builtin),
  (">=", ge_builtin),
  ("=", eq_builtin),
  ("car", car_builtin),
  ("cdr", cdr_builtin),
  ("cons", cons_builtin),
  ("nil?", nil_p_builtin),
  ("cons?", cons_p_builtin),
  ("symbol?", symbol_p_builtin),
  ("inc", inc_builtin),
  ("dec", dec_builtin),
  ("+", add_builtin),
  ("-", sub_builtin),
  ("*", mul_builtin),
  ("/", div_builtin),
  ("apply", apply_builtin),
  ("vararg", vararg_builtin),
  ("die", die_builtin),
];

/// Registers every primitive into the globals registry. Idempotent:
/// calling it twice simply redefines each name, which `Globals::def_global`
/// treats as an ordinary (now-mutable) redefinition.
pub fn install() {
  for (name, handler) in BUILTINS {
    globals::def_global(intern(name), Value::Builtin(Rc::new(Builtin { name, handler: *handler })));
  }
}
