use pretty_assertions::assert_eq;
use trampoline_lisp::value::Value;
use trampoline_lisp::{builtins, eval, globals, reader};

fn run(src: &str) -> trampoline_lisp::error::Result<Value> {
  globals::clear();
  builtins::install();
  let mut source = reader::PushbackReader::from_bytes(src.as_bytes().to_vec());
  let program = reader::read_all(&mut source)?;
  eval::run(program)
}

#[test]
fn println_returns_nil() {
  let v = run("(println \"hello\")").unwrap();
  assert!(matches!(v, Value::Nil));
}

#[test]
fn addition_scenario() {
  let v = run("(+ 1 2)").unwrap();
  assert_eq!(format!("{v}"), "3");
}

#[test]
fn factorial_scenario() {
  let v = run("(def fact (fn [n] (if (<= n 1) 1 (* n (fact (dec n)))))) (fact 6)").unwrap();
  assert_eq!(format!("{v}"), "720");
}

#[test]
fn let_scenario() {
  let v = run("(let [a 1 b 2 c (+ a b)] c)").unwrap();
  assert_eq!(format!("{v}"), "3");
}

#[test]
fn apply_scenario() {
  let v = run("(apply + (quote (1 2)))").unwrap();
  assert_eq!(format!("{v}"), "3");
}

#[test]
fn cons_destructuring_scenario() {
  let first = run("(car (cons 1 (cons 2 nil)))").unwrap();
  let rest = run("(cdr (cons 1 (cons 2 nil)))").unwrap();
  assert_eq!(format!("{first}"), "1");
  assert_eq!(format!("{rest}"), "(2)");
}

#[test]
fn unbound_symbol_is_reported() {
  let err = run("nowhere-to-be-found").unwrap_err();
  assert!(err.to_string().contains("unbound symbol"));
}

#[test]
fn arity_mismatch_is_a_hard_error() {
  let err = run("((fn [a b] a) 1)").unwrap_err();
  assert!(err.to_string().contains("arity error"));
}

#[test]
fn uncallable_value_is_reported() {
  let err = run("(1 2 3)").unwrap_err();
  assert!(err.to_string().contains("uncallable"));
}

#[test]
fn die_aborts_the_program() {
  let err = run("(die \"fatal: \" (+ 1 1))").unwrap_err();
  assert_eq!(err.to_string(), "abort: fatal: 2");
}

#[test]
fn cond_picks_first_truthy_branch() {
  let v = run("(cond false 1 true 2 true 3)").unwrap();
  assert_eq!(format!("{v}"), "2");
}

#[test]
fn quote_suppresses_evaluation() {
  let v = run("(quote (a b c))").unwrap();
  assert_eq!(format!("{v}"), "(a b c)");
}

#[test]
fn vararg_collects_all_arguments_into_one_list() {
  let v = run("(def f (vararg (fn [args] args))) (f 1 2 3)").unwrap();
  assert_eq!(format!("{v}"), "(1 2 3)");
}

#[test]
fn load_file_evaluates_a_separate_source_file() {
  let dir = std::env::temp_dir();
  let path = dir.join("trampoline_lisp_scenarios_test_load_file.lisp");
  std::fs::write(&path, b"(def from_file 7)").unwrap();
  let src = format!("(load-file \"{}\") from_file", path.display());
  let v = run(&src).unwrap();
  assert_eq!(format!("{v}"), "7");
  let _ = std::fs::remove_file(&path);
}

#[test]
fn load_file_result_propagates_as_the_current_value_in_expression_position() {
  let dir = std::env::temp_dir();
  let path = dir.join("trampoline_lisp_scenarios_test_load_file_value.lisp");
  std::fs::write(&path, b"(+ 1 2)").unwrap();
  let src = format!("(+ 1 (load-file \"{}\"))", path.display());
  let v = run(&src).unwrap();
  assert_eq!(format!("{v}"), "4");
  let _ = std::fs::remove_file(&path);
}

#[test]
fn deeply_tail_recursive_loop_does_not_overflow() {
  let v = run("(def count-down (fn [n] (if (= n 0) 0 (count-down (dec n))))) (count-down 200000)").unwrap();
  assert_eq!(format!("{v}"), "0");
}
