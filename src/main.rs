use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use trampoline_lisp::{builtins, error::InterpreterError, eval, globals, reader};

/// A trampolined, continuation-passing-style Lisp interpreter.
#[derive(Parser, Debug)]
#[command(name = "trampoline-lisp")]
#[command(about = "Runs a single Lisp source file to completion")]
struct CliArgs {
  /// Source file to run.
  path: PathBuf,

  /// Increase log verbosity; repeatable (-v, -vv, -vvv).
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,
}

fn main() -> ExitCode {
  let args = CliArgs::parse();
  init_logging(args.verbose);

  match run(&args.path) {
    Ok(value) => {
      log::info!("program result: {value}");
      ExitCode::SUCCESS
    }
    Err(err) => {
      eprintln!("{err}");
      ExitCode::FAILURE
    }
  }
}

fn run(path: &PathBuf) -> Result<trampoline_lisp::value::Value, InterpreterError> {
  let bytes = std::fs::read(path)?;
  let mut source = reader::PushbackReader::from_bytes(bytes);
  let program = reader::read_all(&mut source)?;

  globals::clear();
  builtins::install();
  eval::run(program)
}

fn init_logging(verbose: u8) {
  let level = match verbose {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  };
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}
