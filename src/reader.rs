/*!

  Tokenizer/parser: turns a byte stream into an S-expression tree. The
  evaluator never looks back into this module — it treats the reader's
  output as opaque `Value` data,

  Grammar: whitespace is any of space/tab/newline/CR/comma;
  `;` runs a comment to end of line; `(...)`/`[...]` read a proper list
  (brackets and parens are interchangeable terminators); `"..."` reads raw
  bytes with no escape sequences; `'x` is shorthand for `(quote x)`; an
  atom is a maximal run of `[0-9a-z_!+\-*/<>=?]`, interpreted as `true`,
  `false`, `nil`, an integer, or (otherwise) an interned symbol.

*/

use std::io::Read;

use crate::error::{InterpreterError, Result};
use crate::symbol::intern;
use crate::value::{cons, from_vec, Value};

/// The character-stream collaborator describes: `read`
/// returns the next byte or signals end-of-stream; `unread` pushes back
/// at most one byte.
pub struct PushbackReader<R: Read> {
  bytes: std::io::Bytes<R>,
  pushback: Option<u8>,
}

impl PushbackReader<std::io::Cursor<Vec<u8>>> {
  /// Convenience constructor over an in-memory byte buffer, used by tests
  /// and by `read-file`/`load-file`, which read a whole file up front.
  pub fn from_bytes(data: Vec<u8>) -> Self {
    PushbackReader::new(std::io::Cursor::new(data))
  }
}

impl<R: Read> PushbackReader<R> {
  pub fn new(inner: R) -> Self {
    PushbackReader { bytes: inner.bytes(), pushback: None }
  }

  /// Returns the next byte, or `None` at a clean end-of-stream.
  fn read_byte(&mut self) -> Result<Option<u8>> {
    if let Some(b) = self.pushback.take() {
      return Ok(Some(b));
    }
    match self.bytes.next() {
      Some(Ok(b)) => Ok(Some(b)),
      Some(Err(e)) => Err(e.into()),
      None => Ok(None),
    }
  }

  /// Like `read_byte`, but end-of-stream is itself an error — for use
  /// anywhere the grammar requires another byte (inside a list, a
  /// string, or after a quote).
  fn require_byte(&mut self) -> Result<u8> {
    self.read_byte()?.ok_or_else(|| InterpreterError::Read("unexpected end of stream".to_string()))
  }

  fn unread(&mut self, byte: u8) {
    debug_assert!(self.pushback.is_none(), "at most one byte may be unread at a time");
    self.pushback = Some(byte);
  }
}

fn is_whitespace(b: u8) -> bool {
  matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b',')
}

fn is_atom_char(b: u8) -> bool {
  b.is_ascii_digit()
    || b.is_ascii_lowercase()
    || matches!(b, b'_' | b'!' | b'+' | b'-' | b'*' | b'/' | b'<' | b'>' | b'=' | b'?')
}

/// Reads one value, skipping whitespace and comments. Returns `Ok(None)`
/// at a clean end-of-stream (no token has been started yet).
pub fn read<R: Read>(reader: &mut PushbackReader<R>) -> Result<Option<Value>> {
  loop {
    let byte = match reader.read_byte()? {
      Some(b) => b,
      None => return Ok(None),
    };

    if is_whitespace(byte) {
      continue;
    }

    return match byte {
      b'(' => Ok(Some(read_list(reader, b')')?)),
      b'[' => Ok(Some(read_list(reader, b']')?)),
      b'"' => Ok(Some(read_string(reader)?)),
      b';' => {
        skip_comment(reader)?;
        continue;
      }
      b'\'' => {
        let quoted = read_required(reader)?;
        Ok(Some(cons(Value::Symbol(intern("quote")), cons(quoted, Value::Nil))))
      }
      other => Ok(Some(read_atom(reader, other)?)),
    };
  }
}

fn read_required<R: Read>(reader: &mut PushbackReader<R>) -> Result<Value> {
  read(reader)?.ok_or_else(|| InterpreterError::Read("unexpected end of stream".to_string()))
}

fn skip_whitespace_required<R: Read>(reader: &mut PushbackReader<R>) -> Result<u8> {
  loop {
    let byte = reader.require_byte()?;
    if !is_whitespace(byte) {
      return Ok(byte);
    }
  }
}

fn read_list<R: Read>(reader: &mut PushbackReader<R>, terminator: u8) -> Result<Value> {
  let mut items = Vec::new();
  loop {
    let byte = skip_whitespace_required(reader)?;
    if byte == terminator {
      return Ok(from_vec(items));
    }
    reader.unread(byte);
    items.push(read_required(reader)?);
  }
}

fn read_string<R: Read>(reader: &mut PushbackReader<R>) -> Result<Value> {
  let mut bytes = Vec::new();
  loop {
    let byte = reader.require_byte()?;
    if byte == b'"' {
      break;
    }
    bytes.push(byte);
  }
  let text = String::from_utf8(bytes).map_err(|e| InterpreterError::Read(format!("invalid UTF-8 in string literal: {e}")))?;
  Ok(Value::Str(text.into()))
}

fn skip_comment<R: Read>(reader: &mut PushbackReader<R>) -> Result<()> {
  loop {
    match reader.read_byte()? {
      None => return Ok(()),
      Some(b'\n') => return Ok(()),
      Some(_) => continue,
    }
  }
}

fn read_atom<R: Read>(reader: &mut PushbackReader<R>, first: u8) -> Result<Value> {
  let mut text = vec![first];
  loop {
    match reader.read_byte()? {
      Some(b) if is_atom_char(b) => text.push(b),
      Some(b) => {
        reader.unread(b);
        break;
      }
      None => break,
    }
  }
  let text = String::from_utf8(text).expect("atom charset is ASCII");
  Ok(interpret_atom(&text))
}

fn interpret_atom(text: &str) -> Value {
  match text {
    "true" => return Value::Boolean(true),
    "false" => return Value::Boolean(false),
    "nil" => return Value::Nil,
    _ => {}
  }

  if starts_like_integer(text) {
    if let Ok(n) = text.parse::<i64>() {
      return Value::Integer(n);
    }
  }

  Value::Symbol(intern(text))
}

fn starts_like_integer(text: &str) -> bool {
  let mut chars = text.chars();
  match chars.next() {
    Some(c) if c.is_ascii_digit() => true,
    Some('-') => chars.next().is_some_and(|c| c.is_ascii_digit()),
    _ => false,
  }
}

/// Repeatedly reads forms until end-of-stream, wrapping the results in a
/// list whose first element is the symbol `do`.
pub fn read_all<R: Read>(reader: &mut PushbackReader<R>) -> Result<Value> {
  let mut forms = vec![Value::Symbol(intern("do"))];
  while let Some(form) = read(reader)? {
    forms.push(form);
  }
  Ok(from_vec(forms))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn read_one(src: &str) -> Value {
    let mut reader = PushbackReader::from_bytes(src.as_bytes().to_vec());
    read(&mut reader).unwrap().unwrap()
  }

  #[test]
  fn reads_integers_including_negative() {
    assert!(matches!(read_one("42"), Value::Integer(42)));
    assert!(matches!(read_one("-7"), Value::Integer(-7)));
  }

  #[test]
  fn a_lone_minus_is_a_symbol() {
    assert!(matches!(read_one("-"), Value::Symbol(_)));
  }

  #[test]
  fn reads_singletons() {
    assert!(matches!(read_one("true"), Value::Boolean(true)));
    assert!(matches!(read_one("false"), Value::Boolean(false)));
    assert!(matches!(read_one("nil"), Value::Nil));
  }

  #[test]
  fn parens_and_brackets_are_interchangeable() {
    let a = format!("{}", read_one("(1 2 3)"));
    let b = format!("{}", read_one("[1 2 3]"));
    assert_eq!(a, b);
  }

  #[test]
  fn strings_have_no_escapes() {
    let v = read_one("\"hello\\nworld\"");
    match v {
      Value::Str(s) => assert_eq!(&*s, "hello\\nworld"),
      _ => panic!("expected a string"),
    }
  }

  #[test]
  fn comments_are_ignored() {
    let v = read_one("; a comment\n42");
    assert!(matches!(v, Value::Integer(42)));
  }

  #[test]
  fn quote_shorthand_expands() {
    let v = read_one("'x");
    assert_eq!(format!("{v}"), "(quote x)");
  }

  #[test]
  fn unclosed_list_is_a_read_error() {
    let mut reader = PushbackReader::from_bytes(b"(1 2".to_vec());
    assert!(read(&mut reader).is_err());
  }

  #[test]
  fn unterminated_string_is_a_read_error() {
    let mut reader = PushbackReader::from_bytes(b"\"abc".to_vec());
    assert!(read(&mut reader).is_err());
  }

  #[test]
  fn read_all_wraps_forms_in_do() {
    let mut reader = PushbackReader::from_bytes(b"1 2 3".to_vec());
    let v = read_all(&mut reader).unwrap();
    assert_eq!(format!("{v}"), "(do 1 2 3)");
  }

  #[test]
  fn round_trips_through_print_and_read() {
    let mut reader = PushbackReader::from_bytes(b"(1 \"two\" three nil true false)".to_vec());
    let v = read(&mut reader).unwrap().unwrap();
    let printed = format!("{v}");
    let mut reparsed = PushbackReader::from_bytes(printed.into_bytes());
    let v2 = read(&mut reparsed).unwrap().unwrap();
    assert_eq!(format!("{v}"), format!("{v2}"));
  }
}
