//! Lexical analysis: turns the preprocessed source into a vector of tokens.
//!
//! The tokenizer knows nothing about C semantics beyond classifying
//! identifiers, keywords, punctuators and literals. Multi-character
//! punctuators are matched before single-character ones to avoid ambiguity,
//! and numeric literals are resolved to a value plus the C type they carry.
//! Line markers left behind by an external preprocessor are skipped, with
//! their line number honoured for diagnostics and `.loc` directives.

use crate::error::{CompileError, CompileResult, Loc};

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  Ident,
  Punct,
  Keyword,
  Str,
  Num,
  Eof,
}

/// Type a numeric literal resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumType {
  Int,
  UInt,
  Long,
  ULong,
  Float,
  Double,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
  None,
  Int { value: i64, ty: NumType },
  Float { value: f64, ty: NumType },
  /// String contents including the terminating NUL.
  Str(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
  pub kind: TokenKind,
  pub loc: Loc,
  pub literal: Literal,
}

impl Token {
  fn new(kind: TokenKind, loc: Loc, literal: Literal) -> Self {
    Self { kind, loc, literal }
  }
}

const KEYWORDS: &[&str] = &[
  "return", "if", "else", "for", "while", "do", "switch", "case", "default",
  "goto", "break", "continue", "sizeof", "_Alignof", "struct", "union",
  "enum", "typedef", "static", "extern", "void", "_Bool", "char", "short",
  "int", "long", "float", "double", "signed", "unsigned",
];

const PUNCTUATORS: &[&str] = &[
  "<<=", ">>=", "...", "==", "!=", "<=", ">=", "->", "++", "--", "+=", "-=",
  "*=", "/=", "%=", "&=", "|=", "^=", "&&", "||", "<<", ">>",
];

const SINGLE_PUNCTUATORS: &[u8] = b"+-*/%()<>=;{}[],.&|^!~?:";

/// Lex the input into a flat vector of tokens terminated by an `Eof` marker.
pub fn tokenize(source: &str) -> CompileResult<Vec<Token>> {
  let mut lexer = Lexer {
    source,
    bytes: source.as_bytes(),
    pos: 0,
    line: 1,
    at_line_start: true,
    pending_line: None,
    tokens: Vec::new(),
  };
  lexer.run()?;
  Ok(lexer.tokens)
}

struct Lexer<'a> {
  source: &'a str,
  bytes: &'a [u8],
  pos: usize,
  line: usize,
  at_line_start: bool,
  pending_line: Option<usize>,
  tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
  fn run(&mut self) -> CompileResult<()> {
    while self.pos < self.bytes.len() {
      let c = self.bytes[self.pos];

      if c == b'\n' {
        self.newline();
        self.pos += 1;
        continue;
      }
      if c.is_ascii_whitespace() {
        self.pos += 1;
        continue;
      }
      if self.starts_with("//") {
        while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
          self.pos += 1;
        }
        continue;
      }
      if self.starts_with("/*") {
        self.block_comment()?;
        continue;
      }
      if c == b'#' && self.at_line_start {
        self.line_marker();
        continue;
      }

      self.at_line_start = false;
      let start = self.pos;

      if c.is_ascii_digit()
        || (c == b'.' && self.bytes.get(self.pos + 1).is_some_and(u8::is_ascii_digit))
      {
        self.number()?;
        continue;
      }
      if c == b'"' {
        self.string()?;
        continue;
      }
      if c == b'\'' {
        self.char_literal()?;
        continue;
      }
      if c.is_ascii_alphabetic() || c == b'_' {
        while self.pos < self.bytes.len()
          && (self.bytes[self.pos].is_ascii_alphanumeric() || self.bytes[self.pos] == b'_')
        {
          self.pos += 1;
        }
        let kind = if KEYWORDS.contains(&&self.source[start..self.pos]) {
          TokenKind::Keyword
        } else {
          TokenKind::Ident
        };
        self.push(kind, start, Literal::None);
        continue;
      }
      if let Some(op) = PUNCTUATORS.iter().find(|op| self.starts_with(op)) {
        self.pos += op.len();
        self.push(TokenKind::Punct, start, Literal::None);
        continue;
      }
      if SINGLE_PUNCTUATORS.contains(&c) {
        self.pos += 1;
        self.push(TokenKind::Punct, start, Literal::None);
        continue;
      }

      let invalid = self.source[start..].chars().next().unwrap_or('\0');
      return Err(CompileError::lex(
        self.loc_at(start, invalid.len_utf8()),
        format!("invalid token '{invalid}'"),
      ));
    }

    let end = self.bytes.len();
    self.push_at(TokenKind::Eof, end, end, Literal::None);
    Ok(())
  }

  fn starts_with(&self, s: &str) -> bool {
    self.bytes[self.pos..].starts_with(s.as_bytes())
  }

  fn newline(&mut self) {
    self.line = match self.pending_line.take() {
      Some(line) => line,
      None => self.line + 1,
    };
    self.at_line_start = true;
  }

  fn loc_at(&self, offset: usize, len: usize) -> Loc {
    Loc {
      offset,
      len,
      line: self.line,
    }
  }

  fn push(&mut self, kind: TokenKind, start: usize, literal: Literal) {
    let end = self.pos;
    self.push_at(kind, start, end, literal);
  }

  fn push_at(&mut self, kind: TokenKind, start: usize, end: usize, literal: Literal) {
    let loc = self.loc_at(start, end - start);
    self.tokens.push(Token::new(kind, loc, literal));
  }

  fn block_comment(&mut self) -> CompileResult<()> {
    let start = self.pos;
    let Some(len) = self.source[start + 2..].find("*/") else {
      return Err(CompileError::lex(
        self.loc_at(start, 2),
        "unclosed block comment",
      ));
    };
    let end = start + 2 + len + 2;
    let newlines = self.bytes[start..end].iter().filter(|&&b| b == b'\n').count();
    self.line += newlines;
    self.pos = end;
    Ok(())
  }

  /// Skip `# <line> "file" ...` and resume numbering at `<line>`.
  fn line_marker(&mut self) {
    self.pos += 1;
    while self.pos < self.bytes.len() && matches!(self.bytes[self.pos], b' ' | b'\t') {
      self.pos += 1;
    }
    let digits_start = self.pos;
    while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_digit() {
      self.pos += 1;
    }
    if let Ok(line) = self.source[digits_start..self.pos].parse::<usize>() {
      self.pending_line = Some(line);
    }
    while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
      self.pos += 1;
    }
  }

  fn number(&mut self) -> CompileResult<()> {
    let start = self.pos;
    self.pos += 1;
    while self.pos < self.bytes.len() {
      let c = self.bytes[self.pos];
      let next = self.bytes.get(self.pos + 1).copied();
      if matches!(c, b'e' | b'E' | b'p' | b'P') && matches!(next, Some(b'+' | b'-')) {
        self.pos += 2;
      } else if c.is_ascii_alphanumeric() || c == b'.' {
        self.pos += 1;
      } else {
        break;
      }
    }

    let text = &self.source[start..self.pos];
    let literal = if let Some((value, ty)) = convert_int(text) {
      Literal::Int {
        value: value as i64,
        ty,
      }
    } else if let Some((value, ty)) = convert_float(text) {
      Literal::Float { value, ty }
    } else {
      return Err(CompileError::lex(
        self.loc_at(start, text.len()),
        format!("invalid numeric constant '{text}'"),
      ));
    };
    self.push(TokenKind::Num, start, literal);
    Ok(())
  }

  fn string(&mut self) -> CompileResult<()> {
    let start = self.pos;
    self.pos += 1;
    let mut bytes = Vec::new();
    loop {
      match self.bytes.get(self.pos) {
        None | Some(b'\n') => {
          return Err(CompileError::lex(
            self.loc_at(start, 1),
            "unclosed string literal",
          ));
        }
        Some(b'"') => break,
        Some(b'\\') => {
          self.pos += 1;
          bytes.push(self.escape(start)?);
        }
        Some(&c) => {
          bytes.push(c);
          self.pos += 1;
        }
      }
    }
    self.pos += 1;
    bytes.push(0);
    self.push(TokenKind::Str, start, Literal::Str(bytes));
    Ok(())
  }

  fn char_literal(&mut self) -> CompileResult<()> {
    let start = self.pos;
    self.pos += 1;
    let value = match self.bytes.get(self.pos) {
      None | Some(b'\n') | Some(b'\'') => {
        return Err(CompileError::lex(
          self.loc_at(start, 1),
          "unclosed char literal",
        ));
      }
      Some(b'\\') => {
        self.pos += 1;
        self.escape(start)?
      }
      Some(&c) => {
        self.pos += 1;
        c
      }
    };
    if self.bytes.get(self.pos) != Some(&b'\'') {
      return Err(CompileError::lex(
        self.loc_at(start, 1),
        "unclosed char literal",
      ));
    }
    self.pos += 1;
    // Plain `char` is signed.
    let literal = Literal::Int {
      value: i64::from(value as i8),
      ty: NumType::Int,
    };
    self.push(TokenKind::Num, start, literal);
    Ok(())
  }

  /// Decode the escape sequence after a backslash.
  fn escape(&mut self, literal_start: usize) -> CompileResult<u8> {
    let Some(&c) = self.bytes.get(self.pos) else {
      return Err(CompileError::lex(
        self.loc_at(literal_start, 1),
        "unclosed literal",
      ));
    };

    if (b'0'..=b'7').contains(&c) {
      let mut value: u32 = 0;
      let mut digits = 0;
      while digits < 3 {
        match self.bytes.get(self.pos) {
          Some(&d) if (b'0'..=b'7').contains(&d) => {
            value = value * 8 + u32::from(d - b'0');
            self.pos += 1;
            digits += 1;
          }
          _ => break,
        }
      }
      return Ok(value as u8);
    }

    if c == b'x' {
      self.pos += 1;
      let digits_start = self.pos;
      let mut value: u32 = 0;
      while let Some(digit) = self.bytes.get(self.pos).and_then(|&d| (d as char).to_digit(16)) {
        value = value.wrapping_mul(16).wrapping_add(digit);
        self.pos += 1;
      }
      if self.pos == digits_start {
        return Err(CompileError::lex(
          self.loc_at(digits_start - 2, 2),
          "invalid hex escape sequence",
        ));
      }
      return Ok(value as u8);
    }

    self.pos += 1;
    Ok(match c {
      b'a' => 7,
      b'b' => 8,
      b't' => b'\t',
      b'n' => b'\n',
      b'v' => 11,
      b'f' => 12,
      b'r' => b'\r',
      b'e' => 27,
      other => other,
    })
  }
}

/// Resolve an integer literal and the type C gives it.
fn convert_int(text: &str) -> Option<(u64, NumType)> {
  let bytes = text.as_bytes();
  let lower_prefix = text.get(..2).map(str::to_ascii_lowercase);
  let (radix, digits_start) = match lower_prefix.as_deref() {
    Some("0x") if bytes.get(2).is_some_and(u8::is_ascii_hexdigit) => (16, 2),
    Some("0b") if matches!(bytes.get(2), Some(b'0' | b'1')) => (2, 2),
    _ if bytes[0] == b'0' => (8, 0),
    _ => (10, 0),
  };

  let digits_end = digits_start
    + text[digits_start..]
      .chars()
      .take_while(|c| c.is_digit(radix))
      .count();
  let value = u64::from_str_radix(&text[digits_start..digits_end], radix).ok()?;

  let (unsigned, long) = match text[digits_end..].to_ascii_lowercase().as_str() {
    "" => (false, false),
    "u" => (true, false),
    "l" | "ll" => (false, true),
    "ul" | "lu" | "ull" | "llu" => (true, true),
    _ => return None,
  };

  let ty = if unsigned && long {
    NumType::ULong
  } else if long {
    if value >> 63 != 0 {
      NumType::ULong
    } else {
      NumType::Long
    }
  } else if unsigned {
    if value >> 32 != 0 {
      NumType::ULong
    } else {
      NumType::UInt
    }
  } else if radix == 10 {
    if value >> 31 != 0 {
      NumType::Long
    } else {
      NumType::Int
    }
  } else if value >> 63 != 0 {
    NumType::ULong
  } else if value >> 32 != 0 {
    NumType::Long
  } else if value >> 31 != 0 {
    NumType::UInt
  } else {
    NumType::Int
  };
  Some((value, ty))
}

fn convert_float(text: &str) -> Option<(f64, NumType)> {
  let lower = text.to_ascii_lowercase();
  if lower.starts_with("0x") || !(lower.contains('.') || lower.contains('e')) {
    return None;
  }
  let (body, ty) = if let Some(body) = lower.strip_suffix('f') {
    (body, NumType::Float)
  } else if let Some(body) = lower.strip_suffix('l') {
    (body, NumType::Double)
  } else {
    (lower.as_str(), NumType::Double)
  };
  body.parse::<f64>().ok().map(|value| (value, ty))
}

/// Return the slice from the source that produced this token.
pub fn token_text<'a>(token: &Token, source: &'a str) -> &'a str {
  let end = token.loc.offset + token.loc.len;
  &source[token.loc.offset..end]
}

/// Human-friendly description used in diagnostics.
pub fn describe_token(token: &Token, source: &str) -> String {
  match token.kind {
    TokenKind::Eof => "EOF".to_string(),
    _ => token_text(token, source).to_string(),
  }
}
