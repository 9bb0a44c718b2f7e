//! Cursor over the token vector.

use crate::error::{CompileError, CompileResult, Loc};
use crate::tokenizer::{describe_token, token_text, Literal, Token, TokenKind};

pub(crate) struct TokenStream<'a> {
  tokens: Vec<Token>,
  pub(crate) source: &'a str,
  pos: usize,
}

impl<'a> TokenStream<'a> {
  /// Take ownership of the tokens; the parser advances `pos` as it consumes input.
  pub(crate) fn new(tokens: Vec<Token>, source: &'a str) -> Self {
    Self {
      tokens,
      source,
      pos: 0,
    }
  }

  pub(crate) fn peek(&self) -> &Token {
    self.peek_at(0)
  }

  /// Token `n` places ahead, clamped to the trailing `Eof`.
  pub(crate) fn peek_at(&self, n: usize) -> &Token {
    let last = self.tokens.len() - 1;
    &self.tokens[(self.pos + n).min(last)]
  }

  pub(crate) fn loc(&self) -> Loc {
    self.peek().loc
  }

  pub(crate) fn text(&self) -> &'a str {
    token_text(self.peek(), self.source)
  }

  pub(crate) fn position(&self) -> usize {
    self.pos
  }

  pub(crate) fn rewind(&mut self, pos: usize) {
    self.pos = pos;
  }

  pub(crate) fn advance(&mut self) -> Token {
    let token = self.peek().clone();
    if token.kind != TokenKind::Eof {
      self.pos += 1;
    }
    token
  }

  /// Does the current token spell `s` as a punctuator or keyword?
  pub(crate) fn is(&self, s: &str) -> bool {
    self.is_at(0, s)
  }

  pub(crate) fn is_at(&self, n: usize, s: &str) -> bool {
    let token = self.peek_at(n);
    matches!(token.kind, TokenKind::Punct | TokenKind::Keyword)
      && token.loc.len == s.len()
      && token_text(token, self.source) == s
  }

  /// Consume the current token if it matches `s`.
  pub(crate) fn consume(&mut self, s: &str) -> bool {
    if self.is(s) {
      self.pos += 1;
      return true;
    }
    false
  }

  pub(crate) fn expect(&mut self, s: &str) -> CompileResult<()> {
    if self.consume(s) {
      Ok(())
    } else {
      let got = describe_token(self.peek(), self.source);
      Err(self.error(format!("expected \"{s}\", but got \"{got}\"")))
    }
  }

  pub(crate) fn is_ident(&self) -> bool {
    self.peek().kind == TokenKind::Ident
  }

  pub(crate) fn expect_ident(&mut self) -> CompileResult<(String, Loc)> {
    if !self.is_ident() {
      return Err(self.error(format!(
        "expected an identifier, but got \"{}\"",
        describe_token(self.peek(), self.source)
      )));
    }
    let token = self.advance();
    Ok((token_text(&token, self.source).to_string(), token.loc))
  }

  /// Literal of the current token when it is a number.
  pub(crate) fn number(&self) -> Option<&Literal> {
    let token = self.peek();
    (token.kind == TokenKind::Num).then_some(&token.literal)
  }

  pub(crate) fn is_eof(&self) -> bool {
    self.peek().kind == TokenKind::Eof
  }

  pub(crate) fn error(&self, message: impl Into<String>) -> CompileError {
    CompileError::syntax(self.loc(), message)
  }
}
