//! Shared error utilities used across the compilation pipeline.
//!
//! Every stage fails fast: the first problem found becomes a `CompileError`
//! that unwinds to the driver. Diagnostics follow the chibicc style of
//! echoing the offending source line and pointing at the byte with a caret.

use std::path::PathBuf;

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

/// Byte span of a token plus the 1-based line it starts on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Loc {
  pub offset: usize,
  pub len: usize,
  pub line: usize,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CompileError {
  #[snafu(display("{message}"))]
  Lex { loc: Loc, message: String },

  #[snafu(display("{message}"))]
  Syntax { loc: Loc, message: String },

  #[snafu(display("{message}"))]
  Semantic { loc: Loc, message: String },

  #[snafu(display("not a compile-time constant"))]
  NotConstant { loc: Loc },

  #[snafu(display("cannot read {}: {source}", path.display()))]
  Io {
    path: PathBuf,
    source: std::io::Error,
  },

  #[snafu(display("cannot create {}: {source}", path.display()))]
  Create {
    path: PathBuf,
    source: std::io::Error,
  },

  #[snafu(display("cannot write assembly: {source}"))]
  Emit { source: std::io::Error },
}

impl CompileError {
  pub fn lex(loc: Loc, message: impl Into<String>) -> Self {
    Self::Lex {
      loc,
      message: message.into(),
    }
  }

  pub fn syntax(loc: Loc, message: impl Into<String>) -> Self {
    Self::Syntax {
      loc,
      message: message.into(),
    }
  }

  pub fn semantic(loc: Loc, message: impl Into<String>) -> Self {
    Self::Semantic {
      loc,
      message: message.into(),
    }
  }

  /// Source position the error points at, if it came from compilation.
  pub fn loc(&self) -> Option<Loc> {
    match self {
      Self::Lex { loc, .. }
      | Self::Syntax { loc, .. }
      | Self::Semantic { loc, .. }
      | Self::NotConstant { loc } => Some(*loc),
      Self::Io { .. } | Self::Create { .. } | Self::Emit { .. } => None,
    }
  }

  /// Render the diagnostic as `path:line: <source line>` followed by a caret
  /// under the offending byte and the message.
  pub fn report(&self, path: &str, source: &str) -> String {
    let Some(loc) = self.loc() else {
      return format!("{path}: {self}");
    };

    let offset = loc.offset.min(source.len());
    let line_start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
    let line_end = source[offset..]
      .find('\n')
      .map_or(source.len(), |i| offset + i);

    let prefix = format!("{path}:{}: ", loc.line);
    let column = source[line_start..offset].chars().count();
    let indent = " ".repeat(prefix.chars().count() + column);
    format!("{prefix}{}\n{indent}^ {self}", &source[line_start..line_end])
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn report_points_at_the_offending_byte() {
    let source = "int x;\nint y = @;\n";
    let err = CompileError::lex(
      Loc {
        offset: 15,
        len: 1,
        line: 2,
      },
      "invalid token",
    );
    assert_eq!(
      err.report("a.c", source),
      "a.c:2: int y = @;\n               ^ invalid token"
    );
  }

  #[test]
  fn io_errors_have_no_caret() {
    let err = CompileError::Emit {
      source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"),
    };
    assert!(err.loc().is_none());
    assert_eq!(err.report("x.c", ""), "x.c: cannot write assembly: closed");
  }
}
