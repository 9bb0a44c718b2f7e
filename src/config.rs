//! Command-line configuration and the options handed to code generation.

use std::path::{Path, PathBuf};

use clap::Parser;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
  /// Preprocessed C source file.
  pub input: PathBuf,

  /// Where to write the assembly; `-` or no value means stdout.
  #[arg(short, long)]
  pub output: Option<PathBuf>,

  /// Omit `.file` and `.loc` debug line directives.
  #[arg(long)]
  pub no_debug_loc: bool,
}

impl Config {
  /// Output path, or `None` for stdout.
  pub fn output_path(&self) -> Option<&Path> {
    self
      .output
      .as_deref()
      .filter(|path| path.as_os_str() != "-")
  }

  pub fn codegen_options(&self) -> CodegenOptions {
    CodegenOptions {
      debug_loc: !self.no_debug_loc,
      file_name: self.input.display().to_string(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenOptions {
  /// Emit `.file 1 "<file_name>"` and a `.loc` before statements and expressions.
  pub debug_loc: bool,
  pub file_name: String,
}

impl Default for CodegenOptions {
  fn default() -> Self {
    Self {
      debug_loc: true,
      file_name: "-".to_string(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn parses_flags_and_output() {
    let config = Config::parse_from(["tinycc64", "--no-debug-loc", "-o", "out.s", "prog.c"]);
    assert_eq!(config.input, PathBuf::from("prog.c"));
    assert_eq!(config.output_path(), Some(Path::new("out.s")));
    assert_eq!(
      config.codegen_options(),
      CodegenOptions {
        debug_loc: false,
        file_name: "prog.c".to_string(),
      }
    );
  }

  #[test]
  fn dash_means_stdout() {
    let config = Config::parse_from(["tinycc64", "-o", "-", "prog.c"]);
    assert_eq!(config.output_path(), None);
    assert!(config.codegen_options().debug_loc);
  }
}
