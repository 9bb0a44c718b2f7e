//! Crate root: wires together the compilation pipeline.
//!
//! - `tokenizer` performs lexical analysis and produces a flat token stream.
//! - `parser` resolves names, types every node and lays out globals and frames.
//! - `eval` folds constant expressions for array bounds, cases and initializers.
//! - `codegen` lowers the typed program into x86-64 Intel-syntax assembly.
//! - `error` centralises reporting utilities shared by the other modules.

pub mod ast;
pub mod config;
pub mod error;
pub mod eval;
pub mod parser;
pub mod scope;
pub mod tokenizer;
pub mod ty;

mod codegen;

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Once;

use snafu::ResultExt;

pub use config::{CodegenOptions, Config};
pub use error::{CompileError, CompileResult};

use error::{CreateSnafu, EmitSnafu, IoSnafu};

/// Tokenize and parse a translation unit.
pub fn parse(source: &str) -> CompileResult<ast::Program> {
  let tokens = tokenizer::tokenize(source)?;
  parser::parse(tokens, source)
}

/// Compile a source string into assembly text.
pub fn generate_assembly(source: &str, options: &CodegenOptions) -> CompileResult<String> {
  let program = parse(source)?;
  codegen::generate(&program, options)
}

/// Read a source file; `-` reads stdin.
pub fn read_source(path: &Path) -> CompileResult<String> {
  if path.as_os_str() == "-" {
    let mut source = String::new();
    std::io::Read::read_to_string(&mut std::io::stdin(), &mut source).context(IoSnafu { path })?;
    return Ok(source);
  }
  std::fs::read_to_string(path).context(IoSnafu { path })
}

/// Open the assembly output file, truncating it if it exists.
pub fn create_output(path: &Path) -> CompileResult<File> {
  File::create(path).context(CreateSnafu { path })
}

/// Compile `source` and write the assembly to `out`.
pub fn compile_to(
  source: &str,
  options: &CodegenOptions,
  out: &mut dyn Write,
) -> CompileResult<()> {
  let asm = generate_assembly(source, options)?;
  out.write_all(asm.as_bytes()).context(EmitSnafu)?;
  out.flush().context(EmitSnafu)
}

static TRACING_INIT: Once = Once::new();

/// Install a stderr subscriber when `RUST_LOG` is set, e.g.
/// `RUST_LOG=tinycc64=debug`. Safe to call more than once.
pub fn init_tracing() {
  TRACING_INIT.call_once(|| {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
      tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(EnvFilter::from_default_env())
        .init();
    }
  });
}
