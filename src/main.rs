use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use clap::Parser;
use tracing::info;

use tinycc64::{compile_to, create_output, init_tracing, read_source, CompileResult, Config};

fn run(config: &Config, source: &str) -> CompileResult<()> {
  let options = config.codegen_options();
  let mut out: Box<dyn Write> = match config.output_path() {
    Some(path) => Box::new(BufWriter::new(create_output(path)?)),
    None => Box::new(io::stdout().lock()),
  };
  compile_to(source, &options, &mut out)
}

fn main() -> ExitCode {
  init_tracing();
  let config = Config::parse();
  let path = config.input.display().to_string();

  let source = match read_source(&config.input) {
    Ok(source) => source,
    Err(err) => {
      eprintln!("{}", err.report(&path, ""));
      return ExitCode::FAILURE;
    }
  };

  match run(&config, &source) {
    Ok(()) => {
      info!(input = %path, "compiled");
      ExitCode::SUCCESS
    }
    Err(err) => {
      eprintln!("{}", err.report(&path, &source));
      ExitCode::FAILURE
    }
  }
}
