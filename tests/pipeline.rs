//! End-to-end tests through the public API: source text in, assembly or a
//! rendered diagnostic out.

use std::path::{Path, PathBuf};
use std::process::Command;

use pretty_assertions::assert_eq;
use tinycc64::{
  compile_to, create_output, generate_assembly, read_source, CodegenOptions, CompileError,
};

fn options() -> CodegenOptions {
  CodegenOptions {
    debug_loc: false,
    file_name: "test.c".to_string(),
  }
}

fn report(source: &str) -> String {
  match generate_assembly(source, &options()) {
    Ok(asm) => panic!("expected an error, got:\n{asm}"),
    Err(err) => err.report("test.c", source),
  }
}

#[test]
fn compile_to_writes_the_assembly() {
  let source = "int main() { return 0; }";
  let mut out = Vec::new();
  compile_to(source, &options(), &mut out).expect("compile");
  let asm = String::from_utf8(out).expect("utf-8");
  assert_eq!(asm, generate_assembly(source, &options()).expect("compile"));
  assert!(asm.starts_with(".intel_syntax noprefix\n"));
}

#[test]
fn diagnostics_point_at_the_offending_token() {
  assert_eq!(
    report("int main() {\n  return x;\n}\n"),
    format!("test.c:2:   return x;\n{}^ undefined variable 'x'", " ".repeat(19))
  );
  assert_eq!(
    report("int main() { return 0 }"),
    format!(
      "test.c:1: int main() {{ return 0 }}\n{}^ expected \";\", but got \"}}\"",
      " ".repeat(32)
    )
  );
}

#[test]
fn lexical_errors_are_reported() {
  let message = report("int main() { return 0 @ 1; }");
  assert!(message.ends_with("^ invalid token '@'"), "{message}");
}

#[test]
fn missing_input_is_an_io_error() {
  let err = read_source(Path::new("/nonexistent/tinycc64/input.c")).unwrap_err();
  assert!(matches!(err, CompileError::Io { .. }));
  assert!(err.to_string().starts_with("cannot read /nonexistent/tinycc64/input.c"));
}

#[test]
fn unwritable_output_names_the_file() {
  let err = create_output(Path::new("/nonexistent/tinycc64/out.s")).unwrap_err();
  assert!(matches!(err, CompileError::Create { .. }));
  assert!(err.loc().is_none());
  let message = err.report("in.c", "");
  assert!(message.starts_with("in.c: cannot create /nonexistent/tinycc64/out.s: "), "{message}");
}

fn run_program(name: &str, source: &str) -> i32 {
  let dir = std::env::temp_dir().join(format!("tinycc64-{}-{name}", std::process::id()));
  std::fs::create_dir_all(&dir).expect("temp dir");
  let asm_path = dir.join("prog.s");
  let exe_path: PathBuf = dir.join("prog");

  let asm = generate_assembly(source, &options())
    .unwrap_or_else(|err| panic!("{}", err.report(name, source)));
  std::fs::write(&asm_path, asm).expect("write assembly");

  let status = Command::new("cc")
    .arg("-o")
    .arg(&exe_path)
    .arg(&asm_path)
    .status()
    .expect("run cc");
  assert!(status.success(), "cc failed for {name}");

  let status = Command::new(&exe_path).status().expect("run program");
  std::fs::remove_dir_all(&dir).ok();
  status.code().expect("exit code")
}

#[test]
#[ignore = "assembles and runs programs with the system cc"]
fn compiled_programs_run() {
  let cases = [
    ("return", "int main() { return 42; }", 42),
    (
      "fib",
      "int fib(int n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } \
       int main() { return fib(10); }",
      55,
    ),
    (
      "loops",
      "int main() { int a[5]; int s = 0; for (int i = 0; i < 5; i++) a[i] = i * i; \
       int j = 0; while (j < 5) { s += a[j]; j++; } return s; }",
      30,
    ),
    (
      "struct",
      "struct P { char c; long y; }; int main() { struct P p; struct P q; p.c = 3; p.y = 4; q = p; \
       return q.c + q.y + sizeof(struct P); }",
      23,
    ),
    (
      "globals",
      "int g[3] = {1, 2, 3}; int *p = g + 2; char *s = \"hey\"; \
       int main() { return *p + g[0] + s[1]; }",
      105,
    ),
    (
      "floats",
      "double half(double x) { return x / 2; } \
       int main() { float f = 1.5f; return half(9.0) * 2 + (f < 2.0); }",
      10,
    ),
    (
      "switch",
      "int f(int x) { switch (x) { case 1: return 10; case 2: case 3: return 20; \
       default: return 30; } } \
       int main() { return f(1) + f(3) + f(9); }",
      60,
    ),
    (
      "goto",
      "int main() { int i = 0; again: i++; if (i < 7) goto again; return i; }",
      7,
    ),
    (
      "variadic_call",
      "int sprintf(char *buf, char *fmt, ...); int strcmp(char *a, char *b); \
       int main() { char buf[32]; sprintf(buf, \"%d-%.1f\", 7, 2.5); \
       return strcmp(buf, \"7-2.5\") == 0; }",
      1,
    ),
    (
      "unsigned",
      "int main() { unsigned char c = 255; c++; unsigned long big = -1; \
       return c + (big > 0) + (big / 2 > 1); }",
      2,
    ),
  ];

  for (name, source, expected) in cases {
    assert_eq!(run_program(name, source), expected, "{name}");
  }
}
