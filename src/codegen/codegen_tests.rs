use super::*;
use pretty_assertions::assert_eq;

fn quiet() -> CodegenOptions {
  CodegenOptions {
    debug_loc: false,
    file_name: "t.c".to_string(),
  }
}

fn compile(source: &str) -> String {
  let program = crate::parse(source).expect("parse");
  generate(&program, &quiet()).expect("codegen")
}

fn block(lines: &[&str]) -> String {
  lines.iter().map(|line| format!("    {line}\n")).collect()
}

#[track_caller]
fn assert_contains(asm: &str, needle: &str) {
  assert!(asm.contains(needle), "missing:\n{needle}\nin:\n{asm}");
}

#[test]
fn call_passes_arguments_in_registers() {
  let asm = compile("int add(int a, int b); int main() { return add(3, 4); }");
  assert_contains(
    &asm,
    &block(&[
      "mov rax, 4",
      "push rax",
      "mov rax, 3",
      "push rax",
      "pop rdi",
      "pop rsi",
      "mov rax, 0",
      "call add",
    ]),
  );
}

#[test]
fn function_prologue_and_epilogue() {
  let asm = compile("int main() { return 42; }");
  let expected = format!(
    ".intel_syntax noprefix\n{}main:\n{}.L.return.main:\n{}",
    block(&[".globl main", ".text"]),
    block(&[
      "push rbp",
      "mov rbp, rsp",
      "sub rsp, 0",
      "mov rax, 42",
      "jmp .L.return.main",
      "mov rax, 0",
    ]),
    block(&["mov rsp, rbp", "pop rbp", "ret"]),
  );
  assert_eq!(asm, expected);
}

#[test]
fn parameters_are_spilled_by_size() {
  let asm = compile("long f(char c, short s, int i, long l) { return l; }");
  for reg in ["dil", "si", "edx", "rcx"] {
    assert_contains(&asm, &format!("], {reg}\n"));
  }
}

#[test]
fn initialized_globals_go_to_data() {
  let asm = compile("int g = 5;");
  assert_contains(
    &asm,
    &format!(
      "{}g:\n{}",
      block(&[".data", ".globl g", ".align 4"]),
      block(&[".byte 5", ".byte 0", ".byte 0", ".byte 0"])
    ),
  );
}

#[test]
fn tentative_and_static_globals_go_to_bss() {
  let asm = compile("static long h; char buf[10];");
  assert_contains(
    &asm,
    &format!("{}h:\n{}", block(&[".bss", ".local h", ".align 8"]), block(&[".zero 8"])),
  );
  assert_contains(&asm, &format!("buf:\n{}", block(&[".zero 10"])));
}

#[test]
fn extern_declarations_emit_nothing() {
  let asm = compile("extern int e; int main() { return e; }");
  assert!(!asm.contains("e:\n"));
  assert_contains(&asm, "lea rax, [rip+e]");
}

#[test]
fn pointer_initializers_emit_relocations() {
  let asm = compile("int g[3]; int *p = g + 1; int *q = g;");
  assert_contains(&asm, &format!("p:\n{}", block(&[".quad g+4"])));
  assert_contains(&asm, &format!("q:\n{}", block(&[".quad g+0"])));
}

#[test]
fn floating_literals_load_their_bits() {
  let asm = compile("double d() { return 1.5; } float f() { return 2.5f; }");
  assert_contains(
    &asm,
    &block(&[&format!("mov rax, {}", 1.5f64.to_bits()), "movq xmm0, rax"]),
  );
  assert_contains(
    &asm,
    &block(&[&format!("mov eax, {}", 2.5f32.to_bits()), "movq xmm0, rax"]),
  );
}

#[test]
fn float_comparison_uses_ucomiss() {
  let asm = compile("int lt(float a, float b) { return a < b; }");
  assert_contains(&asm, &block(&["ucomiss xmm1, xmm0", "seta al", "and al, 1", "movzx rax, al"]));
}

#[test]
fn unsigned_division_zero_extends() {
  let asm = compile("unsigned f(unsigned a, unsigned b) { return a / b; }");
  assert_contains(&asm, &block(&["mov edx, 0", "div edi"]));

  let asm = compile("long g(long a, long b) { return a % b; }");
  assert_contains(&asm, &block(&["cqo", "idiv rdi", "mov rax, rdx"]));
}

#[test]
fn variadic_prologue_fills_the_save_area() {
  let source = "int sum(int n, ...) { return n; }";
  let program = crate::parse(source).expect("parse");
  let sum = program.find("sum").and_then(|obj| obj.func.as_ref()).expect("sum");
  let offset = program.obj(sum.va_area.expect("va area")).offset;
  let asm = generate(&program, &quiet()).expect("codegen");

  assert_contains(&asm, &format!("mov QWORD PTR [rbp-{}], rdi\n", offset - 24));
  assert_contains(&asm, &format!("movsd QWORD PTR [rbp-{}], xmm7\n", offset - 128));
  assert_contains(
    &asm,
    &block(&[
      &format!("mov DWORD PTR [rbp-{offset}], 8"),
      &format!("mov DWORD PTR [rbp-{}], 48", offset - 4),
      "lea rax, [rbp+16]",
    ]),
  );
}

#[test]
fn call_at_odd_depth_realigns_the_stack() {
  let asm = compile("int one(); int main() { return one() + 1; }");
  assert_contains(&asm, &block(&["sub rsp, 8", "call one", "add rsp, 8"]));
}

#[test]
fn switch_compares_each_case() {
  let asm = compile(
    "int f(int x) { switch (x) { case 1: return 10; case 2: return 20; } return 0; }",
  );
  assert_contains(&asm, "cmp eax, 1\n");
  assert_contains(&asm, "cmp eax, 2\n");
}

#[test]
fn debug_locations_are_optional() {
  let source = "int main() {\n  return 0;\n}\n";
  let asm = compile(source);
  assert!(!asm.contains(".loc"));
  assert!(!asm.contains(".file"));

  let program = crate::parse(source).expect("parse");
  let asm = generate(&program, &CodegenOptions::default()).expect("codegen");
  assert!(asm.starts_with(".file 1 \"-\"\n.intel_syntax noprefix\n"));
  assert_contains(&asm, ".loc 1 2\n");
}

#[test]
fn for_loop_tests_its_condition_before_every_iteration() {
  let asm = compile("int f(int n) { int s = 0; for (int i = 0; i < n; i++) s += i; return s; }");
  let lines: Vec<&str> = asm.lines().map(str::trim).collect();

  let begin = lines
    .iter()
    .position(|line| line.starts_with(".L.begin.") && line.ends_with(':'))
    .expect("loop head");
  let head = lines[begin].trim_end_matches(':');
  let exit = begin
    + lines[begin..]
      .iter()
      .position(|line| line.starts_with("je "))
      .expect("exit test");
  let brk = lines[exit].trim_start_matches("je ");
  assert_eq!(lines[exit - 1], "cmp eax, 0");

  // The only way back to the head is the back edge, which is followed by the exit label.
  let back_edge = format!("jmp {head}");
  let jumps: Vec<usize> = (0..lines.len()).filter(|&i| lines[i].ends_with(head)).collect();
  assert_eq!(jumps.len(), 1);
  assert_eq!(lines[jumps[0]], back_edge);
  assert!(jumps[0] > exit);
  assert_eq!(lines[jumps[0] + 1], format!("{brk}:"));
}

#[test]
fn sizeof_an_array_emits_no_load() {
  let asm = compile("int main() { int a[10]; return sizeof(a); }");
  assert_contains(&asm, &block(&["mov rax, 40", "jmp .L.return.main"]));
  assert!(!asm.contains("lea rax, [rbp-"));
}

#[test]
fn functions_declared_inside_sizeof_are_not_emitted() {
  let asm = compile("int main() { return sizeof(({ int g(void); 1; })); }");
  assert_contains(&asm, &block(&["mov rax, 4", "jmp .L.return.main"]));
}
