use super::*;
use crate::ast::{Function, Relocation};
use crate::tokenizer::tokenize;
use crate::ty::TypeKind;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn parse_source(source: &str) -> Program {
  let tokens = tokenize(source).expect("tokenize");
  parse(tokens, source).expect("parse")
}

fn parse_error(source: &str) -> String {
  let tokens = tokenize(source).expect("tokenize");
  match parse(tokens, source) {
    Ok(_) => panic!("expected a compile error for {source:?}"),
    Err(err) => err.to_string(),
  }
}

fn data_of<'p>(program: &'p Program, name: &str) -> &'p [u8] {
  program
    .find(name)
    .and_then(|obj| obj.init_data.as_deref())
    .unwrap_or_else(|| panic!("{name} has no data"))
}

fn ints(values: &[i32]) -> Vec<u8> {
  values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn function<'p>(program: &'p Program, name: &str) -> &'p Function {
  program
    .find(name)
    .and_then(|obj| obj.func.as_ref())
    .unwrap_or_else(|| panic!("{name} is not a defined function"))
}

#[test]
fn struct_members_are_aligned_and_padded() {
  let program = parse_source("struct P { int x; char y; }; int n = sizeof(struct P);");
  assert_eq!(data_of(&program, "n"), ints(&[8]).as_slice());
}

#[test]
fn typedef_of_anonymous_struct() {
  let program = parse_source("typedef struct { long a; char b; } S; S s; int n = _Alignof(S);");
  let s = program.find("s").unwrap();
  assert_eq!(program.types.size(s.ty), 16);
  assert_eq!(data_of(&program, "n"), ints(&[8]).as_slice());
}

#[test]
fn enum_constants_fold_into_array_bounds() {
  let program = parse_source("enum { A, B = 5, C }; char buf[C * 2]; int b = B;");
  let buf = program.find("buf").unwrap();
  assert_eq!(program.types.size(buf.ty), 12);
  assert_eq!(data_of(&program, "b"), ints(&[5]).as_slice());
}

#[test]
fn global_array_initializer() {
  let program = parse_source("int g[3] = {1, 2, 3};");
  assert_eq!(data_of(&program, "g"), ints(&[1, 2, 3]).as_slice());
}

#[test]
fn excess_elements_are_dropped_and_missing_ones_zeroed() {
  let program = parse_source("int a[2] = {1, 2, 3}; int b[3] = {4}; int c = {7};");
  assert_eq!(data_of(&program, "a"), ints(&[1, 2]).as_slice());
  assert_eq!(data_of(&program, "b"), ints(&[4, 0, 0]).as_slice());
  assert_eq!(data_of(&program, "c"), ints(&[7]).as_slice());
}

#[test]
fn array_length_comes_from_the_initializer() {
  let program = parse_source("int a[] = {1, 2, 3, 4,}; char s[] = \"abc\";");
  let a = program.find("a").unwrap();
  assert_eq!(program.types.size(a.ty), 16);
  assert_eq!(data_of(&program, "s"), b"abc\0");
}

#[test]
fn nested_aggregates_without_inner_braces() {
  let program = parse_source("struct { int a; int b; } s[2] = {1, 2, 3, 4};");
  assert_eq!(data_of(&program, "s"), ints(&[1, 2, 3, 4]).as_slice());
}

#[test]
fn union_initializer_fills_the_first_member() {
  let program = parse_source("union U { int a; char b[8]; } u = {258};");
  assert_eq!(data_of(&program, "u"), &[2, 1, 0, 0, 0, 0, 0, 0]);
}

#[test]
fn flexible_array_member_is_sized_by_its_initializer() {
  let program = parse_source("struct F { int n; char tail[]; } f = {2, \"hi\"};");
  let f = program.find("f").unwrap();
  assert_eq!(program.types.size(f.ty), 7);
  assert_eq!(data_of(&program, "f"), &[2, 0, 0, 0, b'h', b'i', 0]);
}

#[test]
fn address_constants_become_relocations() {
  let program = parse_source("int g[3]; int *p = g + 1; int *q = &g[2];");
  let p = program.find("p").unwrap();
  assert_eq!(p.init_data.as_deref(), Some(&[0u8; 8][..]));
  assert_eq!(
    p.relocations,
    vec![Relocation {
      offset: 0,
      label: "g".to_string(),
      addend: 4,
    }]
  );
  assert_eq!(program.find("q").unwrap().relocations[0].addend, 8);
}

#[test]
fn string_literals_are_anonymous_globals() {
  let program = parse_source("char *s = \"hi\";");
  let s = program.find("s").unwrap();
  let label = &s.relocations[0].label;
  assert!(label.starts_with(".L.."));
  let literal = program.find(label).unwrap();
  assert!(literal.is_static);
  assert_eq!(literal.init_data.as_deref(), Some(&b"hi\0"[..]));
}

#[test]
fn floating_globals_store_their_bit_pattern() {
  let program = parse_source("double d = 1.5; float f = 2;");
  assert_eq!(data_of(&program, "d"), 1.5f64.to_le_bytes().as_slice());
  assert_eq!(data_of(&program, "f"), 2.0f32.to_le_bytes().as_slice());
}

#[test]
fn sibling_blocks_share_frame_space() {
  let program = parse_source("int main() { { int a; a = 1; } { long b; b = 2; } return 0; }");
  let main = function(&program, "main");
  let offsets: Vec<i64> = main.locals.iter().map(|&id| program.obj(id).offset).collect();
  assert_eq!(offsets, vec![4, 8]);
  assert_eq!(main.stack_size, 16);
}

#[test]
fn compound_assignment_uses_a_hidden_pointer() {
  let program = parse_source("int main() { int x = 1; x += 2; return x; }");
  let main = function(&program, "main");
  assert_eq!(main.locals.len(), 2);
  let hidden = program.obj(main.locals[1]);
  assert_eq!(hidden.name, "");
  assert_eq!(program.types.kind(hidden.ty), TypeKind::Ptr);
}

#[test]
fn variadic_definition_reserves_a_register_save_area() {
  let program = parse_source("int sum(int n, ...) { return n; }");
  let sum = function(&program, "sum");
  let va = sum.va_area.expect("va area");
  assert_eq!(program.types.size(program.obj(va).ty), 136);
  assert_eq!(sum.stack_size, 144);
}

#[test]
fn register_save_area_is_visible_in_variadic_bodies() {
  let program = parse_source("int sum(int n, ...) { char *p = __va_area__; return n; }");
  let sum = function(&program, "sum");
  let va = sum.va_area.expect("va area");
  assert_eq!(program.obj(va).name, "__va_area__");
}

fn local_offset(program: &Program, func: &Function, name: &str) -> i64 {
  func
    .locals
    .iter()
    .map(|&id| program.obj(id))
    .find(|obj| obj.name == name)
    .unwrap_or_else(|| panic!("no local {name}"))
    .offset
}

#[test]
fn blocks_inside_an_initializer_do_not_overlap_the_variable() {
  let program = parse_source(
    "struct S { int a; int b; }; \
     int main() { struct S s = {5, ({ { long y = 9; } 2; })}; return s.a; }",
  );
  let main = function(&program, "main");
  let s = local_offset(&program, main, "s");
  let y = local_offset(&program, main, "y");
  assert_eq!(s, 8);
  assert!(y >= s + 8, "y at {y} overlaps s at {s}");
}

#[test]
fn declarations_inside_sizeof_are_forgotten() {
  let program = parse_source("int main() { return sizeof(({ int g(void); 1; })); }");
  assert!(program.find("g").is_none());
  assert!(program.functions.iter().all(|id| id.0 < program.objs.len()));
}

#[test]
fn block_scope_tag_refers_to_itself() {
  let program = parse_source(
    "struct N { int v; }; \
     int main() { struct N { struct N *next; int w; } n; n.next = &n; return n.next->w; }",
  );
  let main = function(&program, "main");
  let n = main.locals.iter().map(|&id| program.obj(id)).find(|obj| obj.name == "n").unwrap();
  assert_eq!(program.types.size(n.ty), 16);
}

#[test]
fn floating_conditions_fold_without_truncation() {
  let program = parse_source("int x = 1.5 < 1.7; int y = 0.5 ? 3 : 4; int z = !0.5;");
  assert_eq!(data_of(&program, "x"), ints(&[1]).as_slice());
  assert_eq!(data_of(&program, "y"), ints(&[3]).as_slice());
  assert_eq!(data_of(&program, "z"), ints(&[0]).as_slice());
}

#[test]
fn switch_collects_cases_in_source_order() {
  let program = parse_source(
    "int f(int x) { switch (x) { case 3: return 1; default: return 0; case 1 + 1: return 2; } }",
  );
  let body = &function(&program, "f").body;
  let NodeKind::Block(items) = &body.kind else {
    panic!("function body is not a block");
  };
  let NodeKind::Switch { cases, default, .. } = &items[0].kind else {
    panic!("expected a switch");
  };
  let values: Vec<i64> = cases.iter().map(|(value, _)| *value).collect();
  assert_eq!(values, vec![3, 2]);
  assert!(default.is_some());
}

#[test]
fn prototypes_and_tentative_definitions_merge() {
  let program = parse_source("int f(int); int x; int x = 3; int f(int a) { return a + x; }");
  assert_eq!(data_of(&program, "x"), ints(&[3]).as_slice());
  assert!(program.find("f").unwrap().is_definition);
}

#[test]
fn labels_resolve_forward_and_unused_labels_are_fine() {
  parse_source("int main() { goto out; out: return 0; }");
  parse_source("int main() { unused: return 0; }");
}

#[test]
fn semantic_errors() {
  let cases = [
    ("int main() { goto out; }", "use of undeclared label 'out'"),
    ("int main() { break; }", "stray 'break'"),
    ("int main() { continue; }", "stray 'continue'"),
    ("int main() { case 1: return 0; }", "stray 'case'"),
    ("int main() { return y; }", "undefined variable 'y'"),
    ("int main() { 1 = 2; }", "not an lvalue"),
    ("int main() { void *p; return *p; }", "dereferencing a void pointer"),
    ("int f(int a, int b); int main() { return f(1); }", "too few arguments"),
    ("int f(int a); int main() { return f(1, 2); }", "too many arguments"),
    ("int main() { return g(); }", "implicit declaration of a function 'g'"),
    ("struct S { int a; int a; };", "duplicate member 'a'"),
    ("struct S { int a; }; int main() { struct S s; return s.b; }", "no such member 'b'"),
    ("int main() { int x; switch (x) { case 1: case 1: ; } }", "duplicate case value 1"),
    ("int x = 1; int x = 2;", "redefinition of 'x'"),
    ("int f() { return 0; } int f() { return 1; }", "redefinition of 'f'"),
    ("int a[-1];", "array size is negative"),
    ("void v;", "variable 'v' declared void"),
    ("int main() { int *p; int *q; return p + q; }", "invalid operands to binary expression"),
  ];
  for (source, message) in cases {
    assert_eq!(parse_error(source), message, "{source}");
  }
}

#[test]
fn syntax_errors_name_the_expected_token() {
  assert_eq!(parse_error("int main() { return 0 }"), "expected \";\", but got \"}\"");
}

#[test]
fn local_constant_is_not_a_constant_expression() {
  let message = parse_error("int main() { int n = 3; int a[n]; return 0; }");
  assert_eq!(message, "not a compile-time constant");
}

proptest! {
  #[test]
  fn global_initializers_fold_like_int_arithmetic(
    a in -1000i32..1000,
    b in -1000i32..1000,
    c in 1i32..1000,
  ) {
    let source = format!("int x = {a} + {b} * {c} - ({a} << 3) / {c} % 7;");
    let program = parse_source(&source);
    let expected = ints(&[a + b * c - (a << 3) / c % 7]);
    prop_assert_eq!(data_of(&program, "x"), expected.as_slice());
  }
}
