//! Code generation: lower the typed AST into x86-64 assembly in Intel syntax.
//!
//! The emitter is an accumulator machine. Every expression leaves its value in
//! `rax` (integers and pointers) or `xmm0` (floating point); binary operators
//! park one operand on the machine stack while the other is computed. The
//! number of values currently pushed is tracked so calls can keep `rsp`
//! 16-byte aligned as the System V ABI requires.
//!
//! Locals live below `rbp` at the offsets the parser assigned, globals are
//! addressed `rip`-relative, and arrays, structs and unions are never loaded
//! into a register: their value is their address.

mod cast;

use tracing::{debug, instrument};

use crate::ast::{BinaryOp, Function, Node, NodeKind, Obj, ObjId, Program};
use crate::config::CodegenOptions;
use crate::error::{CompileError, CompileResult};
use crate::ty::{TypeId, TypeKind, Types};

use cast::{conversion, Repr};

const ARGREG8: [&str; 6] = ["dil", "sil", "dl", "cl", "r8b", "r9b"];
const ARGREG16: [&str; 6] = ["di", "si", "dx", "cx", "r8w", "r9w"];
const ARGREG32: [&str; 6] = ["edi", "esi", "edx", "ecx", "r8d", "r9d"];
const ARGREG64: [&str; 6] = ["rdi", "rsi", "rdx", "rcx", "r8", "r9"];
const FP_ARGS: usize = 8;

/// Emit assembly for a whole translation unit.
#[instrument(level = "debug", skip_all, fields(file = %options.file_name))]
pub fn generate(program: &Program, options: &CodegenOptions) -> CompileResult<String> {
  let mut gen = CodeGen {
    program,
    types: &program.types,
    options,
    asm: String::new(),
    depth: 0,
    label_count: 0,
    current_fn: "",
  };

  if options.debug_loc {
    gen.directive(&format!(".file 1 \"{}\"", options.file_name));
  }
  gen.directive(".intel_syntax noprefix");
  gen.emit_data();
  gen.emit_text()?;
  debug!(bytes = gen.asm.len(), "generated assembly");
  Ok(gen.asm)
}

struct CodeGen<'a> {
  program: &'a Program,
  types: &'a Types,
  options: &'a CodegenOptions,
  asm: String,
  /// Values currently pushed on the machine stack.
  depth: usize,
  label_count: usize,
  current_fn: &'a str,
}

impl<'a> CodeGen<'a> {
  fn emit(&mut self, line: &str) {
    self.asm.push_str("    ");
    self.asm.push_str(line);
    self.asm.push('\n');
  }

  fn directive(&mut self, line: &str) {
    self.asm.push_str(line);
    self.asm.push('\n');
  }

  fn label(&mut self, name: &str) {
    self.asm.push_str(name);
    self.asm.push_str(":\n");
  }

  fn next_label(&mut self) -> usize {
    self.label_count += 1;
    self.label_count
  }

  fn obj(&self, id: ObjId) -> &'a Obj {
    self.program.obj(id)
  }

  fn push(&mut self) {
    self.emit("push rax");
    self.depth += 1;
  }

  fn pop(&mut self, reg: &str) {
    self.emit(&format!("pop {reg}"));
    self.depth -= 1;
  }

  fn pushf(&mut self) {
    self.emit("sub rsp, 8");
    self.emit("movsd QWORD PTR [rsp], xmm0");
    self.depth += 1;
  }

  fn popf(&mut self, reg: usize) {
    self.emit(&format!("movsd xmm{reg}, QWORD PTR [rsp]"));
    self.emit("add rsp, 8");
    self.depth -= 1;
  }

  fn loc(&mut self, node: &Node) {
    if self.options.debug_loc {
      self.emit(&format!(".loc 1 {}", node.loc.line));
    }
  }

  fn linkage(&mut self, obj: &Obj) {
    if obj.is_static {
      self.emit(&format!(".local {}", obj.name));
    } else {
      self.emit(&format!(".globl {}", obj.name));
    }
  }

  fn emit_data(&mut self) {
    let program = self.program;
    for &id in &program.globals {
      let obj = program.obj(id);
      if !obj.is_definition {
        continue;
      }
      let size = self.types.size(obj.ty).max(0);

      match &obj.init_data {
        Some(data) => {
          self.emit(".data");
          self.linkage(obj);
          self.emit(&format!(".align {}", obj.align));
          self.label(&obj.name);

          let mut relocations = obj.relocations.iter().peekable();
          let mut pos = 0;
          while pos < size {
            match relocations.peek() {
              Some(rel) if rel.offset == pos => {
                self.emit(&format!(".quad {}{:+}", rel.label, rel.addend));
                relocations.next();
                pos += 8;
              }
              _ => {
                let byte = data.get(pos as usize).copied().unwrap_or(0);
                self.emit(&format!(".byte {byte}"));
                pos += 1;
              }
            }
          }
        }
        None => {
          self.emit(".bss");
          self.linkage(obj);
          self.emit(&format!(".align {}", obj.align));
          self.label(&obj.name);
          self.emit(&format!(".zero {size}"));
        }
      }
    }
  }

  fn emit_text(&mut self) -> CompileResult<()> {
    let program = self.program;
    for &id in &program.functions {
      let obj = program.obj(id);
      let Some(func) = &obj.func else {
        continue;
      };
      self.emit_function(obj, func)?;
    }
    Ok(())
  }

  #[instrument(level = "trace", skip_all, fields(function = %obj.name))]
  fn emit_function(&mut self, obj: &'a Obj, func: &'a Function) -> CompileResult<()> {
    self.current_fn = &obj.name;
    self.linkage(obj);
    self.emit(".text");
    self.label(&obj.name);

    self.emit("push rbp");
    self.emit("mov rbp, rsp");
    self.emit(&format!("sub rsp, {}", func.stack_size));

    if let Some(va) = func.va_area {
      self.emit_va_area(func, self.obj(va).offset);
    }
    self.store_params(func);

    self.gen_stmt(&func.body)?;
    debug_assert_eq!(self.depth, 0, "unbalanced stack in {}", obj.name);

    // Falling off the end of main returns 0.
    if obj.name == "main" {
      self.emit("mov rax, 0");
    }
    self.label(&format!(".L.return.{}", obj.name));
    self.emit("mov rsp, rbp");
    self.emit("pop rbp");
    self.emit("ret");
    Ok(())
  }

  /// Fill the register save area of a variadic function: a 24-byte header
  /// (`gp_offset`, `fp_offset`, overflow area, save area) followed by the six
  /// integer and eight vector argument registers.
  fn emit_va_area(&mut self, func: &Function, offset: i64) {
    let fp = func
      .params
      .iter()
      .filter(|&&id| self.types.is_flonum(self.obj(id).ty))
      .count();
    let gp = func.params.len() - fp;

    for (i, reg) in ARGREG64.iter().enumerate() {
      let slot = offset - 24 - 8 * i as i64;
      self.emit(&format!("mov QWORD PTR [rbp-{slot}], {reg}"));
    }
    for i in 0..FP_ARGS {
      let slot = offset - 72 - 8 * i as i64;
      self.emit(&format!("movsd QWORD PTR [rbp-{slot}], xmm{i}"));
    }

    self.emit(&format!("mov DWORD PTR [rbp-{offset}], {}", gp * 8));
    self.emit(&format!("mov DWORD PTR [rbp-{}], {}", offset - 4, fp * 8 + 48));
    self.emit("lea rax, [rbp+16]");
    self.emit(&format!("mov QWORD PTR [rbp-{}], rax", offset - 8));
    self.emit(&format!("lea rax, [rbp-{}]", offset - 24));
    self.emit(&format!("mov QWORD PTR [rbp-{}], rax", offset - 16));
  }

  fn store_params(&mut self, func: &Function) {
    let (mut gp, mut fp) = (0, 0);
    for &id in &func.params {
      let obj = self.obj(id);
      let offset = obj.offset;
      match self.types.kind(obj.ty) {
        TypeKind::Float => {
          self.emit(&format!("movss DWORD PTR [rbp-{offset}], xmm{fp}"));
          fp += 1;
        }
        TypeKind::Double => {
          self.emit(&format!("movsd QWORD PTR [rbp-{offset}], xmm{fp}"));
          fp += 1;
        }
        _ => {
          let reg = match self.types.size(obj.ty) {
            1 => ARGREG8[gp],
            2 => ARGREG16[gp],
            4 => ARGREG32[gp],
            _ => ARGREG64[gp],
          };
          self.emit(&format!("mov [rbp-{offset}], {reg}"));
          gp += 1;
        }
      }
    }
  }

  fn gen_stmt(&mut self, node: &Node) -> CompileResult<()> {
    self.loc(node);

    match &node.kind {
      NodeKind::Block(items) => {
        for item in items {
          self.gen_stmt(item)?;
        }
      }
      NodeKind::ExprStmt(expr) => self.gen_expr(expr)?,
      NodeKind::Return(expr) => {
        if let Some(expr) = expr {
          self.gen_expr(expr)?;
        }
        self.emit(&format!("jmp .L.return.{}", self.current_fn));
      }
      NodeKind::If { cond, then, els } => {
        let c = self.next_label();
        self.gen_expr(cond)?;
        self.cmp_zero(cond.ty);
        self.emit(&format!("je .L.else.{c}"));
        self.gen_stmt(then)?;
        self.emit(&format!("jmp .L.end.{c}"));
        self.label(&format!(".L.else.{c}"));
        if let Some(els) = els {
          self.gen_stmt(els)?;
        }
        self.label(&format!(".L.end.{c}"));
      }
      NodeKind::For {
        init,
        cond,
        inc,
        body,
        brk,
        cont,
      } => {
        let c = self.next_label();
        if let Some(init) = init {
          self.gen_stmt(init)?;
        }
        self.label(&format!(".L.begin.{c}"));
        if let Some(cond) = cond {
          self.gen_expr(cond)?;
          self.cmp_zero(cond.ty);
          self.emit(&format!("je {brk}"));
        }
        self.gen_stmt(body)?;
        self.label(cont);
        if let Some(inc) = inc {
          self.gen_expr(inc)?;
        }
        self.emit(&format!("jmp .L.begin.{c}"));
        self.label(brk);
      }
      NodeKind::While { cond, body, brk, cont } => {
        self.label(cont);
        self.gen_expr(cond)?;
        self.cmp_zero(cond.ty);
        self.emit(&format!("je {brk}"));
        self.gen_stmt(body)?;
        self.emit(&format!("jmp {cont}"));
        self.label(brk);
      }
      NodeKind::DoWhile { body, cond, brk, cont } => {
        let c = self.next_label();
        self.label(&format!(".L.begin.{c}"));
        self.gen_stmt(body)?;
        self.label(cont);
        self.gen_expr(cond)?;
        self.cmp_zero(cond.ty);
        self.emit(&format!("jne .L.begin.{c}"));
        self.label(brk);
      }
      NodeKind::Switch {
        cond,
        body,
        cases,
        default,
        brk,
      } => {
        self.gen_expr(cond)?;
        let wide = self.types.size(cond.ty) == 8;
        for (value, label) in cases {
          if !wide {
            self.emit(&format!("cmp eax, {}", *value as i32));
          } else if i32::try_from(*value).is_ok() {
            self.emit(&format!("cmp rax, {value}"));
          } else {
            self.emit(&format!("mov rdi, {value}"));
            self.emit("cmp rax, rdi");
          }
          self.emit(&format!("je {label}"));
        }
        match default {
          Some(label) => self.emit(&format!("jmp {label}")),
          None => self.emit(&format!("jmp {brk}")),
        }
        self.gen_stmt(body)?;
        self.label(brk);
      }
      NodeKind::Case { label, body } | NodeKind::Label { label, body } => {
        self.label(label);
        self.gen_stmt(body)?;
      }
      NodeKind::Goto(label) => self.emit(&format!("jmp {label}")),
      _ => return Err(CompileError::semantic(node.loc, "invalid statement")),
    }
    Ok(())
  }

  fn gen_expr(&mut self, node: &Node) -> CompileResult<()> {
    self.loc(node);

    match &node.kind {
      NodeKind::NullExpr => {}
      NodeKind::Num(value) => self.emit(&format!("mov rax, {value}")),
      NodeKind::FNum(value) => {
        if self.types.kind(node.ty) == TypeKind::Float {
          self.emit(&format!("mov eax, {}", (*value as f32).to_bits()));
        } else {
          self.emit(&format!("mov rax, {}", value.to_bits()));
        }
        self.emit("movq xmm0, rax");
      }
      NodeKind::Neg(operand) => {
        self.gen_expr(operand)?;
        match self.types.kind(node.ty) {
          TypeKind::Float => {
            self.emit("mov rax, 0x80000000");
            self.emit("movq xmm1, rax");
            self.emit("xorps xmm0, xmm1");
          }
          TypeKind::Double => {
            self.emit("mov rax, 0x8000000000000000");
            self.emit("movq xmm1, rax");
            self.emit("xorpd xmm0, xmm1");
          }
          _ => self.emit("neg rax"),
        }
      }
      NodeKind::Var(_) | NodeKind::Member { .. } => {
        self.gen_addr(node)?;
        self.load(node.ty);
      }
      NodeKind::Deref(operand) => {
        self.gen_expr(operand)?;
        self.load(node.ty);
      }
      NodeKind::Addr(operand) => self.gen_addr(operand)?,
      NodeKind::Assign(lhs, rhs) => {
        self.gen_addr(lhs)?;
        self.push();
        self.gen_expr(rhs)?;
        self.store(node.ty);
      }
      NodeKind::StmtExpr(items) => {
        for item in items {
          self.gen_stmt(item)?;
        }
      }
      NodeKind::Comma(lhs, rhs) => {
        self.gen_expr(lhs)?;
        self.gen_expr(rhs)?;
      }
      NodeKind::Cast(operand) => {
        self.gen_expr(operand)?;
        self.cast(operand.ty, node.ty);
      }
      NodeKind::MemZero(id) => {
        let obj = self.obj(*id);
        self.emit(&format!("mov rcx, {}", self.types.size(obj.ty)));
        self.emit(&format!("lea rdi, [rbp-{}]", obj.offset));
        self.emit("mov al, 0");
        self.emit("rep stosb");
      }
      NodeKind::Cond { cond, then, els } => {
        let c = self.next_label();
        self.gen_expr(cond)?;
        self.cmp_zero(cond.ty);
        self.emit(&format!("je .L.else.{c}"));
        self.gen_expr(then)?;
        self.emit(&format!("jmp .L.end.{c}"));
        self.label(&format!(".L.else.{c}"));
        self.gen_expr(els)?;
        self.label(&format!(".L.end.{c}"));
      }
      NodeKind::Not(operand) => {
        self.gen_expr(operand)?;
        self.cmp_zero(operand.ty);
        self.emit("sete al");
        self.emit("movzx rax, al");
      }
      NodeKind::BitNot(operand) => {
        self.gen_expr(operand)?;
        self.emit("not rax");
      }
      NodeKind::LogAnd(lhs, rhs) => {
        let c = self.next_label();
        self.gen_expr(lhs)?;
        self.cmp_zero(lhs.ty);
        self.emit(&format!("je .L.false.{c}"));
        self.gen_expr(rhs)?;
        self.cmp_zero(rhs.ty);
        self.emit(&format!("je .L.false.{c}"));
        self.emit("mov rax, 1");
        self.emit(&format!("jmp .L.end.{c}"));
        self.label(&format!(".L.false.{c}"));
        self.emit("mov rax, 0");
        self.label(&format!(".L.end.{c}"));
      }
      NodeKind::LogOr(lhs, rhs) => {
        let c = self.next_label();
        self.gen_expr(lhs)?;
        self.cmp_zero(lhs.ty);
        self.emit(&format!("jne .L.true.{c}"));
        self.gen_expr(rhs)?;
        self.cmp_zero(rhs.ty);
        self.emit(&format!("jne .L.true.{c}"));
        self.emit("mov rax, 0");
        self.emit(&format!("jmp .L.end.{c}"));
        self.label(&format!(".L.true.{c}"));
        self.emit("mov rax, 1");
        self.label(&format!(".L.end.{c}"));
      }
      NodeKind::Call { name, args, .. } => self.gen_call(node, name, args)?,
      NodeKind::Binary { op, lhs, rhs } => {
        if self.types.is_flonum(lhs.ty) {
          self.gen_float_binary(*op, lhs, rhs)?;
        } else {
          self.gen_int_binary(node, *op, lhs, rhs)?;
        }
      }
      _ => return Err(CompileError::semantic(node.loc, "invalid expression")),
    }
    Ok(())
  }

  /// Leave the address of an lvalue in `rax`.
  fn gen_addr(&mut self, node: &Node) -> CompileResult<()> {
    match &node.kind {
      NodeKind::Var(id) => {
        let obj = self.obj(*id);
        if obj.is_global {
          self.emit(&format!("lea rax, [rip+{}]", obj.name));
        } else {
          self.emit(&format!("lea rax, [rbp-{}]", obj.offset));
        }
      }
      NodeKind::Deref(operand) => self.gen_expr(operand)?,
      NodeKind::Comma(lhs, rhs) => {
        self.gen_expr(lhs)?;
        self.gen_addr(rhs)?;
      }
      NodeKind::Member { base, offset } => {
        self.gen_addr(base)?;
        self.emit(&format!("add rax, {offset}"));
      }
      _ => return Err(CompileError::semantic(node.loc, "not an lvalue")),
    }
    Ok(())
  }

  /// Replace the address in `rax` by the value it points to.
  fn load(&mut self, ty: TypeId) {
    match self.types.kind(ty) {
      TypeKind::Array | TypeKind::Struct | TypeKind::Union | TypeKind::Func => return,
      TypeKind::Float => return self.emit("movss xmm0, DWORD PTR [rax]"),
      TypeKind::Double => return self.emit("movsd xmm0, QWORD PTR [rax]"),
      _ => {}
    }

    let unsigned = self.types.is_unsigned(ty);
    match (self.types.size(ty), unsigned) {
      (1, true) => self.emit("movzx eax, BYTE PTR [rax]"),
      (1, false) => self.emit("movsx eax, BYTE PTR [rax]"),
      (2, true) => self.emit("movzx eax, WORD PTR [rax]"),
      (2, false) => self.emit("movsx eax, WORD PTR [rax]"),
      (4, true) => self.emit("mov eax, DWORD PTR [rax]"),
      (4, false) => self.emit("movsxd rax, DWORD PTR [rax]"),
      _ => self.emit("mov rax, QWORD PTR [rax]"),
    }
  }

  /// Store the value in `rax`/`xmm0` to the address on top of the stack.
  fn store(&mut self, ty: TypeId) {
    self.pop("rdi");

    match self.types.kind(ty) {
      TypeKind::Struct | TypeKind::Union => {
        for i in 0..self.types.size(ty) {
          self.emit(&format!("mov r8b, [rax+{i}]"));
          self.emit(&format!("mov [rdi+{i}], r8b"));
        }
        return;
      }
      TypeKind::Float => return self.emit("movss DWORD PTR [rdi], xmm0"),
      TypeKind::Double => return self.emit("movsd QWORD PTR [rdi], xmm0"),
      _ => {}
    }

    match self.types.size(ty) {
      1 => self.emit("mov [rdi], al"),
      2 => self.emit("mov [rdi], ax"),
      4 => self.emit("mov [rdi], eax"),
      _ => self.emit("mov [rdi], rax"),
    }
  }

  fn cmp_zero(&mut self, ty: TypeId) {
    match self.types.kind(ty) {
      TypeKind::Float => {
        self.emit("xorps xmm1, xmm1");
        self.emit("ucomiss xmm0, xmm1");
      }
      TypeKind::Double => {
        self.emit("xorpd xmm1, xmm1");
        self.emit("ucomisd xmm0, xmm1");
      }
      _ if self.types.is_integer(ty) && self.types.size(ty) <= 4 => self.emit("cmp eax, 0"),
      _ => self.emit("cmp rax, 0"),
    }
  }

  fn cast(&mut self, from: TypeId, to: TypeId) {
    match self.types.kind(to) {
      TypeKind::Void => return,
      TypeKind::Bool => {
        self.cmp_zero(from);
        self.emit("setne al");
        self.emit("movzx eax, al");
        return;
      }
      _ => {}
    }
    let from = Repr::of(self.types, from);
    let to = Repr::of(self.types, to);
    for line in conversion(from, to) {
      self.emit(line);
    }
  }

  fn gen_call(&mut self, node: &Node, name: &str, args: &[Node]) -> CompileResult<()> {
    // Evaluated right to left so the first argument ends up on top.
    for arg in args.iter().rev() {
      self.gen_expr(arg)?;
      if self.types.is_flonum(arg.ty) {
        self.pushf();
      } else {
        self.push();
      }
    }

    let (mut gp, mut fp) = (0, 0);
    for arg in args {
      if self.types.is_flonum(arg.ty) {
        self.popf(fp);
        fp += 1;
      } else {
        self.pop(ARGREG64[gp]);
        gp += 1;
      }
    }

    self.emit(&format!("mov rax, {fp}"));
    if self.depth % 2 == 1 {
      self.emit("sub rsp, 8");
      self.emit(&format!("call {name}"));
      self.emit("add rsp, 8");
    } else {
      self.emit(&format!("call {name}"));
    }

    // The callee only defines the low bits of a narrow return value.
    let unsigned = self.types.is_unsigned(node.ty);
    match self.types.kind(node.ty) {
      TypeKind::Bool => self.emit("movzx eax, al"),
      TypeKind::Char if unsigned => self.emit("movzx eax, al"),
      TypeKind::Char => self.emit("movsx eax, al"),
      TypeKind::Short if unsigned => self.emit("movzx eax, ax"),
      TypeKind::Short => self.emit("movsx eax, ax"),
      _ => {}
    }
    Ok(())
  }

  fn gen_float_binary(&mut self, op: BinaryOp, lhs: &Node, rhs: &Node) -> CompileResult<()> {
    self.gen_expr(rhs)?;
    self.pushf();
    self.gen_expr(lhs)?;
    self.popf(1);

    let sz = if self.types.kind(lhs.ty) == TypeKind::Float {
      "ss"
    } else {
      "sd"
    };
    match op {
      BinaryOp::Add => self.emit(&format!("add{sz} xmm0, xmm1")),
      BinaryOp::Sub => self.emit(&format!("sub{sz} xmm0, xmm1")),
      BinaryOp::Mul => self.emit(&format!("mul{sz} xmm0, xmm1")),
      BinaryOp::Div => self.emit(&format!("div{sz} xmm0, xmm1")),
      BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le => {
        self.emit(&format!("ucomi{sz} xmm1, xmm0"));
        match op {
          BinaryOp::Eq => {
            self.emit("sete al");
            self.emit("setnp dl");
            self.emit("and al, dl");
          }
          BinaryOp::Ne => {
            self.emit("setne al");
            self.emit("setp dl");
            self.emit("or al, dl");
          }
          BinaryOp::Lt => self.emit("seta al"),
          _ => self.emit("setae al"),
        }
        self.emit("and al, 1");
        self.emit("movzx rax, al");
      }
      _ => return Err(CompileError::semantic(lhs.loc, "invalid floating-point operation")),
    }
    Ok(())
  }

  fn gen_int_binary(
    &mut self,
    node: &Node,
    op: BinaryOp,
    lhs: &Node,
    rhs: &Node,
  ) -> CompileResult<()> {
    self.gen_expr(rhs)?;
    self.push();
    self.gen_expr(lhs)?;
    self.pop("rdi");

    let wide = self.types.size(lhs.ty) == 8 || self.types.base(lhs.ty).is_some();
    let (ax, di, dx) = if wide {
      ("rax", "rdi", "rdx")
    } else {
      ("eax", "edi", "edx")
    };

    match op {
      BinaryOp::Add => self.emit(&format!("add {ax}, {di}")),
      BinaryOp::Sub => self.emit(&format!("sub {ax}, {di}")),
      BinaryOp::Mul => self.emit(&format!("imul {ax}, {di}")),
      BinaryOp::Div | BinaryOp::Mod => {
        if self.types.is_unsigned(node.ty) {
          self.emit(&format!("mov {dx}, 0"));
          self.emit(&format!("div {di}"));
        } else {
          self.emit(if wide { "cqo" } else { "cdq" });
          self.emit(&format!("idiv {di}"));
        }
        if op == BinaryOp::Mod {
          self.emit("mov rax, rdx");
        }
      }
      BinaryOp::BitAnd => self.emit(&format!("and {ax}, {di}")),
      BinaryOp::BitOr => self.emit(&format!("or {ax}, {di}")),
      BinaryOp::BitXor => self.emit(&format!("xor {ax}, {di}")),
      BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le => {
        self.emit(&format!("cmp {ax}, {di}"));
        let unsigned = self.types.is_unsigned(lhs.ty);
        let set = match op {
          BinaryOp::Eq => "sete",
          BinaryOp::Ne => "setne",
          BinaryOp::Lt if unsigned => "setb",
          BinaryOp::Lt => "setl",
          _ if unsigned => "setbe",
          _ => "setle",
        };
        self.emit(&format!("{set} al"));
        self.emit("movzx rax, al");
      }
      BinaryOp::Shl => {
        self.emit("mov rcx, rdi");
        self.emit(&format!("shl {ax}, cl"));
      }
      BinaryOp::Shr => {
        self.emit("mov rcx, rdi");
        if self.types.is_unsigned(lhs.ty) {
          self.emit(&format!("shr {ax}, cl"));
        } else {
          self.emit(&format!("sar {ax}, cl"));
        }
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod codegen_tests;
