//! Expressions, from the comma operator down to primaries.
//!
//! Each builder types the node it creates and inserts the implicit casts C
//! requires, so a returned [`Node`] is always fully typed.

use super::Parser;
use crate::ast::{BinaryOp, Node, NodeKind};
use crate::error::{CompileResult, Loc};
use crate::eval::Evaluator;
use crate::scope::Binding;
use crate::tokenizer::{Literal, NumType, TokenKind};
use crate::ty::{TypeId, TypeKind};

const MAX_GP_ARGS: usize = 6;
const MAX_FP_ARGS: usize = 8;

const COMPOUND_ASSIGN: &[(&str, BinaryOp)] = &[
  ("+=", BinaryOp::Add),
  ("-=", BinaryOp::Sub),
  ("*=", BinaryOp::Mul),
  ("/=", BinaryOp::Div),
  ("%=", BinaryOp::Mod),
  ("&=", BinaryOp::BitAnd),
  ("|=", BinaryOp::BitOr),
  ("^=", BinaryOp::BitXor),
  ("<<=", BinaryOp::Shl),
  (">>=", BinaryOp::Shr),
];

fn literal_type(ty: NumType) -> TypeId {
  match ty {
    NumType::Int => TypeId::INT,
    NumType::UInt => TypeId::UINT,
    NumType::Long => TypeId::LONG,
    NumType::ULong => TypeId::ULONG,
    NumType::Float => TypeId::FLOAT,
    NumType::Double => TypeId::DOUBLE,
  }
}

impl<'a> Parser<'a> {
  /// Current token if it is one of `ops`.
  fn match_punct(&self, ops: &[&'static str]) -> Option<&'static str> {
    if self.stream.peek().kind != TokenKind::Punct {
      return None;
    }
    ops.iter().copied().find(|op| self.stream.is(op))
  }

  /// expr = assign ("," expr)?
  pub(super) fn expr(&mut self) -> CompileResult<Node> {
    let node = self.assign()?;
    let loc = self.stream.loc();
    if self.stream.consume(",") {
      let rhs = self.expr()?;
      let ty = rhs.ty;
      return Ok(Node::new(NodeKind::Comma(Box::new(node), Box::new(rhs)), ty, loc));
    }
    Ok(node)
  }

  /// assign = conditional (assign-op assign)?
  pub(super) fn assign(&mut self) -> CompileResult<Node> {
    let node = self.conditional()?;
    let loc = self.stream.loc();

    if self.stream.consume("=") {
      let rhs = self.assign()?;
      return self.new_assign(node, rhs, loc);
    }

    for &(op_str, op) in COMPOUND_ASSIGN {
      if self.stream.consume(op_str) {
        let rhs = self.assign()?;
        return self.compound_assign(node, op, rhs, loc);
      }
    }
    Ok(node)
  }

  /// conditional = log-or ("?" expr ":" conditional)?
  fn conditional(&mut self) -> CompileResult<Node> {
    let cond = self.log_or()?;
    let loc = self.stream.loc();
    if !self.stream.consume("?") {
      return Ok(cond);
    }
    self.check_scalar(&cond)?;

    let then = self.expr()?;
    self.stream.expect(":")?;
    let els = self.conditional()?;

    let is_void = |ty: TypeId| self.types.kind(ty) == TypeKind::Void;
    let (then, els, ty) = if is_void(then.ty) || is_void(els.ty) {
      (then, els, TypeId::VOID)
    } else if self.types.is_aggregate(then.ty) || self.types.is_aggregate(els.ty) {
      if !self.types.is_compatible(then.ty, els.ty) {
        return Err(self.semantic(loc, "mismatched operand types in conditional expression"));
      }
      let ty = then.ty;
      (then, els, ty)
    } else {
      let (then, els) = self.usual_arith_conv(then, els);
      let ty = then.ty;
      (then, els, ty)
    };

    Ok(Node::new(
      NodeKind::Cond {
        cond: Box::new(cond),
        then: Box::new(then),
        els: Box::new(els),
      },
      ty,
      loc,
    ))
  }

  fn log_or(&mut self) -> CompileResult<Node> {
    let mut node = self.log_and()?;
    loop {
      let loc = self.stream.loc();
      if !self.stream.consume("||") {
        return Ok(node);
      }
      let rhs = self.log_and()?;
      self.check_scalar(&node)?;
      self.check_scalar(&rhs)?;
      node = Node::new(NodeKind::LogOr(Box::new(node), Box::new(rhs)), TypeId::INT, loc);
    }
  }

  fn log_and(&mut self) -> CompileResult<Node> {
    let mut node = self.bit_or()?;
    loop {
      let loc = self.stream.loc();
      if !self.stream.consume("&&") {
        return Ok(node);
      }
      let rhs = self.bit_or()?;
      self.check_scalar(&node)?;
      self.check_scalar(&rhs)?;
      node = Node::new(NodeKind::LogAnd(Box::new(node), Box::new(rhs)), TypeId::INT, loc);
    }
  }

  fn bit_or(&mut self) -> CompileResult<Node> {
    let mut node = self.bit_xor()?;
    loop {
      let loc = self.stream.loc();
      if !self.stream.consume("|") {
        return Ok(node);
      }
      let rhs = self.bit_xor()?;
      node = self.new_binary(BinaryOp::BitOr, node, rhs, loc)?;
    }
  }

  fn bit_xor(&mut self) -> CompileResult<Node> {
    let mut node = self.bit_and()?;
    loop {
      let loc = self.stream.loc();
      if !self.stream.consume("^") {
        return Ok(node);
      }
      let rhs = self.bit_and()?;
      node = self.new_binary(BinaryOp::BitXor, node, rhs, loc)?;
    }
  }

  fn bit_and(&mut self) -> CompileResult<Node> {
    let mut node = self.equality()?;
    loop {
      let loc = self.stream.loc();
      if !self.stream.consume("&") {
        return Ok(node);
      }
      let rhs = self.equality()?;
      node = self.new_binary(BinaryOp::BitAnd, node, rhs, loc)?;
    }
  }

  fn equality(&mut self) -> CompileResult<Node> {
    let mut node = self.relational()?;
    loop {
      let loc = self.stream.loc();
      let op = match self.match_punct(&["==", "!="]) {
        Some("==") => BinaryOp::Eq,
        Some(_) => BinaryOp::Ne,
        None => return Ok(node),
      };
      self.stream.advance();
      let rhs = self.relational()?;
      node = self.new_binary(op, node, rhs, loc)?;
    }
  }

  /// `a > b` and `a >= b` are built as `b < a` and `b <= a`.
  fn relational(&mut self) -> CompileResult<Node> {
    let mut node = self.shift()?;
    loop {
      let loc = self.stream.loc();
      let Some(op_str) = self.match_punct(&["<", "<=", ">", ">="]) else {
        return Ok(node);
      };
      self.stream.advance();
      let rhs = self.shift()?;
      node = match op_str {
        "<" => self.new_binary(BinaryOp::Lt, node, rhs, loc)?,
        "<=" => self.new_binary(BinaryOp::Le, node, rhs, loc)?,
        ">" => self.new_binary(BinaryOp::Lt, rhs, node, loc)?,
        _ => self.new_binary(BinaryOp::Le, rhs, node, loc)?,
      };
    }
  }

  fn shift(&mut self) -> CompileResult<Node> {
    let mut node = self.add()?;
    loop {
      let loc = self.stream.loc();
      let op = match self.match_punct(&["<<", ">>"]) {
        Some("<<") => BinaryOp::Shl,
        Some(_) => BinaryOp::Shr,
        None => return Ok(node),
      };
      self.stream.advance();
      let rhs = self.add()?;
      node = self.new_binary(op, node, rhs, loc)?;
    }
  }

  fn add(&mut self) -> CompileResult<Node> {
    let mut node = self.mul()?;
    loop {
      let loc = self.stream.loc();
      let op = match self.match_punct(&["+", "-"]) {
        Some("+") => BinaryOp::Add,
        Some(_) => BinaryOp::Sub,
        None => return Ok(node),
      };
      self.stream.advance();
      let rhs = self.mul()?;
      node = self.new_binary(op, node, rhs, loc)?;
    }
  }

  fn mul(&mut self) -> CompileResult<Node> {
    let mut node = self.cast()?;
    loop {
      let loc = self.stream.loc();
      let op = match self.match_punct(&["*", "/", "%"]) {
        Some("*") => BinaryOp::Mul,
        Some("/") => BinaryOp::Div,
        Some(_) => BinaryOp::Mod,
        None => return Ok(node),
      };
      self.stream.advance();
      let rhs = self.cast()?;
      node = self.new_binary(op, node, rhs, loc)?;
    }
  }

  /// cast = "(" type-name ")" cast | unary
  fn cast(&mut self) -> CompileResult<Node> {
    if self.stream.is("(") && self.is_typename_at(1) {
      let loc = self.stream.loc();
      self.stream.advance();
      let ty = self.typename()?;
      self.stream.expect(")")?;
      let operand = self.cast()?;
      if self.types.is_aggregate(ty) || self.types.is_aggregate(operand.ty) {
        return Err(self.semantic(loc, "cannot cast to or from a struct or union"));
      }
      if self.types.kind(ty) == TypeKind::Array {
        return Err(self.semantic(loc, "cannot cast to an array type"));
      }
      return Ok(Node::new(NodeKind::Cast(Box::new(operand)), ty, loc));
    }
    self.unary()
  }

  fn unary(&mut self) -> CompileResult<Node> {
    let loc = self.stream.loc();

    if self.stream.is("sizeof") || self.stream.is("_Alignof") {
      let is_sizeof = self.stream.is("sizeof");
      self.stream.advance();
      let ty = self.sizeof_operand()?;
      let value = if is_sizeof {
        self.types.size(ty)
      } else {
        self.types.align(ty)
      };
      if value < 0 {
        return Err(self.semantic(loc, "invalid application of 'sizeof' to an incomplete type"));
      }
      return Ok(Node::new(NodeKind::Num(value), TypeId::ULONG, loc));
    }

    let Some(op) = self.match_punct(&["+", "-", "&", "*", "!", "~", "++", "--"]) else {
      return self.postfix();
    };
    self.stream.advance();

    match op {
      "+" => self.cast(),
      "-" => {
        let operand = self.cast()?;
        if !self.types.is_numeric(operand.ty) {
          return Err(self.semantic(loc, "invalid argument type to unary minus"));
        }
        let ty = self.types.common_type(TypeId::INT, operand.ty);
        let operand = self.new_cast(operand, ty);
        Ok(Node::new(NodeKind::Neg(Box::new(operand)), ty, loc))
      }
      "&" => {
        let operand = self.cast()?;
        self.new_addr(operand, loc)
      }
      "*" => {
        let operand = self.cast()?;
        self.new_deref(operand, loc)
      }
      "!" => {
        let operand = self.cast()?;
        self.check_scalar(&operand)?;
        Ok(Node::new(NodeKind::Not(Box::new(operand)), TypeId::INT, loc))
      }
      "~" => {
        let operand = self.cast()?;
        if !self.types.is_integer(operand.ty) {
          return Err(self.semantic(loc, "invalid argument type to bitwise complement"));
        }
        let ty = self.types.common_type(TypeId::INT, operand.ty);
        let operand = self.new_cast(operand, ty);
        Ok(Node::new(NodeKind::BitNot(Box::new(operand)), ty, loc))
      }
      "++" => {
        let operand = self.unary()?;
        let one = self.num(1, TypeId::INT, loc);
        self.compound_assign(operand, BinaryOp::Add, one, loc)
      }
      _ => {
        let operand = self.unary()?;
        let one = self.num(1, TypeId::INT, loc);
        self.compound_assign(operand, BinaryOp::Sub, one, loc)
      }
    }
  }

  /// Type of a `sizeof`/`_Alignof` operand; an expression operand is parsed
  /// for its type only and every object it created is dropped again.
  fn sizeof_operand(&mut self) -> CompileResult<TypeId> {
    if self.stream.is("(") && self.is_typename_at(1) {
      self.stream.advance();
      let ty = self.typename()?;
      self.stream.expect(")")?;
      return Ok(ty);
    }
    let cp = self.checkpoint();
    let node = self.unary()?;
    self.discard_since(cp);
    Ok(node.ty)
  }

  /// postfix = primary ("[" expr "]" | "." ident | "->" ident | "++" | "--")*
  fn postfix(&mut self) -> CompileResult<Node> {
    let mut node = self.primary()?;
    loop {
      let loc = self.stream.loc();
      let Some(op) = self.match_punct(&["[", ".", "->", "++", "--"]) else {
        return Ok(node);
      };
      self.stream.advance();

      node = match op {
        "[" => {
          let index = self.expr()?;
          self.stream.expect("]")?;
          let addr = self.new_binary(BinaryOp::Add, node, index, loc)?;
          self.new_deref(addr, loc)?
        }
        "." => {
          let (name, name_loc) = self.stream.expect_ident()?;
          self.new_member(node, &name, name_loc)?
        }
        "->" => {
          let (name, name_loc) = self.stream.expect_ident()?;
          let base = self.new_deref(node, loc)?;
          self.new_member(base, &name, name_loc)?
        }
        "++" => self.post_increment(node, 1, loc)?,
        _ => self.post_increment(node, -1, loc)?,
      };
    }
  }

  /// `x++` is `(typeof x)((x += 1) - 1)`.
  fn post_increment(&mut self, node: Node, delta: i64, loc: Loc) -> CompileResult<Node> {
    let ty = node.ty;
    let step = self.num(delta, TypeId::INT, loc);
    let updated = self.compound_assign(node, BinaryOp::Add, step, loc)?;
    let back = self.num(-delta, TypeId::INT, loc);
    let value = self.new_binary(BinaryOp::Add, updated, back, loc)?;
    Ok(self.new_cast(value, ty))
  }

  fn primary(&mut self) -> CompileResult<Node> {
    let loc = self.stream.loc();

    if self.stream.is("(") && self.stream.is_at(1, "{") {
      self.stream.advance();
      self.stream.advance();
      return self.stmt_expr(loc);
    }

    if self.stream.consume("(") {
      let node = self.expr()?;
      self.stream.expect(")")?;
      return Ok(node);
    }

    match self.stream.peek().kind {
      TokenKind::Ident => {
        let (name, loc) = self.stream.expect_ident()?;
        if self.stream.consume("(") {
          return self.func_call(name, loc);
        }
        match self.scopes.lookup_variable(&name) {
          Some(Binding::Var(id)) => Ok(self.var_node(id, loc)),
          Some(Binding::EnumConst { ty, value }) => Ok(self.num(value, ty, loc)),
          Some(Binding::TypeAlias(_)) => {
            Err(self.semantic(loc, format!("unexpected type name '{name}'")))
          }
          None => Err(self.semantic(loc, format!("undefined variable '{name}'"))),
        }
      }
      TokenKind::Str => {
        let mut bytes = Vec::new();
        while self.stream.peek().kind == TokenKind::Str {
          let token = self.stream.advance();
          if let Literal::Str(piece) = token.literal {
            bytes.pop();
            bytes.extend_from_slice(&piece);
          }
        }
        let id = self.new_string_literal(bytes, loc);
        Ok(self.var_node(id, loc))
      }
      TokenKind::Num => {
        let token = self.stream.advance();
        match token.literal {
          Literal::Int { value, ty } => Ok(self.num(value, literal_type(ty), loc)),
          Literal::Float { value, ty } => {
            Ok(Node::new(NodeKind::FNum(value), literal_type(ty), loc))
          }
          _ => Err(self.semantic(loc, "malformed numeric literal")),
        }
      }
      _ => Err(self.stream.error("expected an expression")),
    }
  }

  /// Body of `({ ... })` after the opening `({`; its value is the value of
  /// the last expression statement.
  fn stmt_expr(&mut self, loc: Loc) -> CompileResult<Node> {
    self.scopes.enter_scope();
    let items = self.block_items();
    self.scopes.exit_scope();
    let items = items?;
    self.stream.expect(")")?;

    let ty = match items.last().map(|node| &node.kind) {
      Some(NodeKind::ExprStmt(expr)) => expr.ty,
      _ => {
        return Err(self.semantic(loc, "statement expression returning void is not supported"));
      }
    };
    Ok(Node::new(NodeKind::StmtExpr(items), ty, loc))
  }

  fn func_call(&mut self, name: String, loc: Loc) -> CompileResult<Node> {
    let func_ty = match self.scopes.lookup_variable(&name) {
      Some(Binding::Var(id)) if self.types.kind(self.obj(id).ty) == TypeKind::Func => {
        self.obj(id).ty
      }
      Some(_) => return Err(self.semantic(loc, format!("'{name}' is not a function"))),
      None => {
        let message = format!("implicit declaration of a function '{name}'");
        return Err(self.semantic(loc, message));
      }
    };
    let params = self.types.get(func_ty).params.clone();
    let is_variadic = self.types.get(func_ty).is_variadic;
    let return_ty = self.types.get(func_ty).return_ty.unwrap_or(TypeId::INT);

    let mut args = Vec::new();
    while !self.stream.consume(")") {
      if !args.is_empty() {
        self.stream.expect(",")?;
      }
      let arg_loc = self.stream.loc();
      let arg = self.assign()?;
      if self.types.is_aggregate(arg.ty) {
        return Err(self.semantic(arg_loc, "passing a struct or union by value is not supported"));
      }
      if self.types.kind(arg.ty) == TypeKind::Void {
        return Err(self.semantic(arg_loc, "void value used as a function argument"));
      }

      let arg = match params.get(args.len()) {
        Some(&param) => self.new_cast(arg, param),
        None if !is_variadic => return Err(self.semantic(arg_loc, "too many arguments")),
        None if self.types.kind(arg.ty) == TypeKind::Float => self.new_cast(arg, TypeId::DOUBLE),
        None if self.types.is_integer(arg.ty) && self.types.size(arg.ty) < 4 => {
          self.new_cast(arg, TypeId::INT)
        }
        None => arg,
      };
      args.push(arg);
    }

    if args.len() < params.len() {
      return Err(self.semantic(loc, "too few arguments"));
    }
    let fp = args.iter().filter(|arg| self.types.is_flonum(arg.ty)).count();
    if args.len() - fp > MAX_GP_ARGS || fp > MAX_FP_ARGS {
      return Err(self.semantic(
        loc,
        "calls with more than 6 integer or 8 floating-point arguments are not supported",
      ));
    }

    Ok(Node::new(NodeKind::Call { name, func_ty, args }, return_ty, loc))
  }

  /// Parse and fold an integer constant expression.
  pub(super) fn const_expr(&mut self) -> CompileResult<i64> {
    let node = self.conditional()?;
    Evaluator::new(&self.types, &self.objs).eval(&node)
  }

  pub(super) fn num(&self, value: i64, ty: TypeId, loc: Loc) -> Node {
    Node::new(NodeKind::Num(value), ty, loc)
  }

  pub(super) fn new_cast(&self, node: Node, ty: TypeId) -> Node {
    if node.ty == ty {
      return node;
    }
    let loc = node.loc;
    Node::new(NodeKind::Cast(Box::new(node)), ty, loc)
  }

  pub(super) fn check_scalar(&self, node: &Node) -> CompileResult<()> {
    if self.types.is_aggregate(node.ty) || self.types.kind(node.ty) == TypeKind::Void {
      return Err(self.semantic(node.loc, "scalar value required"));
    }
    Ok(())
  }

  fn usual_arith_conv(&mut self, lhs: Node, rhs: Node) -> (Node, Node) {
    let ty = self.types.common_type(lhs.ty, rhs.ty);
    (self.new_cast(lhs, ty), self.new_cast(rhs, ty))
  }

  fn binary(&self, op: BinaryOp, lhs: Node, rhs: Node, ty: TypeId, loc: Loc) -> Node {
    Node::new(
      NodeKind::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
      },
      ty,
      loc,
    )
  }

  pub(super) fn new_binary(
    &mut self,
    op: BinaryOp,
    lhs: Node,
    rhs: Node,
    loc: Loc,
  ) -> CompileResult<Node> {
    match op {
      BinaryOp::Add => return self.new_add(lhs, rhs, loc),
      BinaryOp::Sub => return self.new_sub(lhs, rhs, loc),
      _ => {}
    }

    const INVALID: &str = "invalid operands to binary expression";
    match op {
      BinaryOp::Mul | BinaryOp::Div => {
        if !self.types.is_numeric(lhs.ty) || !self.types.is_numeric(rhs.ty) {
          return Err(self.semantic(loc, INVALID));
        }
        let (lhs, rhs) = self.usual_arith_conv(lhs, rhs);
        let ty = lhs.ty;
        Ok(self.binary(op, lhs, rhs, ty, loc))
      }
      BinaryOp::Mod | BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
        if !self.types.is_integer(lhs.ty) || !self.types.is_integer(rhs.ty) {
          return Err(self.semantic(loc, INVALID));
        }
        let (lhs, rhs) = self.usual_arith_conv(lhs, rhs);
        let ty = lhs.ty;
        Ok(self.binary(op, lhs, rhs, ty, loc))
      }
      BinaryOp::Shl | BinaryOp::Shr => {
        if !self.types.is_integer(lhs.ty) || !self.types.is_integer(rhs.ty) {
          return Err(self.semantic(loc, INVALID));
        }
        let ty = self.types.common_type(lhs.ty, TypeId::INT);
        let lhs = self.new_cast(lhs, ty);
        Ok(self.binary(op, lhs, rhs, ty, loc))
      }
      _ => {
        let scalar = |ty: TypeId| {
          self.types.is_numeric(ty)
            || self.types.is_pointer_like(ty)
            || self.types.kind(ty) == TypeKind::Func
        };
        if !scalar(lhs.ty) || !scalar(rhs.ty) {
          return Err(self.semantic(loc, INVALID));
        }
        let (lhs, rhs) = self.usual_arith_conv(lhs, rhs);
        Ok(self.binary(op, lhs, rhs, TypeId::INT, loc))
      }
    }
  }

  /// Pointee size used to scale pointer arithmetic.
  fn pointee_size(&self, ptr_ty: TypeId, loc: Loc) -> CompileResult<(TypeId, i64)> {
    let Some(base) = self.types.base(ptr_ty) else {
      return Err(self.semantic(loc, "invalid operands to binary expression"));
    };
    let size = self.types.size(base);
    if size < 0 {
      return Err(self.semantic(loc, "arithmetic on a pointer to an incomplete type"));
    }
    Ok((base, size))
  }

  fn scale_index(&mut self, index: Node, size: i64, loc: Loc) -> Node {
    let index = self.new_cast(index, TypeId::LONG);
    let size = self.num(size, TypeId::LONG, loc);
    self.binary(BinaryOp::Mul, index, size, TypeId::LONG, loc)
  }

  fn new_add(&mut self, lhs: Node, rhs: Node, loc: Loc) -> CompileResult<Node> {
    if self.types.is_numeric(lhs.ty) && self.types.is_numeric(rhs.ty) {
      let (lhs, rhs) = self.usual_arith_conv(lhs, rhs);
      let ty = lhs.ty;
      return Ok(self.binary(BinaryOp::Add, lhs, rhs, ty, loc));
    }

    let lhs_ptr = self.types.is_pointer_like(lhs.ty);
    let rhs_ptr = self.types.is_pointer_like(rhs.ty);
    if lhs_ptr && rhs_ptr {
      return Err(self.semantic(loc, "invalid operands to binary expression"));
    }
    let (ptr, index) = if rhs_ptr { (rhs, lhs) } else { (lhs, rhs) };
    if !self.types.is_integer(index.ty) {
      return Err(self.semantic(loc, "invalid operands to binary expression"));
    }

    let (base, size) = self.pointee_size(ptr.ty, loc)?;
    let offset = self.scale_index(index, size, loc);
    let ty = self.types.pointer_to(base);
    Ok(self.binary(BinaryOp::Add, ptr, offset, ty, loc))
  }

  fn new_sub(&mut self, lhs: Node, rhs: Node, loc: Loc) -> CompileResult<Node> {
    if self.types.is_numeric(lhs.ty) && self.types.is_numeric(rhs.ty) {
      let (lhs, rhs) = self.usual_arith_conv(lhs, rhs);
      let ty = lhs.ty;
      return Ok(self.binary(BinaryOp::Sub, lhs, rhs, ty, loc));
    }

    let lhs_ptr = self.types.is_pointer_like(lhs.ty);
    let rhs_ptr = self.types.is_pointer_like(rhs.ty);
    if lhs_ptr && self.types.is_integer(rhs.ty) {
      let (base, size) = self.pointee_size(lhs.ty, loc)?;
      let offset = self.scale_index(rhs, size, loc);
      let ty = self.types.pointer_to(base);
      return Ok(self.binary(BinaryOp::Sub, lhs, offset, ty, loc));
    }

    if lhs_ptr && rhs_ptr {
      let (lbase, size) = self.pointee_size(lhs.ty, loc)?;
      let (rbase, _) = self.pointee_size(rhs.ty, loc)?;
      if !self.types.is_compatible(lbase, rbase) {
        return Err(self.semantic(loc, "subtraction of pointers to incompatible types"));
      }
      if size == 0 {
        return Err(self.semantic(loc, "subtraction of pointers to zero-sized objects"));
      }
      let diff = self.binary(BinaryOp::Sub, lhs, rhs, TypeId::LONG, loc);
      let size = self.num(size, TypeId::LONG, loc);
      return Ok(self.binary(BinaryOp::Div, diff, size, TypeId::LONG, loc));
    }

    Err(self.semantic(loc, "invalid operands to binary expression"))
  }

  pub(super) fn new_deref(&mut self, node: Node, loc: Loc) -> CompileResult<Node> {
    if self.types.kind(node.ty) == TypeKind::Func {
      return Ok(node);
    }
    let Some(base) = self.types.base(node.ty) else {
      return Err(self.semantic(loc, "invalid pointer dereference"));
    };
    if self.types.kind(base) == TypeKind::Void {
      return Err(self.semantic(loc, "dereferencing a void pointer"));
    }
    Ok(Node::new(NodeKind::Deref(Box::new(node)), base, loc))
  }

  fn is_lvalue(node: &Node) -> bool {
    match &node.kind {
      NodeKind::Var(_) | NodeKind::Deref(_) | NodeKind::Member { .. } => true,
      NodeKind::Comma(_, rhs) => Self::is_lvalue(rhs),
      _ => false,
    }
  }

  pub(super) fn new_addr(&mut self, node: Node, loc: Loc) -> CompileResult<Node> {
    if !Self::is_lvalue(&node) {
      return Err(self.semantic(loc, "not an lvalue"));
    }
    let ty = self.types.pointer_to(node.ty);
    Ok(Node::new(NodeKind::Addr(Box::new(node)), ty, loc))
  }

  pub(super) fn new_assign(&mut self, lhs: Node, rhs: Node, loc: Loc) -> CompileResult<Node> {
    match self.types.kind(lhs.ty) {
      TypeKind::Array => return Err(self.semantic(loc, "array is not assignable")),
      TypeKind::Func => return Err(self.semantic(loc, "function is not assignable")),
      _ => {}
    }
    if !Self::is_lvalue(&lhs) {
      return Err(self.semantic(loc, "not an lvalue"));
    }

    let ty = lhs.ty;
    let rhs = if self.types.is_aggregate(ty) {
      if !self.types.is_compatible(ty, rhs.ty) {
        return Err(self.semantic(loc, "incompatible types in assignment"));
      }
      rhs
    } else {
      if self.types.is_aggregate(rhs.ty) || self.types.kind(rhs.ty) == TypeKind::Void {
        return Err(self.semantic(loc, "incompatible types in assignment"));
      }
      self.new_cast(rhs, ty)
    };
    Ok(Node::new(NodeKind::Assign(Box::new(lhs), Box::new(rhs)), ty, loc))
  }

  /// `lhs op= rhs` as `(tmp = &lhs, *tmp = *tmp op rhs)`.
  fn compound_assign(
    &mut self,
    lhs: Node,
    op: BinaryOp,
    rhs: Node,
    loc: Loc,
  ) -> CompileResult<Node> {
    let ptr_ty = self.types.pointer_to(lhs.ty);
    let addr = self.new_addr(lhs, loc)?;
    let tmp = self.new_temp_local(ptr_ty, loc)?;

    let bind = self.new_assign(self.var_node(tmp, loc), addr, loc)?;
    let target = self.new_deref(self.var_node(tmp, loc), loc)?;
    let current = self.new_deref(self.var_node(tmp, loc), loc)?;
    let value = self.new_binary(op, current, rhs, loc)?;
    let store = self.new_assign(target, value, loc)?;

    let ty = store.ty;
    Ok(Node::new(NodeKind::Comma(Box::new(bind), Box::new(store)), ty, loc))
  }

  fn new_member(&mut self, base: Node, name: &str, loc: Loc) -> CompileResult<Node> {
    if !self.types.is_aggregate(base.ty) {
      return Err(self.semantic(loc, "member access on something that is not a struct or union"));
    }
    let Some(member) = self.types.members(base.ty).iter().find(|m| m.name == name) else {
      return Err(self.semantic(loc, format!("no such member '{name}'")));
    };
    let (ty, offset) = (member.ty, member.offset);
    Ok(Node::new(
      NodeKind::Member {
        base: Box::new(base),
        offset,
      },
      ty,
      loc,
    ))
  }
}
