//! Initializers.
//!
//! An initializer is first parsed into an [`Initializer`] tree shaped like
//! the declared type, then lowered: for a local into a chain of assignments
//! after zeroing the whole object, for a global into a byte image plus the
//! relocations for address constants.

use super::Parser;
use crate::ast::{BinaryOp, Node, NodeKind, ObjId, Relocation};
use crate::error::{CompileResult, Loc};
use crate::eval::Evaluator;
use crate::tokenizer::{Literal, TokenKind};
use crate::ty::{TypeId, TypeKind};

#[derive(Debug)]
pub(crate) struct Initializer {
  ty: TypeId,
  /// Array whose length is taken from the initializer.
  is_flexible: bool,
  expr: Option<Node>,
  children: Vec<Initializer>,
}

impl<'a> Parser<'a> {
  fn new_initializer(&mut self, ty: TypeId, is_flexible: bool) -> Initializer {
    let mut init = Initializer {
      ty,
      is_flexible: false,
      expr: None,
      children: Vec::new(),
    };

    match self.types.kind(ty) {
      TypeKind::Array => {
        if is_flexible && self.types.size(ty) < 0 {
          init.is_flexible = true;
          return init;
        }
        if let Some(base) = self.types.base(ty) {
          let len = self.types.get(ty).array_len.max(0);
          init.children = (0..len).map(|_| self.new_initializer(base, false)).collect();
        }
      }
      TypeKind::Struct | TypeKind::Union => {
        let member_types: Vec<TypeId> = self.types.members(ty).iter().map(|m| m.ty).collect();
        let flexible_struct = self.types.get(ty).is_flexible;
        let last = member_types.len().saturating_sub(1);
        for (i, member_ty) in member_types.into_iter().enumerate() {
          let child = if is_flexible && flexible_struct && i == last {
            Initializer {
              ty: member_ty,
              is_flexible: true,
              expr: None,
              children: Vec::new(),
            }
          } else {
            self.new_initializer(member_ty, false)
          };
          init.children.push(child);
        }
      }
      _ => {}
    }
    init
  }

  /// Parse the initializer of an object of type `ty`; the returned type is
  /// `ty` with any unknown array length or flexible member sized.
  fn initializer(&mut self, ty: TypeId) -> CompileResult<(Initializer, TypeId)> {
    let mut init = self.new_initializer(ty, true);
    self.initializer2(&mut init)?;

    if self.types.kind(ty) == TypeKind::Struct && self.types.get(ty).is_flexible {
      if let Some(last) = init.children.last() {
        let sized = self.types.with_flexible_member(ty, last.ty);
        init.ty = sized;
      }
    }
    let ty = init.ty;
    Ok((init, ty))
  }

  fn initializer2(&mut self, init: &mut Initializer) -> CompileResult<()> {
    match self.types.kind(init.ty) {
      TypeKind::Array if self.stream.peek().kind == TokenKind::Str => self.string_initializer(init),
      TypeKind::Array => {
        if self.stream.consume("{") {
          self.array_initializer1(init)
        } else {
          self.array_initializer2(init)
        }
      }
      TypeKind::Struct | TypeKind::Union => {
        if self.stream.consume("{") {
          return self.aggregate_initializer1(init);
        }
        // An expression of the aggregate's own type copies it whole.
        let cp = self.checkpoint();
        let expr = self.assign()?;
        if self.types.is_aggregate(expr.ty) {
          init.expr = Some(expr);
          return Ok(());
        }
        self.rollback(cp);
        self.aggregate_initializer2(init)
      }
      _ => {
        if self.stream.consume("{") {
          self.initializer2(init)?;
          while !self.consume_end() {
            self.stream.expect(",")?;
            self.skip_excess_element()?;
          }
          return Ok(());
        }
        init.expr = Some(self.assign()?);
        Ok(())
      }
    }
  }

  fn string_initializer(&mut self, init: &mut Initializer) -> CompileResult<()> {
    let loc = self.stream.loc();
    let mut bytes = Vec::new();
    while self.stream.peek().kind == TokenKind::Str {
      if let Literal::Str(piece) = self.stream.advance().literal {
        bytes.pop();
        bytes.extend_from_slice(&piece);
      }
    }

    if init.is_flexible {
      let Some(base) = self.types.base(init.ty) else {
        return Err(self.semantic(loc, "invalid string initializer"));
      };
      let sized = self.types.array_of(base, bytes.len() as i64);
      *init = self.new_initializer(sized, false);
    }

    for (child, &byte) in init.children.iter_mut().zip(&bytes) {
      child.expr = Some(Node::new(NodeKind::Num(i64::from(byte as i8)), TypeId::CHAR, loc));
    }
    Ok(())
  }

  /// Number of elements in the initializer list ahead, found by a dry run.
  fn count_array_init_elements(&mut self, elem: TypeId) -> CompileResult<i64> {
    let cp = self.checkpoint();
    let mut dummy = self.new_initializer(elem, false);
    let mut count = 0;
    let result = loop {
      if self.is_end() {
        break Ok(count);
      }
      if count > 0 && !self.stream.consume(",") {
        break Ok(count);
      }
      if let Err(err) = self.initializer2(&mut dummy) {
        break Err(err);
      }
      count += 1;
    };
    self.rollback(cp);
    result
  }

  fn size_flexible_array(&mut self, init: &mut Initializer) -> CompileResult<()> {
    if !init.is_flexible {
      return Ok(());
    }
    let loc = self.stream.loc();
    let Some(base) = self.types.base(init.ty) else {
      return Err(self.semantic(loc, "invalid array initializer"));
    };
    let len = self.count_array_init_elements(base)?;
    let sized = self.types.array_of(base, len);
    *init = self.new_initializer(sized, false);
    Ok(())
  }

  /// "{" initializer ("," initializer)* ","? "}", after the opening brace.
  fn array_initializer1(&mut self, init: &mut Initializer) -> CompileResult<()> {
    self.size_flexible_array(init)?;
    let mut i = 0;
    while !self.consume_end() {
      if i > 0 {
        self.stream.expect(",")?;
      }
      match init.children.get_mut(i) {
        Some(child) => self.initializer2(child)?,
        None => self.skip_excess_element()?,
      }
      i += 1;
    }
    Ok(())
  }

  /// Elements of a nested array without braces of its own.
  fn array_initializer2(&mut self, init: &mut Initializer) -> CompileResult<()> {
    self.size_flexible_array(init)?;
    for (i, child) in init.children.iter_mut().enumerate() {
      if self.is_end() {
        break;
      }
      if i > 0 {
        self.stream.expect(",")?;
      }
      self.initializer2(child)?;
    }
    Ok(())
  }

  /// Braced struct or union initializer. A union takes its first member.
  fn aggregate_initializer1(&mut self, init: &mut Initializer) -> CompileResult<()> {
    let limit = if self.types.kind(init.ty) == TypeKind::Union {
      init.children.len().min(1)
    } else {
      init.children.len()
    };
    let mut i = 0;
    while !self.consume_end() {
      if i > 0 {
        self.stream.expect(",")?;
      }
      if i < limit {
        self.initializer2(&mut init.children[i])?;
      } else {
        self.skip_excess_element()?;
      }
      i += 1;
    }
    Ok(())
  }

  fn aggregate_initializer2(&mut self, init: &mut Initializer) -> CompileResult<()> {
    let limit = if self.types.kind(init.ty) == TypeKind::Union {
      init.children.len().min(1)
    } else {
      init.children.len()
    };
    for (i, child) in init.children.iter_mut().take(limit).enumerate() {
      if self.is_end() {
        break;
      }
      if i > 0 {
        self.stream.expect(",")?;
      }
      self.initializer2(child)?;
    }
    Ok(())
  }

  /// Parse and drop one initializer element that has no slot to fill.
  fn skip_excess_element(&mut self) -> CompileResult<()> {
    if self.stream.consume("{") {
      let mut first = true;
      while !self.consume_end() {
        if !first {
          self.stream.expect(",")?;
        }
        first = false;
        self.skip_excess_element()?;
      }
      return Ok(());
    }
    let cp = self.checkpoint();
    self.assign()?;
    self.discard_since(cp);
    Ok(())
  }

  fn update_object_type(&mut self, id: ObjId, ty: TypeId) {
    let align = self.types.align(ty);
    let obj = self.obj_mut(id);
    obj.ty = ty;
    obj.align = obj.align.max(align);
  }

  /// Initializer of a local as `(memzero(var), var.a = ..., var.b = ...)`.
  pub(super) fn local_initializer(&mut self, id: ObjId, loc: Loc) -> CompileResult<Node> {
    let ty = self.obj(id).ty;
    let (init, ty) = self.initializer(ty)?;
    self.update_object_type(id, ty);

    let target = self.var_node(id, loc);
    let assigns = self.create_local_init(init, target, loc)?;
    let zero = Node::new(NodeKind::MemZero(id), TypeId::VOID, loc);
    Ok(Node::new(
      NodeKind::Comma(Box::new(zero), Box::new(assigns)),
      TypeId::VOID,
      loc,
    ))
  }

  fn create_local_init(
    &mut self,
    init: Initializer,
    target: Node,
    loc: Loc,
  ) -> CompileResult<Node> {
    let null = || Node::new(NodeKind::NullExpr, TypeId::VOID, loc);
    let kind = self.types.kind(init.ty);

    if let Some(expr) = init.expr {
      return self.new_assign(target, expr, loc);
    }

    match kind {
      TypeKind::Array => {
        let mut result = null();
        for (i, child) in init.children.into_iter().enumerate() {
          let index = self.num(i as i64, TypeId::LONG, loc);
          let addr = self.new_binary(BinaryOp::Add, target.clone(), index, loc)?;
          let elem = self.new_deref(addr, loc)?;
          let expr = self.create_local_init(child, elem, loc)?;
          result = Node::new(NodeKind::Comma(Box::new(result), Box::new(expr)), TypeId::VOID, loc);
        }
        Ok(result)
      }
      TypeKind::Struct | TypeKind::Union => {
        let offsets: Vec<i64> = self.types.members(init.ty).iter().map(|m| m.offset).collect();
        let mut result = null();
        for (child, offset) in init.children.into_iter().zip(offsets) {
          let member_ty = child.ty;
          let elem = Node::new(
            NodeKind::Member {
              base: Box::new(target.clone()),
              offset,
            },
            member_ty,
            loc,
          );
          let expr = self.create_local_init(child, elem, loc)?;
          result = Node::new(NodeKind::Comma(Box::new(result), Box::new(expr)), TypeId::VOID, loc);
        }
        Ok(result)
      }
      _ => Ok(null()),
    }
  }

  /// Fold the initializer of a global into its data image.
  pub(super) fn global_initializer(&mut self, id: ObjId) -> CompileResult<()> {
    let loc = self.stream.loc();
    let ty = self.obj(id).ty;
    let (init, ty) = self.initializer(ty)?;
    self.update_object_type(id, ty);

    let size = self.types.size(ty);
    if size < 0 {
      return Err(self.semantic(loc, "variable has incomplete type"));
    }
    let mut data = vec![0u8; size as usize];
    let mut relocations = Vec::new();
    self.write_global_data(&init, &mut data, 0, &mut relocations)?;

    let obj = self.obj_mut(id);
    obj.init_data = Some(data);
    obj.relocations = relocations;
    Ok(())
  }

  fn write_global_data(
    &self,
    init: &Initializer,
    data: &mut [u8],
    offset: usize,
    relocations: &mut Vec<Relocation>,
  ) -> CompileResult<()> {
    let Some(expr) = &init.expr else {
      match self.types.kind(init.ty) {
        TypeKind::Array => {
          let elem_size = self
            .types
            .base(init.ty)
            .map_or(0, |base| self.types.size(base).max(0) as usize);
          for (i, child) in init.children.iter().enumerate() {
            self.write_global_data(child, data, offset + i * elem_size, relocations)?;
          }
        }
        TypeKind::Struct | TypeKind::Union => {
          for (child, member) in init.children.iter().zip(self.types.members(init.ty)) {
            self.write_global_data(child, data, offset + member.offset as usize, relocations)?;
          }
        }
        _ => {}
      }
      return Ok(());
    };

    let evaluator = Evaluator::new(&self.types, &self.objs);
    let size = self.types.size(init.ty).max(0) as usize;
    let slot = &mut data[offset..offset + size];

    match self.types.kind(init.ty) {
      TypeKind::Float => {
        let value = evaluator.eval_double(expr)? as f32;
        slot.copy_from_slice(&value.to_le_bytes());
      }
      TypeKind::Double => {
        let value = evaluator.eval_double(expr)?;
        slot.copy_from_slice(&value.to_le_bytes());
      }
      _ => {
        let (label, value) = evaluator.eval_with_label(expr)?;
        match label {
          Some(label) => {
            if size != 8 {
              let message = "initializer element is not computable at load time";
              return Err(self.semantic(expr.loc, message));
            }
            relocations.push(Relocation {
              offset: offset as i64,
              label,
              addend: value,
            });
          }
          None => slot.copy_from_slice(&value.to_le_bytes()[..size]),
        }
      }
    }
    Ok(())
  }
}
