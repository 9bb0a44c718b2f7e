//! Recursive-descent parser producing a typed AST and the global data table.
//!
//! The parser mirrors the classic chibicc structure: a precedence-climbing
//! set of expression helpers, keyword dispatch for statements and
//! declaration-mirrors-use declarators. Identifiers are resolved while
//! parsing through [`Scopes`], every node is typed as it is built and
//! implicit conversions are inserted on the spot, so later stages never see
//! an untyped tree.
//!
//! All mutable parsing state lives in one [`Parser`]: the scope stack, the
//! object arena, the current function's frame and labels, and the innermost
//! loop and switch context. Nested constructs save and restore that context
//! around their bodies.

mod decl;
mod expr;
mod init;
mod stmt;
mod stream;

#[cfg(test)]
mod parser_tests;

use std::mem;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::ast::{Node, NodeKind, Obj, ObjId, Program};
use crate::error::{CompileError, CompileResult, Loc};
use crate::scope::Scopes;
use crate::tokenizer::Token;
use crate::ty::{align_to, TypeId, Types};

use stream::TokenStream;

/// Parse a whole translation unit.
pub fn parse(tokens: Vec<Token>, source: &str) -> CompileResult<Program> {
  let mut parser = Parser::new(tokens, source);
  parser.translation_unit()?;
  debug!(
    globals = parser.globals.len(),
    functions = parser.functions.len(),
    "parsed translation unit"
  );
  Ok(parser.finish())
}

/// Per-function state, alive while a function body is parsed.
struct FnContext {
  return_ty: TypeId,
  locals: Vec<ObjId>,
  frame_offset: i64,
  max_offset: i64,
  /// Source label name to its unique assembler label.
  labels: FxHashMap<String, String>,
  declared_labels: FxHashSet<String>,
  gotos: Vec<(String, Loc)>,
}

impl FnContext {
  fn new(return_ty: TypeId) -> Self {
    Self {
      return_ty,
      locals: Vec::new(),
      frame_offset: 0,
      max_offset: 0,
      labels: FxHashMap::default(),
      declared_labels: FxHashSet::default(),
      gotos: Vec::new(),
    }
  }
}

#[derive(Default)]
struct SwitchContext {
  cases: Vec<(i64, String)>,
  default: Option<String>,
}

/// Arena sizes and cursor position to return to after a speculative parse.
#[derive(Clone, Copy)]
struct Checkpoint {
  pos: usize,
  objs: usize,
  globals: usize,
  functions: usize,
  locals: usize,
  frame_offset: i64,
  max_offset: i64,
}

pub(crate) struct Parser<'a> {
  stream: TokenStream<'a>,
  types: Types,
  objs: Vec<Obj>,
  globals: Vec<ObjId>,
  functions: Vec<ObjId>,
  scopes: Scopes,
  unique_count: usize,
  func: Option<FnContext>,
  brk_label: Option<String>,
  cont_label: Option<String>,
  switch: Option<SwitchContext>,
}

impl<'a> Parser<'a> {
  fn new(tokens: Vec<Token>, source: &'a str) -> Self {
    Self {
      stream: TokenStream::new(tokens, source),
      types: Types::new(),
      objs: Vec::new(),
      globals: Vec::new(),
      functions: Vec::new(),
      scopes: Scopes::new(),
      unique_count: 0,
      func: None,
      brk_label: None,
      cont_label: None,
      switch: None,
    }
  }

  fn finish(self) -> Program {
    Program {
      types: self.types,
      objs: self.objs,
      globals: self.globals,
      functions: self.functions,
    }
  }

  fn obj(&self, id: ObjId) -> &Obj {
    &self.objs[id.0]
  }

  fn obj_mut(&mut self, id: ObjId) -> &mut Obj {
    &mut self.objs[id.0]
  }

  fn new_unique_name(&mut self) -> String {
    let name = format!(".L..{}", self.unique_count);
    self.unique_count += 1;
    name
  }

  fn push_obj(&mut self, obj: Obj) -> ObjId {
    let id = ObjId(self.objs.len());
    self.objs.push(obj);
    id
  }

  fn func_mut(&mut self, loc: Loc) -> CompileResult<&mut FnContext> {
    self
      .func
      .as_mut()
      .ok_or_else(|| CompileError::semantic(loc, "expression not allowed outside a function"))
  }

  /// Create a local without giving it a frame slot yet; see [`Self::place_local`].
  fn new_local(&mut self, name: &str, ty: TypeId, loc: Loc) -> CompileResult<ObjId> {
    let align = self.types.align(ty);
    self.func_mut(loc)?;
    let id = self.push_obj(Obj::new(name, ty, loc, false, align));
    if let Some(func) = self.func.as_mut() {
      func.locals.push(id);
    }
    Ok(id)
  }

  /// Assign the next frame slot to a local whose type is now final.
  fn place_local(&mut self, id: ObjId) {
    let size = self.types.size(self.obj(id).ty).max(0);
    let align = self.types.align(self.obj(id).ty);
    let Some(func) = self.func.as_mut() else {
      return;
    };
    func.frame_offset = align_to(func.frame_offset + size, align);
    func.max_offset = func.max_offset.max(func.frame_offset);
    let offset = func.frame_offset;
    let obj = self.obj_mut(id);
    obj.offset = offset;
    obj.align = align;
  }

  /// Hidden local used by desugared expressions.
  fn new_temp_local(&mut self, ty: TypeId, loc: Loc) -> CompileResult<ObjId> {
    let id = self.new_local("", ty, loc)?;
    self.place_local(id);
    Ok(id)
  }

  fn new_global(&mut self, name: &str, ty: TypeId, loc: Loc) -> ObjId {
    let align = self.types.align(ty);
    let id = self.push_obj(Obj::new(name, ty, loc, true, align));
    self.globals.push(id);
    id
  }

  /// File-local global with a generated name, used for string literals and
  /// block-scope statics.
  fn new_anon_global(&mut self, ty: TypeId, loc: Loc) -> ObjId {
    let name = self.new_unique_name();
    let id = self.new_global(&name, ty, loc);
    let obj = self.obj_mut(id);
    obj.is_static = true;
    obj.is_definition = true;
    id
  }

  fn new_string_literal(&mut self, bytes: Vec<u8>, loc: Loc) -> ObjId {
    let ty = self.types.array_of(TypeId::CHAR, bytes.len() as i64);
    let id = self.new_anon_global(ty, loc);
    self.obj_mut(id).init_data = Some(bytes);
    id
  }

  /// Open a block whose locals may reuse frame space once it closes.
  fn enter_block_scope(&mut self) -> i64 {
    self.scopes.enter_scope();
    self.func.as_ref().map_or(0, |func| func.frame_offset)
  }

  fn exit_block_scope(&mut self, saved_offset: i64) {
    self.scopes.exit_scope();
    if let Some(func) = self.func.as_mut() {
      func.frame_offset = saved_offset;
    }
  }

  fn checkpoint(&self) -> Checkpoint {
    let (locals, frame_offset, max_offset) = self
      .func
      .as_ref()
      .map_or((0, 0, 0), |f| (f.locals.len(), f.frame_offset, f.max_offset));
    Checkpoint {
      pos: self.stream.position(),
      objs: self.objs.len(),
      globals: self.globals.len(),
      functions: self.functions.len(),
      locals,
      frame_offset,
      max_offset,
    }
  }

  /// Forget objects created since `cp` while keeping the cursor where it is.
  fn discard_since(&mut self, cp: Checkpoint) {
    self.objs.truncate(cp.objs);
    self.globals.truncate(cp.globals);
    self.functions.truncate(cp.functions);
    if let Some(func) = self.func.as_mut() {
      func.locals.truncate(cp.locals);
      func.frame_offset = cp.frame_offset;
      func.max_offset = cp.max_offset;
    }
  }

  fn rollback(&mut self, cp: Checkpoint) {
    self.discard_since(cp);
    self.stream.rewind(cp.pos);
  }

  fn with_loop_labels<T>(
    &mut self,
    brk: &str,
    cont: Option<&str>,
    body: impl FnOnce(&mut Self) -> CompileResult<T>,
  ) -> CompileResult<T> {
    let prev_brk = mem::replace(&mut self.brk_label, Some(brk.to_string()));
    let prev_cont = match cont {
      Some(cont) => Some(mem::replace(&mut self.cont_label, Some(cont.to_string()))),
      None => None,
    };
    let result = body(self);
    self.brk_label = prev_brk;
    if let Some(prev_cont) = prev_cont {
      self.cont_label = prev_cont;
    }
    result
  }

  fn var_node(&self, id: ObjId, loc: Loc) -> Node {
    Node::new(NodeKind::Var(id), self.obj(id).ty, loc)
  }

  fn semantic(&self, loc: Loc, message: impl Into<String>) -> CompileError {
    CompileError::semantic(loc, message)
  }
}
