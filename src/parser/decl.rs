//! Declarations: specifiers, declarators, aggregates, enums, typedefs,
//! function definitions and global variables.

use tracing::{debug, trace};

use super::{FnContext, Parser};
use crate::ast::{Function, Node, NodeKind, Obj, ObjId};
use crate::error::{CompileResult, Loc};
use crate::scope::Binding;
use crate::tokenizer::TokenKind;
use crate::ty::{align_to, Member, TypeId, TypeKind};

/// Storage-class specifiers seen in a declaration.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct VarAttr {
  pub is_typedef: bool,
  pub is_static: bool,
  pub is_extern: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct Param {
  pub name: Option<(String, Loc)>,
  pub ty: TypeId,
}

/// Parameter list of the function suffix that directly follows a name.
#[derive(Debug, Clone, Default)]
pub(crate) struct ParamList {
  pub params: Vec<Param>,
  pub has_ellipsis: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct Declarator {
  pub ty: TypeId,
  pub name: Option<(String, Loc)>,
  pub params: Option<ParamList>,
  pub loc: Loc,
}

impl Declarator {
  fn require_name(&self, parser: &Parser, what: &str) -> CompileResult<(String, Loc)> {
    self
      .name
      .clone()
      .ok_or_else(|| parser.semantic(self.loc, format!("{what} name omitted")))
  }
}

const MAX_GP_ARGS: usize = 6;
const MAX_FP_ARGS: usize = 8;

/// Size of the register save area of a variadic function: a 24-byte
/// `va_list` header followed by 6 general purpose and 8 vector registers.
pub(crate) const VA_AREA_SIZE: i64 = 136;

const TYPENAME_KEYWORDS: &[&str] = &[
  "void", "_Bool", "char", "short", "int", "long", "float", "double", "signed", "unsigned",
  "struct", "union", "enum", "typedef", "static", "extern",
];

impl<'a> Parser<'a> {
  pub(super) fn translation_unit(&mut self) -> CompileResult<()> {
    while !self.stream.is_eof() {
      let mut attr = VarAttr::default();
      let basety = self.declspec(Some(&mut attr))?;
      if attr.is_typedef {
        self.parse_typedef(basety)?;
        continue;
      }
      if self.stream.consume(";") {
        continue;
      }

      let first = self.declarator(basety)?;
      if self.types.kind(first.ty) == TypeKind::Func && self.stream.is("{") {
        self.function_definition(first, attr)?;
        continue;
      }
      self.global_declarations(basety, first, attr)?;
    }
    Ok(())
  }

  pub(super) fn is_typename(&self) -> bool {
    self.is_typename_at(0)
  }

  pub(super) fn is_typename_at(&self, n: usize) -> bool {
    let token = self.stream.peek_at(n);
    let text = crate::tokenizer::token_text(token, self.stream.source);
    match token.kind {
      TokenKind::Keyword => TYPENAME_KEYWORDS.contains(&text),
      TokenKind::Ident => matches!(self.scopes.lookup_variable(text), Some(Binding::TypeAlias(_))),
      _ => false,
    }
  }

  /// declspec = ("void" | "_Bool" | "char" | ... | struct-decl | typedef-name
  ///             | "typedef" | "static" | "extern")+
  ///
  /// Type keywords may come in any order; their combination is checked with
  /// a counter where each keyword owns a bit range.
  pub(super) fn declspec(&mut self, mut attr: Option<&mut VarAttr>) -> CompileResult<TypeId> {
    const VOID: u32 = 1 << 0;
    const BOOL: u32 = 1 << 2;
    const CHAR: u32 = 1 << 4;
    const SHORT: u32 = 1 << 6;
    const INT: u32 = 1 << 8;
    const LONG: u32 = 1 << 10;
    const FLOAT: u32 = 1 << 12;
    const DOUBLE: u32 = 1 << 14;
    const OTHER: u32 = 1 << 16;
    const SIGNED: u32 = 1 << 17;
    const UNSIGNED: u32 = 1 << 18;

    let mut ty = TypeId::INT;
    let mut counter = 0;

    while self.is_typename() {
      let loc = self.stream.loc();
      let text = self.stream.text();

      if matches!(text, "typedef" | "static" | "extern") {
        let Some(attr) = attr.as_deref_mut() else {
          return Err(self.semantic(loc, "storage class specifier is not allowed in this context"));
        };
        match text {
          "typedef" => attr.is_typedef = true,
          "static" => attr.is_static = true,
          _ => attr.is_extern = true,
        }
        if attr.is_typedef && (attr.is_static || attr.is_extern) {
          return Err(self.semantic(loc, "typedef may not be used together with static or extern"));
        }
        self.stream.advance();
        continue;
      }

      if matches!(text, "struct" | "union" | "enum") || self.stream.is_ident() {
        if counter != 0 {
          break;
        }
        self.stream.advance();
        ty = match text {
          "struct" => self.struct_union_decl(TypeKind::Struct)?,
          "union" => self.struct_union_decl(TypeKind::Union)?,
          "enum" => self.enum_specifier()?,
          _ => match self.scopes.lookup_variable(text) {
            Some(Binding::TypeAlias(alias)) => alias,
            _ => return Err(self.semantic(loc, format!("unknown type name '{text}'"))),
          },
        };
        counter += OTHER;
        continue;
      }

      match text {
        "void" => counter += VOID,
        "_Bool" => counter += BOOL,
        "char" => counter += CHAR,
        "short" => counter += SHORT,
        "int" => counter += INT,
        "long" => counter += LONG,
        "float" => counter += FLOAT,
        "double" => counter += DOUBLE,
        "signed" => counter |= SIGNED,
        _ => counter |= UNSIGNED,
      }
      self.stream.advance();

      ty = match counter {
        VOID => TypeId::VOID,
        BOOL => TypeId::BOOL,
        c if c == CHAR || c == SIGNED + CHAR => TypeId::CHAR,
        c if c == UNSIGNED + CHAR => TypeId::UCHAR,
        c if [SHORT, SHORT + INT, SIGNED + SHORT, SIGNED + SHORT + INT].contains(&c) => {
          TypeId::SHORT
        }
        c if c == UNSIGNED + SHORT || c == UNSIGNED + SHORT + INT => TypeId::USHORT,
        c if c == INT || c == SIGNED || c == SIGNED + INT => TypeId::INT,
        c if c == UNSIGNED || c == UNSIGNED + INT => TypeId::UINT,
        c if [
          LONG,
          LONG + INT,
          LONG + LONG,
          LONG + LONG + INT,
          SIGNED + LONG,
          SIGNED + LONG + INT,
          SIGNED + LONG + LONG,
          SIGNED + LONG + LONG + INT,
        ]
        .contains(&c) =>
        {
          TypeId::LONG
        }
        c if [
          UNSIGNED + LONG,
          UNSIGNED + LONG + INT,
          UNSIGNED + LONG + LONG,
          UNSIGNED + LONG + LONG + INT,
        ]
        .contains(&c) =>
        {
          TypeId::ULONG
        }
        FLOAT => TypeId::FLOAT,
        c if c == DOUBLE || c == LONG + DOUBLE => TypeId::DOUBLE,
        _ => return Err(self.semantic(loc, "invalid type")),
      };
    }

    Ok(ty)
  }

  /// declarator = "*"* ("(" declarator ")" | ident?) type-suffix
  ///
  /// A parenthesised declarator binds tighter than the suffix after it, so
  /// the inner part is skipped once, the outer suffix parsed, and the inner
  /// part re-parsed on top of the resulting type.
  pub(super) fn declarator(&mut self, ty: TypeId) -> CompileResult<Declarator> {
    let mut ty = ty;
    while self.stream.consume("*") {
      ty = self.types.pointer_to(ty);
    }

    if self.stream.consume("(") {
      let start = self.stream.position();
      self.declarator(TypeId::INT)?;
      self.stream.expect(")")?;
      let (outer, _) = self.type_suffix(ty)?;
      let end = self.stream.position();
      self.stream.rewind(start);
      let inner = self.declarator(outer)?;
      self.stream.rewind(end);
      return Ok(inner);
    }

    let loc = self.stream.loc();
    let name = if self.stream.is_ident() {
      Some(self.stream.expect_ident()?)
    } else {
      None
    };
    let (ty, params) = self.type_suffix(ty)?;
    Ok(Declarator { ty, name, params, loc })
  }

  /// A type name as used by casts, `sizeof` and `_Alignof`.
  pub(super) fn typename(&mut self) -> CompileResult<TypeId> {
    let basety = self.declspec(None)?;
    let decl = self.declarator(basety)?;
    if let Some((name, loc)) = decl.name {
      return Err(self.semantic(loc, format!("unexpected identifier '{name}' in type name")));
    }
    Ok(decl.ty)
  }

  fn type_suffix(&mut self, ty: TypeId) -> CompileResult<(TypeId, Option<ParamList>)> {
    if self.stream.consume("(") {
      return self.func_params(ty);
    }
    if self.stream.consume("[") {
      return Ok((self.array_dimensions(ty)?, None));
    }
    Ok((ty, None))
  }

  fn func_params(&mut self, return_ty: TypeId) -> CompileResult<(TypeId, Option<ParamList>)> {
    let loc = self.stream.loc();
    if self.types.is_aggregate(return_ty) {
      return Err(self.semantic(loc, "returning a struct or union by value is not supported"));
    }
    if matches!(self.types.kind(return_ty), TypeKind::Array | TypeKind::Func) {
      return Err(self.semantic(loc, "function cannot return an array or a function"));
    }

    let mut list = ParamList::default();
    if self.stream.is("void") && self.stream.is_at(1, ")") {
      self.stream.advance();
      self.stream.advance();
      let ty = self.types.func_type(return_ty, Vec::new(), false);
      return Ok((ty, Some(list)));
    }

    // An empty list leaves the parameters unspecified.
    let unspecified = self.stream.is(")");
    while !self.stream.consume(")") {
      if !list.params.is_empty() {
        self.stream.expect(",")?;
      }
      if self.stream.consume("...") {
        list.has_ellipsis = true;
        self.stream.expect(")")?;
        break;
      }

      let basety = self.declspec(None)?;
      let decl = self.declarator(basety)?;
      let ty = match self.types.kind(decl.ty) {
        TypeKind::Array => match self.types.base(decl.ty) {
          Some(base) => self.types.pointer_to(base),
          None => decl.ty,
        },
        TypeKind::Func => self.types.pointer_to(decl.ty),
        _ => decl.ty,
      };
      if self.types.is_aggregate(ty) {
        return Err(self.semantic(decl.loc, "passing a struct or union by value is not supported"));
      }
      list.params.push(Param { name: decl.name, ty });
    }

    let param_types = list.params.iter().map(|p| p.ty).collect();
    let variadic = list.has_ellipsis || unspecified;
    let ty = self.types.func_type(return_ty, param_types, variadic);
    Ok((ty, Some(list)))
  }

  fn array_dimensions(&mut self, ty: TypeId) -> CompileResult<TypeId> {
    let loc = self.stream.loc();
    let len = if self.stream.consume("]") {
      -1
    } else {
      let len = self.const_expr()?;
      if len < 0 {
        return Err(self.semantic(loc, "array size is negative"));
      }
      self.stream.expect("]")?;
      len
    };

    let (elem, _) = self.type_suffix(ty)?;
    if self.types.size(elem) < 0 {
      return Err(self.semantic(loc, "array has incomplete element type"));
    }
    Ok(self.types.array_of(elem, len))
  }

  /// struct-union-decl = ident? ("{" struct-members)?
  fn struct_union_decl(&mut self, kind: TypeKind) -> CompileResult<TypeId> {
    let tag = if self.stream.is_ident() {
      Some(self.stream.expect_ident()?)
    } else {
      None
    };

    if !self.stream.is("{") {
      let Some((name, loc)) = tag else {
        return Err(self.stream.error("expected a tag name or '{'"));
      };
      if let Some(ty) = self.scopes.lookup_tag(&name) {
        if self.types.kind(ty) != kind {
          return Err(self.semantic(loc, format!("'{name}' defined as wrong kind of tag")));
        }
        return Ok(ty);
      }
      let ty = self.types.new_aggregate(kind);
      self.scopes.bind_tag(&name, ty);
      return Ok(ty);
    }

    self.stream.expect("{")?;

    // Bind the tag before the members so self-references see this definition.
    let ty = match &tag {
      Some((name, loc)) => match self.scopes.lookup_tag_in_current_scope(name) {
        Some(ty) if self.types.kind(ty) != kind => {
          return Err(self.semantic(*loc, format!("'{name}' defined as wrong kind of tag")));
        }
        Some(ty) if self.types.size(ty) >= 0 => {
          return Err(self.semantic(*loc, format!("redefinition of '{name}'")));
        }
        Some(ty) => ty,
        None => {
          let ty = self.types.new_aggregate(kind);
          self.scopes.bind_tag(name, ty);
          ty
        }
      },
      None => self.types.new_aggregate(kind),
    };

    let members = self.struct_members(kind)?;
    self.types.define_aggregate(ty, members);
    Ok(ty)
  }

  fn struct_members(&mut self, kind: TypeKind) -> CompileResult<Vec<Member>> {
    let mut members: Vec<Member> = Vec::new();
    while !self.stream.consume("}") {
      let basety = self.declspec(None)?;
      let mut first = true;
      while !self.stream.consume(";") {
        if !first {
          self.stream.expect(",")?;
        }
        first = false;

        let decl = self.declarator(basety)?;
        let (name, loc) = decl.require_name(self, "member")?;
        if members.iter().any(|m| m.name == name) {
          return Err(self.semantic(loc, format!("duplicate member '{name}'")));
        }
        match self.types.kind(decl.ty) {
          TypeKind::Void => {
            return Err(self.semantic(loc, format!("member '{name}' declared void")));
          }
          TypeKind::Func => {
            let message = format!("member '{name}' declared as a function");
            return Err(self.semantic(loc, message));
          }
          _ => {}
        }
        members.push(Member {
          name,
          ty: decl.ty,
          offset: 0,
          align: 0,
          loc,
        });
      }
    }

    let last = members.len().saturating_sub(1);
    for (i, member) in members.iter().enumerate() {
      let incomplete = self.types.size(member.ty) < 0;
      let flexible = kind == TypeKind::Struct
        && i == last
        && self.types.kind(member.ty) == TypeKind::Array
        && self.types.get(member.ty).array_len < 0;
      if incomplete && !flexible {
        let message = format!("member '{}' has incomplete type", member.name);
        return Err(self.semantic(member.loc, message));
      }
    }
    Ok(members)
  }

  /// enum-specifier = ident? "{" enum-list? "}" | ident
  fn enum_specifier(&mut self) -> CompileResult<TypeId> {
    let tag = if self.stream.is_ident() {
      Some(self.stream.expect_ident()?)
    } else {
      None
    };

    if !self.stream.is("{") {
      let Some((name, loc)) = tag else {
        return Err(self.stream.error("expected a tag name or '{'"));
      };
      return match self.scopes.lookup_tag(&name) {
        Some(ty) if self.types.kind(ty) == TypeKind::Enum => Ok(ty),
        Some(_) => Err(self.semantic(loc, format!("'{name}' is not an enum tag"))),
        None => Err(self.semantic(loc, format!("unknown enum type '{name}'"))),
      };
    }

    self.stream.expect("{")?;
    let ty = self.types.enum_type();
    let mut value = 0;
    let mut first = true;
    while !self.consume_end() {
      if !first {
        self.stream.expect(",")?;
      }
      first = false;

      let (name, _) = self.stream.expect_ident()?;
      if self.stream.consume("=") {
        value = self.const_expr()?;
      }
      self.scopes.bind_enum_constant(&name, ty, value);
      value += 1;
    }

    if let Some((name, _)) = &tag {
      self.scopes.bind_tag(name, ty);
    }
    Ok(ty)
  }

  /// `}` or `, }`, consumed if present.
  pub(super) fn consume_end(&mut self) -> bool {
    if self.stream.consume("}") {
      return true;
    }
    if self.stream.is(",") && self.stream.is_at(1, "}") {
      self.stream.advance();
      self.stream.advance();
      return true;
    }
    false
  }

  pub(super) fn is_end(&self) -> bool {
    self.stream.is("}") || (self.stream.is(",") && self.stream.is_at(1, "}"))
  }

  pub(super) fn parse_typedef(&mut self, basety: TypeId) -> CompileResult<()> {
    let mut first = true;
    while !self.stream.consume(";") {
      if !first {
        self.stream.expect(",")?;
      }
      first = false;
      let decl = self.declarator(basety)?;
      let (name, _) = decl.require_name(self, "typedef")?;
      self.scopes.bind_type_alias(&name, decl.ty);
    }
    Ok(())
  }

  /// Declare a function, reusing an earlier prototype of the same name.
  fn function_declaration(&mut self, decl: &Declarator, attr: VarAttr) -> CompileResult<ObjId> {
    let (name, loc) = decl.require_name(self, "function")?;

    let existing = match self.scopes.lookup_file_scope(&name) {
      Some(Binding::Var(id)) if self.types.kind(self.obj(id).ty) == TypeKind::Func => Some(id),
      Some(_) if self.scopes.is_file_scope() => {
        let message = format!("'{name}' redeclared as a different kind of symbol");
        return Err(self.semantic(loc, message));
      }
      _ => None,
    };

    if let Some(id) = existing {
      if !self.function_types_agree(self.obj(id).ty, decl.ty) {
        return Err(self.semantic(loc, format!("conflicting types for '{name}'")));
      }
      if attr.is_static {
        self.obj_mut(id).is_static = true;
      }
      if !self.scopes.is_file_scope() {
        self.scopes.bind_variable(&name, id);
      }
      return Ok(id);
    }

    let mut obj = Obj::new(name.as_str(), decl.ty, loc, true, 1);
    obj.is_static = attr.is_static;
    let id = self.push_obj(obj);
    self.functions.push(id);
    self.scopes.bind_variable(&name, id);
    Ok(id)
  }

  /// Prototypes must match exactly unless one of them leaves the parameters
  /// unspecified with `()`, in which case only the return types must agree.
  fn function_types_agree(&self, a: TypeId, b: TypeId) -> bool {
    let unspecified = |ty: TypeId| {
      let ty = self.types.get(ty);
      ty.is_variadic && ty.params.is_empty()
    };
    if unspecified(a) || unspecified(b) {
      let (ra, rb) = (self.types.get(a).return_ty, self.types.get(b).return_ty);
      return match (ra, rb) {
        (Some(x), Some(y)) => self.types.is_compatible(x, y),
        _ => false,
      };
    }
    self.types.is_compatible(a, b)
  }

  fn function_definition(&mut self, decl: Declarator, attr: VarAttr) -> CompileResult<()> {
    let id = self.function_declaration(&decl, attr)?;
    let (name, loc) = decl.require_name(self, "function")?;
    if self.obj(id).is_definition {
      return Err(self.semantic(loc, format!("redefinition of '{name}'")));
    }

    let list = decl.params.clone().unwrap_or_default();
    let gp = list.params.iter().filter(|p| !self.types.is_flonum(p.ty)).count();
    let fp = list.params.len() - gp;
    if gp > MAX_GP_ARGS || fp > MAX_FP_ARGS {
      return Err(self.semantic(
        loc,
        "functions with more than 6 integer or 8 floating-point parameters are not supported",
      ));
    }

    {
      let obj = self.obj_mut(id);
      obj.ty = decl.ty;
      obj.is_definition = true;
    }
    let return_ty = self.types.get(decl.ty).return_ty.unwrap_or(TypeId::VOID);
    self.func = Some(FnContext::new(return_ty));
    self.scopes.enter_scope();

    let mut params = Vec::with_capacity(list.params.len());
    for param in &list.params {
      let Some((param_name, param_loc)) = param.name.clone() else {
        return Err(self.semantic(loc, "parameter name omitted"));
      };
      if self.types.kind(param.ty) == TypeKind::Void {
        return Err(self.semantic(param_loc, format!("parameter '{param_name}' declared void")));
      }
      let pid = self.new_local(&param_name, param.ty, param_loc)?;
      self.place_local(pid);
      self.scopes.bind_variable(&param_name, pid);
      params.push(pid);
    }

    let va_area = if list.has_ellipsis {
      let ty = self.types.array_of(TypeId::CHAR, VA_AREA_SIZE);
      let va = self.new_local("__va_area__", ty, loc)?;
      self.place_local(va);
      self.scopes.bind_variable("__va_area__", va);
      Some(va)
    } else {
      None
    };

    let body_loc = self.stream.loc();
    self.stream.expect("{")?;
    let body = self.compound_stmt(body_loc)?;
    self.scopes.exit_scope();
    self.resolve_goto_labels()?;

    let Some(ctx) = self.func.take() else {
      return Err(self.semantic(loc, "function context lost"));
    };
    let stack_size = align_to(ctx.max_offset, 16);
    debug!(function = %name, stack_size, locals = ctx.locals.len(), "parsed function");

    self.obj_mut(id).func = Some(Function {
      params,
      body,
      locals: ctx.locals,
      stack_size,
      va_area,
    });
    Ok(())
  }

  fn resolve_goto_labels(&self) -> CompileResult<()> {
    let Some(ctx) = self.func.as_ref() else {
      return Ok(());
    };
    for (name, loc) in &ctx.gotos {
      if !ctx.declared_labels.contains(name) {
        return Err(self.semantic(*loc, format!("use of undeclared label '{name}'")));
      }
    }
    Ok(())
  }

  fn global_declarations(
    &mut self,
    basety: TypeId,
    first: Declarator,
    attr: VarAttr,
  ) -> CompileResult<()> {
    let mut decl = first;
    loop {
      if self.types.kind(decl.ty) == TypeKind::Func {
        self.function_declaration(&decl, attr)?;
      } else {
        self.global_variable(&decl, attr)?;
      }
      if self.stream.consume(";") {
        return Ok(());
      }
      self.stream.expect(",")?;
      decl = self.declarator(basety)?;
    }
  }

  fn global_variable(&mut self, decl: &Declarator, attr: VarAttr) -> CompileResult<()> {
    let (name, loc) = decl.require_name(self, "variable")?;
    if self.types.kind(decl.ty) == TypeKind::Void {
      return Err(self.semantic(loc, format!("variable '{name}' declared void")));
    }

    let id = match self.scopes.lookup_file_scope(&name) {
      Some(Binding::Var(id)) if self.types.kind(self.obj(id).ty) != TypeKind::Func => {
        if !self.types.is_compatible(self.obj(id).ty, decl.ty) {
          return Err(self.semantic(loc, format!("conflicting types for '{name}'")));
        }
        if self.types.size(self.obj(id).ty) < 0 {
          let align = self.types.align(decl.ty);
          let obj = self.obj_mut(id);
          obj.ty = decl.ty;
          obj.align = align;
        }
        id
      }
      Some(_) => {
        let message = format!("'{name}' redeclared as a different kind of symbol");
        return Err(self.semantic(loc, message));
      }
      None => {
        let id = self.new_global(&name, decl.ty, loc);
        self.scopes.bind_variable(&name, id);
        id
      }
    };

    if attr.is_static {
      self.obj_mut(id).is_static = true;
    }
    if !attr.is_extern {
      self.obj_mut(id).is_definition = true;
    }

    if self.stream.consume("=") {
      if self.obj(id).init_data.is_some() {
        return Err(self.semantic(loc, format!("redefinition of '{name}'")));
      }
      self.global_initializer(id)?;
      self.obj_mut(id).is_definition = true;
    }

    let obj = self.obj(id);
    if obj.is_definition && self.types.size(obj.ty) < 0 {
      return Err(self.semantic(loc, format!("variable '{name}' has incomplete type")));
    }
    trace!(global = %name, size = self.types.size(obj.ty), "declared global");
    Ok(())
  }

  /// Block-scope declaration list; locals with initializers lower to
  /// expression statements.
  pub(super) fn declaration(&mut self, basety: TypeId, attr: VarAttr) -> CompileResult<Node> {
    let loc = self.stream.loc();
    let mut stmts = Vec::new();
    let mut first = true;

    while !self.stream.consume(";") {
      if !first {
        self.stream.expect(",")?;
      }
      first = false;

      let decl = self.declarator(basety)?;
      if self.types.kind(decl.ty) == TypeKind::Func {
        self.function_declaration(&decl, attr)?;
        continue;
      }
      let (name, var_loc) = decl.require_name(self, "variable")?;
      if self.types.kind(decl.ty) == TypeKind::Void {
        return Err(self.semantic(var_loc, format!("variable '{name}' declared void")));
      }

      if attr.is_static {
        self.static_local(&name, decl.ty, var_loc)?;
        continue;
      }
      if attr.is_extern {
        let id = match self.scopes.lookup_file_scope(&name) {
          Some(Binding::Var(id)) if self.types.kind(self.obj(id).ty) != TypeKind::Func => id,
          _ => self.new_global(&name, decl.ty, var_loc),
        };
        self.scopes.bind_variable(&name, id);
        continue;
      }

      let id = self.new_local(&name, decl.ty, var_loc)?;
      self.scopes.bind_variable(&name, id);

      // A complete type gets its slot now, so blocks inside the initializer
      // allocate below it. The initializer sizes the rest.
      let sized = self.types.size(decl.ty) >= 0 && !self.types.get(decl.ty).is_flexible;
      if sized {
        self.place_local(id);
      }
      if self.stream.consume("=") {
        let expr = self.local_initializer(id, var_loc)?;
        stmts.push(Node::new(NodeKind::ExprStmt(Box::new(expr)), TypeId::VOID, var_loc));
      }
      if self.types.size(self.obj(id).ty) < 0 {
        return Err(self.semantic(var_loc, format!("variable '{name}' has incomplete type")));
      }
      if !sized {
        self.place_local(id);
      }
    }

    Ok(Node::new(NodeKind::Block(stmts), TypeId::VOID, loc))
  }

  fn static_local(&mut self, name: &str, ty: TypeId, loc: Loc) -> CompileResult<()> {
    let id = self.new_anon_global(ty, loc);
    self.scopes.bind_variable(name, id);
    if self.stream.consume("=") {
      self.global_initializer(id)?;
    }
    if self.types.size(self.obj(id).ty) < 0 {
      return Err(self.semantic(loc, format!("variable '{name}' has incomplete type")));
    }
    Ok(())
  }
}
