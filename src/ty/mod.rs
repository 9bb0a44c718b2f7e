//! Type descriptors and the conversion and layout rules shared by every stage.
//!
//! Types live in an arena owned by [`Types`] and are referred to by the
//! copyable [`TypeId`] handle. Once complete a type never changes, with one
//! exception: an incomplete struct or union is filled in place exactly once
//! through [`Types::define_aggregate`], so every pointer created while the tag
//! was still incomplete observes the final layout.

use crate::error::Loc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(u32);

impl TypeId {
  pub const VOID: TypeId = TypeId(0);
  pub const BOOL: TypeId = TypeId(1);
  pub const CHAR: TypeId = TypeId(2);
  pub const SHORT: TypeId = TypeId(3);
  pub const INT: TypeId = TypeId(4);
  pub const LONG: TypeId = TypeId(5);
  pub const UCHAR: TypeId = TypeId(6);
  pub const USHORT: TypeId = TypeId(7);
  pub const UINT: TypeId = TypeId(8);
  pub const ULONG: TypeId = TypeId(9);
  pub const FLOAT: TypeId = TypeId(10);
  pub const DOUBLE: TypeId = TypeId(11);

  fn index(self) -> usize {
    self.0 as usize
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
  Void,
  Bool,
  Char,
  Short,
  Int,
  Long,
  Float,
  Double,
  Enum,
  Ptr,
  Array,
  Struct,
  Union,
  Func,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
  pub name: String,
  pub ty: TypeId,
  pub offset: i64,
  pub align: i64,
  pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Type {
  pub kind: TypeKind,
  /// Byte size, or -1 while incomplete.
  pub size: i64,
  pub align: i64,
  pub is_unsigned: bool,
  /// Pointee of a pointer or element of an array.
  pub base: Option<TypeId>,
  /// Element count of an array, or -1 when not yet known.
  pub array_len: i64,
  pub members: Vec<Member>,
  /// Struct whose last member is an array of unspecified length.
  pub is_flexible: bool,
  pub return_ty: Option<TypeId>,
  pub params: Vec<TypeId>,
  pub is_variadic: bool,
}

impl Type {
  fn new(kind: TypeKind, size: i64, align: i64) -> Self {
    Self {
      kind,
      size,
      align,
      is_unsigned: false,
      base: None,
      array_len: -1,
      members: Vec::new(),
      is_flexible: false,
      return_ty: None,
      params: Vec::new(),
      is_variadic: false,
    }
  }

  fn unsigned(mut self) -> Self {
    self.is_unsigned = true;
    self
  }
}

pub fn align_to(n: i64, align: i64) -> i64 {
  (n + align - 1) / align * align
}

#[derive(Debug, Clone)]
pub struct Types {
  types: Vec<Type>,
}

impl Default for Types {
  fn default() -> Self {
    Self::new()
  }
}

impl Types {
  pub fn new() -> Self {
    let types = vec![
      Type::new(TypeKind::Void, 1, 1),
      Type::new(TypeKind::Bool, 1, 1),
      Type::new(TypeKind::Char, 1, 1),
      Type::new(TypeKind::Short, 2, 2),
      Type::new(TypeKind::Int, 4, 4),
      Type::new(TypeKind::Long, 8, 8),
      Type::new(TypeKind::Char, 1, 1).unsigned(),
      Type::new(TypeKind::Short, 2, 2).unsigned(),
      Type::new(TypeKind::Int, 4, 4).unsigned(),
      Type::new(TypeKind::Long, 8, 8).unsigned(),
      Type::new(TypeKind::Float, 4, 4),
      Type::new(TypeKind::Double, 8, 8),
    ];
    Self { types }
  }

  fn push(&mut self, ty: Type) -> TypeId {
    let id = TypeId(self.types.len() as u32);
    self.types.push(ty);
    id
  }

  pub fn get(&self, id: TypeId) -> &Type {
    &self.types[id.index()]
  }

  pub fn kind(&self, id: TypeId) -> TypeKind {
    self.get(id).kind
  }

  pub fn size(&self, id: TypeId) -> i64 {
    self.get(id).size
  }

  pub fn align(&self, id: TypeId) -> i64 {
    self.get(id).align
  }

  pub fn is_unsigned(&self, id: TypeId) -> bool {
    self.get(id).is_unsigned
  }

  pub fn base(&self, id: TypeId) -> Option<TypeId> {
    self.get(id).base
  }

  pub fn members(&self, id: TypeId) -> &[Member] {
    &self.get(id).members
  }

  pub fn pointer_to(&mut self, base: TypeId) -> TypeId {
    let mut ty = Type::new(TypeKind::Ptr, 8, 8).unsigned();
    ty.base = Some(base);
    self.push(ty)
  }

  /// Array of `len` elements; a negative length leaves the array incomplete.
  pub fn array_of(&mut self, base: TypeId, len: i64) -> TypeId {
    let elem = self.get(base);
    let size = if len < 0 || elem.size < 0 {
      -1
    } else {
      elem.size * len
    };
    let mut ty = Type::new(TypeKind::Array, size, elem.align);
    ty.base = Some(base);
    ty.array_len = len;
    self.push(ty)
  }

  pub fn func_type(&mut self, return_ty: TypeId, params: Vec<TypeId>, is_variadic: bool) -> TypeId {
    let mut ty = Type::new(TypeKind::Func, 1, 1);
    ty.return_ty = Some(return_ty);
    ty.params = params;
    ty.is_variadic = is_variadic;
    self.push(ty)
  }

  pub fn enum_type(&mut self) -> TypeId {
    self.push(Type::new(TypeKind::Enum, 4, 4))
  }

  /// A struct or union whose members are not known yet.
  pub fn new_aggregate(&mut self, kind: TypeKind) -> TypeId {
    debug_assert!(matches!(kind, TypeKind::Struct | TypeKind::Union));
    self.push(Type::new(kind, -1, 1))
  }

  /// Lay out `members` and install them into the incomplete aggregate `id`.
  ///
  /// Struct members are placed in declaration order, each at the running
  /// offset rounded up to its own alignment. Union members all sit at offset
  /// zero. A trailing array of unknown length becomes a zero-length flexible
  /// member that only an initializer can size.
  pub fn define_aggregate(&mut self, id: TypeId, mut members: Vec<Member>) {
    let kind = self.kind(id);
    debug_assert_eq!(self.size(id), -1, "aggregate defined twice");

    let last = members.len().saturating_sub(1);
    let mut is_flexible = false;
    for i in 0..members.len() {
      let (member_kind, array_len, base) = {
        let ty = self.get(members[i].ty);
        (ty.kind, ty.array_len, ty.base)
      };
      if kind == TypeKind::Struct && i == last && member_kind == TypeKind::Array && array_len < 0 {
        if let Some(base) = base {
          members[i].ty = self.array_of(base, 0);
          is_flexible = true;
        }
      }
      members[i].align = self.align(members[i].ty);
    }

    let mut end = 0;
    let mut align = 1;
    for member in &mut members {
      let size = self.get(member.ty).size.max(0);
      if kind == TypeKind::Struct {
        member.offset = align_to(end, member.align);
        end = member.offset + size;
      } else {
        member.offset = 0;
        end = end.max(size);
      }
      align = align.max(member.align);
    }

    let ty = &mut self.types[id.index()];
    ty.members = members;
    ty.is_flexible = is_flexible;
    ty.align = align;
    ty.size = align_to(end, align);
  }

  /// Copy of a flexible struct with its trailing array sized to `array_ty`.
  ///
  /// The copy is a fresh type so other objects of the same tag keep the
  /// zero-length layout.
  pub fn with_flexible_member(&mut self, id: TypeId, array_ty: TypeId) -> TypeId {
    let mut ty = self.get(id).clone();
    let added = self.size(array_ty).max(0);
    if let Some(last) = ty.members.last_mut() {
      last.ty = array_ty;
    }
    ty.size += added;
    ty.is_flexible = false;
    self.push(ty)
  }

  pub fn is_integer(&self, id: TypeId) -> bool {
    matches!(
      self.kind(id),
      TypeKind::Bool
        | TypeKind::Char
        | TypeKind::Short
        | TypeKind::Int
        | TypeKind::Long
        | TypeKind::Enum
    )
  }

  pub fn is_flonum(&self, id: TypeId) -> bool {
    matches!(self.kind(id), TypeKind::Float | TypeKind::Double)
  }

  pub fn is_numeric(&self, id: TypeId) -> bool {
    self.is_integer(id) || self.is_flonum(id)
  }

  /// True for pointers and arrays, the types that carry a base.
  pub fn is_pointer_like(&self, id: TypeId) -> bool {
    self.base(id).is_some()
  }

  pub fn is_aggregate(&self, id: TypeId) -> bool {
    matches!(self.kind(id), TypeKind::Struct | TypeKind::Union)
  }

  pub fn is_compatible(&self, a: TypeId, b: TypeId) -> bool {
    if a == b {
      return true;
    }
    let (ta, tb) = (self.get(a), self.get(b));
    if ta.kind != tb.kind {
      return false;
    }
    match ta.kind {
      TypeKind::Char | TypeKind::Short | TypeKind::Int | TypeKind::Long => {
        ta.is_unsigned == tb.is_unsigned
      }
      TypeKind::Void | TypeKind::Bool | TypeKind::Float | TypeKind::Double => true,
      TypeKind::Ptr => match (ta.base, tb.base) {
        (Some(x), Some(y)) => self.is_compatible(x, y),
        _ => false,
      },
      TypeKind::Array => {
        let same_len = ta.array_len < 0 || tb.array_len < 0 || ta.array_len == tb.array_len;
        match (ta.base, tb.base) {
          (Some(x), Some(y)) => same_len && self.is_compatible(x, y),
          _ => false,
        }
      }
      TypeKind::Func => {
        let returns = match (ta.return_ty, tb.return_ty) {
          (Some(x), Some(y)) => self.is_compatible(x, y),
          _ => false,
        };
        returns
          && ta.is_variadic == tb.is_variadic
          && ta.params.len() == tb.params.len()
          && ta
            .params
            .iter()
            .zip(&tb.params)
            .all(|(&x, &y)| self.is_compatible(x, y))
      }
      TypeKind::Enum | TypeKind::Struct | TypeKind::Union => false,
    }
  }

  /// Usual arithmetic conversion.
  ///
  /// `double` dominates `float`, which dominates every integer. Integers are
  /// promoted to at least `int`, then the wider operand wins and on a tie the
  /// unsigned one does.
  pub fn common_type(&mut self, a: TypeId, b: TypeId) -> TypeId {
    if let Some(base) = self.base(a) {
      return self.pointer_to(base);
    }
    if let Some(base) = self.base(b) {
      return self.pointer_to(base);
    }
    if self.kind(a) == TypeKind::Func {
      return self.pointer_to(a);
    }
    if self.kind(b) == TypeKind::Func {
      return self.pointer_to(b);
    }

    if self.kind(a) == TypeKind::Double || self.kind(b) == TypeKind::Double {
      return TypeId::DOUBLE;
    }
    if self.kind(a) == TypeKind::Float || self.kind(b) == TypeKind::Float {
      return TypeId::FLOAT;
    }

    let a = self.promote(a);
    let b = self.promote(b);
    if self.size(a) != self.size(b) {
      return if self.size(a) > self.size(b) { a } else { b };
    }
    if self.is_unsigned(b) {
      b
    } else {
      a
    }
  }

  /// Canonical `int`, `unsigned int`, `long` or `unsigned long` for an integer.
  fn promote(&self, id: TypeId) -> TypeId {
    match (self.size(id) >= 8, self.size(id) >= 4 && self.is_unsigned(id)) {
      (true, true) => TypeId::ULONG,
      (true, false) => TypeId::LONG,
      (false, true) => TypeId::UINT,
      (false, false) => TypeId::INT,
    }
  }
}

#[cfg(test)]
mod ty_tests;
