//! Typed syntax tree and the program the parser hands to code generation.
//!
//! Every node carries its resolved type and the token it came from. Objects
//! (variables and functions) live in a flat arena inside [`Program`] and are
//! referenced from the tree by [`ObjId`].

use crate::error::Loc;
use crate::ty::{TypeId, Types};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjId(pub(crate) usize);

/// Binary operators after desugaring; `>` and `>=` become `<` and `<=`
/// with swapped operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Mod,
  BitAnd,
  BitOr,
  BitXor,
  Shl,
  Shr,
  Eq,
  Ne,
  Lt,
  Le,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
  pub kind: NodeKind,
  pub ty: TypeId,
  pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
  NullExpr,
  Num(i64),
  FNum(f64),
  Var(ObjId),
  Member {
    base: Box<Node>,
    offset: i64,
  },
  Addr(Box<Node>),
  Deref(Box<Node>),
  Neg(Box<Node>),
  Not(Box<Node>),
  BitNot(Box<Node>),
  Binary {
    op: BinaryOp,
    lhs: Box<Node>,
    rhs: Box<Node>,
  },
  LogAnd(Box<Node>, Box<Node>),
  LogOr(Box<Node>, Box<Node>),
  Assign(Box<Node>, Box<Node>),
  Comma(Box<Node>, Box<Node>),
  Cast(Box<Node>),
  Cond {
    cond: Box<Node>,
    then: Box<Node>,
    els: Box<Node>,
  },
  Call {
    name: String,
    func_ty: TypeId,
    args: Vec<Node>,
  },
  /// Zero the whole storage of a local before its initializer runs.
  MemZero(ObjId),
  StmtExpr(Vec<Node>),

  Block(Vec<Node>),
  If {
    cond: Box<Node>,
    then: Box<Node>,
    els: Option<Box<Node>>,
  },
  For {
    init: Option<Box<Node>>,
    cond: Option<Box<Node>>,
    inc: Option<Box<Node>>,
    body: Box<Node>,
    brk: String,
    cont: String,
  },
  While {
    cond: Box<Node>,
    body: Box<Node>,
    brk: String,
    cont: String,
  },
  DoWhile {
    body: Box<Node>,
    cond: Box<Node>,
    brk: String,
    cont: String,
  },
  Switch {
    cond: Box<Node>,
    body: Box<Node>,
    /// Case values with their labels, in source order.
    cases: Vec<(i64, String)>,
    default: Option<String>,
    brk: String,
  },
  Case {
    label: String,
    body: Box<Node>,
  },
  /// Jump to an assembler label; `break` and `continue` lower to this too.
  Goto(String),
  Label {
    label: String,
    body: Box<Node>,
  },
  Return(Option<Box<Node>>),
  ExprStmt(Box<Node>),
}

impl Node {
  pub fn new(kind: NodeKind, ty: TypeId, loc: Loc) -> Self {
    Self { kind, ty, loc }
  }
}

/// Address of another symbol stored into a global's data at `offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
  pub offset: i64,
  pub label: String,
  pub addend: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
  pub params: Vec<ObjId>,
  pub body: Node,
  pub locals: Vec<ObjId>,
  pub stack_size: i64,
  /// Register save area of a variadic function.
  pub va_area: Option<ObjId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Obj {
  pub name: String,
  pub ty: TypeId,
  pub loc: Loc,
  pub is_global: bool,
  pub is_static: bool,
  /// Globals: storage is emitted here. Functions: a body was seen.
  pub is_definition: bool,
  /// Bytes below the frame base for a local.
  pub offset: i64,
  pub align: i64,
  pub init_data: Option<Vec<u8>>,
  pub relocations: Vec<Relocation>,
  pub func: Option<Function>,
}

impl Obj {
  pub fn new(name: impl Into<String>, ty: TypeId, loc: Loc, is_global: bool, align: i64) -> Self {
    Self {
      name: name.into(),
      ty,
      loc,
      is_global,
      is_static: false,
      is_definition: false,
      offset: 0,
      align,
      init_data: None,
      relocations: Vec::new(),
      func: None,
    }
  }
}

/// Everything the code generator needs for one translation unit.
#[derive(Debug, Clone)]
pub struct Program {
  pub types: Types,
  pub objs: Vec<Obj>,
  /// Global variables in declaration order, string literals included.
  pub globals: Vec<ObjId>,
  /// Functions in declaration order, prototypes included.
  pub functions: Vec<ObjId>,
}

impl Program {
  pub fn obj(&self, id: ObjId) -> &Obj {
    &self.objs[id.0]
  }

  /// Global or function named `name`, preferring the defining declaration.
  pub fn find(&self, name: &str) -> Option<&Obj> {
    let mut named = self
      .globals
      .iter()
      .chain(&self.functions)
      .map(|&id| self.obj(id))
      .filter(|obj| obj.name == name);
    let first = named.clone().next();
    named.find(|obj| obj.is_definition).or(first)
  }
}
