use super::*;
use crate::ast::ObjId;
use crate::error::Loc;
use crate::ty::TypeId;
use pretty_assertions::assert_eq;

fn num(value: i64, ty: TypeId) -> Node {
  Node::new(NodeKind::Num(value), ty, Loc::default())
}

fn binary(op: BinaryOp, lhs: Node, rhs: Node, ty: TypeId) -> Node {
  Node::new(
    NodeKind::Binary {
      op,
      lhs: Box::new(lhs),
      rhs: Box::new(rhs),
    },
    ty,
    Loc::default(),
  )
}

fn cast(operand: Node, ty: TypeId) -> Node {
  Node::new(NodeKind::Cast(Box::new(operand)), ty, Loc::default())
}

fn int(value: i64) -> Node {
  num(value, TypeId::INT)
}

#[test]
fn folds_integer_arithmetic() {
  let types = Types::new();
  let evaluator = Evaluator::new(&types, &[]);

  let expr = binary(
    BinaryOp::Add,
    int(2),
    binary(BinaryOp::Mul, int(3), int(4), TypeId::INT),
    TypeId::INT,
  );
  assert_eq!(evaluator.eval(&expr).unwrap(), 14);

  let mask = binary(
    BinaryOp::Sub,
    binary(BinaryOp::Shl, int(1), int(4), TypeId::INT),
    int(1),
    TypeId::INT,
  );
  assert_eq!(evaluator.eval(&mask).unwrap(), 15);
}

#[test]
fn unsigned_operands_use_unsigned_semantics() {
  let types = Types::new();
  let evaluator = Evaluator::new(&types, &[]);

  let div = binary(BinaryOp::Div, num(-2, TypeId::ULONG), num(2, TypeId::ULONG), TypeId::ULONG);
  assert_eq!(evaluator.eval(&div).unwrap(), i64::MAX);

  let lt = binary(BinaryOp::Lt, num(-1, TypeId::ULONG), num(1, TypeId::ULONG), TypeId::INT);
  assert_eq!(evaluator.eval(&lt).unwrap(), 0);

  let signed_lt = binary(BinaryOp::Lt, num(-1, TypeId::LONG), num(1, TypeId::LONG), TypeId::INT);
  assert_eq!(evaluator.eval(&signed_lt).unwrap(), 1);

  let shr = binary(BinaryOp::Shr, num(-1, TypeId::ULONG), num(60, TypeId::ULONG), TypeId::ULONG);
  assert_eq!(evaluator.eval(&shr).unwrap(), 15);
}

#[test]
fn casts_truncate_to_the_target_width() {
  let types = Types::new();
  let evaluator = Evaluator::new(&types, &[]);

  assert_eq!(evaluator.eval(&cast(int(300), TypeId::CHAR)).unwrap(), 44);
  assert_eq!(evaluator.eval(&cast(int(255), TypeId::CHAR)).unwrap(), -1);
  assert_eq!(evaluator.eval(&cast(int(255), TypeId::UCHAR)).unwrap(), 255);
  assert_eq!(evaluator.eval(&cast(int(-1), TypeId::UINT)).unwrap(), 0xffff_ffff);
  assert_eq!(evaluator.eval(&cast(int(7), TypeId::BOOL)).unwrap(), 1);

  let double = Node::new(NodeKind::FNum(3.75), TypeId::DOUBLE, Loc::default());
  assert_eq!(evaluator.eval(&cast(double, TypeId::INT)).unwrap(), 3);
}

#[test]
fn division_by_zero_is_rejected() {
  let types = Types::new();
  let evaluator = Evaluator::new(&types, &[]);
  let expr = binary(BinaryOp::Div, int(1), int(0), TypeId::INT);
  assert!(evaluator.eval(&expr).is_err());
}

#[test]
fn locals_are_not_constant() {
  let types = Types::new();
  let objs = vec![Obj::new("x", TypeId::INT, Loc::default(), false, 4)];
  let evaluator = Evaluator::new(&types, &objs);
  let var = Node::new(NodeKind::Var(ObjId(0)), TypeId::INT, Loc::default());
  let err = evaluator.eval(&var).unwrap_err();
  assert!(matches!(err, CompileError::NotConstant { .. }));
}

#[test]
fn address_of_a_global_folds_to_a_label() {
  let mut types = Types::new();
  let arr = types.array_of(TypeId::INT, 3);
  let ptr = types.pointer_to(TypeId::INT);
  let objs = vec![Obj::new("g", arr, Loc::default(), true, 4)];
  let evaluator = Evaluator::new(&types, &objs);

  let var = Node::new(NodeKind::Var(ObjId(0)), arr, Loc::default());
  let plus_one = binary(BinaryOp::Add, var, num(4, TypeId::LONG), ptr);
  assert_eq!(
    evaluator.eval_with_label(&plus_one).unwrap(),
    (Some("g".to_string()), 4)
  );

  // The plain mode never accepts a symbolic base.
  assert!(evaluator.eval(&plus_one).is_err());
}

#[test]
fn two_symbolic_bases_are_rejected() {
  let mut types = Types::new();
  let arr = types.array_of(TypeId::INT, 3);
  let objs = vec![
    Obj::new("a", arr, Loc::default(), true, 4),
    Obj::new("b", arr, Loc::default(), true, 4),
  ];
  let evaluator = Evaluator::new(&types, &objs);
  let a = Node::new(NodeKind::Var(ObjId(0)), arr, Loc::default());
  let b = Node::new(NodeKind::Var(ObjId(1)), arr, Loc::default());
  let sum = binary(BinaryOp::Sub, a, b, TypeId::LONG);
  assert!(evaluator.eval_with_label(&sum).is_err());
}

#[test]
fn floating_constants_fold() {
  let types = Types::new();
  let evaluator = Evaluator::new(&types, &[]);
  let half = Node::new(NodeKind::FNum(0.5), TypeId::DOUBLE, Loc::default());
  let expr = binary(BinaryOp::Mul, half, cast(int(3), TypeId::DOUBLE), TypeId::DOUBLE);
  assert_eq!(evaluator.eval_double(&expr).unwrap(), 1.5);
}

#[test]
fn floating_conditions_and_comparisons_keep_fractions() {
  let types = Types::new();
  let evaluator = Evaluator::new(&types, &[]);
  let double = |value: f64| Node::new(NodeKind::FNum(value), TypeId::DOUBLE, Loc::default());

  let lt = binary(BinaryOp::Lt, double(1.5), double(1.7), TypeId::INT);
  assert_eq!(evaluator.eval(&lt).unwrap(), 1);
  let eq = binary(BinaryOp::Eq, double(0.25), double(0.5), TypeId::INT);
  assert_eq!(evaluator.eval(&eq).unwrap(), 0);

  let cond = Node::new(
    NodeKind::Cond {
      cond: Box::new(double(0.5)),
      then: Box::new(int(3)),
      els: Box::new(int(4)),
    },
    TypeId::INT,
    Loc::default(),
  );
  assert_eq!(evaluator.eval(&cond).unwrap(), 3);

  let not = Node::new(NodeKind::Not(Box::new(double(0.1))), TypeId::INT, Loc::default());
  assert_eq!(evaluator.eval(&not).unwrap(), 0);
  let and = Node::new(
    NodeKind::LogAnd(Box::new(double(0.1)), Box::new(int(1))),
    TypeId::INT,
    Loc::default(),
  );
  assert_eq!(evaluator.eval(&and).unwrap(), 1);
}
