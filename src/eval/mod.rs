//! Compile-time folding of constant expressions.
//!
//! [`Evaluator::eval`] folds a subtree to a plain 64-bit integer for array
//! bounds, enum values and `case` labels. [`Evaluator::eval_with_label`]
//! additionally admits one symbolic base, the address of a global, and is
//! only used when lowering global initializers to data plus relocations.

use crate::ast::{BinaryOp, Node, NodeKind, Obj};
use crate::error::{CompileError, CompileResult};
use crate::ty::{TypeKind, Types};

pub struct Evaluator<'a> {
  pub types: &'a Types,
  pub objs: &'a [Obj],
}

impl<'a> Evaluator<'a> {
  pub fn new(types: &'a Types, objs: &'a [Obj]) -> Self {
    Self { types, objs }
  }

  pub fn eval(&self, node: &Node) -> CompileResult<i64> {
    self.eval2(node, None)
  }

  /// Fold to `(symbol, addend)`; `symbol` is `None` for a plain integer.
  pub fn eval_with_label(&self, node: &Node) -> CompileResult<(Option<String>, i64)> {
    let mut label = None;
    let value = self.eval2(node, Some(&mut label))?;
    Ok((label, value))
  }

  fn eval2(&self, node: &Node, label: Option<&mut Option<String>>) -> CompileResult<i64> {
    if self.types.is_flonum(node.ty) {
      return Ok(self.eval_double(node)? as i64);
    }

    match &node.kind {
      NodeKind::Num(value) => Ok(*value),
      NodeKind::Binary { op, lhs, rhs } => match op {
        BinaryOp::Add => Ok(self.eval2(lhs, label)?.wrapping_add(self.eval(rhs)?)),
        BinaryOp::Sub => Ok(self.eval2(lhs, label)?.wrapping_sub(self.eval(rhs)?)),
        _ => self.eval_binary(node, *op, lhs, rhs),
      },
      NodeKind::Neg(operand) => Ok(self.eval(operand)?.wrapping_neg()),
      NodeKind::Not(operand) => Ok(i64::from(!self.is_true(operand)?)),
      NodeKind::BitNot(operand) => Ok(!self.eval(operand)?),
      NodeKind::LogAnd(lhs, rhs) => Ok(i64::from(self.is_true(lhs)? && self.is_true(rhs)?)),
      NodeKind::LogOr(lhs, rhs) => Ok(i64::from(self.is_true(lhs)? || self.is_true(rhs)?)),
      NodeKind::Cond { cond, then, els } => {
        if self.is_true(cond)? {
          self.eval2(then, label)
        } else {
          self.eval2(els, label)
        }
      }
      NodeKind::Comma(_, rhs) => self.eval2(rhs, label),
      NodeKind::Cast(operand) => {
        let value = self.eval2(operand, label)?;
        Ok(self.truncate(node, value))
      }
      NodeKind::Addr(operand) => self.eval_rval(operand, label),
      NodeKind::Member { base, offset } => {
        if label.is_none() || self.types.kind(node.ty) != TypeKind::Array {
          return Err(CompileError::NotConstant { loc: node.loc });
        }
        Ok(self.eval_rval(base, label)? + offset)
      }
      NodeKind::Var(id) => {
        let obj = &self.objs[id.0];
        let decays = matches!(self.types.kind(obj.ty), TypeKind::Array | TypeKind::Func);
        match label {
          Some(slot) if decays && obj.is_global => {
            self.set_label(slot, obj, node)?;
            Ok(0)
          }
          _ => Err(CompileError::NotConstant { loc: node.loc }),
        }
      }
      _ => Err(CompileError::NotConstant { loc: node.loc }),
    }
  }

  /// Address of an lvalue made of globals, members and dereferences.
  fn eval_rval(&self, node: &Node, label: Option<&mut Option<String>>) -> CompileResult<i64> {
    match &node.kind {
      NodeKind::Var(id) => {
        let obj = &self.objs[id.0];
        match label {
          Some(slot) if obj.is_global => {
            self.set_label(slot, obj, node)?;
            Ok(0)
          }
          _ => Err(CompileError::NotConstant { loc: node.loc }),
        }
      }
      NodeKind::Deref(operand) => self.eval2(operand, label),
      NodeKind::Member { base, offset } => Ok(self.eval_rval(base, label)? + offset),
      _ => Err(CompileError::NotConstant { loc: node.loc }),
    }
  }

  fn set_label(&self, slot: &mut Option<String>, obj: &Obj, node: &Node) -> CompileResult<()> {
    if slot.is_some() {
      return Err(CompileError::semantic(
        node.loc,
        "initializer refers to more than one symbol",
      ));
    }
    *slot = Some(obj.name.clone());
    Ok(())
  }

  /// Truth value of a scalar condition, compared in its own domain.
  fn is_true(&self, node: &Node) -> CompileResult<bool> {
    if self.types.is_flonum(node.ty) {
      return Ok(self.eval_double(node)? != 0.0);
    }
    Ok(self.eval(node)? != 0)
  }

  fn compare_double(
    &self,
    node: &Node,
    op: BinaryOp,
    lhs: &Node,
    rhs: &Node,
  ) -> CompileResult<i64> {
    let l = self.eval_double(lhs)?;
    let r = self.eval_double(rhs)?;
    let value = match op {
      BinaryOp::Eq => l == r,
      BinaryOp::Ne => l != r,
      BinaryOp::Lt => l < r,
      BinaryOp::Le => l <= r,
      _ => return Err(CompileError::NotConstant { loc: node.loc }),
    };
    Ok(i64::from(value))
  }

  fn eval_binary(&self, node: &Node, op: BinaryOp, lhs: &Node, rhs: &Node) -> CompileResult<i64> {
    if self.types.is_flonum(lhs.ty) {
      return self.compare_double(node, op, lhs, rhs);
    }
    let l = self.eval(lhs)?;
    let r = self.eval(rhs)?;
    let unsigned = self.types.is_unsigned(node.ty);
    let operands_unsigned = self.types.is_unsigned(lhs.ty);

    let value = match op {
      BinaryOp::Add => l.wrapping_add(r),
      BinaryOp::Sub => l.wrapping_sub(r),
      BinaryOp::Mul => l.wrapping_mul(r),
      BinaryOp::Div | BinaryOp::Mod => {
        if r == 0 {
          return Err(CompileError::semantic(rhs.loc, "division by zero in constant expression"));
        }
        match (op, unsigned) {
          (BinaryOp::Div, true) => ((l as u64) / (r as u64)) as i64,
          (BinaryOp::Div, false) => l.wrapping_div(r),
          (_, true) => ((l as u64) % (r as u64)) as i64,
          (_, false) => l.wrapping_rem(r),
        }
      }
      BinaryOp::BitAnd => l & r,
      BinaryOp::BitOr => l | r,
      BinaryOp::BitXor => l ^ r,
      BinaryOp::Shl => l.wrapping_shl(r as u32),
      BinaryOp::Shr => {
        if unsigned && self.types.size(node.ty) == 8 {
          ((l as u64).wrapping_shr(r as u32)) as i64
        } else {
          l.wrapping_shr(r as u32)
        }
      }
      BinaryOp::Eq => i64::from(l == r),
      BinaryOp::Ne => i64::from(l != r),
      BinaryOp::Lt if operands_unsigned => i64::from((l as u64) < (r as u64)),
      BinaryOp::Lt => i64::from(l < r),
      BinaryOp::Le if operands_unsigned => i64::from((l as u64) <= (r as u64)),
      BinaryOp::Le => i64::from(l <= r),
    };
    Ok(value)
  }

  /// Narrow `value` to the width and signedness of the cast target.
  fn truncate(&self, node: &Node, value: i64) -> i64 {
    if !self.types.is_integer(node.ty) {
      return value;
    }
    let unsigned = self.types.is_unsigned(node.ty);
    match (self.types.kind(node.ty), self.types.size(node.ty)) {
      (TypeKind::Bool, _) => i64::from(value != 0),
      (_, 1) if unsigned => i64::from(value as u8),
      (_, 1) => i64::from(value as i8),
      (_, 2) if unsigned => i64::from(value as u16),
      (_, 2) => i64::from(value as i16),
      (_, 4) if unsigned => i64::from(value as u32),
      (_, 4) => i64::from(value as i32),
      _ => value,
    }
  }

  pub fn eval_double(&self, node: &Node) -> CompileResult<f64> {
    if self.types.is_integer(node.ty) {
      let value = self.eval(node)?;
      return Ok(if self.types.is_unsigned(node.ty) {
        value as u64 as f64
      } else {
        value as f64
      });
    }

    match &node.kind {
      NodeKind::FNum(value) => Ok(*value),
      NodeKind::Binary { op, lhs, rhs } => {
        let l = self.eval_double(lhs)?;
        let r = self.eval_double(rhs)?;
        match op {
          BinaryOp::Add => Ok(l + r),
          BinaryOp::Sub => Ok(l - r),
          BinaryOp::Mul => Ok(l * r),
          BinaryOp::Div => Ok(l / r),
          _ => Err(CompileError::NotConstant { loc: node.loc }),
        }
      }
      NodeKind::Neg(operand) => Ok(-self.eval_double(operand)?),
      NodeKind::Cond { cond, then, els } => {
        if self.is_true(cond)? {
          self.eval_double(then)
        } else {
          self.eval_double(els)
        }
      }
      NodeKind::Comma(_, rhs) => self.eval_double(rhs),
      NodeKind::Cast(operand) => {
        let value = self.eval_double(operand)?;
        Ok(if self.types.kind(node.ty) == TypeKind::Float {
          f64::from(value as f32)
        } else {
          value
        })
      }
      _ => Err(CompileError::NotConstant { loc: node.loc }),
    }
  }
}

#[cfg(test)]
mod eval_tests;
