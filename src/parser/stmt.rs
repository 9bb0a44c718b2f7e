//! Statements and blocks.

use std::mem;

use super::decl::VarAttr;
use super::{Parser, SwitchContext};
use crate::ast::{Node, NodeKind};
use crate::error::{CompileResult, Loc};
use crate::ty::{TypeId, TypeKind};

impl<'a> Parser<'a> {
  /// Block body after its opening `{`. Locals of the block may share frame
  /// space with those of a sibling block.
  pub(super) fn compound_stmt(&mut self, loc: Loc) -> CompileResult<Node> {
    let saved = self.enter_block_scope();
    let items = self.block_items();
    self.exit_block_scope(saved);
    Ok(Node::new(NodeKind::Block(items?), TypeId::VOID, loc))
  }

  /// (declaration | stmt)* "}"
  pub(super) fn block_items(&mut self) -> CompileResult<Vec<Node>> {
    let mut items = Vec::new();
    while !self.stream.consume("}") {
      if self.stream.is_eof() {
        return Err(self.stream.error("expected \"}\" before end of input"));
      }

      if self.is_typename() && !self.stream.is_at(1, ":") {
        let mut attr = VarAttr::default();
        let basety = self.declspec(Some(&mut attr))?;
        if attr.is_typedef {
          self.parse_typedef(basety)?;
          continue;
        }
        items.push(self.declaration(basety, attr)?);
        continue;
      }
      items.push(self.stmt()?);
    }
    Ok(items)
  }

  fn stmt(&mut self) -> CompileResult<Node> {
    let loc = self.stream.loc();

    if self.stream.consume("return") {
      return self.return_stmt(loc);
    }

    if self.stream.consume("if") {
      self.stream.expect("(")?;
      let cond = self.expr()?;
      self.check_scalar(&cond)?;
      self.stream.expect(")")?;
      let then = self.stmt()?;
      let els = if self.stream.consume("else") {
        Some(Box::new(self.stmt()?))
      } else {
        None
      };
      return Ok(Node::new(
        NodeKind::If {
          cond: Box::new(cond),
          then: Box::new(then),
          els,
        },
        TypeId::VOID,
        loc,
      ));
    }

    if self.stream.consume("switch") {
      return self.switch_stmt(loc);
    }

    if self.stream.consume("case") {
      return self.case_stmt(loc);
    }

    if self.stream.consume("default") {
      if self.switch.is_none() {
        return Err(self.semantic(loc, "stray 'default'"));
      }
      self.stream.expect(":")?;
      let label = self.new_unique_name();
      let Some(switch) = self.switch.as_mut() else {
        return Err(self.semantic(loc, "stray 'default'"));
      };
      if switch.default.is_some() {
        return Err(self.semantic(loc, "multiple default labels in one switch"));
      }
      switch.default = Some(label.clone());
      let body = self.stmt()?;
      return Ok(Node::new(NodeKind::Case { label, body: Box::new(body) }, TypeId::VOID, loc));
    }

    if self.stream.consume("for") {
      return self.for_stmt(loc);
    }

    if self.stream.consume("while") {
      self.stream.expect("(")?;
      let cond = self.expr()?;
      self.check_scalar(&cond)?;
      self.stream.expect(")")?;

      let brk = self.new_unique_name();
      let cont = self.new_unique_name();
      let body = self.with_loop_labels(&brk, Some(&cont), |p| p.stmt())?;
      return Ok(Node::new(
        NodeKind::While {
          cond: Box::new(cond),
          body: Box::new(body),
          brk,
          cont,
        },
        TypeId::VOID,
        loc,
      ));
    }

    if self.stream.consume("do") {
      let brk = self.new_unique_name();
      let cont = self.new_unique_name();
      let body = self.with_loop_labels(&brk, Some(&cont), |p| p.stmt())?;

      self.stream.expect("while")?;
      self.stream.expect("(")?;
      let cond = self.expr()?;
      self.check_scalar(&cond)?;
      self.stream.expect(")")?;
      self.stream.expect(";")?;
      return Ok(Node::new(
        NodeKind::DoWhile {
          body: Box::new(body),
          cond: Box::new(cond),
          brk,
          cont,
        },
        TypeId::VOID,
        loc,
      ));
    }

    if self.stream.consume("goto") {
      let (name, name_loc) = self.stream.expect_ident()?;
      self.stream.expect(";")?;
      let label = self.label_for(&name, name_loc)?;
      self.func_mut(loc)?.gotos.push((name, name_loc));
      return Ok(Node::new(NodeKind::Goto(label), TypeId::VOID, loc));
    }

    if self.stream.consume("break") {
      let Some(label) = self.brk_label.clone() else {
        return Err(self.semantic(loc, "stray 'break'"));
      };
      self.stream.expect(";")?;
      return Ok(Node::new(NodeKind::Goto(label), TypeId::VOID, loc));
    }

    if self.stream.consume("continue") {
      let Some(label) = self.cont_label.clone() else {
        return Err(self.semantic(loc, "stray 'continue'"));
      };
      self.stream.expect(";")?;
      return Ok(Node::new(NodeKind::Goto(label), TypeId::VOID, loc));
    }

    if self.stream.is_ident() && self.stream.is_at(1, ":") {
      let (name, name_loc) = self.stream.expect_ident()?;
      self.stream.expect(":")?;
      let label = self.label_for(&name, name_loc)?;
      if !self.func_mut(loc)?.declared_labels.insert(name.clone()) {
        return Err(self.semantic(name_loc, format!("duplicate label '{name}'")));
      }
      let body = self.stmt()?;
      return Ok(Node::new(NodeKind::Label { label, body: Box::new(body) }, TypeId::VOID, loc));
    }

    if self.stream.consume("{") {
      return self.compound_stmt(loc);
    }

    if self.stream.consume(";") {
      return Ok(Node::new(NodeKind::Block(Vec::new()), TypeId::VOID, loc));
    }

    self.expr_stmt()
  }

  fn expr_stmt(&mut self) -> CompileResult<Node> {
    let loc = self.stream.loc();
    let expr = self.expr()?;
    self.stream.expect(";")?;
    Ok(Node::new(NodeKind::ExprStmt(Box::new(expr)), TypeId::VOID, loc))
  }

  fn return_stmt(&mut self, loc: Loc) -> CompileResult<Node> {
    let return_ty = self.func_mut(loc)?.return_ty;
    if self.stream.consume(";") {
      return Ok(Node::new(NodeKind::Return(None), TypeId::VOID, loc));
    }

    let expr = self.expr()?;
    self.stream.expect(";")?;
    if self.types.is_aggregate(expr.ty) {
      return Err(self.semantic(expr.loc, "returning a struct or union by value is not supported"));
    }
    let expr = if self.types.kind(return_ty) == TypeKind::Void {
      expr
    } else {
      self.new_cast(expr, return_ty)
    };
    Ok(Node::new(NodeKind::Return(Some(Box::new(expr))), TypeId::VOID, loc))
  }

  fn for_stmt(&mut self, loc: Loc) -> CompileResult<Node> {
    self.stream.expect("(")?;
    let saved = self.enter_block_scope();
    let result = self.for_clauses(loc);
    self.exit_block_scope(saved);
    result
  }

  fn for_clauses(&mut self, loc: Loc) -> CompileResult<Node> {
    let init = if self.is_typename() {
      let mut attr = VarAttr::default();
      let basety = self.declspec(Some(&mut attr))?;
      if attr.is_typedef {
        return Err(self.semantic(loc, "typedef is not allowed in a for-loop initializer"));
      }
      Some(Box::new(self.declaration(basety, attr)?))
    } else if self.stream.consume(";") {
      None
    } else {
      Some(Box::new(self.expr_stmt()?))
    };

    let cond = if self.stream.is(";") {
      None
    } else {
      let cond = self.expr()?;
      self.check_scalar(&cond)?;
      Some(Box::new(cond))
    };
    self.stream.expect(";")?;

    let inc = if self.stream.is(")") {
      None
    } else {
      Some(Box::new(self.expr()?))
    };
    self.stream.expect(")")?;

    let brk = self.new_unique_name();
    let cont = self.new_unique_name();
    let body = self.with_loop_labels(&brk, Some(&cont), |p| p.stmt())?;
    Ok(Node::new(
      NodeKind::For {
        init,
        cond,
        inc,
        body: Box::new(body),
        brk,
        cont,
      },
      TypeId::VOID,
      loc,
    ))
  }

  fn switch_stmt(&mut self, loc: Loc) -> CompileResult<Node> {
    self.stream.expect("(")?;
    let cond = self.expr()?;
    if !self.types.is_integer(cond.ty) {
      return Err(self.semantic(cond.loc, "switch quantity is not an integer"));
    }
    self.stream.expect(")")?;

    let brk = self.new_unique_name();
    let outer = mem::replace(&mut self.switch, Some(SwitchContext::default()));
    let body = self.with_loop_labels(&brk, None, |p| p.stmt());
    let ctx = mem::replace(&mut self.switch, outer).unwrap_or_default();
    let body = body?;

    Ok(Node::new(
      NodeKind::Switch {
        cond: Box::new(cond),
        body: Box::new(body),
        cases: ctx.cases,
        default: ctx.default,
        brk,
      },
      TypeId::VOID,
      loc,
    ))
  }

  fn case_stmt(&mut self, loc: Loc) -> CompileResult<Node> {
    if self.switch.is_none() {
      return Err(self.semantic(loc, "stray 'case'"));
    }
    let value_loc = self.stream.loc();
    let value = self.const_expr()?;
    self.stream.expect(":")?;
    let label = self.new_unique_name();

    let Some(switch) = self.switch.as_mut() else {
      return Err(self.semantic(loc, "stray 'case'"));
    };
    if switch.cases.iter().any(|(v, _)| *v == value) {
      return Err(self.semantic(value_loc, format!("duplicate case value {value}")));
    }
    switch.cases.push((value, label.clone()));

    let body = self.stmt()?;
    Ok(Node::new(NodeKind::Case { label, body: Box::new(body) }, TypeId::VOID, loc))
  }

  /// Assembler label for the source label `name`, allocated on first use so
  /// forward `goto`s and the labeled statement agree.
  fn label_for(&mut self, name: &str, loc: Loc) -> CompileResult<String> {
    if let Some(label) = self.func_mut(loc)?.labels.get(name) {
      return Ok(label.clone());
    }
    let label = self.new_unique_name();
    self.func_mut(loc)?.labels.insert(name.to_string(), label.clone());
    Ok(label)
  }
}
