//! Lexical scopes used while parsing.
//!
//! A scope is a stack of frames. Each frame keeps its ordinary identifiers
//! (variables, typedef names and enum constants) apart from struct, union and
//! enum tags. Lookup walks the frames innermost first and, inside a frame,
//! the most recent binding first, so later declarations shadow earlier ones.

use crate::ast::ObjId;
use crate::ty::TypeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
  Var(ObjId),
  TypeAlias(TypeId),
  EnumConst { ty: TypeId, value: i64 },
}

#[derive(Debug, Default)]
struct Frame {
  vars: Vec<(String, Binding)>,
  tags: Vec<(String, TypeId)>,
}

#[derive(Debug)]
pub struct Scopes {
  frames: Vec<Frame>,
}

impl Default for Scopes {
  fn default() -> Self {
    Self::new()
  }
}

impl Scopes {
  /// A scope stack holding only the file scope.
  pub fn new() -> Self {
    Self {
      frames: vec![Frame::default()],
    }
  }

  pub fn enter_scope(&mut self) {
    self.frames.push(Frame::default());
  }

  pub fn exit_scope(&mut self) {
    debug_assert!(self.frames.len() > 1, "file scope popped");
    self.frames.pop();
  }

  pub fn is_file_scope(&self) -> bool {
    self.frames.len() == 1
  }

  fn innermost(&mut self) -> &mut Frame {
    let last = self.frames.len() - 1;
    &mut self.frames[last]
  }

  pub fn bind_variable(&mut self, name: &str, obj: ObjId) {
    self.innermost().vars.push((name.to_string(), Binding::Var(obj)));
  }

  pub fn bind_type_alias(&mut self, name: &str, ty: TypeId) {
    self.innermost().vars.push((name.to_string(), Binding::TypeAlias(ty)));
  }

  pub fn bind_enum_constant(&mut self, name: &str, ty: TypeId, value: i64) {
    self
      .innermost()
      .vars
      .push((name.to_string(), Binding::EnumConst { ty, value }));
  }

  pub fn bind_tag(&mut self, name: &str, ty: TypeId) {
    self.innermost().tags.push((name.to_string(), ty));
  }

  pub fn lookup_variable(&self, name: &str) -> Option<Binding> {
    self.frames.iter().rev().find_map(|frame| {
      frame
        .vars
        .iter()
        .rev()
        .find(|(n, _)| n == name)
        .map(|(_, binding)| *binding)
    })
  }

  /// Ordinary identifier bound at file scope, ignoring any shadowing.
  pub fn lookup_file_scope(&self, name: &str) -> Option<Binding> {
    self.frames[0]
      .vars
      .iter()
      .rev()
      .find(|(n, _)| n == name)
      .map(|(_, binding)| *binding)
  }

  pub fn lookup_tag(&self, name: &str) -> Option<TypeId> {
    self
      .frames
      .iter()
      .rev()
      .find_map(|frame| find_tag(frame, name))
  }

  /// Tag declared in the innermost frame only; used to complete a forward
  /// declaration without touching an outer tag of the same name.
  pub fn lookup_tag_in_current_scope(&self, name: &str) -> Option<TypeId> {
    self.frames.last().and_then(|frame| find_tag(frame, name))
  }
}

fn find_tag(frame: &Frame, name: &str) -> Option<TypeId> {
  frame
    .tags
    .iter()
    .rev()
    .find(|(n, _)| n == name)
    .map(|(_, ty)| *ty)
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn inner_bindings_shadow_outer_ones() {
    let mut scopes = Scopes::new();
    scopes.bind_variable("x", ObjId(0));
    scopes.enter_scope();
    scopes.bind_variable("x", ObjId(1));
    assert_eq!(scopes.lookup_variable("x"), Some(Binding::Var(ObjId(1))));
    assert_eq!(scopes.lookup_file_scope("x"), Some(Binding::Var(ObjId(0))));
    scopes.exit_scope();
    assert_eq!(scopes.lookup_variable("x"), Some(Binding::Var(ObjId(0))));
  }

  #[test]
  fn tags_and_identifiers_are_separate_namespaces() {
    let mut scopes = Scopes::new();
    scopes.bind_tag("s", TypeId::INT);
    assert_eq!(scopes.lookup_variable("s"), None);
    scopes.enter_scope();
    assert_eq!(scopes.lookup_tag("s"), Some(TypeId::INT));
    assert_eq!(scopes.lookup_tag_in_current_scope("s"), None);
    scopes.bind_enum_constant("s", TypeId::INT, 3);
    assert_eq!(
      scopes.lookup_variable("s"),
      Some(Binding::EnumConst {
        ty: TypeId::INT,
        value: 3
      })
    );
  }
}
