use super::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const SCALARS: [TypeId; 10] = [
  TypeId::BOOL,
  TypeId::CHAR,
  TypeId::SHORT,
  TypeId::INT,
  TypeId::LONG,
  TypeId::UCHAR,
  TypeId::USHORT,
  TypeId::UINT,
  TypeId::ULONG,
  TypeId::DOUBLE,
];

const INTEGERS: [TypeId; 9] = [
  TypeId::BOOL,
  TypeId::CHAR,
  TypeId::SHORT,
  TypeId::INT,
  TypeId::LONG,
  TypeId::UCHAR,
  TypeId::USHORT,
  TypeId::UINT,
  TypeId::ULONG,
];

fn member(name: &str, ty: TypeId) -> Member {
  Member {
    name: name.to_string(),
    ty,
    offset: 0,
    align: 0,
    loc: Loc::default(),
  }
}

/// Member type recipe: a scalar, optionally wrapped in an array.
fn member_strategy() -> impl Strategy<Value = (usize, Option<i64>)> {
  (0..SCALARS.len(), prop::option::of(1i64..5))
}

fn build_members(types: &mut Types, recipe: &[(usize, Option<i64>)]) -> Vec<Member> {
  recipe
    .iter()
    .enumerate()
    .map(|(i, &(idx, len))| {
      let ty = match len {
        Some(len) => types.array_of(SCALARS[idx], len),
        None => SCALARS[idx],
      };
      member(&format!("m{i}"), ty)
    })
    .collect()
}

#[test]
fn struct_of_int_and_char_is_padded_to_eight() {
  let mut types = Types::new();
  let id = types.new_aggregate(TypeKind::Struct);
  types.define_aggregate(id, vec![member("x", TypeId::INT), member("y", TypeId::CHAR)]);

  let offsets: Vec<_> = types.members(id).iter().map(|m| (m.offset, m.align)).collect();
  assert_eq!(offsets, vec![(0, 4), (4, 1)]);
  assert_eq!(types.size(id), 8);
  assert_eq!(types.align(id), 4);
}

#[test]
fn union_members_share_offset_zero() {
  let mut types = Types::new();
  let id = types.new_aggregate(TypeKind::Union);
  let chars = types.array_of(TypeId::CHAR, 5);
  types.define_aggregate(id, vec![member("c", chars), member("i", TypeId::INT)]);

  assert!(types.members(id).iter().all(|m| m.offset == 0));
  assert_eq!(types.size(id), 8);
  assert_eq!(types.align(id), 4);
}

#[test]
fn trailing_unsized_array_becomes_flexible() {
  let mut types = Types::new();
  let id = types.new_aggregate(TypeKind::Struct);
  let tail = types.array_of(TypeId::INT, -1);
  types.define_aggregate(id, vec![member("n", TypeId::CHAR), member("data", tail)]);

  assert!(types.get(id).is_flexible);
  assert_eq!(types.size(id), 4);
  assert_eq!(types.members(id)[1].offset, 4);

  let sized = types.array_of(TypeId::INT, 3);
  let grown = types.with_flexible_member(id, sized);
  assert_ne!(grown, id);
  assert_eq!(types.size(grown), 16);
  assert_eq!(types.size(id), 4, "original tag keeps its layout");
}

#[test]
fn pointers_and_arrays_carry_a_base() {
  let mut types = Types::new();
  let ptr = types.pointer_to(TypeId::INT);
  let arr = types.array_of(TypeId::INT, 3);
  let unknown = types.array_of(TypeId::INT, -1);

  assert_eq!(types.size(ptr), 8);
  assert_eq!(types.size(arr), 12);
  assert_eq!(types.size(unknown), -1);
  assert!(types.is_pointer_like(ptr) && types.is_pointer_like(arr));
  assert!(types.is_compatible(arr, unknown));
}

#[test]
fn common_type_examples() {
  let mut types = Types::new();
  assert_eq!(types.common_type(TypeId::CHAR, TypeId::CHAR), TypeId::INT);
  assert_eq!(types.common_type(TypeId::INT, TypeId::UINT), TypeId::UINT);
  assert_eq!(types.common_type(TypeId::UINT, TypeId::LONG), TypeId::LONG);
  assert_eq!(types.common_type(TypeId::LONG, TypeId::ULONG), TypeId::ULONG);
  assert_eq!(types.common_type(TypeId::FLOAT, TypeId::LONG), TypeId::FLOAT);
  assert_eq!(types.common_type(TypeId::FLOAT, TypeId::DOUBLE), TypeId::DOUBLE);

  let ptr = types.pointer_to(TypeId::CHAR);
  let common = types.common_type(ptr, TypeId::INT);
  assert_eq!(types.kind(common), TypeKind::Ptr);
  assert_eq!(types.base(common), Some(TypeId::CHAR));
}

proptest! {
  #[test]
  fn struct_layout_invariants(recipe in prop::collection::vec(member_strategy(), 1..8)) {
    let mut types = Types::new();
    let members = build_members(&mut types, &recipe);
    let id = types.new_aggregate(TypeKind::Struct);
    types.define_aggregate(id, members);

    let ty = types.get(id).clone();
    let mut previous = 0;
    for m in &ty.members {
      prop_assert!(m.offset >= previous);
      prop_assert_eq!(m.offset % m.align, 0);
      prop_assert!(ty.align >= m.align);
      previous = m.offset;
    }
    let last = ty.members.last().unwrap();
    prop_assert_eq!(ty.size % ty.align, 0);
    prop_assert!(ty.size >= last.offset + types.size(last.ty));
  }

  #[test]
  fn union_size_covers_every_member(recipe in prop::collection::vec(member_strategy(), 1..8)) {
    let mut types = Types::new();
    let members = build_members(&mut types, &recipe);
    let id = types.new_aggregate(TypeKind::Union);
    types.define_aggregate(id, members);

    let ty = types.get(id).clone();
    prop_assert_eq!(ty.size % ty.align, 0);
    for m in &ty.members {
      prop_assert_eq!(m.offset, 0);
      prop_assert!(ty.size >= types.size(m.ty));
    }
  }

  #[test]
  fn common_type_is_symmetric_and_widening(a in 0..INTEGERS.len(), b in 0..INTEGERS.len()) {
    let mut types = Types::new();
    let (a, b) = (INTEGERS[a], INTEGERS[b]);
    let ab = types.common_type(a, b);
    let ba = types.common_type(b, a);
    prop_assert_eq!(ab, ba);
    prop_assert!(types.size(ab) >= types.size(a).max(types.size(b)));
    prop_assert!(types.size(ab) >= 4);
  }
}
