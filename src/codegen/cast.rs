//! Conversion sequences between the ten scalar machine representations.
//!
//! The value to convert is in `rax`/`eax` for integers and `xmm0` for
//! floating point; the result is left in the same place.

use crate::ty::{TypeId, TypeKind, Types};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Repr {
  I8,
  I16,
  I32,
  I64,
  U8,
  U16,
  U32,
  U64,
  F32,
  F64,
}

impl Repr {
  pub(crate) fn of(types: &Types, ty: TypeId) -> Self {
    let unsigned = types.is_unsigned(ty);
    match types.kind(ty) {
      TypeKind::Char if unsigned => Repr::U8,
      TypeKind::Char => Repr::I8,
      TypeKind::Short if unsigned => Repr::U16,
      TypeKind::Short => Repr::I16,
      TypeKind::Int if unsigned => Repr::U32,
      TypeKind::Int | TypeKind::Enum => Repr::I32,
      TypeKind::Long if unsigned => Repr::U64,
      TypeKind::Long => Repr::I64,
      TypeKind::Float => Repr::F32,
      TypeKind::Double => Repr::F64,
      TypeKind::Bool => Repr::U8,
      _ => Repr::U64,
    }
  }
}

type Seq = Option<&'static [&'static str]>;

const I32I8: Seq = Some(&["movsx eax, al"]);
const I32U8: Seq = Some(&["movzx eax, al"]);
const I32I16: Seq = Some(&["movsx eax, ax"]);
const I32U16: Seq = Some(&["movzx eax, ax"]);
const I32F32: Seq = Some(&["cvtsi2ss xmm0, eax"]);
const I32I64: Seq = Some(&["movsxd rax, eax"]);
const I32F64: Seq = Some(&["cvtsi2sd xmm0, eax"]);

const U32F32: Seq = Some(&["mov eax, eax", "cvtsi2ss xmm0, rax"]);
const U32I64: Seq = Some(&["mov eax, eax"]);
const U32F64: Seq = Some(&["mov eax, eax", "cvtsi2sd xmm0, rax"]);

const I64F32: Seq = Some(&["cvtsi2ss xmm0, rax"]);
const I64F64: Seq = Some(&["cvtsi2sd xmm0, rax"]);

// Values with the top bit set are halved (keeping the low bit) before the
// signed conversion and doubled afterwards.
const U64F32: Seq = Some(&[
  "test rax, rax",
  "js 1f",
  "pxor xmm0, xmm0",
  "cvtsi2ss xmm0, rax",
  "jmp 2f",
  "1:",
  "mov rdi, rax",
  "and eax, 1",
  "pxor xmm0, xmm0",
  "shr rdi",
  "or rdi, rax",
  "cvtsi2ss xmm0, rdi",
  "addss xmm0, xmm0",
  "2:",
]);
const U64F64: Seq = Some(&[
  "test rax, rax",
  "js 1f",
  "pxor xmm0, xmm0",
  "cvtsi2sd xmm0, rax",
  "jmp 2f",
  "1:",
  "mov rdi, rax",
  "and eax, 1",
  "pxor xmm0, xmm0",
  "shr rdi",
  "or rdi, rax",
  "cvtsi2sd xmm0, rdi",
  "addsd xmm0, xmm0",
  "2:",
]);

const F32I8: Seq = Some(&["cvttss2si eax, xmm0", "movsx eax, al"]);
const F32U8: Seq = Some(&["cvttss2si eax, xmm0", "movzx eax, al"]);
const F32I16: Seq = Some(&["cvttss2si eax, xmm0", "movsx eax, ax"]);
const F32U16: Seq = Some(&["cvttss2si eax, xmm0", "movzx eax, ax"]);
const F32I32: Seq = Some(&["cvttss2si eax, xmm0"]);
const F32U32: Seq = Some(&["cvttss2si rax, xmm0"]);
const F32I64: Seq = Some(&["cvttss2si rax, xmm0"]);
const F32U64: Seq = Some(&["cvttss2si rax, xmm0"]);
const F32F64: Seq = Some(&["cvtss2sd xmm0, xmm0"]);

const F64I8: Seq = Some(&["cvttsd2si eax, xmm0", "movsx eax, al"]);
const F64U8: Seq = Some(&["cvttsd2si eax, xmm0", "movzx eax, al"]);
const F64I16: Seq = Some(&["cvttsd2si eax, xmm0", "movsx eax, ax"]);
const F64U16: Seq = Some(&["cvttsd2si eax, xmm0", "movzx eax, ax"]);
const F64I32: Seq = Some(&["cvttsd2si eax, xmm0"]);
const F64U32: Seq = Some(&["cvttsd2si rax, xmm0"]);
const F64I64: Seq = Some(&["cvttsd2si rax, xmm0"]);
const F64U64: Seq = Some(&["cvttsd2si rax, xmm0"]);
const F64F32: Seq = Some(&["cvtsd2ss xmm0, xmm0"]);

/// `CAST_TABLE[from][to]`; `None` means the bits are already right.
#[rustfmt::skip]
const CAST_TABLE: [[Seq; 10]; 10] = [
  // to: i8   i16     i32     i64     u8     u16     u32     u64     f32     f64
  [None,  None,   None,   I32I64, I32U8, I32U16, None,   I32I64, I32F32, I32F64], // i8
  [I32I8, None,   None,   I32I64, I32U8, I32U16, None,   I32I64, I32F32, I32F64], // i16
  [I32I8, I32I16, None,   I32I64, I32U8, I32U16, None,   I32I64, I32F32, I32F64], // i32
  [I32I8, I32I16, None,   None,   I32U8, I32U16, None,   None,   I64F32, I64F64], // i64
  [I32I8, None,   None,   I32I64, None,  None,   None,   I32I64, I32F32, I32F64], // u8
  [I32I8, I32I16, None,   I32I64, I32U8, None,   None,   I32I64, I32F32, I32F64], // u16
  [I32I8, I32I16, None,   U32I64, I32U8, I32U16, None,   U32I64, U32F32, U32F64], // u32
  [I32I8, I32I16, None,   None,   I32U8, I32U16, None,   None,   U64F32, U64F64], // u64
  [F32I8, F32I16, F32I32, F32I64, F32U8, F32U16, F32U32, F32U64, None,   F32F64], // f32
  [F64I8, F64I16, F64I32, F64I64, F64U8, F64U16, F64U32, F64U64, F64F32, None],   // f64
];

/// Instructions converting a `from` value into a `to` value.
pub(crate) fn conversion(from: Repr, to: Repr) -> &'static [&'static str] {
  CAST_TABLE[from as usize][to as usize].unwrap_or(&[])
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn same_representation_needs_no_code() {
    for repr in [Repr::I8, Repr::I32, Repr::U64, Repr::F32, Repr::F64] {
      assert!(conversion(repr, repr).is_empty());
    }
  }

  #[test]
  fn widening_respects_signedness() {
    assert_eq!(conversion(Repr::I32, Repr::I64), ["movsxd rax, eax"]);
    assert_eq!(conversion(Repr::U32, Repr::I64), ["mov eax, eax"]);
    assert_eq!(conversion(Repr::I64, Repr::U8), ["movzx eax, al"]);
  }

  #[test]
  fn floating_conversions() {
    assert_eq!(conversion(Repr::F64, Repr::I32), ["cvttsd2si eax, xmm0"]);
    assert_eq!(conversion(Repr::F32, Repr::F64), ["cvtss2sd xmm0, xmm0"]);
    let u64_to_double = conversion(Repr::U64, Repr::F64);
    assert_eq!(u64_to_double.first(), Some(&"test rax, rax"));
    assert_eq!(u64_to_double.last(), Some(&"2:"));
  }

  #[test]
  fn representation_of_source_types() {
    let mut types = Types::new();
    let ptr = types.pointer_to(TypeId::INT);
    let enum_ty = types.enum_type();
    assert_eq!(Repr::of(&types, TypeId::UCHAR), Repr::U8);
    assert_eq!(Repr::of(&types, TypeId::BOOL), Repr::U8);
    assert_eq!(Repr::of(&types, TypeId::LONG), Repr::I64);
    assert_eq!(Repr::of(&types, enum_ty), Repr::I32);
    assert_eq!(Repr::of(&types, ptr), Repr::U64);
  }
}
