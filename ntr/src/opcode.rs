//! The VM's byte opcode set. Grounded in `ntr/source/vm.c`'s `BC_*`
//! dispatch switch; each variant below corresponds to one case there.

/// A single VM instruction. Encoded to/from a single byte; operands (if
/// any) follow as varints or fixed-width constants-buffer offsets, per the
/// per-family notes on each opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    // --- Branch ---
    Branch = 0,
    BranchZ32,
    BranchNz32,
    BranchZ64,
    BranchNz64,

    // --- Constants ---
    Zero32,
    Zero64,
    ZeroF32,
    ZeroF64,
    One32,
    One64,
    OneF32,
    OneF64,
    Const32,
    Const64,
    ConstObject,

    // --- Stack-frame addressing ---
    LoadSp32,
    LoadSp64,
    StoreSp32,
    StoreSp64,

    // --- Comparisons ---
    EqI32,
    EqI64,
    EqF32,
    EqF64,
    NeI32,
    NeI64,
    NeF32,
    NeF64,
    GtI32,
    GtU32,
    GtI64,
    GtU64,
    GtF32,
    GtF64,
    LtI32,
    LtU32,
    LtI64,
    LtU64,
    LtF32,
    LtF64,
    GeI32,
    GeU32,
    GeI64,
    GeU64,
    GeF32,
    GeF64,
    LeI32,
    LeU32,
    LeI64,
    LeU64,
    LeF32,
    LeF64,

    // --- Negate / bitwise-not ---
    NegI32,
    NegI64,
    NegF32,
    NegF64,
    Not32,
    Not64,

    // --- Is-zero / is-non-zero ---
    IsZero32,
    IsZero64,
    IsZeroF32,
    IsZeroF64,
    IsNonZero32,
    IsNonZero64,
    IsNonZeroF32,
    IsNonZeroF64,

    // --- Concat ---
    Concat,

    // --- Arithmetic ---
    AddI32,
    AddI64,
    AddF32,
    AddF64,
    SubI32,
    SubI64,
    SubF32,
    SubF64,
    MulI32,
    MulI64,
    MulF32,
    MulF64,
    DivI32,
    DivU32,
    DivI64,
    DivU64,
    DivF32,
    DivF64,
    RemI32,
    RemU32,
    RemI64,
    RemU64,
    RemF32,
    RemF64,

    // --- Width conversions ---
    ExtendI32,
    ExtendU32,
    WrapI64,
    PromoteF32,
    DemoteF64,
    ConvertI32F32,
    ConvertI32F64,
    ConvertU32F32,
    ConvertU32F64,
    ConvertI64F32,
    ConvertI64F64,
    ConvertU64F32,
    ConvertU64F64,
    TruncF32I32,
    TruncF32U32,
    TruncF32I64,
    TruncF32U64,
    TruncF64I32,
    TruncF64U32,
    TruncF64I64,
    TruncF64U64,

    // --- String conversions ---
    ConvertI32Str,
    ConvertU32Str,
    ConvertI64Str,
    ConvertU64Str,
    ConvertF32Str,
    ConvertF64Str,
    ConvertStrI32,
    ConvertStrU32,
    ConvertStrI64,
    ConvertStrU64,
    ConvertStrF32,
    ConvertStrF64,

    // --- Float helpers ---
    MinF32,
    MinF64,
    MaxF32,
    MaxF64,
    NearestF32,
    NearestF64,
    CeilF32,
    CeilF64,
    FloorF32,
    FloorF64,
    TruncF32,
    TruncF64,
    AbsF32,
    AbsF64,
    SqrtF32,
    SqrtF64,
    CopysignF32,
    CopysignF64,

    // --- Bitwise ---
    And32,
    And64,
    Or32,
    Or64,
    Xor32,
    Xor64,
    Shl32,
    Shl64,
    ShrLogical32,
    ShrLogical64,
    ShrArithmetic32,
    ShrArithmetic64,
    Rol32,
    Rol64,
    Ror32,
    Ror64,
    Clz32,
    Clz64,
    Ctz32,
    Ctz64,
    Popcnt32,
    Popcnt64,

    // --- Pop ---
    Pop,
    Pop32,
    Pop64,

    // --- Call / return ---
    Call,
    Return,
}

/// Every variant in discriminant order, used to decode a byte back into an
/// `Opcode` without reaching for a raw transmute.
const ALL: &[Opcode] = &[
    Opcode::Branch,
    Opcode::BranchZ32,
    Opcode::BranchNz32,
    Opcode::BranchZ64,
    Opcode::BranchNz64,
    Opcode::Zero32,
    Opcode::Zero64,
    Opcode::ZeroF32,
    Opcode::ZeroF64,
    Opcode::One32,
    Opcode::One64,
    Opcode::OneF32,
    Opcode::OneF64,
    Opcode::Const32,
    Opcode::Const64,
    Opcode::ConstObject,
    Opcode::LoadSp32,
    Opcode::LoadSp64,
    Opcode::StoreSp32,
    Opcode::StoreSp64,
    Opcode::EqI32,
    Opcode::EqI64,
    Opcode::EqF32,
    Opcode::EqF64,
    Opcode::NeI32,
    Opcode::NeI64,
    Opcode::NeF32,
    Opcode::NeF64,
    Opcode::GtI32,
    Opcode::GtU32,
    Opcode::GtI64,
    Opcode::GtU64,
    Opcode::GtF32,
    Opcode::GtF64,
    Opcode::LtI32,
    Opcode::LtU32,
    Opcode::LtI64,
    Opcode::LtU64,
    Opcode::LtF32,
    Opcode::LtF64,
    Opcode::GeI32,
    Opcode::GeU32,
    Opcode::GeI64,
    Opcode::GeU64,
    Opcode::GeF32,
    Opcode::GeF64,
    Opcode::LeI32,
    Opcode::LeU32,
    Opcode::LeI64,
    Opcode::LeU64,
    Opcode::LeF32,
    Opcode::LeF64,
    Opcode::NegI32,
    Opcode::NegI64,
    Opcode::NegF32,
    Opcode::NegF64,
    Opcode::Not32,
    Opcode::Not64,
    Opcode::IsZero32,
    Opcode::IsZero64,
    Opcode::IsZeroF32,
    Opcode::IsZeroF64,
    Opcode::IsNonZero32,
    Opcode::IsNonZero64,
    Opcode::IsNonZeroF32,
    Opcode::IsNonZeroF64,
    Opcode::Concat,
    Opcode::AddI32,
    Opcode::AddI64,
    Opcode::AddF32,
    Opcode::AddF64,
    Opcode::SubI32,
    Opcode::SubI64,
    Opcode::SubF32,
    Opcode::SubF64,
    Opcode::MulI32,
    Opcode::MulI64,
    Opcode::MulF32,
    Opcode::MulF64,
    Opcode::DivI32,
    Opcode::DivU32,
    Opcode::DivI64,
    Opcode::DivU64,
    Opcode::DivF32,
    Opcode::DivF64,
    Opcode::RemI32,
    Opcode::RemU32,
    Opcode::RemI64,
    Opcode::RemU64,
    Opcode::RemF32,
    Opcode::RemF64,
    Opcode::ExtendI32,
    Opcode::ExtendU32,
    Opcode::WrapI64,
    Opcode::PromoteF32,
    Opcode::DemoteF64,
    Opcode::ConvertI32F32,
    Opcode::ConvertI32F64,
    Opcode::ConvertU32F32,
    Opcode::ConvertU32F64,
    Opcode::ConvertI64F32,
    Opcode::ConvertI64F64,
    Opcode::ConvertU64F32,
    Opcode::ConvertU64F64,
    Opcode::TruncF32I32,
    Opcode::TruncF32U32,
    Opcode::TruncF32I64,
    Opcode::TruncF32U64,
    Opcode::TruncF64I32,
    Opcode::TruncF64U32,
    Opcode::TruncF64I64,
    Opcode::TruncF64U64,
    Opcode::ConvertI32Str,
    Opcode::ConvertU32Str,
    Opcode::ConvertI64Str,
    Opcode::ConvertU64Str,
    Opcode::ConvertF32Str,
    Opcode::ConvertF64Str,
    Opcode::ConvertStrI32,
    Opcode::ConvertStrU32,
    Opcode::ConvertStrI64,
    Opcode::ConvertStrU64,
    Opcode::ConvertStrF32,
    Opcode::ConvertStrF64,
    Opcode::MinF32,
    Opcode::MinF64,
    Opcode::MaxF32,
    Opcode::MaxF64,
    Opcode::NearestF32,
    Opcode::NearestF64,
    Opcode::CeilF32,
    Opcode::CeilF64,
    Opcode::FloorF32,
    Opcode::FloorF64,
    Opcode::TruncF32,
    Opcode::TruncF64,
    Opcode::AbsF32,
    Opcode::AbsF64,
    Opcode::SqrtF32,
    Opcode::SqrtF64,
    Opcode::CopysignF32,
    Opcode::CopysignF64,
    Opcode::And32,
    Opcode::And64,
    Opcode::Or32,
    Opcode::Or64,
    Opcode::Xor32,
    Opcode::Xor64,
    Opcode::Shl32,
    Opcode::Shl64,
    Opcode::ShrLogical32,
    Opcode::ShrLogical64,
    Opcode::ShrArithmetic32,
    Opcode::ShrArithmetic64,
    Opcode::Rol32,
    Opcode::Rol64,
    Opcode::Ror32,
    Opcode::Ror64,
    Opcode::Clz32,
    Opcode::Clz64,
    Opcode::Ctz32,
    Opcode::Ctz64,
    Opcode::Popcnt32,
    Opcode::Popcnt64,
    Opcode::Pop,
    Opcode::Pop32,
    Opcode::Pop64,
    Opcode::Call,
    Opcode::Return,
];

impl Opcode {
    pub fn from_byte(byte: u8) -> Option<Self> {
        ALL.get(byte as usize).copied()
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_roundtrip_covers_every_variant() {
        for byte in 0..=(Opcode::Return as u8) {
            let op = Opcode::from_byte(byte).expect("dense discriminant range");
            assert_eq!(op.to_byte(), byte);
        }
    }

    #[test]
    fn out_of_range_byte_is_rejected() {
        assert!(Opcode::from_byte(Opcode::Return as u8 + 1).is_none());
    }
}
