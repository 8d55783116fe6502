//! Opcodes, compare predicates, and instruction data. Grounded in
//! `nir/include/netuno/nir/instruction.h`'s opcode taxonomy and in the
//! Rust shape of `seen_ir/src/instruction.rs`'s `Instruction`/`BinaryOp`
//! enums, generalised to the full opcode set §4.5 requires.

use nt_core::InternedStr;

use crate::types::TypeRef;
use crate::value::{ArgId, BlockId, InstId, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // terminators
    Ret,
    Br,
    // unary (includes the memory ops and all casts, per §4.5)
    FNeg,
    Alloca,
    Load,
    Trunc,
    ZExt,
    SExt,
    FpToUi,
    FpToSi,
    UiToFp,
    SiToFp,
    FpTrunc,
    PtrToInt,
    IntToPtr,
    BitCast,
    // binary
    Add,
    FAdd,
    Sub,
    FSub,
    Mul,
    FMul,
    UDiv,
    SDiv,
    FDiv,
    URem,
    SRem,
    FRem,
    Shl,
    Shr,
    Asr,
    And,
    Or,
    Xor,
    GetElementPtr,
    // other
    ExtractValue,
    Cmp,
    Phi,
    Call,
    Select,
    Store,
    InsertValue,
}

impl Opcode {
    pub fn is_terminator(self) -> bool {
        matches!(self, Opcode::Ret | Opcode::Br)
    }

    pub fn is_unary_op(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            FNeg | Alloca
                | Load
                | Trunc
                | ZExt
                | SExt
                | FpToUi
                | FpToSi
                | UiToFp
                | SiToFp
                | FpTrunc
                | PtrToInt
                | IntToPtr
                | BitCast
        )
    }

    pub fn is_binary_op(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            Add | FAdd
                | Sub
                | FSub
                | Mul
                | FMul
                | UDiv
                | SDiv
                | FDiv
                | URem
                | SRem
                | FRem
                | Shl
                | Shr
                | Asr
                | And
                | Or
                | Xor
                | GetElementPtr
        )
    }

    pub fn is_int_div_rem(self) -> bool {
        matches!(self, Opcode::UDiv | Opcode::SDiv | Opcode::URem | Opcode::SRem)
    }

    pub fn is_shift(self) -> bool {
        matches!(self, Opcode::Shl | Opcode::Shr | Opcode::Asr)
    }

    pub fn is_logical_shift(self) -> bool {
        matches!(self, Opcode::Shl | Opcode::Shr)
    }

    pub fn is_arithmetic_shift(self) -> bool {
        matches!(self, Opcode::Asr)
    }

    pub fn is_bitwise_logic_op(self) -> bool {
        matches!(self, Opcode::And | Opcode::Or | Opcode::Xor)
    }

    pub fn is_cast(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            Trunc | ZExt | SExt | FpToUi | FpToSi | UiToFp | SiToFp | FpTrunc | PtrToInt | IntToPtr | BitCast
        )
    }

    pub fn is_associative(self) -> bool {
        matches!(self, Opcode::Add | Opcode::Mul | Opcode::And | Opcode::Or | Opcode::Xor)
    }

    /// Commutative opcodes. `cmp-eq`/`cmp-ne` are also commutative but are
    /// identified by predicate, not opcode alone — see
    /// [`CmpPredicate::is_commutative`].
    pub fn is_commutative(self) -> bool {
        self.is_associative()
    }

    pub fn is_idempotent(self) -> bool {
        matches!(self, Opcode::And | Opcode::Or)
    }

    pub fn is_nilpotent(self) -> bool {
        matches!(self, Opcode::Sub | Opcode::Xor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpPredicate {
    IntEq,
    IntNe,
    IntUgt,
    IntUge,
    IntUlt,
    IntUle,
    IntSgt,
    IntSge,
    IntSlt,
    IntSle,
    FloatEq,
    FloatGt,
    FloatGe,
    FloatLt,
    FloatLe,
    FloatNe,
    /// Ordered: true only when neither operand is NaN and the relation holds.
    FloatOrdered,
    /// Unordered: true when either operand is NaN.
    FloatUnordered,
}

impl CmpPredicate {
    pub fn is_integer(self) -> bool {
        use CmpPredicate::*;
        matches!(self, IntEq | IntNe | IntUgt | IntUge | IntUlt | IntUle | IntSgt | IntSge | IntSlt | IntSle)
    }

    pub fn is_float(self) -> bool {
        !self.is_integer()
    }

    pub fn is_equality(self) -> bool {
        matches!(self, CmpPredicate::IntEq | CmpPredicate::IntNe | CmpPredicate::FloatEq | CmpPredicate::FloatNe)
    }

    pub fn is_relational(self) -> bool {
        !self.is_equality() && !matches!(self, CmpPredicate::FloatOrdered | CmpPredicate::FloatUnordered)
    }

    pub fn is_commutative(self) -> bool {
        matches!(self, CmpPredicate::IntEq | CmpPredicate::IntNe | CmpPredicate::FloatEq | CmpPredicate::FloatNe)
    }

    pub fn is_signed(self) -> bool {
        use CmpPredicate::*;
        matches!(self, IntSgt | IntSge | IntSlt | IntSle)
    }

    pub fn is_unsigned(self) -> bool {
        use CmpPredicate::*;
        matches!(self, IntUgt | IntUge | IntUlt | IntUle)
    }

    /// Whether the predicate evaluates to true when the two operands are
    /// equal (`eq`, `ge`, `le`, `uge`, `ule`, `sge`, `sle`).
    pub fn is_true_when_equal(self) -> bool {
        use CmpPredicate::*;
        matches!(self, IntEq | IntUge | IntUle | IntSge | IntSle | FloatEq | FloatGe | FloatLe)
    }

    pub fn is_false_when_equal(self) -> bool {
        use CmpPredicate::*;
        matches!(self, IntNe | IntUgt | IntUlt | IntSgt | IntSlt | FloatNe | FloatGt | FloatLt)
    }

    /// The logical inverse predicate (`p` holds iff `inverse(p)` does not).
    pub fn inverse(self) -> CmpPredicate {
        use CmpPredicate::*;
        match self {
            IntEq => IntNe,
            IntNe => IntEq,
            IntUgt => IntUle,
            IntUge => IntUlt,
            IntUlt => IntUge,
            IntUle => IntUgt,
            IntSgt => IntSle,
            IntSge => IntSlt,
            IntSlt => IntSge,
            IntSle => IntSgt,
            FloatEq => FloatNe,
            FloatNe => FloatEq,
            FloatGt => FloatLe,
            FloatGe => FloatLt,
            FloatLt => FloatGe,
            FloatLe => FloatGt,
            FloatOrdered => FloatUnordered,
            FloatUnordered => FloatOrdered,
        }
    }

    /// Toggles strict/non-strict for relational predicates (equality and
    /// ordered/unordered are left unchanged, they have no strict/non-strict
    /// counterpart).
    pub fn swap_strictness(self) -> CmpPredicate {
        use CmpPredicate::*;
        match self {
            IntUgt => IntUge,
            IntUge => IntUgt,
            IntUlt => IntUle,
            IntUle => IntUlt,
            IntSgt => IntSge,
            IntSge => IntSgt,
            IntSlt => IntSle,
            IntSle => IntSlt,
            FloatGt => FloatGe,
            FloatGe => FloatGt,
            FloatLt => FloatLe,
            FloatLe => FloatLt,
            other => other,
        }
    }

    /// Toggles signed/unsigned for integer relational predicates.
    pub fn swap_signedness(self) -> CmpPredicate {
        use CmpPredicate::*;
        match self {
            IntUgt => IntSgt,
            IntUge => IntSge,
            IntUlt => IntSlt,
            IntUle => IntSle,
            IntSgt => IntUgt,
            IntSge => IntUge,
            IntSlt => IntUlt,
            IntSle => IntUle,
            other => other,
        }
    }

    /// True iff `self` being true on some pair of operands necessarily
    /// makes `other` true on the same pair (e.g. `eq` implies `ge`/`le`).
    pub fn implies_true(self, other: CmpPredicate) -> bool {
        if self == other {
            return true;
        }
        use CmpPredicate::*;
        match (self, other) {
            (IntEq, IntUge | IntUle | IntSge | IntSle) => true,
            (IntSgt, IntSge) | (IntSlt, IntSle) | (IntUgt, IntUge) | (IntUlt, IntUle) => true,
            (FloatEq, FloatGe | FloatLe) => true,
            (FloatGt, FloatGe) | (FloatLt, FloatLe) => true,
            _ => false,
        }
    }

    /// True iff `self` being true necessarily makes `other` false.
    pub fn implies_false(self, other: CmpPredicate) -> bool {
        self.inverse() == other || (self.implies_true(other.inverse()) && self != other.inverse())
    }
}

#[derive(Debug)]
pub enum InstKind {
    FNeg { value: Value },
    Alloca { allocated_ty: TypeRef },
    Load { pointer: Value },
    /// Covers every cast opcode; the destination type lives on the
    /// instruction header, the source type is read off `value`.
    Cast { value: Value },
    Binary { lhs: Value, rhs: Value },
    GetElementPtr { base: Value, index: Value },
    ExtractValue { aggregate: Value, index: u32 },
    InsertValue { aggregate: Value, element: Value, index: u32 },
    Cmp { predicate: CmpPredicate, lhs: Value, rhs: Value },
    Phi { incoming: Vec<(Value, BlockId)> },
    Call { callee: Value, args: Vec<Value> },
    Select { cond: Value, if_true: Value, if_false: Value },
    Store { value: Value, pointer: Value },
    Br {
        cond: Option<Value>,
        then_block: BlockId,
        else_block: Option<BlockId>,
    },
    Ret { value: Option<Value> },
}

#[derive(Debug)]
pub struct Inst {
    pub name: InternedStr,
    /// Result type. `Void` for instructions with no usable result
    /// (`store`, `br`, `ret`, a void `call`).
    pub ty: TypeRef,
    pub opcode: Opcode,
    pub kind: InstKind,
    pub parent: Option<BlockId>,
    pub destroyed: bool,
}

impl Inst {
    pub fn is_terminator(&self) -> bool {
        self.opcode.is_terminator()
    }

    pub fn successor_count(&self) -> usize {
        match &self.kind {
            InstKind::Br {
                else_block: Some(_),
                ..
            } => 2,
            InstKind::Br { .. } => 1,
            _ => 0,
        }
    }

    pub fn is_unconditional_branch(&self) -> bool {
        matches!(&self.kind, InstKind::Br { cond: None, .. })
    }

    pub fn is_conditional_branch(&self) -> bool {
        matches!(&self.kind, InstKind::Br { cond: Some(_), .. })
    }

    pub fn successors(&self) -> Vec<BlockId> {
        match &self.kind {
            InstKind::Br {
                then_block,
                else_block,
                ..
            } => {
                let mut out = vec![*then_block];
                if let Some(e) = else_block {
                    out.push(*e);
                }
                out
            }
            _ => Vec::new(),
        }
    }

    /// Whether executing this instruction can affect observable state
    /// beyond producing its result value (stores, calls, memory
    /// allocation): used to gate trivial dead-code assumptions a future
    /// optimiser might make (no optimiser ships in this crate, §1).
    pub fn has_side_effects(&self) -> bool {
        matches!(
            self.opcode,
            Opcode::Store | Opcode::Call | Opcode::Alloca | Opcode::Load
        ) || self.is_terminator()
    }
}

/// Operand references an argument-producing entity rather than a value,
/// used only while threading an `ArgId` through call construction. Kept
/// for symmetry with `InstId`/`BlockId`.
pub type ArgRef = ArgId;
pub type InstRef = InstId;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn taxonomy_predicates() {
        assert!(Opcode::Ret.is_terminator());
        assert!(Opcode::Br.is_terminator());
        assert!(Opcode::Alloca.is_unary_op());
        assert!(Opcode::Load.is_unary_op());
        assert!(Opcode::GetElementPtr.is_binary_op());
        assert!(Opcode::Add.is_associative());
        assert!(Opcode::Add.is_commutative());
        assert!(!Opcode::Sub.is_commutative());
        assert!(Opcode::And.is_idempotent());
        assert!(Opcode::Sub.is_nilpotent());
        assert!(Opcode::Xor.is_nilpotent());
        assert!(Opcode::UDiv.is_int_div_rem());
        assert!(Opcode::Asr.is_arithmetic_shift());
        assert!(Opcode::Shl.is_logical_shift());
    }

    #[test]
    fn cmp_predicate_helpers() {
        assert!(CmpPredicate::IntEq.is_commutative());
        assert!(CmpPredicate::IntNe.is_commutative());
        assert!(!CmpPredicate::IntSlt.is_commutative());
        assert_eq!(CmpPredicate::IntSlt.inverse(), CmpPredicate::IntSge);
        assert!(CmpPredicate::IntEq.implies_true(CmpPredicate::IntSge));
        assert!(CmpPredicate::IntSgt.implies_true(CmpPredicate::IntSge));
    }
}
