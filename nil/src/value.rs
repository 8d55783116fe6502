//! IR values: the common `{name, type, debug-loc}` header and its three
//! variants (argument, constant, instruction), grounded in
//! `seen_ir/src/value.rs`'s `IRValue`/`IRType` split, narrowed to the
//! kinds this specification actually needs.

use std::rc::Rc;

use nt_core::InternedStr;

use crate::error::{IrError, Result};
use crate::types::{is_float_value_valid_for_f32, is_int_value_valid, sign_extend, Type, TypeRef};

/// Index of an instruction within its owning [`crate::function::Function`]'s
/// instruction arena. Stable for the instruction's lifetime even if later
/// destroyed (a destroyed instruction's uses are rewritten to
/// [`Value::Undefined`], not its id reused).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArgId(pub u32);

/// An optional source-level debug location, carried through but not
/// otherwise interpreted by this crate (the front end that would populate
/// it meaningfully is out of scope).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugLoc {
    pub file: InternedStr,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug)]
pub enum ConstantPayload {
    /// Integer (sign-extended into the low `bits` of the field) or float
    /// (IEEE-754 bit pattern) scalar payload.
    Scalar(u64),
    Str(InternedStr),
}

#[derive(Debug)]
pub struct Constant {
    pub ty: TypeRef,
    pub payload: ConstantPayload,
}

impl Constant {
    pub fn is_string(&self) -> bool {
        matches!(self.payload, ConstantPayload::Str(_))
    }

    /// Builds an integer constant of type `i<bits>`, sign-extending `value`
    /// into the type's width and rejecting values that do not fit.
    pub fn integer(ty: TypeRef, bits: u32, value: i64) -> Result<Rc<Constant>> {
        if !is_int_value_valid(value, bits) {
            return Err(IrError::Invalid(format!(
                "value {value} does not fit in i{bits}"
            )));
        }
        let masked = if bits >= 64 {
            value as u64
        } else {
            (value as u64) & ((1u64 << bits) - 1)
        };
        Ok(Rc::new(Constant {
            ty,
            payload: ConstantPayload::Scalar(masked),
        }))
    }

    pub fn float32(ty: TypeRef, value: f32) -> Rc<Constant> {
        Rc::new(Constant {
            ty,
            payload: ConstantPayload::Scalar(value.to_bits() as u64),
        })
    }

    pub fn float64(ty: TypeRef, value: f64) -> Rc<Constant> {
        Rc::new(Constant {
            ty,
            payload: ConstantPayload::Scalar(value.to_bits()),
        })
    }

    /// Builds an `f32` constant from a `f64` host value, requiring the
    /// value to round-trip through `f32` without loss (§4.4).
    pub fn float32_checked(ty: TypeRef, value: f64) -> Result<Rc<Constant>> {
        if !is_float_value_valid_for_f32(value) {
            return Err(IrError::Invalid(format!(
                "{value} does not round-trip through f32"
            )));
        }
        Ok(Self::float32(ty, value as f32))
    }

    pub fn string(ty: TypeRef, s: InternedStr) -> Rc<Constant> {
        Rc::new(Constant {
            ty,
            payload: ConstantPayload::Str(s),
        })
    }

    pub fn as_scalar_bits(&self) -> Option<u64> {
        match self.payload {
            ConstantPayload::Scalar(bits) => Some(bits),
            _ => None,
        }
    }

    /// Interprets the scalar payload as a signed integer of the constant's
    /// declared width.
    pub fn as_signed_int(&self) -> Option<i64> {
        let bits = self.ty.integer_bit_width()?;
        let raw = self.as_scalar_bits()?;
        Some(sign_extend(raw, bits))
    }

    pub fn as_f32(&self) -> Option<f32> {
        if !matches!(*self.ty, Type::Float) {
            return None;
        }
        self.as_scalar_bits().map(|b| f32::from_bits(b as u32))
    }

    pub fn as_f64(&self) -> Option<f64> {
        if !matches!(*self.ty, Type::Double) {
            return None;
        }
        self.as_scalar_bits().map(f64::from_bits)
    }
}

#[derive(Debug)]
pub struct Argument {
    pub name: InternedStr,
    pub ty: TypeRef,
    pub index: u32,
}

/// A reference to a value usable as an instruction operand. Back-edges
/// (e.g. which function an argument belongs to) are resolved by the
/// caller providing the owning [`crate::function::Function`]; `Value`
/// itself carries no owning back-pointer, per the design notes' "resolve
/// lazily via identity lookup" guidance.
#[derive(Debug, Clone)]
pub enum Value {
    Argument(ArgId),
    Constant(Rc<Constant>),
    Instruction(InstId),
    /// Stand-in for a value whose defining instruction was destroyed (the
    /// phi-destruction case in §4.5's `phi` contract).
    Undefined(TypeRef),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Argument,
    Constant,
    Instruction,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Argument(_) => ValueKind::Argument,
            Value::Constant(_) => ValueKind::Constant,
            Value::Instruction(_) => ValueKind::Instruction,
            Value::Undefined(_) => ValueKind::Instruction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use pretty_assertions::assert_eq;

    #[test]
    fn integer_constant_sign_extends() {
        let mut ctx = Context::new();
        let i8_ty = ctx.integer_type(8);
        let c = Constant::integer(i8_ty, 8, -1).unwrap();
        assert_eq!(c.as_scalar_bits(), Some(0xFF));
        assert_eq!(c.as_signed_int(), Some(-1));
    }

    #[test]
    fn integer_constant_rejects_out_of_range() {
        let mut ctx = Context::new();
        let i8_ty = ctx.integer_type(8);
        let err = Constant::integer(i8_ty, 8, 300);
        assert!(matches!(err, Err(IrError::Invalid(_))));
    }

    #[test]
    fn integer_constant_accepts_unsigned_bit_pattern() {
        let mut ctx = Context::new();
        let i8_ty = ctx.integer_type(8);
        let c = Constant::integer(i8_ty, 8, 255).unwrap();
        assert_eq!(c.as_scalar_bits(), Some(0xFF));

        let i1_ty = ctx.integer_type(1);
        assert!(Constant::integer(i1_ty, 1, 1).is_ok());
    }

    #[test]
    fn float_constants_roundtrip() {
        let mut ctx = Context::new();
        let f32_ty = ctx.float_type();
        let c = Constant::float32(f32_ty, 1.5);
        assert_eq!(c.as_f32(), Some(1.5));
    }
}
