//! IR type system: primitives, integers of arbitrary bit width, opaque
//! pointers, function/struct/array types, all interned by structural
//! identity within a [`crate::context::Context`].
//!
//! Grounded in `nir/include/netuno/nir/type.h`'s `NIR_TYPE_ID` ordering and
//! predicate surface, expressed as a Rust sum type per the design notes
//! (tagged variants replace the opaque-handle + vtable pair).

use std::fmt;
use std::rc::Rc;

/// Minimum and maximum bit width for an integer type, per
/// `NIR_INTEGER_BITS` (`[1, 2^31]`, `enum_t` taken as 32-bit).
pub const INTEGER_MIN_BITS: u32 = 1;
pub const INTEGER_MAX_BITS: u32 = 1 << 31;

/// An interned IR type. Reference-counted and structurally unique within
/// its owning [`crate::context::Context`]: two `TypeRef`s compare equal
/// (via `Rc::ptr_eq`, see [`type_eq`]) iff they describe the same type.
pub type TypeRef = Rc<Type>;

#[derive(Debug)]
pub enum Type {
    Void,
    Label,
    Float,
    Double,
    /// Reserved for front-end error recovery; never produced by valid IR
    /// construction in this crate, carried through per §4.4's primitive
    /// singleton list.
    Error,
    Integer { bits: u32 },
    Pointer,
    Function {
        params: Vec<TypeRef>,
        ret: TypeRef,
        var_arg: bool,
    },
    Struct {
        fields: Vec<TypeRef>,
    },
    Array {
        element: TypeRef,
        count: u64,
    },
}

/// Pointer-identity comparison for interned types — two types are equal
/// iff they are the same interned object.
pub fn type_eq(a: &TypeRef, b: &TypeRef) -> bool {
    Rc::ptr_eq(a, b)
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Label => write!(f, "label"),
            Type::Float => write!(f, "float"),
            Type::Double => write!(f, "double"),
            Type::Error => write!(f, "error"),
            Type::Integer { bits } => write!(f, "i{bits}"),
            Type::Pointer => write!(f, "ptr"),
            Type::Function { params, ret, var_arg } => {
                write!(f, "(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                if *var_arg {
                    write!(f, ", ...")?;
                }
                write!(f, ") -> {ret}")
            }
            Type::Struct { fields } => {
                write!(f, "{{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{field}")?;
                }
                write!(f, "}}")
            }
            Type::Array { element, count } => write!(f, "[{count} x {element}]"),
        }
    }
}

impl Type {
    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }
    pub fn is_label(&self) -> bool {
        matches!(self, Type::Label)
    }
    pub fn is_float(&self) -> bool {
        matches!(self, Type::Float)
    }
    pub fn is_double(&self) -> bool {
        matches!(self, Type::Double)
    }
    pub fn is_floating_point(&self) -> bool {
        self.is_float() || self.is_double()
    }
    pub fn is_integer(&self) -> bool {
        matches!(self, Type::Integer { .. })
    }
    pub fn is_integer_of_width(&self, n: u32) -> bool {
        matches!(self, Type::Integer { bits } if *bits == n)
    }
    pub fn is_function(&self) -> bool {
        matches!(self, Type::Function { .. })
    }
    pub fn is_struct(&self) -> bool {
        matches!(self, Type::Struct { .. })
    }
    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array { .. })
    }
    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer)
    }

    /// Any type except `void`, `label`, and `function`.
    pub fn is_first_class(&self) -> bool {
        !matches!(self, Type::Void | Type::Label | Type::Function { .. })
    }

    /// First-class and not aggregate.
    pub fn is_single_value(&self) -> bool {
        self.is_first_class() && !self.is_aggregate()
    }

    pub fn is_aggregate(&self) -> bool {
        self.is_struct() || self.is_array()
    }

    /// All types except `void` and the unsized `error`/`label` markers
    /// carry a concrete size.
    pub fn is_sized(&self) -> bool {
        !matches!(self, Type::Void | Type::Label | Type::Function { .. } | Type::Error)
    }

    pub fn integer_bit_width(&self) -> Option<u32> {
        match self {
            Type::Integer { bits } => Some(*bits),
            _ => None,
        }
    }

    pub fn function_params(&self) -> Option<&[TypeRef]> {
        match self {
            Type::Function { params, .. } => Some(params),
            _ => None,
        }
    }

    pub fn function_return(&self) -> Option<&TypeRef> {
        match self {
            Type::Function { ret, .. } => Some(ret),
            _ => None,
        }
    }

    pub fn is_function_var_arg(&self) -> bool {
        matches!(self, Type::Function { var_arg: true, .. })
    }

    pub fn struct_fields(&self) -> Option<&[TypeRef]> {
        match self {
            Type::Struct { fields } => Some(fields),
            _ => None,
        }
    }

    pub fn array_element(&self) -> Option<&TypeRef> {
        match self {
            Type::Array { element, .. } => Some(element),
            _ => None,
        }
    }

    pub fn array_count(&self) -> Option<u64> {
        match self {
            Type::Array { count, .. } => Some(*count),
            _ => None,
        }
    }

    /// Bytes a value of this type occupies on the VM's value stack: 4 for
    /// 32-bit scalars, 8 for 64-bit scalars and references. Aggregates
    /// have no single stack width (they are not first-class stack values
    /// in the VM core) and return `None`.
    pub fn stack_size(&self) -> Option<usize> {
        match self {
            Type::Float => Some(4),
            Type::Double => Some(8),
            Type::Integer { bits } if *bits <= 32 => Some(4),
            Type::Integer { .. } => Some(8),
            Type::Pointer => Some(8),
            Type::Void | Type::Label | Type::Error => None,
            Type::Function { .. } | Type::Struct { .. } | Type::Array { .. } => None,
        }
    }
}

/// `void` and `label` may not be element types; `label` may not be a
/// function return type; `void`/`label` may not be argument types.
pub fn is_valid_element_type(ty: &Type) -> bool {
    !matches!(ty, Type::Void | Type::Label)
}

pub fn is_valid_return_type(ty: &Type) -> bool {
    !matches!(ty, Type::Label)
}

pub fn is_valid_argument_type(ty: &Type) -> bool {
    !matches!(ty, Type::Void | Type::Label)
}

/// `(1 << n) - 1`, special-cased for `n == 64` to avoid the overflow the
/// original `ntGetIntAllOnes` exhibits (see `SPEC_FULL.md` §9).
pub fn int_all_ones(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Sign-extends the low `bits` of `value` into a full `i64`.
pub fn sign_extend(value: u64, bits: u32) -> i64 {
    if bits >= 64 {
        return value as i64;
    }
    let shift = 64 - bits;
    ((value << shift) as i64) >> shift
}

/// Whether `value` is representable in a type of the given width, either
/// as a signed two's-complement integer or as a raw unsigned bit pattern
/// (so e.g. both `-1` and `255` are valid `i8` literals, and both `-1` and
/// `1` are valid `i1` literals).
pub fn is_int_value_valid(value: i64, bits: u32) -> bool {
    if bits >= 64 {
        return true;
    }
    let signed_min = -(1i64 << (bits - 1));
    let signed_max = (1i64 << (bits - 1)) - 1;
    let unsigned_max = int_all_ones(bits) as i64;
    (signed_min..=signed_max).contains(&value) || (0..=unsigned_max).contains(&value)
}

/// A finite/NaN/infinite/zero `f64` "round-trips" through `f32` iff
/// narrowing and widening it back is bit-for-bit identical (NaN payload
/// aside: any NaN narrows to a NaN, which is accepted).
pub fn is_float_value_valid_for_f32(value: f64) -> bool {
    if value.is_nan() {
        return true;
    }
    (value as f32) as f64 == value
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn predicates_on_primitives() {
        assert!(Type::Void.is_void());
        assert!(!Type::Void.is_first_class());
        assert!(Type::Label.is_label());
        assert!(!Type::Label.is_first_class());
        assert!(Type::Integer { bits: 32 }.is_first_class());
        assert!(Type::Integer { bits: 32 }.is_single_value());
    }

    #[test]
    fn aggregate_predicates() {
        let i32_ty = Rc::new(Type::Integer { bits: 32 });
        let arr = Type::Array {
            element: i32_ty.clone(),
            count: 4,
        };
        assert!(arr.is_aggregate());
        assert!(!arr.is_single_value());
        assert!(arr.is_sized());
    }

    #[test]
    fn int_all_ones_handles_width_64() {
        assert_eq!(int_all_ones(1), 1);
        assert_eq!(int_all_ones(8), 0xFF);
        assert_eq!(int_all_ones(64), u64::MAX);
    }

    #[test]
    fn sign_extend_narrow_negative() {
        // 0xFF as i8 is -1; sign-extended into i64 it stays -1.
        assert_eq!(sign_extend(0xFF, 8), -1);
        assert_eq!(sign_extend(0x7F, 8), 127);
    }

    #[test]
    fn valid_element_and_argument_types() {
        assert!(!is_valid_element_type(&Type::Void));
        assert!(!is_valid_element_type(&Type::Label));
        assert!(is_valid_element_type(&Type::Integer { bits: 32 }));
        assert!(!is_valid_argument_type(&Type::Void));
        assert!(is_valid_return_type(&Type::Void));
        assert!(!is_valid_return_type(&Type::Label));
    }

    #[test]
    fn float_round_trip_validity() {
        assert!(is_float_value_valid_for_f32(1.5));
        assert!(!is_float_value_valid_for_f32(0.1));
        assert!(is_float_value_valid_for_f32(f64::NAN));
    }
}
