//! The IR context: the uniquing arena for types and the source of fresh
//! per-prefix SSA names. Grounded in `nir/include/netuno/nir/type.h`'s
//! `nirGetContext`-style accessors and `seen_ir`'s `TypeSystem` wrapper
//! shape (context owns and hands out interned types).

use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;
use nt_core::{InternedStr, Interner};

use crate::types::{Type, TypeRef};

fn ptr_key(ty: &TypeRef) -> usize {
    Rc::as_ptr(ty) as usize
}

#[derive(Default)]
struct TypeCache {
    integers: HashMap<u32, TypeRef>,
    functions: HashMap<(Vec<usize>, usize, bool), TypeRef>,
    structs: HashMap<Vec<usize>, TypeRef>,
    arrays: HashMap<(usize, u64), TypeRef>,
}

/// Owns interned types and issues fresh `<prefix><n>` identifiers. All IR
/// objects built through a context are conceptually owned by it (the
/// two-arm ownership discipline of `SPEC_FULL.md` §9: this is the
/// long-lived arena half).
pub struct Context {
    interner: Interner,
    void_ty: TypeRef,
    label_ty: TypeRef,
    float_ty: TypeRef,
    double_ty: TypeRef,
    error_ty: TypeRef,
    pointer_ty: TypeRef,
    cache: TypeCache,
    /// Ordered so that a debug dump of counters lists prefixes in the order
    /// they were first requested, rather than hash order.
    name_counters: IndexMap<String, u64>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Self {
            interner: Interner::new(),
            void_ty: Rc::new(Type::Void),
            label_ty: Rc::new(Type::Label),
            float_ty: Rc::new(Type::Float),
            double_ty: Rc::new(Type::Double),
            error_ty: Rc::new(Type::Error),
            pointer_ty: Rc::new(Type::Pointer),
            cache: TypeCache::default(),
            name_counters: IndexMap::new(),
        }
    }

    pub fn intern_name(&mut self, s: &str) -> InternedStr {
        self.interner.intern(s)
    }

    /// Produces `<prefix><n>` for a monotonically increasing `n`, tracked
    /// independently per prefix.
    pub fn fresh_name(&mut self, prefix: &str) -> InternedStr {
        let counter = self.name_counters.entry(prefix.to_string()).or_insert(0);
        let name = format!("{prefix}{counter}");
        *counter += 1;
        self.interner.intern(&name)
    }

    pub fn void_type(&self) -> TypeRef {
        self.void_ty.clone()
    }
    pub fn label_type(&self) -> TypeRef {
        self.label_ty.clone()
    }
    pub fn float_type(&self) -> TypeRef {
        self.float_ty.clone()
    }
    pub fn double_type(&self) -> TypeRef {
        self.double_ty.clone()
    }
    pub fn error_type(&self) -> TypeRef {
        self.error_ty.clone()
    }
    pub fn opaque_pointer_type(&self) -> TypeRef {
        self.pointer_ty.clone()
    }

    /// Interns (or fetches) the integer type of the given bit width.
    /// `bits` must lie in `[INTEGER_MIN_BITS, INTEGER_MAX_BITS]`.
    pub fn integer_type(&mut self, bits: u32) -> TypeRef {
        debug_assert!(bits >= crate::types::INTEGER_MIN_BITS);
        self.cache
            .integers
            .entry(bits)
            .or_insert_with(|| Rc::new(Type::Integer { bits }))
            .clone()
    }

    pub fn int1_type(&mut self) -> TypeRef {
        self.integer_type(1)
    }
    pub fn int8_type(&mut self) -> TypeRef {
        self.integer_type(8)
    }
    pub fn int16_type(&mut self) -> TypeRef {
        self.integer_type(16)
    }
    pub fn int32_type(&mut self) -> TypeRef {
        self.integer_type(32)
    }
    pub fn int64_type(&mut self) -> TypeRef {
        self.integer_type(64)
    }

    pub fn function_type(&mut self, ret: TypeRef, params: &[TypeRef], var_arg: bool) -> TypeRef {
        let key = (params.iter().map(ptr_key).collect::<Vec<_>>(), ptr_key(&ret), var_arg);
        self.cache
            .functions
            .entry(key)
            .or_insert_with(|| {
                Rc::new(Type::Function {
                    params: params.to_vec(),
                    ret,
                    var_arg,
                })
            })
            .clone()
    }

    pub fn struct_type(&mut self, fields: &[TypeRef]) -> TypeRef {
        let key = fields.iter().map(ptr_key).collect::<Vec<_>>();
        self.cache
            .structs
            .entry(key)
            .or_insert_with(|| {
                Rc::new(Type::Struct {
                    fields: fields.to_vec(),
                })
            })
            .clone()
    }

    pub fn array_type(&mut self, element: TypeRef, count: u64) -> TypeRef {
        let key = (ptr_key(&element), count);
        self.cache
            .arrays
            .entry(key)
            .or_insert_with(|| Rc::new(Type::Array { element, count }))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::type_eq;
    use pretty_assertions::assert_eq;

    #[test]
    fn integer_types_are_interned() {
        let mut ctx = Context::new();
        let a = ctx.integer_type(32);
        let b = ctx.integer_type(32);
        assert!(type_eq(&a, &b));
        let c = ctx.integer_type(64);
        assert!(!type_eq(&a, &c));
    }

    #[test]
    fn function_types_interned_by_structure() {
        let mut ctx = Context::new();
        let i32_ty = ctx.int32_type();
        let void_ty = ctx.void_type();
        let a = ctx.function_type(void_ty.clone(), &[i32_ty.clone()], false);
        let b = ctx.function_type(void_ty.clone(), &[i32_ty.clone()], false);
        assert!(type_eq(&a, &b));
        let c = ctx.function_type(void_ty, &[i32_ty], true);
        assert!(!type_eq(&a, &c));
    }

    #[test]
    fn fresh_names_increment_per_prefix() {
        let mut ctx = Context::new();
        let a = ctx.fresh_name("v");
        let b = ctx.fresh_name("v");
        let c = ctx.fresh_name("bb");
        assert_eq!(a.as_str(), "v0");
        assert_eq!(b.as_str(), "v1");
        assert_eq!(c.as_str(), "bb0");
    }

    #[test]
    fn struct_and_array_types_interned() {
        let mut ctx = Context::new();
        let i32_ty = ctx.int32_type();
        let s1 = ctx.struct_type(&[i32_ty.clone(), i32_ty.clone()]);
        let s2 = ctx.struct_type(&[i32_ty.clone(), i32_ty.clone()]);
        assert!(type_eq(&s1, &s2));

        let arr1 = ctx.array_type(i32_ty.clone(), 4);
        let arr2 = ctx.array_type(i32_ty, 4);
        assert!(type_eq(&arr1, &arr2));
    }
}
