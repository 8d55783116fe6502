//! Delegates and delegate types: the VM's callable values. Grounded in
//! `ntr/source/object.c`'s `NT_DELEGATE_TYPE`/`NT_DELEGATE` and
//! `ntTakeDelegateType`'s name-based deduplication.

use std::fmt;
use std::rc::Rc;

use nt_core::InternedStr;

use crate::error::Result;
use crate::interpreter::Interpreter;

/// The scalar/reference kinds a delegate's signature can mention. Distinct
/// from `nil::Type` — the VM core does not depend on the IR crate, and only
/// needs a value's stack width and display name at this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VmType {
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Ref,
}

impl VmType {
    pub fn stack_size(self) -> usize {
        match self {
            VmType::I32 | VmType::U32 | VmType::F32 => 4,
            VmType::I64 | VmType::U64 | VmType::F64 | VmType::Ref => 8,
        }
    }
}

impl fmt::Display for VmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VmType::I32 => "i32",
            VmType::U32 => "u32",
            VmType::I64 => "i64",
            VmType::U64 => "u64",
            VmType::F32 => "f32",
            VmType::F64 => "f64",
            VmType::Ref => "ref",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModuleId(pub usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DelegateTypeId(pub usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DelegateId(pub usize);

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Param {
    pub name: InternedStr,
    pub ty: VmType,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DelegateType {
    /// `None` marks a subroutine (void return).
    pub return_type: Option<VmType>,
    pub params: Vec<Param>,
    pub type_name: String,
}

impl DelegateType {
    pub fn new(return_type: Option<VmType>, params: Vec<Param>) -> Self {
        let type_name = Self::generate_name(return_type, &params);
        Self {
            return_type,
            params,
            type_name,
        }
    }

    /// `delegate(<paramtypes>):<returntype>`, used as the dedup key by
    /// `Assembly::take_delegate_type`.
    pub fn generate_name(return_type: Option<VmType>, params: &[Param]) -> String {
        let param_list = params
            .iter()
            .map(|p| p.ty.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let ret = match return_type {
            Some(t) => t.to_string(),
            None => "void".to_string(),
        };
        format!("delegate({param_list}):{ret}")
    }

    pub fn is_subroutine(&self) -> bool {
        self.return_type.is_none()
    }
}

/// A native callback. Boxed (rather than a bare `fn` pointer, as the
/// original uses) so host code can close over state such as a test sink or
/// a stdout handle, matching how `seen_interpreter`'s builtins capture an
/// `Rc<RefCell<_>>` environment.
pub type NativeFn = Rc<dyn Fn(&mut Interpreter, &DelegateType) -> Result<bool>>;

#[derive(Clone)]
pub enum DelegateBody {
    Bytecode { module: ModuleId, address: usize },
    Native(NativeFn),
}

impl fmt::Debug for DelegateBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DelegateBody::Bytecode { module, address } => f
                .debug_struct("Bytecode")
                .field("module", module)
                .field("address", address)
                .finish(),
            DelegateBody::Native(_) => write!(f, "Native(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Delegate {
    pub name: InternedStr,
    pub delegate_type: DelegateTypeId,
    pub body: DelegateBody,
}

impl Delegate {
    pub fn is_native(&self) -> bool {
        matches!(self.body, DelegateBody::Native(_))
    }
}
