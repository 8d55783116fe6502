//! The assembly: the top-level container of all reachable constant objects
//! (modules, delegates, delegate types, strings). Grounded in
//! `ntr/source/module.c`'s assembly-level object table and
//! `ntTakeDelegateType`'s name-keyed deduplication.

use nt_core::{InternedStr, Interner};

use crate::bytecode::BytecodeModule;
use crate::delegate::{Delegate, DelegateId, DelegateType, DelegateTypeId, ModuleId, Param, VmType};
use crate::object::ObjectKind;

/// An entry in the assembly's ordered constant-object table. The table
/// index *is* the VM's "reference" value (§9: reference width fixed at 8
/// bytes, the width of this index), replacing the original's raw object
/// pointer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConstantObject {
    Str(InternedStr),
    Module(ModuleId),
    Delegate(DelegateId),
    DelegateType(DelegateTypeId),
}

impl ConstantObject {
    /// A delegate type's kind is `Type`, not a distinct `DelegateType`
    /// variant — `ntr/source/delegate.c`'s `ntDelegateType()` singleton is
    /// itself tagged `NT_OBJECT_TYPE_TYPE`, so a delegate-type descriptor
    /// classifies the same way any other type object does.
    pub fn kind(&self) -> ObjectKind {
        match self {
            ConstantObject::Str(_) => ObjectKind::Str,
            ConstantObject::Module(_) => ObjectKind::Module,
            ConstantObject::Delegate(_) => ObjectKind::Delegate,
            ConstantObject::DelegateType(_) => ObjectKind::Type,
        }
    }
}

pub struct Assembly {
    pub name: InternedStr,
    interner: Interner,
    modules: Vec<BytecodeModule>,
    delegate_types: Vec<DelegateType>,
    delegates: Vec<Delegate>,
    constants: Vec<ConstantObject>,
}

impl Assembly {
    pub fn new(name: InternedStr) -> Self {
        Self {
            name,
            interner: Interner::new(),
            modules: Vec::new(),
            delegate_types: Vec::new(),
            delegates: Vec::new(),
            constants: Vec::new(),
        }
    }

    pub fn intern_string(&mut self, s: &str) -> InternedStr {
        self.interner.intern(s)
    }

    pub fn add_module(&mut self, module: BytecodeModule) -> ModuleId {
        let id = ModuleId(self.modules.len());
        self.modules.push(module);
        id
    }

    pub fn module(&self, id: ModuleId) -> &BytecodeModule {
        &self.modules[id.0]
    }

    pub fn module_mut(&mut self, id: ModuleId) -> &mut BytecodeModule {
        &mut self.modules[id.0]
    }

    /// Finds an existing delegate type by its generated name or creates and
    /// registers a new one.
    pub fn take_delegate_type(&mut self, return_type: Option<VmType>, params: Vec<Param>) -> DelegateTypeId {
        let name = DelegateType::generate_name(return_type, &params);
        if let Some(pos) = self.delegate_types.iter().position(|t| t.type_name == name) {
            return DelegateTypeId(pos);
        }
        let id = DelegateTypeId(self.delegate_types.len());
        self.delegate_types.push(DelegateType::new(return_type, params));
        id
    }

    pub fn delegate_type(&self, id: DelegateTypeId) -> &DelegateType {
        &self.delegate_types[id.0]
    }

    pub fn add_delegate(&mut self, delegate: Delegate) -> DelegateId {
        let id = DelegateId(self.delegates.len());
        self.delegates.push(delegate);
        id
    }

    pub fn delegate(&self, id: DelegateId) -> &Delegate {
        &self.delegates[id.0]
    }

    /// Deduplicates by value equality (identity, for interned strings and
    /// entity ids) via linear scan and returns the index — mirroring
    /// `ntAddConstantObject`'s "each object appears at most once" invariant
    /// (§3) without requiring raw pointer identity.
    pub fn add_constant_object(&mut self, object: ConstantObject) -> u64 {
        if let Some(pos) = self.constants.iter().position(|c| *c == object) {
            return pos as u64;
        }
        let index = self.constants.len() as u64;
        self.constants.push(object);
        index
    }

    pub fn add_constant_string(&mut self, s: &str) -> u64 {
        let interned = self.intern_string(s);
        self.add_constant_object(ConstantObject::Str(interned))
    }

    pub fn get_constant_object(&self, index: u64) -> Option<&ConstantObject> {
        self.constants.get(index as usize)
    }

    /// Every constant object is assignable to `Object` (§3's root type);
    /// used by `concat` to check its operands are valid objects before
    /// calling `display_constant`, mirroring `ntTypeIsAssignableFrom`'s use
    /// ahead of the original's `ntConcat`.
    pub fn is_object(&self, index: u64) -> bool {
        self.get_constant_object(index)
            .is_some_and(|obj| crate::object::is_assignable_from(ObjectKind::Object, obj.kind()))
    }

    /// The display form of a constant object (`to_string`, per §3's virtual
    /// object protocol, folded into a single function since this port's
    /// constant kinds are a closed enum rather than an open vtable set).
    pub fn display_constant(&self, index: u64) -> Option<String> {
        match self.get_constant_object(index)? {
            ConstantObject::Str(s) => Some(s.as_str().to_string()),
            ConstantObject::Module(m) => Some(format!("<module {}>", self.module(*m).name)),
            ConstantObject::Delegate(d) => Some(self.delegate(*d).name.as_str().to_string()),
            ConstantObject::DelegateType(t) => Some(self.delegate_type(*t).type_name.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delegate_type_interning_is_name_keyed() {
        let mut interner = Interner::new();
        let mut asm = Assembly::new(interner.intern("a"));
        let params = vec![Param {
            name: asm.intern_string("x"),
            ty: VmType::I32,
        }];
        let a = asm.take_delegate_type(Some(VmType::I32), params.clone());
        let b = asm.take_delegate_type(Some(VmType::I32), params);
        assert_eq!(a, b);
    }

    #[test]
    fn constant_object_dedup_by_identity() {
        let mut interner = Interner::new();
        let mut asm = Assembly::new(interner.intern("a"));
        let idx1 = asm.add_constant_string("hello");
        let idx2 = asm.add_constant_string("hello");
        assert_eq!(idx1, idx2);
    }
}
