//! The VM's runtime object kinds and the `Type`/`Object` root-type
//! relationship. Grounded in `ntr/source/object.c`'s lazily-initialised
//! singleton types (`ntType()`, `ntObjectType()`) and `ntTypeIsAssignableFrom`'s
//! base-type walk; supplemented per `SPEC_FULL.md` §9 since the distilled
//! specification does not call this relationship out explicitly.
//!
//! This port does not carry a general structural type system for runtime
//! values (the VM's only heap-ish values are the four [`ConstantObject`]
//! kinds); `ObjectKind` exists to ground the assignability check the
//! original performs before `concat`, not to reintroduce per-type vtables.
//!
//! There is no separate `DelegateType` kind: `ntr/source/delegate.c`'s
//! `ntDelegateType()` singleton is itself tagged `NT_OBJECT_TYPE_TYPE`, i.e.
//! a delegate-type descriptor classifies as `Type`, the same as any other
//! type object — this is how the spec's "types themselves are objects whose
//! type is a singleton `Type`" invariant is actually reached: every
//! [`ConstantObject::DelegateType`] constant's kind resolves to `Type`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Object,
    Type,
    Str,
    Module,
    Delegate,
}

impl ObjectKind {
    /// `Type`'s base is `Object`; every other concrete kind's base is
    /// `Object` directly (this port has no multi-level kind hierarchy
    /// beyond the root pair the original establishes in `object.c`).
    /// `Object` itself has no base, terminating the walk.
    fn base(self) -> Option<ObjectKind> {
        match self {
            ObjectKind::Object => None,
            _ => Some(ObjectKind::Object),
        }
    }
}

/// Mirrors `ntTypeIsAssignableFrom`: walks `from`'s base-kind chain looking
/// for `to`, stopping at the root (`previous == from` guards against a
/// self-referential root looping forever).
pub fn is_assignable_from(to: ObjectKind, from: ObjectKind) -> bool {
    let mut previous: Option<ObjectKind> = None;
    let mut current = Some(from);
    loop {
        match current {
            Some(k) if k == to => return true,
            Some(k) => {
                let next = k.base();
                if next == previous {
                    return false;
                }
                previous = Some(k);
                current = next;
            }
            None => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_concrete_kind_is_assignable_to_object() {
        for kind in [
            ObjectKind::Type,
            ObjectKind::Str,
            ObjectKind::Module,
            ObjectKind::Delegate,
        ] {
            assert!(is_assignable_from(ObjectKind::Object, kind));
        }
    }

    #[test]
    fn object_is_not_assignable_to_a_concrete_kind() {
        assert!(!is_assignable_from(ObjectKind::Str, ObjectKind::Object));
    }
}
