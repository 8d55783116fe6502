//! Ordered, scoped symbol table: named entries annotated with kind flags,
//! supporting current-scope and parent-chain lookup plus weak-then-strong
//! replacement. Generic over the payload type `T` used for an entry's
//! expression type, so this crate carries no dependency on the IR's own
//! type representation.

use crate::intern::InternedStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SymbolError {
    #[error("symbol `{0}` is already declared in the current scope")]
    DuplicateInCurrentScope(String),
}

pub type Result<T> = std::result::Result<T, SymbolError>;

bitflags::bitflags! {
    /// Kind flags annotating a symbol-table entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SymbolKind: u8 {
        const VARIABLE   = 0b0000_0001;
        const FUNCTION   = 0b0000_0010;
        const SUBROUTINE = 0b0000_0100;
        const TYPE       = 0b0000_1000;
        const PUBLIC     = 0b0001_0000;
        const PRIVATE    = 0b0010_0000;
        const WEAK       = 0b0100_0000;
    }
}

#[derive(Debug, Clone)]
pub struct SymbolEntry<T> {
    pub name: InternedStr,
    pub kind: SymbolKind,
    pub expr_type: Option<T>,
}

impl<T> SymbolEntry<T> {
    pub fn is_weak(&self) -> bool {
        self.kind.contains(SymbolKind::WEAK)
    }
}

#[derive(Debug, Clone, Default)]
struct Scope<T> {
    entries: Vec<SymbolEntry<T>>,
    return_type: Option<T>,
    loop_labels: Vec<InternedStr>,
    break_labels: Vec<InternedStr>,
    breaked: bool,
    continued: bool,
}

/// A stack of lexical scopes. Lookup climbs from the innermost scope
/// outward, mirroring the parent-chain `Environment` shape used by the
/// teacher's tree-walking runtime, adapted to hold typed symbol metadata
/// instead of runtime values.
#[derive(Debug, Clone)]
pub struct SymbolTable<T> {
    scopes: Vec<Scope<T>>,
}

impl<T> Default for SymbolTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SymbolTable<T> {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    pub fn pop_scope(&mut self) {
        assert!(self.scopes.len() > 1, "cannot pop the root scope");
        self.scopes.pop();
    }

    fn current_mut(&mut self) -> &mut Scope<T> {
        self.scopes.last_mut().expect("scope stack is never empty")
    }

    fn current(&self) -> &Scope<T> {
        self.scopes.last().expect("scope stack is never empty")
    }

    /// Inserts `name` into the current scope. A duplicate is rejected
    /// unless the existing entry is weak, in which case it is replaced
    /// (weak-then-strong promotion).
    pub fn insert(&mut self, name: InternedStr, kind: SymbolKind, expr_type: Option<T>) -> Result<()> {
        let current = self.current_mut();
        if let Some(existing) = current.entries.iter_mut().find(|e| e.name == name) {
            if existing.is_weak() {
                *existing = SymbolEntry {
                    name,
                    kind,
                    expr_type,
                };
                return Ok(());
            }
            return Err(SymbolError::DuplicateInCurrentScope(name.as_str().to_string()));
        }
        current.entries.push(SymbolEntry {
            name,
            kind,
            expr_type,
        });
        Ok(())
    }

    pub fn lookup_current_scope(&self, name: &InternedStr) -> Option<&SymbolEntry<T>> {
        self.current().entries.iter().find(|e| &e.name == name)
    }

    /// Climbs from the innermost scope to the root looking for `name`.
    pub fn lookup(&self, name: &InternedStr) -> Option<&SymbolEntry<T>> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.entries.iter().find(|e| &e.name == name))
    }

    pub fn set_return_type(&mut self, ty: T) {
        self.current_mut().return_type = Some(ty);
    }

    pub fn return_type(&self) -> Option<&T> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.return_type.as_ref())
    }

    pub fn push_loop_label(&mut self, label: InternedStr) {
        self.current_mut().loop_labels.push(label);
    }

    pub fn pop_loop_label(&mut self) -> Option<InternedStr> {
        self.current_mut().loop_labels.pop()
    }

    pub fn push_break_label(&mut self, label: InternedStr) {
        self.current_mut().break_labels.push(label);
    }

    pub fn pop_break_label(&mut self) -> Option<InternedStr> {
        self.current_mut().break_labels.pop()
    }

    pub fn breaked(&self) -> bool {
        self.current().breaked
    }

    pub fn set_breaked(&mut self, value: bool) {
        self.current_mut().breaked = value;
    }

    pub fn continued(&self) -> bool {
        self.current().continued
    }

    pub fn set_continued(&mut self, value: bool) {
        self.current_mut().continued = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::Interner;
    use pretty_assertions::assert_eq;

    #[test]
    fn insert_and_lookup_current_scope() {
        let mut interner = Interner::new();
        let mut table: SymbolTable<()> = SymbolTable::new();
        let name = interner.intern("x");
        table
            .insert(name.clone(), SymbolKind::VARIABLE, None)
            .unwrap();
        assert!(table.lookup_current_scope(&name).is_some());
    }

    #[test]
    fn duplicate_insert_rejected() {
        let mut interner = Interner::new();
        let mut table: SymbolTable<()> = SymbolTable::new();
        let name = interner.intern("x");
        table
            .insert(name.clone(), SymbolKind::VARIABLE, None)
            .unwrap();
        let err = table.insert(name, SymbolKind::VARIABLE, None).unwrap_err();
        assert_eq!(err, SymbolError::DuplicateInCurrentScope("x".to_string()));
    }

    #[test]
    fn weak_entry_is_replaced_by_strong() {
        let mut interner = Interner::new();
        let mut table: SymbolTable<()> = SymbolTable::new();
        let name = interner.intern("f");
        table
            .insert(name.clone(), SymbolKind::FUNCTION | SymbolKind::WEAK, None)
            .unwrap();
        table
            .insert(name.clone(), SymbolKind::FUNCTION, None)
            .unwrap();
        let entry = table.lookup_current_scope(&name).unwrap();
        assert!(!entry.is_weak());
    }

    #[test]
    fn parent_chain_lookup_climbs_scopes() {
        let mut interner = Interner::new();
        let mut table: SymbolTable<()> = SymbolTable::new();
        let outer = interner.intern("outer");
        table.insert(outer.clone(), SymbolKind::VARIABLE, None).unwrap();
        table.push_scope();
        assert!(table.lookup(&outer).is_some());
        assert!(table.lookup_current_scope(&outer).is_none());
        table.pop_scope();
    }
}
