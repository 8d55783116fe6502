//! Open-addressed, string-keyed hash table with linear probing and
//! tombstone deletion, grounded in `ntr/source/table.c`.

use crate::intern::InternedStr;

const MAX_LOAD: f64 = 0.75;

#[derive(Debug, Clone)]
enum Slot<V> {
    Empty,
    Tombstone,
    Occupied(InternedStr, V),
}

/// A string-keyed open-addressed map. Used both as an ordinary keyed map
/// (module function tables, symbol scopes) and, via [`StringTable::find_by_chars`],
/// as the backing store for string interning — mirroring the dual use of
/// `NT_TABLE` in the original sources.
#[derive(Debug, Clone)]
pub struct StringTable<V> {
    slots: Vec<Slot<V>>,
    count: usize, // occupied + tombstones, used for the load-factor check
    occupied: usize,
}

impl<V> Default for StringTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> StringTable<V> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            count: 0,
            occupied: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.occupied
    }

    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Probes for `key`'s slot index: either the occupied slot holding an
    /// equal key, or the first empty/tombstone slot where it would be
    /// inserted. Probing treats tombstones as passable (does not stop
    /// there) but remembers the first one seen for reuse.
    fn find_slot(&self, key: &InternedStr) -> usize {
        let cap = self.capacity();
        let mut index = (key.hash() as usize) % cap;
        let mut first_tombstone: Option<usize> = None;
        loop {
            match &self.slots[index] {
                Slot::Empty => return first_tombstone.unwrap_or(index),
                Slot::Tombstone => {
                    if first_tombstone.is_none() {
                        first_tombstone = Some(index);
                    }
                }
                Slot::Occupied(k, _) if k == key => return index,
                Slot::Occupied(_, _) => {}
            }
            index = (index + 1) % cap;
        }
    }

    fn grow(&mut self) {
        let new_cap = (self.capacity() * 3 / 2).max(4);
        let mut new_table = StringTable::<V> {
            slots: (0..new_cap).map(|_| Slot::Empty).collect(),
            count: 0,
            occupied: 0,
        };
        for slot in std::mem::take(&mut self.slots) {
            if let Slot::Occupied(k, v) = slot {
                new_table.insert(k, v);
            }
        }
        *self = new_table;
    }

    pub fn insert(&mut self, key: InternedStr, value: V) -> Option<V> {
        if self.capacity() == 0 || (self.count + 1) as f64 > self.capacity() as f64 * MAX_LOAD {
            self.grow();
        }
        let index = self.find_slot(&key);
        let was_new_slot = !matches!(self.slots[index], Slot::Occupied(_, _));
        let previous = match std::mem::replace(&mut self.slots[index], Slot::Empty) {
            Slot::Occupied(_, v) => Some(v),
            _ => None,
        };
        if was_new_slot {
            self.count += 1;
            self.occupied += 1;
        }
        self.slots[index] = Slot::Occupied(key, value);
        previous
    }

    pub fn get(&self, key: &InternedStr) -> Option<&V> {
        if self.capacity() == 0 {
            return None;
        }
        match &self.slots[self.find_slot(key)] {
            Slot::Occupied(_, v) => Some(v),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: &InternedStr) -> Option<&mut V> {
        if self.capacity() == 0 {
            return None;
        }
        let index = self.find_slot(key);
        match &mut self.slots[index] {
            Slot::Occupied(_, v) => Some(v),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &InternedStr) -> bool {
        self.get(key).is_some()
    }

    /// Deletes `key`, leaving a tombstone so later probes through this slot
    /// still reach entries inserted after it.
    pub fn delete(&mut self, key: &InternedStr) -> Option<V> {
        if self.capacity() == 0 {
            return None;
        }
        let index = self.find_slot(key);
        match std::mem::replace(&mut self.slots[index], Slot::Tombstone) {
            Slot::Occupied(_, v) => {
                self.occupied -= 1;
                Some(v)
            }
            other => {
                self.slots[index] = other;
                None
            }
        }
    }

    /// Raw-chars lookup used by interning: finds an existing key matching
    /// `(hash, chars)` without requiring a candidate [`InternedStr`] to
    /// exist yet. Mirrors `ntTableFindString`.
    pub fn find_by_chars(&self, chars: &str, hash: u64) -> Option<&InternedStr> {
        if self.capacity() == 0 {
            return None;
        }
        let cap = self.capacity();
        let mut index = (hash as usize) % cap;
        loop {
            match &self.slots[index] {
                Slot::Empty => return None,
                Slot::Tombstone => {}
                Slot::Occupied(k, _) if k.hash() == hash && k.as_str() == chars => {
                    return Some(k);
                }
                Slot::Occupied(_, _) => {}
            }
            index = (index + 1) % cap;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&InternedStr, &V)> {
        self.slots.iter().filter_map(|slot| match slot {
            Slot::Occupied(k, v) => Some((k, v)),
            _ => None,
        })
    }
}

/// Serialises as a flat list of entries; deserialising rebuilds the table
/// by re-inserting each pair, which re-derives the open-addressed layout
/// rather than preserving slot order.
#[cfg(feature = "serde")]
impl<V: serde::Serialize> serde::Serialize for StringTable<V> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for (k, v) in self.iter() {
            seq.serialize_element(&(k, v))?;
        }
        seq.end()
    }
}

#[cfg(feature = "serde")]
impl<'de, V: serde::Deserialize<'de>> serde::Deserialize<'de> for StringTable<V> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = <Vec<(InternedStr, V)> as serde::Deserialize>::deserialize(deserializer)?;
        let mut table = StringTable::new();
        for (k, v) in entries {
            table.insert(k, v);
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::Interner;
    use pretty_assertions::assert_eq;

    #[test]
    fn insert_get_delete_roundtrip() {
        let mut interner = Interner::new();
        let mut table = StringTable::new();
        let a = interner.intern("alpha");
        let b = interner.intern("beta");

        assert_eq!(table.insert(a.clone(), 1), None);
        assert_eq!(table.insert(b.clone(), 2), None);
        assert_eq!(table.get(&a), Some(&1));
        assert_eq!(table.get(&b), Some(&2));

        assert_eq!(table.delete(&a), Some(1));
        assert_eq!(table.get(&a), None);
        // probing past the tombstone still finds b
        assert_eq!(table.get(&b), Some(&2));
    }

    #[test]
    fn insert_replaces_existing_key() {
        let mut interner = Interner::new();
        let mut table = StringTable::new();
        let a = interner.intern("alpha");
        assert_eq!(table.insert(a.clone(), 1), None);
        assert_eq!(table.insert(a.clone(), 2), Some(1));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn grows_past_load_factor() {
        let mut interner = Interner::new();
        let mut table = StringTable::new();
        for i in 0..100 {
            let key = interner.intern(&format!("key{i}"));
            table.insert(key, i);
        }
        assert_eq!(table.len(), 100);
        for i in 0..100 {
            let key = interner.intern(&format!("key{i}"));
            assert_eq!(table.get(&key), Some(&i));
        }
    }

    #[test]
    fn find_by_chars_locates_interned_key() {
        let mut interner = Interner::new();
        let mut table = StringTable::new();
        let a = interner.intern("alpha");
        table.insert(a.clone(), ());
        let found = table.find_by_chars("alpha", a.hash());
        assert!(found.is_some());
        assert_eq!(found.unwrap(), &a);
    }
}
