//! A bytecode module: the encoded instruction stream, a run-length-encoded
//! line table, a constants section, and the module-local function symbol
//! table. Grounded in `ntr/source/module.c`'s `ntWriteModule`/`ntWriteVariant`/
//! `ntAddConstant32`/`ntAddConstant64` and its weak/strong/native symbol
//! registration.

use std::collections::HashMap;

use bitflags::bitflags;
use nt_core::{ByteBuffer, InternedStr, StringTable};

use crate::error::{Result, VmError};

bitflags! {
    /// `FUNCTION` set means "has a return type"; unset means "subroutine"
    /// (void return). `NATIVE` and `WEAK` are mutually exclusive states of
    /// a not-yet-addressed declaration; a strong definition clears `WEAK`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SymbolFlags: u8 {
        const FUNCTION = 0b0000_0001;
        const PUBLIC   = 0b0000_0010;
        const NATIVE   = 0b0000_0100;
        const WEAK     = 0b0000_1000;
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for SymbolFlags {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde::Serialize::serialize(&self.bits(), serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for SymbolFlags {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bits = <u8 as serde::Deserialize>::deserialize(deserializer)?;
        Ok(SymbolFlags::from_bits_truncate(bits))
    }
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FunctionSymbol {
    pub flags: SymbolFlags,
    pub address: Option<usize>,
}

impl FunctionSymbol {
    pub fn is_subroutine(&self) -> bool {
        !self.flags.contains(SymbolFlags::FUNCTION)
    }
    pub fn is_public(&self) -> bool {
        self.flags.contains(SymbolFlags::PUBLIC)
    }
    pub fn is_native(&self) -> bool {
        self.flags.contains(SymbolFlags::NATIVE)
    }
    pub fn is_weak(&self) -> bool {
        self.flags.contains(SymbolFlags::WEAK)
    }
}

#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BytecodeModule {
    pub name: InternedStr,
    code: ByteBuffer,
    lines: ByteBuffer,
    constants: ByteBuffer,
    pending_run: Option<(u32, u32)>,
    const32_offsets: HashMap<u32, usize>,
    const64_offsets: HashMap<u64, usize>,
    const_str_offsets: HashMap<String, usize>,
    functions: StringTable<FunctionSymbol>,
}

impl BytecodeModule {
    pub fn new(name: InternedStr) -> Self {
        Self {
            name,
            code: ByteBuffer::new(),
            lines: ByteBuffer::new(),
            constants: ByteBuffer::new(),
            pending_run: None,
            const32_offsets: HashMap::new(),
            const64_offsets: HashMap::new(),
            const_str_offsets: HashMap::new(),
            functions: StringTable::new(),
        }
    }

    pub fn code(&self) -> &ByteBuffer {
        &self.code
    }

    pub fn constants(&self) -> &ByteBuffer {
        &self.constants
    }

    fn track_line(&mut self, line: u32, count: u32) {
        match &mut self.pending_run {
            Some((current_line, length)) if *current_line == line => *length += count,
            _ => {
                self.flush_line_run();
                self.pending_run = Some((line, count));
            }
        }
    }

    fn flush_line_run(&mut self) {
        if let Some((line, length)) = self.pending_run.take() {
            self.lines.append_varint(length as i64);
            self.lines.append_varint(line as i64);
        }
    }

    /// Appends one opcode or operand byte to the code stream, extending the
    /// current `(length, line)` run.
    pub fn write(&mut self, byte: u8, line: u32) -> usize {
        let offset = self.code.append(&[byte]);
        self.track_line(line, 1);
        offset
    }

    /// Appends a zig-zag varint operand, attributing every byte it occupies
    /// to `line`.
    pub fn write_varint(&mut self, value: i64, line: u32) -> usize {
        let before = self.code.len();
        let offset = self.code.append_varint(value);
        let written = (self.code.len() - before) as u32;
        self.track_line(line, written);
        offset
    }

    /// Walks the line table to find the source line covering `offset`.
    /// Includes the not-yet-flushed pending run.
    pub fn line_for(&self, offset: usize) -> Option<u32> {
        let mut cursor = 0usize;
        let mut pos = 0usize;
        while pos < self.lines.len() {
            let (length, n1) = self.lines.read_varint(pos).ok()?;
            let (line, n2) = self.lines.read_varint(pos + n1).ok()?;
            cursor += length as usize;
            if offset < cursor {
                return Some(line as u32);
            }
            pos += n1 + n2;
        }
        if let Some((line, length)) = self.pending_run {
            cursor += length as usize;
            if offset < cursor {
                return Some(line);
            }
        }
        None
    }

    /// Deduplicating 32-bit constant insertion: returns the byte offset of
    /// an existing identical constant, or appends a fresh one.
    pub fn add_constant_32(&mut self, value: u32) -> usize {
        if let Some(&offset) = self.const32_offsets.get(&value) {
            return offset;
        }
        let offset = self.constants.append_u32(value);
        self.const32_offsets.insert(value, offset);
        offset
    }

    pub fn add_constant_64(&mut self, value: u64) -> usize {
        if let Some(&offset) = self.const64_offsets.get(&value) {
            return offset;
        }
        let offset = self.constants.append_u64(value);
        self.const64_offsets.insert(value, offset);
        offset
    }

    /// Stores a UTF-8, varint length-prefixed string constant (§6, §9 on
    /// the UTF-8-vs-UTF-32 encoding decision).
    pub fn add_constant_string(&mut self, s: &str) -> usize {
        if let Some(&offset) = self.const_str_offsets.get(s) {
            return offset;
        }
        let offset = self.constants.append_varint(s.len() as i64);
        self.constants.append(s.as_bytes());
        self.const_str_offsets.insert(s.to_string(), offset);
        offset
    }

    pub fn read_constant_32(&self, offset: usize) -> Result<u32> {
        self.constants
            .read_u32(offset)
            .map_err(|e| VmError::runtime(e.to_string()))
    }

    pub fn read_constant_64(&self, offset: usize) -> Result<u64> {
        self.constants
            .read_u64(offset)
            .map_err(|e| VmError::runtime(e.to_string()))
    }

    pub fn read_constant_string(&self, offset: usize) -> Result<String> {
        let (len, n) = self
            .constants
            .read_varint(offset)
            .map_err(|e| VmError::runtime(e.to_string()))?;
        let start = offset + n;
        let end = start + len as usize;
        let bytes = &self.constants.as_slice()[start..end];
        String::from_utf8(bytes.to_vec()).map_err(|e| VmError::runtime(e.to_string()))
    }

    /// Forward declaration with no address yet.
    pub fn declare_weak(&mut self, name: InternedStr, flags: SymbolFlags) {
        if !self.functions.contains_key(&name) {
            self.functions.insert(
                name,
                FunctionSymbol {
                    flags: flags | SymbolFlags::WEAK,
                    address: None,
                },
            );
        }
    }

    /// Adds a bytecode delegate at a definite address, promoting any
    /// pre-existing weak entry in place.
    pub fn define_strong(&mut self, name: InternedStr, flags: SymbolFlags, address: usize) {
        self.functions.insert(
            name,
            FunctionSymbol {
                flags: flags & !SymbolFlags::WEAK,
                address: Some(address),
            },
        );
    }

    pub fn define_native(&mut self, name: InternedStr, flags: SymbolFlags) {
        self.functions.insert(
            name,
            FunctionSymbol {
                flags: (flags | SymbolFlags::NATIVE) & !SymbolFlags::WEAK,
                address: None,
            },
        );
    }

    pub fn function_symbol(&self, name: &InternedStr) -> Option<&FunctionSymbol> {
        self.functions.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nt_core::Interner;
    use pretty_assertions::assert_eq;

    #[test]
    fn constants_dedup_by_value() {
        let mut interner = Interner::new();
        let mut m = BytecodeModule::new(interner.intern("m"));
        let a = m.add_constant_32(42);
        let b = m.add_constant_32(42);
        assert_eq!(a, b);
        assert_eq!(m.read_constant_32(a).unwrap(), 42);
    }

    #[test]
    fn string_constants_roundtrip() {
        let mut interner = Interner::new();
        let mut m = BytecodeModule::new(interner.intern("m"));
        let off = m.add_constant_string("hello");
        assert_eq!(m.read_constant_string(off).unwrap(), "hello");
    }

    #[test]
    fn line_table_tracks_runs() {
        let mut interner = Interner::new();
        let mut m = BytecodeModule::new(interner.intern("m"));
        m.write(0x01, 10);
        m.write(0x02, 10);
        m.write(0x03, 11);
        assert_eq!(m.line_for(0), Some(10));
        assert_eq!(m.line_for(1), Some(10));
        assert_eq!(m.line_for(2), Some(11));
    }

    #[test]
    fn weak_symbol_promoted_by_strong_definition() {
        let mut interner = Interner::new();
        let mut m = BytecodeModule::new(interner.intern("m"));
        let name = interner.intern("f");
        m.declare_weak(name.clone(), SymbolFlags::PUBLIC);
        assert!(m.function_symbol(&name).unwrap().is_weak());
        m.define_strong(name.clone(), SymbolFlags::PUBLIC | SymbolFlags::FUNCTION, 100);
        let sym = m.function_symbol(&name).unwrap();
        assert!(!sym.is_weak());
        assert_eq!(sym.address, Some(100));
    }
}
