//! Shared value substrate for the NIL/NTR toolchain.
//!
//! Bottom layer: a growable byte buffer with a varint codec, interned
//! strings, an open-addressed string-keyed table, and a scoped symbol
//! table. Both the IR (`nil`) and the VM (`ntr`) crates build on this.

pub mod byte_buffer;
pub mod intern;
pub mod string_table;
pub mod symbol_table;

pub use byte_buffer::{ByteBuffer, ByteBufferError};
pub use intern::{
    fnv1a_hash, parse_f32_lossy, parse_f64_lossy, parse_i32_saturating, parse_i64_saturating, parse_u32_saturating,
    parse_u64_saturating, InternedStr, Interner,
};
pub use string_table::StringTable;
pub use symbol_table::{SymbolEntry, SymbolError, SymbolKind, SymbolTable};
