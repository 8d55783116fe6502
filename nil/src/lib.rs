//! A typed, SSA-style intermediate representation: contexts intern types
//! and issue names, modules own functions, functions own basic blocks and
//! an instruction arena, basic blocks own ordered instruction sequences.
//! Grounded throughout on `seen_ir` (see `DESIGN.md`), generalized to the
//! opcode and type surface `SPEC_FULL.md` §3-§5 describe.

pub mod context;
pub mod error;
pub mod function;
pub mod instruction;
pub mod module;
pub mod types;
pub mod value;

pub use context::Context;
pub use error::{IrError, Result};
pub use function::{Block, Function};
pub use instruction::{CmpPredicate, Inst, InstKind, Opcode};
pub use module::Module;
pub use types::{Type, TypeRef};
pub use value::{ArgId, Argument, BlockId, Constant, ConstantPayload, DebugLoc, InstId, Value, ValueKind};
