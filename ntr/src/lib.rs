pub mod assembly;
pub mod bytecode;
pub mod delegate;
pub mod error;
pub mod interpreter;
pub mod object;
pub mod opcode;

pub use assembly::{Assembly, ConstantObject};
pub use bytecode::{BytecodeModule, FunctionSymbol, SymbolFlags};
pub use delegate::{Delegate, DelegateBody, DelegateId, DelegateType, DelegateTypeId, ModuleId, NativeFn, Param, VmType};
pub use error::{Result, VmError};
pub use interpreter::{CallFrame, Interpreter, CALL_STACK_CAPACITY, PC_HALT, STACK_CAPACITY};
pub use object::{is_assignable_from, ObjectKind};
pub use opcode::Opcode;
