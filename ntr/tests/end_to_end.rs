//! The six literal end-to-end scenarios: arithmetic, signed/unsigned
//! division, unconditional branch, a native call, and string concatenation.
//! Each builds a module and assembly through the public API and runs it to
//! completion, checking the final value-stack contents.

use std::cell::RefCell;
use std::rc::Rc;

use nt_core::Interner;
use ntr::{
    Assembly, BytecodeModule, ConstantObject, Delegate, DelegateBody, DelegateType, Interpreter, NativeFn, Opcode,
    Param, SymbolFlags, VmType,
};

fn assembly_with_module(body: impl FnOnce(&mut BytecodeModule)) -> (Assembly, ntr::ModuleId) {
    let mut interner = Interner::new();
    let mut module = BytecodeModule::new(interner.intern("m"));
    body(&mut module);
    module.define_strong(
        interner.intern("main"),
        SymbolFlags::FUNCTION | SymbolFlags::PUBLIC,
        0,
    );
    let mut asm = Assembly::new(interner.intern("asm"));
    let module_id = asm.add_module(module);
    (asm, module_id)
}

#[test]
fn arithmetic_scenario_yields_two() {
    let (asm, module_id) = assembly_with_module(|m| {
        m.write(Opcode::One32.to_byte(), 1);
        m.write(Opcode::One32.to_byte(), 1);
        m.write(Opcode::AddI32.to_byte(), 1);
        m.write(Opcode::Return.to_byte(), 1);
    });
    let mut vm = Interpreter::new(asm, module_id, 0);
    vm.run().expect("run succeeds");
    assert_eq!(vm.pop_i32().unwrap(), 2);
}

#[test]
fn signed_division_scenario_yields_negative_three() {
    let mut interner = Interner::new();
    let mut asm = Assembly::new(interner.intern("asm"));
    let mut module = BytecodeModule::new(interner.intern("div"));
    let lhs = module.add_constant_32(-6i32 as u32);
    let rhs = module.add_constant_32(2);
    module.write(Opcode::Const32.to_byte(), 1);
    module.write_varint(lhs as i64, 1);
    module.write(Opcode::Const32.to_byte(), 1);
    module.write_varint(rhs as i64, 1);
    module.write(Opcode::DivI32.to_byte(), 1);
    module.write(Opcode::Return.to_byte(), 1);
    let module_id = asm.add_module(module);

    let mut vm = Interpreter::new(asm, module_id, 0);
    vm.run().expect("run succeeds");
    assert_eq!(vm.pop_i32().unwrap(), -3);
}

#[test]
fn unsigned_division_scenario_yields_large_magnitude() {
    let mut interner = Interner::new();
    let mut asm = Assembly::new(interner.intern("asm"));
    let mut module = BytecodeModule::new(interner.intern("div"));
    let lhs = module.add_constant_32(0xFFFF_FFFA); // same bit pattern as -6
    let rhs = module.add_constant_32(2);
    module.write(Opcode::Const32.to_byte(), 1);
    module.write_varint(lhs as i64, 1);
    module.write(Opcode::Const32.to_byte(), 1);
    module.write_varint(rhs as i64, 1);
    module.write(Opcode::DivU32.to_byte(), 1);
    module.write(Opcode::Return.to_byte(), 1);
    let module_id = asm.add_module(module);

    let mut vm = Interpreter::new(asm, module_id, 0);
    vm.run().expect("run succeeds");
    assert_eq!(vm.pop_u32().unwrap(), 0x7FFF_FFFD);
}

#[test]
fn unconditional_branch_scenario_skips_dead_code() {
    let (asm, module_id) = assembly_with_module(|m| {
        let branch_pos = m.write(Opcode::Branch.to_byte(), 1);
        let varint_len = nt_core::ByteBuffer::varint_encoded_size(2);
        let pc_after_varint = branch_pos + 1 + varint_len;
        let one_pos = pc_after_varint + 1; // one `zero_32` byte skipped
        let offset = (one_pos as i64) - (pc_after_varint as i64) + 1;
        m.write_varint(offset, 1);
        m.write(Opcode::Zero32.to_byte(), 1);
        m.write(Opcode::One32.to_byte(), 1);
        m.write(Opcode::Return.to_byte(), 1);
    });
    let mut vm = Interpreter::new(asm, module_id, 0);
    vm.run().expect("run succeeds");
    assert_eq!(vm.pop_u32().unwrap(), 1);
}

#[test]
fn native_call_scenario_leaves_stack_length_unchanged() {
    let sink: Rc<RefCell<Vec<u64>>> = Rc::new(RefCell::new(Vec::new()));
    let sink_clone = sink.clone();

    let mut interner = Interner::new();
    let mut asm = Assembly::new(interner.intern("asm"));
    let delegate_type = asm.take_delegate_type(
        None,
        vec![Param {
            name: asm.intern_string("object"),
            ty: VmType::Ref,
        }],
    );
    let print_fn: NativeFn = Rc::new(move |vm: &mut Interpreter, _ty: &DelegateType| {
        let reference = vm.pop_ref()?;
        sink_clone.borrow_mut().push(reference);
        Ok(true)
    });
    let delegate = Delegate {
        name: asm.intern_string("print"),
        delegate_type,
        body: DelegateBody::Native(print_fn),
    };
    let delegate_id = asm.add_delegate(delegate);
    let delegate_ref = asm.add_constant_object(ConstantObject::Delegate(delegate_id));
    let string_ref = asm.add_constant_string("hello");

    let mut module = BytecodeModule::new(interner.intern("m"));
    module.write(Opcode::ConstObject.to_byte(), 1);
    module.write_varint(string_ref as i64, 1);
    module.write(Opcode::ConstObject.to_byte(), 1);
    module.write_varint(delegate_ref as i64, 1);
    module.write(Opcode::Call.to_byte(), 1);
    module.write(Opcode::Return.to_byte(), 1);
    let module_id = asm.add_module(module);

    let mut vm = Interpreter::new(asm, module_id, 0);
    let before = vm.stack_len();
    vm.run().expect("run succeeds");
    assert_eq!(vm.stack_len(), before);
    assert_eq!(*sink.borrow(), vec![string_ref]);
}

#[test]
fn concat_scenario_interns_the_joined_string() {
    let mut interner = Interner::new();
    let mut asm = Assembly::new(interner.intern("asm"));
    let hello = asm.add_constant_string("hello");
    let world = asm.add_constant_string("world");

    let mut module = BytecodeModule::new(interner.intern("m"));
    module.write(Opcode::ConstObject.to_byte(), 1);
    module.write_varint(hello as i64, 1);
    module.write(Opcode::ConstObject.to_byte(), 1);
    module.write_varint(world as i64, 1);
    module.write(Opcode::Concat.to_byte(), 1);
    module.write(Opcode::Return.to_byte(), 1);
    let module_id = asm.add_module(module);

    let mut vm = Interpreter::new(asm, module_id, 0);
    vm.run().expect("run succeeds");
    let result_ref = vm.pop_ref().unwrap();
    let joined = vm.assembly().display_constant(result_ref).unwrap();
    assert_eq!(joined, "helloworld");
    assert_eq!(joined.len(), 10);
}
