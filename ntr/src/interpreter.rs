//! The interpreter core: value stack, call stack, fetch/decode/dispatch
//! loop, and the call/return protocol. Grounded in `ntr/source/vm.c`'s
//! `run`/`ntCall`/`popCall`/`pushCall`.

use nt_core::{
    parse_f32_lossy, parse_f64_lossy, parse_i32_saturating, parse_i64_saturating, parse_u32_saturating,
    parse_u64_saturating,
};

use crate::assembly::{Assembly, ConstantObject};
use crate::delegate::{DelegateBody, ModuleId};
use crate::error::{Result, VmError};
use crate::opcode::Opcode;

/// Fixed value-stack capacity in bytes (§4.9/§9 — a named constant rather
/// than an inline magic number).
pub const STACK_CAPACITY: usize = 4096;
/// Fixed call-stack capacity, measured in return frames rather than bytes
/// (each frame is small and fixed-size, unlike the byte-oriented value
/// stack).
pub const CALL_STACK_CAPACITY: usize = 4096 / std::mem::size_of::<CallFrame>();

/// pc sentinel meaning "no module is current; the run loop should return".
pub const PC_HALT: usize = usize::MAX;

#[derive(Debug, Clone, Copy)]
pub struct CallFrame {
    pub module: Option<ModuleId>,
    pub pc: usize,
}

pub struct Interpreter {
    value_stack: Vec<u8>,
    call_stack: Vec<CallFrame>,
    pc: usize,
    module: Option<ModuleId>,
    assembly: Assembly,
}

impl Interpreter {
    pub fn new(assembly: Assembly, entry_module: ModuleId, entry_pc: usize) -> Self {
        Self {
            value_stack: Vec::new(),
            call_stack: Vec::new(),
            pc: entry_pc,
            module: Some(entry_module),
            assembly,
        }
    }

    pub fn assembly(&self) -> &Assembly {
        &self.assembly
    }

    pub fn assembly_mut(&mut self) -> &mut Assembly {
        &mut self.assembly
    }

    pub fn stack_len(&self) -> usize {
        self.value_stack.len()
    }

    // --- raw push/pop primitives ---

    fn push_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if self.value_stack.len() + bytes.len() > STACK_CAPACITY {
            return Err(VmError::StackOverflow {
                capacity: STACK_CAPACITY,
            });
        }
        self.value_stack.extend_from_slice(bytes);
        Ok(())
    }

    fn pop_bytes(&mut self, width: usize) -> Result<Vec<u8>> {
        if self.value_stack.len() < width {
            return Err(VmError::runtime("value stack underflow"));
        }
        let start = self.value_stack.len() - width;
        let bytes = self.value_stack[start..].to_vec();
        self.value_stack.truncate(start);
        Ok(bytes)
    }

    fn peek_bytes(&self, width: usize) -> Result<&[u8]> {
        if self.value_stack.len() < width {
            return Err(VmError::runtime("value stack underflow"));
        }
        let start = self.value_stack.len() - width;
        Ok(&self.value_stack[start..])
    }

    // --- typed push/pop, public so native delegates can drive the stack ---

    pub fn push_u32(&mut self, v: u32) -> Result<()> {
        self.push_bytes(&v.to_ne_bytes())
    }
    pub fn push_i32(&mut self, v: i32) -> Result<()> {
        self.push_bytes(&v.to_ne_bytes())
    }
    pub fn push_f32(&mut self, v: f32) -> Result<()> {
        self.push_bytes(&v.to_ne_bytes())
    }
    pub fn push_u64(&mut self, v: u64) -> Result<()> {
        self.push_bytes(&v.to_ne_bytes())
    }
    pub fn push_i64(&mut self, v: i64) -> Result<()> {
        self.push_bytes(&v.to_ne_bytes())
    }
    pub fn push_f64(&mut self, v: f64) -> Result<()> {
        self.push_bytes(&v.to_ne_bytes())
    }
    pub fn push_ref(&mut self, v: u64) -> Result<()> {
        self.push_u64(v)
    }

    pub fn pop_u32(&mut self) -> Result<u32> {
        Ok(u32::from_ne_bytes(self.pop_bytes(4)?.try_into().unwrap()))
    }
    pub fn pop_i32(&mut self) -> Result<i32> {
        Ok(i32::from_ne_bytes(self.pop_bytes(4)?.try_into().unwrap()))
    }
    pub fn pop_f32(&mut self) -> Result<f32> {
        Ok(f32::from_ne_bytes(self.pop_bytes(4)?.try_into().unwrap()))
    }
    pub fn pop_u64(&mut self) -> Result<u64> {
        Ok(u64::from_ne_bytes(self.pop_bytes(8)?.try_into().unwrap()))
    }
    pub fn pop_i64(&mut self) -> Result<i64> {
        Ok(i64::from_ne_bytes(self.pop_bytes(8)?.try_into().unwrap()))
    }
    pub fn pop_f64(&mut self) -> Result<f64> {
        Ok(f64::from_ne_bytes(self.pop_bytes(8)?.try_into().unwrap()))
    }
    pub fn pop_ref(&mut self) -> Result<u64> {
        self.pop_u64()
    }

    fn peek_u32(&self) -> Result<u32> {
        Ok(u32::from_ne_bytes(self.peek_bytes(4)?.try_into().unwrap()))
    }
    fn peek_u64(&self) -> Result<u64> {
        Ok(u64::from_ne_bytes(self.peek_bytes(8)?.try_into().unwrap()))
    }

    fn read_below_top(&self, offset_bytes: usize, width: usize) -> Result<Vec<u8>> {
        let len = self.value_stack.len();
        if offset_bytes + width > len {
            return Err(VmError::runtime("stack-frame address below bottom of stack"));
        }
        let start = len - offset_bytes - width;
        Ok(self.value_stack[start..start + width].to_vec())
    }

    fn write_below_top(&mut self, offset_bytes: usize, width: usize, bytes: &[u8]) -> Result<()> {
        let len = self.value_stack.len();
        if offset_bytes + width > len {
            return Err(VmError::runtime("stack-frame address below bottom of stack"));
        }
        let start = len - offset_bytes - width;
        self.value_stack[start..start + width].copy_from_slice(bytes);
        Ok(())
    }

    // --- fetch helpers ---

    fn current_module_id(&self) -> Result<ModuleId> {
        self.module.ok_or_else(|| VmError::runtime("no current module"))
    }

    fn fetch_byte(&mut self) -> Result<u8> {
        let module_id = self.current_module_id()?;
        let byte = self
            .assembly
            .module(module_id)
            .code()
            .as_slice()
            .get(self.pc)
            .copied()
            .ok_or_else(|| VmError::runtime("pc out of bounds"))?;
        self.pc += 1;
        Ok(byte)
    }

    /// Reads a varint operand starting at the current `pc` and advances
    /// `pc` past it.
    fn read_varint_operand(&mut self) -> Result<i64> {
        let module_id = self.current_module_id()?;
        let (value, n) = self
            .assembly
            .module(module_id)
            .code()
            .read_varint(self.pc)
            .map_err(|e| VmError::runtime(e.to_string()))?;
        self.pc += n;
        Ok(value)
    }

    fn read_constant_32_operand(&mut self) -> Result<u32> {
        let module_id = self.current_module_id()?;
        let offset = self.read_varint_operand()? as usize;
        self.assembly.module(module_id).read_constant_32(offset)
    }

    fn read_constant_64_operand(&mut self) -> Result<u64> {
        let module_id = self.current_module_id()?;
        let offset = self.read_varint_operand()? as usize;
        self.assembly.module(module_id).read_constant_64(offset)
    }

    /// Branch target per the offset convention in §4.9: the offset is read
    /// as a varint (advancing `pc` past it), and the absolute target is the
    /// post-operand `pc` plus `offset - 1`.
    fn branch_target(&mut self) -> Result<usize> {
        let offset = self.read_varint_operand()?;
        let target = self.pc as i64 + offset - 1;
        if target < 0 {
            return Err(VmError::runtime("branch target underflowed"));
        }
        Ok(target as usize)
    }

    // --- dispatch loop ---

    pub fn run(&mut self) -> Result<()> {
        loop {
            if self.module.is_none() && self.pc == PC_HALT {
                return Ok(());
            }
            let byte = self.fetch_byte()?;
            let opcode = Opcode::from_byte(byte).ok_or_else(|| VmError::runtime(format!("invalid opcode byte {byte}")))?;
            log::trace!("pc={} op={:?}", self.pc - 1, opcode);
            self.execute(opcode)?;
        }
    }

    fn execute(&mut self, opcode: Opcode) -> Result<()> {
        use Opcode::*;
        match opcode {
            // --- branch ---
            Branch => {
                self.pc = self.branch_target()?;
            }
            BranchZ32 => {
                let cond = self.peek_u32()?;
                let target = self.branch_target()?;
                if cond == 0 {
                    self.pc = target;
                }
            }
            BranchNz32 => {
                let cond = self.peek_u32()?;
                let target = self.branch_target()?;
                if cond != 0 {
                    self.pc = target;
                }
            }
            BranchZ64 => {
                let cond = self.peek_u64()?;
                let target = self.branch_target()?;
                if cond == 0 {
                    self.pc = target;
                }
            }
            BranchNz64 => {
                let cond = self.peek_u64()?;
                let target = self.branch_target()?;
                if cond != 0 {
                    self.pc = target;
                }
            }

            // --- constants ---
            Zero32 => self.push_u32(0)?,
            Zero64 => self.push_u64(0)?,
            ZeroF32 => self.push_f32(0.0)?,
            ZeroF64 => self.push_f64(0.0)?,
            One32 => self.push_u32(1)?,
            One64 => self.push_u64(1)?,
            OneF32 => self.push_f32(1.0)?,
            OneF64 => self.push_f64(1.0)?,
            Const32 => {
                let v = self.read_constant_32_operand()?;
                self.push_u32(v)?;
            }
            Const64 => {
                let v = self.read_constant_64_operand()?;
                self.push_u64(v)?;
            }
            ConstObject => {
                let index = self.read_varint_operand()? as u64;
                self.push_ref(index)?;
            }

            // --- stack-frame addressing ---
            LoadSp32 => {
                let offset = self.read_varint_operand()? as usize;
                let bytes = self.read_below_top(offset, 4)?;
                self.push_bytes(&bytes)?;
            }
            LoadSp64 => {
                let offset = self.read_varint_operand()? as usize;
                let bytes = self.read_below_top(offset, 8)?;
                self.push_bytes(&bytes)?;
            }
            StoreSp32 => {
                let offset = self.read_varint_operand()? as usize;
                let bytes = self.peek_bytes(4)?.to_vec();
                self.write_below_top(offset, 4, &bytes)?;
            }
            StoreSp64 => {
                let offset = self.read_varint_operand()? as usize;
                let bytes = self.peek_bytes(8)?.to_vec();
                self.write_below_top(offset, 8, &bytes)?;
            }

            // --- comparisons ---
            EqI32 => self.cmp_i32(|a, b| a == b)?,
            NeI32 => self.cmp_i32(|a, b| a != b)?,
            GtI32 => self.cmp_i32(|a, b| a > b)?,
            LtI32 => self.cmp_i32(|a, b| a < b)?,
            GeI32 => self.cmp_i32(|a, b| a >= b)?,
            LeI32 => self.cmp_i32(|a, b| a <= b)?,
            GtU32 => self.cmp_u32(|a, b| a > b)?,
            LtU32 => self.cmp_u32(|a, b| a < b)?,
            GeU32 => self.cmp_u32(|a, b| a >= b)?,
            LeU32 => self.cmp_u32(|a, b| a <= b)?,
            EqI64 => self.cmp_i64(|a, b| a == b)?,
            NeI64 => self.cmp_i64(|a, b| a != b)?,
            GtI64 => self.cmp_i64(|a, b| a > b)?,
            LtI64 => self.cmp_i64(|a, b| a < b)?,
            GeI64 => self.cmp_i64(|a, b| a >= b)?,
            LeI64 => self.cmp_i64(|a, b| a <= b)?,
            GtU64 => self.cmp_u64(|a, b| a > b)?,
            LtU64 => self.cmp_u64(|a, b| a < b)?,
            GeU64 => self.cmp_u64(|a, b| a >= b)?,
            LeU64 => self.cmp_u64(|a, b| a <= b)?,
            EqF32 => self.cmp_f32(|a, b| a == b)?,
            NeF32 => self.cmp_f32(|a, b| a != b)?,
            GtF32 => self.cmp_f32(|a, b| a > b)?,
            LtF32 => self.cmp_f32(|a, b| a < b)?,
            GeF32 => self.cmp_f32(|a, b| a >= b)?,
            LeF32 => self.cmp_f32(|a, b| a <= b)?,
            EqF64 => self.cmp_f64(|a, b| a == b)?,
            NeF64 => self.cmp_f64(|a, b| a != b)?,
            GtF64 => self.cmp_f64(|a, b| a > b)?,
            LtF64 => self.cmp_f64(|a, b| a < b)?,
            GeF64 => self.cmp_f64(|a, b| a >= b)?,
            LeF64 => self.cmp_f64(|a, b| a <= b)?,

            // --- negate / bitwise-not ---
            NegI32 => {
                let v = self.pop_i32()?;
                self.push_i32(v.wrapping_neg())?;
            }
            NegI64 => {
                let v = self.pop_i64()?;
                self.push_i64(v.wrapping_neg())?;
            }
            NegF32 => {
                let v = self.pop_f32()?;
                self.push_f32(-v)?;
            }
            NegF64 => {
                let v = self.pop_f64()?;
                self.push_f64(-v)?;
            }
            Not32 => {
                let v = self.pop_u32()?;
                self.push_u32(!v)?;
            }
            Not64 => {
                let v = self.pop_u64()?;
                self.push_u64(!v)?;
            }

            // --- is-zero / is-non-zero ---
            IsZero32 => {
                let v = self.pop_u32()?;
                self.push_u32((v == 0) as u32)?;
            }
            IsNonZero32 => {
                let v = self.pop_u32()?;
                self.push_u32((v != 0) as u32)?;
            }
            IsZero64 => {
                let v = self.pop_u64()?;
                self.push_u32((v == 0) as u32)?;
            }
            IsNonZero64 => {
                let v = self.pop_u64()?;
                self.push_u32((v != 0) as u32)?;
            }
            IsZeroF32 => {
                let v = self.pop_f32()?;
                self.push_u32((v == 0.0) as u32)?;
            }
            IsNonZeroF32 => {
                let v = self.pop_f32()?;
                self.push_u32((v != 0.0) as u32)?;
            }
            IsZeroF64 => {
                let v = self.pop_f64()?;
                self.push_u32((v == 0.0) as u32)?;
            }
            IsNonZeroF64 => {
                let v = self.pop_f64()?;
                self.push_u32((v != 0.0) as u32)?;
            }

            // --- concat ---
            Concat => {
                let rhs = self.pop_ref()?;
                let lhs = self.pop_ref()?;
                if !self.assembly.is_object(lhs) || !self.assembly.is_object(rhs) {
                    return Err(VmError::runtime("concat operand is not assignable to object"));
                }
                let lhs_str = self.constant_string(lhs)?;
                let rhs_str = self.constant_string(rhs)?;
                let index = self.assembly.add_constant_string(&format!("{lhs_str}{rhs_str}"));
                self.push_ref(index)?;
            }

            // --- arithmetic ---
            AddI32 => self.bin_i32(|a, b| a.wrapping_add(b))?,
            SubI32 => self.bin_i32(|a, b| a.wrapping_sub(b))?,
            MulI32 => self.bin_i32(|a, b| a.wrapping_mul(b))?,
            AddI64 => self.bin_i64(|a, b| a.wrapping_add(b))?,
            SubI64 => self.bin_i64(|a, b| a.wrapping_sub(b))?,
            MulI64 => self.bin_i64(|a, b| a.wrapping_mul(b))?,
            AddF32 => self.bin_f32(|a, b| a + b)?,
            SubF32 => self.bin_f32(|a, b| a - b)?,
            MulF32 => self.bin_f32(|a, b| a * b)?,
            AddF64 => self.bin_f64(|a, b| a + b)?,
            SubF64 => self.bin_f64(|a, b| a - b)?,
            MulF64 => self.bin_f64(|a, b| a * b)?,
            DivI32 => self.div_i32(false)?,
            RemI32 => self.div_i32(true)?,
            DivU32 => self.div_u32(false)?,
            RemU32 => self.div_u32(true)?,
            DivI64 => self.div_i64(false)?,
            RemI64 => self.div_i64(true)?,
            DivU64 => self.div_u64(false)?,
            RemU64 => self.div_u64(true)?,
            DivF32 => self.bin_f32(|a, b| a / b)?,
            RemF32 => self.bin_f32(|a, b| a % b)?,
            DivF64 => self.bin_f64(|a, b| a / b)?,
            RemF64 => self.bin_f64(|a, b| a % b)?,

            // --- width conversions ---
            ExtendI32 => {
                let v = self.pop_i32()?;
                self.push_i64(v as i64)?;
            }
            ExtendU32 => {
                let v = self.pop_u32()?;
                self.push_u64(v as u64)?;
            }
            WrapI64 => {
                let v = self.pop_i64()?;
                self.push_i32(v as i32)?;
            }
            PromoteF32 => {
                let v = self.pop_f32()?;
                self.push_f64(v as f64)?;
            }
            DemoteF64 => {
                let v = self.pop_f64()?;
                self.push_f32(v as f32)?;
            }
            ConvertI32F32 => {
                let v = self.pop_i32()?;
                self.push_f32(v as f32)?;
            }
            ConvertI32F64 => {
                let v = self.pop_i32()?;
                self.push_f64(v as f64)?;
            }
            ConvertU32F32 => {
                let v = self.pop_u32()?;
                self.push_f32(v as f32)?;
            }
            ConvertU32F64 => {
                let v = self.pop_u32()?;
                self.push_f64(v as f64)?;
            }
            ConvertI64F32 => {
                let v = self.pop_i64()?;
                self.push_f32(v as f32)?;
            }
            ConvertI64F64 => {
                let v = self.pop_i64()?;
                self.push_f64(v as f64)?;
            }
            ConvertU64F32 => {
                let v = self.pop_u64()?;
                self.push_f32(v as f32)?;
            }
            ConvertU64F64 => {
                let v = self.pop_u64()?;
                self.push_f64(v as f64)?;
            }
            TruncF32I32 => {
                let v = self.pop_f32()?;
                self.push_i32(v.trunc() as i32)?;
            }
            TruncF32U32 => {
                let v = self.pop_f32()?;
                self.push_u32(v.trunc() as u32)?;
            }
            TruncF32I64 => {
                let v = self.pop_f32()?;
                self.push_i64(v.trunc() as i64)?;
            }
            TruncF32U64 => {
                let v = self.pop_f32()?;
                self.push_u64(v.trunc() as u64)?;
            }
            TruncF64I32 => {
                let v = self.pop_f64()?;
                self.push_i32(v.trunc() as i32)?;
            }
            TruncF64U32 => {
                let v = self.pop_f64()?;
                self.push_u32(v.trunc() as u32)?;
            }
            TruncF64I64 => {
                let v = self.pop_f64()?;
                self.push_i64(v.trunc() as i64)?;
            }
            TruncF64U64 => {
                let v = self.pop_f64()?;
                self.push_u64(v.trunc() as u64)?;
            }

            // --- string conversions ---
            ConvertI32Str => {
                let r = self.pop_ref()?;
                let s = self.constant_string(r)?;
                self.push_i32(parse_i32_saturating(&s))?;
            }
            ConvertU32Str => {
                let r = self.pop_ref()?;
                let s = self.constant_string(r)?;
                self.push_u32(parse_u32_saturating(&s))?;
            }
            ConvertI64Str => {
                let r = self.pop_ref()?;
                let s = self.constant_string(r)?;
                self.push_i64(parse_i64_saturating(&s))?;
            }
            ConvertU64Str => {
                let r = self.pop_ref()?;
                let s = self.constant_string(r)?;
                self.push_u64(parse_u64_saturating(&s))?;
            }
            ConvertF32Str => {
                let r = self.pop_ref()?;
                let s = self.constant_string(r)?;
                self.push_f32(parse_f32_lossy(&s))?;
            }
            ConvertF64Str => {
                let r = self.pop_ref()?;
                let s = self.constant_string(r)?;
                self.push_f64(parse_f64_lossy(&s))?;
            }
            ConvertStrI32 => {
                let v = self.pop_i32()?;
                let idx = self.assembly.add_constant_string(&v.to_string());
                self.push_ref(idx)?;
            }
            ConvertStrU32 => {
                let v = self.pop_u32()?;
                let idx = self.assembly.add_constant_string(&v.to_string());
                self.push_ref(idx)?;
            }
            ConvertStrI64 => {
                let v = self.pop_i64()?;
                let idx = self.assembly.add_constant_string(&v.to_string());
                self.push_ref(idx)?;
            }
            ConvertStrU64 => {
                let v = self.pop_u64()?;
                let idx = self.assembly.add_constant_string(&v.to_string());
                self.push_ref(idx)?;
            }
            ConvertStrF32 => {
                let v = self.pop_f32()?;
                let idx = self.assembly.add_constant_string(&v.to_string());
                self.push_ref(idx)?;
            }
            ConvertStrF64 => {
                let v = self.pop_f64()?;
                let idx = self.assembly.add_constant_string(&v.to_string());
                self.push_ref(idx)?;
            }

            // --- float helpers ---
            MinF32 => self.bin_f32(f32::min)?,
            MaxF32 => self.bin_f32(f32::max)?,
            MinF64 => self.bin_f64(f64::min)?,
            MaxF64 => self.bin_f64(f64::max)?,
            CopysignF32 => self.bin_f32(f32::copysign)?,
            CopysignF64 => self.bin_f64(f64::copysign)?,
            NearestF32 => {
                let v = self.pop_f32()?;
                self.push_f32(v.round_ties_even())?;
            }
            NearestF64 => {
                let v = self.pop_f64()?;
                self.push_f64(v.round_ties_even())?;
            }
            CeilF32 => {
                let v = self.pop_f32()?;
                self.push_f32(v.ceil())?;
            }
            CeilF64 => {
                let v = self.pop_f64()?;
                self.push_f64(v.ceil())?;
            }
            FloorF32 => {
                let v = self.pop_f32()?;
                self.push_f32(v.floor())?;
            }
            FloorF64 => {
                let v = self.pop_f64()?;
                self.push_f64(v.floor())?;
            }
            TruncF32 => {
                let v = self.pop_f32()?;
                self.push_f32(v.trunc())?;
            }
            TruncF64 => {
                let v = self.pop_f64()?;
                self.push_f64(v.trunc())?;
            }
            AbsF32 => {
                let v = self.pop_f32()?;
                self.push_f32(v.abs())?;
            }
            AbsF64 => {
                let v = self.pop_f64()?;
                self.push_f64(v.abs())?;
            }
            SqrtF32 => {
                let v = self.pop_f32()?;
                self.push_f32(v.sqrt())?;
            }
            SqrtF64 => {
                let v = self.pop_f64()?;
                self.push_f64(v.sqrt())?;
            }

            // --- bitwise ---
            And32 => self.bin_u32(|a, b| a & b)?,
            Or32 => self.bin_u32(|a, b| a | b)?,
            Xor32 => self.bin_u32(|a, b| a ^ b)?,
            And64 => self.bin_u64(|a, b| a & b)?,
            Or64 => self.bin_u64(|a, b| a | b)?,
            Xor64 => self.bin_u64(|a, b| a ^ b)?,
            Shl32 => self.bin_u32(|a, b| a.wrapping_shl(b))?,
            ShrLogical32 => self.bin_u32(|a, b| a.wrapping_shr(b))?,
            ShrArithmetic32 => self.bin_i32(|a, b| a.wrapping_shr(b as u32))?,
            Rol32 => self.bin_u32(|a, b| a.rotate_left(b))?,
            Ror32 => self.bin_u32(|a, b| a.rotate_right(b))?,
            Shl64 => self.bin_u64_shift(|a, b| a.wrapping_shl(b))?,
            ShrLogical64 => self.bin_u64_shift(|a, b| a.wrapping_shr(b))?,
            ShrArithmetic64 => {
                let b = self.pop_u32()?;
                let a = self.pop_i64()?;
                self.push_i64(a.wrapping_shr(b))?;
            }
            Rol64 => self.bin_u64_shift(|a, b| a.rotate_left(b))?,
            Ror64 => self.bin_u64_shift(|a, b| a.rotate_right(b))?,
            Clz32 => {
                let v = self.pop_u32()?;
                self.push_u32(v.leading_zeros())?;
            }
            Ctz32 => {
                let v = self.pop_u32()?;
                self.push_u32(v.trailing_zeros())?;
            }
            Popcnt32 => {
                let v = self.pop_u32()?;
                self.push_u32(v.count_ones())?;
            }
            Clz64 => {
                let v = self.pop_u64()?;
                self.push_u64(v.leading_zeros() as u64)?;
            }
            Ctz64 => {
                let v = self.pop_u64()?;
                self.push_u64(v.trailing_zeros() as u64)?;
            }
            Popcnt64 => {
                let v = self.pop_u64()?;
                self.push_u64(v.count_ones() as u64)?;
            }

            // --- pop ---
            Pop => {
                let n = self.read_varint_operand()? as usize;
                self.pop_bytes(n * 4)?;
            }
            Pop32 => {
                self.pop_bytes(4)?;
            }
            Pop64 => {
                self.pop_bytes(8)?;
            }

            // --- call / return ---
            Call => self.exec_call()?,
            Return => self.exec_return()?,
        }
        Ok(())
    }

    fn constant_string(&self, reference: u64) -> Result<String> {
        self.assembly
            .display_constant(reference)
            .ok_or_else(|| VmError::runtime("operand is not a constant object"))
    }

    fn cmp_i32(&mut self, f: impl Fn(i32, i32) -> bool) -> Result<()> {
        let b = self.pop_i32()?;
        let a = self.pop_i32()?;
        self.push_u32(f(a, b) as u32)
    }
    fn cmp_u32(&mut self, f: impl Fn(u32, u32) -> bool) -> Result<()> {
        let b = self.pop_u32()?;
        let a = self.pop_u32()?;
        self.push_u32(f(a, b) as u32)
    }
    fn cmp_i64(&mut self, f: impl Fn(i64, i64) -> bool) -> Result<()> {
        let b = self.pop_i64()?;
        let a = self.pop_i64()?;
        self.push_u32(f(a, b) as u32)
    }
    fn cmp_u64(&mut self, f: impl Fn(u64, u64) -> bool) -> Result<()> {
        let b = self.pop_u64()?;
        let a = self.pop_u64()?;
        self.push_u32(f(a, b) as u32)
    }
    fn cmp_f32(&mut self, f: impl Fn(f32, f32) -> bool) -> Result<()> {
        let b = self.pop_f32()?;
        let a = self.pop_f32()?;
        self.push_u32(f(a, b) as u32)
    }
    fn cmp_f64(&mut self, f: impl Fn(f64, f64) -> bool) -> Result<()> {
        let b = self.pop_f64()?;
        let a = self.pop_f64()?;
        self.push_u32(f(a, b) as u32)
    }

    fn bin_i32(&mut self, f: impl Fn(i32, i32) -> i32) -> Result<()> {
        let b = self.pop_i32()?;
        let a = self.pop_i32()?;
        self.push_i32(f(a, b))
    }
    fn bin_u32(&mut self, f: impl Fn(u32, u32) -> u32) -> Result<()> {
        let b = self.pop_u32()?;
        let a = self.pop_u32()?;
        self.push_u32(f(a, b))
    }
    fn bin_i64(&mut self, f: impl Fn(i64, i64) -> i64) -> Result<()> {
        let b = self.pop_i64()?;
        let a = self.pop_i64()?;
        self.push_i64(f(a, b))
    }
    fn bin_u64(&mut self, f: impl Fn(u64, u64) -> u64) -> Result<()> {
        let b = self.pop_u64()?;
        let a = self.pop_u64()?;
        self.push_u64(f(a, b))
    }
    /// Shift/rotate variants pop a 32-bit count and a 64-bit value.
    fn bin_u64_shift(&mut self, f: impl Fn(u64, u32) -> u64) -> Result<()> {
        let b = self.pop_u32()?;
        let a = self.pop_u64()?;
        self.push_u64(f(a, b))
    }
    fn bin_f32(&mut self, f: impl Fn(f32, f32) -> f32) -> Result<()> {
        let b = self.pop_f32()?;
        let a = self.pop_f32()?;
        self.push_f32(f(a, b))
    }
    fn bin_f64(&mut self, f: impl Fn(f64, f64) -> f64) -> Result<()> {
        let b = self.pop_f64()?;
        let a = self.pop_f64()?;
        self.push_f64(f(a, b))
    }

    fn div_i32(&mut self, rem: bool) -> Result<()> {
        let b = self.pop_i32()?;
        let a = self.pop_i32()?;
        if b == 0 {
            return Err(VmError::runtime("integer division by zero"));
        }
        self.push_i32(if rem { a.wrapping_rem(b) } else { a.wrapping_div(b) })
    }
    fn div_u32(&mut self, rem: bool) -> Result<()> {
        let b = self.pop_u32()?;
        let a = self.pop_u32()?;
        if b == 0 {
            return Err(VmError::runtime("integer division by zero"));
        }
        self.push_u32(if rem { a % b } else { a / b })
    }
    fn div_i64(&mut self, rem: bool) -> Result<()> {
        let b = self.pop_i64()?;
        let a = self.pop_i64()?;
        if b == 0 {
            return Err(VmError::runtime("integer division by zero"));
        }
        self.push_i64(if rem { a.wrapping_rem(b) } else { a.wrapping_div(b) })
    }
    fn div_u64(&mut self, rem: bool) -> Result<()> {
        let b = self.pop_u64()?;
        let a = self.pop_u64()?;
        if b == 0 {
            return Err(VmError::runtime("integer division by zero"));
        }
        self.push_u64(if rem { a % b } else { a / b })
    }

    fn exec_call(&mut self) -> Result<()> {
        let reference = self.pop_ref()?;
        let delegate_id = match self.assembly.get_constant_object(reference) {
            Some(ConstantObject::Delegate(id)) => *id,
            _ => return Err(VmError::runtime("call target is not a delegate reference")),
        };
        let delegate = self.assembly.delegate(delegate_id).clone();
        match delegate.body {
            DelegateBody::Bytecode { module, address } => {
                if self.call_stack.len() >= CALL_STACK_CAPACITY {
                    return Err(VmError::CallStackOverflow {
                        capacity: CALL_STACK_CAPACITY,
                    });
                }
                self.call_stack.push(CallFrame {
                    module: self.module,
                    pc: self.pc,
                });
                self.module = Some(module);
                self.pc = address;
            }
            DelegateBody::Native(func) => {
                let delegate_type = self.assembly.delegate_type(delegate.delegate_type).clone();
                let param_bytes: usize = delegate_type.params.iter().map(|p| p.ty.stack_size()).sum();
                let ret_bytes = delegate_type.return_type.map(|t| t.stack_size()).unwrap_or(0);
                let predicted = self.value_stack.len() as i64 - param_bytes as i64 + ret_bytes as i64;
                let ok = func(self, &delegate_type)?;
                let delta = self.value_stack.len() as i64 - predicted;
                if delta < 0 {
                    self.pop_bytes((-delta) as usize)?;
                } else if delta > 0 {
                    return Err(VmError::runtime(
                        "native delegate delivered a larger stack than expected",
                    ));
                }
                if !ok {
                    return Err(VmError::runtime("native delegate reported failure"));
                }
            }
        }
        Ok(())
    }

    fn exec_return(&mut self) -> Result<()> {
        match self.call_stack.pop() {
            Some(frame) => {
                self.module = frame.module;
                self.pc = frame.pc;
            }
            None => {
                self.module = None;
                self.pc = PC_HALT;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{BytecodeModule, SymbolFlags};
    use crate::delegate::{Delegate, DelegateType, Param, VmType};
    use nt_core::Interner;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn build_module(name: &str, body: impl FnOnce(&mut BytecodeModule)) -> (Interner, BytecodeModule) {
        let mut interner = Interner::new();
        let mut module = BytecodeModule::new(interner.intern(name));
        body(&mut module);
        (interner, module)
    }

    #[test]
    fn arithmetic_then_return() {
        // const_32(1) ; const_32(1) ; add_i32 ; return -> stack holds 2
        let (mut interner, mut module) = build_module("m", |m| {
            let off = m.add_constant_32(1);
            m.write(Opcode::Const32.to_byte(), 1);
            m.write_varint(off as i64, 1);
            m.write(Opcode::Const32.to_byte(), 1);
            m.write_varint(off as i64, 1);
            m.write(Opcode::AddI32.to_byte(), 1);
            m.write(Opcode::Return.to_byte(), 1);
        });
        let name = interner.intern("main");
        module.define_strong(name, SymbolFlags::FUNCTION | SymbolFlags::PUBLIC, 0);

        let mut asm = Assembly::new(interner.intern("asm"));
        let module_id = asm.add_module(module);
        let mut vm = Interpreter::new(asm, module_id, 0);
        vm.run().unwrap();
        assert_eq!(vm.stack_len(), 4);
        assert_eq!(vm.pop_i32().unwrap(), 2);
    }

    #[test]
    fn signed_division_truncates_toward_zero() {
        let (mut interner, mut module) = build_module("m", |m| {
            let seven = m.add_constant_32((-7i32) as u32);
            let two = m.add_constant_32(2);
            m.write(Opcode::Const32.to_byte(), 1);
            m.write_varint(seven as i64, 1);
            m.write(Opcode::Const32.to_byte(), 1);
            m.write_varint(two as i64, 1);
            m.write(Opcode::DivI32.to_byte(), 1);
            m.write(Opcode::Return.to_byte(), 1);
        });
        let mut asm = Assembly::new(interner.intern("asm"));
        let module_id = asm.add_module(module);
        let mut vm = Interpreter::new(asm, module_id, 0);
        vm.run().unwrap();
        assert_eq!(vm.pop_i32().unwrap(), -3);
    }

    #[test]
    fn unsigned_division_wraps_as_unsigned() {
        let (mut interner, mut module) = build_module("m", |m| {
            let lhs = m.add_constant_32(0xFFFF_FFF0);
            let rhs = m.add_constant_32(2);
            m.write(Opcode::Const32.to_byte(), 1);
            m.write_varint(lhs as i64, 1);
            m.write(Opcode::Const32.to_byte(), 1);
            m.write_varint(rhs as i64, 1);
            m.write(Opcode::RemU32.to_byte(), 1);
            m.write(Opcode::Return.to_byte(), 1);
        });
        let mut asm = Assembly::new(interner.intern("asm"));
        let module_id = asm.add_module(module);
        let mut vm = Interpreter::new(asm, module_id, 0);
        vm.run().unwrap();
        assert_eq!(vm.pop_u32().unwrap(), 0);
    }

    #[test]
    fn unconditional_branch_skips_dead_code() {
        // branch over a `zero_32` to a `one_32; return`
        let (mut interner, mut module) = build_module("m", |m| {
            // layout: [branch offset][zero_32][one_32][return]
            // branch instruction occupies 1 opcode byte + varint; skip the
            // zero_32 (1 byte) by branching straight to one_32.
            let branch_pos = m.write(Opcode::Branch.to_byte(), 1);
            // offset computed so target = pc_after_varint + offset - 1 == one_32's position.
            // pc_after_varint = branch_pos + 1(opcode) + varint_len; one_32 sits right after zero_32 (1 byte).
            let varint_len = nt_core::ByteBuffer::varint_encoded_size(2);
            let pc_after_varint = branch_pos + 1 + varint_len;
            let one_pos = pc_after_varint + 1; // skip the single zero_32 byte
            let offset = (one_pos as i64) - (pc_after_varint as i64) + 1;
            m.write_varint(offset, 1);
            m.write(Opcode::Zero32.to_byte(), 1);
            m.write(Opcode::One32.to_byte(), 1);
            m.write(Opcode::Return.to_byte(), 1);
        });
        let mut asm = Assembly::new(interner.intern("asm"));
        let module_id = asm.add_module(module);
        let mut vm = Interpreter::new(asm, module_id, 0);
        vm.run().unwrap();
        assert_eq!(vm.pop_u32().unwrap(), 1);
    }

    #[test]
    fn native_call_leaves_predicted_stack_height() {
        let sink = Rc::new(RefCell::new(Vec::new()));
        let sink_clone = sink.clone();

        let mut interner = Interner::new();
        let mut asm = Assembly::new(interner.intern("asm"));

        let delegate_type = asm.take_delegate_type(
            None,
            vec![Param {
                name: asm.intern_string("x"),
                ty: VmType::I32,
            }],
        );
        let native: crate::delegate::NativeFn = Rc::new(move |vm: &mut Interpreter, _ty: &DelegateType| {
            let v = vm.pop_i32()?;
            sink_clone.borrow_mut().push(v);
            Ok(true)
        });
        let delegate = Delegate {
            name: asm.intern_string("sink"),
            delegate_type,
            body: DelegateBody::Native(native),
        };
        let delegate_id = asm.add_delegate(delegate);
        let const_index = asm.add_constant_object(ConstantObject::Delegate(delegate_id));

        let mut module = BytecodeModule::new(interner.intern("m"));
        let one_off = module.add_constant_32(1);
        module.write(Opcode::Const32.to_byte(), 1);
        module.write_varint(one_off as i64, 1);
        module.write(Opcode::ConstObject.to_byte(), 1);
        module.write_varint(const_index as i64, 1);
        module.write(Opcode::Call.to_byte(), 1);
        module.write(Opcode::Return.to_byte(), 1);
        let module_id = asm.add_module(module);

        let mut vm = Interpreter::new(asm, module_id, 0);
        let before = vm.stack_len();
        vm.run().unwrap();
        assert_eq!(vm.stack_len(), before);
        assert_eq!(*sink.borrow(), vec![1]);
    }
}
