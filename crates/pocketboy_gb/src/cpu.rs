pub mod opcodes;
pub mod regs;


pub use regs::{Flag, RegisterPair, Registers};

use crate::debug::{CpuSnapshot, PairSnapshot, RegisterSnapshot};
use crate::mmu::Mmu;
use opcodes::{Instruction, OpcodeTables, EXTENDED_PREFIX};

/// Result of looking up the byte(s) at PC in the opcode tables.
#[derive(Copy, Clone)]
pub enum Decoded {
    /// A table entry was found. `prefixed` is true when it came from the
    /// 0xCB-prefixed extended table.
    Instruction { inst: Instruction, prefixed: bool },
    /// No table entry for this byte. Executing it is a no-op; the opcode
    /// byte is carried for reporting.
    Unknown(u8),
}

/// Post-adjustment applied to a register pair after an indirect access
/// through its address.
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum PostAdjust {
    None,
    Increment,
    Decrement,
}

/// Store `value` at the address held in `pair`, then adjust the pair.
pub(crate) fn store_indirect(mmu: &mut Mmu, pair: &mut RegisterPair, value: u8, post: PostAdjust) {
    mmu.write_byte(pair.word(), value);
    match post {
        PostAdjust::None => {}
        PostAdjust::Increment => pair.set_word(pair.word().wrapping_add(1)),
        PostAdjust::Decrement => pair.set_word(pair.word().wrapping_sub(1)),
    }
}

/// The LR35902 execution engine.
///
/// Owns the register file, the stack pointer, the program counter, the
/// memory unit and the opcode tables injected at construction. Stepping is
/// split into `decode` and `execute` so a driver can publish debugger
/// events between the two phases without holding a borrow on the CPU;
/// `step` runs both back to back.
pub struct Cpu {
    pub regs: Registers,
    pub sp: u16,
    pub pc: u16,
    pub mmu: Mmu,
    cycles: u64,
    tables: OpcodeTables,
}

impl Cpu {
    pub fn new(mmu: Mmu) -> Self {
        Self::with_tables(mmu, OpcodeTables::new())
    }

    pub fn with_tables(mmu: Mmu, tables: OpcodeTables) -> Self {
        Self {
            regs: Registers::default(),
            sp: 0,
            pc: 0,
            mmu,
            cycles: 0,
            tables,
        }
    }

    /// Total T-cycles consumed by executed instructions.
    pub fn cycle_count(&self) -> u64 {
        self.cycles
    }

    /// Restart execution from address 0, where a boot image lives.
    pub fn reset_to_boot(&mut self) {
        self.pc = 0;
    }

    /// Look up the opcode at PC without changing any state.
    ///
    /// A 0xCB byte selects the extended table using the byte after the
    /// prefix. Nothing is committed here: if the lookup misses, PC still
    /// points at the first opcode byte.
    pub fn decode(&self) -> Decoded {
        let opcode = self.mmu.read_byte(self.pc);
        if opcode == EXTENDED_PREFIX {
            let extended = self.mmu.read_byte(self.pc.wrapping_add(1));
            match self.tables.extended.get(extended) {
                Some(inst) => Decoded::Instruction {
                    inst: *inst,
                    prefixed: true,
                },
                None => Decoded::Unknown(extended),
            }
        } else {
            match self.tables.base.get(opcode) {
                Some(inst) => Decoded::Instruction {
                    inst: *inst,
                    prefixed: false,
                },
                None => Decoded::Unknown(opcode),
            }
        }
    }

    /// Run a decoded instruction and advance PC and the cycle counter.
    ///
    /// Returns the T-cycles charged. For `prefixed` instructions PC is
    /// moved past the 0xCB byte first, so operand reads inside the action
    /// stay relative to the instruction's own opcode byte.
    pub fn execute(&mut self, inst: &Instruction, prefixed: bool) -> u32 {
        if prefixed {
            self.pc = self.pc.wrapping_add(1);
        }
        (inst.action)(self);
        if !inst.manages_pc {
            self.pc = self.pc.wrapping_add(inst.length);
        }
        self.cycles = self.cycles.wrapping_add(inst.cycles as u64);
        inst.cycles
    }

    /// Decode and execute one instruction.
    ///
    /// Returns the T-cycles consumed, or 0 when the opcode has no table
    /// entry; in that case nothing changes and the CPU will stall at the
    /// same PC on the next step.
    pub fn step(&mut self) -> u32 {
        match self.decode() {
            Decoded::Instruction { inst, prefixed } => self.execute(&inst, prefixed),
            Decoded::Unknown(_) => 0,
        }
    }

    /// Copy of the register file, SP and PC for debugger consumption.
    pub fn snapshot(&self) -> CpuSnapshot {
        CpuSnapshot {
            stack_pointer: self.sp,
            program_counter: self.pc,
            registers: RegisterSnapshot {
                a: self.regs.af.hi,
                f: self.regs.af.lo,
                b: self.regs.bc.hi,
                c: self.regs.bc.lo,
                d: self.regs.de.hi,
                e: self.regs.de.lo,
                h: self.regs.hl.hi,
                l: self.regs.hl.lo,
            },
            register_pairs: PairSnapshot {
                af: self.regs.af.word(),
                bc: self.regs.bc.word(),
                de: self.regs.de.word(),
                hl: self.regs.hl.word(),
            },
            flags: self.regs.flag_string(),
        }
    }

    /// The byte right after the opcode at PC.
    fn operand_byte(&self) -> u8 {
        self.mmu.read_byte(self.pc.wrapping_add(1))
    }

    /// The little-endian word right after the opcode at PC.
    fn operand_word(&self) -> u16 {
        self.mmu.read_word(self.pc.wrapping_add(1))
    }

    /// Increment an 8-bit value. Sets Z and H, clears N; C is untouched.
    fn alu_inc8(&mut self, value: u8) -> u8 {
        let result = value.wrapping_add(1);
        self.regs.set_flag(Flag::Z, result == 0);
        self.regs.set_flag(Flag::N, false);
        self.regs.set_flag(Flag::H, (value & 0x0F) + 1 > 0x0F);
        result
    }

    /// Decrement an 8-bit value. Sets Z, N and H (borrow from bit 4); C is
    /// untouched.
    fn alu_dec8(&mut self, value: u8) -> u8 {
        let result = value.wrapping_sub(1);
        self.regs.set_flag(Flag::Z, result == 0);
        self.regs.set_flag(Flag::N, true);
        self.regs.set_flag(Flag::H, value & 0x0F == 0);
        result
    }

    /// Exclusive-or of two bytes. Sets Z from the result, clears N, H
    /// and C.
    fn alu_xor8(&mut self, a: u8, b: u8) -> u8 {
        let result = a ^ b;
        self.regs.set_flag(Flag::Z, result == 0);
        self.regs.set_flag(Flag::N, false);
        self.regs.set_flag(Flag::H, false);
        self.regs.set_flag(Flag::C, false);
        result
    }

    /// Test `bit` of `value`. Z is set when the bit is clear, N is
    /// cleared, H is set; C is untouched.
    fn alu_bit(&mut self, value: u8, bit: u8) {
        self.regs.set_flag(Flag::Z, value & (1 << bit) == 0);
        self.regs.set_flag(Flag::N, false);
        self.regs.set_flag(Flag::H, true);
    }

    /// Rotate left through the carry flag: bit 7 moves into C, the old C
    /// moves into bit 0. Sets Z from the result, clears N and H.
    fn alu_rl8(&mut self, value: u8) -> u8 {
        let carry_in = self.regs.flag(Flag::C) as u8;
        let result = (value << 1) | carry_in;
        self.regs.set_flag(Flag::Z, result == 0);
        self.regs.set_flag(Flag::N, false);
        self.regs.set_flag(Flag::H, false);
        self.regs.set_flag(Flag::C, value & 0x80 != 0);
        result
    }

    /// Conditional relative jump. PC first moves past the two-byte
    /// instruction; when the condition holds, the signed `offset` is then
    /// added to that address.
    fn jump_relative(&mut self, offset: u8, condition: bool) {
        self.pc = self.pc.wrapping_add(2);
        if condition {
            self.pc = self.pc.wrapping_add(offset as i8 as u16);
        }
    }

    /// Call `target`: push the address of the next instruction (PC + 3)
    /// and jump.
    fn call(&mut self, target: u16) {
        let return_addr = self.pc.wrapping_add(3);
        self.push_word(return_addr);
        self.pc = target;
    }

    /// Return: pop the word at SP into PC.
    fn ret(&mut self) {
        self.pc = self.pop_word();
    }

    fn push_byte(&mut self, value: u8) {
        self.sp = self.sp.wrapping_sub(1);
        self.mmu.write_byte(self.sp, value);
    }

    /// Push a word: high byte first, so the low byte ends up at the lower
    /// address and `read_word(sp)` recovers the value.
    fn push_word(&mut self, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        self.push_byte(hi);
        self.push_byte(lo);
    }

    fn pop_word(&mut self) -> u16 {
        let value = self.mmu.read_word(self.sp);
        self.sp = self.sp.wrapping_add(2);
        value
    }
}
