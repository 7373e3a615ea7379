use super::regs::Flag;
use super::{store_indirect, Cpu, PostAdjust};

/// Opcode byte that selects the extended instruction table.
pub const EXTENDED_PREFIX: u8 = 0xCB;

/// An instruction body. Non-capturing closures coerce to this, so table
/// entries read like the instruction they implement.
pub type Action = fn(&mut Cpu);

/// One instruction descriptor.
///
/// `length` counts the opcode byte plus every operand byte the action
/// reads relative to PC. Extended instructions do not count the 0xCB
/// prefix; the fetch step accounts for it. Instructions with `manages_pc`
/// set (jumps, calls, returns) move PC themselves and skip the automatic
/// advance.
#[derive(Copy, Clone)]
pub struct Instruction {
    pub opcode: u8,
    pub mnemonic: &'static str,
    pub cycles: u32,
    pub length: u16,
    pub manages_pc: bool,
    pub action: Action,
}

impl Instruction {
    const fn new(opcode: u8, mnemonic: &'static str, cycles: u32, length: u16, action: Action) -> Self {
        Self {
            opcode,
            mnemonic,
            cycles,
            length,
            manages_pc: false,
            action,
        }
    }

    /// Descriptor for an instruction whose action sets PC itself.
    const fn branch(opcode: u8, mnemonic: &'static str, cycles: u32, length: u16, action: Action) -> Self {
        Self {
            opcode,
            mnemonic,
            cycles,
            length,
            manages_pc: true,
            action,
        }
    }
}

/// Immutable opcode-to-descriptor mapping.
pub struct OpcodeTable {
    entries: [Option<Instruction>; 256],
}

impl OpcodeTable {
    /// Build a table from a descriptor list. Panics when two descriptors
    /// claim the same opcode; tables are built once at startup.
    fn new(name: &str, instructions: &[Instruction]) -> Self {
        let mut entries = [None; 256];
        for &inst in instructions {
            let slot = &mut entries[inst.opcode as usize];
            assert!(
                slot.is_none(),
                "duplicate opcode 0x{:02X} in the {} table",
                inst.opcode,
                name
            );
            *slot = Some(inst);
        }
        Self { entries }
    }

    pub fn get(&self, opcode: u8) -> Option<&Instruction> {
        self.entries[opcode as usize].as_ref()
    }
}

/// The base table and the 0xCB-prefixed extended table, injected into the
/// CPU at construction.
pub struct OpcodeTables {
    pub base: OpcodeTable,
    pub extended: OpcodeTable,
}

impl Default for OpcodeTables {
    fn default() -> Self {
        Self::new()
    }
}

impl OpcodeTables {
    pub fn new() -> Self {
        Self {
            base: OpcodeTable::new("base", &base_instructions()),
            extended: OpcodeTable::new("extended", &extended_instructions()),
        }
    }
}

fn base_instructions() -> Vec<Instruction> {
    vec![
        Instruction::new(0x00, "NOP", 4, 1, |_| {}),
        Instruction::new(0x01, "LD BC,d16", 12, 3, |c| {
            let value = c.operand_word();
            c.regs.bc.set_word(value);
        }),
        Instruction::new(0x05, "DEC B", 4, 1, |c| {
            c.regs.bc.hi = c.alu_dec8(c.regs.bc.hi);
        }),
        Instruction::new(0x06, "LD B,d8", 8, 2, |c| {
            c.regs.bc.hi = c.operand_byte();
        }),
        Instruction::new(0x0C, "INC C", 4, 1, |c| {
            c.regs.bc.lo = c.alu_inc8(c.regs.bc.lo);
        }),
        Instruction::new(0x0E, "LD C,d8", 8, 2, |c| {
            c.regs.bc.lo = c.operand_byte();
        }),
        Instruction::new(0x11, "LD DE,d16", 12, 3, |c| {
            let value = c.operand_word();
            c.regs.de.set_word(value);
        }),
        Instruction::new(0x13, "INC DE", 8, 1, |c| {
            let value = c.regs.de.word().wrapping_add(1);
            c.regs.de.set_word(value);
        }),
        Instruction::new(0x1A, "LD A,(DE)", 8, 1, |c| {
            c.regs.af.hi = c.mmu.read_byte(c.regs.de.word());
        }),
        Instruction::branch(0x20, "JR NZ,r8", 8, 2, |c| {
            let offset = c.operand_byte();
            let condition = !c.regs.flag(Flag::Z);
            c.jump_relative(offset, condition);
        }),
        Instruction::new(0x21, "LD HL,d16", 12, 3, |c| {
            let value = c.operand_word();
            c.regs.hl.set_word(value);
        }),
        Instruction::new(0x22, "LD (HL+),A", 8, 1, |c| {
            let value = c.regs.af.hi;
            store_indirect(&mut c.mmu, &mut c.regs.hl, value, PostAdjust::Increment);
        }),
        Instruction::new(0x23, "INC HL", 8, 1, |c| {
            let value = c.regs.hl.word().wrapping_add(1);
            c.regs.hl.set_word(value);
        }),
        Instruction::new(0x31, "LD SP,d16", 12, 3, |c| {
            c.sp = c.operand_word();
        }),
        Instruction::new(0x32, "LD (HL-),A", 8, 1, |c| {
            let value = c.regs.af.hi;
            store_indirect(&mut c.mmu, &mut c.regs.hl, value, PostAdjust::Decrement);
        }),
        Instruction::new(0x3E, "LD A,d8", 8, 2, |c| {
            c.regs.af.hi = c.operand_byte();
        }),
        Instruction::new(0x4F, "LD C,A", 4, 1, |c| {
            c.regs.bc.lo = c.regs.af.hi;
        }),
        Instruction::new(0x77, "LD (HL),A", 8, 1, |c| {
            let value = c.regs.af.hi;
            store_indirect(&mut c.mmu, &mut c.regs.hl, value, PostAdjust::None);
        }),
        Instruction::new(0xAF, "XOR A", 4, 1, |c| {
            c.regs.af.hi = c.alu_xor8(c.regs.af.hi, c.regs.af.hi);
        }),
        Instruction::new(0xC1, "POP BC", 12, 1, |c| {
            let value = c.pop_word();
            c.regs.bc.set_word(value);
        }),
        Instruction::new(0xC5, "PUSH BC", 16, 1, |c| {
            let value = c.regs.bc.word();
            c.push_word(value);
        }),
        Instruction::branch(0xC9, "RET", 16, 1, |c| {
            c.ret();
        }),
        Instruction::branch(0xCD, "CALL a16", 24, 3, |c| {
            let target = c.operand_word();
            c.call(target);
        }),
        Instruction::new(0xE0, "LDH (a8),A", 12, 2, |c| {
            let addr = 0xFF00u16.wrapping_add(c.operand_byte() as u16);
            let value = c.regs.af.hi;
            c.mmu.write_byte(addr, value);
        }),
        Instruction::new(0xE2, "LD (C),A", 8, 1, |c| {
            let addr = 0xFF00u16.wrapping_add(c.regs.bc.lo as u16);
            let value = c.regs.af.hi;
            c.mmu.write_byte(addr, value);
        }),
    ]
}

fn extended_instructions() -> Vec<Instruction> {
    vec![
        Instruction::new(0x11, "RL C", 8, 1, |c| {
            c.regs.bc.lo = c.alu_rl8(c.regs.bc.lo);
        }),
        Instruction::new(0x7C, "BIT 7,H", 8, 1, |c| {
            c.alu_bit(c.regs.hl.hi, 7);
        }),
    ]
}
