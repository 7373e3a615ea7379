/// One 16-bit register pair made of two 8-bit sub-registers.
///
/// `hi` is the more significant byte of the composed word, `lo` the less
/// significant one. For BC, `hi` is B and `lo` is C.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RegisterPair {
    pub hi: u8,
    pub lo: u8,
}

impl RegisterPair {
    /// The pair read as one 16-bit word.
    pub fn word(&self) -> u16 {
        u16::from_be_bytes([self.hi, self.lo])
    }

    /// Store a 16-bit word across both sub-registers.
    pub fn set_word(&mut self, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        self.hi = hi;
        self.lo = lo;
    }
}

/// CPU flags, stored in the high nibble of F (the low byte of AF).
///
/// Bit positions follow the LR35902: Z (zero) in bit 7, N (subtract) in
/// bit 6, H (half-carry) in bit 5, C (carry) in bit 4. Bits 0-3 of F are
/// never set by any implemented instruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Flag {
    Z = 7,
    N = 6,
    H = 5,
    C = 4,
}

impl Flag {
    fn mask(self) -> u8 {
        1 << (self as u8)
    }
}

/// The LR35902 register file: four pairs AF, BC, DE and HL.
///
/// A is `af.hi`, F is `af.lo`, and so on for B/C, D/E, H/L.
#[derive(Copy, Clone, Debug, Default)]
pub struct Registers {
    pub af: RegisterPair,
    pub bc: RegisterPair,
    pub de: RegisterPair,
    pub hl: RegisterPair,
}

impl Registers {
    pub fn flag(&self, flag: Flag) -> bool {
        self.af.lo & flag.mask() != 0
    }

    pub fn set_flag(&mut self, flag: Flag, value: bool) {
        if value {
            self.af.lo |= flag.mask();
        } else {
            self.af.lo &= !flag.mask();
        }
    }

    /// Render the flags as a fixed-width "ZNHC" string, with `-` standing
    /// in for a clear flag. E.g. `Z--C`.
    pub fn flag_string(&self) -> String {
        let mut out = String::with_capacity(4);
        for (flag, letter) in [
            (Flag::Z, 'Z'),
            (Flag::N, 'N'),
            (Flag::H, 'H'),
            (Flag::C, 'C'),
        ] {
            out.push(if self.flag(flag) { letter } else { '-' });
        }
        out
    }
}
