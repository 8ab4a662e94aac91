//! This module holds the bytecode form of x16 instructions,
//! along with the codec that converts them to and from machine words.

use std::fmt::Write as _;

use crate::bits::{get_bit, get_bits};
use crate::sim::SimErr;

use super::{CondCode, IOffset, ImmOrReg, Reg, TrapVect8};

/// The 4-bit opcode field of an instruction word (bits 15 to 12).
///
/// Of the 16 values, [`Opcode::RTI`] and [`Opcode::RES`] are reserved
/// and cannot be executed.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
#[allow(missing_docs)]
pub enum Opcode {
    BR, ADD, LD, ST, JSR, AND, LDR, STR,
    RTI, NOT, LDI, STI, JMP, RES, LEA, TRAP
}

const OPCODES: [Opcode; 16] = [
    Opcode::BR,  Opcode::ADD, Opcode::LD,  Opcode::ST,
    Opcode::JSR, Opcode::AND, Opcode::LDR, Opcode::STR,
    Opcode::RTI, Opcode::NOT, Opcode::LDI, Opcode::STI,
    Opcode::JMP, Opcode::RES, Opcode::LEA, Opcode::TRAP,
];

impl Opcode {
    /// Reads the opcode out of the top 4 bits of an instruction word.
    pub fn of(word: u16) -> Opcode {
        OPCODES[usize::from(word >> 12)]
    }

    /// The 4-bit numeric value of this opcode.
    pub fn value(self) -> u16 {
        self as u16
    }

    /// Whether this opcode is one of the two reserved opcodes.
    pub fn is_reserved(self) -> bool {
        matches!(self, Opcode::RTI | Opcode::RES)
    }
}
impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?} (0x{:X})", self.value())
    }
}

/// An instruction that can be executed by the simulator.
///
/// Each variant holds the already-resolved operands of the instruction,
/// so it can be directly converted to and from a machine word
/// with [`SimInstr::encode`] and [`SimInstr::decode`].
///
/// `JSR` holds an [`ImmOrReg`]: the immediate form is `JSR` proper,
/// and the register form is `JSRR`.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
#[allow(missing_docs)]
pub enum SimInstr {
    BR(CondCode, IOffset<9>),
    ADD(Reg, Reg, ImmOrReg<5>),
    LD(Reg, IOffset<9>),
    ST(Reg, IOffset<9>),
    JSR(ImmOrReg<11>),
    AND(Reg, Reg, ImmOrReg<5>),
    LDR(Reg, Reg, IOffset<6>),
    STR(Reg, Reg, IOffset<6>),
    NOT(Reg, Reg),
    LDI(Reg, IOffset<9>),
    STI(Reg, IOffset<9>),
    JMP(Reg),
    LEA(Reg, IOffset<9>),
    TRAP(TrapVect8),
}

/// Trap vectors which have an assembler mnemonic.
pub(crate) const TRAP_NAMES: [(u16, &str); 6] = [
    (0x20, "getc"),
    (0x21, "putc"),
    (0x22, "puts"),
    (0x23, "enter"),
    (0x24, "putsp"),
    (0x25, "halt"),
];

impl SimInstr {
    /// Gets the opcode for the given instruction.
    pub fn opcode(&self) -> Opcode {
        match self {
            SimInstr::BR(_, _)     => Opcode::BR,
            SimInstr::ADD(_, _, _) => Opcode::ADD,
            SimInstr::LD(_, _)     => Opcode::LD,
            SimInstr::ST(_, _)     => Opcode::ST,
            SimInstr::JSR(_)       => Opcode::JSR,
            SimInstr::AND(_, _, _) => Opcode::AND,
            SimInstr::LDR(_, _, _) => Opcode::LDR,
            SimInstr::STR(_, _, _) => Opcode::STR,
            SimInstr::NOT(_, _)    => Opcode::NOT,
            SimInstr::LDI(_, _)    => Opcode::LDI,
            SimInstr::STI(_, _)    => Opcode::STI,
            SimInstr::JMP(_)       => Opcode::JMP,
            SimInstr::LEA(_, _)    => Opcode::LEA,
            SimInstr::TRAP(_)      => Opcode::TRAP,
        }
    }

    /// Encodes this instruction as a 16-bit machine word.
    ///
    /// ```
    /// # use x16::ast::{ImmOrReg, IOffset, reg_consts::{R1, R2}};
    /// # use x16::ast::sim::SimInstr;
    /// let instr = SimInstr::ADD(R1, R2, ImmOrReg::Imm(IOffset::new_trunc(-1)));
    /// assert_eq!(instr.encode(), 0b0001_001_010_1_11111);
    /// ```
    pub fn encode(&self) -> u16 {
        let op = self.opcode().value() << 12;
        let operands = match *self {
            SimInstr::BR(cc, off) => (u16::from(cc & 0b111) << 9) | off.to_field(),
            SimInstr::ADD(dr, sr1, sr2) | SimInstr::AND(dr, sr1, sr2) => {
                let head = (u16::from(dr) << 9) | (u16::from(sr1) << 6);
                match sr2 {
                    ImmOrReg::Imm(imm) => head | (1 << 5) | imm.to_field(),
                    ImmOrReg::Reg(r)   => head | u16::from(r),
                }
            },
            SimInstr::LD(r, off)
            | SimInstr::ST(r, off)
            | SimInstr::LDI(r, off)
            | SimInstr::STI(r, off)
            | SimInstr::LEA(r, off) => (u16::from(r) << 9) | off.to_field(),
            SimInstr::JSR(ImmOrReg::Imm(off)) => (1 << 11) | off.to_field(),
            SimInstr::JSR(ImmOrReg::Reg(br)) => u16::from(br) << 6,
            SimInstr::LDR(r, br, off) | SimInstr::STR(r, br, off) => {
                (u16::from(r) << 9) | (u16::from(br) << 6) | off.to_field()
            },
            SimInstr::NOT(dr, sr) => (u16::from(dr) << 9) | (u16::from(sr) << 6) | 0b11_1111,
            SimInstr::JMP(br) => u16::from(br) << 6,
            SimInstr::TRAP(vect) => vect.to_field(),
        };

        op | operands
    }

    /// Decodes a 16-bit machine word into an instruction.
    ///
    /// This fails with [`SimErr::IllegalOpcode`] for the reserved opcodes.
    /// Bits the instruction's layout does not use are ignored,
    /// so [`SimInstr::encode`] only gives back the same word if they held their fixed values
    /// (see [`SimInstr::is_canonical`]).
    pub fn decode(word: u16) -> Result<Self, SimErr> {
        let reg_hi = || Reg::from_field(word, 9);
        let reg_mid = || Reg::from_field(word, 6);
        let off9 = || IOffset::<9>::new_trunc(get_bits(word, 0, 9) as i16);

        let instr = match Opcode::of(word) {
            Opcode::BR => SimInstr::BR(get_bits(word, 9, 3) as CondCode, off9()),
            op @ (Opcode::ADD | Opcode::AND) => {
                let sr2 = match get_bit(word, 5) {
                    1 => ImmOrReg::Imm(IOffset::new_trunc(get_bits(word, 0, 5) as i16)),
                    _ => ImmOrReg::Reg(Reg::from_field(word, 0)),
                };
                match op {
                    Opcode::ADD => SimInstr::ADD(reg_hi(), reg_mid(), sr2),
                    _           => SimInstr::AND(reg_hi(), reg_mid(), sr2),
                }
            },
            Opcode::LD  => SimInstr::LD(reg_hi(), off9()),
            Opcode::ST  => SimInstr::ST(reg_hi(), off9()),
            Opcode::LDI => SimInstr::LDI(reg_hi(), off9()),
            Opcode::STI => SimInstr::STI(reg_hi(), off9()),
            Opcode::LEA => SimInstr::LEA(reg_hi(), off9()),
            Opcode::JSR => match get_bit(word, 11) {
                1 => SimInstr::JSR(ImmOrReg::Imm(IOffset::new_trunc(get_bits(word, 0, 11) as i16))),
                _ => SimInstr::JSR(ImmOrReg::Reg(reg_mid())),
            },
            Opcode::LDR => SimInstr::LDR(reg_hi(), reg_mid(), IOffset::new_trunc(get_bits(word, 0, 6) as i16)),
            Opcode::STR => SimInstr::STR(reg_hi(), reg_mid(), IOffset::new_trunc(get_bits(word, 0, 6) as i16)),
            Opcode::NOT  => SimInstr::NOT(reg_hi(), reg_mid()),
            Opcode::JMP  => SimInstr::JMP(reg_mid()),
            Opcode::TRAP => SimInstr::TRAP(TrapVect8::new_trunc(get_bits(word, 0, 8))),
            op @ (Opcode::RTI | Opcode::RES) => return Err(SimErr::IllegalOpcode(op)),
        };

        Ok(instr)
    }

    /// Whether `word` is exactly the encoding of the instruction it decodes to,
    /// with every unused bit in its fixed position.
    ///
    /// ```
    /// # use x16::ast::sim::SimInstr;
    /// assert!(SimInstr::is_canonical(0x1283));  // add %r1 %r2 %r3
    /// assert!(!SimInstr::is_canonical(0x1298)); // same, with bits 3-4 set
    /// assert!(!SimInstr::is_canonical(0x8000)); // reserved
    /// ```
    pub fn is_canonical(word: u16) -> bool {
        SimInstr::decode(word).is_ok_and(|instr| instr.encode() == word)
    }
}

impl std::fmt::Display for SimInstr {
    /// Renders the instruction in assembler syntax.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimInstr::BR(cc, off) => {
                let mut mnemonic = String::from("br");
                for (bit, c) in [(0b100, 'n'), (0b010, 'z'), (0b001, 'p')] {
                    if cc & bit != 0 {
                        mnemonic.push(c);
                    }
                }
                write!(f, "{mnemonic} {off}")
            },
            SimInstr::ADD(dr, sr1, sr2) => write!(f, "add {dr} {sr1} {sr2}"),
            SimInstr::AND(dr, sr1, sr2) => write!(f, "and {dr} {sr1} {sr2}"),
            SimInstr::LD(r, off)  => write!(f, "ld {r} {off}"),
            SimInstr::ST(r, off)  => write!(f, "st {r} {off}"),
            SimInstr::LDI(r, off) => write!(f, "ldi {r} {off}"),
            SimInstr::STI(r, off) => write!(f, "sti {r} {off}"),
            SimInstr::LEA(r, off) => write!(f, "lea {r} {off}"),
            SimInstr::JSR(ImmOrReg::Imm(off)) => write!(f, "jsr {off}"),
            SimInstr::JSR(ImmOrReg::Reg(br))  => write!(f, "jssr {br}"),
            SimInstr::LDR(r, br, off) => write!(f, "ldr {r} {br} ${off}"),
            SimInstr::STR(r, br, off) => write!(f, "str {r} {br} ${off}"),
            SimInstr::NOT(dr, sr) => write!(f, "not {dr} {sr}"),
            SimInstr::JMP(br) => write!(f, "jmp {br}"),
            SimInstr::TRAP(vect) => {
                match TRAP_NAMES.iter().find(|&&(v, _)| v == vect.get()) {
                    Some((_, name)) => f.write_str(name),
                    // no mnemonic, so render the raw word
                    None => write!(f, "val 0x{:x}", self.encode()),
                }
            },
        }
    }
}

/// Renders a block of words as a disassembly listing,
/// one `address: word  instruction` line per word.
///
/// Words that are not canonical instruction encodings are listed as `val` literals,
/// so every listed line assembles back to the same word.
/// Addresses wrap around past `xFFFF`.
pub fn disassemble(origin: u16, words: &[u16]) -> String {
    let mut out = String::new();
    for (i, &word) in words.iter().enumerate() {
        let addr = origin.wrapping_add(i as u16);
        let _ = match SimInstr::decode(word) {
            Ok(instr) if instr.encode() == word => writeln!(out, "x{addr:04X}: x{word:04X}  {instr}"),
            _ => writeln!(out, "x{addr:04X}: x{word:04X}  val 0x{word:x}"),
        };
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::ast::reg_consts::{R0, R1, R2, R3, R5, R6, R7};
    use crate::ast::{IOffset, ImmOrReg, TrapVect8};
    use crate::sim::SimErr;

    use super::{disassemble, Opcode, SimInstr};

    fn samples() -> Vec<SimInstr> {
        vec![
            SimInstr::BR(0b000, IOffset::new_trunc(-1)),
            SimInstr::BR(0b101, IOffset::new_trunc(255)),
            SimInstr::BR(0b111, IOffset::new_trunc(-256)),
            SimInstr::ADD(R1, R2, ImmOrReg::Reg(R3)),
            SimInstr::ADD(R1, R2, ImmOrReg::Imm(IOffset::new_trunc(-16))),
            SimInstr::AND(R0, R0, ImmOrReg::Imm(IOffset::new_trunc(0))),
            SimInstr::AND(R7, R6, ImmOrReg::Reg(R5)),
            SimInstr::LD(R2, IOffset::new_trunc(12)),
            SimInstr::ST(R3, IOffset::new_trunc(-12)),
            SimInstr::JSR(ImmOrReg::Imm(IOffset::new_trunc(-1024))),
            SimInstr::JSR(ImmOrReg::Imm(IOffset::new_trunc(1023))),
            SimInstr::JSR(ImmOrReg::Reg(R5)),
            SimInstr::LDR(R1, R6, IOffset::new_trunc(-32)),
            SimInstr::STR(R1, R6, IOffset::new_trunc(31)),
            SimInstr::NOT(R1, R7),
            SimInstr::LDI(R0, IOffset::new_trunc(3)),
            SimInstr::STI(R0, IOffset::new_trunc(-3)),
            SimInstr::JMP(R7),
            SimInstr::LEA(R5, IOffset::new_trunc(100)),
            SimInstr::TRAP(TrapVect8::new_trunc(0x25)),
        ]
    }

    #[test]
    fn test_encode_decode() {
        for instr in samples() {
            let word = instr.encode();
            assert_eq!(Opcode::of(word), instr.opcode());
            assert_eq!(SimInstr::decode(word).ok(), Some(instr), "{word:#06x}");
        }
    }

    #[test]
    fn test_decode_encode_all_words() {
        let mut canonical = 0;
        for word in 0..=u16::MAX {
            match SimInstr::decode(word) {
                Ok(instr) => {
                    // encoding clears unused bits, and the result decodes to the same instruction
                    let reencoded = instr.encode();
                    assert_eq!(SimInstr::decode(reencoded).ok(), Some(instr), "{word:#06x}");
                    assert_eq!(reencoded == word, SimInstr::is_canonical(word));
                    if reencoded == word { canonical += 1; }
                },
                Err(_) => assert!(Opcode::of(word).is_reserved(), "{word:#06x}"),
            }
        }
        // every word of a legal opcode decodes
        assert_eq!((0..=u16::MAX).filter(|&w| SimInstr::decode(w).is_ok()).count(), 14 << 12);
        assert!(canonical < 14 << 12);
    }

    #[test]
    fn test_known_words() {
        assert_eq!(SimInstr::ADD(R1, R2, ImmOrReg::Reg(R3)).encode(), 0x1283);
        assert_eq!(SimInstr::ADD(R1, R2, ImmOrReg::Imm(IOffset::new_trunc(-1))).encode(), 0x12BF);
        assert_eq!(SimInstr::NOT(R1, R2).encode(), 0x92BF);
        assert_eq!(SimInstr::JMP(R7).encode(), 0xC1C0);
        assert_eq!(SimInstr::TRAP(TrapVect8::new_trunc(0x25)).encode(), 0xF025);
        assert_eq!(SimInstr::JSR(ImmOrReg::Imm(IOffset::new_trunc(-1))).encode(), 0x4FFF);
        assert_eq!(SimInstr::BR(0, IOffset::new_trunc(-2)).encode(), 0x01FE);
    }

    #[test]
    fn test_decode_reserved() {
        assert!(matches!(SimInstr::decode(0x8000), Err(SimErr::IllegalOpcode(Opcode::RTI))));
        assert!(matches!(SimInstr::decode(0xD123), Err(SimErr::IllegalOpcode(Opcode::RES))));
    }

    #[test]
    fn test_decode_ignores_unused_bits() {
        let cases = [
            // add with junk between SR1 and SR2
            (0x1298, SimInstr::ADD(R1, R2, ImmOrReg::Reg(R0))),
            // not without the trailing ones
            (0x92BE, SimInstr::NOT(R1, R2)),
            // jmp with a nonzero low field
            (0xC1C1, SimInstr::JMP(R7)),
            // jsrr with nonzero bits 9-10
            (0x4340, SimInstr::JSR(ImmOrReg::Reg(R5))),
            // trap with nonzero bits 8-11
            (0xF125, SimInstr::TRAP(TrapVect8::new_trunc(0x25))),
        ];
        for (word, instr) in cases {
            assert_eq!(SimInstr::decode(word).ok(), Some(instr), "{word:#06x}");
            assert!(!SimInstr::is_canonical(word));
            assert!(SimInstr::is_canonical(instr.encode()));
        }
    }

    #[test]
    fn test_display() {
        let rendered: Vec<_> = [
            SimInstr::ADD(R1, R2, ImmOrReg::Imm(IOffset::new_trunc(-1))),
            SimInstr::AND(R0, R0, ImmOrReg::Reg(R1)),
            SimInstr::BR(0b110, IOffset::new_trunc(-3)),
            SimInstr::BR(0, IOffset::new_trunc(4)),
            SimInstr::JSR(ImmOrReg::Reg(R2)),
            SimInstr::LDR(R0, R6, IOffset::new_trunc(-2)),
            SimInstr::TRAP(TrapVect8::new_trunc(0x25)),
            SimInstr::TRAP(TrapVect8::new_trunc(0x21)),
            SimInstr::TRAP(TrapVect8::new_trunc(0x26)),
        ].iter().map(ToString::to_string).collect();

        assert_eq!(rendered, [
            "add %r1 %r2 $-1",
            "and %r0 %r0 %r1",
            "brnz -3",
            "br 4",
            "jssr %r2",
            "ldr %r0 %r6 $-2",
            "halt",
            "putc",
            "val 0xf026",
        ]);
    }

    #[test]
    fn test_disassemble() {
        let listing = disassemble(0x3000, &[0x1283, 0x8000, 0xF025, 0x1298, 0xF026]);
        assert_eq!(listing, concat!(
            "x3000: x1283  add %r1 %r2 %r3\n",
            "x3001: x8000  val 0x8000\n",
            "x3002: xF025  halt\n",
            "x3003: x1298  val 0x1298\n",
            "x3004: xF026  val 0xf026\n",
        ));
    }

    #[test]
    fn test_disassemble_end_of_memory() {
        assert_eq!(disassemble(0xFFFF, &[0xF025]), "xFFFF: xF025  halt\n");
        assert_eq!(disassemble(0xFFFE, &[0x1283, 0xF025]), "xFFFE: x1283  add %r1 %r2 %r3\nxFFFF: xF025  halt\n");
    }
}
