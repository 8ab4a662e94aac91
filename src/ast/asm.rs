//! This module holds the AST for a line of x16 assembly source code.
//!
//! An [`AsmInstr`] still refers to labels by name. During the second
//! assembly pass, [`AsmInstr::into_sim_instr`] resolves them against the
//! symbol table and produces a [`SimInstr`] that can be encoded.

use crate::asm::{AsmErrKind, SymbolTable};

use super::sim::SimInstr;
use super::{CondCode, IOffset, ImmOrReg, Offset, PCOffset, Reg, TrapVect8};
use super::reg_consts::R7;

type PCOffset9 = PCOffset<i16, 9>;
type PCOffset11 = PCOffset<i16, 11>;

/// An enum representing all of the possible instructions in x16 assembly code.
///
/// The variants in this enum represent instructions before assembly passes.
///
/// For instructions that have been processed by the assembly passes, refer to [`SimInstr`].
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum AsmInstr {
    /// An ADD instruction.
    ///
    /// # Operation
    ///
    /// Evaluates the two operands, adds them, and stores the result to the destination register (`DR`).
    /// This also sets the condition code for the machine.
    ///
    /// # Syntax
    /// - `add DR SR1 SR2`
    /// - `add DR SR1 $imm5`
    ADD(Reg, Reg, ImmOrReg<5>),

    /// An AND instruction.
    ///
    /// # Operation
    ///
    /// Evaluates the two operands, bitwise ANDs them, and stores the result to the destination register (`DR`).
    /// This also sets the condition code for the machine.
    ///
    /// # Syntax
    /// - `and DR SR1 SR2`
    /// - `and DR SR1 $imm5`
    AND(Reg, Reg, ImmOrReg<5>),

    /// A BR instruction.
    ///
    /// # Operation
    ///
    /// Checks the current condition code and branches to the given `PCOffset9`
    /// if the condition code matches one of the provided conditions,
    /// or unconditionally if no conditions are provided.
    ///
    /// # Syntax
    /// - `br PCOffset9`
    /// - `brn PCOffset9`, `brz PCOffset9`, `brnzp PCOffset9`, ...
    BR(CondCode, PCOffset9),

    /// A JMP instruction.
    ///
    /// # Operation
    ///
    /// Unconditionally jumps to the location stored in the given register (`BR`).
    ///
    /// # Syntax
    /// - `jmp BR`
    JMP(Reg),

    /// A JSR instruction.
    ///
    /// # Operation
    ///
    /// Saves the current PC to R7 and jumps to the given offset.
    ///
    /// # Syntax
    /// - `jsr PCOffset11`
    JSR(PCOffset11),

    /// A JSRR instruction.
    ///
    /// # Operation
    ///
    /// Saves the current PC to R7 and jumps to the location stored in the given register (`BR`).
    ///
    /// # Syntax
    /// - `jssr BR`
    /// - `jsrr BR`
    JSRR(Reg),

    /// A LD instruction.
    ///
    /// # Operation
    ///
    /// Computes an effective address (`PC + PCOffset9`), accesses the memory at that address,
    /// and stores it to the destination register (`DR`).
    /// This also sets the condition code for the machine.
    ///
    /// # Syntax
    /// - `ld DR PCOffset9`
    LD(Reg, PCOffset9),

    /// A LDI instruction.
    ///
    /// # Operation
    ///
    /// Computes an effective address (`mem[PC + PCOffset9]`), accesses the memory at that address,
    /// and stores it to the destination register (`DR`).
    /// This also sets the condition code for the machine.
    ///
    /// # Syntax
    /// - `ldi DR PCOffset9`
    LDI(Reg, PCOffset9),

    /// A LDR instruction.
    ///
    /// # Operation
    ///
    /// Computes an effective address (`BR + offset6`), accesses the memory at that address,
    /// and stores it to the destination register (`DR`).
    /// This also sets the condition code for the machine.
    ///
    /// # Syntax
    /// - `ldr DR BR $offset6`
    LDR(Reg, Reg, IOffset<6>),

    /// A LEA instruction.
    ///
    /// # Operation
    ///
    /// Computes an effective address (`PC + PCOffset9`) and stores it to the destination register (`DR`).
    /// This also sets the condition code for the machine.
    ///
    /// # Syntax
    /// - `lea DR PCOffset9`
    LEA(Reg, PCOffset9),

    /// A NOT instruction.
    ///
    /// # Operation
    ///
    /// Bitwise NOTs the value in the source register (`SR`),
    /// and stores the result to the destination register (`DR`).
    /// This also sets the condition code for the machine.
    ///
    /// # Syntax
    /// - `not DR SR`
    NOT(Reg, Reg),

    /// A RET instruction.
    ///
    /// # Operation
    ///
    /// Returns from a subroutine. This is an alias for `jmp %r7`.
    ///
    /// # Syntax
    /// - `ret`
    RET,

    /// A ST instruction.
    ///
    /// # Operation
    ///
    /// Computes an effective address (`PC + PCOffset9`), and writes the value from the source register (`SR`)
    /// into the memory at that address.
    ///
    /// # Syntax
    /// - `st SR PCOffset9`
    ST(Reg, PCOffset9),

    /// A STI instruction.
    ///
    /// # Operation
    ///
    /// Computes an effective address (`mem[PC + PCOffset9]`), and writes the value from the source register (`SR`)
    /// into the memory at that address.
    ///
    /// # Syntax
    /// - `sti SR PCOffset9`
    STI(Reg, PCOffset9),

    /// A STR instruction.
    ///
    /// # Operation
    ///
    /// Computes an effective address (`BR + offset6`), and writes the value from the source register (`SR`)
    /// into the memory at that address.
    ///
    /// # Syntax
    /// - `str SR BR $offset6`
    STR(Reg, Reg, IOffset<6>),

    /// A GETC instruction. Equivalent to `trap 0x20`.
    GETC,

    /// A PUTC instruction (alias `out`). Equivalent to `trap 0x21`.
    PUTC,

    /// A PUTS instruction. Equivalent to `trap 0x22`.
    PUTS,

    /// An ENTER instruction (alias `in`). Equivalent to `trap 0x23`.
    ENTER,

    /// A PUTSP instruction. Equivalent to `trap 0x24`.
    PUTSP,

    /// A HALT instruction. Equivalent to `trap 0x25`.
    HALT,
}

impl AsmInstr {
    /// Converts an ASM instruction into a simulator instruction ([`SimInstr`])
    /// by resolving offsets and erasing aliases.
    ///
    /// `pc` is the address this instruction is placed at.
    /// PC offsets are computed relative to the following address.
    pub fn into_sim_instr(self, pc: u16, sym: &SymbolTable) -> Result<SimInstr, AsmErrKind> {
        match self {
            AsmInstr::ADD(dr, sr1, sr2) => Ok(SimInstr::ADD(dr, sr1, sr2)),
            AsmInstr::AND(dr, sr1, sr2) => Ok(SimInstr::AND(dr, sr1, sr2)),
            AsmInstr::BR(cc, off)       => Ok(SimInstr::BR(cc, replace_pc_offset(off, pc, sym)?)),
            AsmInstr::JMP(br)           => Ok(SimInstr::JMP(br)),
            AsmInstr::JSR(off)          => Ok(SimInstr::JSR(ImmOrReg::Imm(replace_pc_offset(off, pc, sym)?))),
            AsmInstr::JSRR(br)          => Ok(SimInstr::JSR(ImmOrReg::Reg(br))),
            AsmInstr::LD(dr, off)       => Ok(SimInstr::LD(dr, replace_pc_offset(off, pc, sym)?)),
            AsmInstr::LDI(dr, off)      => Ok(SimInstr::LDI(dr, replace_pc_offset(off, pc, sym)?)),
            AsmInstr::LDR(dr, br, off)  => Ok(SimInstr::LDR(dr, br, off)),
            AsmInstr::LEA(dr, off)      => Ok(SimInstr::LEA(dr, replace_pc_offset(off, pc, sym)?)),
            AsmInstr::NOT(dr, sr)       => Ok(SimInstr::NOT(dr, sr)),
            AsmInstr::RET               => Ok(SimInstr::JMP(R7)),
            AsmInstr::ST(sr, off)       => Ok(SimInstr::ST(sr, replace_pc_offset(off, pc, sym)?)),
            AsmInstr::STI(sr, off)      => Ok(SimInstr::STI(sr, replace_pc_offset(off, pc, sym)?)),
            AsmInstr::STR(sr, br, off)  => Ok(SimInstr::STR(sr, br, off)),
            AsmInstr::GETC              => Ok(SimInstr::TRAP(TrapVect8::new_trunc(0x20))),
            AsmInstr::PUTC              => Ok(SimInstr::TRAP(TrapVect8::new_trunc(0x21))),
            AsmInstr::PUTS              => Ok(SimInstr::TRAP(TrapVect8::new_trunc(0x22))),
            AsmInstr::ENTER             => Ok(SimInstr::TRAP(TrapVect8::new_trunc(0x23))),
            AsmInstr::PUTSP             => Ok(SimInstr::TRAP(TrapVect8::new_trunc(0x24))),
            AsmInstr::HALT              => Ok(SimInstr::TRAP(TrapVect8::new_trunc(0x25))),
        }
    }
}

/// Replaces a [`PCOffset`] value with an [`Offset`] value by calculating the offset from a given label
/// (if this `PCOffset` represents a label).
fn replace_pc_offset<const N: u32>(off: PCOffset<i16, N>, pc: u16, sym: &SymbolTable) -> Result<IOffset<N>, AsmErrKind> {
    match off {
        PCOffset::Offset(off) => Ok(off),
        PCOffset::Label(label) => {
            let Some(target) = sym.find(&label) else {
                return Err(AsmErrKind::CouldNotFindLabel(label));
            };

            let distance = i32::from(target) - (i32::from(pc) + 1);
            let distance = i16::try_from(distance)
                .map_err(|_| super::OffsetNewErr::CannotFitSigned(N))?;
            Ok(Offset::new(distance)?)
        },
    }
}

/// A directive, which produces a word that is not an instruction.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Directive {
    /// A raw literal word.
    ///
    /// # Syntax
    /// - `val $INT`
    /// - `val INT`
    Val(u16),
}

/// Either an instruction or a directive.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum StmtKind {
    #[allow(missing_docs)]
    Instr(AsmInstr),
    #[allow(missing_docs)]
    Directive(Directive),
}

/// A single parsed line of assembly.
///
/// A line can hold a label definition, a statement, both, or
/// (for blank lines) neither.
///
/// ```text
/// loop: add %r0 %r0 $1
/// ~~~~  ~~~~~~~~~~~~~~~~
/// label nucleus
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Stmt {
    /// The label defined on this line.
    pub label: Option<String>,
    /// The instruction or directive on this line.
    pub nucleus: Option<StmtKind>,
}
impl Stmt {
    /// Whether this line occupies a word in the program.
    pub fn occupies_word(&self) -> bool {
        self.nucleus.is_some()
    }
}
