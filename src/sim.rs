//! Simulating and execution for x16 machine code.
//!
//! This module is focused on executing fully assembled code (i.e., [`ObjectFile`]).
//!
//! This module consists of:
//! - [`Simulator`]: The struct that simulates assembled code.
//! - [`Machine`]: The state of the machine (memory, registers, PC, and condition code).
//! - [`mem`]: The module handling memory and the register file.
//! - [`trap`]: The module handling system calls (console IO and halting).
//!
//! # Usage
//!
//! To simulate some code, you need to instantiate a Simulator and load an object file to it:
//!
//! ```
//! use x16::asm::assemble;
//! use x16::sim::{Simulator, Step};
//! use x16::ast::reg_consts::R0;
//!
//! let src = "
//!     and %r0 %r0 $0
//!     add %r0 %r0 $1
//!     add %r0 %r0 $1
//!     halt
//! ";
//! let obj_file = assemble(src).unwrap();
//!
//! let mut sim = Simulator::new(Default::default());
//! sim.load_obj_file(&obj_file);
//!
//! // Running step by step:
//! sim.step_in().unwrap();
//! assert_eq!(sim.reg(R0), 0);
//! sim.step_in().unwrap();
//! assert_eq!(sim.reg(R0), 1);
//!
//! // Running to the end:
//! sim.run().unwrap();
//! assert_eq!(sim.reg(R0), 2);
//! assert_eq!(sim.instructions_run, 4);
//! ```
//!
//! ## Flags
//!
//! The simulator can be configured with [`SimFlags`]. For example,
//! to fill memory and registers with seeded random values instead of zeroes:
//!
//! ```
//! # use x16::sim::{Simulator, SimFlags};
//! # use x16::sim::mem::MachineInitStrategy;
//! let sim = Simulator::new(SimFlags { machine_init: MachineInitStrategy::Seeded { seed: 7 } });
//! ```
//!
//! ## Traps
//!
//! By default, the simulator's console is a [`trap::NullConsole`], which has no input
//! and discards output. A different console (or an entirely different
//! [`trap::TrapHandler`]) can be supplied with [`Simulator::with_traps`].

pub mod mem;
pub mod trap;

use std::ops::{Deref, DerefMut};

use tracing::{debug, trace};

use crate::asm::ObjectFile;
use crate::ast::reg_consts::R7;
use crate::ast::sim::{Opcode, SimInstr};
use crate::ast::{ImmOrReg, Reg};
use crate::bits::is_negative;

use self::mem::{MachineInitStrategy, MemArray, RegFile};
use self::trap::{ConsoleTraps, NullConsole, TrapHandler};

/// Errors that can occur during simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimErr {
    /// Word was decoded, but the opcode is reserved.
    #[error("simulator executed reserved opcode {0}")]
    IllegalOpcode(Opcode),
    /// A trap was executed with a vector that has no handler.
    #[error("unknown trap vector x{0:02X}")]
    UnknownTrap(u8),
    /// A trap tried to read input, but the console has no more.
    #[error("console has no more input")]
    ConsoleClosed,
    /// A trap's console IO failed.
    #[error("console IO failed")]
    Io(#[from] std::io::Error),
    /// The step limit was reached before the program halted.
    #[error("program did not halt within {0} instructions")]
    StepLimit(u64),
}
impl crate::err::Error for SimErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self {
            SimErr::IllegalOpcode(_)      => Some("the program ran into data or uninitialized memory, check that it halts".into()),
            SimErr::UnknownTrap(_)        => Some("trap vectors x20 through x25 are supported".into()),
            SimErr::ConsoleClosed         => Some("provide more input to the program".into()),
            SimErr::Io(_)                 => None,
            SimErr::StepLimit(_)          => Some("the program may be in an infinite loop, or the limit may need to be raised".into()),
        }
    }
}

/// The outcome of executing one instruction.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Step {
    /// Execution can continue with the next instruction.
    Continue,
    /// The program halted.
    Halt,
}

/// The condition code of the machine.
///
/// Exactly one condition is active at a time.
/// Its bit value matches the `nzp` mask of `BR` instructions.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
#[repr(u8)]
pub enum Cond {
    #[allow(missing_docs)]
    Negative = 0b100,
    #[allow(missing_docs)]
    Zero     = 0b010,
    #[allow(missing_docs)]
    Positive = 0b001,
}
impl Cond {
    /// The condition code resulting from writing `value` to a register.
    ///
    /// ```
    /// use x16::sim::Cond;
    ///
    /// assert_eq!(Cond::of(0), Cond::Zero);
    /// assert_eq!(Cond::of(0x8000), Cond::Negative);
    /// assert_eq!(Cond::of(0x7FFF), Cond::Positive);
    /// ```
    pub fn of(value: u16) -> Cond {
        match value {
            0 => Cond::Zero,
            v if is_negative(v) => Cond::Negative,
            _ => Cond::Positive,
        }
    }

    /// The `nzp` bits of this condition code.
    pub fn bits(self) -> u8 {
        self as u8
    }
}

/// Configuration flags for [`Simulator`].
///
/// These are read when the machine state is (re)created,
/// with [`Simulator::new`] or [`Simulator::reset`].
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct SimFlags {
    /// The strategy to fill memory and registers with.
    ///
    /// By default, everything starts as zero.
    pub machine_init: MachineInitStrategy,
}

/// The state of an x16 machine.
///
/// This is what the trap handler has access to.
#[derive(Debug, Clone)]
pub struct Machine {
    /// The memory.
    pub mem: MemArray,
    /// The general purpose registers.
    pub reg_file: RegFile,
    /// The program counter.
    pub pc: u16,
    cond: Cond,
}
impl Machine {
    /// Creates a new machine, filling memory and registers using the given strategy.
    ///
    /// The PC starts at the program origin, and the condition code starts as [`Cond::Zero`].
    pub fn new(init: MachineInitStrategy) -> Self {
        let mut filler = init.generator();
        Self {
            mem: MemArray::new(&mut filler),
            reg_file: RegFile::new(&mut filler),
            pc: crate::asm::ORIGIN,
            cond: Cond::Zero,
        }
    }

    /// Reads the word at the given address.
    pub fn read(&self, addr: u16) -> u16 {
        self.mem.read(addr)
    }

    /// Writes a word to the given address.
    pub fn write(&mut self, addr: u16, data: u16) {
        self.mem.write(addr, data);
    }

    /// Reads a register.
    pub fn reg(&self, r: Reg) -> u16 {
        self.reg_file[r]
    }

    /// Writes a register. This does not affect the condition code.
    pub fn set_reg(&mut self, r: Reg, value: u16) {
        self.reg_file[r] = value;
    }

    /// Gets the current condition code.
    pub fn cond(&self) -> Cond {
        self.cond
    }

    /// Sets the current condition code.
    pub fn set_cond(&mut self, cond: Cond) {
        self.cond = cond;
    }

    /// Writes a register and updates the condition code to match.
    fn set_reg_cc(&mut self, r: Reg, value: u16) {
        self.set_reg(r, value);
        self.cond = Cond::of(value);
    }
}

/// Executes assembled code.
///
/// The simulator derefs to its [`Machine`], so machine state can be queried
/// (or set) directly:
///
/// ```
/// use x16::sim::Simulator;
/// use x16::ast::reg_consts::R0;
///
/// let mut sim = Simulator::new(Default::default());
///
/// sim.set_reg(R0, 0x1234);
/// assert_eq!(sim.reg(R0), 0x1234);
///
/// sim.write(0x3000, 0x5678);
/// assert_eq!(sim.mem[0x3000], 0x5678);
/// ```
pub struct Simulator {
    machine: Machine,

    /// Configuration settings for the simulator.
    pub flags: SimFlags,

    /// The number of instructions successfully run since this `Simulator` was initialized or reset.
    pub instructions_run: u64,

    traps: Box<dyn TrapHandler + Send>,
}
impl Simulator {
    /// Creates a new simulator with the provided flags,
    /// whose traps use a console with no input that discards output.
    pub fn new(flags: SimFlags) -> Self {
        Self::with_traps(flags, ConsoleTraps::new(NullConsole))
    }

    /// Creates a new simulator with the provided flags and trap handler.
    pub fn with_traps(flags: SimFlags, traps: impl TrapHandler + Send + 'static) -> Self {
        Self {
            machine: Machine::new(flags.machine_init),
            flags,
            instructions_run: 0,
            traps: Box::new(traps),
        }
    }

    /// Replaces the trap handler.
    pub fn set_trap_handler(&mut self, traps: impl TrapHandler + Send + 'static) {
        self.traps = Box::new(traps);
    }

    /// Resets the machine state (memory, registers, PC, condition code,
    /// and the instruction count) according to [`SimFlags::machine_init`].
    ///
    /// The trap handler is preserved.
    /// This does not reload object files. Any object file data has to be reloaded into the Simulator.
    pub fn reset(&mut self) {
        self.machine = Machine::new(self.flags.machine_init);
        self.instructions_run = 0;
    }

    /// Loads an object file into this simulator,
    /// pointing the PC at its first word.
    pub fn load_obj_file(&mut self, obj: &ObjectFile) {
        self.machine.mem.copy_block(obj.origin(), obj.words());
        self.machine.pc = obj.origin();
        debug!(origin = format_args!("x{:04X}", obj.origin()), words = obj.len(), "loaded object file");
    }

    /// Simulate one step, executing one instruction.
    ///
    /// This returns [`Step::Halt`] if the instruction halted the program,
    /// and an error if the instruction could not be executed.
    pub fn step_in(&mut self) -> Result<Step, SimErr> {
        let m = &mut self.machine;

        let addr = m.pc;
        let word = m.read(addr);
        m.pc = m.pc.wrapping_add(1);

        let instr = match SimInstr::decode(word) {
            Ok(instr) => instr,
            Err(e) => {
                debug!(addr = format_args!("x{addr:04X}"), word = format_args!("x{word:04X}"), "could not decode: {e}");
                return Err(e);
            }
        };
        trace!(addr = format_args!("x{addr:04X}"), word = format_args!("x{word:04X}"), "{instr}");

        match instr {
            SimInstr::BR(cc, off) => {
                if cc == 0 || cc & m.cond.bits() != 0 {
                    m.pc = m.pc.wrapping_add_signed(off.get());
                }
            },
            SimInstr::ADD(dr, sr1, sr2) => {
                let val2 = match sr2 {
                    ImmOrReg::Imm(i2) => i2.get() as u16,
                    ImmOrReg::Reg(r2) => m.reg(r2),
                };
                m.set_reg_cc(dr, m.reg(sr1).wrapping_add(val2));
            },
            SimInstr::AND(dr, sr1, sr2) => {
                let val2 = match sr2 {
                    ImmOrReg::Imm(i2) => i2.get() as u16,
                    ImmOrReg::Reg(r2) => m.reg(r2),
                };
                m.set_reg_cc(dr, m.reg(sr1) & val2);
            },
            SimInstr::NOT(dr, sr) => m.set_reg_cc(dr, !m.reg(sr)),
            SimInstr::LD(dr, off) => {
                let ea = m.pc.wrapping_add_signed(off.get());
                m.set_reg_cc(dr, m.read(ea));
            },
            SimInstr::LDI(dr, off) => {
                let ea = m.read(m.pc.wrapping_add_signed(off.get()));
                m.set_reg_cc(dr, m.read(ea));
            },
            SimInstr::LDR(dr, br, off) => {
                let ea = m.reg(br).wrapping_add_signed(off.get());
                m.set_reg_cc(dr, m.read(ea));
            },
            SimInstr::LEA(dr, off) => {
                let ea = m.pc.wrapping_add_signed(off.get());
                m.set_reg_cc(dr, ea);
            },
            SimInstr::ST(sr, off) => {
                let ea = m.pc.wrapping_add_signed(off.get());
                m.write(ea, m.reg(sr));
            },
            SimInstr::STI(sr, off) => {
                let ea = m.read(m.pc.wrapping_add_signed(off.get()));
                m.write(ea, m.reg(sr));
            },
            SimInstr::STR(sr, br, off) => {
                let ea = m.reg(br).wrapping_add_signed(off.get());
                m.write(ea, m.reg(sr));
            },
            SimInstr::JMP(br) => m.pc = m.reg(br),
            SimInstr::JSR(op) => {
                // the target is read before R7 is written, so `jssr %r7` jumps to the old R7
                let target = match op {
                    ImmOrReg::Imm(off) => m.pc.wrapping_add_signed(off.get()),
                    ImmOrReg::Reg(br)  => m.reg(br),
                };
                m.set_reg(R7, m.pc);
                m.pc = target;
            },
            SimInstr::TRAP(_) => {
                let step = self.traps.handle_trap(&mut self.machine, word)?;
                self.instructions_run += 1;
                return Ok(step);
            },
        }

        self.instructions_run += 1;
        Ok(Step::Continue)
    }

    /// Execute the program.
    ///
    /// This blocks until the program halts or fails.
    /// If you would like to limit the maximum number of steps to execute, consider [`Simulator::run_with_limit`].
    pub fn run(&mut self) -> Result<(), SimErr> {
        while self.step_in()? == Step::Continue {}
        debug!(instructions_run = self.instructions_run, "program halted");
        Ok(())
    }

    /// Execute the program with a limit on how many steps to execute.
    ///
    /// This blocks until the program halts, fails, or until the number of steps to execute has been hit.
    /// Hitting the limit is reported as [`SimErr::StepLimit`].
    pub fn run_with_limit(&mut self, max_steps: u64) -> Result<(), SimErr> {
        for _ in 0..max_steps {
            if self.step_in()? == Step::Halt {
                debug!(instructions_run = self.instructions_run, "program halted");
                return Ok(());
            }
        }
        Err(SimErr::StepLimit(max_steps))
    }
}
impl Deref for Simulator {
    type Target = Machine;

    fn deref(&self) -> &Self::Target {
        &self.machine
    }
}
impl DerefMut for Simulator {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.machine
    }
}
impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("pc", &self.machine.pc)
            .field("cond", &self.machine.cond)
            .field("reg_file", &self.machine.reg_file)
            .field("flags", &self.flags)
            .field("instructions_run", &self.instructions_run)
            .finish_non_exhaustive()
    }
}
