//! System calls for the x16 simulator.
//!
//! A `TRAP` instruction is handed to the simulator's [`TrapHandler`].
//! The provided handler, [`ConsoleTraps`], implements the standard trap vectors
//! on top of a byte-oriented [`Console`]:
//!
//! | Vector | Mnemonic | Behavior |
//! |--------|----------|----------|
//! | `x20`  | `getc`   | reads a character into `%r0` |
//! | `x21`  | `putc`   | writes the character in `%r0` |
//! | `x22`  | `puts`   | writes the string (one character per word) at `%r0` |
//! | `x23`  | `enter`  | prompts for a character, echoes it, and reads it into `%r0` |
//! | `x24`  | `putsp`  | writes the string (two characters per word) at `%r0` |
//! | `x25`  | `halt`   | halts the program |
//!
//! This module also includes these consoles:
//! - [`NullConsole`]: A console with no input, which discards output.
//! - [`BufferedConsole`]: A console that reads from an input buffer and writes to an output buffer.
//! - [`ChannelConsole`]: A console backed by channels, for driving the simulator from another thread.
//! - [`StdConsole`]: A console backed by the process's standard input and output.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::sync::{Arc, PoisonError, RwLock};

use crossbeam_channel as cbc;
use tracing::trace;

use crate::ast::reg_consts::R0;
use crate::bits::get_bits;

use super::mem::MEM_SIZE;
use super::{Machine, SimErr, Step};

/// Something that can handle `TRAP` instructions.
pub trait TrapHandler {
    /// Executes the trap instruction `instr` against the machine.
    ///
    /// The PC has already been advanced past the trap instruction.
    /// This returns [`Step::Halt`] if the trap halted the program.
    fn handle_trap(&mut self, machine: &mut Machine, instr: u16) -> Result<Step, SimErr>;
}
impl dyn TrapHandler {} // assert TrapHandler is dyn safe

/// A byte-oriented console that traps read from and write to.
pub trait Console {
    /// Reads one byte of input.
    ///
    /// This should block until input is available,
    /// and fail with [`SimErr::ConsoleClosed`] if no more input will ever arrive.
    fn read_byte(&mut self) -> Result<u8, SimErr>;

    /// Writes bytes of output.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), SimErr>;
}

/// No input, and all output is discarded.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullConsole;
impl Console for NullConsole {
    fn read_byte(&mut self) -> Result<u8, SimErr> {
        Err(SimErr::ConsoleClosed)
    }

    fn write_bytes(&mut self, _bytes: &[u8]) -> Result<(), SimErr> {
        Ok(())
    }
}

/// A console that reads from an input buffer and writes to an output buffer.
///
/// The buffers are shared between clones,
/// so a clone can be handed to the simulator while another handle is used to
/// feed input and inspect output through [`BufferedConsole::get_input`] and [`BufferedConsole::get_output`].
///
/// ```
/// use x16::asm::assemble;
/// use x16::sim::{Simulator, SimFlags};
/// use x16::sim::trap::{BufferedConsole, ConsoleTraps};
///
/// let console = BufferedConsole::new();
/// console.get_input().write().unwrap().extend(b"A");
///
/// let mut sim = Simulator::with_traps(SimFlags::default(), ConsoleTraps::new(console.clone()));
/// sim.load_obj_file(&assemble("getc\nputc\nhalt").unwrap());
/// sim.run().unwrap();
///
/// assert!(console.output_string().starts_with("A"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct BufferedConsole {
    input: Arc<RwLock<VecDeque<u8>>>,
    output: Arc<RwLock<Vec<u8>>>
}
impl BufferedConsole {
    /// Creates a new BufferedConsole with empty buffers.
    pub fn new() -> Self {
        Self::default()
    }
    /// Creates a new BufferedConsole whose input buffer starts with the given bytes.
    pub fn with_input(input: impl AsRef<[u8]>) -> Self {
        let console = Self::new();
        console.input.write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(input.as_ref());
        console
    }

    /// Gets a reference to the input buffer.
    pub fn get_input(&self) -> &Arc<RwLock<VecDeque<u8>>> {
        &self.input
    }
    /// Gets a reference to the output buffer.
    pub fn get_output(&self) -> &Arc<RwLock<Vec<u8>>> {
        &self.output
    }
    /// Copies the output written so far into a string,
    /// replacing any invalid UTF-8.
    pub fn output_string(&self) -> String {
        let out = self.output.read().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&out).into_owned()
    }
}
impl Console for BufferedConsole {
    fn read_byte(&mut self) -> Result<u8, SimErr> {
        self.input.write()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or(SimErr::ConsoleClosed)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), SimErr> {
        self.output.write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(bytes);
        Ok(())
    }
}

/// A console backed by channels.
///
/// Input is received through one channel and output is sent through another.
/// Reading blocks until input arrives,
/// and the console is closed once the input sender is dropped.
#[derive(Debug)]
pub struct ChannelConsole {
    input: cbc::Receiver<u8>,
    output: cbc::Sender<u8>
}
impl ChannelConsole {
    /// Creates a console from existing channel ends.
    pub fn new(input: cbc::Receiver<u8>, output: cbc::Sender<u8>) -> Self {
        Self { input, output }
    }

    /// Creates a console along with the opposite ends of its channels:
    /// a sender for input and a receiver for output.
    pub fn unbounded() -> (Self, cbc::Sender<u8>, cbc::Receiver<u8>) {
        let (in_tx, in_rx) = cbc::unbounded();
        let (out_tx, out_rx) = cbc::unbounded();
        (Self::new(in_rx, out_tx), in_tx, out_rx)
    }
}
impl Console for ChannelConsole {
    fn read_byte(&mut self) -> Result<u8, SimErr> {
        self.input.recv().map_err(|_| SimErr::ConsoleClosed)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), SimErr> {
        // a disconnected receiver means nobody is listening, so output is dropped
        for &b in bytes {
            if self.output.send(b).is_err() { break; }
        }
        Ok(())
    }
}

/// A console backed by standard input and standard output.
///
/// Output is flushed after every write, so prompts appear before input is read.
#[derive(Debug)]
pub struct StdConsole {
    stdin: std::io::Stdin,
    stdout: std::io::Stdout
}
impl StdConsole {
    /// Creates a new console over the process's standard streams.
    pub fn new() -> Self {
        Self { stdin: std::io::stdin(), stdout: std::io::stdout() }
    }
}
impl Default for StdConsole {
    fn default() -> Self {
        Self::new()
    }
}
impl Console for StdConsole {
    fn read_byte(&mut self) -> Result<u8, SimErr> {
        let mut buf = [0];
        match self.stdin.lock().read(&mut buf)? {
            0 => Err(SimErr::ConsoleClosed),
            _ => Ok(buf[0])
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), SimErr> {
        let mut out = self.stdout.lock();
        out.write_all(bytes)?;
        out.flush()?;
        Ok(())
    }
}

const GETC: u16  = 0x20;
const OUT: u16   = 0x21;
const PUTS: u16  = 0x22;
const IN: u16    = 0x23;
const PUTSP: u16 = 0x24;
const HALT: u16  = 0x25;

const IN_PROMPT: &[u8] = b"Input a character> ";
const HALT_MESSAGE: &[u8] = b"\n--- halting the x16 ---\n";

/// The standard trap routines, performed over a [`Console`].
#[derive(Debug, Default)]
pub struct ConsoleTraps<C> {
    console: C
}
impl<C: Console> ConsoleTraps<C> {
    /// Creates the trap routines over the given console.
    pub fn new(console: C) -> Self {
        Self { console }
    }

    /// Gets a reference to the console.
    pub fn console(&self) -> &C {
        &self.console
    }

    /// Gets a mutable reference to the console.
    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }

    /// Unwraps this, returning the console.
    pub fn into_console(self) -> C {
        self.console
    }
}

/// Collects the string starting at `addr`.
///
/// `unpack` maps each word to the characters it holds,
/// and collection stops at the first zero character.
/// A string with no terminator stops after covering all of memory.
fn read_string<I>(machine: &Machine, addr: u16, unpack: impl Fn(u16) -> I) -> Vec<u8>
    where I: IntoIterator<Item = u16>
{
    let mut buf = vec![];
    let mut addr = addr;
    'words: for _ in 0..MEM_SIZE {
        for c in unpack(machine.read(addr)) {
            if c == 0 { break 'words; }
            buf.push(c as u8);
        }
        addr = addr.wrapping_add(1);
    }
    buf
}

impl<C: Console> TrapHandler for ConsoleTraps<C> {
    fn handle_trap(&mut self, machine: &mut Machine, instr: u16) -> Result<Step, SimErr> {
        let vect = get_bits(instr, 0, 8);
        trace!(vect = format_args!("x{vect:02X}"), "trap");

        match vect {
            GETC => {
                let c = self.console.read_byte()?;
                machine.set_reg(R0, u16::from(c));
            },
            OUT => {
                let c = machine.reg(R0) as u8;
                self.console.write_bytes(&[c])?;
            },
            PUTS => {
                let s = read_string(machine, machine.reg(R0), |w| [w]);
                self.console.write_bytes(&s)?;
            },
            IN => {
                self.console.write_bytes(IN_PROMPT)?;
                let c = self.console.read_byte()?;
                self.console.write_bytes(&[c, b'\n'])?;
                machine.set_reg(R0, u16::from(c));
            },
            PUTSP => {
                let s = read_string(machine, machine.reg(R0), |w| [w & 0xFF, w >> 8]);
                self.console.write_bytes(&s)?;
            },
            HALT => {
                self.console.write_bytes(HALT_MESSAGE)?;
                return Ok(Step::Halt);
            },
            v => return Err(SimErr::UnknownTrap(v as u8)),
        }

        Ok(Step::Continue)
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use crate::asm::{assemble, ObjectFile};
    use crate::ast::reg_consts::{R0, R1};
    use crate::sim::{Cond, SimErr, SimFlags, Simulator, Step};

    use super::{BufferedConsole, ChannelConsole, ConsoleTraps};

    fn sim_with(console: &BufferedConsole, src: &str) -> Simulator {
        let mut sim = Simulator::with_traps(SimFlags::default(), ConsoleTraps::new(console.clone()));
        sim.load_obj_file(&assemble(src).unwrap());
        sim
    }

    #[test]
    fn test_getc_putc() {
        let console = BufferedConsole::with_input("xy");
        let mut sim = sim_with(&console, indoc! {"
            getc
            putc
            getc
            out
        "});
        sim.step_in().unwrap();
        assert_eq!(sim.reg(R0), u16::from(b'x'));
        sim.step_in().unwrap();
        sim.step_in().unwrap();
        sim.step_in().unwrap();

        assert_eq!(console.output_string(), "xy");
        assert!(console.get_input().read().unwrap().is_empty());
    }

    #[test]
    fn test_trap_preserves_cond() {
        let console = BufferedConsole::with_input("A");
        let mut sim = sim_with(&console, "and %r1 %r1 $0\ngetc");
        sim.run_with_limit(2).unwrap_err();
        assert_eq!(sim.reg(R0), 0x41);
        assert_eq!(sim.cond(), Cond::Zero);
        assert_eq!(sim.reg(R1), 0);
    }

    #[test]
    fn test_enter() {
        let console = BufferedConsole::with_input("q");
        let mut sim = sim_with(&console, "enter\nhalt");
        sim.run().unwrap();

        assert_eq!(sim.reg(R0), u16::from(b'q'));
        assert_eq!(console.output_string(), "Input a character> q\n\n--- halting the x16 ---\n");
    }

    #[test]
    fn test_puts_putsp() {
        let console = BufferedConsole::new();
        let mut sim = sim_with(&console, indoc! {"
                lea %r0 wide
                puts
                lea %r0 packed
                putsp
                halt
            wide:   val 0x0061
                    val 0x0062
                    val 0
            packed: val 0x6463
                    val 0x0065
                    val 0x6666
        "});
        sim.run().unwrap();

        assert_eq!(console.output_string(), "abcde\n--- halting the x16 ---\n");
    }

    #[test]
    fn test_halt_message() {
        let console = BufferedConsole::new();
        let mut sim = sim_with(&console, "halt");
        assert_eq!(sim.step_in().unwrap(), Step::Halt);
        assert_eq!(console.output_string(), "\n--- halting the x16 ---\n");
    }

    #[test]
    fn test_console_closed() {
        let console = BufferedConsole::new();
        let mut sim = sim_with(&console, "getc");
        assert!(matches!(sim.step_in(), Err(SimErr::ConsoleClosed)));

        // the default simulator has no input at all
        let mut sim = Simulator::new(SimFlags::default());
        sim.load_obj_file(&assemble("enter").unwrap());
        assert!(matches!(sim.run(), Err(SimErr::ConsoleClosed)));
    }

    #[test]
    fn test_unknown_trap() {
        let mut sim = Simulator::new(SimFlags::default());
        sim.load_obj_file(&ObjectFile::new(0x3000, vec![0xF026]));
        assert!(matches!(sim.step_in(), Err(SimErr::UnknownTrap(0x26))));
    }

    #[test]
    fn test_channel_console() {
        let (console, input, output) = ChannelConsole::unbounded();
        let mut sim = Simulator::with_traps(SimFlags::default(), ConsoleTraps::new(console));
        sim.load_obj_file(&assemble("getc\nadd %r0 %r0 $1\nputc\nhalt").unwrap());

        let handle = std::thread::spawn(move || {
            sim.run().unwrap();
            sim
        });
        input.send(b'a').unwrap();
        let sim = handle.join().unwrap();

        assert_eq!(sim.reg(R0), u16::from(b'b'));
        assert_eq!(output.try_recv(), Ok(b'b'));

        // once input is hung up, reads fail instead of blocking
        drop(input);
        let (console, input, _output) = ChannelConsole::unbounded();
        drop(input);
        let mut sim = Simulator::with_traps(SimFlags::default(), ConsoleTraps::new(console));
        sim.load_obj_file(&assemble("getc").unwrap());
        assert!(matches!(sim.step_in(), Err(SimErr::ConsoleClosed)));
    }
}
