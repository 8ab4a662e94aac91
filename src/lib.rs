//! An x16 assembler and simulator.
//!
//! The x16 is a small 16-bit machine: eight general purpose registers,
//! 65536 words of word-addressed memory, and a three-flag condition code.
//! Programs are written in a line-oriented assembly language and
//! are loaded at address `0x3000`.
//!
//! # Usage
//!
//! To convert x16 source code to an object file, it must be assembled:
//! ```
//! use x16::asm::{assemble, ObjectFile};
//!
//! let code = "
//!     and %r0 %r0 $0
//!     add %r0 %r0 $7   # R0 = 7
//!     halt
//! ";
//! let obj_file: ObjectFile = assemble(code).unwrap();
//! assert_eq!(obj_file.words(), [0x5020, 0x1027, 0xF025]);
//! ```
//!
//! Once an object file has been created, it can be executed with the simulator:
//! ```
//! # use x16::asm::assemble;
//! # let obj_file = assemble("add %r0 %r0 $7\nhalt").unwrap();
//! use x16::sim::Simulator;
//! use x16::ast::reg_consts::R0;
//!
//! let mut simulator = Simulator::new(Default::default());
//! simulator.load_obj_file(&obj_file);
//! simulator.run().unwrap(); // <-- Result can be handled accordingly
//! assert_eq!(simulator.reg(R0), 7);
//! ```
//!
//! If more granularity is needed for simulation, there is also a step-in function.
//! See the [`sim`] module for more details.
#![warn(missing_docs)]

pub mod bits;
pub mod parse;
pub mod ast;
pub mod asm;
pub mod sim;
pub mod err;
