//! Memory handling for the x16 simulator.
//!
//! This module consists of:
//! - [`MemArray`]: The memory.
//! - [`RegFile`]: The register file.
//! - [`MachineInitStrategy`]: How both are filled when a machine is created.

use rand::rngs::StdRng;
use rand::Rng;

use crate::ast::Reg;

/// The number of addressable words in memory.
pub const MEM_SIZE: usize = 1 << 16;

/// Trait that describes types that can be used to create the initial data of memory and registers.
pub trait WordFiller {
    /// Generate the data.
    fn generate(&mut self) -> u16;
}
impl WordFiller for () {
    /// This creates unseeded, non-deterministic values.
    fn generate(&mut self) -> u16 {
        rand::random()
    }
}
impl WordFiller for u16 {
    /// Sets each word to the given value.
    fn generate(&mut self) -> u16 {
        *self
    }
}
impl WordFiller for StdRng {
    /// This creates values from the standard random number generator.
    ///
    /// This can be used to create deterministic, seeded values.
    fn generate(&mut self) -> u16 {
        self.gen()
    }
}

/// Strategy used to initialize the `reg_file` and `mem` of the [`Machine`].
///
/// Programs should not depend on the contents of memory or registers
/// they did not write, and the randomized strategies help catch programs that do.
///
/// [`Machine`]: super::Machine
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum MachineInitStrategy {
    /// Initializes each word to zero.
    #[default]
    Zeroed,

    /// Initializes each word randomly and deterministically.
    Seeded {
        /// The seed the RNG was initialized with.
        seed: u64
    },

    /// Initializes each word randomly and non-deterministically.
    Unseeded,

    /// Initializes each word to a known value.
    Known {
        /// The value to initialize each value to.
        value: u16
    }
}

impl MachineInitStrategy {
    pub(super) fn generator(&self) -> impl WordFiller {
        use rand::SeedableRng;

        match self {
            MachineInitStrategy::Zeroed => InitGenerator::Known(0),
            MachineInitStrategy::Seeded { seed } => InitGenerator::Seeded(Box::new(StdRng::seed_from_u64(*seed))),
            MachineInitStrategy::Unseeded => InitGenerator::Unseeded,
            MachineInitStrategy::Known { value } => InitGenerator::Known(*value),
        }
    }
}

enum InitGenerator {
    Unseeded,
    Seeded(Box<StdRng>),
    Known(u16)
}
impl WordFiller for InitGenerator {
    fn generate(&mut self) -> u16 {
        match self {
            InitGenerator::Unseeded  => ().generate(),
            InitGenerator::Seeded(r) => r.generate(),
            InitGenerator::Known(k)  => k.generate(),
        }
    }
}

/// Memory. This consists of 65536 addressable words.
///
/// Memory can be accessed through [`MemArray::read`] and [`MemArray::write`],
/// or by indexing with an address.
///
/// ```
/// use x16::sim::mem::MemArray;
///
/// let mut mem = MemArray::new(&mut 0u16);
/// mem.write(0x3000, 0x9ABC);
/// assert_eq!(mem.read(0x3000), 0x9ABC);
/// assert_eq!(mem[0x3001], 0);
/// ```
#[derive(Debug, Clone)]
pub struct MemArray(Box<[u16]>);
impl MemArray {
    /// Creates a new memory with a provided word creation strategy.
    pub fn new(filler: &mut impl WordFiller) -> Self {
        Self(std::iter::repeat_with(|| filler.generate()).take(MEM_SIZE).collect())
    }

    /// Reads the word at the given address.
    pub fn read(&self, addr: u16) -> u16 {
        self.0[usize::from(addr)]
    }

    /// Writes a word to the given address.
    pub fn write(&mut self, addr: u16, data: u16) {
        self.0[usize::from(addr)] = data;
    }

    /// Copies a block of words into memory, starting at `start`.
    ///
    /// Words that would land past the end of memory are dropped.
    pub fn copy_block(&mut self, start: u16, data: &[u16]) {
        let start = usize::from(start);
        let end = usize::min(start + data.len(), MEM_SIZE);
        self.0[start..end].copy_from_slice(&data[..end - start]);
    }
}
impl std::ops::Index<u16> for MemArray {
    type Output = u16;

    fn index(&self, index: u16) -> &Self::Output {
        &self.0[usize::from(index)]
    }
}
impl std::ops::IndexMut<u16> for MemArray {
    fn index_mut(&mut self, index: u16) -> &mut Self::Output {
        &mut self.0[usize::from(index)]
    }
}

/// The register file.
///
/// This struct can be indexed with a [`Reg`].
///
/// # Example
///
/// ```
/// use x16::sim::mem::RegFile;
/// use x16::ast::reg_consts::R0;
///
/// let mut reg = RegFile::new(&mut 0u16);
/// reg[R0] = 11;
/// assert_eq!(reg[R0], 11);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegFile([u16; 8]);
impl RegFile {
    /// Creates a register file filled by the given strategy.
    pub fn new(filler: &mut impl WordFiller) -> Self {
        Self(std::array::from_fn(|_| filler.generate()))
    }
}
impl std::ops::Index<Reg> for RegFile {
    type Output = u16;

    fn index(&self, index: Reg) -> &Self::Output {
        &self.0[usize::from(index)]
    }
}
impl std::ops::IndexMut<Reg> for RegFile {
    fn index_mut(&mut self, index: Reg) -> &mut Self::Output {
        &mut self.0[usize::from(index)]
    }
}
