//! Components relating to the abstract syntax trees (ASTs)
//! used in representing x16 instructions.
//!
//! These components together are used to construct...
//! - [`asm::AsmInstr`] (a data structure holding an assembly source code instruction),
//! - [`asm::Directive`] (a data structure holding an assembly source code directive),
//! - and [`sim::SimInstr`] (a data structure holding a bytecode instruction).

pub mod asm;
pub mod sim;

use offset_base::OffsetBacking;

/// A register. Must be between 0 and 7.
///
/// This `Reg` struct can either be constructed by selecting a register from [`reg_consts`],
/// or by using [`Reg::try_from`].
///
/// ## Examples
///
/// ```text
/// and %r0 %r0 $0
///     ~~~ ~~~
/// add %r1 %r1 %r0
///     ~~~ ~~~ ~~~
/// ld %r2 value
///    ~~~
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct Reg(pub(crate) u8);

/// Register constants!
pub mod reg_consts {
    use super::Reg;

    /// The 0th register in the register file.
    pub const R0: Reg = Reg(0);
    /// The 1st register in the register file.
    pub const R1: Reg = Reg(1);
    /// The 2nd register in the register file.
    pub const R2: Reg = Reg(2);
    /// The 3rd register in the register file.
    pub const R3: Reg = Reg(3);
    /// The 4th register in the register file.
    pub const R4: Reg = Reg(4);
    /// The 5th register in the register file.
    pub const R5: Reg = Reg(5);
    /// The 6th register in the register file.
    pub const R6: Reg = Reg(6);
    /// The 7th register in the register file (the link register).
    pub const R7: Reg = Reg(7);
}
impl Reg {
    /// Gets the register number of this [`Reg`]. This is always between 0 and 7.
    pub fn reg_no(self) -> u8 {
        self.0
    }

    /// Reads the 3-bit register field of `word` starting at bit `n`.
    pub(crate) fn from_field(word: u16, n: u32) -> Self {
        // a 3-bit field always names a valid register
        Reg(crate::bits::get_bits(word, n, 3) as u8)
    }
}
impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%r{}", self.0)
    }
}
impl From<Reg> for usize {
    // Used for indexing the reg file in [`crate::sim::mem::RegFile`].
    fn from(value: Reg) -> Self {
        usize::from(value.0)
    }
}
impl From<Reg> for u16 {
    fn from(value: Reg) -> Self {
        u16::from(value.0)
    }
}

/// The error raised when a register number is not in `0..=7`.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, thiserror::Error)]
#[error("%r{0} is not a register")]
pub struct RegOutOfRange(pub u8);

impl TryFrom<u8> for Reg {
    type Error = RegOutOfRange;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0..=7 => Ok(Reg(value)),
            _     => Err(RegOutOfRange(value)),
        }
    }
}

/// A condition code (used for `BR`), must be between 0 and 7.
///
/// The condition codes are listed below:
///
/// | instruction        | code (bin) |
/// |--------------------|------------|
/// | `br`               | `000`      |
/// | `brn`              | `100`      |
/// | `brz`              | `010`      |
/// | `brnz`             | `110`      |
/// | `brp`              | `001`      |
/// | `brnp`             | `101`      |
/// | `brzp`             | `011`      |
/// | `brnzp`            | `111`      |
///
/// Unlike most branch encodings, `000` is an unconditional branch,
/// so `br` and `brnzp` behave the same way.
pub type CondCode = u8;

/// A value representing a signed offset or a signed immediate value.
///
/// `N` indicates the maximum bit size of this offset/immediate value.
///
/// ## Examples
///
/// `IOffset<5>` is used to represent `add`/`and`'s imm5 operand:
///
/// ```text
/// and %r0 %r0 $0
///             ~~
/// add %r1 %r1 $-1
///             ~~~
/// ```
///
/// They are also used for numeric register or PC offset values:
/// ```text
/// br -3
///    ~~
/// ldr %r0 %r6 $2
///             ~~
/// ```
pub type IOffset<const N: u32> = Offset<i16, N>;
/// An unsigned 8-bit trap vector (used for `TRAP`).
pub type TrapVect8 = Offset<u16, 8>;

/// A value representing either an immediate value or a register.
///
/// This is used to handle cases where an operand can be either
/// an immediate value or a register (e.g., in `and` or `add`).
///
/// ## Examples
/// ```text
/// and %r0 %r0 $0
/// and %r1 %r1 %r1
///             ~~~
/// add %r2 %r2 $2
///             ~~
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ImmOrReg<const N: u32> {
    #[allow(missing_docs)]
    Imm(IOffset<N>),
    #[allow(missing_docs)]
    Reg(Reg)
}
impl<const N: u32> std::fmt::Display for ImmOrReg<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImmOrReg::Imm(imm) => write!(f, "${imm}"),
            ImmOrReg::Reg(reg) => write!(f, "{reg}"),
        }
    }
}

/// A value representing an offset or an immediate value.
///
/// The `OFF` type represents the backing type of this offset.
/// The signedness of this offset type is dependent on the signedness of the `OFF` type:
/// - `Offset<i16, _>`: signed offset (also aliased as [`IOffset`])
/// - `Offset<u16, _>`: unsigned offset
///
/// `N` indicates the maximum bit size of this offset/immediate value.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct Offset<OFF, const N: u32>(OFF);

impl<OFF: std::fmt::Display, const N: u32> std::fmt::Display for Offset<OFF, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl<OFF: std::fmt::LowerHex, const N: u32> std::fmt::LowerHex for Offset<OFF, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// The errors that can result from calling [`Offset::new`].
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, thiserror::Error)]
pub enum OffsetNewErr {
    /// The provided offset cannot fit an unsigned integer of the given bitsize.
    #[error("value is too big for unsigned {0}-bit integer")]
    CannotFitUnsigned(u32),
    /// The provided offset cannot fit a signed integer of the given bitsize.
    #[error("value is too big for signed {0}-bit integer")]
    CannotFitSigned(u32)
}

impl crate::err::Error for OffsetNewErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        let error = match self {
            OffsetNewErr::CannotFitUnsigned(n) => format!("the range for an unsigned {n}-bit integer is [0, {}]", (1 << n) - 1),
            OffsetNewErr::CannotFitSigned(n) => format!("the range for a signed {n}-bit integer is [{}, {}]", (-1) << (n - 1), (1 << (n - 1)) - 1),
        };

        Some(error.into())
    }
}

mod offset_base {
    use super::OffsetNewErr;

    /// Any type that could store a value for [`Offset`].
    ///
    /// [`Offset`]: super::Offset
    pub trait OffsetBacking: Copy + Eq {
        /// How many bits are contained within this backing.
        const BITS: u32;

        /// Truncates the given value to the provided `bit_size`,
        /// extending it back out according to the signedness of the backing.
        fn truncate(self, bit_size: u32) -> Self;

        /// The error to raise if a given value doesn't match
        /// its provided value when truncated to a given `bit_size`.
        fn does_not_fit_error(bit_size: u32) -> OffsetNewErr;

        /// The raw bits of the lowest `bit_size` bits of this value.
        fn to_field(self, bit_size: u32) -> u16;
    }

    macro_rules! impl_offset_backing_for_ints {
        ($($Int:ty: $Err:ident),*) => {
            $(
                impl OffsetBacking for $Int {
                    const BITS: u32 = Self::BITS;

                    fn truncate(self, bit_size: u32) -> Self {
                        (self << (Self::BITS - bit_size)) >> (Self::BITS - bit_size)
                    }

                    fn does_not_fit_error(bit_size: u32) -> OffsetNewErr {
                        OffsetNewErr::$Err(bit_size)
                    }

                    fn to_field(self, bit_size: u32) -> u16 {
                        crate::bits::get_bits(self as u16, 0, bit_size)
                    }
                }
            )*
        }
    }
    impl_offset_backing_for_ints! {
        u16: CannotFitUnsigned,
        i16: CannotFitSigned
    }
}

impl<OFF: OffsetBacking, const N: u32> Offset<OFF, N> {
    /// Creates a new offset value.
    /// This must fit within `N` bits of the representation, otherwise an error is raised.
    ///
    /// # Examples
    ///
    /// ```
    /// # use x16::ast::Offset;
    /// #
    /// // Signed:
    /// let neg5 = Offset::<i16, 5>::new(-5);
    /// let pos15 = Offset::<i16, 5>::new(15);
    /// let pos16 = Offset::<i16, 5>::new(16);
    /// assert!(neg5.is_ok());
    /// assert!(pos15.is_ok());
    /// assert!(pos16.is_err());
    ///
    /// // Unsigned:
    /// let pos255 = Offset::<u16, 8>::new(255);
    /// let pos256 = Offset::<u16, 8>::new(256);
    /// assert!(pos255.is_ok());
    /// assert!(pos256.is_err());
    /// ```
    ///
    /// # Panics
    ///
    /// This will panic if `N` is larger than the offset backing (e.g., for backing `u16`, larger than 16).
    pub fn new(n: OFF) -> Result<Self, OffsetNewErr> {
        assert!(N <= OFF::BITS, "bit size {N} exceeds size of backing ({})", OFF::BITS);
        match n == n.truncate(N) {
            true  => Ok(Offset(n)),
            false => Err(OFF::does_not_fit_error(N)),
        }
    }

    /// Creates a new offset by extending the first N bits of the integer,
    /// and discarding the rest.
    ///
    /// The extension is considered sign-extended if the offset's backing is signed,
    /// and zero-extended if the offset's backing is unsigned.
    ///
    /// ```
    /// # use x16::ast::Offset;
    /// #
    /// assert_eq!(Offset::<i16, 5>::new_trunc(15).get(), 15);  // 0b01111
    /// assert_eq!(Offset::<i16, 5>::new_trunc(16).get(), -16); // 0b10000
    /// assert_eq!(Offset::<u16, 5>::new_trunc(32).get(), 0);   // 0b00000
    /// ```
    ///
    /// # Panics
    ///
    /// This will panic if `N` is larger than the offset backing (e.g., for backing `u16`, larger than 16).
    pub fn new_trunc(n: OFF) -> Self {
        assert!(N <= OFF::BITS, "bit size {N} exceeds size of backing ({})", OFF::BITS);
        Self(n.truncate(N))
    }

    /// Gets the value of the offset.
    pub fn get(&self) -> OFF {
        self.0
    }

    /// Gets the `N`-bit field that encodes this offset in an instruction word.
    pub fn to_field(&self) -> u16 {
        self.0.to_field(N)
    }
}

/// An offset or a label.
///
/// This is used to represent PC-relative operands
/// (such as the `PCoffset9` operand in `ld` and `st`
/// and the `PCoffset11` operand in `jsr`).
///
/// During the second assembly pass, the label is resolved and
/// replaced with a regular [`Offset`] value.
///
/// ## Examples
/// ```text
/// ld %r2 value
///        ~~~~~
/// brz end
///     ~~~
/// br -99
///    ~~~
/// jsr subroutine
///     ~~~~~~~~~~
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum PCOffset<OFF, const N: u32> {
    #[allow(missing_docs)]
    Offset(Offset<OFF, N>),
    #[allow(missing_docs)]
    Label(String)
}
impl<OFF, const N: u32> std::fmt::Display for PCOffset<OFF, N>
    where Offset<OFF, N>: std::fmt::Display
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PCOffset::Offset(off)  => write!(f, "{off}"),
            PCOffset::Label(label) => f.write_str(label),
        }
    }
}
