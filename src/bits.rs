//! Bit-level helpers over 16-bit machine words.
//!
//! These are used by both halves of the crate: the simulator uses them
//! to pull operand fields out of an instruction word, and the
//! instruction codec uses them to put those fields back.
//!
//! Bits are numbered from 0 (least significant) to 15 (most significant).
//!
//! ```
//! use x16::bits::{get_bits, sign_extend};
//!
//! // ADD %r1 %r2 $-1
//! let word = 0b0001_001_010_1_11111;
//! assert_eq!(get_bits(word, 9, 3), 1);
//! assert_eq!(sign_extend(get_bits(word, 0, 5), 5), 0xFFFF);
//! ```

/// Gets the `n`th bit of `word` (either 0 or 1).
pub fn get_bit(word: u16, n: u32) -> u16 {
    debug_assert!(n < 16, "bit {n} is out of range for a 16-bit word");
    (word >> n) & 1
}

/// Gets the `width`-bit wide unsigned field of `word` starting at bit `n`.
pub fn get_bits(word: u16, n: u32, width: u32) -> u16 {
    debug_assert!(n + width <= 16, "field [{n}, {}) is out of range for a 16-bit word", n + width);
    let mask = ((1u32 << width) - 1) as u16;
    word.checked_shr(n).unwrap_or(0) & mask
}

/// Sets the `n`th bit of `word` to 1.
pub fn set_bit(word: u16, n: u32) -> u16 {
    debug_assert!(n < 16, "bit {n} is out of range for a 16-bit word");
    word | (1 << n)
}

/// Clears the `n`th bit of `word` to 0.
pub fn clear_bit(word: u16, n: u32) -> u16 {
    debug_assert!(n < 16, "bit {n} is out of range for a 16-bit word");
    word & !(1 << n)
}

/// Reinterprets the low `bit_count` bits of `value` as a two's-complement
/// number and widens it to 16 bits.
///
/// Bits of `value` above `bit_count` are discarded.
///
/// ```
/// use x16::bits::sign_extend;
///
/// assert_eq!(sign_extend(0b11111, 5), 0xFFFF);
/// assert_eq!(sign_extend(0b01111, 5), 15);
/// assert_eq!(sign_extend(0b1_0000_0000, 9), 0xFF00);
/// ```
pub fn sign_extend(value: u16, bit_count: u32) -> u16 {
    debug_assert!((1..=16).contains(&bit_count), "cannot sign extend a {bit_count}-bit field");
    let shift = 16 - bit_count;
    (((value << shift) as i16) >> shift) as u16
}

/// Whether `word` is negative when read as a signed 16-bit number (bit 15 set).
pub fn is_negative(word: u16) -> bool {
    get_bit(word, 15) == 1
}

/// Whether `word` is non-negative when read as a signed 16-bit number (bit 15 clear).
///
/// Zero counts as positive here.
pub fn is_positive(word: u16) -> bool {
    get_bit(word, 15) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_bit() {
        let word = 0b1000_0000_0000_0101;
        assert_eq!(get_bit(word, 0), 1);
        assert_eq!(get_bit(word, 1), 0);
        assert_eq!(get_bit(word, 2), 1);
        assert_eq!(get_bit(word, 14), 0);
        assert_eq!(get_bit(word, 15), 1);
    }

    #[test]
    fn test_get_bits() {
        let word = 0xF025;
        assert_eq!(get_bits(word, 12, 4), 0xF);
        assert_eq!(get_bits(word, 0, 8), 0x25);
        assert_eq!(get_bits(word, 8, 4), 0x0);
        assert_eq!(get_bits(word, 0, 16), 0xF025);
        assert_eq!(get_bits(word, 16, 0), 0);
    }

    #[test]
    fn test_set_clear_bit() {
        assert_eq!(set_bit(0, 5), 0b10_0000);
        assert_eq!(set_bit(0b10_0000, 5), 0b10_0000);
        assert_eq!(set_bit(0x0FFF, 15), 0x8FFF);
        assert_eq!(clear_bit(0xFFFF, 15), 0x7FFF);
        assert_eq!(clear_bit(0xFFFF, 0), 0xFFFE);
        assert_eq!(clear_bit(0, 3), 0);
    }

    #[test]
    fn test_sign_extend() {
        // top bit set
        assert_eq!(sign_extend(0b11111, 5), 0xFFFF);
        assert_eq!(sign_extend(0b10000, 5), (-16i16) as u16);
        assert_eq!(sign_extend(0b1_1111_1101, 9), (-3i16) as u16);
        assert_eq!(sign_extend(0b100_0000_0000, 11), (-1024i16) as u16);
        // top bit clear
        assert_eq!(sign_extend(0b01111, 5), 15);
        assert_eq!(sign_extend(0b0_1111_1111, 9), 255);
        assert_eq!(sign_extend(0, 6), 0);
        // full width is the identity
        assert_eq!(sign_extend(0x8000, 16), 0x8000);
        // junk above the field is dropped
        assert_eq!(sign_extend(0b1110_0001, 5), 1);
    }

    #[test]
    fn test_sign_tests() {
        assert!(is_negative(0x8000));
        assert!(is_negative(0xFFFF));
        assert!(!is_negative(0x7FFF));
        assert!(is_positive(0));
        assert!(is_positive(0x7FFF));
        assert!(!is_positive(0x8000));
    }
}
