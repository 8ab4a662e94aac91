//! Formatters which can read and write object files to disk.
//!
//! The [`ObjFileFormat`] trait describes an implementation of reading/writing object files.
//! This module provides two implementations of the trait:
//! - [`BinaryFormat`]: the binary image the simulator loads
//! - [`TextFormat`]: a human-readable hex listing of the same data

use std::fmt::Write;

use super::ObjectFile;

/// A trait defining object file formats.
pub trait ObjFileFormat {
    /// Representation of the serialized format.
    ///
    /// For binary formats, `[u8]` should be used.
    /// For text-based formats,`str` should be used.
    type Stream: ToOwned + ?Sized;
    /// Serializes into the stream format.
    fn serialize(o: &ObjectFile) -> <Self::Stream as ToOwned>::Owned;
    /// Deserializes from the stream format, returning `None`
    /// if an error occurred during deserialization.
    fn deserialize(i: &Self::Stream) -> Option<ObjectFile>;
}

// BINARY!
/// The binary image format.
///
/// The image is a sequence of big-endian 16-bit words.
/// The first word is the origin address, and every following word
/// is loaded into memory starting at that origin.
///
/// ```
/// use x16::asm::ObjectFile;
/// use x16::asm::encoding::{BinaryFormat, ObjFileFormat};
///
/// let obj = ObjectFile::new(0x3000, vec![0xF025]);
/// assert_eq!(BinaryFormat::serialize(&obj), [0x30, 0x00, 0xF0, 0x25]);
/// ```
pub struct BinaryFormat;

impl ObjFileFormat for BinaryFormat {
    type Stream = [u8];

    fn serialize(o: &ObjectFile) -> <Self::Stream as ToOwned>::Owned {
        std::iter::once(o.origin())
            .chain(o.words().iter().copied())
            .flat_map(u16::to_be_bytes)
            .collect()
    }

    fn deserialize(bytes: &Self::Stream) -> Option<ObjectFile> {
        if bytes.len() % 2 != 0 { return None; }

        let mut words = bytes.chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]));
        let origin = words.next()?;
        let words: Vec<_> = words.collect();

        fits_in_memory(origin, &words)
            .then(|| ObjectFile::new(origin, words))
    }
}

/// Whether a block of words starting at `origin` stays within the address space.
fn fits_in_memory(origin: u16, words: &[u16]) -> bool {
    usize::from(origin) + words.len() <= 1 << 16
}

// TEXT!
/// A text-based format of object file data.
///
/// ```text
/// X16 OBJ FILE
/// 3000
/// 1283
/// F025
/// ```
///
/// The first line is the header, followed by the origin address in hex,
/// followed by one word in hex per line.
/// Blank lines and comments (starting with `//`) are ignored.
pub struct TextFormat;
impl TextFormat {
    /// The line every text object file starts with.
    pub const HEADER: &'static str = "X16 OBJ FILE";
}

impl ObjFileFormat for TextFormat {
    type Stream = str;

    fn serialize(o: &ObjectFile) -> <Self::Stream as ToOwned>::Owned {
        let mut buf = String::new();

        // Writing into a String cannot fail.
        let _ = writeln!(buf, "{}", Self::HEADER);
        let _ = writeln!(buf, "{:04X}", o.origin());
        for word in o.words() {
            let _ = writeln!(buf, "{word:04X}");
        }

        buf
    }

    fn deserialize(string: &Self::Stream) -> Option<ObjectFile> {
        let mut lines = string.lines()
            .map(|l| match l.split_once("//") {
                Some((data, _)) => data.trim(),
                None => l.trim(),
            })
            .filter(|l| !l.is_empty());

        if lines.next()? != Self::HEADER { return None; }
        let origin = u16::from_str_radix(lines.next()?, 16).ok()?;
        let words = lines
            .map(|l| u16::from_str_radix(l, 16).ok())
            .collect::<Option<Vec<_>>>()?;

        fits_in_memory(origin, &words)
            .then(|| ObjectFile::new(origin, words))
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use crate::asm::{assemble, ObjectFile};

    use super::{BinaryFormat, ObjFileFormat, TextFormat};

    fn sample() -> ObjectFile {
        assemble(indoc! {"
            loop: add %r0 %r0 $1
                  br loop
                  halt
        "}).unwrap()
    }

    #[test]
    fn test_binary_layout() {
        let bytes = BinaryFormat::serialize(&sample());
        assert_eq!(bytes, [0x30, 0x00, 0x10, 0x21, 0x01, 0xFE, 0xF0, 0x25]);
        assert_eq!(BinaryFormat::deserialize(&bytes), Some(sample()));
    }

    #[test]
    fn test_binary_rejects_malformed() {
        assert_eq!(BinaryFormat::deserialize(&[]), None);
        assert_eq!(BinaryFormat::deserialize(&[0x30, 0x00, 0xF0]), None);
        // origin alone is an empty program
        assert_eq!(BinaryFormat::deserialize(&[0x30, 0x00]), Some(ObjectFile::new(0x3000, vec![])));
        // runs off the end of memory
        assert_eq!(BinaryFormat::deserialize(&[0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00]), None);
    }

    #[test]
    fn test_text_layout() {
        let text = TextFormat::serialize(&sample());
        assert_eq!(text, "X16 OBJ FILE\n3000\n1021\n01FE\nF025\n");
        assert_eq!(TextFormat::deserialize(&text), Some(sample()));
    }

    #[test]
    fn test_text_comments() {
        let text = indoc! {"
            // hand-written program
            X16 OBJ FILE
            3000    // origin

            F025    // halt
        "};
        assert_eq!(TextFormat::deserialize(text), Some(ObjectFile::new(0x3000, vec![0xF025])));

        assert_eq!(TextFormat::deserialize(""), None);
        assert_eq!(TextFormat::deserialize("OBJ FILE\n3000\n"), None);
        assert_eq!(TextFormat::deserialize("X16 OBJ FILE\n3000\nZZZZ\n"), None);
    }

    #[test]
    fn test_formats_agree() {
        let obj = sample();
        let from_text = TextFormat::deserialize(&TextFormat::serialize(&obj)).unwrap();
        assert_eq!(BinaryFormat::serialize(&from_text), BinaryFormat::serialize(&obj));
    }
}
