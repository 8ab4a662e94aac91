//! Tokenizing x16 assembly.
//!
//! This module holds the tokens that characterize x16 assembly ([`Token`]).
//! This module is used by the parser to facilitate the conversion of
//! a line of assembly source code into an AST.
//!
//! The module's key data structure is the [`Token`] enum,
//! which lists all of the tokens of x16 assembly.
//! Comments (`#` to the end of the line) never reach the lexer,
//! as they are removed by [`normalize_line`].
//!
//! [`normalize_line`]: crate::parse::normalize_line

use std::num::IntErrorKind;

use logos::{Lexer, Logos};

use crate::ast::{CondCode, Reg};

/// A unit of information in x16 source code.
#[derive(Debug, Logos, PartialEq, Eq, Clone)]
#[logos(skip r"[ \t\r\n\f]+", error = LexErr)]
pub enum Token {
    // These regexes span over tokens that are technically invalid
    // (e.g., 23trst matches for an integer even though it shouldn't).
    // The callback validates the whole unit.

    /// A bare integer (e.g., `9`, `-14`, `0x7F`).
    ///
    /// This is used for PC offsets, register offsets, and `val` literals.
    #[regex(r"-?\d\w*", |lx| lex_int(lx.slice()))]
    Int(i32),

    /// An immediate value, marked with a `$` (e.g., `$9`, `$-1`, `$0x1F`).
    #[regex(r"\$-?\w*", |lx| lex_int(&lx.slice()[1..]))]
    Imm(i32),

    /// A register (i.e., `%r0`-`%r7`).
    #[regex(r"%\w*", lex_reg)]
    Reg(Reg),

    /// An identifier.
    ///
    /// This can refer to either:
    /// - a label (e.g., `loop`, `end`, `_start`)
    /// - an instruction (e.g. `add`, `brnz`, `halt`)
    #[regex(r"[A-Za-z_]\w*", |lx| lex_ident(lx.slice()))]
    Ident(Ident),

    /// A colon, which ends a label definition.
    #[token(":")]
    Colon,

    /// A comma, which can optionally delineate operands of an instruction.
    #[token(",")]
    Comma,
}

macro_rules! ident_enum {
    ($($instr:ident),+) => {
        /// An identifier.
        ///
        /// This can refer to either:
        /// - a label (e.g., `loop`, `end`, `_start`)
        /// - an instruction (e.g. `add`, `brnz`, `halt`)
        ///
        /// Instruction names are case-insensitive, but labels are case-sensitive.
        #[derive(Debug, PartialEq, Eq, Clone)]
        pub enum Ident {
            $(
                #[allow(missing_docs)]
                $instr
            ),+,
            /// A branch mnemonic, holding its condition code.
            BR(CondCode),
            #[allow(missing_docs)]
            Label(String)
        }

        impl Ident {
            fn keyword(upper: &str) -> Option<Self> {
                match upper {
                    $(stringify!($instr) => Some(Self::$instr)),*,
                    _ => None
                }
            }
        }

        impl std::fmt::Display for Ident {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$instr => f.write_str(stringify!($instr))),*,
                    Self::BR(cc) => {
                        f.write_str("BR")?;
                        for (bit, c) in [(0b100, "N"), (0b010, "Z"), (0b001, "P")] {
                            if cc & bit != 0 {
                                f.write_str(c)?;
                            }
                        }
                        Ok(())
                    },
                    Self::Label(id) => f.write_str(id)
                }
            }
        }
    };
}
ident_enum! {
    ADD, AND, NOT, JMP, RET, JSR, JSSR, JSRR,
    LD, LDI, LDR, LEA, ST, STI, STR, VAL,
    GETC, PUTC, OUT, PUTS, ENTER, IN, PUTSP, HALT
}

/// Reads a branch mnemonic (`br` followed by any arrangement of `n`, `z`, `p`).
fn lex_branch(upper: &str) -> Option<CondCode> {
    let suffix = upper.strip_prefix("BR")?;
    let mut cc = 0;
    for c in suffix.chars() {
        let bit = match c {
            'N' => 0b100,
            'Z' => 0b010,
            'P' => 0b001,
            _ => return None,
        };
        if cc & bit != 0 {
            return None;
        }
        cc |= bit;
    }
    Some(cc)
}

fn lex_ident(slice: &str) -> Ident {
    let upper = slice.to_uppercase();
    Ident::keyword(&upper)
        .or_else(|| lex_branch(&upper).map(Ident::BR))
        .unwrap_or_else(|| Ident::Label(slice.to_string()))
}

/// Any errors raised in attempting to tokenize an input stream.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, thiserror::Error)]
pub enum LexErr {
    /// Numeric literal does not fit in a 16-bit word (signed or unsigned).
    #[error("numeric token does not fit in a 16-bit word")]
    DoesNotFit,
    /// Hex literal (starting with 0x) has invalid hex digits.
    #[error("invalid hex literal")]
    InvalidHex,
    /// Hex literal (starting with 0x) doesn't have digits after it.
    #[error("invalid hex literal")]
    InvalidHexEmpty,
    /// Numeric literal could not be parsed as a decimal literal because it has invalid digits (i.e., not 0-9).
    #[error("invalid decimal literal")]
    InvalidNumeric,
    /// Numeric literal has no digits in it (it's just `$` or `$-`).
    #[error("invalid decimal literal")]
    InvalidDecEmpty,
    /// Token had the format `%\w*`, but it isn't `%r0`-`%r7`.
    #[error("invalid register")]
    InvalidReg,
    /// A symbol was used which is not allowed in x16 assembly files.
    #[default]
    #[error("unrecognized symbol")]
    InvalidSymbol
}
impl crate::err::Error for LexErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self {
            LexErr::DoesNotFit      => Some(format!("the range for a 16-bit word is [{}, {}]", i16::MIN, u16::MAX).into()),
            LexErr::InvalidHex      => Some("a hex literal starts with '0x' and consists of 0-9, A-F".into()),
            LexErr::InvalidHexEmpty => Some("there should be hex digits (0-9, A-F) here".into()),
            LexErr::InvalidNumeric  => Some("a decimal literal only consists of digits 0-9".into()),
            LexErr::InvalidDecEmpty => Some("there should be digits (0-9) here".into()),
            LexErr::InvalidReg      => Some("this must be %r0-%r7".into()),
            LexErr::InvalidSymbol   => Some("this char does not occur in any token in x16 assembly".into()),
        }
    }
}

/// Parses a decimal or `0x` hex literal with an optional leading minus sign.
///
/// The result must fit in a 16-bit word, read either as signed or as unsigned.
fn lex_int(src: &str) -> Result<i32, LexErr> {
    let (negative, digits) = match src.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, src),
    };

    let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16)
            .map_err(|e| convert_int_error(e.kind(), LexErr::InvalidHex, LexErr::InvalidHexEmpty)),
        None => digits.parse::<u32>()
            .map_err(|e| convert_int_error(e.kind(), LexErr::InvalidNumeric, LexErr::InvalidDecEmpty)),
    }?;

    let value = match negative {
        true  => -i64::from(magnitude),
        false => i64::from(magnitude),
    };
    match (i64::from(i16::MIN)..=i64::from(u16::MAX)).contains(&value) {
        // in range, so this cannot truncate
        true  => Ok(value as i32),
        false => Err(LexErr::DoesNotFit),
    }
}
/// Helper that converts an int error kind to its corresponding LexErr.
fn convert_int_error(e: &IntErrorKind, invalid_digits_err: LexErr, empty_err: LexErr) -> LexErr {
    match e {
        IntErrorKind::Empty        => empty_err,
        IntErrorKind::PosOverflow  => LexErr::DoesNotFit,
        IntErrorKind::NegOverflow  => LexErr::DoesNotFit,
        _ => invalid_digits_err,
    }
}
fn lex_reg(lx: &Lexer<'_, Token>) -> Result<Reg, LexErr> {
    lx.slice()[1..]
        .strip_prefix(['r', 'R'])
        .and_then(|n| n.parse::<u8>().ok())
        .and_then(|n| Reg::try_from(n).ok())
        .ok_or(LexErr::InvalidReg)
}

#[cfg(test)]
mod tests {
    use logos::Logos;
    use pretty_assertions::assert_eq;

    use crate::ast::reg_consts::{R0, R7};
    use crate::err::LexErr;
    use crate::parse::lex::{Ident, Token};

    fn label(s: &str) -> Token {
        Token::Ident(Ident::Label(s.to_string()))
    }
    fn lex_all(s: &str) -> Result<Vec<Token>, LexErr> {
        Token::lexer(s).collect()
    }

    #[test]
    fn test_numeric_dec() {
        assert_eq!(lex_all("0 123 -456 65535 -32768"), Ok(vec![
            Token::Int(0),
            Token::Int(123),
            Token::Int(-456),
            Token::Int(65535),
            Token::Int(-32768),
        ]));

        assert_eq!(Token::lexer("65536").next(), Some(Err(LexErr::DoesNotFit)));
        assert_eq!(Token::lexer("-32769").next(), Some(Err(LexErr::DoesNotFit)));
        assert_eq!(Token::lexer("99999999999999999999").next(), Some(Err(LexErr::DoesNotFit)));
        assert_eq!(Token::lexer("3Q").next(), Some(Err(LexErr::InvalidNumeric)));
    }

    #[test]
    fn test_numeric_hex() {
        assert_eq!(lex_all("0x3000 0XFFFF 0xa -0x10"), Ok(vec![
            Token::Int(0x3000),
            Token::Int(0xFFFF),
            Token::Int(0xA),
            Token::Int(-0x10),
        ]));

        assert_eq!(Token::lexer("0x10000").next(), Some(Err(LexErr::DoesNotFit)));
        assert_eq!(Token::lexer("0x").next(), Some(Err(LexErr::InvalidHexEmpty)));
        assert_eq!(Token::lexer("0xQ").next(), Some(Err(LexErr::InvalidHex)));
    }

    #[test]
    fn test_immediates() {
        assert_eq!(lex_all("$0 $15 $-16 $0x1F"), Ok(vec![
            Token::Imm(0),
            Token::Imm(15),
            Token::Imm(-16),
            Token::Imm(0x1F),
        ]));

        assert_eq!(Token::lexer("$").next(), Some(Err(LexErr::InvalidDecEmpty)));
        assert_eq!(Token::lexer("$-").next(), Some(Err(LexErr::InvalidDecEmpty)));
        assert_eq!(Token::lexer("$abc").next(), Some(Err(LexErr::InvalidNumeric)));
    }

    #[test]
    fn test_regs() {
        let regs: Vec<_> = (0..8).map(|n| format!("%r{n}")).collect();
        let tokens = lex_all(&regs.join(" ")).unwrap();
        assert_eq!(tokens.len(), 8);
        assert_eq!(tokens[0], Token::Reg(R0));
        assert_eq!(tokens[7], Token::Reg(R7));
        assert_eq!(Token::lexer("%R7").next(), Some(Ok(Token::Reg(R7))));

        assert_eq!(Token::lexer("%r8").next(), Some(Err(LexErr::InvalidReg)));
        assert_eq!(Token::lexer("%r99999").next(), Some(Err(LexErr::InvalidReg)));
        assert_eq!(Token::lexer("%x1").next(), Some(Err(LexErr::InvalidReg)));
        assert_eq!(Token::lexer("%").next(), Some(Err(LexErr::InvalidReg)));
        // registers need the % sigil
        assert_eq!(Token::lexer("r1").next(), Some(Ok(label("r1"))));
    }

    #[test]
    fn test_keywords_labels() {
        let kws = "add and not jmp ret jsr jssr jsrr ld ldi ldr lea st sti str val \
                   getc putc out puts enter in putsp halt";
        for m_token in Token::lexer(kws) {
            let token = m_token.unwrap();
            assert!(
                matches!(token, Token::Ident(_)) & !matches!(token, Token::Ident(Ident::Label(_))),
                "Expected {token:?} to be keyword"
            );
        }

        // Case insensitivity
        assert_eq!(lex_all("ADD Add aDd add"), Ok(vec![Token::Ident(Ident::ADD); 4]));

        // Labels keep their case
        assert_eq!(lex_all("Loop loop _x1"), Ok(vec![label("Loop"), label("loop"), label("_x1")]));
    }

    #[test]
    fn test_branches() {
        assert_eq!(lex_all("br brn brz brp brnz brzp brnp brnzp"), Ok(vec![
            Token::Ident(Ident::BR(0b000)),
            Token::Ident(Ident::BR(0b100)),
            Token::Ident(Ident::BR(0b010)),
            Token::Ident(Ident::BR(0b001)),
            Token::Ident(Ident::BR(0b110)),
            Token::Ident(Ident::BR(0b011)),
            Token::Ident(Ident::BR(0b101)),
            Token::Ident(Ident::BR(0b111)),
        ]));

        // any order is fine
        assert_eq!(lex_all("brpzn BRZN"), Ok(vec![
            Token::Ident(Ident::BR(0b111)),
            Token::Ident(Ident::BR(0b110)),
        ]));

        // repeated letters or other letters are not branches
        assert_eq!(lex_all("brnn brx"), Ok(vec![label("brnn"), label("brx")]));
        assert_eq!(Ident::BR(0b101).to_string(), "BRNP");
    }

    #[test]
    fn test_punct() {
        assert_eq!(lex_all("loop: add %r0, %r0, $1"), Ok(vec![
            label("loop"),
            Token::Colon,
            Token::Ident(Ident::ADD),
            Token::Reg(R0),
            Token::Comma,
            Token::Reg(R0),
            Token::Comma,
            Token::Imm(1),
        ]));
    }

    #[test]
    fn test_invalid_symbol() {
        for c in ['!', '@', '&', '*', '(', ')', '+', '=', '[', ']', ';', '.', '"', '/', '?', '#'] {
            let string = c.to_string();
            assert_eq!(
                Token::lexer(&string).next(),
                Some(Err(LexErr::InvalidSymbol)),
                "Expected {string:?} to be an invalid symbol"
            );
        }
    }
}
