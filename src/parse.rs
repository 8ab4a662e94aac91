//! Parsing assembly source code into an AST.
//!
//! x16 assembly is line oriented: every line holds at most one label
//! definition and at most one instruction or directive.
//! Each line is first cleaned with [`normalize_line`], then split into
//! its label and its nucleus, which is lexed with [`lex::Token`]
//! and parsed into a [`Stmt`].
//!
//! ```
//! use x16::parse::parse_line;
//!
//! let stmt = parse_line("loop: add %r0, %r0, $1").unwrap();
//! assert_eq!(stmt.label.as_deref(), Some("loop"));
//! assert!(stmt.nucleus.is_some());
//! ```

pub mod lex;

use logos::Logos;

use crate::ast::asm::{AsmInstr, Directive, Stmt, StmtKind};
use crate::ast::{IOffset, ImmOrReg, OffsetNewErr, PCOffset, Reg};
use crate::err::Error as _;
use lex::{Ident, LexErr, Token};

/// Removes the comment and surrounding whitespace from a raw source line.
///
/// A comment starts at the first `#` and runs to the end of the line.
/// This function is idempotent.
///
/// ```
/// # use x16::parse::normalize_line;
/// assert_eq!(normalize_line("  add %r1 %r2 %r3   # sum\r\n"), "add %r1 %r2 %r3");
/// assert_eq!(normalize_line("# just a comment"), "");
/// ```
pub fn normalize_line(raw: &str) -> &str {
    let code = match raw.split_once('#') {
        Some((code, _comment)) => code,
        None => raw,
    };
    code.trim()
}

/// Splits a normalized line into its label definition (if any) and the remaining text.
///
/// The label is the text before the first colon.
/// It is not validated here (see [`is_label`]).
pub fn split_label(line: &str) -> (Option<&str>, &str) {
    match line.split_once(':') {
        Some((label, rest)) => (Some(label.trim()), rest.trim()),
        None => (None, line),
    }
}

/// Whether `name` can be used as a label.
///
/// Labels are identifiers (`[A-Za-z_][A-Za-z0-9_]*`) that are not instruction names.
pub fn is_label(name: &str) -> bool {
    let mut tokens = Token::lexer(name);
    matches!(
        (tokens.next(), tokens.next()),
        (Some(Ok(Token::Ident(Ident::Label(_)))), None)
    )
}

/// Any error raised while parsing a line.
#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
pub enum ParseErr {
    /// The line could not be tokenized.
    #[error("{1}: '{0}'")]
    Lex(String, LexErr),
    /// The line did not start with an instruction or directive.
    #[error("unknown instruction '{0}'")]
    UnknownMnemonic(String),
    /// An operand was missing or had the wrong kind.
    #[error("'{mnemonic}' expected {expected}")]
    ExpectedOperand {
        /// The instruction being parsed.
        mnemonic: String,
        /// What kind of operand was expected.
        expected: &'static str
    },
    /// There was more on the line after the instruction's operands.
    #[error("unexpected '{0}' after instruction")]
    UnexpectedToken(String),
    /// A label definition was not a valid label.
    #[error("'{0}' is not a valid label")]
    InvalidLabel(String),
    /// A numeric operand did not fit in its field.
    #[error(transparent)]
    Offset(#[from] OffsetNewErr),
}
impl crate::err::Error for ParseErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self {
            ParseErr::Lex(_, e) => e.help(),
            ParseErr::UnknownMnemonic(_) => Some("lines must start with an instruction, 'val', or a label followed by ':'".into()),
            ParseErr::ExpectedOperand { .. } => Some("registers are written %r0-%r7 and immediates are written with '$'".into()),
            ParseErr::UnexpectedToken(_) => Some("remove the extra operand, or start a comment with '#'".into()),
            ParseErr::InvalidLabel(_) => Some("labels are made of letters, digits, and '_', do not start with a digit, and cannot be instruction names".into()),
            ParseErr::Offset(e) => e.help(),
        }
    }
}

/// Parses a normalized line into a statement.
///
/// Blank lines produce a [`Stmt`] with neither label nor nucleus.
pub fn parse_line(line: &str) -> Result<Stmt, ParseErr> {
    let (label, rest) = split_label(line);
    let label = match label {
        Some(l) if is_label(l) => Some(l.to_string()),
        Some(l) => return Err(ParseErr::InvalidLabel(l.to_string())),
        None => None,
    };
    let nucleus = match rest.is_empty() {
        true  => None,
        false => Some(parse_nucleus(rest)?),
    };

    Ok(Stmt { label, nucleus })
}

/// Parses the instruction or directive part of a line (everything after the label).
pub fn parse_nucleus(text: &str) -> Result<StmtKind, ParseErr> {
    let mut tokens = vec![];
    let mut lexer = Token::lexer(text);
    while let Some(result) = lexer.next() {
        match result {
            // commas are optional separators
            Ok(Token::Comma) => {},
            Ok(token) => tokens.push((token, lexer.slice())),
            Err(e) => return Err(ParseErr::Lex(lexer.slice().to_string(), e)),
        }
    }

    let mut parser = Parser { tokens: tokens.into_iter(), mnemonic: String::new() };
    let stmt = parser.parse_stmt()?;
    parser.finish()?;
    Ok(stmt)
}

/// A parser over the tokens of one line.
struct Parser<'s> {
    tokens: std::vec::IntoIter<(Token, &'s str)>,
    mnemonic: String,
}
impl Parser<'_> {
    fn expected(&self, expected: &'static str) -> ParseErr {
        ParseErr::ExpectedOperand { mnemonic: self.mnemonic.clone(), expected }
    }

    fn reg(&mut self) -> Result<Reg, ParseErr> {
        match self.tokens.next() {
            Some((Token::Reg(r), _)) => Ok(r),
            _ => Err(self.expected("a register")),
        }
    }

    fn imm_or_reg<const N: u32>(&mut self) -> Result<ImmOrReg<N>, ParseErr> {
        match self.tokens.next() {
            Some((Token::Reg(r), _)) => Ok(ImmOrReg::Reg(r)),
            Some((Token::Imm(n), _)) => Ok(ImmOrReg::Imm(signed_offset(n)?)),
            _ => Err(self.expected("a register or an immediate")),
        }
    }

    fn pc_offset<const N: u32>(&mut self) -> Result<PCOffset<i16, N>, ParseErr> {
        match self.tokens.next() {
            Some((Token::Int(n), _)) => Ok(PCOffset::Offset(signed_offset(n)?)),
            Some((Token::Ident(Ident::Label(l)), _)) => Ok(PCOffset::Label(l)),
            _ => Err(self.expected("an offset or a label")),
        }
    }

    fn reg_offset<const N: u32>(&mut self) -> Result<IOffset<N>, ParseErr> {
        match self.tokens.next() {
            Some((Token::Int(n) | Token::Imm(n), _)) => Ok(signed_offset(n)?),
            _ => Err(self.expected("an offset")),
        }
    }

    fn word(&mut self) -> Result<u16, ParseErr> {
        match self.tokens.next() {
            // the lexer keeps literals within [i16::MIN, u16::MAX],
            // so negative values wrap to their two's complement
            Some((Token::Int(n) | Token::Imm(n), _)) => Ok(n as u16),
            _ => Err(self.expected("a value")),
        }
    }

    fn parse_stmt(&mut self) -> Result<StmtKind, ParseErr> {
        let ident = match self.tokens.next() {
            Some((Token::Ident(ident), slice)) => {
                self.mnemonic = slice.to_string();
                ident
            },
            Some((_, slice)) => return Err(ParseErr::UnknownMnemonic(slice.to_string())),
            None => return Err(ParseErr::UnknownMnemonic(String::new())),
        };

        let instr = match ident {
            Ident::ADD   => AsmInstr::ADD(self.reg()?, self.reg()?, self.imm_or_reg()?),
            Ident::AND   => AsmInstr::AND(self.reg()?, self.reg()?, self.imm_or_reg()?),
            Ident::NOT   => AsmInstr::NOT(self.reg()?, self.reg()?),
            Ident::BR(cc) => AsmInstr::BR(cc, self.pc_offset()?),
            Ident::JMP   => AsmInstr::JMP(self.reg()?),
            Ident::RET   => AsmInstr::RET,
            Ident::JSR   => AsmInstr::JSR(self.pc_offset()?),
            Ident::JSSR | Ident::JSRR => AsmInstr::JSRR(self.reg()?),
            Ident::LD    => AsmInstr::LD(self.reg()?, self.pc_offset()?),
            Ident::LDI   => AsmInstr::LDI(self.reg()?, self.pc_offset()?),
            Ident::LEA   => AsmInstr::LEA(self.reg()?, self.pc_offset()?),
            Ident::ST    => AsmInstr::ST(self.reg()?, self.pc_offset()?),
            Ident::STI   => AsmInstr::STI(self.reg()?, self.pc_offset()?),
            Ident::LDR   => AsmInstr::LDR(self.reg()?, self.reg()?, self.reg_offset()?),
            Ident::STR   => AsmInstr::STR(self.reg()?, self.reg()?, self.reg_offset()?),
            Ident::GETC  => AsmInstr::GETC,
            Ident::PUTC | Ident::OUT => AsmInstr::PUTC,
            Ident::PUTS  => AsmInstr::PUTS,
            Ident::ENTER | Ident::IN => AsmInstr::ENTER,
            Ident::PUTSP => AsmInstr::PUTSP,
            Ident::HALT  => AsmInstr::HALT,
            Ident::VAL   => return Ok(StmtKind::Directive(Directive::Val(self.word()?))),
            Ident::Label(l) => return Err(ParseErr::UnknownMnemonic(l)),
        };

        Ok(StmtKind::Instr(instr))
    }

    fn finish(&mut self) -> Result<(), ParseErr> {
        match self.tokens.next() {
            Some((_, slice)) => Err(ParseErr::UnexpectedToken(slice.to_string())),
            None => Ok(()),
        }
    }
}

fn signed_offset<const N: u32>(n: i32) -> Result<IOffset<N>, OffsetNewErr> {
    let n = i16::try_from(n).map_err(|_| OffsetNewErr::CannotFitSigned(N))?;
    IOffset::new(n)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::ast::asm::{AsmInstr, Directive, Stmt, StmtKind};
    use crate::ast::reg_consts::{R0, R1, R2, R3, R6, R7};
    use crate::ast::{IOffset, ImmOrReg, OffsetNewErr, PCOffset};
    use crate::parse::lex::LexErr;

    use super::{is_label, normalize_line, parse_line, split_label, ParseErr};

    fn instr(line: &str) -> AsmInstr {
        match parse_line(line) {
            Ok(Stmt { label: None, nucleus: Some(StmtKind::Instr(i)) }) => i,
            r => panic!("expected {line:?} to parse as a bare instruction, got {r:?}"),
        }
    }
    fn label(s: &str) -> PCOffset<i16, 9> {
        PCOffset::Label(s.to_string())
    }

    #[test]
    fn test_normalize_line() {
        assert_eq!(normalize_line(""), "");
        assert_eq!(normalize_line("   \t\r\n"), "");
        assert_eq!(normalize_line("halt"), "halt");
        assert_eq!(normalize_line("\thalt  # stop here # really"), "halt");
        assert_eq!(normalize_line("#halt"), "");

        let once = normalize_line("  loop: br loop  # forever \n");
        assert_eq!(once, "loop: br loop");
        assert_eq!(normalize_line(once), once);
    }

    #[test]
    fn test_split_label() {
        assert_eq!(split_label("loop: add %r0 %r0 $1"), (Some("loop"), "add %r0 %r0 $1"));
        assert_eq!(split_label("end:"), (Some("end"), ""));
        assert_eq!(split_label("halt"), (None, "halt"));

        assert!(is_label("loop"));
        assert!(is_label("_L1"));
        assert!(!is_label("1abc"));
        assert!(!is_label("add"));
        assert!(!is_label("BRnz"));
        assert!(!is_label("two words"));
        assert!(!is_label(""));
    }

    #[test]
    fn test_parse_instrs() {
        assert_eq!(instr("add %r1 %r2 %r3"), AsmInstr::ADD(R1, R2, ImmOrReg::Reg(R3)));
        assert_eq!(instr("add %r1, %r2, $-1"), AsmInstr::ADD(R1, R2, ImmOrReg::Imm(IOffset::new_trunc(-1))));
        assert_eq!(instr("AND %r0 %r0 $0"), AsmInstr::AND(R0, R0, ImmOrReg::Imm(IOffset::new_trunc(0))));
        assert_eq!(instr("not %r1 %r2"), AsmInstr::NOT(R1, R2));
        assert_eq!(instr("brnz loop"), AsmInstr::BR(0b110, label("loop")));
        assert_eq!(instr("br -3"), AsmInstr::BR(0b000, PCOffset::Offset(IOffset::new_trunc(-3))));
        assert_eq!(instr("jmp %r6"), AsmInstr::JMP(R6));
        assert_eq!(instr("ret"), AsmInstr::RET);
        assert_eq!(instr("jsr sub"), AsmInstr::JSR(PCOffset::Label("sub".to_string())));
        assert_eq!(instr("jssr %r3"), AsmInstr::JSRR(R3));
        assert_eq!(instr("jsrr %r3"), AsmInstr::JSRR(R3));
        assert_eq!(instr("ld %r0 value"), AsmInstr::LD(R0, label("value")));
        assert_eq!(instr("ldi %r0 value"), AsmInstr::LDI(R0, label("value")));
        assert_eq!(instr("lea %r0 0x10"), AsmInstr::LEA(R0, PCOffset::Offset(IOffset::new_trunc(16))));
        assert_eq!(instr("st %r7 value"), AsmInstr::ST(R7, label("value")));
        assert_eq!(instr("sti %r7 value"), AsmInstr::STI(R7, label("value")));
        assert_eq!(instr("ldr %r0 %r6 $-2"), AsmInstr::LDR(R0, R6, IOffset::new_trunc(-2)));
        assert_eq!(instr("str %r0 %r6 3"), AsmInstr::STR(R0, R6, IOffset::new_trunc(3)));
        assert_eq!(instr("getc"), AsmInstr::GETC);
        assert_eq!(instr("out"), AsmInstr::PUTC);
        assert_eq!(instr("putc"), AsmInstr::PUTC);
        assert_eq!(instr("puts"), AsmInstr::PUTS);
        assert_eq!(instr("in"), AsmInstr::ENTER);
        assert_eq!(instr("enter"), AsmInstr::ENTER);
        assert_eq!(instr("putsp"), AsmInstr::PUTSP);
        assert_eq!(instr("HALT"), AsmInstr::HALT);
    }

    #[test]
    fn test_parse_labels_and_vals() {
        assert_eq!(parse_line(""), Ok(Stmt { label: None, nucleus: None }));
        assert_eq!(parse_line("end:"), Ok(Stmt { label: Some("end".to_string()), nucleus: None }));
        assert_eq!(parse_line("loop: halt"), Ok(Stmt {
            label: Some("loop".to_string()),
            nucleus: Some(StmtKind::Instr(AsmInstr::HALT)),
        }));
        assert_eq!(parse_line("val $-1"), Ok(Stmt {
            label: None,
            nucleus: Some(StmtKind::Directive(Directive::Val(0xFFFF))),
        }));
        assert_eq!(parse_line("msg: val 0x48"), Ok(Stmt {
            label: Some("msg".to_string()),
            nucleus: Some(StmtKind::Directive(Directive::Val(0x48))),
        }));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_line("add: halt"), Err(ParseErr::InvalidLabel("add".to_string())));
        assert_eq!(parse_line("9lives: halt"), Err(ParseErr::InvalidLabel("9lives".to_string())));
        assert_eq!(parse_line("frobnicate %r1"), Err(ParseErr::UnknownMnemonic("frobnicate".to_string())));
        assert_eq!(parse_line("%r1 %r2"), Err(ParseErr::UnknownMnemonic("%r1".to_string())));
        assert_eq!(parse_line("add %r1 %r2"), Err(ParseErr::ExpectedOperand {
            mnemonic: "add".to_string(),
            expected: "a register or an immediate",
        }));
        // immediates need their sigil
        assert!(matches!(parse_line("add %r1 %r2 5"), Err(ParseErr::ExpectedOperand { .. })));
        assert_eq!(parse_line("halt %r0"), Err(ParseErr::UnexpectedToken("%r0".to_string())));
        assert_eq!(parse_line("add %r8 %r1 %r2"), Err(ParseErr::Lex("%r8".to_string(), LexErr::InvalidReg)));
        assert_eq!(parse_line("add %r1 %r1 $16"), Err(ParseErr::Offset(OffsetNewErr::CannotFitSigned(5))));
        assert_eq!(parse_line("ldr %r1 %r1 $-33"), Err(ParseErr::Offset(OffsetNewErr::CannotFitSigned(6))));
        assert_eq!(parse_line("br 40000"), Err(ParseErr::Offset(OffsetNewErr::CannotFitSigned(9))));
    }
}
