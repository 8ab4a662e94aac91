//! Assembling x16 assembly source code into object files.
//!
//! This module is used to convert assembly source text into object files
//! that can be executed by the simulator.
//!
//! Assembly happens in two passes:
//! 1. Every line is normalized and parsed, and each label is recorded in the
//!    [`SymbolTable`] with the address of the line it is defined on.
//! 2. Every instruction has its label operands resolved and is encoded into a word.
//!
//! The assembler module notably consists of:
//! - [`assemble`], [`assemble_with`], and [`assemble_file`]: the main functions which assemble source into an object file.
//! - [`SymbolTable`]: a struct holding the symbol table, which stores location information for labels after the first assembler pass
//! - [`ObjectFile`]: a struct holding the object file, which can be loaded into the simulator and executed

pub mod encoding;

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::ast::asm::{Directive, StmtKind};
use crate::ast::OffsetNewErr;
use crate::parse::{normalize_line, parse_line, ParseErr};
use encoding::{BinaryFormat, ObjFileFormat};

/// The address the first word of every program is placed at.
pub const ORIGIN: u16 = 0x3000;

/// Assembles assembly source code into an object file,
/// using the default [`AsmLimits`].
///
/// # Example
/// ```
/// use x16::asm::assemble;
///
/// let src = "
///     loop: add %r0 %r0 $1   # count up
///           br loop
/// ";
/// let obj = assemble(src).unwrap();
/// assert_eq!(obj.origin(), 0x3000);
/// assert_eq!(obj.words(), [0x1021, 0x01FE]);
/// ```
pub fn assemble(src: &str) -> Result<ObjectFile, AsmErr> {
    assemble_with(src, AsmLimits::default())
}

/// Assembles assembly source code into an object file,
/// bounding the symbol table with the given limits.
#[tracing::instrument(skip_all, fields(lines = src.lines().count()))]
pub fn assemble_with(src: &str, limits: AsmLimits) -> Result<ObjectFile, AsmErr> {
    // PASS 1
    let mut sym = SymbolTable::new(limits);
    let mut stmts = vec![];
    // None once the program has filled the end of memory
    let mut lc = Some(ORIGIN);

    for (lno, raw) in (1..).zip(src.lines()) {
        let line = normalize_line(raw);
        if line.is_empty() { continue; }

        let stmt = parse_line(line).map_err(|e| AsmErr::new(e, lno))?;
        let Some(addr) = lc else {
            return Err(AsmErr::new(AsmErrKind::ProgramTooLarge, lno));
        };

        if let Some(label) = &stmt.label {
            sym.insert(label, addr, lno).map_err(|e| AsmErr::new(e, lno))?;
            debug!(label = %label, addr = format_args!("x{addr:04X}"), "defined label");
        }
        if let Some(nucleus) = stmt.nucleus {
            stmts.push((lno, addr, nucleus));
            lc = addr.checked_add(1);
        }
    }
    debug!(symbols = sym.len(), words = stmts.len(), "finished pass 1");

    // PASS 2
    let mut words = Vec::with_capacity(stmts.len());
    for (lno, addr, nucleus) in stmts {
        let word = match nucleus {
            StmtKind::Instr(instr) => instr.into_sim_instr(addr, &sym)
                .map_err(|e| AsmErr::new(e, lno))?
                .encode(),
            StmtKind::Directive(Directive::Val(value)) => value,
        };
        trace!(addr = format_args!("x{addr:04X}"), word = format_args!("x{word:04X}"), "emitted word");
        words.push(word);
    }
    debug!(words = words.len(), "finished pass 2");

    Ok(ObjectFile::new(ORIGIN, words))
}

/// Assembles the source file at `input` and writes its binary image to `output`.
///
/// The object file is also returned.
pub fn assemble_file(input: &Path, output: &Path) -> Result<ObjectFile, AsmErr> {
    let src = std::fs::read_to_string(input)
        .map_err(|e| AsmErr::io(input, &e))?;
    let obj = assemble(&src)?;
    std::fs::write(output, BinaryFormat::serialize(&obj))
        .map_err(|e| AsmErr::io(output, &e))?;

    debug!(input = %input.display(), output = %output.display(), "wrote object file");
    Ok(obj)
}

/// Configurable bounds on the assembler's symbol table.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct AsmLimits {
    /// The maximum number of labels a program can define.
    pub max_symbols: usize,
    /// The maximum length of a label, in bytes.
    pub max_label_len: usize,
}
impl Default for AsmLimits {
    fn default() -> Self {
        Self { max_symbols: 10_000, max_label_len: 50 }
    }
}

/// Kinds of errors that can occur from assembling given assembly code.
///
/// See [`AsmErr`] for this error type with line information included.
#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
pub enum AsmErrKind {
    /// A line could not be parsed.
    #[error(transparent)]
    Parse(ParseErr),
    /// Label did not have an assigned address (pass 2).
    #[error("label '{0}' could not be found")]
    CouldNotFindLabel(String),
    /// An operand did not fit in its field.
    #[error(transparent)]
    OffsetNewErr(#[from] OffsetNewErr),
    /// There were multiple labels of the same name (pass 1).
    #[error("label '{label}' was already defined on line {first_line}")]
    DuplicateLabel {
        /// The label's name.
        label: String,
        /// The line the label was first defined on.
        first_line: usize
    },
    /// A label definition is not an identifier, or is an instruction name (pass 1).
    #[error("'{0}' is not a valid label")]
    InvalidLabel(String),
    /// A label is longer than [`AsmLimits::max_label_len`] (pass 1).
    #[error("label '{0}' is too long")]
    LabelTooLong(String),
    /// More labels were defined than [`AsmLimits::max_symbols`] (pass 1).
    #[error("too many labels")]
    SymbolTableFull,
    /// The program runs past the end of memory (pass 1).
    #[error("program does not fit in memory")]
    ProgramTooLarge,
    /// A file could not be read or written.
    #[error("could not access {}: {kind}", path.display())]
    Io {
        /// The file being accessed.
        path: PathBuf,
        /// What went wrong.
        kind: std::io::ErrorKind
    },
}
impl From<ParseErr> for AsmErrKind {
    fn from(value: ParseErr) -> Self {
        match value {
            ParseErr::Offset(e) => AsmErrKind::OffsetNewErr(e),
            ParseErr::InvalidLabel(l) => AsmErrKind::InvalidLabel(l),
            e => AsmErrKind::Parse(e),
        }
    }
}

/// Error from assembling given assembly code.
#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
#[error("{kind}")]
pub struct AsmErr {
    /// The kind of error.
    pub kind: AsmErrKind,
    /// The 1-based line in the source this error occurred on.
    pub line: Option<usize>
}
impl AsmErr {
    /// Creates a new [`AsmErr`] on the given line.
    pub fn new(kind: impl Into<AsmErrKind>, line: usize) -> Self {
        AsmErr { kind: kind.into(), line: Some(line) }
    }

    fn io(path: &Path, e: &std::io::Error) -> Self {
        let kind = AsmErrKind::Io { path: path.to_path_buf(), kind: e.kind() };
        AsmErr { kind, line: None }
    }
}
impl crate::err::Error for AsmErr {
    fn line(&self) -> Option<usize> {
        self.line
    }

    fn help(&self) -> Option<std::borrow::Cow<str>> {
        use crate::err::Error as _;

        match &self.kind {
            AsmErrKind::Parse(e)                => e.help(),
            AsmErrKind::CouldNotFindLabel(_)    => Some("define this label somewhere in the program".into()),
            AsmErrKind::OffsetNewErr(e)         => e.help(),
            AsmErrKind::DuplicateLabel { .. }   => Some("labels must be unique within a file, try renaming one of the labels".into()),
            AsmErrKind::InvalidLabel(_)         => Some("labels are made of letters, digits, and '_', do not start with a digit, and cannot be instruction names".into()),
            AsmErrKind::LabelTooLong(l)         => Some(format!("this label is {} bytes long, try shortening it", l.len()).into()),
            AsmErrKind::SymbolTableFull         => Some("try reusing labels or splitting the program".into()),
            AsmErrKind::ProgramTooLarge         => Some(format!("programs start at x{ORIGIN:04X} and cannot extend past xFFFF").into()),
            AsmErrKind::Io { .. }               => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
struct Symbol {
    label: String,
    addr: u16,
    line: usize,
}

/// The symbol table created in the first assembler pass,
/// mapping each label to the address it was defined at.
///
/// Labels are kept in the order they were defined in.
///
/// ## Example
/// ```
/// use x16::asm::{AsmLimits, SymbolTable};
///
/// let mut sym = SymbolTable::new(AsmLimits::default());
/// sym.insert("start", 0x3000, 1).unwrap();
/// sym.insert("end", 0x3004, 6).unwrap();
///
/// assert_eq!(sym.find("end"), Some(0x3004));
/// assert_eq!(sym.find("END"), None);
/// assert_eq!(sym.rev_find(0x3000), Some("start"));
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    limits: AsmLimits,
}

impl SymbolTable {
    /// Creates a new, empty symbol table.
    pub fn new(limits: AsmLimits) -> Self {
        SymbolTable { symbols: vec![], limits }
    }

    /// Adds a label defined at `addr` on the given source line.
    ///
    /// This fails if the label is already defined,
    /// or if the table's [`AsmLimits`] would be exceeded.
    pub fn insert(&mut self, label: &str, addr: u16, line: usize) -> Result<(), AsmErrKind> {
        if let Some(prev) = self.symbols.iter().find(|s| s.label == label) {
            return Err(AsmErrKind::DuplicateLabel { label: label.to_string(), first_line: prev.line });
        }
        if label.len() > self.limits.max_label_len {
            return Err(AsmErrKind::LabelTooLong(label.to_string()));
        }
        if self.symbols.len() >= self.limits.max_symbols {
            return Err(AsmErrKind::SymbolTableFull);
        }

        self.symbols.push(Symbol { label: label.to_string(), addr, line });
        Ok(())
    }

    /// Gets the address of a given label (if it exists).
    pub fn find(&self, label: &str) -> Option<u16> {
        self.symbols.iter()
            .find(|s| s.label == label)
            .map(|s| s.addr)
    }

    /// Gets the first label defined at a given address (if it exists).
    pub fn rev_find(&self, addr: u16) -> Option<&str> {
        self.symbols.iter()
            .find(|s| s.addr == addr)
            .map(|s| &*s.label)
    }

    /// Gets an iterator over every label and its address, in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u16)> + '_ {
        self.symbols.iter().map(|s| (&*s.label, s.addr))
    }

    /// The number of labels in the table.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether the table has no labels.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// An object file.
///
/// This is the final product after assembly source code is fully assembled.
/// It holds a contiguous block of words starting at an origin address,
/// and can be loaded in the simulator to run the assembled code.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ObjectFile {
    origin: u16,
    words: Vec<u16>,
}
impl ObjectFile {
    /// Creates an object file from a block of words starting at `origin`.
    pub fn new(origin: u16, words: Vec<u16>) -> Self {
        ObjectFile { origin, words }
    }

    /// The address the first word is loaded at.
    pub fn origin(&self) -> u16 {
        self.origin
    }

    /// The words of the program.
    pub fn words(&self) -> &[u16] {
        &self.words
    }

    /// The number of words in the program.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether the program has no words.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
