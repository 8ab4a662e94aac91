//! Error interface for this crate.
//!
//! Every error raised by the lexer, parser, assembler, and simulator
//! implements [`Error`], which extends [`std::error::Error`] with
//! the extra diagnostic information a front-end needs to report it.
//!
//! This module also re-exports each of the crate's error types, so
//! they can be accessed from one place.

use std::borrow::Cow;

pub use crate::asm::{AsmErr, AsmErrKind};
pub use crate::ast::OffsetNewErr;
pub use crate::parse::lex::LexErr;
pub use crate::parse::ParseErr;
pub use crate::sim::SimErr;

/// Unified error interface for all errors in this crate.
pub trait Error: std::error::Error {
    /// The 1-based source line this error occurred on, if known.
    fn line(&self) -> Option<usize> {
        None
    }

    /// A suggestion on how to fix the error.
    fn help(&self) -> Option<Cow<str>>;
}

/// Renders an error with its location and help text.
///
/// ```
/// use x16::asm::assemble;
/// use x16::err::report;
///
/// let err = assemble("br nowhere").unwrap_err();
/// assert_eq!(
///     report(&err),
///     "line 1: label 'nowhere' could not be found\n  help: define this label somewhere in the program"
/// );
/// ```
pub fn report(err: &dyn Error) -> String {
    let mut out = match err.line() {
        Some(line) => format!("line {line}: {err}"),
        None => err.to_string(),
    };
    if let Some(help) = err.help() {
        out.push_str("\n  help: ");
        out.push_str(&help);
    }
    out
}
