use std::path::Path;

use anyhow::Context;
use x16::asm::encoding::{BinaryFormat, ObjFileFormat, TextFormat};
use x16::asm::ObjectFile;

mod asm;
mod disasm;
mod run;

#[derive(clap::Subcommand)]
pub enum Subcommand {
    /// Assemble a source file into an object image
    Asm(self::asm::AsmOpt),

    /// Load an object image and run it
    Run(self::run::RunOpt),

    /// Print the instructions of an object image
    Disasm(self::disasm::DisasmOpt),
}

impl Subcommand {
    /// Run a subcommand
    pub fn exec(self) -> anyhow::Result<()> {
        match self {
            Subcommand::Asm(opt) => opt.exec(),
            Subcommand::Run(opt) => opt.exec(),
            Subcommand::Disasm(opt) => opt.exec(),
        }
    }
}

/// Reads an object image, in either the binary or the text format.
fn read_image(path: &Path) -> anyhow::Result<ObjectFile> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("could not read {}", path.display()))?;

    let obj = match std::str::from_utf8(&bytes) {
        Ok(text) if text.contains(TextFormat::HEADER) => TextFormat::deserialize(text),
        _ => BinaryFormat::deserialize(&bytes),
    };
    obj.with_context(|| format!("{} is not a valid object image", path.display()))
}
