use std::path::PathBuf;

use clap::{Parser, ValueHint};
use tracing::info;
use x16::ast::sim::disassemble;

use super::read_image;

#[derive(Parser, Debug)]
pub struct DisasmOpt {
    /// Object image to disassemble
    #[arg(value_hint = ValueHint::FilePath)]
    image: PathBuf,
}

impl DisasmOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        info!(path = ?self.image, "Reading object image");
        let obj = read_image(&self.image)?;
        print!("{}", disassemble(obj.origin(), obj.words()));
        Ok(())
    }
}
