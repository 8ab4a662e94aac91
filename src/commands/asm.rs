use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueHint};
use tracing::info;
use x16::asm::encoding::{ObjFileFormat, TextFormat};
use x16::asm::{assemble, assemble_file, ObjectFile};
use x16::err::{report, AsmErr};

#[derive(Parser, Debug)]
pub struct AsmOpt {
    /// Input file
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Output file
    #[arg(short, long, default_value = "a.obj", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Write the object file in the text format instead of binary
    #[arg(long)]
    text: bool,
}

fn diagnose(e: AsmErr) -> anyhow::Error {
    anyhow::anyhow!(report(&e))
}

impl AsmOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        info!(path = ?self.input, "Assembling program");

        let obj = if self.text {
            let src = std::fs::read_to_string(&self.input)
                .with_context(|| format!("could not read {}", self.input.display()))?;
            let obj = assemble(&src).map_err(diagnose)?;
            std::fs::write(&self.output, TextFormat::serialize(&obj))
                .with_context(|| format!("could not write {}", self.output.display()))?;
            obj
        } else {
            assemble_file(&self.input, &self.output).map_err(diagnose)?
        };

        log_summary(&obj, &self.output);
        Ok(())
    }
}

fn log_summary(obj: &ObjectFile, output: &std::path::Path) {
    info!(
        path = ?output,
        origin = format_args!("x{:04X}", obj.origin()),
        words = obj.len(),
        "Wrote object file"
    );
}
