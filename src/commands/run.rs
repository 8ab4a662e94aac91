use std::path::PathBuf;

use clap::{Parser, ValueHint};
use tracing::{debug, info};
use x16::err::report;
use x16::sim::mem::MachineInitStrategy;
use x16::sim::trap::{ConsoleTraps, StdConsole};
use x16::sim::{SimFlags, Simulator};

use super::read_image;

#[derive(Parser, Debug)]
pub struct RunOpt {
    /// Object image to run
    #[arg(value_hint = ValueHint::FilePath)]
    image: PathBuf,

    /// Stop with an error after this many instructions
    #[arg(short, long)]
    limit: Option<u64>,

    /// Fill memory and registers with random values from this seed, instead of zeroes
    #[arg(short, long)]
    seed: Option<u64>,
}

impl RunOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        info!(path = ?self.image, "Loading program");
        let obj = read_image(&self.image)?;

        let machine_init = match self.seed {
            Some(seed) => MachineInitStrategy::Seeded { seed },
            None => MachineInitStrategy::Zeroed,
        };
        let mut sim = Simulator::with_traps(SimFlags { machine_init }, ConsoleTraps::new(StdConsole::new()));
        sim.load_obj_file(&obj);

        debug!(limit = ?self.limit, "Running program");
        let result = match self.limit {
            Some(limit) => sim.run_with_limit(limit),
            None => sim.run(),
        };
        if let Err(e) = result {
            debug!(pc = format_args!("x{:04X}", sim.pc), instructions = sim.instructions_run, "Program stopped");
            anyhow::bail!(report(&e));
        }

        info!(instructions = sim.instructions_run, "Program halted");
        Ok(())
    }
}
