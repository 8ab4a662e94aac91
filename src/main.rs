#![forbid(unsafe_code)]

use std::process::exit;

use clap::{ArgAction, Parser};
use tracing::error;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::prelude::*;

mod commands;

use crate::commands::Subcommand;

#[derive(Parser)]
#[command(version, about)]
struct Opt {
    /// Increase the level of verbosity. Can be used multiple times.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Use JSON output for log messages
    #[arg(short, long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Subcommand,
}

impl Opt {
    const fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "x16=debug,info",
            2 => "x16=trace,info",
            3..=u8::MAX => "trace",
        }
    }

    fn filter_layer(&self) -> EnvFilter {
        // Parse log level from env
        EnvFilter::try_from_default_env()
            // or infer from args
            .unwrap_or_else(|_| EnvFilter::new(self.log_filter()))
    }
}

fn main() {
    let opt = Opt::parse();

    // Logs go to stderr so they never mix with program output
    let registry = tracing_subscriber::registry().with(opt.filter_layer());
    if opt.json {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr);
        registry.with(json_layer).init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .without_time()
            .with_target(false)
            .with_writer(std::io::stderr);
        registry.with(fmt_layer).init();
    }

    if let Err(e) = opt.command.exec() {
        error!("{e:#}");
        exit(1);
    }
}
