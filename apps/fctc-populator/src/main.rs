//! FCTC Populator
//!
//! Asks an LLM which steps, tools and raw materials are needed to build an
//! item, and records the answers in the From Caves To Cars item graph.

mod cli;
mod error;
mod output;

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbose);

    match cli.run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {}", "error:".red().bold(), err);
            err.exit_code()
        }
    }
}
