//! auto-cr CLI entry point.

use std::process::ExitCode;

use auto_cr::cli::{run_cli, CliArgs};
use clap::Parser;

fn main() -> ExitCode {
    let args = CliArgs::parse();
    run_cli(args)
}
