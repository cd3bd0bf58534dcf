use clap::Parser;
use dirsort::cli::{Cli, run_cli};
use dirsort::init_tracing;
use dirsort::output::OutputFormatter;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run_cli(&cli) {
        Ok(passes) => {
            if passes.len() > 1 {
                let rows: Vec<_> = passes.iter().map(|(name, result)| (*name, result)).collect();
                OutputFormatter::summary_table(&rows);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            OutputFormatter::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
