use anyhow::Context;
use clap::Parser;
use kubepolicy::cli::{Cli, Commands};
use kubepolicy::handlers::{handle_rules, handle_scan};
use std::process;

/// No finding reached the severity threshold.
const EXIT_PASS: i32 = 0;
/// At least one finding reached the severity threshold.
const EXIT_BLOCKING: i32 = 1;
/// Configuration, discovery or runtime failure.
const EXIT_FATAL: i32 = 2;

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            EXIT_FATAL
        }
    };
    process::exit(code);
}

fn run() -> anyhow::Result<i32> {
    let cli = Cli::parse();
    cli.init_logging();

    match cli.command {
        Commands::Scan(args) => {
            let outcome = handle_scan(args, cli.config.as_deref()).context("scan failed")?;
            if outcome.blocking {
                log::info!("Findings at or above the severity threshold; failing");
                Ok(EXIT_BLOCKING)
            } else {
                Ok(EXIT_PASS)
            }
        }
        Commands::Rules => {
            handle_rules()?;
            Ok(EXIT_PASS)
        }
    }
}
