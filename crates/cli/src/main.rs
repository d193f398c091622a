//! occ: command-line driver for occdb.
//!
//! - `occ walkthrough` replays the x/y/z conflict scenario step by step
//! - `occ contention` runs retrying increments from many threads
//! - `occ config` prints the default `occ.toml`
//!
//! Logging goes to stderr through `tracing`; set `RUST_LOG` to override the
//! default `occ=info` directive.

mod commands;
mod parse;
mod workload;

use std::process;

use anyhow::Result;
use occ_engine::{OccConfig, SerialDatabase};
use tracing_subscriber::EnvFilter;

use commands::build_cli;
use parse::{matches_to_action, CliAction};

fn init_logging(verbose: bool) -> Result<()> {
    let default_directive = if verbose { "occ=debug" } else { "occ=info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(default_directive.parse()?))
        .init();
    Ok(())
}

fn run(action: CliAction) -> Result<()> {
    match action {
        CliAction::Walkthrough { config } => {
            let db = SerialDatabase::with_config(config);
            workload::walkthrough(&db)?;
            println!("walkthrough OK");
        }
        CliAction::Contention {
            config,
            threads,
            rounds,
            keys,
        } => {
            let db = SerialDatabase::with_config(config);
            let report = workload::contention(&db, threads, rounds, keys)?;
            let m = &report.metrics;
            println!("sum:       {} (expected {})", report.sum, report.expected);
            println!("committed: {}", m.total_committed);
            println!("aborted:   {} ({:.1}%)", m.total_aborted, m.abort_rate() * 100.0);
            println!("elapsed:   {:.2?}", report.elapsed);
            anyhow::ensure!(
                report.sum == report.expected,
                "lost updates: sum {} != {}",
                report.sum,
                report.expected
            );
        }
        CliAction::Config { write: Some(path) } => {
            OccConfig::write_default(&path)?;
            println!("wrote {}", path.display());
        }
        CliAction::Config { write: None } => {
            print!("{}", OccConfig::default_toml());
        }
    }
    Ok(())
}

fn main() {
    let matches = build_cli().get_matches();

    if let Err(e) = init_logging(matches.get_flag("verbose")) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }

    let result = matches_to_action(&matches).and_then(run);
    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
