//! Clap command tree definition.

use clap::{value_parser, Arg, ArgAction, Command};

/// Build the complete CLI command tree.
pub fn build_cli() -> Command {
    Command::new("occ")
        .about("Optimistic concurrency control over an in-memory key-value store")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log every transaction lifecycle event")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("walkthrough")
                .about("Replay the x/y/z conflict scenario and check every step")
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_name("PATH")
                        .help("Read validation settings from an occ.toml file"),
                )
                .arg(
                    Arg::new("validation")
                        .long("validation")
                        .value_parser(["scan", "indexed"])
                        .help("Validation strategy (overrides --config)"),
                ),
        )
        .subcommand(
            Command::new("contention")
                .about("Run concurrent increments over a few hot keys, retrying aborts")
                .arg(
                    Arg::new("threads")
                        .long("threads")
                        .short('t')
                        .value_parser(value_parser!(usize))
                        .default_value("4")
                        .help("Worker threads"),
                )
                .arg(
                    Arg::new("rounds")
                        .long("rounds")
                        .short('r')
                        .value_parser(value_parser!(usize))
                        .default_value("100")
                        .help("Committed increments per thread"),
                )
                .arg(
                    Arg::new("keys")
                        .long("keys")
                        .short('k')
                        .value_parser(value_parser!(usize))
                        .default_value("3")
                        .help("Number of keys the threads contend on"),
                )
                .arg(
                    Arg::new("validation")
                        .long("validation")
                        .value_parser(["scan", "indexed"])
                        .default_value("scan")
                        .help("Validation strategy"),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Print the default occ.toml")
                .arg(
                    Arg::new("write")
                        .long("write")
                        .value_name("PATH")
                        .help("Write it to PATH instead of stdout"),
                ),
        )
}
