//! ArgMatches → CliAction conversion.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use occ_engine::{OccConfig, ValidationStrategy};

/// The result of parsing the command line.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Replay the x/y/z scenario.
    Walkthrough { config: OccConfig },
    /// Hammer a few keys from many threads.
    Contention {
        config: OccConfig,
        threads: usize,
        rounds: usize,
        keys: usize,
    },
    /// Print or write the default configuration.
    Config { write: Option<PathBuf> },
}

/// Convert parsed arguments into an action.
pub fn matches_to_action(matches: &ArgMatches) -> Result<CliAction> {
    match matches.subcommand() {
        Some(("walkthrough", sub)) => {
            let mut config = match sub.get_one::<String>("config") {
                Some(path) => OccConfig::load(Path::new(path))
                    .with_context(|| format!("cannot load config from {}", path))?,
                None => OccConfig::default(),
            };
            if let Some(name) = sub.get_one::<String>("validation") {
                config = config.with_validation(ValidationStrategy::parse(name)?);
            }
            Ok(CliAction::Walkthrough { config })
        }
        Some(("contention", sub)) => {
            let threads = positive(sub, "threads")?;
            let rounds = positive(sub, "rounds")?;
            let keys = positive(sub, "keys")?;
            let strategy = match sub.get_one::<String>("validation") {
                Some(name) => ValidationStrategy::parse(name)?,
                None => ValidationStrategy::default(),
            };
            Ok(CliAction::Contention {
                config: OccConfig::default().with_validation(strategy),
                threads,
                rounds,
                keys,
            })
        }
        Some(("config", sub)) => Ok(CliAction::Config {
            write: sub.get_one::<String>("write").map(PathBuf::from),
        }),
        Some((other, _)) => bail!("unknown command '{}'", other),
        None => bail!("no command given"),
    }
}

fn positive(sub: &ArgMatches, name: &str) -> Result<usize> {
    match sub.get_one::<usize>(name).copied() {
        Some(0) => bail!("--{} must be at least 1", name),
        Some(n) => Ok(n),
        None => bail!("missing --{}", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::build_cli;

    fn parse(args: &[&str]) -> Result<CliAction> {
        let matches = build_cli().try_get_matches_from(args).unwrap();
        matches_to_action(&matches)
    }

    #[test]
    fn test_walkthrough_strategy_flag() {
        let action = parse(&["occ", "walkthrough", "--validation", "indexed"]).unwrap();
        assert_eq!(
            action,
            CliAction::Walkthrough {
                config: OccConfig::default().with_validation(ValidationStrategy::Indexed)
            }
        );
    }

    #[test]
    fn test_contention_arguments() {
        let action = parse(&["occ", "contention", "-t", "2", "-r", "5", "-k", "1"]).unwrap();
        assert_eq!(
            action,
            CliAction::Contention {
                config: OccConfig::default(),
                threads: 2,
                rounds: 5,
                keys: 1,
            }
        );
    }

    #[test]
    fn test_zero_threads_rejected() {
        assert!(parse(&["occ", "contention", "--threads", "0"]).is_err());
    }

    #[test]
    fn test_missing_config_file_is_reported() {
        let err = parse(&["occ", "walkthrough", "--config", "/nonexistent/occ.toml"]).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/occ.toml"));
    }
}
