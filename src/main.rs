//! crimson-loadtest: load generator for the cricket game backend.
//!
//! Simulates concurrent players walking the guest journey (login, token
//! validation, home, reward, match join, score submission) or a
//! credentialed login loop, and reports per-step outcomes.

use anyhow::Result;
use clap::Parser;

mod commands;

use commands::loadtest::LoadtestCommand;

/// Load generator for the cricket game backend
#[derive(Parser)]
#[command(name = "crimson-loadtest")]
#[command(about = "Simulate concurrent players against the game backend", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: LoadtestCommand,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.command.execute()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::try_parse_from([
            "crimson-loadtest",
            "run",
            "http://localhost:8080",
            "--vus",
            "5",
            "--iterations",
            "20",
            "--ramp-up",
            "3",
            "--no-color",
        ])
        .unwrap();
        match cli.command {
            LoadtestCommand::Run(args) => {
                assert_eq!(args.url, "http://localhost:8080");
                assert_eq!(args.vus, Some(5));
                assert_eq!(args.iterations, Some(20));
                assert_eq!(args.ramp_up, Some(3));
                assert!(args.no_color);
            },
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_init_force() {
        let cli = Cli::try_parse_from(["crimson-loadtest", "init", "--force"]).unwrap();
        assert!(matches!(cli.command, LoadtestCommand::Init { force: true }));
    }

    #[test]
    fn test_run_requires_url() {
        assert!(Cli::try_parse_from(["crimson-loadtest", "run"]).is_err());
    }
}
