//! `crimson-loadtest` CLI subcommands.
//!
//! Provides `run` (sequential journey), `login` (credentialed login only)
//! and `init` (generate starter config).

mod init;
mod run;

use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::PathBuf;

use crimson_loadtest::loadtest::config::JourneyKind;

/// Flags shared by the `run` and `login` subcommands.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Target backend base URL
    pub url: String,

    /// Path to config file (default: auto-discover .crimson/loadtest.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of virtual users (overrides config)
    #[arg(long)]
    pub vus: Option<u32>,

    /// Test duration in seconds (overrides config)
    #[arg(long)]
    pub duration: Option<u64>,

    /// Stop after this many journey passes across all VUs
    #[arg(long)]
    pub iterations: Option<u64>,

    /// Spread VU start-up over this many seconds
    #[arg(long)]
    pub ramp_up: Option<u64>,

    /// Login identifier (overrides [credentials] in config)
    #[arg(long, env = "CRIMSON_IDENTIFIER")]
    pub identifier: Option<String>,

    /// Login password (overrides [credentials] in config)
    #[arg(long, env = "CRIMSON_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

/// Load test commands for the game backend.
#[derive(Debug, Subcommand)]
pub enum LoadtestCommand {
    /// Run the full player journey against a backend
    ///
    /// Each virtual user repeats guest login, token validation, home,
    /// reward claim, match join and score submission until the duration
    /// or iteration limit is reached.
    Run(RunArgs),

    /// Run the credentialed login journey against a backend
    ///
    /// Each virtual user repeatedly logs in with the configured identifier
    /// and password. Credentials may come from the config file, flags, or
    /// the CRIMSON_IDENTIFIER / CRIMSON_PASSWORD environment variables.
    Login(RunArgs),

    /// Generate a starter loadtest config file
    ///
    /// Creates .crimson/loadtest.toml with sensible defaults.
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

impl LoadtestCommand {
    /// Execute the selected loadtest subcommand.
    pub fn execute(self) -> Result<()> {
        match self {
            LoadtestCommand::Run(args) => {
                let runtime = tokio::runtime::Runtime::new()?;
                runtime.block_on(run::execute_run(args, None))
            },
            LoadtestCommand::Login(args) => {
                let runtime = tokio::runtime::Runtime::new()?;
                runtime.block_on(run::execute_run(args, Some(JourneyKind::Login)))
            },
            LoadtestCommand::Init { force } => {
                let cwd = std::env::current_dir()?;
                init::execute_init(&cwd, force)
            },
        }
    }
}
