//! `crimson-loadtest run` and `crimson-loadtest login` implementation.

use anyhow::Result;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use crimson_loadtest::loadtest::config::{Credentials, JourneyKind, LoadTestConfig};
use crimson_loadtest::loadtest::engine::LoadTestEngine;
use crimson_loadtest::loadtest::logging::LogSink;
use crimson_loadtest::loadtest::summary::render_summary;

use super::RunArgs;

/// Execute a load test run.
///
/// Loads config (via explicit path or auto-discovery, falling back to
/// defaults), applies CLI overrides, opens the log sink, runs the engine,
/// and prints the results summary. `journey` forces a journey kind
/// regardless of the config file.
pub async fn execute_run(args: RunArgs, journey: Option<JourneyKind>) -> Result<()> {
    // Step 1: Load config
    let config_file = match args.config {
        Some(ref path) => {
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: {}\nUse `crimson-loadtest init` to create one.",
                    path.display()
                );
            }
            Some(path.clone())
        },
        None => discover_config(),
    };

    let mut config = match config_file {
        Some(ref path) => {
            eprintln!("Loading config from: {}", path.display());
            LoadTestConfig::read(path)
                .map_err(|e| anyhow::anyhow!("Failed to load config '{}': {}", path.display(), e))?
        },
        None => {
            eprintln!("No .crimson/loadtest.toml found, using built-in defaults.");
            LoadTestConfig::default()
        },
    };

    // Step 2: Apply CLI overrides
    if let Some(kind) = journey {
        config.journey.kind = kind;
    }
    apply_overrides(&mut config, args.vus, args.duration);
    apply_credentials(&mut config, args.identifier, args.password);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid load test config: {}", e))?;

    // Step 3: Open the log sink
    let sink = LogSink::init(&config.logging)?;
    eprintln!("Writing request log to: {}", config.logging.file.display());

    // Step 4: Build and run the engine
    let mut engine = LoadTestEngine::new(config, args.url.clone()).with_log_sink(sink);
    if let Some(n) = args.iterations {
        engine = engine.with_iterations(n);
    }
    if let Some(secs) = args.ramp_up {
        engine = engine.with_ramp_up(Duration::from_secs(secs));
    }

    let result = engine
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Load test failed: {}", e))?;

    // Step 5: Terminal summary
    if args.no_color || !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let summary = render_summary(&result, engine.config(), &args.url);
    println!("{summary}");

    Ok(())
}

/// Apply CLI flag overrides to a loaded config.
fn apply_overrides(config: &mut LoadTestConfig, vus: Option<u32>, duration: Option<u64>) {
    if let Some(v) = vus {
        config.settings.virtual_users = v;
    }
    if let Some(d) = duration {
        config.settings.duration_secs = d;
    }
}

/// Merge credentials from flags or environment into the config.
///
/// A flag replaces only its own half; the other half is kept from the
/// config file. Both halves must be known for credentials to be set.
fn apply_credentials(
    config: &mut LoadTestConfig,
    identifier: Option<String>,
    password: Option<String>,
) {
    if identifier.is_none() && password.is_none() {
        return;
    }
    let existing = config.credentials.take();
    let identifier = identifier.or_else(|| existing.as_ref().map(|c| c.identifier.clone()));
    let password = password.or_else(|| existing.as_ref().map(|c| c.password.clone()));
    config.credentials = match (identifier, password) {
        (Some(identifier), Some(password)) => Some(Credentials {
            identifier,
            password,
        }),
        _ => {
            eprintln!("Warning: ignoring partial credentials (need both identifier and password)");
            existing
        },
    };
}

/// Discover `.crimson/loadtest.toml` by walking parent directories.
///
/// Starts from the current working directory and walks up until either
/// the file is found or the filesystem root is reached.
fn discover_config() -> Option<PathBuf> {
    let dir = std::env::current_dir().ok()?;
    discover_config_from(dir)
}

fn discover_config_from(mut dir: PathBuf) -> Option<PathBuf> {
    loop {
        let candidate = dir.join(".crimson").join("loadtest.toml");
        if candidate.exists() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}
