//! `crimson-loadtest init` command implementation.

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Execute the `loadtest init` command.
///
/// Creates `.crimson/loadtest.toml` under `root` with sensible defaults.
pub fn execute_init(root: &Path, force: bool) -> Result<()> {
    let config_path = write_template(root, force)?;
    eprintln!("Created {}", config_path.display());
    eprintln!("Edit the file to customize your load test.");
    Ok(())
}

fn write_template(root: &Path, force: bool) -> Result<PathBuf> {
    let config_dir = root.join(".crimson");
    let config_path = config_dir.join("loadtest.toml");

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}\n\
             Use `--force` to overwrite.",
            config_path.display()
        );
    }

    std::fs::create_dir_all(&config_dir)?;
    std::fs::write(&config_path, generate_default_template())?;
    Ok(config_path)
}

/// Starter config. Every table is optional except `[settings]`.
fn generate_default_template() -> String {
    r#"# crimson-loadtest configuration
# The target URL is passed on the command line:
#   crimson-loadtest run http://localhost:8080

[settings]
virtual_users = 10
duration_secs = 60
timeout_ms = 5000
# Pause between two steps of one virtual user. Defaults: 1000-3000 ms for
# the sequential journey, 1000-2000 ms for the login journey.
# wait_min_ms = 1000
# wait_max_ms = 3000

[journey]
# "sequential": guest login, validate token, home, reward, join, score
# "login": credentialed login only
kind = "sequential"

# Required for the login journey. May also be supplied through
# --identifier/--password or CRIMSON_IDENTIFIER/CRIMSON_PASSWORD.
# [credentials]
# identifier = "player@example.com"
# password = "change-me"

[gameplay]
mode = "TargetMode"
overs = 2
stake = 0
target_score = 14

[logging]
file = "crimson_loadtest.log"
level = "info"
"#
    .to_string()
}
