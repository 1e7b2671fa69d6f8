//! Terminal summary renderer for load test results.
//!
//! Produces a colorized, human-readable summary with:
//! - A header with the test configuration
//! - One dotted-line row per journey step (step.........: counts)
//! - Totals, completed passes, and throughput
//!
//! [`render_summary`] is a pure function: takes structured data and returns
//! a formatted [`String`]. Colors respect the global override set by
//! [`colored::control::set_override`] when `--no-color` is active or stdout
//! is piped.

use colored::Colorize;

use crate::loadtest::config::{JourneyKind, LoadTestConfig};
use crate::loadtest::engine::{LoadTestResult, StepCounts};

/// Width for dotted metric row padding.
const PAD_WIDTH: usize = 32;

/// Render the end-of-run summary.
///
/// # Layout
///
/// ```text
///   crimson-loadtest
///
///   target:    http://localhost:8080
///   vus:       10
///   duration:  60s
///   journey:   sequential (6 steps)
///
///   login...........................: ok=120  failed=0  transport=0  skipped=0
///   ...
///   passes..........................: 118
///   requests........................: 712
///   throughput......................: 11.9 req/s
/// ```
pub fn render_summary(result: &LoadTestResult, config: &LoadTestConfig, url: &str) -> String {
    let kind = config.journey.kind;
    let mut lines = vec![render_header(
        url,
        config.settings.virtual_users,
        config.settings.duration_secs,
        kind,
    )];

    for step in kind.steps() {
        let counts = result
            .tally
            .per_step
            .get(step)
            .copied()
            .unwrap_or_default();
        lines.push(format_metric_row(step.name(), &render_counts(&counts), PAD_WIDTH));
    }

    lines.push(String::new());
    let totals = result.tally.totals();
    lines.push(format_metric_row("passes", &result.passes.to_string(), PAD_WIDTH));
    lines.push(format_metric_row("requests", &totals.sent().to_string(), PAD_WIDTH));

    let elapsed_secs = result.elapsed.as_secs_f64();
    let throughput = if elapsed_secs > 0.0 {
        totals.sent() as f64 / elapsed_secs
    } else {
        0.0
    };
    lines.push(format_metric_row(
        "throughput",
        &format!("{throughput:.1} req/s").green().to_string(),
        PAD_WIDTH,
    ));
    lines.push(format_metric_row(
        "elapsed",
        &format!("{elapsed_secs:.1}s"),
        PAD_WIDTH,
    ));

    lines.join("\n")
}

fn render_counts(counts: &StepCounts) -> String {
    format!(
        "ok={}  failed={}  transport={}  skipped={}",
        counts.success.to_string().green(),
        highlight_nonzero(counts.failed, |s| s.red().to_string()),
        highlight_nonzero(counts.transport, |s| s.red().to_string()),
        highlight_nonzero(counts.skipped, |s| s.yellow().to_string()),
    )
}

fn highlight_nonzero(n: u64, paint: impl Fn(&str) -> String) -> String {
    let s = n.to_string();
    if n > 0 {
        paint(&s)
    } else {
        s
    }
}

fn render_header(url: &str, vus: u32, duration_secs: u64, kind: JourneyKind) -> String {
    let journey = match kind {
        JourneyKind::Sequential => "sequential",
        JourneyKind::Login => "login",
    };
    format!(
        "\n  {}\n\n  target:    {}\n  vus:       {}\n  duration:  {}s\n  journey:   {} ({} steps)\n",
        "crimson-loadtest".bold(),
        url,
        vus,
        duration_secs,
        journey,
        kind.steps().len(),
    )
}

/// Format a single metric row with dot-padding.
///
/// Produces: `"  metric_name..................: value_string"`
fn format_metric_row(name: &str, value: &str, pad_width: usize) -> String {
    format!("  {name:.<pad_width$}: {value}")
}
