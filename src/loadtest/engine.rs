//! Load test execution engine with outcome tallying and graceful shutdown.
//!
//! [`LoadTestEngine`] is the top-level orchestrator that:
//! - Spawns N virtual user tasks via [`tokio_util::task::TaskTracker`]
//! - Collects step outcomes through a bounded mpsc channel
//! - Attaches the run's [`LogSink`] dispatcher to every VU task
//! - Coordinates graceful shutdown via [`CancellationToken`]

use crate::loadtest::client::ApiClient;
use crate::loadtest::config::LoadTestConfig;
use crate::loadtest::error::LoadTestError;
use crate::loadtest::journey::{Journey, Step, StepOutcome};
use crate::loadtest::logging::LogSink;
use crate::loadtest::vu::{vu_loop, ActiveVuCounter, OutcomeSample, VuContext, WaitTime};

use std::collections::BTreeMap;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::instrument::WithSubscriber;
use tracing::{info, warn, Dispatch};

/// Per-step outcome counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepCounts {
    pub success: u64,
    pub failed: u64,
    pub transport: u64,
    pub skipped: u64,
}

impl StepCounts {
    /// Requests actually sent (skipped steps send none).
    pub fn sent(&self) -> u64 {
        self.success + self.failed + self.transport
    }

    pub fn total(&self) -> u64 {
        self.sent() + self.skipped
    }
}

/// Outcome counts keyed by step, ordered as the journey runs them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutcomeTally {
    pub per_step: BTreeMap<Step, StepCounts>,
}

impl OutcomeTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one executed step.
    pub fn record(&mut self, step: Step, outcome: &StepOutcome) {
        let counts = self.per_step.entry(step).or_default();
        match outcome {
            StepOutcome::Success => counts.success += 1,
            StepOutcome::Failed { .. } => counts.failed += 1,
            StepOutcome::Transport(_) => counts.transport += 1,
            StepOutcome::Skipped { .. } => counts.skipped += 1,
        }
    }

    /// Sum over all steps.
    pub fn totals(&self) -> StepCounts {
        self.per_step
            .values()
            .fold(StepCounts::default(), |acc, c| StepCounts {
                success: acc.success + c.success,
                failed: acc.failed + c.failed,
                transport: acc.transport + c.transport,
                skipped: acc.skipped + c.skipped,
            })
    }

    /// Completed passes: how often the last step of the journey ran.
    pub fn passes(&self, last_step: Step) -> u64 {
        self.per_step.get(&last_step).map_or(0, StepCounts::total)
    }
}

/// Top-level load test engine configuration and entry point.
///
/// Spawns N virtual users as independent tokio tasks and tallies their step
/// outcomes until the duration elapses, the iteration limit is hit, or the
/// user presses Ctrl+C.
pub struct LoadTestEngine {
    config: LoadTestConfig,
    base_url: String,
    max_iterations: Option<u64>,
    ramp_up: Option<Duration>,
    log_sink: LogSink,
}

impl LoadTestEngine {
    /// Creates a new engine with the given configuration and target URL.
    ///
    /// Logging is disabled until a sink is supplied with [`Self::with_log_sink`].
    pub fn new(config: LoadTestConfig, base_url: String) -> Self {
        Self {
            config,
            base_url,
            max_iterations: None,
            ramp_up: None,
            log_sink: LogSink::disabled(),
        }
    }

    /// Sets an iteration limit. The test stops after this many journey passes
    /// across all VUs (first-limit-wins with duration).
    pub fn with_iterations(mut self, n: u64) -> Self {
        self.max_iterations = Some(n);
        self
    }

    /// Sets a ramp-up duration. VUs are spawned with uniform stagger over this
    /// period.
    pub fn with_ramp_up(mut self, duration: Duration) -> Self {
        self.ramp_up = Some(duration);
        self
    }

    /// Routes every VU's log records to `sink`.
    pub fn with_log_sink(mut self, sink: LogSink) -> Self {
        self.log_sink = sink;
        self
    }

    /// Returns a reference to the engine's configuration.
    pub fn config(&self) -> &LoadTestConfig {
        &self.config
    }

    /// Returns the configured max iterations, if any.
    pub fn max_iterations(&self) -> Option<u64> {
        self.max_iterations
    }

    /// Returns the configured ramp-up duration, if any.
    pub fn ramp_up(&self) -> Option<Duration> {
        self.ramp_up
    }

    /// Run the load test. Returns the final outcome tally.
    pub async fn run(&self) -> Result<LoadTestResult, LoadTestError> {
        self.config.validate()?;
        let dispatch = self.log_sink.dispatch();
        self.run_with_dispatch(dispatch.clone())
            .with_subscriber(dispatch)
            .await
    }

    async fn run_with_dispatch(&self, dispatch: Dispatch) -> Result<LoadTestResult, LoadTestError> {
        let vu_count = self.config.settings.virtual_users;
        let kind = self.config.journey.kind;
        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();
        let active_vus = ActiveVuCounter::new();
        let iteration_counter = self.max_iterations.map(|_| Arc::new(AtomicU64::new(0)));

        let client = ApiClient::new(
            reqwest::Client::new(),
            self.base_url.clone(),
            self.config.settings.timeout_as_duration(),
        );
        let journey = Arc::new(Journey::new(
            client,
            self.config.gameplay.clone(),
            self.config.credentials.clone(),
        ));
        let (wait_min, wait_max) = self.config.wait_range_ms();

        let buffer_size = (vu_count as usize) * 100;
        let (sample_tx, sample_rx) = mpsc::channel::<OutcomeSample>(buffer_size);

        let vu_template = VuContext {
            kind,
            journey,
            wait: WaitTime::new(wait_min, wait_max),
            sample_tx,
            cancel: cancel.clone(),
            iteration_counter,
            max_iterations: self.max_iterations,
            active_vus: active_vus.clone(),
        };

        let test_start = Instant::now();
        info!(
            target_url = %self.base_url,
            vus = vu_count,
            journey = ?kind,
            "Load test started"
        );

        // Spawn outcome aggregator (NOT on tracker -- must outlive VU tasks)
        let tally_handle =
            tokio::spawn(outcome_aggregator(sample_rx).with_subscriber(dispatch.clone()));

        // Spawn VU tasks with optional ramp-up stagger
        let delay_per_vu = match self.ramp_up {
            Some(ramp) if vu_count > 1 => ramp / vu_count,
            _ => Duration::ZERO,
        };
        let spawn_all = async {
            for i in 0..vu_count {
                tracker.spawn(vu_loop(i, vu_template.clone()).with_subscriber(dispatch.clone()));
                if i < vu_count - 1 && !delay_per_vu.is_zero() {
                    tokio::select! {
                        _ = tokio::time::sleep(delay_per_vu) => {}
                        _ = cancel.cancelled() => { return; }
                    }
                }
            }
        };

        // Run controller -- first-limit-wins between duration, iteration limit, Ctrl+C.
        // With an iteration limit every VU retires on its own once the limit is
        // used up, so the run is over when the tracker drains.
        let duration = Duration::from_secs(self.config.settings.duration_secs);
        let run_until_done = async {
            spawn_all.await;
            tracker.close();
            tracker.wait().await;
        };

        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = run_until_done => {
                info!("All VUs finished");
            }
            _ = handle_ctrl_c(cancel.clone()) => {}
        }
        cancel.cancel();

        // Drop the template's sender -- VUs hold their own clones
        drop(vu_template);

        // Drain: close tracker and wait for all VU tasks
        tracker.close();
        tracker.wait().await;

        let tally = tally_handle.await.unwrap_or_else(|e| {
            warn!("Outcome aggregator failed: {e}");
            OutcomeTally::new()
        });
        let elapsed = test_start.elapsed();
        let passes = tally.passes(kind.last_step());
        info!(passes, elapsed_secs = elapsed.as_secs_f64(), "Load test finished");

        Ok(LoadTestResult {
            tally,
            elapsed,
            passes,
            final_active_vus: active_vus.get(),
        })
    }
}

/// Result of a completed load test run.
#[derive(Debug)]
pub struct LoadTestResult {
    /// Step outcome counts.
    pub tally: OutcomeTally,
    /// Total elapsed time of the test.
    pub elapsed: Duration,
    /// Completed journey passes across all VUs.
    pub passes: u64,
    /// Number of VUs that were still active at test end.
    pub final_active_vus: u32,
}

/// Outcome aggregator task.
///
/// Consumes [`OutcomeSample`] values until every sender is gone. Cancellation
/// alone does not stop it: VUs finishing their current step still report.
async fn outcome_aggregator(mut sample_rx: mpsc::Receiver<OutcomeSample>) -> OutcomeTally {
    let mut tally = OutcomeTally::new();
    while let Some(sample) = sample_rx.recv().await {
        tally.record(sample.step, &sample.outcome);
    }
    tally
}

/// Ctrl+C handler with two-phase shutdown.
///
/// First Ctrl+C triggers graceful drain via the cancellation token.
/// Second Ctrl+C performs a hard abort via `std::process::exit(1)`.
async fn handle_ctrl_c(cancel: CancellationToken) {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install ctrl_c handler");
    eprintln!("\nReceived Ctrl+C, stopping gracefully...");
    cancel.cancel();

    // Second Ctrl+C: hard abort
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install ctrl_c handler");
    eprintln!("\nReceived second Ctrl+C, aborting immediately.");
    std::process::exit(1);
}
