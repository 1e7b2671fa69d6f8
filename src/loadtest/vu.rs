//! Virtual user (VU) task loop for load test execution.
//!
//! Each VU owns its own [`SessionContext`] and walks the configured journey
//! step by step, pausing a random think time between steps. Every executed
//! step is reported as an [`OutcomeSample`] through a bounded mpsc channel.

use crate::loadtest::config::JourneyKind;
use crate::loadtest::journey::{Journey, Step, StepOutcome};
use crate::loadtest::session::SessionContext;

use rand::prelude::*;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Atomic counter tracking the number of currently active virtual users.
///
/// Lightweight wrapper around `Arc<AtomicU32>` for clone-friendly sharing
/// across VU tasks and the engine orchestrator.
#[derive(Clone)]
pub struct ActiveVuCounter(Arc<AtomicU32>);

impl ActiveVuCounter {
    /// Creates a new counter initialized to zero.
    pub fn new() -> Self {
        Self(Arc::new(AtomicU32::new(0)))
    }

    /// Increments the active VU count by one.
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrements the active VU count by one.
    pub fn decrement(&self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }

    /// Returns the current number of active VUs.
    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for ActiveVuCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// One executed step as seen by the outcome tally.
#[derive(Debug, Clone)]
pub struct OutcomeSample {
    pub vu_id: u32,
    pub step: Step,
    pub outcome: StepOutcome,
}

/// Pause between two steps of one VU, drawn uniformly from `[min_ms, max_ms]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTime {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl WaitTime {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// No pause at all.
    pub fn none() -> Self {
        Self::new(0, 0)
    }

    /// Draws one pause.
    pub fn sample(&self) -> Duration {
        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rand::rng().random_range(self.min_ms..=self.max_ms))
    }
}

/// Everything a VU task needs besides its id.
#[derive(Clone)]
pub struct VuContext {
    pub kind: JourneyKind,
    pub journey: Arc<Journey>,
    pub wait: WaitTime,
    pub sample_tx: mpsc::Sender<OutcomeSample>,
    pub cancel: CancellationToken,
    /// Passes started across all VUs, shared when an iteration limit is set.
    pub iteration_counter: Option<Arc<AtomicU64>>,
    pub max_iterations: Option<u64>,
    pub active_vus: ActiveVuCounter,
}

/// Main virtual user task loop.
///
/// Each VU:
/// 1. Creates an empty [`SessionContext`].
/// 2. Executes the journey's steps in order, forever returning to the
///    first step after the last one.
/// 3. Sends one [`OutcomeSample`] per step and sleeps the think time.
/// 4. Stops on cancellation, when the iteration limit is reached (checked
///    before each pass), or when the sample receiver is gone. Reaching the
///    limit does not cancel the other VUs.
///
/// The `active_vus` counter is incremented on entry and decremented on exit.
pub async fn vu_loop(vu_id: u32, ctx: VuContext) {
    ctx.active_vus.increment();
    info!(vu = vu_id, "VU started");

    let passes = vu_loop_inner(vu_id, &ctx).await;

    info!(vu = vu_id, passes, "VU stopped");
    ctx.active_vus.decrement();
}

/// Inner VU loop logic. Returns the number of completed passes.
async fn vu_loop_inner(vu_id: u32, ctx: &VuContext) -> u64 {
    let mut session = SessionContext::new();
    let mut step = ctx.kind.first_step();
    let mut completed = 0u64;

    loop {
        if ctx.cancel.is_cancelled() {
            return completed;
        }

        // A VU past the limit only retires itself; passes other VUs
        // started under the limit still run to the end.
        if step == ctx.kind.first_step() {
            if let (Some(counter), Some(max)) = (&ctx.iteration_counter, ctx.max_iterations) {
                let prev = counter.fetch_add(1, Ordering::Relaxed);
                if prev >= max {
                    debug!(vu = vu_id, "iteration limit reached");
                    return completed;
                }
            }
        }

        debug!(vu = vu_id, step = %step, "executing step");
        let outcome = ctx.journey.execute(step, &mut session).await;
        let sample = OutcomeSample {
            vu_id,
            step,
            outcome,
        };
        if ctx.sample_tx.send(sample).await.is_err() {
            // Receiver dropped -- tally is gone
            return completed;
        }

        if ctx.kind.ends_pass(step) {
            completed += 1;
        }
        step = ctx.kind.next_step(step);

        // The last pass allowed by the iteration limit does not wait.
        if step == ctx.kind.first_step() && limit_reached(ctx) {
            continue;
        }

        tokio::select! {
            _ = tokio::time::sleep(ctx.wait.sample()) => {}
            _ = ctx.cancel.cancelled() => { return completed; }
        }
    }
}

fn limit_reached(ctx: &VuContext) -> bool {
    match (&ctx.iteration_counter, ctx.max_iterations) {
        (Some(counter), Some(max)) => counter.load(Ordering::Relaxed) >= max,
        _ => false,
    }
}
