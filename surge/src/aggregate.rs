use crate::error::StatsError;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use surge_core::{Outcome, RunStatus, StatsSnapshot};
use tokio::sync::watch;

/// Cumulative results of one run, shared by every actor.
///
/// Every mutation happens inside a single critical section: the counters, the latency
/// sample and the derived min/max/mean are updated together, so no reader can observe a
/// total without its matching success or error. The same section bumps a progress
/// counter which the run driver watches to know when to publish.
pub struct StatsAggregate {
    totals: Mutex<Totals>,
    started: Instant,
    progress: watch::Sender<u64>,
}

#[derive(Debug, Default)]
struct Totals {
    total: u64,
    success: u64,
    error: u64,
    samples: Vec<u64>,
    latency_sum: u128,
    min: Option<u64>,
    max: u64,
    status: RunStatus,
    finished_after: Option<Duration>,
}

impl Totals {
    fn apply(&mut self, outcome: &Outcome) {
        self.total += 1;
        match outcome {
            Outcome::Success { latency } => {
                let ms = latency.as_millis() as u64;
                self.success += 1;
                self.samples.push(ms);
                self.latency_sum += u128::from(ms);
                self.min = Some(self.min.map_or(ms, |min| min.min(ms)));
                self.max = self.max.max(ms);
            }
            Outcome::Failure { .. } => {
                self.error += 1;
            }
        }
    }

    fn average(&self) -> f64 {
        if self.samples.is_empty() {
            0.
        } else {
            self.latency_sum as f64 / self.samples.len() as f64
        }
    }

    fn snapshot(&self, elapsed: Duration) -> StatsSnapshot {
        let elapsed = self.finished_after.unwrap_or(elapsed);
        let requests_per_second = if elapsed.is_zero() {
            0.
        } else {
            self.total as f64 / elapsed.as_secs_f64()
        };

        StatsSnapshot {
            total_requests: self.total,
            success_count: self.success,
            error_count: self.error,
            average_latency_ms: self.average(),
            min_latency_ms: self.min.unwrap_or(0),
            max_latency_ms: self.max,
            latency_samples: self.samples.clone(),
            status: self.status,
            elapsed,
            requests_per_second,
        }
    }
}

impl StatsAggregate {
    pub fn new() -> Self {
        let (progress, _) = watch::channel(0);
        Self {
            totals: Mutex::new(Totals::default()),
            started: Instant::now(),
            progress,
        }
    }

    /// Record the outcome of one request, returning the new total.
    pub fn record(&self, outcome: &Outcome) -> Result<u64, StatsError> {
        let mut totals = self.totals.lock()?;
        if totals.status.is_terminal() {
            return Err(StatsError::Frozen);
        }

        totals.apply(outcome);
        let total = totals.total;
        self.progress.send_replace(total);
        Ok(total)
    }

    /// Consistent copy of the current statistics.
    ///
    /// A poisoned lock still yields the data as last written.
    pub fn snapshot(&self) -> StatsSnapshot {
        self.lock_lossy().snapshot(self.started.elapsed())
    }

    /// Tag the aggregate with its terminal status and return the final snapshot. Later
    /// calls to [`record`](Self::record) fail with [`StatsError::Frozen`].
    pub fn finalize(&self, status: RunStatus) -> StatsSnapshot {
        let mut totals = self.lock_lossy();
        if !totals.status.is_terminal() {
            totals.status = status;
            totals.finished_after = Some(self.started.elapsed());
        }
        totals.snapshot(self.started.elapsed())
    }

    /// Receiver that changes every time an outcome is recorded. The value is the running
    /// total.
    pub fn progress(&self) -> watch::Receiver<u64> {
        self.progress.subscribe()
    }

    fn lock_lossy(&self) -> MutexGuard<'_, Totals> {
        self.totals.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for StatsAggregate {
    fn default() -> Self {
        Self::new()
    }
}
