use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::fmt;
use std::time::Duration;

/// Point-in-time copy of a run's cumulative statistics.
///
/// This is the payload of every `update` and terminal event. `min_latency_ms` is 0 when no
/// request has succeeded yet.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub average_latency_ms: f64,
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
    pub latency_samples: Vec<u64>,
    pub status: RunStatus,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "elapsedMs")]
    pub elapsed: Duration,
    pub requests_per_second: f64,
}

impl StatsSnapshot {
    pub fn empty() -> Self {
        Self {
            total_requests: 0,
            success_count: 0,
            error_count: 0,
            average_latency_ms: 0.,
            min_latency_ms: 0,
            max_latency_ms: 0,
            latency_samples: vec![],
            status: RunStatus::Running,
            elapsed: Duration::ZERO,
            requests_per_second: 0.,
        }
    }

    /// `total_requests == success_count + error_count`
    pub fn is_consistent(&self) -> bool {
        self.total_requests == self.success_count + self.error_count
    }

    pub fn error_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.
        } else {
            self.error_count as f64 / self.total_requests as f64
        }
    }
}

impl Default for StatsSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total={}, success={}, error={}, avg={:.1}ms, min={}ms, max={}ms, rps={:.2}",
            self.total_requests,
            self.success_count,
            self.error_count,
            self.average_latency_ms,
            self.min_latency_ms,
            self.max_latency_ms,
            self.requests_per_second,
        )
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Running,
    Completed,
    Stopped,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Stopped => "stopped",
            RunStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}
