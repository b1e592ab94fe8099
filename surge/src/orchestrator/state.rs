use crate::aggregate::StatsAggregate;
use std::sync::Arc;
use surge_core::{RunConfig, RunId, StatsSnapshot};
use tokio_util::sync::CancellationToken;

/// The orchestrator's single state value. Only the orchestrator replaces it.
pub(crate) enum RunState {
    Idle,
    Running(ActiveRun),
    /// Idle, remembering how the last run ended.
    Finished {
        run_id: RunId,
        snapshot: StatsSnapshot,
    },
}

pub(crate) struct ActiveRun {
    pub run_id: RunId,
    pub config: RunConfig,
    pub stats: Arc<StatsAggregate>,
    pub cancel: CancellationToken,
}

impl RunState {
    pub fn summary(&self) -> StateSummary {
        match self {
            RunState::Idle => StateSummary::Idle,
            RunState::Running(run) => StateSummary::Running {
                run_id: run.run_id,
                config: run.config.clone(),
                stopping: run.cancel.is_cancelled(),
                snapshot: run.stats.snapshot(),
            },
            RunState::Finished { run_id, snapshot } => StateSummary::Finished {
                run_id: *run_id,
                snapshot: snapshot.clone(),
            },
        }
    }
}

/// Read-only view of the orchestrator state.
#[derive(Clone, Debug, PartialEq)]
pub enum StateSummary {
    Idle,
    Running {
        run_id: RunId,
        config: RunConfig,
        /// `stop` was called and the actors are winding down.
        stopping: bool,
        snapshot: StatsSnapshot,
    },
    Finished {
        run_id: RunId,
        snapshot: StatsSnapshot,
    },
}

impl StateSummary {
    pub fn is_running(&self) -> bool {
        matches!(self, StateSummary::Running { .. })
    }

    pub fn run_id(&self) -> Option<RunId> {
        match self {
            StateSummary::Idle => None,
            StateSummary::Running { run_id, .. } | StateSummary::Finished { run_id, .. } => {
                Some(*run_id)
            }
        }
    }

    pub fn snapshot(&self) -> Option<&StatsSnapshot> {
        match self {
            StateSummary::Idle => None,
            StateSummary::Running { snapshot, .. } | StateSummary::Finished { snapshot, .. } => {
                Some(snapshot)
            }
        }
    }
}
