use surge_core::{RunId, RunStatus, StatsSnapshot};

/// Events pushed to subscribers over the course of a run.
///
/// Every run produces exactly one `Started`, any number of `Update`s and exactly one
/// `Finished`. The cumulative counts carried by successive snapshots of one run never
/// decrease.
#[derive(Clone, Debug, PartialEq)]
pub enum RunEvent {
    Started {
        run_id: RunId,
    },
    Update {
        run_id: RunId,
        snapshot: StatsSnapshot,
    },
    /// Terminal event. `snapshot.status` tells completed, stopped and failed apart;
    /// `error` is only set for failed runs.
    Finished {
        run_id: RunId,
        snapshot: StatsSnapshot,
        error: Option<String>,
    },
}

impl RunEvent {
    pub fn run_id(&self) -> RunId {
        match self {
            RunEvent::Started { run_id }
            | RunEvent::Update { run_id, .. }
            | RunEvent::Finished { run_id, .. } => *run_id,
        }
    }

    pub fn snapshot(&self) -> Option<&StatsSnapshot> {
        match self {
            RunEvent::Started { .. } => None,
            RunEvent::Update { snapshot, .. } | RunEvent::Finished { snapshot, .. } => {
                Some(snapshot)
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunEvent::Finished { .. })
    }

    /// Terminal status, if this is the terminal event.
    pub fn terminal_status(&self) -> Option<RunStatus> {
        match self {
            RunEvent::Finished { snapshot, .. } => Some(snapshot.status),
            _ => None,
        }
    }
}
