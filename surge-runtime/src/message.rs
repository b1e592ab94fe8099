//! JSON messages exchanged over the WebSocket and the HTTP routes.
use serde::{Deserialize, Serialize};
use surge::{RunEvent, StateSummary};
use surge_core::{RunConfig, RunId, RunStatus, StatsSnapshot};

/// Client to server. `{"event":"start_test","data":{..}}` or `{"event":"stop_test"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientMessage {
    StartTest {
        #[serde(default)]
        data: RunConfig,
    },
    StopTest,
}

/// Server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    TestStarted {
        run_id: RunId,
    },
    TestUpdate {
        run_id: RunId,
        data: StatsSnapshot,
    },
    TestComplete {
        run_id: RunId,
        data: StatsSnapshot,
    },
    TestStopped {
        run_id: RunId,
        data: StatsSnapshot,
    },
    TestFailed {
        run_id: RunId,
        data: StatsSnapshot,
        error: String,
    },
    /// Only sent to the socket whose `start_test` was refused.
    TestRejected {
        reason: String,
    },
}

impl ServerMessage {
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_text(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ServerMessage::TestComplete { .. }
                | ServerMessage::TestStopped { .. }
                | ServerMessage::TestFailed { .. }
        )
    }
}

impl ClientMessage {
    pub fn from_text(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<RunEvent> for ServerMessage {
    fn from(event: RunEvent) -> Self {
        match event {
            RunEvent::Started { run_id } => ServerMessage::TestStarted { run_id },
            RunEvent::Update { run_id, snapshot } => ServerMessage::TestUpdate {
                run_id,
                data: snapshot,
            },
            RunEvent::Finished {
                run_id,
                snapshot,
                error,
            } => match snapshot.status {
                RunStatus::Stopped => ServerMessage::TestStopped {
                    run_id,
                    data: snapshot,
                },
                RunStatus::Failed => ServerMessage::TestFailed {
                    run_id,
                    data: snapshot,
                    error: error.unwrap_or_else(|| "Run failed".to_string()),
                },
                RunStatus::Completed | RunStatus::Running => ServerMessage::TestComplete {
                    run_id,
                    data: snapshot,
                },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub run_id: RunId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopResponse {
    pub stopped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateName {
    Idle,
    Running,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub state: StateName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<RunConfig>,
    #[serde(default)]
    pub stopping: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<StatsSnapshot>,
}

impl From<StateSummary> for StatusResponse {
    fn from(summary: StateSummary) -> Self {
        match summary {
            StateSummary::Idle => StatusResponse {
                state: StateName::Idle,
                run_id: None,
                config: None,
                stopping: false,
                snapshot: None,
            },
            StateSummary::Running {
                run_id,
                config,
                stopping,
                snapshot,
            } => StatusResponse {
                state: StateName::Running,
                run_id: Some(run_id),
                config: Some(config),
                stopping,
                snapshot: Some(snapshot),
            },
            StateSummary::Finished { run_id, snapshot } => StatusResponse {
                state: StateName::Finished,
                run_id: Some(run_id),
                config: None,
                stopping: false,
                snapshot: Some(snapshot),
            },
        }
    }
}
