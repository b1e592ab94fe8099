#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod aggregate;
pub mod error;
pub mod events;
pub mod issuer;
pub mod orchestrator;
pub mod targets;

pub(crate) mod actor;

pub use error::{StartError, StatsError};
pub use events::RunEvent;
pub use issuer::{IssueError, LocalRequestIssuer, RequestIssuer, Target};
pub use orchestrator::{Orchestrator, OrchestratorSettings, StateSummary};
pub use targets::{FixedTarget, SearchTargets, TargetSelector};

pub use surge_core::{
    ConfigError, RunConfig, RunId, RunStatus, StatsSnapshot, TargetProfile, MAX_ACTOR_COUNT,
};

pub mod prelude {
    pub use crate::events::RunEvent;
    pub use crate::issuer::{IssueError, RequestIssuer, Target};
    pub use crate::orchestrator::{Orchestrator, OrchestratorSettings};
    pub use crate::targets::{SearchTargets, TargetSelector};
    pub use surge_core::{RunConfig, RunStatus, StatsSnapshot, TargetProfile};
}
