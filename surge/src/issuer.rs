//! The seam between the engine and whatever actually performs a request.
use std::time::Duration;
use surge_core::TargetProfile;
use thiserror::Error;
use url::Url;

/// What a single request is issued against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    pub url: Url,
    pub profile: TargetProfile,
}

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Unexpected status code {0}")]
    Status(u16),

    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Performs one outbound call.
///
/// Implementations do not need to enforce a timeout; the actor bounds every call with the
/// orchestrator's request timeout and records an expired call as a failure.
#[trait_variant::make(RequestIssuer: Send)]
pub trait LocalRequestIssuer {
    async fn issue(&self, target: &Target) -> Result<(), IssueError>;
}
