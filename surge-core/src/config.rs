use crate::MAX_ACTOR_COUNT;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::time::Duration;
use thiserror::Error;

/// Parameters of a single run. Immutable once the run has started.
///
/// The field aliases accept the payload shape older dashboards send
/// (`users`, `searchesPerUser`, `minDelay`, `maxDelay`, `deviceType`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunConfig {
    #[serde(alias = "users")]
    pub actor_count: u32,
    #[serde(alias = "searchesPerUser")]
    pub requests_per_actor: u32,
    #[serde(alias = "minDelay")]
    pub min_delay_ms: u64,
    #[serde(alias = "maxDelay")]
    pub max_delay_ms: u64,
    #[serde(alias = "deviceType")]
    pub target_profile: TargetProfile,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            actor_count: 1,
            requests_per_actor: 30,
            min_delay_ms: 1_000,
            max_delay_ms: 5_000,
            target_profile: TargetProfile::Desktop,
        }
    }
}

impl RunConfig {
    pub fn new(actor_count: u32, requests_per_actor: u32) -> Self {
        Self {
            actor_count,
            requests_per_actor,
            ..Default::default()
        }
    }

    pub fn delay(mut self, min: Duration, max: Duration) -> Self {
        self.min_delay_ms = saturating_millis(min);
        self.max_delay_ms = saturating_millis(max);
        self
    }

    pub fn profile(mut self, profile: TargetProfile) -> Self {
        self.target_profile = profile;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.actor_count < 1 {
            return Err(ConfigError::NoActors);
        }
        if self.actor_count > MAX_ACTOR_COUNT {
            return Err(ConfigError::TooManyActors {
                requested: self.actor_count,
                max: MAX_ACTOR_COUNT,
            });
        }
        if self.requests_per_actor < 1 {
            return Err(ConfigError::NoRequests);
        }
        if self.min_delay_ms > self.max_delay_ms {
            return Err(ConfigError::DelayRange {
                min: self.min_delay_ms,
                max: self.max_delay_ms,
            });
        }
        Ok(())
    }

    /// Inclusive range the inter-request delay is drawn from, in milliseconds.
    pub fn delay_range_ms(&self) -> RangeInclusive<u64> {
        self.min_delay_ms..=self.max_delay_ms
    }

    /// Most requests a run with this configuration can issue.
    pub fn max_requests(&self) -> u64 {
        u64::from(self.actor_count) * u64::from(self.requests_per_actor)
    }
}

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Opaque tag handed to the target selector. The engine never inspects it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetProfile {
    #[default]
    #[serde(alias = "desktop")]
    Desktop,
    #[serde(alias = "mobile")]
    Mobile,
}

impl fmt::Display for TargetProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetProfile::Desktop => write!(f, "Desktop"),
            TargetProfile::Mobile => write!(f, "Mobile"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("actorCount must be at least 1")]
    NoActors,

    #[error("actorCount {requested} exceeds the maximum of {max}")]
    TooManyActors { requested: u32, max: u32 },

    #[error("requestsPerActor must be at least 1")]
    NoRequests,

    #[error("minDelayMs ({min}) must not exceed maxDelayMs ({max})")]
    DelayRange { min: u64, max: u64 },
}
