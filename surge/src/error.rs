use std::sync::PoisonError;
use surge_core::{ConfigError, RunId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("Statistics mutex is poisoned.")]
    Poisoned,

    #[error("Statistics are frozen; the run has already finished.")]
    Frozen,
}

impl<T> From<PoisonError<T>> for StatsError {
    fn from(_err: PoisonError<T>) -> Self {
        Self::Poisoned
    }
}

#[derive(Debug, Error)]
pub enum StartError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("Run {0} is already in progress.")]
    AlreadyRunning(RunId),

    #[error("Event channel closed unexpectedly.")]
    ChannelClosed,
}
