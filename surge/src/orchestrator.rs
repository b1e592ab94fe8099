//! Run lifecycle: validation, actor fan-out, update publishing and the terminal event.
//!
//! An [`Orchestrator`] owns exactly one [`RunState`]. `start` moves it from idle to running
//! and spawns the run driver; the driver joins every actor, freezes the statistics and
//! moves the state back to idle before announcing the terminal event, so a subscriber
//! reacting to that event can start the next run straight away.
use crate::actor::RunContext;
use crate::aggregate::StatsAggregate;
use crate::error::StartError;
use crate::events::RunEvent;
use crate::issuer::RequestIssuer;
use crate::targets::TargetSelector;
use arc_swap::ArcSwap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use surge_core::{
    RunConfig, RunId, StatsSnapshot, DEFAULT_EVENT_CAPACITY, DEFAULT_PUBLISH_INTERVAL,
    DEFAULT_REQUEST_TIMEOUT,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
#[allow(unused_imports)]
use tracing::{debug, error, info, info_span, instrument, trace, warn, Instrument, Span};

mod driver;
mod state;

pub use state::StateSummary;
use state::{ActiveRun, RunState};

#[derive(Clone, Debug)]
pub struct OrchestratorSettings {
    /// Bound on every single request. An expired request is recorded as a failure.
    pub request_timeout: Duration,
    /// Minimum spacing between `update` events. Changes in between are coalesced into
    /// one update; `Duration::ZERO` publishes every change.
    pub publish_interval: Duration,
    /// Events buffered per subscriber before the slowest one starts skipping updates.
    pub event_capacity: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            publish_interval: DEFAULT_PUBLISH_INTERVAL,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl OrchestratorSettings {
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn publish_interval(mut self, interval: Duration) -> Self {
        self.publish_interval = interval;
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}

/// Handle to the load-test engine. Cheap to clone; all clones drive the same state.
pub struct Orchestrator<I, S> {
    shared: Arc<Shared<I, S>>,
}

impl<I, S> Clone for Orchestrator<I, S> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

pub(crate) struct Shared<I, S> {
    state: Mutex<RunState>,
    events: broadcast::Sender<RunEvent>,
    latest: ArcSwap<StatsSnapshot>,
    issuer: Arc<I>,
    targets: Arc<S>,
    settings: OrchestratorSettings,
    /// Parent of every run span. Captured at construction so a run never inherits the
    /// span of whichever caller started it.
    span: Span,
}

impl<I, S> Orchestrator<I, S>
where
    I: RequestIssuer + Send + Sync + 'static,
    S: TargetSelector + Send + Sync + 'static,
{
    pub fn new(issuer: I, targets: S) -> Self {
        Self::with_settings(issuer, targets, OrchestratorSettings::default())
    }

    pub fn with_settings(issuer: I, targets: S, settings: OrchestratorSettings) -> Self {
        let (events, _) = broadcast::channel(settings.event_capacity.max(1));
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(RunState::Idle),
                events,
                latest: ArcSwap::from_pointee(StatsSnapshot::empty()),
                issuer: Arc::new(issuer),
                targets: Arc::new(targets),
                settings,
                span: info_span!("orchestrator"),
            }),
        }
    }

    /// Start a run. Must be called from within a Tokio runtime.
    ///
    /// Rejected without side effects when the configuration is invalid or another run is
    /// still in progress.
    pub fn start(&self, config: RunConfig) -> Result<RunId, StartError> {
        config.validate()?;

        let mut state = self.shared.lock_state();
        if let RunState::Running(run) = &*state {
            debug!(run_id = %run.run_id, "Start rejected, a run is already in progress.");
            return Err(StartError::AlreadyRunning(run.run_id));
        }

        let run_id = RunId::new();
        let ctx = Arc::new(RunContext {
            run_id,
            config: config.clone(),
            stats: Arc::new(StatsAggregate::new()),
            cancel: CancellationToken::new(),
            issuer: self.shared.issuer.clone(),
            targets: self.shared.targets.clone(),
            request_timeout: self.shared.settings.request_timeout,
        });

        *state = RunState::Running(ActiveRun {
            run_id,
            config,
            stats: ctx.stats.clone(),
            cancel: ctx.cancel.clone(),
        });
        self.shared.latest.store(Arc::new(StatsSnapshot::empty()));
        let _ = self.shared.events.send(RunEvent::Started { run_id });
        drop(state);

        tokio::spawn(
            driver::supervise(self.shared.clone(), ctx).instrument(self.shared.span.clone()),
        );

        Ok(run_id)
    }

    /// Ask the current run to stop. Returns whether a running run was signalled.
    ///
    /// Does not wait: actors finish their in-flight request, no new request is issued,
    /// and the terminal event follows asynchronously.
    pub fn stop(&self) -> bool {
        let state = self.shared.lock_state();
        match &*state {
            RunState::Running(run) => {
                if !run.cancel.is_cancelled() {
                    info!(run_id = %run.run_id, "Stop requested.");
                }
                run.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// Start a run and wait for its terminal event.
    pub async fn run(&self, config: RunConfig) -> Result<StatsSnapshot, StartError> {
        let mut events = self.subscribe();
        let run_id = self.start(config)?;

        loop {
            match events.recv().await {
                Ok(RunEvent::Finished {
                    run_id: finished,
                    snapshot,
                    ..
                }) if finished == run_id => return Ok(snapshot),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => trace!("Skipped {skipped} events."),
                Err(RecvError::Closed) => return Err(StartError::ChannelClosed),
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.shared.events.subscribe()
    }

    pub fn status(&self) -> StateSummary {
        self.shared.lock_state().summary()
    }

    pub fn is_running(&self) -> bool {
        matches!(&*self.shared.lock_state(), RunState::Running(_))
    }

    /// The most recently published snapshot, read without locking.
    pub fn latest(&self) -> Arc<StatsSnapshot> {
        self.shared.latest.load_full()
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.shared.settings
    }
}

impl<I, S> Shared<I, S> {
    // The state is only ever replaced wholesale, so a poisoned guard still holds a valid
    // value.
    fn lock_state(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn publish_update(&self, run_id: RunId, snapshot: StatsSnapshot) {
        self.latest.store(Arc::new(snapshot.clone()));
        let _ = self.events.send(RunEvent::Update { run_id, snapshot });
    }

    /// Return to idle and announce the terminal event. The event is sent while the state
    /// lock is held so it cannot be overtaken by the `Started` of the next run.
    pub(crate) fn finish(&self, run_id: RunId, snapshot: StatsSnapshot, error: Option<String>) {
        let mut state = self.lock_state();
        match &*state {
            RunState::Running(run) if run.run_id == run_id => {}
            _ => {
                error!(%run_id, "Finished a run that is no longer current. Ignoring.");
                return;
            }
        }

        *state = RunState::Finished {
            run_id,
            snapshot: snapshot.clone(),
        };
        self.latest.store(Arc::new(snapshot.clone()));
        let _ = self.events.send(RunEvent::Finished {
            run_id,
            snapshot,
            error,
        });
    }

    pub(crate) fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }
}

impl<I, S> std::fmt::Debug for Orchestrator<I, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("settings", &self.shared.settings)
            .field("subscribers", &self.shared.events.receiver_count())
            .finish()
    }
}
