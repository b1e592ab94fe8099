use std::time::Duration;

/// Upper bound on the time a single request may take before it counts as a failure.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default spacing between `update` events.
pub const DEFAULT_PUBLISH_INTERVAL: Duration = Duration::from_millis(100);

/// Hard ceiling on concurrent actors for a single run.
pub const MAX_ACTOR_COUNT: u32 = 10_000;

/// Buffered events per subscriber before it starts skipping updates.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

pub const DEFAULT_PORT: u16 = 5000;
