use crate::aggregate::StatsAggregate;
use crate::error::StatsError;
use crate::issuer::{IssueError, RequestIssuer};
use crate::targets::TargetSelector;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use surge_core::{Outcome, RunConfig, RunId};
use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Everything the actors of one run share.
pub(crate) struct RunContext<I, S> {
    pub run_id: RunId,
    pub config: RunConfig,
    pub stats: Arc<StatsAggregate>,
    pub cancel: CancellationToken,
    pub issuer: Arc<I>,
    pub targets: Arc<S>,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ActorReport {
    pub actor: u32,
    pub issued: u32,
    pub cancelled: bool,
}

/// Run one actor's request sequence to exhaustion or cancellation.
///
/// Failed and timed out requests are recorded, never returned. The only error is a fault
/// in the shared aggregate.
pub(crate) async fn run_actor<I, S>(
    actor: u32,
    ctx: Arc<RunContext<I, S>>,
) -> Result<ActorReport, StatsError>
where
    I: RequestIssuer + Send + Sync,
    S: TargetSelector + Send + Sync,
{
    let total = ctx.config.requests_per_actor;
    let mut rng = SmallRng::from_entropy();
    let mut report = ActorReport {
        actor,
        issued: 0,
        cancelled: false,
    };

    for i in 0..total {
        if ctx.cancel.is_cancelled() {
            debug!(actor, "Interrupted before request {}/{total}.", i + 1);
            report.cancelled = true;
            break;
        }

        let target = ctx.targets.select(ctx.config.target_profile, &mut rng);
        trace!(actor, url = %target.url, "Request {}/{total}", i + 1);

        let start = Instant::now();
        let outcome = match timeout(ctx.request_timeout, ctx.issuer.issue(&target)).await {
            Ok(Ok(())) => Outcome::success(start.elapsed()),
            Ok(Err(err)) => {
                warn!(actor, "Request failed: {err}");
                Outcome::failure(err.to_string())
            }
            Err(_) => {
                let err = IssueError::Timeout(ctx.request_timeout);
                warn!(actor, "Request failed: {err}");
                Outcome::failure(err.to_string())
            }
        };

        #[cfg(feature = "metrics")]
        record_metrics(&outcome);

        let recorded = ctx.stats.record(&outcome)?;
        report.issued += 1;
        debug!(actor, success = outcome.is_success(), "Recorded. Total: {recorded}");

        if i + 1 < total {
            let delay = draw_delay(&ctx.config, &mut rng);
            trace!(actor, "Waiting {delay:?}");
            tokio::select! {
                _ = ctx.cancel.cancelled() => {
                    debug!(actor, "Interrupted during delay.");
                    report.cancelled = true;
                    break;
                }
                _ = sleep(delay) => {}
            }
        }
    }

    Ok(report)
}

fn draw_delay<R: Rng + ?Sized>(config: &RunConfig, rng: &mut R) -> Duration {
    Duration::from_millis(rng.gen_range(config.delay_range_ms()))
}

#[cfg(feature = "metrics")]
fn record_metrics(outcome: &Outcome) {
    match outcome {
        Outcome::Success { latency } => {
            metrics::counter!("surge_requests_success").increment(1);
            metrics::histogram!("surge_request_latency").record(latency.as_secs_f64());
        }
        Outcome::Failure { .. } => {
            metrics::counter!("surge_requests_error").increment(1);
        }
    }
}
