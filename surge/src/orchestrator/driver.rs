use super::Shared;
use crate::actor::{run_actor, RunContext};
use crate::issuer::RequestIssuer;
use crate::targets::TargetSelector;
use std::sync::Arc;
use surge_core::{RunStatus, StatsSnapshot};
use tokio::task::JoinSet;
use tokio::time::sleep;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn, Instrument};

/// Drive one run and make sure it ends with a terminal event, even if the driver itself
/// panics.
pub(super) async fn supervise<I, S>(shared: Arc<Shared<I, S>>, ctx: Arc<RunContext<I, S>>)
where
    I: RequestIssuer + Send + Sync + 'static,
    S: TargetSelector + Send + Sync + 'static,
{
    let handle = tokio::spawn(drive(shared.clone(), ctx.clone()).in_current_span());

    let (snapshot, error) = match handle.await {
        Ok(result) => result,
        Err(err) => {
            error!(run_id = %ctx.run_id, "Run driver failed: {err}");
            ctx.cancel.cancel();
            (
                ctx.stats.finalize(RunStatus::Failed),
                Some(format!("Run driver failed: {err}")),
            )
        }
    };

    shared.finish(ctx.run_id, snapshot, error);
}

#[instrument(name = "run", skip_all, fields(run_id = %ctx.run_id))]
async fn drive<I, S>(
    shared: Arc<Shared<I, S>>,
    ctx: Arc<RunContext<I, S>>,
) -> (StatsSnapshot, Option<String>)
where
    I: RequestIssuer + Send + Sync + 'static,
    S: TargetSelector + Send + Sync + 'static,
{
    info!(
        actors = ctx.config.actor_count,
        requests = ctx.config.requests_per_actor,
        max_requests = ctx.config.max_requests(),
        profile = %ctx.config.target_profile,
        "Run started."
    );

    let interval = shared.settings().publish_interval;
    let mut progress = ctx.stats.progress();
    let mut actors = JoinSet::new();
    for actor in 0..ctx.config.actor_count {
        actors.spawn(run_actor(actor, ctx.clone()).in_current_span());
    }

    let mut fault: Option<String> = None;
    let mut publishing = true;
    loop {
        tokio::select! {
            joined = actors.join_next() => match joined {
                Some(Ok(Ok(report))) => {
                    debug!(
                        actor = report.actor,
                        issued = report.issued,
                        cancelled = report.cancelled,
                        "Actor finished."
                    );
                }
                Some(Ok(Err(err))) => {
                    error!("Actor aborted: {err}");
                    fault.get_or_insert_with(|| err.to_string());
                    ctx.cancel.cancel();
                }
                Some(Err(err)) => {
                    error!("Actor task failed: {err}");
                    fault.get_or_insert_with(|| format!("Actor task failed: {err}"));
                    ctx.cancel.cancel();
                }
                None => break,
            },
            changed = progress.changed(), if publishing => {
                if changed.is_err() {
                    publishing = false;
                    continue;
                }
                progress.borrow_and_update();
                shared.publish_update(ctx.run_id, ctx.stats.snapshot());
                if !interval.is_zero() {
                    sleep(interval).await;
                }
            }
        }
    }

    let status = terminal_status(fault.is_some(), ctx.cancel.is_cancelled());
    let snapshot = ctx.stats.finalize(status);
    info!(
        %status,
        total = snapshot.total_requests,
        errors = snapshot.error_count,
        error_rate = snapshot.error_rate(),
        "Run finished."
    );

    (snapshot, fault)
}

fn terminal_status(faulted: bool, cancelled: bool) -> RunStatus {
    if faulted {
        RunStatus::Failed
    } else if cancelled {
        RunStatus::Stopped
    } else {
        RunStatus::Completed
    }
}
