mod utils;
#[allow(unused)]
use utils::*;

use mock_service::MockService;
use std::time::Duration;
use surge::{Orchestrator, OrchestratorSettings, SearchTargets};
use surge_core::{RunConfig, RunStatus, TargetProfile};
use surge_runtime::HttpIssuer;

async fn orchestrator(
    route: &str,
    request_timeout: Duration,
) -> (Orchestrator<HttpIssuer, SearchTargets>, MockService) {
    init();
    let mock = MockService::spawn().await.unwrap();
    let targets = SearchTargets::new(mock.url(route).parse().unwrap());
    let settings = OrchestratorSettings::default()
        .request_timeout(request_timeout)
        .publish_interval(Duration::ZERO);
    let orchestrator = Orchestrator::with_settings(HttpIssuer::new().unwrap(), targets, settings);
    (orchestrator, mock)
}

fn quick(actors: u32, requests: u32) -> RunConfig {
    RunConfig::new(actors, requests).delay(Duration::ZERO, Duration::from_millis(5))
}

#[tokio::test(flavor = "multi_thread")]
#[ntest::timeout(10_000)]
async fn every_request_reaches_the_target_once() {
    let (orchestrator, mock) = orchestrator("/search", Duration::from_secs(2)).await;

    let stats = orchestrator.run(quick(3, 5)).await.unwrap();

    assert_eq!(stats.status, RunStatus::Completed);
    assert_eq!(stats.total_requests, 15);
    assert_eq!(stats.success_count, 15);
    assert_eq!(mock.hits.get(), 15);
}

#[tokio::test(flavor = "multi_thread")]
#[ntest::timeout(10_000)]
async fn error_status_is_a_failed_request() {
    let (orchestrator, _mock) = orchestrator("/status/503/search", Duration::from_secs(2)).await;

    let stats = orchestrator
        .run(quick(2, 3).profile(TargetProfile::Mobile))
        .await
        .unwrap();

    assert_eq!(stats.status, RunStatus::Completed);
    assert_eq!(stats.error_count, 6);
    assert_eq!(stats.success_count, 0);
    assert_eq!(stats.min_latency_ms, 0);
    assert!(stats.latency_samples.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
#[ntest::timeout(10_000)]
async fn slow_target_times_out() {
    let (orchestrator, _mock) =
        orchestrator("/delay/ms/2000/search", Duration::from_millis(100)).await;

    let stats = orchestrator.run(quick(2, 2)).await.unwrap();

    assert_eq!(stats.total_requests, 4);
    assert_eq!(stats.error_count, 4);
}

#[tokio::test(flavor = "multi_thread")]
#[ntest::timeout(10_000)]
async fn latency_reflects_the_target() {
    let (orchestrator, _mock) = orchestrator("/delay/ms/50/search", Duration::from_secs(2)).await;

    let stats = orchestrator.run(quick(2, 2)).await.unwrap();

    assert_eq!(stats.success_count, 4);
    assert!(stats.min_latency_ms >= 50);
    assert!(stats.average_latency_ms >= 50.0);
    assert!(stats.max_latency_ms >= stats.min_latency_ms);
}

#[tokio::test(flavor = "multi_thread")]
#[ntest::timeout(10_000)]
async fn unreachable_target_is_recorded_not_raised() {
    init();
    let targets = SearchTargets::new("http://127.0.0.1:9/search".parse().unwrap());
    let orchestrator = Orchestrator::with_settings(
        HttpIssuer::new().unwrap(),
        targets,
        OrchestratorSettings::default().request_timeout(Duration::from_secs(2)),
    );

    let stats = orchestrator.run(quick(1, 2)).await.unwrap();

    assert_eq!(stats.total_requests, 2);
    assert_eq!(stats.error_count, 2);
}
