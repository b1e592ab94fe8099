mod utils;
#[allow(unused)]
use utils::*;

use std::time::Duration;
use surge_core::{RunConfig, RunStatus};
use surge_runtime::message::{ClientMessage, ServerMessage};

fn quick(actors: u32, requests: u32) -> RunConfig {
    RunConfig::new(actors, requests).delay(Duration::ZERO, Duration::from_millis(5))
}

fn parked(actors: u32) -> RunConfig {
    RunConfig::new(actors, 100).delay(Duration::from_secs(30), Duration::from_secs(60))
}

#[tokio::test(flavor = "multi_thread")]
#[ntest::timeout(10_000)]
async fn run_streams_updates_to_completion() {
    let harness = Harness::start("/search").await;
    let mut socket = harness.connect().await;

    send(&mut socket, &ClientMessage::StartTest { data: quick(3, 5) }).await;
    let seen = until_terminal(&mut socket).await;

    let ServerMessage::TestStarted { run_id } = seen[0] else {
        panic!("Expected test_started first, got {:?}", seen[0]);
    };

    let mut last_total = 0;
    for message in &seen[1..seen.len() - 1] {
        match message {
            ServerMessage::TestUpdate { run_id: id, data } => {
                assert_eq!(*id, run_id);
                assert_eq!(data.total_requests, data.success_count + data.error_count);
                assert!(data.total_requests >= last_total);
                assert!(data.total_requests <= 15);
                last_total = data.total_requests;
            }
            other => panic!("Unexpected message mid-run: {other:?}"),
        }
    }

    match seen.last() {
        Some(ServerMessage::TestComplete { run_id: id, data }) => {
            assert_eq!(*id, run_id);
            assert_eq!(data.status, RunStatus::Completed);
            assert_eq!(data.total_requests, 15);
            assert_eq!(data.success_count, 15);
        }
        other => panic!("Expected test_complete, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
#[ntest::timeout(5_000)]
async fn stop_test_ends_the_run() {
    let harness = Harness::start("/search").await;
    let mut socket = harness.connect().await;

    send(&mut socket, &ClientMessage::StartTest { data: parked(4) }).await;
    assert!(matches!(
        next(&mut socket).await,
        ServerMessage::TestStarted { .. }
    ));
    tokio::time::sleep(Duration::from_millis(200)).await;

    send(&mut socket, &ClientMessage::StopTest).await;
    let seen = until_terminal(&mut socket).await;

    match seen.last() {
        Some(ServerMessage::TestStopped { data, .. }) => {
            assert_eq!(data.status, RunStatus::Stopped);
            assert_eq!(data.total_requests, 4);
        }
        other => panic!("Expected test_stopped, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
#[ntest::timeout(5_000)]
async fn second_start_is_rejected_for_the_sender_only() {
    let harness = Harness::start("/search").await;
    let mut owner = harness.connect().await;
    let mut other = harness.connect().await;

    send(&mut owner, &ClientMessage::StartTest { data: parked(1) }).await;
    let ServerMessage::TestStarted { run_id } = next(&mut owner).await else {
        panic!("Expected test_started");
    };
    assert_eq!(next(&mut other).await, ServerMessage::TestStarted { run_id });

    send(&mut other, &ClientMessage::StartTest { data: quick(5, 5) }).await;
    loop {
        match next(&mut other).await {
            ServerMessage::TestRejected { reason } => {
                assert!(reason.contains("already in progress"));
                break;
            }
            ServerMessage::TestUpdate { run_id: id, .. } => assert_eq!(id, run_id),
            unexpected => panic!("Unexpected message: {unexpected:?}"),
        }
    }

    send(&mut owner, &ClientMessage::StopTest).await;
    let seen = until_terminal(&mut owner).await;
    // The rejection went to `other` only.
    assert!(!seen
        .iter()
        .any(|m| matches!(m, ServerMessage::TestRejected { .. })));
    match seen.last() {
        Some(ServerMessage::TestStopped { run_id: id, data }) => {
            assert_eq!(*id, run_id);
            assert_eq!(data.total_requests, 1);
        }
        unexpected => panic!("Expected test_stopped, got {unexpected:?}"),
    }
    // Only the first run's actor ever reached the target.
    assert_eq!(harness.mock.hits.get(), 1);
}

#[tokio::test(flavor = "multi_thread")]
#[ntest::timeout(5_000)]
async fn invalid_start_is_rejected() {
    let harness = Harness::start("/search").await;
    let mut socket = harness.connect().await;

    send_raw(
        &mut socket,
        r#"{"event":"start_test","data":{"users":1,"searchesPerUser":0}}"#,
    )
    .await;

    match next(&mut socket).await {
        ServerMessage::TestRejected { reason } => {
            assert!(reason.contains("requestsPerActor must be at least 1"))
        }
        unexpected => panic!("Expected test_rejected, got {unexpected:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
#[ntest::timeout(10_000)]
async fn restart_right_after_completion() {
    let harness = Harness::start("/search").await;
    let mut socket = harness.connect().await;

    send(&mut socket, &ClientMessage::StartTest { data: quick(2, 2) }).await;
    let first = until_terminal(&mut socket).await;
    assert!(matches!(first.last(), Some(ServerMessage::TestComplete { .. })));

    send(&mut socket, &ClientMessage::StartTest { data: quick(1, 3) }).await;
    let second = until_terminal(&mut socket).await;

    assert!(matches!(second[0], ServerMessage::TestStarted { .. }));
    match second.last() {
        Some(ServerMessage::TestComplete { data, .. }) => assert_eq!(data.total_requests, 3),
        unexpected => panic!("Expected test_complete, got {unexpected:?}"),
    }
    assert_eq!(harness.mock.hits.get(), 7);
}

#[tokio::test(flavor = "multi_thread")]
#[ntest::timeout(5_000)]
async fn late_joiner_catches_up() {
    let harness = Harness::start("/search").await;
    let mut owner = harness.connect().await;

    send(&mut owner, &ClientMessage::StartTest { data: parked(3) }).await;
    let ServerMessage::TestStarted { run_id } = next(&mut owner).await else {
        panic!("Expected test_started");
    };
    tokio::time::sleep(Duration::from_millis(200)).await;

    let mut late = harness.connect().await;
    assert_eq!(next(&mut late).await, ServerMessage::TestStarted { run_id });
    match next(&mut late).await {
        ServerMessage::TestUpdate { run_id: id, data } => {
            assert_eq!(id, run_id);
            assert_eq!(data.total_requests, 3);
        }
        unexpected => panic!("Expected test_update, got {unexpected:?}"),
    }

    send(&mut late, &ClientMessage::StopTest).await;
    let seen = until_terminal(&mut owner).await;
    assert!(matches!(seen.last(), Some(ServerMessage::TestStopped { .. })));
}

#[tokio::test(flavor = "multi_thread")]
#[ntest::timeout(20_000)]
async fn late_joiners_see_one_start_and_rising_totals() {
    let harness =
        Harness::with("/search", |runtime| runtime.publish_interval(Duration::ZERO)).await;
    let mut owner = harness.connect().await;

    let busy = RunConfig::new(8, 100_000).delay(Duration::ZERO, Duration::from_millis(2));
    send(&mut owner, &ClientMessage::StartTest { data: busy }).await;
    let ServerMessage::TestStarted { run_id } = next(&mut owner).await else {
        panic!("Expected test_started");
    };
    drop(owner);

    for joiner in 0..10 {
        let mut late = harness.connect().await;
        assert_eq!(
            next(&mut late).await,
            ServerMessage::TestStarted { run_id },
            "joiner {joiner}"
        );

        let mut last_total = 0;
        for _ in 0..40 {
            match next(&mut late).await {
                ServerMessage::TestUpdate { run_id: id, data } => {
                    assert_eq!(id, run_id);
                    assert!(
                        data.total_requests >= last_total,
                        "joiner {joiner} went from {last_total} to {}",
                        data.total_requests
                    );
                    last_total = data.total_requests;
                }
                unexpected => panic!("joiner {joiner} got {unexpected:?}"),
            }
        }
    }

    let mut closer = harness.connect().await;
    send(&mut closer, &ClientMessage::StopTest).await;
    let seen = until_terminal(&mut closer).await;

    assert_eq!(seen[0], ServerMessage::TestStarted { run_id });
    assert_eq!(
        seen.iter()
            .filter(|m| matches!(m, ServerMessage::TestStarted { .. }))
            .count(),
        1
    );
    let totals: Vec<_> = seen
        .iter()
        .filter_map(|message| match message {
            ServerMessage::TestUpdate { data, .. } | ServerMessage::TestStopped { data, .. } => {
                Some(data.total_requests)
            }
            _ => None,
        })
        .collect();
    assert!(totals.windows(2).all(|pair| pair[0] <= pair[1]), "{totals:?}");
    assert!(matches!(seen.last(), Some(ServerMessage::TestStopped { .. })));
}
