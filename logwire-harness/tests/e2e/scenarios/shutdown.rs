//! Cancellation: an interrupt releases everything created so far.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use logwire_cloud::FakeCloud;
use logwire_core::error::HarnessError;
use logwire_environment::FakeRuntime;

use crate::helpers::{FUNCTION, Fixture, cancel_after, container_ids};

#[tokio::test(start_paused = true)]
async fn cancelled_before_start_provisions_nothing() {
    let fixture = Fixture::new(8);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = fixture.controller().run(cancel).await.unwrap_err();
    assert!(matches!(err, HarnessError::Cancelled));
    assert!(fixture.runtime.pulled().is_empty());
    assert!(fixture.cloud.journal().is_empty());
}

#[tokio::test(start_paused = true)]
async fn interrupt_during_backend_start_removes_container() {
    let fixture = Fixture::new(8)
        .runtime(FakeRuntime::new().with_host_port(45_080).with_ready_after(u32::MAX))
        .configure(|c| c.emulator.startup_timeout_secs = 100_000);
    let cancel = CancellationToken::new();
    cancel_after(&cancel, Duration::from_secs(5));

    let err = fixture.controller().run(cancel).await.unwrap_err();
    assert!(matches!(err, HarnessError::Cancelled));
    assert!(fixture.runtime.running().is_empty());
    let (emulator, _) = container_ids();
    assert_eq!(fixture.runtime.removed(), vec![emulator]);
    assert!(fixture.cloud.journal().is_empty());
}

#[tokio::test(start_paused = true)]
async fn interrupt_during_stream_activation_deletes_stream() {
    let fixture = Fixture::new(8)
        .cloud(FakeCloud::new().with_stream_pending_polls(u32::MAX))
        .configure(|c| c.readiness.max_attempts = 10_000);
    let cancel = CancellationToken::new();
    cancel_after(&cancel, Duration::from_secs(60));

    let err = fixture.controller().run(cancel).await.unwrap_err();
    assert!(matches!(err, HarnessError::Cancelled));
    assert_eq!(
        fixture.deletions(),
        vec![
            "delete_stream api_logs_to_cloudwatch".to_owned(),
            format!("delete_log_group /aws/lambda/{FUNCTION}"),
            format!("delete_function {FUNCTION}"),
        ]
    );
    assert!(!fixture.cloud.has_stream("api_logs_to_cloudwatch"));
    assert!(fixture.runtime.running().is_empty());
}

#[tokio::test(start_paused = true)]
async fn interrupt_during_readiness_unwinds_in_reverse() {
    let fixture = Fixture::new(8)
        .cloud(FakeCloud::new().with_pending_polls(u32::MAX))
        .configure(|c| c.readiness.max_attempts = 10_000);
    let cancel = CancellationToken::new();
    cancel_after(&cancel, Duration::from_secs(30));

    let err = fixture.controller().run(cancel).await.unwrap_err();
    assert!(matches!(err, HarnessError::Cancelled));
    assert_eq!(
        fixture.deletions(),
        vec![
            format!("delete_log_group /aws/lambda/{FUNCTION}"),
            format!("delete_function {FUNCTION}"),
        ]
    );
    let (emulator, mock_api) = container_ids();
    assert_eq!(fixture.runtime.removed(), vec![mock_api, emulator]);
}

#[tokio::test(start_paused = true)]
async fn interrupt_during_observation_still_tears_down() {
    // every invocation fails, so the observers never reach their target
    let fixture = Fixture::new(4)
        .cloud(FakeCloud::new().failing("invoke"))
        .configure(|c| c.observer.max_polls = 10_000);
    let cancel = CancellationToken::new();
    cancel_after(&cancel, Duration::from_secs(60));

    let err = fixture.controller().run(cancel).await.unwrap_err();
    assert!(matches!(err, HarnessError::Cancelled));
    assert_eq!(fixture.deletions().len(), 4);
    assert!(fixture.runtime.running().is_empty());
}

#[tokio::test(start_paused = true)]
async fn follow_mode_tails_until_interrupted() {
    let fixture = Fixture::new(8).configure(|c| c.observer.follow = true);
    let cancel = CancellationToken::new();
    cancel_after(&cancel, Duration::from_secs(120));

    let report = fixture
        .controller()
        .run(cancel)
        .await
        .expect("interrupting follow mode is a clean exit");
    assert!(report.log_lines >= 8);
    assert_eq!(fixture.deletions().len(), 4);
    assert!(fixture.runtime.running().is_empty());
}
