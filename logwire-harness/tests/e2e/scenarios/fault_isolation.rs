//! Stage failures: the run aborts and only what was created is released.

use logwire_cloud::FakeCloud;
use logwire_core::error::HarnessError;
use logwire_environment::{FakeRuntime, FakeStubRegistry};

use crate::helpers::{FUNCTION, Fixture, container_ids};

#[tokio::test(start_paused = true)]
async fn emulator_start_failure_releases_nothing() {
    let fixture = Fixture::new(8).runtime(FakeRuntime::new().with_failing_create());
    let err = fixture.run().await.unwrap_err();

    assert!(matches!(err, HarnessError::FatalProvision { .. }), "{err}");
    assert!(fixture.runtime.removed().is_empty());
    assert!(fixture.cloud.journal().is_empty());
}

#[tokio::test(start_paused = true)]
async fn backend_never_ready_is_provision_timeout() {
    let fixture = Fixture::new(8).runtime(FakeRuntime::new().with_ready_after(u32::MAX));
    let err = fixture.run().await.unwrap_err();

    assert!(matches!(err, HarnessError::ProvisionTimeout { .. }), "{err}");
    // the container was registered for release before its readiness wait
    let (emulator, _) = container_ids();
    assert_eq!(fixture.runtime.removed(), vec![emulator]);
    assert!(fixture.runtime.running().is_empty());
}

#[tokio::test(start_paused = true)]
async fn rejected_stubs_release_both_containers() {
    let fixture = Fixture::new(8).registry(FakeStubRegistry::new().with_status(500));
    let err = fixture.run().await.unwrap_err();

    assert!(matches!(err, HarnessError::FatalProvision { .. }), "{err}");
    let (emulator, mock_api) = container_ids();
    assert_eq!(fixture.runtime.removed(), vec![mock_api, emulator]);
    assert!(fixture.cloud.journal().is_empty());
}

#[tokio::test(start_paused = true)]
async fn function_stuck_pending_times_out_and_unwinds() {
    let fixture = Fixture::new(8).cloud(FakeCloud::new().with_pending_polls(u32::MAX));
    let err = fixture.run().await.unwrap_err();

    assert!(matches!(err, HarnessError::ProvisionTimeout { .. }), "{err}");
    assert_eq!(
        fixture.deletions(),
        vec![
            format!("delete_log_group /aws/lambda/{FUNCTION}"),
            format!("delete_function {FUNCTION}"),
        ]
    );
    assert_eq!(fixture.cloud.invocations(), 0);
    assert!(fixture.runtime.running().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_function_aborts_before_stream() {
    let fixture = Fixture::new(8).cloud(FakeCloud::new().with_failed_function());
    let err = fixture.run().await.unwrap_err();

    assert!(matches!(err, HarnessError::FatalProvision { .. }), "{err}");
    assert!(!fixture.cloud.has_stream("api_logs_to_cloudwatch"));
    assert!(!fixture.cloud.has_function(FUNCTION));
}

#[tokio::test(start_paused = true)]
async fn subscription_failure_unwinds_stream_then_function() {
    let fixture = Fixture::new(8).cloud(FakeCloud::new().failing("put_subscription_filter"));
    let err = fixture.run().await.unwrap_err();

    assert!(matches!(err, HarnessError::FatalProvision { ref resource, .. } if resource == "put_subscription_filter"));
    assert_eq!(
        fixture.deletions(),
        vec![
            "delete_stream api_logs_to_cloudwatch".to_owned(),
            format!("delete_log_group /aws/lambda/{FUNCTION}"),
            format!("delete_function {FUNCTION}"),
        ]
    );
    let (emulator, mock_api) = container_ids();
    assert_eq!(fixture.runtime.removed(), vec![mock_api, emulator]);
}

#[tokio::test(start_paused = true)]
async fn log_destination_failure_leaves_no_function() {
    let fixture = Fixture::new(8).cloud(FakeCloud::new().failing("create_log_stream"));
    let err = fixture.run().await.unwrap_err();

    assert!(matches!(err, HarnessError::FatalProvision { .. }), "{err}");
    assert!(!fixture.cloud.has_function(FUNCTION));
    assert!(!fixture.cloud.has_log_group(&format!("/aws/lambda/{FUNCTION}")));
}

#[tokio::test(start_paused = true)]
async fn teardown_failure_is_reported_not_fatal() {
    let fixture = Fixture::new(4).cloud(FakeCloud::new().failing("delete_stream"));
    let report = fixture.run().await.expect("teardown failures are not fatal");

    assert_eq!(report.teardown_failures, 1);
    // releases after the failing one still ran
    assert_eq!(
        fixture.deletions(),
        vec![
            "delete_subscription_filter logwire-api-log".to_owned(),
            format!("delete_log_group /aws/lambda/{FUNCTION}"),
            format!("delete_function {FUNCTION}"),
        ]
    );
    assert!(fixture.runtime.running().is_empty());
}

#[tokio::test(start_paused = true)]
async fn container_removal_failures_are_counted() {
    let fixture = Fixture::new(2).runtime(FakeRuntime::new().with_failing_remove());
    let report = fixture.run().await.unwrap();

    assert_eq!(report.teardown_failures, 2);
    assert_eq!(fixture.deletions().len(), 4);
}
