//! Full pipeline flow: provision, inject, observe, tear down.

use crate::helpers::{FUNCTION, Fixture, container_ids};

use logwire_cloud::FakeCloud;

#[tokio::test(start_paused = true)]
async fn eight_events_surface_log_lines_and_records() {
    let fixture = Fixture::new(8);
    let report = fixture.run().await.expect("run should succeed");

    assert_eq!(report.events_injected, 8);
    assert_eq!(report.invoke_failures, 0);
    assert!(report.log_lines >= 8, "log lines: {}", report.log_lines);
    assert!(report.records_decoded >= 8, "records: {}", report.records_decoded);
    assert_eq!(report.decode_failures, 0);
    assert_eq!(report.teardown_failures, 0);

    // each log line and each record envelope names the function
    assert!(fixture.function_mentions() >= 8);
    assert_eq!(fixture.cloud.invocations(), 8);
}

#[tokio::test(start_paused = true)]
async fn stubs_registered_against_mock_endpoint() {
    let fixture = Fixture::new(1);
    fixture.run().await.unwrap();

    assert_eq!(
        fixture.registry.imports(),
        vec![("localhost:45080".to_owned(), 1)]
    );
}

#[tokio::test(start_paused = true)]
async fn resources_created_in_dependency_order() {
    let fixture = Fixture::new(1);
    fixture.run().await.unwrap();

    let created: Vec<String> = fixture
        .cloud
        .journal()
        .into_iter()
        .filter(|entry| !entry.starts_with("delete"))
        .collect();
    assert_eq!(
        created,
        vec![
            format!("create_function {FUNCTION}"),
            format!("create_log_group /aws/lambda/{FUNCTION}"),
            format!("create_log_stream /aws/lambda/{FUNCTION} logwire-log-stream"),
            "create_stream api_logs_to_cloudwatch".to_owned(),
            "put_subscription_filter logwire-api-log".to_owned(),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn teardown_releases_everything_in_reverse_order() {
    let fixture = Fixture::new(2);
    fixture.run().await.unwrap();

    assert_eq!(
        fixture.deletions(),
        vec![
            "delete_subscription_filter logwire-api-log".to_owned(),
            "delete_stream api_logs_to_cloudwatch".to_owned(),
            format!("delete_log_group /aws/lambda/{FUNCTION}"),
            format!("delete_function {FUNCTION}"),
        ]
    );
    let (emulator, mock_api) = container_ids();
    assert_eq!(fixture.runtime.removed(), vec![mock_api, emulator]);
    assert!(fixture.runtime.running().is_empty());
    assert!(!fixture.cloud.has_function(FUNCTION));
}

#[tokio::test(start_paused = true)]
async fn zero_events_finish_without_observations() {
    let fixture = Fixture::new(0);
    let report = fixture.run().await.expect("empty batch is not an error");

    assert_eq!(report.events_injected, 0);
    assert_eq!(report.log_lines, 0);
    assert_eq!(report.records_decoded, 0);
    assert_eq!(fixture.cloud.invocations(), 0);
    assert_eq!(fixture.deletions().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn function_errors_do_not_stop_the_batch() {
    let fixture = Fixture::new(8).cloud(FakeCloud::new().with_function_errors([2, 5]));
    let report = fixture.run().await.unwrap();

    assert_eq!(report.events_injected, 8);
    assert_eq!(report.invoke_failures, 2);
    assert!(report.log_lines >= 8);
}

#[tokio::test(start_paused = true)]
async fn battery_cycles_past_eight() {
    let fixture = Fixture::new(12);
    let report = fixture.run().await.unwrap();

    assert_eq!(report.events_injected, 12);
    assert!(report.records_decoded >= 12);
}

#[tokio::test(start_paused = true)]
async fn multi_shard_stream_is_read_across_shards() {
    let fixture = Fixture::new(8).configure(|c| c.routing.shard_count = 3);
    let report = fixture.run().await.unwrap();

    assert!(report.records_decoded >= 8);
    let output = fixture.output.contents();
    assert!(output.contains("shard=shardId-000000000000"));
    assert!(output.contains("shard=shardId-000000000001"));
}
