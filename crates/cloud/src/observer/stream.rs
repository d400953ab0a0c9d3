//! 스트림 샤드 폴링
//!
//! 샤드마다 `TRIM_HORIZON` 이터레이터를 한 번 얻은 뒤, 응답의 다음 이터레이터를
//! 이어서 사용합니다. 다음 이터레이터가 없는 샤드는 닫힌 것으로 보고 제외합니다.
//!
//! 레코드 하나의 디코딩 실패는 로그로 남기고 건너뜁니다.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use logwire_core::metrics as m;
use logwire_core::poll::PollPolicy;
use logwire_core::types::StreamRecord;

use crate::api::StreamApi;
use crate::error::CloudError;

use super::envelope::{SubscriptionEnvelope, decode_envelope};
use super::render::Renderer;

/// 디코딩된 스트림 레코드
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRecord {
    pub shard_id: String,
    pub sequence_number: String,
    pub partition_key: String,
    pub envelope: SubscriptionEnvelope,
}

/// 디코딩에 실패한 레코드
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeFailure {
    pub shard_id: String,
    pub sequence_number: String,
    pub reason: String,
}

/// 한 번의 폴링 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamPoll {
    pub records: Vec<DecodedRecord>,
    pub failures: Vec<DecodeFailure>,
}

/// 폴링 전체 요약
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub decoded: usize,
    pub failures: usize,
}

/// 스트림 레코드 리더
pub struct StreamReader<S: StreamApi> {
    api: Arc<S>,
    stream: String,
    iterators: BTreeMap<String, String>,
    initialized: bool,
}

impl<S: StreamApi> StreamReader<S> {
    /// `stream`을 읽는 리더를 생성합니다.
    pub fn new(api: Arc<S>, stream: impl Into<String>) -> Self {
        Self {
            api,
            stream: stream.into(),
            iterators: BTreeMap::new(),
            initialized: false,
        }
    }

    /// 아직 열려 있는 샤드 ID
    pub fn open_shards(&self) -> Vec<&str> {
        self.iterators.keys().map(String::as_str).collect()
    }

    /// 모든 샤드가 닫혔는지 반환합니다.
    pub fn is_exhausted(&self) -> bool {
        self.initialized && self.iterators.is_empty()
    }

    async fn init_iterators(&mut self) -> Result<(), CloudError> {
        for shard_id in self.api.list_shards(&self.stream).await? {
            match self.api.trim_horizon_iterator(&self.stream, &shard_id).await? {
                Some(iterator) => {
                    self.iterators.insert(shard_id, iterator);
                }
                None => debug!(stream = %self.stream, shard_id = %shard_id, "shard already closed"),
            }
        }
        self.initialized = true;
        Ok(())
    }

    /// 열린 샤드를 한 번씩 읽습니다.
    ///
    /// 샤드 조회가 실패하면 해당 샤드의 이터레이터를 유지한 채 다음 폴링에서 다시 시도합니다.
    pub async fn poll_once(&mut self) -> Result<StreamPoll, CloudError> {
        if !self.initialized {
            self.init_iterators().await?;
        }

        let mut poll = StreamPoll::default();
        let shards: Vec<(String, String)> = self
            .iterators
            .iter()
            .map(|(shard, it)| (shard.clone(), it.clone()))
            .collect();

        for (shard_id, iterator) in shards {
            let batch = match self.api.get_records(&iterator).await {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(shard_id = %shard_id, error = %e, "get records failed");
                    continue;
                }
            };
            for record in &batch.records {
                decode_into(&shard_id, record, &mut poll);
            }
            match batch.next_iterator {
                Some(next) => {
                    self.iterators.insert(shard_id, next);
                }
                None => {
                    debug!(shard_id = %shard_id, "shard closed");
                    self.iterators.remove(&shard_id);
                }
            }
        }
        Ok(poll)
    }

    /// 정책 한도 안에서 폴링하며 레코드를 출력합니다.
    ///
    /// `target`개 이상 디코딩하거나, 모든 샤드가 닫히거나, 취소되거나,
    /// 시도를 모두 소진하면 멈춥니다.
    pub async fn run(
        &mut self,
        policy: &PollPolicy,
        target: Option<usize>,
        cancel: &CancellationToken,
        renderer: &Renderer,
    ) -> StreamSummary {
        let mut summary = StreamSummary::default();
        for attempt in 1..=policy.max_attempts {
            if cancel.is_cancelled() {
                return summary;
            }
            match self.poll_once().await {
                Ok(poll) => {
                    for record in &poll.records {
                        renderer.record(record);
                    }
                    summary.decoded += poll.records.len();
                    summary.failures += poll.failures.len();
                }
                Err(e) => warn!(stream = %self.stream, error = %e, "stream poll failed"),
            }
            if target.is_some_and(|t| summary.decoded >= t) || self.is_exhausted() {
                return summary;
            }
            if attempt < policy.max_attempts {
                tokio::select! {
                    _ = cancel.cancelled() => return summary,
                    _ = tokio::time::sleep(policy.interval) => {}
                }
            }
        }
        if let Some(target) = target {
            warn!(
                stream = %self.stream,
                decoded = summary.decoded,
                target,
                polls = policy.max_attempts,
                "stream polling ended before reaching target"
            );
        }
        summary
    }
}

fn decode_into(shard_id: &str, record: &StreamRecord, poll: &mut StreamPoll) {
    match decode_envelope(&record.data) {
        Ok(envelope) => {
            metrics::counter!(m::RECORDS_DECODED_TOTAL).increment(1);
            poll.records.push(DecodedRecord {
                shard_id: shard_id.to_owned(),
                sequence_number: record.sequence_number.clone(),
                partition_key: record.partition_key.clone(),
                envelope,
            });
        }
        Err(e) => {
            metrics::counter!(m::RECORD_DECODE_FAILURES_TOTAL).increment(1);
            warn!(
                shard_id,
                sequence_number = %record.sequence_number,
                error = %e,
                "skipping undecodable record"
            );
            poll.failures.push(DecodeFailure {
                shard_id: shard_id.to_owned(),
                sequence_number: record.sequence_number.clone(),
                reason: e.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use logwire_core::types::Subscription;

    use super::*;
    use crate::api::{FunctionApi, LogsApi};
    use crate::fake::{FakeCloud, sample_descriptor};
    use crate::observer::render::SharedBuffer;

    /// 함수, 스트림, 구독까지 연결된 fake
    async fn wired(shards: i32) -> Arc<FakeCloud> {
        let cloud = Arc::new(FakeCloud::new().with_pending_polls(0).with_stream_pending_polls(0));
        cloud.create_function(&sample_descriptor("f")).await.unwrap();
        cloud.create_log_group("/aws/lambda/f").await.unwrap();
        cloud.create_stream("api", shards).await.unwrap();
        let arn = cloud.describe_stream("api").await.unwrap().arn;
        cloud
            .put_subscription_filter(
                &Subscription {
                    filter_name: "sub".to_owned(),
                    group_name: "/aws/lambda/f".to_owned(),
                    destination_arn: arn,
                    filter_pattern: String::new(),
                },
                "arn:aws:iam::0:role/r",
            )
            .await
            .unwrap();
        cloud
    }

    fn renderer() -> (SharedBuffer, Renderer) {
        let buffer = SharedBuffer::new();
        let renderer = Renderer::with_writer(false, Box::new(buffer.clone()));
        (buffer, renderer)
    }

    #[tokio::test]
    async fn decodes_forwarded_log_lines() {
        let cloud = wired(2).await;
        for i in 0..4 {
            cloud.invoke("f", bytes::Bytes::from(format!("{i}"))).await.unwrap();
        }
        let mut reader = StreamReader::new(Arc::clone(&cloud), "api");
        let poll = reader.poll_once().await.unwrap();
        assert_eq!(poll.records.len(), 4);
        assert!(poll.failures.is_empty());
        assert_eq!(reader.open_shards().len(), 2);
        for record in &poll.records {
            assert_eq!(record.envelope.log_group, "/aws/lambda/f");
            assert!(record.envelope.log_events[0].message.contains('f'));
        }

        // iterators advance past what was read
        assert!(reader.poll_once().await.unwrap().records.is_empty());
    }

    #[tokio::test]
    async fn undecodable_record_is_isolated() {
        let cloud = wired(1).await;
        cloud.invoke("f", bytes::Bytes::from_static(b"a")).await.unwrap();
        cloud.push_raw_record("api", 0, &b"not gzip"[..]);
        cloud.invoke("f", bytes::Bytes::from_static(b"b")).await.unwrap();

        let mut reader = StreamReader::new(Arc::clone(&cloud), "api");
        let poll = reader.poll_once().await.unwrap();
        assert_eq!(poll.records.len(), 2);
        assert_eq!(poll.failures.len(), 1);
        assert_eq!(poll.failures[0].shard_id, "shardId-000000000000");
    }

    #[tokio::test(start_paused = true)]
    async fn run_ends_when_all_shards_close() {
        let cloud = wired(1).await;
        cloud.invoke("f", bytes::Bytes::from_static(b"a")).await.unwrap();
        cloud.close_shard("api", 0);

        let (buffer, renderer) = renderer();
        let policy = PollPolicy::new(Duration::from_secs(1), 10);
        let mut reader = StreamReader::new(Arc::clone(&cloud), "api");
        let summary = reader
            .run(&policy, Some(5), &CancellationToken::new(), &renderer)
            .await;
        assert_eq!(summary, StreamSummary { decoded: 1, failures: 0 });
        assert!(reader.is_exhausted());
        assert!(buffer.contents().contains("shard=shardId-000000000000"));
    }

    #[tokio::test(start_paused = true)]
    async fn run_respects_cancellation() {
        let cloud = wired(1).await;
        let (_, renderer) = renderer();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut reader = StreamReader::new(Arc::clone(&cloud), "api");
        let summary = reader
            .run(&PollPolicy::new(Duration::from_secs(1), 10), Some(1), &cancel, &renderer)
            .await;
        assert_eq!(summary, StreamSummary::default());
    }

    #[test]
    fn decode_failure_keeps_sequence_number() {
        let mut poll = StreamPoll::default();
        let record = StreamRecord {
            sequence_number: "42".to_owned(),
            partition_key: "k".to_owned(),
            data: bytes::Bytes::from_static(b"\x1f\x8b garbage"),
        };
        decode_into("shard-1", &record, &mut poll);
        assert!(poll.records.is_empty());
        assert_eq!(poll.failures[0].sequence_number, "42");
    }
}
