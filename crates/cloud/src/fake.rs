//! 테스트용 in-memory 클라우드
//!
//! [`FakeCloud`]는 함수, 로그, 스트림 API를 메모리에서 흉내 냅니다.
//!
//! - 함수는 설정된 횟수만큼 상태 조회가 `Pending`을 반환한 뒤 `Active`가 됩니다.
//! - 호출마다 함수 로그 그룹의 런타임 스트림에 함수 이름을 포함한 로그 한 줄을 씁니다.
//! - 구독이 있으면 그 로그 라인을 gzip 봉투로 감싸 목적지 스트림의 샤드에 넣습니다.
//! - 로그 토큰은 읽은 위치를 가리키므로 같은 이벤트를 두 번 반환하지 않습니다.
//!
//! 상태 변경 작업은 `journal()`에 순서대로 기록됩니다.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use bytes::Bytes;

use logwire_core::types::{
    DurableStream, FunctionDescriptor, FunctionState, InvocationResult, LogEvent, LogPage,
    RecordBatch, StreamRecord, StreamStatus, Subscription, log_group_name,
};

use crate::api::{FunctionApi, LogsApi, StreamApi};
use crate::error::CloudError;
use crate::observer::envelope::{EnvelopeEvent, SubscriptionEnvelope, encode_envelope};

/// 함수 런타임이 쓰는 로그 스트림 이름
pub const RUNTIME_LOG_STREAM: &str = "2026/10/18/[$LATEST]0123456789abcdef";

/// fake 계정 ID
const ACCOUNT_ID: &str = "000000000000";

/// 가짜 시계의 시작 시각 (epoch 밀리초)
const EPOCH_MS: i64 = 1_790_000_000_000;

/// 테스트용 함수 생성 요청
pub fn sample_descriptor(name: &str) -> FunctionDescriptor {
    FunctionDescriptor {
        name: name.to_owned(),
        artifact: Bytes::from_static(b"PK\x03\x04"),
        environment: BTreeMap::new(),
        role_arn: "arn:aws:iam::123456789012:role/lambda-role".to_owned(),
        handler: "index.handler".to_owned(),
        runtime: "nodejs18.x".to_owned(),
        memory_mb: 128,
        state: FunctionState::Pending,
    }
}

#[derive(Debug)]
struct FakeFunction {
    pending_polls: u32,
    failed: bool,
}

#[derive(Debug, Default)]
struct FakeLogStream {
    events: Vec<LogEvent>,
    last_event_ms: Option<i64>,
}

#[derive(Debug, Default)]
struct FakeShard {
    records: Vec<StreamRecord>,
    closed: bool,
}

#[derive(Debug)]
struct FakeStream {
    arn: String,
    pending_polls: u32,
    shards: Vec<FakeShard>,
}

#[derive(Debug, Default)]
struct FakeState {
    functions: BTreeMap<String, FakeFunction>,
    groups: BTreeMap<String, BTreeMap<String, FakeLogStream>>,
    filters: BTreeMap<String, Vec<Subscription>>,
    streams: BTreeMap<String, FakeStream>,
    clock_ms: i64,
    sequence: u64,
    invocations: usize,
    journal: Vec<String>,
}

impl FakeState {
    fn tick(&mut self) -> i64 {
        self.clock_ms += 1;
        EPOCH_MS + self.clock_ms
    }
}

/// in-memory 클라우드
#[derive(Debug)]
pub struct FakeCloud {
    state: Mutex<FakeState>,
    function_pending_polls: u32,
    function_fails: bool,
    stream_pending_polls: u32,
    failing_ops: BTreeSet<&'static str>,
    function_errors: BTreeSet<usize>,
}

impl Default for FakeCloud {
    fn default() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
            function_pending_polls: 2,
            function_fails: false,
            stream_pending_polls: 1,
            failing_ops: BTreeSet::new(),
            function_errors: BTreeSet::new(),
        }
    }
}

impl FakeCloud {
    /// 기본 동작의 fake를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 함수가 활성화되기 전 `Pending` 상태 조회 횟수를 설정합니다.
    ///
    /// 0이면 생성 즉시 `Active`입니다.
    pub fn with_pending_polls(mut self, polls: u32) -> Self {
        self.function_pending_polls = polls;
        self
    }

    /// 함수가 `Failed` 상태로 전이하도록 설정합니다.
    pub fn with_failed_function(mut self) -> Self {
        self.function_fails = true;
        self
    }

    /// 스트림이 활성화되기 전 `Creating` 상태 조회 횟수를 설정합니다.
    pub fn with_stream_pending_polls(mut self, polls: u32) -> Self {
        self.stream_pending_polls = polls;
        self
    }

    /// 이름이 `op`인 API 작업이 항상 거부되도록 설정합니다.
    pub fn failing(mut self, op: &'static str) -> Self {
        self.failing_ops.insert(op);
        self
    }

    /// 주어진 순번(0부터)의 호출이 함수 에러를 반환하도록 설정합니다.
    pub fn with_function_errors(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.function_errors.extend(indices);
        self
    }

    /// 상태 변경 작업 기록
    pub fn journal(&self) -> Vec<String> {
        self.lock().journal.clone()
    }

    /// 호출 횟수
    pub fn invocations(&self) -> usize {
        self.lock().invocations
    }

    /// 함수 존재 여부
    pub fn has_function(&self, name: &str) -> bool {
        self.lock().functions.contains_key(name)
    }

    /// 로그 그룹 존재 여부
    pub fn has_log_group(&self, group: &str) -> bool {
        self.lock().groups.contains_key(group)
    }

    /// 스트림 존재 여부
    pub fn has_stream(&self, name: &str) -> bool {
        self.lock().streams.contains_key(name)
    }

    /// 그룹에 설치된 구독 수
    pub fn subscription_count(&self, group: &str) -> usize {
        self.lock().filters.get(group).map_or(0, Vec::len)
    }

    /// 로그 스트림에 이벤트를 직접 추가합니다.
    pub fn append_log(&self, group: &str, stream: &str, message: &str) {
        let mut state = self.lock();
        let now = state.tick();
        let log_stream = state
            .groups
            .entry(group.to_owned())
            .or_default()
            .entry(stream.to_owned())
            .or_default();
        log_stream.events.push(LogEvent {
            timestamp_ms: now,
            message: message.to_owned(),
        });
        log_stream.last_event_ms = Some(now);
    }

    /// 샤드에 원시 레코드를 직접 추가합니다.
    pub fn push_raw_record(&self, stream: &str, shard: usize, data: impl Into<Bytes>) {
        let mut state = self.lock();
        state.sequence += 1;
        let sequence_number = format!("{:056}", state.sequence);
        if let Some(shard) = state
            .streams
            .get_mut(stream)
            .and_then(|s| s.shards.get_mut(shard))
        {
            shard.records.push(StreamRecord {
                sequence_number,
                partition_key: "raw".to_owned(),
                data: data.into(),
            });
        }
    }

    /// 샤드를 닫습니다. 남은 레코드를 읽은 뒤에는 다음 이터레이터가 없습니다.
    pub fn close_shard(&self, stream: &str, shard: usize) {
        if let Some(shard) = self
            .lock()
            .streams
            .get_mut(stream)
            .and_then(|s| s.shards.get_mut(shard))
        {
            shard.closed = true;
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(&self, op: &'static str) -> Result<(), CloudError> {
        if self.failing_ops.contains(op) {
            return Err(CloudError::rejected(op, "injected failure"));
        }
        Ok(())
    }
}

fn shard_id(index: usize) -> String {
    format!("shardId-{index:012}")
}

fn parse_iterator(iterator: &str) -> Option<(&str, usize, usize)> {
    let mut parts = iterator.rsplitn(3, '|');
    let position = parts.next()?.parse().ok()?;
    let shard = parts.next()?.parse().ok()?;
    let stream = parts.next()?;
    Some((stream, shard, position))
}

/// 호출 로그 라인을 구독 목적지로 전달합니다.
fn forward(state: &mut FakeState, group: &str, event: &LogEvent) -> Result<(), CloudError> {
    let Some(filters) = state.filters.get(group).cloned() else {
        return Ok(());
    };
    for filter in filters {
        if !filter.matches_all() && !event.message.contains(filter.filter_pattern.trim()) {
            continue;
        }
        let envelope = SubscriptionEnvelope {
            message_type: "DATA_MESSAGE".to_owned(),
            owner: ACCOUNT_ID.to_owned(),
            log_group: group.to_owned(),
            log_stream: RUNTIME_LOG_STREAM.to_owned(),
            subscription_filters: vec![filter.filter_name.clone()],
            log_events: vec![EnvelopeEvent {
                id: event.timestamp_ms.to_string(),
                timestamp: event.timestamp_ms,
                message: event.message.clone(),
            }],
        };
        let data = encode_envelope(&envelope)?;
        state.sequence += 1;
        let sequence = state.sequence;
        let Some(stream) = state
            .streams
            .values_mut()
            .find(|s| s.arn == filter.destination_arn)
        else {
            continue;
        };
        let shard_count = stream.shards.len().max(1);
        let shard = usize::try_from(sequence).unwrap_or(0) % shard_count;
        if let Some(shard) = stream.shards.get_mut(shard) {
            shard.records.push(StreamRecord {
                sequence_number: format!("{sequence:056}"),
                partition_key: group.to_owned(),
                data: Bytes::from(data),
            });
        }
    }
    Ok(())
}

impl FunctionApi for FakeCloud {
    async fn create_function(
        &self,
        descriptor: &FunctionDescriptor,
    ) -> Result<FunctionState, CloudError> {
        self.check("create_function")?;
        let mut state = self.lock();
        if state.functions.contains_key(&descriptor.name) {
            return Err(CloudError::Conflict(format!(
                "function '{}' already exists",
                descriptor.name
            )));
        }
        let initial = if self.function_fails || self.function_pending_polls > 0 {
            FunctionState::Pending
        } else {
            FunctionState::Active
        };
        state.functions.insert(
            descriptor.name.clone(),
            FakeFunction {
                pending_polls: self.function_pending_polls,
                failed: self.function_fails,
            },
        );
        state
            .journal
            .push(format!("create_function {}", descriptor.name));
        Ok(initial)
    }

    async fn function_state(&self, name: &str) -> Result<FunctionState, CloudError> {
        let mut state = self.lock();
        let function = state
            .functions
            .get_mut(name)
            .ok_or_else(|| CloudError::NotFound(format!("function '{name}'")))?;
        if function.failed {
            return Ok(FunctionState::Failed);
        }
        if function.pending_polls > 0 {
            function.pending_polls -= 1;
            return Ok(FunctionState::Pending);
        }
        Ok(FunctionState::Active)
    }

    async fn invoke(&self, name: &str, payload: Bytes) -> Result<InvocationResult, CloudError> {
        self.check("invoke")?;
        let mut state = self.lock();
        match state.functions.get(name) {
            None => return Err(CloudError::NotFound(format!("function '{name}'"))),
            Some(f) if f.failed || f.pending_polls > 0 => {
                return Err(CloudError::rejected("invoke", "function is not active"));
            }
            Some(_) => {}
        }

        let index = state.invocations;
        state.invocations += 1;

        let group = log_group_name(name);
        let now = state.tick();
        let event = LogEvent {
            timestamp_ms: now,
            message: format!(
                "{name} INFO forwarded event {} to upstream",
                String::from_utf8_lossy(&payload)
            ),
        };
        let log_stream = state
            .groups
            .entry(group.clone())
            .or_default()
            .entry(RUNTIME_LOG_STREAM.to_owned())
            .or_default();
        log_stream.events.push(event.clone());
        log_stream.last_event_ms = Some(now);
        forward(&mut state, &group, &event)?;

        Ok(InvocationResult {
            status_code: 200,
            function_error: self
                .function_errors
                .contains(&index)
                .then(|| "Unhandled".to_owned()),
        })
    }

    async fn delete_function(&self, name: &str) -> Result<(), CloudError> {
        self.check("delete_function")?;
        let mut state = self.lock();
        if state.functions.remove(name).is_some() {
            state.journal.push(format!("delete_function {name}"));
        }
        Ok(())
    }
}

impl LogsApi for FakeCloud {
    async fn create_log_group(&self, group: &str) -> Result<(), CloudError> {
        self.check("create_log_group")?;
        let mut state = self.lock();
        if state.groups.contains_key(group) {
            return Err(CloudError::Conflict(format!(
                "log group '{group}' already exists"
            )));
        }
        state.groups.insert(group.to_owned(), BTreeMap::new());
        state.journal.push(format!("create_log_group {group}"));
        Ok(())
    }

    async fn create_log_stream(&self, group: &str, stream: &str) -> Result<(), CloudError> {
        self.check("create_log_stream")?;
        let mut state = self.lock();
        let streams = state
            .groups
            .get_mut(group)
            .ok_or_else(|| CloudError::NotFound(format!("log group '{group}'")))?;
        streams.entry(stream.to_owned()).or_default();
        state
            .journal
            .push(format!("create_log_stream {group} {stream}"));
        Ok(())
    }

    async fn delete_log_group(&self, group: &str) -> Result<(), CloudError> {
        self.check("delete_log_group")?;
        let mut state = self.lock();
        if state.groups.remove(group).is_some() {
            state.filters.remove(group);
            state.journal.push(format!("delete_log_group {group}"));
        }
        Ok(())
    }

    async fn log_streams_by_recency(&self, group: &str) -> Result<Vec<String>, CloudError> {
        let state = self.lock();
        let streams = state
            .groups
            .get(group)
            .ok_or_else(|| CloudError::NotFound(format!("log group '{group}'")))?;
        let mut ordered: Vec<(&String, Option<i64>)> = streams
            .iter()
            .map(|(name, s)| (name, s.last_event_ms))
            .collect();
        // newest first; streams without events last
        ordered.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(ordered.into_iter().map(|(name, _)| name.clone()).collect())
    }

    async fn get_log_events(
        &self,
        group: &str,
        stream: &str,
        next_token: Option<&str>,
    ) -> Result<LogPage, CloudError> {
        let state = self.lock();
        let log_stream = state
            .groups
            .get(group)
            .and_then(|g| g.get(stream))
            .ok_or_else(|| CloudError::NotFound(format!("log stream '{group}/{stream}'")))?;
        let start = match next_token {
            None => 0,
            Some(token) => token
                .strip_prefix("f/")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| CloudError::rejected("get_log_events", "invalid next token"))?,
        };
        let events = log_stream
            .events
            .get(start..)
            .map(<[LogEvent]>::to_vec)
            .unwrap_or_default();
        Ok(LogPage {
            events,
            next_token: Some(format!("f/{}", log_stream.events.len())),
        })
    }

    async fn subscription_filters(&self, group: &str) -> Result<Vec<Subscription>, CloudError> {
        let state = self.lock();
        if !state.groups.contains_key(group) {
            return Err(CloudError::NotFound(format!("log group '{group}'")));
        }
        Ok(state.filters.get(group).cloned().unwrap_or_default())
    }

    async fn put_subscription_filter(
        &self,
        subscription: &Subscription,
        _role_arn: &str,
    ) -> Result<(), CloudError> {
        self.check("put_subscription_filter")?;
        let mut state = self.lock();
        if !state.groups.contains_key(&subscription.group_name) {
            return Err(CloudError::NotFound(format!(
                "log group '{}'",
                subscription.group_name
            )));
        }
        if !state
            .streams
            .values()
            .any(|s| s.arn == subscription.destination_arn)
        {
            return Err(CloudError::rejected(
                "put_subscription_filter",
                format!("unknown destination {}", subscription.destination_arn),
            ));
        }
        state
            .filters
            .entry(subscription.group_name.clone())
            .or_default()
            .push(subscription.clone());
        state.journal.push(format!(
            "put_subscription_filter {}",
            subscription.filter_name
        ));
        Ok(())
    }

    async fn delete_subscription_filter(
        &self,
        group: &str,
        filter_name: &str,
    ) -> Result<(), CloudError> {
        self.check("delete_subscription_filter")?;
        let mut state = self.lock();
        let removed = state.filters.get_mut(group).is_some_and(|filters| {
            let before = filters.len();
            filters.retain(|f| f.filter_name != filter_name);
            filters.len() != before
        });
        if removed {
            state
                .journal
                .push(format!("delete_subscription_filter {filter_name}"));
        }
        Ok(())
    }
}

impl StreamApi for FakeCloud {
    async fn create_stream(&self, name: &str, shard_count: i32) -> Result<(), CloudError> {
        self.check("create_stream")?;
        let mut state = self.lock();
        if state.streams.contains_key(name) {
            return Err(CloudError::Conflict(format!("stream '{name}' already exists")));
        }
        let shards = (0..shard_count.max(0)).map(|_| FakeShard::default()).collect();
        state.streams.insert(
            name.to_owned(),
            FakeStream {
                arn: format!("arn:aws:kinesis:us-east-1:{ACCOUNT_ID}:stream/{name}"),
                pending_polls: self.stream_pending_polls,
                shards,
            },
        );
        state.journal.push(format!("create_stream {name}"));
        Ok(())
    }

    async fn describe_stream(&self, name: &str) -> Result<DurableStream, CloudError> {
        let mut state = self.lock();
        let stream = state
            .streams
            .get_mut(name)
            .ok_or_else(|| CloudError::NotFound(format!("stream '{name}'")))?;
        let status = if stream.pending_polls > 0 {
            stream.pending_polls -= 1;
            StreamStatus::Creating
        } else {
            StreamStatus::Active
        };
        Ok(DurableStream {
            name: name.to_owned(),
            arn: stream.arn.clone(),
            shard_count: i32::try_from(stream.shards.len()).unwrap_or(i32::MAX),
            status,
        })
    }

    async fn delete_stream(&self, name: &str) -> Result<(), CloudError> {
        self.check("delete_stream")?;
        let mut state = self.lock();
        if state.streams.remove(name).is_some() {
            state.journal.push(format!("delete_stream {name}"));
        }
        Ok(())
    }

    async fn list_shards(&self, name: &str) -> Result<Vec<String>, CloudError> {
        let state = self.lock();
        let stream = state
            .streams
            .get(name)
            .ok_or_else(|| CloudError::NotFound(format!("stream '{name}'")))?;
        Ok((0..stream.shards.len()).map(shard_id).collect())
    }

    async fn trim_horizon_iterator(
        &self,
        stream: &str,
        shard: &str,
    ) -> Result<Option<String>, CloudError> {
        let state = self.lock();
        let fake = state
            .streams
            .get(stream)
            .ok_or_else(|| CloudError::NotFound(format!("stream '{stream}'")))?;
        let index = (0..fake.shards.len())
            .find(|i| shard_id(*i) == shard)
            .ok_or_else(|| CloudError::NotFound(format!("shard '{shard}'")))?;
        Ok(Some(format!("{stream}|{index}|0")))
    }

    async fn get_records(&self, iterator: &str) -> Result<RecordBatch, CloudError> {
        let (stream, shard, position) = parse_iterator(iterator)
            .ok_or_else(|| CloudError::rejected("get_records", "invalid shard iterator"))?;
        let state = self.lock();
        let fake_shard = state
            .streams
            .get(stream)
            .and_then(|s| s.shards.get(shard))
            .ok_or_else(|| CloudError::NotFound(format!("shard iterator '{iterator}'")))?;
        let records = fake_shard
            .records
            .get(position..)
            .map(<[StreamRecord]>::to_vec)
            .unwrap_or_default();
        let next_iterator = (!fake_shard.closed)
            .then(|| format!("{stream}|{shard}|{}", fake_shard.records.len()));
        Ok(RecordBatch {
            records,
            next_iterator,
        })
    }
}
