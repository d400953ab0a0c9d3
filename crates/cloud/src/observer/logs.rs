//! 함수 로그 폴링
//!
//! 가장 최근 이벤트를 가진 로그 스트림을 골라 `StartFromHead`로 읽고,
//! 응답의 forward 토큰을 다음 호출에 넘깁니다. 토큰이 없으면 스트림 처음부터 읽습니다.
//!
//! 첫 이벤트를 읽기 전까지는 커서를 잡지 않고 매 폴링마다 스트림을 다시 고릅니다.
//! 함수 런타임의 로그 스트림은 첫 호출 이후에야 생깁니다.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use logwire_core::metrics as m;
use logwire_core::poll::PollPolicy;
use logwire_core::types::{LogDestination, LogEvent};

use crate::api::LogsApi;
use crate::error::CloudError;

use super::render::Renderer;

/// 함수 로그 tail
pub struct LogTail<L: LogsApi> {
    api: Arc<L>,
    function: String,
    group: String,
    stream: Option<String>,
    cursor: Option<String>,
}

impl<L: LogsApi> LogTail<L> {
    /// 함수의 로그 목적지를 읽는 tail을 생성합니다.
    pub fn new(api: Arc<L>, destination: &LogDestination) -> Self {
        Self {
            api,
            function: destination.function_name.clone(),
            group: destination.group_name.clone(),
            stream: None,
            cursor: None,
        }
    }

    /// 현재 읽고 있는 로그 스트림
    pub fn stream(&self) -> Option<&str> {
        self.stream.as_deref()
    }

    /// 다음 호출에 넘길 커서
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// 한 번 폴링하여 새 이벤트를 반환합니다.
    ///
    /// 새 이벤트가 없으면 빈 `Vec`을 반환합니다. 그룹에 스트림이 아직 없어도 마찬가지입니다.
    pub async fn poll_once(&mut self) -> Result<Vec<LogEvent>, CloudError> {
        if self.cursor.is_none() {
            let streams = self.api.log_streams_by_recency(&self.group).await?;
            match streams.into_iter().next() {
                Some(stream) => self.stream = Some(stream),
                None => {
                    debug!(group = %self.group, "no log streams yet");
                    return Ok(Vec::new());
                }
            }
        }
        let Some(stream) = self.stream.as_deref() else {
            return Ok(Vec::new());
        };

        let page = self
            .api
            .get_log_events(&self.group, stream, self.cursor.as_deref())
            .await?;

        if self.cursor.is_some() || !page.events.is_empty() {
            if let Some(token) = page.next_token {
                self.cursor = Some(token);
            }
        }
        Ok(page.events)
    }

    /// 정책 한도 안에서 폴링하며 이벤트를 출력합니다.
    ///
    /// `target`개 이상 읽거나, 취소되거나, 시도를 모두 소진하면 멈춥니다.
    /// 읽은 이벤트 수를 반환합니다.
    pub async fn run(
        &mut self,
        policy: &PollPolicy,
        target: Option<usize>,
        cancel: &CancellationToken,
        renderer: &Renderer,
    ) -> usize {
        let mut seen = 0;
        for attempt in 1..=policy.max_attempts {
            if cancel.is_cancelled() {
                return seen;
            }
            seen += self.tick(renderer).await;
            if target.is_some_and(|t| seen >= t) {
                return seen;
            }
            if attempt < policy.max_attempts {
                tokio::select! {
                    _ = cancel.cancelled() => return seen,
                    _ = tokio::time::sleep(policy.interval) => {}
                }
            }
        }
        if let Some(target) = target {
            warn!(
                group = %self.group,
                seen,
                target,
                polls = policy.max_attempts,
                "log polling ended before reaching target"
            );
        }
        seen
    }

    /// 취소될 때까지 `interval`마다 폴링하며 이벤트를 출력합니다.
    pub async fn follow(
        mut self,
        interval: std::time::Duration,
        cancel: CancellationToken,
        renderer: Renderer,
    ) -> usize {
        let mut seen = 0;
        loop {
            seen += self.tick(&renderer).await;
            tokio::select! {
                _ = cancel.cancelled() => return seen,
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    async fn tick(&mut self, renderer: &Renderer) -> usize {
        match self.poll_once().await {
            Ok(events) => {
                for event in &events {
                    renderer.log_line(&self.function, event);
                }
                metrics::counter!(m::LOG_LINES_OBSERVED_TOTAL).increment(events.len() as u64);
                events.len()
            }
            Err(e) => {
                warn!(group = %self.group, error = %e, "log poll failed");
                0
            }
        }
    }
}
