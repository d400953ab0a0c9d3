//! 관측 결과 출력
//!
//! 로그 라인과 디코딩된 레코드를 사람이 읽을 수 있는 형태로 출력합니다.
//! 기본 출력은 stdout이며, 테스트에서는 공유 버퍼로 바꿀 수 있습니다.

use std::io::Write;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat};
use colored::Colorize;
use tracing::warn;

use logwire_core::types::LogEvent;

use super::stream::DecodedRecord;

type Sink = Arc<Mutex<Box<dyn Write + Send>>>;

/// 관측 결과 렌더러
#[derive(Clone)]
pub struct Renderer {
    color: bool,
    out: Sink,
}

impl Renderer {
    /// stdout에 출력하는 렌더러를 생성합니다.
    pub fn stdout(color: bool) -> Self {
        Self::with_writer(color, Box::new(std::io::stdout()))
    }

    /// 임의의 writer에 출력하는 렌더러를 생성합니다.
    pub fn with_writer(color: bool, writer: Box<dyn Write + Send>) -> Self {
        Self {
            color,
            out: Arc::new(Mutex::new(writer)),
        }
    }

    /// 함수 로그 한 줄을 출력합니다.
    pub fn log_line(&self, function: &str, event: &LogEvent) {
        let timestamp = format_timestamp(event.timestamp_ms);
        let message = event.message.trim_end();
        let line = if self.color {
            format!("{} {} {}", timestamp.dimmed(), function.cyan(), message)
        } else {
            format!("{timestamp} {function} {message}")
        };
        self.write_line(&line);
    }

    /// 디코딩된 레코드를 출력합니다.
    pub fn record(&self, record: &DecodedRecord) {
        let header = format!(
            "shard={} seq={} key={}",
            record.shard_id, record.sequence_number, record.partition_key
        );
        let body = serde_json::to_string_pretty(&record.envelope)
            .unwrap_or_else(|e| format!("<unprintable envelope: {e}>"));
        if self.color {
            self.write_line(&format!("{}\n{}", header.bold().yellow(), body.green()));
        } else {
            self.write_line(&format!("{header}\n{body}"));
        }
    }

    fn write_line(&self, line: &str) {
        let Ok(mut out) = self.out.lock() else {
            return;
        };
        if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            warn!(error = %e, "failed to write observation output");
        }
    }
}

fn format_timestamp(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| ms.to_string())
}

/// 테스트에서 렌더러 출력을 수집하는 버퍼
#[cfg(any(test, feature = "testing"))]
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

#[cfg(any(test, feature = "testing"))]
impl SharedBuffer {
    /// 빈 버퍼를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 지금까지 기록된 내용
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

#[cfg(any(test, feature = "testing"))]
impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::envelope::SubscriptionEnvelope;

    #[test]
    fn plain_log_line() {
        let buffer = SharedBuffer::new();
        let renderer = Renderer::with_writer(false, Box::new(buffer.clone()));
        renderer.log_line(
            "log-producer",
            &LogEvent {
                timestamp_ms: 0,
                message: "hello\n".to_owned(),
            },
        );
        assert_eq!(
            buffer.contents(),
            "1970-01-01T00:00:00.000Z log-producer hello\n"
        );
    }

    #[test]
    fn plain_record_is_pretty_json() {
        let buffer = SharedBuffer::new();
        let renderer = Renderer::with_writer(false, Box::new(buffer.clone()));
        renderer.record(&DecodedRecord {
            shard_id: "shardId-000000000000".to_owned(),
            sequence_number: "1".to_owned(),
            partition_key: "k".to_owned(),
            envelope: SubscriptionEnvelope {
                message_type: "DATA_MESSAGE".to_owned(),
                owner: "000000000000".to_owned(),
                log_group: "/aws/lambda/f".to_owned(),
                log_stream: "s".to_owned(),
                subscription_filters: vec![],
                log_events: vec![],
            },
        });
        let out = buffer.contents();
        assert!(out.starts_with("shard=shardId-000000000000 seq=1 key=k\n{"));
        assert!(out.contains("  \"messageType\": \"DATA_MESSAGE\""));
    }

    #[test]
    fn out_of_range_timestamp_falls_back() {
        assert_eq!(format_timestamp(i64::MAX), i64::MAX.to_string());
    }
}
