//! 도메인 타입 — 하네스 전역에서 사용되는 공통 타입
//!
//! 프로비저닝된 리소스(환경, 함수, 로그 목적지, 구독, 스트림)와
//! 관측 결과(로그 이벤트, 스트림 레코드)를 표현합니다.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// 로그 그룹 이름 접두어
pub const LOG_GROUP_PREFIX: &str = "/aws/lambda/";

/// 함수 이름에서 로그 그룹 이름을 결정적으로 유도합니다.
///
/// ```
/// assert_eq!(logwire_core::types::log_group_name("log-producer"), "/aws/lambda/log-producer");
/// ```
pub fn log_group_name(function_name: &str) -> String {
    format!("{LOG_GROUP_PREFIX}{function_name}")
}

// ─── Environment ─────────────────────────────────────────────────────

/// 에뮬레이션 백엔드 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// 클라우드 에뮬레이터 (함수, 로그, 스트림 API)
    CloudEmulator,
    /// Mock HTTP 서버
    MockHttp,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CloudEmulator => write!(f, "cloud-emulator"),
            Self::MockHttp => write!(f, "mock-http"),
        }
    }
}

/// 환경 생명주기 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    /// 컨테이너 시작됨, 준비 프로브 대기 중
    Starting,
    /// 준비 프로브 통과
    Ready,
    /// 종료됨
    Terminated,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting => write!(f, "starting"),
            Self::Ready => write!(f, "ready"),
            Self::Terminated => write!(f, "terminated"),
        }
    }
}

/// 시작된 백엔드에 대한 핸들
///
/// 백엔드당 하나씩 존재하며, 하네스 종료 시 명시적으로 해제됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentHandle {
    /// 백엔드 종류
    pub kind: BackendKind,
    /// 컨테이너 ID
    pub container_id: String,
    /// 외부에서 접근 가능한 `host:port`
    pub endpoint: String,
    /// 현재 상태
    pub state: LifecycleState,
}

impl EnvironmentHandle {
    /// 엔드포인트의 포트 부분을 반환합니다.
    pub fn port(&self) -> Option<u16> {
        self.endpoint
            .rsplit_once(':')
            .and_then(|(_, port)| port.parse().ok())
    }

    /// `http://` 스킴을 붙인 URL을 반환합니다.
    pub fn http_url(&self) -> String {
        format!("http://{}", self.endpoint)
    }
}

// ─── Function ────────────────────────────────────────────────────────

/// 함수 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunctionState {
    /// 생성 직후, 아직 호출 불가
    Pending,
    /// 호출 가능
    Active,
    /// 생성 실패 (종단 상태)
    Failed,
}

impl fmt::Display for FunctionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Active => write!(f, "active"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// 함수 생성 요청 및 결과
#[derive(Debug, Clone)]
pub struct FunctionDescriptor {
    /// 하네스 실행 내에서 고유한 함수 이름
    pub name: String,
    /// 패키징된 아티팩트 (zip)
    pub artifact: Bytes,
    /// 환경 변수
    pub environment: BTreeMap<String, String>,
    /// 실행 역할 ARN (고정 더미 값)
    pub role_arn: String,
    /// 핸들러 엔트리 포인트
    pub handler: String,
    /// 런타임 식별자
    pub runtime: String,
    /// 메모리 (MB)
    pub memory_mb: i32,
    /// 현재 상태
    pub state: FunctionState,
}

// ─── Log routing ─────────────────────────────────────────────────────

/// 함수 전용 로그 목적지 (그룹 + 스트림)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogDestination {
    /// 소유 함수 이름
    pub function_name: String,
    /// 로그 그룹 이름 (`/aws/lambda/<function>`)
    pub group_name: String,
    /// 하네스가 생성한 로그 스트림 이름
    pub stream_name: String,
}

/// 로그 구독 필터
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// 필터 이름
    pub filter_name: String,
    /// 원본 로그 그룹
    pub group_name: String,
    /// 목적지 스트림 ARN
    pub destination_arn: String,
    /// 필터 패턴 (빈 문자열은 전체 매칭)
    pub filter_pattern: String,
}

impl Subscription {
    /// 모든 로그 라인을 전달하는 필터인지 반환합니다.
    pub fn matches_all(&self) -> bool {
        self.filter_pattern.trim().is_empty()
    }
}

/// 스트림 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamStatus {
    /// 생성 중
    Creating,
    /// 읽기/쓰기 가능
    Active,
    /// 삭제 중 또는 갱신 중 등 기타 상태
    Other,
}

/// 내구성 있는 순서 보장 스트림
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurableStream {
    /// 스트림 이름
    pub name: String,
    /// 스트림 ARN
    pub arn: String,
    /// 생성 시 고정된 샤드 수
    pub shard_count: i32,
    /// 현재 상태
    pub status: StreamStatus,
}

// ─── Observation ─────────────────────────────────────────────────────

/// 함수 로그 이벤트
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    /// 수집 시각 (epoch 밀리초)
    pub timestamp_ms: i64,
    /// 로그 메시지
    pub message: String,
}

/// 로그 폴링 한 번의 결과
///
/// `events`가 비어 있어도 에러가 아닙니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogPage {
    /// 이번 폴링에서 새로 읽은 이벤트
    pub events: Vec<LogEvent>,
    /// 다음 호출에 전달할 커서
    pub next_token: Option<String>,
}

/// 스트림 레코드 (압축된 원본 바이트)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRecord {
    /// 샤드 내 시퀀스 번호
    pub sequence_number: String,
    /// 파티션 키
    pub partition_key: String,
    /// gzip 압축된 페이로드
    pub data: Bytes,
}

/// 레코드 조회 한 번의 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordBatch {
    /// 읽은 레코드
    pub records: Vec<StreamRecord>,
    /// 다음 샤드 이터레이터 (없으면 샤드가 닫힘)
    pub next_iterator: Option<String>,
}

/// 함수 호출 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    /// HTTP 상태 코드
    pub status_code: i32,
    /// 함수 에러 (있다면)
    pub function_error: Option<String>,
}

impl InvocationResult {
    /// 호출이 성공했는지 반환합니다.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code) && self.function_error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_group_name_is_path_like() {
        assert_eq!(log_group_name("log-producer"), "/aws/lambda/log-producer");
        assert_eq!(log_group_name(""), "/aws/lambda/");
    }

    #[test]
    fn environment_handle_port_and_url() {
        let handle = EnvironmentHandle {
            kind: BackendKind::MockHttp,
            container_id: "abc".to_owned(),
            endpoint: "127.0.0.1:49153".to_owned(),
            state: LifecycleState::Ready,
        };
        assert_eq!(handle.port(), Some(49153));
        assert_eq!(handle.http_url(), "http://127.0.0.1:49153");
    }

    #[test]
    fn environment_handle_without_port() {
        let handle = EnvironmentHandle {
            kind: BackendKind::CloudEmulator,
            container_id: "abc".to_owned(),
            endpoint: "localhost".to_owned(),
            state: LifecycleState::Starting,
        };
        assert_eq!(handle.port(), None);
    }

    #[test]
    fn subscription_empty_pattern_matches_all() {
        let mut sub = Subscription {
            filter_name: "f".to_owned(),
            group_name: "/aws/lambda/x".to_owned(),
            destination_arn: "arn:aws:kinesis:us-east-1:000000000000:stream/s".to_owned(),
            filter_pattern: "  ".to_owned(),
        };
        assert!(sub.matches_all());
        sub.filter_pattern = "entityId".to_owned();
        assert!(!sub.matches_all());
    }

    #[test]
    fn invocation_result_success() {
        let ok = InvocationResult {
            status_code: 200,
            function_error: None,
        };
        assert!(ok.is_success());

        let unhandled = InvocationResult {
            status_code: 200,
            function_error: Some("Unhandled".to_owned()),
        };
        assert!(!unhandled.is_success());

        let throttled = InvocationResult {
            status_code: 429,
            function_error: None,
        };
        assert!(!throttled.is_success());
    }

    #[test]
    fn display_impls() {
        assert_eq!(BackendKind::CloudEmulator.to_string(), "cloud-emulator");
        assert_eq!(LifecycleState::Terminated.to_string(), "terminated");
        assert_eq!(FunctionState::Active.to_string(), "active");
    }
}
