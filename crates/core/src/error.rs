//! 에러 타입 — 하네스 전역 에러 분류
//!
//! [`HarnessError`]는 각 크레이트의 도메인 에러가 `From`으로 수렴하는 최상위 타입입니다.
//!
//! # 전파 정책
//! - 프로비저닝 단계 에러(`ProvisionTimeout`, `ResourceConflict`, `FatalProvision`)는
//!   실행 전체를 중단시키며, 중단 전에 이미 생성된 리소스를 역순으로 해제합니다.
//! - 관측/주입 단계의 레코드 단위 에러(`Decode`)는 격리되어 로그만 남깁니다.
//! - 빈 폴링 결과는 에러가 아닙니다. 빈 `Vec`으로 표현합니다.

/// logwire 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 백엔드가 제한 시간 내에 준비 상태에 도달하지 못함
    #[error("provision timeout: {resource} not ready after {waited_secs}s")]
    ProvisionTimeout {
        /// 대기한 리소스 이름
        resource: String,
        /// 대기한 시간 (초)
        waited_secs: u64,
    },

    /// 중복 구독 또는 이름 충돌
    #[error("resource conflict: {0}")]
    ResourceConflict(String),

    /// 백엔드가 생성 요청을 거부함
    #[error("provision failed: {resource}: {reason}")]
    FatalProvision {
        /// 생성하려던 리소스
        resource: String,
        /// 거부 사유
        reason: String,
    },

    /// 단일 스트림 레코드 디코딩 실패 (격리됨)
    #[error("decode failure: {0}")]
    Decode(String),

    /// 외부 종료 신호로 실행이 취소됨
    #[error("run cancelled")]
    Cancelled,

    /// 리소스 해제 실패
    #[error("teardown failed: {0}")]
    Teardown(String),

    /// JSON 직렬화/역직렬화 에러
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    /// 실행 전체를 중단시켜야 하는 에러인지 반환합니다.
    ///
    /// `Decode`는 레코드 단위로 격리되고, `Teardown`은 보고만 됩니다.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Decode(_) | Self::Teardown(_) | Self::Cancelled)
    }
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}
