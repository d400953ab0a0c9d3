//! 클라우드 API 에러 타입
//!
//! [`CloudError`]는 함수, 로그, 스트림 API 호출과 관측 단계의 디코딩에서 발생하는
//! 에러를 표현합니다. `From<CloudError> for HarnessError` 변환이 구현되어 있습니다.

use logwire_core::error::HarnessError;

/// 클라우드 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum CloudError {
    /// 백엔드가 요청을 거부함
    #[error("{operation} rejected: {reason}")]
    Rejected {
        /// 호출한 API 작업
        operation: String,
        /// 거부 사유
        reason: String,
    },

    /// 이름 충돌 또는 중복 구독
    #[error("conflict: {0}")]
    Conflict(String),

    /// 리소스를 찾을 수 없음
    #[error("not found: {0}")]
    NotFound(String),

    /// 함수가 failed 상태로 전이함
    #[error("function '{0}' entered failed state")]
    FunctionFailed(String),

    /// 리소스가 제한 시간 내에 활성화되지 않음
    #[error("{resource} not active after {waited_secs}s")]
    Timeout {
        /// 대기한 리소스
        resource: String,
        /// 대기한 시간 (초)
        waited_secs: u64,
    },

    /// 함수 아티팩트를 읽을 수 없음
    #[error("artifact error: {path}: {reason}")]
    Artifact {
        /// 아티팩트 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 응답에 필수 필드가 없음
    #[error("invalid response from {0}")]
    InvalidResponse(String),

    /// 스트림 레코드 디코딩 실패
    #[error("decode failure: {0}")]
    Decode(String),
}

impl CloudError {
    /// API 거부 에러를 생성합니다.
    pub fn rejected(operation: &str, reason: impl std::fmt::Display) -> Self {
        Self::Rejected {
            operation: operation.to_owned(),
            reason: reason.to_string(),
        }
    }
}

impl From<CloudError> for HarnessError {
    fn from(err: CloudError) -> Self {
        match err {
            CloudError::Conflict(msg) => HarnessError::ResourceConflict(msg),
            CloudError::Timeout {
                resource,
                waited_secs,
            } => HarnessError::ProvisionTimeout {
                resource,
                waited_secs,
            },
            CloudError::Decode(msg) => HarnessError::Decode(msg),
            CloudError::Rejected { operation, reason } => HarnessError::FatalProvision {
                resource: operation,
                reason,
            },
            CloudError::FunctionFailed(name) => HarnessError::FatalProvision {
                resource: format!("function {name}"),
                reason: "entered failed state".to_owned(),
            },
            CloudError::Artifact { .. } => HarnessError::FatalProvision {
                resource: "function artifact".to_owned(),
                reason: err.to_string(),
            },
            CloudError::NotFound(_) | CloudError::InvalidResponse(_) => HarnessError::FatalProvision {
                resource: "cloud".to_owned(),
                reason: err.to_string(),
            },
        }
    }
}
