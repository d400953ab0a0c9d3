//! 환경 프로비저닝 에러 타입
//!
//! [`EnvironmentError`]는 컨테이너 런타임, 준비 프로브, mock API 등록에서
//! 발생하는 에러를 표현합니다. `From<EnvironmentError> for HarnessError` 변환으로
//! 상위 레이어에서 `?` 연산자로 전파할 수 있습니다.

use logwire_core::error::{ConfigError, HarnessError};

/// 환경 프로비저닝 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum EnvironmentError {
    /// Docker 소켓 연결 실패
    #[error("docker connection error: {0}")]
    DockerConnection(String),

    /// Docker API 호출 실패
    #[error("docker api error: {0}")]
    DockerApi(String),

    /// 컨테이너를 찾을 수 없음
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    /// 컨테이너 포트가 호스트에 게시되지 않음
    #[error("container '{container_id}' does not publish port {port}")]
    PortNotPublished {
        /// 대상 컨테이너 ID
        container_id: String,
        /// 컨테이너 내부 포트
        port: u16,
    },

    /// 준비 프로브가 제한 시간 내에 통과하지 못함
    #[error("backend '{image}' not ready after {waited_secs}s")]
    ReadinessTimeout {
        /// 백엔드 이미지
        image: String,
        /// 대기한 시간 (초)
        waited_secs: u64,
    },

    /// 스텁 파일 로딩 실패
    #[error("stub load error: {path}: {reason}")]
    StubLoad {
        /// 스텁 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// mock 서버가 스텁 등록을 거부함
    #[error("stub registration rejected with status {status}: {body}")]
    StubRejected {
        /// HTTP 상태 코드
        status: u16,
        /// 응답 본문
        body: String,
    },

    /// HTTP 전송 실패
    #[error("http error: {0}")]
    Http(String),

    /// 백엔드 사양 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl From<EnvironmentError> for HarnessError {
    fn from(err: EnvironmentError) -> Self {
        match err {
            EnvironmentError::ReadinessTimeout { image, waited_secs } => {
                HarnessError::ProvisionTimeout {
                    resource: image,
                    waited_secs,
                }
            }
            EnvironmentError::Config { field, reason } => {
                HarnessError::Config(ConfigError::InvalidValue { field, reason })
            }
            EnvironmentError::StubLoad { .. }
            | EnvironmentError::StubRejected { .. }
            | EnvironmentError::Http(_) => HarnessError::FatalProvision {
                resource: "mock api stubs".to_owned(),
                reason: err.to_string(),
            },
            EnvironmentError::DockerConnection(_)
            | EnvironmentError::DockerApi(_)
            | EnvironmentError::ContainerNotFound(_)
            | EnvironmentError::PortNotPublished { .. } => HarnessError::FatalProvision {
                resource: "container".to_owned(),
                reason: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_timeout_becomes_provision_timeout() {
        let err: HarnessError = EnvironmentError::ReadinessTimeout {
            image: "localstack/localstack".to_owned(),
            waited_secs: 180,
        }
        .into();
        match err {
            HarnessError::ProvisionTimeout {
                resource,
                waited_secs,
            } => {
                assert_eq!(resource, "localstack/localstack");
                assert_eq!(waited_secs, 180);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn stub_rejection_is_fatal_provision() {
        let err: HarnessError = EnvironmentError::StubRejected {
            status: 422,
            body: "bad mapping".to_owned(),
        }
        .into();
        assert!(err.is_fatal());
        let msg = err.to_string();
        assert!(msg.contains("mock api stubs"));
        assert!(msg.contains("422"));
    }

    #[test]
    fn config_error_keeps_field() {
        let err: HarnessError = EnvironmentError::Config {
            field: "image".to_owned(),
            reason: "must not be empty".to_owned(),
        }
        .into();
        assert!(matches!(
            err,
            HarnessError::Config(ConfigError::InvalidValue { ref field, .. }) if field == "image"
        ));
    }

    #[test]
    fn docker_errors_display() {
        let err = EnvironmentError::PortNotPublished {
            container_id: "abc".to_owned(),
            port: 4566,
        };
        assert!(err.to_string().contains("4566"));
        let err = EnvironmentError::DockerConnection("socket not found".to_owned());
        assert!(err.to_string().contains("socket not found"));
    }
}
