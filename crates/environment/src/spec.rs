//! 백엔드 사양 — 컨테이너 하나를 시작하기 위한 선언적 요청
//!
//! [`BackendSpec`]은 core의 [`BackendConfig`]에서 파생되며,
//! [`BackendSpecBuilder`]로 테스트나 특수 구성을 직접 조립할 수도 있습니다.
//!
//! # 사용 예시
//! ```
//! use logwire_core::config::BackendConfig;
//! use logwire_core::types::BackendKind;
//! use logwire_environment::spec::BackendSpec;
//!
//! let spec = BackendSpec::from_config(BackendKind::MockHttp, &BackendConfig::mock_http());
//! assert_eq!(spec.container_port, 8080);
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use logwire_core::config::{BackendConfig, ProbeConfig};
use logwire_core::types::BackendKind;

use crate::error::EnvironmentError;

/// 컨테이너가 호스트에 접근할 때 쓰는 이름
pub const HOST_GATEWAY_ALIAS: &str = "host.docker.internal";

/// Docker 소켓 경로
const DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// 준비 프로브 간격 기본값
const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_millis(500);

/// 준비 프로브
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadinessProbe {
    /// 컨테이너 로그에 패턴이 나타날 때까지 대기
    LogLine(String),
    /// 게시된 호스트 포트에 TCP 연결이 될 때까지 대기
    Port,
}

impl From<&ProbeConfig> for ReadinessProbe {
    fn from(probe: &ProbeConfig) -> Self {
        match probe {
            ProbeConfig::LogLine { pattern } => Self::LogLine(pattern.clone()),
            ProbeConfig::Port => Self::Port,
        }
    }
}

/// 컨테이너 백엔드 사양
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSpec {
    /// 백엔드 종류
    pub kind: BackendKind,
    /// 컨테이너 이미지
    pub image: String,
    /// 컨테이너 이름 (실행마다 고유)
    pub name: String,
    /// 호스트에 게시할 컨테이너 포트 (TCP)
    pub container_port: u16,
    /// 컨테이너 환경변수
    pub env: BTreeMap<String, String>,
    /// 바인드 마운트 (`host:container`)
    pub binds: Vec<String>,
    /// 추가 호스트 엔트리 (`name:ip`)
    pub extra_hosts: Vec<String>,
    /// 준비 프로브
    pub probe: ReadinessProbe,
    /// 준비 대기 제한 시간
    pub startup_timeout: Duration,
    /// 프로브 재시도 간격
    pub probe_interval: Duration,
}

impl BackendSpec {
    /// 설정에서 사양을 생성합니다.
    pub fn from_config(kind: BackendKind, config: &BackendConfig) -> Self {
        let binds = if config.mount_docker_socket {
            vec![format!("{DOCKER_SOCKET}:{DOCKER_SOCKET}")]
        } else {
            Vec::new()
        };
        Self {
            kind,
            image: config.image.clone(),
            name: container_name(kind),
            container_port: config.container_port,
            env: config.env.clone(),
            binds,
            extra_hosts: vec![format!("{HOST_GATEWAY_ALIAS}:host-gateway")],
            probe: ReadinessProbe::from(&config.probe),
            startup_timeout: config.startup_timeout(),
            probe_interval: DEFAULT_PROBE_INTERVAL,
        }
    }

    /// `KEY=VALUE` 형식의 환경변수 목록
    pub fn env_list(&self) -> Vec<String> {
        self.env.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }

    /// Docker 포트 키 (`4566/tcp`)
    pub fn port_key(&self) -> String {
        format!("{}/tcp", self.container_port)
    }

    /// 준비 프로브 최대 시도 횟수
    ///
    /// 제한 시간을 간격으로 나눈 값에 첫 시도를 더합니다.
    pub fn probe_attempts(&self) -> u32 {
        let interval = self.probe_interval.as_millis().max(1);
        let attempts = self.startup_timeout.as_millis() / interval;
        u32::try_from(attempts).unwrap_or(u32::MAX).saturating_add(1)
    }

    /// 사양의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), EnvironmentError> {
        if self.image.is_empty() {
            return Err(EnvironmentError::Config {
                field: "image".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }
        if self.container_port == 0 {
            return Err(EnvironmentError::Config {
                field: "container_port".to_owned(),
                reason: "must be non-zero".to_owned(),
            });
        }
        if self.startup_timeout.is_zero() {
            return Err(EnvironmentError::Config {
                field: "startup_timeout".to_owned(),
                reason: "must be positive".to_owned(),
            });
        }
        if self.probe_interval.is_zero() {
            return Err(EnvironmentError::Config {
                field: "probe_interval".to_owned(),
                reason: "must be positive".to_owned(),
            });
        }
        if matches!(&self.probe, ReadinessProbe::LogLine(p) if p.is_empty()) {
            return Err(EnvironmentError::Config {
                field: "probe".to_owned(),
                reason: "log line pattern must not be empty".to_owned(),
            });
        }
        Ok(())
    }
}

fn container_name(kind: BackendKind) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("logwire-{kind}-{}", &suffix[..8])
}

/// 백엔드 사양 빌더
///
/// 3개 이상의 설정 필드가 있으므로 빌더 패턴을 사용합니다.
pub struct BackendSpecBuilder {
    spec: BackendSpec,
}

impl BackendSpecBuilder {
    /// 종류별 기본 프리셋에서 시작하는 빌더를 생성합니다.
    pub fn new(kind: BackendKind) -> Self {
        let config = match kind {
            BackendKind::CloudEmulator => BackendConfig::cloud_emulator(),
            BackendKind::MockHttp => BackendConfig::mock_http(),
        };
        Self {
            spec: BackendSpec::from_config(kind, &config),
        }
    }

    /// 이미지를 설정합니다.
    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.spec.image = image.into();
        self
    }

    /// 컨테이너 이름을 설정합니다.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.spec.name = name.into();
        self
    }

    /// 게시할 컨테이너 포트를 설정합니다.
    pub fn container_port(mut self, port: u16) -> Self {
        self.spec.container_port = port;
        self
    }

    /// 환경변수를 추가합니다.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.spec.env.insert(key.into(), value.into());
        self
    }

    /// 바인드 마운트를 추가합니다.
    pub fn bind(mut self, bind: impl Into<String>) -> Self {
        self.spec.binds.push(bind.into());
        self
    }

    /// 준비 프로브를 설정합니다.
    pub fn probe(mut self, probe: ReadinessProbe) -> Self {
        self.spec.probe = probe;
        self
    }

    /// 준비 대기 제한 시간을 설정합니다.
    pub fn startup_timeout(mut self, timeout: Duration) -> Self {
        self.spec.startup_timeout = timeout;
        self
    }

    /// 프로브 재시도 간격을 설정합니다.
    pub fn probe_interval(mut self, interval: Duration) -> Self {
        self.spec.probe_interval = interval;
        self
    }

    /// 사양을 검증하고 `BackendSpec`을 생성합니다.
    pub fn build(self) -> Result<BackendSpec, EnvironmentError> {
        self.spec.validate()?;
        Ok(self.spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emulator_preset_mounts_socket_and_gateway() {
        let spec = BackendSpec::from_config(
            BackendKind::CloudEmulator,
            &BackendConfig::cloud_emulator(),
        );
        assert_eq!(spec.binds, vec!["/var/run/docker.sock:/var/run/docker.sock"]);
        assert_eq!(spec.extra_hosts, vec!["host.docker.internal:host-gateway"]);
        assert_eq!(spec.port_key(), "4566/tcp");
        assert_eq!(spec.probe, ReadinessProbe::LogLine("Ready.".to_owned()));
        assert!(spec.env_list().contains(&"SERVICES=lambda,logs,kinesis".to_owned()));
        assert!(spec.name.starts_with("logwire-cloud-emulator-"));
    }

    #[test]
    fn mock_preset_has_no_binds() {
        let spec = BackendSpec::from_config(BackendKind::MockHttp, &BackendConfig::mock_http());
        assert!(spec.binds.is_empty());
        assert_eq!(spec.probe, ReadinessProbe::Port);
        spec.validate().unwrap();
    }

    #[test]
    fn names_are_unique_per_spec() {
        let a = BackendSpecBuilder::new(BackendKind::MockHttp).build().unwrap();
        let b = BackendSpecBuilder::new(BackendKind::MockHttp).build().unwrap();
        assert_ne!(a.name, b.name);
    }

    #[test]
    fn probe_attempts_cover_timeout() {
        let spec = BackendSpecBuilder::new(BackendKind::MockHttp)
            .startup_timeout(Duration::from_secs(10))
            .probe_interval(Duration::from_secs(1))
            .build()
            .unwrap();
        assert_eq!(spec.probe_attempts(), 11);
    }

    #[test]
    fn builder_rejects_empty_image() {
        let err = BackendSpecBuilder::new(BackendKind::MockHttp)
            .image("")
            .build()
            .unwrap_err();
        assert!(matches!(err, EnvironmentError::Config { ref field, .. } if field == "image"));
    }

    #[test]
    fn builder_rejects_empty_pattern() {
        let result = BackendSpecBuilder::new(BackendKind::CloudEmulator)
            .probe(ReadinessProbe::LogLine(String::new()))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn builder_overrides_fields() {
        let spec = BackendSpecBuilder::new(BackendKind::CloudEmulator)
            .image("localstack/localstack:3")
            .name("custom")
            .container_port(4567)
            .env("DEBUG", "1")
            .bind("/tmp:/tmp")
            .build()
            .unwrap();
        assert_eq!(spec.image, "localstack/localstack:3");
        assert_eq!(spec.name, "custom");
        assert_eq!(spec.container_port, 4567);
        assert_eq!(spec.env.get("DEBUG").map(String::as_str), Some("1"));
        assert_eq!(spec.binds.len(), 2);
    }
}
