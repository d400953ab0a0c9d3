//! 설정 관리 — logwire.toml 파싱 및 런타임 설정
//!
//! [`HarnessConfig`]는 하네스 전체 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LOGWIRE_FUNCTION_NAME=log-producer` 형식)
//! 3. 설정 파일 (`logwire.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), logwire_core::error::HarnessError> {
//! use logwire_core::config::HarnessConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = HarnessConfig::load("logwire.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = HarnessConfig::parse("[payloads]\ncount = 4")?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, HarnessError};
use crate::poll::PollPolicy;

/// 설정 상한값 상수
const MAX_SHARD_COUNT: i32 = 16;
const MIN_MEMORY_MB: i32 = 128;
const MAX_MEMORY_MB: i32 = 10_240;
const MAX_POLL_INTERVAL_SECS: u64 = 300;
const MAX_READINESS_ATTEMPTS: u32 = 1_000;
const MAX_OBSERVER_POLLS: u32 = 10_000;
const MAX_STARTUP_TIMEOUT_SECS: u64 = 1_800;
const MAX_PAYLOAD_COUNT: usize = 1_000;
const MAX_FUNCTION_NAME_LEN: usize = 64;

/// logwire 통합 설정
///
/// `logwire.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 에뮬레이터 접속 자격 증명 (고정 더미 값)
    #[serde(default)]
    pub aws: AwsConfig,
    /// 클라우드 에뮬레이터 백엔드
    #[serde(default = "BackendConfig::cloud_emulator")]
    pub emulator: BackendConfig,
    /// Mock HTTP 백엔드
    #[serde(default = "BackendConfig::mock_http")]
    pub mock_api: BackendConfig,
    /// 테스트 대상 함수
    #[serde(default)]
    pub function: FunctionConfig,
    /// 로그 라우팅 (스트림 + 구독)
    #[serde(default)]
    pub routing: RoutingConfig,
    /// 함수 활성화 대기
    #[serde(default)]
    pub readiness: ReadinessConfig,
    /// 파이프라인 관측
    #[serde(default)]
    pub observer: ObserverConfig,
    /// 합성 페이로드
    #[serde(default)]
    pub payloads: PayloadConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            aws: AwsConfig::default(),
            emulator: BackendConfig::cloud_emulator(),
            mock_api: BackendConfig::mock_http(),
            function: FunctionConfig::default(),
            routing: RoutingConfig::default(),
            readiness: ReadinessConfig::default(),
            observer: ObserverConfig::default(),
            payloads: PayloadConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HarnessError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                HarnessError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, HarnessError> {
        toml::from_str(toml_str).map_err(|e| {
            HarnessError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LOGWIRE_{SECTION}_{FIELD}`
    /// 예: `LOGWIRE_ROUTING_SHARD_COUNT=2`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOGWIRE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOGWIRE_GENERAL_LOG_FORMAT");

        // AWS
        override_string(&mut self.aws.region, "LOGWIRE_AWS_REGION");
        override_string(&mut self.aws.access_key_id, "LOGWIRE_AWS_ACCESS_KEY_ID");
        override_string(
            &mut self.aws.secret_access_key,
            "LOGWIRE_AWS_SECRET_ACCESS_KEY",
        );

        // Backends
        override_string(&mut self.emulator.image, "LOGWIRE_EMULATOR_IMAGE");
        override_parsed(
            &mut self.emulator.startup_timeout_secs,
            "LOGWIRE_EMULATOR_STARTUP_TIMEOUT_SECS",
        );
        override_string(&mut self.mock_api.image, "LOGWIRE_MOCK_API_IMAGE");
        override_parsed(
            &mut self.mock_api.startup_timeout_secs,
            "LOGWIRE_MOCK_API_STARTUP_TIMEOUT_SECS",
        );

        // Function
        override_string(&mut self.function.name, "LOGWIRE_FUNCTION_NAME");
        override_string(
            &mut self.function.artifact_path,
            "LOGWIRE_FUNCTION_ARTIFACT_PATH",
        );
        override_string(&mut self.function.runtime, "LOGWIRE_FUNCTION_RUNTIME");
        override_parsed(&mut self.function.memory_mb, "LOGWIRE_FUNCTION_MEMORY_MB");

        // Routing
        override_string(&mut self.routing.stream_name, "LOGWIRE_ROUTING_STREAM_NAME");
        override_parsed(&mut self.routing.shard_count, "LOGWIRE_ROUTING_SHARD_COUNT");
        override_string(
            &mut self.routing.filter_pattern,
            "LOGWIRE_ROUTING_FILTER_PATTERN",
        );

        // Readiness
        override_parsed(
            &mut self.readiness.poll_interval_secs,
            "LOGWIRE_READINESS_POLL_INTERVAL_SECS",
        );
        override_parsed(
            &mut self.readiness.max_attempts,
            "LOGWIRE_READINESS_MAX_ATTEMPTS",
        );

        // Observer
        override_parsed(
            &mut self.observer.poll_interval_secs,
            "LOGWIRE_OBSERVER_POLL_INTERVAL_SECS",
        );
        override_parsed(&mut self.observer.max_polls, "LOGWIRE_OBSERVER_MAX_POLLS");
        override_parsed(&mut self.observer.follow, "LOGWIRE_OBSERVER_FOLLOW");
        override_parsed(&mut self.observer.color, "LOGWIRE_OBSERVER_COLOR");

        // Payloads
        override_parsed(&mut self.payloads.count, "LOGWIRE_PAYLOADS_COUNT");
        override_string(&mut self.payloads.stubs_path, "LOGWIRE_PAYLOADS_STUBS_PATH");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), HarnessError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.aws.region.is_empty() {
            return Err(invalid("aws.region", "must not be empty"));
        }

        self.emulator.validate("emulator")?;
        self.mock_api.validate("mock_api")?;

        let name = &self.function.name;
        if name.is_empty()
            || name.len() > MAX_FUNCTION_NAME_LEN
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(invalid(
                "function.name",
                format!("must be 1-{MAX_FUNCTION_NAME_LEN} chars of [A-Za-z0-9_-]"),
            ));
        }

        if !(MIN_MEMORY_MB..=MAX_MEMORY_MB).contains(&self.function.memory_mb) {
            return Err(invalid(
                "function.memory_mb",
                format!("must be {MIN_MEMORY_MB}-{MAX_MEMORY_MB}"),
            ));
        }

        if self.function.upstream_env_var.is_empty() {
            return Err(invalid("function.upstream_env_var", "must not be empty"));
        }

        if self.routing.stream_name.is_empty() {
            return Err(invalid("routing.stream_name", "must not be empty"));
        }

        if !(1..=MAX_SHARD_COUNT).contains(&self.routing.shard_count) {
            return Err(invalid(
                "routing.shard_count",
                format!("must be 1-{MAX_SHARD_COUNT}"),
            ));
        }

        if self.routing.log_stream_name.is_empty() || self.routing.filter_name.is_empty() {
            return Err(invalid(
                "routing",
                "log_stream_name and filter_name must not be empty",
            ));
        }

        if self.readiness.poll_interval_secs == 0
            || self.readiness.poll_interval_secs > MAX_POLL_INTERVAL_SECS
        {
            return Err(invalid(
                "readiness.poll_interval_secs",
                format!("must be 1-{MAX_POLL_INTERVAL_SECS}"),
            ));
        }

        if self.readiness.max_attempts == 0 || self.readiness.max_attempts > MAX_READINESS_ATTEMPTS
        {
            return Err(invalid(
                "readiness.max_attempts",
                format!("must be 1-{MAX_READINESS_ATTEMPTS}"),
            ));
        }

        if self.observer.poll_interval_secs == 0
            || self.observer.poll_interval_secs > MAX_POLL_INTERVAL_SECS
        {
            return Err(invalid(
                "observer.poll_interval_secs",
                format!("must be 1-{MAX_POLL_INTERVAL_SECS}"),
            ));
        }

        if self.observer.max_polls == 0 || self.observer.max_polls > MAX_OBSERVER_POLLS {
            return Err(invalid(
                "observer.max_polls",
                format!("must be 1-{MAX_OBSERVER_POLLS}"),
            ));
        }

        if self.payloads.count > MAX_PAYLOAD_COUNT {
            return Err(invalid(
                "payloads.count",
                format!("must be 0-{MAX_PAYLOAD_COUNT}"),
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> HarnessError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 에뮬레이터 접속 설정
///
/// 실제 인증은 범위 밖이므로 고정 더미 자격 증명을 사용합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    /// 리전
    pub region: String,
    /// 액세스 키 ID
    pub access_key_id: String,
    /// 시크릿 액세스 키
    pub secret_access_key: String,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_owned(),
            access_key_id: "test".to_owned(),
            secret_access_key: "test".to_owned(),
        }
    }
}

/// 준비 프로브 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeConfig {
    /// 컨테이너 로그에 `pattern`이 나타나면 준비 완료
    LogLine { pattern: String },
    /// 노출 포트에 TCP 연결이 되면 준비 완료
    Port,
}

/// 컨테이너 백엔드 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// 컨테이너 이미지
    pub image: String,
    /// 노출할 컨테이너 포트 (TCP)
    pub container_port: u16,
    /// 컨테이너 환경변수
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// 준비 프로브
    pub probe: ProbeConfig,
    /// 준비 대기 제한 시간 (초)
    pub startup_timeout_secs: u64,
    /// Docker 소켓을 컨테이너에 마운트할지 여부
    #[serde(default)]
    pub mount_docker_socket: bool,
}

impl BackendConfig {
    /// 클라우드 에뮬레이터 기본값
    pub fn cloud_emulator() -> Self {
        let env = BTreeMap::from([
            ("SERVICES".to_owned(), "lambda,logs,kinesis".to_owned()),
            ("IAM_SOFT_MODE".to_owned(), "1".to_owned()),
        ]);
        Self {
            image: "localstack/localstack".to_owned(),
            container_port: 4566,
            env,
            probe: ProbeConfig::LogLine {
                pattern: "Ready.".to_owned(),
            },
            startup_timeout_secs: 180,
            mount_docker_socket: true,
        }
    }

    /// Mock HTTP 서버 기본값
    pub fn mock_http() -> Self {
        Self {
            image: "wiremock/wiremock:latest".to_owned(),
            container_port: 8080,
            env: BTreeMap::new(),
            probe: ProbeConfig::Port,
            startup_timeout_secs: 60,
            mount_docker_socket: false,
        }
    }

    /// 준비 대기 제한 시간
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    fn validate(&self, section: &str) -> Result<(), HarnessError> {
        if self.image.is_empty() {
            return Err(invalid(&format!("{section}.image"), "must not be empty"));
        }
        if self.container_port == 0 {
            return Err(invalid(
                &format!("{section}.container_port"),
                "must be non-zero",
            ));
        }
        if self.startup_timeout_secs == 0 || self.startup_timeout_secs > MAX_STARTUP_TIMEOUT_SECS {
            return Err(invalid(
                &format!("{section}.startup_timeout_secs"),
                format!("must be 1-{MAX_STARTUP_TIMEOUT_SECS}"),
            ));
        }
        match &self.probe {
            ProbeConfig::LogLine { pattern } if pattern.is_empty() => Err(invalid(
                &format!("{section}.probe.pattern"),
                "must not be empty",
            )),
            _ => Ok(()),
        }
    }
}

/// 테스트 대상 함수 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionConfig {
    /// 함수 이름
    pub name: String,
    /// 패키징된 zip 아티팩트 경로
    pub artifact_path: String,
    /// 핸들러 엔트리 포인트
    pub handler: String,
    /// 런타임 식별자
    pub runtime: String,
    /// 메모리 (MB)
    pub memory_mb: i32,
    /// 실행 역할 ARN (더미)
    pub role_arn: String,
    /// mock API 주소를 전달할 환경변수 이름
    pub upstream_env_var: String,
    /// 함수 컨테이너에서 본 호스트 이름
    pub upstream_host: String,
}

impl Default for FunctionConfig {
    fn default() -> Self {
        Self {
            name: "log-producer".to_owned(),
            artifact_path: "dist/log-producer.zip".to_owned(),
            handler: "index.handler".to_owned(),
            runtime: "nodejs18.x".to_owned(),
            memory_mb: 128,
            role_arn: "arn:aws:iam::123456789012:role/lambda-role".to_owned(),
            upstream_env_var: "TARGET_HOSTNAME".to_owned(),
            upstream_host: "host.docker.internal".to_owned(),
        }
    }
}

/// 로그 라우팅 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// 스트림 이름
    pub stream_name: String,
    /// 샤드 수 (생성 후 고정)
    pub shard_count: i32,
    /// 함수 로그 그룹에 생성할 로그 스트림 이름
    pub log_stream_name: String,
    /// 구독 필터 이름
    pub filter_name: String,
    /// 구독 필터 패턴 (빈 문자열은 전체 매칭)
    pub filter_pattern: String,
    /// 로그 서비스가 스트림에 쓰기 위한 역할 ARN (더미)
    pub role_arn: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            stream_name: "api_logs_to_cloudwatch".to_owned(),
            shard_count: 1,
            log_stream_name: "logwire-log-stream".to_owned(),
            filter_name: "logwire-api-log".to_owned(),
            filter_pattern: String::new(),
            role_arn: "arn:aws:iam::123456789012:role/role-to-push-to-kinesis".to_owned(),
        }
    }
}

/// 함수 활성화 대기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// 폴링 간격 (초)
    pub poll_interval_secs: u64,
    /// 최대 시도 횟수
    pub max_attempts: u32,
}

impl ReadinessConfig {
    /// 폴링 정책으로 변환합니다.
    pub fn policy(&self) -> PollPolicy {
        PollPolicy::new(Duration::from_secs(self.poll_interval_secs), self.max_attempts)
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            max_attempts: 60,
        }
    }
}

/// 파이프라인 관측 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    /// 폴링 간격 (초)
    pub poll_interval_secs: u64,
    /// 최대 폴링 횟수
    pub max_polls: u32,
    /// 관측 후 종료 신호까지 로그를 계속 출력할지 여부
    pub follow: bool,
    /// 레코드 JSON 컬러 출력 여부
    pub color: bool,
}

impl ObserverConfig {
    /// 폴링 정책으로 변환합니다.
    pub fn policy(&self) -> PollPolicy {
        PollPolicy::new(Duration::from_secs(self.poll_interval_secs), self.max_polls)
    }
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 2,
            max_polls: 60,
            follow: false,
            color: true,
        }
    }
}

/// 합성 페이로드 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PayloadConfig {
    /// 주입할 이벤트 수
    pub count: usize,
    /// mock API stub 정의 파일 경로
    pub stubs_path: String,
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self {
            count: crate::event::DEFAULT_BATTERY_SIZE,
            stubs_path: "stubs.json".to_owned(),
        }
    }
}

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_parsed<T: FromStr>(target: &mut T, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                expected = std::any::type_name::<T>(),
                "failed to parse env var, ignoring"
            ),
        }
    }
}
