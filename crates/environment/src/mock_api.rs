//! Mock API 구성 — 스텁 정의를 mock HTTP 서버에 일괄 등록
//!
//! [`StubSet`]은 한 번 로드된 뒤 변경되지 않는 규칙 스냅샷입니다.
//! [`MockApiConfigurator::register_stubs`]는 단 한 번의 일괄 import 호출을 수행하며,
//! 2xx가 아닌 응답은 실행 전체에 치명적입니다. 응답 본문은 그대로 로그에 남깁니다.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::info;

use crate::error::EnvironmentError;

/// 일괄 import 경로
pub const IMPORT_PATH: &str = "/__admin/mappings/import";

/// import 요청 제한 시간
const IMPORT_TIMEOUT: Duration = Duration::from_secs(30);

/// 불변 스텁 규칙 집합
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubSet {
    raw: Bytes,
    rule_count: usize,
}

impl StubSet {
    /// 파일에서 스텁 집합을 로드합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, EnvironmentError> {
        let path = path.as_ref();
        let raw = tokio::fs::read(path)
            .await
            .map_err(|e| EnvironmentError::StubLoad {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Self::from_bytes(raw).map_err(|reason| EnvironmentError::StubLoad {
            path: path.display().to_string(),
            reason,
        })
    }

    /// 바이트에서 스텁 집합을 생성합니다.
    ///
    /// 최상위 `mappings` 배열이 있어야 하며, 각 규칙은 `request`와 `response`를 가져야 합니다.
    pub fn from_bytes(raw: impl Into<Bytes>) -> Result<Self, String> {
        let raw = raw.into();
        let doc: serde_json::Value =
            serde_json::from_slice(&raw).map_err(|e| format!("invalid json: {e}"))?;
        let mappings = doc
            .get("mappings")
            .and_then(serde_json::Value::as_array)
            .ok_or_else(|| "missing 'mappings' array".to_owned())?;
        for (idx, rule) in mappings.iter().enumerate() {
            if rule.get("request").is_none() || rule.get("response").is_none() {
                return Err(format!("mapping {idx} needs 'request' and 'response'"));
            }
        }
        Ok(Self {
            rule_count: mappings.len(),
            raw,
        })
    }

    /// 규칙 수
    pub fn rule_count(&self) -> usize {
        self.rule_count
    }

    /// 원본 문서 바이트
    pub fn as_bytes(&self) -> &Bytes {
        &self.raw
    }
}

/// mock 서버의 import 응답
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubAck {
    /// HTTP 상태 코드
    pub status: u16,
    /// 응답 본문 (가공하지 않음)
    pub body: String,
}

impl StubAck {
    /// 2xx 응답인지 반환합니다.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// 스텁 등록 전송 계층
pub trait StubRegistry: Send + Sync + 'static {
    /// `endpoint`(`host:port`)의 mock 서버에 스텁 문서를 import 합니다.
    ///
    /// 전송 실패만 에러로 반환하며, 상태 코드 판정은 호출자가 합니다.
    fn import(
        &self,
        endpoint: &str,
        stubs: &StubSet,
    ) -> impl Future<Output = Result<StubAck, EnvironmentError>> + Send;
}

/// reqwest 기반 스텁 등록 구현
pub struct HttpStubRegistry {
    client: reqwest::Client,
}

impl HttpStubRegistry {
    /// 기본 제한 시간으로 클라이언트를 생성합니다.
    pub fn new() -> Result<Self, EnvironmentError> {
        let client = reqwest::Client::builder()
            .timeout(IMPORT_TIMEOUT)
            .build()
            .map_err(|e| EnvironmentError::Http(format!("failed to build http client: {e}")))?;
        Ok(Self { client })
    }
}

impl StubRegistry for HttpStubRegistry {
    async fn import(&self, endpoint: &str, stubs: &StubSet) -> Result<StubAck, EnvironmentError> {
        let url = format!("http://{endpoint}{IMPORT_PATH}");
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(stubs.as_bytes().clone())
            .send()
            .await
            .map_err(|e| EnvironmentError::Http(format!("POST {url} failed: {e}")))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| EnvironmentError::Http(format!("reading import response failed: {e}")))?;
        Ok(StubAck { status, body })
    }
}

/// Mock API 구성기
pub struct MockApiConfigurator<S: StubRegistry> {
    registry: Arc<S>,
}

impl<S: StubRegistry> MockApiConfigurator<S> {
    /// 등록 전송 계층으로 구성기를 생성합니다.
    pub fn new(registry: Arc<S>) -> Self {
        Self { registry }
    }

    /// 스텁 집합 전체를 한 번에 등록합니다.
    ///
    /// # Errors
    ///
    /// - `EnvironmentError::StubRejected`: 2xx가 아닌 응답
    /// - `EnvironmentError::Http`: 전송 실패
    pub async fn register_stubs(
        &self,
        endpoint: &str,
        stubs: &StubSet,
    ) -> Result<StubAck, EnvironmentError> {
        info!(endpoint, rules = stubs.rule_count(), "registering mock api stubs");
        let ack = self.registry.import(endpoint, stubs).await?;
        info!(status = ack.status, ack = %ack.body, "mock api import acknowledged");
        if !ack.is_success() {
            return Err(EnvironmentError::StubRejected {
                status: ack.status,
                body: ack.body,
            });
        }
        Ok(ack)
    }
}

#[cfg(any(test, feature = "testing"))]
pub use fake::FakeStubRegistry;

#[cfg(any(test, feature = "testing"))]
mod fake {
    use std::sync::Mutex;

    use super::{StubAck, StubRegistry, StubSet};
    use crate::error::EnvironmentError;

    /// 테스트용 스텁 레지스트리
    ///
    /// 호출을 기록하고 설정된 상태 코드로 응답합니다.
    #[derive(Debug)]
    pub struct FakeStubRegistry {
        status: u16,
        imports: Mutex<Vec<(String, usize)>>,
    }

    impl Default for FakeStubRegistry {
        fn default() -> Self {
            Self {
                status: 200,
                imports: Mutex::new(Vec::new()),
            }
        }
    }

    impl FakeStubRegistry {
        /// 200으로 응답하는 레지스트리를 생성합니다.
        pub fn new() -> Self {
            Self::default()
        }

        /// 응답 상태 코드를 설정합니다.
        pub fn with_status(mut self, status: u16) -> Self {
            self.status = status;
            self
        }

        /// 기록된 (endpoint, 규칙 수) 목록
        pub fn imports(&self) -> Vec<(String, usize)> {
            self.imports
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone()
        }
    }

    impl StubRegistry for FakeStubRegistry {
        async fn import(
            &self,
            endpoint: &str,
            stubs: &StubSet,
        ) -> Result<StubAck, EnvironmentError> {
            self.imports
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push((endpoint.to_owned(), stubs.rule_count()));
            Ok(StubAck {
                status: self.status,
                body: format!("{{\"mappings\":{}}}", stubs.rule_count()),
            })
        }
    }
}
