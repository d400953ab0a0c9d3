//! 함수 프로비저닝
//!
//! 패키징된 아티팩트로 함수를 만들고, 직후에 함수 전용 로그 목적지를 만듭니다.
//! 두 작업은 한 쌍이며, 로그 목적지 생성이 실패하면 방금 만든 함수를 삭제합니다.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, warn};

use logwire_core::config::FunctionConfig;
use logwire_core::types::{FunctionDescriptor, FunctionState, LogDestination};

use crate::api::{FunctionApi, LogsApi};
use crate::error::CloudError;
use crate::routing::LogRouter;

/// 로그 목적지까지 갖춘 함수
#[derive(Debug, Clone)]
pub struct ProvisionedFunction {
    pub descriptor: FunctionDescriptor,
    pub destination: LogDestination,
}

/// 아티팩트 파일을 읽습니다.
///
/// 빈 파일은 거부합니다.
pub async fn load_artifact(path: impl AsRef<Path>) -> Result<Bytes, CloudError> {
    let path = path.as_ref();
    let raw = tokio::fs::read(path)
        .await
        .map_err(|e| CloudError::Artifact {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
    if raw.is_empty() {
        return Err(CloudError::Artifact {
            path: path.display().to_string(),
            reason: "artifact is empty".to_owned(),
        });
    }
    Ok(Bytes::from(raw))
}

/// 설정과 아티팩트로 함수 생성 요청을 만듭니다.
///
/// 함수는 `upstream_url`을 `config.upstream_env_var` 환경변수로 전달받습니다.
pub fn descriptor(config: &FunctionConfig, artifact: Bytes, upstream_url: &str) -> FunctionDescriptor {
    let environment = BTreeMap::from([(config.upstream_env_var.clone(), upstream_url.to_owned())]);
    FunctionDescriptor {
        name: config.name.clone(),
        artifact,
        environment,
        role_arn: config.role_arn.clone(),
        handler: config.handler.clone(),
        runtime: config.runtime.clone(),
        memory_mb: config.memory_mb,
        state: FunctionState::Pending,
    }
}

/// 함수 프로비저너
pub struct FunctionProvisioner<C> {
    api: Arc<C>,
    router: LogRouter<C>,
}

impl<C: FunctionApi + LogsApi> FunctionProvisioner<C> {
    /// 새 프로비저너를 생성합니다.
    pub fn new(api: Arc<C>, router: LogRouter<C>) -> Self {
        Self { api, router }
    }

    /// 함수를 만들고 전용 로그 목적지를 붙입니다.
    ///
    /// 반환된 함수는 아직 `Pending`일 수 있으므로 호출 전에 준비 대기가 필요합니다.
    ///
    /// # Errors
    ///
    /// - `CloudError::Rejected`: 백엔드가 아티팩트나 역할을 거부함
    /// - `CloudError::Conflict`: 같은 이름의 함수나 로그 그룹이 이미 있음
    pub async fn create_function(
        &self,
        mut descriptor: FunctionDescriptor,
        log_stream_name: &str,
    ) -> Result<ProvisionedFunction, CloudError> {
        info!(
            function = %descriptor.name,
            runtime = %descriptor.runtime,
            artifact_bytes = descriptor.artifact.len(),
            "creating function"
        );
        descriptor.state = self.api.create_function(&descriptor).await?;

        let destination = match self
            .router
            .create_log_destination(&descriptor.name, log_stream_name)
            .await
        {
            Ok(destination) => destination,
            Err(e) => {
                warn!(function = %descriptor.name, error = %e, "log destination failed, deleting function");
                if let Err(cleanup) = self.api.delete_function(&descriptor.name).await {
                    warn!(function = %descriptor.name, error = %cleanup, "failed to delete function");
                }
                return Err(e);
            }
        };

        info!(function = %descriptor.name, state = %descriptor.state, "function created");
        Ok(ProvisionedFunction {
            descriptor,
            destination,
        })
    }

    /// 함수를 삭제합니다.
    pub async fn delete_function(&self, name: &str) -> Result<(), CloudError> {
        self.api.delete_function(name).await
    }
}
