//! 환경 프로비저너 — 에뮬레이션 백엔드의 시작과 종료
//!
//! [`EnvironmentProvisioner::start`]는 이미지 풀, 컨테이너 생성/시작, 호스트 포트 해석,
//! 준비 프로브를 순서대로 수행합니다. 도중에 실패하면 이미 만든 컨테이너를
//! 스스로 제거하므로 호출자는 성공한 핸들만 해제하면 됩니다.
//!
//! 준비 대기 중에 취소될 수 있는 호출자는 [`EnvironmentProvisioner::launch`]로
//! 컨테이너를 만든 직후 해제를 등록하고, 그 다음 [`EnvironmentProvisioner::await_ready`]를
//! 호출합니다.
//!
//! [`EnvironmentProvisioner::terminate`]는 멱등이며 언제 호출해도 안전합니다.

use std::sync::Arc;

use tracing::{info, warn};

use logwire_core::metrics as m;
use logwire_core::types::{BackendKind, EnvironmentHandle, LifecycleState};

use crate::docker::ContainerRuntime;
use crate::error::EnvironmentError;
use crate::probe::wait_ready;
use crate::spec::BackendSpec;

/// 게시된 포트에 접근할 호스트 이름
const LOCAL_HOST: &str = "localhost";

/// 에뮬레이션 백엔드 프로비저너
pub struct EnvironmentProvisioner<R: ContainerRuntime> {
    runtime: Arc<R>,
}

impl<R: ContainerRuntime> Clone for EnvironmentProvisioner<R> {
    fn clone(&self) -> Self {
        Self {
            runtime: Arc::clone(&self.runtime),
        }
    }
}

impl<R: ContainerRuntime> EnvironmentProvisioner<R> {
    /// 런타임으로 프로비저너를 생성합니다.
    pub fn new(runtime: Arc<R>) -> Self {
        Self { runtime }
    }

    /// 사용 중인 런타임
    pub fn runtime(&self) -> &Arc<R> {
        &self.runtime
    }

    /// 백엔드를 시작하고 준비될 때까지 대기합니다.
    ///
    /// [`launch`](Self::launch)와 [`await_ready`](Self::await_ready)를 이어서 수행하며,
    /// 준비에 실패하면 컨테이너를 스스로 제거합니다.
    ///
    /// # Errors
    ///
    /// - `EnvironmentError::ReadinessTimeout`: 제한 시간 내에 준비되지 않음
    /// - `EnvironmentError::Config`: `spec`이 유효하지 않음
    /// - 그 외 Docker API 에러
    pub async fn start(
        &self,
        kind: BackendKind,
        spec: &BackendSpec,
    ) -> Result<EnvironmentHandle, EnvironmentError> {
        let mut handle = self.launch(kind, spec).await?;
        match self.await_ready(&mut handle, spec).await {
            Ok(()) => Ok(handle),
            Err(e) => {
                warn!(backend = %kind, error = %e, "backend failed to become ready, removing container");
                if let Err(remove_err) = self.terminate(&mut handle).await {
                    warn!(
                        container_id = %handle.container_id,
                        error = %remove_err,
                        "failed to remove container after startup failure"
                    );
                }
                Err(e)
            }
        }
    }

    /// 이미지를 풀하고 컨테이너를 생성/시작합니다. 준비는 기다리지 않습니다.
    ///
    /// 반환된 핸들은 `Starting` 상태이고 엔드포인트가 비어 있습니다.
    /// 컨테이너는 이미 존재하므로 호출자는 즉시 해제 대상으로 등록해야 합니다.
    pub async fn launch(
        &self,
        kind: BackendKind,
        spec: &BackendSpec,
    ) -> Result<EnvironmentHandle, EnvironmentError> {
        spec.validate()?;

        info!(backend = %kind, image = %spec.image, "starting backend");
        self.runtime.pull_image(&spec.image).await?;
        let container_id = self.runtime.create_and_start(spec).await?;
        Ok(EnvironmentHandle {
            kind,
            container_id,
            endpoint: String::new(),
            state: LifecycleState::Starting,
        })
    }

    /// 호스트 포트를 해석하고 준비 프로브가 통과할 때까지 대기합니다.
    ///
    /// 성공하면 핸들에 엔드포인트를 채우고 `Ready`로 전이합니다.
    /// 실패해도 컨테이너는 제거하지 않습니다.
    pub async fn await_ready(
        &self,
        handle: &mut EnvironmentHandle,
        spec: &BackendSpec,
    ) -> Result<(), EnvironmentError> {
        let endpoint = self.await_endpoint(&handle.container_id, spec).await?;
        metrics::counter!(m::BACKENDS_STARTED_TOTAL, m::LABEL_BACKEND => handle.kind.to_string())
            .increment(1);
        info!(
            backend = %handle.kind,
            container_id = %handle.container_id,
            endpoint = %endpoint,
            "backend ready"
        );
        handle.endpoint = endpoint;
        handle.state = LifecycleState::Ready;
        Ok(())
    }

    async fn await_endpoint(
        &self,
        container_id: &str,
        spec: &BackendSpec,
    ) -> Result<String, EnvironmentError> {
        let host_port = self
            .runtime
            .host_port(container_id, spec.container_port)
            .await?;
        wait_ready(self.runtime.as_ref(), container_id, host_port, spec).await?;
        Ok(format!("{LOCAL_HOST}:{host_port}"))
    }

    /// 백엔드를 종료합니다.
    ///
    /// 이미 종료된 핸들에 대해서는 아무 것도 하지 않습니다.
    pub async fn terminate(&self, handle: &mut EnvironmentHandle) -> Result<(), EnvironmentError> {
        if handle.state == LifecycleState::Terminated {
            return Ok(());
        }
        info!(backend = %handle.kind, container_id = %handle.container_id, "terminating backend");
        self.runtime.remove(&handle.container_id).await?;
        handle.state = LifecycleState::Terminated;
        Ok(())
    }
}
