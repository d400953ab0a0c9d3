//! Docker API abstraction for testability.
//!
//! The [`ContainerRuntime`] trait abstracts the handful of bollard calls the
//! provisioner needs. Production code uses [`BollardRuntime`]; tests and the
//! harness's end-to-end suite use `FakeRuntime` (enabled by the `testing`
//! feature).
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────┐
//! │  EnvironmentProvisioner│
//! └───────────┬────────────┘
//!             │
//!             ▼
//!   ┌──────────────────┐
//!   │ ContainerRuntime │ (trait)
//!   └──────────────────┘
//!        │        │
//!        ▼        ▼
//!   ┌───────┐ ┌──────┐
//!   │Bollard│ │ Fake │
//!   └───┬───┘ └──────┘
//!       │
//!       ▼
//!   Docker Daemon
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, warn};

use crate::error::EnvironmentError;
use crate::spec::BackendSpec;

/// Trait abstracting the container lifecycle operations.
///
/// The trait is `Send + Sync + 'static`, allowing safe sharing across async contexts.
///
/// # Error Handling
///
/// - **404 on remove**: treated as success so teardown stays idempotent
/// - **Connection errors**: `EnvironmentError::DockerConnection`
/// - **Everything else**: `EnvironmentError::DockerApi`
pub trait ContainerRuntime: Send + Sync + 'static {
    /// Checks Docker daemon connectivity.
    fn ping(&self) -> impl Future<Output = Result<(), EnvironmentError>> + Send;

    /// Pulls an image, draining the progress stream.
    fn pull_image(&self, image: &str)
    -> impl Future<Output = Result<(), EnvironmentError>> + Send;

    /// Creates and starts a container for `spec`, returning its ID.
    fn create_and_start(
        &self,
        spec: &BackendSpec,
    ) -> impl Future<Output = Result<String, EnvironmentError>> + Send;

    /// Resolves the host port published for `container_port`.
    ///
    /// # Errors
    ///
    /// - `EnvironmentError::PortNotPublished`: the port has no host binding
    /// - `EnvironmentError::ContainerNotFound`: the container does not exist
    fn host_port(
        &self,
        id: &str,
        container_port: u16,
    ) -> impl Future<Output = Result<u16, EnvironmentError>> + Send;

    /// Returns the container's stdout and stderr collected so far.
    fn logs(&self, id: &str) -> impl Future<Output = Result<String, EnvironmentError>> + Send;

    /// Force-removes a container and its anonymous volumes.
    ///
    /// Removing a container that no longer exists succeeds.
    fn remove(&self, id: &str) -> impl Future<Output = Result<(), EnvironmentError>> + Send;
}

/// Production runtime implementation using `bollard`.
///
/// Internally uses `Arc<bollard::Docker>` for safe sharing across async tasks.
pub struct BollardRuntime {
    docker: Arc<bollard::Docker>,
}

impl BollardRuntime {
    /// Connects to Docker using the default local socket.
    ///
    /// # Errors
    ///
    /// Returns `EnvironmentError::DockerConnection` if the connection fails
    /// (e.g., socket not found, permission denied, daemon not running).
    pub fn connect_local() -> Result<Self, EnvironmentError> {
        let docker = bollard::Docker::connect_with_local_defaults().map_err(|e| {
            EnvironmentError::DockerConnection(format!("failed to connect to docker: {e}"))
        })?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }
}

/// Removes a container that was created but failed to start.
///
/// Returns `start_err` so the caller reports the start failure; a failed
/// removal is logged.
async fn discard_unstarted<R: ContainerRuntime>(
    runtime: &R,
    id: &str,
    start_err: EnvironmentError,
) -> EnvironmentError {
    if let Err(remove_err) = runtime.remove(id).await {
        warn!(
            container_id = id,
            error = %remove_err,
            "failed to remove container that never started"
        );
    }
    start_err
}

fn is_not_found(err: &bollard::errors::Error) -> bool {
    matches!(
        err,
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            ..
        }
    )
}

impl ContainerRuntime for BollardRuntime {
    async fn ping(&self) -> Result<(), EnvironmentError> {
        self.docker
            .ping()
            .await
            .map_err(|e| EnvironmentError::DockerConnection(format!("ping failed: {e}")))?;
        Ok(())
    }

    async fn pull_image(&self, image: &str) -> Result<(), EnvironmentError> {
        use bollard::image::CreateImageOptions;

        let options = CreateImageOptions {
            from_image: image,
            ..Default::default()
        };
        let mut progress = self.docker.create_image(Some(options), None, None);
        while let Some(item) = progress.next().await {
            let info = item
                .map_err(|e| EnvironmentError::DockerApi(format!("pull {image} failed: {e}")))?;
            if let Some(status) = info.status {
                debug!(image, status = %status, "pull progress");
            }
        }
        Ok(())
    }

    async fn create_and_start(&self, spec: &BackendSpec) -> Result<String, EnvironmentError> {
        use bollard::container::{Config, CreateContainerOptions, StartContainerOptions};
        use bollard::models::{HostConfig, PortBinding};

        let port_key = spec.port_key();
        let exposed_ports = HashMap::from([(port_key.clone(), HashMap::new())]);
        // empty host port lets the daemon pick a free one
        let port_bindings = HashMap::from([(
            port_key,
            Some(vec![PortBinding {
                host_ip: None,
                host_port: None,
            }]),
        )]);

        let host_config = HostConfig {
            port_bindings: Some(port_bindings),
            binds: (!spec.binds.is_empty()).then(|| spec.binds.clone()),
            extra_hosts: (!spec.extra_hosts.is_empty()).then(|| spec.extra_hosts.clone()),
            ..Default::default()
        };

        let config = Config::<String> {
            image: Some(spec.image.clone()),
            env: Some(spec.env_list()),
            exposed_ports: Some(exposed_ports),
            host_config: Some(host_config),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: spec.name.clone(),
            platform: None,
        };

        let created = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(|e| EnvironmentError::DockerApi(format!("create container failed: {e}")))?;

        for warning in &created.warnings {
            warn!(container = %spec.name, warning = %warning, "docker create warning");
        }

        if let Err(e) = self
            .docker
            .start_container(&created.id, None::<StartContainerOptions<String>>)
            .await
        {
            let start_err = EnvironmentError::DockerApi(format!("start container failed: {e}"));
            return Err(discard_unstarted(self, &created.id, start_err).await);
        }

        Ok(created.id)
    }

    async fn host_port(&self, id: &str, container_port: u16) -> Result<u16, EnvironmentError> {
        let details = self.docker.inspect_container(id, None).await.map_err(|e| {
            if is_not_found(&e) {
                EnvironmentError::ContainerNotFound(id.to_owned())
            } else {
                EnvironmentError::DockerApi(format!("inspect container failed: {e}"))
            }
        })?;

        let port_key = format!("{container_port}/tcp");
        details
            .network_settings
            .and_then(|settings| settings.ports)
            .and_then(|mut ports| ports.remove(&port_key))
            .flatten()
            .into_iter()
            .flatten()
            .find_map(|binding| binding.host_port.and_then(|p| p.parse().ok()))
            .ok_or_else(|| EnvironmentError::PortNotPublished {
                container_id: id.to_owned(),
                port: container_port,
            })
    }

    async fn logs(&self, id: &str) -> Result<String, EnvironmentError> {
        use bollard::container::LogsOptions;

        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            ..Default::default()
        };
        let mut stream = self.docker.logs(id, Some(options));
        let mut collected = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                if is_not_found(&e) {
                    EnvironmentError::ContainerNotFound(id.to_owned())
                } else {
                    EnvironmentError::DockerApi(format!("read logs failed: {e}"))
                }
            })?;
            collected.push_str(&String::from_utf8_lossy(&chunk.into_bytes()));
        }
        Ok(collected)
    }

    async fn remove(&self, id: &str) -> Result<(), EnvironmentError> {
        use bollard::container::RemoveContainerOptions;

        let options = RemoveContainerOptions {
            force: true,
            v: true,
            ..Default::default()
        };
        match self.docker.remove_container(id, Some(options)).await {
            Ok(()) => Ok(()),
            Err(e) if is_not_found(&e) => {
                debug!(container_id = id, "container already removed");
                Ok(())
            }
            Err(e) => Err(EnvironmentError::DockerApi(format!(
                "remove container failed: {e}"
            ))),
        }
    }
}

#[cfg(any(test, feature = "testing"))]
pub use fake::FakeRuntime;

#[cfg(any(test, feature = "testing"))]
mod fake {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use super::{ContainerRuntime, discard_unstarted};
    use crate::error::EnvironmentError;
    use crate::spec::BackendSpec;

    #[derive(Debug)]
    struct FakeContainer {
        name: String,
        host_port: u16,
        log_reads: u32,
    }

    #[derive(Debug, Default)]
    struct FakeState {
        next_id: u64,
        containers: BTreeMap<String, FakeContainer>,
        pulled: Vec<String>,
        removed: Vec<String>,
    }

    /// 테스트용 in-memory 컨테이너 런타임
    ///
    /// 설정 가능한 응답을 반환하여 Docker 없이도 테스트할 수 있습니다.
    /// 로그는 `ready_after_log_reads`번째 조회부터 `ready_line`을 포함합니다.
    #[derive(Debug)]
    pub struct FakeRuntime {
        state: Mutex<FakeState>,
        host_port: u16,
        ready_line: String,
        ready_after_log_reads: u32,
        fail_create: bool,
        fail_start: bool,
        fail_remove: bool,
    }

    impl Default for FakeRuntime {
        fn default() -> Self {
            Self {
                state: Mutex::new(FakeState::default()),
                host_port: 45_000,
                ready_line: "Ready.".to_owned(),
                ready_after_log_reads: 1,
                fail_create: false,
                fail_start: false,
                fail_remove: false,
            }
        }
    }

    impl FakeRuntime {
        /// 즉시 준비되는 런타임을 생성합니다.
        pub fn new() -> Self {
            Self::default()
        }

        /// 모든 컨테이너가 게시할 호스트 포트를 설정합니다.
        pub fn with_host_port(mut self, port: u16) -> Self {
            self.host_port = port;
            self
        }

        /// 로그가 준비 라인을 포함하기까지 필요한 조회 횟수를 설정합니다.
        ///
        /// `u32::MAX`는 끝내 준비되지 않는 백엔드를 시뮬레이션합니다.
        pub fn with_ready_after(mut self, log_reads: u32) -> Self {
            self.ready_after_log_reads = log_reads;
            self
        }

        /// 컨테이너 생성이 실패하도록 설정합니다.
        pub fn with_failing_create(mut self) -> Self {
            self.fail_create = true;
            self
        }

        /// 컨테이너는 생성되지만 시작이 실패하도록 설정합니다.
        pub fn with_failing_start(mut self) -> Self {
            self.fail_start = true;
            self
        }

        /// 컨테이너 제거가 실패하도록 설정합니다.
        pub fn with_failing_remove(mut self) -> Self {
            self.fail_remove = true;
            self
        }

        /// 현재 실행 중인 컨테이너 이름 목록
        pub fn running(&self) -> Vec<String> {
            self.lock()
                .containers
                .values()
                .map(|c| c.name.clone())
                .collect()
        }

        /// 제거된 컨테이너 ID 목록 (제거 순서)
        pub fn removed(&self) -> Vec<String> {
            self.lock().removed.clone()
        }

        /// 풀한 이미지 목록
        pub fn pulled(&self) -> Vec<String> {
            self.lock().pulled.clone()
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
            self.state.lock().unwrap_or_else(|e| e.into_inner())
        }
    }

    impl ContainerRuntime for FakeRuntime {
        async fn ping(&self) -> Result<(), EnvironmentError> {
            Ok(())
        }

        async fn pull_image(&self, image: &str) -> Result<(), EnvironmentError> {
            self.lock().pulled.push(image.to_owned());
            Ok(())
        }

        async fn create_and_start(&self, spec: &BackendSpec) -> Result<String, EnvironmentError> {
            if self.fail_create {
                return Err(EnvironmentError::DockerApi(
                    "create container failed: mock failure".to_owned(),
                ));
            }
            let id = {
                let mut state = self.lock();
                state.next_id += 1;
                let id = format!("{:064x}", state.next_id);
                state.containers.insert(
                    id.clone(),
                    FakeContainer {
                        name: spec.name.clone(),
                        host_port: self.host_port,
                        log_reads: 0,
                    },
                );
                id
            };
            if self.fail_start {
                let start_err = EnvironmentError::DockerApi(
                    "start container failed: mock failure".to_owned(),
                );
                return Err(discard_unstarted(self, &id, start_err).await);
            }
            Ok(id)
        }

        async fn host_port(
            &self,
            id: &str,
            _container_port: u16,
        ) -> Result<u16, EnvironmentError> {
            self.lock()
                .containers
                .get(id)
                .map(|c| c.host_port)
                .ok_or_else(|| EnvironmentError::ContainerNotFound(id.to_owned()))
        }

        async fn logs(&self, id: &str) -> Result<String, EnvironmentError> {
            let mut state = self.lock();
            let container = state
                .containers
                .get_mut(id)
                .ok_or_else(|| EnvironmentError::ContainerNotFound(id.to_owned()))?;
            container.log_reads = container.log_reads.saturating_add(1);
            if container.log_reads >= self.ready_after_log_reads {
                Ok(format!("booting\n{}\n", self.ready_line))
            } else {
                Ok("booting\n".to_owned())
            }
        }

        async fn remove(&self, id: &str) -> Result<(), EnvironmentError> {
            if self.fail_remove {
                return Err(EnvironmentError::DockerApi(
                    "remove container failed: mock failure".to_owned(),
                ));
            }
            let mut state = self.lock();
            if state.containers.remove(id).is_some() {
                state.removed.push(id.to_owned());
            }
            Ok(())
        }
    }
}
