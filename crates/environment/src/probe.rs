//! 준비 프로브 — 시작된 백엔드가 사용 가능한지 확인
//!
//! 로그 라인 매칭 또는 호스트 포트 TCP 연결로 준비 여부를 판단하며,
//! [`poll_until`]로 사양의 제한 시간 안에서만 재시도합니다.

use std::time::Duration;

use tokio::net::TcpStream;
use tracing::debug;

use logwire_core::poll::{PollError, PollOutcome, PollPolicy, poll_until};

use crate::docker::ContainerRuntime;
use crate::error::EnvironmentError;
use crate::spec::{BackendSpec, ReadinessProbe};

/// 단일 TCP 연결 시도 제한 시간
const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// 백엔드가 준비될 때까지 대기합니다.
///
/// # Errors
///
/// - `EnvironmentError::ReadinessTimeout`: 제한 시간 내에 프로브가 통과하지 못함
/// - 컨테이너가 사라진 경우 런타임 에러를 그대로 반환
pub async fn wait_ready<R: ContainerRuntime>(
    runtime: &R,
    container_id: &str,
    host_port: u16,
    spec: &BackendSpec,
) -> Result<(), EnvironmentError> {
    let policy = PollPolicy::new(spec.probe_interval, spec.probe_attempts());

    let result = poll_until(&policy, |attempt| async move {
        let ready = match &spec.probe {
            ReadinessProbe::LogLine(pattern) => runtime
                .logs(container_id)
                .await?
                .lines()
                .any(|line| line.contains(pattern.as_str())),
            ReadinessProbe::Port => port_alive(host_port).await,
        };
        debug!(image = %spec.image, attempt, ready, "readiness probe");
        Ok::<_, EnvironmentError>(if ready {
            PollOutcome::Ready(())
        } else {
            PollOutcome::Pending
        })
    })
    .await;

    match result {
        Ok(()) => Ok(()),
        Err(PollError::Failed(e)) => Err(e),
        Err(PollError::Exhausted { .. }) => Err(EnvironmentError::ReadinessTimeout {
            image: spec.image.clone(),
            waited_secs: spec.startup_timeout.as_secs(),
        }),
    }
}

/// 로컬 호스트 포트에 TCP 연결이 되는지 확인합니다.
pub async fn port_alive(port: u16) -> bool {
    matches!(
        tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(("127.0.0.1", port))).await,
        Ok(Ok(_))
    )
}

#[cfg(test)]
mod tests {
    use logwire_core::types::BackendKind;

    use super::*;
    use crate::docker::FakeRuntime;
    use crate::spec::BackendSpecBuilder;

    fn log_spec(timeout_secs: u64) -> BackendSpec {
        BackendSpecBuilder::new(BackendKind::CloudEmulator)
            .startup_timeout(Duration::from_secs(timeout_secs))
            .probe_interval(Duration::from_secs(1))
            .build()
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn log_line_probe_waits_for_pattern() {
        let runtime = FakeRuntime::new().with_ready_after(4);
        let spec = log_spec(30);
        let id = runtime.create_and_start(&spec).await.unwrap();

        wait_ready(&runtime, &id, 0, &spec).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn log_line_probe_times_out() {
        let runtime = FakeRuntime::new().with_ready_after(u32::MAX);
        let spec = log_spec(5);
        let id = runtime.create_and_start(&spec).await.unwrap();

        let err = wait_ready(&runtime, &id, 0, &spec).await.unwrap_err();
        assert!(matches!(
            err,
            EnvironmentError::ReadinessTimeout { waited_secs: 5, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_container_fails_fast() {
        let runtime = FakeRuntime::new();
        let spec = log_spec(30);
        let err = wait_ready(&runtime, "gone", 0, &spec).await.unwrap_err();
        assert!(matches!(err, EnvironmentError::ContainerNotFound(_)));
    }

    #[tokio::test]
    async fn port_probe_detects_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(port_alive(port).await);

        let spec = BackendSpecBuilder::new(BackendKind::MockHttp)
            .probe_interval(Duration::from_millis(10))
            .startup_timeout(Duration::from_secs(1))
            .build()
            .unwrap();
        let runtime = FakeRuntime::new().with_host_port(port);
        let id = runtime.create_and_start(&spec).await.unwrap();
        wait_ready(&runtime, &id, port, &spec).await.unwrap();
    }

    #[tokio::test]
    async fn port_probe_rejects_closed_port() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        assert!(!port_alive(port).await);
    }
}
