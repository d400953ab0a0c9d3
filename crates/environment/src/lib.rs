//! logwire 환경 프로비저닝
//!
//! 에뮬레이션 백엔드(클라우드 에뮬레이터, mock HTTP 서버)를 컨테이너로 시작하고,
//! mock HTTP 서버에 스텁 정의를 등록합니다.
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`EnvironmentError`)
//! - [`spec`]: Backend specification (`BackendSpec`, builder)
//! - [`docker`]: Container runtime abstraction (`ContainerRuntime`, `BollardRuntime`)
//! - [`probe`]: Readiness probes (log line, port liveness)
//! - [`provisioner`]: Start/terminate lifecycle (`EnvironmentProvisioner`)
//! - [`mock_api`]: Stub registration (`StubSet`, `MockApiConfigurator`)

pub mod docker;
pub mod error;
pub mod mock_api;
pub mod probe;
pub mod provisioner;
pub mod spec;

// --- Public API Re-exports ---

pub use docker::{BollardRuntime, ContainerRuntime};
pub use error::EnvironmentError;
pub use mock_api::{HttpStubRegistry, MockApiConfigurator, StubAck, StubRegistry, StubSet};
pub use provisioner::EnvironmentProvisioner;
pub use spec::{BackendSpec, BackendSpecBuilder, ReadinessProbe};

#[cfg(any(test, feature = "testing"))]
pub use docker::FakeRuntime;
#[cfg(any(test, feature = "testing"))]
pub use mock_api::FakeStubRegistry;
