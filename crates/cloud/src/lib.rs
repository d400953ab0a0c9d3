//! logwire 클라우드 리소스 프로비저닝 및 파이프라인 관측
//!
//! 에뮬레이터 엔드포인트를 대상으로 함수, 로그 라우팅, 스트림을 만들고
//! 이벤트를 주입한 뒤 로그와 스트림 레코드를 읽어 출력합니다.
//!
//! # Module Structure
//!
//! - [`api`]: Cloud API seams (`FunctionApi`, `LogsApi`, `StreamApi`)
//! - [`aws`]: AWS SDK client bound to the emulator endpoint (`AwsCloud`)
//! - [`error`]: Domain error types (`CloudError`)
//! - [`function`]: Function + log destination provisioning (`FunctionProvisioner`)
//! - [`readiness`]: Function readiness state machine (`ReadinessWaiter`)
//! - [`routing`]: Log destinations, streams, subscriptions (`LogRouter`)
//! - [`injector`]: Payload injection (`PayloadInjector`)
//! - [`observer`]: Log tail and stream reader (`LogTail`, `StreamReader`, `Renderer`)

pub mod api;
pub mod aws;
pub mod error;
#[cfg(any(test, feature = "testing"))]
pub mod fake;
pub mod function;
pub mod injector;
pub mod observer;
pub mod readiness;
pub mod routing;

pub use api::{CloudApi, FunctionApi, LogsApi, StreamApi};
pub use aws::AwsCloud;
pub use error::CloudError;
pub use function::{FunctionProvisioner, ProvisionedFunction, descriptor, load_artifact};
pub use injector::{InjectionSummary, PayloadInjector};
pub use observer::{
    DecodeFailure, DecodedRecord, LogTail, Renderer, StreamReader, StreamSummary,
    SubscriptionEnvelope, decode_envelope,
};
pub use readiness::ReadinessWaiter;
pub use routing::LogRouter;

#[cfg(any(test, feature = "testing"))]
pub use fake::FakeCloud;
#[cfg(any(test, feature = "testing"))]
pub use observer::SharedBuffer;
