//! logwire 공통 크레이트
//!
//! 하네스의 모든 크레이트가 공유하는 에러 분류, 설정, 도메인 타입,
//! 합성 이벤트, 유한 폴링 정책을 제공합니다.

pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod poll;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, HarnessError};

// 설정
pub use config::HarnessConfig;

// 이벤트
pub use event::{MockScenario, SyntheticEvent};

// 폴링
pub use poll::{PollError, PollOutcome, PollPolicy, poll_until};

// 도메인 타입
pub use types::{
    BackendKind, DurableStream, EnvironmentHandle, FunctionDescriptor, FunctionState,
    InvocationResult, LifecycleState, LogDestination, LogEvent, LogPage, RecordBatch,
    StreamRecord, StreamStatus, Subscription,
};
