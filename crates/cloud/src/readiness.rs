//! 함수 준비 대기
//!
//! 상태 머신: `Pending`이면 간격만큼 쉬고 재시도, `Active`면 성공, `Failed`면 즉시 중단.
//! 최대 시도 횟수를 넘기면 `CloudError::Timeout`을 반환합니다.

use std::sync::Arc;

use tracing::{debug, info};

use logwire_core::poll::{PollError, PollOutcome, PollPolicy, poll_until};
use logwire_core::types::FunctionState;

use crate::api::FunctionApi;
use crate::error::CloudError;

/// 관측한 상태에서 다음 단계를 결정합니다.
pub fn next_step(name: &str, state: FunctionState) -> Result<PollOutcome<()>, CloudError> {
    match state {
        FunctionState::Active => Ok(PollOutcome::Ready(())),
        FunctionState::Pending => Ok(PollOutcome::Pending),
        FunctionState::Failed => Err(CloudError::FunctionFailed(name.to_owned())),
    }
}

/// 함수 준비 대기기
pub struct ReadinessWaiter<F> {
    api: Arc<F>,
    policy: PollPolicy,
}

impl<F: FunctionApi> ReadinessWaiter<F> {
    /// 새 대기기를 생성합니다.
    pub fn new(api: Arc<F>, policy: PollPolicy) -> Self {
        Self { api, policy }
    }

    /// 함수가 활성화될 때까지 대기합니다.
    pub async fn wait_active(&self, name: &str) -> Result<(), CloudError> {
        let api = &self.api;
        let result = poll_until(&self.policy, |attempt| async move {
            let state = api.function_state(name).await?;
            debug!(function = name, attempt, state = %state, "function state");
            next_step(name, state)
        })
        .await;

        match result {
            Ok(()) => {
                info!(function = name, "function active");
                Ok(())
            }
            Err(PollError::Failed(e)) => Err(e),
            Err(PollError::Exhausted { attempts }) => {
                debug!(function = name, attempts, "function never became active");
                Err(CloudError::Timeout {
                    resource: format!("function {name}"),
                    waited_secs: self.policy.budget().as_secs(),
                })
            }
        }
    }
}
