//! 페이로드 주입
//!
//! 이벤트마다 함수를 한 번씩 호출합니다. 호출 실패는 기록만 하고 다음 이벤트로 넘어가며,
//! 재시도하지 않습니다.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, warn};

use logwire_core::metrics as m;

use crate::api::FunctionApi;

/// 주입 결과 요약
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InjectionSummary {
    /// 호출을 시도한 이벤트 수
    pub attempted: usize,
    /// 성공한 호출 수
    pub succeeded: usize,
    /// 실패한 호출 수 (전송 실패 또는 함수 에러)
    pub failed: usize,
}

/// 페이로드 주입기
pub struct PayloadInjector<F> {
    api: Arc<F>,
}

impl<F: FunctionApi> PayloadInjector<F> {
    /// 새 주입기를 생성합니다.
    pub fn new(api: Arc<F>) -> Self {
        Self { api }
    }

    /// 모든 페이로드로 함수를 한 번씩 호출합니다.
    pub async fn inject(&self, function: &str, payloads: &[Bytes]) -> InjectionSummary {
        let mut summary = InjectionSummary::default();
        for (index, payload) in payloads.iter().enumerate() {
            summary.attempted += 1;
            let ok = match self.api.invoke(function, payload.clone()).await {
                Ok(result) if result.is_success() => {
                    info!(function, index, status = result.status_code, "invocation succeeded");
                    true
                }
                Ok(result) => {
                    warn!(
                        function,
                        index,
                        status = result.status_code,
                        function_error = result.function_error.as_deref().unwrap_or(""),
                        "invocation returned an error"
                    );
                    false
                }
                Err(e) => {
                    warn!(function, index, error = %e, "invocation failed");
                    false
                }
            };
            let label = if ok {
                summary.succeeded += 1;
                "success"
            } else {
                summary.failed += 1;
                "failure"
            };
            metrics::counter!(m::INVOCATIONS_TOTAL, m::LABEL_RESULT => label).increment(1);
        }
        info!(
            function,
            attempted = summary.attempted,
            failed = summary.failed,
            "injection complete"
        );
        summary
    }
}
