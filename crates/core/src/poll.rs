//! 유한 폴링 — 최대 시도 횟수가 있는 상태 확인 루프
//!
//! 모든 대기 루프(함수 활성화, 스트림 활성화, 준비 프로브)는 [`poll_until`]을 통해
//! 고정 간격으로 재시도하며, 시도 횟수가 소진되면 [`PollError::Exhausted`]를 반환합니다.
//!
//! 시간은 `tokio::time`을 사용하므로 테스트에서는 `start_paused = true`로
//! 간격을 즉시 진행시킬 수 있습니다.

use std::future::Future;
use std::time::Duration;

/// 폴링 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// 시도 사이 대기 간격
    pub interval: Duration,
    /// 최대 시도 횟수
    pub max_attempts: u32,
}

impl PollPolicy {
    /// 새 정책을 생성합니다.
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// 모든 시도를 소진할 때까지 대기하는 총 시간
    pub fn budget(&self) -> Duration {
        self.interval
            .saturating_mul(self.max_attempts.saturating_sub(1))
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), 60)
    }
}

/// 한 번의 시도 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// 조건 충족
    Ready(T),
    /// 아직 충족되지 않음, 재시도
    Pending,
}

/// 폴링 실패
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollError<E> {
    /// 최대 시도 횟수 소진
    Exhausted { attempts: u32 },
    /// 시도 자체가 실패 (재시도하지 않음)
    Failed(E),
}

/// 조건이 충족될 때까지 `probe`를 반복 호출합니다.
///
/// `probe`는 1부터 시작하는 시도 번호를 받습니다.
/// `Err`를 반환하면 즉시 중단하며, `Pending`이면 `interval`만큼 대기 후 재시도합니다.
/// 마지막 시도 뒤에는 대기하지 않습니다.
pub async fn poll_until<T, E, F, Fut>(policy: &PollPolicy, mut probe: F) -> Result<T, PollError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<PollOutcome<T>, E>>,
{
    for attempt in 1..=policy.max_attempts {
        match probe(attempt).await.map_err(PollError::Failed)? {
            PollOutcome::Ready(value) => return Ok(value),
            PollOutcome::Pending => {}
        }
        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }
    Err(PollError::Exhausted {
        attempts: policy.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn returns_ready_on_first_success() {
        let policy = PollPolicy::new(Duration::from_secs(5), 3);
        let result: Result<u32, PollError<()>> =
            poll_until(&policy, |attempt| async move { Ok(PollOutcome::Ready(attempt)) }).await;
        assert_eq!(result, Ok(1));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_ready() {
        let policy = PollPolicy::new(Duration::from_secs(5), 10);
        let start = tokio::time::Instant::now();
        let result: Result<u32, PollError<()>> = poll_until(&policy, |attempt| async move {
            if attempt < 4 {
                Ok(PollOutcome::Pending)
            } else {
                Ok(PollOutcome::Ready(attempt))
            }
        })
        .await;
        assert_eq!(result, Ok(4));
        // three sleeps of 5s each
        assert_eq!(start.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_max_attempts() {
        let policy = PollPolicy::new(Duration::from_secs(1), 3);
        let mut calls = 0;
        let result: Result<(), PollError<()>> = poll_until(&policy, |_| {
            calls += 1;
            async { Ok(PollOutcome::Pending) }
        })
        .await;
        assert_eq!(result, Err(PollError::Exhausted { attempts: 3 }));
        assert_eq!(calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_stops_immediately() {
        let policy = PollPolicy::new(Duration::from_secs(1), 5);
        let mut calls = 0;
        let result: Result<(), PollError<&str>> = poll_until(&policy, |_| {
            calls += 1;
            async { Err("backend rejected") }
        })
        .await;
        assert_eq!(result, Err(PollError::Failed("backend rejected")));
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_never_probes() {
        let policy = PollPolicy::new(Duration::from_secs(1), 0);
        let result: Result<(), PollError<()>> =
            poll_until(&policy, |_| async { Ok(PollOutcome::Ready(())) }).await;
        assert_eq!(result, Err(PollError::Exhausted { attempts: 0 }));
    }

    #[test]
    fn budget_excludes_trailing_sleep() {
        assert_eq!(
            PollPolicy::new(Duration::from_secs(5), 4).budget(),
            Duration::from_secs(15)
        );
        assert_eq!(
            PollPolicy::new(Duration::from_secs(5), 0).budget(),
            Duration::ZERO
        );
    }
}
