//! 로그 라우팅 구성 — 로그 목적지, 스트림, 구독
//!
//! # 생성 순서와 보상
//! 각 생성 작업은 도중에 실패하면 자신이 만든 부분을 되돌린 뒤 에러를 반환합니다.
//! 호출자는 성공적으로 반환된 리소스만 해제 대상으로 등록하면 됩니다.
//! 스트림은 예외로, 활성화 대기 중 취소될 수 있는 호출자를 위해
//! [`LogRouter::request_stream`]과 [`LogRouter::wait_stream_active`]로 나뉘어 있습니다.
//!
//! # 중복 구독
//! 같은 로그 그룹에 같은 목적지(또는 같은 필터 이름)를 향하는 구독이 이미 있으면
//! `CloudError::Conflict`로 실패합니다.

use std::sync::Arc;

use tracing::{info, warn};

use logwire_core::poll::{PollError, PollOutcome, PollPolicy, poll_until};
use logwire_core::types::{DurableStream, LogDestination, StreamStatus, Subscription, log_group_name};

use crate::api::{LogsApi, StreamApi};
use crate::error::CloudError;

/// 로그 라우팅 구성기
pub struct LogRouter<C> {
    api: Arc<C>,
    policy: PollPolicy,
}

impl<C> Clone for LogRouter<C> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            policy: self.policy,
        }
    }
}

impl<C> LogRouter<C> {
    /// 스트림 활성화 대기에 `policy`를 사용하는 구성기를 생성합니다.
    pub fn new(api: Arc<C>, policy: PollPolicy) -> Self {
        Self { api, policy }
    }
}

impl<C: LogsApi> LogRouter<C> {
    /// 함수 전용 로그 그룹과 그 안의 스트림 하나를 만듭니다.
    ///
    /// 그룹 이름은 함수 이름에서 결정적으로 유도됩니다.
    pub async fn create_log_destination(
        &self,
        function_name: &str,
        stream_name: &str,
    ) -> Result<LogDestination, CloudError> {
        let group_name = log_group_name(function_name);
        self.api.create_log_group(&group_name).await?;

        if let Err(e) = self.api.create_log_stream(&group_name, stream_name).await {
            warn!(group = %group_name, error = %e, "log stream creation failed, removing group");
            if let Err(cleanup) = self.api.delete_log_group(&group_name).await {
                warn!(group = %group_name, error = %cleanup, "failed to remove log group");
            }
            return Err(e);
        }

        info!(group = %group_name, stream = stream_name, "log destination created");
        Ok(LogDestination {
            function_name: function_name.to_owned(),
            group_name,
            stream_name: stream_name.to_owned(),
        })
    }

    /// 로그 목적지를 삭제합니다.
    pub async fn delete_log_destination(
        &self,
        destination: &LogDestination,
    ) -> Result<(), CloudError> {
        self.api.delete_log_group(&destination.group_name).await
    }

    /// 구독 필터를 설치합니다.
    ///
    /// # Errors
    ///
    /// - `CloudError::Rejected`: 목적지 ARN 형식이 잘못됨
    /// - `CloudError::Conflict`: 같은 그룹에 충돌하는 구독이 이미 있음
    pub async fn create_subscription(
        &self,
        subscription: Subscription,
        role_arn: &str,
    ) -> Result<Subscription, CloudError> {
        if !is_valid_arn(&subscription.destination_arn) {
            return Err(CloudError::rejected(
                "put_subscription_filter",
                format!("invalid destination arn '{}'", subscription.destination_arn),
            ));
        }

        let existing = self.api.subscription_filters(&subscription.group_name).await?;
        if let Some(conflict) = existing.iter().find(|f| {
            f.destination_arn == subscription.destination_arn
                || f.filter_name == subscription.filter_name
        }) {
            return Err(CloudError::Conflict(format!(
                "group '{}' already has subscription '{}' to {}",
                subscription.group_name, conflict.filter_name, conflict.destination_arn
            )));
        }

        self.api
            .put_subscription_filter(&subscription, role_arn)
            .await?;
        info!(
            filter = %subscription.filter_name,
            group = %subscription.group_name,
            destination = %subscription.destination_arn,
            match_all = subscription.matches_all(),
            "subscription installed"
        );
        Ok(subscription)
    }

    /// 구독 필터를 삭제합니다.
    pub async fn delete_subscription(&self, subscription: &Subscription) -> Result<(), CloudError> {
        self.api
            .delete_subscription_filter(&subscription.group_name, &subscription.filter_name)
            .await
    }
}

impl<C: StreamApi> LogRouter<C> {
    /// 스트림을 만들고 활성화될 때까지 기다립니다.
    ///
    /// 대기가 실패하면 스트림을 삭제한 뒤 에러를 반환합니다.
    pub async fn create_stream(
        &self,
        name: &str,
        shard_count: i32,
    ) -> Result<DurableStream, CloudError> {
        self.request_stream(name, shard_count).await?;

        match self.wait_stream_active(name).await {
            Ok(stream) => Ok(stream),
            Err(e) => {
                warn!(stream = name, error = %e, "stream never became active, deleting");
                if let Err(cleanup) = self.api.delete_stream(name).await {
                    warn!(stream = name, error = %cleanup, "failed to delete stream");
                }
                Err(e)
            }
        }
    }

    /// 스트림 생성만 요청합니다.
    ///
    /// 반환 시점에 스트림이 존재하므로 호출자는 활성화를 기다리기 전에
    /// 해제 대상으로 등록해야 합니다.
    pub async fn request_stream(&self, name: &str, shard_count: i32) -> Result<(), CloudError> {
        self.api.create_stream(name, shard_count).await?;
        info!(stream = name, shard_count, "stream created, waiting for active");
        Ok(())
    }

    /// 스트림이 활성화될 때까지 기다린 뒤 설명(ARN 포함)을 반환합니다.
    ///
    /// 실패해도 스트림을 삭제하지 않습니다.
    pub async fn wait_stream_active(&self, name: &str) -> Result<DurableStream, CloudError> {
        let api = &self.api;
        let result = poll_until(&self.policy, |_| async move {
            let stream = api.describe_stream(name).await?;
            Ok::<_, CloudError>(match stream.status {
                StreamStatus::Active => PollOutcome::Ready(stream),
                StreamStatus::Creating | StreamStatus::Other => PollOutcome::Pending,
            })
        })
        .await;

        match result {
            Ok(stream) => {
                info!(stream = name, arn = %stream.arn, "stream active");
                Ok(stream)
            }
            Err(PollError::Failed(e)) => Err(e),
            Err(PollError::Exhausted { .. }) => Err(CloudError::Timeout {
                resource: format!("stream {name}"),
                waited_secs: self.policy.budget().as_secs(),
            }),
        }
    }

    /// 스트림을 삭제합니다.
    pub async fn delete_stream(&self, name: &str) -> Result<(), CloudError> {
        self.api.delete_stream(name).await
    }
}

/// `arn:partition:service:region:account:resource` 형식인지 확인합니다.
fn is_valid_arn(arn: &str) -> bool {
    let parts: Vec<&str> = arn.splitn(6, ':').collect();
    parts.len() == 6 && parts[0] == "arn" && !parts[2].is_empty() && !parts[5].is_empty()
}
