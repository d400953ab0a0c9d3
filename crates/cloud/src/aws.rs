//! AWS SDK 구현 — 에뮬레이터 엔드포인트를 향하는 함수/로그/스트림 클라이언트
//!
//! 자격 증명과 리전은 고정 더미 값이며, 모든 클라이언트가 같은 엔드포인트를 공유합니다.
//! SDK 에러는 `DisplayErrorContext`로 원인 체인 전체를 담아 [`CloudError`]로 변환됩니다.

use std::collections::HashMap;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_cloudwatchlogs::types::OrderBy;
use aws_sdk_kinesis::types::ShardIteratorType;
use aws_sdk_lambda::config::Credentials;
use aws_sdk_lambda::error::DisplayErrorContext;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::{Environment, FunctionCode, PackageType, Runtime, State};
use bytes::Bytes;
use tracing::debug;

use logwire_core::config::AwsConfig;
use logwire_core::types::{
    DurableStream, FunctionDescriptor, FunctionState, InvocationResult, LogEvent, LogPage,
    RecordBatch, StreamRecord, StreamStatus, Subscription,
};

use crate::api::{FunctionApi, LogsApi, StreamApi};
use crate::error::CloudError;

/// 자격 증명 제공자 이름
const PROVIDER_NAME: &str = "logwire";

/// 에뮬레이터에 연결된 AWS SDK 클라이언트 묶음
#[derive(Clone)]
pub struct AwsCloud {
    lambda: aws_sdk_lambda::Client,
    logs: aws_sdk_cloudwatchlogs::Client,
    kinesis: aws_sdk_kinesis::Client,
}

impl AwsCloud {
    /// `endpoint_url`의 에뮬레이터에 연결되는 클라이언트를 생성합니다.
    pub async fn connect(endpoint_url: &str, aws: &AwsConfig) -> Self {
        let credentials = Credentials::new(
            aws.access_key_id.clone(),
            aws.secret_access_key.clone(),
            None,
            None,
            PROVIDER_NAME,
        );
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(aws.region.clone()))
            .credentials_provider(credentials)
            .endpoint_url(endpoint_url)
            .load()
            .await;
        debug!(endpoint = endpoint_url, region = %aws.region, "aws clients configured");

        Self {
            lambda: aws_sdk_lambda::Client::new(&sdk_config),
            logs: aws_sdk_cloudwatchlogs::Client::new(&sdk_config),
            kinesis: aws_sdk_kinesis::Client::new(&sdk_config),
        }
    }
}

fn function_state(state: Option<&State>) -> FunctionState {
    match state {
        Some(State::Active) => FunctionState::Active,
        Some(State::Failed) => FunctionState::Failed,
        _ => FunctionState::Pending,
    }
}

fn stream_status(status: &aws_sdk_kinesis::types::StreamStatus) -> StreamStatus {
    use aws_sdk_kinesis::types::StreamStatus as Sdk;
    match status {
        Sdk::Active => StreamStatus::Active,
        Sdk::Creating => StreamStatus::Creating,
        _ => StreamStatus::Other,
    }
}

impl FunctionApi for AwsCloud {
    async fn create_function(
        &self,
        descriptor: &FunctionDescriptor,
    ) -> Result<FunctionState, CloudError> {
        let variables: HashMap<String, String> = descriptor
            .environment
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let output = self
            .lambda
            .create_function()
            .function_name(&descriptor.name)
            .runtime(Runtime::from(descriptor.runtime.as_str()))
            .role(&descriptor.role_arn)
            .handler(&descriptor.handler)
            .memory_size(descriptor.memory_mb)
            .package_type(PackageType::Zip)
            .code(
                FunctionCode::builder()
                    .zip_file(Blob::new(descriptor.artifact.to_vec()))
                    .build(),
            )
            .environment(Environment::builder().set_variables(Some(variables)).build())
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .is_some_and(|se| se.is_resource_conflict_exception())
                {
                    CloudError::Conflict(format!("function '{}' already exists", descriptor.name))
                } else {
                    CloudError::rejected("create_function", DisplayErrorContext(&e))
                }
            })?;

        Ok(function_state(output.state()))
    }

    async fn function_state(&self, name: &str) -> Result<FunctionState, CloudError> {
        let output = self
            .lambda
            .get_function()
            .function_name(name)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .is_some_and(|se| se.is_resource_not_found_exception())
                {
                    CloudError::NotFound(format!("function '{name}'"))
                } else {
                    CloudError::rejected("get_function", DisplayErrorContext(&e))
                }
            })?;

        Ok(function_state(
            output.configuration().and_then(|c| c.state()),
        ))
    }

    async fn invoke(&self, name: &str, payload: Bytes) -> Result<InvocationResult, CloudError> {
        let output = self
            .lambda
            .invoke()
            .function_name(name)
            .payload(Blob::new(payload.to_vec()))
            .send()
            .await
            .map_err(|e| CloudError::rejected("invoke", DisplayErrorContext(&e)))?;

        Ok(InvocationResult {
            status_code: output.status_code(),
            function_error: output.function_error().map(str::to_owned),
        })
    }

    async fn delete_function(&self, name: &str) -> Result<(), CloudError> {
        match self.lambda.delete_function().function_name(name).send().await {
            Ok(_) => Ok(()),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_resource_not_found_exception()) =>
            {
                Ok(())
            }
            Err(e) => Err(CloudError::rejected("delete_function", DisplayErrorContext(&e))),
        }
    }
}

impl LogsApi for AwsCloud {
    async fn create_log_group(&self, group: &str) -> Result<(), CloudError> {
        self.logs
            .create_log_group()
            .log_group_name(group)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .is_some_and(|se| se.is_resource_already_exists_exception())
                {
                    CloudError::Conflict(format!("log group '{group}' already exists"))
                } else {
                    CloudError::rejected("create_log_group", DisplayErrorContext(&e))
                }
            })?;
        Ok(())
    }

    async fn create_log_stream(&self, group: &str, stream: &str) -> Result<(), CloudError> {
        self.logs
            .create_log_stream()
            .log_group_name(group)
            .log_stream_name(stream)
            .send()
            .await
            .map_err(|e| CloudError::rejected("create_log_stream", DisplayErrorContext(&e)))?;
        Ok(())
    }

    async fn delete_log_group(&self, group: &str) -> Result<(), CloudError> {
        match self.logs.delete_log_group().log_group_name(group).send().await {
            Ok(_) => Ok(()),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_resource_not_found_exception()) =>
            {
                Ok(())
            }
            Err(e) => Err(CloudError::rejected("delete_log_group", DisplayErrorContext(&e))),
        }
    }

    async fn log_streams_by_recency(&self, group: &str) -> Result<Vec<String>, CloudError> {
        // newest first; the tail re-resolves the stream until it holds a cursor
        let output = self
            .logs
            .describe_log_streams()
            .log_group_name(group)
            .order_by(OrderBy::LastEventTime)
            .descending(true)
            .send()
            .await
            .map_err(|e| CloudError::rejected("describe_log_streams", DisplayErrorContext(&e)))?;

        Ok(output
            .log_streams()
            .iter()
            .filter_map(|s| s.log_stream_name().map(str::to_owned))
            .collect())
    }

    async fn get_log_events(
        &self,
        group: &str,
        stream: &str,
        next_token: Option<&str>,
    ) -> Result<LogPage, CloudError> {
        let output = self
            .logs
            .get_log_events()
            .log_group_name(group)
            .log_stream_name(stream)
            .start_from_head(true)
            .set_next_token(next_token.map(str::to_owned))
            .send()
            .await
            .map_err(|e| CloudError::rejected("get_log_events", DisplayErrorContext(&e)))?;

        let events = output
            .events()
            .iter()
            .map(|event| LogEvent {
                timestamp_ms: event.timestamp().unwrap_or_default(),
                message: event.message().unwrap_or_default().to_owned(),
            })
            .collect();

        Ok(LogPage {
            events,
            next_token: output.next_forward_token().map(str::to_owned),
        })
    }

    async fn subscription_filters(&self, group: &str) -> Result<Vec<Subscription>, CloudError> {
        let output = self
            .logs
            .describe_subscription_filters()
            .log_group_name(group)
            .send()
            .await
            .map_err(|e| {
                CloudError::rejected("describe_subscription_filters", DisplayErrorContext(&e))
            })?;

        Ok(output
            .subscription_filters()
            .iter()
            .map(|f| Subscription {
                filter_name: f.filter_name().unwrap_or_default().to_owned(),
                group_name: f.log_group_name().unwrap_or(group).to_owned(),
                destination_arn: f.destination_arn().unwrap_or_default().to_owned(),
                filter_pattern: f.filter_pattern().unwrap_or_default().to_owned(),
            })
            .collect())
    }

    async fn put_subscription_filter(
        &self,
        subscription: &Subscription,
        role_arn: &str,
    ) -> Result<(), CloudError> {
        self.logs
            .put_subscription_filter()
            .log_group_name(&subscription.group_name)
            .filter_name(&subscription.filter_name)
            .filter_pattern(&subscription.filter_pattern)
            .destination_arn(&subscription.destination_arn)
            .role_arn(role_arn)
            .send()
            .await
            .map_err(|e| {
                CloudError::rejected("put_subscription_filter", DisplayErrorContext(&e))
            })?;
        Ok(())
    }

    async fn delete_subscription_filter(
        &self,
        group: &str,
        filter_name: &str,
    ) -> Result<(), CloudError> {
        match self
            .logs
            .delete_subscription_filter()
            .log_group_name(group)
            .filter_name(filter_name)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_resource_not_found_exception()) =>
            {
                Ok(())
            }
            Err(e) => Err(CloudError::rejected(
                "delete_subscription_filter",
                DisplayErrorContext(&e),
            )),
        }
    }
}

impl StreamApi for AwsCloud {
    async fn create_stream(&self, name: &str, shard_count: i32) -> Result<(), CloudError> {
        self.kinesis
            .create_stream()
            .stream_name(name)
            .shard_count(shard_count)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .is_some_and(|se| se.is_resource_in_use_exception())
                {
                    CloudError::Conflict(format!("stream '{name}' already exists"))
                } else {
                    CloudError::rejected("create_stream", DisplayErrorContext(&e))
                }
            })?;
        Ok(())
    }

    async fn describe_stream(&self, name: &str) -> Result<DurableStream, CloudError> {
        let output = self
            .kinesis
            .describe_stream()
            .stream_name(name)
            .send()
            .await
            .map_err(|e| CloudError::rejected("describe_stream", DisplayErrorContext(&e)))?;

        let description = output
            .stream_description()
            .ok_or_else(|| CloudError::InvalidResponse("describe_stream".to_owned()))?;

        Ok(DurableStream {
            name: description.stream_name().to_owned(),
            arn: description.stream_arn().to_owned(),
            shard_count: i32::try_from(description.shards().len()).unwrap_or(i32::MAX),
            status: stream_status(description.stream_status()),
        })
    }

    async fn delete_stream(&self, name: &str) -> Result<(), CloudError> {
        match self
            .kinesis
            .delete_stream()
            .stream_name(name)
            .enforce_consumer_deletion(true)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_resource_not_found_exception()) =>
            {
                Ok(())
            }
            Err(e) => Err(CloudError::rejected("delete_stream", DisplayErrorContext(&e))),
        }
    }

    async fn list_shards(&self, name: &str) -> Result<Vec<String>, CloudError> {
        let output = self
            .kinesis
            .list_shards()
            .stream_name(name)
            .send()
            .await
            .map_err(|e| CloudError::rejected("list_shards", DisplayErrorContext(&e)))?;

        Ok(output
            .shards()
            .iter()
            .map(|s| s.shard_id().to_owned())
            .collect())
    }

    async fn trim_horizon_iterator(
        &self,
        stream: &str,
        shard_id: &str,
    ) -> Result<Option<String>, CloudError> {
        let output = self
            .kinesis
            .get_shard_iterator()
            .stream_name(stream)
            .shard_id(shard_id)
            .shard_iterator_type(ShardIteratorType::TrimHorizon)
            .send()
            .await
            .map_err(|e| CloudError::rejected("get_shard_iterator", DisplayErrorContext(&e)))?;

        Ok(output.shard_iterator().map(str::to_owned))
    }

    async fn get_records(&self, iterator: &str) -> Result<RecordBatch, CloudError> {
        let output = self
            .kinesis
            .get_records()
            .shard_iterator(iterator)
            .send()
            .await
            .map_err(|e| CloudError::rejected("get_records", DisplayErrorContext(&e)))?;

        let records = output
            .records()
            .iter()
            .map(stream_record)
            .collect();

        Ok(RecordBatch {
            records,
            next_iterator: output.next_shard_iterator().map(str::to_owned),
        })
    }
}

/// 파티션 키가 없는 레코드는 빈 키로 변환합니다.
fn stream_record(record: &aws_sdk_kinesis::types::Record) -> StreamRecord {
    StreamRecord {
        sequence_number: record.sequence_number().to_owned(),
        partition_key: record.partition_key().unwrap_or_default().to_owned(),
        data: Bytes::copy_from_slice(record.data().as_ref()),
    }
}
