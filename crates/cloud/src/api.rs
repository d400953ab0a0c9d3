//! Cloud API abstraction for testability.
//!
//! Three seams cover the managed services the harness drives:
//!
//! - [`FunctionApi`]: create, describe, invoke and delete a compute function
//! - [`LogsApi`]: log groups, log streams, subscription filters, log events
//! - [`StreamApi`]: durable streams, shards, iterators, records
//!
//! [`CloudApi`] bundles all three. Production code uses
//! [`AwsCloud`](crate::aws::AwsCloud); tests use `FakeCloud` (enabled by the
//! `testing` feature).
//!
//! Empty results are never errors: an empty log page or record batch is
//! returned as an empty `Vec`.

use std::future::Future;

use bytes::Bytes;

use logwire_core::types::{
    DurableStream, FunctionDescriptor, FunctionState, InvocationResult, LogPage, RecordBatch,
    Subscription,
};

use crate::error::CloudError;

/// Compute function operations.
pub trait FunctionApi: Send + Sync + 'static {
    /// Creates a function and returns the state reported by the backend.
    ///
    /// # Errors
    ///
    /// - `CloudError::Rejected`: the backend refused the artifact or role
    /// - `CloudError::Conflict`: a function with this name already exists
    fn create_function(
        &self,
        descriptor: &FunctionDescriptor,
    ) -> impl Future<Output = Result<FunctionState, CloudError>> + Send;

    /// Reads the current function state.
    fn function_state(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<FunctionState, CloudError>> + Send;

    /// Invokes the function synchronously with `payload`.
    fn invoke(
        &self,
        name: &str,
        payload: Bytes,
    ) -> impl Future<Output = Result<InvocationResult, CloudError>> + Send;

    /// Deletes the function.
    fn delete_function(&self, name: &str)
    -> impl Future<Output = Result<(), CloudError>> + Send;
}

/// Log group, log stream and subscription filter operations.
pub trait LogsApi: Send + Sync + 'static {
    /// Creates a log group.
    fn create_log_group(&self, group: &str)
    -> impl Future<Output = Result<(), CloudError>> + Send;

    /// Creates a log stream inside `group`.
    fn create_log_stream(
        &self,
        group: &str,
        stream: &str,
    ) -> impl Future<Output = Result<(), CloudError>> + Send;

    /// Deletes a log group with all of its streams.
    fn delete_log_group(&self, group: &str)
    -> impl Future<Output = Result<(), CloudError>> + Send;

    /// Lists the stream names of `group`, most recent last event first.
    fn log_streams_by_recency(
        &self,
        group: &str,
    ) -> impl Future<Output = Result<Vec<String>, CloudError>> + Send;

    /// Reads log events starting from the head, or after `next_token` if given.
    fn get_log_events(
        &self,
        group: &str,
        stream: &str,
        next_token: Option<&str>,
    ) -> impl Future<Output = Result<LogPage, CloudError>> + Send;

    /// Lists the subscription filters installed on `group`.
    fn subscription_filters(
        &self,
        group: &str,
    ) -> impl Future<Output = Result<Vec<Subscription>, CloudError>> + Send;

    /// Installs a subscription filter.
    fn put_subscription_filter(
        &self,
        subscription: &Subscription,
        role_arn: &str,
    ) -> impl Future<Output = Result<(), CloudError>> + Send;

    /// Removes a subscription filter.
    fn delete_subscription_filter(
        &self,
        group: &str,
        filter_name: &str,
    ) -> impl Future<Output = Result<(), CloudError>> + Send;
}

/// Durable stream operations.
pub trait StreamApi: Send + Sync + 'static {
    /// Creates a stream with a fixed shard count.
    fn create_stream(
        &self,
        name: &str,
        shard_count: i32,
    ) -> impl Future<Output = Result<(), CloudError>> + Send;

    /// Describes a stream (status, ARN).
    fn describe_stream(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<DurableStream, CloudError>> + Send;

    /// Deletes a stream.
    fn delete_stream(&self, name: &str) -> impl Future<Output = Result<(), CloudError>> + Send;

    /// Lists shard IDs of a stream.
    fn list_shards(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Vec<String>, CloudError>> + Send;

    /// Obtains an iterator positioned at the oldest record of a shard.
    ///
    /// `None` means the shard is closed.
    fn trim_horizon_iterator(
        &self,
        stream: &str,
        shard_id: &str,
    ) -> impl Future<Output = Result<Option<String>, CloudError>> + Send;

    /// Reads records at `iterator`.
    fn get_records(
        &self,
        iterator: &str,
    ) -> impl Future<Output = Result<RecordBatch, CloudError>> + Send;
}

/// All cloud seams together.
pub trait CloudApi: FunctionApi + LogsApi + StreamApi {}

impl<T: FunctionApi + LogsApi + StreamApi> CloudApi for T {}
