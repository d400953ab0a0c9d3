//! Harness controller -- provisioning sequence, injection, observation and teardown.
//!
//! The [`HarnessController`] drives every stage in dependency order:
//!
//! 1. Load inputs (function artifact, mock API stubs)
//! 2. Start the cloud emulator container
//! 3. Start the mock API container and register stubs
//! 4. Create the function and its log destination
//! 5. Wait for the function to become active
//! 6. Create the stream and wait for it to become active
//! 7. Subscribe the function's log group to the stream
//! 8. Inject the synthetic event battery
//! 9. Observe function logs and stream records concurrently
//!
//! Each created resource pushes a release obligation onto a [`ReleaseStack`]
//! immediately. Containers and the stream are registered as soon as they
//! exist, before their readiness waits, so an interrupt during a wait still
//! releases them. When a stage fails, or the cancellation token fires, the
//! stack unwinds in reverse creation order before the error is returned.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use logwire_cloud::api::FunctionApi;
use logwire_cloud::{
    AwsCloud, CloudApi, FunctionProvisioner, LogRouter, LogTail, PayloadInjector,
    ReadinessWaiter, Renderer, StreamReader, descriptor, load_artifact,
};
use logwire_core::config::{AwsConfig, BackendConfig, HarnessConfig};
use logwire_core::error::HarnessError;
use logwire_core::event::{battery, build_payloads};
use logwire_core::types::{BackendKind, EnvironmentHandle, Subscription};
use logwire_environment::{
    BackendSpec, ContainerRuntime, EnvironmentProvisioner, MockApiConfigurator, StubRegistry,
    StubSet,
};

use crate::teardown::ReleaseStack;

/// Builds the cloud client once the emulator endpoint is known.
pub trait CloudConnector: Send + Sync + 'static {
    /// Client type implementing the function, logs and stream APIs.
    type Cloud: CloudApi;

    /// Connect to the emulator at `endpoint_url`.
    fn connect(
        &self,
        endpoint_url: &str,
        aws: &AwsConfig,
    ) -> impl Future<Output = Result<Arc<Self::Cloud>, HarnessError>> + Send;
}

/// Connector producing AWS SDK clients pointed at the emulator.
#[derive(Debug, Clone, Copy, Default)]
pub struct AwsConnector;

impl CloudConnector for AwsConnector {
    type Cloud = AwsCloud;

    async fn connect(
        &self,
        endpoint_url: &str,
        aws: &AwsConfig,
    ) -> Result<Arc<AwsCloud>, HarnessError> {
        Ok(Arc::new(AwsCloud::connect(endpoint_url, aws).await))
    }
}

/// Summary of one harness run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Invocations attempted.
    pub events_injected: usize,
    /// Invocations that failed or returned a function error.
    pub invoke_failures: usize,
    /// Function log lines observed.
    pub log_lines: usize,
    /// Stream records decoded.
    pub records_decoded: usize,
    /// Stream records skipped because they failed to decode.
    pub decode_failures: usize,
    /// Release obligations that failed during teardown.
    pub teardown_failures: usize,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "logwire run report")?;
        writeln!(f, "  events injected:   {}", self.events_injected)?;
        writeln!(f, "  invoke failures:   {}", self.invoke_failures)?;
        writeln!(f, "  log lines:         {}", self.log_lines)?;
        writeln!(f, "  records decoded:   {}", self.records_decoded)?;
        writeln!(f, "  decode failures:   {}", self.decode_failures)?;
        write!(f, "  teardown failures: {}", self.teardown_failures)
    }
}

/// The harness controller.
///
/// Owns the configuration and the client seams for containers, stub
/// registration and the cloud APIs.
pub struct HarnessController<R: ContainerRuntime, S: StubRegistry, K: CloudConnector> {
    config: HarnessConfig,
    environment: EnvironmentProvisioner<R>,
    mock_api: MockApiConfigurator<S>,
    connector: K,
    renderer: Renderer,
}

impl<R, S, K> HarnessController<R, S, K>
where
    R: ContainerRuntime,
    S: StubRegistry,
    K: CloudConnector,
{
    /// Build a controller. Observation output goes to stdout.
    pub fn new(config: HarnessConfig, runtime: Arc<R>, registry: Arc<S>, connector: K) -> Self {
        let renderer = Renderer::stdout(config.observer.color);
        Self {
            config,
            environment: EnvironmentProvisioner::new(runtime),
            mock_api: MockApiConfigurator::new(registry),
            connector,
            renderer,
        }
    }

    /// Replace the observation output renderer.
    pub fn with_renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// The loaded configuration.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run every stage, then release everything that was created.
    ///
    /// In follow mode the function log tail keeps running after observation
    /// until `cancel` fires; that interruption ends the run successfully.
    ///
    /// # Errors
    ///
    /// - `HarnessError::Cancelled`: `cancel` fired before observation finished
    /// - Any fatal stage error (`ProvisionTimeout`, `ResourceConflict`, `FatalProvision`, ...)
    ///
    /// Resources are released before either is returned.
    pub async fn run(&self, cancel: CancellationToken) -> Result<RunReport, HarnessError> {
        let mut releases = ReleaseStack::new();
        let mut report = RunReport::default();

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(HarnessError::Cancelled),
            result = self.execute(&mut releases, &mut report, &cancel) => result,
        };

        let outcome = match outcome {
            Ok(tail) if self.config.observer.follow => {
                info!("following function logs until interrupted");
                report.log_lines += tail
                    .follow(
                        self.config.observer.policy().interval,
                        cancel.clone(),
                        self.renderer.clone(),
                    )
                    .await;
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(e) => Err(e),
        };

        match &outcome {
            Ok(()) => info!(pending = releases.len(), "run complete, releasing resources"),
            Err(HarnessError::Cancelled) => {
                warn!(pending = releases.len(), "run interrupted, releasing resources");
            }
            Err(e) => error!(error = %e, pending = releases.len(), "run aborted, releasing resources"),
        }
        report.teardown_failures = releases.unwind().await;
        if report.teardown_failures > 0 {
            warn!(failures = report.teardown_failures, "teardown finished with failures");
        }

        outcome.map(|()| report)
    }

    async fn execute(
        &self,
        releases: &mut ReleaseStack,
        report: &mut RunReport,
        cancel: &CancellationToken,
    ) -> Result<LogTail<K::Cloud>, HarnessError> {
        let config = &self.config;

        let artifact = load_artifact(&config.function.artifact_path).await?;
        let stubs = StubSet::load(&config.payloads.stubs_path).await?;
        let payloads = build_payloads(&battery(config.payloads.count))?;

        let emulator = self
            .start_backend(BackendKind::CloudEmulator, &config.emulator, releases)
            .await?;
        let mock_api = self
            .start_backend(BackendKind::MockHttp, &config.mock_api, releases)
            .await?;
        self.mock_api
            .register_stubs(&mock_api.endpoint, &stubs)
            .await?;

        let cloud = self
            .connector
            .connect(&emulator.http_url(), &config.aws)
            .await?;
        let router = LogRouter::new(Arc::clone(&cloud), config.readiness.policy());

        let mock_port = mock_api.port().ok_or_else(|| HarnessError::FatalProvision {
            resource: "mock api endpoint".to_owned(),
            reason: format!("no port in '{}'", mock_api.endpoint),
        })?;
        let upstream = format!("http://{}:{mock_port}", config.function.upstream_host);
        let provisioned = FunctionProvisioner::new(Arc::clone(&cloud), router.clone())
            .create_function(
                descriptor(&config.function, artifact, &upstream),
                &config.routing.log_stream_name,
            )
            .await?;
        let function_name = provisioned.descriptor.name.clone();
        {
            let api = Arc::clone(&cloud);
            let name = function_name.clone();
            releases.push(format!("function {name}"), move || async move {
                api.delete_function(&name).await.map_err(HarnessError::from)
            });
        }
        {
            let router = router.clone();
            let destination = provisioned.destination.clone();
            releases.push(
                format!("log group {}", destination.group_name),
                move || async move {
                    router
                        .delete_log_destination(&destination)
                        .await
                        .map_err(HarnessError::from)
                },
            );
        }

        ReadinessWaiter::new(Arc::clone(&cloud), config.readiness.policy())
            .wait_active(&function_name)
            .await?;

        let stream_name = config.routing.stream_name.clone();
        router
            .request_stream(&stream_name, config.routing.shard_count)
            .await?;
        {
            let router = router.clone();
            let name = stream_name.clone();
            releases.push(format!("stream {name}"), move || async move {
                router.delete_stream(&name).await.map_err(HarnessError::from)
            });
        }
        let stream = router.wait_stream_active(&stream_name).await?;

        let subscription = router
            .create_subscription(
                Subscription {
                    filter_name: config.routing.filter_name.clone(),
                    group_name: provisioned.destination.group_name.clone(),
                    destination_arn: stream.arn.clone(),
                    filter_pattern: config.routing.filter_pattern.clone(),
                },
                &config.routing.role_arn,
            )
            .await?;
        {
            let router = router.clone();
            releases.push(
                format!("subscription {}", subscription.filter_name),
                move || async move {
                    router
                        .delete_subscription(&subscription)
                        .await
                        .map_err(HarnessError::from)
                },
            );
        }

        info!(function = %function_name, events = payloads.len(), "injecting events");
        let injected = PayloadInjector::new(Arc::clone(&cloud))
            .inject(&function_name, &payloads)
            .await;
        report.events_injected = injected.attempted;
        report.invoke_failures = injected.failed;

        let policy = config.observer.policy();
        let target = Some(payloads.len());
        let mut tail = LogTail::new(Arc::clone(&cloud), &provisioned.destination);
        let mut reader = StreamReader::new(Arc::clone(&cloud), stream.name.clone());
        let (log_lines, records) = tokio::join!(
            tail.run(&policy, target, cancel, &self.renderer),
            reader.run(&policy, target, cancel, &self.renderer),
        );
        report.log_lines = log_lines;
        report.records_decoded = records.decoded;
        report.decode_failures = records.failures;
        info!(
            log_lines,
            records_decoded = records.decoded,
            decode_failures = records.failures,
            "observation finished"
        );

        Ok(tail)
    }

    async fn start_backend(
        &self,
        kind: BackendKind,
        backend: &BackendConfig,
        releases: &mut ReleaseStack,
    ) -> Result<EnvironmentHandle, HarnessError> {
        let spec = BackendSpec::from_config(kind, backend);
        let mut handle = self.environment.launch(kind, &spec).await?;

        let environment = self.environment.clone();
        let release = handle.clone();
        releases.push(
            format!("{kind} container {}", short_id(&handle.container_id)),
            move || async move {
                let mut release = release;
                environment
                    .terminate(&mut release)
                    .await
                    .map_err(HarnessError::from)
            },
        );

        self.environment.await_ready(&mut handle, &spec).await?;
        Ok(handle)
    }
}

fn short_id(container_id: &str) -> &str {
    container_id.get(..12).unwrap_or(container_id)
}
