//! Shared E2E test helpers.
//!
//! [`Fixture`] bundles a test-safe configuration (artifact and stub files in a
//! temp directory, log-line probes, short poll intervals) with the fakes the
//! controller runs against.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use logwire_cloud::{FakeCloud, Renderer, SharedBuffer};
use logwire_core::config::{AwsConfig, HarnessConfig, ProbeConfig};
use logwire_core::error::HarnessError;
use logwire_environment::{FakeRuntime, FakeStubRegistry};
use logwire_harness::{CloudConnector, HarnessController};

/// Name of the function every fixture provisions.
pub const FUNCTION: &str = "log-producer";

/// Stub document with a single match-all rule.
pub const MATCH_ALL_STUBS: &str = r#"{"mappings":[{"request":{"method":"ANY","urlPattern":".*"},"response":{"status":200,"jsonBody":{"ok":true}}}]}"#;

/// Connector that hands the controller a shared in-memory cloud.
pub struct SharedCloud(pub Arc<FakeCloud>);

impl CloudConnector for SharedCloud {
    type Cloud = FakeCloud;

    async fn connect(
        &self,
        _endpoint_url: &str,
        _aws: &AwsConfig,
    ) -> Result<Arc<FakeCloud>, HarnessError> {
        Ok(Arc::clone(&self.0))
    }
}

pub type TestController = HarnessController<FakeRuntime, FakeStubRegistry, SharedCloud>;

/// Test fixture: configuration, fakes and captured observation output.
#[allow(dead_code)]
pub struct Fixture {
    pub config: HarnessConfig,
    pub runtime: Arc<FakeRuntime>,
    pub registry: Arc<FakeStubRegistry>,
    pub cloud: Arc<FakeCloud>,
    pub output: SharedBuffer,
    dir: TempDir,
}

#[allow(dead_code)]
impl Fixture {
    /// Fixture injecting `events` events with default fakes.
    pub fn new(events: usize) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let artifact = dir.path().join("log-producer.zip");
        std::fs::write(&artifact, b"PK\x03\x04function").expect("failed to write artifact");
        let stubs = dir.path().join("stubs.json");
        std::fs::write(&stubs, MATCH_ALL_STUBS).expect("failed to write stubs");

        let mut config = HarnessConfig::default();
        config.function.name = FUNCTION.to_owned();
        config.function.artifact_path = artifact.to_string_lossy().into_owned();
        config.payloads.stubs_path = stubs.to_string_lossy().into_owned();
        config.payloads.count = events;
        let probe = ProbeConfig::LogLine {
            pattern: "Ready.".to_owned(),
        };
        config.emulator.probe = probe.clone();
        config.mock_api.probe = probe;
        config.emulator.startup_timeout_secs = 10;
        config.mock_api.startup_timeout_secs = 10;
        config.readiness.poll_interval_secs = 1;
        config.readiness.max_attempts = 10;
        config.observer.poll_interval_secs = 1;
        config.observer.max_polls = 5;
        config.observer.color = false;

        Self {
            config,
            runtime: Arc::new(FakeRuntime::new().with_host_port(45_080)),
            registry: Arc::new(FakeStubRegistry::new()),
            cloud: Arc::new(FakeCloud::new()),
            output: SharedBuffer::new(),
            dir,
        }
    }

    /// Replace the cloud fake.
    pub fn cloud(mut self, cloud: FakeCloud) -> Self {
        self.cloud = Arc::new(cloud);
        self
    }

    /// Replace the container runtime fake.
    pub fn runtime(mut self, runtime: FakeRuntime) -> Self {
        self.runtime = Arc::new(runtime);
        self
    }

    /// Replace the stub registry fake.
    pub fn registry(mut self, registry: FakeStubRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Adjust the configuration.
    pub fn configure(mut self, f: impl FnOnce(&mut HarnessConfig)) -> Self {
        f(&mut self.config);
        self
    }

    /// Path inside the fixture's temp directory.
    pub fn path(&self, name: &str) -> String {
        self.dir.path().join(name).to_string_lossy().into_owned()
    }

    /// Build a controller wired to the fakes, rendering into `self.output`.
    pub fn controller(&self) -> TestController {
        HarnessController::new(
            self.config.clone(),
            Arc::clone(&self.runtime),
            Arc::clone(&self.registry),
            SharedCloud(Arc::clone(&self.cloud)),
        )
        .with_renderer(Renderer::with_writer(false, Box::new(self.output.clone())))
    }

    /// Run the controller to completion with a token that never fires.
    pub async fn run(&self) -> Result<logwire_harness::RunReport, HarnessError> {
        self.controller().run(CancellationToken::new()).await
    }

    /// Number of output lines mentioning the function.
    pub fn function_mentions(&self) -> usize {
        self.output
            .contents()
            .lines()
            .filter(|line| line.contains(FUNCTION))
            .count()
    }

    /// Cloud journal entries that delete something, in order.
    pub fn deletions(&self) -> Vec<String> {
        self.cloud
            .journal()
            .into_iter()
            .filter(|entry| entry.starts_with("delete"))
            .collect()
    }
}

/// Cancel `token` after `delay` of (paused) tokio time.
#[allow(dead_code)]
pub fn cancel_after(token: &CancellationToken, delay: Duration) {
    let token = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        token.cancel();
    });
}

/// Container IDs in creation order: emulator first, mock API second.
#[allow(dead_code)]
pub fn container_ids() -> (String, String) {
    (format!("{:064x}", 1), format!("{:064x}", 2))
}
