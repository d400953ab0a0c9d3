//! Release obligations for provisioned resources.
//!
//! Every resource the controller creates is paired with an obligation pushed
//! onto a [`ReleaseStack`] the moment creation succeeds. [`ReleaseStack::unwind`]
//! runs the obligations in reverse creation order. A failing obligation is
//! logged and counted; the remaining ones still run.

use std::future::Future;
use std::pin::Pin;

use logwire_core::error::HarnessError;
use logwire_core::metrics as m;

/// Boxed future type used for stored release obligations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type Obligation = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), HarnessError>> + Send>;

/// Stack of pending release obligations, owned by the controller.
#[derive(Default)]
pub struct ReleaseStack {
    entries: Vec<(String, Obligation)>,
}

impl ReleaseStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the release for a resource that was just created.
    pub fn push<F, Fut>(&mut self, label: impl Into<String>, release: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), HarnessError>> + Send + 'static,
    {
        let label = label.into();
        tracing::debug!(resource = %label, "release obligation registered");
        let obligation: Obligation =
            Box::new(move || -> BoxFuture<'static, Result<(), HarnessError>> {
                Box::pin(release())
            });
        self.entries.push((label, obligation));
    }

    /// Number of pending obligations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no obligations are pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Labels of pending obligations in creation order.
    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|(label, _)| label.as_str()).collect()
    }

    /// Run every pending obligation in reverse creation order.
    ///
    /// Returns the number of obligations that failed. The stack is empty afterwards.
    pub async fn unwind(&mut self) -> usize {
        let mut failures = 0;
        while let Some((label, release)) = self.entries.pop() {
            tracing::info!(resource = %label, "releasing");
            match release().await {
                Ok(()) => tracing::info!(resource = %label, "released"),
                Err(e) => {
                    tracing::error!(resource = %label, error = %e, "failed to release resource");
                    metrics::counter!(m::TEARDOWN_FAILURES_TOTAL).increment(1);
                    failures += 1;
                }
            }
        }
        failures
    }
}

impl std::fmt::Debug for ReleaseStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseStack")
            .field("pending", &self.labels())
            .finish()
    }
}
