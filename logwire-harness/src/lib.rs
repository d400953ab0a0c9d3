//! logwire harness library.
//!
//! This library exposes internal modules for integration testing.
//! In production, the harness is used as the `logwire` binary (main.rs).

pub mod cli;
pub mod controller;
pub mod logging;
pub mod signal;
pub mod teardown;

pub use controller::{AwsConnector, CloudConnector, HarnessController, RunReport};
pub use teardown::ReleaseStack;
