//! CLI argument definitions for the logwire harness.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Local log-pipeline harness.
///
/// Starts the cloud emulator and mock API containers, provisions a function
/// with its log routing, injects a battery of synthetic events, and prints
/// what arrives in the function logs and the subscribed stream.
#[derive(Parser, Debug)]
#[command(name = "logwire")]
#[command(version, about, long_about = None)]
pub struct HarnessCli {
    /// Path to the logwire.toml configuration file.
    #[arg(short, long, default_value = "logwire.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    #[arg(long)]
    pub log_format: Option<String>,

    /// Keep tailing function logs after observation until interrupted.
    #[arg(long)]
    pub follow: bool,

    /// Validate the configuration file and exit without provisioning anything.
    #[arg(long)]
    pub validate: bool,
}
