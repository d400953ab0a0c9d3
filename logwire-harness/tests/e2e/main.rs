//! E2E integration tests for the logwire harness.
//!
//! These tests drive the full controller state machine against in-memory
//! container, stub registry and cloud fakes, so no Docker daemon is needed.
//!
//! # Test Structure
//!
//! - `helpers/` -- Shared fixture (config builder, fakes, output capture)
//! - `scenarios/` -- Test files organized by scenario
//!
//! # Running
//!
//! ```bash
//! cargo test -p logwire-harness --test e2e
//! ```

mod helpers;
mod scenarios;
