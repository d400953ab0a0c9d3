//! E2E test scenarios.

mod fault_isolation;
mod input_errors;
mod pipeline_flow;
mod shutdown;
