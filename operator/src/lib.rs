//! Provides API for provisioning ucac monitoring and performance tests.
#![warn(missing_docs)]

/// Error types shared by the workflows.
pub mod error;
/// Labels module for managing resource labels.
pub(crate) mod labels;
/// Monitoring module for installing the monitoring stack.
pub mod monitoring;
/// Namespace module for preparing the target namespace.
pub mod namespace;
/// Performance module for deploying the test harness.
pub mod performance;
/// Release module for installing chart releases.
pub mod release;
/// Utils module for shared utility functions.
pub mod utils;

/// Field manager recorded on every object created by ucac.
pub const FIELD_MANAGER: &str = "ucac";
