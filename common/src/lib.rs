//! Provides types and functions that are common to the ucac binaries.
#![deny(missing_docs)]
pub mod peers;
#[cfg(feature = "telemetry")]
pub mod telemetry;
