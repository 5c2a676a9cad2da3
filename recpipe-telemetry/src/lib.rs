//! Telemetry setup shared by recpipe binaries and tests.

pub mod tracing;
