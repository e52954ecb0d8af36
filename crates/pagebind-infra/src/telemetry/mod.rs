//! Telemetry initialization
//!
//! Installs the global tracing subscriber: an `EnvFilter` driven by `RUST_LOG`
//! and a fmt layer, switched to JSON lines in production.

mod init_basic;

pub use init_basic::{init_telemetry, shutdown_telemetry};
