//! pagebind infrastructure library
//!
//! Host-facing pieces shared by the binaries:
//! - Telemetry initialization
//! - Process heap sampling for the memory governor

#[cfg(feature = "observability-basic")]
pub mod telemetry;

#[cfg(feature = "heap-sampler")]
pub mod memory;

#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, shutdown_telemetry};

#[cfg(feature = "heap-sampler")]
pub use memory::ProcessHeapSampler;
