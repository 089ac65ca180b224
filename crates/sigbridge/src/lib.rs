//! # sigbridge
//!
//! Couples an external system (a controller, a plant interface) with a
//! simulated process model and keeps their signals in step.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐  start/stop  ┌───────────────────────┐   cycles   ┌──────────────────┐
//! │ Supervisor │─────────────▶│ Integration executive │───────────▶│ Transfer pipeline│
//! └────────────┘              └───────────────────────┘            └──────────────────┘
//!       │                                                            │            │
//!       ▼                                                            ▼            ▼
//! ┌────────────┐                                            ┌──────────────┐ ┌─────────────┐
//! │ Management │                                            │   External   │ │   Process   │
//! │  endpoint  │                                            │    system    │ │    model    │
//! └────────────┘                                            └──────────────┘ └─────────────┘
//! ```
//!
//! - **Supervisor**: loads configuration and the signal catalog, sets up both
//!   adapters, builds the pipeline and owns the running executive
//! - **Executive**: `Stopped → Starting → Running → Stopping → Stopped`, with
//!   `Failed` after an adapter fault
//! - **Adapters**: registered at link time with `#[register_adapter]`
//! - **Management**: read-only HTTP endpoints for version, status and log files
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sigbridge::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let supervisor = Supervisor::new(ConfigLoader::new().file("sigbridge.toml"));
//!     supervisor.start(8080).await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     supervisor.stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `memory-adapter`: in-process adapters registered as `memory` (default)
//! - `toml-config` / `yaml-config`: configuration file formats
//! - `json-log`: JSON log output

pub use sigbridge_core as core;
pub use sigbridge_management as management;
pub use sigbridge_runtime as runtime;

#[cfg(feature = "memory-adapter")]
pub use sigbridge_adapter_memory as memory;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use sigbridge::prelude::*;
/// ```
pub mod prelude {
    // Entry point
    pub use sigbridge_runtime::{ConfigLoader, SigbridgeConfig, Supervisor};

    // Writing adapters
    pub use sigbridge_core::{
        AdapterError, AdapterResult, AdapterSettings, BoxedExternalSystemAdapter,
        BoxedProcessModelAdapter, ExternalSystemAdapter, ProcessModelAdapter, Sample, Signal,
        SignalAdapter, SignalId, SignalValue, SoftwareInfo, async_trait,
    };
    pub use sigbridge_macros::register_adapter;

    // Observing a run
    pub use sigbridge_core::{ExecutiveState, ExecutiveStatus, VersionInfo};
    pub use sigbridge_runtime::{RuntimeError, RuntimeResult};

    // Logging
    pub use sigbridge_runtime::prelude::*;
}
