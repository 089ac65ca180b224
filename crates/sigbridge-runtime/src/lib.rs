//! sigbridge Runtime - bootstrap, supervision and transfer loop.
//!
//! This crate provides:
//! - Configuration loading (`ConfigLoader`) and logging setup
//! - Signal catalog loading from the signal-exchange specification
//! - Adapter resolution and one-time setup (`AdapterLoader`)
//! - Transfer pipeline construction (`PipelineBuilder`)
//! - The integration executive and its start/stop state machine
//! - The process-wide `Supervisor` sequencing all of the above
//!
//! ```ignore
//! use sigbridge_runtime::{ConfigLoader, Supervisor};
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
//! # Failure handling
//!
//! Bootstrap failures abort `start()` and leave nothing running. Once running,
//! recoverable transfer failures are retried or skipped; an adapter fault moves
//! the executive to `Failed` until it is stopped. There is no automatic restart.

pub mod catalog;
pub mod config;
pub mod error;
pub mod executive;
pub mod loader;
pub mod logging;
pub mod pipeline;
pub mod supervisor;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, SigbridgeConfig};
pub use error::{
    AdapterFault, CycleError, PipelineBuildError, RuntimeError, RuntimeResult, TransferCycleError,
};
pub use executive::{ExecutiveView, IntegrationExecutive};
pub use loader::{AdapterDescriptor, AdapterLoader, LoadedAdapter};
pub use logging::{LogSink, LoggingBuilder, SpanEvents};
pub use pipeline::{CycleReport, PipelineBuilder, TransferPipeline};
pub use supervisor::Supervisor;

// Re-export tracing for use by other crates
pub use tracing;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
