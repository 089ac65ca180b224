//! Configuration module for the sigbridge runtime.
//!
//! Figment-based loading of the bridge configuration: which adapters to use, their
//! settings, pipeline and executive tuning, the management endpoint and logging.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile};
pub use schema::{
    AdapterSelection, CatalogConfig, ExecutiveConfig, LogFormat, LogLevel, LogOutput,
    LoggingConfig, ManagementConfig, PipelineConfig, RetryConfig, SigbridgeConfig,
    SpanEventConfig, TransferOrder,
};
pub use validation::validate_config;
