//! Configuration schema definitions.
//!
//! # Example (`sigbridge.toml`)
//!
//! ```toml
//! [catalog]
//! path = "signals.toml"
//!
//! [external_system]
//! type = "memory"
//!
//! [process_model]
//! type = "memory"
//!
//! [adapters.memory]
//! seed = 1.5
//!
//! [pipeline]
//! order = "external-first"
//! exclude = ["debug_counter"]
//! batch_size = 64
//!
//! [executive]
//! cycle_interval_ms = 500
//! max_consecutive_failures = 10
//! retry = { max_attempts = 2, delay_ms = 50 }
//!
//! [logging]
//! level = "info"
//! output = "file"
//! directory = "logs"
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sigbridge_core::AdapterSettings;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SigbridgeConfig {
    /// Where the signal-exchange specification lives.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Adapter used for the external system.
    #[serde(default)]
    pub external_system: AdapterSelection,

    /// Adapter used for the process model.
    #[serde(default)]
    pub process_model: AdapterSelection,

    /// Settings per adapter type name.
    #[serde(default)]
    pub adapters: BTreeMap<String, AdapterSettings>,

    /// Transfer pipeline construction.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Transfer loop timing and failure policy.
    #[serde(default)]
    pub executive: ExecutiveConfig,

    /// Management endpoint.
    #[serde(default)]
    pub management: ManagementConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SigbridgeConfig {
    /// Settings for an adapter type name; empty when the section is absent.
    pub fn adapter_settings(&self, type_name: &str) -> AdapterSettings {
        self.adapters.get(type_name).cloned().unwrap_or_default()
    }
}

// =============================================================================
// Catalog & Adapters
// =============================================================================

/// Location of the signal-exchange specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Path to the specification file (`.toml`, `.yaml` or `.yml`).
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
        }
    }
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("signals.toml")
}

/// Which registered adapter type to use for one side.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AdapterSelection {
    /// Registered adapter type name.
    #[serde(rename = "type", default)]
    pub type_name: String,
}

impl AdapterSelection {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
        }
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Order of the two transfer stages inside a cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TransferOrder {
    /// Move external-system values to the model first.
    #[default]
    ExternalFirst,
    /// Move model values to the external system first.
    ModelFirst,
}

/// Pipeline construction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub order: TransferOrder,

    /// Signal ids left out of the transfer.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Maximum number of signals per adapter read/write call.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Call `advance()` on the process model after each pass.
    #[serde(default = "default_advance_model")]
    pub advance_model: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            order: TransferOrder::default(),
            exclude: Vec::new(),
            batch_size: default_batch_size(),
            advance_model: default_advance_model(),
        }
    }
}

fn default_batch_size() -> usize {
    64
}

fn default_advance_model() -> bool {
    true
}

// =============================================================================
// Executive
// =============================================================================

/// Transfer loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutiveConfig {
    /// Pause between two cycles in milliseconds.
    #[serde(default = "default_cycle_interval_ms")]
    pub cycle_interval_ms: u64,

    /// Retry policy for recoverable cycle failures.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Number of skipped cycles in a row that is treated as a fault (0 = never).
    #[serde(default)]
    pub max_consecutive_failures: u32,
}

impl Default for ExecutiveConfig {
    fn default() -> Self {
        Self {
            cycle_interval_ms: default_cycle_interval_ms(),
            retry: RetryConfig::default(),
            max_consecutive_failures: 0,
        }
    }
}

impl ExecutiveConfig {
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_millis(self.cycle_interval_ms)
    }
}

fn default_cycle_interval_ms() -> u64 {
    1000
}

/// Retry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Additional attempts after a recoverable failure (0 = skip immediately).
    #[serde(default)]
    pub max_attempts: u32,

    /// Delay between attempts in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            delay_ms: default_retry_delay_ms(),
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

fn default_retry_delay_ms() -> u64 {
    100
}

// =============================================================================
// Management
// =============================================================================

/// Management endpoint configuration. The port is chosen by the caller of
/// `Supervisor::start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagementConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,
}

impl Default for ManagementConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

// =============================================================================
// Logging
// =============================================================================

/// Log level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `full` otherwise.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    /// Daily-rolling files in `logging.directory`.
    File,
}

/// Span lifecycle events to log.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Log directory; also the directory the management layer lists.
    #[serde(default = "default_log_directory")]
    pub directory: PathBuf,

    /// File name prefix for rolling log files.
    #[serde(default = "default_log_file_name")]
    pub file_name: String,

    #[serde(default)]
    pub thread_ids: bool,

    #[serde(default)]
    pub file_location: bool,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Per-module level overrides, e.g. `sigbridge_runtime = "debug"`.
    #[serde(default)]
    pub filters: BTreeMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            directory: default_log_directory(),
            file_name: default_log_file_name(),
            thread_ids: false,
            file_location: false,
            span_events: SpanEventConfig::default(),
            filters: BTreeMap::new(),
        }
    }
}

fn default_log_directory() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_file_name() -> String {
    "sigbridge.log".to_string()
}
