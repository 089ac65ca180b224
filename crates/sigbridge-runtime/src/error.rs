//! Runtime error types.
//!
//! Bootstrap failures surface as [`RuntimeError`]. Transfer-cycle failures are
//! classified into [`TransferCycleError`] (recoverable) and [`AdapterFault`]
//! (unrecoverable) and never reach callers of the lifecycle methods; a fault
//! only shows up as the executive's `Failed` state.

use sigbridge_core::{AdapterError, AdapterLoadError, Capability, CatalogViolation, SignalId};
use sigbridge_management::ManagementError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration or specification file missing or malformed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The signal catalog violates an invariant.
    #[error("Invalid signal catalog: {0}")]
    Validation(#[from] CatalogViolation),

    /// A configured adapter type name could not be resolved.
    #[error("Failed to load adapter: {0}")]
    AdapterLoad(#[from] AdapterLoadError),

    /// An adapter rejected its one-time setup.
    #[error("Setup of {capability} '{type_name}' failed: {source}")]
    AdapterSetup {
        type_name: String,
        capability: Capability,
        #[source]
        source: AdapterError,
    },

    /// The pipeline could not be built from catalog and configuration.
    #[error("Failed to build transfer pipeline: {0}")]
    PipelineBuild(#[from] PipelineBuildError),

    /// A lifecycle method was called in the wrong state.
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// An adapter failed while the executive was acquiring it.
    #[error("Failed to open {capability}: {source}")]
    AdapterOpen {
        capability: Capability,
        #[source]
        source: AdapterError,
    },

    /// The management endpoint could not be started.
    #[error(transparent)]
    Management(#[from] ManagementError),
}

impl RuntimeError {
    pub fn illegal_state(msg: impl Into<String>) -> Self {
        Self::IllegalState(msg.into())
    }
}

/// Structural inconsistencies found while building the pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineBuildError {
    /// Configuration names a signal the catalog does not contain.
    #[error("pipeline configuration references unknown signal '{0}'")]
    UnknownSignal(String),

    /// A signal is listed more than once.
    #[error("signal '{0}' is listed more than once")]
    DuplicateReference(String),

    /// A numeric parameter is out of range.
    #[error("invalid pipeline parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// A recoverable failure during one transfer cycle; the cycle is skipped.
#[derive(Error, Debug, Clone)]
#[error("transfer cycle failed in stage '{stage}': {reason}")]
pub struct TransferCycleError {
    pub stage: &'static str,
    pub reason: String,
}

/// An unrecoverable adapter failure; the executive moves to `Failed`.
#[derive(Error, Debug, Clone)]
#[error("adapter fault in stage '{stage}': {reason}")]
pub struct AdapterFault {
    pub stage: &'static str,
    pub reason: String,
}

/// Outcome of a failed transfer cycle.
#[derive(Error, Debug, Clone)]
pub enum CycleError {
    #[error(transparent)]
    Transfer(#[from] TransferCycleError),

    #[error(transparent)]
    Fault(#[from] AdapterFault),
}

impl CycleError {
    /// Classifies an adapter error raised in `stage`.
    pub fn from_adapter(stage: &'static str, err: AdapterError) -> Self {
        if err.is_recoverable() {
            Self::Transfer(TransferCycleError {
                stage,
                reason: err.to_string(),
            })
        } else {
            Self::Fault(AdapterFault {
                stage,
                reason: err.to_string(),
            })
        }
    }

    /// Builds a recoverable error for a sample the pipeline did not ask for.
    pub fn unexpected_sample(stage: &'static str, signal: &SignalId) -> Self {
        Self::Transfer(TransferCycleError {
            stage,
            reason: format!("adapter returned unrequested signal '{signal}'"),
        })
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transfer(_))
    }
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
