//! Error types shared by the core, the adapters and the runtime.

use thiserror::Error;

use crate::adapter::Capability;
use crate::signal::SignalId;

// =============================================================================
// Catalog Errors
// =============================================================================

/// A catalog invariant violation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogViolation {
    /// Two signals share an id.
    #[error("duplicate signal id '{0}'")]
    DuplicateId(SignalId),

    /// A signal was declared without a direction.
    #[error("signal '{0}' has no direction")]
    MissingDirection(SignalId),

    /// A signal was declared with an empty id.
    #[error("signal at position {position} has an empty id")]
    EmptyId {
        /// Zero-based position in the specification.
        position: usize,
    },
}

// =============================================================================
// Adapter Errors
// =============================================================================

/// Errors reported by adapter implementations.
///
/// The variant decides how the executive treats a failure during a transfer
/// cycle: [`AdapterError::Transient`] is recoverable, everything else is a fault.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    /// A temporary failure; the cycle may be retried or skipped.
    #[error("transient adapter failure: {0}")]
    Transient(String),

    /// The adapter cannot continue.
    #[error("adapter fault: {0}")]
    Fault(String),

    /// A setting was missing or had the wrong shape.
    #[error("invalid setting '{key}': {reason}")]
    InvalidSetting {
        /// The offending settings key.
        key: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The adapter was asked about a signal it was not set up with.
    #[error("unknown signal '{0}'")]
    UnknownSignal(SignalId),

    /// Catch-all for adapter internals.
    #[error("adapter error: {0}")]
    Internal(String),
}

impl AdapterError {
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn fault(msg: impl Into<String>) -> Self {
        Self::Fault(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn invalid_setting(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Returns whether a transfer cycle hitting this error may continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

// =============================================================================
// Loader Errors
// =============================================================================

/// Failure to resolve a configured adapter type name.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdapterLoadError {
    /// No registration exists under this name.
    #[error("no adapter registered under type name '{name}'")]
    Unresolved {
        /// The configured type name.
        name: String,
    },

    /// A registration exists, but not for the requested capability.
    #[error("adapter '{name}' does not implement {requested} (available: {available})")]
    CapabilityMismatch {
        /// The configured type name.
        name: String,
        /// The capability the caller asked for.
        requested: Capability,
        /// The capability the registration provides.
        available: Capability,
    },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;
