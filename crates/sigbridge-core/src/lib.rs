//! # sigbridge Core
//!
//! Building blocks shared by every sigbridge crate:
//!
//! - **Signal model**: [`Signal`], [`Direction`] and the immutable [`SignalCatalog`]
//! - **Adapter capabilities**: [`ExternalSystemAdapter`] and [`ProcessModelAdapter`],
//!   both built on [`SignalAdapter`]
//! - **Adapter registry**: link-time [`ADAPTER_REGISTRY`] and the capability-keyed
//!   [`AdapterRegistry`] the runtime resolves configured type names against
//! - **Status**: [`ExecutiveState`], [`ExecutiveStatus`] and [`VersionInfo`]
//!
//! ```text
//! ┌──────────────────┐   samples   ┌──────────────┐   samples   ┌──────────────────┐
//! │ External system  │────────────▶│   sigbridge  │────────────▶│  Process model   │
//! │     adapter      │◀────────────│   pipeline   │◀────────────│     adapter      │
//! └──────────────────┘             └──────────────┘             └──────────────────┘
//! ```

pub mod adapter;
pub mod error;
pub mod registry;
pub mod signal;
pub mod status;

pub use adapter::{
    AdapterSettings, BoxedExternalSystemAdapter, BoxedProcessModelAdapter, Capability,
    ExternalSystemAdapter, ProcessModelAdapter, SharedExternalSystemAdapter,
    SharedProcessModelAdapter, SignalAdapter, SoftwareInfo,
};
pub use error::{AdapterError, AdapterLoadError, AdapterResult, CatalogViolation};
pub use registry::{
    ADAPTER_REGISTRY, AdapterConstructor, AdapterInstance, AdapterRegistration, AdapterRegistry,
};
pub use signal::{
    DataType, Direction, EngineeringScale, Sample, Signal, SignalCatalog, SignalId, SignalValue,
};
pub use status::{
    CORE_NAME, CORE_VERSION, ExecutiveState, ExecutiveStatus, StatusSource, VersionInfo,
};

// Used by `#[register_adapter]` expansions.
pub use async_trait::async_trait;
pub use linkme;
