//! Capability-keyed adapter registry.
//!
//! Adapter crates contribute constructors to [`ADAPTER_REGISTRY`] at link time,
//! usually through `#[register_adapter(...)]` from `sigbridge-macros`:
//!
//! ```rust,ignore
//! #[register_adapter(external_system, "opcua")]
//! fn opcua() -> BoxedExternalSystemAdapter {
//!     Box::new(OpcUaAdapter::default())
//! }
//! ```
//!
//! The runtime snapshots the slice into an [`AdapterRegistry`] and resolves
//! configured type names against it. Only names present in the registry can be
//! constructed; there is no open-ended type lookup.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use linkme::distributed_slice;
use tracing::{debug, warn};

use crate::adapter::{BoxedExternalSystemAdapter, BoxedProcessModelAdapter, Capability};
use crate::error::AdapterLoadError;

// =============================================================================
// Static Registrations
// =============================================================================

/// Constructor function pointer for one capability.
#[derive(Clone, Copy)]
pub enum AdapterConstructor {
    ExternalSystem(fn() -> BoxedExternalSystemAdapter),
    ProcessModel(fn() -> BoxedProcessModelAdapter),
}

impl AdapterConstructor {
    pub fn capability(&self) -> Capability {
        match self {
            Self::ExternalSystem(_) => Capability::ExternalSystem,
            Self::ProcessModel(_) => Capability::ProcessModel,
        }
    }
}

/// A link-time registration of one adapter constructor under a type name.
#[derive(Clone, Copy)]
pub struct AdapterRegistration {
    pub name: &'static str,
    pub constructor: AdapterConstructor,
}

impl AdapterRegistration {
    pub const fn external_system(
        name: &'static str,
        constructor: fn() -> BoxedExternalSystemAdapter,
    ) -> Self {
        Self {
            name,
            constructor: AdapterConstructor::ExternalSystem(constructor),
        }
    }

    pub const fn process_model(
        name: &'static str,
        constructor: fn() -> BoxedProcessModelAdapter,
    ) -> Self {
        Self {
            name,
            constructor: AdapterConstructor::ProcessModel(constructor),
        }
    }
}

/// Every adapter constructor linked into the binary.
#[distributed_slice]
pub static ADAPTER_REGISTRY: [AdapterRegistration];

// =============================================================================
// AdapterRegistry
// =============================================================================

type ExternalSystemFactory = Arc<dyn Fn() -> BoxedExternalSystemAdapter + Send + Sync>;
type ProcessModelFactory = Arc<dyn Fn() -> BoxedProcessModelAdapter + Send + Sync>;

#[derive(Default, Clone)]
struct Entry {
    external_system: Option<ExternalSystemFactory>,
    process_model: Option<ProcessModelFactory>,
}

impl Entry {
    fn capabilities(&self) -> Vec<Capability> {
        let mut caps = Vec::with_capacity(2);
        if self.external_system.is_some() {
            caps.push(Capability::ExternalSystem);
        }
        if self.process_model.is_some() {
            caps.push(Capability::ProcessModel);
        }
        caps
    }
}

/// A freshly constructed adapter of either capability.
pub enum AdapterInstance {
    ExternalSystem(BoxedExternalSystemAdapter),
    ProcessModel(BoxedProcessModelAdapter),
}

impl AdapterInstance {
    pub fn capability(&self) -> Capability {
        match self {
            Self::ExternalSystem(_) => Capability::ExternalSystem,
            Self::ProcessModel(_) => Capability::ProcessModel,
        }
    }
}

/// Map from configured type name to adapter constructors, keyed by capability.
///
/// A name may carry a constructor for each capability. Registering the same
/// name and capability twice keeps the first registration.
#[derive(Default, Clone)]
pub struct AdapterRegistry {
    entries: HashMap<String, Entry>,
}

impl AdapterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from every registration in [`ADAPTER_REGISTRY`].
    pub fn collect_all() -> Self {
        let mut registry = Self::new();
        for registration in ADAPTER_REGISTRY.iter() {
            registry.register(*registration);
        }
        debug!(
            adapters = ADAPTER_REGISTRY.len(),
            names = ?registry.names(),
            "Collected linked adapter registrations"
        );
        registry
    }

    /// Adds a static registration.
    pub fn register(&mut self, registration: AdapterRegistration) {
        match registration.constructor {
            AdapterConstructor::ExternalSystem(ctor) => {
                self.insert_external_system(registration.name, Arc::new(ctor));
            }
            AdapterConstructor::ProcessModel(ctor) => {
                self.insert_process_model(registration.name, Arc::new(ctor));
            }
        }
    }

    /// Registers an external-system constructor under `name`.
    pub fn with_external_system<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> BoxedExternalSystemAdapter + Send + Sync + 'static,
    {
        self.insert_external_system(&name.into(), Arc::new(factory));
        self
    }

    /// Registers a process-model constructor under `name`.
    pub fn with_process_model<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> BoxedProcessModelAdapter + Send + Sync + 'static,
    {
        self.insert_process_model(&name.into(), Arc::new(factory));
        self
    }

    fn insert_external_system(&mut self, name: &str, factory: ExternalSystemFactory) {
        let entry = self.entries.entry(name.to_string()).or_default();
        if entry.external_system.is_some() {
            warn!(
                adapter = name,
                capability = %Capability::ExternalSystem,
                "Multiple adapter registrations for the same name, using first"
            );
            return;
        }
        entry.external_system = Some(factory);
    }

    fn insert_process_model(&mut self, name: &str, factory: ProcessModelFactory) {
        let entry = self.entries.entry(name.to_string()).or_default();
        if entry.process_model.is_some() {
            warn!(
                adapter = name,
                capability = %Capability::ProcessModel,
                "Multiple adapter registrations for the same name, using first"
            );
            return;
        }
        entry.process_model = Some(factory);
    }

    /// Constructs the adapter registered under `name` for `capability`.
    pub fn instantiate(
        &self,
        name: &str,
        capability: Capability,
    ) -> Result<AdapterInstance, AdapterLoadError> {
        match capability {
            Capability::ExternalSystem => self
                .external_system(name)
                .map(AdapterInstance::ExternalSystem),
            Capability::ProcessModel => self.process_model(name).map(AdapterInstance::ProcessModel),
        }
    }

    /// Constructs an external-system adapter.
    pub fn external_system(
        &self,
        name: &str,
    ) -> Result<BoxedExternalSystemAdapter, AdapterLoadError> {
        let entry = self.entry(name)?;
        match &entry.external_system {
            Some(factory) => Ok(factory()),
            None => Err(mismatch(name, entry, Capability::ExternalSystem)),
        }
    }

    /// Constructs a process-model adapter.
    pub fn process_model(&self, name: &str) -> Result<BoxedProcessModelAdapter, AdapterLoadError> {
        let entry = self.entry(name)?;
        match &entry.process_model {
            Some(factory) => Ok(factory()),
            None => Err(mismatch(name, entry, Capability::ProcessModel)),
        }
    }

    fn entry(&self, name: &str) -> Result<&Entry, AdapterLoadError> {
        self.entries
            .get(name)
            .ok_or_else(|| AdapterLoadError::Unresolved {
                name: name.to_string(),
            })
    }

    /// Registered type names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Capabilities available under `name`.
    pub fn capabilities(&self, name: &str) -> Vec<Capability> {
        self.entries
            .get(name)
            .map(Entry::capabilities)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn mismatch(name: &str, entry: &Entry, requested: Capability) -> AdapterLoadError {
    // Entries only exist once something was registered under the name.
    let available = entry
        .capabilities()
        .into_iter()
        .find(|c| *c != requested)
        .unwrap_or(requested);
    AdapterLoadError::CapabilityMismatch {
        name: name.to_string(),
        requested,
        available,
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary: BTreeMap<_, _> = self
            .entries
            .iter()
            .map(|(name, entry)| (name.as_str(), entry.capabilities()))
            .collect();
        f.debug_struct("AdapterRegistry")
            .field("entries", &summary)
            .finish()
    }
}
