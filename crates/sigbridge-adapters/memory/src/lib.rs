//! In-process adapters for sigbridge.
//!
//! Both sides keep their values in memory, which makes them useful for
//! dry runs of a signal specification and for exercising the runtime without
//! real equipment. They register under the type name `memory`:
//!
//! ```toml
//! [external_system]
//! type = "memory"
//!
//! [process_model]
//! type = "memory"
//!
//! [adapters.memory]
//! initial = { tank_level = 4.2 }
//! mirror = { inlet_valve = "pump_running" }
//! ```
//!
//! `initial` sets starting values; each side picks the signals it supplies.
//! `mirror` only affects the process model: on every `advance` it copies the last
//! value received for the right-hand signal into the supplied left-hand one.

mod store;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use sigbridge_core::{
    AdapterError, AdapterResult, AdapterSettings, BoxedExternalSystemAdapter,
    BoxedProcessModelAdapter, ExternalSystemAdapter, ProcessModelAdapter, Sample, Signal,
    SignalAdapter, SignalId, SignalValue, SoftwareInfo,
};
use sigbridge_macros::register_adapter;
use tracing::{debug, trace};

use crate::store::{MemorySettings, SignalStore};

/// Type name both adapters register under.
pub const TYPE_NAME: &str = "memory";

#[register_adapter(external_system, "memory")]
fn memory_external_system() -> BoxedExternalSystemAdapter {
    Box::new(MemoryExternalSystem::default())
}

#[register_adapter(process_model, "memory")]
fn memory_process_model() -> BoxedProcessModelAdapter {
    Box::new(MemoryProcessModel::default())
}

// =============================================================================
// External system
// =============================================================================

/// An external system whose values live in memory.
#[derive(Debug, Default)]
pub struct MemoryExternalSystem {
    store: SignalStore,
}

impl MemoryExternalSystem {
    /// Last value the model sent for `id`.
    pub fn received(&self, id: &str) -> Option<SignalValue> {
        self.store.received(id)
    }

    /// Changes a value this side supplies to the model.
    pub fn set(&self, id: &str, value: SignalValue) -> AdapterResult<()> {
        self.store.set(id, value)
    }
}

#[async_trait]
impl SignalAdapter for MemoryExternalSystem {
    fn software_info(&self) -> SoftwareInfo {
        SoftwareInfo::new("memory-external-system", env!("CARGO_PKG_VERSION"))
            .with_detail("signals", self.store.len().to_string())
    }

    async fn setup(
        &mut self,
        own: &[Signal],
        peer: &[Signal],
        settings: &AdapterSettings,
    ) -> AdapterResult<()> {
        let settings = MemorySettings::parse(settings)?;
        self.store.configure(own, peer, &settings.initial)?;
        debug!(
            receives = own.len(),
            supplies = peer.len(),
            "Memory external system ready"
        );
        Ok(())
    }

    async fn read(&self, signals: &[SignalId]) -> AdapterResult<Vec<Sample>> {
        self.store.read(signals)
    }

    async fn write(&self, samples: &[Sample]) -> AdapterResult<()> {
        self.store.write(samples)
    }

    async fn release(&self) -> AdapterResult<()> {
        self.store.clear();
        Ok(())
    }
}

impl ExternalSystemAdapter for MemoryExternalSystem {}

// =============================================================================
// Process model
// =============================================================================

/// A process model that mirrors received values into supplied ones.
#[derive(Debug, Default)]
pub struct MemoryProcessModel {
    store: SignalStore,
    mirror: RwLock<BTreeMap<String, String>>,
    steps: AtomicU64,
}

impl MemoryProcessModel {
    /// Number of completed `advance` calls.
    pub fn steps(&self) -> u64 {
        self.steps.load(Ordering::Relaxed)
    }

    /// Last value the external system sent for `id`.
    pub fn received(&self, id: &str) -> Option<SignalValue> {
        self.store.received(id)
    }
}

#[async_trait]
impl SignalAdapter for MemoryProcessModel {
    fn software_info(&self) -> SoftwareInfo {
        SoftwareInfo::new("memory-process-model", env!("CARGO_PKG_VERSION"))
            .with_detail("mirrors", self.mirror.read().len().to_string())
    }

    async fn setup(
        &mut self,
        own: &[Signal],
        peer: &[Signal],
        settings: &AdapterSettings,
    ) -> AdapterResult<()> {
        let settings = MemorySettings::parse(settings)?;
        self.store.configure(own, peer, &settings.initial)?;

        for (target, source) in &settings.mirror {
            if !self.store.supplies(target) {
                return Err(AdapterError::invalid_setting(
                    format!("mirror.{target}"),
                    "not a signal the process model supplies",
                ));
            }
            if !self.store.receives(source) {
                return Err(AdapterError::invalid_setting(
                    format!("mirror.{target}"),
                    format!("'{source}' is not a signal the process model receives"),
                ));
            }
        }
        *self.mirror.write() = settings.mirror;
        self.steps.store(0, Ordering::Relaxed);
        Ok(())
    }

    async fn read(&self, signals: &[SignalId]) -> AdapterResult<Vec<Sample>> {
        self.store.read(signals)
    }

    async fn write(&self, samples: &[Sample]) -> AdapterResult<()> {
        self.store.write(samples)
    }

    async fn release(&self) -> AdapterResult<()> {
        self.store.clear();
        self.mirror.write().clear();
        Ok(())
    }
}

#[async_trait]
impl ProcessModelAdapter for MemoryProcessModel {
    async fn advance(&self) -> AdapterResult<()> {
        for (target, source) in self.mirror.read().iter() {
            if let Some(value) = self.store.received(source) {
                self.store.set(target, value)?;
            }
        }
        let step = self.steps.fetch_add(1, Ordering::Relaxed) + 1;
        trace!(step, "Memory process model advanced");
        Ok(())
    }
}
