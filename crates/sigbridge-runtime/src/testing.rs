//! Fake adapters shared by the runtime's unit tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use sigbridge_core::{
    AdapterError, AdapterRegistry, AdapterResult, AdapterSettings, DataType, Direction,
    ExternalSystemAdapter, ProcessModelAdapter, Sample, Signal, SignalAdapter, SignalCatalog,
    SignalId, SignalValue, SoftwareInfo,
};

/// Ordered record of adapter calls across both sides.
#[derive(Clone, Default)]
pub(crate) struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: String) {
        self.0.lock().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.0.lock().iter().any(|e| e == entry)
    }
}

#[derive(Default)]
pub(crate) struct FakeState {
    pub fail_setup: AtomicBool,
    pub fail_open: AtomicBool,
    pub fail_release: AtomicBool,
    pub read_errors: Mutex<VecDeque<AdapterError>>,
    pub own: Mutex<Vec<SignalId>>,
    pub peer: Mutex<Vec<SignalId>>,
    pub settings: Mutex<Option<AdapterSettings>>,
    pub written: Mutex<Vec<Sample>>,
    pub setups: AtomicUsize,
    pub reads: AtomicUsize,
    pub advances: AtomicUsize,
}

/// An adapter usable for either capability. Clones share state.
#[derive(Clone)]
pub(crate) struct FakeAdapter {
    pub label: &'static str,
    pub journal: Journal,
    pub state: Arc<FakeState>,
}

impl FakeAdapter {
    pub fn new(label: &'static str, journal: &Journal) -> Self {
        Self {
            label,
            journal: journal.clone(),
            state: Arc::default(),
        }
    }

    pub fn fail_setup(self) -> Self {
        self.state.fail_setup.store(true, Ordering::SeqCst);
        self
    }

    pub fn fail_open(self) -> Self {
        self.state.fail_open.store(true, Ordering::SeqCst);
        self
    }

    pub fn fail_release(self) -> Self {
        self.state.fail_release.store(true, Ordering::SeqCst);
        self
    }

    /// Queues an error for the next `read`.
    pub fn push_read_error(&self, err: AdapterError) {
        self.state.read_errors.lock().push_back(err);
    }

    pub fn written_ids(&self) -> Vec<String> {
        self.state
            .written
            .lock()
            .iter()
            .map(|s| s.signal.to_string())
            .collect()
    }

    fn log(&self, op: &str) {
        self.journal.record(format!("{}:{op}", self.label));
    }
}

#[async_trait]
impl SignalAdapter for FakeAdapter {
    fn software_info(&self) -> SoftwareInfo {
        SoftwareInfo::new(self.label, "1.0.0")
    }

    async fn setup(
        &mut self,
        own: &[Signal],
        peer: &[Signal],
        settings: &AdapterSettings,
    ) -> AdapterResult<()> {
        self.log("setup");
        self.state.setups.fetch_add(1, Ordering::SeqCst);
        *self.state.own.lock() = own.iter().map(|s| s.id.clone()).collect();
        *self.state.peer.lock() = peer.iter().map(|s| s.id.clone()).collect();
        *self.state.settings.lock() = Some(settings.clone());

        if self.state.fail_setup.load(Ordering::SeqCst) {
            return Err(AdapterError::invalid_setting("endpoint", "unreachable"));
        }
        Ok(())
    }

    async fn open(&self) -> AdapterResult<()> {
        self.log("open");
        if self.state.fail_open.load(Ordering::SeqCst) {
            return Err(AdapterError::fault("connection refused"));
        }
        Ok(())
    }

    async fn read(&self, signals: &[SignalId]) -> AdapterResult<Vec<Sample>> {
        self.state.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.state.read_errors.lock().pop_front() {
            return Err(err);
        }
        Ok(signals
            .iter()
            .map(|id| Sample::new(id.clone(), SignalValue::Float(1.0)))
            .collect())
    }

    async fn write(&self, samples: &[Sample]) -> AdapterResult<()> {
        self.state.written.lock().extend_from_slice(samples);
        Ok(())
    }

    async fn release(&self) -> AdapterResult<()> {
        self.log("release");
        if self.state.fail_release.load(Ordering::SeqCst) {
            return Err(AdapterError::internal("socket already closed"));
        }
        Ok(())
    }
}

impl ExternalSystemAdapter for FakeAdapter {}

#[async_trait]
impl ProcessModelAdapter for FakeAdapter {
    async fn advance(&self) -> AdapterResult<()> {
        self.state.advances.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Registry exposing `external` as "fake-plant" and `model` as "fake-model".
pub(crate) fn registry(external: &FakeAdapter, model: &FakeAdapter) -> AdapterRegistry {
    let external = external.clone();
    let model = model.clone();
    AdapterRegistry::new()
        .with_external_system("fake-plant", move || Box::new(external.clone()))
        .with_process_model("fake-model", move || Box::new(model.clone()))
}

/// Catalog {A: toExternalSystem, B: toProcessModel}.
pub(crate) fn catalog() -> SignalCatalog {
    SignalCatalog::new(vec![
        Signal::new("A", Direction::ToExternalSystem, DataType::Float),
        Signal::new("B", Direction::ToProcessModel, DataType::Float),
    ])
    .unwrap()
}
