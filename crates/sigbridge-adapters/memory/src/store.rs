//! Value storage shared by both memory adapters.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use serde::Deserialize;
use sigbridge_core::{
    AdapterError, AdapterResult, AdapterSettings, DataType, Sample, Signal, SignalId, SignalValue,
};

/// Settings understood by both memory adapters.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct MemorySettings {
    /// Starting values for supplied signals.
    #[serde(default)]
    pub initial: BTreeMap<String, SignalValue>,

    /// Process model only: `supplied = "received"` pairs copied on `advance`.
    #[serde(default)]
    pub mirror: BTreeMap<String, String>,
}

impl MemorySettings {
    pub fn parse(settings: &AdapterSettings) -> AdapterResult<Self> {
        if settings.is_empty() {
            return Ok(Self::default());
        }
        settings.deserialize()
    }
}

/// Current values, split into the signals an adapter receives and the ones it
/// supplies.
#[derive(Debug, Default)]
pub(crate) struct SignalStore {
    received: RwLock<HashMap<SignalId, Option<SignalValue>>>,
    supplied: RwLock<HashMap<SignalId, SignalValue>>,
}

impl SignalStore {
    /// Resets the store for the given signal sets.
    pub fn configure(
        &self,
        own: &[Signal],
        peer: &[Signal],
        initial: &BTreeMap<String, SignalValue>,
    ) -> AdapterResult<()> {
        let mut supplied: HashMap<SignalId, SignalValue> = peer
            .iter()
            .map(|s| (s.id.clone(), zero(s.data_type)))
            .collect();

        // Both sides share one settings section, so values for received
        // signals belong to the other side and are skipped.
        for (id, value) in initial {
            if let Some(slot) = supplied.get_mut(id.as_str()) {
                *slot = value.clone();
            } else if !own.iter().any(|s| s.id.as_str() == id) {
                return Err(AdapterError::invalid_setting(
                    format!("initial.{id}"),
                    "unknown signal",
                ));
            }
        }

        *self.received.write() = own.iter().map(|s| (s.id.clone(), None)).collect();
        *self.supplied.write() = supplied;
        Ok(())
    }

    pub fn read(&self, signals: &[SignalId]) -> AdapterResult<Vec<Sample>> {
        let supplied = self.supplied.read();
        signals
            .iter()
            .map(|id| {
                supplied
                    .get(id)
                    .map(|value| Sample::new(id.clone(), value.clone()))
                    .ok_or_else(|| AdapterError::UnknownSignal(id.clone()))
            })
            .collect()
    }

    pub fn write(&self, samples: &[Sample]) -> AdapterResult<()> {
        let mut received = self.received.write();
        if let Some(unknown) = samples.iter().find(|s| !received.contains_key(&s.signal)) {
            return Err(AdapterError::UnknownSignal(unknown.signal.clone()));
        }
        for sample in samples {
            received.insert(sample.signal.clone(), Some(sample.value.clone()));
        }
        Ok(())
    }

    /// Last value written for a received signal.
    pub fn received(&self, id: &str) -> Option<SignalValue> {
        self.received.read().get(id).cloned().flatten()
    }

    pub fn supplies(&self, id: &str) -> bool {
        self.supplied.read().contains_key(id)
    }

    pub fn receives(&self, id: &str) -> bool {
        self.received.read().contains_key(id)
    }

    /// Overwrites the value of a supplied signal.
    pub fn set(&self, id: &str, value: SignalValue) -> AdapterResult<()> {
        match self.supplied.write().get_mut(id) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(AdapterError::UnknownSignal(SignalId::new(id))),
        }
    }

    pub fn len(&self) -> usize {
        self.received.read().len() + self.supplied.read().len()
    }

    pub fn clear(&self) {
        self.received.write().clear();
        self.supplied.write().clear();
    }
}

fn zero(data_type: DataType) -> SignalValue {
    match data_type {
        DataType::Boolean => SignalValue::Boolean(false),
        DataType::Integer => SignalValue::Integer(0),
        DataType::Float => SignalValue::Float(0.0),
        DataType::Text => SignalValue::Text(String::new()),
    }
}
