//! Adapter capabilities.
//!
//! An adapter connects the bridge to one side of the exchange. Both sides share
//! the [`SignalAdapter`] contract; the two capability traits,
//! [`ExternalSystemAdapter`] and [`ProcessModelAdapter`], are what the loader
//! resolves configured type names against.
//!
//! # Lifecycle
//!
//! ```text
//! construct ──▶ setup(own, peer, settings) ──▶ open() ──▶ read/write ... ──▶ release()
//!   (loader)         (loader, exactly once)    (executive start)          (teardown)
//! ```
//!
//! `own` is the set of signals the adapter receives (signals flowing towards its
//! side); `peer` is the set it must supply to the other side.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{AdapterError, AdapterResult};
use crate::signal::{Sample, Signal, SignalId};

/// The two adapter roles the bridge knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    ExternalSystem,
    ProcessModel,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExternalSystem => "ExternalSystemAdapter",
            Self::ProcessModel => "ProcessModelAdapter",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name and version an adapter reports about the software behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftwareInfo {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
}

impl SoftwareInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            details: BTreeMap::new(),
        }
    }

    /// Adds a free-form detail entry.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Opaque key/value settings handed to an adapter during setup.
///
/// Taken from the `adapters.<type-name>` section of the configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdapterSettings(serde_json::Map<String, serde_json::Value>);

impl AdapterSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a setting.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(|v| v.as_bool())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(|v| v.as_u64())
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(|v| v.as_f64())
    }

    /// Deserializes the whole section into an adapter-specific type.
    pub fn deserialize<T: DeserializeOwned>(&self) -> AdapterResult<T> {
        serde_json::from_value(serde_json::Value::Object(self.0.clone()))
            .map_err(|e| AdapterError::invalid_setting("*", e.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl FromIterator<(String, serde_json::Value)> for AdapterSettings {
    fn from_iter<I: IntoIterator<Item = (String, serde_json::Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// =============================================================================
// Adapter Traits
// =============================================================================

/// Operations common to both sides of the bridge.
///
/// Implementations use interior mutability for anything they change after
/// setup; the executive shares adapters with the pipeline behind an `Arc`.
#[async_trait]
pub trait SignalAdapter: Send + Sync {
    /// Reports the software this adapter talks to.
    fn software_info(&self) -> SoftwareInfo;

    /// One-time setup with the adapter's own signals, its peer's signals and its
    /// configured settings. Called exactly once by the loader.
    async fn setup(
        &mut self,
        own: &[Signal],
        peer: &[Signal],
        settings: &AdapterSettings,
    ) -> AdapterResult<()>;

    /// Acquires runtime resources. Called by the executive when it starts.
    async fn open(&self) -> AdapterResult<()> {
        Ok(())
    }

    /// Reads current values for signals this adapter supplies to its peer.
    async fn read(&self, signals: &[SignalId]) -> AdapterResult<Vec<Sample>>;

    /// Writes values for signals this adapter receives.
    async fn write(&self, samples: &[Sample]) -> AdapterResult<()>;

    /// Releases everything acquired by `setup` and `open`.
    ///
    /// Also called on an adapter that was set up but never opened, when a
    /// later bootstrap step or its peer's `open` fails, so it must not assume
    /// `open` ran.
    async fn release(&self) -> AdapterResult<()> {
        Ok(())
    }
}

/// Capability: an adapter for the external system being integrated.
pub trait ExternalSystemAdapter: SignalAdapter {}

/// Capability: an adapter for the process model on the other side.
#[async_trait]
pub trait ProcessModelAdapter: SignalAdapter {
    /// Advances the model by one step after a transfer pass.
    async fn advance(&self) -> AdapterResult<()> {
        Ok(())
    }
}

/// A constructed, not yet set-up external-system adapter.
pub type BoxedExternalSystemAdapter = Box<dyn ExternalSystemAdapter>;

/// A constructed, not yet set-up process-model adapter.
pub type BoxedProcessModelAdapter = Box<dyn ProcessModelAdapter>;

/// A set-up external-system adapter shared by executive and pipeline.
pub type SharedExternalSystemAdapter = Arc<dyn ExternalSystemAdapter>;

/// A set-up process-model adapter shared by executive and pipeline.
pub type SharedProcessModelAdapter = Arc<dyn ProcessModelAdapter>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_settings_accessors() {
        let settings = AdapterSettings::new()
            .with("endpoint", "opc.tcp://localhost:4840")
            .with("timeout_ms", 250)
            .with("simulate", true);

        assert_eq!(settings.get_str("endpoint"), Some("opc.tcp://localhost:4840"));
        assert_eq!(settings.get_u64("timeout_ms"), Some(250));
        assert_eq!(settings.get_bool("simulate"), Some(true));
        assert_eq!(settings.get_str("timeout_ms"), None);
    }

    #[test]
    fn test_settings_deserialize() {
        #[derive(Deserialize)]
        struct Typed {
            rate: f64,
            #[serde(default)]
            label: Option<String>,
        }

        let settings: AdapterSettings = serde_json::from_value(json!({ "rate": 2.5 })).unwrap();
        let typed: Typed = settings.deserialize().unwrap();
        assert_eq!(typed.rate, 2.5);
        assert!(typed.label.is_none());

        let bad = AdapterSettings::new().with("rate", "fast");
        assert!(matches!(
            bad.deserialize::<Typed>(),
            Err(AdapterError::InvalidSetting { .. })
        ));
    }

    #[test]
    fn test_capability_display() {
        assert_eq!(Capability::ExternalSystem.to_string(), "ExternalSystemAdapter");
        assert_eq!(Capability::ProcessModel.to_string(), "ProcessModelAdapter");
    }
}
