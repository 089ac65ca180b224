//! Signal model and the immutable signal catalog.
//!
//! A [`SignalCatalog`] is built once from the signal-exchange specification and is
//! read-only afterwards. Cloning a catalog is cheap; every clone shares the same
//! underlying signal table, so it can be handed to the adapters, the pipeline and
//! the executive without synchronization.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CatalogViolation;

// =============================================================================
// Signal
// =============================================================================

/// Unique identifier of a signal inside a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalId(String);

impl SignalId {
    /// Creates a signal id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SignalId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SignalId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::borrow::Borrow<str> for SignalId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Which side of the bridge a signal flows towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Produced by the process model, consumed by the external system.
    #[serde(rename = "toExternalSystem")]
    ToExternalSystem,
    /// Produced by the external system, consumed by the process model.
    #[serde(rename = "toProcessModel")]
    ToProcessModel,
}

impl Direction {
    /// Returns the name used in signal-exchange specification files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ToExternalSystem => "toExternalSystem",
            Self::ToProcessModel => "toProcessModel",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared data type of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Boolean,
    Integer,
    Float,
    Text,
}

/// Engineering range attached to analog signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineeringScale {
    pub min: f64,
    pub max: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// A named data point exchanged between the two sides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: SignalId,
    pub direction: Direction,
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<EngineeringScale>,
    pub display_name: String,
}

impl Signal {
    /// Creates a signal with no scale whose display name is its id.
    pub fn new(id: impl Into<SignalId>, direction: Direction, data_type: DataType) -> Self {
        let id = id.into();
        Self {
            display_name: id.to_string(),
            id,
            direction,
            data_type,
            scale: None,
        }
    }

    /// Sets the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Sets the engineering scale.
    pub fn with_scale(mut self, scale: EngineeringScale) -> Self {
        self.scale = Some(scale);
        self
    }
}

// =============================================================================
// Values
// =============================================================================

/// A single signal value as moved by the transfer pipeline.
///
/// Values are carried opaquely; conversion between representations is the
/// adapters' business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

/// A value tagged with the signal it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub signal: SignalId,
    pub value: SignalValue,
}

impl Sample {
    pub fn new(signal: impl Into<SignalId>, value: SignalValue) -> Self {
        Self {
            signal: signal.into(),
            value,
        }
    }
}

// =============================================================================
// SignalCatalog
// =============================================================================

#[derive(Debug)]
struct CatalogInner {
    signals: Vec<Signal>,
    to_external_system: Vec<Signal>,
    to_process_model: Vec<Signal>,
    index: HashMap<SignalId, usize>,
}

/// Ordered, immutable collection of signals.
///
/// Ids are unique and every signal belongs to exactly one of the two direction
/// views, so [`to_external_system`](Self::to_external_system) and
/// [`to_process_model`](Self::to_process_model) partition [`signals`](Self::signals).
#[derive(Debug, Clone)]
pub struct SignalCatalog {
    inner: Arc<CatalogInner>,
}

impl SignalCatalog {
    /// Builds a catalog, rejecting duplicate ids.
    pub fn new(signals: Vec<Signal>) -> Result<Self, CatalogViolation> {
        let mut index = HashMap::with_capacity(signals.len());
        for (position, signal) in signals.iter().enumerate() {
            if signal.id.as_str().trim().is_empty() {
                return Err(CatalogViolation::EmptyId { position });
            }
            if index.insert(signal.id.clone(), position).is_some() {
                return Err(CatalogViolation::DuplicateId(signal.id.clone()));
            }
        }

        let (to_external_system, to_process_model): (Vec<_>, Vec<_>) = signals
            .iter()
            .cloned()
            .partition(|s| s.direction == Direction::ToExternalSystem);

        Ok(Self {
            inner: Arc::new(CatalogInner {
                signals,
                to_external_system,
                to_process_model,
                index,
            }),
        })
    }

    /// All signals in declaration order.
    pub fn signals(&self) -> &[Signal] {
        &self.inner.signals
    }

    /// Signals flowing towards the external system, in declaration order.
    pub fn to_external_system(&self) -> &[Signal] {
        &self.inner.to_external_system
    }

    /// Signals flowing towards the process model, in declaration order.
    pub fn to_process_model(&self) -> &[Signal] {
        &self.inner.to_process_model
    }

    /// Signals flowing in the given direction.
    pub fn by_direction(&self, direction: Direction) -> &[Signal] {
        match direction {
            Direction::ToExternalSystem => self.to_external_system(),
            Direction::ToProcessModel => self.to_process_model(),
        }
    }

    /// Looks up a signal by id.
    pub fn get(&self, id: &str) -> Option<&Signal> {
        self.inner.index.get(id).map(|&i| &self.inner.signals[i])
    }

    /// Returns whether the catalog contains the given id.
    pub fn contains(&self, id: &str) -> bool {
        self.inner.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.signals.is_empty()
    }
}
