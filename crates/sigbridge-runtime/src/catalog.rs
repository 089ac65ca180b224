//! Loading the signal-exchange specification into a [`SignalCatalog`].
//!
//! The specification is a TOML (or, with `yaml-config`, YAML) file listing every
//! signal:
//!
//! ```toml
//! [[signals]]
//! id = "tank_level"
//! direction = "toProcessModel"
//! data_type = "float"
//! display_name = "Tank level"
//! scale = { min = 0.0, max = 12.5, unit = "m" }
//!
//! [[signals]]
//! id = "inlet_valve"
//! direction = "toExternalSystem"
//! data_type = "boolean"
//! ```

use std::path::Path;

use figment::Figment;
use serde::Deserialize;
use sigbridge_core::{
    CatalogViolation, DataType, Direction, EngineeringScale, Signal, SignalCatalog, SignalId,
};
use tracing::{debug, info, warn};

use crate::config::ConfigError;
use crate::config::loader::merge_config_file;
use crate::error::RuntimeResult;

#[derive(Debug, Deserialize)]
struct SpecificationDocument {
    #[serde(default)]
    signals: Vec<SignalEntry>,
}

#[derive(Debug, Deserialize)]
struct SignalEntry {
    id: String,
    // Optional here so a missing direction is reported as a catalog violation
    // rather than a parse error.
    #[serde(default)]
    direction: Option<Direction>,
    data_type: DataType,
    #[serde(default)]
    scale: Option<EngineeringScale>,
    #[serde(default)]
    display_name: Option<String>,
}

/// Loads and validates the specification at `path`.
///
/// Fails with [`RuntimeError::Config`](crate::RuntimeError::Config) when the file
/// is missing or malformed, and with
/// [`RuntimeError::Validation`](crate::RuntimeError::Validation) when ids repeat
/// or a signal has no direction.
pub fn load(path: &Path) -> RuntimeResult<SignalCatalog> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()).into());
    }

    let figment = merge_config_file(Figment::new(), path)?;
    let document: SpecificationDocument = figment.extract().map_err(|e| {
        ConfigError::malformed(format!("signal specification {}", path.display()), e)
    })?;

    let catalog = build(document.signals)?;

    if catalog.is_empty() {
        warn!(path = %path.display(), "Signal specification declares no signals");
    }
    info!(
        path = %path.display(),
        signals = catalog.len(),
        to_external_system = catalog.to_external_system().len(),
        to_process_model = catalog.to_process_model().len(),
        "Signal catalog loaded"
    );

    Ok(catalog)
}

fn build(entries: Vec<SignalEntry>) -> Result<SignalCatalog, CatalogViolation> {
    let mut signals = Vec::with_capacity(entries.len());

    for entry in entries {
        let id = SignalId::new(entry.id);
        let direction = entry
            .direction
            .ok_or_else(|| CatalogViolation::MissingDirection(id.clone()))?;

        let mut signal = Signal::new(id, direction, entry.data_type);
        if let Some(name) = entry.display_name {
            signal = signal.with_display_name(name);
        }
        if let Some(scale) = entry.scale {
            signal = signal.with_scale(scale);
        }
        debug!(signal = %signal.id, direction = %signal.direction, "Parsed signal");
        signals.push(signal);
    }

    SignalCatalog::new(signals)
}

#[cfg(all(test, feature = "toml-config"))]
mod tests {
    use super::*;
    use crate::error::RuntimeError;
    use std::io::Write;

    fn spec(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_partitions_by_direction() {
        let file = spec(
            r#"
[[signals]]
id = "A"
direction = "toExternalSystem"
data_type = "float"

[[signals]]
id = "B"
direction = "toProcessModel"
data_type = "integer"
display_name = "Pump speed"
scale = { min = 0.0, max = 3000.0, unit = "rpm" }
"#,
        );

        let catalog = load(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.to_external_system()[0].id.as_str(), "A");
        assert_eq!(catalog.to_process_model()[0].id.as_str(), "B");

        let b = catalog.get("B").unwrap();
        assert_eq!(b.display_name, "Pump speed");
        assert_eq!(b.data_type, DataType::Integer);
        assert_eq!(b.scale.as_ref().unwrap().unit.as_deref(), Some("rpm"));
        assert_eq!(catalog.get("A").unwrap().display_name, "A");
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = load(Path::new("/no/such/signals.toml"));
        assert!(matches!(
            result,
            Err(RuntimeError::Config(ConfigError::FileNotFound(_)))
        ));
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let file = spec("[[signals]]\nid = \"A\"\ndirection = \"toExternalSystem\"\n");
        assert!(matches!(
            load(file.path()),
            Err(RuntimeError::Config(ConfigError::Malformed { .. }))
        ));

        let file = spec("signals = [ this is not toml");
        assert!(matches!(load(file.path()), Err(RuntimeError::Config(_))));
    }

    #[test]
    fn test_duplicate_id_is_validation_error() {
        let file = spec(
            r#"
[[signals]]
id = "A"
direction = "toExternalSystem"
data_type = "float"

[[signals]]
id = "A"
direction = "toProcessModel"
data_type = "float"
"#,
        );
        assert!(matches!(
            load(file.path()),
            Err(RuntimeError::Validation(CatalogViolation::DuplicateId(_)))
        ));
    }

    #[test]
    fn test_missing_direction_is_validation_error() {
        let file = spec(
            r#"
[[signals]]
id = "A"
data_type = "boolean"
"#,
        );
        assert!(matches!(
            load(file.path()),
            Err(RuntimeError::Validation(CatalogViolation::MissingDirection(id))) if id.as_str() == "A"
        ));
    }
}
