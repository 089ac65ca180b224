//! Layered loading of [`SigbridgeConfig`].
//!
//! TOML files are read with the default `toml-config` feature, YAML files
//! (`.yaml`, `.yml`) with `yaml-config`. Without an explicit file the loader
//! looks for `sigbridge.*` then `config.*` in each search directory.
//!
//! Later layers win:
//!
//! 1. Built-in defaults
//! 2. Profile-specific config file (`sigbridge.{profile}.toml`)
//! 3. Main config file (`sigbridge.toml` / `sigbridge.yaml`)
//! 4. Environment variables (`SIGBRIDGE_*`)
//! 5. Programmatic overrides
//!
//! Nested keys in the environment are separated by `__`:
//!
//! - `SIGBRIDGE_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `SIGBRIDGE_EXECUTIVE__CYCLE_INTERVAL_MS=250` → `executive.cycle_interval_ms = 250`
//! - `SIGBRIDGE_ADAPTERS__MEMORY__SEED=2` → `adapters.memory.seed = 2`
//!
//! # Example
//!
//! ```rust,ignore
//! use sigbridge_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .file("./deploy/sigbridge.toml")
//!     .profile("production")
//!     .load()?;
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::SigbridgeConfig;

/// File stems probed in each search directory, in order.
const FILE_STEMS: &[&str] = &["sigbridge", "config"];

/// Extensions of the enabled file formats, in order of preference.
const EXTENSIONS: &[&str] = &[
    #[cfg(feature = "toml-config")]
    "toml",
    #[cfg(feature = "yaml-config")]
    "yaml",
    #[cfg(feature = "yaml-config")]
    "yml",
];

/// Name of the deployment profile, e.g. `production` or `commissioning`.
///
/// `prod` and `dev` are accepted as aliases. Selects the optional
/// `sigbridge.{profile}.{ext}` file merged underneath the main file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile(String);

impl Profile {
    pub const DEVELOPMENT: &'static str = "development";
    pub const PRODUCTION: &'static str = "production";

    pub fn new(name: &str) -> Self {
        let name = name.trim().to_lowercase();
        Self(match name.as_str() {
            "prod" => Self::PRODUCTION.to_string(),
            "dev" | "" => Self::DEVELOPMENT.to_string(),
            _ => name,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reads `SIGBRIDGE_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var("SIGBRIDGE_PROFILE")
            .map(|p| Self::new(&p))
            .unwrap_or_default()
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self(Self::DEVELOPMENT.to_string())
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds a [`SigbridgeConfig`] from defaults, files, environment and
/// in-code overrides.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    explicit_file: Option<PathBuf>,
    search_paths: Vec<PathBuf>,
    profile: Profile,
    read_env: bool,
    overrides: Vec<SigbridgeConfig>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Profile from `SIGBRIDGE_PROFILE`, environment overrides enabled.
    pub fn new() -> Self {
        Self {
            explicit_file: None,
            search_paths: Vec::new(),
            profile: Profile::from_env(),
            read_env: true,
            overrides: Vec::new(),
        }
    }

    /// Overrides `SIGBRIDGE_PROFILE`.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Profile::new(&profile.into());
        self
    }

    /// Adds a directory to search. Once any is added the default
    /// directories are no longer searched.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    pub fn with_current_dir(self) -> Self {
        match std::env::current_dir() {
            Ok(cwd) => self.search_path(cwd),
            Err(_) => self,
        }
    }

    /// Loads exactly this file; it must exist.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.explicit_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self) -> Self {
        self.read_env = true;
        self
    }

    /// Ignores `SIGBRIDGE_*` variables. Tests use this.
    pub fn without_env(mut self) -> Self {
        self.read_env = false;
        self
    }

    /// Layers `config` over everything else.
    pub fn merge(mut self, config: SigbridgeConfig) -> Self {
        self.overrides.push(config);
        self
    }

    /// Reads all layers. Takes `&self` so a supervisor can reload on every
    /// start.
    pub fn load(&self) -> ConfigResult<SigbridgeConfig> {
        let config: SigbridgeConfig = self
            .layers()?
            .extract()
            .map_err(|e| ConfigError::malformed("configuration", e))?;

        debug!(
            profile = %self.profile,
            logging_level = %config.logging.level,
            external_system = %config.external_system.type_name,
            process_model = %config.process_model.type_name,
            "Configuration loaded"
        );

        Ok(config)
    }

    fn layers(&self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(SigbridgeConfig::default()));

        let main_file = match &self.explicit_file {
            Some(path) if !path.exists() => {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            Some(path) => Some(path.clone()),
            None => self.discover(),
        };

        match &main_file {
            Some(path) => {
                if let Some(profile_file) = self.profile_variant(path) {
                    debug!(path = %profile_file.display(), "Loading profile configuration");
                    figment = merge_config_file(figment, &profile_file)?;
                }
                info!(path = %path.display(), "Loading configuration file");
                figment = merge_config_file(figment, path)?;
            }
            None => warn!(
                paths = ?self.search_directories(),
                "No configuration file found, using defaults"
            ),
        }

        if self.read_env {
            trace!("Reading SIGBRIDGE_ environment overrides");
            figment = figment.merge(Env::prefixed("SIGBRIDGE_").split("__"));
        }

        for config in &self.overrides {
            figment = figment.merge(Serialized::defaults(config.clone()));
        }

        Ok(figment)
    }

    /// Explicit search paths, or the working directory and the user
    /// configuration directory.
    fn search_directories(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        std::env::current_dir()
            .ok()
            .into_iter()
            .chain(dirs::config_dir().map(|dir| dir.join("sigbridge")))
            .collect()
    }

    /// First `{stem}.{ext}` found, searching directories in order.
    fn discover(&self) -> Option<PathBuf> {
        self.search_directories().into_iter().find_map(|dir| {
            FILE_STEMS.iter().find_map(|stem| {
                EXTENSIONS
                    .iter()
                    .map(|ext| dir.join(format!("{stem}.{ext}")))
                    .find(|path| path.is_file())
            })
        })
    }

    /// `sigbridge.production.toml` next to `sigbridge.toml`, if it exists.
    fn profile_variant(&self, main_file: &Path) -> Option<PathBuf> {
        let stem = main_file.file_stem()?.to_str()?;
        let ext = main_file.extension()?.to_str()?;
        let candidate = main_file.with_file_name(format!("{stem}.{}.{ext}", self.profile));
        candidate.is_file().then_some(candidate)
    }
}

/// Layers `path` over `figment`, choosing the format by extension.
///
/// The catalog loader uses this too, so both files accept the same formats.
pub(crate) fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        #[cfg(feature = "toml-config")]
        "toml" => Ok(figment.merge(Toml::file(path))),
        #[cfg(feature = "yaml-config")]
        "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
        _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AdapterSelection, LogLevel};
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigLoader::new()
            .search_path(dir.path())
            .without_env()
            .load()
            .unwrap();

        assert_eq!(config.logging.level.as_str(), "info");
        assert_eq!(config.executive.cycle_interval_ms, 1000);
        assert_eq!(config.pipeline.batch_size, 64);
    }

    #[test]
    fn test_missing_explicit_file() {
        let result = ConfigLoader::new()
            .file("/definitely/not/here/sigbridge.toml")
            .without_env()
            .load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_load_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[catalog]
path = "plant/signals.toml"

[external_system]
type = "opcua"

[process_model]
type = "fmu"

[adapters.opcua]
endpoint = "opc.tcp://plant:4840"
timeout_ms = 500

[executive]
cycle_interval_ms = 250
retry = {{ max_attempts = 3, delay_ms = 20 }}

[logging]
level = "debug"
"#
        )
        .unwrap();

        let config = ConfigLoader::new()
            .file(file.path())
            .without_env()
            .load()
            .unwrap();

        assert_eq!(config.catalog.path, PathBuf::from("plant/signals.toml"));
        assert_eq!(config.external_system, AdapterSelection::new("opcua"));
        assert_eq!(config.process_model.type_name, "fmu");
        assert_eq!(config.executive.cycle_interval_ms, 250);
        assert_eq!(config.executive.retry.max_attempts, 3);
        assert_eq!(config.logging.level, LogLevel::Debug);

        let settings = config.adapter_settings("opcua");
        assert_eq!(settings.get_str("endpoint"), Some("opc.tcp://plant:4840"));
        assert_eq!(settings.get_u64("timeout_ms"), Some(500));
        assert!(config.adapter_settings("fmu").is_empty());
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let result = ConfigLoader::new().file(file.path()).without_env().load();
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(ext)) if ext == "ini"));
    }

    #[test]
    fn test_programmatic_merge_wins() {
        let dir = tempfile::tempdir().unwrap();
        let mut overrides = SigbridgeConfig::default();
        overrides.external_system = AdapterSelection::new("memory");
        overrides.executive.cycle_interval_ms = 5;

        let config = ConfigLoader::new()
            .search_path(dir.path())
            .without_env()
            .merge(overrides)
            .load()
            .unwrap();

        assert_eq!(config.external_system.type_name, "memory");
        assert_eq!(config.executive.cycle_interval_ms, 5);
    }

    #[test]
    fn test_profile_aliases() {
        assert_eq!(Profile::new("prod").as_str(), Profile::PRODUCTION);
        assert_eq!(Profile::new("DEV").as_str(), Profile::DEVELOPMENT);
        assert_eq!(Profile::new(" Commissioning ").as_str(), "commissioning");
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_discovery_with_profile_variant() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("sigbridge.toml"),
            "[executive]\ncycle_interval_ms = 200\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("sigbridge.commissioning.toml"),
            "[executive]\ncycle_interval_ms = 50\nmax_consecutive_failures = 4\n",
        )
        .unwrap();

        let config = ConfigLoader::new()
            .search_path(dir.path())
            .profile("commissioning")
            .without_env()
            .load()
            .unwrap();

        // The main file is merged over the profile file.
        assert_eq!(config.executive.cycle_interval_ms, 200);
        assert_eq!(config.executive.max_consecutive_failures, 4);
    }
}
