//! Process-wide bootstrap and teardown.
//!
//! The [`Supervisor`] sequences everything needed for a running bridge:
//!
//! ```text
//! load config ─▶ parse catalog ─▶ external-system adapter ─▶ process-model adapter
//!             ─▶ build pipeline ─▶ construct executive ─▶ executive.start() ─▶ management
//! ```
//!
//! Any failing step aborts the rest, releases what was already acquired and is
//! returned to the caller. Executive and version info are published only after
//! the whole sequence succeeded.
//!
//! The process entry point owns the supervisor; tests build one directly with
//! [`Supervisor::with_registry`] and fake adapters.

use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use sigbridge_core::{AdapterRegistry, ExecutiveStatus, StatusSource, VersionInfo};
use sigbridge_management::{LogDirectory, LogFileInfo, ManagementHandle};
use tracing::{error, info, warn};

use crate::catalog;
use crate::config::{ConfigLoader, SigbridgeConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::executive::{ExecutiveView, IntegrationExecutive};
use crate::loader::{AdapterLoader, LoadedAdapter};
use crate::logging;
use crate::pipeline::PipelineBuilder;

/// Everything a successful start produced.
struct Deployment {
    executive: Arc<IntegrationExecutive>,
    management: Mutex<Option<ManagementHandle>>,
    management_addr: SocketAddr,
    logs: LogDirectory,
}

enum Phase {
    Idle,
    Starting,
    Started(Arc<Deployment>),
    Stopping,
}

impl Phase {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Started(_) => "started",
            Self::Stopping => "stopping",
        }
    }
}

/// Coordinates bootstrap and teardown of one bridge.
pub struct Supervisor {
    config: ConfigLoader,
    registry: Arc<AdapterRegistry>,
    phase: Mutex<Phase>,
    /// Kept across `stop()` until the next successful start replaces it.
    version: Mutex<Option<Arc<VersionInfo>>>,
}

impl Supervisor {
    /// Creates a supervisor resolving adapters from every `#[register_adapter]`
    /// linked into the binary.
    pub fn new(config: ConfigLoader) -> Self {
        Self::with_registry(config, AdapterRegistry::collect_all())
    }

    /// Creates a supervisor with an explicit adapter registry.
    pub fn with_registry(config: ConfigLoader, registry: AdapterRegistry) -> Self {
        Self {
            config,
            registry: Arc::new(registry),
            phase: Mutex::new(Phase::Idle),
            version: Mutex::new(None),
        }
    }

    /// Runs the bootstrap sequence and serves management on `port`.
    ///
    /// Returns once the executive is running and the management endpoint is
    /// listening. Fails with [`RuntimeError::IllegalState`] if already started
    /// or starting; any other failure leaves nothing running.
    pub async fn start(&self, port: u16) -> RuntimeResult<()> {
        {
            let mut phase = self.phase.lock();
            if !matches!(*phase, Phase::Idle) {
                return Err(RuntimeError::illegal_state(format!(
                    "supervisor is already {}",
                    phase.as_str()
                )));
            }
            *phase = Phase::Starting;
        }

        match self.bootstrap(port).await {
            Ok(deployment) => {
                info!(
                    management = %deployment.management_addr,
                    "sigbridge started"
                );
                *self.version.lock() = deployment.executive.version_info();
                *self.phase.lock() = Phase::Started(Arc::new(deployment));
                Ok(())
            }
            Err(e) => {
                // Config errors surface before the configured subscriber exists.
                logging::init_fallback();
                error!(severity = "fatal", error = %e, "sigbridge failed to start");
                *self.phase.lock() = Phase::Idle;
                Err(e)
            }
        }
    }

    async fn bootstrap(&self, port: u16) -> RuntimeResult<Deployment> {
        let config = self.config.load()?;
        validate_config(&config)?;
        logging::init_from_config(&config.logging);
        info!(port, catalog = %config.catalog.path.display(), "Bootstrapping sigbridge");

        let catalog = catalog::load(&config.catalog.path)?;

        let loader = AdapterLoader::new(self.registry.clone());
        let external = loader.load_external_system(&config, &catalog).await?;
        let model = match loader.load_process_model(&config, &catalog).await {
            Ok(model) => model,
            Err(e) => {
                LoadedAdapter::ExternalSystem(external).release().await;
                return Err(e);
            }
        };

        let pipeline = match PipelineBuilder::build(
            &catalog,
            external.clone(),
            model.clone(),
            &config.pipeline,
        ) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                LoadedAdapter::ProcessModel(model).release().await;
                LoadedAdapter::ExternalSystem(external).release().await;
                return Err(e.into());
            }
        };

        let executive = Arc::new(IntegrationExecutive::new(
            external,
            model,
            pipeline,
            config.executive.clone(),
        ));
        executive.start().await?;

        let logs = log_directory(&config);
        let addr = format!("{}:{port}", config.management.host);
        let status = Arc::new(ExecutiveView::new(executive.clone()));
        let management = match sigbridge_management::serve(&addr, status, logs.clone()).await {
            Ok(handle) => handle,
            Err(e) => {
                if let Err(stop_err) = executive.stop().await {
                    warn!(error = %stop_err, "Executive stop after failed management start");
                }
                return Err(e.into());
            }
        };

        Ok(Deployment {
            executive,
            management_addr: management.local_addr(),
            management: Mutex::new(Some(management)),
            logs,
        })
    }

    /// Stops management, then the executive.
    ///
    /// Fails with [`RuntimeError::IllegalState`] if nothing is started. Teardown
    /// errors are logged; the supervisor always ends idle.
    pub async fn stop(&self) -> RuntimeResult<()> {
        let deployment = {
            let mut phase = self.phase.lock();
            match std::mem::replace(&mut *phase, Phase::Stopping) {
                Phase::Started(deployment) => deployment,
                other => {
                    let msg = format!("cannot stop, supervisor is {}", other.as_str());
                    *phase = other;
                    return Err(RuntimeError::illegal_state(msg));
                }
            }
        };

        info!("Stopping sigbridge");

        let management = deployment.management.lock().take();
        if let Some(handle) = management {
            handle.shutdown().await;
        }
        if let Err(e) = deployment.executive.stop().await {
            warn!(error = %e, "Executive did not stop cleanly");
        }

        *self.phase.lock() = Phase::Idle;
        info!("sigbridge stopped");
        Ok(())
    }

    fn deployment(&self) -> Option<Arc<Deployment>> {
        match &*self.phase.lock() {
            Phase::Started(deployment) => Some(deployment.clone()),
            _ => None,
        }
    }

    /// Read-only view of the running executive.
    pub fn executive(&self) -> Option<ExecutiveView> {
        self.deployment()
            .map(|d| ExecutiveView::new(d.executive.clone()))
    }

    /// Version snapshot of the last successful start; absent before the first.
    pub fn version_info(&self) -> Option<Arc<VersionInfo>> {
        self.version.lock().clone()
    }

    /// Address the management endpoint is bound to.
    pub fn management_addr(&self) -> Option<SocketAddr> {
        self.deployment().map(|d| d.management_addr)
    }

    /// Files in the configured log directory.
    pub async fn logfile_info(&self) -> RuntimeResult<Vec<LogFileInfo>> {
        Ok(self.logs()?.list().await?)
    }

    /// Contents of one file in the configured log directory.
    pub async fn logfile(&self, name: &str) -> RuntimeResult<Vec<u8>> {
        Ok(self.logs()?.open(name).await?)
    }

    fn logs(&self) -> RuntimeResult<LogDirectory> {
        match self.deployment() {
            Some(deployment) => Ok(deployment.logs.clone()),
            None => Ok(log_directory(&self.config.load()?)),
        }
    }
}

impl StatusSource for Supervisor {
    fn executive_status(&self) -> Option<ExecutiveStatus> {
        self.deployment().map(|d| d.executive.status())
    }

    fn version_info(&self) -> Option<Arc<VersionInfo>> {
        Supervisor::version_info(self)
    }
}

fn log_directory(config: &SigbridgeConfig) -> LogDirectory {
    LogDirectory::new(&config.logging.directory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AdapterSelection, CatalogConfig};
    use crate::testing::{self, FakeAdapter, Journal};
    use sigbridge_core::{CORE_NAME, CORE_VERSION, ExecutiveState};
    use sigbridge_management::ManagementError;
    use std::sync::atomic::Ordering;

    const SIGNALS: &str = r#"
[[signals]]
id = "A"
direction = "toExternalSystem"
data_type = "float"

[[signals]]
id = "B"
direction = "toProcessModel"
data_type = "float"
"#;

    struct Fixture {
        dir: tempfile::TempDir,
        journal: Journal,
        plant: FakeAdapter,
        model: FakeAdapter,
    }

    impl Fixture {
        fn new() -> Self {
            let journal = Journal::default();
            Self::with(
                FakeAdapter::new("plant", &journal),
                FakeAdapter::new("model", &journal),
                journal,
            )
        }

        fn with(plant: FakeAdapter, model: FakeAdapter, journal: Journal) -> Self {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join("signals.toml"), SIGNALS).unwrap();
            std::fs::create_dir(dir.path().join("logs")).unwrap();
            Self {
                dir,
                journal,
                plant,
                model,
            }
        }

        fn config(&self) -> SigbridgeConfig {
            let mut config = SigbridgeConfig {
                catalog: CatalogConfig {
                    path: self.dir.path().join("signals.toml"),
                },
                external_system: AdapterSelection::new("fake-plant"),
                process_model: AdapterSelection::new("fake-model"),
                ..Default::default()
            };
            config.executive.cycle_interval_ms = 10;
            config.logging.directory = self.dir.path().join("logs");
            config
        }

        fn supervisor_with(&self, config: SigbridgeConfig) -> Supervisor {
            let loader = ConfigLoader::new()
                .search_path(self.dir.path())
                .without_env()
                .merge(config);
            Supervisor::with_registry(loader, testing::registry(&self.plant, &self.model))
        }

        fn supervisor(&self) -> Supervisor {
            self.supervisor_with(self.config())
        }
    }

    #[tokio::test]
    async fn test_stop_before_start_is_rejected() {
        let fixture = Fixture::new();
        let supervisor = fixture.supervisor();

        let err = supervisor.stop().await.unwrap_err();
        assert!(matches!(err, RuntimeError::IllegalState(_)));
        assert!(supervisor.executive().is_none());
    }

    #[tokio::test]
    async fn test_start_publishes_version_info() {
        let fixture = Fixture::new();
        let supervisor = fixture.supervisor();
        assert!(supervisor.version_info().is_none());

        supervisor.start(0).await.unwrap();

        let version = supervisor.version_info().unwrap();
        assert_eq!(version.core.name, CORE_NAME);
        assert_eq!(version.core.version, CORE_VERSION);
        assert_eq!(version.external_system.name, "plant");
        assert_eq!(version.process_model.name, "model");

        let executive = supervisor.executive().unwrap();
        assert_eq!(executive.state(), ExecutiveState::Running);
        assert!(supervisor.management_addr().is_some());
        assert!(supervisor.executive_status().is_some());

        supervisor.stop().await.unwrap();
        assert_eq!(executive.state(), ExecutiveState::Stopped);
        assert!(supervisor.executive().is_none());
        assert!(Arc::ptr_eq(&version, &supervisor.version_info().unwrap()));
    }

    #[tokio::test]
    async fn test_second_start_leaves_first_untouched() {
        let fixture = Fixture::new();
        let supervisor = fixture.supervisor();
        supervisor.start(0).await.unwrap();
        let version = supervisor.version_info().unwrap();

        let err = supervisor.start(0).await.unwrap_err();
        assert!(matches!(err, RuntimeError::IllegalState(_)));

        assert_eq!(
            supervisor.executive().unwrap().state(),
            ExecutiveState::Running
        );
        assert!(Arc::ptr_eq(&version, &supervisor.version_info().unwrap()));
        assert_eq!(fixture.plant.state.setups.load(Ordering::SeqCst), 1);

        supervisor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_model_setup_failure_releases_external_adapter() {
        let journal = Journal::default();
        let fixture = Fixture::with(
            FakeAdapter::new("plant", &journal),
            FakeAdapter::new("model", &journal).fail_setup(),
            journal,
        );
        let supervisor = fixture.supervisor();

        let err = supervisor.start(0).await.unwrap_err();
        assert!(matches!(err, RuntimeError::AdapterSetup { .. }));
        assert_eq!(
            fixture.journal.entries(),
            ["plant:setup", "model:setup", "model:release", "plant:release"]
        );
        assert!(supervisor.executive().is_none());
        assert!(supervisor.version_info().is_none());
        assert!(matches!(
            supervisor.stop().await,
            Err(RuntimeError::IllegalState(_))
        ));
    }

    #[tokio::test]
    async fn test_pipeline_failure_releases_both_in_reverse() {
        let fixture = Fixture::new();
        let mut config = fixture.config();
        config.pipeline.exclude = vec!["C".into()];
        let supervisor = fixture.supervisor_with(config);

        let err = supervisor.start(0).await.unwrap_err();
        assert!(matches!(err, RuntimeError::PipelineBuild(_)));
        assert_eq!(
            fixture.journal.entries(),
            ["plant:setup", "model:setup", "model:release", "plant:release"]
        );
    }

    #[tokio::test]
    async fn test_missing_catalog_is_config_error() {
        let fixture = Fixture::new();
        let mut config = fixture.config();
        config.catalog.path = fixture.dir.path().join("absent.toml");
        let supervisor = fixture.supervisor_with(config);

        let err = supervisor.start(0).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Config(_)));
        assert!(fixture.journal.entries().is_empty());
    }

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_config_failure_is_logged_as_fatal() {
        let capture = Capture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer({
                let capture = capture.clone();
                move || capture.clone()
            })
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let fixture = Fixture::new();
        let loader = ConfigLoader::new()
            .file(fixture.dir.path().join("missing.toml"))
            .without_env();
        let supervisor =
            Supervisor::with_registry(loader, testing::registry(&fixture.plant, &fixture.model));

        let err = supervisor.start(0).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Config(_)));

        let output = String::from_utf8(capture.0.lock().clone()).unwrap();
        assert!(output.contains("sigbridge failed to start"), "{output}");
        assert!(output.contains("severity=\"fatal\""), "{output}");
    }

    #[tokio::test]
    async fn test_restart_after_stop_builds_new_executive() {
        let fixture = Fixture::new();
        let supervisor = fixture.supervisor();

        supervisor.start(0).await.unwrap();
        let first = supervisor.version_info().unwrap();
        supervisor.stop().await.unwrap();

        supervisor.start(0).await.unwrap();
        let second = supervisor.version_info().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(fixture.plant.state.setups.load(Ordering::SeqCst), 2);

        supervisor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_logfile_access() {
        let fixture = Fixture::new();
        std::fs::write(fixture.dir.path().join("logs").join("run.log"), [b'z'; 100]).unwrap();
        let supervisor = fixture.supervisor();

        let bytes = supervisor.logfile("run.log").await.unwrap();
        assert_eq!(bytes.len(), 100);

        let err = supervisor.logfile("missing.log").await.unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Management(ManagementError::NotFound(_))
        ));

        let files = supervisor.logfile_info().await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "run.log");
        assert_eq!(files[0].size, 100);
    }
}
