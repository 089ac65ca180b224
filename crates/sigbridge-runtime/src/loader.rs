//! Adapter loading: resolve a configured type name, construct, set up once.

use std::sync::Arc;

use sigbridge_core::{
    AdapterInstance, AdapterLoadError, AdapterRegistry, AdapterSettings, Capability,
    SharedExternalSystemAdapter, SharedProcessModelAdapter, Signal, SignalAdapter, SignalCatalog,
};
use tracing::{debug, info, warn};

use crate::config::SigbridgeConfig;
use crate::error::{RuntimeError, RuntimeResult};

/// What to load: a type name, its settings and the capability it must provide.
#[derive(Debug, Clone)]
pub struct AdapterDescriptor {
    pub type_name: String,
    pub settings: AdapterSettings,
    pub capability: Capability,
}

impl AdapterDescriptor {
    pub fn new(
        type_name: impl Into<String>,
        settings: AdapterSettings,
        capability: Capability,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            settings,
            capability,
        }
    }

    /// The configured external-system adapter.
    pub fn external_system(config: &SigbridgeConfig) -> Self {
        let type_name = &config.external_system.type_name;
        Self::new(
            type_name.clone(),
            config.adapter_settings(type_name),
            Capability::ExternalSystem,
        )
    }

    /// The configured process-model adapter.
    pub fn process_model(config: &SigbridgeConfig) -> Self {
        let type_name = &config.process_model.type_name;
        Self::new(
            type_name.clone(),
            config.adapter_settings(type_name),
            Capability::ProcessModel,
        )
    }
}

/// An adapter that has completed setup.
#[derive(Clone)]
pub enum LoadedAdapter {
    ExternalSystem(SharedExternalSystemAdapter),
    ProcessModel(SharedProcessModelAdapter),
}

impl LoadedAdapter {
    pub fn capability(&self) -> Capability {
        match self {
            Self::ExternalSystem(_) => Capability::ExternalSystem,
            Self::ProcessModel(_) => Capability::ProcessModel,
        }
    }

    /// Releases the adapter, logging instead of returning a failure.
    pub async fn release(&self) {
        let result = match self {
            Self::ExternalSystem(adapter) => adapter.release().await,
            Self::ProcessModel(adapter) => adapter.release().await,
        };
        if let Err(e) = result {
            warn!(capability = %self.capability(), error = %e, "Adapter release failed");
        }
    }
}

/// Resolves adapters from a registry and runs their one-time setup.
#[derive(Debug, Clone)]
pub struct AdapterLoader {
    registry: Arc<AdapterRegistry>,
}

impl AdapterLoader {
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Constructs the adapter named by `descriptor` without setting it up.
    pub fn instantiate(&self, descriptor: &AdapterDescriptor) -> RuntimeResult<AdapterInstance> {
        debug!(
            adapter = %descriptor.type_name,
            capability = %descriptor.capability,
            "Resolving adapter"
        );
        Ok(self
            .registry
            .instantiate(&descriptor.type_name, descriptor.capability)?)
    }

    /// Constructs and sets up the adapter named by `descriptor`.
    ///
    /// The adapter receives the catalog subset flowing towards its side as its
    /// own signals and the opposite subset as its peer's. If setup fails the
    /// adapter is released and dropped before the error is returned.
    pub async fn load(
        &self,
        descriptor: &AdapterDescriptor,
        catalog: &SignalCatalog,
    ) -> RuntimeResult<LoadedAdapter> {
        let loaded = match self.instantiate(descriptor)? {
            AdapterInstance::ExternalSystem(mut adapter) => {
                setup(
                    adapter.as_mut(),
                    descriptor,
                    catalog.to_external_system(),
                    catalog.to_process_model(),
                )
                .await?;
                LoadedAdapter::ExternalSystem(Arc::from(adapter))
            }
            AdapterInstance::ProcessModel(mut adapter) => {
                setup(
                    adapter.as_mut(),
                    descriptor,
                    catalog.to_process_model(),
                    catalog.to_external_system(),
                )
                .await?;
                LoadedAdapter::ProcessModel(Arc::from(adapter))
            }
        };

        info!(
            adapter = %descriptor.type_name,
            capability = %descriptor.capability,
            "Adapter ready"
        );
        Ok(loaded)
    }

    /// Loads the configured external-system adapter.
    pub async fn load_external_system(
        &self,
        config: &SigbridgeConfig,
        catalog: &SignalCatalog,
    ) -> RuntimeResult<SharedExternalSystemAdapter> {
        let descriptor = AdapterDescriptor::external_system(config);
        match self.load(&descriptor, catalog).await? {
            LoadedAdapter::ExternalSystem(adapter) => Ok(adapter),
            other => Err(mismatch(&descriptor, other).await),
        }
    }

    /// Loads the configured process-model adapter.
    pub async fn load_process_model(
        &self,
        config: &SigbridgeConfig,
        catalog: &SignalCatalog,
    ) -> RuntimeResult<SharedProcessModelAdapter> {
        let descriptor = AdapterDescriptor::process_model(config);
        match self.load(&descriptor, catalog).await? {
            LoadedAdapter::ProcessModel(adapter) => Ok(adapter),
            other => Err(mismatch(&descriptor, other).await),
        }
    }
}

async fn setup<A>(
    adapter: &mut A,
    descriptor: &AdapterDescriptor,
    own: &[Signal],
    peer: &[Signal],
) -> RuntimeResult<()>
where
    A: SignalAdapter + ?Sized,
{
    debug!(
        adapter = %descriptor.type_name,
        own = own.len(),
        peer = peer.len(),
        "Setting up adapter"
    );

    if let Err(source) = adapter.setup(own, peer, &descriptor.settings).await {
        if let Err(e) = adapter.release().await {
            warn!(
                adapter = %descriptor.type_name,
                error = %e,
                "Release after failed setup also failed"
            );
        }
        return Err(RuntimeError::AdapterSetup {
            type_name: descriptor.type_name.clone(),
            capability: descriptor.capability,
            source,
        });
    }
    Ok(())
}

async fn mismatch(descriptor: &AdapterDescriptor, loaded: LoadedAdapter) -> RuntimeError {
    loaded.release().await;
    AdapterLoadError::CapabilityMismatch {
        name: descriptor.type_name.clone(),
        requested: descriptor.capability,
        available: loaded.capability(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdapterSelection;
    use crate::testing::{self, FakeAdapter, Journal};
    use sigbridge_core::SignalId;
    use std::sync::atomic::Ordering;

    fn config() -> SigbridgeConfig {
        let mut config = SigbridgeConfig {
            external_system: AdapterSelection::new("fake-plant"),
            process_model: AdapterSelection::new("fake-model"),
            ..Default::default()
        };
        config.adapters.insert(
            "fake-plant".into(),
            AdapterSettings::new().with("endpoint", "opc.tcp://plant:4840"),
        );
        config
    }

    fn ids(ids: &[SignalId]) -> Vec<&str> {
        ids.iter().map(SignalId::as_str).collect()
    }

    #[tokio::test]
    async fn test_setup_receives_own_and_peer_subsets() {
        let journal = Journal::default();
        let plant = FakeAdapter::new("plant", &journal);
        let model = FakeAdapter::new("model", &journal);
        let loader = AdapterLoader::new(Arc::new(testing::registry(&plant, &model)));
        let catalog = testing::catalog();

        let external = loader.load_external_system(&config(), &catalog).await.unwrap();
        let process = loader.load_process_model(&config(), &catalog).await.unwrap();

        assert_eq!(external.software_info().name, "plant");
        assert_eq!(process.software_info().name, "model");

        assert_eq!(ids(&plant.state.own.lock()), ["A"]);
        assert_eq!(ids(&plant.state.peer.lock()), ["B"]);
        assert_eq!(ids(&model.state.own.lock()), ["B"]);
        assert_eq!(ids(&model.state.peer.lock()), ["A"]);

        assert_eq!(plant.state.setups.load(Ordering::SeqCst), 1);
        assert_eq!(model.state.setups.load(Ordering::SeqCst), 1);

        let settings = plant.state.settings.lock().clone().unwrap();
        assert_eq!(settings.get_str("endpoint"), Some("opc.tcp://plant:4840"));
        assert!(model.state.settings.lock().as_ref().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_setup_failure_releases_adapter() {
        let journal = Journal::default();
        let plant = FakeAdapter::new("plant", &journal).fail_setup();
        let model = FakeAdapter::new("model", &journal);
        let loader = AdapterLoader::new(Arc::new(testing::registry(&plant, &model)));

        let err = loader
            .load_external_system(&config(), &testing::catalog())
            .await
            .err()
            .unwrap();

        assert!(matches!(
            err,
            RuntimeError::AdapterSetup { ref type_name, capability: Capability::ExternalSystem, .. }
                if type_name == "fake-plant"
        ));
        assert_eq!(journal.entries(), ["plant:setup", "plant:release"]);
    }

    #[tokio::test]
    async fn test_unknown_type_name() {
        let journal = Journal::default();
        let plant = FakeAdapter::new("plant", &journal);
        let model = FakeAdapter::new("model", &journal);
        let loader = AdapterLoader::new(Arc::new(testing::registry(&plant, &model)));

        let mut config = config();
        config.process_model = AdapterSelection::new("simulink");

        let err = loader
            .load_process_model(&config, &testing::catalog())
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            RuntimeError::AdapterLoad(AdapterLoadError::Unresolved { ref name }) if name == "simulink"
        ));
        assert!(journal.entries().is_empty());
    }

    #[tokio::test]
    async fn test_capability_mismatch_constructs_nothing() {
        let journal = Journal::default();
        let plant = FakeAdapter::new("plant", &journal);
        let model = FakeAdapter::new("model", &journal);
        let loader = AdapterLoader::new(Arc::new(testing::registry(&plant, &model)));

        // "fake-plant" only provides the external-system capability.
        let mut config = config();
        config.process_model = AdapterSelection::new("fake-plant");

        let err = loader
            .load_process_model(&config, &testing::catalog())
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            RuntimeError::AdapterLoad(AdapterLoadError::CapabilityMismatch { .. })
        ));
        assert_eq!(plant.state.setups.load(Ordering::SeqCst), 0);
    }
}
