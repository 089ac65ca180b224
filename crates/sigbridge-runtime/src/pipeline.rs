//! Transfer pipeline construction and execution.
//!
//! A [`TransferPipeline`] is built once from the catalog, both adapters and the
//! pipeline configuration. Each call to [`TransferPipeline::run_cycle`] performs
//! one bidirectional pass:
//!
//! ```text
//! external-first:  external ──read──▶ model (write)   then   model ──read──▶ external (write)
//! model-first:     model ──read──▶ external (write)   then   external ──read──▶ model (write)
//!                  followed by model.advance() when enabled
//! ```

use std::collections::HashSet;

use sigbridge_core::{
    Sample, SharedExternalSystemAdapter, SharedProcessModelAdapter, Signal, SignalCatalog,
    SignalId,
};
use tracing::{debug, instrument, trace};

use crate::config::{PipelineConfig, TransferOrder};
use crate::error::{CycleError, PipelineBuildError};

const STAGE_TO_MODEL: &str = "external-to-model";
const STAGE_TO_EXTERNAL: &str = "model-to-external";
const STAGE_ADVANCE: &str = "advance-model";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StageKind {
    /// Read from the external system, write to the process model.
    ToProcessModel,
    /// Read from the process model, write to the external system.
    ToExternalSystem,
    AdvanceModel,
}

/// Builds a [`TransferPipeline`].
pub struct PipelineBuilder;

impl PipelineBuilder {
    /// Binds catalog and adapters into a pipeline.
    ///
    /// Deterministic: identical inputs produce identical stage layouts. Fails if
    /// `config` names a signal the catalog lacks, names one twice, or sets an
    /// out-of-range parameter.
    pub fn build(
        catalog: &SignalCatalog,
        external: SharedExternalSystemAdapter,
        model: SharedProcessModelAdapter,
        config: &PipelineConfig,
    ) -> Result<TransferPipeline, PipelineBuildError> {
        if config.batch_size == 0 {
            return Err(PipelineBuildError::InvalidParameter {
                name: "batch_size",
                reason: "must be greater than 0".into(),
            });
        }

        let mut excluded = HashSet::with_capacity(config.exclude.len());
        for id in &config.exclude {
            if !catalog.contains(id) {
                return Err(PipelineBuildError::UnknownSignal(id.clone()));
            }
            if !excluded.insert(id.as_str()) {
                return Err(PipelineBuildError::DuplicateReference(id.clone()));
            }
        }

        let select = |signals: &[Signal]| -> Vec<SignalId> {
            signals
                .iter()
                .filter(|s| !excluded.contains(s.id.as_str()))
                .map(|s| s.id.clone())
                .collect()
        };
        let external_bound = select(catalog.to_external_system());
        let process_model_bound = select(catalog.to_process_model());

        let mut stages = match config.order {
            TransferOrder::ExternalFirst => {
                vec![StageKind::ToProcessModel, StageKind::ToExternalSystem]
            }
            TransferOrder::ModelFirst => {
                vec![StageKind::ToExternalSystem, StageKind::ToProcessModel]
            }
        };
        if config.advance_model {
            stages.push(StageKind::AdvanceModel);
        }

        debug!(
            external_bound = external_bound.len(),
            process_model_bound = process_model_bound.len(),
            excluded = excluded.len(),
            order = ?config.order,
            "Transfer pipeline built"
        );

        Ok(TransferPipeline {
            external,
            model,
            stages,
            batch_size: config.batch_size,
            external_bound,
            process_model_bound,
        })
    }
}

/// Counters for one completed cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Samples written to the process model.
    pub to_process_model: usize,
    /// Samples written to the external system.
    pub to_external_system: usize,
}

impl CycleReport {
    pub fn total(&self) -> usize {
        self.to_process_model + self.to_external_system
    }
}

/// The bound, ordered transfer operation.
pub struct TransferPipeline {
    external: SharedExternalSystemAdapter,
    model: SharedProcessModelAdapter,
    stages: Vec<StageKind>,
    batch_size: usize,
    external_bound: Vec<SignalId>,
    process_model_bound: Vec<SignalId>,
}

impl TransferPipeline {
    /// Signals written to the external system each cycle, in catalog order.
    pub fn external_bound(&self) -> &[SignalId] {
        &self.external_bound
    }

    /// Signals written to the process model each cycle, in catalog order.
    pub fn process_model_bound(&self) -> &[SignalId] {
        &self.process_model_bound
    }

    /// Performs one full bidirectional transfer pass.
    #[instrument(name = "transfer_cycle", skip_all)]
    pub async fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        let mut report = CycleReport::default();

        for stage in &self.stages {
            match stage {
                StageKind::ToProcessModel => {
                    report.to_process_model += self.to_process_model().await?;
                }
                StageKind::ToExternalSystem => {
                    report.to_external_system += self.to_external_system().await?;
                }
                StageKind::AdvanceModel => {
                    self.model
                        .advance()
                        .await
                        .map_err(|e| CycleError::from_adapter(STAGE_ADVANCE, e))?;
                }
            }
        }

        trace!(
            to_process_model = report.to_process_model,
            to_external_system = report.to_external_system,
            "Cycle complete"
        );
        Ok(report)
    }

    async fn to_process_model(&self) -> Result<usize, CycleError> {
        let mut moved = 0;
        for batch in self.process_model_bound.chunks(self.batch_size) {
            let samples = self
                .external
                .read(batch)
                .await
                .map_err(|e| CycleError::from_adapter(STAGE_TO_MODEL, e))?;
            check_requested(STAGE_TO_MODEL, batch, &samples)?;
            self.model
                .write(&samples)
                .await
                .map_err(|e| CycleError::from_adapter(STAGE_TO_MODEL, e))?;
            moved += samples.len();
        }
        Ok(moved)
    }

    async fn to_external_system(&self) -> Result<usize, CycleError> {
        let mut moved = 0;
        for batch in self.external_bound.chunks(self.batch_size) {
            let samples = self
                .model
                .read(batch)
                .await
                .map_err(|e| CycleError::from_adapter(STAGE_TO_EXTERNAL, e))?;
            check_requested(STAGE_TO_EXTERNAL, batch, &samples)?;
            self.external
                .write(&samples)
                .await
                .map_err(|e| CycleError::from_adapter(STAGE_TO_EXTERNAL, e))?;
            moved += samples.len();
        }
        Ok(moved)
    }
}

fn check_requested(
    stage: &'static str,
    batch: &[SignalId],
    samples: &[Sample],
) -> Result<(), CycleError> {
    match samples.iter().find(|s| !batch.contains(&s.signal)) {
        Some(sample) => Err(CycleError::unexpected_sample(stage, &sample.signal)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, FakeAdapter, Journal};
    use sigbridge_core::{AdapterError, DataType, Direction};
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    fn adapters() -> (FakeAdapter, FakeAdapter) {
        let journal = Journal::default();
        (
            FakeAdapter::new("plant", &journal),
            FakeAdapter::new("model", &journal),
        )
    }

    fn build(
        catalog: &SignalCatalog,
        plant: &FakeAdapter,
        model: &FakeAdapter,
        config: &PipelineConfig,
    ) -> Result<TransferPipeline, PipelineBuildError> {
        PipelineBuilder::build(
            catalog,
            Arc::new(plant.clone()),
            Arc::new(model.clone()),
            config,
        )
    }

    #[test]
    fn test_bound_subsets_follow_directions() {
        let (plant, model) = adapters();
        let pipeline = build(
            &testing::catalog(),
            &plant,
            &model,
            &PipelineConfig::default(),
        )
        .unwrap();

        assert_eq!(pipeline.external_bound(), [SignalId::from("A")]);
        assert_eq!(pipeline.process_model_bound(), [SignalId::from("B")]);
    }

    #[test]
    fn test_build_is_deterministic() {
        let catalog = SignalCatalog::new(
            (0..10)
                .map(|i| {
                    let direction = if i % 3 == 0 {
                        Direction::ToExternalSystem
                    } else {
                        Direction::ToProcessModel
                    };
                    Signal::new(format!("s{i}"), direction, DataType::Integer)
                })
                .collect(),
        )
        .unwrap();
        let (plant, model) = adapters();
        let config = PipelineConfig {
            exclude: vec!["s4".into()],
            ..Default::default()
        };

        let first = build(&catalog, &plant, &model, &config).unwrap();
        let second = build(&catalog, &plant, &model, &config).unwrap();
        assert_eq!(first.external_bound(), second.external_bound());
        assert_eq!(first.process_model_bound(), second.process_model_bound());
        assert_eq!(first.stages, second.stages);
        assert!(!first.process_model_bound().contains(&SignalId::from("s4")));
    }

    #[test]
    fn test_unknown_excluded_signal() {
        let (plant, model) = adapters();
        let config = PipelineConfig {
            exclude: vec!["C".into()],
            ..Default::default()
        };
        let err = build(&testing::catalog(), &plant, &model, &config)
            .err()
            .unwrap();
        assert_eq!(err, PipelineBuildError::UnknownSignal("C".into()));
    }

    #[test]
    fn test_duplicate_excluded_signal() {
        let (plant, model) = adapters();
        let config = PipelineConfig {
            exclude: vec!["A".into(), "A".into()],
            ..Default::default()
        };
        let err = build(&testing::catalog(), &plant, &model, &config)
            .err()
            .unwrap();
        assert_eq!(err, PipelineBuildError::DuplicateReference("A".into()));
    }

    #[test]
    fn test_zero_batch_size() {
        let (plant, model) = adapters();
        let config = PipelineConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            build(&testing::catalog(), &plant, &model, &config),
            Err(PipelineBuildError::InvalidParameter { name: "batch_size", .. })
        ));
    }

    #[tokio::test]
    async fn test_run_cycle_moves_both_directions() {
        let (plant, model) = adapters();
        let pipeline = build(
            &testing::catalog(),
            &plant,
            &model,
            &PipelineConfig::default(),
        )
        .unwrap();

        let report = pipeline.run_cycle().await.unwrap();
        assert_eq!(report.to_process_model, 1);
        assert_eq!(report.to_external_system, 1);
        assert_eq!(report.total(), 2);

        assert_eq!(model.written_ids(), ["B"]);
        assert_eq!(plant.written_ids(), ["A"]);
        assert_eq!(model.state.advances.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_batches_respect_batch_size() {
        let catalog = SignalCatalog::new(
            (0..5)
                .map(|i| Signal::new(format!("m{i}"), Direction::ToProcessModel, DataType::Float))
                .collect(),
        )
        .unwrap();
        let (plant, model) = adapters();
        let config = PipelineConfig {
            batch_size: 2,
            advance_model: false,
            ..Default::default()
        };
        let pipeline = build(&catalog, &plant, &model, &config).unwrap();

        let report = pipeline.run_cycle().await.unwrap();
        assert_eq!(report.to_process_model, 5);
        // 3 batches towards the model, none towards the external system
        assert_eq!(plant.state.reads.load(Ordering::SeqCst), 3);
        assert_eq!(model.state.advances.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cycle_errors_are_classified() {
        let (plant, model) = adapters();
        let pipeline = build(
            &testing::catalog(),
            &plant,
            &model,
            &PipelineConfig::default(),
        )
        .unwrap();

        plant.push_read_error(AdapterError::transient("timeout"));
        let err = pipeline.run_cycle().await.unwrap_err();
        assert!(err.is_recoverable());

        plant.push_read_error(AdapterError::fault("device removed"));
        let err = pipeline.run_cycle().await.unwrap_err();
        assert!(matches!(err, CycleError::Fault(ref f) if f.stage == STAGE_TO_MODEL));
    }
}
