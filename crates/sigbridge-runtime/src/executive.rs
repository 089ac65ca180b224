//! The integration executive: owns both adapters and the pipeline and drives
//! the transfer loop on one background worker.
//!
//! # State machine
//!
//! ```text
//!            start()            adapters open
//! Stopped ───────────▶ Starting ───────────────────▶ Running
//!    ▲                    │ open failed                │  │ adapter fault
//!    │◀───────────────────┘                            │  ▼
//!    │               stop()                            │ Failed
//!    └──────────── Stopping ◀──────────────────────────┴──┘
//! ```
//!
//! An executive is single-use: once stopped, or once a start has rolled back,
//! its pipeline is gone and a new executive must be constructed.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use sigbridge_core::{
    Capability, ExecutiveState, ExecutiveStatus, SharedExternalSystemAdapter,
    SharedProcessModelAdapter, SignalAdapter, StatusSource, VersionInfo,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::config::ExecutiveConfig;
use crate::error::{CycleError, RuntimeError, RuntimeResult};
use crate::pipeline::{CycleReport, TransferPipeline};

/// Cycle counters shared between the worker and status readers.
#[derive(Debug, Default)]
struct CycleStats {
    completed: u64,
    skipped: u64,
    consecutive_failures: u32,
    last_error: Option<String>,
}

struct Worker {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Runs the transfer loop between two set-up adapters.
pub struct IntegrationExecutive {
    external: SharedExternalSystemAdapter,
    model: SharedProcessModelAdapter,
    config: ExecutiveConfig,
    state: Arc<watch::Sender<ExecutiveState>>,
    stats: Arc<Mutex<CycleStats>>,
    version: OnceLock<Arc<VersionInfo>>,
    pipeline: Mutex<Option<TransferPipeline>>,
    worker: Mutex<Option<Worker>>,
}

impl IntegrationExecutive {
    /// Takes ownership of both adapters and the pipeline bound to them.
    pub fn new(
        external: SharedExternalSystemAdapter,
        model: SharedProcessModelAdapter,
        pipeline: TransferPipeline,
        config: ExecutiveConfig,
    ) -> Self {
        let (state, _) = watch::channel(ExecutiveState::Stopped);
        Self {
            external,
            model,
            config,
            state: Arc::new(state),
            stats: Arc::default(),
            version: OnceLock::new(),
            pipeline: Mutex::new(Some(pipeline)),
            worker: Mutex::new(None),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ExecutiveState {
        *self.state.borrow()
    }

    /// Version snapshot captured by the first successful start.
    pub fn version_info(&self) -> Option<Arc<VersionInfo>> {
        self.version.get().cloned()
    }

    /// State, counters and version in one snapshot.
    pub fn status(&self) -> ExecutiveStatus {
        let stats = self.stats.lock();
        ExecutiveStatus {
            state: self.state(),
            cycles_completed: stats.completed,
            cycles_skipped: stats.skipped,
            consecutive_failures: stats.consecutive_failures,
            last_error: stats.last_error.clone(),
            version: self.version_info(),
        }
    }

    /// Waits until the state satisfies `predicate` and returns it.
    pub async fn wait_for_state<F>(&self, mut predicate: F) -> ExecutiveState
    where
        F: FnMut(&ExecutiveState) -> bool,
    {
        let mut rx = self.state.subscribe();
        match rx.wait_for(|s| predicate(s)).await {
            Ok(state) => *state,
            // The sender lives in `self`, so the channel cannot close here.
            Err(_) => self.state(),
        }
    }

    /// Opens both adapters, captures version info and starts the worker.
    ///
    /// Valid only from `Stopped`; a concurrent second call fails with
    /// [`RuntimeError::IllegalState`] and leaves the first one undisturbed. On
    /// failure everything acquired is released in reverse order and the state
    /// returns to `Stopped`.
    pub async fn start(&self) -> RuntimeResult<()> {
        let mut observed = ExecutiveState::Stopped;
        let acquired = self.state.send_if_modified(|state| {
            observed = *state;
            if state.can_start() {
                *state = ExecutiveState::Starting;
                true
            } else {
                false
            }
        });
        if !acquired {
            return Err(RuntimeError::illegal_state(format!(
                "cannot start executive while {observed}"
            )));
        }

        let Some(pipeline) = self.pipeline.lock().take() else {
            self.state.send_replace(ExecutiveState::Stopped);
            return Err(RuntimeError::illegal_state(
                "executive has already been torn down, construct a new one",
            ));
        };

        if let Err(source) = self.external.open().await {
            self.roll_back(pipeline).await;
            return Err(RuntimeError::AdapterOpen {
                capability: Capability::ExternalSystem,
                source,
            });
        }
        if let Err(source) = self.model.open().await {
            self.roll_back(pipeline).await;
            return Err(RuntimeError::AdapterOpen {
                capability: Capability::ProcessModel,
                source,
            });
        }

        let version = self
            .version
            .get_or_init(|| {
                Arc::new(VersionInfo::capture(
                    self.external.software_info(),
                    self.model.software_info(),
                ))
            })
            .clone();

        // The worker is parked until Running is published, and it sits in the
        // slot before that, so a stop() that wins the Running CAS always finds it.
        let token = CancellationToken::new();
        let worker = CycleWorker {
            pipeline,
            config: self.config.clone(),
            state: self.state.clone(),
            stats: self.stats.clone(),
            token: token.clone(),
        };
        let gate = self.state.subscribe();
        let handle = tokio::spawn(worker.run(gate).instrument(info_span!("executive_worker")));
        *self.worker.lock() = Some(Worker { token, handle });

        self.state.send_replace(ExecutiveState::Running);

        info!(
            external_system = %version.external_system.name,
            process_model = %version.process_model.name,
            cycle_interval_ms = self.config.cycle_interval_ms,
            "Integration executive running"
        );
        Ok(())
    }

    /// Stops the worker and releases pipeline and adapters in reverse order.
    ///
    /// Valid only from `Running` or `Failed`. Release failures are logged and
    /// the state always ends at `Stopped`.
    pub async fn stop(&self) -> RuntimeResult<()> {
        let mut observed = ExecutiveState::Stopped;
        let acquired = self.state.send_if_modified(|state| {
            observed = *state;
            if state.can_stop() {
                *state = ExecutiveState::Stopping;
                true
            } else {
                false
            }
        });
        if !acquired {
            return Err(RuntimeError::illegal_state(format!(
                "cannot stop executive while {observed}"
            )));
        }

        info!(from = %observed, "Stopping integration executive");

        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            worker.token.cancel();
            // The worker owns the pipeline; joining it drops the pipeline.
            if let Err(e) = worker.handle.await {
                error!(error = %e, "Transfer worker terminated abnormally");
            }
        }
        drop(self.pipeline.lock().take());

        release(self.model.as_ref(), Capability::ProcessModel).await;
        release(self.external.as_ref(), Capability::ExternalSystem).await;

        self.state.send_replace(ExecutiveState::Stopped);
        info!("Integration executive stopped");
        Ok(())
    }

    async fn roll_back(&self, pipeline: TransferPipeline) {
        warn!("Executive start failed, releasing acquired resources");
        drop(pipeline);
        release(self.model.as_ref(), Capability::ProcessModel).await;
        release(self.external.as_ref(), Capability::ExternalSystem).await;
        self.state.send_replace(ExecutiveState::Stopped);
    }

    #[cfg(test)]
    fn worker_finished(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_none_or(|w| w.handle.is_finished())
    }
}

impl Drop for IntegrationExecutive {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.get_mut().take() {
            worker.token.cancel();
        }
    }
}

async fn release<A>(adapter: &A, capability: Capability)
where
    A: SignalAdapter + ?Sized,
{
    match adapter.release().await {
        Ok(()) => debug!(%capability, "Adapter released"),
        Err(e) => error!(%capability, error = %e, "Adapter release failed"),
    }
}

// =============================================================================
// Worker
// =============================================================================

enum CycleOutcome {
    Completed(CycleReport),
    Skipped(CycleError),
    Faulted(String),
    Cancelled,
}

struct CycleWorker {
    pipeline: TransferPipeline,
    config: ExecutiveConfig,
    state: Arc<watch::Sender<ExecutiveState>>,
    stats: Arc<Mutex<CycleStats>>,
    token: CancellationToken,
}

impl CycleWorker {
    async fn run(self, mut gate: watch::Receiver<ExecutiveState>) {
        let released = gate
            .wait_for(|s| *s != ExecutiveState::Starting)
            .await
            .map(|state| *state);
        if !matches!(released, Ok(ExecutiveState::Running)) {
            return;
        }
        debug!("Transfer worker started");
        let interval = self.config.cycle_interval();

        loop {
            match self.attempt_cycle().await {
                CycleOutcome::Completed(report) => {
                    let mut stats = self.stats.lock();
                    stats.completed += 1;
                    stats.consecutive_failures = 0;
                    debug!(
                        cycle = stats.completed,
                        transferred = report.total(),
                        "Transfer cycle completed"
                    );
                }
                CycleOutcome::Skipped(err) => {
                    warn!(error = %err, "Transfer cycle skipped");
                    let failures = {
                        let mut stats = self.stats.lock();
                        stats.skipped += 1;
                        stats.consecutive_failures += 1;
                        stats.last_error = Some(err.to_string());
                        stats.consecutive_failures
                    };
                    let limit = self.config.max_consecutive_failures;
                    if limit > 0 && failures >= limit {
                        self.fail(format!("{failures} consecutive transfer cycles failed"));
                        break;
                    }
                }
                CycleOutcome::Faulted(reason) => {
                    self.fail(reason);
                    break;
                }
                CycleOutcome::Cancelled => break,
            }

            tokio::select! {
                _ = self.token.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        debug!("Transfer worker exited");
    }

    /// Runs one cycle, retrying recoverable failures per the retry policy.
    async fn attempt_cycle(&self) -> CycleOutcome {
        let retry = &self.config.retry;
        let mut attempt = 0;

        loop {
            if self.token.is_cancelled() {
                return CycleOutcome::Cancelled;
            }
            match self.pipeline.run_cycle().await {
                Ok(report) => return CycleOutcome::Completed(report),
                Err(CycleError::Fault(fault)) => return CycleOutcome::Faulted(fault.to_string()),
                Err(err) if attempt >= retry.max_attempts => return CycleOutcome::Skipped(err),
                Err(err) => {
                    attempt += 1;
                    debug!(attempt, max_attempts = retry.max_attempts, error = %err, "Retrying transfer cycle");
                    tokio::select! {
                        _ = self.token.cancelled() => return CycleOutcome::Cancelled,
                        _ = tokio::time::sleep(retry.delay()) => {}
                    }
                }
            }
        }
    }

    fn fail(&self, reason: String) {
        error!(error = %reason, "Adapter fault, executive failed");
        self.stats.lock().last_error = Some(reason);
        // A concurrent stop() has already moved the state on; leave it there.
        self.state.send_if_modified(|state| {
            if *state == ExecutiveState::Running {
                *state = ExecutiveState::Failed;
                true
            } else {
                false
            }
        });
    }
}

// =============================================================================
// Read-only view
// =============================================================================

/// Read-only handle on an executive. Exposes no lifecycle or adapter access.
#[derive(Clone)]
pub struct ExecutiveView(Arc<IntegrationExecutive>);

impl ExecutiveView {
    pub(crate) fn new(executive: Arc<IntegrationExecutive>) -> Self {
        Self(executive)
    }

    pub fn state(&self) -> ExecutiveState {
        self.0.state()
    }

    pub fn status(&self) -> ExecutiveStatus {
        self.0.status()
    }

    pub fn version_info(&self) -> Option<Arc<VersionInfo>> {
        self.0.version_info()
    }

    pub async fn wait_for_state<F>(&self, predicate: F) -> ExecutiveState
    where
        F: FnMut(&ExecutiveState) -> bool,
    {
        self.0.wait_for_state(predicate).await
    }
}

impl StatusSource for ExecutiveView {
    fn executive_status(&self) -> Option<ExecutiveStatus> {
        Some(self.status())
    }

    fn version_info(&self) -> Option<Arc<VersionInfo>> {
        ExecutiveView::version_info(self)
    }
}

impl std::fmt::Debug for ExecutiveView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutiveView")
            .field("state", &self.state())
            .finish()
    }
}
