//! Continuous reconciliation loop.

use std::sync::Arc;
use std::time::Duration;

use oya_events::{AllBeadsProjection, ManagedProjection};
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::reconciler::Reconciler;
use crate::types::{ActualState, DesiredState};

/// Configuration for the reconciliation loop.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Interval between reconciliation cycles.
    pub interval: Duration,
    /// Maximum consecutive errors before stopping.
    pub max_errors: usize,
    /// Whether to stop on first error.
    pub stop_on_error: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_errors: 10,
            stop_on_error: false,
        }
    }
}

/// State provider trait for getting desired state.
#[async_trait::async_trait]
pub trait DesiredStateProvider: Send + Sync {
    /// Get the current desired state.
    async fn get_desired_state(&self) -> Result<DesiredState>;
}

/// Simple in-memory desired state provider.
pub struct InMemoryDesiredStateProvider {
    state: tokio::sync::RwLock<DesiredState>,
}

impl InMemoryDesiredStateProvider {
    /// Create a new provider with initial state.
    pub fn new(state: DesiredState) -> Self {
        Self {
            state: tokio::sync::RwLock::new(state),
        }
    }

    /// Update the desired state.
    pub async fn update(&self, state: DesiredState) {
        *self.state.write().await = state;
    }

    /// Get a mutable reference to update.
    pub async fn modify<F>(&self, f: F)
    where
        F: FnOnce(&mut DesiredState),
    {
        let mut state = self.state.write().await;
        f(&mut state);
    }
}

#[async_trait::async_trait]
impl DesiredStateProvider for InMemoryDesiredStateProvider {
    async fn get_desired_state(&self) -> Result<DesiredState> {
        Ok(self.state.read().await.clone())
    }
}

/// Continuous reconciliation loop.
///
/// Periodically compares desired state vs actual state and
/// reconciles the difference.
pub struct ReconciliationLoop {
    /// The reconciler.
    reconciler: Arc<Reconciler>,
    /// Desired state provider.
    desired_provider: Arc<dyn DesiredStateProvider>,
    /// Projection for actual state.
    projection: Arc<ManagedProjection<AllBeadsProjection>>,
    /// Loop configuration.
    config: LoopConfig,
    /// Stop signal receiver.
    stop_rx: watch::Receiver<bool>,
    /// Stop signal sender (for external control).
    stop_tx: watch::Sender<bool>,
}

impl ReconciliationLoop {
    /// Create a new reconciliation loop.
    pub fn new(
        reconciler: Arc<Reconciler>,
        desired_provider: Arc<dyn DesiredStateProvider>,
        projection: Arc<ManagedProjection<AllBeadsProjection>>,
        config: LoopConfig,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            reconciler,
            desired_provider,
            projection,
            config,
            stop_rx,
            stop_tx,
        }
    }

    /// Run the reconciliation loop.
    ///
    /// This runs until stopped or max errors reached.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            interval_ms = self.config.interval.as_millis(),
            "Starting reconciliation loop"
        );

        let mut consecutive_errors = 0usize;
        let mut interval = tokio::time::interval(self.config.interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.reconcile_once().await {
                        Ok(converged) => {
                            consecutive_errors = 0;
                            if converged {
                                debug!("System converged");
                            }
                        }
                        Err(e) => {
                            consecutive_errors += 1;
                            error!(
                                error = %e,
                                consecutive = consecutive_errors,
                                "Reconciliation error"
                            );

                            if self.config.stop_on_error {
                                return Err(e);
                            }

                            if consecutive_errors >= self.config.max_errors {
                                error!("Max errors reached, stopping loop");
                                return Err(Error::reconcile_failed(format!(
                                    "Max errors ({}) reached",
                                    self.config.max_errors
                                )));
                            }
                        }
                    }
                }
                _ = self.stop_rx.changed() => {
                    if *self.stop_rx.borrow() {
                        info!("Reconciliation loop stopped");
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Run a single reconciliation cycle.
    async fn reconcile_once(&self) -> Result<bool> {
        // Get desired state
        let desired = self.desired_provider.get_desired_state().await?;

        // Get actual state from projection
        let proj_state = self.projection.state().await;
        let actual = self.build_actual_state(&proj_state);

        // Reconcile
        let result = self.reconciler.reconcile(&desired, &actual).await?;

        Ok(result.converged)
    }

    /// Build ActualState from projection state.
    fn build_actual_state(&self, proj_state: &oya_events::AllBeadsState) -> ActualState {
        let mut actual = ActualState::new();
        for (bead_id, proj) in &proj_state.beads {
            actual.beads.insert(*bead_id, proj.clone());
        }
        // Recompute counts
        for proj in actual.beads.values() {
            match proj.current_state {
                oya_events::BeadState::Running => actual.running_count += 1,
                oya_events::BeadState::Pending => actual.pending_count += 1,
                oya_events::BeadState::Completed => actual.completed_count += 1,
                _ => {}
            }
        }
        actual
    }

    /// Stop the loop.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Get a stopper handle.
    pub fn stopper(&self) -> LoopStopper {
        LoopStopper {
            stop_tx: self.stop_tx.clone(),
        }
    }
}

/// Handle to stop a reconciliation loop.
#[derive(Clone)]
pub struct LoopStopper {
    stop_tx: watch::Sender<bool>,
}

impl LoopStopper {
    /// Stop the loop.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}
