//! Owner of in-flight relays.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use encore_core::{PlaybackOutcome, PlaybackRequest, PlaybackService, RelayError, RelayState};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::controller::RelayController;

/// Spawns each playback as its own task and unwinds them all on shutdown.
pub struct RelayHost {
    controller: Arc<RelayController>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<JoinSet<()>>,
}

impl RelayHost {
    pub fn new(controller: RelayController) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            controller: Arc::new(controller),
            shutdown_tx,
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    pub fn controller(&self) -> &Arc<RelayController> {
        &self.controller
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Relays spawned and not yet reaped.
    pub fn in_flight(&self) -> usize {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        while tasks.try_join_next().is_some() {}
        tasks.len()
    }

    /// Cancel every relay, wait up to `grace` for them to tear down, then
    /// leave whatever voice sessions remain.
    pub async fn shutdown(&self, grace: Duration) {
        self.shutdown_tx.send_replace(true);
        let mut tasks = {
            let mut guard = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *guard)
        };
        info!(in_flight = tasks.len(), "Shutting down relays");

        let drained = tokio::time::timeout(grace, async {
            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined {
                    if e.is_panic() {
                        error!(error = %e, "Relay task panicked");
                    }
                }
            }
        })
        .await;
        if drained.is_err() {
            warn!(
                remaining = tasks.len(),
                grace_ms = grace.as_millis() as u64,
                "Relays did not finish in time; aborting"
            );
            tasks.shutdown().await;
        }

        let left = self.controller.sessions().leave_all().await;
        info!(left, "Relay host stopped");
    }
}

#[async_trait]
impl PlaybackService for RelayHost {
    /// Runs the relay on its own task so the caller can go away without
    /// cutting the playback short.
    async fn play(&self, request: PlaybackRequest) -> PlaybackOutcome {
        let (outcome_tx, outcome_rx) = oneshot::channel();
        {
            let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
            // Checked under the task lock so a relay cannot slip in after
            // shutdown has drained the set.
            if self.is_shutting_down() {
                return PlaybackOutcome::failed(RelayState::Idle, RelayError::Cancelled);
            }
            while tasks.try_join_next().is_some() {}

            let controller = Arc::clone(&self.controller);
            let shutdown = self.shutdown_tx.subscribe();
            tasks.spawn(async move {
                let outcome = controller.run(request, shutdown).await;
                let _ = outcome_tx.send(outcome);
            });
        }

        outcome_rx
            .await
            .unwrap_or_else(|_| PlaybackOutcome::failed(RelayState::Idle, RelayError::Cancelled))
    }
}
