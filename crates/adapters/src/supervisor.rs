//! Background startup tasks for venue adapters
//!
//! Every adapter's [`VenueAdapter::run`] is spawned as its own task, so venues
//! initialize independently and concurrently with the host's request handling.
//! A broadcast channel signals shutdown; a task still running when it fires is
//! abandoned at its next suspension point.

use crate::traits::VenueAdapter;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How a startup task ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Cancelled,
    Panicked,
}

pub struct VenueSupervisor {
    shutdown_tx: broadcast::Sender<()>,
    tasks: Vec<(String, JoinHandle<TaskOutcome>)>,
}

impl Default for VenueSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl VenueSupervisor {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            shutdown_tx,
            tasks: Vec::new(),
        }
    }

    /// Spawns the adapter's startup task
    pub fn start(&mut self, adapter: Arc<dyn VenueAdapter>) {
        let name = adapter.name().to_string();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let task_name = name.clone();

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = adapter.run() => {
                    debug!(venue = %task_name, "Startup task completed");
                    TaskOutcome::Completed
                }
                _ = shutdown_rx.recv() => {
                    info!(venue = %task_name, "Startup task cancelled by shutdown");
                    TaskOutcome::Cancelled
                }
            }
        });

        info!(venue = %name, "Started venue");
        self.tasks.push((name, handle));
    }

    pub fn start_all<I>(&mut self, adapters: I)
    where
        I: IntoIterator<Item = Arc<dyn VenueAdapter>>,
    {
        for adapter in adapters {
            self.start(adapter);
        }
    }

    /// Sender that cancels every pending startup task when signalled
    pub fn shutdown_sender(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Waits for every startup task to finish
    pub async fn join(self) -> Vec<(String, TaskOutcome)> {
        let mut outcomes = Vec::with_capacity(self.tasks.len());
        for (name, handle) in self.tasks {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(venue = %name, error = %e, "Startup task failed");
                    TaskOutcome::Panicked
                }
            };
            outcomes.push((name, outcome));
        }
        outcomes
    }

    /// Signals shutdown, then waits for every task to stop
    pub async fn shutdown(self) -> Vec<(String, TaskOutcome)> {
        // No receivers left means every task already finished
        let _ = self.shutdown_tx.send(());
        self.join().await
    }
}
