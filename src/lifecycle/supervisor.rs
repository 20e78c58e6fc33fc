//! Listener supervision.
//!
//! # Responsibilities
//! - Run every bound listener as its own task
//! - Stop the process on the first listener failure
//! - Cancel the remaining listeners on failure or shutdown
//!
//! # Design Decisions
//! - A listener never "finishes"; any exit is a failure
//! - The first failure wins; later ones are dropped with their tasks

use std::future::Future;

use axum::Router;
use thiserror::Error;
use tokio::task::JoinSet;

use crate::net::{BoundListener, ListenerError, ListenerKind};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("startup failed: {0}")]
    Startup(ListenerError),

    #[error("{kind} listener failed: {source}")]
    Listener {
        kind: ListenerKind,
        source: ListenerError,
    },

    #[error("listener task panicked: {0}")]
    Panicked(String),

    #[error("no listeners to supervise")]
    NoListeners,
}

type TaskOutput = (ListenerKind, Result<(), ListenerError>);

/// Owns the listener tasks of one process.
#[derive(Default)]
pub struct Supervisor {
    tasks: JoinSet<TaskOutput>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `router` on `listener` in a new task.
    pub fn spawn(&mut self, listener: BoundListener, router: Router) {
        let kind = listener.kind();
        self.spawn_task(kind, listener.serve(router));
    }

    /// Supervise an arbitrary listener future.
    pub fn spawn_task<F>(&mut self, kind: ListenerKind, task: F)
    where
        F: Future<Output = Result<(), ListenerError>> + Send + 'static,
    {
        self.tasks.spawn(async move { (kind, task.await) });
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for the first listener to stop and report why.
    pub async fn run_until_failure(&mut self) -> SupervisorError {
        let error = match self.tasks.join_next().await {
            None => SupervisorError::NoListeners,
            Some(Ok((kind, Err(source)))) => SupervisorError::Listener { kind, source },
            Some(Ok((kind, Ok(())))) => SupervisorError::Listener {
                kind,
                source: ListenerError::Stopped,
            },
            Some(Err(e)) => SupervisorError::Panicked(e.to_string()),
        };

        if let SupervisorError::Listener { kind, .. } = &error {
            metrics::record_listener_failure(kind.as_str());
        }
        tracing::error!(error = %error, remaining = self.tasks.len(), "Listener stopped, cancelling the rest");
        self.tasks.shutdown().await;
        error
    }

    /// Run until `shutdown` resolves (clean exit) or a listener fails.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> Result<(), SupervisorError> {
        if self.tasks.is_empty() {
            return Err(SupervisorError::NoListeners);
        }

        tokio::select! {
            error = self.run_until_failure() => return Err(error),
            _ = shutdown => {}
        }

        tracing::info!(listeners = self.tasks.len(), "Shutting down listeners");
        self.tasks.shutdown().await;
        Ok(())
    }
}
