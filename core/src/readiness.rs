//! Readiness tracking for the featured image.
//!
//! Mounting the featured image waits until its bytes have been fetched and
//! decoded. Loading is best-effort: a failed load still produces a report,
//! flagged as degraded, so the presentation never stalls on a broken image.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::warn;

use crate::error::LoadError;

/// Fetches and decodes a resource by identifier.
#[async_trait]
pub trait ResourceLoader: Send + Sync + 'static {
    type Output: Send + 'static;

    async fn load(&self, id: &str) -> Result<Self::Output, LoadError>;
}

/// Outcome of one readiness check. Always means "ready to mount"; a missing
/// resource only degrades what gets drawn.
#[derive(Debug)]
pub struct ReadinessReport<T> {
    pub id: Arc<str>,
    pub generation: u64,
    pub resource: Option<T>,
    pub failure: Option<String>,
}

impl<T> ReadinessReport<T> {
    pub fn is_degraded(&self) -> bool {
        self.resource.is_none()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadinessStatus {
    Idle,
    Pending,
    Ready { degraded: bool },
}

/// Keeps at most one readiness check in flight.
///
/// Each request bumps a generation number. Reports are delivered through
/// the channel given at construction and must be passed back through
/// [`ReadinessCoordinator::accept`], which discards reports for superseded
/// requests.
pub struct ReadinessCoordinator<L: ResourceLoader> {
    loader: Arc<L>,
    tx: UnboundedSender<ReadinessReport<L::Output>>,
    generation: u64,
    current: Option<Arc<str>>,
    status: ReadinessStatus,
    task: Option<JoinHandle<()>>,
}

impl<L: ResourceLoader> ReadinessCoordinator<L> {
    pub fn new(loader: Arc<L>, tx: UnboundedSender<ReadinessReport<L::Output>>) -> Self {
        Self {
            loader,
            tx,
            generation: 0,
            current: None,
            status: ReadinessStatus::Idle,
            task: None,
        }
    }

    pub fn status(&self) -> ReadinessStatus {
        self.status
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Starts a readiness check for `id`, aborting any check in flight.
    ///
    /// Returns `false` when `id` is already pending or ready.
    pub fn request(&mut self, id: &str) -> bool {
        if self.current.as_deref() == Some(id) && self.status != ReadinessStatus::Idle {
            return false;
        }
        self.abort_task();
        self.generation += 1;
        let id: Arc<str> = Arc::from(id);
        self.current = Some(Arc::clone(&id));
        self.status = ReadinessStatus::Pending;

        let loader = Arc::clone(&self.loader);
        let tx = self.tx.clone();
        let generation = self.generation;
        self.task = Some(tokio::spawn(async move {
            let report = match loader.load(&id).await {
                Ok(resource) => ReadinessReport {
                    id,
                    generation,
                    resource: Some(resource),
                    failure: None,
                },
                Err(err) => {
                    warn!(id = %id, "featured image failed to load: {err}");
                    ReadinessReport {
                        id,
                        generation,
                        resource: None,
                        failure: Some(err.to_string()),
                    }
                }
            };
            // Receiver gone means the surface is shutting down.
            let _ = tx.send(report);
        }));
        true
    }

    /// Returns the report if it answers the current request, `None` if it
    /// is stale.
    pub fn accept(
        &mut self,
        report: ReadinessReport<L::Output>,
    ) -> Option<ReadinessReport<L::Output>> {
        let is_current = report.generation == self.generation
            && self.current.as_deref() == Some(&*report.id)
            && self.status == ReadinessStatus::Pending;
        if !is_current {
            debug!(
                id = %report.id,
                generation = report.generation,
                "dropping stale readiness report"
            );
            return None;
        }
        self.task = None;
        self.status = ReadinessStatus::Ready {
            degraded: report.is_degraded(),
        };
        Some(report)
    }

    /// Aborts the check in flight and forgets the current request.
    pub fn cancel(&mut self) {
        self.abort_task();
        self.generation += 1;
        self.current = None;
        self.status = ReadinessStatus::Idle;
    }

    fn abort_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl<L: ResourceLoader> Drop for ReadinessCoordinator<L> {
    fn drop(&mut self) {
        self.abort_task();
    }
}
