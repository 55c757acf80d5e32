use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use shared::domain::{Job, QueueStats};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

pub mod actions;
pub mod config;
pub mod projection;
pub mod snapshot;
pub mod transport;

pub use actions::{ActionDispatcher, ActionError};
pub use config::{load_settings, Settings};
pub use snapshot::{Snapshot, EVENT_LOG_CAPACITY, JOB_LIST_LIMIT};
pub use transport::{Transport, TransportSignal};

/// Where the engine pulls current truth from. Production uses the REST API;
/// tests inject a double so the reconciliation loop runs without a network.
#[async_trait]
pub trait StateSource: Send + Sync {
    async fn fetch_stats(&self) -> Result<QueueStats>;
    async fn fetch_jobs(&self, limit: usize) -> Result<Vec<Job>>;
}

/// REST-backed [`StateSource`] for `GET /api/stats` and `GET /api/jobs`.
pub struct RestStateSource {
    http: Client,
    base_url: String,
}

impl RestStateSource {
    pub fn new(settings: &Settings) -> Self {
        Self {
            http: Client::new(),
            base_url: settings.base_url.clone(),
        }
    }
}

#[async_trait]
impl StateSource for RestStateSource {
    async fn fetch_stats(&self) -> Result<QueueStats> {
        let stats = self
            .http
            .get(format!("{}/api/stats", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(stats)
    }

    async fn fetch_jobs(&self, limit: usize) -> Result<Vec<Job>> {
        let jobs = self
            .http
            .get(format!("{}/api/jobs", self.base_url))
            .query(&[("limit", limit)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(jobs)
    }
}

/// Notifications for snapshot consumers (renderers, tests).
#[derive(Debug, Clone)]
pub enum DashboardEvent {
    /// Stats and jobs were replaced from a fresh pull.
    SnapshotUpdated,
    /// A push event was appended to the event log.
    EventLogged(shared::domain::JobEvent),
    /// The push channel is down; the poll backstop is the only feed.
    TransportDown,
    /// A refresh failed; the previous snapshot is still being served.
    Error(String),
}

/// The reconciliation engine: sole owner and sole writer of the [`Snapshot`].
///
/// Push events are treated purely as hints — they are logged and answered
/// with a full pull, never merged into job state. Pulls replace stats and
/// jobs wholesale. Two in-flight pulls may race; whichever response arrives
/// last wins, and the poll backstop bounds how long a stale overwrite can
/// survive.
pub struct Dashboard {
    source: Arc<dyn StateSource>,
    snapshot: Mutex<Snapshot>,
    fetch_seq: AtomicU64,
    applied_seq: AtomicU64,
    events: broadcast::Sender<DashboardEvent>,
}

impl Dashboard {
    pub fn new(settings: &Settings) -> Arc<Self> {
        Self::with_source(Arc::new(RestStateSource::new(settings)))
    }

    pub fn with_source(source: Arc<dyn StateSource>) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            source,
            snapshot: Mutex::new(Snapshot::new()),
            fetch_seq: AtomicU64::new(0),
            applied_seq: AtomicU64::new(0),
            events,
        })
    }

    /// Consume the transport's signal stream until it ends. Signals are
    /// handled in arrival order on this one task; snapshot writes happen
    /// nowhere else.
    pub async fn run(self: Arc<Self>, mut transport: Transport) {
        while let Some(signal) = transport.recv().await {
            match signal {
                TransportSignal::Push(event) => {
                    {
                        let mut snapshot = self.snapshot.lock().await;
                        snapshot.push_event(event.clone());
                    }
                    debug!(job_id = %event.job_id, status = %event.status, "push event logged");
                    let _ = self.events.send(DashboardEvent::EventLogged(event));
                    self.refresh_or_report().await;
                }
                TransportSignal::PollTick => {
                    self.refresh_or_report().await;
                }
                TransportSignal::Disconnected => {
                    warn!("push channel disconnected; serving from poll backstop only");
                    let _ = self.events.send(DashboardEvent::TransportDown);
                }
            }
        }
        info!("transport stream ended; reconciliation loop exiting");
    }

    /// One full pull of stats and jobs, applied wholesale. On any failure
    /// the snapshot is left untouched: stale-but-available beats
    /// blank-on-error.
    pub async fn refresh(&self) -> Result<()> {
        let seq = self.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let stats = self.source.fetch_stats().await?;
        let jobs = self.source.fetch_jobs(JOB_LIST_LIMIT).await?;

        {
            let mut snapshot = self.snapshot.lock().await;
            let newest = self.applied_seq.fetch_max(seq, Ordering::SeqCst);
            if newest > seq {
                debug!(seq, newest, "late pull response overwrote a newer one");
            }
            snapshot.replace_stats(stats);
            snapshot.replace_jobs(jobs);
        }

        let _ = self.events.send(DashboardEvent::SnapshotUpdated);
        Ok(())
    }

    async fn refresh_or_report(&self) {
        if let Err(err) = self.refresh().await {
            warn!(%err, "pull failed; keeping previous snapshot");
            let _ = self.events.send(DashboardEvent::Error(err.to_string()));
        }
    }

    /// Read-only copy of the current snapshot for projection.
    pub async fn snapshot(&self) -> Snapshot {
        self.snapshot.lock().await.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
