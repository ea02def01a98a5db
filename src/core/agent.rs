use chrono::Utc;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::core::config::MonitorConfig;
use crate::core::usage::{self, CollectError};
use crate::core::uploader::{self, UploadError, UploadMetadata, UploadOutcome};

#[derive(Error, Debug)]
pub enum CycleError {
    #[error("Collection failed: {0}")]
    Collect(#[from] CollectError),
    #[error("Collection task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Upload(#[from] UploadError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleKind {
    Initial,
    Periodic,
    Final,
}

impl CycleKind {
    fn label(&self) -> &'static str {
        match self {
            Self::Initial => "Initial upload",
            Self::Periodic => "Upload",
            Self::Final => "Final upload",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgentStats {
    pub cycles: u64,
    pub failures: u64,
}

/// Periodic collect-and-upload loop.
pub struct Agent {
    config: MonitorConfig,
    projects_dir: PathBuf,
    client: reqwest::Client,
}

impl Agent {
    pub fn new(config: MonitorConfig, projects_dir: PathBuf) -> Result<Self, UploadError> {
        Ok(Self {
            config,
            projects_dir,
            client: uploader::build_client()?,
        })
    }

    /// One full pass: scan the logs on a blocking worker, then upload.
    pub async fn run_cycle(&self) -> Result<UploadOutcome, CycleError> {
        let root = self.projects_dir.clone();
        let cutoff = usage::retention_cutoff(Utc::now());
        let report = tokio::task::spawn_blocking(move || usage::collect(&root, cutoff)).await??;
        debug!(days = report.days(), "Collected usage");

        let meta = UploadMetadata::for_config(&self.config).await;
        let outcome =
            uploader::upload(&self.client, &self.config.upload_url(), &report, &meta).await?;
        Ok(outcome)
    }

    async fn logged_cycle(&self, kind: CycleKind, stats: &mut AgentStats) {
        stats.cycles += 1;
        let n = stats.cycles;
        if kind == CycleKind::Periodic {
            info!("Upload #{} starting...", n);
        }
        match self.run_cycle().await {
            Ok(outcome) => info!(cycle = n, "{}: {}", kind.label(), outcome),
            Err(err) => {
                stats.failures += 1;
                warn!(cycle = n, "{} error: {}", kind.label(), err);
            }
        }
    }

    /// Run an initial cycle, then one cycle per interval until `shutdown`
    /// resolves, then a final cycle.
    ///
    /// Cycles never overlap and are never interrupted: `shutdown` is only
    /// observed between cycles.
    pub async fn run_until<F>(&self, shutdown: F) -> AgentStats
    where
        F: Future<Output = ()>,
    {
        let mut stats = AgentStats::default();
        tokio::pin!(shutdown);

        info!("Performing initial upload...");
        self.logged_cycle(CycleKind::Initial, &mut stats).await;

        let period = Duration::from_secs(self.config.interval_seconds.max(1));
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Performing final upload...");
                    self.logged_cycle(CycleKind::Final, &mut stats).await;
                    break;
                }
                _ = ticker.tick() => {
                    self.logged_cycle(CycleKind::Periodic, &mut stats).await;
                }
            }
        }

        info!("Claude Monitor stopped (total uploads: {})", stats.cycles);
        stats
    }
}

/// Operator shutdown request: Ctrl-C, or SIGTERM on Unix.
///
/// Handlers are registered by [`ShutdownSignal::install`], so a signal that
/// arrives while a cycle is running is still seen afterwards.
pub struct ShutdownSignal {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
    #[cfg(windows)]
    ctrl_c: tokio::signal::windows::CtrlC,
}

impl ShutdownSignal {
    #[cfg(unix)]
    pub fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(windows)]
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    /// Wait for the next shutdown signal and return its name.
    #[cfg(unix)]
    pub async fn recv(mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }

    #[cfg(windows)]
    pub async fn recv(mut self) -> &'static str {
        self.ctrl_c.recv().await;
        "Ctrl-C"
    }
}
