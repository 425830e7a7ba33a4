//! Scheduled Jobs
//!
//! Background maintenance: ended or expired sessions are purged on a fixed
//! interval, together with stale login-attempt counters.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::interval;

use crate::auth::AuthService;
use crate::error::AppError;

/// Purge sessions that can no longer authenticate
pub async fn purge_sessions(auth: &AuthService) -> Result<usize, JobError> {
    let purged = auth.purge_sessions().await?;

    if purged > 0 {
        tracing::info!(sessions_purged = purged, "Purged ended sessions");
    }

    Ok(purged)
}

// =========================================================================
// Job Scheduler
// =========================================================================

/// Configuration for job scheduler
#[derive(Debug, Clone)]
pub struct JobSchedulerConfig {
    /// Interval for session purge (default: 5 minutes)
    pub session_purge_interval: Duration,
}

impl Default for JobSchedulerConfig {
    fn default() -> Self {
        Self {
            session_purge_interval: Duration::from_secs(300),
        }
    }
}

/// Job Scheduler - runs periodic maintenance tasks
pub struct JobScheduler {
    auth: AuthService,
    config: JobSchedulerConfig,
}

impl JobScheduler {
    pub fn new(auth: AuthService) -> Self {
        Self {
            auth,
            config: JobSchedulerConfig::default(),
        }
    }

    pub fn with_config(auth: AuthService, config: JobSchedulerConfig) -> Self {
        Self { auth, config }
    }

    /// Start the job scheduler in the background.
    /// Returns a handle that can be used to abort the scheduler.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        tracing::info!(
            interval_secs = self.config.session_purge_interval.as_secs(),
            "Job scheduler started"
        );

        let mut purge_interval = interval(self.config.session_purge_interval);

        loop {
            purge_interval.tick().await;
            if let Err(e) = purge_sessions(&self.auth).await {
                tracing::error!(error = %e, "Session purge failed");
            }
        }
    }

    /// Run all maintenance jobs once (for manual trigger or testing)
    pub async fn run_all_once(&self) -> MaintenanceReport {
        let mut report = MaintenanceReport::default();

        match purge_sessions(&self.auth).await {
            Ok(count) => report.sessions_purged = count,
            Err(e) => report.errors.push(format!("Session purge: {}", e)),
        }

        report.completed_at = Utc::now();
        report
    }
}

/// Report from running maintenance jobs
#[derive(Debug, Clone, Default)]
pub struct MaintenanceReport {
    pub sessions_purged: usize,
    pub errors: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

/// Job execution errors
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Maintenance failed: {0}")]
    App(#[from] AppError),
}
