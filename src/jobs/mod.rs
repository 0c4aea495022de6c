use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{error, info};

use crate::metrics;

pub mod tasks;

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<crate::context::AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<crate::context::AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        tokio::spawn(Self::expired_user_block_cleanup_job(Arc::clone(&self)));
        tokio::spawn(Self::health_check_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Lift expired user blocks (runs every 15 minutes)
    async fn expired_user_block_cleanup_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(900)); // Every 15 minutes

        loop {
            interval.tick().await;

            match tasks::cleanup_expired_user_blocks(&scheduler.context).await {
                Ok(count) => {
                    metrics::BACKGROUND_JOBS_TOTAL
                        .with_label_values(&["user_block_cleanup", "ok"])
                        .inc();
                    if count > 0 {
                        info!("Lifted {} expired user blocks", count);
                    }
                }
                Err(e) => {
                    metrics::BACKGROUND_JOBS_TOTAL
                        .with_label_values(&["user_block_cleanup", "error"])
                        .inc();
                    error!("Failed to clean up expired user blocks: {}", e);
                }
            }
        }
    }

    /// Health check job (runs every 5 minutes)
    async fn health_check_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(300)); // Every 5 minutes

        loop {
            interval.tick().await;

            match tasks::health_check(&scheduler.context).await {
                Ok(_) => {
                    // Silent success - storage is healthy
                }
                Err(e) => error!("Health check failed: {}", e),
            }
        }
    }
}
